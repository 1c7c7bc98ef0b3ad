//! 文本提取服务 - 业务能力层
//!
//! 只负责"从页面来源取出有序文本"，不做大小 / 词数等策略判断。

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::ExtractionError;
use crate::infrastructure::PageSource;
use crate::models::ExtractedText;
use crate::utils::text::{clean_page, count_visible_chars};

/// 文本提取服务
pub struct Extractor {
    /// 最多读取的页数
    page_cap: usize,
    /// 少于该可见字符数的页视为空白页
    blank_page_chars: usize,
}

impl Extractor {
    pub fn new(config: &Config) -> Self {
        Self {
            page_cap: config.max_pages,
            blank_page_chars: config.blank_page_chars,
        }
    }

    pub fn with_limits(page_cap: usize, blank_page_chars: usize) -> Self {
        Self {
            page_cap,
            blank_page_chars,
        }
    }

    /// 提取文本
    ///
    /// 按页序读取前 `page_cap` 页。扫描件检测在这里完成，
    /// 早于词数校验，保证用户拿到的是"扫描件"而不是笼统的"内容太少"。
    pub fn extract(&self, source: &dyn PageSource) -> Result<ExtractedText, ExtractionError> {
        if source.is_encrypted() {
            warn!("文档已加密，拒绝读取");
            return Err(ExtractionError::Protected);
        }

        let total_pages = source.page_count();
        if total_pages == 0 {
            return Err(ExtractionError::Corrupted {
                reason: "document has no pages".to_string(),
            });
        }

        let pages_to_read = total_pages.min(self.page_cap);
        let mut pages = Vec::with_capacity(pages_to_read);
        for index in 0..pages_to_read {
            let raw = source.page_text(index)?;
            pages.push(clean_page(&raw));
        }

        let blank_pages = pages
            .iter()
            .filter(|p| count_visible_chars(p) < self.blank_page_chars)
            .count();
        debug!("已读取 {} 页，其中空白页 {} 页", pages.len(), blank_pages);

        // 多数页面几乎无字符即判定为扫描件
        if blank_pages * 2 > pages.len() {
            warn!(
                "{}/{} 页无可提取文本，判定为扫描件",
                blank_pages,
                pages.len()
            );
            return Err(ExtractionError::ScanOnly {
                pages: pages.len(),
                blank_pages,
            });
        }

        let text = ExtractedText::new(pages, total_pages);
        info!(
            "✓ 文本提取完成: {} 页 / {} 词",
            text.pages_read(),
            text.word_count
        );
        Ok(text)
    }
}
