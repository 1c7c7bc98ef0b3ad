//! 校验服务 - 业务能力层
//!
//! 有序的策略链，第一条失败的检查决定唯一的拒绝原因：
//! 类型 → 大小 → 页数 → 提取错误 → 词数。

use tracing::{info, warn};

use crate::config::{Config, PageLimitPolicy};
use crate::error::{ExtractionError, ValidationError};
use crate::models::{Document, ExtractedText, RejectionReason, ValidationResult};

const SUPPORTED_MIME_TYPES: [&str; 2] = ["application/pdf", "application/x-pdf"];

/// 校验服务
#[derive(Debug, Clone)]
pub struct Validator {
    max_file_size_bytes: u64,
    max_pages: usize,
    min_word_count: usize,
    page_limit_policy: PageLimitPolicy,
}

impl Validator {
    pub fn new(config: &Config) -> Self {
        Self {
            max_file_size_bytes: config.max_file_size_bytes,
            max_pages: config.max_pages,
            min_word_count: config.min_word_count,
            page_limit_policy: config.page_limit_policy,
        }
    }

    /// 不需要解析内容的检查（类型、大小）
    ///
    /// 入口处先调用，超大文件不必解析。
    pub fn precheck(&self, document: &Document) -> Result<(), ValidationError> {
        let is_pdf_name = document.filename.to_ascii_lowercase().ends_with(".pdf");
        if !SUPPORTED_MIME_TYPES.contains(&document.mime_type.as_str()) && !is_pdf_name {
            return Err(ValidationError::UnsupportedType {
                mime_type: document.mime_type.clone(),
            });
        }

        if document.size_bytes() > self.max_file_size_bytes {
            return Err(ValidationError::Oversized {
                size_bytes: document.size_bytes(),
                max_bytes: self.max_file_size_bytes,
            });
        }

        Ok(())
    }

    /// 完整校验
    pub fn validate(
        &self,
        document: &Document,
        extraction: Result<ExtractedText, ExtractionError>,
    ) -> ValidationResult {
        match self.check(document, extraction) {
            Ok(text) => {
                info!(
                    "✓ 文档校验通过: {} ({} 页, {} 词)",
                    document.filename, text.page_count, text.word_count
                );
                ValidationResult::Accepted(text)
            }
            Err(reason) => {
                warn!(
                    "❌ 文档被拒绝: {} [{}] {}",
                    document.filename,
                    reason.code(),
                    reason
                );
                ValidationResult::Rejected(reason)
            }
        }
    }

    fn check(
        &self,
        document: &Document,
        extraction: Result<ExtractedText, ExtractionError>,
    ) -> Result<ExtractedText, RejectionReason> {
        self.precheck(document)?;

        let page_notice = if document.page_count > self.max_pages {
            match self.page_limit_policy {
                PageLimitPolicy::Reject => {
                    return Err(ValidationError::TooManyPages {
                        pages: document.page_count,
                        max_pages: self.max_pages,
                    }
                    .into())
                }
                PageLimitPolicy::Truncate => Some(format!(
                    "Processing first {} pages only (document has {}).",
                    self.max_pages, document.page_count
                )),
            }
        } else {
            None
        };

        let mut text = extraction?;

        if text.word_count < self.min_word_count {
            return Err(ValidationError::InsufficientContent {
                words: text.word_count,
                min_words: self.min_word_count,
            }
            .into());
        }

        text.notice = page_notice;
        Ok(text)
    }
}
