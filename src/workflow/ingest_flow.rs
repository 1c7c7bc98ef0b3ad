//! 文档接入流程 - 流程层
//!
//! 流程顺序：
//! 1. 类型 / 大小预检（不解析内容）
//! 2. 解析 PDF，回填页数
//! 3. 提取文本
//! 4. 完整校验
//!
//! 任一步失败都产出一个带具体原因的 `Rejected`，不会抛出。

use std::path::Path;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::infrastructure::{guess_mime_type, PageSource, PdfSource};
use crate::models::{Document, ValidationResult};
use crate::services::{Extractor, Validator};

/// 文档接入流程
pub struct IngestFlow {
    extractor: Extractor,
    validator: Validator,
}

impl IngestFlow {
    pub fn new(config: &Config) -> Self {
        Self {
            extractor: Extractor::new(config),
            validator: Validator::new(config),
        }
    }

    /// 读取文件并接入，MIME 类型按扩展名推断
    pub async fn ingest_file(&self, path: &Path) -> AppResult<(Document, ValidationResult)> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| AppError::file(path.display().to_string(), e))?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let mime_type = guess_mime_type(&filename);
        Ok(self.ingest(filename, mime_type, bytes))
    }

    /// 接入一份上传的文档
    pub fn ingest(
        &self,
        filename: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> (Document, ValidationResult) {
        let document = Document::new(filename, mime_type, bytes);
        info!(
            "📄 接入文档: {} ({} 字节, {})",
            document.filename,
            document.size_bytes(),
            document.mime_type
        );

        // 超大或非 PDF 文件不必解析
        if let Err(e) = self.validator.precheck(&document) {
            warn!("❌ 文档被拒绝: {} {}", document.filename, e);
            return (document, ValidationResult::Rejected(e.into()));
        }

        match PdfSource::load(&document.bytes) {
            Ok(source) => self.ingest_source(document, &source),
            Err(e) => {
                let result = self.validator.validate(&document, Err(e));
                (document, result)
            }
        }
    }

    /// 从任意页面来源接入
    pub fn ingest_source(
        &self,
        document: Document,
        source: &dyn PageSource,
    ) -> (Document, ValidationResult) {
        let document = document.with_page_count(source.page_count());
        let extraction = self.extractor.extract(source);
        let result = self.validator.validate(&document, extraction);
        (document, result)
    }
}
