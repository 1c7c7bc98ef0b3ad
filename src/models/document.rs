use serde::{Deserialize, Serialize};

use crate::error::{ExtractionError, ValidationError};
use crate::utils::text::count_words;

/// 上传的文档
///
/// `page_count` 在解析之前为 0，由提取流程回填。
#[derive(Debug, Clone)]
pub struct Document {
    pub filename: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
    pub page_count: usize,
}

impl Document {
    pub fn new(filename: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            mime_type: mime_type.into(),
            bytes,
            page_count: 0,
        }
    }

    pub fn with_page_count(mut self, page_count: usize) -> Self {
        self.page_count = page_count;
        self
    }

    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// 去掉扩展名的文件名，用于导出文件命名
    pub fn stem(&self) -> &str {
        match self.filename.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => &self.filename,
        }
    }
}

/// 提取出的文本，按页有序
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedText {
    pub pages: Vec<String>,
    pub word_count: usize,
    /// 文档总页数（可能大于实际读取的页数）
    pub page_count: usize,
    /// 页数超限且策略为截断时的提示
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

impl ExtractedText {
    pub fn new(pages: Vec<String>, page_count: usize) -> Self {
        let word_count = pages.iter().map(|p| count_words(p)).sum();
        Self {
            pages,
            word_count,
            page_count,
            notice: None,
        }
    }

    pub fn pages_read(&self) -> usize {
        self.pages.len()
    }

    /// 按页序拼接的全文
    pub fn full_text(&self) -> String {
        self.pages.join("\n")
    }

    pub fn is_blank(&self) -> bool {
        self.pages.iter().all(|p| p.trim().is_empty())
    }
}

/// 拒绝原因（封闭集合）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RejectionReason {
    Extraction(ExtractionError),
    Validation(ValidationError),
}

impl RejectionReason {
    /// 稳定的机器可读代码
    pub fn code(&self) -> &'static str {
        match self {
            RejectionReason::Extraction(ExtractionError::Protected) => "protected",
            RejectionReason::Extraction(ExtractionError::ScanOnly { .. }) => "scan_only",
            RejectionReason::Extraction(ExtractionError::Corrupted { .. }) => "corrupted",
            RejectionReason::Validation(ValidationError::UnsupportedType { .. }) => {
                "unsupported_type"
            }
            RejectionReason::Validation(ValidationError::Oversized { .. }) => "oversized",
            RejectionReason::Validation(ValidationError::TooManyPages { .. }) => "too_many_pages",
            RejectionReason::Validation(ValidationError::InsufficientContent { .. }) => {
                "insufficient_content"
            }
        }
    }
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectionReason::Extraction(e) => write!(f, "{}", e),
            RejectionReason::Validation(e) => write!(f, "{}", e),
        }
    }
}

impl From<ExtractionError> for RejectionReason {
    fn from(err: ExtractionError) -> Self {
        RejectionReason::Extraction(err)
    }
}

impl From<ValidationError> for RejectionReason {
    fn from(err: ValidationError) -> Self {
        RejectionReason::Validation(err)
    }
}

/// 校验结果
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationResult {
    Accepted(ExtractedText),
    Rejected(RejectionReason),
}

impl ValidationResult {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ValidationResult::Accepted(_))
    }

    pub fn accepted(&self) -> Option<&ExtractedText> {
        match self {
            ValidationResult::Accepted(text) => Some(text),
            ValidationResult::Rejected(_) => None,
        }
    }

    pub fn rejection(&self) -> Option<&RejectionReason> {
        match self {
            ValidationResult::Accepted(_) => None,
            ValidationResult::Rejected(reason) => Some(reason),
        }
    }
}

/// 校验结果的可序列化报告（供 `inspect` 输出）
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub filename: String,
    pub size_bytes: u64,
    pub page_count: usize,
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub word_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ValidationReport {
    pub fn new(document: &Document, result: &ValidationResult) -> Self {
        let extracted = result.accepted();
        let rejection = result.rejection();
        Self {
            filename: document.filename.clone(),
            size_bytes: document.size_bytes(),
            page_count: document.page_count,
            accepted: result.is_accepted(),
            word_count: extracted.map(|t| t.word_count),
            notice: extracted.and_then(|t| t.notice.clone()),
            rejection_code: rejection.map(|r| r.code()),
            message: rejection.map(|r| r.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracted_text_counts_words_across_pages() {
        let text = ExtractedText::new(
            vec!["one two three".to_string(), "four\nfive".to_string()],
            2,
        );
        assert_eq!(text.word_count, 5);
        assert_eq!(text.full_text(), "one two three\nfour\nfive");
        assert!(!text.is_blank());
    }

    #[test]
    fn test_document_stem() {
        let doc = Document::new("report.final.pdf", "application/pdf", vec![]);
        assert_eq!(doc.stem(), "report.final");
        let doc = Document::new("notes", "application/pdf", vec![]);
        assert_eq!(doc.stem(), "notes");
    }

    #[test]
    fn test_rejection_codes() {
        let reason: RejectionReason = ExtractionError::Protected.into();
        assert_eq!(reason.code(), "protected");
        let reason: RejectionReason = ValidationError::Oversized {
            size_bytes: 2,
            max_bytes: 1,
        }
        .into();
        assert_eq!(reason.code(), "oversized");
    }
}
