//! 错误类型定义
//!
//! 每一层只暴露自己的错误枚举，`AppError` 负责在二进制入口处汇总。
//! 提取 / 校验错误对当前文档是终态；生成错误在服务层内部有限次重试后才上抛。

use serde::Serialize;
use thiserror::Error;

/// 文本提取错误
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtractionError {
    /// 文档加密，未提供口令无法读取
    #[error("PDF is password-protected. Please unlock the file and try again.")]
    Protected,

    /// 多数页面几乎没有可提取的字符（扫描件 / 纯图片）
    #[error(
        "No text found in {blank_pages} of {pages} pages. This may be a scanned or image-only PDF; OCR is not supported."
    )]
    ScanOnly { pages: usize, blank_pages: usize },

    /// 文件损坏或无法解析
    #[error("Failed to read the document: {reason}")]
    Corrupted { reason: String },
}

/// 校验策略错误
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationError {
    /// 不支持的文件类型
    #[error("Unsupported file type '{mime_type}'. Please upload a PDF file.")]
    UnsupportedType { mime_type: String },

    /// 文件过大
    #[error("File size {size_bytes} bytes exceeds the {max_bytes} byte limit.")]
    Oversized { size_bytes: u64, max_bytes: u64 },

    /// 页数过多
    #[error("Document has {pages} pages; at most {max_pages} are allowed.")]
    TooManyPages { pages: usize, max_pages: usize },

    /// 内容不足
    #[error("Insufficient content. The document must contain at least {min_words} words; found {words}.")]
    InsufficientContent { words: usize, min_words: usize },
}

/// 生成错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    /// 返回内容不符合约定结构
    #[error("generation output did not match the expected schema: {reason}")]
    SchemaMismatch { reason: String },

    /// 服务不可用（调用失败或重试耗尽）
    #[error("generation service unavailable: {reason}")]
    Unavailable { reason: String },

    /// 输入超出模型上下文
    #[error("input exceeds the model's token limit")]
    TokenLimitExceeded,

    /// 请求参数非法，未发起调用
    #[error("invalid generation request: {reason}")]
    InvalidRequest { reason: String },
}

impl GenerationError {
    pub fn schema(reason: impl Into<String>) -> Self {
        GenerationError::SchemaMismatch {
            reason: reason.into(),
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        GenerationError::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn invalid_request(reason: impl Into<String>) -> Self {
        GenerationError::InvalidRequest {
            reason: reason.into(),
        }
    }
}

/// 状态机错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    /// 当前阶段不允许该操作
    #[error("operation '{operation}' is not allowed in stage {stage}")]
    IllegalTransition {
        operation: &'static str,
        stage: &'static str,
    },

    /// 没有通过校验的文档
    #[error("no validated document is available")]
    NoAcceptedDocument,

    /// 仍有题目未作答
    #[error("please answer all questions before submitting ({answered}/{total} answered)")]
    IncompleteAnswers { answered: usize, total: usize },

    /// 题号越界
    #[error("question index {index} is out of range (quiz has {total} questions)")]
    AnswerOutOfRange { index: usize, total: usize },

    /// 选择题答案不在选项中
    #[error("answer '{answer}' is not one of the options for question {index}")]
    InvalidAnswer { index: usize, answer: String },

    /// 生成期间会话已被重置或替换
    #[error("session changed while the generation was in flight; result discarded")]
    StaleTicket,

    /// 生成被取消
    #[error("generation was cancelled")]
    Cancelled,

    #[error(transparent)]
    Generation(#[from] GenerationError),
}

/// 配置错误
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// 取值超出允许范围
    #[error("config value '{field}' is invalid: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    /// 配置文件解析失败
    #[error("failed to parse config file {path}: {reason}")]
    ParseFailed { path: String, reason: String },
}

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("file error ({path}): {source}")]
    File {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AppError {
    /// 创建文件读写错误
    pub fn file(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File {
            path: path.into(),
            source,
        }
    }
}

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workflow_error_wraps_generation_error() {
        let err: WorkflowError = GenerationError::TokenLimitExceeded.into();
        assert_eq!(
            err,
            WorkflowError::Generation(GenerationError::TokenLimitExceeded)
        );
        assert_eq!(err.to_string(), "input exceeds the model's token limit");
    }

    #[test]
    fn test_rejection_messages_are_actionable() {
        let msg = ExtractionError::Protected.to_string();
        assert!(msg.contains("unlock"));

        let msg = ValidationError::InsufficientContent {
            words: 12,
            min_words: 100,
        }
        .to_string();
        assert!(msg.contains("100"));
        assert!(msg.contains("12"));
    }

    #[test]
    fn test_extraction_error_serializes_with_kind_tag() {
        let value = serde_json::to_value(ExtractionError::ScanOnly {
            pages: 3,
            blank_pages: 3,
        })
        .unwrap();
        assert_eq!(value["kind"], "scan_only");
        assert_eq!(value["blank_pages"], 3);
    }
}
