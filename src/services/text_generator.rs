//! 生成边界
//!
//! 核心逻辑只认识 `TextGenerator`：输入提示词和期望的 JSON 结构，输出 JSON 值或错误。
//! 具体走哪个模型服务由实现决定。

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

use crate::error::GenerationError;

/// 一次生成调用的提示词
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
    /// 严格模式：上次输出无法解析，要求只输出 JSON
    pub strict: bool,
}

impl Prompt {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            strict: false,
        }
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

/// 结构化生成能力
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// 生成一个符合 `schema` 的 JSON 值
    ///
    /// 输入超出模型上下文时返回 `TokenLimitExceeded`，调用方据此收紧预算后重试。
    async fn generate(&self, prompt: &Prompt, schema: &Value) -> Result<Value, GenerationError>;
}

fn fence_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```(?:json|JSON)?\s*(.*?)\s*```").ok())
        .as_ref()
}

/// 从模型回复中解析 JSON 对象
///
/// 容忍 Markdown 代码块包裹和前后的说明文字。
pub fn parse_json_reply(reply: &str) -> Result<Value, GenerationError> {
    let trimmed = reply.trim();
    if trimmed.is_empty() {
        return Err(GenerationError::schema("empty response"));
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Ok(value);
    }

    if let Some(caps) = fence_regex().and_then(|re| re.captures(trimmed)) {
        if let Ok(value) = serde_json::from_str::<Value>(&caps[1]) {
            return Ok(value);
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            if let Ok(value) = serde_json::from_str::<Value>(&trimmed[start..=end]) {
                return Ok(value);
            }
        }
    }

    Err(GenerationError::schema("response is not valid JSON"))
}
