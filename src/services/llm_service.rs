//! LLM 服务 - 业务能力层
//!
//! 只负责"把提示词发给模型并拿回 JSON"，不关心摘要 / 出题的业务规则
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 支持自定义 API 端点和模型
//! - 兼容 OpenAI API 的服务（如 Azure, Gemini, Doubao 等）

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::GenerationError;
use crate::services::text_generator::{parse_json_reply, Prompt, TextGenerator};

/// 提供商返回的上下文超限错误特征
const TOKEN_LIMIT_MARKERS: [&str; 4] = [
    "context_length_exceeded",
    "maximum context length",
    "too many tokens",
    "context window",
];

/// LLM 服务
///
/// 职责：
/// - 调用兼容 OpenAI 的聊天接口
/// - 把 JSON 结构要求写进系统消息
/// - 把回复解析成 JSON，区分上下文超限和其他失败
/// - 不做重试，重试策略由生成契约层决定
pub struct LlmService {
    client: Client<OpenAIConfig>,
    model_name: String,
    temperature: f32,
    max_output_tokens: u32,
}

impl LlmService {
    /// 创建新的 LLM 服务
    pub fn new(config: &Config) -> Self {
        // 配置 OpenAI 客户端（兼容 OpenAI API 的服务）
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        let client = Client::with_config(openai_config);

        Self {
            client,
            model_name: config.llm_model_name.clone(),
            temperature: config.llm_temperature,
            max_output_tokens: config.llm_max_output_tokens,
        }
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// 通用的 LLM 调用函数
    ///
    /// # 参数
    /// - `user_message`: 用户消息内容
    /// - `system_message`: 系统消息（可选）
    ///
    /// # 返回
    /// 返回 LLM 的响应内容（字符串）
    pub async fn send_to_llm(
        &self,
        user_message: &str,
        system_message: Option<&str>,
    ) -> Result<String, GenerationError> {
        debug!("调用 LLM API，模型: {}", self.model_name);
        debug!("用户消息长度: {} 字符", user_message.len());

        // 构建消息列表
        let mut messages = Vec::new();

        if let Some(sys_msg) = system_message {
            let system_msg = ChatCompletionRequestSystemMessageArgs::default()
                .content(sys_msg)
                .build()
                .map_err(|e| GenerationError::invalid_request(e.to_string()))?;
            messages.push(ChatCompletionRequestMessage::System(system_msg));
        }

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(user_message)
            .build()
            .map_err(|e| GenerationError::invalid_request(e.to_string()))?;
        messages.push(ChatCompletionRequestMessage::User(user_msg));

        // 构建请求
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(messages)
            .temperature(self.temperature)
            .max_tokens(self.max_output_tokens)
            .build()
            .map_err(|e| GenerationError::invalid_request(e.to_string()))?;

        // 调用 API
        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("LLM API 调用失败: {}", e);
            classify_api_error(&e.to_string())
        })?;

        debug!("LLM API 调用成功");

        // 提取响应内容
        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| GenerationError::schema("LLM returned no content"))?;

        Ok(content.trim().to_string())
    }

    /// 在系统消息后附上 JSON 结构要求
    fn build_system_message(prompt: &Prompt, schema: &Value) -> String {
        let schema_text = serde_json::to_string_pretty(schema).unwrap_or_default();
        let mut system = format!(
            "{}\n\nRespond with a single JSON object that conforms to this JSON Schema:\n{}",
            prompt.system, schema_text
        );
        if prompt.strict {
            system.push_str(
                "\n\nSTRICT FORMAT: your previous answer could not be parsed. Return ONLY the raw JSON object. \
                 Do not wrap it in markdown, do not add commentary, and include every required field.",
            );
        }
        system
    }
}

#[async_trait]
impl TextGenerator for LlmService {
    async fn generate(&self, prompt: &Prompt, schema: &Value) -> Result<Value, GenerationError> {
        let system = Self::build_system_message(prompt, schema);
        let reply = self.send_to_llm(&prompt.user, Some(&system)).await?;
        parse_json_reply(&reply)
    }
}

/// 区分上下文超限和其他调用失败
fn classify_api_error(message: &str) -> GenerationError {
    let lower = message.to_lowercase();
    if TOKEN_LIMIT_MARKERS.iter().any(|m| lower.contains(m)) {
        GenerationError::TokenLimitExceeded
    } else {
        GenerationError::unavailable(message)
    }
}
