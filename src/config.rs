use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

use crate::error::{AppError, AppResult, ConfigError};

/// 页数超限时的处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageLimitPolicy {
    /// 直接拒绝
    Reject,
    /// 只处理前 `max_pages` 页并给出提示
    Truncate,
}

impl FromStr for PageLimitPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(PageLimitPolicy::Reject),
            "truncate" => Ok(PageLimitPolicy::Truncate),
            other => Err(format!("unknown page limit policy '{}'", other)),
        }
    }
}

/// 超出 token 预算时的处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetStrategyKind {
    /// 保留开头和结尾，省略中间
    HeadTail,
    /// 分块摘要后合并
    ChunkMerge,
}

impl FromStr for BudgetStrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "head_tail" => Ok(BudgetStrategyKind::HeadTail),
            "chunk_merge" => Ok(BudgetStrategyKind::ChunkMerge),
            other => Err(format!("unknown budget strategy '{}'", other)),
        }
    }
}

/// 程序配置
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // --- 文档策略 ---
    /// 文件大小上限（字节）
    pub max_file_size_bytes: u64,
    /// 页数上限
    pub max_pages: usize,
    /// 最少词数
    pub min_word_count: usize,
    /// 页数超限策略
    pub page_limit_policy: PageLimitPolicy,
    /// 少于该可见字符数的页视为空白页
    pub blank_page_chars: usize,
    // --- 预算 ---
    /// 送入模型的 token 上限
    pub max_generation_tokens: usize,
    pub budget_strategy: BudgetStrategyKind,
    /// 头尾截断时开头所占份额
    pub head_share: f64,
    /// 遇到上下文超限时最多收紧几次预算
    pub max_budget_tightenings: u32,
    /// 摘要词数容差（比例）
    pub summary_tolerance: f64,
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    pub llm_temperature: f32,
    pub llm_max_output_tokens: u32,
    // --- 输出 ---
    /// 导出文件目录
    pub output_dir: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_file_size_bytes: 10 * 1024 * 1024,
            max_pages: 50,
            min_word_count: 100,
            page_limit_policy: PageLimitPolicy::Reject,
            blank_page_chars: 10,
            max_generation_tokens: 50_000,
            budget_strategy: BudgetStrategyKind::HeadTail,
            head_share: 0.7,
            max_budget_tightenings: 2,
            summary_tolerance: 0.2,
            llm_api_key: String::new(),
            llm_api_base_url: "https://api.openai.com/v1".to_string(),
            llm_model_name: "gpt-4o-mini".to_string(),
            llm_temperature: 0.3,
            llm_max_output_tokens: 4096,
            output_dir: "output".to_string(),
            verbose_logging: false,
        }
    }
}

/// 读取环境变量，解析失败时回退到默认值
fn env_or<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// 用环境变量覆盖已有配置
    pub fn with_env_overrides(self) -> Self {
        Self {
            max_file_size_bytes: env_or("MAX_FILE_SIZE_BYTES", self.max_file_size_bytes),
            max_pages: env_or("MAX_PAGES", self.max_pages),
            min_word_count: env_or("MIN_WORD_COUNT", self.min_word_count),
            page_limit_policy: env_or("PAGE_LIMIT_POLICY", self.page_limit_policy),
            blank_page_chars: env_or("BLANK_PAGE_CHARS", self.blank_page_chars),
            max_generation_tokens: env_or("MAX_GENERATION_TOKENS", self.max_generation_tokens),
            budget_strategy: env_or("BUDGET_STRATEGY", self.budget_strategy),
            head_share: env_or("HEAD_SHARE", self.head_share),
            max_budget_tightenings: env_or("MAX_BUDGET_TIGHTENINGS", self.max_budget_tightenings),
            summary_tolerance: env_or("SUMMARY_TOLERANCE", self.summary_tolerance),
            llm_api_key: env_or("LLM_API_KEY", self.llm_api_key),
            llm_api_base_url: env_or("LLM_API_BASE_URL", self.llm_api_base_url),
            llm_model_name: env_or("LLM_MODEL_NAME", self.llm_model_name),
            llm_temperature: env_or("LLM_TEMPERATURE", self.llm_temperature),
            llm_max_output_tokens: env_or("LLM_MAX_OUTPUT_TOKENS", self.llm_max_output_tokens),
            output_dir: env_or("OUTPUT_DIR", self.output_dir),
            verbose_logging: env_or("VERBOSE_LOGGING", self.verbose_logging),
        }
    }

    /// 从 TOML 文件加载配置，缺省字段取默认值
    pub async fn from_toml_file(path: &Path) -> AppResult<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| AppError::file(path.display().to_string(), e))?;

        Self::from_toml_str(&content).map_err(|e| match e {
            ConfigError::ParseFailed { reason, .. } => ConfigError::ParseFailed {
                path: path.display().to_string(),
                reason,
            }
            .into(),
            other => other.into(),
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content).map_err(|e| ConfigError::ParseFailed {
            path: String::new(),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_file_size_bytes == 0 {
            return Err(invalid("max_file_size_bytes", "must be greater than 0"));
        }
        if self.max_pages == 0 {
            return Err(invalid("max_pages", "must be greater than 0"));
        }
        if self.max_generation_tokens < crate::services::budgeter::MIN_TOKEN_BUDGET {
            return Err(invalid(
                "max_generation_tokens",
                format!(
                    "must be at least {}",
                    crate::services::budgeter::MIN_TOKEN_BUDGET
                ),
            ));
        }
        if !(self.head_share > 0.0 && self.head_share < 1.0) {
            return Err(invalid("head_share", "must be strictly between 0 and 1"));
        }
        if !(0.0..1.0).contains(&self.summary_tolerance) {
            return Err(invalid("summary_tolerance", "must be in [0, 1)"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        field,
        reason: reason.into(),
    }
}
