//! # Doc Quiz
//!
//! 把上传的 PDF 变成摘要和测验题的内容流水线
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 唯一持有解析后 PDF 的地方，只暴露"按页取文本"能力
//! - `PdfSource` - 基于 lopdf 的页面来源
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，每个服务只做一件事
//! - `Extractor` / `Validator` - 文本提取与有序策略校验
//! - `Budgeter` - token 预算（头尾保留 / 分块合并）
//! - `ContentGenerator` - 摘要与出题的生成契约（结构校验、修复、重试）
//! - `LlmService` - 兼容 OpenAI 的模型调用
//! - `ExportWriter` - 导出结果文件
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 接入流程、会话状态机、判分
//! - `IngestFlow` - 预检 → 解析 → 提取 → 校验
//! - `Session` - 带守卫的阶段转移，生成结果原子提交
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/app` - CLI 子命令驱动
//!
//! ## 模块结构

pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{Question, QuizRequest, QuizResult, SummaryRequest, SummaryResult};
pub use orchestrator::{App, Command};
pub use services::{ContentGenerator, Prompt, TextGenerator};
pub use workflow::{IngestFlow, Session, Stage};
