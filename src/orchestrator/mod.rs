//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 把 CLI 子命令翻译成会话操作，是整个系统的"指挥中心"。
//!
//! ## 层次关系
//!
//! ```text
//! app (处理一个子命令)
//!     ↓
//! workflow::IngestFlow / Session (接入流程、状态机、判分)
//!     ↓
//! services (能力层：extract / validate / budget / generate / export)
//!     ↓
//! infrastructure (基础设施：PdfSource)
//! ```
//!
//! ## 设计原则
//!
//! 1. **资源隔离**：只有编排层持有取消令牌和 LLM 服务
//! 2. **向下依赖**：编排层 → workflow → services → infrastructure
//! 3. **无业务逻辑**：只做调度和输出，不做具体业务判断

pub mod app;

pub use app::{App, Command};
