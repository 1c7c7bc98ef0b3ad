pub mod budgeter;
pub mod export_writer;
pub mod extractor;
pub mod generator;
pub mod llm_service;
pub mod prompts;
pub mod schema;
pub mod text_generator;
pub mod validator;

pub use budgeter::{estimate_tokens, BudgetStrategy, BudgetedText, Budgeter};
pub use export_writer::ExportWriter;
pub use extractor::Extractor;
pub use generator::ContentGenerator;
pub use llm_service::LlmService;
pub use text_generator::{Prompt, TextGenerator};
pub use validator::Validator;
