//! 应用驱动 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：校验配置、创建 LLM 服务和各流程对象
//! 2. **命令调度**：把 CLI 子命令翻译成会话上的操作
//! 3. **取消**：Ctrl-C 取消正在进行的生成，会话状态保持不变
//! 4. **结果输出**：结果打印到 stdout，并导出到 `output_dir`
//!
//! 本层不做业务判断，拒绝原因、重试、判分都在下层完成。

use anyhow::{anyhow, bail, Context, Result};
use clap::Subcommand;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::WorkflowError;
use crate::models::{
    Difficulty, LengthTier, Question, QuestionType, QuizRequest, QuizResult, SummaryFormat,
    SummaryRequest, SummaryResult, ValidationReport,
};
use crate::services::export_writer::render_results_text;
use crate::services::schema::parse_question;
use crate::services::{ContentGenerator, ExportWriter, LlmService, TextGenerator};
use crate::utils::logging::{log_startup, truncate_text};
use crate::workflow::{scoring, IngestFlow, Session};

/// 子命令
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// 接入并校验文档，输出 JSON 报告
    Inspect { pdf: PathBuf },

    /// 生成摘要
    Summarize {
        pdf: PathBuf,
        #[arg(long, default_value = "standard")]
        length: LengthTier,
        #[arg(long, default_value = "paragraphs")]
        format: SummaryFormat,
    },

    /// 生成题目并导出 JSON
    Quiz {
        pdf: PathBuf,
        #[arg(long, default_value_t = 5)]
        count: usize,
        #[arg(long, value_delimiter = ',', default_values_t = [QuestionType::Mcq, QuestionType::TrueFalse])]
        types: Vec<QuestionType>,
        #[arg(long, default_value = "medium")]
        difficulty: Difficulty,
    },

    /// 对已保存的题目和作答判分
    Grade {
        /// `<name>_quiz.json`
        quiz: PathBuf,
        /// 作答数组（按题序的字符串）
        answers: PathBuf,
    },

    /// 完整流程：摘要 → 出题 → 从 stdin 作答 → 判分
    Interactive {
        pdf: PathBuf,
        #[arg(long, default_value = "standard")]
        length: LengthTier,
        #[arg(long, default_value = "paragraphs")]
        format: SummaryFormat,
        #[arg(long, default_value_t = 5)]
        count: usize,
        #[arg(long, value_delimiter = ',', default_values_t = [QuestionType::Mcq, QuestionType::TrueFalse])]
        types: Vec<QuestionType>,
        #[arg(long, default_value = "medium")]
        difficulty: Difficulty,
    },
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::Inspect { .. } => "inspect",
            Command::Summarize { .. } => "summarize",
            Command::Quiz { .. } => "quiz",
            Command::Grade { .. } => "grade",
            Command::Interactive { .. } => "interactive",
        }
    }
}

/// 应用主结构
pub struct App<G: TextGenerator = LlmService> {
    ingest: IngestFlow,
    generator: ContentGenerator<G>,
    exporter: ExportWriter,
    cancel: CancellationToken,
    model_name: String,
}

impl App<LlmService> {
    /// 初始化应用
    pub fn initialize(config: Config) -> Result<Self> {
        config.validate().context("配置无效")?;
        if config.llm_api_key.is_empty() {
            warn!("⚠️ 未设置 LLM_API_KEY，生成类命令将会失败");
        }
        let llm = LlmService::new(&config);
        Ok(Self::with_generator(&config, llm))
    }
}

impl<G: TextGenerator> App<G> {
    pub fn with_generator(config: &Config, generator: G) -> Self {
        Self {
            ingest: IngestFlow::new(config),
            generator: ContentGenerator::new(generator, config),
            exporter: ExportWriter::new(&config.output_dir),
            cancel: CancellationToken::new(),
            model_name: config.llm_model_name.clone(),
        }
    }

    /// 取消令牌，取消后正在进行的生成会被丢弃
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// 运行一个子命令
    pub async fn run(&self, command: Command) -> Result<()> {
        log_startup(command.name(), &self.model_name);
        self.watch_ctrl_c();

        match command {
            Command::Inspect { pdf } => self.inspect(&pdf).await,
            Command::Summarize {
                pdf,
                length,
                format,
            } => {
                let (mut session, name) = self.open(&pdf).await?;
                let summary = self
                    .summarize(&mut session, SummaryRequest::new(length, format))
                    .await?;
                self.exporter.write_summary(&name, &summary).await?;
                Ok(())
            }
            Command::Quiz {
                pdf,
                count,
                types,
                difficulty,
            } => {
                let (mut session, name) = self.open(&pdf).await?;
                let quiz = self
                    .generate_quiz(&mut session, QuizRequest::new(count, types, difficulty))
                    .await?;
                let path = self.exporter.write_quiz(&name, &quiz).await?;
                println!("Quiz saved to {}", path.display());
                Ok(())
            }
            Command::Grade { quiz, answers } => self.grade(&quiz, &answers).await,
            Command::Interactive {
                pdf,
                length,
                format,
                count,
                types,
                difficulty,
            } => {
                self.interactive(
                    &pdf,
                    SummaryRequest::new(length, format),
                    QuizRequest::new(count, types, difficulty),
                )
                .await
            }
        }
    }

    fn watch_ctrl_c(&self) {
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("收到 Ctrl-C，取消当前生成");
                cancel.cancel();
            }
        });
    }

    async fn inspect(&self, pdf: &Path) -> Result<()> {
        let (document, result) = self.ingest.ingest_file(pdf).await?;
        let report = ValidationReport::new(&document, &result);
        println!("{}", serde_json::to_string_pretty(&report)?);
        Ok(())
    }

    /// 接入文档并建立会话，被拒绝时带原因退出
    async fn open(&self, pdf: &Path) -> Result<(Session, String)> {
        let (document, result) = self.ingest.ingest_file(pdf).await?;
        let name = document.stem().to_string();

        let mut session = Session::new();
        session.upload(document, result);
        if let Some(reason) = session.rejection() {
            error!("❌ 文档无法处理 [{}]", reason.code());
            bail!("{}", reason);
        }
        if let Some(notice) = session.accepted_text().and_then(|t| t.notice.as_deref()) {
            println!("{}", notice);
        }
        Ok((session, name))
    }

    async fn summarize(&self, session: &mut Session, request: SummaryRequest) -> Result<SummaryResult> {
        let summary = session
            .summarize(&self.generator, request, &self.cancel)
            .await?
            .clone();

        println!("{}\n", summary.summary);
        if !summary.key_topics.is_empty() {
            println!("Key topics: {}", summary.key_topics.join(", "));
        }
        let (min, max) = request.length.word_range();
        println!(
            "Word count: {} (target {}-{}{})",
            summary.word_count,
            min,
            max,
            if summary.conforming { "" } else { ", outside target" }
        );
        if summary.input_truncated {
            println!("Note: the document was shortened to fit the model's input limit.");
        }
        Ok(summary)
    }

    async fn generate_quiz(&self, session: &mut Session, request: QuizRequest) -> Result<QuizResult> {
        let quiz = session
            .generate_quiz(&self.generator, request, &self.cancel)
            .await?
            .clone();
        if let Some(warning) = &quiz.warning {
            println!("Warning: {}", warning);
        }
        info!("✓ 共 {} 道题", quiz.len());
        Ok(quiz)
    }

    async fn grade(&self, quiz_path: &Path, answers_path: &Path) -> Result<()> {
        let quiz_text = tokio::fs::read_to_string(quiz_path)
            .await
            .with_context(|| format!("无法读取题目文件: {}", quiz_path.display()))?;
        let mut quiz: QuizResult = serde_json::from_str(&quiz_text).context("题目文件格式错误")?;
        // 外部文件按生成时同样的规则复核
        for (index, question) in quiz.questions.iter_mut().enumerate() {
            let value = serde_json::to_value(&*question)?;
            *question = parse_question(&value)
                .map_err(|e| anyhow!("question {} is invalid: {}", index + 1, e))?;
        }

        let answers_text = tokio::fs::read_to_string(answers_path)
            .await
            .with_context(|| format!("无法读取作答文件: {}", answers_path.display()))?;
        let answers: Vec<String> =
            serde_json::from_str(&answers_text).context("作答文件应为字符串数组")?;
        if answers.len() != quiz.len() {
            bail!(
                "answer count {} does not match question count {}",
                answers.len(),
                quiz.len()
            );
        }

        let mut normalized = BTreeMap::new();
        for (index, (question, answer)) in quiz.questions.iter().zip(answers).enumerate() {
            let resolved = resolve_choice(question, &answer);
            let stored = question.canonical_response(&resolved).ok_or_else(|| {
                WorkflowError::InvalidAnswer {
                    index,
                    answer: resolved.clone(),
                }
            })?;
            normalized.insert(index, stored);
        }
        let answers = normalized;
        let report = scoring::score(&quiz.questions, &answers);
        println!("{}", render_results_text(&report));

        let name = quiz_path
            .file_stem()
            .map(|s| s.to_string_lossy().trim_end_matches("_quiz").to_string())
            .unwrap_or_else(|| "quiz".to_string());
        self.exporter.write_results(&name, &report).await?;
        Ok(())
    }

    async fn interactive(
        &self,
        pdf: &Path,
        summary_request: SummaryRequest,
        quiz_request: QuizRequest,
    ) -> Result<()> {
        let (mut session, name) = self.open(pdf).await?;

        let summary = self.summarize(&mut session, summary_request).await?;
        self.exporter.write_summary(&name, &summary).await?;

        let quiz = self.generate_quiz(&mut session, quiz_request).await?;
        self.exporter.write_quiz(&name, &quiz).await?;

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        for (index, question) in quiz.questions.iter().enumerate() {
            print_question(index, question);
            loop {
                let line = tokio::select! {
                    _ = self.cancel.cancelled() => bail!("cancelled"),
                    line = lines.next_line() => line?,
                };
                let Some(line) = line else {
                    bail!("input closed before all questions were answered");
                };
                match session.record_answer(index, &resolve_choice(question, &line)) {
                    Ok(()) => break,
                    Err(e) => println!("{} Try again:", e),
                }
            }
        }

        let report = session.submit()?.clone();
        println!("\n{}", render_results_text(&report));
        self.exporter.write_results(&name, &report).await?;
        Ok(())
    }
}

/// 选择题允许用字母 / 序号作答
fn resolve_choice(question: &Question, input: &str) -> String {
    let input = input.trim();
    let Some(options) = question.options.as_ref().filter(|_| question.question_type.has_options())
    else {
        return input.to_string();
    };

    let index = match input.chars().collect::<Vec<_>>().as_slice() {
        [c] if c.is_ascii_alphabetic() => Some((c.to_ascii_uppercase() as u8 - b'A') as usize),
        [c] if c.is_ascii_digit() => (*c as u8 - b'0').checked_sub(1).map(usize::from),
        _ => None,
    };
    match index.and_then(|i| options.get(i)) {
        Some(option) if question.question_type == QuestionType::Mcq => option.clone(),
        _ => input.to_string(),
    }
}

fn print_question(index: usize, question: &Question) {
    println!("\nQ{}. {}", index + 1, question.question);
    match &question.options {
        Some(options) if question.question_type == QuestionType::Mcq => {
            for (i, option) in options.iter().enumerate() {
                println!("  {}) {}", (b'A' + i as u8) as char, option);
            }
        }
        Some(options) => println!("  ({})", options.join(" / ")),
        None => println!("  (short answer)"),
    }
    info!("题目 {} 预览: {}", index + 1, truncate_text(&question.question, 40));
}
