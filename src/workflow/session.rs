//! 会话状态机 - 流程层
//!
//! `Session` 是 `SessionState` 的唯一持有者，所有变更都经过带守卫的转移。
//!
//! 阶段：Idle → Uploaded → Validated → Summarized → QuizGenerated → Submitted，
//! 任意阶段可 reset 回 Idle（完整清空）。
//!
//! 生成是两阶段的：`begin_*` 取出文本副本和会话纪元，生成完成后 `commit_*`
//! 只在纪元未变时写入。失败、取消、过期的结果都不会改动状态。

use std::collections::BTreeMap;
use std::fmt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::WorkflowError;
use crate::models::{
    Document, ExtractedText, QuizRequest, QuizResult, RejectionReason, ScoreReport,
    SummaryRequest, SummaryResult, ValidationResult,
};
use crate::services::{ContentGenerator, TextGenerator};
use crate::workflow::scoring;

/// 会话阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stage {
    #[default]
    Idle,
    /// 已上传但未通过校验
    Uploaded,
    Validated,
    Summarized,
    QuizGenerated,
    Submitted,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Idle => "Idle",
            Stage::Uploaded => "Uploaded",
            Stage::Validated => "Validated",
            Stage::Summarized => "Summarized",
            Stage::QuizGenerated => "QuizGenerated",
            Stage::Submitted => "Submitted",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 会话状态
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub stage: Stage,
    pub document: Option<Document>,
    pub validation: Option<ValidationResult>,
    pub summary: Option<SummaryResult>,
    pub quiz: Option<QuizResult>,
    /// 题目下标 → 作答
    pub answers: BTreeMap<usize, String>,
    pub submitted: bool,
    pub score: Option<ScoreReport>,
    /// 每次上传 / 重置递增，用于识别过期的生成结果
    pub epoch: u64,
}

/// 进行中的生成
///
/// 持有文本副本，生成期间不借用会话。
#[derive(Debug, Clone)]
pub struct Ticket<R> {
    pub epoch: u64,
    pub text: String,
    pub request: R,
}

pub type SummaryTicket = Ticket<SummaryRequest>;
pub type QuizTicket = Ticket<QuizRequest>;

/// 会话
#[derive(Debug, Default)]
pub struct Session {
    state: SessionState,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn stage(&self) -> Stage {
        self.state.stage
    }

    /// 通过校验的文本
    pub fn accepted_text(&self) -> Option<&ExtractedText> {
        self.state.validation.as_ref().and_then(|v| v.accepted())
    }

    pub fn rejection(&self) -> Option<&RejectionReason> {
        self.state.validation.as_ref().and_then(|v| v.rejection())
    }

    fn guard(&self, operation: &'static str, allowed: &[Stage]) -> Result<(), WorkflowError> {
        if allowed.contains(&self.state.stage) {
            Ok(())
        } else {
            Err(WorkflowError::IllegalTransition {
                operation,
                stage: self.state.stage.as_str(),
            })
        }
    }

    fn fresh_state(&self) -> SessionState {
        SessionState {
            epoch: self.state.epoch + 1,
            ..SessionState::default()
        }
    }

    /// 上传新文档（任意阶段均可，替换旧文档及其全部产物）
    ///
    /// 校验通过进入 Validated；被拒绝则停在 Uploaded 并保留拒绝原因。
    pub fn upload(&mut self, document: Document, validation: ValidationResult) -> Stage {
        let mut state = self.fresh_state();
        state.stage = if validation.is_accepted() {
            Stage::Validated
        } else {
            Stage::Uploaded
        };
        state.document = Some(document);
        state.validation = Some(validation);
        self.state = state;
        info!("📥 会话进入 {} (纪元 {})", self.state.stage, self.state.epoch);
        self.state.stage
    }

    /// 完整重置
    pub fn reset(&mut self) {
        self.state = self.fresh_state();
        info!("🔄 会话已重置 (纪元 {})", self.state.epoch);
    }

    fn validated_text(&self) -> Result<String, WorkflowError> {
        self.accepted_text()
            .map(ExtractedText::full_text)
            .ok_or(WorkflowError::NoAcceptedDocument)
    }

    fn check_ticket(&self, epoch: u64) -> Result<(), WorkflowError> {
        if epoch != self.state.epoch {
            warn!(
                "丢弃过期的生成结果 (纪元 {} ≠ 当前 {})",
                epoch, self.state.epoch
            );
            return Err(WorkflowError::StaleTicket);
        }
        Ok(())
    }

    const SUMMARY_STAGES: [Stage; 2] = [Stage::Validated, Stage::Summarized];
    const QUIZ_STAGES: [Stage; 4] = [
        Stage::Validated,
        Stage::Summarized,
        Stage::QuizGenerated,
        Stage::Submitted,
    ];

    pub fn begin_summary(&self, request: SummaryRequest) -> Result<SummaryTicket, WorkflowError> {
        self.guard("summarize", &Self::SUMMARY_STAGES)?;
        Ok(Ticket {
            epoch: self.state.epoch,
            text: self.validated_text()?,
            request,
        })
    }

    pub fn commit_summary(
        &mut self,
        ticket: &SummaryTicket,
        result: SummaryResult,
    ) -> Result<&SummaryResult, WorkflowError> {
        self.check_ticket(ticket.epoch)?;
        self.guard("summarize", &Self::SUMMARY_STAGES)?;
        self.state.stage = Stage::Summarized;
        debug!("会话进入 {}", self.state.stage);
        Ok(&*self.state.summary.insert(result))
    }

    /// 出题始终使用完整的校验文本，不使用摘要
    pub fn begin_quiz(&self, request: QuizRequest) -> Result<QuizTicket, WorkflowError> {
        self.guard("generate_quiz", &Self::QUIZ_STAGES)?;
        request.validate()?;
        Ok(Ticket {
            epoch: self.state.epoch,
            text: self.validated_text()?,
            request,
        })
    }

    /// 写入新题目，旧的作答与成绩一并清空
    pub fn commit_quiz(
        &mut self,
        ticket: &QuizTicket,
        quiz: QuizResult,
    ) -> Result<&QuizResult, WorkflowError> {
        self.check_ticket(ticket.epoch)?;
        self.guard("generate_quiz", &Self::QUIZ_STAGES)?;
        self.state.answers.clear();
        self.state.submitted = false;
        self.state.score = None;
        self.state.stage = Stage::QuizGenerated;
        debug!("会话进入 {}", self.state.stage);
        Ok(&*self.state.quiz.insert(quiz))
    }

    /// 记录一道题的作答
    ///
    /// 有选项的题目按选项匹配（忽略大小写），存储规范的选项文本；简答题允许空答案。
    pub fn record_answer(&mut self, index: usize, answer: &str) -> Result<(), WorkflowError> {
        self.guard("answer", &[Stage::QuizGenerated])?;
        let quiz = self
            .state
            .quiz
            .as_ref()
            .ok_or(WorkflowError::NoAcceptedDocument)?;
        let total = quiz.questions.len();
        let question = quiz
            .questions
            .get(index)
            .ok_or(WorkflowError::AnswerOutOfRange { index, total })?;

        let stored = question
            .canonical_response(answer)
            .ok_or_else(|| WorkflowError::InvalidAnswer {
                index,
                answer: answer.trim().to_string(),
            })?;

        self.state.answers.insert(index, stored);
        Ok(())
    }

    /// 提交并判分，必须每道题都已作答
    pub fn submit(&mut self) -> Result<&ScoreReport, WorkflowError> {
        self.guard("submit", &[Stage::QuizGenerated])?;
        let quiz = self
            .state
            .quiz
            .as_ref()
            .ok_or(WorkflowError::NoAcceptedDocument)?;
        let total = quiz.questions.len();
        let answered = (0..total)
            .filter(|i| self.state.answers.contains_key(i))
            .count();
        if answered < total {
            return Err(WorkflowError::IncompleteAnswers { answered, total });
        }

        let report = scoring::score(&quiz.questions, &self.state.answers);
        info!(
            "🏁 已提交: {}/{} ({}%)",
            report.correct, report.total, report.percentage
        );
        self.state.submitted = true;
        self.state.stage = Stage::Submitted;
        Ok(&*self.state.score.insert(report))
    }

    /// 生成摘要，可取消
    pub async fn summarize<G: TextGenerator>(
        &mut self,
        generator: &ContentGenerator<G>,
        request: SummaryRequest,
        cancel: &CancellationToken,
    ) -> Result<&SummaryResult, WorkflowError> {
        let ticket = self.begin_summary(request)?;
        let result = tokio::select! {
            _ = cancel.cancelled() => {
                warn!("⏹ 摘要生成已取消");
                return Err(WorkflowError::Cancelled);
            }
            result = generator.summarize(&ticket.text, ticket.request) => result?,
        };
        self.commit_summary(&ticket, result)
    }

    /// 生成题目，可取消
    pub async fn generate_quiz<G: TextGenerator>(
        &mut self,
        generator: &ContentGenerator<G>,
        request: QuizRequest,
        cancel: &CancellationToken,
    ) -> Result<&QuizResult, WorkflowError> {
        let ticket = self.begin_quiz(request)?;
        let result = tokio::select! {
            _ = cancel.cancelled() => {
                warn!("⏹ 出题已取消");
                return Err(WorkflowError::Cancelled);
            }
            result = generator.generate_quiz(&ticket.text, &ticket.request) => result?,
        };
        self.commit_quiz(&ticket, result)
    }
}
