//! 生成契约服务 - 业务能力层
//!
//! 在 `TextGenerator` 之上实现摘要与出题的约定：
//! - 输入先经过 token 预算
//! - 输出结构不符时用严格提示词重试一次，仍失败则返回 `Unavailable`
//! - 上下文超限时收紧预算重试，次数用尽后上抛 `TokenLimitExceeded`
//! - 题目按题位填充，缺题补生成一次，仍不足时带提示返回

use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::config::{BudgetStrategyKind, Config};
use crate::error::GenerationError;
use crate::models::{Question, QuestionType, QuizRequest, QuizResult, SummaryFormat, SummaryRequest, SummaryResult};
use crate::services::budgeter::{estimate_tokens, BudgetedText, Budgeter, MIN_TOKEN_BUDGET};
use crate::services::prompts::{chunk_prompt, quiz_prompt, summary_prompt};
use crate::services::schema::{parse_questions, parse_summary, quiz_schema, summary_schema};
use crate::services::text_generator::{Prompt, TextGenerator};

/// 每次生成最多调用次数（首次 + 严格重试）
const MAX_ATTEMPTS: usize = 2;

/// 生成契约服务
pub struct ContentGenerator<G: TextGenerator> {
    generator: G,
    budgeter: Budgeter,
    strategy: BudgetStrategyKind,
    max_tightenings: u32,
    summary_tolerance: f64,
}

impl<G: TextGenerator> ContentGenerator<G> {
    pub fn new(generator: G, config: &Config) -> Self {
        Self {
            generator,
            budgeter: Budgeter::new(config),
            strategy: config.budget_strategy,
            max_tightenings: config.max_budget_tightenings,
            summary_tolerance: config.summary_tolerance,
        }
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// 生成摘要
    pub async fn summarize(
        &self,
        text: &str,
        request: SummaryRequest,
    ) -> Result<SummaryResult, GenerationError> {
        info!(
            "📝 开始生成摘要: {} / {}",
            request.length, request.format
        );

        let mut budgeter = self.budgeter;
        let mut tightenings = 0;
        loop {
            match self.summarize_within(text, request, budgeter).await {
                Err(GenerationError::TokenLimitExceeded) if tightenings < self.max_tightenings => {
                    tightenings += 1;
                    budgeter = budgeter.tightened();
                    warn!(
                        "⚠️ 输入超出模型上下文，收紧预算到 {} tokens（第 {} 次）",
                        budgeter.max_tokens(),
                        tightenings
                    );
                }
                result => return result,
            }
        }
    }

    async fn summarize_within(
        &self,
        text: &str,
        request: SummaryRequest,
        budgeter: Budgeter,
    ) -> Result<SummaryResult, GenerationError> {
        let input = match self.strategy {
            BudgetStrategyKind::ChunkMerge if !budgeter.fits(text) => {
                self.chunk_and_merge(text, budgeter).await?
            }
            _ => budgeter.bound(text),
        };

        let output = self
            .call_with_retry(summary_prompt(&input.text, request), &summary_schema(), |v| {
                parse_summary(v, request)
            })
            .await?;

        let result = SummaryResult::new(
            output.summary,
            output.key_topics,
            request,
            self.summary_tolerance,
            input.truncated,
        );
        if result.conforming {
            info!("✓ 摘要生成完成: {} 词", result.word_count);
        } else {
            let (min, max) = request.length.word_range();
            warn!(
                "⚠️ 摘要词数 {} 不在 {}-{} 区间内，已标记为不符合",
                result.word_count, min, max
            );
        }
        Ok(result)
    }

    /// 分块压缩后合并，合并结果仍超预算时再做头尾截断
    async fn chunk_and_merge(
        &self,
        text: &str,
        budgeter: Budgeter,
    ) -> Result<BudgetedText, GenerationError> {
        let chunk_tokens = (budgeter.max_tokens() / 2).max(MIN_TOKEN_BUDGET);
        let chunks = budgeter.chunk(text, chunk_tokens);
        let total = chunks.len();
        info!("🧩 文本超出预算，分 {} 块压缩后合并", total);

        let schema = summary_schema();
        let notes_request = SummaryRequest::new(Default::default(), SummaryFormat::Paragraphs);
        // 逐块顺序调用，重试不会交叠
        let mut notes = Vec::with_capacity(total);
        for (i, chunk) in chunks.iter().enumerate() {
            debug!("压缩第 {}/{} 块", i + 1, total);
            let note = self
                .call_with_retry(chunk_prompt(chunk, i, total), &schema, |v| {
                    parse_summary(v, notes_request)
                })
                .await?;
            notes.push(note.summary);
        }

        let merged = notes.join("\n\n");

        let original_tokens = estimate_tokens(text);
        if budgeter.fits(&merged) {
            Ok(BudgetedText::merged(
                merged,
                original_tokens,
                budgeter.max_tokens(),
                total,
            ))
        } else {
            debug!("合并结果仍超预算，改用头尾截断");
            let mut bounded = budgeter.bound(&merged);
            bounded.chunk_count = total;
            Ok(bounded)
        }
    }

    /// 生成题目
    pub async fn generate_quiz(
        &self,
        text: &str,
        request: &QuizRequest,
    ) -> Result<QuizResult, GenerationError> {
        request.validate()?;
        info!(
            "❓ 开始出题: {} 道 / 难度 {} / 题型 {:?}",
            request.count, request.difficulty, request.types
        );

        let mut budgeter = self.budgeter;
        let mut tightenings = 0;
        loop {
            match self.quiz_within(text, request, budgeter).await {
                Err(GenerationError::TokenLimitExceeded) if tightenings < self.max_tightenings => {
                    tightenings += 1;
                    budgeter = budgeter.tightened();
                    warn!(
                        "⚠️ 输入超出模型上下文，收紧预算到 {} tokens（第 {} 次）",
                        budgeter.max_tokens(),
                        tightenings
                    );
                }
                result => return result,
            }
        }
    }

    async fn quiz_within(
        &self,
        text: &str,
        request: &QuizRequest,
        budgeter: Budgeter,
    ) -> Result<QuizResult, GenerationError> {
        let input = budgeter.bound(text);
        let plan = request.slot_plan();
        let schema = quiz_schema();

        let first = self
            .call_with_retry(quiz_prompt(&input.text, request, &plan, &[]), &schema, |v| {
                let questions = parse_questions(v)?;
                if questions.is_empty() {
                    return Err(GenerationError::schema("no valid questions in response"));
                }
                Ok(questions)
            })
            .await?;

        let mut slots: Vec<Option<Question>> = vec![None; plan.len()];
        fill_slots(&plan, &mut slots, first);

        let missing: Vec<QuestionType> = missing_types(&plan, &slots);
        if !missing.is_empty() {
            info!("🔁 缺少 {} 道题，补生成一次", missing.len());
            let existing: Vec<Question> = slots.iter().flatten().cloned().collect();
            let prompt = quiz_prompt(&input.text, request, &missing, &existing);
            match self
                .generator
                .generate(&prompt, &schema)
                .await
                .and_then(|v| parse_questions(&v))
            {
                Ok(extra) => fill_slots(&plan, &mut slots, extra),
                Err(e) => warn!("补生成失败: {}", e),
            }
        }

        let questions: Vec<Question> = slots.into_iter().flatten().collect();
        let warning = if questions.len() < request.count {
            warn!(
                "⚠️ 只生成了 {} / {} 道题",
                questions.len(),
                request.count
            );
            Some(format!(
                "Only {} of the {} requested questions could be generated.",
                questions.len(),
                request.count
            ))
        } else {
            info!("✓ 出题完成: {} 道", questions.len());
            None
        };

        Ok(QuizResult {
            questions,
            requested: request.count,
            difficulty: request.difficulty,
            warning,
        })
    }

    /// 调用生成器并解析，结构不符或调用失败时用严格提示词重试一次
    async fn call_with_retry<T, F>(
        &self,
        prompt: Prompt,
        schema: &Value,
        parse: F,
    ) -> Result<T, GenerationError>
    where
        F: Fn(&Value) -> Result<T, GenerationError>,
    {
        let mut last_error = String::new();
        for attempt in 0..MAX_ATTEMPTS {
            let prompt = prompt.clone().strict(attempt > 0);
            match self
                .generator
                .generate(&prompt, schema)
                .await
                .and_then(|v| parse(&v))
            {
                Ok(value) => return Ok(value),
                Err(e @ GenerationError::TokenLimitExceeded)
                | Err(e @ GenerationError::InvalidRequest { .. }) => return Err(e),
                Err(e) => {
                    warn!("生成第 {} 次失败: {}", attempt + 1, e);
                    last_error = e.to_string();
                }
            }
        }
        Err(GenerationError::unavailable(format!(
            "failed after {} attempts: {}",
            MAX_ATTEMPTS, last_error
        )))
    }
}

/// 去重用的题干规范形式
fn normalize_question(text: &str) -> String {
    text.split_whitespace()
        .map(|w| {
            w.chars()
                .filter(|c| c.is_alphanumeric())
                .flat_map(char::to_lowercase)
                .collect::<String>()
        })
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// 把题目放进对应题型的空题位，重复题和多余的题丢弃
fn fill_slots(plan: &[QuestionType], slots: &mut [Option<Question>], questions: Vec<Question>) {
    let mut seen: HashSet<String> = slots
        .iter()
        .flatten()
        .map(|q| normalize_question(&q.question))
        .collect();

    for question in questions {
        let key = normalize_question(&question.question);
        if seen.contains(&key) {
            debug!("丢弃重复题目: {}", question.question);
            continue;
        }
        let slot = plan
            .iter()
            .zip(slots.iter())
            .position(|(t, s)| *t == question.question_type && s.is_none());
        if let Some(index) = slot {
            seen.insert(key);
            slots[index] = Some(question);
        }
    }
}

fn missing_types(plan: &[QuestionType], slots: &[Option<Question>]) -> Vec<QuestionType> {
    plan.iter()
        .zip(slots)
        .filter(|(_, s)| s.is_none())
        .map(|(t, _)| *t)
        .collect()
}
