//! Token 预算服务 - 业务能力层
//!
//! 把送入模型的文本限制在 token 上限内。估算故意偏保守（取词数与字符数两种估算的较大值），
//! 宁可多截一些也不让服务端截断。

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::Config;
use crate::utils::text::{count_words, word_spans};

/// 预算下限，低于这个值连省略标记都放不下
pub const MIN_TOKEN_BUDGET: usize = 256;

/// 为省略标记预留的 token
const MARKER_RESERVE_TOKENS: usize = 24;

/// 保守的 token 估算
///
/// 英文约 0.75 词 / token，约 4 字符 / token，两者取大。
pub fn estimate_tokens(text: &str) -> usize {
    let by_words = (count_words(text) * 4).div_ceil(3);
    let by_chars = text.chars().count().div_ceil(4);
    by_words.max(by_chars)
}

fn omission_marker(omitted_words: usize) -> String {
    format!("\n\n[... {} words omitted ...]\n\n", omitted_words)
}

/// 实际采用的策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetStrategy {
    /// 未超预算，原样送入
    Unchanged,
    /// 保留开头和结尾
    HeadTail,
    /// 分块摘要后合并
    ChunkMerge,
}

/// 受预算约束的文本
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetedText {
    pub text: String,
    pub truncated: bool,
    pub strategy: BudgetStrategy,
    pub original_tokens: usize,
    pub budget_tokens: usize,
    pub omitted_words: usize,
    pub chunk_count: usize,
}

impl BudgetedText {
    fn unchanged(text: &str, tokens: usize, budget_tokens: usize) -> Self {
        Self {
            text: text.to_string(),
            truncated: false,
            strategy: BudgetStrategy::Unchanged,
            original_tokens: tokens,
            budget_tokens,
            omitted_words: 0,
            chunk_count: 0,
        }
    }

    /// 分块摘要合并后的输入
    pub fn merged(text: String, original_tokens: usize, budget_tokens: usize, chunk_count: usize) -> Self {
        Self {
            text,
            truncated: true,
            strategy: BudgetStrategy::ChunkMerge,
            original_tokens,
            budget_tokens,
            omitted_words: 0,
            chunk_count,
        }
    }
}

/// Token 预算服务
#[derive(Debug, Clone, Copy)]
pub struct Budgeter {
    max_tokens: usize,
    head_share: f64,
}

impl Budgeter {
    pub fn new(config: &Config) -> Self {
        Self::with_budget(config.max_generation_tokens, config.head_share)
    }

    pub fn with_budget(max_tokens: usize, head_share: f64) -> Self {
        Self {
            max_tokens: max_tokens.max(MIN_TOKEN_BUDGET),
            head_share: head_share.clamp(0.0, 1.0),
        }
    }

    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    /// 更严格的一档预算（减半，不低于下限）
    pub fn tightened(&self) -> Self {
        Self {
            max_tokens: (self.max_tokens / 2).max(MIN_TOKEN_BUDGET),
            head_share: self.head_share,
        }
    }

    pub fn fits(&self, text: &str) -> bool {
        estimate_tokens(text) <= self.max_tokens
    }

    /// 头尾保留截断
    ///
    /// 未超预算时原样返回；否则保留开头与结尾（默认 70% / 30%），
    /// 中间替换为注明省略词数的标记。保留部分与原文逐字节一致。
    pub fn bound(&self, text: &str) -> BudgetedText {
        let original_tokens = estimate_tokens(text);
        if original_tokens <= self.max_tokens {
            return BudgetedText::unchanged(text, original_tokens, self.max_tokens);
        }

        let spans = word_spans(text);
        let total_words = spans.len();
        let mut word_budget = (self.max_tokens.saturating_sub(MARKER_RESERVE_TOKENS) * 3 / 4)
            .min(total_words.saturating_sub(1));

        loop {
            let head = ((word_budget as f64) * self.head_share).round() as usize;
            let head = head.min(word_budget);
            let tail = word_budget - head;

            let head_end = if head > 0 { spans[head - 1].1 } else { 0 };
            let tail_start = if tail > 0 {
                spans[total_words - tail].0
            } else {
                text.len()
            };
            let omitted_words = total_words - head - tail;
            let output = format!(
                "{}{}{}",
                &text[..head_end],
                omission_marker(omitted_words),
                &text[tail_start..]
            );

            if estimate_tokens(&output) <= self.max_tokens || word_budget == 0 {
                info!(
                    "✂️ 文本超出预算 ({} > {} tokens)，保留开头 {} 词 / 结尾 {} 词，省略 {} 词",
                    original_tokens, self.max_tokens, head, tail, omitted_words
                );
                return BudgetedText {
                    text: output,
                    truncated: true,
                    strategy: BudgetStrategy::HeadTail,
                    original_tokens,
                    budget_tokens: self.max_tokens,
                    omitted_words,
                    chunk_count: 0,
                };
            }

            // 长词较多时字符估算占优，逐步收缩
            word_budget = (word_budget * 9 / 10).min(word_budget - 1);
            debug!("截断结果仍超预算，收缩到 {} 词", word_budget);
        }
    }

    /// 按 token 上限切块
    ///
    /// 块边界落在词边界上，在块尾 1/4 范围内优先选择段落分隔处。
    /// 各块按原文顺序排列，覆盖全部词。
    pub fn chunk(&self, text: &str, chunk_tokens: usize) -> Vec<String> {
        let spans = word_spans(text);
        if spans.is_empty() {
            return Vec::new();
        }

        let words_per_chunk = (chunk_tokens * 3 / 4).max(1);
        let mut chunks = Vec::new();
        let mut start = 0;

        while start < spans.len() {
            let mut end = (start + words_per_chunk).min(spans.len());

            if end < spans.len() {
                let min_end = start + words_per_chunk * 3 / 4;
                for candidate in (min_end + 1..=end).rev() {
                    let gap = &text[spans[candidate - 1].1..spans[candidate].0];
                    if gap.contains("\n\n") {
                        end = candidate;
                        break;
                    }
                }
            }

            while end - start > 1
                && estimate_tokens(&text[spans[start].0..spans[end - 1].1]) > chunk_tokens
            {
                end = start + ((end - start) * 9 / 10).max(1);
            }

            chunks.push(text[spans[start].0..spans[end - 1].1].to_string());
            start = end;
        }

        debug!("文本切分为 {} 块", chunks.len());
        chunks
    }
}
