//! 输出结构与校验
//!
//! 定义送给模型的 JSON Schema，并把模型返回的 JSON 校验 / 修复成领域类型。
//! 可以无歧义修复的问题（选项前缀、字母答案、大小写）就地修复，其余整题丢弃。

use regex::Regex;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::OnceLock;
use tracing::{debug, warn};

use crate::error::GenerationError;
use crate::models::quiz::TRUE_FALSE_OPTIONS;
use crate::models::{Question, QuestionType, SummaryFormat, SummaryRequest};

const BULLET_MARKERS: [&str; 3] = ["-", "*", "•"];

/// 摘要输出结构
pub fn summary_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "summary": {"type": "string"},
            "key_topics": {"type": "array", "items": {"type": "string"}}
        },
        "required": ["summary", "key_topics"]
    })
}

/// 题目输出结构
pub fn quiz_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "questions": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "question": {"type": "string"},
                        "type": {"type": "string", "enum": ["mcq", "true_false", "short_answer"]},
                        "options": {"type": ["array", "null"], "items": {"type": "string"}},
                        "correct_answer": {"type": "string"},
                        "explanation": {"type": "string"}
                    },
                    "required": ["question", "type", "correct_answer", "explanation"]
                }
            }
        },
        "required": ["questions"]
    })
}

/// 解析后的摘要输出
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryOutput {
    pub summary: String,
    pub key_topics: Vec<String>,
}

/// 解析摘要输出
///
/// 要点格式至少要有一行以项目符号开头，否则视为结构不符。
pub fn parse_summary(value: &Value, request: SummaryRequest) -> Result<SummaryOutput, GenerationError> {
    let summary = value
        .get("summary")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| GenerationError::schema("missing or empty 'summary'"))?
        .to_string();

    let key_topics = match value.get("key_topics") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect(),
        None | Some(Value::Null) => Vec::new(),
        Some(_) => return Err(GenerationError::schema("'key_topics' must be an array")),
    };

    if request.format == SummaryFormat::Bullets && !has_bullet_line(&summary) {
        return Err(GenerationError::schema(
            "bullet format requested but summary has no bullet lines",
        ));
    }

    Ok(SummaryOutput {
        summary,
        key_topics,
    })
}

fn has_bullet_line(summary: &str) -> bool {
    summary.lines().any(|line| {
        let line = line.trim_start();
        BULLET_MARKERS.iter().any(|m| line.starts_with(m))
    })
}

fn option_label_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*\(?([A-Da-d])[\)\.:]\s+").ok())
        .as_ref()
}

/// 去掉 "A) " / "b. " / "(C) " 之类的选项前缀
fn strip_option_label(option: &str) -> String {
    match option_label_regex().and_then(|re| re.find(option)) {
        Some(m) => option[m.end()..].trim().to_string(),
        None => option.trim().to_string(),
    }
}

/// 单字母答案（"B" / "b)" / "(C)"）对应的选项下标
fn letter_index(answer: &str) -> Option<usize> {
    let trimmed = answer
        .trim()
        .trim_start_matches('(')
        .trim_end_matches([')', '.', ':']);
    let mut chars = trimmed.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphabetic() => {
            let index = (c.to_ascii_uppercase() as u8 - b'A') as usize;
            (index < 4).then_some(index)
        }
        _ => None,
    }
}

fn value_as_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Bool(b) => Some(if *b { "True" } else { "False" }.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn canonical_true_false(answer: &str) -> Option<&'static str> {
    match answer.trim().trim_end_matches('.').to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" => Some(TRUE_FALSE_OPTIONS[0]),
        "false" | "f" | "no" => Some(TRUE_FALSE_OPTIONS[1]),
        _ => None,
    }
}

/// 校验并修复单道题
pub fn parse_question(value: &Value) -> Result<Question, String> {
    let question = value_as_text(value.get("question"))
        .filter(|q| !q.is_empty())
        .ok_or("missing question text")?;

    let question_type: QuestionType = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or("missing question type")?
        .parse()?;

    let raw_answer = value_as_text(value.get("correct_answer"))
        .filter(|a| !a.is_empty())
        .ok_or("missing correct answer")?;

    let explanation = value_as_text(value.get("explanation")).unwrap_or_default();

    let (options, correct_answer) = match question_type {
        QuestionType::Mcq => {
            let options: Vec<String> = value
                .get("options")
                .and_then(Value::as_array)
                .ok_or("multiple choice question without options")?
                .iter()
                .filter_map(|o| value_as_text(Some(o)))
                .map(|o| strip_option_label(&o))
                .collect();

            if options.len() != 4 {
                return Err(format!("expected 4 options, got {}", options.len()));
            }
            let distinct: HashSet<String> = options.iter().map(|o| o.to_lowercase()).collect();
            if distinct.len() != 4 || options.iter().any(|o| o.is_empty()) {
                return Err("options are not distinct".to_string());
            }

            let stripped = strip_option_label(&raw_answer);
            let answer = options
                .iter()
                .find(|o| **o == stripped)
                .or_else(|| options.iter().find(|o| o.eq_ignore_ascii_case(&stripped)))
                .or_else(|| letter_index(&raw_answer).map(|i| &options[i]))
                .cloned()
                .ok_or_else(|| format!("answer '{}' is not one of the options", raw_answer))?;

            (Some(options), answer)
        }
        QuestionType::TrueFalse => {
            let answer = canonical_true_false(&raw_answer)
                .ok_or_else(|| format!("answer '{}' is not True or False", raw_answer))?;
            (
                Some(TRUE_FALSE_OPTIONS.iter().map(|o| o.to_string()).collect()),
                answer.to_string(),
            )
        }
        QuestionType::ShortAnswer => (None, raw_answer),
    };

    Ok(Question {
        question,
        question_type,
        options,
        correct_answer,
        explanation,
    })
}

/// 解析整份题目输出
///
/// 顶层结构不符返回 `SchemaMismatch`；单题不合格只丢弃该题。
pub fn parse_questions(value: &Value) -> Result<Vec<Question>, GenerationError> {
    let items = value
        .get("questions")
        .and_then(Value::as_array)
        .ok_or_else(|| GenerationError::schema("missing 'questions' array"))?;

    let mut questions = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        match parse_question(item) {
            Ok(q) => questions.push(q),
            Err(reason) => warn!("⚠️ 丢弃第 {} 道不合格题目: {}", i + 1, reason),
        }
    }
    debug!("题目解析: {} / {} 道合格", questions.len(), items.len());
    Ok(questions)
}
