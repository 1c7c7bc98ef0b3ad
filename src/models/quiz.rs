use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::GenerationError;

pub const MIN_QUESTIONS: usize = 3;
pub const MAX_QUESTIONS: usize = 15;

/// 判断题的两个规范选项
pub const TRUE_FALSE_OPTIONS: [&str; 2] = ["True", "False"];

/// 题型
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    Mcq,
    TrueFalse,
    ShortAnswer,
}

impl QuestionType {
    pub const ALL: [QuestionType; 3] = [
        QuestionType::Mcq,
        QuestionType::TrueFalse,
        QuestionType::ShortAnswer,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            QuestionType::Mcq => "mcq",
            QuestionType::TrueFalse => "true_false",
            QuestionType::ShortAnswer => "short_answer",
        }
    }

    /// 是否按选项精确匹配判分
    pub fn has_options(self) -> bool {
        !matches!(self, QuestionType::ShortAnswer)
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' ', '/'], "_");
        match normalized.as_str() {
            "mcq" | "multiple_choice" | "multiplechoice" => Ok(QuestionType::Mcq),
            "true_false" | "truefalse" | "tf" | "boolean" => Ok(QuestionType::TrueFalse),
            "short_answer" | "shortanswer" | "open" => Ok(QuestionType::ShortAnswer),
            _ => Err(format!("unknown question type '{}'", s)),
        }
    }
}

/// 难度
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty '{}'", other)),
        }
    }
}

/// 一道题
///
/// 选择题恰有 4 个互不相同的选项，`correct_answer` 与其中之一逐字相等；
/// 判断题选项固定为 `True` / `False`；简答题没有选项。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub question: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub options: Option<Vec<String>>,
    pub correct_answer: String,
    pub explanation: String,
}

impl Question {
    /// 把作答规范成存储形式
    ///
    /// 有选项的题目先精确匹配、再忽略大小写匹配，返回选项原文，匹配不到返回 `None`；
    /// 简答题返回去掉首尾空白的文本。
    pub fn canonical_response(&self, response: &str) -> Option<String> {
        let response = response.trim();
        match &self.options {
            Some(options) if self.question_type.has_options() => options
                .iter()
                .find(|o| o.as_str() == response)
                .or_else(|| options.iter().find(|o| o.eq_ignore_ascii_case(response)))
                .cloned(),
            _ => Some(response.to_string()),
        }
    }
}

/// 出题请求
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizRequest {
    pub count: usize,
    pub types: Vec<QuestionType>,
    pub difficulty: Difficulty,
}

impl Default for QuizRequest {
    fn default() -> Self {
        Self {
            count: 5,
            types: vec![QuestionType::Mcq, QuestionType::TrueFalse],
            difficulty: Difficulty::default(),
        }
    }
}

impl QuizRequest {
    /// 构造并规范化：题型去重并按固定顺序排列
    pub fn new(count: usize, types: impl IntoIterator<Item = QuestionType>, difficulty: Difficulty) -> Self {
        let mut types: Vec<QuestionType> = types.into_iter().collect();
        types.sort();
        types.dedup();
        Self {
            count,
            types,
            difficulty,
        }
    }

    pub fn validate(&self) -> Result<(), GenerationError> {
        if !(MIN_QUESTIONS..=MAX_QUESTIONS).contains(&self.count) {
            return Err(GenerationError::invalid_request(format!(
                "question count must be between {} and {}, got {}",
                MIN_QUESTIONS, MAX_QUESTIONS, self.count
            )));
        }
        if self.types.is_empty() {
            return Err(GenerationError::invalid_request(
                "at least one question type must be selected",
            ));
        }
        Ok(())
    }

    /// 每个题位的题型，按固定顺序轮转分配
    ///
    /// 同样的请求总是得到同样的分配，多题型时不会全部落在一种题型上。
    pub fn slot_plan(&self) -> Vec<QuestionType> {
        let mut types = self.types.clone();
        types.sort();
        types.dedup();
        if types.is_empty() {
            return Vec::new();
        }
        (0..self.count).map(|i| types[i % types.len()]).collect()
    }
}

/// 出题结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizResult {
    pub questions: Vec<Question>,
    pub requested: usize,
    pub difficulty: Difficulty,
    /// 题目少于请求数量时的提示，不会为空地少题
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub warning: Option<String>,
}

impl QuizResult {
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.questions.len() >= self.requested
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_difficulty_is_medium() {
        assert_eq!(Difficulty::default(), Difficulty::Medium);
        assert_eq!(QuizRequest::default().difficulty, Difficulty::Medium);
    }

    #[test]
    fn test_slot_plan_round_robin() {
        let request = QuizRequest::new(
            5,
            [QuestionType::TrueFalse, QuestionType::Mcq],
            Difficulty::Medium,
        );
        assert_eq!(
            request.slot_plan(),
            vec![
                QuestionType::Mcq,
                QuestionType::TrueFalse,
                QuestionType::Mcq,
                QuestionType::TrueFalse,
                QuestionType::Mcq,
            ]
        );
    }

    #[test]
    fn test_slot_plan_is_deterministic() {
        let a = QuizRequest::new(10, QuestionType::ALL, Difficulty::Hard);
        let b = QuizRequest::new(10, QuestionType::ALL.iter().rev().copied(), Difficulty::Hard);
        assert_eq!(a.slot_plan(), b.slot_plan());
    }

    #[test]
    fn test_validate_rejects_bad_requests() {
        assert!(QuizRequest::new(2, [QuestionType::Mcq], Difficulty::Easy)
            .validate()
            .is_err());
        assert!(QuizRequest::new(16, [QuestionType::Mcq], Difficulty::Easy)
            .validate()
            .is_err());
        assert!(QuizRequest::new(5, [], Difficulty::Easy).validate().is_err());
        assert!(QuizRequest::new(15, [QuestionType::Mcq], Difficulty::Easy)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_question_type_aliases() {
        assert_eq!("MCQ".parse::<QuestionType>().unwrap(), QuestionType::Mcq);
        assert_eq!(
            "true-false".parse::<QuestionType>().unwrap(),
            QuestionType::TrueFalse
        );
        assert_eq!(
            "short answer".parse::<QuestionType>().unwrap(),
            QuestionType::ShortAnswer
        );
    }

    #[test]
    fn test_question_serializes_type_field() {
        let q = Question {
            question: "Is water wet?".to_string(),
            question_type: QuestionType::TrueFalse,
            options: Some(vec!["True".to_string(), "False".to_string()]),
            correct_answer: "True".to_string(),
            explanation: "It is.".to_string(),
        };
        let value = serde_json::to_value(&q).unwrap();
        assert_eq!(value["type"], "true_false");
        assert_eq!(q.canonical_response("False").as_deref(), Some("False"));
        assert_eq!(q.canonical_response(" false ").as_deref(), Some("False"));
        assert_eq!(q.canonical_response("Maybe"), None);
    }
}
