use serde::{Deserialize, Serialize};

use super::quiz::QuestionType;

/// 单题判分结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOutcome {
    /// 题号（从 1 开始）
    pub number: usize,
    pub question_type: QuestionType,
    pub correct: bool,
    pub user_answer: String,
    pub correct_answer: String,
    pub explanation: String,
}

/// 成绩报告，只在提交时生成
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreReport {
    pub total: usize,
    pub correct: usize,
    /// 四舍五入到整数的百分比
    pub percentage: u32,
    pub outcomes: Vec<QuestionOutcome>,
}

impl ScoreReport {
    /// 按得分给出鼓励语
    pub fn feedback(&self) -> &'static str {
        match self.percentage {
            90.. => "Excellent work!",
            75..=89 => "Great job!",
            60..=74 => "Good effort!",
            50..=59 => "Keep practicing!",
            _ => "Don't give up, try again!",
        }
    }
}
