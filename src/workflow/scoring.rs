//! 判分
//!
//! 选择题 / 判断题与标准答案逐字比较；简答题只要有非空作答即算正确。
//! 这是有意保留的简化判分，不做语义比对。

use std::collections::BTreeMap;
use tracing::debug;

use crate::models::{Question, QuestionOutcome, ScoreReport};

/// 单题是否答对
pub fn is_correct(question: &Question, response: &str) -> bool {
    if question.question_type.has_options() {
        response == question.correct_answer
    } else {
        !response.trim().is_empty()
    }
}

/// 计算成绩，`answers` 以题目下标（从 0 开始）为键，缺失的作答按空答案处理
pub fn score(questions: &[Question], answers: &BTreeMap<usize, String>) -> ScoreReport {
    let outcomes: Vec<QuestionOutcome> = questions
        .iter()
        .enumerate()
        .map(|(index, question)| {
            let user_answer = answers.get(&index).cloned().unwrap_or_default();
            QuestionOutcome {
                number: index + 1,
                question_type: question.question_type,
                correct: is_correct(question, &user_answer),
                user_answer,
                correct_answer: question.correct_answer.clone(),
                explanation: question.explanation.clone(),
            }
        })
        .collect();

    let total = outcomes.len();
    let correct = outcomes.iter().filter(|o| o.correct).count();
    let percentage = if total == 0 {
        0
    } else {
        ((correct as f64 / total as f64) * 100.0).round() as u32
    };
    debug!("判分完成: {}/{} ({}%)", correct, total, percentage);

    ScoreReport {
        total,
        correct,
        percentage,
        outcomes,
    }
}
