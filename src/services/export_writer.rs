//! 导出服务 - 业务能力层
//!
//! 只负责"把结果写成文件"，不关心流程。文件名以文档名（去扩展名）为前缀。

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::models::{QuizResult, ScoreReport, SummaryResult};

/// 导出服务
pub struct ExportWriter {
    output_dir: PathBuf,
}

impl ExportWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// 写入 `<name>_summary.txt`
    pub async fn write_summary(&self, name: &str, summary: &SummaryResult) -> AppResult<PathBuf> {
        let mut content = summary.summary.clone();
        if !summary.key_topics.is_empty() {
            content.push_str("\n\nKey topics: ");
            content.push_str(&summary.key_topics.join(", "));
        }
        content.push('\n');
        self.write(&format!("{}_summary.txt", name), &content).await
    }

    /// 写入 `<name>_quiz.json`
    pub async fn write_quiz(&self, name: &str, quiz: &QuizResult) -> AppResult<PathBuf> {
        let content = serde_json::to_string_pretty(quiz)?;
        self.write(&format!("{}_quiz.json", name), &content).await
    }

    /// 写入 `<name>_results.txt`
    pub async fn write_results(&self, name: &str, report: &ScoreReport) -> AppResult<PathBuf> {
        self.write(&format!("{}_results.txt", name), &render_results_text(report))
            .await
    }

    async fn write(&self, file_name: &str, content: &str) -> AppResult<PathBuf> {
        fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| AppError::file(self.output_dir.display().to_string(), e))?;

        let path = self.output_dir.join(file_name);
        fs::write(&path, content)
            .await
            .map_err(|e| AppError::file(path.display().to_string(), e))?;

        info!("💾 已导出: {}", path.display());
        Ok(path)
    }
}

/// 成绩报告的纯文本形式
pub fn render_results_text(report: &ScoreReport) -> String {
    let mut out = format!(
        "Score: {}/{} ({}%)\n{}\n",
        report.correct,
        report.total,
        report.percentage,
        report.feedback()
    );
    for outcome in &report.outcomes {
        out.push_str(&format!(
            "\nQ{} [{}] {}\n  Your answer: {}\n  Correct answer: {}\n",
            outcome.number,
            outcome.question_type,
            if outcome.correct { "correct" } else { "incorrect" },
            if outcome.user_answer.is_empty() {
                "(no answer)"
            } else {
                &outcome.user_answer
            },
            outcome.correct_answer
        ));
        if !outcome.explanation.is_empty() {
            out.push_str(&format!("  Explanation: {}\n", outcome.explanation));
        }
    }
    out
}
