use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::utils::text::count_words;

/// 摘要长度档位
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LengthTier {
    /// 100-200 词
    Brief,
    /// 200-500 词
    #[default]
    Standard,
    /// 500-800 词
    Detailed,
}

impl LengthTier {
    /// 目标词数区间（闭区间）
    pub fn word_range(self) -> (usize, usize) {
        match self {
            LengthTier::Brief => (100, 200),
            LengthTier::Standard => (200, 500),
            LengthTier::Detailed => (500, 800),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LengthTier::Brief => "brief",
            LengthTier::Standard => "standard",
            LengthTier::Detailed => "detailed",
        }
    }

    /// 词数是否落在区间 ± 容差内
    pub fn accepts(self, word_count: usize, tolerance: f64) -> bool {
        let (min, max) = self.word_range();
        let lower = (min as f64 * (1.0 - tolerance)).floor();
        let upper = (max as f64 * (1.0 + tolerance)).ceil();
        let count = word_count as f64;
        count >= lower && count <= upper
    }
}

impl fmt::Display for LengthTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LengthTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "brief" => Ok(LengthTier::Brief),
            "standard" => Ok(LengthTier::Standard),
            "detailed" => Ok(LengthTier::Detailed),
            other => Err(format!("unknown summary length '{}'", other)),
        }
    }
}

/// 摘要格式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryFormat {
    #[default]
    Paragraphs,
    Bullets,
}

impl SummaryFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            SummaryFormat::Paragraphs => "paragraphs",
            SummaryFormat::Bullets => "bullets",
        }
    }
}

impl fmt::Display for SummaryFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SummaryFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "paragraphs" | "paragraph" => Ok(SummaryFormat::Paragraphs),
            "bullets" | "bullet" => Ok(SummaryFormat::Bullets),
            other => Err(format!("unknown summary format '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SummaryRequest {
    pub length: LengthTier,
    pub format: SummaryFormat,
}

impl SummaryRequest {
    pub fn new(length: LengthTier, format: SummaryFormat) -> Self {
        Self { length, format }
    }
}

/// 摘要结果
///
/// `word_count` 在本地重新计算，不信任模型自报的数字。
/// 词数超出档位区间只会把 `conforming` 置为 false，不会判定失败。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryResult {
    pub summary: String,
    pub word_count: usize,
    pub key_topics: Vec<String>,
    pub length: LengthTier,
    pub format: SummaryFormat,
    pub conforming: bool,
    /// 输入在送入模型前是否被截断 / 压缩
    pub input_truncated: bool,
}

impl SummaryResult {
    pub fn new(
        summary: String,
        key_topics: Vec<String>,
        request: SummaryRequest,
        tolerance: f64,
        input_truncated: bool,
    ) -> Self {
        let word_count = count_words(&summary);
        Self {
            conforming: request.length.accepts(word_count, tolerance),
            summary,
            word_count,
            key_topics,
            length: request.length,
            format: request.format,
            input_truncated,
        }
    }
}
