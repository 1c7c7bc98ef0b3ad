pub mod document;
pub mod quiz;
pub mod score;
pub mod summary;

pub use document::{
    Document, ExtractedText, RejectionReason, ValidationReport, ValidationResult,
};
pub use quiz::{Difficulty, Question, QuestionType, QuizRequest, QuizResult};
pub use score::{QuestionOutcome, ScoreReport};
pub use summary::{LengthTier, SummaryFormat, SummaryRequest, SummaryResult};
