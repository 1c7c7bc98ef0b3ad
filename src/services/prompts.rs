//! 提示词构建
//!
//! 模型侧提示词统一使用英文，与文档语言一致。

use crate::models::{Question, QuestionType, QuizRequest, SummaryFormat, SummaryRequest};
use crate::services::text_generator::Prompt;

const SUMMARIZER_SYSTEM: &str = r#"You are an expert document summarizer. Your role is to:
1. Read and understand the provided document text
2. Identify the main topics, key points, and important details
3. Generate a clear, concise, and coherent summary that captures the essence of the document
4. Follow the specified length and format requirements
5. Never cut off mid-sentence

For BRIEF summaries (100-200 words) focus on the main points only.
For STANDARD summaries (200-500 words) cover the main topics with moderate detail.
For DETAILED summaries (500-800 words) give comprehensive coverage with examples."#;

const QUIZ_SYSTEM: &str = r#"You are an expert quiz creator. Your role is to:
1. Analyze the document content thoroughly
2. Identify key concepts, facts, and important information
3. Create clear, unambiguous questions that test comprehension
4. Cover different parts of the document

Question guidelines:
- mcq: exactly 4 distinct options, one correct answer and 3 plausible distractors. correct_answer must repeat the correct option text verbatim.
- true_false: options are exactly ["True", "False"] and correct_answer is "True" or "False".
- short_answer: no options; correct_answer is a concise model answer.

Correct answers must be verifiable from the document and explanations should reference its content.
Avoid trick questions. Difficulty must match the requested level."#;

const CHUNK_SYSTEM: &str = "You condense one section of a longer document into dense notes. \
Keep every fact, name, number and conclusion that a later summary might need. Do not add commentary.";

fn format_instruction(format: SummaryFormat) -> &'static str {
    match format {
        SummaryFormat::Bullets => {
            "Format the summary as bullet points, one main idea per line, each line starting with \"- \"."
        }
        SummaryFormat::Paragraphs => "Format the summary as flowing, well-connected paragraphs.",
    }
}

/// 摘要提示词
pub fn summary_prompt(text: &str, request: SummaryRequest) -> Prompt {
    let (min, max) = request.length.word_range();
    let user = format!(
        r#"Please summarize the following document.

Requirements:
- Length: {min}-{max} words ({tier})
- Format: {format}
- List the key topics covered (3-7 short topic names)

Document text:
{text}

Return the summary in the "summary" field and the topics in the "key_topics" field.
Make sure the summary is complete and does not cut off mid-sentence."#,
        min = min,
        max = max,
        tier = request.length,
        format = format_instruction(request.format),
        text = text,
    );
    Prompt::new(SUMMARIZER_SYSTEM, user)
}

/// 分块摘要提示词（合并前的单块压缩）
pub fn chunk_prompt(chunk: &str, index: usize, total: usize) -> Prompt {
    let user = format!(
        r#"This is section {} of {} of a longer document.
Condense it into notes of at most 150 words.

Section text:
{}

Return the notes in the "summary" field and the section's topics in the "key_topics" field."#,
        index + 1,
        total,
        chunk
    );
    Prompt::new(CHUNK_SYSTEM, user)
}

fn type_instruction(question_type: QuestionType) -> &'static str {
    match question_type {
        QuestionType::Mcq => "mcq (4 options)",
        QuestionType::TrueFalse => "true_false (options True, False)",
        QuestionType::ShortAnswer => "short_answer (no options)",
    }
}

/// 出题提示词
///
/// `slots` 为需要生成的题位题型，`existing` 为已生成的题目（补题时避免重复）。
pub fn quiz_prompt(
    text: &str,
    request: &QuizRequest,
    slots: &[QuestionType],
    existing: &[Question],
) -> Prompt {
    let plan: Vec<String> = slots
        .iter()
        .enumerate()
        .map(|(i, t)| format!("  {}. {}", i + 1, type_instruction(*t)))
        .collect();

    let avoid = if existing.is_empty() {
        String::new()
    } else {
        let listed: Vec<String> = existing
            .iter()
            .map(|q| format!("  - {}", q.question))
            .collect();
        format!(
            "\nThese questions already exist. Do not repeat or paraphrase them:\n{}\n",
            listed.join("\n")
        )
    };

    let user = format!(
        r#"Create a quiz with EXACTLY {count} questions based on the following document.

Requirements:
- Difficulty level: {difficulty}
- Produce the questions in this exact order and with these exact types:
{plan}
- Cover different parts of the document
{avoid}
Document text:
{text}

Return the questions in the "questions" array. The "type" field must be one of: mcq, true_false, short_answer."#,
        count = slots.len(),
        difficulty = request.difficulty,
        plan = plan.join("\n"),
        avoid = avoid,
        text = text,
    );
    Prompt::new(QUIZ_SYSTEM, user)
}
