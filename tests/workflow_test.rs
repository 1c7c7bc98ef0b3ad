mod common;

use serde_json::json;
use tokio_util::sync::CancellationToken;

use common::{
    bullet_summary, document_pages, mcq, true_false, words, PendingGenerator, ScriptedGenerator,
};
use doc_quiz::error::{GenerationError, WorkflowError};
use doc_quiz::infrastructure::MemoryPages;
use doc_quiz::models::{
    Difficulty, Document, LengthTier, QuestionType, QuizRequest, SummaryFormat, SummaryRequest,
};
use doc_quiz::{App, Command, Config, ContentGenerator, IngestFlow, Session, Stage};

fn pdf() -> Document {
    Document::new("lecture.pdf", "application/pdf", b"%PDF-1.7".to_vec())
}

/// 接入一份 10 页 3000 词的文档
fn validated_session(config: &Config) -> Session {
    let flow = IngestFlow::new(config);
    let (document, result) =
        flow.ingest_source(pdf(), &MemoryPages::new(document_pages(10, 300)));
    let mut session = Session::new();
    assert_eq!(session.upload(document, result), Stage::Validated);
    session
}

fn quiz_request(count: usize, types: &[QuestionType]) -> QuizRequest {
    QuizRequest::new(count, types.iter().copied(), Difficulty::Medium)
}

#[tokio::test]
async fn test_end_to_end_summary_then_quiz() {
    let config = Config::default();
    let mut session = validated_session(&config);
    assert_eq!(session.accepted_text().unwrap().word_count, 3000);

    let generator = ContentGenerator::new(
        ScriptedGenerator::new(vec![
            Ok(bullet_summary(10, 15)),
            Ok(json!({"questions": [
                mcq("Which colour is mentioned first?"),
                true_false("The lecture has ten pages.", "true"),
                mcq("Which colour closes the lecture?"),
                true_false("The lecture is about cooking.", "False"),
                mcq("Which colour appears on page three?"),
            ]})),
        ]),
        &config,
    );
    let cancel = CancellationToken::new();

    let summary = session
        .summarize(
            &generator,
            SummaryRequest::new(LengthTier::Brief, SummaryFormat::Bullets),
            &cancel,
        )
        .await
        .unwrap()
        .clone();
    assert!(summary.conforming, "word count {}", summary.word_count);
    assert!((100..=200).contains(&summary.word_count));
    assert!(summary.summary.lines().all(|l| l.starts_with("- ")));
    assert_eq!(session.stage(), Stage::Summarized);

    let quiz = session
        .generate_quiz(
            &generator,
            quiz_request(5, &[QuestionType::Mcq, QuestionType::TrueFalse]),
            &cancel,
        )
        .await
        .unwrap()
        .clone();
    assert_eq!(quiz.len(), 5);
    assert!(quiz.warning.is_none());
    assert!(quiz.questions.iter().any(|q| q.question_type == QuestionType::Mcq));
    assert!(quiz
        .questions
        .iter()
        .any(|q| q.question_type == QuestionType::TrueFalse));
    for question in quiz.questions.iter().filter(|q| q.question_type == QuestionType::Mcq) {
        let options = question.options.as_ref().unwrap();
        assert_eq!(options.len(), 4);
        assert!(options.contains(&question.correct_answer));
    }
    assert_eq!(session.stage(), Stage::QuizGenerated);

    // 出题使用完整文本而不是摘要
    let prompts = generator.generator().prompts();
    let quiz_prompt = &prompts[1].user;
    assert!(quiz_prompt.contains("page0"));
    assert!(quiz_prompt.contains("page9"));
    assert!(!quiz_prompt.contains(&summary.summary));
}

#[tokio::test]
async fn test_submit_before_all_answered_is_rejected() {
    let config = Config::default();
    let mut session = validated_session(&config);
    let generator = ContentGenerator::new(
        ScriptedGenerator::new(vec![Ok(json!({"questions": [
            mcq("q1"), mcq("q2"), mcq("q3")
        ]}))]),
        &config,
    );
    session
        .generate_quiz(
            &generator,
            quiz_request(3, &[QuestionType::Mcq]),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    session.record_answer(0, "Blue").unwrap();
    session.record_answer(2, "Red").unwrap();
    let err = session.submit().unwrap_err();
    assert_eq!(
        err,
        WorkflowError::IncompleteAnswers {
            answered: 2,
            total: 3
        }
    );
    assert_eq!(session.stage(), Stage::QuizGenerated);
    assert!(session.state().score.is_none());
}

#[tokio::test]
async fn test_reset_from_submitted_clears_all_artifacts() {
    let config = Config::default();
    let mut session = validated_session(&config);
    let generator = ContentGenerator::new(
        ScriptedGenerator::new(vec![
            Ok(json!({"summary": words(300), "key_topics": ["x"]})),
            Ok(json!({"questions": [
                true_false("s1", "True"), true_false("s2", "True"), true_false("s3", "False")
            ]})),
        ]),
        &config,
    );
    let cancel = CancellationToken::new();
    session
        .summarize(&generator, SummaryRequest::default(), &cancel)
        .await
        .unwrap();
    session
        .generate_quiz(&generator, quiz_request(3, &[QuestionType::TrueFalse]), &cancel)
        .await
        .unwrap();
    for i in 0..3 {
        session.record_answer(i, "True").unwrap();
    }
    assert_eq!(session.submit().unwrap().percentage, 67);
    assert_eq!(session.stage(), Stage::Submitted);

    session.reset();
    let state = session.state();
    assert_eq!(state.stage, Stage::Idle);
    assert!(state.document.is_none());
    assert!(state.validation.is_none());
    assert!(state.summary.is_none());
    assert!(state.quiz.is_none());
    assert!(state.answers.is_empty());
    assert!(state.score.is_none());
    assert!(!state.submitted);
}

#[test]
fn test_three_of_ten_scores_thirty_percent() {
    let config = Config::default();
    let mut session = validated_session(&config);
    let questions: Vec<_> = (0..10)
        .map(|i| true_false(&format!("Statement number {}", i), "True"))
        .collect();
    let generator = ContentGenerator::new(
        ScriptedGenerator::new(vec![Ok(json!({ "questions": questions }))]),
        &config,
    );

    tokio_test::block_on(session.generate_quiz(
        &generator,
        quiz_request(10, &[QuestionType::TrueFalse]),
        &CancellationToken::new(),
    ))
    .unwrap();

    for i in 0..10 {
        let answer = if i < 3 { "True" } else { "False" };
        session.record_answer(i, answer).unwrap();
    }
    let report = session.submit().unwrap();
    assert_eq!(report.total, 10);
    assert_eq!(report.correct, 3);
    assert_eq!(report.percentage, 30);
    assert_eq!(report.outcomes.iter().filter(|o| o.correct).count(), 3);
}

#[tokio::test]
async fn test_failed_generation_leaves_state_unchanged() {
    let config = Config::default();
    let mut session = validated_session(&config);
    let generator = ContentGenerator::new(
        ScriptedGenerator::new(vec![Ok(json!({"nope": 1})), Ok(json!("still wrong"))]),
        &config,
    );

    let err = session
        .summarize(&generator, SummaryRequest::default(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::Generation(GenerationError::Unavailable { .. })
    ));
    assert_eq!(session.stage(), Stage::Validated);
    assert!(session.state().summary.is_none());

    // 两次调用：首次 + 严格重试
    let prompts = generator.generator().prompts();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[1].strict);
}

#[tokio::test]
async fn test_cancelled_generation_leaves_state_unchanged() {
    let config = Config::default();
    let mut session = validated_session(&config);
    let epoch = session.state().epoch;
    let generator = ContentGenerator::new(PendingGenerator, &config);

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = session
        .generate_quiz(&generator, quiz_request(5, &[QuestionType::Mcq]), &cancel)
        .await
        .unwrap_err();
    assert_eq!(err, WorkflowError::Cancelled);
    assert_eq!(session.stage(), Stage::Validated);
    assert!(session.state().quiz.is_none());
    assert_eq!(session.state().epoch, epoch);
}

#[tokio::test]
async fn test_replacing_document_discards_in_flight_result() {
    let config = Config::default();
    let mut session = validated_session(&config);
    let generator = ContentGenerator::new(
        ScriptedGenerator::new(vec![Ok(json!({"summary": words(300), "key_topics": []}))]),
        &config,
    );

    let ticket = session.begin_summary(SummaryRequest::default()).unwrap();
    let result = generator
        .summarize(&ticket.text, ticket.request)
        .await
        .unwrap();

    // 生成期间用户上传了新文档
    let flow = IngestFlow::new(&config);
    let (document, validation) =
        flow.ingest_source(pdf(), &MemoryPages::new(document_pages(2, 200)));
    session.upload(document, validation);

    assert_eq!(
        session.commit_summary(&ticket, result).unwrap_err(),
        WorkflowError::StaleTicket
    );
    assert!(session.state().summary.is_none());
    assert_eq!(session.stage(), Stage::Validated);
}

#[test]
fn test_rejected_documents_stay_uploaded() {
    let config = Config {
        max_file_size_bytes: 16,
        ..Config::default()
    };
    let flow = IngestFlow::new(&config);

    let (document, result) = flow.ingest("big.pdf", "application/pdf", vec![b'x'; 17]);
    let mut session = Session::new();
    assert_eq!(session.upload(document, result), Stage::Uploaded);
    assert_eq!(session.rejection().map(|r| r.code()), Some("oversized"));

    // 扫描件给出具体原因，而不是"内容太少"
    let flow = IngestFlow::new(&Config::default());
    let (document, result) = flow.ingest_source(pdf(), &MemoryPages::new(["", " ", "", "\n"]));
    assert_eq!(session.upload(document, result), Stage::Uploaded);
    assert_eq!(session.rejection().map(|r| r.code()), Some("scan_only"));
    assert!(session
        .begin_quiz(quiz_request(3, &[QuestionType::Mcq]))
        .is_err());
}

#[tokio::test]
async fn test_grade_command_exports_results() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        output_dir: dir.path().join("out").display().to_string(),
        ..Config::default()
    };

    let quiz = json!({
        "questions": [
            {"question": "Sky colour?", "type": "mcq",
             "options": ["Red", "Green", "Blue", "Yellow"],
             "correct_answer": "Blue", "explanation": ""},
            {"question": "Water is wet.", "type": "true_false",
             "options": ["True", "False"], "correct_answer": "True", "explanation": ""},
            {"question": "Name a gas.", "type": "short_answer",
             "correct_answer": "Oxygen", "explanation": ""}
        ],
        "requested": 3,
        "difficulty": "easy"
    });
    let quiz_path = dir.path().join("lecture_quiz.json");
    std::fs::write(&quiz_path, quiz.to_string()).unwrap();
    let answers_path = dir.path().join("answers.json");
    std::fs::write(&answers_path, r#"["c", "False", "Nitrogen"]"#).unwrap();

    let app = App::with_generator(&config, ScriptedGenerator::default());
    app.run(Command::Grade {
        quiz: quiz_path,
        answers: answers_path,
    })
    .await
    .unwrap();

    let report = std::fs::read_to_string(dir.path().join("out/lecture_results.txt")).unwrap();
    assert!(report.starts_with("Score: 2/3 (67%)"));
}

/// 写出题目与作答文件，返回 (目录, 题目路径, 作答路径)
fn grade_inputs(
    quiz: serde_json::Value,
    answers: &str,
) -> (tempfile::TempDir, std::path::PathBuf, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let quiz_path = dir.path().join("check_quiz.json");
    std::fs::write(&quiz_path, quiz.to_string()).unwrap();
    let answers_path = dir.path().join("answers.json");
    std::fs::write(&answers_path, answers).unwrap();
    (dir, quiz_path, answers_path)
}

fn grading_app(dir: &tempfile::TempDir) -> App<ScriptedGenerator> {
    let config = Config {
        output_dir: dir.path().join("out").display().to_string(),
        ..Config::default()
    };
    App::with_generator(&config, ScriptedGenerator::default())
}

#[tokio::test]
async fn test_grade_normalizes_answers_like_the_session() {
    let quiz = json!({
        "questions": [
            {"question": "Water is wet.", "type": "true_false",
             "options": ["True", "False"], "correct_answer": "True", "explanation": ""}
        ],
        "requested": 3,
        "difficulty": "easy"
    });
    let (dir, quiz_path, answers_path) = grade_inputs(quiz, r#"["true"]"#);

    grading_app(&dir)
        .run(Command::Grade {
            quiz: quiz_path,
            answers: answers_path,
        })
        .await
        .unwrap();

    let report = std::fs::read_to_string(dir.path().join("out/check_results.txt")).unwrap();
    assert!(report.starts_with("Score: 1/1 (100%)"), "{}", report);
    assert!(report.contains("Your answer: True"));
}

#[tokio::test]
async fn test_grade_rejects_answer_outside_options() {
    let quiz = json!({
        "questions": [
            {"question": "Sky colour?", "type": "mcq",
             "options": ["Red", "Green", "Blue", "Yellow"],
             "correct_answer": "Blue", "explanation": ""}
        ],
        "requested": 3,
        "difficulty": "easy"
    });
    let (dir, quiz_path, answers_path) = grade_inputs(quiz, r#"["Purple"]"#);

    let err = grading_app(&dir)
        .run(Command::Grade {
            quiz: quiz_path,
            answers: answers_path,
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<WorkflowError>(),
        Some(WorkflowError::InvalidAnswer { index: 0, .. })
    ));
    assert!(!dir.path().join("out/check_results.txt").exists());
}

#[tokio::test]
async fn test_grade_rejects_malformed_question() {
    // 选择题只有 3 个选项
    let quiz = json!({
        "questions": [
            {"question": "Sky colour?", "type": "mcq",
             "options": ["Red", "Green", "Blue"],
             "correct_answer": "Blue", "explanation": ""}
        ],
        "requested": 3,
        "difficulty": "easy"
    });
    let (dir, quiz_path, answers_path) = grade_inputs(quiz, r#"["Blue"]"#);

    let err = grading_app(&dir)
        .run(Command::Grade {
            quiz: quiz_path,
            answers: answers_path,
        })
        .await
        .unwrap_err();
    assert!(err.to_string().contains("question 1 is invalid"), "{}", err);
}
