//! 集成测试共用的脚本化生成器和样例数据

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Mutex;

use doc_quiz::error::GenerationError;
use doc_quiz::{Prompt, TextGenerator};

/// 按脚本依次返回结果，并记录收到的提示词
#[derive(Default)]
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<Result<Value, GenerationError>>>,
    prompts: Mutex<Vec<Prompt>>,
}

impl ScriptedGenerator {
    pub fn new(replies: Vec<Result<Value, GenerationError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn push(&self, reply: Result<Value, GenerationError>) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn prompts(&self) -> Vec<Prompt> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &Prompt, _schema: &Value) -> Result<Value, GenerationError> {
        self.prompts.lock().unwrap().push(prompt.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GenerationError::unavailable("script exhausted")))
    }
}

/// 永不返回的生成器，用于测试取消
pub struct PendingGenerator;

#[async_trait]
impl TextGenerator for PendingGenerator {
    async fn generate(&self, _prompt: &Prompt, _schema: &Value) -> Result<Value, GenerationError> {
        futures::future::pending().await
    }
}

/// `pages` 页、每页 `words_per_page` 词的文档，每页以 `page<N>` 开头
pub fn document_pages(pages: usize, words_per_page: usize) -> Vec<String> {
    (0..pages)
        .map(|p| {
            let mut words = vec![format!("page{}", p)];
            words.extend((1..words_per_page).map(|i| format!("w{}", i % 97)));
            words.join(" ")
        })
        .collect()
}

pub fn words(n: usize) -> String {
    vec!["word"; n].join(" ")
}

pub fn bullet_summary(bullets: usize, words_per_bullet: usize) -> Value {
    let lines: Vec<String> = (0..bullets)
        .map(|_| format!("- {}", words(words_per_bullet)))
        .collect();
    json!({"summary": lines.join("\n"), "key_topics": ["alpha", "beta", "gamma"]})
}

pub fn mcq(question: &str) -> Value {
    json!({
        "question": question,
        "type": "mcq",
        "options": ["A) Red", "B) Green", "C) Blue", "D) Yellow"],
        "correct_answer": "C",
        "explanation": "The document says so."
    })
}

pub fn true_false(question: &str, answer: &str) -> Value {
    json!({
        "question": question,
        "type": "true_false",
        "options": ["True", "False"],
        "correct_answer": answer,
        "explanation": "The document says so."
    })
}
