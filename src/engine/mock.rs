//! A deterministic engine used for tests and for running the scheduler
//! without a real inference backend wired in.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{EngineError, InferenceEngine};
use crate::clock::Context;
use crate::core::types::{InferenceRequest, InferenceResponse};

#[derive(Debug, Default)]
struct Vocab {
    word_to_id: HashMap<String, i32>,
    id_to_word: Vec<String>,
}

impl Vocab {
    fn intern(&mut self, word: &str) -> i32 {
        if let Some(id) = self.word_to_id.get(word) {
            return *id;
        }
        let id = self.id_to_word.len() as i32;
        self.id_to_word.push(word.to_string());
        self.word_to_id.insert(word.to_string(), id);
        id
    }
}

#[derive(Debug)]
pub struct MockEngine {
    initialized: bool,
    vocab: Mutex<Vocab>,
}

impl MockEngine {
    #[must_use]
    pub fn new() -> Self {
        Self {
            initialized: false,
            vocab: Mutex::new(Vocab::default()),
        }
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InferenceEngine for MockEngine {
    async fn initialize(&mut self, _model_ref: &str) -> Result<(), EngineError> {
        if self.initialized {
            return Err(EngineError::AlreadyInitialized);
        }
        self.initialized = true;
        Ok(())
    }

    async fn generate(&self, ctx: &Context, request: &InferenceRequest) -> Result<InferenceResponse, EngineError> {
        tokio::task::yield_now().await;
        if ctx.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        let output = format!("[{}:{}] {}", request.stream_id, request.step, request.prompt);
        let mut tokens = self.tokenize(&output);
        tokens.truncate(request.max_tokens as usize);
        Ok(InferenceResponse::from_request(request, output, tokens, 1))
    }

    async fn embed(&self, ctx: &Context, input: &str) -> Result<Vec<f32>, EngineError> {
        if ctx.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        let tokens = self.tokenize(input);
        let dim = 32;
        let mut vector = vec![0.0_f32; dim];
        for (i, t) in tokens.iter().enumerate() {
            vector[i % dim] += (*t as f32).sin();
        }
        Ok(vector)
    }

    fn tokenize(&self, text: &str) -> Vec<i32> {
        let mut vocab = self.vocab.lock().expect("mock engine vocab mutex poisoned");
        text.split_whitespace().map(|w| vocab.intern(w)).collect()
    }

    fn detokenize(&self, tokens: &[i32]) -> String {
        let vocab = self.vocab.lock().expect("mock engine vocab mutex poisoned");
        tokens
            .iter()
            .filter_map(|id| vocab.id_to_word.get(*id as usize).cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }

    async fn save_state(&self) -> Result<Vec<u8>, EngineError> {
        let vocab = self.vocab.lock().expect("mock engine vocab mutex poisoned");
        Ok(vocab.id_to_word.join("\n").into_bytes())
    }

    async fn load_state(&mut self, bytes: &[u8]) -> Result<(), EngineError> {
        let text = String::from_utf8_lossy(bytes);
        let mut vocab = self.vocab.lock().expect("mock engine vocab mutex poisoned");
        *vocab = Vocab::default();
        for word in text.split('\n').filter(|w| !w.is_empty()) {
            vocab.intern(word);
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), EngineError> {
        self.initialized = false;
        Ok(())
    }
}
