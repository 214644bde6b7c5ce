//! Inference Engine Pool (C7): a uniform contract over
//! {Generate, Embed, Tokenize, Detokenize, SaveState, LoadState},
//! implemented by one engine per stream.
//!
//! Engines are never shared across streams, so concurrency between
//! streams is safe by construction: each stream's scheduler worker owns
//! its engine exclusively.

mod mock;

pub use mock::MockEngine;

use async_trait::async_trait;
use thiserror::Error;

use crate::clock::Context;
use crate::core::types::{InferenceRequest, InferenceResponse};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine already initialized")]
    AlreadyInitialized,
    #[error("resource unavailable: {0}")]
    ResourceUnavailable(String),
    #[error("engine call cancelled")]
    Cancelled,
    #[error("deadline exceeded")]
    DeadlineExceeded,
    #[error("engine unavailable: {0}")]
    Unavailable(String),
}

/// Which backend a stream's engine is wired to. Only `Mock` ships a full
/// implementation in the core; `Local`/`Accelerated`/`Remote` name the
/// contract's other points of variation without binding to a specific
/// model provider (out of scope per the runtime's external boundary).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    Mock,
    Local,
    Accelerated,
    Remote,
}

#[async_trait]
pub trait InferenceEngine: Send + Sync {
    async fn initialize(&mut self, model_ref: &str) -> Result<(), EngineError>;

    async fn generate(&self, ctx: &Context, request: &InferenceRequest) -> Result<InferenceResponse, EngineError>;

    async fn embed(&self, ctx: &Context, input: &str) -> Result<Vec<f32>, EngineError>;

    fn tokenize(&self, text: &str) -> Vec<i32>;

    fn detokenize(&self, tokens: &[i32]) -> String;

    async fn save_state(&self) -> Result<Vec<u8>, EngineError>;

    async fn load_state(&mut self, bytes: &[u8]) -> Result<(), EngineError>;

    async fn close(&mut self) -> Result<(), EngineError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::StreamId;

    #[tokio::test]
    async fn mock_engine_respects_context_cancellation() {
        let mut engine = MockEngine::new();
        engine.initialize("mock-v1").await.unwrap();

        let ctx = Context::with_timeout(std::time::Duration::from_secs(5));
        ctx.cancel();

        let request = InferenceRequest::new(1, StreamId::Alpha, "hello", 16);
        let result = engine.generate(&ctx, &request).await;
        assert!(matches!(result, Err(EngineError::Cancelled)));
    }

    #[tokio::test]
    async fn mock_engine_generates_deterministic_length_output() {
        let mut engine = MockEngine::new();
        engine.initialize("mock-v1").await.unwrap();
        let ctx = Context::with_timeout(std::time::Duration::from_secs(5));
        let request = InferenceRequest::new(1, StreamId::Alpha, "hello", 8);
        let response = engine.generate(&ctx, &request).await.unwrap();
        assert!(response.tokens.len() <= 8);
        assert_eq!(response.stream_id, StreamId::Alpha);
    }

    #[test]
    fn tokenize_and_detokenize_round_trip_word_boundaries() {
        let engine = MockEngine::new();
        let tokens = engine.tokenize("hello world");
        let text = engine.detokenize(&tokens);
        assert_eq!(text, "hello world");
    }
}
