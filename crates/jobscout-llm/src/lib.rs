//! Completion-service integration.
//!
//! Wraps an OpenAI-compatible chat completions endpoint behind the
//! [`CompletionBackend`] trait and builds the higher-level operations
//! the chat engine relies on: structured query parsing, relevance
//! classification, intent understanding, relevance filtering, best and
//! worst ranking, and free-form assistant replies. Every operation
//! either degrades to a deterministic local fallback or reports a
//! recoverable error the engine converts into one.

pub mod client;
pub mod decode;
pub mod mock;
pub mod prompt;
pub mod service;

pub use client::{ChatMessage, CompletionBackend, CompletionClient, CompletionOptions};
pub use mock::MockBackend;
pub use service::{
    CompletionService, IntentGuess, Ranking, RelevanceFilter, RelevanceVerdict,
};
