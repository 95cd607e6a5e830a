//! Scripted completion backend for tests.
//!
//! Queues canned responses and records every request, so callers can
//! assert both the outputs and the prompts that produced them.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use jobscout_core::error::{JobscoutError, Result};

use crate::client::{ChatMessage, CompletionBackend, CompletionOptions};

enum Scripted {
    Text(String),
    Error(String),
}

/// In-memory [`CompletionBackend`] with a FIFO response script.
///
/// An exhausted script fails the call, which exercises the same code
/// paths as a completion-service outage.
#[derive(Default)]
pub struct MockBackend {
    script: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful response.
    pub fn push_text(&self, text: impl Into<String>) {
        self.script
            .lock()
            .expect("mock script lock")
            .push_back(Scripted::Text(text.into()));
    }

    /// Queue a failing response.
    pub fn push_error(&self, message: impl Into<String>) {
        self.script
            .lock()
            .expect("mock script lock")
            .push_back(Scripted::Error(message.into()));
    }

    /// All requests made so far, in call order.
    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().expect("mock request lock").clone()
    }

    /// Number of completions requested so far.
    pub fn call_count(&self) -> usize {
        self.requests.lock().expect("mock request lock").len()
    }
}

#[async_trait]
impl CompletionBackend for MockBackend {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        _options: CompletionOptions,
    ) -> Result<String> {
        self.requests
            .lock()
            .expect("mock request lock")
            .push(messages.to_vec());

        match self.script.lock().expect("mock script lock").pop_front() {
            Some(Scripted::Text(text)) => Ok(text),
            Some(Scripted::Error(message)) => Err(JobscoutError::Completion(message)),
            None => Err(JobscoutError::Completion(
                "mock backend: no scripted response".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_replays_script_in_order() {
        let mock = MockBackend::new();
        mock.push_text("first");
        mock.push_error("boom");

        let messages = [ChatMessage::user("hi")];
        let options = CompletionOptions::default();

        assert_eq!(mock.complete(&messages, options).await.unwrap(), "first");
        assert!(mock.complete(&messages, options).await.is_err());
        // Exhausted script keeps failing.
        assert!(mock.complete(&messages, options).await.is_err());
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn test_mock_records_requests() {
        let mock = MockBackend::new();
        mock.push_text("ok");
        mock.complete(&[ChatMessage::user("вопрос")], CompletionOptions::default())
            .await
            .unwrap();
        let requests = mock.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0][0].content, "вопрос");
    }
}
