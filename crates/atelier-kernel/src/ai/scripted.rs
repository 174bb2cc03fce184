//! Scripted backend: replays canned results in order.
//!
//! Used by tests and offline demos. Every request is recorded so callers can
//! check what the studio sent.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::client::{CodeGenerator, GenerateError, GenerateRequest};
use crate::patch::CodePatch;

#[derive(Debug, Default)]
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<Result<CodePatch, GenerateError>>>,
    requests: Mutex<Vec<GenerateRequest>>,
    delay: Option<Duration>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful reply.
    pub fn with_patch(self, patch: CodePatch) -> Self {
        self.with_reply(Ok(patch))
    }

    /// Queue a failing reply.
    pub fn with_error(self, error: GenerateError) -> Self {
        self.with_reply(Err(error))
    }

    pub fn with_reply(mut self, reply: Result<CodePatch, GenerateError>) -> Self {
        self.replies.get_mut().push_back(reply);
        self
    }

    /// Sleep this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Requests received so far.
    pub async fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().await.clone()
    }

    /// Replies not yet consumed.
    pub async fn remaining(&self) -> usize {
        self.replies.lock().await.len()
    }
}

#[async_trait]
impl CodeGenerator for ScriptedGenerator {
    async fn generate(&self, request: &GenerateRequest) -> Result<CodePatch, GenerateError> {
        self.requests.lock().await.push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.replies
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(GenerateError::Service("no scripted reply left".to_string())))
    }
}
