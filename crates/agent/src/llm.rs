use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;

/// Boundary to the hosted chat model. Implementations own transport,
/// authentication, and timeouts; callers only see text in, text out.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;
}

/// Bootstrap stub that echoes the prompt back. Stands in for a real
/// provider in the CLI until one is wired up.
#[derive(Clone, Copy, Debug, Default)]
pub struct EchoModel;

#[async_trait]
impl ModelClient for EchoModel {
    async fn generate(&self, _system_prompt: &str, user_prompt: &str) -> Result<String> {
        Ok(format!("[echo model] {user_prompt}"))
    }
}

/// Replays a fixed sequence of canned responses and counts calls. Used by
/// tests to script multi-attempt conversations deterministically.
#[derive(Debug, Default)]
pub struct ScriptedModel {
    responses: Mutex<VecDeque<String>>,
    calls: AtomicUsize,
}

impl ScriptedModel {
    pub fn new(responses: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelClient for ScriptedModel {
    async fn generate(&self, _system_prompt: &str, _user_prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut responses = self.responses.lock().expect("scripted responses poisoned");
        responses
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("scripted model ran out of responses"))
    }
}
