//! Scripted completion provider for unit tests

use async_trait::async_trait;
use std::sync::Mutex;

use crate::error::Result;
use crate::providers::{CompletionProvider, CompletionRequest, ModelTier};

type Responder = dyn Fn(&CompletionRequest, usize) -> Result<String> + Send + Sync;

/// Replays responses from a closure and records every request
pub struct ScriptedProvider {
    responder: Box<Responder>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    /// `responder` receives the request and its zero-based call index
    pub fn new(responder: impl Fn(&CompletionRequest, usize) -> Result<String> + Send + Sync + 'static) -> Self {
        Self {
            responder: Box::new(responder),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Always answer with the same text
    pub fn constant(text: &str) -> Self {
        let text = text.to_string();
        Self::new(move |_, _| Ok(text.clone()))
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let index = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request.clone());
            requests.len() - 1
        };
        (self.responder)(request, index)
    }

    fn name(&self) -> &'static str {
        "scripted"
    }

    fn model(&self, tier: ModelTier) -> String {
        format!("scripted-{:?}", tier).to_lowercase()
    }
}
