#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

use webmind::config::TokenLimits;
use webmind::generate::GenerationClient;
use webmind::provider::{CompletionBackend, ProviderError};
use webmind::wire::{Completion, CompletionRequest};

/// Backend that plays back a fixed list of answers in order.
#[derive(Default)]
pub struct Scripted {
    answers: Mutex<VecDeque<Result<String, ProviderError>>>,
    pub seen: Mutex<Vec<CompletionRequest>>,
}

impl Scripted {
    pub fn new(answers: Vec<Result<String, ProviderError>>) -> Arc<Self> {
        Arc::new(Self { answers: Mutex::new(answers.into()), seen: Mutex::default() })
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().len()
    }
}

#[async_trait]
impl CompletionBackend for Scripted {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn complete(&self, req: &CompletionRequest) -> Result<Completion, ProviderError> {
        self.seen.lock().push(req.clone());
        match self.answers.lock().pop_front() {
            Some(answer) => answer.map(|text| Completion { text }),
            None => Err(ProviderError::Malformed("script exhausted".into())),
        }
    }
}

pub fn client(backend: Arc<Scripted>) -> Arc<GenerationClient> {
    Arc::new(GenerationClient::new(backend, TokenLimits::default(), 0.7))
}

pub const YOGA_MARKUP: &str = r#"<think>The user wants a calm landing page.</think>
<!DOCTYPE html>
<html>
<head><title>Sunrise Yoga</title></head>
<body>
  <header><nav>Sunrise Yoga</nav></header>
  <section class="hero"><h1>Breathe. Stretch. Grow.</h1></section>
  <section id="classes"><h2>Our Classes</h2></section>
  <footer><p>Open daily</p></footer>
</body>
</html>"#;
