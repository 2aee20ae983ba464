//! Shared fixtures for pipeline and router tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::config::Config;
use crate::llm_client::{GenerationParams, LlmError, ProviderHandle, TextGenerator};
use crate::state::AppState;

/// What the scripted generator does on its next call.
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    Delayed(Duration, String),
    Fail(String),
    /// Sleeps for the duration, then answers; used to trip deadlines.
    Hang(Duration),
}

/// Replays a fixed list of replies in order and records every call.
/// Once the script runs out it keeps answering with a generic text.
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<Reply>>,
    calls: Mutex<Vec<(String, GenerationParams)>>,
}

impl ScriptedGenerator {
    pub fn new(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn prompts(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(p, _)| p.clone()).collect()
    }

    pub fn params(&self) -> Vec<GenerationParams> {
        self.calls.lock().unwrap().iter().map(|(_, p)| *p).collect()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String, LlmError> {
        self.calls.lock().unwrap().push((prompt.to_string(), *params));
        let reply = self.replies.lock().unwrap().pop_front();

        match reply {
            Some(Reply::Text(text)) => Ok(text),
            Some(Reply::Delayed(delay, text)) => {
                tokio::time::sleep(delay).await;
                Ok(text)
            }
            Some(Reply::Fail(message)) => Err(LlmError::Api {
                status: 503,
                message,
            }),
            Some(Reply::Hang(delay)) => {
                tokio::time::sleep(delay).await;
                Ok("late answer".to_string())
            }
            None => Ok("Generated content with sufficient length for testing".to_string()),
        }
    }
}

pub fn state_with(config: Config, generator: Arc<ScriptedGenerator>) -> AppState {
    let provider = ProviderHandle::new(move || Ok(Arc::clone(&generator) as Arc<dyn TextGenerator>));
    AppState::new(config, provider)
}

/// Resume-like filler of exactly `len` characters.
pub fn resume_of_len(len: usize) -> String {
    "Backend engineer shipping Rust services. "
        .chars()
        .cycle()
        .take(len)
        .collect()
}

pub fn valid_resume() -> String {
    "Senior Software Engineer with 5+ years of experience in Rust, Axum, and cloud technologies. \
     Led multiple teams and delivered scalable solutions. Expert in microservices architecture \
     and DevOps practices. Experienced in AWS, GCP, Docker, Kubernetes, and CI/CD pipelines. \
     Mentored junior developers."
        .to_string()
}

pub fn valid_job_description() -> String {
    "We are seeking a Senior Backend Engineer with expertise in Rust and async services. \
     Must have experience with cloud platforms, microservices, and AI integration. \
     Strong leadership and communication skills required. Experience with AWS or GCP preferred. \
     Comfortable mentoring junior developers."
        .to_string()
}
