//! Request orchestration: runs one generation request end to end.
//!
//! Flow: Received → Sanitized → LengthValidated → RateLimitChecked →
//!       CoverLetterGenerated → BulletsGenerated → Completed
//!
//! Any step may end the request with an `AppError`. The response is assembled
//! only after both generations succeed, so a caller never sees a cover letter
//! without bullets.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::executor::ExecutorError;
use crate::generation::prompts::{build_bullets_prompt, build_cover_letter_prompt};
use crate::generation::sanitizer::{sanitize, validate_min_length, MIN_TEXT_CHARS};
use crate::llm_client::GenerationParams;
use crate::rate_limit::{derive_key, Caller, RateLimitKey};
use crate::state::AppState;

pub const DEFAULT_TONE: &str = "balanced professional";

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

/// Request body for `POST /generate/all`.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationRequest {
    pub resume_text: String,
    pub job_description: String,
    #[serde(default)]
    pub tone_hint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResponse {
    pub cover_letter: String,
    pub bullets: String,
}

/// Where a request is in its lifecycle. Failure is the `Err` side of the
/// pipeline result rather than a variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Received,
    Sanitized,
    LengthValidated,
    RateLimitChecked,
    CoverLetterGenerated,
    BulletsGenerated,
    Completed,
}

/// The two provider calls a request makes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationStage {
    CoverLetter,
    Bullets,
}

impl GenerationStage {
    pub fn params(self) -> GenerationParams {
        let max_output_tokens = match self {
            GenerationStage::CoverLetter => 2048,
            GenerationStage::Bullets => 1024,
        };
        GenerationParams {
            temperature: 0.5,
            top_p: 0.95,
            max_output_tokens,
        }
    }

    /// Human wording used in caller-facing messages.
    pub fn noun(self) -> &'static str {
        match self {
            GenerationStage::CoverLetter => "cover letter",
            GenerationStage::Bullets => "resume bullets",
        }
    }
}

impl fmt::Display for GenerationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GenerationStage::CoverLetter => "cover_letter",
            GenerationStage::Bullets => "bullets",
        })
    }
}

struct SanitizedInput {
    resume: String,
    job_description: String,
    tone: String,
}

struct Pipeline {
    state: PipelineState,
}

impl Pipeline {
    fn enter(&mut self, next: PipelineState) {
        debug!("Pipeline {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Pipeline
// ────────────────────────────────────────────────────────────────────────────

/// Runs the full generation pipeline for one request.
pub async fn generate_all(
    state: &AppState,
    caller: &Caller,
    request: GenerationRequest,
) -> Result<GenerationResponse, AppError> {
    let span = info_span!("generate_all", request_id = %Uuid::new_v4());

    async move {
        let mut pipeline = Pipeline {
            state: PipelineState::Received,
        };
        let result = run(&mut pipeline, state, caller, request).await;
        if let Err(e) = &result {
            debug!("Request failed after {:?}: {}", pipeline.state, e);
        }
        result
    }
    .instrument(span)
    .await
}

async fn run(
    pipeline: &mut Pipeline,
    state: &AppState,
    caller: &Caller,
    request: GenerationRequest,
) -> Result<GenerationResponse, AppError> {
    let input = sanitize_request(&request)?;
    pipeline.enter(PipelineState::Sanitized);

    validate_min_length(&input.resume, MIN_TEXT_CHARS)?;
    validate_min_length(&input.job_description, MIN_TEXT_CHARS)?;
    pipeline.enter(PipelineState::LengthValidated);

    let key = derive_key(caller);
    if let Err(exceeded) = state.limiter.check_and_increment(&key) {
        warn!("Rate limit exceeded for {}...", key.log_prefix());
        return Err(AppError::RateLimited {
            retry_after: exceeded.retry_after,
        });
    }
    pipeline.enter(PipelineState::RateLimitChecked);

    let cover_letter = generate_stage(
        state,
        &key,
        GenerationStage::CoverLetter,
        build_cover_letter_prompt(&input.resume, &input.job_description, &input.tone),
    )
    .await?;
    pipeline.enter(PipelineState::CoverLetterGenerated);

    let bullets = generate_stage(
        state,
        &key,
        GenerationStage::Bullets,
        build_bullets_prompt(&input.resume, &input.job_description),
    )
    .await?;
    let bullets = collapse_blank_lines(&bullets);
    pipeline.enter(PipelineState::BulletsGenerated);

    info!(
        "Successfully generated content for rate_limit_key: {}...",
        key.log_prefix()
    );
    pipeline.enter(PipelineState::Completed);

    Ok(GenerationResponse {
        cover_letter,
        bullets,
    })
}

fn sanitize_request(request: &GenerationRequest) -> Result<SanitizedInput, AppError> {
    let resume = sanitize(&request.resume_text)?;
    let job_description = sanitize(&request.job_description)?;

    let tone = match request.tone_hint.as_deref() {
        Some(hint) => sanitize(hint)?,
        None => String::new(),
    };
    let tone = if tone.is_empty() {
        DEFAULT_TONE.to_string()
    } else {
        tone
    };

    Ok(SanitizedInput {
        resume,
        job_description,
        tone,
    })
}

/// One provider call under the configured deadline. Returns trimmed, non-empty text.
async fn generate_stage(
    state: &AppState,
    key: &RateLimitKey,
    stage: GenerationStage,
    prompt: String,
) -> Result<String, AppError> {
    info!("Generating {} for rate_limit_key: {}...", stage, key.log_prefix());

    let generator = state
        .provider
        .get()
        .await
        .map_err(|e| provider_failure(key, stage, e.to_string()))?;

    let params = stage.params();
    debug!("{} provider workers free", state.executor.available_workers());
    let outcome = state
        .executor
        .run(state.config.provider_timeout, async move {
            generator.generate(&prompt, &params).await
        })
        .await;

    let text = match outcome {
        Ok(text) => text,
        Err(ExecutorError::DeadlineExceeded(deadline)) => {
            warn!(
                "{} generation timed out after {}s for rate_limit_key: {}...",
                stage,
                deadline.as_secs(),
                key.log_prefix()
            );
            return Err(AppError::GenerationTimeout { stage });
        }
        Err(ExecutorError::Failed(e)) => return Err(provider_failure(key, stage, e.to_string())),
        Err(ExecutorError::Aborted(reason)) => return Err(provider_failure(key, stage, reason)),
    };

    let text = text.trim();
    if text.is_empty() {
        error!(
            "Empty {} generated for rate_limit_key: {}...",
            stage,
            key.log_prefix()
        );
        return Err(AppError::EmptyGeneration { stage });
    }

    Ok(text.to_string())
}

fn provider_failure(key: &RateLimitKey, stage: GenerationStage, detail: String) -> AppError {
    error!(
        "Provider failure during {} generation for rate_limit_key: {}...: {}",
        stage,
        key.log_prefix(),
        detail
    );
    AppError::Provider { stage, detail }
}

/// Removes blank lines between bullets: CRLF is normalized, then every
/// `\n\n` is folded until none remain.
pub fn collapse_blank_lines(text: &str) -> String {
    let mut out = text.replace("\r\n", "\n");
    while out.contains("\n\n") {
        out = out.replace("\n\n", "\n");
    }
    out.trim().to_string()
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
