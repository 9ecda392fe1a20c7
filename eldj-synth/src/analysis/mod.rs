//! Free text → structured musical intent
//!
//! The model is asked for a JSON descriptor. One corrective retry is allowed
//! when the answer does not parse, then the keyword heuristic takes over.

mod heuristic;
mod parse;
mod prompts;

pub use heuristic::{genre_energy, heuristic_descriptor};
pub use parse::{extract_json_object, parse_descriptor, ParseFailure};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::MarketTable;
use crate::llm::{ChatMessage, LanguageModel, LlmError};
use crate::types::{DescriptorSource, IntentDescriptor};

/// Which prompt template an analysis uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentRequest {
    /// Mood text → mood playlist
    Mood,
    /// Playlist request with a target size
    Custom { num_songs: usize },
}

/// Analysis failures surfaced to the engine
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Model unavailable: {0}")]
    Model(#[from] LlmError),

    #[error("Model answer unusable: {0}")]
    Unparsable(#[from] ParseFailure),

    #[error("No musical intent could be derived from the text")]
    NoIntent,
}

/// What to do when the model answer is unusable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryPolicy {
    /// Send one correction follow-up after the first parse failure
    pub retry_with_correction: bool,
    /// Fall back to the keyword heuristic when the model path fails
    pub heuristic_fallback: bool,
}

impl Default for RecoveryPolicy {
    fn default() -> Self {
        Self {
            retry_with_correction: true,
            heuristic_fallback: true,
        }
    }
}

/// Text-to-intent capability
#[async_trait]
pub trait TextToIntent: Send + Sync {
    async fn analyze(
        &self,
        free_text: &str,
        language: &str,
        request: IntentRequest,
    ) -> Result<IntentDescriptor, AnalysisError>;
}

/// Model-backed analyzer with explicit recovery
pub struct SemanticAnalyzer<M: LanguageModel> {
    model: M,
    policy: RecoveryPolicy,
    markets: MarketTable,
    temperature: f32,
}

impl<M: LanguageModel> SemanticAnalyzer<M> {
    pub fn new(model: M, policy: RecoveryPolicy, markets: MarketTable, temperature: f32) -> Self {
        Self {
            model,
            policy,
            markets,
            temperature,
        }
    }

    /// Model path only: first answer, then at most one corrected answer
    async fn analyze_with_model(
        &self,
        free_text: &str,
        language: &str,
        request: IntentRequest,
    ) -> Result<IntentDescriptor, AnalysisError> {
        let options = prompts::completion_options(request, self.temperature);
        let mut messages = prompts::build_messages(free_text, language, request, &self.markets);

        let first = self.model.complete(&messages, &options).await?;
        let failure = match parse_descriptor(&first, DescriptorSource::Model) {
            Ok(descriptor) => return Ok(descriptor),
            Err(failure) => failure,
        };

        if !self.policy.retry_with_correction {
            return Err(failure.into());
        }

        warn!(model = self.model.model(), reason = %failure, "Model answer rejected, retrying with correction");
        messages.push(ChatMessage::assistant(first));
        messages.push(prompts::correction_message(&failure));

        let second = self.model.complete(&messages, &options).await?;
        Ok(parse_descriptor(&second, DescriptorSource::ModelRetry)?)
    }
}

#[async_trait]
impl<M: LanguageModel> TextToIntent for SemanticAnalyzer<M> {
    async fn analyze(
        &self,
        free_text: &str,
        language: &str,
        request: IntentRequest,
    ) -> Result<IntentDescriptor, AnalysisError> {
        let descriptor = match self.analyze_with_model(free_text, language, request).await {
            Ok(descriptor) => descriptor,
            Err(e) if self.policy.heuristic_fallback => {
                warn!(model = self.model.model(), error = %e, "Model analysis failed, using keyword heuristic");
                heuristic_descriptor(free_text).ok_or(AnalysisError::NoIntent)?
            }
            Err(e) => return Err(e),
        };

        info!(
            source = descriptor.source.as_str(),
            genres = descriptor.genres.len(),
            energy = descriptor.energy_level,
            "Intent analyzed"
        );
        Ok(descriptor)
    }
}
