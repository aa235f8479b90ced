//! Consensus judge: asks a model whether the debate has converged.
//!
//! The model is told to reply with a bare JSON verdict. Replies that cannot be
//! recovered as a [`Verdict`] are retried with a corrective instruction; after
//! [`MAX_JUDGE_ATTEMPTS`] failures the judge falls back to the default
//! (non-converged, strength 0) verdict instead of failing the run.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::types::{Transcript, Verdict};
use crate::error::LlmError;
use crate::llm::{GenerationRequest, LlmProvider, Message};
use crate::utils::json_extraction::{parse_structured_with, ExtractionStrategy};

/// Total attempts per evaluation, including the first.
pub const MAX_JUDGE_ATTEMPTS: usize = 3;

/// System instruction for the judge.
pub const JUDGE_SYSTEM_PROMPT: &str = r#"You are a consensus judge. Analyze the debate transcript and return ONLY valid JSON in this exact format:
{"consensus_detected": bool, "consensus_position": "...", "agreement_score": 1-10, "dissenting_agents": ["..."]}
Do NOT include any other text, explanation, or markdown formatting. Return ONLY the JSON object."#;

/// Corrective instruction appended on retries.
pub const JUDGE_RETRY_PROMPT: &str =
    "Your previous response was not valid JSON. Return ONLY a JSON object, no markdown, no explanation.";

/// Evaluates a transcript for consensus.
#[async_trait]
pub trait ConsensusJudge: Send + Sync {
    /// Produces a fresh verdict for `transcript`.
    ///
    /// Fails only when the remote call itself fails (or is cancelled);
    /// unparseable model output degrades to [`Verdict::default`].
    async fn evaluate(
        &self,
        transcript: &Transcript,
        cancel: &CancellationToken,
    ) -> Result<Verdict, LlmError>;
}

/// Judge backed by an LLM provider.
pub struct LlmJudge {
    llm: Arc<dyn LlmProvider>,
    model: String,
    strategies: Vec<ExtractionStrategy>,
}

impl LlmJudge {
    /// Creates a judge that queries `model` through `llm`.
    pub fn new(llm: Arc<dyn LlmProvider>, model: impl Into<String>) -> Self {
        Self {
            llm,
            model: model.into(),
            strategies: ExtractionStrategy::ORDERED.to_vec(),
        }
    }

    /// Overrides the extraction strategies and their order.
    pub fn with_strategies(mut self, strategies: Vec<ExtractionStrategy>) -> Self {
        self.strategies = strategies;
        self
    }

    /// Returns the judge's model id.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Messages for the given attempt (0-based).
    fn build_messages(&self, transcript_text: &str, attempt: usize) -> Vec<Message> {
        let mut messages = vec![
            Message::system(JUDGE_SYSTEM_PROMPT),
            Message::user(transcript_text),
        ];
        if attempt > 0 {
            messages.push(Message::user(JUDGE_RETRY_PROMPT));
        }
        messages
    }

    /// Recovers a verdict from a raw reply.
    pub fn parse_verdict(&self, raw: &str) -> Option<Verdict> {
        match parse_structured_with::<Verdict>(raw, &self.strategies) {
            Ok((verdict, strategy)) => {
                debug!(strategy = %strategy, "Parsed consensus verdict");
                Some(verdict)
            }
            Err(e) => {
                debug!(error = %e, "Consensus verdict could not be parsed");
                None
            }
        }
    }
}

#[async_trait]
impl ConsensusJudge for LlmJudge {
    async fn evaluate(
        &self,
        transcript: &Transcript,
        cancel: &CancellationToken,
    ) -> Result<Verdict, LlmError> {
        let transcript_text = transcript.render_lines();

        for attempt in 0..MAX_JUDGE_ATTEMPTS {
            if cancel.is_cancelled() {
                return Err(LlmError::Cancelled);
            }

            let request =
                GenerationRequest::new(&self.model, self.build_messages(&transcript_text, attempt));
            let response = self.llm.generate(request, cancel).await?;
            let raw = response.first_content().unwrap_or_default();

            if let Some(verdict) = self.parse_verdict(raw) {
                return Ok(verdict);
            }

            warn!(
                attempt = attempt + 1,
                max_attempts = MAX_JUDGE_ATTEMPTS,
                "Judge reply was not a valid verdict"
            );
        }

        warn!("Judge retries exhausted, treating debate as not converged");
        Ok(Verdict::default())
    }
}
