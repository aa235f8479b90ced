//! Debate engine: drives rounds, judge checkpoints and the contrarian phase.
//!
//! A run has two phases. During free debate every participant speaks once
//! per round; from `min_rounds` on, the judge is consulted after each round.
//! A converged verdict with strength at or above [`CONVERGENCE_THRESHOLD`]
//! ends free debate, brings in the Tenth Man and runs exactly
//! [`CONTRARIAN_ROUNDS`] more rounds, followed by one final evaluation.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::contrarian::build_contrarian;
use super::judge::ConsensusJudge;
use super::observer::{DebateObserver, NoopObserver};
use super::prompts::build_turn_messages;
use super::types::{Participant, Phase, RunResult, Transcript, Turn, Verdict};
use crate::error::DebateError;
use crate::llm::{GenerationRequest, LlmProvider};

/// Minimum agreement strength that triggers the contrarian phase.
pub const CONVERGENCE_THRESHOLD: u8 = 7;

/// Number of rounds played once the contrarian has joined.
pub const CONTRARIAN_ROUNDS: u32 = 3;

/// Default minimum number of free-debate rounds.
pub const DEFAULT_MIN_ROUNDS: u32 = 5;

/// Default maximum number of free-debate rounds.
pub const DEFAULT_MAX_ROUNDS: u32 = 15;

/// Round limits and contrarian settings for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// First round after which the judge is consulted.
    pub min_rounds: u32,
    /// Hard cap on free-debate rounds.
    pub max_rounds: u32,
    /// Model used by the contrarian; falls back to the first participant's.
    pub contrarian_model: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_rounds: DEFAULT_MIN_ROUNDS,
            max_rounds: DEFAULT_MAX_ROUNDS,
            contrarian_model: None,
        }
    }
}

impl EngineConfig {
    /// Creates a config with the given round limits.
    pub fn new(min_rounds: u32, max_rounds: u32) -> Self {
        Self {
            min_rounds,
            max_rounds,
            contrarian_model: None,
        }
    }

    /// Sets the contrarian's model.
    pub fn with_contrarian_model(mut self, model: impl Into<String>) -> Self {
        self.contrarian_model = Some(model.into());
        self
    }
}

/// Runs one debate to completion.
pub struct DebateEngine {
    participants: Vec<Participant>,
    contrarian: Option<Participant>,
    llm: Arc<dyn LlmProvider>,
    judge: Arc<dyn ConsensusJudge>,
    config: EngineConfig,
    observer: Box<dyn DebateObserver>,
    transcript: Transcript,
}

impl DebateEngine {
    /// Creates an engine for `topic`.
    ///
    /// Participants are expected to be pre-validated (at least three).
    pub fn new(
        topic: impl Into<String>,
        participants: Vec<Participant>,
        llm: Arc<dyn LlmProvider>,
        judge: Arc<dyn ConsensusJudge>,
        config: EngineConfig,
    ) -> Self {
        Self {
            participants,
            contrarian: None,
            llm,
            judge,
            config,
            observer: Box::new(NoopObserver),
            transcript: Transcript::new(topic),
        }
    }

    /// Sets the observer that receives turns and phase changes.
    pub fn with_observer(mut self, observer: Box<dyn DebateObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// The transcript so far. After a failed run this holds every turn
    /// produced before the failure.
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// The contrarian, once the contrarian phase has begun.
    pub fn contrarian(&self) -> Option<&Participant> {
        self.contrarian.as_ref()
    }

    /// Everyone currently speaking each round, in speaking order.
    pub fn roster(&self) -> Vec<Participant> {
        self.participants
            .iter()
            .chain(self.contrarian.iter())
            .cloned()
            .collect()
    }

    /// Runs the debate.
    ///
    /// Each call starts from an empty transcript.
    pub async fn run(&mut self, cancel: &CancellationToken) -> Result<RunResult, DebateError> {
        self.transcript = Transcript::new(std::mem::take(&mut self.transcript.topic));
        self.contrarian = None;

        info!(
            topic = %self.transcript.topic,
            participants = self.participants.len(),
            min_rounds = self.config.min_rounds,
            max_rounds = self.config.max_rounds,
            "Starting debate"
        );
        self.enter_phase(Phase::FreeDebate);

        let mut verdict: Option<Verdict> = None;
        let mut boundary = 0;

        for round in 1..=self.config.max_rounds {
            self.run_round(round, cancel).await?;
            boundary = round;

            if round < self.config.min_rounds {
                continue;
            }

            let checkpoint = self
                .judge
                .evaluate(&self.transcript, cancel)
                .await
                .map_err(|e| DebateError::judge("consensus evaluation", e))?;
            info!(
                round,
                converged = checkpoint.converged,
                strength = checkpoint.strength,
                "Consensus checkpoint"
            );

            let triggered = checkpoint.meets(CONVERGENCE_THRESHOLD);
            verdict = Some(checkpoint);
            if triggered {
                break;
            }
        }

        let position = match &verdict {
            Some(v) if v.meets(CONVERGENCE_THRESHOLD) => v.position.clone(),
            _ => {
                info!(rounds = boundary, "Debate ended without strong consensus");
                return Ok(self.finish(verdict));
            }
        };

        self.activate_contrarian(position);

        for round in boundary + 1..=boundary + CONTRARIAN_ROUNDS {
            self.run_round(round, cancel).await?;
        }

        let final_verdict = self
            .judge
            .evaluate(&self.transcript, cancel)
            .await
            .map_err(|e| DebateError::judge("final consensus evaluation", e))?;
        info!(
            converged = final_verdict.converged,
            strength = final_verdict.strength,
            "Final consensus evaluation"
        );

        Ok(self.finish(Some(final_verdict)))
    }

    fn enter_phase(&mut self, phase: Phase) {
        self.transcript.phase = phase;
        info!(phase = %phase, "Phase started");
        self.observer.on_phase(phase);
    }

    fn activate_contrarian(&mut self, position: String) {
        self.enter_phase(Phase::ContrarianPhase);

        let model = self.config.contrarian_model.clone().unwrap_or_else(|| {
            self.participants
                .first()
                .map(|p| p.model.clone())
                .unwrap_or_default()
        });
        let id = self.participants.len() as u32 + 1;
        let contrarian = build_contrarian(position, id, model);
        info!(id, model = %contrarian.model, "Contrarian joined the debate");
        self.contrarian = Some(contrarian);
    }

    async fn run_round(&mut self, round: u32, cancel: &CancellationToken) -> Result<(), DebateError> {
        debug!(round, phase = %self.transcript.phase, "Round started");

        for participant in self.roster() {
            if cancel.is_cancelled() {
                return Err(DebateError::Cancelled);
            }

            let messages = build_turn_messages(&participant, &self.transcript);
            let request = GenerationRequest::new(&participant.model, messages);
            let response = self
                .llm
                .generate(request, cancel)
                .await
                .map_err(|e| DebateError::participant(&participant.name, e))?;

            let turn = Turn {
                round,
                content: response.first_content().unwrap_or_default().to_string(),
                participant,
            };
            debug!(
                round,
                participant = %turn.participant.name,
                chars = turn.content.len(),
                "Turn produced"
            );

            self.transcript.push(turn.clone());
            self.observer.on_turn(&turn);
        }

        self.transcript.rounds = round;
        Ok(())
    }

    fn finish(&self, verdict: Option<Verdict>) -> RunResult {
        RunResult {
            transcript: self.transcript.clone(),
            verdict,
        }
    }
}
