//! Core data model for a debate run.

use serde::{Deserialize, Deserializer, Serialize};

/// Highest value on the agreement-strength scale.
pub const MAX_STRENGTH: u8 = 10;

// ============================================================================
// Participants
// ============================================================================

/// What a participant is in the debate for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Role {
    /// Regular debater.
    Debater,
    /// Mandated dissenter arguing against `position`.
    Contrarian {
        /// The converged position the contrarian must attack.
        position: String,
    },
}

impl Role {
    /// Returns true for the contrarian role.
    pub fn is_contrarian(&self) -> bool {
        matches!(self, Self::Contrarian { .. })
    }
}

/// A debate participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Stable numeric id (1-based).
    pub id: u32,
    /// Display name used in prompts and the transcript.
    pub name: String,
    /// Remote model identifier.
    pub model: String,
    /// Role in the debate.
    pub role: Role,
}

impl Participant {
    /// Creates a regular debater.
    pub fn debater(id: u32, name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            model: model.into(),
            role: Role::Debater,
        }
    }
}

// ============================================================================
// Transcript
// ============================================================================

/// The two stages of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Open debate among the original participants.
    #[default]
    FreeDebate,
    /// The contrarian has joined; never left once entered.
    ContrarianPhase,
}

impl Phase {
    /// Returns the display name for this phase.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::FreeDebate => "Free Debate",
            Self::ContrarianPhase => "Tenth Man",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// One participant's contribution in a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Round number (1-indexed).
    pub round: u32,
    /// Snapshot of the speaker.
    pub participant: Participant,
    /// Generated text; empty when the model returned no choices.
    pub content: String,
}

/// Append-only record of a debate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    /// Debate topic.
    pub topic: String,
    /// Turns in the order they were produced.
    pub turns: Vec<Turn>,
    /// Current phase.
    pub phase: Phase,
    /// Highest round completed.
    pub rounds: u32,
}

impl Transcript {
    /// Creates an empty transcript in the free-debate phase.
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            ..Self::default()
        }
    }

    /// Appends a turn.
    pub(crate) fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// Turns spoken in the given round.
    pub fn turns_in_round(&self, round: u32) -> impl Iterator<Item = &Turn> {
        self.turns.iter().filter(move |t| t.round == round)
    }

    /// Renders the transcript as one `name: content` line per turn.
    pub fn render_lines(&self) -> String {
        self.turns
            .iter()
            .map(|t| format!("{}: {}\n", t.participant.name, t.content))
            .collect()
    }
}

// ============================================================================
// Verdict
// ============================================================================

/// Structured judgement of how far participants agree.
///
/// Field names on the wire are the ones the judge prompt asks the model for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// Whether the participants have converged.
    #[serde(rename = "consensus_detected")]
    pub converged: bool,
    /// The converged position; empty if not converged.
    #[serde(rename = "consensus_position", default, deserialize_with = "null_as_default")]
    pub position: String,
    /// Agreement strength on a 1-10 scale (0 for the default verdict).
    #[serde(rename = "agreement_score", deserialize_with = "clamped_strength")]
    pub strength: u8,
    /// Names of participants who disagree.
    #[serde(rename = "dissenting_agents", default, deserialize_with = "null_as_default")]
    pub dissenters: Vec<String>,
}

impl Verdict {
    /// A converged verdict.
    pub fn converged(position: impl Into<String>, strength: u8) -> Self {
        Self {
            converged: true,
            position: position.into(),
            strength: strength.min(MAX_STRENGTH),
            dissenters: Vec::new(),
        }
    }

    /// A non-converged verdict.
    pub fn divided(strength: u8) -> Self {
        Self {
            strength: strength.min(MAX_STRENGTH),
            ..Self::default()
        }
    }

    /// Adds dissenters.
    pub fn with_dissenters(mut self, dissenters: Vec<String>) -> Self {
        self.dissenters = dissenters;
        self
    }

    /// True when this verdict should trigger the contrarian phase.
    pub fn meets(&self, threshold: u8) -> bool {
        self.converged && self.strength >= threshold
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn clamped_strength<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = u64::deserialize(deserializer)?;
    Ok(raw.min(MAX_STRENGTH as u64) as u8)
}

/// Final state of a completed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    /// The full transcript.
    pub transcript: Transcript,
    /// The last computed verdict; `None` if no checkpoint was reached.
    pub verdict: Option<Verdict>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_wire_names() {
        let raw = r#"{"consensus_detected": true, "consensus_position": "Ship it", "agreement_score": 8, "dissenting_agents": ["Carol"]}"#;
        let verdict: Verdict = serde_json::from_str(raw).expect("parse");
        assert_eq!(
            verdict,
            Verdict::converged("Ship it", 8).with_dissenters(vec!["Carol".to_string()])
        );
    }

    #[test]
    fn test_verdict_nulls_read_as_empty() {
        let raw = r#"{"consensus_detected": false, "consensus_position": null, "agreement_score": 2, "dissenting_agents": null}"#;
        let verdict: Verdict = serde_json::from_str(raw).expect("parse");
        assert_eq!(verdict, Verdict::divided(2));
    }

    #[test]
    fn test_verdict_optional_fields() {
        let raw = r#"{"consensus_detected": false, "agreement_score": 3}"#;
        let verdict: Verdict = serde_json::from_str(raw).expect("parse");
        assert!(verdict.position.is_empty());
        assert!(verdict.dissenters.is_empty());
    }

    #[test]
    fn test_verdict_requires_flag_and_score() {
        assert!(serde_json::from_str::<Verdict>(r#"{"agreement_score": 3}"#).is_err());
        assert!(serde_json::from_str::<Verdict>(r#"{"consensus_detected": true}"#).is_err());
        assert!(serde_json::from_str::<Verdict>(r#"{"consensus_detected": true, "agreement_score": -1}"#).is_err());
    }

    #[test]
    fn test_strength_is_clamped() {
        let raw = r#"{"consensus_detected": true, "agreement_score": 42}"#;
        let verdict: Verdict = serde_json::from_str(raw).expect("parse");
        assert_eq!(verdict.strength, MAX_STRENGTH);
    }

    #[test]
    fn test_verdict_meets_threshold() {
        assert!(Verdict::converged("x", 7).meets(7));
        assert!(!Verdict::converged("x", 6).meets(7));
        assert!(!Verdict::divided(9).meets(7));
        assert!(!Verdict::default().meets(7));
    }

    #[test]
    fn test_role_serialization() {
        let role = Role::Contrarian {
            position: "AI will replace programmers".to_string(),
        };
        let json = serde_json::to_string(&role).expect("serialize");
        assert!(json.contains("\"kind\":\"contrarian\""));
        assert!(role.is_contrarian());
        assert!(!Role::Debater.is_contrarian());
    }

    #[test]
    fn test_render_lines() {
        let mut transcript = Transcript::new("Topic");
        transcript.push(Turn {
            round: 1,
            participant: Participant::debater(1, "Alice", "m"),
            content: "Hello".to_string(),
        });
        transcript.push(Turn {
            round: 1,
            participant: Participant::debater(2, "Bob", "m"),
            content: "Hi".to_string(),
        });
        assert_eq!(transcript.render_lines(), "Alice: Hello\nBob: Hi\n");
        assert_eq!(transcript.turns_in_round(1).count(), 2);
        assert_eq!(transcript.turns_in_round(2).count(), 0);
    }
}
