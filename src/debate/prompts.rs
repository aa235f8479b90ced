//! Prompt construction for debate turns.
//!
//! Pure functions: the same participant, phase and transcript always produce
//! the same messages.

use super::contrarian::{contrarian_mandate, CONTRARIAN_NAME};
use super::types::{Participant, Phase, Role, Transcript};
use crate::llm::Message;

/// Final directive appended after the running transcript.
pub const TURN_DIRECTIVE: &str =
    "It is now your turn to contribute. Provide your perspective on the topic.";

/// Standard debate instruction.
pub fn debater_prompt(name: &str, topic: &str) -> String {
    format!(
        "You are {name}, a debate participant. The topic is: {topic}. \
         Provide your analysis and perspective. Be concise but thorough."
    )
}

/// Debate instruction once the contrarian has joined.
pub fn engaged_debater_prompt(name: &str, topic: &str) -> String {
    format!(
        "You are {name}, a debate participant. The topic is: {topic}. \
         {CONTRARIAN_NAME} has been activated and is arguing against the group consensus. \
         You MUST directly engage with {CONTRARIAN_NAME}'s arguments: address them specifically, \
         refute or acknowledge them. Be concise but thorough."
    )
}

/// System instruction for `participant` in `phase`.
pub fn system_prompt(participant: &Participant, topic: &str, phase: Phase) -> String {
    match (&participant.role, phase) {
        (Role::Contrarian { position }, _) => contrarian_mandate(position),
        (Role::Debater, Phase::ContrarianPhase) => engaged_debater_prompt(&participant.name, topic),
        (Role::Debater, Phase::FreeDebate) => debater_prompt(&participant.name, topic),
    }
}

/// Builds the full message list for a participant's next turn.
///
/// Layout: system instruction, one user message per prior turn
/// (`name: content`), then [`TURN_DIRECTIVE`].
pub fn build_turn_messages(participant: &Participant, transcript: &Transcript) -> Vec<Message> {
    let mut messages = Vec::with_capacity(transcript.turns.len() + 2);
    messages.push(Message::system(system_prompt(
        participant,
        &transcript.topic,
        transcript.phase,
    )));
    messages.extend(
        transcript
            .turns
            .iter()
            .map(|turn| Message::user(format!("{}: {}", turn.participant.name, turn.content))),
    );
    messages.push(Message::user(TURN_DIRECTIVE));
    messages
}
