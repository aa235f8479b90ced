//! Multi-agent debate with a mandated dissenter.
//!
//! Participants debate a topic in rounds until a judge finds strong
//! agreement. At that point [`contrarian`] adds the Tenth Man, who must argue
//! against the converged position for a fixed number of rounds.

pub mod contrarian;
pub mod engine;
pub mod judge;
pub mod observer;
pub mod prompts;
pub mod types;

pub use contrarian::{build_contrarian, contrarian_mandate, CONTRARIAN_NAME};
pub use engine::{DebateEngine, EngineConfig, CONTRARIAN_ROUNDS, CONVERGENCE_THRESHOLD};
pub use judge::{ConsensusJudge, LlmJudge, MAX_JUDGE_ATTEMPTS};
pub use observer::{ChannelObserver, DebateEvent, DebateObserver, NoopObserver};
pub use prompts::build_turn_messages;
pub use types::{Participant, Phase, Role, RunResult, Transcript, Turn, Verdict};
