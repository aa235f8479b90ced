//! The Tenth Man: the contrarian participant added once the group converges.
//!
//! If nine people agree, the tenth is obligated to disagree.

use super::types::{Participant, Role};

/// Display name of the contrarian participant.
pub const CONTRARIAN_NAME: &str = "The Tenth Man";

/// Builds the contrarian participant seeded with the converged position.
pub fn build_contrarian(position: impl Into<String>, id: u32, model: impl Into<String>) -> Participant {
    Participant {
        id,
        name: CONTRARIAN_NAME.to_string(),
        model: model.into(),
        role: Role::Contrarian {
            position: position.into(),
        },
    }
}

/// The contrarian's mandate.
pub fn contrarian_mandate(position: &str) -> String {
    format!(
        "You are {CONTRARIAN_NAME}. The group has reached consensus on the following position: {position}. \
         You are OBLIGATED to argue the contrary position, not as token opposition, but with genuine analytical rigor. \
         Build the strongest possible case AGAINST the consensus. \
         Investigate, find evidence, construct scenarios where the majority is wrong. \
         Be thorough but concise."
    )
}
