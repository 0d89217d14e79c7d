//! Result of accepting a challenge.

use arcade_entity::challenge::Challenge;

/// What an acceptance did to the challenge.
#[derive(Debug, Clone, PartialEq)]
pub enum AcceptOutcome {
    /// Recorded, more acceptances are needed.
    Waiting(Challenge),
    /// This acceptance resolved the challenge; a session must be created.
    Resolved(Challenge),
    /// The caller accepted earlier and the session already exists.
    AlreadyStarted(Challenge),
}

impl AcceptOutcome {
    /// The challenge as stored after the acceptance.
    pub fn challenge(&self) -> &Challenge {
        match self {
            Self::Waiting(c) | Self::Resolved(c) | Self::AlreadyStarted(c) => c,
        }
    }

    /// Consume the outcome, returning the challenge.
    pub fn into_challenge(self) -> Challenge {
        match self {
            Self::Waiting(c) | Self::Resolved(c) | Self::AlreadyStarted(c) => c,
        }
    }
}
