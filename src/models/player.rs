//! Player data structure.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a player (used in courts, counters and pair keys).
pub type PlayerId = Uuid;

/// A participant on the session roster.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    /// Only present players are considered when courts are generated.
    pub present: bool,
}

impl Player {
    /// Create a new present player with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            present: true,
        }
    }

    /// Same as [`Player::new`] but with an explicit presence flag.
    pub fn with_presence(name: impl Into<String>, present: bool) -> Self {
        Self {
            present,
            ..Self::new(name)
        }
    }

    /// Mark the player as arrived.
    pub fn check_in(&mut self) {
        self.present = true;
    }

    /// Mark the player as gone for now (kept on the roster).
    pub fn check_out(&mut self) {
        self.present = false;
    }
}
