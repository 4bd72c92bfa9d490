//! Court, Teams and Team for singles (1v1) and doubles (2v2) matches.

use crate::models::player::PlayerId;
use serde::{Deserialize, Serialize};

/// Which team won the match on a court.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum Team {
    #[serde(rename = "team1")]
    One,
    #[serde(rename = "team2")]
    Two,
}

/// Split of a court's players into two sides (1 or 2 players each).
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Teams {
    pub team1: Vec<PlayerId>,
    pub team2: Vec<PlayerId>,
}

impl Teams {
    pub fn new(team1: Vec<PlayerId>, team2: Vec<PlayerId>) -> Self {
        Self { team1, team2 }
    }

    /// Trivial split for a singles match.
    pub fn singles(a: PlayerId, b: PlayerId) -> Self {
        Self::new(vec![a], vec![b])
    }

    /// Players of both sides, team 1 first.
    pub fn all_players(&self) -> Vec<PlayerId> {
        self.team1.iter().chain(self.team2.iter()).copied().collect()
    }

    /// (winners, losers) for the given winning side.
    pub fn outcome(&self, winner: Team) -> (&[PlayerId], &[PlayerId]) {
        match winner {
            Team::One => (self.team1.as_slice(), self.team2.as_slice()),
            Team::Two => (self.team2.as_slice(), self.team1.as_slice()),
        }
    }
}

/// One match unit: 2 (singles) or 4 (doubles) players on a numbered court.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Court {
    pub court_number: u32,
    /// When `teams` is set this is `team1` followed by `team2`.
    pub players: Vec<PlayerId>,
    pub teams: Option<Teams>,
    /// None until a result is entered.
    pub winner: Option<Team>,
}

impl Court {
    /// Build a court from a team split; `players` is derived from the split.
    pub fn new(court_number: u32, teams: Teams) -> Self {
        Self {
            court_number,
            players: teams.all_players(),
            teams: Some(teams),
            winner: None,
        }
    }

    pub fn is_singles(&self) -> bool {
        self.players.len() == 2
    }
}
