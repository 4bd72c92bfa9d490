//! Session: the roster, court count, active algorithm, history and current round.

use crate::models::algorithm::AlgorithmTag;
use crate::models::court::Court;
use crate::models::history::HistoryStore;
use crate::models::player::{Player, PlayerId};
use crate::storage::Storage;
use std::collections::HashSet;
use uuid::Uuid;

/// Errors that can occur during session operations.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SessionError {
    /// Player not on the roster.
    PlayerNotFound(PlayerId),
    /// A player with this name already exists (names are unique, case-insensitive).
    DuplicatePlayerName,
    /// Player names must not be blank.
    EmptyPlayerName,
    /// At least one court is required.
    InvalidCourtCount,
    /// No court with this number in the current round.
    CourtNotFound(u32),
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::PlayerNotFound(_) => write!(f, "Player not found"),
            SessionError::DuplicatePlayerName => write!(f, "A player with this name already exists"),
            SessionError::EmptyPlayerName => write!(f, "Player name must not be empty"),
            SessionError::InvalidCourtCount => write!(f, "At least one court is required"),
            SessionError::CourtNotFound(n) => write!(f, "No court {} in the current round", n),
        }
    }
}

impl std::error::Error for SessionError {}

/// Unique identifier for a session.
pub type SessionId = Uuid;

/// One club night: who is here, how many courts there are, and what has happened so far.
#[derive(Debug)]
pub struct Session {
    pub id: SessionId,
    pub players: Vec<Player>,
    pub number_of_courts: usize,
    pub algorithm: AlgorithmTag,
    /// Courts of the current round (empty before the first round).
    pub courts: Vec<Court>,
    /// Rounds generated so far.
    pub round: u32,
    pub history: HistoryStore,
}

impl Session {
    /// Create an empty session. A court count of zero is raised to one.
    pub fn new(algorithm: AlgorithmTag, number_of_courts: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            players: Vec::new(),
            number_of_courts: number_of_courts.max(1),
            algorithm,
            courts: Vec::new(),
            round: 0,
            history: HistoryStore::new(),
        }
    }

    /// Create a session with an initial roster.
    pub fn with_players(players: Vec<Player>, algorithm: AlgorithmTag, number_of_courts: usize) -> Self {
        Self {
            players,
            ..Self::new(algorithm, number_of_courts)
        }
    }

    pub fn get_player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn get_player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    pub fn present_players(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| p.present)
    }

    /// Add a present player. Names are trimmed and must be unique (case-insensitive).
    pub fn add_player(&mut self, name: impl Into<String>) -> Result<PlayerId, SessionError> {
        let name = name.into();
        let name_trimmed = name.trim();
        if name_trimmed.is_empty() {
            return Err(SessionError::EmptyPlayerName);
        }
        let is_duplicate = self
            .players
            .iter()
            .any(|p| p.name.eq_ignore_ascii_case(name_trimmed));
        if is_duplicate {
            return Err(SessionError::DuplicatePlayerName);
        }
        let player = Player::new(name_trimmed);
        let id = player.id;
        self.players.push(player);
        Ok(id)
    }

    /// Add imported players, skipping blank and duplicate names. Returns how many were added.
    pub fn import_players(&mut self, players: Vec<Player>) -> usize {
        let mut known: HashSet<String> = self.players.iter().map(|p| p.name.to_ascii_lowercase()).collect();
        let mut added = 0;
        for mut p in players {
            let name = p.name.trim().to_string();
            if name.is_empty() || !known.insert(name.to_ascii_lowercase()) {
                continue;
            }
            p.name = name;
            self.players.push(p);
            added += 1;
        }
        added
    }

    /// Remove a player from the roster. Their counters stay in the history.
    pub fn remove_player(&mut self, id: PlayerId) -> Result<(), SessionError> {
        let idx = self
            .players
            .iter()
            .position(|p| p.id == id)
            .ok_or(SessionError::PlayerNotFound(id))?;
        self.players.remove(idx);
        Ok(())
    }

    /// Check a player in or out.
    pub fn set_presence(&mut self, id: PlayerId, present: bool) -> Result<(), SessionError> {
        let p = self.get_player_mut(id).ok_or(SessionError::PlayerNotFound(id))?;
        if present {
            p.check_in();
        } else {
            p.check_out();
        }
        Ok(())
    }

    pub fn set_number_of_courts(&mut self, number_of_courts: usize) -> Result<(), SessionError> {
        if number_of_courts == 0 {
            return Err(SessionError::InvalidCourtCount);
        }
        self.number_of_courts = number_of_courts;
        Ok(())
    }

    /// Switch algorithm family. Costs are weighted differently per family, so the
    /// history is reset whenever the family actually changes.
    pub fn set_algorithm(&mut self, algorithm: AlgorithmTag) {
        if algorithm == self.algorithm {
            return;
        }
        log::info!(
            "Session {}: switching {} -> {}, resetting history",
            self.id,
            self.algorithm,
            algorithm
        );
        self.algorithm = algorithm;
        self.history.reset_history();
        self.courts.clear();
    }

    /// Present players not on any court of the current round.
    pub fn benched_players(&self) -> Vec<Player> {
        crate::logic::benched_players(&self.courts, &self.players)
    }

    /// Persist the history tagged with the active algorithm.
    pub fn save_history(&mut self, storage: &mut dyn Storage) -> bool {
        self.history.save_state(storage, self.algorithm)
    }

    /// Load the history saved for the active algorithm (see [`HistoryStore::load_state`]).
    pub fn load_history(&mut self, storage: &dyn Storage) -> bool {
        self.history.load_state(storage, self.algorithm)
    }
}
