//! Court rotation engine: library with models, assignment logic and storage.

pub mod logic;
pub mod models;
pub mod roster;
pub mod storage;

pub use logic::{
    benched_players, choose_best_team_split, generate_round, set_court_winner, start_round,
    AssignmentStrategy, CancelToken, ConflictGraph, CostWeights, Engine, RandomSampling,
    RoundRequest, SimulatedAnnealing,
};
pub use models::{
    pair_key, AlgorithmTag, Court, HistoryEvent, HistoryStore, LedgerEntry, ListenerId, Player,
    PlayerId, SavedHistory, Session, SessionError, SessionId, Team, Teams, HISTORY_KEY,
    MAX_PAIR_ENTRIES,
};
pub use roster::parse_roster_csv;
pub use storage::{FileStorage, MemoryStorage, Storage, StorageError};
