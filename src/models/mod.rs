//! Data structures for court rotation: players, courts, history and sessions.

mod algorithm;
mod court;
mod history;
mod player;
mod session;

pub use algorithm::AlgorithmTag;
pub use court::{Court, Team, Teams};
pub use history::{
    pair_key, HistoryEvent, HistoryStore, LedgerEntry, ListenerId, SavedHistory, HISTORY_KEY,
    MAX_PAIR_ENTRIES,
};
pub use player::{Player, PlayerId};
pub use session::{Session, SessionError, SessionId};
