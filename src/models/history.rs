//! History store: cross-round counters, the per-round win ledger, persistence and
//! change notification.

use crate::models::algorithm::AlgorithmTag;
use crate::models::court::{Court, Team};
use crate::models::player::PlayerId;
use crate::storage::Storage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Storage key under which the serialized history is kept.
pub const HISTORY_KEY: &str = "court_rotation.history";

/// Combined ceiling on teammate + opponent pair entries kept when saving.
pub const MAX_PAIR_ENTRIES: usize = 500;

/// Unordered pair of players, smaller id first.
type PairId = (PlayerId, PlayerId);

fn ordered_pair(a: PlayerId, b: PlayerId) -> PairId {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Canonical key for an unordered pair of players (smaller id first), as persisted.
pub fn pair_key(a: PlayerId, b: PlayerId) -> String {
    let (lo, hi) = ordered_pair(a, b);
    format!("{lo}|{hi}")
}

fn parse_pair_key(key: &str) -> Option<PairId> {
    let (a, b) = key.split_once('|')?;
    let a = a.parse().ok()?;
    let b = b.parse().ok()?;
    Some(ordered_pair(a, b))
}

fn to_persisted(map: &HashMap<PairId, u32>) -> HashMap<String, u32> {
    map.iter().map(|(&(a, b), &c)| (pair_key(a, b), c)).collect()
}

fn from_persisted(map: HashMap<String, u32>) -> HashMap<PairId, u32> {
    let mut pairs = HashMap::with_capacity(map.len());
    for (key, count) in map {
        match parse_pair_key(&key) {
            Some(pair) => *pairs.entry(pair).or_insert(0) += count,
            None => log::warn!("Skipping malformed pair key {:?} in saved history", key),
        }
    }
    pairs
}

/// Win outcome already applied to the counters for one court this round.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub winner: Team,
    /// Sorted.
    pub winning_ids: Vec<PlayerId>,
    /// Sorted.
    pub losing_ids: Vec<PlayerId>,
}

/// What changed in the store; passed to every subscribed listener.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum HistoryEvent {
    WinsRecorded,
    WinReversed { court_number: u32 },
    RoundRecorded,
    SessionCleared,
    Reset,
    Loaded,
}

/// Handle returned by [`HistoryStore::on_state_change`]; pass it to
/// [`HistoryStore::unsubscribe`] to stop receiving events.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct ListenerId(u64);

type Listener = Box<dyn Fn(&HistoryEvent) + Send + Sync>;

/// Persisted shape of the history (all maps are plain id/key -> count dictionaries).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedHistory {
    pub algorithm_tag: AlgorithmTag,
    #[serde(default)]
    pub bench_count_map: HashMap<PlayerId, u32>,
    #[serde(default)]
    pub single_count_map: HashMap<PlayerId, u32>,
    #[serde(default)]
    pub teammate_count_map: HashMap<String, u32>,
    #[serde(default)]
    pub opponent_count_map: HashMap<String, u32>,
    #[serde(default)]
    pub win_count_map: HashMap<PlayerId, u32>,
    #[serde(default)]
    pub loss_count_map: HashMap<PlayerId, u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
enum PairKind {
    Teammate,
    Opponent,
}

/// All cross-round counters plus the current round's win ledger.
///
/// Counters only grow (except win/loss reversal) until [`HistoryStore::reset_history`].
#[derive(Default)]
pub struct HistoryStore {
    bench_counts: HashMap<PlayerId, u32>,
    singles_counts: HashMap<PlayerId, u32>,
    teammate_counts: HashMap<PairId, u32>,
    opponent_counts: HashMap<PairId, u32>,
    win_counts: HashMap<PlayerId, u32>,
    loss_counts: HashMap<PlayerId, u32>,
    /// Court number -> result applied this round. Not persisted.
    ledger: BTreeMap<u32, LedgerEntry>,
    /// Logical clock bumped on every pair write; drives least-recently-touched pruning.
    clock: u64,
    teammate_touched: HashMap<PairId, u64>,
    opponent_touched: HashMap<PairId, u64>,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener: u64,
}

impl fmt::Debug for HistoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistoryStore")
            .field("bench_counts", &self.bench_counts)
            .field("singles_counts", &self.singles_counts)
            .field("teammate_counts", &self.teammate_counts)
            .field("opponent_counts", &self.opponent_counts)
            .field("win_counts", &self.win_counts)
            .field("loss_counts", &self.loss_counts)
            .field("ledger", &self.ledger)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

fn count_of<K: std::hash::Hash + Eq>(map: &HashMap<K, u32>, key: &K) -> u32 {
    map.get(key).copied().unwrap_or(0)
}

fn decrement(map: &mut HashMap<PlayerId, u32>, id: PlayerId) {
    if let Some(c) = map.get_mut(&id) {
        *c = c.saturating_sub(1);
    }
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- queries ----

    pub fn bench_count(&self, id: PlayerId) -> u32 {
        count_of(&self.bench_counts, &id)
    }

    pub fn singles_count(&self, id: PlayerId) -> u32 {
        count_of(&self.singles_counts, &id)
    }

    pub fn wins(&self, id: PlayerId) -> u32 {
        count_of(&self.win_counts, &id)
    }

    pub fn losses(&self, id: PlayerId) -> u32 {
        count_of(&self.loss_counts, &id)
    }

    pub fn teammate_count(&self, a: PlayerId, b: PlayerId) -> u32 {
        count_of(&self.teammate_counts, &ordered_pair(a, b))
    }

    pub fn opponent_count(&self, a: PlayerId, b: PlayerId) -> u32 {
        count_of(&self.opponent_counts, &ordered_pair(a, b))
    }

    pub fn win_counts(&self) -> &HashMap<PlayerId, u32> {
        &self.win_counts
    }

    pub fn loss_counts(&self) -> &HashMap<PlayerId, u32> {
        &self.loss_counts
    }

    pub fn bench_counts(&self) -> &HashMap<PlayerId, u32> {
        &self.bench_counts
    }

    pub fn singles_counts(&self) -> &HashMap<PlayerId, u32> {
        &self.singles_counts
    }

    /// Number of teammate + opponent pair entries currently held.
    pub fn pair_entry_count(&self) -> usize {
        self.teammate_counts.len() + self.opponent_counts.len()
    }

    pub fn ledger_entry(&self, court_number: u32) -> Option<&LedgerEntry> {
        self.ledger.get(&court_number)
    }

    // ---- unconditional increments ----

    pub fn record_benching(&mut self, id: PlayerId) {
        *self.bench_counts.entry(id).or_insert(0) += 1;
    }

    pub fn record_singles(&mut self, id: PlayerId) {
        *self.singles_counts.entry(id).or_insert(0) += 1;
    }

    pub fn record_teammate_pair(&mut self, a: PlayerId, b: PlayerId) {
        self.touch_pair(PairKind::Teammate, ordered_pair(a, b));
    }

    pub fn record_opponent_pair(&mut self, a: PlayerId, b: PlayerId) {
        self.touch_pair(PairKind::Opponent, ordered_pair(a, b));
    }

    fn touch_pair(&mut self, kind: PairKind, key: PairId) {
        self.clock += 1;
        let (counts, touched) = match kind {
            PairKind::Teammate => (&mut self.teammate_counts, &mut self.teammate_touched),
            PairKind::Opponent => (&mut self.opponent_counts, &mut self.opponent_touched),
        };
        touched.insert(key, self.clock);
        *counts.entry(key).or_insert(0) += 1;
    }

    /// Record the derived statistics of a freshly generated round: benching for every
    /// benched player, singles duty for 2-player courts, and teammate/opponent pairs.
    pub fn record_round(&mut self, benched: &[PlayerId], courts: &[Court]) {
        for &id in benched {
            self.record_benching(id);
        }
        for court in courts {
            let Some(teams) = court.teams.as_ref() else {
                continue;
            };
            if court.is_singles() {
                for &id in &court.players {
                    self.record_singles(id);
                }
            }
            for side in [&teams.team1, &teams.team2] {
                for (i, &a) in side.iter().enumerate() {
                    for &b in &side[i + 1..] {
                        self.record_teammate_pair(a, b);
                    }
                }
            }
            for &a in &teams.team1 {
                for &b in &teams.team2 {
                    self.record_opponent_pair(a, b);
                }
            }
        }
        self.notify(&HistoryEvent::RoundRecorded);
    }

    // ---- win / loss ledger ----

    /// Apply the winners of every decided court. Re-recording an unchanged result is a
    /// no-op; a changed result first reverses the previous one. Returns whether anything
    /// changed.
    pub fn record_wins(&mut self, courts: &[Court]) -> bool {
        let mut changed = false;
        for court in courts {
            let (Some(winner), Some(teams)) = (court.winner, court.teams.as_ref()) else {
                continue;
            };
            let (winners, losers) = teams.outcome(winner);
            let mut winning_ids = winners.to_vec();
            winning_ids.sort();
            let mut losing_ids = losers.to_vec();
            losing_ids.sort();

            if let Some(prev) = self.ledger.get(&court.court_number) {
                if prev.winner == winner && prev.winning_ids == winning_ids {
                    continue;
                }
                self.undo_ledger_entry(court.court_number);
            }

            for &id in &winning_ids {
                *self.win_counts.entry(id).or_insert(0) += 1;
            }
            for &id in &losing_ids {
                *self.loss_counts.entry(id).or_insert(0) += 1;
            }
            self.ledger.insert(
                court.court_number,
                LedgerEntry {
                    winner,
                    winning_ids,
                    losing_ids,
                },
            );
            changed = true;
        }
        if changed {
            self.notify(&HistoryEvent::WinsRecorded);
        }
        changed
    }

    /// Set (or clear with `None`) the winner of one court and keep the counters in step.
    /// Returns the updated court list; an unknown court number leaves it unchanged.
    pub fn update_winner(
        &mut self,
        court_number: u32,
        winner: Option<Team>,
        courts: &[Court],
    ) -> Vec<Court> {
        let mut updated = courts.to_vec();
        let Some(court) = updated.iter_mut().find(|c| c.court_number == court_number) else {
            log::warn!("update_winner: no court {} in current round", court_number);
            return updated;
        };
        if court.winner != winner {
            self.reverse_win_for_court(court_number);
        }
        court.winner = winner;
        if winner.is_some() {
            let court = court.clone();
            self.record_wins(std::slice::from_ref(&court));
        }
        updated
    }

    /// Undo the counters credited for `court_number` this round and forget the entry.
    pub fn reverse_win_for_court(&mut self, court_number: u32) -> bool {
        if self.undo_ledger_entry(court_number) {
            self.notify(&HistoryEvent::WinReversed { court_number });
            true
        } else {
            false
        }
    }

    fn undo_ledger_entry(&mut self, court_number: u32) -> bool {
        let Some(entry) = self.ledger.remove(&court_number) else {
            return false;
        };
        for &id in &entry.winning_ids {
            decrement(&mut self.win_counts, id);
        }
        for &id in &entry.losing_ids {
            decrement(&mut self.loss_counts, id);
        }
        true
    }

    // ---- reset ----

    /// Wipe every counter and the ledger.
    pub fn reset_history(&mut self) {
        self.bench_counts.clear();
        self.singles_counts.clear();
        self.teammate_counts.clear();
        self.opponent_counts.clear();
        self.win_counts.clear();
        self.loss_counts.clear();
        self.ledger.clear();
        self.teammate_touched.clear();
        self.opponent_touched.clear();
        self.clock = 0;
        self.notify(&HistoryEvent::Reset);
    }

    /// Forget this round's ledger only; cross-round counters are kept.
    pub fn clear_current_session(&mut self) {
        if self.ledger.is_empty() {
            return;
        }
        self.ledger.clear();
        self.notify(&HistoryEvent::SessionCleared);
    }

    // ---- persistence ----

    /// Evict least-recently-touched pair entries until teammate + opponent entries fit
    /// within [`MAX_PAIR_ENTRIES`]. Per-player counters are never pruned.
    pub fn prune_pairings(&mut self) -> usize {
        let total = self.pair_entry_count();
        if total <= MAX_PAIR_ENTRIES {
            return 0;
        }
        let mut stamped: Vec<(u64, PairKind, PairId)> = self
            .teammate_counts
            .keys()
            .map(|k| {
                let t = self.teammate_touched.get(k).copied().unwrap_or(0);
                (t, PairKind::Teammate, *k)
            })
            .chain(self.opponent_counts.keys().map(|k| {
                let t = self.opponent_touched.get(k).copied().unwrap_or(0);
                (t, PairKind::Opponent, *k)
            }))
            .collect();
        stamped.sort();

        let excess = total - MAX_PAIR_ENTRIES;
        for (_, kind, key) in stamped.into_iter().take(excess) {
            match kind {
                PairKind::Teammate => {
                    self.teammate_counts.remove(&key);
                    self.teammate_touched.remove(&key);
                }
                PairKind::Opponent => {
                    self.opponent_counts.remove(&key);
                    self.opponent_touched.remove(&key);
                }
            }
        }
        log::debug!("Pruned {} stale pair entries before saving", excess);
        excess
    }

    /// Prune, then snapshot the six counters tagged with the producing algorithm.
    pub fn prepare_state_for_saving(&mut self, algorithm_tag: AlgorithmTag) -> SavedHistory {
        self.prune_pairings();
        SavedHistory {
            algorithm_tag,
            bench_count_map: self.bench_counts.clone(),
            single_count_map: self.singles_counts.clone(),
            teammate_count_map: to_persisted(&self.teammate_counts),
            opponent_count_map: to_persisted(&self.opponent_counts),
            win_count_map: self.win_counts.clone(),
            loss_count_map: self.loss_counts.clone(),
            saved_at: Some(Utc::now()),
        }
    }

    /// Write the history to `storage`. Failures are logged and reported as `false`.
    pub fn save_state(&mut self, storage: &mut dyn Storage, algorithm_tag: AlgorithmTag) -> bool {
        let saved = self.prepare_state_for_saving(algorithm_tag);
        let json = match serde_json::to_string(&saved) {
            Ok(json) => json,
            Err(e) => {
                log::warn!("Could not serialize history: {}", e);
                return false;
            }
        };
        match storage.set(HISTORY_KEY, &json) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Could not save history: {}", e);
                false
            }
        }
    }

    /// Replace the in-memory counters with the saved ones. Missing or unreadable state
    /// leaves the store untouched; state saved by a different algorithm family resets it.
    pub fn load_state(&mut self, storage: &dyn Storage, algorithm_tag: AlgorithmTag) -> bool {
        let raw = match storage.get(HISTORY_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return false,
            Err(e) => {
                log::warn!("Could not read saved history: {}", e);
                return false;
            }
        };
        let saved: SavedHistory = match serde_json::from_str(&raw) {
            Ok(saved) => saved,
            Err(e) => {
                log::warn!("Saved history is corrupt, ignoring it: {}", e);
                return false;
            }
        };
        if saved.algorithm_tag != algorithm_tag {
            log::warn!(
                "Saved history was produced by {} but {} is active; resetting history",
                saved.algorithm_tag,
                algorithm_tag
            );
            self.reset_history();
            return false;
        }
        self.restore(saved);
        self.notify(&HistoryEvent::Loaded);
        true
    }

    fn restore(&mut self, saved: SavedHistory) {
        self.bench_counts = saved.bench_count_map;
        self.singles_counts = saved.single_count_map;
        self.teammate_counts = from_persisted(saved.teammate_count_map);
        self.opponent_counts = from_persisted(saved.opponent_count_map);
        self.win_counts = saved.win_count_map;
        self.loss_counts = saved.loss_count_map;
        self.ledger.clear();
        self.teammate_touched.clear();
        self.opponent_touched.clear();
        self.clock = 0;
    }

    // ---- notification ----

    /// Register a listener called after every state change.
    pub fn on_state_change(
        &mut self,
        listener: impl Fn(&HistoryEvent) + Send + Sync + 'static,
    ) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove one listener; others keep receiving events.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    fn notify(&self, event: &HistoryEvent) {
        for (_, listener) in &self.listeners {
            listener(event);
        }
    }
}
