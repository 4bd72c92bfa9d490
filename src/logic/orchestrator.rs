//! Round generation pipeline shared by all algorithms.
//!
//! 1. Filter to present players; nobody present means no courts.
//! 2. Pin a manual selection of 2-4 present players to court 1.
//! 3. Work out how many must sit out so every court is a 2 or a 4.
//! 4. Bench forced players, then the least-benched players (random among equals).
//! 5. Let the active algorithm lay out the rest on the remaining courts.
//! 6. Put the manual court first.
//! 7. Record benching, singles and teammate/opponent pairs in the history.

use crate::logic::cancel::CancelToken;
use crate::logic::engine::Engine;
use crate::models::{Court, HistoryStore, Player, PlayerId, Teams};
use rand::seq::SliceRandom;
use rand::RngCore;
use std::collections::HashSet;

/// Everything needed to generate one round.
#[derive(Clone, Debug, Default)]
pub struct RoundRequest<'a> {
    pub players: &'a [Player],
    pub number_of_courts: usize,
    /// Players pinned to court 1. Ignored unless 2-4 of them are present.
    pub manual_selection: Option<&'a [PlayerId]>,
    /// Players who sit out this round no matter how often they sat out before.
    pub force_bench: &'a [PlayerId],
    pub cancel: Option<CancelToken>,
}

impl<'a> RoundRequest<'a> {
    pub fn new(players: &'a [Player], number_of_courts: usize) -> Self {
        Self {
            players,
            number_of_courts,
            ..Self::default()
        }
    }

    pub fn with_manual_selection(mut self, selection: &'a [PlayerId]) -> Self {
        self.manual_selection = Some(selection);
        self
    }

    pub fn with_force_bench(mut self, ids: &'a [PlayerId]) -> Self {
        self.force_bench = ids;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

/// How many of `remaining` players sit out when `courts` courts are available.
///
/// Fills every court to four; if that leaves an odd number playing, one more sits out
/// so the players on court split into 2s and 4s.
pub fn bench_quota(remaining: usize, courts: usize) -> usize {
    let capacity = courts * 4;
    let mut bench = remaining.saturating_sub(capacity);
    if (remaining - bench) % 2 == 1 {
        bench += 1;
    }
    bench.min(remaining)
}

/// Pick `count` players to sit out, lowest bench count first. A shuffle before the
/// stable sort breaks ties randomly.
pub fn select_bench(
    history: &HistoryStore,
    candidates: &[PlayerId],
    count: usize,
    rng: &mut dyn RngCore,
) -> Vec<PlayerId> {
    let mut order = candidates.to_vec();
    order.shuffle(rng);
    order.sort_by_key(|&id| history.bench_count(id));
    order.truncate(count);
    order
}

/// Present players not on any court.
pub fn benched_players(courts: &[Court], all_players: &[Player]) -> Vec<Player> {
    let on_court: HashSet<PlayerId> = courts.iter().flat_map(|c| c.players.iter().copied()).collect();
    all_players
        .iter()
        .filter(|p| p.present && !on_court.contains(&p.id))
        .cloned()
        .collect()
}

/// A pinned court 1 built from the manual selection, plus any selected player who was
/// left out of it (only for a 3-player selection). `None` unless 2-4 players.
fn manual_court(
    engine: &Engine,
    history: &HistoryStore,
    selection: &[PlayerId],
) -> Option<(Court, Option<PlayerId>)> {
    let court = match *selection {
        [a, b, c, d] => {
            let teams = engine
                .strategy()
                .best_split(history, &[a, b, c, d])
                .map(|(teams, _)| teams)
                .unwrap_or_else(|| Teams::new(vec![a, b], vec![c, d]));
            (Court::new(1, teams), None)
        }
        // the third player is on neither team and stays out of automatic assignment
        [a, b, c] => (Court::new(1, Teams::singles(a, b)), Some(c)),
        [a, b] => (Court::new(1, Teams::singles(a, b)), None),
        _ => return None,
    };
    Some(court)
}

/// Generate the courts for one round and record the round's statistics.
///
/// Starts a new round: the previous round's win ledger is cleared first, so result
/// entry for the new courts never touches last round's outcomes.
pub fn generate_round(
    history: &mut HistoryStore,
    engine: &Engine,
    request: &RoundRequest<'_>,
    rng: &mut dyn RngCore,
) -> Vec<Court> {
    history.clear_current_session();

    let present: Vec<PlayerId> = request
        .players
        .iter()
        .filter(|p| p.present)
        .map(|p| p.id)
        .collect();
    if present.is_empty() || request.number_of_courts == 0 {
        return Vec::new();
    }

    let mut remaining_courts = request.number_of_courts;
    let mut pool = present.clone();
    let mut fixed: Option<Court> = None;

    if let Some(selection) = request.manual_selection {
        let mut seen = HashSet::new();
        let valid: Vec<PlayerId> = selection
            .iter()
            .copied()
            .filter(|id| present.contains(id) && seen.insert(*id))
            .collect();
        if let Some((court, left_out)) = manual_court(engine, history, &valid) {
            if let Some(id) = left_out {
                log::debug!("Manual selection of 3: {} waits this round", id);
            }
            pool.retain(|id| !valid.contains(id));
            remaining_courts -= 1;
            fixed = Some(court);
        }
    }

    let quota = bench_quota(pool.len(), remaining_courts);
    let forced: Vec<PlayerId> = pool
        .iter()
        .copied()
        .filter(|id| request.force_bench.contains(id))
        .collect();
    let mut bench_target = quota.max(forced.len());
    if (pool.len() - bench_target) % 2 == 1 {
        bench_target += 1;
    }
    let bench_target = bench_target.min(pool.len());

    let candidates: Vec<PlayerId> = pool.iter().copied().filter(|id| !forced.contains(id)).collect();
    let mut benched = forced;
    let extra = bench_target - benched.len();
    benched.extend(select_bench(history, &candidates, extra, rng));

    let on_court: Vec<PlayerId> = pool.iter().copied().filter(|id| !benched.contains(id)).collect();

    let first_court_number = if fixed.is_some() { 2 } else { 1 };
    let cancel = request.cancel.clone().unwrap_or_default();
    let generated = engine.strategy().generate_courts(
        history,
        &on_court,
        remaining_courts,
        first_court_number,
        rng,
        &cancel,
    );

    // anyone the engine could not place sits out as well
    let placed: HashSet<PlayerId> = generated.iter().flat_map(|c| c.players.iter().copied()).collect();
    for &id in &on_court {
        if !placed.contains(&id) {
            log::debug!("Player {} could not be placed and sits out", id);
            benched.push(id);
        }
    }

    let mut courts = Vec::with_capacity(generated.len() + 1);
    courts.extend(fixed);
    courts.extend(generated);

    history.record_round(&benched, &courts);
    log::info!(
        "Generated {} court(s) with {} for {} present player(s), {} benched",
        courts.len(),
        engine.tag(),
        present.len(),
        benched.len()
    );
    courts
}
