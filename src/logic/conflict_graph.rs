//! Conflict-graph greedy: build each court from players who have never been teammates,
//! falling back to the least-conflicted group when that is impossible.
//!
//! The conflict graph is implicit: an edge joins two players whose teammate count is
//! non-zero.

use crate::logic::cancel::CancelToken;
use crate::logic::cost::{court_cost, CostWeights};
use crate::logic::engine::AssignmentStrategy;
use crate::models::{AlgorithmTag, Court, HistoryStore, PlayerId};
use rand::seq::SliceRandom;
use rand::RngCore;

#[derive(Clone, Debug, PartialEq)]
pub struct ConflictGraph {
    /// Randomized passes looking for a conflict-free group of four.
    pub shuffle_attempts: usize,
    /// Random 4-subsets scored in the last-resort fallback.
    pub fallback_samples: usize,
    /// Used only to split a chosen group; teammate repeats are filtered beforehand.
    pub weights: CostWeights,
}

impl Default for ConflictGraph {
    fn default() -> Self {
        Self {
            shuffle_attempts: 50,
            fallback_samples: 200,
            weights: CostWeights {
                teammate: 0.0,
                opponent: 5.0,
                skill_pair: 0.5,
                win_balance: 2.0,
                loss_balance: 2.0,
                singles: 0.0,
            },
        }
    }
}

fn in_conflict(history: &HistoryStore, a: PlayerId, b: PlayerId) -> bool {
    history.teammate_count(a, b) > 0
}

/// Total teammate history inside a group.
pub fn group_conflict(history: &HistoryStore, group: &[PlayerId]) -> u32 {
    group
        .iter()
        .enumerate()
        .flat_map(|(i, &a)| group[i + 1..].iter().map(move |&b| (a, b)))
        .map(|(a, b)| history.teammate_count(a, b))
        .sum()
}

/// Walk `order` and keep every player with no conflict against those already kept,
/// stopping at four.
fn first_conflict_free_four(history: &HistoryStore, order: &[PlayerId]) -> Option<Vec<PlayerId>> {
    let mut group = Vec::with_capacity(4);
    for &p in order {
        if group.iter().all(|&q| !in_conflict(history, p, q)) {
            group.push(p);
            if group.len() == 4 {
                return Some(group);
            }
        }
    }
    None
}

impl ConflictGraph {
    fn pick_four(
        &self,
        history: &HistoryStore,
        remaining: &[PlayerId],
        rng: &mut dyn RngCore,
    ) -> Vec<PlayerId> {
        let mut order = remaining.to_vec();
        for _ in 0..self.shuffle_attempts {
            order.shuffle(rng);
            if let Some(group) = first_conflict_free_four(history, &order) {
                return group;
            }
        }

        // least-connected players first
        let degree = |p: PlayerId| {
            remaining
                .iter()
                .filter(|&&q| q != p && in_conflict(history, p, q))
                .count()
        };
        order.sort_by_key(|&p| degree(p));
        if let Some(group) = first_conflict_free_four(history, &order) {
            return group;
        }

        let mut best: Option<(Vec<PlayerId>, u32)> = None;
        for _ in 0..self.fallback_samples {
            let group: Vec<PlayerId> = remaining.choose_multiple(rng, 4).copied().collect();
            let conflict = group_conflict(history, &group);
            if best.as_ref().map_or(true, |(_, c)| conflict < *c) {
                best = Some((group, conflict));
            }
            if conflict == 0 {
                break;
            }
        }
        match best {
            Some((group, conflict)) => {
                log::debug!("No conflict-free group left; using one with conflict {}", conflict);
                group
            }
            None => order[..4].to_vec(),
        }
    }

    /// The two players with the fewest singles so far (random among equals). Teammate
    /// history is not considered here.
    fn pick_singles_pair(
        &self,
        history: &HistoryStore,
        remaining: &[PlayerId],
        rng: &mut dyn RngCore,
    ) -> Vec<PlayerId> {
        let mut order = remaining.to_vec();
        order.shuffle(rng);
        order.sort_by_key(|&p| history.singles_count(p));
        order.truncate(2);
        order
    }
}

impl AssignmentStrategy for ConflictGraph {
    fn tag(&self) -> AlgorithmTag {
        AlgorithmTag::ConflictGraph
    }

    fn split_cost(&self, history: &HistoryStore, team1: &[PlayerId], team2: &[PlayerId]) -> f64 {
        court_cost(history, team1, team2, &self.weights)
    }

    fn generate_courts(
        &self,
        history: &HistoryStore,
        pool: &[PlayerId],
        number_of_courts: usize,
        first_court_number: u32,
        rng: &mut dyn RngCore,
        _cancel: &CancelToken,
    ) -> Vec<Court> {
        let mut remaining = pool.to_vec();
        let mut courts = Vec::with_capacity(number_of_courts);
        let mut number = first_court_number;
        while courts.len() < number_of_courts && remaining.len() >= 2 {
            let group = if remaining.len() >= 4 {
                self.pick_four(history, &remaining, rng)
            } else {
                self.pick_singles_pair(history, &remaining, rng)
            };
            remaining.retain(|p| !group.contains(p));
            if let Some((teams, _)) = self.best_split(history, &group) {
                courts.push(Court::new(number, teams));
                number += 1;
            }
        }
        courts
    }
}
