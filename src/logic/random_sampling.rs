//! Random-sampling greedy: try many random court layouts and keep the cheapest.

use crate::logic::cancel::CancelToken;
use crate::logic::cost::{court_cost, CostWeights};
use crate::logic::engine::{build_courts, AssignmentStrategy};
use crate::models::{AlgorithmTag, Court, HistoryStore, PlayerId};
use rand::seq::SliceRandom;
use rand::RngCore;
use std::collections::VecDeque;

/// Trials between cancellation checks.
const CANCEL_CHECK_EVERY: usize = 32;

#[derive(Clone, Debug, PartialEq)]
pub struct RandomSampling {
    /// Independent random layouts evaluated per round.
    pub trials: usize,
    pub weights: CostWeights,
}

impl Default for RandomSampling {
    fn default() -> Self {
        Self {
            trials: 300,
            weights: CostWeights {
                teammate: 10.0,
                opponent: 4.0,
                skill_pair: 0.5,
                win_balance: 1.0,
                loss_balance: 1.0,
                singles: 6.0,
            },
        }
    }
}

/// Split an ordered pool into court groups of 4, front to back. A trailing group of 3
/// gives its last member back to the front of the pool so it becomes a 2; a single
/// leftover player is not placed.
pub(crate) fn partition_groups(pool: &[PlayerId], number_of_courts: usize) -> Vec<Vec<PlayerId>> {
    let mut queue: VecDeque<PlayerId> = pool.iter().copied().collect();
    let mut groups = Vec::new();
    while groups.len() < number_of_courts && queue.len() >= 2 {
        let take = queue.len().min(4);
        let mut group: Vec<PlayerId> = queue.drain(..take).collect();
        if group.len() == 3 {
            if let Some(last) = group.pop() {
                queue.push_front(last);
            }
        }
        groups.push(group);
    }
    groups
}

/// Shuffle `pool` and partition it into court groups.
pub(crate) fn random_layout(
    pool: &[PlayerId],
    number_of_courts: usize,
    rng: &mut dyn RngCore,
) -> Vec<Vec<PlayerId>> {
    let mut shuffled = pool.to_vec();
    shuffled.shuffle(rng);
    partition_groups(&shuffled, number_of_courts)
}

impl RandomSampling {
    /// Sum of each group's best-split cost.
    fn layout_cost(&self, history: &HistoryStore, groups: &[Vec<PlayerId>]) -> f64 {
        groups
            .iter()
            .filter_map(|g| self.best_split(history, g))
            .map(|(_, cost)| cost)
            .sum()
    }
}

impl AssignmentStrategy for RandomSampling {
    fn tag(&self) -> AlgorithmTag {
        AlgorithmTag::RandomSampling
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
        cancel: &CancelToken,
    ) -> Vec<Court> {
        if pool.len() < 2 || number_of_courts == 0 {
            return Vec::new();
        }
        let mut best: Option<(Vec<Vec<PlayerId>>, f64)> = None;
        for trial in 0..self.trials.max(1) {
            if trial % CANCEL_CHECK_EVERY == 0 && trial > 0 && cancel.is_cancelled() {
                log::debug!("Random sampling cancelled after {} trials", trial);
                break;
            }
            let groups = random_layout(pool, number_of_courts, rng);
            let cost = self.layout_cost(history, &groups);
            match &best {
                Some((_, best_cost)) if cost >= *best_cost => {}
                _ => best = Some((groups, cost)),
            }
            if cost == 0.0 {
                break;
            }
        }
        let Some((groups, cost)) = best else {
            return Vec::new();
        };
        log::debug!("Random sampling best layout cost {:.2}", cost);
        build_courts(self, history, &groups, first_court_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn ids(n: usize) -> Vec<PlayerId> {
        (0..n).map(|_| Uuid::new_v4()).collect()
    }

    #[test]
    fn partition_uses_fours_then_a_pair() {
        let p = ids(10);
        let groups = partition_groups(&p, 3);
        let sizes: Vec<usize> = groups.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![4, 4, 2]);
    }

    #[test]
    fn trailing_three_donates_a_player() {
        let p = ids(7);
        let groups = partition_groups(&p, 3);
        let sizes: Vec<usize> = groups.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![4, 2]);
        // the donated player went back to the front and was left without a partner
        assert!(!groups.iter().flatten().any(|&id| id == p[6]));
    }

    #[test]
    fn partition_respects_court_count() {
        let p = ids(12);
        assert_eq!(partition_groups(&p, 2).len(), 2);
    }
}
