//! The strategy seam: each algorithm supplies a court generator and a team-split cost;
//! the shared pipeline in [`crate::logic::orchestrator`] does everything else.

use crate::logic::annealing::SimulatedAnnealing;
use crate::logic::cancel::CancelToken;
use crate::logic::conflict_graph::ConflictGraph;
use crate::logic::random_sampling::RandomSampling;
use crate::logic::split::choose_best_team_split;
use crate::models::{AlgorithmTag, Court, HistoryStore, PlayerId, Teams};
use rand::RngCore;

/// Hooks an assignment algorithm plugs into the round pipeline.
pub trait AssignmentStrategy {
    fn tag(&self) -> AlgorithmTag;

    /// Cost of playing `team1` against `team2` under this algorithm's weights.
    fn split_cost(&self, history: &HistoryStore, team1: &[PlayerId], team2: &[PlayerId]) -> f64;

    /// Best split of a 2- or 4-player group under [`AssignmentStrategy::split_cost`].
    fn best_split(&self, history: &HistoryStore, group: &[PlayerId]) -> Option<(Teams, f64)> {
        choose_best_team_split(group, |a, b| self.split_cost(history, a, b))
    }

    /// Lay out `pool` (even size, at most `4 * number_of_courts`) on courts numbered from
    /// `first_court_number`.
    fn generate_courts(
        &self,
        history: &HistoryStore,
        pool: &[PlayerId],
        number_of_courts: usize,
        first_court_number: u32,
        rng: &mut dyn RngCore,
        cancel: &CancelToken,
    ) -> Vec<Court>;
}

/// One of the three algorithm configurations, picked once per call.
#[derive(Clone, Debug, PartialEq)]
pub enum Engine {
    RandomSampling(RandomSampling),
    SimulatedAnnealing(SimulatedAnnealing),
    ConflictGraph(ConflictGraph),
}

impl Engine {
    /// Default configuration for an algorithm family.
    pub fn for_tag(tag: AlgorithmTag) -> Self {
        match tag {
            AlgorithmTag::RandomSampling => Engine::RandomSampling(RandomSampling::default()),
            AlgorithmTag::SimulatedAnnealing => {
                Engine::SimulatedAnnealing(SimulatedAnnealing::default())
            }
            AlgorithmTag::ConflictGraph => Engine::ConflictGraph(ConflictGraph::default()),
        }
    }

    pub fn tag(&self) -> AlgorithmTag {
        self.strategy().tag()
    }

    pub fn strategy(&self) -> &dyn AssignmentStrategy {
        match self {
            Engine::RandomSampling(e) => e,
            Engine::SimulatedAnnealing(e) => e,
            Engine::ConflictGraph(e) => e,
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Engine::for_tag(AlgorithmTag::default())
    }
}

/// Turn groups of 2 or 4 into courts using the strategy's split chooser. Other group
/// sizes are skipped.
pub(crate) fn build_courts(
    strategy: &dyn AssignmentStrategy,
    history: &HistoryStore,
    groups: &[Vec<PlayerId>],
    first_court_number: u32,
) -> Vec<Court> {
    let mut courts = Vec::with_capacity(groups.len());
    let mut number = first_court_number;
    for group in groups {
        if let Some((teams, _)) = strategy.best_split(history, group) {
            courts.push(Court::new(number, teams));
            number += 1;
        }
    }
    courts
}
