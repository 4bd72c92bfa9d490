//! Court assignment: cost model, split chooser, the shared round pipeline and the three
//! algorithms plugged into it.

mod annealing;
mod cancel;
mod conflict_graph;
mod cost;
mod engine;
mod orchestrator;
mod random_sampling;
mod round;
mod split;

pub use annealing::SimulatedAnnealing;
pub use cancel::CancelToken;
pub use conflict_graph::{group_conflict, ConflictGraph};
pub use cost::{
    court_cost, loss_balance_cost, opponent_cost, singles_cost, skill_pair_penalty, teammate_cost,
    win_balance_cost, CostWeights,
};
pub use engine::{AssignmentStrategy, Engine};
pub use orchestrator::{bench_quota, benched_players, generate_round, select_bench, RoundRequest};
pub use random_sampling::RandomSampling;
pub use round::{set_court_winner, start_round};
pub use split::{candidate_splits, choose_best_team_split};
