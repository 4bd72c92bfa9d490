//! Cost model: penalty terms computed from the history counters.
//!
//! Every term is non-negative; lower totals are preferred. Each algorithm combines the
//! terms with its own [`CostWeights`].

use crate::models::{HistoryStore, PlayerId};

/// Per-algorithm weight constants.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CostWeights {
    pub teammate: f64,
    pub opponent: f64,
    pub skill_pair: f64,
    pub win_balance: f64,
    pub loss_balance: f64,
    pub singles: f64,
}

impl CostWeights {
    /// Weights with every term disabled.
    pub const ZERO: CostWeights = CostWeights {
        teammate: 0.0,
        opponent: 0.0,
        skill_pair: 0.0,
        win_balance: 0.0,
        loss_balance: 0.0,
        singles: 0.0,
    };
}

fn unordered_pairs(team: &[PlayerId]) -> impl Iterator<Item = (PlayerId, PlayerId)> + '_ {
    team.iter()
        .enumerate()
        .flat_map(move |(i, &a)| team[i + 1..].iter().map(move |&b| (a, b)))
}

/// weight × Σ teammate-pair counts over the unordered pairs of `team`.
pub fn teammate_cost(history: &HistoryStore, team: &[PlayerId], weight: f64) -> f64 {
    let sum: u32 = unordered_pairs(team)
        .map(|(a, b)| history.teammate_count(a, b))
        .sum();
    weight * f64::from(sum)
}

/// weight × Σ opponent-pair counts over every cross-team pair.
pub fn opponent_cost(
    history: &HistoryStore,
    team_a: &[PlayerId],
    team_b: &[PlayerId],
    weight: f64,
) -> f64 {
    let sum: u32 = team_a
        .iter()
        .flat_map(|&a| team_b.iter().map(move |&b| history.opponent_count(a, b)))
        .sum();
    weight * f64::from(sum)
}

/// weight × Σ (wins·wins + losses·losses) over unordered pairs: two strong or two weak
/// players on the same side cost more.
pub fn skill_pair_penalty(history: &HistoryStore, team: &[PlayerId], weight: f64) -> f64 {
    let sum: f64 = unordered_pairs(team)
        .map(|(a, b)| {
            let wins = f64::from(history.wins(a)) * f64::from(history.wins(b));
            let losses = f64::from(history.losses(a)) * f64::from(history.losses(b));
            wins + losses
        })
        .sum();
    weight * sum
}

fn total(team: &[PlayerId], f: impl Fn(PlayerId) -> u32) -> f64 {
    team.iter().map(|&id| f64::from(f(id))).sum()
}

/// weight × |Σ wins(team_a) − Σ wins(team_b)|.
pub fn win_balance_cost(
    history: &HistoryStore,
    team_a: &[PlayerId],
    team_b: &[PlayerId],
    weight: f64,
) -> f64 {
    let a = total(team_a, |id| history.wins(id));
    let b = total(team_b, |id| history.wins(id));
    weight * (a - b).abs()
}

/// weight × |Σ losses(team_a) − Σ losses(team_b)|.
pub fn loss_balance_cost(
    history: &HistoryStore,
    team_a: &[PlayerId],
    team_b: &[PlayerId],
    weight: f64,
) -> f64 {
    let a = total(team_a, |id| history.losses(id));
    let b = total(team_b, |id| history.losses(id));
    weight * (a - b).abs()
}

/// weight × (singles(p1) + singles(p2)); only meaningful for 2-player courts.
pub fn singles_cost(history: &HistoryStore, pair: &[PlayerId], weight: f64) -> f64 {
    weight * total(pair, |id| history.singles_count(id))
}

/// Full weighted cost of one court's split: teammate repeats on both sides, opponent
/// repeats across, skill pairing on both sides, win and loss balance, plus singles duty
/// when the court is a 1v1.
pub fn court_cost(
    history: &HistoryStore,
    team1: &[PlayerId],
    team2: &[PlayerId],
    weights: &CostWeights,
) -> f64 {
    let mut cost = teammate_cost(history, team1, weights.teammate)
        + teammate_cost(history, team2, weights.teammate)
        + opponent_cost(history, team1, team2, weights.opponent)
        + skill_pair_penalty(history, team1, weights.skill_pair)
        + skill_pair_penalty(history, team2, weights.skill_pair)
        + win_balance_cost(history, team1, team2, weights.win_balance)
        + loss_balance_cost(history, team1, team2, weights.loss_balance);
    if team1.len() == 1 && team2.len() == 1 {
        cost += singles_cost(history, &[team1[0], team2[0]], weights.singles);
    }
    cost
}
