//! Integration tests for the three assignment algorithms and the shared split chooser.

use court_rotation::logic::{candidate_splits, group_conflict};
use court_rotation::{
    choose_best_team_split, AlgorithmTag, AssignmentStrategy, CancelToken, ConflictGraph, Court,
    Engine, HistoryStore, PlayerId, RandomSampling, SimulatedAnnealing, Team, Teams,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashSet;
use uuid::Uuid;

fn ids(n: usize) -> Vec<PlayerId> {
    (0..n).map(|_| Uuid::new_v4()).collect()
}

fn generate(engine: &Engine, h: &HistoryStore, pool: &[PlayerId], courts: usize, seed: u64) -> Vec<Court> {
    let mut rng = StdRng::seed_from_u64(seed);
    engine
        .strategy()
        .generate_courts(h, pool, courts, 1, &mut rng, &CancelToken::new())
}

fn teammate_repeats(h: &HistoryStore, courts: &[Court]) -> u32 {
    courts
        .iter()
        .filter_map(|c| c.teams.as_ref())
        .flat_map(|t| [&t.team1, &t.team2])
        .filter(|side| side.len() == 2)
        .map(|side| h.teammate_count(side[0], side[1]))
        .sum()
}

/// A history with wins, losses, pairings and singles spread unevenly.
fn busy_history(p: &[PlayerId]) -> HistoryStore {
    let mut h = HistoryStore::new();
    for (i, &a) in p.iter().enumerate() {
        for &b in &p[i + 1..] {
            if (a.as_u128() ^ b.as_u128()) % 3 == 0 {
                h.record_teammate_pair(a, b);
            }
            if a.as_u128().wrapping_add(b.as_u128()) % 2 == 0 {
                h.record_opponent_pair(a, b);
            }
        }
    }
    for (i, chunk) in p.chunks(4).enumerate() {
        if chunk.len() == 4 {
            let winner = if i % 2 == 0 { Team::One } else { Team::Two };
            let court = Court {
                winner: Some(winner),
                ..Court::new(i as u32 + 1, Teams::new(chunk[..2].to_vec(), chunk[2..].to_vec()))
            };
            h.record_wins(&[court]);
        }
    }
    h.record_singles(p[0]);
    h
}

#[test]
fn engine_tags_match_their_family() {
    for tag in AlgorithmTag::ALL {
        assert_eq!(Engine::for_tag(tag).tag(), tag);
    }
    assert_eq!(Engine::default().tag(), AlgorithmTag::RandomSampling);
}

#[test]
fn best_split_is_no_worse_than_any_other_candidate() {
    let p = ids(8);
    let h = busy_history(&p);
    for engine in [
        Engine::for_tag(AlgorithmTag::RandomSampling),
        Engine::for_tag(AlgorithmTag::SimulatedAnnealing),
        Engine::for_tag(AlgorithmTag::ConflictGraph),
    ] {
        let strategy = engine.strategy();
        for group in [&p[..4], &p[2..6], &p[4..8]] {
            let cost = |a: &[PlayerId], b: &[PlayerId]| strategy.split_cost(&h, a, b);
            let (best, best_cost) = choose_best_team_split(group, cost).unwrap();
            let candidates = candidate_splits(group);
            assert!(candidates.contains(&best));
            for c in &candidates {
                assert!(best_cost <= cost(&c.team1, &c.team2));
            }
        }
    }
}

#[test]
fn two_player_group_is_a_singles_split() {
    let p = ids(2);
    let h = HistoryStore::new();
    let engine = Engine::default();
    let (teams, _) = engine.strategy().best_split(&h, &p).unwrap();
    assert_eq!(teams, Teams::singles(p[0], p[1]));
}

#[test]
fn random_sampling_is_reproducible_with_a_seed() {
    let p = ids(10);
    let h = busy_history(&p);
    let engine = Engine::for_tag(AlgorithmTag::RandomSampling);
    assert_eq!(generate(&engine, &h, &p, 3, 99), generate(&engine, &h, &p, 3, 99));
}

#[test]
fn random_sampling_avoids_a_forced_repeat_when_possible() {
    let p = ids(4);
    let mut h = HistoryStore::new();
    h.record_teammate_pair(p[0], p[1]);
    h.record_teammate_pair(p[0], p[1]);
    let courts = generate(&Engine::for_tag(AlgorithmTag::RandomSampling), &h, &p, 1, 1);
    assert_eq!(teammate_repeats(&h, &courts), 0);
}

#[test]
fn annealing_finds_repeat_free_teams() {
    // 8 players who have each partnered their "neighbour": plenty of fresh pairings exist
    let p = ids(8);
    let mut h = HistoryStore::new();
    for pair in p.chunks(2) {
        h.record_teammate_pair(pair[0], pair[1]);
    }
    for (i, &a) in p.iter().enumerate() {
        h.record_teammate_pair(a, p[(i + 3) % p.len()]);
    }
    let engine = Engine::SimulatedAnnealing(SimulatedAnnealing::default());
    let courts = generate(&engine, &h, &p, 2, 7);
    assert_eq!(courts.len(), 2);
    assert_eq!(teammate_repeats(&h, &courts), 0);
    let placed: HashSet<PlayerId> = courts.iter().flat_map(|c| c.players.iter().copied()).collect();
    assert_eq!(placed.len(), 8);
}

#[test]
fn annealing_numbers_courts_from_the_offset() {
    let p = ids(6);
    let h = HistoryStore::new();
    let engine = Engine::for_tag(AlgorithmTag::SimulatedAnnealing);
    let mut rng = StdRng::seed_from_u64(3);
    let courts = engine
        .strategy()
        .generate_courts(&h, &p, 2, 2, &mut rng, &CancelToken::new());
    let numbers: Vec<u32> = courts.iter().map(|c| c.court_number).collect();
    assert_eq!(numbers, vec![2, 3]);
    let mut sizes: Vec<usize> = courts.iter().map(|c| c.players.len()).collect();
    sizes.sort();
    assert_eq!(sizes, vec![2, 4]);
}

#[test]
fn annealing_handles_a_single_singles_court() {
    let p = ids(2);
    let h = HistoryStore::new();
    let courts = generate(&Engine::for_tag(AlgorithmTag::SimulatedAnnealing), &h, &p, 1, 5);
    assert_eq!(courts.len(), 1);
    assert!(courts[0].is_singles());
}

#[test]
fn conflict_graph_falls_back_to_least_conflicted_groups() {
    // two cliques of four who have all partnered each other: the only conflict-free
    // groups mix two from each clique
    let p = ids(8);
    let mut h = HistoryStore::new();
    for clique in p.chunks(4) {
        for (i, &a) in clique.iter().enumerate() {
            for &b in &clique[i + 1..] {
                h.record_teammate_pair(a, b);
            }
        }
    }
    let engine = Engine::ConflictGraph(ConflictGraph::default());
    let courts = generate(&engine, &h, &p, 2, 11);
    assert_eq!(courts.len(), 2);
    // no conflict-free four exists; the fallback settles for two from each clique
    for c in &courts {
        assert!(group_conflict(&h, &c.players) <= 2);
    }
}

#[test]
fn conflict_graph_prefers_strangers() {
    let p = ids(8);
    let mut h = HistoryStore::new();
    // p0..p3 partnered each other; p4..p7 are fresh
    for (i, &a) in p[..4].iter().enumerate() {
        for &b in &p[i + 1..4] {
            h.record_teammate_pair(a, b);
        }
    }
    let engine = Engine::ConflictGraph(ConflictGraph::default());
    let courts = generate(&engine, &h, &p, 2, 13);
    assert_eq!(courts.len(), 2);
    // the first court is built conflict-free
    assert_eq!(group_conflict(&h, &courts[0].players), 0);
    assert_eq!(teammate_repeats(&h, &courts[..1]), 0);
}

#[test]
fn conflict_graph_singles_goes_to_fewest_singles() {
    // Edge case kept as observed: the pair is chosen on singles count alone.
    let p = ids(6);
    let mut h = HistoryStore::new();
    for &id in &p {
        h.record_singles(id);
        h.record_singles(id);
    }
    let engine = Engine::ConflictGraph(ConflictGraph::default());
    // 6 players, 2 courts: one doubles, one singles built from the last two remaining
    let courts = generate(&engine, &h, &p, 2, 17);
    assert_eq!(courts.len(), 2);
    assert_eq!(courts[0].players.len(), 4);
    assert!(courts[1].is_singles());

    // with only two courts' worth of 2-player pools, fewest singles wins
    let q = ids(3);
    let mut h = HistoryStore::new();
    h.record_singles(q[0]);
    let courts = generate(&engine, &h, &q, 1, 19);
    assert_eq!(courts.len(), 1);
    let chosen: HashSet<PlayerId> = courts[0].players.iter().copied().collect();
    assert_eq!(chosen, [q[1], q[2]].into_iter().collect());
}

#[test]
fn conflict_graph_split_ignores_teammate_weight() {
    let p = ids(4);
    let mut h = HistoryStore::new();
    h.record_teammate_pair(p[0], p[1]);
    let cg = ConflictGraph::default();
    assert_eq!(cg.split_cost(&h, &p[..2], &p[2..]), 0.0);
    let rs = RandomSampling::default();
    assert!(rs.split_cost(&h, &p[..2], &p[2..]) > 0.0);
}
