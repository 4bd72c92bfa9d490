//! Team-split chooser shared by every algorithm.

use crate::models::{PlayerId, Teams};

/// The candidate splits of a 2- or 4-player group.
///
/// Four players have exactly three ways to form two unordered pairs:
/// `ab|cd`, `ac|bd`, `ad|bc`. Two players have the single 1v1 split. Any other size
/// yields no candidates.
pub fn candidate_splits(group: &[PlayerId]) -> Vec<Teams> {
    match *group {
        [a, b] => vec![Teams::singles(a, b)],
        [a, b, c, d] => vec![
            Teams::new(vec![a, b], vec![c, d]),
            Teams::new(vec![a, c], vec![b, d]),
            Teams::new(vec![a, d], vec![b, c]),
        ],
        _ => Vec::new(),
    }
}

/// Lowest-cost split of `group` under `cost` (first candidate wins ties), together with
/// its cost. `None` for groups that are not 2 or 4 players.
pub fn choose_best_team_split<F>(group: &[PlayerId], cost: F) -> Option<(Teams, f64)>
where
    F: Fn(&[PlayerId], &[PlayerId]) -> f64,
{
    let mut best: Option<(Teams, f64)> = None;
    for split in candidate_splits(group) {
        let c = cost(&split.team1, &split.team2);
        match &best {
            Some((_, best_cost)) if c >= *best_cost => {}
            _ => best = Some((split, c)),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn three_distinct_partitions_of_four() {
        let p: Vec<PlayerId> = (0..4).map(|_| Uuid::new_v4()).collect();
        let splits = candidate_splits(&p);
        assert_eq!(splits.len(), 3);
        for s in &splits {
            assert_eq!(s.team1.len(), 2);
            assert_eq!(s.team2.len(), 2);
            assert_eq!(s.team1[0], p[0]);
        }
        assert_ne!(splits[0], splits[1]);
        assert_ne!(splits[1], splits[2]);
    }

    #[test]
    fn ties_keep_first_candidate() {
        let p: Vec<PlayerId> = (0..4).map(|_| Uuid::new_v4()).collect();
        let (teams, cost) = choose_best_team_split(&p, |_, _| 1.0).unwrap();
        assert_eq!(teams, Teams::new(vec![p[0], p[1]], vec![p[2], p[3]]));
        assert_eq!(cost, 1.0);
    }

    #[test]
    fn odd_groups_have_no_split() {
        let p: Vec<PlayerId> = (0..3).map(|_| Uuid::new_v4()).collect();
        assert!(choose_best_team_split(&p, |_, _| 0.0).is_none());
    }
}
