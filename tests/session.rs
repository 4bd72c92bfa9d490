//! Integration tests for sessions: roster management, round flow and history persistence.

use court_rotation::{
    set_court_winner, start_round, AlgorithmTag, FileStorage, MemoryStorage, Player, Session,
    SessionError, Team,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn session_with_players(n: usize, algorithm: AlgorithmTag, courts: usize) -> Session {
    let players: Vec<Player> = (0..n).map(|i| Player::new(format!("P{i}"))).collect();
    Session::with_players(players, algorithm, courts)
}

#[test]
fn add_player_rejects_blank_and_duplicate_names() {
    let mut s = Session::new(AlgorithmTag::RandomSampling, 2);
    s.add_player("  Ann ").unwrap();
    assert_eq!(s.players[0].name, "Ann");
    assert_eq!(s.add_player("ann"), Err(SessionError::DuplicatePlayerName));
    assert_eq!(s.add_player("   "), Err(SessionError::EmptyPlayerName));
    assert_eq!(s.players.len(), 1);
}

#[test]
fn presence_and_removal() {
    let mut s = Session::new(AlgorithmTag::RandomSampling, 1);
    let id = s.add_player("Bob").unwrap();
    s.set_presence(id, false).unwrap();
    assert_eq!(s.present_players().count(), 0);
    s.set_presence(id, true).unwrap();
    assert_eq!(s.present_players().count(), 1);
    s.remove_player(id).unwrap();
    assert_eq!(s.remove_player(id), Err(SessionError::PlayerNotFound(id)));
    assert_eq!(s.set_presence(id, true), Err(SessionError::PlayerNotFound(id)));
}

#[test]
fn court_count_must_be_positive() {
    let mut s = Session::new(AlgorithmTag::RandomSampling, 0);
    assert_eq!(s.number_of_courts, 1);
    assert_eq!(s.set_number_of_courts(0), Err(SessionError::InvalidCourtCount));
    s.set_number_of_courts(3).unwrap();
    assert_eq!(s.number_of_courts, 3);
}

#[test]
fn import_skips_duplicates() {
    let mut s = Session::new(AlgorithmTag::RandomSampling, 1);
    s.add_player("Ann").unwrap();
    let imported = court_rotation::parse_roster_csv("ann\nBob,no\nCid\nbob\n").unwrap();
    assert_eq!(s.import_players(imported), 2);
    let names: Vec<&str> = s.players.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Ann", "Bob", "Cid"]);
    assert!(!s.players[1].present);
}

#[test]
fn start_round_with_nobody_present_is_an_empty_round() {
    let mut s = session_with_players(4, AlgorithmTag::RandomSampling, 1);
    let mut rng = StdRng::seed_from_u64(1);
    start_round(&mut s, None, &[], &mut rng, None).unwrap();
    assert_eq!(s.round, 1);

    let ids: Vec<_> = s.players.iter().map(|p| p.id).collect();
    for id in ids {
        s.set_presence(id, false).unwrap();
    }
    assert_eq!(start_round(&mut s, None, &[], &mut rng, None), Ok(()));
    assert!(s.courts.is_empty());
    assert!(s.benched_players().is_empty());
    assert_eq!(s.round, 1);
}

#[test]
fn full_round_flow_records_results() {
    let mut s = session_with_players(10, AlgorithmTag::ConflictGraph, 2);
    let mut rng = StdRng::seed_from_u64(2);
    start_round(&mut s, None, &[], &mut rng, None).unwrap();
    assert_eq!(s.round, 1);
    assert_eq!(s.courts.len(), 2);
    assert_eq!(s.benched_players().len(), 2);

    let court = s.courts[0].clone();
    let teams = court.teams.clone().unwrap();
    set_court_winner(&mut s, court.court_number, Some(Team::One)).unwrap();
    // a redundant re-record changes nothing
    set_court_winner(&mut s, court.court_number, Some(Team::One)).unwrap();
    for id in &teams.team1 {
        assert_eq!(s.history.wins(*id), 1);
    }
    set_court_winner(&mut s, court.court_number, Some(Team::Two)).unwrap();
    for id in &teams.team1 {
        assert_eq!(s.history.wins(*id), 0);
        assert_eq!(s.history.losses(*id), 1);
    }
    assert_eq!(s.courts[0].winner, Some(Team::Two));

    assert_eq!(
        set_court_winner(&mut s, 9, Some(Team::One)).map(|_| ()),
        Err(SessionError::CourtNotFound(9))
    );

    start_round(&mut s, None, &[], &mut rng, None).unwrap();
    assert_eq!(s.round, 2);
    assert!(s.courts.iter().all(|c| c.winner.is_none()));
}

#[test]
fn switching_algorithm_resets_history() {
    let mut s = session_with_players(8, AlgorithmTag::RandomSampling, 2);
    let mut rng = StdRng::seed_from_u64(3);
    start_round(&mut s, None, &[], &mut rng, None).unwrap();
    assert!(s.history.pair_entry_count() > 0);

    s.set_algorithm(AlgorithmTag::RandomSampling);
    assert!(s.history.pair_entry_count() > 0);

    s.set_algorithm(AlgorithmTag::SimulatedAnnealing);
    assert_eq!(s.history.pair_entry_count(), 0);
    assert!(s.courts.is_empty());
}

#[test]
fn history_survives_save_and_load_for_same_algorithm() {
    let mut s = session_with_players(9, AlgorithmTag::SimulatedAnnealing, 2);
    let mut rng = StdRng::seed_from_u64(4);
    start_round(&mut s, None, &[], &mut rng, None).unwrap();
    let bench = s.history.bench_counts().clone();

    let mut storage = MemoryStorage::new();
    assert!(s.save_history(&mut storage));

    let mut fresh = Session::with_players(s.players.clone(), AlgorithmTag::SimulatedAnnealing, 2);
    assert!(fresh.load_history(&storage));
    assert_eq!(fresh.history.bench_counts(), &bench);

    let mut other = Session::with_players(s.players.clone(), AlgorithmTag::ConflictGraph, 2);
    other.history.record_benching(s.players[0].id);
    assert!(!other.load_history(&storage));
    assert!(other.history.bench_counts().is_empty());
}

#[test]
fn file_storage_persists_history() {
    let dir = std::env::temp_dir().join(format!("court_rotation_session_{}", uuid::Uuid::new_v4()));
    let mut s = session_with_players(6, AlgorithmTag::RandomSampling, 1);
    let mut rng = StdRng::seed_from_u64(5);
    start_round(&mut s, None, &[], &mut rng, None).unwrap();

    let mut storage = FileStorage::new(&dir);
    assert!(s.save_history(&mut storage));

    let mut fresh = Session::with_players(s.players.clone(), AlgorithmTag::RandomSampling, 1);
    assert!(fresh.load_history(&FileStorage::new(&dir)));
    assert_eq!(fresh.history.bench_counts(), s.history.bench_counts());
    let _ = std::fs::remove_dir_all(&dir);
}
