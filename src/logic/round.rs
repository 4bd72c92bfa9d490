//! Session-level round flow: generate a round, then enter results court by court.

use crate::logic::cancel::CancelToken;
use crate::logic::engine::Engine;
use crate::logic::orchestrator::{generate_round, RoundRequest};
use crate::models::{Court, PlayerId, Session, SessionError, Team};
use rand::RngCore;

/// Generate the next round for the session and make it the current one.
///
/// Results of the previous round must already be entered; they are final once this runs.
/// With nobody present the new round has no courts and the round counter stays put.
pub fn start_round(
    session: &mut Session,
    manual_selection: Option<&[PlayerId]>,
    force_bench: &[PlayerId],
    rng: &mut dyn RngCore,
    cancel: Option<CancelToken>,
) -> Result<(), SessionError> {
    let engine = Engine::for_tag(session.algorithm);
    let mut request = RoundRequest::new(&session.players, session.number_of_courts)
        .with_force_bench(force_bench);
    if let Some(selection) = manual_selection {
        request = request.with_manual_selection(selection);
    }
    if let Some(cancel) = cancel {
        request = request.with_cancel(cancel);
    }
    let courts = generate_round(&mut session.history, &engine, &request, rng);
    if !courts.is_empty() {
        session.round += 1;
    }
    session.courts = courts;
    Ok(())
}

/// Set or clear (`None`) the winner of one court in the current round, keeping the
/// win/loss counters consistent.
pub fn set_court_winner(
    session: &mut Session,
    court_number: u32,
    winner: Option<Team>,
) -> Result<&[Court], SessionError> {
    if !session.courts.iter().any(|c| c.court_number == court_number) {
        return Err(SessionError::CourtNotFound(court_number));
    }
    session.courts = session
        .history
        .update_winner(court_number, winner, &session.courts);
    Ok(&session.courts)
}
