//! 3×3 grid game rules for two to four seats.
//!
//! Every function validates before it mutates: an `Err` leaves the
//! session untouched. Terminal sessions reject every action.

use std::collections::{BTreeMap, HashSet};

use chrono::Utc;

use arcade_core::error::AppError;
use arcade_core::result::AppResult;
use arcade_core::traits::ConnectionLiveness;
use arcade_core::types::{ChallengeId, SessionId};
use arcade_entity::session::{
    BOARD_SLOTS, Board, EndReason, Participant, RoundResult, Session, SessionStatus, Symbol,
};

/// Rows, columns, then diagonals.
pub const WIN_LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

/// Bounds for the rounds-to-win option.
pub const MAX_ROUNDS_TO_WIN: u32 = 9;

/// Seats at one board, one per symbol.
pub const MAX_PARTICIPANTS: usize = Symbol::ALL.len();

/// Result of evaluating the board after a move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundOutcome {
    /// No line and free slots remain.
    InProgress,
    /// A participant completed a line; a new round started.
    RoundWon {
        /// Round winner.
        winner: String,
    },
    /// Full board without a line; a new round started.
    Draw,
    /// A participant completed a line and reached the target score.
    SeriesWon {
        /// Series winner.
        winner: String,
    },
}

/// Build a fresh session. Seats follow `players`: the first plays `X` and
/// moves first, the turn then passes down the list and wraps around.
pub fn new_session(
    challenge_id: ChallengeId,
    app_id: &str,
    players: &[(String, String)],
    rounds_to_win: u32,
    options: serde_json::Value,
) -> AppResult<Session> {
    if !(2..=MAX_PARTICIPANTS).contains(&players.len()) {
        return Err(AppError::invalid_argument(format!(
            "The grid game seats 2 to {MAX_PARTICIPANTS} participants, got {}",
            players.len()
        )));
    }
    let mut seen = HashSet::new();
    if !players.iter().all(|(id, _)| seen.insert(id.as_str())) {
        return Err(AppError::invalid_argument(
            "Participants must be distinct users",
        ));
    }

    let participants = players
        .iter()
        .enumerate()
        .map(|(index, (id, name))| {
            let symbol = Symbol::for_index(index)
                .ok_or_else(|| AppError::invalid_argument("No symbol left for participant"))?;
            Ok(Participant {
                id: id.clone(),
                name: name.clone(),
                symbol,
            })
        })
        .collect::<AppResult<Vec<Participant>>>()?;
    let scores: BTreeMap<String, u32> = participants.iter().map(|p| (p.id.clone(), 0)).collect();

    Ok(Session {
        id: SessionId::new(),
        challenge_id,
        app_id: app_id.to_string(),
        current_turn: participants[0].id.clone(),
        participants,
        board: [None; BOARD_SLOTS],
        scores,
        round: 1,
        rounds_to_win: rounds_to_win.clamp(1, MAX_ROUNDS_TO_WIN),
        status: SessionStatus::Active,
        winner: None,
        end_reason: None,
        last_round: None,
        created_at: Utc::now(),
        last_move_at: None,
        completed_at: None,
        options,
        version: 0,
    })
}

/// Read `roundsToWin` from forwarded options, defaulting to 1.
pub fn rounds_to_win_option(options: &serde_json::Map<String, serde_json::Value>) -> u32 {
    options
        .get("roundsToWin")
        .and_then(serde_json::Value::as_u64)
        .map(|n| n.clamp(1, u64::from(MAX_ROUNDS_TO_WIN)) as u32)
        .unwrap_or(1)
}

fn ensure_active(session: &Session) -> AppResult<()> {
    if session.status.is_terminal() {
        return Err(AppError::invalid_state(format!(
            "Session is {}",
            session.status
        )));
    }
    Ok(())
}

fn ensure_participant(session: &Session, user_id: &str) -> AppResult<()> {
    if !session.is_participant(user_id) {
        return Err(AppError::forbidden(format!(
            "User '{user_id}' is not a participant"
        )));
    }
    Ok(())
}

/// Claim `position` for `user_id` and pass the turn.
pub fn apply_move(session: &mut Session, user_id: &str, position: i64) -> AppResult<()> {
    ensure_active(session)?;
    ensure_participant(session, user_id)?;
    if session.current_turn != user_id {
        return Err(AppError::forbidden("Not your turn"));
    }

    let slot = usize::try_from(position)
        .ok()
        .filter(|slot| *slot < BOARD_SLOTS)
        .ok_or_else(|| {
            AppError::out_of_range(format!(
                "Position {position} is outside 0..{}",
                BOARD_SLOTS - 1
            ))
        })?;
    if session.board[slot].is_some() {
        return Err(AppError::already_occupied(format!(
            "Position {slot} is already taken"
        )));
    }

    let (symbol, next) = match (session.participant(user_id), session.next_after(user_id)) {
        (Some(me), Some(next)) => (me.symbol, next.id.clone()),
        _ => return Err(AppError::internal("Session has no opponent")),
    };

    session.board[slot] = Some(symbol);
    session.current_turn = next;
    session.last_move_at = Some(Utc::now());
    Ok(())
}

/// The first completed line on the board, with its symbol.
pub fn winning_line(board: &Board) -> Option<(Symbol, [usize; 3])> {
    WIN_LINES.iter().find_map(|line| {
        let [a, b, c] = *line;
        match (board[a], board[b], board[c]) {
            (Some(x), Some(y), Some(z)) if x == y && y == z => Some((x, *line)),
            _ => None,
        }
    })
}

/// Score the board after a move and advance the round or finish the series.
pub fn evaluate_round(session: &mut Session) -> RoundOutcome {
    if session.status.is_terminal() {
        return RoundOutcome::InProgress;
    }

    if let Some((symbol, line)) = winning_line(&session.board) {
        let Some(winner) = session
            .participants
            .iter()
            .find(|p| p.symbol == symbol)
            .map(|p| p.id.clone())
        else {
            return RoundOutcome::InProgress;
        };

        let score = session.scores.entry(winner.clone()).or_insert(0);
        *score += 1;
        let reached = *score >= session.rounds_to_win;

        session.last_round = Some(RoundResult {
            round: session.round,
            winner: Some(winner.clone()),
            line: Some(line),
        });

        if reached {
            finalize(session, &winner, SessionStatus::Completed, EndReason::SeriesWon);
            return RoundOutcome::SeriesWon { winner };
        }
        next_round(session);
        return RoundOutcome::RoundWon { winner };
    }

    if session.board_full() {
        session.last_round = Some(RoundResult {
            round: session.round,
            winner: None,
            line: None,
        });
        next_round(session);
        return RoundOutcome::Draw;
    }

    RoundOutcome::InProgress
}

/// Clear the board and hand the opening move to the next seat.
fn next_round(session: &mut Session) {
    session.round += 1;
    session.board = [None; BOARD_SLOTS];
    let opener = (session.round as usize - 1) % session.participants.len().max(1);
    if let Some(p) = session.participants.get(opener) {
        session.current_turn = p.id.clone();
    }
}

fn finalize(session: &mut Session, winner: &str, status: SessionStatus, reason: EndReason) {
    session.status = status;
    session.winner = Some(winner.to_string());
    session.end_reason = Some(reason);
    session.completed_at = Some(Utc::now());
}

/// End the session because `user_id` gave up.
///
/// The remaining participant with the most rounds won takes the series;
/// ties go to whoever sits closest after the leaver.
pub fn forfeit(session: &mut Session, user_id: &str) -> AppResult<()> {
    ensure_active(session)?;
    ensure_participant(session, user_id)?;
    let winner = session
        .others_after(user_id)
        .reduce(|best, p| {
            if session.score_of(&p.id) > session.score_of(&best.id) {
                p
            } else {
                best
            }
        })
        .map(|p| p.id.clone())
        .ok_or_else(|| AppError::internal("Session has no opponent"))?;

    finalize(session, &winner, SessionStatus::Abandoned, EndReason::Forfeit);
    Ok(())
}

/// End the session in favour of `user_id` because every other
/// participant stayed disconnected for the whole grace period.
pub fn claim_win(
    session: &mut Session,
    user_id: &str,
    liveness: &dyn ConnectionLiveness,
) -> AppResult<()> {
    ensure_active(session)?;
    ensure_participant(session, user_id)?;

    let grace = liveness.grace_period();
    for opponent in session.others_after(user_id) {
        match liveness.disconnected_for(&session.id, &opponent.id) {
            Some(elapsed) if elapsed >= grace => {}
            Some(elapsed) => {
                return Err(AppError::precondition_failed(format!(
                    "'{}' disconnected {}s ago, grace period is {}s",
                    opponent.id,
                    elapsed.as_secs(),
                    grace.as_secs()
                )));
            }
            None => {
                return Err(AppError::precondition_failed(format!(
                    "'{}' is connected",
                    opponent.id
                )));
            }
        }
    }

    finalize(session, user_id, SessionStatus::Abandoned, EndReason::ClaimedWin);
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;
    use arcade_core::error::ErrorKind;

    fn session(rounds_to_win: u32) -> Session {
        new_session(
            ChallengeId::new(),
            "tictactoe",
            &[
                ("alice".to_string(), "Alice".to_string()),
                ("bob".to_string(), "Bob".to_string()),
            ],
            rounds_to_win,
            serde_json::Value::Null,
        )
        .unwrap()
    }

    fn play(session: &mut Session, moves: &[(&str, i64)]) -> RoundOutcome {
        let mut outcome = RoundOutcome::InProgress;
        for (user, position) in moves {
            apply_move(session, user, *position).unwrap();
            outcome = evaluate_round(session);
        }
        outcome
    }

    #[derive(Default)]
    struct FakeLiveness {
        disconnected: Mutex<HashMap<String, Duration>>,
    }

    impl ConnectionLiveness for FakeLiveness {
        fn disconnected_for(&self, _session_id: &SessionId, user_id: &str) -> Option<Duration> {
            self.disconnected.lock().unwrap().get(user_id).copied()
        }

        fn grace_period(&self) -> Duration {
            Duration::from_secs(15)
        }
    }

    #[test]
    fn test_first_participant_is_x_and_moves_first() {
        let s = session(1);
        assert_eq!(s.current_turn, "alice");
        assert_eq!(s.participants[0].symbol, Symbol::X);
        assert_eq!(s.participants[1].symbol, Symbol::O);
        assert_eq!(s.round, 1);
    }

    fn seats(ids: &[&str]) -> Vec<(String, String)> {
        ids.iter()
            .map(|id| (id.to_string(), id.to_uppercase()))
            .collect()
    }

    #[test]
    fn test_seat_count_and_distinct_participants() {
        for ids in [&["a"][..], &["a", "b", "c", "d", "e"], &["a", "b", "a"]] {
            let err = new_session(
                ChallengeId::new(),
                "tictactoe",
                &seats(ids),
                1,
                serde_json::Value::Null,
            )
            .unwrap_err();
            assert_eq!(err.kind, ErrorKind::InvalidArgument, "{ids:?}");
        }

        let four = new_session(
            ChallengeId::new(),
            "tictactoe",
            &seats(&["a", "b", "c", "d"]),
            1,
            serde_json::Value::Null,
        )
        .unwrap();
        let symbols: Vec<Symbol> = four.participants.iter().map(|p| p.symbol).collect();
        assert_eq!(symbols, Symbol::ALL.to_vec());
    }

    #[test]
    fn test_three_seats_rotate_and_score() {
        let mut s = new_session(
            ChallengeId::new(),
            "tictactoe",
            &seats(&["y", "z", "w"]),
            2,
            serde_json::Value::Null,
        )
        .unwrap();
        assert_eq!(s.current_turn, "y");

        apply_move(&mut s, "y", 0).unwrap();
        assert_eq!(s.current_turn, "z");
        assert_eq!(apply_move(&mut s, "w", 1).unwrap_err().kind, ErrorKind::Forbidden);
        apply_move(&mut s, "z", 3).unwrap();
        assert_eq!(s.current_turn, "w");
        apply_move(&mut s, "w", 6).unwrap();
        assert_eq!(s.current_turn, "y");
        assert_eq!(s.board[6], Some(Symbol::Y));

        let mut s = new_session(
            ChallengeId::new(),
            "tictactoe",
            &seats(&["y", "z", "w"]),
            2,
            serde_json::Value::Null,
        )
        .unwrap();
        let outcome = play(
            &mut s,
            &[("y", 0), ("z", 1), ("w", 2), ("y", 3), ("z", 4), ("w", 5), ("y", 6)],
        );
        assert_eq!(
            outcome,
            RoundOutcome::RoundWon {
                winner: "y".to_string()
            }
        );
        assert_eq!(s.round, 2);
        assert_eq!(s.current_turn, "z");
        assert_eq!(s.last_round.as_ref().unwrap().line, Some([0, 3, 6]));
    }

    #[test]
    fn test_three_seat_forfeit_prefers_leading_score() {
        let mut s = new_session(
            ChallengeId::new(),
            "tictactoe",
            &seats(&["y", "z", "w"]),
            3,
            serde_json::Value::Null,
        )
        .unwrap();
        s.scores.insert("w".to_string(), 1);
        forfeit(&mut s, "y").unwrap();
        assert_eq!(s.winner.as_deref(), Some("w"));

        let mut s = new_session(
            ChallengeId::new(),
            "tictactoe",
            &seats(&["y", "z", "w"]),
            3,
            serde_json::Value::Null,
        )
        .unwrap();
        forfeit(&mut s, "z").unwrap();
        assert_eq!(s.winner.as_deref(), Some("w"));
        assert_eq!(s.end_reason, Some(EndReason::Forfeit));
    }

    #[test]
    fn test_three_seat_claim_win_needs_everyone_away() {
        let liveness = FakeLiveness::default();
        let mut s = new_session(
            ChallengeId::new(),
            "tictactoe",
            &seats(&["y", "z", "w"]),
            1,
            serde_json::Value::Null,
        )
        .unwrap();

        liveness
            .disconnected
            .lock()
            .unwrap()
            .insert("z".to_string(), Duration::from_secs(20));
        let err = claim_win(&mut s, "y", &liveness).unwrap_err();
        assert_eq!(err.kind, ErrorKind::PreconditionFailed);
        assert_eq!(s.status, SessionStatus::Active);

        liveness
            .disconnected
            .lock()
            .unwrap()
            .insert("w".to_string(), Duration::from_secs(15));
        claim_win(&mut s, "y", &liveness).unwrap();
        assert_eq!(s.winner.as_deref(), Some("y"));
        assert_eq!(s.end_reason, Some(EndReason::ClaimedWin));
    }

    #[test]
    fn test_rejected_moves_do_not_mutate() {
        let mut s = session(1);
        apply_move(&mut s, "alice", 4).unwrap();
        let before = s.clone();

        let wrong_turn = apply_move(&mut s, "alice", 0).unwrap_err();
        assert_eq!(wrong_turn.kind, ErrorKind::Forbidden);
        let stranger = apply_move(&mut s, "mallory", 0).unwrap_err();
        assert_eq!(stranger.kind, ErrorKind::Forbidden);
        let occupied = apply_move(&mut s, "bob", 4).unwrap_err();
        assert_eq!(occupied.kind, ErrorKind::AlreadyOccupied);
        let high = apply_move(&mut s, "bob", 9).unwrap_err();
        assert_eq!(high.kind, ErrorKind::OutOfRange);
        let negative = apply_move(&mut s, "bob", -1).unwrap_err();
        assert_eq!(negative.kind, ErrorKind::OutOfRange);

        assert_eq!(s, before);
    }

    #[test]
    fn test_row_wins_single_round_series() {
        let mut s = session(1);
        let outcome = play(
            &mut s,
            &[("alice", 0), ("bob", 3), ("alice", 1), ("bob", 4), ("alice", 2)],
        );
        assert_eq!(
            outcome,
            RoundOutcome::SeriesWon {
                winner: "alice".to_string()
            }
        );
        assert_eq!(s.status, SessionStatus::Completed);
        assert_eq!(s.winner.as_deref(), Some("alice"));
        assert_eq!(s.end_reason, Some(EndReason::SeriesWon));
        assert_eq!(s.score_of("alice"), 1);
        assert!(s.completed_at.is_some());

        let err = apply_move(&mut s, "bob", 5).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidState);

        let done = s.clone();
        assert_eq!(forfeit(&mut s, "bob").unwrap_err().kind, ErrorKind::InvalidState);

        let liveness = FakeLiveness::default();
        liveness
            .disconnected
            .lock()
            .unwrap()
            .insert("alice".to_string(), Duration::from_secs(60));
        let err = claim_win(&mut s, "bob", &liveness).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidState);
        assert_eq!(s, done);
    }

    #[test]
    fn test_round_win_resets_board_and_alternates_opener() {
        let mut s = session(2);
        let outcome = play(
            &mut s,
            &[("alice", 0), ("bob", 3), ("alice", 4), ("bob", 5), ("alice", 8)],
        );
        assert_eq!(
            outcome,
            RoundOutcome::RoundWon {
                winner: "alice".to_string()
            }
        );
        assert_eq!(s.status, SessionStatus::Active);
        assert_eq!(s.round, 2);
        assert_eq!(s.score_of("alice"), 1);
        assert!(s.board.iter().all(Option::is_none));
        assert_eq!(s.current_turn, "bob");
        assert_eq!(s.last_round.as_ref().unwrap().line, Some([0, 4, 8]));
    }

    #[test]
    fn test_full_board_is_a_draw() {
        let mut s = session(1);
        // X O X / X O O / O X X
        let outcome = play(
            &mut s,
            &[
                ("alice", 0),
                ("bob", 1),
                ("alice", 2),
                ("bob", 4),
                ("alice", 3),
                ("bob", 5),
                ("alice", 7),
                ("bob", 6),
                ("alice", 8),
            ],
        );
        assert_eq!(outcome, RoundOutcome::Draw);
        assert_eq!(s.round, 2);
        assert_eq!(s.score_of("alice"), 0);
        assert_eq!(s.score_of("bob"), 0);
        assert_eq!(s.last_round.as_ref().unwrap().winner, None);
        assert_eq!(s.status, SessionStatus::Active);
    }

    #[test]
    fn test_forfeit_awards_opponent() {
        let mut s = session(3);
        forfeit(&mut s, "alice").unwrap();
        assert_eq!(s.status, SessionStatus::Abandoned);
        assert_eq!(s.winner.as_deref(), Some("bob"));
        assert_eq!(s.end_reason, Some(EndReason::Forfeit));

        assert_eq!(forfeit(&mut s, "bob").unwrap_err().kind, ErrorKind::InvalidState);
    }

    #[test]
    fn test_forfeit_by_stranger_forbidden() {
        let mut s = session(1);
        assert_eq!(forfeit(&mut s, "mallory").unwrap_err().kind, ErrorKind::Forbidden);
        assert_eq!(s.status, SessionStatus::Active);
    }

    #[test]
    fn test_claim_win_requires_elapsed_grace() {
        let liveness = FakeLiveness::default();
        let mut s = session(1);

        let err = claim_win(&mut s, "alice", &liveness).unwrap_err();
        assert_eq!(err.kind, ErrorKind::PreconditionFailed);

        liveness
            .disconnected
            .lock()
            .unwrap()
            .insert("bob".to_string(), Duration::from_secs(5));
        let err = claim_win(&mut s, "alice", &liveness).unwrap_err();
        assert_eq!(err.kind, ErrorKind::PreconditionFailed);
        assert_eq!(s.status, SessionStatus::Active);

        liveness
            .disconnected
            .lock()
            .unwrap()
            .insert("bob".to_string(), Duration::from_secs(15));
        claim_win(&mut s, "alice", &liveness).unwrap();
        assert_eq!(s.status, SessionStatus::Abandoned);
        assert_eq!(s.winner.as_deref(), Some("alice"));
        assert_eq!(s.end_reason, Some(EndReason::ClaimedWin));
    }

    #[test]
    fn test_rounds_to_win_option() {
        let mut options = serde_json::Map::new();
        assert_eq!(rounds_to_win_option(&options), 1);
        options.insert("roundsToWin".to_string(), serde_json::json!(3));
        assert_eq!(rounds_to_win_option(&options), 3);
        options.insert("roundsToWin".to_string(), serde_json::json!(50));
        assert_eq!(rounds_to_win_option(&options), MAX_ROUNDS_TO_WIN);
    }
}
