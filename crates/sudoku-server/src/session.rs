//! Session handler. One task per connection, looping through the
//! admit/lobby/play protocol for as many rounds as the client keeps
//! requesting.

use std::sync::Arc;
use std::time::Duration;

use sudoku_core::board::block_cells;
use sudoku_core::protocol::{Message, MessageKind};
use sudoku_core::puzzle::PuzzleStore;
use sudoku_core::verify::{verify_submission, Verdict};
use thiserror::Error;
use tokio::net::TcpStream;
use tracing::{info, warn};

use crate::lobby::Lobby;
use crate::transport::{read_message, write_message, TransportError};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),
    #[error("rejected: lobby at capacity")]
    Capacity,
}

/// Tracks which arbitration counters this session currently contributes
/// to, so a single [`Lobby::leave`] call on exit decrements exactly the
/// right ones regardless of which step the session was interrupted at.
#[derive(Default)]
struct SessionFlags {
    in_lobby: bool,
    active: bool,
}

/// Drive one accepted connection for its entire lifetime (admission,
/// then every round it plays) until it disconnects, errors, or is
/// rejected for capacity.
pub async fn handle_connection(
    mut socket: TcpStream,
    lobby: Arc<Lobby>,
    puzzles: Arc<PuzzleStore>,
    client_timeout: Duration,
) -> Result<(), SessionError> {
    if lobby.admit().is_err() {
        let rejection = Message::new(MessageKind::Rejected);
        let _ = write_message(&mut socket, &rejection, Some(client_timeout)).await;
        warn!("rejected connection: lobby at capacity");
        return Err(SessionError::Capacity);
    }

    let mut flags = SessionFlags::default();
    let result = run_rounds(&mut socket, &lobby, &puzzles, client_timeout, &mut flags).await;
    lobby.leave(flags.in_lobby, flags.active);

    if let Err(ref e) = result {
        info!(error = %e, "session ended");
    }
    result
}

async fn run_rounds(
    socket: &mut TcpStream,
    lobby: &Lobby,
    puzzles: &PuzzleStore,
    client_timeout: Duration,
    flags: &mut SessionFlags,
) -> Result<(), SessionError> {
    loop {
        // Step 1: receive REQUEST_GAME.
        let request = read_message(socket, Some(client_timeout)).await?;
        if request.kind != MessageKind::RequestGame {
            return Err(SessionError::ProtocolViolation(format!(
                "expected REQUEST_GAME, got {:?}",
                request.kind
            )));
        }
        let client_id = request.client_id;
        let span = tracing::info_span!("session", client_id);
        let _enter = span.enter();

        // Step 2: lobby cycle.
        lobby.enter_lobby();
        flags.in_lobby = true;
        lobby.wait_for_release().await;
        let puzzle_index = lobby.enter_play();
        flags.in_lobby = false;
        flags.active = true;
        info!("round started");

        let puzzle = puzzles
            .get(puzzle_index)
            .expect("lobby only publishes valid puzzle indices");

        // Step 3: send the puzzle.
        let mut send_game = Message::new(MessageKind::SendGame);
        send_game.client_id = client_id;
        send_game.game_id = puzzle.id;
        send_game.set_board(&puzzle.givens);
        write_message(socket, &send_game, Some(client_timeout)).await?;

        // Step 4/5: await client traffic until SUBMIT, under the
        // per-session timeout.
        let submission = loop {
            let msg = read_message(socket, Some(client_timeout)).await?;

            if msg.kind == MessageKind::Submit {
                break msg.board_grid().unwrap_or([[0u8; 9]; 9]);
            }

            // Poll before replying to anything other than a submission: a
            // loser's next protocol turn receives GAME_OVER *instead of*
            // the reply it would otherwise get. A submission always gets
            // its own genuine verdict (possibly CORRECT-LATE), even after
            // the round has been decided.
            if let Some((true, winner_id)) = lobby.round_outcome() {
                if winner_id != client_id {
                    let mut game_over = Message::new(MessageKind::GameOver);
                    game_over.client_id = client_id;
                    // GAME_OVER has no dedicated winner field in the wire
                    // table; `game_id` is otherwise unused here, so it
                    // carries the winner's client id.
                    game_over.game_id = winner_id;
                    write_message(socket, &game_over, Some(client_timeout)).await?;
                    info!(winner_id, "notified loser, round over");
                    lobby.finish_round();
                    flags.active = false;
                    return Ok(());
                }
            }

            match msg.kind {
                MessageKind::ValidateBlock => {
                    handle_validate_block(socket, &msg, puzzle, client_id, client_timeout).await?;
                }
                other => {
                    return Err(SessionError::ProtocolViolation(format!(
                        "unexpected message kind {other:?} while awaiting submission"
                    )))
                }
            }
        };

        // Step 6: verify and reply.
        let verdict = verify_submission(&submission, &puzzle.solution, &puzzle.givens);
        let mut reply = Message::new(MessageKind::SubmitReply);
        reply.client_id = client_id;
        match verdict {
            Verdict::Correct => {
                if lobby.record_winner_if_first(client_id) {
                    reply.set_reply("CORRECT-WINNER");
                    info!("won the round");
                } else {
                    reply.set_reply("CORRECT-LATE");
                    info!("correct but too late");
                }
            }
            Verdict::Wrong { differing_cells } => {
                reply.set_reply(&format!("WRONG {differing_cells}"));
            }
        }
        write_message(socket, &reply, Some(client_timeout)).await?;

        // Step 7: this session is done with the round; it may request
        // another.
        lobby.finish_round();
        flags.active = false;
    }
}

async fn handle_validate_block(
    socket: &mut TcpStream,
    msg: &Message,
    puzzle: &sudoku_core::puzzle::Puzzle,
    client_id: i32,
    client_timeout: Duration,
) -> Result<(), SessionError> {
    if !(0..9).contains(&msg.block_id) {
        return Err(SessionError::ProtocolViolation(format!(
            "block_id {} out of range",
            msg.block_id
        )));
    }
    let block_id = msg.block_id as usize;
    let solution_cells = block_cells(&puzzle.solution, block_id);

    let ok = msg
        .block_cells
        .iter()
        .zip(solution_cells.iter())
        .all(|(&submitted, &correct)| submitted == 0 || submitted as u8 == correct);

    let mut reply = Message::new(MessageKind::ValidateBlockReply);
    reply.client_id = client_id;
    reply.block_id = msg.block_id;
    reply.set_reply(if ok { "OK" } else { "NOK" });
    write_message(socket, &reply, Some(client_timeout)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arbitration::ArbitrationState;
    use std::sync::Arc as StdArc;
    use tokio::net::TcpListener;

    const PUZZLE: &str =
        "003020600900305001001806400008102900700000008006708200002609500800203009005010300";
    const SOLUTION: &str =
        "483921657967345821251876493548132976729564138136798245372689514814253769695417382";

    async fn spawn_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accept = tokio::spawn(async move { listener.accept().await.unwrap().0 });
        let client = TcpStream::connect(addr).await.unwrap();
        let server = accept.await.unwrap();
        (server, client)
    }

    fn test_store() -> StdArc<PuzzleStore> {
        StdArc::new(
            PuzzleStore::load_csv(&format!("1,{PUZZLE},{SOLUTION}\n"))
                .unwrap()
                .0,
        )
    }

    #[tokio::test]
    async fn capacity_rejection_closes_without_admitting() {
        let lobby = Arc::new(Lobby::new(Arc::new(ArbitrationState::new(0)), test_store()));
        let puzzles = test_store();
        let (server_sock, mut client_sock) = spawn_pair().await;

        let result =
            handle_connection(server_sock, lobby, puzzles, Duration::from_secs(1)).await;
        assert!(matches!(result, Err(SessionError::Capacity)));

        let reply = read_message(&mut client_sock, Some(Duration::from_secs(1)))
            .await
            .unwrap();
        assert_eq!(reply.kind, MessageKind::Rejected);
    }

    #[tokio::test]
    async fn full_round_trip_single_player_wins() {
        let state = Arc::new(ArbitrationState::new(1));
        let puzzles = test_store();
        let lobby = Arc::new(Lobby::new(state, puzzles.clone()));
        let (server_sock, mut client_sock) = spawn_pair().await;

        let server_task = tokio::spawn(handle_connection(
            server_sock,
            lobby,
            puzzles,
            Duration::from_secs(2),
        ));

        let mut req = Message::new(MessageKind::RequestGame);
        req.client_id = 1;
        write_message(&mut client_sock, &req, None).await.unwrap();

        let send_game = read_message(&mut client_sock, Some(Duration::from_secs(1)))
            .await
            .unwrap();
        assert_eq!(send_game.kind, MessageKind::SendGame);

        let mut submit = Message::new(MessageKind::Submit);
        submit.client_id = 1;
        submit.set_board(&sudoku_core::board::grid_from_str(SOLUTION).unwrap());
        write_message(&mut client_sock, &submit, None).await.unwrap();

        let reply = read_message(&mut client_sock, Some(Duration::from_secs(1)))
            .await
            .unwrap();
        assert_eq!(reply.kind, MessageKind::SubmitReply);
        assert_eq!(reply.reply_str(), "CORRECT-WINNER");

        drop(client_sock);
        let _ = server_task.await;
    }
}
