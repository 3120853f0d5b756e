//! Client-side session driver. Plays one round over an already-connected
//! socket: request a puzzle, hand it to the parallel solver, and submit
//! whatever grid comes out.

use std::net::TcpStream;
use std::sync::{Arc, Mutex};

use sudoku_core::board::Grid;
use sudoku_core::protocol::{Message, MessageKind};
use sudoku_core::solver::{solve_parallel, BlockValidator, SolveOutcome};
use thiserror::Error;

use crate::transport::{read_message, write_message, TransportError};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayOutcome {
    /// This round's `SUBMIT` was the first correct one.
    Won,
    /// Correct, but another player's submission was recorded first.
    CorrectLate,
    /// Rule-invalid or incomplete submission; `differing_cells` is purely
    /// informational.
    Wrong { differing_cells: u32 },
    /// Learned of the round's outcome before submitting, via a
    /// `GAME_OVER` pushed in reply to a block validation.
    Lost { winner_id: i32 },
    /// The server rejected the connection for being at capacity.
    Rejected,
}

/// `BlockValidator` that exercises the live connection: each call sends a
/// `VALIDATE_BLOCK` and blocks for the reply, serialized by `stream`'s
/// mutex so concurrent solver worker threads cannot interleave frames.
/// If the reply turns out to be an unsolicited `GAME_OVER` rather than
/// `VALIDATE_BLOCK_REPLY`, the round is already lost; that is recorded
/// in `game_over` for the driver to notice once the search finishes,
/// rather than fed back into the solver's own cancellation (the
/// solver's stop flag is reserved for "a worker found a solution").
struct NetValidator {
    stream: Arc<Mutex<TcpStream>>,
    client_id: i32,
    game_over: Arc<Mutex<Option<i32>>>,
}

impl BlockValidator for NetValidator {
    fn validate_block(&self, block_id: usize, block_cells: [u8; 9]) -> bool {
        let mut msg = Message::new(MessageKind::ValidateBlock);
        msg.client_id = self.client_id;
        msg.block_id = block_id as i32;
        for (dst, &v) in msg.block_cells.iter_mut().zip(block_cells.iter()) {
            *dst = v as i32;
        }

        let mut guard = self.stream.lock().unwrap();
        if write_message(&mut guard, &msg).is_err() {
            return true;
        }
        match read_message(&mut guard) {
            Ok(reply) if reply.kind == MessageKind::ValidateBlockReply => reply.reply_str() == "OK",
            Ok(reply) if reply.kind == MessageKind::GameOver => {
                *self.game_over.lock().unwrap() = Some(reply.game_id);
                true
            }
            _ => true,
        }
    }
}

/// Play one round to completion over `stream`: send `REQUEST_GAME`,
/// receive the puzzle, solve it, and submit. `max_workers` is forwarded
/// to [`solve_parallel`] (clamped to `1..=9` there); `client_id` both
/// identifies this player to the server and seeds the solver's candidate
/// shuffle, so concurrent players diverge in which sub-trees they explore.
pub fn play_round(
    stream: &Arc<Mutex<TcpStream>>,
    client_id: i32,
    max_workers: usize,
) -> Result<PlayOutcome, ClientError> {
    {
        let mut guard = stream.lock().unwrap();
        let mut request = Message::new(MessageKind::RequestGame);
        request.client_id = client_id;
        write_message(&mut guard, &request)?;
    }

    let send_game = {
        let mut guard = stream.lock().unwrap();
        read_message(&mut guard)?
    };
    let givens: Grid = match send_game.kind {
        MessageKind::Rejected => return Ok(PlayOutcome::Rejected),
        MessageKind::SendGame => send_game.board_grid().ok_or_else(|| {
            ClientError::ProtocolViolation("SEND_GAME carried a malformed board".to_string())
        })?,
        other => {
            return Err(ClientError::ProtocolViolation(format!(
                "expected SEND_GAME, got {other:?}"
            )))
        }
    };

    let game_over = Arc::new(Mutex::new(None));
    let validator: Arc<dyn BlockValidator> = Arc::new(NetValidator {
        stream: Arc::clone(stream),
        client_id,
        game_over: Arc::clone(&game_over),
    });

    let seed = client_id as u64;
    let submission = match solve_parallel(&givens, seed, max_workers, validator) {
        SolveOutcome::Solved(grid) => grid,
        // No solution found: submit whatever grid we have and let the
        // verifier reject it.
        SolveOutcome::Unsatisfiable => givens,
    };

    if let Some(winner_id) = *game_over.lock().unwrap() {
        return Ok(PlayOutcome::Lost { winner_id });
    }

    let reply = {
        let mut guard = stream.lock().unwrap();
        let mut submit = Message::new(MessageKind::Submit);
        submit.client_id = client_id;
        submit.game_id = send_game.game_id;
        submit.set_board(&submission);
        write_message(&mut guard, &submit)?;
        read_message(&mut guard)?
    };

    match reply.kind {
        MessageKind::SubmitReply => match reply.reply_str().as_str() {
            "CORRECT-WINNER" => Ok(PlayOutcome::Won),
            "CORRECT-LATE" => Ok(PlayOutcome::CorrectLate),
            text => {
                let differing_cells = text
                    .strip_prefix("WRONG")
                    .and_then(|rest| rest.trim().parse().ok())
                    .unwrap_or(0);
                Ok(PlayOutcome::Wrong { differing_cells })
            }
        },
        other => Err(ClientError::ProtocolViolation(format!(
            "expected SUBMIT_REPLY, got {other:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sudoku_core::board::grid_from_str;
    use std::net::TcpListener;

    const PUZZLE: &str =
        "003020600900305001001806400008102900700000008006708200002609500800203009005010300";
    const SOLUTION: &str =
        "483921657967345821251876493548132976729564138136798245372689514814253769695417382";

    fn connected_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).unwrap();
        let (server, _) = listener.accept().unwrap();
        (server, client)
    }

    #[test]
    fn rejected_connection_reports_rejected_outcome() {
        let (mut server, client) = connected_pair();
        let client = Arc::new(Mutex::new(client));

        let server_thread = std::thread::spawn(move || {
            let _req = read_message(&mut server).unwrap();
            write_message(&mut server, &Message::new(MessageKind::Rejected)).unwrap();
        });

        let outcome = play_round(&client, 1, 4).unwrap();
        assert_eq!(outcome, PlayOutcome::Rejected);
        server_thread.join().unwrap();
    }

    #[test]
    fn solves_and_wins_against_a_scripted_server() {
        let (mut server, client) = connected_pair();
        let client = Arc::new(Mutex::new(client));

        let server_thread = std::thread::spawn(move || {
            let req = read_message(&mut server).unwrap();
            assert_eq!(req.kind, MessageKind::RequestGame);

            let mut send_game = Message::new(MessageKind::SendGame);
            send_game.game_id = 1;
            send_game.set_board(&grid_from_str(PUZZLE).unwrap());
            write_message(&mut server, &send_game).unwrap();

            // Answer every VALIDATE_BLOCK with OK until SUBMIT arrives.
            let submit = loop {
                let msg = read_message(&mut server).unwrap();
                match msg.kind {
                    MessageKind::ValidateBlock => {
                        let mut reply = Message::new(MessageKind::ValidateBlockReply);
                        reply.block_id = msg.block_id;
                        reply.set_reply("OK");
                        write_message(&mut server, &reply).unwrap();
                    }
                    MessageKind::Submit => break msg,
                    other => panic!("unexpected message kind {other:?}"),
                }
            };
            assert_eq!(submit.board_grid().unwrap(), grid_from_str(SOLUTION).unwrap());

            let mut reply = Message::new(MessageKind::SubmitReply);
            reply.set_reply("CORRECT-WINNER");
            write_message(&mut server, &reply).unwrap();
        });

        let outcome = play_round(&client, 1, 4).unwrap();
        assert_eq!(outcome, PlayOutcome::Won);
        server_thread.join().unwrap();
    }

    #[test]
    fn game_over_during_validation_is_reported_as_a_loss() {
        let (mut server, client) = connected_pair();
        let client = Arc::new(Mutex::new(client));

        let server_thread = std::thread::spawn(move || {
            let _req = read_message(&mut server).unwrap();

            let mut send_game = Message::new(MessageKind::SendGame);
            send_game.game_id = 1;
            send_game.set_board(&grid_from_str(PUZZLE).unwrap());
            write_message(&mut server, &send_game).unwrap();

            // First validate gets the real reply; from then on the round
            // is "decided" in favour of client 99.
            let first = read_message(&mut server).unwrap();
            assert_eq!(first.kind, MessageKind::ValidateBlock);
            let mut reply = Message::new(MessageKind::ValidateBlockReply);
            reply.set_reply("OK");
            write_message(&mut server, &reply).unwrap();

            loop {
                let msg = read_message(&mut server).unwrap();
                if msg.kind == MessageKind::ValidateBlock {
                    let mut game_over = Message::new(MessageKind::GameOver);
                    game_over.game_id = 99;
                    write_message(&mut server, &game_over).unwrap();
                    break;
                }
            }
        });

        let outcome = play_round(&client, 1, 1).unwrap();
        assert_eq!(outcome, PlayOutcome::Lost { winner_id: 99 });
        server_thread.join().unwrap();
    }
}
