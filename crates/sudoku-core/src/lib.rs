pub mod board;
pub mod protocol;
pub mod puzzle;
pub mod solver;
pub mod validation;
pub mod verify;

pub use board::Grid;
pub use protocol::{Message, MessageKind, ProtocolError};
pub use puzzle::{Puzzle, PuzzleStore};
pub use solver::{BlockValidator, SolveOutcome};
pub use verify::{verify_submission, Verdict};
