//! Fixed-size wire record. Every message is
//! exactly [`WIRE_SIZE`] bytes, big-endian, with every field present on
//! every message — unused fields are left zero. This buys wire-length
//! stability at the cost of space, by design (see the data model notes).

use bytes::{Buf, BufMut, BytesMut};
use thiserror::Error;

pub const BOARD_LEN: usize = 82;
pub const REPLY_LEN: usize = 50;
pub const BLOCK_CELLS_LEN: usize = 9;

/// `kind`(4) + `client_id`(4) + `game_id`(4) + `board`(82) + `reply`(50)
/// + `block_id`(4) + `block_cells`(9*4)
pub const WIRE_SIZE: usize = 4 + 4 + 4 + BOARD_LEN + REPLY_LEN + 4 + BLOCK_CELLS_LEN * 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum MessageKind {
    RequestGame = 1,
    SendGame = 2,
    Submit = 3,
    SubmitReply = 4,
    ValidateBlock = 5,
    ValidateBlockReply = 6,
    GameOver = 7,
    Rejected = 99,
}

impl MessageKind {
    pub fn from_i32(v: i32) -> Option<Self> {
        use MessageKind::*;
        Some(match v {
            1 => RequestGame,
            2 => SendGame,
            3 => Submit,
            4 => SubmitReply,
            5 => ValidateBlock,
            6 => ValidateBlockReply,
            7 => GameOver,
            99 => Rejected,
            _ => return None,
        })
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("frame is {0} bytes, expected {WIRE_SIZE}")]
    WrongLength(usize),
    #[error("unknown message kind {0}")]
    UnknownKind(i32),
}

/// A single fixed-layout message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub kind: MessageKind,
    pub client_id: i32,
    pub game_id: i32,
    /// 81 ASCII digits followed by a terminator byte (`0`).
    pub board: [u8; BOARD_LEN],
    /// Short ASCII status, nul-padded.
    pub reply: [u8; REPLY_LEN],
    pub block_id: i32,
    pub block_cells: [i32; BLOCK_CELLS_LEN],
}

impl Message {
    /// A zeroed message of the given kind; every other field is the
    /// type's default (0 / all-zero arrays).
    pub fn new(kind: MessageKind) -> Self {
        Message {
            kind,
            client_id: 0,
            game_id: 0,
            board: [0; BOARD_LEN],
            reply: [0; REPLY_LEN],
            block_id: 0,
            block_cells: [0; BLOCK_CELLS_LEN],
        }
    }

    /// Encode `grid` as 81 ASCII digits into `board`, with a terminating
    /// zero byte at index 81.
    pub fn set_board(&mut self, grid: &crate::board::Grid) {
        let s = crate::board::grid_to_string(grid);
        let bytes = s.as_bytes();
        self.board[..bytes.len()].copy_from_slice(bytes);
        self.board[bytes.len()] = 0;
    }

    /// Decode the 81 leading ASCII digits of `board` back into a grid.
    /// Returns `None` if they are not all ASCII digits.
    pub fn board_grid(&self) -> Option<crate::board::Grid> {
        let s = std::str::from_utf8(&self.board[..81]).ok()?;
        crate::board::grid_from_str(s)
    }

    /// Set the `reply` field from a short ASCII string, truncating if it
    /// exceeds [`REPLY_LEN`] and nul-padding otherwise.
    pub fn set_reply(&mut self, text: &str) {
        self.reply = [0; REPLY_LEN];
        let bytes = text.as_bytes();
        let n = bytes.len().min(REPLY_LEN);
        self.reply[..n].copy_from_slice(&bytes[..n]);
    }

    /// Read `reply` back as a `String`, stopping at the first nul byte.
    pub fn reply_str(&self) -> String {
        let end = self.reply.iter().position(|&b| b == 0).unwrap_or(REPLY_LEN);
        String::from_utf8_lossy(&self.reply[..end]).into_owned()
    }

    /// Serialize to exactly [`WIRE_SIZE`] bytes, big-endian.
    pub fn encode(&self) -> [u8; WIRE_SIZE] {
        let mut buf = BytesMut::with_capacity(WIRE_SIZE);
        buf.put_i32(self.kind as i32);
        buf.put_i32(self.client_id);
        buf.put_i32(self.game_id);
        buf.put_slice(&self.board);
        buf.put_slice(&self.reply);
        buf.put_i32(self.block_id);
        for cell in self.block_cells {
            buf.put_i32(cell);
        }
        let mut out = [0u8; WIRE_SIZE];
        out.copy_from_slice(&buf[..]);
        out
    }

    /// Parse exactly [`WIRE_SIZE`] bytes into a [`Message`].
    pub fn decode(mut bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() != WIRE_SIZE {
            return Err(ProtocolError::WrongLength(bytes.len()));
        }
        let kind_raw = bytes.get_i32();
        let kind = MessageKind::from_i32(kind_raw).ok_or(ProtocolError::UnknownKind(kind_raw))?;
        let client_id = bytes.get_i32();
        let game_id = bytes.get_i32();
        let mut board = [0u8; BOARD_LEN];
        bytes.copy_to_slice(&mut board);
        let mut reply = [0u8; REPLY_LEN];
        bytes.copy_to_slice(&mut reply);
        let block_id = bytes.get_i32();
        let mut block_cells = [0i32; BLOCK_CELLS_LEN];
        for cell in &mut block_cells {
            *cell = bytes.get_i32();
        }
        Ok(Message {
            kind,
            client_id,
            game_id,
            board,
            reply,
            block_id,
            block_cells,
        })
    }
}
