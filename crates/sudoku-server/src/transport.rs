//! Framed transport, server side. Reads and writes exactly
//! `sudoku_core::protocol::WIRE_SIZE` bytes on a `TcpStream`.

use std::time::Duration;

use sudoku_core::protocol::{Message, ProtocolError, WIRE_SIZE};
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("peer closed the connection")]
    Eof,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("malformed frame: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Block until a full frame is read, the stream reaches end-of-input, or
/// `timeout` (if given) elapses.
pub async fn read_message(
    stream: &mut TcpStream,
    timeout: Option<Duration>,
) -> Result<Message, TransportError> {
    let mut buf = [0u8; WIRE_SIZE];
    let read = stream.read_exact(&mut buf);
    match timeout {
        Some(d) => match tokio::time::timeout(d, read).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Err(TransportError::Eof)
            }
            Ok(Err(e)) => return Err(TransportError::Io(e)),
            Err(_) => return Err(TransportError::Timeout(d)),
        },
        None => match read.await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Err(TransportError::Eof)
            }
            Err(e) => return Err(TransportError::Io(e)),
        },
    }
    Ok(Message::decode(&buf)?)
}

/// Block until a full frame is written or `timeout` (if given) elapses.
pub async fn write_message(
    stream: &mut TcpStream,
    msg: &Message,
    timeout: Option<Duration>,
) -> Result<(), TransportError> {
    let bytes = msg.encode();
    let write = stream.write_all(&bytes);
    match timeout {
        Some(d) => match tokio::time::timeout(d, write).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(TransportError::Io(e)),
            Err(_) => Err(TransportError::Timeout(d)),
        },
        None => write.await.map_err(TransportError::Io),
    }
}
