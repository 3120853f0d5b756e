//! Framed transport, client side. Reads and writes exactly
//! `sudoku_core::protocol::WIRE_SIZE` bytes on a blocking `TcpStream`.
//!
//! Unlike the server, the client stays synchronous: the solver fans out
//! across plain OS threads that make *blocking* validation calls back
//! into the same connection, serialized by a shared mutex around the
//! stream. There is no async runtime on this side of the wire to keep in
//! sync with those threads, so `std::net::TcpStream` is the natural fit.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use sudoku_core::protocol::{Message, ProtocolError, WIRE_SIZE};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("server closed the connection")]
    Eof,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed frame: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Apply `timeout` symmetrically to both directions of `stream`, the
/// blocking equivalent of the server's `tokio::time::timeout` wrapper.
pub fn apply_timeout(stream: &TcpStream, timeout: Duration) -> std::io::Result<()> {
    stream.set_read_timeout(Some(timeout))?;
    stream.set_write_timeout(Some(timeout))
}

/// Block until a full frame is read or the stream reaches end-of-input or
/// the socket's configured read timeout (if any) elapses.
pub fn read_message(stream: &mut TcpStream) -> Result<Message, TransportError> {
    let mut buf = [0u8; WIRE_SIZE];
    match stream.read_exact(&mut buf) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Err(TransportError::Eof),
        Err(e) => return Err(TransportError::Io(e)),
    }
    Ok(Message::decode(&buf)?)
}

/// Block until a full frame is written or the socket's configured write
/// timeout (if any) elapses.
pub fn write_message(stream: &mut TcpStream, msg: &Message) -> Result<(), TransportError> {
    let bytes = msg.encode();
    stream.write_all(&bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sudoku_core::protocol::MessageKind;
    use std::net::TcpListener;

    #[test]
    fn round_trips_a_message_over_a_real_socket() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = std::thread::spawn(move || {
            let (mut sock, _) = listener.accept().unwrap();
            let msg = read_message(&mut sock).unwrap();
            write_message(&mut sock, &msg).unwrap();
        });

        let mut client = TcpStream::connect(addr).unwrap();
        let mut msg = Message::new(MessageKind::RequestGame);
        msg.client_id = 7;
        write_message(&mut client, &msg).unwrap();
        let echoed = read_message(&mut client).unwrap();

        server.join().unwrap();
        assert_eq!(echoed.client_id, 7);
        assert_eq!(echoed.kind, MessageKind::RequestGame);
    }

    #[test]
    fn read_reports_eof_on_peer_close() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let client = TcpStream::connect(addr).unwrap();
        let (mut sock, _) = listener.accept().unwrap();
        drop(client);

        let err = read_message(&mut sock).unwrap_err();
        assert!(matches!(err, TransportError::Eof));
    }

    #[test]
    fn read_times_out_when_peer_sends_nothing() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let _client = TcpStream::connect(addr).unwrap();
        let (mut sock, _) = listener.accept().unwrap();
        apply_timeout(&sock, Duration::from_millis(50)).unwrap();

        let err = read_message(&mut sock).unwrap_err();
        assert!(matches!(err, TransportError::Io(_)));
    }
}
