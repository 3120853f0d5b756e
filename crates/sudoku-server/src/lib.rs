pub mod arbitration;
pub mod config;
pub mod lobby;
pub mod session;
pub mod timer;
pub mod transport;

use std::sync::Arc;
use std::time::Duration;

use sudoku_core::puzzle::PuzzleStore;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::arbitration::ArbitrationState;
use crate::config::Config;
use crate::lobby::Lobby;

/// Read and parse the puzzle source named by `config.puzzles_path`,
/// logging how many rows were kept versus skipped.
pub fn load_puzzle_store(config: &Config) -> std::io::Result<PuzzleStore> {
    let text = std::fs::read_to_string(&config.puzzles_path)?;
    match PuzzleStore::load_csv(&text) {
        Ok((store, kept, skipped)) => {
            info!(kept, skipped, path = %config.puzzles_path, "loaded puzzle store");
            Ok(store)
        }
        Err(e) => {
            error!(error = %e, path = %config.puzzles_path, "failed to load puzzle store");
            Err(std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
        }
    }
}

/// Bind the configured listen port and build the arbitration state and
/// lobby controller. Split out from [`serve`] so tests can bind an
/// ephemeral port (`config.port == 0`) and read back the real address.
pub async fn bind(config: &Config, puzzles: Arc<PuzzleStore>) -> std::io::Result<(TcpListener, Arc<Lobby>)> {
    let state = Arc::new(ArbitrationState::new(config.lobby_capacity));
    let lobby = Arc::new(Lobby::new(state, puzzles));
    let listener = TcpListener::bind(("127.0.0.1", config.port)).await?;
    info!(
        port = listener.local_addr()?.port(),
        capacity = config.lobby_capacity,
        "listening"
    );
    Ok((listener, lobby))
}

/// Accept connections forever, spawning one session task per connection.
pub async fn accept_loop(
    listener: TcpListener,
    lobby: Arc<Lobby>,
    puzzles: Arc<PuzzleStore>,
    client_timeout: Duration,
) -> std::io::Result<()> {
    loop {
        let (socket, peer) = listener.accept().await?;
        let lobby = lobby.clone();
        let puzzles = puzzles.clone();

        tokio::spawn(async move {
            info!(%peer, "accepted connection");
            if let Err(e) = session::handle_connection(socket, lobby, puzzles, client_timeout).await {
                tracing::debug!(%peer, error = %e, "session ended");
            }
        });
    }
}

/// Bind, spawn the aggregation timer, and serve connections until the
/// process is killed or the listener errors.
pub async fn serve(config: Config, puzzles: PuzzleStore) -> std::io::Result<()> {
    let puzzles = Arc::new(puzzles);
    let (listener, lobby) = bind(&config, puzzles.clone()).await?;
    timer::spawn(lobby.clone(), config.aggregation_window);
    accept_loop(listener, lobby, puzzles, config.client_timeout).await
}
