use std::net::TcpStream;
use std::sync::{Arc, Mutex};

use sudoku_client::driver::{play_round, PlayOutcome};
use sudoku_client::transport::apply_timeout;
use sudoku_client::Config;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config_path = std::env::args().nth(1).unwrap_or_else(|| "cliente.conf".to_string());

    let config = match Config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(path = %config_path, error = %e, "failed to load configuration");
            std::process::exit(1);
        }
    };

    let stream = match TcpStream::connect((config.server_ip.as_str(), config.server_port)) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "failed to connect to server");
            std::process::exit(1);
        }
    };
    if let Err(e) = apply_timeout(&stream, config.server_timeout) {
        tracing::error!(error = %e, "failed to apply socket timeout");
        std::process::exit(1);
    }

    let span = tracing::info_span!("client", client_id = config.client_id);
    let _enter = span.enter();

    let stream = Arc::new(Mutex::new(stream));
    loop {
        match play_round(&stream, config.client_id, config.max_workers) {
            Ok(PlayOutcome::Won) => tracing::info!("won the round"),
            Ok(PlayOutcome::CorrectLate) => tracing::info!("correct, but too late"),
            Ok(PlayOutcome::Wrong { differing_cells }) => {
                tracing::info!(differing_cells, "submission was wrong")
            }
            Ok(PlayOutcome::Lost { winner_id }) => {
                tracing::info!(winner_id, "lost the round")
            }
            Ok(PlayOutcome::Rejected) => {
                tracing::warn!("server rejected the connection: lobby at capacity");
                break;
            }
            Err(e) => {
                tracing::error!(error = %e, "round ended in error");
                break;
            }
        }
    }
}
