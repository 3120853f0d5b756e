use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config_path = std::env::args().nth(1).unwrap_or_else(|| "servidor.conf".to_string());

    let config = match sudoku_server::config::Config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(path = %config_path, error = %e, "failed to load configuration");
            std::process::exit(1);
        }
    };

    let puzzles = match sudoku_server::load_puzzle_store(&config) {
        Ok(store) => store,
        Err(e) => {
            tracing::error!(error = %e, "failed to load puzzle store");
            std::process::exit(1);
        }
    };

    if let Err(e) = sudoku_server::serve(config, puzzles).await {
        tracing::error!(error = %e, "server exited with an error");
        std::process::exit(1);
    }
}
