pub mod config;
pub mod driver;
pub mod transport;

pub use config::{Config, ConfigError};
pub use driver::{play_round, ClientError, PlayOutcome};
