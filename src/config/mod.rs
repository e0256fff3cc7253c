pub mod server;

pub use server::{Cli, ConfigError, ServerConfig, DEFAULT_ENDPOINT, DEFAULT_PORT};
