//! Tracing subscriber setup.

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::ServerConfig;

/// Installs the global subscriber.
///
/// `RUST_LOG` wins over `server.log_level`. Production emits JSON lines,
/// everything else gets the pretty formatter. Calling this twice is a no-op.
pub fn init_logging(server: &ServerConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&server.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if server.is_production() {
        let _ = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .json()
            .with_writer(std::io::stderr)
            .try_init();
    } else {
        let _ = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .pretty()
            .with_writer(std::io::stderr)
            .try_init();
    }
}
