// Game session coordination backend

pub mod config;
pub mod engine;
pub mod errors;
pub mod metrics;
pub mod models;
pub mod ports;

pub use config::GameServiceConfig;
pub use engine::{GameFuture, GameService};
pub use errors::GameError;

/// Install the global tracing subscriber. Later calls are ignored, so
/// binaries and tests can both use it.
pub fn init_telemetry() {
    let _ = tracing_subscriber::fmt().try_init();
}
