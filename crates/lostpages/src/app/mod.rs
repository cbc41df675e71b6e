mod bootstrap;
mod loop_runner;
mod script;
mod sim;

use std::path::PathBuf;

use progression::{ContentCompileError, SpawnerConfigError, StartupError};
use thiserror::Error;

pub(crate) use bootstrap::build_app;
pub(crate) use loop_runner::run;

#[derive(Debug, Error)]
pub(crate) enum SessionError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error("{0}")]
    Level(#[from] ContentCompileError),
    #[error("level spawner is misconfigured: {0}")]
    Spawner(#[from] SpawnerConfigError),
    #[error("failed to read session script {}: {source}", path.display())]
    ReadScript {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{}: {message}", path.display())]
    ParseScript { path: PathBuf, message: String },
    #[error("invalid session script {}: {message}", path.display())]
    InvalidScript { path: PathBuf, message: String },
    #[error("invalid value for {var}: {message}")]
    InvalidEnv { var: &'static str, message: String },
    #[error("failed to encode session summary: {0}")]
    WriteSummary(#[source] serde_json::Error),
}
