use reclaim_core::Handle;
use thiserror::Error;

/// Failures of whole-engine operations, as opposed to per-item outcomes.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("destination {0} is not a writable directory")]
    DestinationUnavailable(Handle),

    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),
}
