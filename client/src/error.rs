use shared::PlayerId;
use thiserror::Error;

/// Conditions surfaced to the owning session.
///
/// Clock drift, history gaps and lost latency probes are recovered locally
/// and never show up here.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("snapshot references unregistered player {0}")]
    UnknownPlayer(PlayerId),
    #[error("local player {0} has not joined")]
    MissingLocalPlayer(PlayerId),
    #[error("binary codec error: {0}")]
    Codec(#[from] bincode::Error),
    #[error("json codec error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("disconnected by server: {0}")]
    Disconnected(String),
}
