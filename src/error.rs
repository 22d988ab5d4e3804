use thiserror::Error;

/// Failure of a single call to an external service.
///
/// These never abort a generation on their own: callers inside a fan-out phase turn
/// them into "no data for this item".
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("service answered with status {0}")]
    Status(u16),

    #[error("malformed response: {0}")]
    Decode(String),

    #[error("request task failed: {0}")]
    TaskFailed(String),
}

impl From<ureq::Error> for ServiceError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(code, _) => ServiceError::Status(code),
            ureq::Error::Transport(transport) => ServiceError::Http(transport.to_string()),
        }
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::Decode(err.to_string())
    }
}

impl From<tokio::task::JoinError> for ServiceError {
    fn from(err: tokio::task::JoinError) -> Self {
        ServiceError::TaskFailed(err.to_string())
    }
}

/// Failure of the playlist store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("playlist store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("playlist store is corrupt: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("no saved playlist with id {id}")]
    NotFound { id: uuid::Uuid },
}

/// Errors surfaced to whoever asked for a playlist
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("could not find a location for '{address}', check the spelling and try again")]
    Geocode { address: String },

    #[error("no driving route between '{start}' and '{end}'")]
    RouteUnavailable { start: String, end: String },

    #[error("request {generation} was replaced by a newer one")]
    Superseded { generation: u64 },

    #[error("there is no playlist to refresh, generate one first")]
    NoActivePlaylist,

    #[error("nothing to save yet, wait for the tracks to load")]
    NothingToSave,

    #[error("sign in before downloading a playlist")]
    NotSignedIn,

    #[error(transparent)]
    Store(#[from] StoreError),
}
