use thiserror::Error;

/// Errors surfaced by leveled log calls and sink delivery.
#[derive(Debug, Error)]
pub enum Error {
    /// A data argument could not be converted to a JSON value.
    #[error("failed serializing log argument: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Writing to the local stream failed. There is no fallback destination,
    /// so this is fatal to the call.
    #[error("failed writing log record to stream: {0}")]
    Io(#[from] std::io::Error),

    /// The remote append used an outdated continuation token. `expected`
    /// carries the token the service reports as current. Consumed by the
    /// single internal retry; escalated as [`Error::Transport`] when the
    /// retry fails too.
    #[error("remote append rejected: stale continuation token")]
    StaleToken { expected: Option<String> },

    /// Network or API failure talking to the remote ingestion service.
    /// Never retried beyond the single stale-token retry.
    #[error("remote transport failure: {0}")]
    Transport(String),

    /// The remote destination could not be created or reached, or it entered
    /// the failed state after an earlier error. Calls keep failing with this
    /// until the sink is reconstructed.
    #[error("remote destination failure: {0}")]
    Destination(String),

    /// The process-wide logger was installed twice.
    #[error("global logger is already initialized")]
    AlreadyInitialized,
}
