//! Error types shared by the station client, the Spotify client and the sync engine.

/// Result type alias for sync operations
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Station feed unreachable or answered with a non-2xx status.
    #[error("station feed unavailable: {0}")]
    Fetch(String),

    /// Streaming service answered with a non-2xx status.
    #[error("api error {status}: {body}")]
    Api { status: u16, body: String },

    /// A success response whose body could not be decoded.
    #[error("malformed response: {0}")]
    Parse(String),

    /// The managed playlist could neither be found nor created.
    #[error("could not resolve managed playlist: {0}")]
    Resolution(#[source] Box<Error>),

    #[error("authorization failed: {0}")]
    Auth(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    pub fn api(status: reqwest::StatusCode, body: impl Into<String>) -> Self {
        Self::Api {
            status: status.as_u16(),
            body: body.into(),
        }
    }

    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    /// HTTP status carried by an `Api` error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            Error::Resolution(inner) => inner.status(),
            _ => None,
        }
    }
}
