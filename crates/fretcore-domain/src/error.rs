/// Shared error type used across every fretcore crate.
///
/// Each variant maps to exactly one HTTP status at the pipeline boundary
/// (see `fretcore_gateway::pipeline`); nothing downstream of a handler
/// should construct a status code directly.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("account locked: retry in {retry_after_secs}s")]
    Locked { retry_after_secs: i64 },

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("internal: {0}")]
    Internal(String),
}

impl Error {
    pub fn http_status(&self) -> u16 {
        match self {
            Error::AuthFailed(_) => 401,
            Error::Locked { .. } => 401,
            Error::Forbidden(_) => 403,
            Error::NotFound(_) => 404,
            Error::Validation(_) => 400,
            Error::Conflict(_) => 409,
            Error::Io(_) | Error::Json(_) | Error::Internal(_) => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
