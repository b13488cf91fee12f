use axum::http::StatusCode;
use thiserror::Error;

/// Errors surfaced by the persistence layer and the domain repositories.
///
/// Storage and transport failures are advisory wherever a fallback exists;
/// domain errors (authorization, duplicates, missing accounts) always reach
/// the caller.
#[derive(Debug, Error)]
pub enum Error {
    #[error("not authorized")]
    Unauthorized,

    #[error("username already registered: {0}")]
    DuplicateUsername(String),

    #[error("account not found: {0}")]
    NotFound(String),

    #[error("durable store unavailable: {0}")]
    StorageUnavailable(String),

    #[error("remote submission api unreachable: {0}")]
    RemoteUnreachable(String),

    #[error("database not initialized")]
    SchemaNotInitialized,

    #[error("database error: {0}")]
    Engine(#[from] rusqlite::Error),

    #[error("decode failed: {0}")]
    Decode(String),

    #[error("password hashing failed: {0}")]
    PasswordHash(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Status a handler responds with when this error escapes over HTTP.
    pub fn status(&self) -> StatusCode {
        match self {
            Error::Unauthorized => StatusCode::FORBIDDEN,
            Error::DuplicateUsername(_) => StatusCode::CONFLICT,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Decode(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_map_to_client_statuses() {
        assert_eq!(Error::Unauthorized.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            Error::DuplicateUsername("admin".into()).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(Error::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            Error::SchemaNotInitialized.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
