use thiserror::Error;

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with `success: false`.
    #[error("request failed with status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("not logged in")]
    NotAuthenticated,

    /// The refresh token expired; a new login is required.
    #[error("session expired")]
    SessionExpired,
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::NotAuthenticated | ClientError::SessionExpired)
            || self.status() == Some(401)
    }
}
