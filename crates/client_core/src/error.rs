use shared::error::{ApiException, ErrorCode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Credenciales inválidas")]
    InvalidCredentials,
    #[error("invalid api base url: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),
    #[error("orders api rejected the request: {0}")]
    Api(#[from] ApiException),
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed response from orders api: {0}")]
    Decode(String),
}

impl ClientError {
    /// True when the session token is missing, expired or was refused.
    pub fn requires_reauth(&self) -> bool {
        match self {
            Self::InvalidCredentials => true,
            Self::Api(err) => matches!(err.code, ErrorCode::Unauthorized | ErrorCode::Forbidden),
            _ => false,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api(err) => Some(err.status),
            Self::Transport(err) => err.status().map(|status| status.as_u16()),
            _ => None,
        }
    }
}
