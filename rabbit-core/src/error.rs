use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("network error")]
    Network(#[from] reqwest::Error),
    #[error("api rejected the request ({status}): {message}")]
    Api { status: StatusCode, message: String },
    #[error("asset host answered {status} for {url}")]
    Asset { status: StatusCode, url: String },
    #[error("credentials rejected by the api")]
    Unauthorized,
    #[error("unable to decode body")]
    Decode(#[from] serde_json::Error),
    #[error("io error")]
    Io(#[from] std::io::Error),
    #[error("not logged in")]
    Unauthenticated,
    #[error("session expired")]
    SessionExpired,
    #[error("invalid config: {0}")]
    Config(String),
    #[error("invalid input: {0}")]
    Invalid(String),
}

impl Error {
    /// True when logging in again would fix the failure.
    pub fn needs_login(&self) -> bool {
        matches!(
            self,
            Error::Unauthorized | Error::Unauthenticated | Error::SessionExpired
        )
    }
}
