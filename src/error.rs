use crate::session::SecretStoreError;
use std::error::Error as StdError;

/// Everything that can go wrong while talking to the RiverLog backend.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request was rejected locally and never reached the network.
    #[error("{0}")]
    InvalidInput(String),
    /// The server didn't accept our credentials (HTTP 401).
    #[error("The server rejected our credentials")]
    Unauthorized,
    /// Any other 4xx/5xx response.
    #[error("The server returned an error: {0}")]
    ServerError(String),
    /// The HTTP client encountered an error.
    #[error("Unable to send the request")]
    NetworkError(#[source] Box<dyn StdError + Send + Sync + 'static>),
    /// The response didn't have the shape we expected.
    #[error("Unable to parse the response")]
    DecodingError(#[source] serde_json::Error),
    #[error("Unable to access the secret store")]
    SecretStore(#[from] SecretStoreError),
}

impl ApiError {
    pub fn invalid_input<S: Into<String>>(message: S) -> Self {
        ApiError::InvalidInput(message.into())
    }

    pub fn is_unauthorized(&self) -> bool {
        match self {
            ApiError::Unauthorized => true,
            _ => false,
        }
    }

    /// A single message suitable for showing to the person who triggered the
    /// failing action.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::InvalidInput(msg) | ApiError::ServerError(msg) => {
                msg.clone()
            },
            ApiError::Unauthorized => {
                String::from("Session expired. Please login again.")
            },
            ApiError::NetworkError(_) => {
                String::from("Network error. Please check your connection.")
            },
            ApiError::DecodingError(_) => {
                String::from("The server sent a response we don't understand.")
            },
            ApiError::SecretStore(_) => {
                String::from("Unable to save your login details.")
            },
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> ApiError {
        ApiError::NetworkError(Box::new(err))
    }
}
