//! Executing a single request against the RiverLog API.
//!
//! The [`Gateway`] knows how to build URLs, attach credentials, and turn a
//! raw HTTP response into either a decoded payload or an [`ApiError`]. The
//! actual I/O happens in a [`Transport`], which lets the same classification
//! rules apply no matter which HTTP client is in use.

mod http;

pub use http::HttpTransport;

use crate::{ApiError, Config};
use serde::de::DeserializeOwned;
use serde_derive::Deserialize;
use serde_json::Value;
use std::{
    fmt::{self, Debug, Display, Formatter},
    sync::Arc,
};
use url::Url;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Display for Method {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        };

        f.write_str(name)
    }
}

/// A fully resolved request, ready to be put on the wire.
#[derive(Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub url: Url,
    pub token: Option<String>,
    pub body: Option<Value>,
}

impl Debug for ApiRequest {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        // bodies and tokens may contain credentials
        f.debug_struct("ApiRequest")
            .field("method", &self.method)
            .field("url", &self.url.as_str())
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("body", &self.body.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// The status code and body of a response, before any interpretation.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new<B: Into<Vec<u8>>>(status: u16, body: B) -> Self {
        RawResponse {
            status,
            body: body.into(),
        }
    }
}

/// Something which can send an [`ApiRequest`] and hand back the raw response.
///
/// Implementations should only fail with [`ApiError::NetworkError`], leaving
/// status code handling to the [`Gateway`].
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<RawResponse, ApiError>;
}

/// A successful response.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// The server answered with `204 No Content`.
    NoContent,
    /// The `data` field of the response envelope.
    Data(Value),
}

impl Reply {
    /// Decode the envelope's payload.
    pub fn into_data<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        match self {
            Reply::Data(value) => {
                serde_json::from_value(value).map_err(ApiError::DecodingError)
            },
            Reply::NoContent => {
                serde_json::from_value(Value::Null)
                    .map_err(ApiError::DecodingError)
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    data: Value,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: String,
}

/// Sends requests to the RiverLog API and classifies the responses.
///
/// The gateway is stateless, so it's cheap to clone and share.
#[derive(Clone)]
pub struct Gateway {
    base_url: Url,
    transport: Arc<dyn Transport>,
}

impl Gateway {
    pub fn new<T>(base_url: Url, transport: T) -> Self
    where
        T: Transport + 'static,
    {
        Gateway {
            base_url,
            transport: Arc::new(transport),
        }
    }

    /// Create a gateway which talks HTTP using the settings in `config`.
    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        let transport = HttpTransport::new(&config.user_agent)?;

        Ok(Gateway::new(config.base_url.clone(), transport))
    }

    pub fn base_url(&self) -> &Url { &self.base_url }

    /// Resolve `path` (e.g. `/trips/42`) against the base URL.
    pub fn url_for<K, V>(
        &self,
        path: &str,
        query: &[(K, V)],
    ) -> Result<Url, ApiError>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let raw = format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        let mut url = Url::parse(&raw).map_err(|e| {
            ApiError::InvalidInput(format!("Invalid request URL: {}", e))
        })?;

        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key.as_ref(), value.as_ref());
            }
        }

        Ok(url)
    }

    /// Execute a single request.
    ///
    /// Nothing is retried. A `401` always becomes [`ApiError::Unauthorized`]
    /// and it's up to the caller to tear down the session.
    pub async fn execute<K, V>(
        &self,
        method: Method,
        path: &str,
        query: &[(K, V)],
        body: Option<Value>,
        token: Option<&str>,
    ) -> Result<Reply, ApiError>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let request = ApiRequest {
            method,
            url: self.url_for(path, query)?,
            token: token.map(String::from),
            body,
        };

        log::debug!("Sending a {} request to {}", method, request.url);
        let response = self.transport.send(request).await?;
        log::trace!(
            "Received {} ({} bytes) for {} {}",
            response.status,
            response.body.len(),
            method,
            path
        );

        classify(response)
    }
}

impl Debug for Gateway {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gateway")
            .field("base_url", &self.base_url.as_str())
            .finish()
    }
}

/// Convenience for endpoints which don't take query parameters.
pub(crate) const NO_QUERY: &[(&str, &str)] = &[];

pub(crate) fn classify(response: RawResponse) -> Result<Reply, ApiError> {
    let RawResponse { status, body } = response;

    match status {
        204 => Ok(Reply::NoContent),
        401 => Err(ApiError::Unauthorized),
        s if s >= 400 => {
            let message = serde_json::from_slice::<ErrorEnvelope>(&body)
                .map(|envelope| envelope.error)
                .unwrap_or_else(|_| status.to_string());
            log::warn!("The server responded with {}: {}", status, message);

            Err(ApiError::ServerError(message))
        },
        _ => {
            let envelope: Envelope = serde_json::from_slice(&body)
                .map_err(ApiError::DecodingError)?;

            if let Some(message) = &envelope.message {
                log::debug!("Server message: {}", message);
            }

            Ok(Reply::Data(envelope.data))
        },
    }
}
