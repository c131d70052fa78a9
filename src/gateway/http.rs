use super::{ApiRequest, Method, RawResponse, Transport};
use crate::ApiError;
use reqwest::Client;

/// A [`Transport`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(user_agent: &str) -> Result<Self, ApiError> {
        let client = Client::builder().user_agent(user_agent).build()?;

        Ok(HttpTransport { client })
    }

    /// Use an existing `reqwest` client (e.g. one with custom timeouts).
    pub fn with_client(client: Client) -> Self { HttpTransport { client } }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> reqwest::Method {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<RawResponse, ApiError> {
        let ApiRequest {
            method,
            url,
            token,
            body,
        } = request;

        let mut builder = self.client.request(method.into(), url);

        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = body {
            builder = builder.json(&body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        log::trace!("Headers: {:#?}", response.headers());

        let body = response.bytes().await?;

        Ok(RawResponse::new(status, body.to_vec()))
    }
}
