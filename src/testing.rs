//! Helpers shared by the test suites.

use crate::{
    gateway::{ApiRequest, Gateway, Method, RawResponse, Transport},
    ApiError,
};
use serde_json::{json, Value};
use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
    time::Duration,
};
use url::Url;

struct Scripted {
    delay: Duration,
    response: RawResponse,
}

/// A [`Transport`] which replays canned responses, keyed by method and path.
#[derive(Clone, Default)]
pub(crate) struct FakeTransport {
    routes: Arc<Mutex<HashMap<(Method, String), VecDeque<Scripted>>>>,
    requests: Arc<Mutex<Vec<ApiRequest>>>,
}

impl FakeTransport {
    pub(crate) fn respond(
        &self,
        method: Method,
        path: &str,
        response: RawResponse,
    ) {
        self.respond_after(method, path, Duration::from_millis(0), response);
    }

    pub(crate) fn respond_after(
        &self,
        method: Method,
        path: &str,
        delay: Duration,
        response: RawResponse,
    ) {
        self.routes
            .lock()
            .unwrap()
            .entry((method, path.to_string()))
            .or_default()
            .push_back(Scripted { delay, response });
    }

    pub(crate) fn respond_json(
        &self,
        method: Method,
        path: &str,
        status: u16,
        body: Value,
    ) {
        self.respond(method, path, RawResponse::new(status, body.to_string()));
    }

    pub(crate) fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn gateway(&self) -> Gateway {
        Gateway::new(
            Url::parse("http://riverlog.test/api/v1").unwrap(),
            self.clone(),
        )
    }
}

#[async_trait::async_trait]
impl Transport for FakeTransport {
    async fn send(&self, request: ApiRequest) -> Result<RawResponse, ApiError> {
        let path = request
            .url
            .path()
            .trim_start_matches("/api/v1")
            .to_string();
        let scripted = self
            .routes
            .lock()
            .unwrap()
            .get_mut(&(request.method, path))
            .and_then(|queue| queue.pop_front());
        self.requests.lock().unwrap().push(request);

        match scripted {
            Some(Scripted { delay, response }) => {
                tokio::time::sleep(delay).await;
                Ok(response)
            },
            None => Err(ApiError::NetworkError(Box::new(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            )))),
        }
    }
}

pub(crate) fn user_json(id: i64, email: &str) -> Value {
    json!({
        "id": id,
        "email": email,
        "first_name": "Ada",
        "last_name": "Lovelace",
        "created_at": "2024-05-01T12:00:00Z",
        "updated_at": "2024-05-01T12:00:00Z",
    })
}

pub(crate) fn login_json(token: &str, email: &str) -> Value {
    json!({ "data": { "token": token, "user": user_json(1, email) } })
}

pub(crate) fn trip_json(id: i64, river: &str, mileage: Option<f64>) -> Value {
    json!({
        "id": id,
        "user_id": 1,
        "river_name": river,
        "section_name": "Main",
        "trip_date": "2024-06-01",
        "mileage": mileage,
        "created_at": "2024-06-01T12:00:00Z",
        "updated_at": "2024-06-01T12:00:00Z",
    })
}

pub(crate) fn section_json(id: i64, river: &str, name: &str) -> Value {
    json!({
        "id": id,
        "river_id": id * 10,
        "river_name": river,
        "state": "WV",
        "name": name,
        "class_rating": "IIItoIV",
        "mileage": 5.5,
    })
}
