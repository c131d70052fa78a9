use crate::{
    endpoints, gateway::Gateway, ApiError, Id, SessionManager, Trip,
    TripQuery, TripStats, TripWriteRequest,
};
use std::sync::Arc;
use tokio::sync::Mutex;

const TRIP_PAGE_SIZE: u32 = 100;

/// CRUD over the current user's trips, plus an in-memory copy of the last
/// list that was fetched.
///
/// The cache is only ever changed after the server has confirmed a write.
#[derive(Debug)]
pub struct TripRepository {
    gateway: Gateway,
    session: Arc<SessionManager>,
    cache: Mutex<Option<Vec<Trip>>>,
}

impl TripRepository {
    pub fn new(gateway: Gateway, session: Arc<SessionManager>) -> Self {
        TripRepository {
            gateway,
            session,
            cache: Mutex::new(None),
        }
    }

    /// Fetch a page of trips and make it the new cache.
    ///
    /// Trips come back in whatever order the server chose; use
    /// [`TripOrder`](crate::TripOrder) to sort them.
    pub async fn list(&self, query: &TripQuery) -> Result<Vec<Trip>, ApiError> {
        let token = self.session.token()?;
        let result = endpoints::list_trips(&self.gateway, &token, query).await;
        let page = self.session.guard(&token, result).await?;

        let trips = page.trips.unwrap_or_default();
        log::debug!("Fetched {} trips", trips.len());
        *self.cache.lock().await = Some(trips.clone());

        Ok(trips)
    }

    /// Fetch every trip, a page at a time, and make them the new cache.
    pub async fn list_all(&self) -> Result<Vec<Trip>, ApiError> {
        let token = self.session.token()?;
        let mut trips: Vec<Trip> = Vec::new();

        loop {
            let query = TripQuery {
                limit: Some(TRIP_PAGE_SIZE),
                offset: Some(trips.len() as u32),
                ..TripQuery::default()
            };
            let result =
                endpoints::list_trips(&self.gateway, &token, &query).await;
            let page = self.session.guard(&token, result).await?;

            let batch = page.trips.unwrap_or_default();
            let received = batch.len();
            trips.extend(batch);

            let complete = match page.total {
                Some(total) => trips.len() as u64 >= total,
                None => received < TRIP_PAGE_SIZE as usize,
            };
            if complete || received == 0 {
                break;
            }
        }

        log::debug!("Fetched all {} trips", trips.len());
        *self.cache.lock().await = Some(trips.clone());

        Ok(trips)
    }

    /// Fetch a single trip. The cache is left alone.
    pub async fn get(&self, id: Id) -> Result<Trip, ApiError> {
        let token = self.session.token()?;
        let result = endpoints::get_trip(&self.gateway, &token, id).await;

        self.session.guard(&token, result).await
    }

    pub async fn create(
        &self,
        request: &TripWriteRequest,
    ) -> Result<Trip, ApiError> {
        request.validate()?;

        let token = self.session.token()?;
        let result =
            endpoints::create_trip(&self.gateway, &token, request).await;
        let trip = self.session.guard(&token, result).await?;

        log::info!("Logged trip {} on {}", trip.id, trip.trip_date);
        if let Some(trips) = self.cache.lock().await.as_mut() {
            trips.push(trip.clone());
        }

        Ok(trip)
    }

    /// Replace every field of an existing trip.
    pub async fn update(
        &self,
        id: Id,
        request: &TripWriteRequest,
    ) -> Result<Trip, ApiError> {
        request.validate()?;

        let token = self.session.token()?;
        let result =
            endpoints::update_trip(&self.gateway, &token, id, request).await;
        let trip = self.session.guard(&token, result).await?;

        if let Some(trips) = self.cache.lock().await.as_mut() {
            match trips.iter_mut().find(|t| t.id == id) {
                Some(existing) => *existing = trip.clone(),
                None => trips.push(trip.clone()),
            }
        }

        Ok(trip)
    }

    pub async fn delete(&self, id: Id) -> Result<(), ApiError> {
        let token = self.session.token()?;
        let result = endpoints::delete_trip(&self.gateway, &token, id).await;
        self.session.guard(&token, result).await?;

        log::info!("Deleted trip {}", id);
        if let Some(trips) = self.cache.lock().await.as_mut() {
            trips.retain(|t| t.id != id);
        }

        Ok(())
    }

    /// The trips from the most recent [`TripRepository::list()`], with any
    /// writes since then applied.
    pub async fn cached(&self) -> Vec<Trip> {
        self.cache.lock().await.clone().unwrap_or_default()
    }

    /// Totals over the cached trips.
    pub async fn stats(&self) -> TripStats {
        match self.cache.lock().await.as_deref() {
            Some(trips) => TripStats::from_trips(trips),
            None => TripStats::default(),
        }
    }

    /// Drop the cache, e.g. after logging out.
    pub async fn forget(&self) { *self.cache.lock().await = None; }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        gateway::{Method, RawResponse},
        session::{MemoryStore, StoredCredentials},
        testing::{trip_json, user_json, FakeTransport},
        SessionState, TripAddressing,
    };
    use chrono::NaiveDate;
    use serde_json::json;

    async fn logged_in(
        transport: &FakeTransport,
    ) -> (TripRepository, Arc<SessionManager>) {
        transport.respond_json(
            Method::Get,
            "/users/me",
            200,
            json!({"data": user_json(1, "paddler@example.com")}),
        );
        let store = MemoryStore::with_credentials(StoredCredentials {
            token: String::from("token"),
            user: serde_json::from_value(user_json(1, "paddler@example.com"))
                .unwrap(),
        });
        let session = Arc::new(SessionManager::new(transport.gateway(), store));
        session.restore().await.unwrap().finished().await;

        (
            TripRepository::new(transport.gateway(), Arc::clone(&session)),
            session,
        )
    }

    async fn with_cached_trips(transport: &FakeTransport) -> TripRepository {
        let (trips, _) = logged_in(transport).await;
        transport.respond_json(
            Method::Get,
            "/trips",
            200,
            json!({"data": {"trips": [
                trip_json(1, "Colorado River", Some(3.5)),
                trip_json(2, "Colorado River", None),
                trip_json(3, "Arkansas River", Some(10.0)),
            ]}}),
        );
        trips.list(&TripQuery::default()).await.unwrap();

        trips
    }

    fn request(river: &str) -> TripWriteRequest {
        TripWriteRequest::new(
            TripAddressing::FreeText {
                river_name: river.to_string(),
                section_name: String::from("Main"),
            },
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        )
    }

    #[tokio::test]
    async fn stats_are_computed_over_the_cache() {
        let transport = FakeTransport::default();
        let trips = with_cached_trips(&transport).await;

        let stats = trips.stats().await;

        assert_eq!(stats.total_mileage, 13.5);
        assert_eq!(stats.trip_count, 3);
        assert_eq!(stats.distinct_rivers, 2);
    }

    #[tokio::test]
    async fn list_all_follows_the_pages() {
        let transport = FakeTransport::default();
        let (trips, _) = logged_in(&transport).await;
        let page = |ids: std::ops::RangeInclusive<i64>| {
            let trips: Vec<_> =
                ids.map(|id| trip_json(id, "Elk River", Some(1.0))).collect();
            json!({"data": {"trips": trips, "total": 105}})
        };
        transport.respond_json(Method::Get, "/trips", 200, page(1..=100));
        transport.respond_json(Method::Get, "/trips", 200, page(101..=105));

        let got = trips.list_all().await.unwrap();

        assert_eq!(got.len(), 105);
        assert_eq!(trips.stats().await.trip_count, 105);
        assert_eq!(trips.stats().await.total_mileage, 105.0);
        let queries: Vec<_> = transport
            .requests()
            .iter()
            .filter(|r| r.url.path().ends_with("/trips"))
            .map(|r| r.url.query().map(String::from))
            .collect();
        assert_eq!(
            queries,
            vec![
                Some(String::from("limit=100&offset=0")),
                Some(String::from("limit=100&offset=100")),
            ]
        );
    }

    #[tokio::test]
    async fn failed_deletes_leave_the_cache_alone() {
        let transport = FakeTransport::default();
        let trips = with_cached_trips(&transport).await;
        transport.respond_json(
            Method::Delete,
            "/trips/2",
            500,
            json!({"error": "Error deleting trip"}),
        );

        let got = trips.delete(Id::new(2)).await;

        assert!(matches!(got, Err(ApiError::ServerError(_))));
        assert_eq!(trips.cached().await.len(), 3);
    }

    #[tokio::test]
    async fn successful_deletes_remove_exactly_one_trip() {
        let transport = FakeTransport::default();
        let trips = with_cached_trips(&transport).await;
        transport.respond(
            Method::Delete,
            "/trips/2",
            RawResponse::new(204, ""),
        );

        trips.delete(Id::new(2)).await.unwrap();

        let ids: Vec<i64> =
            trips.cached().await.iter().map(|t| t.id.get()).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[tokio::test]
    async fn invalid_trips_never_reach_the_server() {
        let transport = FakeTransport::default();
        let (trips, _) = logged_in(&transport).await;
        let before = transport.requests().len();

        let got = trips.create(&request("")).await;

        assert!(matches!(got, Err(ApiError::InvalidInput(_))));
        assert_eq!(transport.requests().len(), before);
    }

    #[tokio::test]
    async fn created_trips_are_appended_to_the_cache() {
        let transport = FakeTransport::default();
        let trips = with_cached_trips(&transport).await;
        transport.respond_json(
            Method::Post,
            "/trips",
            201,
            json!({"data": trip_json(4, "Gauley River", Some(12.0))}),
        );

        let trip = trips.create(&request("Gauley River")).await.unwrap();

        assert_eq!(trip.id, Id::new(4));
        assert_eq!(trips.cached().await.len(), 4);
        assert_eq!(trips.stats().await.distinct_rivers, 3);
    }

    #[tokio::test]
    async fn updates_replace_the_cached_trip() {
        let transport = FakeTransport::default();
        let trips = with_cached_trips(&transport).await;
        transport.respond_json(
            Method::Put,
            "/trips/2",
            200,
            json!({"data": trip_json(2, "Colorado River", Some(4.0))}),
        );

        trips.update(Id::new(2), &request("Colorado River")).await.unwrap();

        let cached = trips.cached().await;
        assert_eq!(cached.len(), 3);
        assert_eq!(cached[1].mileage, Some(4.0));
    }

    #[tokio::test]
    async fn unauthorized_responses_end_the_session() {
        let transport = FakeTransport::default();
        let (trips, session) = logged_in(&transport).await;
        transport.respond_json(
            Method::Get,
            "/trips/9",
            401,
            json!({"error": "Invalid or expired token"}),
        );

        let got = trips.get(Id::new(9)).await;

        assert!(matches!(got, Err(ApiError::Unauthorized)));
        assert_eq!(session.state(), SessionState::Unauthenticated);
    }

    #[tokio::test]
    async fn nothing_is_sent_without_a_session() {
        let transport = FakeTransport::default();
        let session = Arc::new(SessionManager::new(
            transport.gateway(),
            MemoryStore::new(),
        ));
        let trips = TripRepository::new(transport.gateway(), session);

        let got = trips.list(&TripQuery::default()).await;

        assert!(matches!(got, Err(ApiError::Unauthorized)));
        assert!(transport.requests().is_empty());
    }
}
