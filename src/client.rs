use crate::{
    gateway::Gateway, ApiError, Config, SecretStore, SectionCatalogClient,
    SessionManager, TripFormReconciler, TripRepository,
};
use std::sync::Arc;

/// Everything needed to talk to a riverlog backend, wired together.
#[derive(Debug)]
pub struct RiverLog {
    config: Config,
    session: Arc<SessionManager>,
    trips: Arc<TripRepository>,
    catalog: Arc<SectionCatalogClient>,
    forms: TripFormReconciler,
}

impl RiverLog {
    /// Connect to the backend described by `config` over HTTP.
    pub fn new<S>(config: Config, store: S) -> Result<Self, ApiError>
    where
        S: SecretStore + 'static,
    {
        let gateway = Gateway::from_config(&config)?;
        Ok(RiverLog::with_gateway(config, gateway, Arc::new(store)))
    }

    pub fn with_gateway(
        config: Config,
        gateway: Gateway,
        store: Arc<dyn SecretStore>,
    ) -> Self {
        log::debug!("Using the backend at {}", gateway.base_url());

        let session =
            Arc::new(SessionManager::with_shared_store(gateway.clone(), store));
        let trips = Arc::new(TripRepository::new(
            gateway.clone(),
            Arc::clone(&session),
        ));
        let catalog = Arc::new(SectionCatalogClient::new(
            gateway,
            Arc::clone(&session),
            config.search_debounce,
        ));
        let forms = TripFormReconciler::new(
            config.schema,
            Arc::clone(&catalog),
            Arc::clone(&trips),
        );

        RiverLog {
            config,
            session,
            trips,
            catalog,
            forms,
        }
    }

    pub fn config(&self) -> &Config { &self.config }

    pub fn session(&self) -> &Arc<SessionManager> { &self.session }

    pub fn trips(&self) -> &TripRepository { &self.trips }

    pub fn catalog(&self) -> &SectionCatalogClient { &self.catalog }

    pub fn forms(&self) -> &TripFormReconciler { &self.forms }

    /// Log out and drop everything cached for the previous user.
    pub async fn logout(&self) {
        self.session.logout().await;
        self.catalog.cancel();
        self.trips.forget().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        gateway::Method,
        testing::{login_json, trip_json, FakeTransport},
        MemoryStore, SessionState, TripQuery,
    };
    use serde_json::json;

    #[tokio::test]
    async fn logging_out_forgets_cached_trips() {
        let transport = FakeTransport::default();
        let store = Arc::new(MemoryStore::new());
        let client = RiverLog::with_gateway(
            Config::default(),
            transport.gateway(),
            store.clone(),
        );
        transport.respond_json(
            Method::Post,
            "/auth/login",
            200,
            login_json("token", "paddler@example.com"),
        );
        transport.respond_json(
            Method::Get,
            "/trips",
            200,
            json!({"data": {"trips": [trip_json(1, "Elk River", Some(4.0))]}}),
        );

        client
            .session()
            .login("paddler@example.com", "hunter2")
            .await
            .unwrap();
        client.trips().list(&TripQuery::default()).await.unwrap();
        assert_eq!(client.trips().cached().await.len(), 1);

        client.logout().await;

        assert_eq!(client.session().state(), SessionState::Unauthenticated);
        assert!(client.trips().cached().await.is_empty());
        assert_eq!(store.load().await.unwrap(), None);
    }
}
