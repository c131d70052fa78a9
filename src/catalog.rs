use crate::{
    endpoints::{self, SectionQuery},
    gateway::Gateway,
    ApiError, Id, River, Section, SessionManager,
};
use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::sync::{watch, Mutex};

/// How many sections to ask for at a time when fetching the whole catalog.
const CATALOG_PAGE_SIZE: u32 = 50;

/// Where a set of search results came from.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ResultOrigin {
    /// Filtered locally from a previously fetched catalog, while we wait for
    /// the server.
    Local,
    Remote,
}

/// The most recently published search results.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResults {
    /// The sequence number of the search which produced these results.
    pub seq: u64,
    pub query: String,
    pub sections: Vec<Section>,
    pub origin: ResultOrigin,
}

impl Default for SearchResults {
    fn default() -> Self {
        SearchResults {
            seq: 0,
            query: String::new(),
            sections: Vec::new(),
            origin: ResultOrigin::Remote,
        }
    }
}

/// Searching the river section catalog.
///
/// Searches are debounced and ordered by when they were issued, not by when
/// their responses arrive. Only the newest search may publish results, so a
/// slow response can never replace the results of a later one.
#[derive(Debug)]
pub struct SectionCatalogClient {
    gateway: Gateway,
    session: Arc<SessionManager>,
    debounce: Duration,
    issued: AtomicU64,
    results: watch::Sender<SearchResults>,
    everything: Mutex<Option<Vec<Section>>>,
}

impl SectionCatalogClient {
    pub fn new(
        gateway: Gateway,
        session: Arc<SessionManager>,
        debounce: Duration,
    ) -> Self {
        let (results, _) = watch::channel(SearchResults::default());

        SectionCatalogClient {
            gateway,
            session,
            debounce,
            issued: AtomicU64::new(0),
            results,
            everything: Mutex::new(None),
        }
    }

    /// Get notified whenever new search results are published.
    pub fn subscribe(&self) -> watch::Receiver<SearchResults> {
        self.results.subscribe()
    }

    pub fn results(&self) -> SearchResults { self.results.borrow().clone() }

    /// Search the catalog for `query`.
    ///
    /// Returns `Ok(None)` when a newer search (or [`cancel()`]) superseded
    /// this one, either before it reached the network or while it was in
    /// flight.
    ///
    /// [`cancel()`]: SectionCatalogClient::cancel
    pub async fn search(
        &self,
        query: &str,
    ) -> Result<Option<Vec<Section>>, ApiError> {
        let seq = self.issued.fetch_add(1, Ordering::SeqCst) + 1;

        if let Some(everything) = self.everything.lock().await.as_ref() {
            let local: Vec<Section> = everything
                .iter()
                .filter(|s| s.matches(query))
                .cloned()
                .collect();
            self.publish(seq, query, local, ResultOrigin::Local);
        }

        tokio::time::sleep(self.debounce).await;
        if !self.is_latest(seq) {
            log::trace!("Search #{} for {:?} was debounced", seq, query);
            return Ok(None);
        }

        let token = self.session.token()?;
        log::debug!("Searching the catalog for {:?} (#{})", query, seq);
        let result = endpoints::list_sections(
            &self.gateway,
            &token,
            &SectionQuery::search(query),
        )
        .await;
        let result = self.session.guard(&token, result).await;

        if !self.is_latest(seq) {
            log::debug!("Discarding stale results for search #{}", seq);
            return Ok(None);
        }

        let sections = result?.sections.unwrap_or_default();

        if self.publish(seq, query, sections.clone(), ResultOrigin::Remote) {
            Ok(Some(sections))
        } else {
            Ok(None)
        }
    }

    /// Discard the results of any search which is still in flight.
    pub fn cancel(&self) { self.issued.fetch_add(1, Ordering::SeqCst); }

    /// Fetch the whole catalog, remembering it for local filtering and
    /// [`SectionCatalogClient::find()`].
    ///
    /// The backend pages its results, so this keeps asking for the next page
    /// until it has `total` sections or runs out.
    pub async fn fetch_all(&self) -> Result<Vec<Section>, ApiError> {
        let token = self.session.token()?;
        let mut sections: Vec<Section> = Vec::new();

        loop {
            let query = SectionQuery {
                limit: Some(CATALOG_PAGE_SIZE),
                offset: Some(sections.len() as u32),
                ..SectionQuery::default()
            };
            let result =
                endpoints::list_sections(&self.gateway, &token, &query).await;
            let page = self.session.guard(&token, result).await?;

            let batch = page.sections.unwrap_or_default();
            let received = batch.len();
            sections.extend(batch);

            let complete = match page.total {
                Some(total) => sections.len() as u64 >= total,
                None => received < CATALOG_PAGE_SIZE as usize,
            };
            if complete || received == 0 {
                break;
            }
        }

        log::debug!("Fetched {} sections", sections.len());
        *self.everything.lock().await = Some(sections.clone());

        Ok(sections)
    }

    /// Look a section up by id, fetching the catalog if we haven't yet.
    pub async fn find(&self, id: Id) -> Result<Option<Section>, ApiError> {
        let cached = self.everything.lock().await.clone();
        let sections = match cached {
            Some(sections) => sections,
            None => self.fetch_all().await?,
        };

        Ok(sections.into_iter().find(|s| s.id == id))
    }

    pub async fn rivers(&self, search: &str) -> Result<Vec<River>, ApiError> {
        let token = self.session.token()?;
        let query = if search.trim().is_empty() {
            SectionQuery::default()
        } else {
            SectionQuery::search(search)
        };
        let result =
            endpoints::list_rivers(&self.gateway, &token, &query).await;
        let page = self.session.guard(&token, result).await?;

        Ok(page.rivers.unwrap_or_default())
    }

    fn is_latest(&self, seq: u64) -> bool {
        self.issued.load(Ordering::SeqCst) == seq
    }

    /// Publish results, unless something newer has already been published.
    fn publish(
        &self,
        seq: u64,
        query: &str,
        sections: Vec<Section>,
        origin: ResultOrigin,
    ) -> bool {
        if !self.is_latest(seq) {
            return false;
        }

        self.results.send_if_modified(|current| {
            if current.seq > seq {
                return false;
            }

            *current = SearchResults {
                seq,
                query: query.to_string(),
                sections,
                origin,
            };
            true
        });

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        gateway::{Method, RawResponse},
        session::{MemoryStore, StoredCredentials},
        testing::{section_json, user_json, FakeTransport},
        SessionState,
    };
    use serde_json::json;

    async fn catalog(
        transport: &FakeTransport,
        debounce: Duration,
    ) -> Arc<SectionCatalogClient> {
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

        Arc::new(SectionCatalogClient::new(
            transport.gateway(),
            session,
            debounce,
        ))
    }

    fn sections(items: &[(i64, &str, &str)]) -> RawResponse {
        let sections: Vec<_> = items
            .iter()
            .map(|&(id, river, name)| section_json(id, river, name))
            .collect();
        let body = json!({
            "data": {"sections": sections, "total": items.len()},
        });

        RawResponse::new(200, body.to_string())
    }

    fn ids(sections: &[Section]) -> Vec<i64> {
        sections.iter().map(|s| s.id.get()).collect()
    }

    #[tokio::test]
    async fn slow_early_responses_are_discarded() {
        let transport = FakeTransport::default();
        let catalog = catalog(&transport, Duration::from_millis(10)).await;
        transport.respond_after(
            Method::Get,
            "/sections",
            Duration::from_millis(200),
            sections(&[(1, "Elk River", "Old Results")]),
        );
        transport.respond_after(
            Method::Get,
            "/sections",
            Duration::from_millis(10),
            sections(&[(2, "Elk River", "Upper Gorge")]),
        );

        let first = {
            let catalog = Arc::clone(&catalog);
            tokio::spawn(async move { catalog.search("elk").await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        let second = catalog.search("elk").await.unwrap();
        let first = first.await.unwrap().unwrap();

        assert_eq!(first, None);
        assert_eq!(second.as_deref().map(ids), Some(vec![2]));
        assert_eq!(ids(&catalog.results().sections), vec![2]);
        assert_eq!(
            transport
                .requests()
                .iter()
                .filter(|r| r.url.path().ends_with("/sections"))
                .count(),
            2
        );
    }

    #[tokio::test]
    async fn rapid_searches_are_debounced() {
        let transport = FakeTransport::default();
        let catalog = catalog(&transport, Duration::from_millis(100)).await;
        transport.respond(
            Method::Get,
            "/sections",
            sections(&[(3, "Gauley River", "Upper")]),
        );

        let mut pending = Vec::new();
        for query in &["g", "ga", "gau"] {
            let catalog = Arc::clone(&catalog);
            let query = query.to_string();
            pending.push(tokio::spawn(
                async move { catalog.search(&query).await },
            ));
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let mut got = Vec::new();
        for handle in pending {
            got.push(handle.await.unwrap().unwrap());
        }

        assert_eq!(got[0], None);
        assert_eq!(got[1], None);
        assert_eq!(got[2].as_deref().map(ids), Some(vec![3]));
        let searches: Vec<_> = transport
            .requests()
            .into_iter()
            .filter(|r| r.url.path().ends_with("/sections"))
            .collect();
        assert_eq!(searches.len(), 1);
        assert_eq!(searches[0].url.query(), Some("search=gau"));
        assert_eq!(catalog.results().query, "gau");
    }

    #[tokio::test]
    async fn filter_locally_while_waiting_for_the_server() {
        let transport = FakeTransport::default();
        let catalog = catalog(&transport, Duration::from_millis(50)).await;
        transport.respond(
            Method::Get,
            "/sections",
            sections(&[
                (1, "Elk River", "Upper Gorge"),
                (2, "Gauley River", "Upper"),
                (3, "New River", "Lower Gorge"),
            ]),
        );
        catalog.fetch_all().await.unwrap();
        transport.respond(
            Method::Get,
            "/sections",
            sections(&[(3, "New River", "Lower Gorge")]),
        );
        let mut updates = catalog.subscribe();

        let search = {
            let catalog = Arc::clone(&catalog);
            tokio::spawn(async move { catalog.search("GORGE").await })
        };

        updates.changed().await.unwrap();
        let local = updates.borrow_and_update().clone();
        assert_eq!(local.origin, ResultOrigin::Local);
        assert_eq!(ids(&local.sections), vec![1, 3]);

        search.await.unwrap().unwrap();
        let remote = catalog.results();
        assert_eq!(remote.origin, ResultOrigin::Remote);
        assert_eq!(ids(&remote.sections), vec![3]);
    }

    #[tokio::test]
    async fn cancelled_searches_are_dropped() {
        let transport = FakeTransport::default();
        let catalog = catalog(&transport, Duration::from_millis(0)).await;
        transport.respond_after(
            Method::Get,
            "/sections",
            Duration::from_millis(50),
            sections(&[(1, "Elk River", "Upper Gorge")]),
        );

        let search = {
            let catalog = Arc::clone(&catalog);
            tokio::spawn(async move { catalog.search("elk").await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        catalog.cancel();

        assert_eq!(search.await.unwrap().unwrap(), None);
        assert!(catalog.results().sections.is_empty());
    }

    #[tokio::test]
    async fn cancelled_searches_still_end_a_rejected_session() {
        let transport = FakeTransport::default();
        let catalog = catalog(&transport, Duration::from_millis(0)).await;
        transport.respond_after(
            Method::Get,
            "/sections",
            Duration::from_millis(50),
            RawResponse::new(401, r#"{"error": "Invalid or expired token"}"#),
        );

        let search = {
            let catalog = Arc::clone(&catalog);
            tokio::spawn(async move { catalog.search("elk").await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        catalog.cancel();

        assert_eq!(search.await.unwrap().unwrap(), None);
        assert_eq!(catalog.session.state(), SessionState::Unauthenticated);
    }

    #[tokio::test]
    async fn fetch_every_page_of_the_catalog() {
        let transport = FakeTransport::default();
        let catalog = catalog(&transport, Duration::from_millis(0)).await;
        let page = |ids: std::ops::RangeInclusive<i64>| {
            let sections: Vec<_> = ids
                .map(|id| section_json(id, "Elk River", "Somewhere"))
                .collect();
            json!({"data": {"sections": sections, "total": 60}})
        };
        transport.respond_json(Method::Get, "/sections", 200, page(1..=50));
        transport.respond_json(Method::Get, "/sections", 200, page(51..=60));

        let everything = catalog.fetch_all().await.unwrap();
        let found = catalog.find(Id::new(55)).await.unwrap();

        assert_eq!(everything.len(), 60);
        assert_eq!(found.map(|s| s.id), Some(Id::new(55)));
        let offsets: Vec<_> = transport
            .requests()
            .iter()
            .filter(|r| r.url.path().ends_with("/sections"))
            .map(|r| r.url.query().map(String::from))
            .collect();
        assert_eq!(
            offsets,
            vec![
                Some(String::from("limit=50&offset=0")),
                Some(String::from("limit=50&offset=50")),
            ]
        );
    }

    #[tokio::test]
    async fn find_fetches_the_catalog_once() {
        let transport = FakeTransport::default();
        let catalog = catalog(&transport, Duration::from_millis(0)).await;
        transport.respond(
            Method::Get,
            "/sections",
            sections(&[
                (1, "Elk River", "Upper Gorge"),
                (2, "Gauley River", "Upper"),
            ]),
        );

        let found = catalog.find(Id::new(2)).await.unwrap();
        let missing = catalog.find(Id::new(9)).await.unwrap();

        assert_eq!(found.map(|s| s.name), Some(String::from("Upper")));
        assert_eq!(missing, None);
        assert_eq!(
            transport
                .requests()
                .iter()
                .filter(|r| r.url.path().ends_with("/sections"))
                .count(),
            1
        );
    }
}
