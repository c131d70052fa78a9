use crate::{
    gateway::{Gateway, Method, Reply, NO_QUERY},
    ApiError, Id, Trip, TripQuery, TripWriteRequest,
};
use serde_derive::Deserialize;

/// One page of the user's trips.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TripPage {
    #[serde(default)]
    pub trips: Option<Vec<Trip>>,
    pub total: Option<u64>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

pub async fn list_trips(
    gateway: &Gateway,
    token: &str,
    query: &TripQuery,
) -> Result<TripPage, ApiError> {
    let reply = gateway
        .execute(Method::Get, "/trips", &query.to_pairs(), None, Some(token))
        .await?;

    super::expect_data(reply)
}

pub async fn get_trip(
    gateway: &Gateway,
    token: &str,
    id: Id,
) -> Result<Trip, ApiError> {
    let path = format!("/trips/{}", id);
    let reply = gateway
        .execute(Method::Get, &path, NO_QUERY, None, Some(token))
        .await?;

    super::expect_data(reply)
}

pub async fn create_trip(
    gateway: &Gateway,
    token: &str,
    request: &TripWriteRequest,
) -> Result<Trip, ApiError> {
    log::trace!("Payload: {:#?}", request);

    let reply = gateway
        .execute(
            Method::Post,
            "/trips",
            NO_QUERY,
            Some(super::to_body(request)?),
            Some(token),
        )
        .await?;

    super::expect_data(reply)
}

/// Replace every field of an existing trip.
pub async fn update_trip(
    gateway: &Gateway,
    token: &str,
    id: Id,
    request: &TripWriteRequest,
) -> Result<Trip, ApiError> {
    log::trace!("Payload: {:#?}", request);

    let path = format!("/trips/{}", id);
    let reply = gateway
        .execute(
            Method::Put,
            &path,
            NO_QUERY,
            Some(super::to_body(request)?),
            Some(token),
        )
        .await?;

    super::expect_data(reply)
}

pub async fn delete_trip(
    gateway: &Gateway,
    token: &str,
    id: Id,
) -> Result<(), ApiError> {
    let path = format!("/trips/{}", id);
    let reply = gateway
        .execute(Method::Delete, &path, NO_QUERY, None, Some(token))
        .await?;

    if let Reply::Data(data) = reply {
        log::debug!("Unexpected body when deleting trip {}: {}", id, data);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{trip_json, FakeTransport};
    use serde_json::json;

    #[tokio::test]
    async fn list_sends_paging_parameters() {
        let transport = FakeTransport::default();
        transport.respond_json(
            Method::Get,
            "/trips",
            200,
            json!({"data": {
                "trips": [trip_json(1, "Elk River", Some(3.5))],
                "total": 1,
                "limit": 50,
                "offset": 0,
            }}),
        );
        let query = TripQuery {
            limit: Some(50),
            sort_order: Some(String::from("desc")),
            ..TripQuery::default()
        };

        let got = list_trips(&transport.gateway(), "token", &query)
            .await
            .unwrap();

        assert_eq!(got.trips.map(|t| t.len()), Some(1));
        assert_eq!(got.total, Some(1));
        assert_eq!(
            transport.requests()[0].url.query(),
            Some("limit=50&sort_order=desc")
        );
    }

    #[tokio::test]
    async fn an_empty_list_may_omit_trips() {
        let transport = FakeTransport::default();
        transport.respond_json(
            Method::Get,
            "/trips",
            200,
            json!({"data": {"trips": null, "total": 0}}),
        );

        let got =
            list_trips(&transport.gateway(), "token", &TripQuery::default())
                .await
                .unwrap();

        assert_eq!(got.trips, None);
    }

    #[tokio::test]
    async fn delete_accepts_no_content() {
        let transport = FakeTransport::default();
        transport.respond(
            Method::Delete,
            "/trips/4",
            crate::gateway::RawResponse::new(204, ""),
        );

        delete_trip(&transport.gateway(), "token", Id::new(4))
            .await
            .unwrap();
    }
}
