//! The RiverLog API's endpoints.
//!
//! Each function maps onto exactly one backend route and does nothing but
//! shape the request and decode the response. Session bookkeeping lives in
//! [`SessionManager`](crate::SessionManager).

mod auth;
mod catalog;
mod trips;
mod users;

pub use auth::{login, register, LoginReply};
pub use catalog::{
    list_rivers, list_sections, RiverPage, SectionPage, SectionQuery,
};
pub use trips::{
    create_trip, delete_trip, get_trip, list_trips, update_trip, TripPage,
};
pub use users::{current_user, update_current_user};

use crate::{gateway::Reply, ApiError};
use serde::Serialize;
use serde_json::Value;

fn to_body<D: Serialize>(data: &D) -> Result<Value, ApiError> {
    serde_json::to_value(data).map_err(|e| {
        ApiError::InvalidInput(format!(
            "Unable to serialize the request: {}",
            e
        ))
    })
}

/// Most endpoints must answer with a payload; `204` is a protocol violation.
fn expect_data<T: serde::de::DeserializeOwned>(
    reply: Reply,
) -> Result<T, ApiError> {
    match reply {
        Reply::Data(_) => reply.into_data(),
        Reply::NoContent => Err(ApiError::DecodingError(
            serde::de::Error::custom("expected a response body"),
        )),
    }
}
