use crate::{
    gateway::{Gateway, Method, NO_QUERY},
    ApiError, User,
};
use serde_derive::Serialize;

/// Fetch the profile belonging to `token`.
pub async fn current_user(
    gateway: &Gateway,
    token: &str,
) -> Result<User, ApiError> {
    let reply = gateway
        .execute(Method::Get, "/users/me", NO_QUERY, None, Some(token))
        .await?;

    super::expect_data(reply)
}

/// Change the current user's name.
pub async fn update_current_user(
    gateway: &Gateway,
    token: &str,
    first_name: &str,
    last_name: &str,
) -> Result<User, ApiError> {
    let data = UpdateUserData {
        first_name,
        last_name,
    };
    log::trace!("Payload: {:#?}", data);

    let reply = gateway
        .execute(
            Method::Put,
            "/users/me",
            NO_QUERY,
            Some(super::to_body(&data)?),
            Some(token),
        )
        .await?;

    super::expect_data(reply)
}

#[derive(Debug, Copy, Clone, Serialize)]
struct UpdateUserData<'a> {
    first_name: &'a str,
    last_name: &'a str,
}
