use crate::{
    gateway::{Gateway, Method, NO_QUERY},
    ApiError, User,
};
use serde_derive::{Deserialize, Serialize};
use std::fmt::{self, Debug, Formatter};

/// Exchange an email and password for a bearer token.
pub async fn login(
    gateway: &Gateway,
    email: &str,
    password: &str,
) -> Result<LoginReply, ApiError> {
    let data = LoginData { email, password };

    let reply = gateway
        .execute(
            Method::Post,
            "/auth/login",
            NO_QUERY,
            Some(super::to_body(&data)?),
            None,
        )
        .await?;

    let reply: LoginReply = super::expect_data(reply)?;
    log::info!("Logged in as {}", reply.user.email);

    Ok(reply)
}

/// Create a new account.
///
/// This doesn't log the new user in, you'll need to call [`login()`]
/// afterwards.
pub async fn register(
    gateway: &Gateway,
    email: &str,
    password: &str,
    first_name: Option<&str>,
    last_name: Option<&str>,
) -> Result<User, ApiError> {
    let data = RegisterData {
        email,
        password,
        first_name,
        last_name,
    };

    let reply = gateway
        .execute(
            Method::Post,
            "/auth/register",
            NO_QUERY,
            Some(super::to_body(&data)?),
            None,
        )
        .await?;

    let user: User = super::expect_data(reply)?;
    log::info!("Registered {}", user.email);

    Ok(user)
}

/// What the backend hands back after a successful login.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginReply {
    pub token: String,
    pub user: User,
}

impl Debug for LoginReply {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginReply")
            .field("token", &"<redacted>")
            .field("user", &self.user)
            .finish()
    }
}

#[derive(Copy, Clone, Serialize)]
struct LoginData<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Copy, Clone, Serialize)]
struct RegisterData<'a> {
    email: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    first_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_name: Option<&'a str>,
}
