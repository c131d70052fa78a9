//! Owning the bearer token and the user it belongs to.

mod store;

pub use store::{
    FileStore, MemoryStore, SecretStore, SecretStoreError, StoredCredentials,
};

use crate::{endpoints, gateway::Gateway, ApiError, User};
use std::{
    fmt::{self, Debug, Formatter},
    sync::Arc,
};
use tokio::{
    sync::{watch, Mutex},
    task::JoinHandle,
};

/// An authenticated client.
#[derive(Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub user: User,
    /// `false` while a restored session hasn't been confirmed by the server.
    pub validated: bool,
}

impl Debug for Session {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("user", &self.user)
            .field("validated", &self.validated)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// We haven't looked in the secret store yet.
    Unknown,
    Unauthenticated,
    Authenticated(Session),
}

impl SessionState {
    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionState::Authenticated(session) => Some(session),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool { self.session().is_some() }

    pub fn token(&self) -> Option<&str> {
        self.session().map(|s| s.token.as_str())
    }

    pub fn user(&self) -> Option<&User> { self.session().map(|s| &s.user) }
}

/// The single owner of the session.
///
/// Every change to the session (login, logout, the background check after a
/// restore) happens while holding one lock, and the persisted credentials are
/// always updated before the new state is published. Each change bumps an
/// epoch counter so a slow validation can tell it has been overtaken.
pub struct SessionManager {
    gateway: Gateway,
    store: Arc<dyn SecretStore>,
    state: watch::Sender<SessionState>,
    epoch: Mutex<u64>,
}

impl SessionManager {
    pub fn new<S>(gateway: Gateway, store: S) -> Self
    where
        S: SecretStore + 'static,
    {
        SessionManager::with_shared_store(gateway, Arc::new(store))
    }

    pub fn with_shared_store(
        gateway: Gateway,
        store: Arc<dyn SecretStore>,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::Unknown);

        SessionManager {
            gateway,
            store,
            state,
            epoch: Mutex::new(0),
        }
    }

    /// A snapshot of the current state.
    pub fn state(&self) -> SessionState { self.state.borrow().clone() }

    /// Get notified whenever the session changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// The current bearer token, or [`ApiError::Unauthorized`] if nobody is
    /// logged in.
    pub fn token(&self) -> Result<String, ApiError> {
        self.state
            .borrow()
            .token()
            .map(String::from)
            .ok_or(ApiError::Unauthorized)
    }

    /// Pick up where the last run left off.
    ///
    /// A stored session is trusted straight away, but only provisionally. The
    /// returned [`Validation`] tracks a background request which confirms the
    /// token is still good and logs out if it isn't.
    pub async fn restore(self: &Arc<Self>) -> Result<Validation, ApiError> {
        let mut epoch = self.epoch.lock().await;

        let stored = match self.store.load().await {
            Ok(stored) => stored,
            Err(e) => {
                log::error!("Unable to read the stored session: {}", e);
                self.teardown(&mut epoch).await;
                return Err(ApiError::from(e));
            },
        };

        let credentials = match stored {
            Some(credentials) => credentials,
            None => {
                log::debug!("No stored session");
                // make sure nothing half-written survives
                self.teardown(&mut epoch).await;
                return Ok(Validation::done(self));
            },
        };

        *epoch += 1;
        let started = *epoch;
        let token = credentials.token.clone();
        log::info!("Restored the session for {}", credentials.user.email);
        self.state.send_replace(SessionState::Authenticated(Session {
            token: credentials.token,
            user: credentials.user,
            validated: false,
        }));

        let manager = Arc::clone(self);
        let handle = tokio::spawn(async move {
            manager.revalidate(token, started).await
        });

        Ok(Validation {
            manager: Arc::clone(self),
            handle: Some(handle),
        })
    }

    async fn revalidate(&self, token: String, started: u64) -> SessionState {
        let result = endpoints::current_user(&self.gateway, &token).await;
        let mut epoch = self.epoch.lock().await;

        if *epoch != started {
            log::debug!("The session changed while it was being validated");
            return self.state();
        }

        match result {
            Ok(user) => {
                let credentials = StoredCredentials { token, user };
                if let Err(e) = self.store.save(&credentials).await {
                    log::warn!("Unable to refresh the stored user: {}", e);
                }

                self.state.send_replace(SessionState::Authenticated(Session {
                    token: credentials.token,
                    user: credentials.user,
                    validated: true,
                }));
            },
            Err(ApiError::Unauthorized) | Err(ApiError::DecodingError(_)) => {
                log::info!("The stored session is no longer valid");
                self.teardown(&mut epoch).await;
            },
            Err(e) => {
                log::warn!("Unable to validate the stored session: {}", e);
            },
        }

        self.state()
    }

    /// Log in, replacing any existing session.
    ///
    /// On failure nothing about the current session changes.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, ApiError> {
        check_credentials(email, password)?;

        let mut epoch = self.epoch.lock().await;
        let reply = endpoints::login(&self.gateway, email, password).await?;

        let credentials = StoredCredentials {
            token: reply.token,
            user: reply.user,
        };
        self.store.save(&credentials).await?;

        *epoch += 1;
        let session = Session {
            token: credentials.token,
            user: credentials.user,
            validated: true,
        };
        self.state
            .send_replace(SessionState::Authenticated(session.clone()));

        Ok(session)
    }

    /// Create an account and log into it.
    ///
    /// The backend doesn't authenticate on registration, so this is followed
    /// by a normal [`SessionManager::login()`]. If that second step fails the
    /// error is returned as-is, even though the account now exists.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> Result<Session, ApiError> {
        check_credentials(email, password)?;

        let first_name = first_name.filter(|n| !n.trim().is_empty());
        let last_name = last_name.filter(|n| !n.trim().is_empty());
        endpoints::register(
            &self.gateway,
            email,
            password,
            first_name,
            last_name,
        )
        .await?;

        self.login(email, password).await.map_err(|e| {
            log::error!(
                "Registered {} but couldn't log in afterwards: {}",
                email,
                e
            );
            e
        })
    }

    /// Forget the session. This never fails.
    pub async fn logout(&self) {
        let mut epoch = self.epoch.lock().await;
        self.teardown(&mut epoch).await;
    }

    /// Route a result through the session, logging out if the server said
    /// `token` is no longer valid.
    pub async fn guard<T>(
        &self,
        token: &str,
        result: Result<T, ApiError>,
    ) -> Result<T, ApiError> {
        if let Err(ApiError::Unauthorized) = result {
            let mut epoch = self.epoch.lock().await;

            if self.state.borrow().token() == Some(token) {
                log::info!("The server rejected our token, logging out");
                self.teardown(&mut epoch).await;
            }
        }

        result
    }

    /// Change the current user's name.
    pub async fn update_profile(
        &self,
        first_name: &str,
        last_name: &str,
    ) -> Result<User, ApiError> {
        let token = self.token()?;
        let result = endpoints::update_current_user(
            &self.gateway,
            &token,
            first_name,
            last_name,
        )
        .await;
        let user = self.guard(&token, result).await?;

        let mut epoch = self.epoch.lock().await;
        let current = self.state();

        if let Some(session) = current.session().filter(|s| s.token == token) {
            let credentials = StoredCredentials {
                token: token.clone(),
                user: user.clone(),
            };
            self.store.save(&credentials).await?;

            *epoch += 1;
            self.state.send_replace(SessionState::Authenticated(Session {
                user: user.clone(),
                ..session.clone()
            }));
        }

        Ok(user)
    }

    async fn teardown(&self, epoch: &mut u64) {
        if let Err(e) = self.store.clear().await {
            log::warn!("Unable to clear the stored session: {}", e);
        }

        *epoch += 1;
        if self.state.borrow().is_authenticated() {
            log::info!("Logged out");
        }
        self.state.send_replace(SessionState::Unauthenticated);
    }
}

impl Debug for SessionManager {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("gateway", &self.gateway)
            .field("state", &*self.state.borrow())
            .finish()
    }
}

fn check_credentials(email: &str, password: &str) -> Result<(), ApiError> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(ApiError::invalid_input(
            "Please enter email and password",
        ));
    }

    Ok(())
}

/// The background check kicked off by [`SessionManager::restore()`].
pub struct Validation {
    manager: Arc<SessionManager>,
    handle: Option<JoinHandle<SessionState>>,
}

impl Validation {
    fn done(manager: &Arc<SessionManager>) -> Self {
        Validation {
            manager: Arc::clone(manager),
            handle: None,
        }
    }

    /// Is there still a request in flight?
    pub fn is_pending(&self) -> bool {
        self.handle.as_ref().map_or(false, |h| !h.is_finished())
    }

    /// Wait for the check to complete and return the resulting state.
    pub async fn finished(self) -> SessionState {
        match self.handle {
            Some(handle) => match handle.await {
                Ok(state) => state,
                Err(e) => {
                    log::error!("Session validation panicked: {}", e);
                    self.manager.state()
                },
            },
            None => self.manager.state(),
        }
    }
}

impl Debug for Validation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validation")
            .field("pending", &self.is_pending())
            .finish()
    }
}
