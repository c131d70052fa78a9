//! A client for the RiverLog whitewater trip logbook.
//!
//! The [`SessionManager`] owns the login, the [`TripRepository`] and
//! [`SectionCatalogClient`] talk to the backend on its behalf, and the
//! [`TripFormReconciler`] turns what someone typed into a trip the backend
//! will accept. [`RiverLog`] wires all of them together.

#![forbid(unsafe_code)]

#[cfg(test)]
#[macro_use]
extern crate pretty_assertions;

mod catalog;
mod client;
mod config;
pub mod endpoints;
mod error;
pub mod gateway;
mod id;
mod models;
mod reconciler;
mod repository;
pub mod session;
#[cfg(test)]
mod testing;

pub use catalog::{ResultOrigin, SearchResults, SectionCatalogClient};
pub use client::RiverLog;
pub use config::{
    Config, SchemaVersion, DEFAULT_BASE_URL, DEFAULT_SEARCH_DEBOUNCE,
};
pub use error::ApiError;
pub use id::Id;
pub use models::{
    format_class_rating, FlowUnit, River, Section, Trip, TripAddressing,
    TripOrder, TripQuery, TripStats, TripWriteRequest, User,
};
pub use reconciler::{
    apply_section, to_create_request, TripDraft, TripFormReconciler,
};
pub use repository::TripRepository;
pub use session::{
    FileStore, MemoryStore, SecretStore, SecretStoreError, Session,
    SessionManager, SessionState, StoredCredentials, Validation,
};

/// The default user agent to use when communicating with the RiverLog server.
pub const DEFAULT_USER_AGENT: &str =
    concat!(env!("CARGO_PKG_NAME"), "-", env!("CARGO_PKG_VERSION"));
