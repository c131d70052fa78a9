//! The resources exchanged with the RiverLog backend.

mod section;
mod trip;
mod user;

pub use section::{format_class_rating, River, Section};
pub use trip::{
    FlowUnit, Trip, TripAddressing, TripOrder, TripQuery, TripStats,
    TripWriteRequest,
};
pub use user::User;
