use crate::{ApiError, Id};
use chrono::{DateTime, NaiveDate, Utc};
use serde_derive::{Deserialize, Serialize};
use std::{
    collections::HashSet,
    fmt::{self, Display, Formatter},
    str::FromStr,
};

/// How a flow reading was measured.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowUnit {
    /// Cubic feet per second.
    Cfs,
    /// A stage height off a gauge.
    Feet,
}

impl Default for FlowUnit {
    fn default() -> Self { FlowUnit::Cfs }
}

impl Display for FlowUnit {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            FlowUnit::Cfs => write!(f, "cfs"),
            FlowUnit::Feet => write!(f, "feet"),
        }
    }
}

impl FromStr for FlowUnit {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cfs" => Ok(FlowUnit::Cfs),
            "feet" | "ft" => Ok(FlowUnit::Feet),
            other => Err(ApiError::InvalidInput(format!(
                "Unknown flow unit \"{}\"",
                other
            ))),
        }
    }
}

/// Where a trip happened.
///
/// Which variant a deployment uses depends on its
/// [`SchemaVersion`](crate::SchemaVersion); a single trip never mixes the two.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TripAddressing {
    /// A reference to a catalog [`Section`](crate::Section). The names are
    /// denormalized copies for display and are never sent back.
    CatalogRef {
        section_id: Id,
        #[serde(default, skip_serializing)]
        river_name: Option<String>,
        #[serde(default, skip_serializing)]
        section_name: Option<String>,
    },
    FreeText {
        river_name: String,
        section_name: String,
    },
}

impl TripAddressing {
    pub fn catalog(section_id: Id) -> Self {
        TripAddressing::CatalogRef {
            section_id,
            river_name: None,
            section_name: None,
        }
    }

    pub fn river_name(&self) -> Option<&str> {
        match self {
            TripAddressing::CatalogRef { river_name, .. } => {
                river_name.as_deref()
            },
            TripAddressing::FreeText { river_name, .. } => Some(river_name),
        }
    }

    pub fn section_name(&self) -> Option<&str> {
        match self {
            TripAddressing::CatalogRef { section_name, .. } => {
                section_name.as_deref()
            },
            TripAddressing::FreeText { section_name, .. } => {
                Some(section_name)
            },
        }
    }

    pub fn section_id(&self) -> Option<Id> {
        match *self {
            TripAddressing::CatalogRef { section_id, .. } => Some(section_id),
            TripAddressing::FreeText { .. } => None,
        }
    }

    fn validate(&self) -> Result<(), ApiError> {
        match self {
            TripAddressing::FreeText {
                river_name,
                section_name,
            } if river_name.trim().is_empty()
                || section_name.trim().is_empty() =>
            {
                Err(ApiError::invalid_input(
                    "River name and section are required",
                ))
            },
            _ => Ok(()),
        }
    }
}

/// A single logged trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    pub id: Id,
    pub user_id: Id,
    #[serde(flatten)]
    pub addressing: TripAddressing,
    pub trip_date: NaiveDate,
    pub difficulty: Option<String>,
    pub flow: Option<i64>,
    pub flow_unit: Option<FlowUnit>,
    pub craft_type: Option<String>,
    pub duration_minutes: Option<i64>,
    pub mileage: Option<f64>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Trip {
    /// A label for the river, falling back to the section reference when the
    /// backend didn't send any display names.
    pub fn river_label(&self) -> String {
        match (self.addressing.river_name(), self.addressing.section_id()) {
            (Some(name), _) => name.to_string(),
            (None, Some(id)) => format!("section #{}", id),
            (None, None) => String::new(),
        }
    }
}

/// The body sent when creating or updating a [`Trip`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TripWriteRequest {
    #[serde(flatten)]
    pub addressing: TripAddressing,
    pub trip_date: NaiveDate,
    pub difficulty: Option<String>,
    pub flow: Option<i64>,
    pub flow_unit: Option<FlowUnit>,
    pub craft_type: Option<String>,
    pub duration_minutes: Option<i64>,
    pub mileage: Option<f64>,
    pub notes: Option<String>,
}

impl TripWriteRequest {
    pub fn new(addressing: TripAddressing, trip_date: NaiveDate) -> Self {
        TripWriteRequest {
            addressing,
            trip_date,
            difficulty: None,
            flow: None,
            flow_unit: None,
            craft_type: None,
            duration_minutes: None,
            mileage: None,
            notes: None,
        }
    }

    /// Check the fields the backend insists on.
    pub fn validate(&self) -> Result<(), ApiError> {
        self.addressing.validate()
    }
}

/// Paging and ordering for `GET /trips`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TripQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

impl TripQuery {
    pub(crate) fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();

        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(offset) = self.offset {
            pairs.push(("offset", offset.to_string()));
        }
        if let Some(sort_by) = &self.sort_by {
            pairs.push(("sort_by", sort_by.clone()));
        }
        if let Some(sort_order) = &self.sort_order {
            pairs.push(("sort_order", sort_order.clone()));
        }

        pairs
    }
}

/// Client-side ordering for a list of trips.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TripOrder {
    NewestFirst,
    OldestFirst,
}

impl TripOrder {
    pub fn sort(self, trips: &mut [Trip]) {
        match self {
            TripOrder::NewestFirst => {
                trips.sort_by(|a, b| b.trip_date.cmp(&a.trip_date))
            },
            TripOrder::OldestFirst => {
                trips.sort_by(|a, b| a.trip_date.cmp(&b.trip_date))
            },
        }
    }
}

impl Default for TripOrder {
    fn default() -> Self { TripOrder::NewestFirst }
}

/// Totals over a set of trips.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct TripStats {
    pub total_mileage: f64,
    pub trip_count: usize,
    pub distinct_rivers: usize,
}

impl TripStats {
    pub fn from_trips(trips: &[Trip]) -> Self {
        let total_mileage: f64 = trips.iter().filter_map(|t| t.mileage).sum();
        let rivers: HashSet<String> =
            trips.iter().map(Trip::river_label).collect();

        TripStats {
            total_mileage,
            trip_count: trips.len(),
            distinct_rivers: rivers.len(),
        }
    }
}
