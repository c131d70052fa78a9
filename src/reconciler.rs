//! Turning what someone typed into a trip the backend will accept.

use crate::{
    ApiError, FlowUnit, Id, SchemaVersion, Section, SectionCatalogClient,
    Trip, TripAddressing, TripRepository, TripWriteRequest,
};
use chrono::NaiveDate;
use std::sync::Arc;

/// The in-progress state of the trip form, exactly as typed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TripDraft {
    pub river_name: String,
    pub section_name: String,
    /// The catalog section this trip is logged against, if any.
    pub section_id: Option<Id>,
    /// A snapshot of the bound section, once we've fetched it.
    pub section: Option<Section>,
    /// `YYYY-MM-DD`.
    pub trip_date: String,
    pub difficulty: String,
    pub flow: String,
    pub flow_unit: FlowUnit,
    pub craft_type: String,
    pub duration_minutes: String,
    pub mileage: String,
    pub notes: String,
}

impl TripDraft {
    pub fn new(trip_date: NaiveDate) -> Self {
        TripDraft {
            trip_date: trip_date.format("%Y-%m-%d").to_string(),
            ..TripDraft::default()
        }
    }

    /// Pre-fill the form for editing an existing trip.
    pub fn from_trip(trip: &Trip) -> Self {
        TripDraft {
            river_name: trip.addressing.river_name().unwrap_or("").to_string(),
            section_name: trip
                .addressing
                .section_name()
                .unwrap_or("")
                .to_string(),
            section_id: trip.addressing.section_id(),
            section: None,
            trip_date: trip.trip_date.format("%Y-%m-%d").to_string(),
            difficulty: trip.difficulty.clone().unwrap_or_default(),
            flow: display(trip.flow),
            flow_unit: trip.flow_unit.unwrap_or_default(),
            craft_type: trip.craft_type.clone().unwrap_or_default(),
            duration_minutes: display(trip.duration_minutes),
            mileage: display(trip.mileage),
            notes: trip.notes.clone().unwrap_or_default(),
        }
    }
}

fn display<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn is_blank(field: &str) -> bool { field.trim().is_empty() }

/// Bind `selected` to the draft, filling in difficulty and mileage from the
/// catalog.
///
/// Derived fields are only written while they're blank. Anything the user has
/// typed (or a value copied from a previously selected section) is kept.
pub fn apply_section(selected: &Section, draft: &mut TripDraft) {
    draft.section_id = Some(selected.id);
    draft.section = Some(selected.clone());

    if is_blank(&draft.difficulty) {
        if let Some(difficulty) = selected.difficulty() {
            draft.difficulty = difficulty;
        }
    }

    if is_blank(&draft.mileage) {
        if let Some(mileage) = selected.mileage {
            draft.mileage = mileage.to_string();
        }
    }
}

/// Convert a draft into a request body, without touching the network.
pub fn to_create_request(
    draft: &TripDraft,
    schema: SchemaVersion,
) -> Result<TripWriteRequest, ApiError> {
    let addressing = match schema {
        SchemaVersion::FreeText => {
            if is_blank(&draft.river_name) || is_blank(&draft.section_name) {
                return Err(ApiError::invalid_input(
                    "River name and section are required",
                ));
            }

            TripAddressing::FreeText {
                river_name: draft.river_name.clone(),
                section_name: draft.section_name.clone(),
            }
        },
        SchemaVersion::CatalogRef => {
            let section_id = draft
                .section_id
                .or_else(|| draft.section.as_ref().map(|s| s.id))
                .ok_or_else(|| {
                    ApiError::invalid_input("Please select a river section")
                })?;

            TripAddressing::catalog(section_id)
        },
    };

    if is_blank(&draft.trip_date) {
        return Err(ApiError::invalid_input("Trip date is required"));
    }
    let trip_date = draft.trip_date.trim();
    let trip_date = NaiveDate::parse_from_str(trip_date, "%Y-%m-%d").map_err(
        |_| {
            ApiError::InvalidInput(format!(
                "\"{}\" isn't a valid date, expected YYYY-MM-DD",
                draft.trip_date
            ))
        },
    )?;

    Ok(TripWriteRequest {
        addressing,
        trip_date,
        difficulty: optional_text(&draft.difficulty),
        flow: parse_int(&draft.flow),
        flow_unit: Some(draft.flow_unit),
        craft_type: optional_text(&draft.craft_type),
        duration_minutes: parse_int(&draft.duration_minutes),
        mileage: parse_float(&draft.mileage),
        notes: optional_text(&draft.notes),
    })
}

fn optional_text(field: &str) -> Option<String> {
    if is_blank(field) {
        None
    } else {
        Some(field.to_string())
    }
}

/// Read the leading integer from `field`, the way a browser's `parseInt()`
/// would ("650 cfs" is 650, "abc" is nothing).
fn parse_int(field: &str) -> Option<i64> {
    let field = field.trim();
    let digits_start = if field.starts_with('-') || field.starts_with('+') {
        1
    } else {
        0
    };
    let digits = field[digits_start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .count();

    if digits == 0 {
        return None;
    }

    field[..digits_start + digits].parse().ok()
}

/// Like [`parse_int()`], but for the longest leading decimal number.
fn parse_float(field: &str) -> Option<f64> {
    let field = field.trim();
    let mut end = 0;
    let mut seen_dot = false;

    for (i, c) in field.char_indices() {
        match c {
            '+' | '-' if i == 0 => {},
            '.' if !seen_dot => seen_dot = true,
            c if c.is_ascii_digit() => {},
            _ => break,
        }
        end = i + c.len_utf8();
    }

    field[..end].parse().ok().filter(|v: &f64| v.is_finite())
}

/// Coordinates the trip form with the catalog and the trip repository.
#[derive(Debug)]
pub struct TripFormReconciler {
    schema: SchemaVersion,
    catalog: Arc<SectionCatalogClient>,
    trips: Arc<TripRepository>,
}

impl TripFormReconciler {
    pub fn new(
        schema: SchemaVersion,
        catalog: Arc<SectionCatalogClient>,
        trips: Arc<TripRepository>,
    ) -> Self {
        TripFormReconciler {
            schema,
            catalog,
            trips,
        }
    }

    pub fn schema(&self) -> SchemaVersion { self.schema }

    /// See [`apply_section()`].
    pub fn apply_section(&self, selected: &Section, draft: &mut TripDraft) {
        apply_section(selected, draft);
    }

    /// See [`to_create_request()`].
    pub fn to_create_request(
        &self,
        draft: &TripDraft,
    ) -> Result<TripWriteRequest, ApiError> {
        to_create_request(draft, self.schema)
    }

    /// Load an existing trip into a draft, including its catalog section.
    pub async fn load(&self, id: Id) -> Result<TripDraft, ApiError> {
        let trip = self.trips.get(id).await?;
        let mut draft = TripDraft::from_trip(&trip);
        self.resolve_section(&mut draft).await?;

        Ok(draft)
    }

    /// Fill in the section snapshot for a draft which only knows the id.
    ///
    /// Derived fields aren't touched, the trip already has its own values.
    pub async fn resolve_section(
        &self,
        draft: &mut TripDraft,
    ) -> Result<Option<Section>, ApiError> {
        let id = match (draft.section_id, &draft.section) {
            (Some(id), None) => id,
            (_, section) => return Ok(section.clone()),
        };

        let section = self.catalog.find(id).await?;
        if section.is_none() {
            log::warn!("Section {} isn't in the catalog", id);
        }
        draft.section = section.clone();

        Ok(section)
    }

    /// Validate the draft and save it, creating a new trip unless `editing`
    /// names an existing one.
    pub async fn submit(
        &self,
        draft: &TripDraft,
        editing: Option<Id>,
    ) -> Result<Trip, ApiError> {
        let request = self.to_create_request(draft)?;

        match editing {
            Some(id) => self.trips.update(id, &request).await,
            None => self.trips.create(&request).await,
        }
    }
}
