use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use tracing::warn;

use crate::{
    error::AppError,
    models::{activity::Activity, fields},
};

/// Every mutable trip column, in the order the store reads and writes them.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct TripFields {
    pub name: String,
    pub origin: Option<String>,
    pub origin_place_name: Option<String>,
    pub origin_lat: Option<f64>,
    pub origin_lng: Option<f64>,
    pub origin_mapbox_id: Option<String>,
    pub destination: Option<String>,
    pub destination_place_name: Option<String>,
    pub destination_lat: Option<f64>,
    pub destination_lng: Option<f64>,
    pub destination_mapbox_id: Option<String>,
    pub is_round_trip: bool,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub summary: Option<String>,
    pub people: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trip {
    pub id: i64,
    #[serde(flatten)]
    pub fields: TripFields,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TripDetail {
    #[serde(flatten)]
    pub trip: Trip,
    pub activities: Vec<Activity>,
}

#[derive(Debug, Clone, FromRow)]
pub struct TripRow {
    pub id: i64,
    pub name: String,
    pub origin: Option<String>,
    pub origin_place_name: Option<String>,
    pub origin_lat: Option<f64>,
    pub origin_lng: Option<f64>,
    pub origin_mapbox_id: Option<String>,
    pub destination: Option<String>,
    pub destination_place_name: Option<String>,
    pub destination_lat: Option<f64>,
    pub destination_lng: Option<f64>,
    pub destination_mapbox_id: Option<String>,
    pub is_round_trip: Option<bool>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub summary: Option<String>,
    pub people: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<TripRow> for Trip {
    fn from(row: TripRow) -> Self {
        let people = decode_people(row.id, row.people.as_deref());
        Self {
            id: row.id,
            fields: TripFields {
                name: row.name,
                origin: row.origin,
                origin_place_name: row.origin_place_name,
                origin_lat: row.origin_lat,
                origin_lng: row.origin_lng,
                origin_mapbox_id: row.origin_mapbox_id,
                destination: row.destination,
                destination_place_name: row.destination_place_name,
                destination_lat: row.destination_lat,
                destination_lng: row.destination_lng,
                destination_mapbox_id: row.destination_mapbox_id,
                is_round_trip: row.is_round_trip.unwrap_or(false),
                start_date: row.start_date,
                end_date: row.end_date,
                summary: row.summary,
                people,
            },
            // Rows written before created_at existed sort as the oldest.
            created_at: row.created_at.unwrap_or_default(),
        }
    }
}

fn decode_people(trip_id: i64, raw: Option<&str>) -> Vec<Value> {
    let Some(raw) = raw.filter(|raw| !raw.trim().is_empty()) else {
        return Vec::new();
    };
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(people)) => people,
        Ok(Value::Null) => Vec::new(),
        Ok(other) => vec![other],
        Err(err) => {
            warn!("trip {trip_id} has unreadable people column: {err}");
            Vec::new()
        }
    }
}

/// Request body for both creating and patching a trip.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TripPayload {
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub name: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub origin: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub origin_place_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "fields::coordinate")]
    pub origin_lat: Option<Option<f64>>,
    #[serde(default, deserialize_with = "fields::coordinate")]
    pub origin_lng: Option<Option<f64>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub origin_mapbox_id: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub destination: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub destination_place_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "fields::coordinate")]
    pub destination_lat: Option<Option<f64>>,
    #[serde(default, deserialize_with = "fields::coordinate")]
    pub destination_lng: Option<Option<f64>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub destination_mapbox_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "fields::flag")]
    pub is_round_trip: Option<Option<bool>>,
    #[serde(default, deserialize_with = "fields::date")]
    pub start_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "fields::date")]
    pub end_date: Option<Option<NaiveDate>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub summary: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub people: Option<Option<Vec<Value>>>,
}

/// One side of a trip as it arrives in a payload.
struct EndpointPatch {
    label: Option<Option<String>>,
    place_name: Option<Option<String>>,
    lat: Option<Option<f64>>,
    lng: Option<Option<f64>>,
    mapbox_id: Option<Option<String>>,
}

impl EndpointPatch {
    fn touches_location(&self) -> bool {
        self.label.is_some() || self.place_name.is_some() || self.lat.is_some() || self.lng.is_some()
    }

    /// Both coordinates or neither; `None` when neither was supplied.
    fn coordinates(&self, side: &str) -> Result<Option<(f64, f64)>, AppError> {
        match (self.lat.flatten(), self.lng.flatten()) {
            (Some(lat), Some(lng)) => Ok(Some((lat, lng))),
            (None, None) => Ok(None),
            _ => Err(AppError::validation(format!(
                "{side} latitude and longitude must both be provided."
            ))),
        }
    }
}

/// Mutable view of one side of a stored trip.
struct Endpoint<'a> {
    label: &'a mut Option<String>,
    place_name: &'a mut Option<String>,
    lat: &'a mut Option<f64>,
    lng: &'a mut Option<f64>,
    mapbox_id: &'a mut Option<String>,
}

impl Endpoint<'_> {
    fn apply(&mut self, patch: EndpointPatch, side: &str) -> Result<(), AppError> {
        if patch.touches_location() {
            if let Some((lat, lng)) = patch.coordinates(side)? {
                *self.lat = Some(lat);
                *self.lng = Some(lng);
            }

            if let Some(place_name) = patch.place_name.clone() {
                *self.place_name = fields::normalize_optional(place_name);
            }
            match patch.label {
                Some(label) => {
                    *self.label = fields::normalize_optional(label).or_else(|| self.place_name.clone());
                }
                None if patch.place_name.is_some() => *self.label = self.place_name.clone(),
                None => {}
            }
        }

        if let Some(mapbox_id) = patch.mapbox_id {
            *self.mapbox_id = fields::normalize_optional(mapbox_id);
        }
        Ok(())
    }
}

impl TripPayload {
    fn split_origin(&mut self) -> EndpointPatch {
        EndpointPatch {
            label: self.origin.take(),
            place_name: self.origin_place_name.take(),
            lat: self.origin_lat.take(),
            lng: self.origin_lng.take(),
            mapbox_id: self.origin_mapbox_id.take(),
        }
    }

    fn split_destination(&mut self) -> EndpointPatch {
        EndpointPatch {
            label: self.destination.take(),
            place_name: self.destination_place_name.take(),
            lat: self.destination_lat.take(),
            lng: self.destination_lng.take(),
            mapbox_id: self.destination_mapbox_id.take(),
        }
    }
}

impl TripFields {
    /// Validates a create payload and resolves it into the row to insert.
    pub fn from_payload(mut payload: TripPayload) -> Result<Self, AppError> {
        let is_round_trip = payload.is_round_trip.flatten().unwrap_or(false);
        let origin = payload.split_origin();
        let destination = payload.split_destination();

        let Some((origin_lat, origin_lng)) = origin.coordinates("Origin")? else {
            return Err(AppError::validation(
                "Origin coordinates are required. Please select a validated place.",
            ));
        };
        let destination_coordinates = destination.coordinates("Destination")?;
        if destination_coordinates.is_none() && !is_round_trip {
            return Err(AppError::validation(
                "Destination coordinates are required. Please select a validated place.",
            ));
        }

        let name = required_name(payload.name.flatten())?;

        let origin_place_name = fields::normalize_optional(origin.place_name.flatten());
        let origin_label =
            fields::normalize_optional(origin.label.flatten()).or_else(|| origin_place_name.clone());
        let destination_place_name = fields::normalize_optional(destination.place_name.flatten());
        let destination_label = fields::normalize_optional(destination.label.flatten())
            .or_else(|| destination_place_name.clone());

        let mut trip = Self {
            name,
            origin: origin_label,
            origin_place_name,
            origin_lat: Some(origin_lat),
            origin_lng: Some(origin_lng),
            origin_mapbox_id: fields::normalize_optional(origin.mapbox_id.flatten()),
            destination: destination_label,
            destination_place_name,
            destination_lat: destination_coordinates.map(|(lat, _)| lat),
            destination_lng: destination_coordinates.map(|(_, lng)| lng),
            destination_mapbox_id: fields::normalize_optional(destination.mapbox_id.flatten()),
            is_round_trip,
            start_date: payload.start_date.flatten(),
            end_date: payload.end_date.flatten(),
            summary: fields::normalize_optional(payload.summary.flatten()),
            people: payload.people.flatten().unwrap_or_default(),
        };

        if destination_coordinates.is_none() {
            trip.copy_origin_to_destination();
        }
        Ok(trip)
    }

    /// Applies a partial update. Only keys present in `patch` change; the
    /// round-trip pass runs on the merged result.
    pub fn apply_patch(&self, mut patch: TripPayload) -> Result<Self, AppError> {
        let mut next = self.clone();
        let origin = patch.split_origin();
        let destination = patch.split_destination();

        if let Some(name) = patch.name {
            next.name = required_name(name)?;
        }
        next.origin_endpoint().apply(origin, "Origin")?;
        next.destination_endpoint().apply(destination, "Destination")?;
        if let Some(is_round_trip) = patch.is_round_trip {
            next.is_round_trip = is_round_trip.unwrap_or(false);
        }
        if let Some(start_date) = patch.start_date {
            next.start_date = start_date;
        }
        if let Some(end_date) = patch.end_date {
            next.end_date = end_date;
        }
        if let Some(summary) = patch.summary {
            next.summary = fields::normalize_optional(summary);
        }
        if let Some(people) = patch.people {
            next.people = people.unwrap_or_default();
        }

        if next.is_round_trip {
            if !next.has_origin_coordinates() {
                return Err(AppError::validation(
                    "Round trips require origin coordinates.",
                ));
            }
            next.fill_destination_from_origin();
        }
        Ok(next)
    }

    fn has_origin_coordinates(&self) -> bool {
        self.origin_lat.is_some() && self.origin_lng.is_some()
    }

    /// Replaces the whole destination with the origin. A destination label
    /// or place reference sent without coordinates does not survive.
    fn copy_origin_to_destination(&mut self) {
        self.destination_lat = self.origin_lat;
        self.destination_lng = self.origin_lng;
        self.destination = self
            .origin
            .clone()
            .or_else(|| self.origin_place_name.clone());
        self.destination_place_name = self.origin_place_name.clone();
        self.destination_mapbox_id = self.origin_mapbox_id.clone();
    }

    /// Copies origin data into every destination field that is still unset.
    fn fill_destination_from_origin(&mut self) {
        if self.destination_lat.is_none() {
            self.destination_lat = self.origin_lat;
        }
        if self.destination_lng.is_none() {
            self.destination_lng = self.origin_lng;
        }
        if self.destination.is_none() {
            self.destination = self.origin.clone();
        }
        if self.destination_place_name.is_none() {
            self.destination_place_name = self.origin_place_name.clone();
        }
        if self.destination_mapbox_id.is_none() {
            self.destination_mapbox_id = self.origin_mapbox_id.clone();
        }
    }

    fn origin_endpoint(&mut self) -> Endpoint<'_> {
        Endpoint {
            label: &mut self.origin,
            place_name: &mut self.origin_place_name,
            lat: &mut self.origin_lat,
            lng: &mut self.origin_lng,
            mapbox_id: &mut self.origin_mapbox_id,
        }
    }

    fn destination_endpoint(&mut self) -> Endpoint<'_> {
        Endpoint {
            label: &mut self.destination,
            place_name: &mut self.destination_place_name,
            lat: &mut self.destination_lat,
            lng: &mut self.destination_lng,
            mapbox_id: &mut self.destination_mapbox_id,
        }
    }

    pub fn people_json(&self) -> Result<String, AppError> {
        serde_json::to_string(&self.people).map_err(|err| AppError::Other(err.into()))
    }
}

fn required_name(name: Option<String>) -> Result<String, AppError> {
    fields::normalize_optional(name).ok_or_else(|| AppError::validation("Trip name is required."))
}
