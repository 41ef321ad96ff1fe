use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::{error::AppError, models::fields};

pub const DEFAULT_STATUS: &str = "planned";

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Activity {
    pub id: i64,
    pub trip_id: i64,
    pub name: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub kind: Option<String>,
    pub date: Option<NaiveDateTime>,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub status: Option<String>,
}

/// Mutable activity columns; `trip_id` is fixed at creation.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityFields {
    pub name: String,
    pub kind: Option<String>,
    pub date: Option<NaiveDateTime>,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivityPayload {
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub name: Option<Option<String>>,
    #[serde(rename = "type", default, with = "::serde_with::rust::double_option")]
    pub kind: Option<Option<String>>,
    #[serde(default, deserialize_with = "fields::datetime")]
    pub date: Option<Option<NaiveDateTime>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub location: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub notes: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub status: Option<Option<String>>,
}

impl ActivityFields {
    pub fn from_payload(payload: ActivityPayload) -> Result<Self, AppError> {
        Ok(Self {
            name: required_name(payload.name.flatten())?,
            kind: fields::normalize_optional(payload.kind.flatten()),
            date: payload.date.flatten(),
            location: fields::normalize_optional(payload.location.flatten()),
            notes: fields::normalize_optional(payload.notes.flatten()),
            status: Some(status_or_default(payload.status.flatten())),
        })
    }

    pub fn apply_patch(&self, patch: ActivityPayload) -> Result<Self, AppError> {
        let mut next = self.clone();
        if let Some(name) = patch.name {
            next.name = required_name(name)?;
        }
        if let Some(kind) = patch.kind {
            next.kind = fields::normalize_optional(kind);
        }
        if let Some(date) = patch.date {
            next.date = date;
        }
        if let Some(location) = patch.location {
            next.location = fields::normalize_optional(location);
        }
        if let Some(notes) = patch.notes {
            next.notes = fields::normalize_optional(notes);
        }
        if let Some(status) = patch.status {
            next.status = Some(status_or_default(status));
        }
        Ok(next)
    }
}

impl From<Activity> for ActivityFields {
    fn from(activity: Activity) -> Self {
        Self {
            name: activity.name,
            kind: activity.kind,
            date: activity.date,
            location: activity.location,
            notes: activity.notes,
            status: activity.status,
        }
    }
}

fn required_name(name: Option<String>) -> Result<String, AppError> {
    fields::normalize_optional(name).ok_or_else(|| AppError::validation("Activity name is required."))
}

fn status_or_default(status: Option<String>) -> String {
    fields::normalize_optional(status).unwrap_or_else(|| DEFAULT_STATUS.to_string())
}
