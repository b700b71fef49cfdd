use super::track::Track;
use crate::error::ValidationFailure;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Chat user identifier as handed to us by the relay.
pub type OwnerId = i64;

/// WGS-84 coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub lat: f64,
    pub lon: f64,
}

impl Point {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.5}, {:.5})", self.lat, self.lon)
    }
}

/// A committed song drop. Only ever constructed fully-formed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    pub owner: OwnerId,
    pub point: Point,
    pub radius_km: f64,
    pub track: Track,
}

/// Row shape of the `locations` table.
#[derive(Debug, FromRow)]
pub struct RegistrationRow {
    pub owner: i64,
    pub lat: f64,
    pub lon: f64,
    pub radius_km: f64,
    pub track_id: String,
    pub track_name: String,
    pub track_artist: String,
}

impl From<RegistrationRow> for Registration {
    fn from(row: RegistrationRow) -> Self {
        Registration {
            owner: row.owner,
            point: Point::new(row.lat, row.lon),
            radius_km: row.radius_km,
            track: Track {
                id: row.track_id,
                name: row.track_name,
                artist: row.track_artist,
            },
        }
    }
}

/// In-progress registration draft. Lives only inside a user's session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingEntry {
    pub point: Option<Point>,
    pub radius_km: Option<f64>,
    pub track: Option<Track>,
}

impl PendingEntry {
    /// Turn the draft into a registration. Radius falls back to `default_radius_km`.
    pub fn finish(&self, owner: OwnerId, default_radius_km: f64) -> Result<Registration, ValidationFailure> {
        match (self.point, &self.track) {
            (Some(point), Some(track)) => Ok(Registration {
                owner,
                point,
                radius_km: self.radius_km.unwrap_or(default_radius_km),
                track: track.clone(),
            }),
            (point, track) => Err(ValidationFailure {
                missing_point: point.is_none(),
                missing_track: track.is_none(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RegistrationInfo {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(rename = "radiusKm")]
    pub radius_km: f64,
    pub track: String,
    pub artist: String,
    /// Rendered the way the chat relay shows the drop list.
    pub summary: String,
}

impl From<Registration> for RegistrationInfo {
    fn from(reg: Registration) -> Self {
        let summary = format!(
            "{}: {} - {} ({}km)",
            reg.point, reg.track.artist, reg.track.name, reg.radius_km
        );
        RegistrationInfo {
            latitude: reg.point.lat,
            longitude: reg.point.lon,
            radius_km: reg.radius_km,
            track: reg.track.name,
            artist: reg.track.artist,
            summary,
        }
    }
}
