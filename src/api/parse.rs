//! Classification of raw chat text sent during a registration session.

use crate::error::{AppError, Result};
use crate::models::Point;
use once_cell::sync::Lazy;
use regex::Regex;

static RADIUS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+(\.\d+)?$").expect("valid regex"));

static POINT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\((?P<lat>-?\d+(\.\d+)?), (?P<lon>-?\d+(\.\d+)?)\)$").expect("valid regex")
});

static TRACK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https://open\.spotify\.com/track/(?P<id>[a-zA-Z0-9]+)(\?.*)?$").expect("valid regex")
});

#[derive(Debug, Clone, PartialEq)]
pub enum ChatInput {
    /// Kilometers
    Radius(f64),
    Point(Point),
    /// Catalog id taken from a share link, still to be resolved
    TrackLink(String),
}

pub fn parse_input(text: &str) -> Result<ChatInput> {
    let text = text.trim();

    if RADIUS_RE.is_match(text) {
        let radius: f64 = text
            .parse()
            .map_err(|_| AppError::BadInput(format!("Not a radius: {}", text)))?;
        if !radius.is_finite() || radius <= 0.0 {
            return Err(AppError::BadInput("Radius must be a positive number".to_string()));
        }
        return Ok(ChatInput::Radius(radius));
    }

    if let Some(caps) = POINT_RE.captures(text) {
        let lat: f64 = caps["lat"]
            .parse()
            .map_err(|_| AppError::BadInput("Bad latitude".to_string()))?;
        let lon: f64 = caps["lon"]
            .parse()
            .map_err(|_| AppError::BadInput("Bad longitude".to_string()))?;
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(AppError::BadInput(format!("({}, {}) is not on Earth", lat, lon)));
        }
        return Ok(ChatInput::Point(Point::new(lat, lon)));
    }

    if let Some(caps) = TRACK_RE.captures(text) {
        return Ok(ChatInput::TrackLink(caps["id"].to_string()));
    }

    Err(AppError::BadInput(
        "Send me a radius in km, a location like (60.17, 24.94) or a Spotify track link".to_string(),
    ))
}
