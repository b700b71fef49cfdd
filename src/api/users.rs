use crate::api::middleware::RequireAuth;
use crate::api::parse::{parse_input, ChatInput};
use crate::api::AppState;
use crate::error::{AppError, QueueError, Result};
use crate::models::{
    LinkSpotifyRequest, LocationUpdate, OwnerId, Point, RegistrationInfo, RegistrationInput,
    TrackInfo,
};
use axum::{
    extract::{Path, State},
    routing::{post, put},
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use validator::Validate;

#[derive(Debug, Serialize)]
pub struct StatusMessage {
    pub message: String,
}

impl StatusMessage {
    fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct CommitResponse {
    pub registration: RegistrationInfo,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct FailedTrack {
    pub track: TrackInfo,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct LocationResponse {
    pub queued: Vec<TrackInfo>,
    pub suppressed: Vec<TrackInfo>,
    pub failed: Vec<FailedTrack>,
    pub message: String,
}

pub fn user_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users/:owner/registration", post(begin_registration))
        .route("/users/:owner/registration/input", post(registration_input))
        .route("/users/:owner/registration/commit", post(commit_registration))
        .route("/users/:owner/location", post(location_update))
        .route("/users/:owner/spotify", put(link_spotify).delete(unlink_spotify))
}

async fn begin_registration(
    State(state): State<Arc<AppState>>,
    RequireAuth(_): RequireAuth,
    Path(owner): Path<OwnerId>,
) -> Json<StatusMessage> {
    state.sessions.begin(owner).await;
    StatusMessage::new("Adding a song to a location. Send me a /done when you're ready!")
}

async fn registration_input(
    State(state): State<Arc<AppState>>,
    RequireAuth(_): RequireAuth,
    Path(owner): Path<OwnerId>,
    Json(req): Json<RegistrationInput>,
) -> Result<Json<StatusMessage>> {
    req.validate()
        .map_err(|e| AppError::BadInput(e.to_string()))?;

    let message = match parse_input(&req.text)? {
        ChatInput::Radius(radius_km) => {
            state.sessions.set_radius(owner, radius_km).await?;
            format!("Set the radius to {} km!", radius_km)
        }
        ChatInput::Point(point) => {
            state.sessions.set_point(owner, point).await?;
            format!("Set the location to {}!", point)
        }
        ChatInput::TrackLink(catalog_id) => {
            // Skip the catalog round-trip for users with nothing open
            if !state.sessions.is_open(owner).await {
                return Err(AppError::NoSession);
            }
            let track = state.spotify.lookup_track(&catalog_id).await?;
            let message = format!("Set the song to {} by {}!", track.name, track.artist);
            state.sessions.set_track(owner, track).await?;
            message
        }
    };

    Ok(StatusMessage::new(message))
}

async fn commit_registration(
    State(state): State<Arc<AppState>>,
    RequireAuth(_): RequireAuth,
    Path(owner): Path<OwnerId>,
) -> Result<Json<CommitResponse>> {
    let registration = state.sessions.commit(owner).await?;
    let message = format!("Song added at {}!", registration.point);

    Ok(Json(CommitResponse {
        registration: registration.into(),
        message,
    }))
}

async fn location_update(
    State(state): State<Arc<AppState>>,
    RequireAuth(_): RequireAuth,
    Path(owner): Path<OwnerId>,
    Json(req): Json<LocationUpdate>,
) -> Result<Json<LocationResponse>> {
    req.validate()
        .map_err(|e| AppError::BadInput(e.to_string()))?;

    if !state.spotify.is_linked(owner).await {
        return Err(QueueError::NotLinked.into());
    }

    let point = Point::new(req.latitude, req.longitude);
    let outcome = state
        .dispatcher
        .on_location_update(owner, point, Utc::now())
        .await?;

    let message = if outcome.queued.is_empty() {
        String::new()
    } else {
        let names: Vec<String> = outcome
            .queued
            .iter()
            .map(|t| format!("{} - {}", t.artist, t.name))
            .collect();
        format!("Enjoy! Queued {}", names.join(", "))
    };

    Ok(Json(LocationResponse {
        queued: outcome.queued.into_iter().map(TrackInfo::from).collect(),
        suppressed: outcome.suppressed.into_iter().map(TrackInfo::from).collect(),
        failed: outcome
            .failed
            .into_iter()
            .map(|(track, e)| FailedTrack {
                track: track.into(),
                error: e.to_string(),
            })
            .collect(),
        message,
    }))
}

async fn link_spotify(
    State(state): State<Arc<AppState>>,
    RequireAuth(_): RequireAuth,
    Path(owner): Path<OwnerId>,
    Json(req): Json<LinkSpotifyRequest>,
) -> Result<Json<StatusMessage>> {
    req.validate()
        .map_err(|e| AppError::BadInput(e.to_string()))?;

    state.spotify.link_account(owner, req.access_token).await;
    Ok(StatusMessage::new("Ready!"))
}

async fn unlink_spotify(
    State(state): State<Arc<AppState>>,
    RequireAuth(_): RequireAuth,
    Path(owner): Path<OwnerId>,
) -> Result<Json<StatusMessage>> {
    if !state.spotify.unlink_account(owner).await {
        return Err(AppError::NotFound("No Spotify account linked".to_string()));
    }
    Ok(StatusMessage::new("Spotify unlinked."))
}
