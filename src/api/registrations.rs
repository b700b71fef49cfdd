use crate::api::middleware::RequireAuth;
use crate::api::AppState;
use crate::error::Result;
use crate::models::RegistrationInfo;
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct RegistrationList {
    pub registrations: Vec<RegistrationInfo>,
    pub message: String,
}

pub fn registration_routes() -> Router<Arc<AppState>> {
    Router::new().route("/registrations", get(list_registrations))
}

async fn list_registrations(
    State(state): State<Arc<AppState>>,
    RequireAuth(_): RequireAuth,
) -> Result<Json<RegistrationList>> {
    let registrations: Vec<RegistrationInfo> = state
        .registry
        .all()
        .await?
        .iter()
        .cloned()
        .map(RegistrationInfo::from)
        .collect();

    let message = if registrations.is_empty() {
        "No songs dropped yet!".to_string()
    } else {
        registrations
            .iter()
            .map(|r| r.summary.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    };

    Ok(Json(RegistrationList {
        registrations,
        message,
    }))
}
