pub mod middleware;
pub mod parse;
pub mod registrations;
pub mod users;

use crate::services::{AuthService, LocationRegistry, ProximityDispatcher, SessionManager, SpotifyClient};
use std::sync::Arc;

pub use registrations::registration_routes;
pub use users::user_routes;

pub struct AppState {
    pub auth_service: Arc<AuthService>,
    pub registry: Arc<LocationRegistry>,
    pub sessions: Arc<SessionManager>,
    pub dispatcher: Arc<ProximityDispatcher>,
    pub spotify: Arc<SpotifyClient>,
}
