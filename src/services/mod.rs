pub mod auth;
pub mod cooldown;
pub mod dispatcher;
pub mod geodesy;
pub mod owner_slots;
pub mod registry;
pub mod session;
pub mod spotify;
pub mod store;

pub use auth::AuthService;
pub use cooldown::CooldownTracker;
pub use dispatcher::ProximityDispatcher;
pub use registry::LocationRegistry;
pub use session::SessionManager;
pub use spotify::SpotifyClient;
pub use store::PgRegistrationStore;
