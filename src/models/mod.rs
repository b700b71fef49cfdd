pub mod location;
pub mod request;
pub mod track;

pub use location::{OwnerId, PendingEntry, Point, Registration, RegistrationInfo};
pub use request::{LinkSpotifyRequest, LocationUpdate, RegistrationInput};
pub use track::{Track, TrackInfo};
