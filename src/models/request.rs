use serde::Deserialize;
use validator::Validate;

/// Raw chat text sent while a registration is open.
#[derive(Debug, Deserialize, Validate)]
pub struct RegistrationInput {
    #[validate(length(min = 1, max = 1024))]
    pub text: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LocationUpdate {
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LinkSpotifyRequest {
    #[validate(length(min = 1))]
    pub access_token: String,
}
