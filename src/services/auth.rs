use crate::config::Config;
use crate::error::{AppError, Result};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

/// Claims carried by the chat relay's bearer token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Name of the relay instance
    pub sub: String,
    pub exp: i64,
}

pub struct AuthService {
    jwt_secret: String,
}

impl AuthService {
    pub fn new(config: &Config) -> Self {
        Self::from_secret(config.jwt_secret.clone())
    }

    pub fn from_secret(jwt_secret: String) -> Self {
        Self { jwt_secret }
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|_| AppError::Unauthorized)?;

        Ok(token_data.claims)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn test_valid_token() {
        let auth = AuthService::from_secret(SECRET.to_string());
        let token = testing::token_for(SECRET, "telegram", Duration::hours(1));
        assert_eq!(auth.verify_token(&token).unwrap().sub, "telegram");
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let auth = AuthService::from_secret(SECRET.to_string());
        let token = testing::token_for("another-secret-another-secret-xx", "telegram", Duration::hours(1));
        assert!(matches!(auth.verify_token(&token), Err(AppError::Unauthorized)));
    }

    #[test]
    fn test_expired_token_rejected() {
        let auth = AuthService::from_secret(SECRET.to_string());
        let token = testing::token_for(SECRET, "telegram", Duration::hours(-1));
        assert!(matches!(auth.verify_token(&token), Err(AppError::Unauthorized)));
    }
}
