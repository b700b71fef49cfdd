use crate::config::Config;
use crate::error::{AppError, QueueError, Result};
use crate::models::{OwnerId, Track};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Somewhere tracks can be appended to a user's upcoming playback.
#[async_trait]
pub trait PlaybackQueue: Send + Sync {
    async fn enqueue(&self, owner: OwnerId, track_uri: &str) -> std::result::Result<(), QueueError>;
}

#[derive(Debug, Clone)]
struct AppToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

pub struct SpotifyClient {
    api_url: String,
    accounts_url: String,
    client_id: String,
    client_secret: String,
    client: Client,
    /// User access tokens handed over by the login flow
    user_tokens: RwLock<HashMap<OwnerId, String>>,
    app_token: RwLock<Option<AppToken>>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct SpotifyArtist {
    name: String,
}

#[derive(Debug, Deserialize)]
struct SpotifyTrack {
    id: String,
    name: String,
    #[serde(default)]
    artists: Vec<SpotifyArtist>,
}

impl SpotifyTrack {
    /// Keeps the id from the shared link, as that's what the user picked.
    fn into_track(self, catalog_id: &str) -> Track {
        if self.id != catalog_id {
            tracing::debug!("Spotify relinked track {} to {}", catalog_id, self.id);
        }

        let artist = self
            .artists
            .into_iter()
            .next()
            .map(|a| a.name)
            .unwrap_or_default();

        Track::from_catalog_id(catalog_id, self.name, artist)
    }
}

impl SpotifyClient {
    pub fn new(config: &Config) -> Self {
        Self {
            api_url: config.spotify_api_url.trim_end_matches('/').to_string(),
            accounts_url: config.spotify_accounts_url.trim_end_matches('/').to_string(),
            client_id: config.spotify_client_id.clone(),
            client_secret: config.spotify_client_secret.clone(),
            client: Client::new(),
            user_tokens: RwLock::new(HashMap::new()),
            app_token: RwLock::new(None),
        }
    }

    pub async fn link_account(&self, owner: OwnerId, access_token: String) {
        self.user_tokens.write().await.insert(owner, access_token);
        tracing::info!("Linked Spotify account for user {}", owner);
    }

    pub async fn unlink_account(&self, owner: OwnerId) -> bool {
        self.user_tokens.write().await.remove(&owner).is_some()
    }

    pub async fn is_linked(&self, owner: OwnerId) -> bool {
        self.user_tokens.read().await.contains_key(&owner)
    }

    /// Resolve a catalog track id (the part after `/track/` in a share link).
    pub async fn lookup_track(&self, catalog_id: &str) -> Result<Track> {
        let token = self.app_access_token().await?;
        let url = format!("{}/tracks/{}", self.api_url, catalog_id);

        tracing::debug!("Looking up Spotify track {}", catalog_id);

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| AppError::Spotify(format!("Request failed: {}", e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND || status == reqwest::StatusCode::BAD_REQUEST {
            return Err(AppError::NotFound(
                "Couldn't find a track with that ID!".to_string(),
            ));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Spotify API error: {} - {}", status, body);
            return Err(AppError::Spotify(format!(
                "API returned status: {} - {}",
                status, body
            )));
        }

        let track: SpotifyTrack = response
            .json()
            .await
            .map_err(|e| AppError::Spotify(format!("Failed to parse response: {}", e)))?;

        Ok(track.into_track(catalog_id))
    }

    /// Client-credentials token for catalog reads, refreshed shortly before expiry.
    async fn app_access_token(&self) -> Result<String> {
        let now = Utc::now();
        if let Some(token) = self.app_token.read().await.as_ref() {
            if token.expires_at > now {
                return Ok(token.access_token.clone());
            }
        }

        let mut slot = self.app_token.write().await;
        // Someone else may have refreshed while we waited for the lock
        if let Some(token) = slot.as_ref() {
            if token.expires_at > now {
                return Ok(token.access_token.clone());
            }
        }

        let response = self
            .client
            .post(format!("{}/api/token", self.accounts_url))
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| AppError::Spotify(format!("Token request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Spotify token error: {} - {}", status, body);
            return Err(AppError::Spotify(format!("Token request returned {}", status)));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::Spotify(format!("Failed to parse token: {}", e)))?;

        let access_token = token.access_token.clone();
        *slot = Some(AppToken {
            access_token: token.access_token,
            expires_at: now + Duration::try_seconds(token.expires_in - 60).unwrap_or_else(Duration::zero),
        });

        Ok(access_token)
    }
}

#[async_trait]
impl PlaybackQueue for SpotifyClient {
    async fn enqueue(&self, owner: OwnerId, track_uri: &str) -> std::result::Result<(), QueueError> {
        let token = self
            .user_tokens
            .read()
            .await
            .get(&owner)
            .cloned()
            .ok_or(QueueError::NotLinked)?;

        let url = format!("{}/me/player/queue", self.api_url);
        let response = self
            .client
            .post(&url)
            .query(&[("uri", track_uri)])
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_LENGTH, 0)
            .send()
            .await
            .map_err(|e| QueueError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(QueueError::Rejected { status, body });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            database_url: String::new(),
            spotify_client_id: "id".to_string(),
            spotify_client_secret: "secret".to_string(),
            spotify_api_url: "http://127.0.0.1:9/v1/".to_string(),
            spotify_accounts_url: "http://127.0.0.1:9".to_string(),
            jwt_secret: String::new(),
            server_host: String::new(),
            server_port: 0,
            default_radius_km: 5.0,
            song_cooldown: Duration::hours(60),
            enqueue_timeout: std::time::Duration::from_secs(1),
        }
    }

    #[tokio::test]
    async fn test_enqueue_requires_linked_account() {
        let client = SpotifyClient::new(&config());
        let result = client.enqueue(1, "spotify:track:abc").await;
        assert!(matches!(result, Err(QueueError::NotLinked)));
    }

    #[tokio::test]
    async fn test_link_and_unlink() {
        let client = SpotifyClient::new(&config());
        client.link_account(1, "token".to_string()).await;
        assert!(client.is_linked(1).await);
        assert!(!client.is_linked(2).await);

        assert!(client.unlink_account(1).await);
        assert!(!client.unlink_account(1).await);
        assert!(!client.is_linked(1).await);
    }

    #[test]
    fn test_track_keeps_linked_id() {
        let body = r#"{
            "id": "6rqhFgbbKwnb9MLmUQDhG6",
            "name": "Speak to Me",
            "artists": [{ "name": "Pink Floyd" }, { "name": "Someone Else" }]
        }"#;
        let response: SpotifyTrack = serde_json::from_str(body).unwrap();

        let track = response.into_track("4uLU6hMCjMI75M1A2tKUQC");

        assert_eq!(track.id, "spotify:track:4uLU6hMCjMI75M1A2tKUQC");
        assert_eq!(track.name, "Speak to Me");
        assert_eq!(track.artist, "Pink Floyd");
    }

    #[test]
    fn test_track_without_artists() {
        let response: SpotifyTrack =
            serde_json::from_str(r#"{ "id": "abc", "name": "Untitled" }"#).unwrap();
        assert_eq!(response.into_track("abc").artist, "");
    }

    #[test]
    fn test_base_urls_trimmed() {
        let client = SpotifyClient::new(&config());
        assert_eq!(client.api_url, "http://127.0.0.1:9/v1");
    }
}
