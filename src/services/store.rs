use crate::error::StoreError;
use crate::models::location::RegistrationRow;
use crate::models::Registration;
use async_trait::async_trait;
use sqlx::PgPool;

/// Durable home of committed song drops.
#[async_trait]
pub trait RegistrationStore: Send + Sync {
    async fn load_all(&self) -> Result<Vec<Registration>, StoreError>;

    async fn save(&self, registration: &Registration) -> Result<(), StoreError>;
}

pub struct PgRegistrationStore {
    db: PgPool,
}

impl PgRegistrationStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RegistrationStore for PgRegistrationStore {
    async fn load_all(&self) -> Result<Vec<Registration>, StoreError> {
        let rows: Vec<RegistrationRow> = sqlx::query_as(
            "SELECT owner, lat, lon, radius_km, track_id, track_name, track_artist
             FROM locations
             ORDER BY id",
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Registration::from).collect())
    }

    async fn save(&self, registration: &Registration) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO locations (owner, lat, lon, radius_km, track_id, track_name, track_artist)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(registration.owner)
        .bind(registration.point.lat)
        .bind(registration.point.lon)
        .bind(registration.radius_km)
        .bind(&registration.track.id)
        .bind(&registration.track.name)
        .bind(&registration.track.artist)
        .execute(&self.db)
        .await?;

        Ok(())
    }
}
