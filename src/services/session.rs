use crate::error::{AppError, Result};
use crate::models::{OwnerId, PendingEntry, Point, Registration, Track};
use crate::services::owner_slots::OwnerSlots;
use crate::services::registry::LocationRegistry;
use std::sync::Arc;

/// Drives each user's multi-step song drop registration.
///
/// A user has at most one open draft. `begin` replaces any existing one,
/// field setters need an open draft, and `commit` only closes it once the
/// registration is durably stored.
pub struct SessionManager {
    registry: Arc<LocationRegistry>,
    default_radius_km: f64,
    drafts: OwnerSlots<Option<PendingEntry>>,
}

impl SessionManager {
    pub fn new(registry: Arc<LocationRegistry>, default_radius_km: f64) -> Self {
        Self {
            registry,
            default_radius_km,
            drafts: OwnerSlots::new(),
        }
    }

    pub async fn begin(&self, owner: OwnerId) {
        let mut draft = self.drafts.lock(owner).await;
        if draft.is_some() {
            tracing::debug!("Discarding unfinished draft for user {}", owner);
        }
        *draft = Some(PendingEntry::default());
    }

    pub async fn set_point(&self, owner: OwnerId, point: Point) -> Result<PendingEntry> {
        self.update(owner, |entry| entry.point = Some(point)).await
    }

    pub async fn set_radius(&self, owner: OwnerId, radius_km: f64) -> Result<PendingEntry> {
        self.update(owner, |entry| entry.radius_km = Some(radius_km)).await
    }

    pub async fn set_track(&self, owner: OwnerId, track: Track) -> Result<PendingEntry> {
        self.update(owner, move |entry| entry.track = Some(track)).await
    }

    /// Whether the user currently has an open draft.
    pub async fn is_open(&self, owner: OwnerId) -> bool {
        let open = self.drafts.lock(owner).await.is_some();
        if !open {
            self.drafts.release_if(owner, Option::is_none).await;
        }
        open
    }

    /// Validate and persist the open draft.
    ///
    /// On validation or store failure the draft stays open so the user can
    /// fix it or retry.
    pub async fn commit(&self, owner: OwnerId) -> Result<Registration> {
        let mut draft = self.drafts.lock(owner).await;
        let entry = draft.as_ref().ok_or(AppError::NoSession)?;

        let registration = entry.finish(owner, self.default_radius_km)?;
        self.registry.append(registration.clone()).await?;
        *draft = None;
        drop(draft);
        self.drafts.release_if(owner, Option::is_none).await;

        tracing::info!(
            "User {} dropped '{}' at {} ({} km)",
            owner,
            registration.track.name,
            registration.point,
            registration.radius_km
        );

        Ok(registration)
    }

    async fn update<F>(&self, owner: OwnerId, apply: F) -> Result<PendingEntry>
    where
        F: FnOnce(&mut PendingEntry),
    {
        let mut draft = self.drafts.lock(owner).await;
        let entry = draft.as_mut().ok_or(AppError::NoSession)?;
        apply(entry);
        Ok(entry.clone())
    }
}
