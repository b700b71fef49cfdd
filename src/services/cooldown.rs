use crate::models::OwnerId;
use crate::services::owner_slots::OwnerSlots;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::OwnedMutexGuard;

/// Map of track id -> suppression expiry for one user
type TrackExpiries = HashMap<String, DateTime<Utc>>;

/// Per-user, per-track suppression window for queued songs.
///
/// A dispatch holds [`OwnerCooldowns`] for its whole run, so two updates from
/// the same user cannot both decide a track is due. A user's slot lives as
/// long as the process: its entries are the suppression record itself.
pub struct CooldownTracker {
    duration: Duration,
    owners: OwnerSlots<TrackExpiries>,
}

/// Exclusive handle on one user's cooldown entries.
pub struct OwnerCooldowns {
    duration: Duration,
    entries: OwnedMutexGuard<TrackExpiries>,
}

impl CooldownTracker {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            owners: OwnerSlots::new(),
        }
    }

    /// Lock one user's entries. Waits for any dispatch already running for them.
    pub async fn lock(&self, owner: OwnerId) -> OwnerCooldowns {
        OwnerCooldowns {
            duration: self.duration,
            entries: self.owners.lock(owner).await,
        }
    }
}

impl OwnerCooldowns {
    pub fn is_suppressed(&self, track_id: &str, now: DateTime<Utc>) -> bool {
        self.entries
            .get(track_id)
            .map_or(false, |expiry| *expiry > now)
    }

    pub fn mark_queued(&mut self, track_id: &str, now: DateTime<Utc>) {
        // Drop expired entries while we hold the lock anyway
        self.entries.retain(|_, expiry| *expiry > now);
        let expiry = now
            .checked_add_signed(self.duration)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.entries.insert(track_id.to_string(), expiry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> CooldownTracker {
        CooldownTracker::new(Duration::seconds(crate::config::SONG_COOLDOWN_SECS))
    }

    #[tokio::test]
    async fn test_unknown_track_not_suppressed() {
        let cooldowns = tracker();
        assert!(!cooldowns.lock(1).await.is_suppressed("spotify:track:a", Utc::now()));
    }

    #[tokio::test]
    async fn test_window_boundaries() {
        let cooldowns = tracker();
        let now = Utc::now();
        cooldowns.lock(1).await.mark_queued("spotify:track:a", now);

        let entries = cooldowns.lock(1).await;
        assert!(entries.is_suppressed("spotify:track:a", now));
        assert!(entries.is_suppressed(
            "spotify:track:a",
            now + Duration::hours(60) - Duration::seconds(1)
        ));
        assert!(!entries.is_suppressed("spotify:track:a", now + Duration::hours(60)));
        assert!(!entries.is_suppressed("spotify:track:a", now + Duration::hours(61)));
    }

    #[tokio::test]
    async fn test_keyed_per_owner_and_track() {
        let cooldowns = tracker();
        let now = Utc::now();
        cooldowns.lock(1).await.mark_queued("spotify:track:a", now);

        assert!(!cooldowns.lock(2).await.is_suppressed("spotify:track:a", now));
        assert!(!cooldowns.lock(1).await.is_suppressed("spotify:track:b", now));
    }

    #[tokio::test]
    async fn test_mark_refreshes_expiry() {
        let cooldowns = tracker();
        let start = Utc::now();
        let mut entries = cooldowns.lock(1).await;
        entries.mark_queued("spotify:track:a", start);

        let later = start + Duration::hours(61);
        entries.mark_queued("spotify:track:a", later);
        assert!(entries.is_suppressed("spotify:track:a", later + Duration::hours(59)));
    }

    #[tokio::test]
    async fn test_expired_entries_collected_on_mark() {
        let cooldowns = tracker();
        let start = Utc::now();
        let mut guard = cooldowns.lock(1).await;
        guard.mark_queued("spotify:track:a", start);
        guard.mark_queued("spotify:track:b", start + Duration::hours(70));

        assert_eq!(guard.entries.len(), 1);
        assert!(guard.entries.contains_key("spotify:track:b"));
    }

    #[tokio::test]
    async fn test_huge_cooldown_saturates() {
        let cooldowns = CooldownTracker::new(Duration::max_value());
        let now = Utc::now();
        let mut entries = cooldowns.lock(1).await;
        entries.mark_queued("spotify:track:a", now);

        assert_eq!(entries.entries["spotify:track:a"], DateTime::<Utc>::MAX_UTC);
        assert!(entries.is_suppressed("spotify:track:a", now + Duration::days(365 * 1000)));
    }
}
