use crate::error::{QueueError, StoreError};
use crate::models::{OwnerId, Point, Track};
use crate::services::cooldown::CooldownTracker;
use crate::services::geodesy;
use crate::services::registry::LocationRegistry;
use crate::services::spotify::PlaybackQueue;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

/// What one location update led to.
#[derive(Debug, Default)]
pub struct DispatchOutcome {
    /// Tracks added to the queue, in registration order
    pub queued: Vec<Track>,
    /// Matching tracks still cooling down for this user
    pub suppressed: Vec<Track>,
    /// Tracks whose enqueue failed; left eligible for the next update
    pub failed: Vec<(Track, QueueError)>,
}

/// Matches a user's position against every song drop and queues what's due.
pub struct ProximityDispatcher {
    registry: Arc<LocationRegistry>,
    cooldowns: Arc<CooldownTracker>,
    queue: Arc<dyn PlaybackQueue>,
    enqueue_timeout: Duration,
}

impl ProximityDispatcher {
    pub fn new(
        registry: Arc<LocationRegistry>,
        cooldowns: Arc<CooldownTracker>,
        queue: Arc<dyn PlaybackQueue>,
        enqueue_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            cooldowns,
            queue,
            enqueue_timeout,
        }
    }

    /// Drops whose radius strictly contains `point`, from any owner.
    pub async fn nearby(&self, point: Point) -> Result<Vec<Track>, StoreError> {
        let registrations = self.registry.all().await?;
        Ok(registrations
            .iter()
            .filter(|reg| geodesy::within_radius(reg.point, reg.radius_km, point))
            .map(|reg| reg.track.clone())
            .collect())
    }

    pub async fn on_location_update(
        &self,
        owner: OwnerId,
        point: Point,
        now: DateTime<Utc>,
    ) -> Result<DispatchOutcome, StoreError> {
        let nearby = self.nearby(point).await?;
        let mut outcome = DispatchOutcome::default();
        if nearby.is_empty() {
            return Ok(outcome);
        }

        tracing::debug!("User {} at {} is within {} drop(s)", owner, point, nearby.len());

        // Held for the whole batch: a second update from this user waits here
        let mut cooldowns = self.cooldowns.lock(owner).await;

        for track in nearby {
            if cooldowns.is_suppressed(&track.id, now) {
                outcome.suppressed.push(track);
                continue;
            }

            let attempt = tokio::time::timeout(self.enqueue_timeout, self.queue.enqueue(owner, &track.id)).await;
            match attempt {
                Ok(Ok(())) => {
                    cooldowns.mark_queued(&track.id, now);
                    tracing::info!("Queued '{}' by {} for user {}", track.name, track.artist, owner);
                    outcome.queued.push(track);
                }
                Ok(Err(e)) => {
                    tracing::warn!("Failed to queue '{}' for user {}: {}", track.name, owner, e);
                    outcome.failed.push((track, e));
                }
                Err(_) => {
                    tracing::warn!("Timed out queueing '{}' for user {}", track.name, owner);
                    outcome.failed.push((track, QueueError::Timeout));
                }
            }
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Registration;
    use crate::services::store::memory::MemoryStore;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// Records every enqueue; fails for the configured track ids.
    #[derive(Default)]
    struct RecordingQueue {
        calls: Mutex<Vec<(OwnerId, String)>>,
        failing: Mutex<HashSet<String>>,
        hang: bool,
    }

    impl RecordingQueue {
        fn calls(&self) -> Vec<(OwnerId, String)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PlaybackQueue for RecordingQueue {
        async fn enqueue(&self, owner: OwnerId, track_uri: &str) -> Result<(), QueueError> {
            self.calls.lock().unwrap().push((owner, track_uri.to_string()));
            if self.hang {
                std::future::pending::<()>().await;
            }
            if self.failing.lock().unwrap().contains(track_uri) {
                return Err(QueueError::Rejected {
                    status: 404,
                    body: "no active device".to_string(),
                });
            }
            Ok(())
        }
    }

    fn track(id: &str) -> Track {
        Track::from_catalog_id(id, id.to_uppercase(), "Artist".to_string())
    }

    fn drop_at(owner: OwnerId, point: Point, radius_km: f64, id: &str) -> Registration {
        Registration {
            owner,
            point,
            radius_km,
            track: track(id),
        }
    }

    fn dispatcher(registrations: Vec<Registration>, queue: Arc<RecordingQueue>) -> ProximityDispatcher {
        let registry = Arc::new(LocationRegistry::new(Arc::new(MemoryStore::with_rows(registrations))));
        let cooldowns = Arc::new(CooldownTracker::new(chrono::Duration::hours(60)));
        ProximityDispatcher::new(registry, cooldowns, queue, Duration::from_millis(50))
    }

    const CENTER: Point = Point { lat: 10.0, lon: 10.0 };
    // ~4.87 km north of CENTER
    const NEAR: Point = Point { lat: 10.044, lon: 10.0 };

    #[tokio::test]
    async fn test_queues_once_within_cooldown() {
        assert!(geodesy::distance_km(NEAR, CENTER) < 5.0);
        assert!(geodesy::distance_km(NEAR, CENTER) > 4.8);

        let queue = Arc::new(RecordingQueue::default());
        let dispatcher = dispatcher(vec![drop_at(1, CENTER, 5.0, "x")], queue.clone());
        let now = Utc::now();

        let first = dispatcher.on_location_update(2, NEAR, now).await.unwrap();
        assert_eq!(first.queued, vec![track("x")]);

        let second = dispatcher
            .on_location_update(2, NEAR, now + chrono::Duration::minutes(1))
            .await
            .unwrap();
        assert!(second.queued.is_empty());
        assert_eq!(second.suppressed, vec![track("x")]);
        assert_eq!(queue.calls(), vec![(2, "spotify:track:x".to_string())]);
    }

    #[tokio::test]
    async fn test_requeued_after_cooldown_expires() {
        let queue = Arc::new(RecordingQueue::default());
        let dispatcher = dispatcher(vec![drop_at(1, CENTER, 5.0, "x")], queue.clone());
        let now = Utc::now();

        dispatcher.on_location_update(2, NEAR, now).await.unwrap();
        let later = dispatcher
            .on_location_update(2, NEAR, now + chrono::Duration::hours(60))
            .await
            .unwrap();

        assert_eq!(later.queued, vec![track("x")]);
        assert_eq!(queue.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_exact_radius_does_not_match() {
        let radius = geodesy::distance_km(NEAR, CENTER);
        let queue = Arc::new(RecordingQueue::default());
        let dispatcher = dispatcher(vec![drop_at(1, CENTER, radius, "x")], queue.clone());

        let outcome = dispatcher.on_location_update(2, NEAR, Utc::now()).await.unwrap();

        assert!(outcome.queued.is_empty());
        assert!(queue.calls().is_empty());
    }

    #[tokio::test]
    async fn test_matches_any_owner_and_cooldown_is_per_receiver() {
        let queue = Arc::new(RecordingQueue::default());
        let dispatcher = dispatcher(vec![drop_at(1, CENTER, 5.0, "x")], queue.clone());
        let now = Utc::now();

        let own = dispatcher.on_location_update(1, NEAR, now).await.unwrap();
        let other = dispatcher.on_location_update(2, NEAR, now).await.unwrap();

        assert_eq!(own.queued, vec![track("x")]);
        assert_eq!(other.queued, vec![track("x")]);
    }

    #[tokio::test]
    async fn test_far_away_matches_nothing() {
        let queue = Arc::new(RecordingQueue::default());
        let dispatcher = dispatcher(vec![drop_at(1, CENTER, 5.0, "x")], queue.clone());

        let outcome = dispatcher
            .on_location_update(2, Point::new(-33.86, 151.21), Utc::now())
            .await
            .unwrap();

        assert!(outcome.queued.is_empty() && outcome.suppressed.is_empty() && outcome.failed.is_empty());
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_going() {
        let queue = Arc::new(RecordingQueue::default());
        queue.failing.lock().unwrap().insert("spotify:track:a".to_string());
        let dispatcher = dispatcher(
            vec![drop_at(1, CENTER, 5.0, "a"), drop_at(3, CENTER, 5.0, "b")],
            queue.clone(),
        );
        let now = Utc::now();

        let outcome = dispatcher.on_location_update(2, NEAR, now).await.unwrap();
        assert_eq!(outcome.queued, vec![track("b")]);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].0, track("a"));

        // The failed one is retried on the next update, the queued one is not
        queue.failing.lock().unwrap().clear();
        let retry = dispatcher
            .on_location_update(2, NEAR, now + chrono::Duration::seconds(30))
            .await
            .unwrap();
        assert_eq!(retry.queued, vec![track("a")]);
        assert_eq!(retry.suppressed, vec![track("b")]);
    }

    #[tokio::test]
    async fn test_enqueue_timeout_reported() {
        let queue = Arc::new(RecordingQueue {
            hang: true,
            ..Default::default()
        });
        let dispatcher = dispatcher(vec![drop_at(1, CENTER, 5.0, "x")], queue.clone());

        let outcome = dispatcher.on_location_update(2, NEAR, Utc::now()).await.unwrap();

        assert!(outcome.queued.is_empty());
        assert!(matches!(outcome.failed[0].1, QueueError::Timeout));
    }

    #[tokio::test]
    async fn test_same_track_in_two_drops_queued_once() {
        let queue = Arc::new(RecordingQueue::default());
        let dispatcher = dispatcher(
            vec![drop_at(1, CENTER, 5.0, "x"), drop_at(3, NEAR, 1.0, "x")],
            queue.clone(),
        );

        let outcome = dispatcher.on_location_update(2, NEAR, Utc::now()).await.unwrap();

        assert_eq!(outcome.queued, vec![track("x")]);
        assert_eq!(outcome.suppressed, vec![track("x")]);
        assert_eq!(queue.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_updates_from_one_user_queue_once() {
        let queue = Arc::new(RecordingQueue::default());
        let dispatcher = Arc::new(dispatcher(vec![drop_at(1, CENTER, 5.0, "x")], queue.clone()));
        let now = Utc::now();

        let updates = (0..5).map(|_| {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move { dispatcher.on_location_update(2, NEAR, now).await.unwrap() })
        });
        let outcomes = futures::future::join_all(updates).await;

        let queued: usize = outcomes.iter().map(|o| o.as_ref().unwrap().queued.len()).sum();
        assert_eq!(queued, 1);
        assert_eq!(queue.calls().len(), 1);
    }
}
