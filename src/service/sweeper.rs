//! Periodic completion of expired events.
//!
//! The sweep is a catch-up pass: `GET /events/{id}` already derives the
//! status of a single event, so a skipped or delayed tick loses nothing.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::{config::DEFAULT_SWEEP_INTERVAL_SECS, db, errors::ApiError, PGPool};

/// Store side of the sweep: complete every expired, still-open event.
#[async_trait]
pub trait ExpiredEventSweep: Send + Sync {
    async fn complete_expired(&self, now: DateTime<Utc>) -> Result<u64, ApiError>;
}

#[async_trait]
impl ExpiredEventSweep for PGPool {
    async fn complete_expired(&self, now: DateTime<Utc>) -> Result<u64, ApiError> {
        Ok(db::event::complete_expired(now, self).await?)
    }
}

/// One sweep pass at `now`. Returns how many events were completed.
pub async fn sweep_expired_events<S>(store: &S, now: DateTime<Utc>) -> Result<u64, ApiError>
where
    S: ExpiredEventSweep + ?Sized,
{
    let count = store.complete_expired(now).await?;
    if count > 0 {
        info!("sweep completed {} expired events", count);
    } else {
        debug!("sweep found no expired events");
    }
    Ok(count)
}

pub struct Sweeper<S: ExpiredEventSweep> {
    store: Arc<S>,
    interval: Duration,
}

impl<S: ExpiredEventSweep + 'static> Sweeper<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub async fn run_once(&self) -> Result<u64, ApiError> {
        sweep_expired_events(self.store.as_ref(), Utc::now()).await
    }

    /// Spawns the sweep loop. The first pass runs immediately; the loop
    /// stops when [`SweeperHandle::stop`] is called.
    pub fn start(self) -> SweeperHandle {
        let token = CancellationToken::new();
        let cancelled = token.clone();
        info!("event sweeper started (every {}s)", self.interval.as_secs());

        let join = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(err) = self.run_once().await {
                            warn!("event sweep failed, retrying next tick: {}", err);
                        }
                    }
                }
            }
            info!("event sweeper stopped");
        });

        SweeperHandle { token, join }
    }
}

pub struct SweeperHandle {
    token: CancellationToken,
    join: JoinHandle<()>,
}

impl SweeperHandle {
    pub fn is_running(&self) -> bool {
        !self.join.is_finished()
    }

    pub async fn stop(self) {
        self.token.cancel();
        if let Err(err) = self.join.await {
            warn!("event sweeper task ended abnormally: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Event, EventStatus};
    use chrono::Duration as ChronoDuration;
    use std::sync::Mutex;
    use uuid::Uuid;

    /// In-memory store applying the same rule as the SQL sweep.
    #[derive(Default)]
    struct MemoryStore {
        events: Mutex<Vec<Event>>,
        calls: Mutex<usize>,
    }

    impl MemoryStore {
        fn with_events(events: Vec<Event>) -> Self {
            Self {
                events: Mutex::new(events),
                calls: Mutex::new(0),
            }
        }

        fn statuses(&self) -> Vec<EventStatus> {
            self.events.lock().unwrap().iter().map(|e| e.status).collect()
        }
    }

    #[async_trait]
    impl ExpiredEventSweep for MemoryStore {
        async fn complete_expired(&self, now: DateTime<Utc>) -> Result<u64, ApiError> {
            *self.calls.lock().unwrap() += 1;
            let mut events = self.events.lock().unwrap();
            let completed = events
                .iter_mut()
                .map(|e| e.derive_status(now))
                .filter(|changed| *changed)
                .count();
            Ok(completed as u64)
        }
    }

    struct FailingStore;

    #[async_trait]
    impl ExpiredEventSweep for FailingStore {
        async fn complete_expired(&self, _now: DateTime<Utc>) -> Result<u64, ApiError> {
            Err(ApiError::Internal)
        }
    }

    fn event(status: EventStatus, end_time: DateTime<Utc>) -> Event {
        Event {
            event_id: Uuid::new_v4(),
            name: "Sweep me".to_string(),
            description: None,
            start_time: end_time - ChronoDuration::hours(1),
            end_time,
            location: "Room 1".to_string(),
            max_attendees: 5,
            status,
        }
    }

    #[tokio::test]
    async fn sweep_completes_only_expired_open_events() {
        let now = Utc::now();
        let store = MemoryStore::with_events(vec![
            event(EventStatus::Scheduled, now - ChronoDuration::minutes(1)),
            event(EventStatus::Ongoing, now - ChronoDuration::seconds(1)),
            event(EventStatus::Canceled, now - ChronoDuration::days(1)),
            event(EventStatus::Completed, now - ChronoDuration::days(2)),
            event(EventStatus::Scheduled, now),
            event(EventStatus::Scheduled, now + ChronoDuration::hours(1)),
        ]);

        assert_eq!(sweep_expired_events(&store, now).await.unwrap(), 2);
        assert_eq!(
            store.statuses(),
            vec![
                EventStatus::Completed,
                EventStatus::Completed,
                EventStatus::Canceled,
                EventStatus::Completed,
                EventStatus::Scheduled,
                EventStatus::Scheduled,
            ]
        );
    }

    #[tokio::test]
    async fn second_sweep_is_a_no_op() {
        let now = Utc::now();
        let store = MemoryStore::with_events(vec![event(
            EventStatus::Scheduled,
            now - ChronoDuration::minutes(5),
        )]);
        assert_eq!(sweep_expired_events(&store, now).await.unwrap(), 1);
        assert_eq!(sweep_expired_events(&store, now).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn store_errors_are_propagated() {
        assert_eq!(
            sweep_expired_events(&FailingStore, Utc::now()).await,
            Err(ApiError::Internal)
        );
    }

    #[tokio::test]
    async fn sweeper_ticks_until_stopped() {
        let store = Arc::new(MemoryStore::default());
        let handle = Sweeper::new(Arc::clone(&store))
            .with_interval(Duration::from_millis(10))
            .start();
        assert!(handle.is_running());

        tokio::time::sleep(Duration::from_millis(50)).await;
        tokio::time::timeout(Duration::from_secs(1), handle.stop())
            .await
            .expect("sweeper should stop promptly");

        assert!(*store.calls.lock().unwrap() >= 1);
    }

    #[tokio::test]
    async fn failing_sweeps_do_not_stop_the_loop() {
        let handle = Sweeper::new(Arc::new(FailingStore))
            .with_interval(Duration::from_millis(5))
            .start();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(handle.is_running());
        handle.stop().await;
    }

    #[test]
    fn default_interval_is_two_minutes() {
        let sweeper = Sweeper::new(Arc::new(FailingStore));
        assert_eq!(sweeper.interval(), Duration::from_secs(120));
    }
}
