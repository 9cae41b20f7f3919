//! Tracker implementation.
//!
//! Owns the live sessions and the poll loop. One upstream fetch per tick is
//! shared by every session; sessions are re-matched against it one by one.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, Utc};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

use crate::config::TrackerConfig;
use crate::matcher::{filter_orders, local_date, offset_from_minutes, ticket_date_prefix, TicketQuery};
use crate::metrics::{LOOKUPS, POLL_TICKS, SESSIONS_ACTIVE, SESSIONS_EXPIRED, STATUS_CHANGES};
use crate::source::{OrderSource, OrderSourceError};

use super::session::{PollOutcome, TrackingSession};
use super::snapshot::StatusChange;
use super::types::{PollSummary, TrackError, TrackerStatus};

/// Callback invoked when a poll finds new statuses for a session.
/// Arguments: session ID and the detected changes.
pub type StatusUpdateCallback = Arc<dyn Fn(&str, &[StatusChange]) + Send + Sync>;

type Sessions = Arc<RwLock<HashMap<String, TrackingSession>>>;

/// Looks up orders for visitors and keeps their sessions up to date.
pub struct Tracker {
    config: TrackerConfig,
    source: Arc<dyn OrderSource>,
    sessions: Sessions,
    update_callback: Option<StatusUpdateCallback>,

    // Runtime state
    running: Arc<AtomicBool>,
    last_poll_at: Arc<RwLock<Option<DateTime<Utc>>>>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Tracker {
    /// Create a new tracker.
    pub fn new(config: TrackerConfig, source: Arc<dyn OrderSource>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            source,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            update_callback: None,
            running: Arc::new(AtomicBool::new(false)),
            last_poll_at: Arc::new(RwLock::new(None)),
            shutdown_tx,
        }
    }

    /// Set a callback that fires when a session gets new statuses.
    pub fn with_update_callback(mut self, callback: StatusUpdateCallback) -> Self {
        self.update_callback = Some(callback);
        self
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Offset used for "today" and displayed times.
    pub fn display_offset(&self) -> FixedOffset {
        offset_from_minutes(self.config.utc_offset_minutes)
    }

    /// Ticket prefix for today in the display offset.
    pub fn today_prefix(&self) -> String {
        ticket_date_prefix(local_date(Utc::now(), self.display_offset()))
    }

    // =========================================================================
    // Lookups and sessions
    // =========================================================================

    /// Look up today's orders for `query` and open a session on success.
    pub async fn search(&self, query: TicketQuery) -> Result<TrackingSession, TrackError> {
        let prefix = self.today_prefix();
        self.search_with_prefix(query, prefix).await
    }

    /// Look up orders for `query` under an explicit date prefix.
    pub async fn search_with_prefix(
        &self,
        query: TicketQuery,
        prefix: String,
    ) -> Result<TrackingSession, TrackError> {
        if let Err(e) = query.validate() {
            LOOKUPS.with_label_values(&["invalid"]).inc();
            return Err(e.into());
        }

        let orders = match self.source.fetch_orders().await {
            Ok(orders) => orders,
            Err(e) => {
                LOOKUPS.with_label_values(&["load_failed"]).inc();
                return Err(TrackError::LoadFailed(e));
            }
        };

        let matched = filter_orders(&orders, &query, &prefix);
        if matched.is_empty() {
            LOOKUPS.with_label_values(&["no_match"]).inc();
            debug!("No orders match {}-{}", prefix, query.suffix.trim());
            return Err(TrackError::NoMatch);
        }

        LOOKUPS.with_label_values(&["matched"]).inc();

        let session = TrackingSession::new(
            uuid::Uuid::new_v4().to_string(),
            query,
            prefix,
            matched,
            Utc::now(),
        );

        let mut sessions = self.sessions.write().await;
        sessions.insert(session.id.clone(), session.clone());
        SESSIONS_ACTIVE.set(sessions.len() as i64);

        info!(
            "Opened tracking session {} for ticket {} ({} orders)",
            session.id,
            session.ticket_id(),
            session.orders.len()
        );

        Ok(session)
    }

    /// Get a session and mark it as seen.
    pub async fn session(&self, id: &str) -> Option<TrackingSession> {
        let mut sessions = self.sessions.write().await;
        sessions.get_mut(id).map(|s| {
            s.touch(Utc::now());
            s.clone()
        })
    }

    /// Acknowledge the "new status" banner on a session.
    pub async fn dismiss(&self, id: &str) -> Result<TrackingSession, TrackError> {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(id) {
            Some(session) => {
                session.dismiss();
                session.touch(Utc::now());
                Ok(session.clone())
            }
            None => Err(TrackError::SessionNotFound(id.to_string())),
        }
    }

    /// Drop a session. Returns whether it existed.
    pub async fn clear(&self, id: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        let removed = sessions.remove(id).is_some();
        SESSIONS_ACTIVE.set(sessions.len() as i64);
        if removed {
            info!("Cleared tracking session {}", id);
        }
        removed
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drop sessions not seen within the TTL as of `now`.
    pub async fn evict_idle(&self, now: DateTime<Utc>) -> usize {
        Self::evict_idle_sessions(&self.sessions, &self.config, now).await
    }

    // =========================================================================
    // Polling
    // =========================================================================

    /// Run one poll tick immediately.
    pub async fn poll_once(&self) -> Result<PollSummary, OrderSourceError> {
        Self::poll_sessions(
            &self.source,
            &self.sessions,
            &self.config,
            &self.update_callback,
            &self.last_poll_at,
        )
        .await
    }

    /// Start the poll loop (spawns a background task).
    pub async fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Tracker already running");
            return;
        }

        info!(
            "Starting tracker (poll every {}s, session ttl {}s)",
            self.config.poll_interval_secs, self.config.session_ttl_secs
        );

        self.spawn_poll_loop();
    }

    /// Stop the poll loop.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Tracker not running");
            return;
        }

        info!("Stopping tracker");
        let _ = self.shutdown_tx.send(());
    }

    /// Get current tracker status.
    pub async fn status(&self) -> TrackerStatus {
        TrackerStatus {
            running: self.running.load(Ordering::Relaxed),
            sessions: self.session_count().await,
            poll_interval_secs: self.config.poll_interval_secs,
            last_poll_at: *self.last_poll_at.read().await,
        }
    }

    fn spawn_poll_loop(&self) {
        let running = Arc::clone(&self.running);
        let source = Arc::clone(&self.source);
        let sessions = Arc::clone(&self.sessions);
        let config = self.config.clone();
        let callback = self.update_callback.clone();
        let last_poll_at = Arc::clone(&self.last_poll_at);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            info!("Poll loop started");
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Poll loop received shutdown signal");
                        break;
                    }
                    _ = tokio::time::sleep(Duration::from_secs(config.poll_interval_secs)) => {
                        if !running.load(Ordering::Relaxed) {
                            break;
                        }
                        if let Err(e) = Self::poll_sessions(
                            &source,
                            &sessions,
                            &config,
                            &callback,
                            &last_poll_at,
                        ).await {
                            warn!("Poll failed, keeping current sessions: {}", e);
                        }
                    }
                }
            }
            info!("Poll loop stopped");
        });
    }

    async fn poll_sessions(
        source: &Arc<dyn OrderSource>,
        sessions: &Sessions,
        config: &TrackerConfig,
        callback: &Option<StatusUpdateCallback>,
        last_poll_at: &Arc<RwLock<Option<DateTime<Utc>>>>,
    ) -> Result<PollSummary, OrderSourceError> {
        let now = Utc::now();
        let expired = Self::evict_idle_sessions(sessions, config, now).await;

        if sessions.read().await.is_empty() {
            POLL_TICKS.with_label_values(&["idle"]).inc();
            return Ok(PollSummary {
                expired,
                ..Default::default()
            });
        }

        let orders = match source.fetch_orders().await {
            Ok(orders) => orders,
            Err(e) => {
                POLL_TICKS.with_label_values(&["fetch_failed"]).inc();
                return Err(e);
            }
        };

        let mut summary = PollSummary {
            expired,
            ..Default::default()
        };
        let mut updates: Vec<(String, Vec<StatusChange>)> = Vec::new();

        {
            let mut sessions = sessions.write().await;

            // Skip sessions opened after this tick started
            for session in sessions.values_mut().filter(|s| s.created_at <= now) {
                summary.sessions += 1;
                match session.apply_poll(&orders, now) {
                    PollOutcome::Unchanged => {}
                    PollOutcome::Changed(changes) => {
                        debug!(
                            "Session {} has {} changed orders",
                            session.id,
                            changes.len()
                        );
                        summary.changed += 1;
                        updates.push((session.id.clone(), changes));
                    }
                    PollOutcome::NoMatch => {
                        debug!("Session {} no longer matches any order", session.id);
                        summary.no_match += 1;
                    }
                }
            }
        }

        *last_poll_at.write().await = Some(now);
        POLL_TICKS.with_label_values(&["ok"]).inc();
        STATUS_CHANGES.inc_by(summary.changed as u64);

        // Notify outside the session lock
        if let Some(callback) = callback {
            for (session_id, changes) in &updates {
                callback(session_id, changes);
            }
        }

        if summary.changed > 0 || summary.no_match > 0 {
            info!(
                "Poll: {} sessions, {} changed, {} lost their match",
                summary.sessions, summary.changed, summary.no_match
            );
        }

        Ok(summary)
    }

    async fn evict_idle_sessions(
        sessions: &Sessions,
        config: &TrackerConfig,
        now: DateTime<Utc>,
    ) -> usize {
        let ttl = i64::try_from(config.session_ttl_secs)
            .ok()
            .and_then(chrono::TimeDelta::try_seconds)
            .unwrap_or(chrono::TimeDelta::MAX);
        let mut sessions = sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_idle(now, ttl));
        let expired = before - sessions.len();

        if expired > 0 {
            info!("Dropped {} idle tracking sessions", expired);
            SESSIONS_EXPIRED.inc_by(expired as u64);
        }
        SESSIONS_ACTIVE.set(sessions.len() as i64);
        expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::OrderStatus;
    use crate::testing::{fixtures, MockOrderSource};
    use std::sync::Mutex;

    const PREFIX: &str = "20250601";

    fn tracker(source: Arc<MockOrderSource>) -> Tracker {
        Tracker::new(TrackerConfig::default(), source)
    }

    #[tokio::test]
    async fn test_search_rejects_bad_mobile_without_fetching() {
        let source = Arc::new(MockOrderSource::new());
        let tracker = tracker(Arc::clone(&source));

        let err = tracker
            .search_with_prefix(TicketQuery::new("0042", "123"), PREFIX.to_string())
            .await
            .unwrap_err();

        assert!(matches!(err, TrackError::Invalid(_)));
        assert_eq!(source.fetch_count().await, 0);
    }

    #[tokio::test]
    async fn test_search_no_match() {
        let source = Arc::new(MockOrderSource::new());
        source
            .set_orders(vec![fixtures::order_with_ticket("1", "20250601-0001", "9876543210")])
            .await;
        let tracker = tracker(Arc::clone(&source));

        let err = tracker
            .search_with_prefix(TicketQuery::new("0042", "9876543210"), PREFIX.to_string())
            .await
            .unwrap_err();

        assert!(matches!(err, TrackError::NoMatch));
        assert_eq!(tracker.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_search_load_failed() {
        let source = Arc::new(MockOrderSource::new());
        source
            .set_next_error(OrderSourceError::ParseError("boom".to_string()))
            .await;
        let tracker = tracker(Arc::clone(&source));

        let err = tracker
            .search_with_prefix(TicketQuery::new("0042", "9876543210"), PREFIX.to_string())
            .await
            .unwrap_err();

        assert!(matches!(err, TrackError::LoadFailed(_)));
    }

    #[tokio::test]
    async fn test_search_opens_session() {
        let source = Arc::new(MockOrderSource::new());
        source
            .set_orders(vec![
                fixtures::order_with_ticket("1", "20250601-0042", "9876543210"),
                fixtures::order_with_ticket("2", "20250601-0043", "9876543210"),
            ])
            .await;
        let tracker = tracker(Arc::clone(&source));

        let session = tracker
            .search_with_prefix(TicketQuery::new("0042", "9876543210"), PREFIX.to_string())
            .await
            .unwrap();

        assert_eq!(session.orders.len(), 1);
        assert_eq!(session.orders[0].id, "1");
        assert!(!session.new_status_available);
        assert_eq!(tracker.session_count().await, 1);

        let fetched = tracker.session(&session.id).await.unwrap();
        assert_eq!(fetched.id, session.id);
    }

    #[tokio::test]
    async fn test_search_uses_today_prefix() {
        let source = Arc::new(MockOrderSource::new());
        let tracker = tracker(Arc::clone(&source));
        let ticket = format!("{}-7", tracker.today_prefix());
        source
            .set_orders(vec![fixtures::order_with_ticket("1", &ticket, "9876543210")])
            .await;

        let session = tracker
            .search(TicketQuery::new("7", "9876543210"))
            .await
            .unwrap();
        assert_eq!(session.ticket_id(), ticket);
    }

    #[tokio::test]
    async fn test_poll_once_idle_skips_fetch() {
        let source = Arc::new(MockOrderSource::new());
        let tracker = tracker(Arc::clone(&source));

        let summary = tracker.poll_once().await.unwrap();
        assert_eq!(summary, PollSummary::default());
        assert_eq!(source.fetch_count().await, 0);
    }

    #[tokio::test]
    async fn test_poll_once_detects_change_and_notifies() {
        let source = Arc::new(MockOrderSource::new());
        let mut order = fixtures::order_with_ticket("1", "20250601-0042", "9876543210");
        source.set_orders(vec![order.clone()]).await;

        let notified: Arc<Mutex<Vec<(String, usize)>>> = Arc::new(Mutex::new(Vec::new()));
        let notified_clone = Arc::clone(&notified);
        let tracker = tracker(Arc::clone(&source)).with_update_callback(Arc::new(
            move |session_id: &str, changes: &[StatusChange]| {
                notified_clone
                    .lock()
                    .unwrap()
                    .push((session_id.to_string(), changes.len()));
            },
        ));

        let session = tracker
            .search_with_prefix(TicketQuery::new("0042", "9876543210"), PREFIX.to_string())
            .await
            .unwrap();

        // Nothing changed yet
        let summary = tracker.poll_once().await.unwrap();
        assert_eq!(summary.sessions, 1);
        assert_eq!(summary.changed, 0);
        assert!(notified.lock().unwrap().is_empty());

        // Kitchen starts preparing
        fixtures::advance(&mut order, OrderStatus::Preparing);
        source.set_orders(vec![order]).await;

        let summary = tracker.poll_once().await.unwrap();
        assert_eq!(summary.changed, 1);
        assert_eq!(
            notified.lock().unwrap().as_slice(),
            &[(session.id.clone(), 1)]
        );

        let updated = tracker.session(&session.id).await.unwrap();
        assert!(updated.new_status_available);
        assert_eq!(updated.orders[0].status, OrderStatus::Preparing);

        let dismissed = tracker.dismiss(&session.id).await.unwrap();
        assert!(!dismissed.new_status_available);

        assert!(tracker.status().await.last_poll_at.is_some());
    }

    #[tokio::test]
    async fn test_poll_once_no_match_on_update() {
        let source = Arc::new(MockOrderSource::new());
        source
            .set_orders(vec![fixtures::order_with_ticket("1", "20250601-0042", "9876543210")])
            .await;
        let tracker = tracker(Arc::clone(&source));

        let session = tracker
            .search_with_prefix(TicketQuery::new("0042", "9876543210"), PREFIX.to_string())
            .await
            .unwrap();

        source.set_orders(vec![]).await;
        let summary = tracker.poll_once().await.unwrap();
        assert_eq!(summary.no_match, 1);

        let updated = tracker.session(&session.id).await.unwrap();
        assert!(updated.orders.is_empty());
        assert_eq!(
            updated.error.as_deref(),
            Some("No matching records found on update.")
        );
    }

    #[tokio::test]
    async fn test_poll_once_fetch_error_keeps_sessions() {
        let source = Arc::new(MockOrderSource::new());
        source
            .set_orders(vec![fixtures::order_with_ticket("1", "20250601-0042", "9876543210")])
            .await;
        let tracker = tracker(Arc::clone(&source));

        let session = tracker
            .search_with_prefix(TicketQuery::new("0042", "9876543210"), PREFIX.to_string())
            .await
            .unwrap();

        source
            .set_next_error(OrderSourceError::ApiError {
                status: 502,
                message: "bad gateway".to_string(),
            })
            .await;
        assert!(tracker.poll_once().await.is_err());

        let unchanged = tracker.session(&session.id).await.unwrap();
        assert_eq!(unchanged.orders.len(), 1);
        assert!(unchanged.error.is_none());
        assert!(tracker.status().await.last_poll_at.is_none());
    }

    #[tokio::test]
    async fn test_clear_and_dismiss_unknown_session() {
        let source = Arc::new(MockOrderSource::new());
        let tracker = tracker(source);

        assert!(!tracker.clear("missing").await);
        assert!(matches!(
            tracker.dismiss("missing").await,
            Err(TrackError::SessionNotFound(_))
        ));
        assert!(tracker.session("missing").await.is_none());
    }

    #[tokio::test]
    async fn test_clear_removes_session() {
        let source = Arc::new(MockOrderSource::new());
        source
            .set_orders(vec![fixtures::order_with_ticket("1", "20250601-0042", "9876543210")])
            .await;
        let tracker = tracker(Arc::clone(&source));

        let session = tracker
            .search_with_prefix(TicketQuery::new("0042", "9876543210"), PREFIX.to_string())
            .await
            .unwrap();

        assert!(tracker.clear(&session.id).await);
        assert_eq!(tracker.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_evict_idle_sessions() {
        let source = Arc::new(MockOrderSource::new());
        source
            .set_orders(vec![fixtures::order_with_ticket("1", "20250601-0042", "9876543210")])
            .await;
        let tracker = Tracker::new(
            TrackerConfig {
                session_ttl_secs: 60,
                ..Default::default()
            },
            source,
        );

        tracker
            .search_with_prefix(TicketQuery::new("0042", "9876543210"), PREFIX.to_string())
            .await
            .unwrap();

        assert_eq!(tracker.evict_idle(Utc::now()).await, 0);
        assert_eq!(
            tracker
                .evict_idle(Utc::now() + chrono::Duration::seconds(120))
                .await,
            1
        );
        assert_eq!(tracker.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_evict_idle_with_huge_ttl_keeps_sessions() {
        let source = Arc::new(MockOrderSource::new());
        source
            .set_orders(vec![fixtures::order_with_ticket("1", "20250601-0042", "9876543210")])
            .await;
        let tracker = Tracker::new(
            TrackerConfig {
                session_ttl_secs: u64::MAX,
                ..Default::default()
            },
            source,
        );

        tracker
            .search_with_prefix(TicketQuery::new("0042", "9876543210"), PREFIX.to_string())
            .await
            .unwrap();

        assert_eq!(tracker.evict_idle(Utc::now()).await, 0);
        assert_eq!(tracker.poll_once().await.unwrap().sessions, 1);
        assert_eq!(tracker.session_count().await, 1);
    }

    #[tokio::test]
    async fn test_poll_skips_session_opened_during_fetch() {
        let source = Arc::new(MockOrderSource::new());
        source
            .set_orders(vec![fixtures::order_with_ticket("1", "20250601-0042", "9876543210")])
            .await;
        let tracker = Arc::new(tracker(Arc::clone(&source)));

        let first = tracker
            .search_with_prefix(TicketQuery::new("0042", "9876543210"), PREFIX.to_string())
            .await
            .unwrap();

        // Poll reads the list without 0043, then stalls
        let hold = source.hold_next_fetch().await;
        let poller = {
            let tracker = Arc::clone(&tracker);
            tokio::spawn(async move { tracker.poll_once().await })
        };
        hold.taken().await;

        source
            .add_order(fixtures::order_with_ticket("2", "20250601-0043", "9876543210"))
            .await;
        let second = tracker
            .search_with_prefix(TicketQuery::new("0043", "9876543210"), PREFIX.to_string())
            .await
            .unwrap();

        hold.release();
        let summary = poller.await.unwrap().unwrap();
        assert_eq!(summary.sessions, 1);
        assert_eq!(summary.no_match, 0);

        let second = tracker.session(&second.id).await.unwrap();
        assert_eq!(second.orders.len(), 1);
        assert!(second.error.is_none());
        assert!(second.last_polled_at.is_none());

        // Next tick sees both sessions against the current list
        let summary = tracker.poll_once().await.unwrap();
        assert_eq!(summary.sessions, 2);
        assert_eq!(summary.no_match, 0);
        assert!(tracker.session(&first.id).await.unwrap().error.is_none());
    }

    #[tokio::test]
    async fn test_start_stop() {
        let source = Arc::new(MockOrderSource::new());
        let tracker = tracker(source);

        tracker.start().await;
        assert!(tracker.status().await.running);

        tracker.stop().await;
        assert!(!tracker.status().await.running);
    }
}
