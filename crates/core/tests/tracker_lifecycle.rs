//! Tracker lifecycle integration tests.
//!
//! These tests run the real HTTP order source against a fake orders backend
//! and let the background poll loop pick up status changes:
//! lookup -> poll -> status change detected -> callback fired -> stop

use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};
use tokio::sync::{mpsc, RwLock};

use orderwatch_core::{
    HttpOrderSource, OrderSource, OrderStatus, OrdersApiConfig, StatusChange, TicketQuery,
    TrackError, Tracker, TrackerConfig,
};

const MOBILE: &str = "9876543210";

type Upstream = Arc<RwLock<Value>>;

async fn list_orders(State(orders): State<Upstream>) -> Json<Value> {
    Json(orders.read().await.clone())
}

/// Fake orders backend serving whatever JSON is in `orders`.
async fn spawn_upstream(orders: Upstream) -> String {
    let app = Router::new()
        .route("/api/orders", get(list_orders))
        .with_state(orders);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn order_json(ticket_id: &str, timestamps: Value) -> Value {
    json!({
        "_id": "665b1f",
        "ticketId": ticket_id,
        "customer": { "name": "Asha", "mobile": MOBILE },
        "status": "onBoard",
        "statusTimestamps": timestamps,
        "createdAt": "2025-06-01T09:00:00Z"
    })
}

/// Test helper wiring a tracker to a fake backend.
struct TestHarness {
    upstream: Upstream,
    tracker: Tracker,
    updates: mpsc::UnboundedReceiver<(String, Vec<StatusChange>)>,
}

impl TestHarness {
    async fn new() -> Self {
        let upstream: Upstream = Arc::new(RwLock::new(json!([])));
        let base_url = spawn_upstream(Arc::clone(&upstream)).await;

        let source = HttpOrderSource::new(&OrdersApiConfig {
            base_url,
            orders_path: "/api/orders".to_string(),
            timeout_secs: 5,
            api_key: None,
            user_agent: "orderwatch-test".to_string(),
        })
        .expect("Failed to create order source");

        let (tx, updates) = mpsc::unbounded_channel();
        let tracker = Tracker::new(
            TrackerConfig {
                poll_interval_secs: 1,
                ..Default::default()
            },
            Arc::new(source) as Arc<dyn OrderSource>,
        )
        .with_update_callback(Arc::new(move |session_id: &str, changes: &[StatusChange]| {
            let _ = tx.send((session_id.to_string(), changes.to_vec()));
        }));

        Self {
            upstream,
            tracker,
            updates,
        }
    }

    fn ticket_id(&self, suffix: &str) -> String {
        format!("{}-{}", self.tracker.today_prefix(), suffix)
    }

    async fn set_upstream(&self, orders: Value) {
        *self.upstream.write().await = orders;
    }
}

#[tokio::test]
async fn test_poll_loop_detects_status_change() {
    let mut harness = TestHarness::new().await;
    let ticket_id = harness.ticket_id("0042");

    harness
        .set_upstream(json!([order_json(
            &ticket_id,
            json!({ "onBoard": "2025-06-01T09:00:00Z" })
        )]))
        .await;

    let session = harness
        .tracker
        .search(TicketQuery::new("0042", MOBILE))
        .await
        .expect("lookup should match");
    assert_eq!(session.orders.len(), 1);
    assert_eq!(session.orders[0].stage_label(), "OnBoard");

    harness.tracker.start().await;

    harness
        .set_upstream(json!([order_json(
            &ticket_id,
            json!({
                "onBoard": "2025-06-01T09:00:00Z",
                "preparing": "2025-06-01T09:04:00Z"
            })
        )]))
        .await;

    let (session_id, changes) = tokio::time::timeout(Duration::from_secs(5), harness.updates.recv())
        .await
        .expect("poll loop should report the change")
        .expect("callback channel open");

    assert_eq!(session_id, session.id);
    assert_eq!(changes[0].stages, vec![OrderStatus::Preparing]);

    let current = harness.tracker.session(&session.id).await.unwrap();
    assert!(current.new_status_available);
    assert_eq!(current.orders[0].stage_label(), "Preparing");

    let status = harness.tracker.status().await;
    assert!(status.running);
    assert!(status.last_poll_at.is_some());

    let stop_result = tokio::time::timeout(Duration::from_secs(5), harness.tracker.stop()).await;
    assert!(stop_result.is_ok(), "Tracker stop should complete within timeout");
    assert!(!harness.tracker.status().await.running);
}

#[tokio::test]
async fn test_unchanged_upstream_raises_no_update() {
    let mut harness = TestHarness::new().await;
    let ticket_id = harness.ticket_id("0042");

    harness
        .set_upstream(json!([order_json(
            &ticket_id,
            json!({ "onBoard": "2025-06-01T09:00:00Z" })
        )]))
        .await;

    let session = harness
        .tracker
        .search(TicketQuery::new("0042", MOBILE))
        .await
        .unwrap();

    harness.tracker.start().await;
    tokio::time::sleep(Duration::from_millis(2500)).await;
    harness.tracker.stop().await;

    assert!(harness.updates.try_recv().is_err());
    let current = harness.tracker.session(&session.id).await.unwrap();
    assert!(!current.new_status_available);
    assert!(current.last_polled_at.is_some());
}

#[tokio::test]
async fn test_lookup_against_real_source_rejects_other_mobile() {
    let harness = TestHarness::new().await;
    let ticket_id = harness.ticket_id("0042");

    harness
        .set_upstream(json!([order_json(&ticket_id, Value::Null)]))
        .await;

    let result = harness
        .tracker
        .search(TicketQuery::new("0042", "9999999999"))
        .await;
    assert!(matches!(result, Err(TrackError::NoMatch)));

    // null timestamps still match and render as waiting
    let session = harness
        .tracker
        .search(TicketQuery::new("0042", MOBILE))
        .await
        .unwrap();
    assert_eq!(session.orders[0].stage_label(), "Waiting");
}
