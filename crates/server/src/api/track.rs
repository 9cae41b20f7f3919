//! Order tracking API handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use orderwatch_core::{Order, OrderStatus, TicketQuery, Timeline, TrackError, TrackingSession};

use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for starting a lookup
#[derive(Debug, Deserialize)]
pub struct TrackBody {
    /// Ticket suffix (the part after the date)
    pub suffix: String,
    /// Mobile number on the order
    pub mobile: String,
}

/// One order with its display fields
#[derive(Debug, Serialize)]
pub struct OrderView {
    pub id: String,
    pub ticket_id: String,
    pub customer_name: String,
    pub mobile: String,
    pub status: OrderStatus,
    /// Chip text derived from the stage timestamps
    pub stage: String,
    pub total_time: String,
    pub timeline: Timeline,
}

impl OrderView {
    pub fn new(order: &Order, offset: FixedOffset) -> Self {
        Self {
            id: order.id.clone(),
            ticket_id: order.ticket_id.clone(),
            customer_name: order.customer.name.clone(),
            mobile: order.customer.mobile.clone(),
            status: order.status,
            stage: order.stage_label().to_string(),
            total_time: order.total_time(),
            timeline: Timeline::for_order(order, offset),
        }
    }
}

/// Response for session operations
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub id: String,
    pub ticket_id: String,
    pub new_status_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub orders: Vec<OrderView>,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_polled_at: Option<String>,
}

impl SessionResponse {
    pub fn new(session: &TrackingSession, offset: FixedOffset) -> Self {
        Self {
            id: session.id.clone(),
            ticket_id: session.ticket_id(),
            new_status_available: session.new_status_available,
            error: session.error.clone(),
            orders: session
                .orders
                .iter()
                .map(|o| OrderView::new(o, offset))
                .collect(),
            created_at: session.created_at.to_rfc3339(),
            last_polled_at: session.last_polled_at.map(|t| t.to_rfc3339()),
        }
    }
}

/// Error response
#[derive(Debug, Serialize)]
pub struct TrackErrorResponse {
    pub error: String,
}

/// HTTP status for a tracking error.
pub fn error_status(err: &TrackError) -> StatusCode {
    match err {
        TrackError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
        TrackError::NoMatch | TrackError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        TrackError::LoadFailed(_) => StatusCode::BAD_GATEWAY,
    }
}

fn error_response(err: TrackError) -> (StatusCode, Json<TrackErrorResponse>) {
    (
        error_status(&err),
        Json(TrackErrorResponse {
            error: err.to_string(),
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// Look up an order and open a tracking session
pub async fn start_tracking(
    State(state): State<Arc<AppState>>,
    Json(body): Json<TrackBody>,
) -> Result<(StatusCode, Json<SessionResponse>), impl IntoResponse> {
    let tracker = state.tracker();
    match tracker
        .search(TicketQuery::new(body.suffix, body.mobile))
        .await
    {
        Ok(session) => Ok((
            StatusCode::CREATED,
            Json(SessionResponse::new(&session, tracker.display_offset())),
        )),
        Err(e) => Err(error_response(e)),
    }
}

/// Get a tracking session by ID
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, impl IntoResponse> {
    let tracker = state.tracker();
    match tracker.session(&id).await {
        Some(session) => Ok(Json(SessionResponse::new(
            &session,
            tracker.display_offset(),
        ))),
        None => Err(error_response(TrackError::SessionNotFound(id))),
    }
}

/// Acknowledge the "new status" notification
pub async fn dismiss(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, impl IntoResponse> {
    let tracker = state.tracker();
    match tracker.dismiss(&id).await {
        Ok(session) => Ok(Json(SessionResponse::new(
            &session,
            tracker.display_offset(),
        ))),
        Err(e) => Err(error_response(e)),
    }
}

/// Stop tracking and drop the session
pub async fn clear_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, impl IntoResponse> {
    if state.tracker().clear(&id).await {
        state.ws_broadcaster().session_cleared(&id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(error_response(TrackError::SessionNotFound(id)))
    }
}
