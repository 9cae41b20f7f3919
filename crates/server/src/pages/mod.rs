//! Server-rendered customer pages.
//!
//! The lookup form posts back to `/ticket`; a successful lookup redirects to
//! the session page, which reloads itself when the tracker reports a change.

pub mod render;

use axum::{
    extract::{Path, State},
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use orderwatch_core::{matcher::local_date, TicketQuery};

use crate::api::track::error_status;
use crate::state::AppState;
use render::SearchView;

/// Lookup form fields.
#[derive(Debug, Default, Deserialize)]
pub struct SearchForm {
    #[serde(default)]
    pub ticket_suffix: String,
    #[serde(default)]
    pub mobile: String,
}

fn today_label(state: &AppState) -> String {
    local_date(Utc::now(), state.tracker().display_offset())
        .format("%d/%m/%Y")
        .to_string()
}

fn session_path(id: &str) -> String {
    format!("/ticket/session/{}", id)
}

/// GET / - send visitors to the lookup form.
pub async fn index() -> Redirect {
    Redirect::to("/ticket")
}

/// GET /ticket
pub async fn search_form(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(render::search_page(
        state.branding(),
        &today_label(&state),
        &SearchView::default(),
    ))
}

/// GET /ticket/{suffix} - lookup form with the suffix prefilled.
pub async fn search_form_prefilled(
    State(state): State<Arc<AppState>>,
    Path(suffix): Path<String>,
) -> Html<String> {
    Html(render::search_page(
        state.branding(),
        &today_label(&state),
        &SearchView {
            ticket_suffix: &suffix,
            ..Default::default()
        },
    ))
}

/// POST /ticket - run the lookup.
pub async fn submit_search(
    State(state): State<Arc<AppState>>,
    Form(form): Form<SearchForm>,
) -> Response {
    let query = TicketQuery::new(form.ticket_suffix.clone(), form.mobile.clone());
    match state.tracker().search(query).await {
        Ok(session) => Redirect::to(&session_path(&session.id)).into_response(),
        Err(e) => {
            debug!("Lookup failed: {}", e);
            let message = e.to_string();
            let page = render::search_page(
                state.branding(),
                &today_label(&state),
                &SearchView {
                    ticket_suffix: &form.ticket_suffix,
                    mobile: &form.mobile,
                    error: Some(&message),
                },
            );
            (error_status(&e), Html(page)).into_response()
        }
    }
}

/// GET /ticket/session/{id} - live tracking page.
pub async fn session_page(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    let tracker = state.tracker();
    match tracker.session(&id).await {
        Some(session) => Html(render::session_page(
            state.branding(),
            &today_label(&state),
            &session,
            tracker.display_offset(),
            tracker.config().poll_interval_secs,
        ))
        .into_response(),
        None => Redirect::to("/ticket").into_response(),
    }
}

/// POST /ticket/session/{id}/dismiss - hide the banner and show the page again.
pub async fn dismiss(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Redirect {
    match state.tracker().dismiss(&id).await {
        Ok(_) => Redirect::to(&session_path(&id)),
        Err(_) => Redirect::to("/ticket"),
    }
}

/// POST /ticket/session/{id}/clear - stop tracking and return to the form.
pub async fn clear(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Redirect {
    if state.tracker().clear(&id).await {
        state.ws_broadcaster().session_cleared(&id);
    }
    Redirect::to("/ticket")
}
