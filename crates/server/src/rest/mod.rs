pub mod clause;
pub mod deadline;
pub mod holiday;
pub mod notice;
pub mod score;
pub mod search;
pub mod webhook;

use axum::{
    middleware,
    routing::{delete, get, patch, post},
    Router,
};

use crate::db::AppState;
use crate::health;
use crate::rate_limit::{rate_limit_middleware, RateLimitState};

/// Build the REST API router with per-user rate limits: a general window
/// over everything under /api and a tighter one on search.
pub fn api_router() -> Router<AppState> {
    let general = RateLimitState::general();
    let search_limit = RateLimitState::search();

    let search_routes = Router::new()
        .route(
            "/api/projects/{pid}/compliance/search",
            get(search::search_compliance),
        )
        .layer(middleware::from_fn_with_state(search_limit, rate_limit_middleware));

    Router::new()
        // Contract parsing and clauses
        .route("/api/projects/{pid}/compliance/parse-contract", post(clause::parse_contract))
        .route("/api/projects/{pid}/compliance/clauses", get(clause::list_clauses))
        .route("/api/projects/{pid}/compliance/clauses/{cid}", get(clause::get_clause))
        .route("/api/projects/{pid}/compliance/clauses/{cid}/confirm", patch(clause::confirm_clause))
        // Deadlines and triggers
        .route(
            "/api/projects/{pid}/compliance/deadlines",
            get(deadline::list_deadlines).post(deadline::create_deadline),
        )
        .route("/api/projects/{pid}/compliance/deadlines/{did}", get(deadline::get_deadline))
        .route("/api/projects/{pid}/compliance/deadlines/{did}/waive", post(deadline::waive_deadline))
        .route("/api/projects/{pid}/compliance/deadlines/{did}/audit", get(deadline::deadline_audit))
        .route("/api/projects/{pid}/compliance/triggers/rfi", post(deadline::trigger_rfi))
        .route("/api/projects/{pid}/compliance/change-events", post(deadline::trigger_change_event))
        .route("/api/projects/{pid}/compliance/rfis/{rfi_id}/check", get(deadline::check_rfi))
        // Notices
        .route(
            "/api/projects/{pid}/compliance/notices",
            get(notice::list_notices).post(notice::create_notice),
        )
        .route(
            "/api/projects/{pid}/compliance/notices/{nid}",
            get(notice::get_notice)
                .patch(notice::update_notice)
                .delete(notice::delete_notice),
        )
        .route("/api/projects/{pid}/compliance/notices/{nid}/send", post(notice::send_notice))
        .route(
            "/api/projects/{pid}/compliance/notices/{nid}/confirm-delivery",
            post(notice::confirm_delivery),
        )
        .route(
            "/api/projects/{pid}/compliance/notices/{nid}/regenerate",
            post(notice::regenerate_notice),
        )
        // Score
        .route("/api/projects/{pid}/compliance/score", get(score::get_score))
        .route("/api/projects/{pid}/compliance/score/recalculate", post(score::recalculate_score))
        .route("/api/projects/{pid}/compliance/score/history", get(score::score_history))
        // Holidays
        .route(
            "/api/projects/{pid}/compliance/holidays",
            get(holiday::list_holidays).post(holiday::create_holiday),
        )
        .route(
            "/api/projects/{pid}/compliance/holidays/{hid}",
            delete(holiday::delete_holiday),
        )
        // Health component
        .route("/api/projects/{pid}/health/compliance", get(health::compliance_health))
        // Webhooks (no user auth; signature-verified)
        .route("/api/webhooks/mailgun", post(webhook::mailgun_webhook))
        .merge(search_routes)
        .layer(middleware::from_fn_with_state(general, rate_limit_middleware))
}
