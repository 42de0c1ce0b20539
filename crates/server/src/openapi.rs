use utoipa::OpenApi;

use crate::{health, rest};

/// OpenAPI document for the compliance API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "NoticeGuard Compliance API",
        description = "Contract compliance engine for MEP subcontractors: clause extraction, deadline tracking, notice lifecycle, and scoring."
    ),
    paths(
        health::health_check,
        health::compliance_health,
        rest::clause::parse_contract,
        rest::clause::list_clauses,
        rest::clause::get_clause,
        rest::clause::confirm_clause,
        rest::deadline::list_deadlines,
        rest::deadline::create_deadline,
        rest::deadline::get_deadline,
        rest::deadline::waive_deadline,
        rest::deadline::deadline_audit,
        rest::deadline::trigger_rfi,
        rest::deadline::trigger_change_event,
        rest::deadline::check_rfi,
        rest::notice::list_notices,
        rest::notice::create_notice,
        rest::notice::get_notice,
        rest::notice::update_notice,
        rest::notice::delete_notice,
        rest::notice::send_notice,
        rest::notice::confirm_delivery,
        rest::notice::regenerate_notice,
        rest::score::get_score,
        rest::score::recalculate_score,
        rest::score::score_history,
        rest::holiday::list_holidays,
        rest::holiday::create_holiday,
        rest::holiday::delete_holiday,
        rest::search::search_compliance,
        rest::webhook::mailgun_webhook,
    ),
    tags(
        (name = "compliance", description = "Clauses, deadlines, notices, score, holidays, search"),
        (name = "health", description = "Liveness and project health components"),
        (name = "webhooks", description = "Inbound transport events"),
    )
)]
pub struct ApiDoc;

/// GET /api-docs/openapi.json
pub async fn openapi_json() -> axum::Json<utoipa::openapi::OpenApi> {
    axum::Json(ApiDoc::openapi())
}
