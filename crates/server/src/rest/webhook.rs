use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use shared_types::AppError;

use crate::compliance::now_utc;
use crate::config::settings;
use crate::email::verify_webhook_signature;
use crate::error_convert::sqlx_to_app_error;
use crate::repo;

/// Mailgun event webhook payload (the parts we consume).
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct MailgunWebhook {
    pub signature: MailgunSignature,
    #[serde(rename = "event-data")]
    pub event_data: MailgunEventData,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct MailgunSignature {
    pub timestamp: String,
    pub token: String,
    pub signature: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct MailgunEventData {
    pub event: String,
    #[serde(rename = "user-variables", default)]
    pub user_variables: serde_json::Value,
}

/// POST /api/webhooks/mailgun
///
/// Records transport-confirmed delivery for notice emails. Signature
/// verification uses the webhook signing key; unsigned or unknown events
/// are acknowledged and dropped.
#[utoipa::path(
    post,
    path = "/api/webhooks/mailgun",
    responses(
        (status = 200, description = "Event processed"),
        (status = 401, description = "Bad signature", body = AppError)
    ),
    tag = "webhooks"
)]
pub async fn mailgun_webhook(
    State(pool): State<Pool<Postgres>>,
    Json(payload): Json<MailgunWebhook>,
) -> Result<StatusCode, AppError> {
    let Some(signing_key) = settings().mailgun_webhook_signing_key.as_deref() else {
        tracing::warn!("Mailgun webhook received but no signing key configured");
        return Ok(StatusCode::OK);
    };

    if !verify_webhook_signature(
        signing_key,
        &payload.signature.timestamp,
        &payload.signature.token,
        &payload.signature.signature,
    ) {
        return Err(AppError::unauthorized("Invalid webhook signature"));
    }

    if payload.event_data.event != "delivered" {
        return Ok(StatusCode::OK);
    }

    let notice_id = payload
        .event_data
        .user_variables
        .get("notice-id")
        .and_then(|v| v.as_str())
        .and_then(|s| Uuid::parse_str(s).ok());

    if let Some(notice_id) = notice_id {
        let mut conn = pool.acquire().await.map_err(sqlx_to_app_error)?;
        let recorded = repo::notice::record_email_delivery(&mut conn, notice_id, now_utc()).await?;
        if recorded {
            tracing::info!(notice_id = %notice_id, "Recorded email delivery from webhook");
        }
    }

    Ok(StatusCode::OK)
}
