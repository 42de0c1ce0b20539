//! Clause extractor: pulls notice-bearing clauses out of contract text with
//! the language model, validates the structured result, and replaces any
//! prior extraction for the same document.

use serde_json::{json, Value};
use sqlx::PgPool;
use uuid::Uuid;

use shared_types::{
    is_valid_clause_kind, is_valid_deadline_type, is_valid_notice_method, AppError, ContractClause,
    NewAuditEntry, User,
};

use crate::error_convert::sqlx_to_app_error;
use crate::repo::{self, clause::NewClause};
use crate::{ai, repo::document};

use super::now_utc;
use super::prompts::{contract_extraction_user, CONTRACT_EXTRACTION_SYSTEM};

/// Extraction uses the large model tier with a generous budget.
const EXTRACTION_MODEL_TIER: &str = "opus";
const EXTRACTION_MAX_TOKENS: u32 = 8000;
const EXTRACTION_TEMPERATURE: f32 = 0.1;
const EXTRACTION_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(300);

/// Document text cap; overflow is truncated with an explicit marker.
const MAX_DOCUMENT_CHARS: usize = 100_000;
const TRUNCATION_MARKER: &str = "\n\n[... truncated ...]";

/// Concatenate chunk texts, capping at the document budget.
fn assemble_document_text(chunks: &[String]) -> String {
    let mut text = chunks.join("\n\n");
    if text.len() > MAX_DOCUMENT_CHARS {
        let mut cut = MAX_DOCUMENT_CHARS;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        text.truncate(cut);
        text.push_str(TRUNCATION_MARKER);
    }
    text
}

/// Parse the model response into raw clause objects, tolerantly:
/// code fences are stripped, both a bare array and `{ "clauses": [...] }`
/// are accepted, and as a last resort the outermost `[...]` substring is
/// tried.
fn parse_clause_json(content: &str) -> Vec<Value> {
    let mut text = content.trim().to_string();
    if text.starts_with("```") {
        text = text
            .lines()
            .filter(|line| !line.trim_start().starts_with("```"))
            .collect::<Vec<_>>()
            .join("\n");
    }

    if let Ok(parsed) = serde_json::from_str::<Value>(&text) {
        match parsed {
            Value::Array(items) => return items,
            Value::Object(mut map) => {
                if let Some(Value::Array(items)) = map.remove("clauses") {
                    return items;
                }
                return Vec::new();
            }
            _ => return Vec::new(),
        }
    }

    if let (Some(start), Some(end)) = (text.find('['), text.rfind(']')) {
        if end > start {
            if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(&text[start..=end]) {
                return items;
            }
        }
    }

    tracing::error!("Failed to parse clause extraction response");
    Vec::new()
}

fn string_field(raw: &Value, key: &str) -> Option<String> {
    raw.get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

/// Coerce a numeric-ish field to i32; anything else becomes null.
fn safe_int(raw: &Value, key: &str) -> Option<i32> {
    match raw.get(key) {
        Some(Value::Number(n)) => n.as_i64().and_then(|v| i32::try_from(v).ok()),
        Some(Value::String(s)) => s.trim().parse::<i32>().ok(),
        _ => None,
    }
}

/// Validate one raw clause object. The kind must be in the closed set and
/// title/content must be non-empty; invalid optional enums are silently
/// nulled.
fn build_clause(
    raw: &Value,
    project_id: Uuid,
    document_id: Uuid,
    model: &str,
) -> Option<NewClause> {
    let kind = string_field(raw, "kind")?;
    if !is_valid_clause_kind(&kind) {
        tracing::warn!(kind = %kind, "Invalid clause kind");
        return None;
    }

    let title = string_field(raw, "title")?;
    let content = string_field(raw, "content")?;

    let notice_method = string_field(raw, "noticeMethod").filter(|m| is_valid_notice_method(m));
    let deadline_type = string_field(raw, "deadlineType").filter(|t| is_valid_deadline_type(t));
    let cure_period_type = string_field(raw, "curePeriodType").filter(|t| is_valid_deadline_type(t));

    Some(NewClause {
        project_id,
        kind,
        title,
        content,
        section_ref: string_field(raw, "sectionRef"),
        deadline_days: safe_int(raw, "deadlineDays"),
        deadline_type,
        notice_method,
        trigger: string_field(raw, "trigger"),
        cure_period_days: safe_int(raw, "curePeriodDays"),
        cure_period_type,
        flow_down_provisions: string_field(raw, "flowDownProvisions"),
        parent_clause_ref: string_field(raw, "parentClauseRef"),
        requires_review: raw.get("requiresReview").and_then(|v| v.as_bool()).unwrap_or(false),
        review_reason: string_field(raw, "reviewReason"),
        ai_extracted: true,
        ai_model: Some(model.to_string()),
        source_doc_id: Some(document_id),
    })
}

/// Extract compliance clauses from a parsed document.
///
/// Re-extraction replaces earlier AI-extracted clauses for the same source
/// document. An empty result after validation is success, not an error.
pub async fn extract_clauses(
    pool: &PgPool,
    project_id: Uuid,
    document_id: Uuid,
    user: &User,
) -> Result<Vec<ContractClause>, AppError> {
    let mut conn = pool.acquire().await.map_err(sqlx_to_app_error)?;

    let doc = document::find_by_id(&mut conn, project_id, document_id)
        .await?
        .ok_or_else(|| {
            AppError::bad_request(format!("Document {} not found in project", document_id))
        })?;

    let chunks = document::chunk_texts(&mut conn, document_id).await?;
    if chunks.is_empty() {
        return Err(AppError::bad_request(format!(
            "Document {} has no text chunks",
            document_id
        )));
    }
    drop(conn);

    let document_text = assemble_document_text(&chunks);
    let user_prompt = contract_extraction_user(
        &doc.name,
        doc.doc_type.as_deref().unwrap_or("CONTRACT"),
        &document_text,
    );

    // Model call happens before the transaction opens.
    let response = ai::generate_response(
        CONTRACT_EXTRACTION_SYSTEM,
        &user_prompt,
        EXTRACTION_MODEL_TIER,
        EXTRACTION_MAX_TOKENS,
        EXTRACTION_TEMPERATURE,
        EXTRACTION_TIMEOUT,
    )
    .await?;

    let raw_clauses = parse_clause_json(&response.content);
    let validated: Vec<NewClause> = raw_clauses
        .iter()
        .filter_map(|raw| build_clause(raw, project_id, document_id, &response.model))
        .collect();

    if validated.is_empty() {
        tracing::warn!(document_id = %document_id, "No clauses extracted from document");
    }

    let mut tx = pool.begin().await.map_err(sqlx_to_app_error)?;

    let replaced = repo::clause::delete_ai_extracted(&mut tx, project_id, document_id).await?;
    let mut created = Vec::with_capacity(validated.len());
    for clause in &validated {
        created.push(repo::clause::insert(&mut tx, clause).await?);
    }

    repo::audit::append(
        &mut tx,
        NewAuditEntry::system(
            project_id,
            "CLAUSE_EXTRACTION",
            "Document",
            document_id.to_string(),
            "extract_clauses",
            json!({
                "documentName": doc.name,
                "clausesExtracted": created.len(),
                "clausesReplaced": replaced,
                "model": response.model,
                "tokensUsed": {
                    "input": response.input_tokens,
                    "output": response.output_tokens,
                },
            }),
        )
        .by_ai(),
    )
    .await?;

    tx.commit().await.map_err(sqlx_to_app_error)?;

    tracing::info!(
        document_id = %document_id,
        project_id = %project_id,
        count = created.len(),
        user_id = %user.id,
        "Extracted clauses from document"
    );

    Ok(created)
}

/// Confirm a clause as reviewed and accurate. A one-way latch that clears
/// the review flag.
pub async fn confirm_clause(
    pool: &PgPool,
    project_id: Uuid,
    clause_id: Uuid,
    user: &User,
) -> Result<ContractClause, AppError> {
    let mut tx = pool.begin().await.map_err(sqlx_to_app_error)?;

    let clause = repo::clause::confirm(&mut tx, project_id, clause_id, user.id, now_utc())
        .await?
        .ok_or_else(|| AppError::not_found(format!("Clause {} not found", clause_id)))?;

    repo::audit::append(
        &mut tx,
        NewAuditEntry::system(
            project_id,
            "CLAUSE_CONFIRMED",
            "ContractClause",
            clause_id.to_string(),
            "confirm_clause",
            json!({ "clauseTitle": clause.title, "clauseKind": clause.kind }),
        )
        .by_user(Some(user.id)),
    )
    .await?;

    tx.commit().await.map_err(sqlx_to_app_error)?;
    Ok(clause)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_bare_array() {
        let raw = r#"[{"kind": "CLAIMS_PROCEDURE", "title": "t", "content": "c"}]"#;
        assert_eq!(parse_clause_json(raw).len(), 1);
    }

    #[test]
    fn parses_fenced_array() {
        let raw = "```json\n[{\"kind\": \"RETENTION\", \"title\": \"t\", \"content\": \"c\"}]\n```";
        assert_eq!(parse_clause_json(raw).len(), 1);
    }

    #[test]
    fn parses_object_with_clauses_field() {
        let raw = r#"{"clauses": [{"kind": "WARRANTY"}, {"kind": "SAFETY"}]}"#;
        assert_eq!(parse_clause_json(raw).len(), 2);
    }

    #[test]
    fn recovers_embedded_array() {
        let raw = "Here are the clauses I found:\n[{\"kind\": \"INSURANCE\", \"title\": \"t\", \"content\": \"c\"}]\nLet me know if you need more.";
        assert_eq!(parse_clause_json(raw).len(), 1);
    }

    #[test]
    fn garbage_parses_to_empty() {
        assert!(parse_clause_json("no json here").is_empty());
        assert!(parse_clause_json("{\"other\": 1}").is_empty());
        assert!(parse_clause_json("42").is_empty());
    }

    fn raw_clause(kind: &str) -> Value {
        json!({
            "kind": kind,
            "title": "Claims Procedure",
            "content": "Claims shall be submitted within ten days.",
            "sectionRef": "Article 14.2",
            "deadlineDays": 10,
            "deadlineType": "CALENDAR_DAYS",
            "noticeMethod": "WRITTEN_NOTICE",
            "requiresReview": false
        })
    }

    #[test]
    fn builds_valid_clause() {
        let clause = build_clause(&raw_clause("CLAIMS_PROCEDURE"), Uuid::nil(), Uuid::nil(), "m").unwrap();
        assert_eq!(clause.kind, "CLAIMS_PROCEDURE");
        assert_eq!(clause.deadline_days, Some(10));
        assert_eq!(clause.deadline_type.as_deref(), Some("CALENDAR_DAYS"));
        assert!(clause.ai_extracted);
    }

    #[test]
    fn rejects_unknown_kind() {
        assert!(build_clause(&raw_clause("HANDSHAKE"), Uuid::nil(), Uuid::nil(), "m").is_none());
    }

    #[test]
    fn rejects_empty_title_or_content() {
        let mut raw = raw_clause("RETENTION");
        raw["title"] = json!("");
        assert!(build_clause(&raw, Uuid::nil(), Uuid::nil(), "m").is_none());

        let mut raw = raw_clause("RETENTION");
        raw["content"] = json!(null);
        assert!(build_clause(&raw, Uuid::nil(), Uuid::nil(), "m").is_none());
    }

    #[test]
    fn invalid_optional_enums_are_nulled() {
        let mut raw = raw_clause("RETENTION");
        raw["noticeMethod"] = json!("CARRIER_PIGEON");
        raw["deadlineType"] = json!("FORTNIGHTS");
        let clause = build_clause(&raw, Uuid::nil(), Uuid::nil(), "m").unwrap();
        assert_eq!(clause.notice_method, None);
        assert_eq!(clause.deadline_type, None);
    }

    #[test]
    fn non_numeric_integers_become_null() {
        let mut raw = raw_clause("RETENTION");
        raw["deadlineDays"] = json!("about ten");
        let clause = build_clause(&raw, Uuid::nil(), Uuid::nil(), "m").unwrap();
        assert_eq!(clause.deadline_days, None);

        let mut raw = raw_clause("RETENTION");
        raw["deadlineDays"] = json!("14");
        let clause = build_clause(&raw, Uuid::nil(), Uuid::nil(), "m").unwrap();
        assert_eq!(clause.deadline_days, Some(14));
    }

    #[test]
    fn truncation_appends_marker() {
        let chunks = vec!["a".repeat(60_000), "b".repeat(60_000)];
        let text = assemble_document_text(&chunks);
        assert!(text.ends_with(TRUNCATION_MARKER));
        assert!(text.len() <= MAX_DOCUMENT_CHARS + TRUNCATION_MARKER.len());

        let small = assemble_document_text(&["short".to_string()]);
        assert_eq!(small, "short");
    }
}
