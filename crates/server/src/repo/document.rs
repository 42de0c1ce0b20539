use sqlx::PgConnection;
use uuid::Uuid;

use shared_types::{AppError, Document};

use crate::error_convert::SqlxErrorExt;

/// Find a document within a project.
pub async fn find_by_id(
    conn: &mut PgConnection,
    project_id: Uuid,
    id: Uuid,
) -> Result<Option<Document>, AppError> {
    sqlx::query_as::<_, Document>(
        r#"
        SELECT id, project_id, name, doc_type, status, created_at
        FROM documents
        WHERE id = $1 AND project_id = $2
        "#,
    )
    .bind(id)
    .bind(project_id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

/// Ordered chunk texts for a document. Concatenation yields the document
/// text the clause extractor consumes.
pub async fn chunk_texts(conn: &mut PgConnection, document_id: Uuid) -> Result<Vec<String>, AppError> {
    sqlx::query_scalar::<_, String>(
        r#"
        SELECT content
        FROM document_chunks
        WHERE document_id = $1
        ORDER BY chunk_index
        "#,
    )
    .bind(document_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}
