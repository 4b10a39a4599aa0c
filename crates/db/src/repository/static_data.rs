//! Per-node static data (e.g. the registered webhook id).

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{models::StaticDataRow, DbError};

/// Fetch one key, if present.
pub async fn get_entry(
    pool: &PgPool,
    workflow_id: Uuid,
    node_name: &str,
    key: &str,
) -> Result<Option<StaticDataRow>, DbError> {
    let row = sqlx::query_as::<_, StaticDataRow>(
        r#"
        SELECT workflow_id, node_name, key, value, updated_at
        FROM node_static_data
        WHERE workflow_id = $1 AND node_name = $2 AND key = $3
        "#,
    )
    .bind(workflow_id)
    .bind(node_name)
    .bind(key)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Insert or overwrite one key.
pub async fn upsert_entry(
    pool: &PgPool,
    workflow_id: Uuid,
    node_name: &str,
    key: &str,
    value: serde_json::Value,
) -> Result<StaticDataRow, DbError> {
    let row = sqlx::query_as::<_, StaticDataRow>(
        r#"
        INSERT INTO node_static_data (workflow_id, node_name, key, value, updated_at)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (workflow_id, node_name, key)
        DO UPDATE SET value = EXCLUDED.value, updated_at = EXCLUDED.updated_at
        RETURNING workflow_id, node_name, key, value, updated_at
        "#,
    )
    .bind(workflow_id)
    .bind(node_name)
    .bind(key)
    .bind(value)
    .bind(Utc::now())
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Delete one key. Returns whether a row was removed.
pub async fn delete_entry(
    pool: &PgPool,
    workflow_id: Uuid,
    node_name: &str,
    key: &str,
) -> Result<bool, DbError> {
    let result = sqlx::query(
        r#"DELETE FROM node_static_data WHERE workflow_id = $1 AND node_name = $2 AND key = $3"#,
    )
    .bind(workflow_id)
    .bind(node_name)
    .bind(key)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}
