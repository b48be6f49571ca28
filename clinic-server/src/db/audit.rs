//! Audit log operations

use serde::Serialize;
use sqlx::SqlitePool;

/// One audit row to be written
#[derive(Debug, Clone)]
pub struct NewAuditEntry<'a> {
    pub tenant_id: &'a str,
    pub action: &'a str,
    pub resource_type: &'a str,
    pub resource_id: String,
    pub actor_id: Option<&'a str>,
    pub actor_name: Option<&'a str>,
    pub details: Option<serde_json::Value>,
}

/// Write an audit log entry
pub async fn log(pool: &SqlitePool, entry: &NewAuditEntry<'_>, now: i64) -> Result<(), sqlx::Error> {
    let details = entry.details.as_ref().map(|d| d.to_string());
    sqlx::query(
        "INSERT INTO audit_log (id, tenant_id, action, resource_type, resource_id, actor_id, actor_name, details, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(shared::util::snowflake_id())
    .bind(entry.tenant_id)
    .bind(entry.action)
    .bind(entry.resource_type)
    .bind(&entry.resource_id)
    .bind(entry.actor_id)
    .bind(entry.actor_name)
    .bind(details)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

#[derive(sqlx::FromRow)]
struct AuditRow {
    id: i64,
    action: String,
    resource_type: String,
    resource_id: String,
    actor_id: Option<String>,
    actor_name: Option<String>,
    details: Option<String>,
    created_at: i64,
}

/// Audit entry as returned by the query API
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub id: i64,
    pub action: String,
    pub resource_type: String,
    pub resource_id: String,
    pub actor_id: Option<String>,
    pub actor_name: Option<String>,
    pub details: Option<serde_json::Value>,
    pub created_at: i64,
}

impl From<AuditRow> for AuditEntry {
    fn from(row: AuditRow) -> Self {
        Self {
            id: row.id,
            action: row.action,
            resource_type: row.resource_type,
            resource_id: row.resource_id,
            actor_id: row.actor_id,
            actor_name: row.actor_name,
            details: row
                .details
                .and_then(|d| serde_json::from_str(&d).ok()),
            created_at: row.created_at,
        }
    }
}

/// Query audit entries of a tenant, newest first
pub async fn query(
    pool: &SqlitePool,
    tenant_id: &str,
    resource_type: Option<&str>,
    resource_id: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<(Vec<AuditEntry>, i64), sqlx::Error> {
    let conditions =
        "tenant_id = ?1 AND (?2 IS NULL OR resource_type = ?2) AND (?3 IS NULL OR resource_id = ?3)";

    let total: i64 =
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM audit_log WHERE {conditions}"))
            .bind(tenant_id)
            .bind(resource_type)
            .bind(resource_id)
            .fetch_one(pool)
            .await?;

    let rows: Vec<AuditRow> = sqlx::query_as(&format!(
        "SELECT id, action, resource_type, resource_id, actor_id, actor_name, details, created_at FROM audit_log WHERE {conditions} ORDER BY created_at DESC, id DESC LIMIT ?4 OFFSET ?5"
    ))
    .bind(tenant_id)
    .bind(resource_type)
    .bind(resource_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok((rows.into_iter().map(AuditEntry::from).collect(), total))
}
