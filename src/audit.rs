use serde_json::Value;
use uuid::Uuid;

use crate::{db::DbPool, error::AppResult};

/// One append-only audit record. Old and new values are structured snapshots.
#[derive(Debug, Clone)]
pub struct AuditEntry<'a> {
    pub actor_id: Option<Uuid>,
    pub action: &'a str,
    pub resource: String,
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
}

impl<'a> AuditEntry<'a> {
    pub fn new(actor_id: Option<Uuid>, action: &'a str, resource: impl Into<String>) -> Self {
        Self {
            actor_id,
            action,
            resource: resource.into(),
            old_value: None,
            new_value: None,
        }
    }

    pub fn old_value(mut self, value: Value) -> Self {
        self.old_value = Some(value);
        self
    }

    pub fn new_value(mut self, value: Value) -> Self {
        self.new_value = Some(value);
        self
    }
}

pub async fn log_audit(pool: &DbPool, entry: AuditEntry<'_>) -> AppResult<()> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO audit_logs (id, actor_id, action, resource, old_value, new_value)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(id)
    .bind(entry.actor_id)
    .bind(entry.action)
    .bind(entry.resource)
    .bind(entry.old_value)
    .bind(entry.new_value)
    .execute(pool)
    .await?;

    Ok(())
}

/// Write an audit entry without letting a failure reach the caller.
/// Returns whether the entry was stored.
pub async fn log_audit_best_effort(pool: &DbPool, entry: AuditEntry<'_>) -> bool {
    let action = entry.action;
    match log_audit(pool, entry).await {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(error = %err, action, "audit log failed");
            false
        }
    }
}
