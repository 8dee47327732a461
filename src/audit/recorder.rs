use std::sync::Arc;

use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::model::{AuditEvent, AuditFilter, AuditLogEntry, NewAuditEntry};
use crate::error::{CoreError, CoreResult};
use crate::identity::{Principal, Role, RoleResolver};
use crate::store::{AuditStore, StoreOp};

pub const DEFAULT_LIST_LIMIT: usize = 100;

/// Append-only writer and admin-gated reader for `audit_logs`.
pub struct AuditRecorder {
    store: Arc<dyn AuditStore>,
    roles: Arc<RoleResolver>,
    default_limit: usize,
    max_limit: usize,
}

impl AuditRecorder {
    pub fn new(store: Arc<dyn AuditStore>, roles: Arc<RoleResolver>) -> Self {
        Self { store, roles, default_limit: DEFAULT_LIST_LIMIT, max_limit: 1_000 }
    }

    pub fn with_limits(mut self, default_limit: usize, max_limit: usize) -> Self {
        self.default_limit = default_limit;
        self.max_limit = max_limit.max(default_limit);
        self
    }

    /// Append an entry attributed to `actor`.
    ///
    /// Without a signed-in principal this is a no-op returning `Ok(None)`: many
    /// actions are audited best-effort and the caller has already gated them.
    /// Store failures surface as `Write` errors.
    pub async fn record(
        &self,
        actor: Option<&Principal>,
        action: &str,
        resource_type: &str,
        resource_id: Option<&str>,
        details: Option<Value>,
    ) -> CoreResult<Option<AuditLogEntry>> {
        let event = AuditEvent {
            action: action.to_string(),
            resource_type: resource_type.to_string(),
            resource_id: resource_id.map(str::to_string),
            details,
        };
        self.record_event(actor, event).await
    }

    pub async fn record_event(&self, actor: Option<&Principal>, event: AuditEvent) -> CoreResult<Option<AuditLogEntry>> {
        let Some(p) = actor else {
            debug!(target: "stratum::audit", "audit.record skipped (no principal) action={}", event.action);
            return Ok(None);
        };
        let entry = NewAuditEntry {
            user_id: Some(p.user_id.clone()),
            ip_address: p.attrs.ip.clone(),
            user_agent: p.attrs.user_agent.clone(),
            ..new_entry(event)
        };
        self.insert(entry).await.map(Some)
    }

    /// Append an entry for an action with no attributable principal.
    pub async fn record_system(&self, event: AuditEvent) -> CoreResult<AuditLogEntry> {
        self.insert(new_entry(event)).await
    }

    /// Fire-and-forget variant: the write runs on the runtime and a failure is
    /// logged at warn level instead of reaching the caller.
    pub fn record_in_background(self: &Arc<Self>, actor: Option<Principal>, event: AuditEvent) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let action = event.action.clone();
            if let Err(e) = this.record_event(actor.as_ref(), event).await {
                warn!(target: "stratum::audit", "background audit write failed action={} err={}", action, e);
            }
        })
    }

    /// Newest entries first, at most `limit` (default 100). Admin only.
    pub async fn list(&self, principal: Option<&Principal>, limit: Option<usize>) -> CoreResult<Vec<AuditLogEntry>> {
        let filter = AuditFilter { limit, ..AuditFilter::default() };
        self.list_filtered(principal, &filter).await
    }

    pub async fn list_filtered(&self, principal: Option<&Principal>, filter: &AuditFilter) -> CoreResult<Vec<AuditLogEntry>> {
        // Gate before the query is issued; never post-filter.
        self.roles.require_role(principal, Role::Admin).await?;
        let limit = filter.limit.unwrap_or(self.default_limit);
        if limit == 0 {
            return Err(CoreError::validation("invalid_limit", "limit must be at least 1"));
        }
        let limit = limit.min(self.max_limit);
        let rows = self.store.list_audit(filter, limit).await.map_err(|e| e.into_core(StoreOp::Read))?;
        debug!(target: "stratum::audit", "audit.list rows={} limit={}", rows.len(), limit);
        Ok(rows)
    }

    async fn insert(&self, entry: NewAuditEntry) -> CoreResult<AuditLogEntry> {
        let action = entry.action.clone();
        match self.store.insert_audit(entry).await {
            Ok(row) => {
                debug!(target: "stratum::audit", "audit.recorded id={} action={} user={:?}", row.id, row.action, row.user_id);
                Ok(row)
            }
            Err(e) => {
                warn!(target: "stratum::audit", "audit write rejected action={} err={}", action, e);
                Err(e.into_core(StoreOp::Write))
            }
        }
    }
}

fn new_entry(event: AuditEvent) -> NewAuditEntry {
    NewAuditEntry {
        user_id: None,
        action: event.action,
        resource_type: event.resource_type,
        resource_id: event.resource_id,
        details: normalize_details(event.details),
        ip_address: None,
        user_agent: None,
    }
}

/// Missing or null details become an empty object so the column is never null.
fn normalize_details(details: Option<Value>) -> Value {
    match details {
        None | Some(Value::Null) => Value::Object(serde_json::Map::new()),
        Some(v) => v,
    }
}

#[cfg(test)]
#[path = "recorder_tests.rs"]
mod recorder_tests;
