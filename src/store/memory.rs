//! In-process store backing all three tables.
//!
//! Each call takes the table lock once and releases it before returning, so
//! every trait method is atomic with respect to the others. Read counters and
//! one-shot fault injection exist for tests that must observe store traffic.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tracing::debug;
use uuid::Uuid;

use super::{AuditStore, NotificationStore, RoleStore, StoreError, StoreResult};
use crate::audit::{AuditFilter, AuditLogEntry, NewAuditEntry};
use crate::identity::RoleAssignment;
use crate::notifications::{NewNotification, Notification};

#[derive(Default)]
struct Tables {
    role_assignments: Vec<RoleAssignment>,
    // Insertion order; reads sort newest first.
    audit_logs: Vec<AuditLogEntry>,
    notifications: Vec<Notification>,
}

#[derive(Default)]
struct Faults {
    next_write: Option<StoreError>,
    partial_mark_all_read: bool,
}

/// Snapshot of how many reads each table has served.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadCounts {
    pub roles: u64,
    pub audit: u64,
    pub notifications: u64,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    faults: Mutex<Faults>,
    role_reads: AtomicU64,
    audit_reads: AtomicU64,
    notification_reads: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    /// Administrative write: bind `user_id` to `role`. Re-assigning an existing
    /// pair only touches `updated_at`.
    pub fn assign_role(&self, user_id: &str, role: &str) -> RoleAssignment {
        let now = Utc::now();
        let mut t = self.tables.lock();
        if let Some(existing) = t.role_assignments.iter_mut().find(|a| a.user_id == user_id && a.role == role) {
            existing.updated_at = now;
            return existing.clone();
        }
        let row = RoleAssignment { user_id: user_id.to_string(), role: role.to_string(), created_at: now, updated_at: now };
        t.role_assignments.push(row.clone());
        row
    }

    pub fn revoke_role(&self, user_id: &str, role: &str) -> bool {
        let mut t = self.tables.lock();
        let before = t.role_assignments.len();
        t.role_assignments.retain(|a| !(a.user_id == user_id && a.role == role));
        t.role_assignments.len() != before
    }

    pub fn audit_len(&self) -> usize { self.tables.lock().audit_logs.len() }

    pub fn read_counts(&self) -> ReadCounts {
        ReadCounts {
            roles: self.role_reads.load(Ordering::Relaxed),
            audit: self.audit_reads.load(Ordering::Relaxed),
            notifications: self.notification_reads.load(Ordering::Relaxed),
        }
    }

    /// The next write of any table fails with `err`.
    pub fn fail_next_write(&self, err: StoreError) {
        self.faults.lock().next_write = Some(err);
    }

    /// The next `mark_all_read` updates a single row and reports a partial update.
    pub fn fail_next_mark_all_read_partially(&self) {
        self.faults.lock().partial_mark_all_read = true;
    }

    fn take_write_fault(&self) -> StoreResult<()> {
        match self.faults.lock().next_write.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RoleStore for MemoryStore {
    async fn roles_for_user(&self, user_id: &str) -> StoreResult<Vec<RoleAssignment>> {
        self.role_reads.fetch_add(1, Ordering::Relaxed);
        let t = self.tables.lock();
        Ok(t.role_assignments.iter().filter(|a| a.user_id == user_id).cloned().collect())
    }
}

#[async_trait]
impl AuditStore for MemoryStore {
    async fn insert_audit(&self, entry: NewAuditEntry) -> StoreResult<AuditLogEntry> {
        self.take_write_fault()?;
        let row = AuditLogEntry {
            id: Uuid::new_v4().to_string(),
            user_id: entry.user_id,
            action: entry.action,
            resource_type: entry.resource_type,
            resource_id: entry.resource_id,
            details: entry.details,
            ip_address: entry.ip_address,
            user_agent: entry.user_agent,
            created_at: Utc::now(),
        };
        self.tables.lock().audit_logs.push(row.clone());
        debug!(target: "stratum::store", "audit_logs.insert id={} action={}", row.id, row.action);
        Ok(row)
    }

    async fn list_audit(&self, filter: &AuditFilter, limit: usize) -> StoreResult<Vec<AuditLogEntry>> {
        self.audit_reads.fetch_add(1, Ordering::Relaxed);
        let t = self.tables.lock();
        // Reverse insertion order first so the stable sort keeps later inserts
        // ahead of earlier ones that share a timestamp.
        let mut rows: Vec<AuditLogEntry> = t.audit_logs.iter().rev().filter(|e| filter.matches(e)).cloned().collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows.truncate(limit);
        Ok(rows)
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn insert_notification(&self, new: NewNotification) -> StoreResult<Notification> {
        self.take_write_fault()?;
        let row = Notification {
            id: Uuid::new_v4().to_string(),
            user_id: new.user_id,
            kind: new.kind,
            title: new.title,
            message: new.message,
            is_read: false,
            created_at: Utc::now(),
        };
        self.tables.lock().notifications.push(row.clone());
        Ok(row)
    }

    async fn list_notifications(&self, owner: &str) -> StoreResult<Vec<Notification>> {
        self.notification_reads.fetch_add(1, Ordering::Relaxed);
        let t = self.tables.lock();
        let mut rows: Vec<Notification> = t.notifications.iter().rev().filter(|n| n.user_id == owner).cloned().collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn mark_read(&self, owner: &str, id: &str) -> StoreResult<Notification> {
        self.take_write_fault()?;
        let mut t = self.tables.lock();
        let Some(row) = t.notifications.iter_mut().find(|n| n.id == id) else {
            return Err(StoreError::NotFound(id.to_string()));
        };
        if row.user_id != owner {
            return Err(StoreError::NotOwner(id.to_string()));
        }
        row.is_read = true;
        Ok(row.clone())
    }

    async fn mark_all_read(&self, owner: &str) -> StoreResult<u64> {
        self.take_write_fault()?;
        let partial = std::mem::take(&mut self.faults.lock().partial_mark_all_read);
        let mut t = self.tables.lock();
        let unread: Vec<&mut Notification> = t.notifications.iter_mut().filter(|n| n.user_id == owner && !n.is_read).collect();
        let expected = unread.len() as u64;
        if partial && expected > 1 {
            if let Some(first) = unread.into_iter().next() {
                first.is_read = true;
            }
            return Err(StoreError::Partial { updated: 1, expected });
        }
        for n in unread {
            n.is_read = true;
        }
        Ok(expected)
    }

    async fn delete_notification(&self, owner: &str, id: &str) -> StoreResult<bool> {
        self.take_write_fault()?;
        let mut t = self.tables.lock();
        let Some(pos) = t.notifications.iter().position(|n| n.id == id) else {
            return Ok(false);
        };
        if t.notifications[pos].user_id != owner {
            return Err(StoreError::NotOwner(id.to_string()));
        }
        t.notifications.remove(pos);
        Ok(true)
    }
}
