//! Durable store boundary.
//!
//! The core talks to three logical tables (`role_assignments`, `audit_logs`,
//! `notifications`) through these traits. Schema ownership, migrations and the
//! engine behind them belong to the host; `MemoryStore` is the in-process
//! implementation used by tests and local runs.

mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::audit::{AuditFilter, AuditLogEntry, NewAuditEntry};
use crate::error::CoreError;
use crate::identity::RoleAssignment;
use crate::notifications::{NewNotification, Notification};

pub use memory::{MemoryStore, ReadCounts};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("record {0} not found")]
    NotFound(String),
    #[error("record {0} belongs to another principal")]
    NotOwner(String),
    #[error("constraint violation: {0}")]
    Constraint(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("partial update: {updated} of {expected} rows")]
    Partial { updated: u64, expected: u64 },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Which side of the store a failing call was on; decides Read vs Write errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    Read,
    Write,
}

impl StoreError {
    pub fn into_core(self, op: StoreOp) -> CoreError {
        match self {
            StoreError::NotFound(id) => CoreError::not_found("not_found", format!("record {} not found", id)),
            StoreError::NotOwner(id) => CoreError::authorization("not_owner", format!("record {} belongs to another principal", id)),
            StoreError::Partial { updated, expected } => CoreError::write(
                "partial_update",
                format!("only {} of {} rows were updated", updated, expected),
            ),
            other => match op {
                StoreOp::Read => CoreError::read("store_read_failed", other.to_string()),
                StoreOp::Write => CoreError::write("store_write_failed", other.to_string()),
            },
        }
    }
}

#[async_trait]
pub trait RoleStore: Send + Sync {
    /// All `role_assignments` rows for a user, in no particular order.
    async fn roles_for_user(&self, user_id: &str) -> StoreResult<Vec<RoleAssignment>>;
}

#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Append one entry; the store assigns `id` and `created_at`.
    async fn insert_audit(&self, entry: NewAuditEntry) -> StoreResult<AuditLogEntry>;

    /// Entries matching `filter`, newest first, at most `limit` rows.
    async fn list_audit(&self, filter: &AuditFilter, limit: usize) -> StoreResult<Vec<AuditLogEntry>>;
}

/// Every method that names a notification also names its owner; implementations
/// must match on both and report `NotOwner` when only the id matches.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn insert_notification(&self, new: NewNotification) -> StoreResult<Notification>;

    /// The owner's notifications, newest first.
    async fn list_notifications(&self, owner: &str) -> StoreResult<Vec<Notification>>;

    /// Set `is_read`; succeeds unchanged when already read.
    async fn mark_read(&self, owner: &str, id: &str) -> StoreResult<Notification>;

    /// Mark every unread notification of `owner` as read in one transaction.
    /// Returns the number of rows changed.
    async fn mark_all_read(&self, owner: &str) -> StoreResult<u64>;

    /// Returns whether a row was removed; a missing id is `Ok(false)`.
    async fn delete_notification(&self, owner: &str, id: &str) -> StoreResult<bool>;
}
