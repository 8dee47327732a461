//! Audit trail: immutable `audit_logs` entries and the admin-only read path.

mod model;
mod recorder;

pub use model::{AuditEvent, AuditFilter, AuditLogEntry, NewAuditEntry};
pub use recorder::{AuditRecorder, DEFAULT_LIST_LIMIT};
