use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum NotificationKind {
    #[default]
    Info,
    Warning,
    Error,
    Success,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::Info => "info",
            NotificationKind::Warning => "warning",
            NotificationKind::Error => "error",
            NotificationKind::Success => "success",
        }
    }

    /// Kinds written by other producers that we do not know render as `Info`.
    pub fn parse_lossy(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "warning" => NotificationKind::Warning,
            "error" => NotificationKind::Error,
            "success" => NotificationKind::Success,
            _ => NotificationKind::Info,
        }
    }
}

impl From<String> for NotificationKind {
    fn from(s: String) -> Self { Self::parse_lossy(&s) }
}

/// Row of `notifications`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNotification {
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_kinds_decode_as_info() {
        let row: Notification = serde_json::from_str(
            r#"{"id":"n1","user_id":"p","type":"critical","title":"t","message":"m","created_at":"2026-01-05T10:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(row.kind, NotificationKind::Info);
        assert!(!row.is_read);
        assert_eq!(serde_json::to_value(NotificationKind::Warning).unwrap(), "warning");
        assert_eq!(NotificationKind::parse_lossy(" SUCCESS "), NotificationKind::Success);
    }
}
