//! Per-principal notifications with read/unread state.

mod badge;
mod center;
mod model;

pub use badge::unread_badge;
pub use center::NotificationCenter;
pub use model::{NewNotification, Notification, NotificationKind};
