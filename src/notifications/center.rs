use std::sync::Arc;
use tracing::{debug, info, warn};

use super::model::{NewNotification, Notification, NotificationKind};
use crate::cache::{CacheKey, CachedValue, QueryCache, NOTIFICATIONS_OP};
use crate::error::{CoreError, CoreResult};
use crate::identity::Principal;
use crate::store::{NotificationStore, StoreOp};

/// Per-principal notification inbox.
///
/// Ownership is enforced by the store (every call names the owner); this layer
/// adds the principal gate, derived unread counts and cache invalidation.
pub struct NotificationCenter {
    store: Arc<dyn NotificationStore>,
    cache: Arc<QueryCache>,
}

fn list_key() -> CacheKey { CacheKey::new(NOTIFICATIONS_OP, "") }

fn require(principal: Option<&Principal>) -> CoreResult<&Principal> {
    principal.ok_or_else(|| CoreError::authorization("unauthenticated", "no signed-in principal"))
}

impl NotificationCenter {
    pub fn new(store: Arc<dyn NotificationStore>, cache: Arc<QueryCache>) -> Self { Self { store, cache } }

    /// Entry point for the external trigger that raises alerts. The new
    /// notification starts unread; only the recipient's notification entries are dropped.
    pub async fn deliver(&self, recipient: &str, kind: NotificationKind, title: &str, message: &str) -> CoreResult<Notification> {
        if recipient.trim().is_empty() {
            return Err(CoreError::validation("missing_recipient", "notification recipient is required"));
        }
        if title.trim().is_empty() {
            return Err(CoreError::validation("missing_title", "notification title is required"));
        }
        let new = NewNotification {
            user_id: recipient.to_string(),
            kind,
            title: title.to_string(),
            message: message.to_string(),
        };
        let row = self.store.insert_notification(new).await.map_err(|e| e.into_core(StoreOp::Write))?;
        self.cache.invalidate(recipient, NOTIFICATIONS_OP);
        debug!(target: "stratum::notifications", "notification.delivered id={} user={} kind={}", row.id, recipient, kind.as_str());
        Ok(row)
    }

    /// The principal's notifications, newest first. Empty when nobody is signed in.
    pub async fn list(&self, principal: Option<&Principal>) -> CoreResult<Vec<Notification>> {
        Ok(self.load(principal).await?.as_ref().clone())
    }

    /// Derived from the same rows `list` returns, so the two never disagree.
    pub async fn unread_count(&self, principal: Option<&Principal>) -> CoreResult<usize> {
        Ok(self.load(principal).await?.iter().filter(|n| !n.is_read).count())
    }

    /// Idempotent: an already-read notification is returned unchanged.
    pub async fn mark_read(&self, principal: Option<&Principal>, id: &str) -> CoreResult<Notification> {
        let p = require(principal)?;
        let row = self.store.mark_read(&p.user_id, id).await.map_err(|e| {
            debug!(target: "stratum::notifications", "notification.mark_read failed user={} id={} err={}", p.user_id, id, e);
            e.into_core(StoreOp::Write)
        })?;
        self.cache.invalidate(&p.user_id, NOTIFICATIONS_OP);
        Ok(row)
    }

    /// Returns how many rows changed. A partial update is reported as a write
    /// error; the cache is dropped either way since rows may have changed.
    pub async fn mark_all_read(&self, principal: Option<&Principal>) -> CoreResult<u64> {
        let p = require(principal)?;
        let res = self.store.mark_all_read(&p.user_id).await;
        self.cache.invalidate(&p.user_id, NOTIFICATIONS_OP);
        match res {
            Ok(n) => {
                info!(target: "stratum::notifications", "notification.mark_all_read user={} updated={}", p.user_id, n);
                Ok(n)
            }
            Err(e) => {
                warn!(target: "stratum::notifications", "notification.mark_all_read failed user={} err={}", p.user_id, e);
                Err(e.into_core(StoreOp::Write))
            }
        }
    }

    /// Deleting a missing id succeeds so retries are safe.
    pub async fn delete(&self, principal: Option<&Principal>, id: &str) -> CoreResult<()> {
        let p = require(principal)?;
        let removed = self.store.delete_notification(&p.user_id, id).await.map_err(|e| e.into_core(StoreOp::Write))?;
        if removed {
            self.cache.invalidate(&p.user_id, NOTIFICATIONS_OP);
        } else {
            debug!(target: "stratum::notifications", "notification.delete noop user={} id={}", p.user_id, id);
        }
        Ok(())
    }

    async fn load(&self, principal: Option<&Principal>) -> CoreResult<Arc<Vec<Notification>>> {
        let Some(p) = principal else { return Ok(Arc::new(Vec::new())); };
        if let Some(CachedValue::Notifications(rows)) = self.cache.get(&p.user_id, &list_key()) {
            return Ok(rows);
        }
        let ticket = self.cache.begin_fill(&p.user_id, NOTIFICATIONS_OP);
        let rows = Arc::new(self.store.list_notifications(&p.user_id).await.map_err(|e| e.into_core(StoreOp::Read))?);
        self.cache.fill(ticket, list_key(), CachedValue::Notifications(rows.clone()));
        Ok(rows)
    }
}

#[cfg(test)]
#[path = "center_tests.rs"]
mod center_tests;
