use std::sync::Arc;
use parking_lot::RwLock;
use tracing::debug;

use super::principal::Principal;
use crate::cache::QueryCache;

/// Holder for the signed-in principal.
///
/// The host's authentication layer calls `sign_in`/`sign_out`; core operations
/// receive `current()` as an explicit argument and never look it up themselves.
/// The context shares the services' read cache so that a departing principal's
/// cached reads and role snapshot are dropped.
pub struct SessionContext {
    current: RwLock<Option<Principal>>,
    cache: Arc<QueryCache>,
}

impl SessionContext {
    pub fn new(cache: Arc<QueryCache>) -> Self {
        Self { current: RwLock::new(None), cache }
    }

    /// Install a principal, returning the one it replaced.
    pub fn sign_in(&self, principal: Principal) -> Option<Principal> {
        debug!(target: "stratum::session", "session.sign_in user={}", principal.user_id);
        let prev = self.current.write().replace(principal);
        if let Some(p) = prev.as_ref() {
            self.forget(p);
        }
        prev
    }

    pub fn sign_out(&self) -> Option<Principal> {
        let prev = self.current.write().take();
        if let Some(p) = prev.as_ref() {
            debug!(target: "stratum::session", "session.sign_out user={}", p.user_id);
            self.forget(p);
        }
        prev
    }

    pub fn current(&self) -> Option<Principal> { self.current.read().clone() }

    pub fn is_signed_in(&self) -> bool { self.current.read().is_some() }

    fn forget(&self, principal: &Principal) { self.cache.invalidate_principal(&principal.user_id); }
}
