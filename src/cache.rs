//! Principal-scoped read cache.
//!
//! Entries are keyed by (principal id, operation, parameters). A mutation calls
//! `invalidate(principal, op)`, which drops that operation's entries in the
//! principal's scope and bumps the operation's epoch. Sign-out and role changes
//! call `invalidate_principal`, which drops the whole scope and bumps its
//! generation. Fills carry the generation and epoch observed before the store
//! read started, so a read that raced an invalidation is discarded instead of
//! resurrecting stale data.
//!
//! A scope with no entries and no live `FillTicket` is pruned on the next fill
//! or invalidation that touches it, so bookkeeping does not grow with every
//! principal ever seen.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tracing::debug;

use crate::identity::RoleSet;
use crate::notifications::Notification;

pub const ROLES_OP: &str = "user-roles";
pub const NOTIFICATIONS_OP: &str = "notifications";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub op: &'static str,
    pub params: String,
}

impl CacheKey {
    pub fn new(op: &'static str, params: impl Into<String>) -> Self {
        Self { op, params: params.into() }
    }
}

#[derive(Debug, Clone)]
pub enum CachedValue {
    Roles(RoleSet),
    Notifications(Arc<Vec<Notification>>),
}

/// Generation and epoch observed by a reader before it went to the store.
/// While any ticket is alive its scope is not pruned.
#[derive(Debug, Clone)]
pub struct FillTicket {
    principal: String,
    op: &'static str,
    generation: u64,
    epoch: u64,
    _hold: Arc<()>,
}

impl FillTicket {
    pub fn principal(&self) -> &str { &self.principal }
}

struct Entry {
    value: CachedValue,
    stored_at: Instant,
}

#[derive(Default)]
struct Scope {
    generation: u64,
    epochs: HashMap<&'static str, u64>,
    entries: HashMap<CacheKey, Entry>,
    tickets: Arc<()>,
}

impl Scope {
    fn epoch(&self, op: &str) -> u64 { self.epochs.get(op).copied().unwrap_or(0) }

    fn admits(&self, generation: u64, op: &str, epoch: u64) -> bool {
        self.generation == generation && self.epoch(op) == epoch
    }

    fn idle(&self) -> bool { self.entries.is_empty() && Arc::strong_count(&self.tickets) == 1 }
}

pub struct QueryCache {
    ttl: Option<Duration>,
    scopes: RwLock<HashMap<String, Scope>>,
}

impl Default for QueryCache {
    fn default() -> Self { Self::new(30_000) }
}

impl QueryCache {
    /// `ttl_ms == 0` disables caching: every read goes to the store.
    /// Tickets still track invalidations so callers can tell a stale read.
    pub fn new(ttl_ms: u64) -> Self {
        let ttl = if ttl_ms == 0 { None } else { Some(Duration::from_millis(ttl_ms)) };
        Self { ttl, scopes: RwLock::new(HashMap::new()) }
    }

    pub fn is_enabled(&self) -> bool { self.ttl.is_some() }

    pub fn get(&self, principal: &str, key: &CacheKey) -> Option<CachedValue> {
        let ttl = self.ttl?;
        let scopes = self.scopes.read();
        let entry = scopes.get(principal)?.entries.get(key)?;
        if entry.stored_at.elapsed() > ttl {
            debug!(target: "stratum::cache", "cache.expired user={} op={} params='{}'", principal, key.op, key.params);
            return None;
        }
        debug!(target: "stratum::cache", "cache.hit user={} op={} params='{}'", principal, key.op, key.params);
        Some(entry.value.clone())
    }

    pub fn begin_fill(&self, principal: &str, op: &'static str) -> FillTicket {
        let mut scopes = self.scopes.write();
        let scope = scopes.entry(principal.to_string()).or_default();
        FillTicket {
            principal: principal.to_string(),
            op,
            generation: scope.generation,
            epoch: scope.epoch(op),
            _hold: Arc::clone(&scope.tickets),
        }
    }

    /// Whether nothing has invalidated the ticket's operation since it was taken.
    pub fn is_current(&self, ticket: &FillTicket) -> bool {
        self.scopes
            .read()
            .get(&ticket.principal)
            .is_some_and(|s| s.admits(ticket.generation, ticket.op, ticket.epoch))
    }

    /// Store a value read under `ticket`. Returns false when the operation was
    /// invalidated in the meantime (or caching is disabled) and nothing was stored.
    pub fn fill(&self, ticket: FillTicket, key: CacheKey, value: CachedValue) -> bool {
        let FillTicket { principal, op, generation, epoch, _hold } = ticket;
        let mut scopes = self.scopes.write();
        drop(_hold);
        let Some(scope) = scopes.get_mut(&principal) else { return false; };
        let admitted = scope.admits(generation, op, epoch);
        let stored = admitted && self.ttl.is_some() && key.op == op;
        if stored {
            scope.entries.insert(key, Entry { value, stored_at: Instant::now() });
        } else if !admitted {
            debug!(target: "stratum::cache", "cache.fill_discarded user={} op={}", principal, op);
        }
        if scope.idle() {
            scopes.remove(&principal);
        }
        stored
    }

    /// Drop `op` entries scoped to `principal`. Other operations and other
    /// principals are untouched.
    pub fn invalidate(&self, principal: &str, op: &'static str) -> usize {
        let mut scopes = self.scopes.write();
        let Some(scope) = scopes.get_mut(principal) else { return 0; };
        *scope.epochs.entry(op).or_insert(0) += 1;
        let before = scope.entries.len();
        scope.entries.retain(|k, _| k.op != op);
        let removed = before - scope.entries.len();
        debug!(target: "stratum::cache", "cache.invalidate user={} op={} removed={}", principal, op, removed);
        if scope.idle() {
            scopes.remove(principal);
        }
        removed
    }

    /// Drop every entry scoped to `principal`. Other principals are untouched.
    pub fn invalidate_principal(&self, principal: &str) -> usize {
        let mut scopes = self.scopes.write();
        let Some(scope) = scopes.get_mut(principal) else { return 0; };
        scope.generation += 1;
        let removed = scope.entries.len();
        scope.entries.clear();
        debug!(target: "stratum::cache", "cache.invalidate_all user={} removed={} generation={}", principal, removed, scope.generation);
        if scope.idle() {
            scopes.remove(principal);
        }
        removed
    }

    /// Number of live entries across all scopes.
    pub fn len(&self) -> usize { self.scopes.read().values().map(|s| s.entries.len()).sum() }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Principals with cached entries or reads in flight.
    pub fn scope_count(&self) -> usize { self.scopes.read().len() }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod cache_tests;
