use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use super::principal::Principal;
use super::roles::{self, AccessDecision, Role, RoleSet, RoleState, RoleView};
use crate::cache::{CacheKey, CachedValue, FillTicket, QueryCache, ROLES_OP};
use crate::error::{CoreError, CoreResult};
use crate::store::{RoleStore, StoreOp};

/// Resolves a principal's roles from `role_assignments`.
///
/// The async methods fetch (query cache first). Every successful fetch also
/// leaves a snapshot that the sync methods read; they report `Loading` until
/// one has landed. Snapshots do not expire with the query cache TTL. They go
/// stale only through `invalidate` or a sign-out of that principal.
pub struct RoleResolver {
    store: Arc<dyn RoleStore>,
    cache: Arc<QueryCache>,
    snapshots: RwLock<HashMap<String, Snapshot>>,
}

struct Snapshot {
    // Holds the principal's cache scope open; the snapshot is live while the ticket is current.
    ticket: FillTicket,
    roles: RoleSet,
}

fn roles_key() -> CacheKey { CacheKey::new(ROLES_OP, "") }

impl RoleResolver {
    pub fn new(store: Arc<dyn RoleStore>, cache: Arc<QueryCache>) -> Self {
        Self { store, cache, snapshots: RwLock::new(HashMap::new()) }
    }

    /// Role set of `principal`; empty when nobody is signed in.
    pub async fn resolve_roles(&self, principal: Option<&Principal>) -> CoreResult<RoleSet> {
        let Some(p) = principal else { return Ok(RoleSet::default()); };
        let ticket = self.cache.begin_fill(&p.user_id, ROLES_OP);
        if let Some(CachedValue::Roles(set)) = self.cache.get(&p.user_id, &roles_key()) {
            self.remember(ticket, set.clone());
            return Ok(set);
        }
        let rows = self.store.roles_for_user(&p.user_id).await.map_err(|e| e.into_core(StoreOp::Read))?;
        let set: RoleSet = rows
            .iter()
            .filter_map(|row| match row.parsed_role() {
                Ok(r) => Some(r),
                Err(e) => {
                    warn!(target: "stratum::roles", "skipping role assignment user={} err={}", row.user_id, e);
                    None
                }
            })
            .collect();
        debug!(target: "stratum::roles", "roles.resolved user={} roles={:?}", p.user_id, set);
        self.cache.fill(ticket.clone(), roles_key(), CachedValue::Roles(set.clone()));
        self.remember(ticket, set.clone());
        Ok(set)
    }

    /// A fetch that raced an invalidation leaves no snapshot. Stale snapshots of
    /// other principals are dropped here too.
    fn remember(&self, ticket: FillTicket, roles: RoleSet) {
        let mut snaps = self.snapshots.write();
        snaps.retain(|_, s| self.cache.is_current(&s.ticket));
        if self.cache.is_current(&ticket) {
            snaps.insert(ticket.principal().to_string(), Snapshot { ticket, roles });
        }
    }

    pub async fn highest_role(&self, principal: Option<&Principal>) -> CoreResult<Option<Role>> {
        Ok(self.resolve_roles(principal).await?.highest())
    }

    /// Fails with an authorization error unless `principal` holds `role`.
    pub async fn require_role(&self, principal: Option<&Principal>, role: Role) -> CoreResult<()> {
        let Some(p) = principal else {
            return Err(CoreError::authorization("unauthenticated", "no signed-in principal"));
        };
        let set = self.resolve_roles(Some(p)).await?;
        if set.contains(role) {
            Ok(())
        } else {
            debug!(target: "stratum::roles", "roles.denied user={} required={}", p.user_id, role);
            Err(CoreError::authorization(format!("{}_required", role), format!("this action requires the {} role", role)))
        }
    }

    /// Snapshot; `None` when no principal is signed in.
    pub fn state(&self, principal: Option<&Principal>) -> Option<RoleState> {
        let p = principal?;
        match self.snapshots.read().get(&p.user_id) {
            Some(s) if self.cache.is_current(&s.ticket) => Some(RoleState::Ready(s.roles.clone())),
            _ => Some(RoleState::Loading),
        }
    }

    pub fn has_role(&self, principal: Option<&Principal>, role: Role) -> AccessDecision {
        roles::decide(self.state(principal).as_ref(), role)
    }

    pub fn is_admin(&self, principal: Option<&Principal>) -> AccessDecision { self.has_role(principal, Role::Admin) }

    pub fn is_analyst_or_above(&self, principal: Option<&Principal>) -> AccessDecision {
        self.has_role(principal, Role::Admin).or(self.has_role(principal, Role::Analyst))
    }

    pub fn role_view(&self, principal: Option<&Principal>) -> RoleView { roles::view(self.state(principal).as_ref()) }

    /// Highest cached role; `None` while loading or when the user has no roles.
    pub fn highest_role_snapshot(&self, principal: Option<&Principal>) -> Option<Role> { self.role_view(principal).role }

    /// Forget the cached role set after an administrative change.
    pub fn invalidate(&self, user_id: &str) {
        self.snapshots.write().remove(user_id);
        self.cache.invalidate_principal(user_id);
    }
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod resolver_tests;
