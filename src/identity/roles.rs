//! Role model and the pure access decisions derived from it.
//! Nothing here touches the store; `RoleResolver` feeds these functions.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Analyst,
    Viewer,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Analyst, Role::Viewer];

    /// Precedence table: higher wins when a principal holds several roles.
    pub fn precedence(self) -> u8 {
        match self {
            Role::Admin => 3,
            Role::Analyst => 2,
            Role::Viewer => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Analyst => "analyst",
            Role::Viewer => "viewer",
        }
    }
}

impl PartialOrd for Role {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl Ord for Role {
    fn cmp(&self, other: &Self) -> Ordering { self.precedence().cmp(&other.precedence()) }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown role '{0}'")]
pub struct ParseRoleError(pub String);

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "analyst" => Ok(Role::Analyst),
            "viewer" => Ok(Role::Viewer),
            other => Err(ParseRoleError(other.to_string())),
        }
    }
}

/// Row of the `role_assignments` table. The role column is kept as text because
/// the administrative collaborator owns the schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub user_id: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RoleAssignment {
    pub fn parsed_role(&self) -> Result<Role, ParseRoleError> { self.role.parse() }
}

/// Set of roles held by one principal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleSet(BTreeSet<Role>);

impl RoleSet {
    pub fn contains(&self, role: Role) -> bool { self.0.contains(&role) }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
    pub fn len(&self) -> usize { self.0.len() }
    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ { self.0.iter().copied() }

    /// Greatest-precedence role held, or `None` for an empty set.
    pub fn highest(&self) -> Option<Role> { self.0.iter().copied().max() }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self { RoleSet(iter.into_iter().collect()) }
}

/// Outcome of a role check. `Loading` lets callers hold back gated content
/// until the role set arrives instead of flashing a denial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessDecision {
    Loading,
    Granted,
    Denied,
}

impl AccessDecision {
    /// Loading if either side is loading, otherwise granted if either is granted.
    pub fn or(self, other: AccessDecision) -> AccessDecision {
        match (self, other) {
            (AccessDecision::Loading, _) | (_, AccessDecision::Loading) => AccessDecision::Loading,
            (AccessDecision::Granted, _) | (_, AccessDecision::Granted) => AccessDecision::Granted,
            _ => AccessDecision::Denied,
        }
    }

    pub fn is_granted(self) -> bool { self == AccessDecision::Granted }
    pub fn is_loading(self) -> bool { self == AccessDecision::Loading }
}

/// Role set of a principal as seen by a synchronous reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleState {
    Loading,
    Ready(RoleSet),
}

/// Highest role plus loading flag, for headers and badges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleView {
    pub role: Option<Role>,
    pub loading: bool,
}

/// `state` is `None` when no principal is signed in.
pub fn decide(state: Option<&RoleState>, role: Role) -> AccessDecision {
    match state {
        None => AccessDecision::Denied,
        Some(RoleState::Loading) => AccessDecision::Loading,
        Some(RoleState::Ready(set)) if set.contains(role) => AccessDecision::Granted,
        Some(RoleState::Ready(_)) => AccessDecision::Denied,
    }
}

pub fn decide_analyst_or_above(state: Option<&RoleState>) -> AccessDecision {
    decide(state, Role::Admin).or(decide(state, Role::Analyst))
}

pub fn view(state: Option<&RoleState>) -> RoleView {
    match state {
        None => RoleView { role: None, loading: false },
        Some(RoleState::Loading) => RoleView { role: None, loading: true },
        Some(RoleState::Ready(set)) => RoleView { role: set.highest(), loading: false },
    }
}

#[cfg(test)]
#[path = "roles_tests.rs"]
mod roles_tests;
