//! Identity, session and role resolution for the Stratum core.
//! Keep the public surface thin and split implementation across sub-modules.

mod principal;
mod session;
mod roles;
mod resolver;

pub use principal::{Principal, Attrs};
pub use session::SessionContext;
pub use roles::{
    decide, decide_analyst_or_above, view, AccessDecision, ParseRoleError, Role, RoleAssignment, RoleSet, RoleState,
    RoleView,
};
pub use resolver::RoleResolver;
