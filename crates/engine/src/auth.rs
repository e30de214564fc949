//! Authorization adapter. The engine never authenticates anyone; it receives
//! an opaque principal and asks it about role and claim membership when a
//! selection reaches a type or field that carries requirements.

/// The opaque principal attached to a request.
pub trait Principal: Send + Sync {
    fn has_role(&self, role: &str) -> bool;

    fn claim(&self, _name: &str) -> Option<String> {
        None
    }
}

/// The principal of an unauthenticated request: no roles, no claims.
#[derive(Debug, Clone, Copy, Default)]
pub struct Anonymous;

impl Principal for Anonymous {
    fn has_role(&self, _role: &str) -> bool {
        false
    }
}

/// A principal with a fixed role set, handy for tests and simple hosts.
#[derive(Debug, Clone, Default)]
pub struct StaticPrincipal {
    roles: Vec<String>,
}

impl StaticPrincipal {
    pub fn with_roles(roles: impl IntoIterator<Item = impl Into<String>>) -> Self {
        StaticPrincipal {
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }
}

impl Principal for StaticPrincipal {
    fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|held| held == role)
    }
}

/// Authorization requirements attached to a type or field: a conjunction of
/// role sets. The principal must hold at least one role out of every set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthRequirements(Vec<Vec<String>>);

impl AuthRequirements {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn role(role: impl Into<String>) -> Self {
        AuthRequirements(vec![vec![role.into()]])
    }

    /// One set: satisfied by any of the given roles.
    pub fn any_of(roles: impl IntoIterator<Item = impl Into<String>>) -> Self {
        AuthRequirements(vec![roles.into_iter().map(Into::into).collect()])
    }

    /// Adds a further required role (a new single-role set).
    pub fn require_role(&mut self, role: impl Into<String>) {
        self.0.push(vec![role.into()]);
    }

    /// Merges another requirement in; both must then be satisfied.
    pub fn merge(&mut self, other: &AuthRequirements) {
        self.0.extend(other.0.iter().cloned());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn check(&self, principal: &dyn Principal) -> bool {
        self.0
            .iter()
            .all(|set| set.iter().any(|role| principal.has_role(role)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_requirements_always_pass() {
        assert!(AuthRequirements::none().check(&Anonymous));
    }

    #[test]
    fn conjunction_of_disjunctions() {
        let mut requirements = AuthRequirements::any_of(["admin", "editor"]);
        requirements.require_role("staff");

        assert!(requirements.check(&StaticPrincipal::with_roles(["editor", "staff"])));
        assert!(requirements.check(&StaticPrincipal::with_roles(["admin", "staff"])));
        // Holds a role from one set only.
        assert!(!requirements.check(&StaticPrincipal::with_roles(["staff"])));
        assert!(!requirements.check(&StaticPrincipal::with_roles(["admin"])));
        assert!(!requirements.check(&Anonymous));
    }
}
