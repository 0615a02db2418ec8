//! Request guard policy: permission checks and role-level gating.
//!
//! The guard never reads ambient state. Identity arrives as a typed value,
//! and the permission-checking backend is an explicit capability injected at
//! construction. When no backend is configured the policy must be set to the
//! named `AllowAll` mode; there is no implicit fallback.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use akademi_core::UserId;

use crate::{Permission, RoleLevel};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GuardError {
    #[error("insufficient permissions: missing '{0}'")]
    MissingPermission(String),

    #[error("insufficient role level: required {required}, current {current}")]
    InsufficientLevel {
        required: RoleLevel,
        current: RoleLevel,
    },
}

/// Backing policy source for permission checks.
#[async_trait]
pub trait PermissionChecker: Send + Sync {
    async fn has_permission(&self, user_id: UserId, permission: &Permission) -> bool;
}

/// Permission policy for the per-request gate.
#[derive(Clone)]
pub enum PermissionPolicy {
    /// No backend configured: every permission check passes.
    AllowAll,

    /// Checks are delegated to the injected backend.
    Checker(Arc<dyn PermissionChecker>),
}

impl PermissionPolicy {
    /// Allow if the caller holds *any* of `required` (OR semantics).
    ///
    /// An empty list allows.
    pub async fn require_any(
        &self,
        user_id: UserId,
        required: &[Permission],
    ) -> Result<(), GuardError> {
        let checker = match self {
            Self::AllowAll => return Ok(()),
            Self::Checker(c) => c,
        };
        if required.is_empty() {
            return Ok(());
        }
        for perm in required {
            if checker.has_permission(user_id, perm).await {
                return Ok(());
            }
        }
        Err(GuardError::MissingPermission(
            required
                .iter()
                .map(Permission::as_str)
                .collect::<Vec<_>>()
                .join("|"),
        ))
    }

    /// Allow only if the caller holds *all* of `required` (AND semantics).
    pub async fn require_all(
        &self,
        user_id: UserId,
        required: &[Permission],
    ) -> Result<(), GuardError> {
        let checker = match self {
            Self::AllowAll => return Ok(()),
            Self::Checker(c) => c,
        };
        for perm in required {
            if !checker.has_permission(user_id, perm).await {
                return Err(GuardError::MissingPermission(perm.as_str().to_string()));
            }
        }
        Ok(())
    }
}

/// Reject callers below `required`.
pub fn require_level(current: RoleLevel, required: RoleLevel) -> Result<(), GuardError> {
    if current < required {
        return Err(GuardError::InsufficientLevel { required, current });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    struct FixedChecker {
        granted: HashSet<String>,
    }

    #[async_trait]
    impl PermissionChecker for FixedChecker {
        async fn has_permission(&self, _user_id: UserId, permission: &Permission) -> bool {
            self.granted.contains(permission.as_str())
        }
    }

    fn checker(perms: &[&str]) -> PermissionPolicy {
        PermissionPolicy::Checker(Arc::new(FixedChecker {
            granted: perms.iter().map(|s| s.to_string()).collect(),
        }))
    }

    #[tokio::test]
    async fn allow_all_passes_everything() {
        let policy = PermissionPolicy::AllowAll;
        let user = UserId::new();
        let required = [Permission::new("roles.delete")];
        assert!(policy.require_any(user, &required).await.is_ok());
        assert!(policy.require_all(user, &required).await.is_ok());
    }

    #[tokio::test]
    async fn any_semantics_needs_one_match() {
        let policy = checker(&["classes.read"]);
        let user = UserId::new();
        let required = [Permission::new("classes.read"), Permission::new("classes.write")];
        assert!(policy.require_any(user, &required).await.is_ok());

        let required = [Permission::new("classes.write")];
        assert!(matches!(
            policy.require_any(user, &required).await,
            Err(GuardError::MissingPermission(_))
        ));
    }

    #[tokio::test]
    async fn all_semantics_needs_every_match() {
        let policy = checker(&["classes.read", "classes.write"]);
        let user = UserId::new();
        let both = [Permission::new("classes.read"), Permission::new("classes.write")];
        assert!(policy.require_all(user, &both).await.is_ok());

        let policy = checker(&["classes.read"]);
        assert!(matches!(
            policy.require_all(user, &both).await,
            Err(GuardError::MissingPermission(m)) if m == "classes.write"
        ));
    }

    #[test]
    fn level_gate() {
        assert!(require_level(RoleLevel::Admin, RoleLevel::Moderator).is_ok());
        assert!(require_level(RoleLevel::Admin, RoleLevel::Admin).is_ok());
        assert!(matches!(
            require_level(RoleLevel::User, RoleLevel::Admin),
            Err(GuardError::InsufficientLevel { .. })
        ));
    }
}
