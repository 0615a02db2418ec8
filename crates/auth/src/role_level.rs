use serde::{Deserialize, Serialize};

/// Coarse role ordering used by the role-level gate.
///
/// This is deliberately separate from the Role Store: it maps a label to an
/// ordinal and nothing more. Custom role `level` integers are decorative
/// metadata and never feed into this comparison.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleLevel {
    Guest,
    User,
    Moderator,
    Admin,
    SuperAdmin,
}

impl RoleLevel {
    /// Map a coarse role label to its level. Unknown labels rank as guests.
    pub fn from_label(label: &str) -> Self {
        match label.to_ascii_lowercase().as_str() {
            "super_admin" | "superadmin" => Self::SuperAdmin,
            "admin" | "owner" => Self::Admin,
            "moderator" | "pengurus" => Self::Moderator,
            "user" | "member" | "staff" | "parent" | "anggota" => Self::User,
            _ => Self::Guest,
        }
    }
}

impl core::fmt::Display for RoleLevel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            Self::Guest => "guest",
            Self::User => "user",
            Self::Moderator => "moderator",
            Self::Admin => "admin",
            Self::SuperAdmin => "super_admin",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_guest_to_super_admin() {
        assert!(RoleLevel::Guest < RoleLevel::User);
        assert!(RoleLevel::User < RoleLevel::Moderator);
        assert!(RoleLevel::Moderator < RoleLevel::Admin);
        assert!(RoleLevel::Admin < RoleLevel::SuperAdmin);
    }

    #[test]
    fn labels_map_case_insensitively() {
        assert_eq!(RoleLevel::from_label("SuperAdmin"), RoleLevel::SuperAdmin);
        assert_eq!(RoleLevel::from_label("admin"), RoleLevel::Admin);
        assert_eq!(RoleLevel::from_label("member"), RoleLevel::User);
        assert_eq!(RoleLevel::from_label("nonsense"), RoleLevel::Guest);
    }
}
