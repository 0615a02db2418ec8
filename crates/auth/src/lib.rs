//! `akademi-auth` — pure authentication/authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage: token
//! issuance/verification, password hashing, permission strings, and the
//! request guard policy live here; wiring them to a store or a router is the
//! caller's job.

pub mod claims;
pub mod guard;
pub mod password;
pub mod permission;
pub mod role_level;
pub mod token;

pub use claims::Claims;
pub use guard::{GuardError, PermissionChecker, PermissionPolicy};
pub use password::{hash_password, verify_password, PasswordError};
pub use permission::Permission;
pub use role_level::RoleLevel;
pub use token::{TokenError, TokenIssuer, TokenPair, ACCESS_TOKEN_TTL, REFRESH_TOKEN_TTL};
