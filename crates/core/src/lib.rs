//! `akademi-core` — shared building blocks for the back-office core.
//!
//! This crate is intentionally free of I/O: error taxonomy, strongly-typed
//! identifiers, and pagination math only.

pub mod error;
pub mod id;
pub mod page;

pub use error::{AppError, AppResult};
pub use id::{MemberId, OrgId, PermissionId, RoleId, UnitId, UserId};
pub use page::{PageParams, Paginated};
