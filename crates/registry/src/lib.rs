//! `akademi-registry` — the authorization & membership core.
//!
//! Records, store seams, and the services that enforce the invariants:
//! system-role immutability, atomic permission-set replacement, one active
//! membership per user/tenant pair, and the login state machine. Storage is
//! behind async traits; [`memory::InMemoryStore`] serves tests and dev mode,
//! the Postgres implementation lives in `akademi-infra`.

pub mod checker;
pub mod members;
pub mod memory;
pub mod model;
pub mod permissions;
pub mod roles;
pub mod session;
pub mod store;
pub mod tenants;

pub use checker::StorePermissionChecker;
pub use members::{MembershipDirectory, OrgMemberService, UnitMemberService};
pub use memory::InMemoryStore;
pub use permissions::PermissionService;
pub use roles::RoleService;
pub use session::SessionService;
pub use tenants::TenantService;
