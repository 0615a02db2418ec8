//! Postgres persistence for the membership registry.
//!
//! `migrations/schema.sql` holds the schema. Uniqueness lives in partial
//! unique indexes scoped to `deleted_at IS NULL`, so a soft-deleted row never
//! blocks re-creation and a constraint violation maps cleanly to a conflict.

pub mod postgres;

pub use postgres::PostgresStore;
