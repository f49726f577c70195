//! TiendaPlayeras Core - Shared domain types.
//!
//! This crate provides the types used across all TiendaPlayeras components:
//! - `storefront` - Public shop and the admin/employee back-office
//! - `cli` - Command-line tools for migrations, seeding and staff accounts
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access. The optional `postgres` feature adds `sqlx` encoding for the ID and
//! enum types so repositories can bind them directly.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, money, sizes, statuses, roles, emails, slugs and
//!   soft-delete link diffs

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
