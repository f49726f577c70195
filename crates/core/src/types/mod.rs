//! Core types for TiendaPlayeras.
//!
//! This module provides type-safe wrappers for the shop's domain concepts,
//! plus the slug and link-set helpers that operate on them.

pub mod email;
pub mod id;
pub mod links;
pub mod money;
pub mod size;
pub mod slug;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use links::LinkChanges;
pub use money::{CurrencyCode, Money};
pub use size::{Size, SizeError};
pub use slug::{slugify, unique_slug};
pub use status::*;
