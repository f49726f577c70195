//! Domain models for the storefront.
//!
//! These are validated domain objects, separate from the `FromRow` row types
//! the repositories decode into.

pub mod cart;
pub mod catalog;
pub mod listing;
pub mod order;
pub mod session;
pub mod user;

pub use cart::{Cart, CartLine, CartOwner};
pub use catalog::{Category, CategoryWithTags, Product, ProductDetail, ProductDraft, Tag};
pub use listing::{ListingParams, ListingQuery, Page, SortKey};
pub use order::{NewOrder, NewOrderItem, Order, OrderDetail, OrderItem, StatusEvent};
pub use session::{CurrentUser, keys as session_keys};
pub use user::User;
