//! TiendaPlayeras storefront library.
//!
//! Public shop (catalog, cart, checkout, order tickets) and the staff
//! back-office under `/admin`, served by one axum application. The binary in
//! `main.rs` wires configuration, tracing and the middleware stack around
//! [`routes::routes`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
