//! Household inventory service
//!
//! Users share stashes (households) holding storages, labels, items, orders
//! and an activity feed. Every mutation is staged into one write batch and
//! committed atomically; deletions cascade through the `purge_*` operations
//! in [`cascade`].

pub mod auth;
pub mod cascade;
pub mod config;
pub mod diff;
pub mod error;
pub mod locks;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod service;
pub mod state;
pub mod validation;

pub use state::AppState;
