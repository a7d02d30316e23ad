//! Taskdeck server library.
//!
//! Exposes the REST API, the authentication gate, the task store and the
//! change-notification hub for use in tests and embedding.

pub mod accounts;
pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod notify;
pub mod server;
pub mod snapshot;
pub mod store;
