//! Taskdeck client library.
//!
//! [`client::ApiClient`] speaks the REST API, [`cache::TaskCache`] mirrors
//! one user's tasks, [`session::Session`] ties both to a signed-in identity
//! and [`events::EventStream`] receives change notifications.

pub mod cache;
pub mod cli;
pub mod client;
pub mod config;
pub mod events;
pub mod insights;
pub mod session;
