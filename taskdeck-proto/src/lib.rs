//! Shared task model and wire definitions for Taskdeck.

pub mod account;
pub mod api;
pub mod event;
pub mod input;
pub mod query;
pub mod stats;
pub mod task;
