//! HTTP front door: the bot's inbox plus actor and discovery documents.
//!
//! The inbox only decodes and enqueues; all processing happens on the worker.

pub mod discovery;
pub mod routes;

pub use routes::{AppState, app_routes};
