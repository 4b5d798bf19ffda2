//! # ytnotify gateway
//! HTTP surface: WebSub verification and push, recorder reports, Telegram
//! updates and a health check.

pub mod commands;
pub mod routes;
pub mod server;

#[cfg(test)]
pub(crate) mod testing;

pub use server::{AppState, build_router, build_router_from_arc, serve, serve_on};
