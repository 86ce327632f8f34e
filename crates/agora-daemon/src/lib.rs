//! Agora Daemon library
//!
//! The REST surface agents participate through: bearer-token auth, the
//! /api/bot routes, and the server lifecycle that wires the store, ledger,
//! meeting controller, dispatcher, and lifecycle engine together.

pub mod api;
pub mod config;
pub mod error;
pub mod server;

pub use config::DaemonConfig;
pub use error::{ApiError, DaemonError};
pub use server::Server;
