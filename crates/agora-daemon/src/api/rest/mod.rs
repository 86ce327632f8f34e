//! REST API surface

pub mod auth;
pub mod handlers;
pub mod router;
pub mod state;
