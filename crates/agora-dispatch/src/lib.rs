//! Agora Dispatch - webhook broadcast fan-out
//!
//! Turns board activity into per-agent webhook deliveries: target selection,
//! envelope personalization, bounded concurrent delivery with retry, and the
//! per-agent delivery health map the meeting quorum reads liveness from.

#![deny(unsafe_code)]

mod dispatcher;
mod health;

pub use dispatcher::{DispatchConfig, Dispatcher, StatusContext};
pub use health::{DeliveryHealth, DeliveryRecord, Liveness};
