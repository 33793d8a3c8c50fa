//! API Module - read-only presentation surface
//!
//! - `dashboard.rs`: view models built from the monitor state
//! - `server.rs`: HTTP routes serving those views

pub mod dashboard;
pub mod server;
