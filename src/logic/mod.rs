//! Logic Module - ingest, classification and history
//!
//! Data flow: transport → queue → pipeline → history (→ CSV mirror).
//!
//! - `transport/` - MQTT subscription worker and command publisher
//! - `features/` - fixed feature layout for the classifier
//! - `model/` - classifier boundary and ONNX runtime
//! - `pipeline/` - `run_once` over the ingest queue
//! - `history/` - bounded log and shared monitor state

pub mod config;
pub mod consumer;
pub mod context;
pub mod events;
pub mod features;
pub mod history;
pub mod labels;
pub mod model;
pub mod persistence;
pub mod pipeline;
pub mod queue;
pub mod sensor;
pub mod transport;
