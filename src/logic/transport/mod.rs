//! Transport Module - MQTT plumbing
//!
//! - `worker`: subscription loop feeding the ingest queue
//! - `publisher`: pooled outbound connection for actuation commands
//!
//! The pipeline only sees `CommandPublisher`; it never touches MQTT types.

pub mod publisher;
pub mod worker;

use rumqttc::MqttOptions;
use std::time::Duration;

pub use publisher::MqttPublisher;
pub use worker::SubscriptionWorker;

use crate::logic::config::BrokerConfig;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransportError {
    #[error("not connected to broker")]
    NotConnected,
    #[error("publish rejected: {0}")]
    Rejected(String),
}

/// Outbound command channel
pub trait CommandPublisher: Send + Sync {
    fn publish(&self, topic: &str, payload: &str) -> Result<(), TransportError>;
}

/// Client options with a unique id per connection role
pub(crate) fn client_options(broker: &BrokerConfig, role: &str) -> MqttOptions {
    let client_id = format!("{}-{}-{}", broker.client_id_prefix, role, uuid::Uuid::new_v4());
    let mut options = MqttOptions::new(client_id, broker.host.clone(), broker.port);
    options.set_keep_alive(Duration::from_secs(broker.keep_alive_secs.max(5)));
    options.set_clean_session(true);
    options
}
