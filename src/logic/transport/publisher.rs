//! Pooled Command Publisher
//!
//! One broker connection for all outbound commands, kept alive by a
//! driver task. `publish` never waits on the network.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use rumqttc::{AsyncClient, ConnectReturnCode, Event, Packet, QoS};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::{client_options, CommandPublisher, TransportError};
use crate::logic::config::BrokerConfig;

pub struct MqttPublisher {
    client: AsyncClient,
    connected: Arc<AtomicBool>,
    sent: AtomicU64,
    failed: AtomicU64,
    driver: JoinHandle<()>,
}

impl MqttPublisher {
    /// Spawn the connection driver. Must be called inside a Tokio runtime.
    pub fn start(broker: &BrokerConfig, mut shutdown: watch::Receiver<bool>) -> Self {
        let (client, mut eventloop) = AsyncClient::new(client_options(broker, "pub"), 64);
        eventloop
            .network_options
            .set_connection_timeout(broker.connect_timeout_secs.max(1));

        let connected = Arc::new(AtomicBool::new(false));
        let flag = connected.clone();
        let delay = broker.reconnect_delay();

        let driver = tokio::spawn(async move {
            loop {
                let polled = tokio::select! {
                    polled = eventloop.poll() => polled,
                    _ = shutdown.changed() => break,
                };

                match polled {
                    Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                        let ok = ack.code == ConnectReturnCode::Success;
                        flag.store(ok, Ordering::SeqCst);
                        if ok {
                            log::info!("Command publisher connected");
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        if flag.swap(false, Ordering::SeqCst) {
                            log::warn!("Command publisher disconnected: {}", e);
                        } else {
                            log::debug!("Command publisher connect failed: {}", e);
                        }
                        tokio::select! {
                            _ = tokio::time::sleep(delay) => {}
                            _ = shutdown.changed() => break,
                        }
                    }
                }
            }
            flag.store(false, Ordering::SeqCst);
        });

        Self {
            client,
            connected,
            sent: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            driver,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// (sent, failed)
    pub fn counts(&self) -> (u64, u64) {
        (self.sent.load(Ordering::Relaxed), self.failed.load(Ordering::Relaxed))
    }

    pub fn stop(&self) {
        if let Err(e) = self.client.try_disconnect() {
            log::debug!("Disconnect request failed: {}", e);
        }
        self.driver.abort();
    }
}

impl CommandPublisher for MqttPublisher {
    fn publish(&self, topic: &str, payload: &str) -> Result<(), TransportError> {
        if !self.is_connected() {
            self.failed.fetch_add(1, Ordering::Relaxed);
            return Err(TransportError::NotConnected);
        }

        match self
            .client
            .try_publish(topic, QoS::AtLeastOnce, false, payload.as_bytes().to_vec())
        {
            Ok(()) => {
                self.sent.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(e) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                Err(TransportError::Rejected(e.to_string()))
            }
        }
    }
}
