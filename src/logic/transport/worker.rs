//! Subscription Worker
//!
//! Single long-lived loop per process. It only pushes into the ingest
//! queue; all processing happens in the pipeline.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rumqttc::{AsyncClient, ConnectReturnCode, Event, EventLoop, Packet, QoS};
use tokio::sync::watch;

use super::client_options;
use crate::logic::config::BrokerConfig;
use crate::logic::events::IngestEvent;
use crate::logic::queue::IngestQueue;

pub struct SubscriptionWorker {
    client: AsyncClient,
    eventloop: EventLoop,
    topic: String,
    queue: Arc<IngestQueue>,
    reconnect_delay: Duration,
}

impl SubscriptionWorker {
    pub fn new(broker: &BrokerConfig, topic: &str, queue: Arc<IngestQueue>) -> Self {
        let options = client_options(broker, "sub");
        let (client, mut eventloop) = AsyncClient::new(options, 64);
        eventloop
            .network_options
            .set_connection_timeout(broker.connect_timeout_secs.max(1));

        Self {
            client,
            eventloop,
            topic: topic.to_string(),
            queue,
            reconnect_delay: broker.reconnect_delay(),
        }
    }

    /// Run until `shutdown` flips to true. Connection failures are
    /// reported to the queue and retried after a fixed delay.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        log::info!("Subscription worker started (topic '{}')", self.topic);

        loop {
            if *shutdown.borrow() {
                break;
            }

            let polled = tokio::select! {
                polled = self.eventloop.poll() => polled,
                _ = shutdown.changed() => break,
            };

            match polled {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    let connected = ack.code == ConnectReturnCode::Success;
                    self.queue.push(IngestEvent::status(connected));

                    if connected {
                        log::info!("Connected to broker, subscribing to '{}'", self.topic);
                        if let Err(e) = self.client.try_subscribe(self.topic.clone(), QoS::AtMostOnce) {
                            log::warn!("Subscribe request failed: {}", e);
                            self.queue.push(IngestEvent::error(format!("subscribe failed: {}", e)));
                        }
                    } else {
                        log::warn!("Broker refused connection: {:?}", ack.code);
                        self.queue.push(IngestEvent::error(format!("connection refused: {:?}", ack.code)));
                    }
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    self.queue
                        .push(IngestEvent::decode(&publish.topic, &publish.payload, Utc::now()));
                }
                Ok(_) => {}
                Err(e) => {
                    log::warn!(
                        "Broker connection lost: {} (retrying in {}s)",
                        e,
                        self.reconnect_delay.as_secs()
                    );
                    self.queue.push(IngestEvent::status(false));
                    self.queue.push(IngestEvent::error(e.to_string()));

                    tokio::select! {
                        _ = tokio::time::sleep(self.reconnect_delay) => {}
                        _ = shutdown.changed() => break,
                    }
                }
            }
        }

        if let Err(e) = self.client.try_disconnect() {
            log::debug!("Disconnect request failed: {}", e);
        }
        log::info!("Subscription worker stopped");
    }
}
