//! Notification bus front end.

use std::time::Duration;

use dealroom_protocol::{BusEndpoints, Notification, Topic};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use zeromq::{PubSocket, Socket, SocketSend, SubSocket, ZmqMessage};

use crate::error::{BusError, Result};
use crate::local::LocalHub;
use crate::subscription::{Source, Subscription};

enum Transport {
    Unavailable,
    Local(LocalHub),
    Zmq(ZmqTransport),
}

struct ZmqTransport {
    publisher: Mutex<PubSocket>,
    subscribe_addr: String,
    connect_timeout: Duration,
}

/// Best-effort publish/subscribe handle.
///
/// Neither `publish` nor `subscribe` ever fails from the caller's point of
/// view. Failures are logged and the operation degrades to a no-op.
pub struct NotificationBus {
    transport: Transport,
}

impl NotificationBus {
    /// Connect to the relay, falling back to the unavailable bus when the
    /// endpoints are missing or the connection does not come up in time.
    pub async fn connect(endpoints: Option<&BusEndpoints>, timeout: Duration) -> Self {
        let Some(endpoints) = endpoints else {
            info!("Notification bus disabled; running without live updates");
            return Self::unavailable();
        };

        match Self::try_connect(endpoints, timeout).await {
            Ok(bus) => bus,
            Err(e) => {
                warn!(
                    publish_addr = %endpoints.publish_addr,
                    error = %e,
                    "Notification bus unavailable; continuing without live updates"
                );
                Self::unavailable()
            }
        }
    }

    /// Strict variant of [`connect`](Self::connect) that reports the failure.
    pub async fn try_connect(endpoints: &BusEndpoints, timeout: Duration) -> Result<Self> {
        let mut publisher = PubSocket::new();
        match tokio::time::timeout(timeout, publisher.connect(&endpoints.publish_addr)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(BusError::Unavailable(e.to_string())),
            Err(_) => {
                return Err(BusError::Unavailable(format!(
                    "connect to {} timed out after {:?}",
                    endpoints.publish_addr, timeout
                )))
            }
        }

        info!(
            publish_addr = %endpoints.publish_addr,
            subscribe_addr = %endpoints.subscribe_addr,
            "Connected to notification bus"
        );

        Ok(Self {
            transport: Transport::Zmq(ZmqTransport {
                publisher: Mutex::new(publisher),
                subscribe_addr: endpoints.subscribe_addr.clone(),
                connect_timeout: timeout,
            }),
        })
    }

    pub fn local(hub: &LocalHub) -> Self {
        Self {
            transport: Transport::Local(hub.clone()),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            transport: Transport::Unavailable,
        }
    }

    pub fn is_available(&self) -> bool {
        match &self.transport {
            Transport::Unavailable => false,
            Transport::Local(hub) => hub.is_open(),
            Transport::Zmq(_) => true,
        }
    }

    /// Fire-and-forget publish. Errors are logged, never returned.
    pub async fn publish(&self, topic: &Topic, payload: &str) {
        match &self.transport {
            Transport::Unavailable => {
                debug!(topic = %topic, payload, "Bus unavailable; dropping notification");
            }
            Transport::Local(hub) => {
                if !hub.send(Notification::new(topic.clone(), payload)) {
                    debug!(topic = %topic, "Local hub closed; dropping notification");
                }
            }
            Transport::Zmq(zmq) => {
                let mut msg = ZmqMessage::from(topic.as_str().as_bytes().to_vec());
                msg.push_back(payload.as_bytes().to_vec().into());

                let mut publisher = zmq.publisher.lock().await;
                match tokio::time::timeout(zmq.connect_timeout, publisher.send(msg)).await {
                    Ok(Ok(())) => debug!(topic = %topic, payload, "Published notification"),
                    Ok(Err(e)) => warn!(topic = %topic, error = %e, "Publish failed"),
                    Err(_) => warn!(topic = %topic, "Publish timed out"),
                }
            }
        }
    }

    /// Subscribe to one topic. On failure the returned subscription is
    /// empty rather than an error.
    pub async fn subscribe(&self, topic: &Topic) -> Subscription {
        match &self.transport {
            Transport::Unavailable => Subscription::empty(topic.clone()),
            Transport::Local(hub) => match hub.receiver() {
                Some(rx) => Subscription::new(topic.clone(), Source::Local(rx)),
                None => {
                    warn!(topic = %topic, "Local hub closed; subscription degraded");
                    Subscription::empty(topic.clone())
                }
            },
            Transport::Zmq(zmq) => match zmq.open_subscriber(topic).await {
                Ok(socket) => Subscription::new(topic.clone(), Source::Zmq(socket)),
                Err(e) => {
                    warn!(topic = %topic, error = %e, "Subscribe failed; subscription degraded");
                    Subscription::empty(topic.clone())
                }
            },
        }
    }
}

impl ZmqTransport {
    async fn open_subscriber(&self, topic: &Topic) -> Result<SubSocket> {
        let mut socket = SubSocket::new();
        match tokio::time::timeout(self.connect_timeout, socket.connect(&self.subscribe_addr)).await
        {
            Ok(result) => result?,
            Err(_) => {
                return Err(BusError::Unavailable(format!(
                    "connect to {} timed out",
                    self.subscribe_addr
                )))
            }
        }
        socket.subscribe(topic.as_str()).await?;
        debug!(topic = %topic, addr = %self.subscribe_addr, "Subscribed");
        Ok(socket)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dealroom_protocol::Role;

    #[tokio::test]
    async fn test_disabled_bus_is_unavailable() {
        let bus = NotificationBus::connect(None, Duration::from_millis(50)).await;
        assert!(!bus.is_available());
    }

    #[tokio::test]
    async fn test_unavailable_bus_never_fails() {
        let bus = NotificationBus::unavailable();
        let topic = Role::Proposer.publish_topic("valuation");

        bus.publish(&topic, "EBITDA").await;

        let mut sub = bus.subscribe(&topic).await;
        assert!(!sub.is_live());
        assert!(sub.next_message(Duration::from_millis(10)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_local_delivery_filters_topic() {
        let hub = LocalHub::new();
        let bus = NotificationBus::local(&hub);
        let team1 = Role::Proposer.publish_topic("valuation");
        let team2 = Role::Counterparty.publish_topic("valuation");

        let mut sub = bus.subscribe(&team1).await;
        assert!(sub.is_live());

        bus.publish(&team2, "ignored").await;
        bus.publish(&team1, "EBITDA").await;
        bus.publish(&team1, "Multiple").await;

        let mut received = Vec::new();
        for _ in 0..5 {
            if let Some(n) = sub.next_message(Duration::from_millis(50)).await.unwrap() {
                received.push(n.payload);
            }
        }
        assert_eq!(received, vec!["EBITDA", "Multiple"]);
    }

    #[tokio::test]
    async fn test_local_shutdown_reports_closed() {
        let hub = LocalHub::new();
        let bus = NotificationBus::local(&hub);
        let topic = Topic::new("valuation/team2_updates");
        let mut sub = bus.subscribe(&topic).await;

        hub.shutdown();
        assert!(!bus.is_available());

        let err = sub.next_message(Duration::from_millis(50)).await.unwrap_err();
        assert!(matches!(err, BusError::Closed));
        // Degraded afterwards
        assert!(!sub.is_live());
        assert!(sub.next_message(Duration::from_millis(5)).await.unwrap().is_none());

        // Publishing on a closed hub is still silent
        bus.publish(&topic, "x").await;
    }

    #[tokio::test]
    async fn test_unreachable_relay_degrades() {
        // Nothing listens on this port.
        let endpoints = BusEndpoints {
            publish_addr: "tcp://127.0.0.1:1".to_string(),
            subscribe_addr: "tcp://127.0.0.1:2".to_string(),
        };
        let bus = NotificationBus::connect(Some(&endpoints), Duration::from_millis(500)).await;
        assert!(!bus.is_available());
    }
}
