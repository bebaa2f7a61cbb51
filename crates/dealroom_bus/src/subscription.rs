//! Topic subscriptions.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dealroom_protocol::{Notification, Topic};
use tokio::sync::{broadcast, Notify};
use tracing::debug;
use zeromq::{SocketRecv, SubSocket, ZmqMessage};

use crate::error::{BusError, Result};

pub(crate) enum Source {
    /// Degraded or closed: reads always time out empty.
    Empty,
    Zmq(SubSocket),
    Local(broadcast::Receiver<Notification>),
}

struct CloseSignal {
    closed: AtomicBool,
    notify: Notify,
}

/// Handle that closes a subscription from outside the task reading it.
///
/// A pending `next_message` returns `Ok(None)` promptly after `close()`.
#[derive(Clone)]
pub struct SubscriptionCloser {
    inner: Arc<CloseSignal>,
}

impl SubscriptionCloser {
    fn new() -> Self {
        Self {
            inner: Arc::new(CloseSignal {
                closed: AtomicBool::new(false),
                notify: Notify::new(),
            }),
        }
    }

    /// Idempotent.
    pub fn close(&self) {
        if !self.inner.closed.swap(true, Ordering::SeqCst) {
            // notify_one keeps a permit if the reader is between polls.
            self.inner.notify.notify_one();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }
}

/// A subscription to a single topic.
pub struct Subscription {
    topic: Topic,
    source: Source,
    closer: SubscriptionCloser,
}

impl Subscription {
    pub(crate) fn new(topic: Topic, source: Source) -> Self {
        Self {
            topic,
            source,
            closer: SubscriptionCloser::new(),
        }
    }

    /// Subscription that never yields a message.
    pub fn empty(topic: Topic) -> Self {
        Self::new(topic, Source::Empty)
    }

    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    pub fn closer(&self) -> SubscriptionCloser {
        self.closer.clone()
    }

    /// True while backed by a real transport and not closed.
    pub fn is_live(&self) -> bool {
        !matches!(self.source, Source::Empty) && !self.closer.is_closed()
    }

    /// Wait up to `timeout` for the next message on this topic.
    ///
    /// `Ok(None)` means nothing arrived (timeout, closed, or a frame for a
    /// different topic). `Err` means the transport itself failed; the
    /// subscription is degraded afterwards and only returns `Ok(None)`.
    pub async fn next_message(&mut self, timeout: Duration) -> Result<Option<Notification>> {
        if self.closer.is_closed() {
            self.source = Source::Empty;
            return Ok(None);
        }

        let signal = Arc::clone(&self.closer.inner);
        let topic = &self.topic;

        let outcome = match &mut self.source {
            Source::Empty => {
                tokio::select! {
                    _ = signal.notify.notified() => {}
                    _ = tokio::time::sleep(timeout) => {}
                }
                return Ok(None);
            }
            Source::Zmq(socket) => {
                tokio::select! {
                    _ = signal.notify.notified() => Ok(None),
                    recv = tokio::time::timeout(timeout, socket.recv()) => match recv {
                        Err(_) => Ok(None),
                        Ok(Ok(msg)) => Ok(decode_frames(topic, msg)),
                        Ok(Err(e)) => Err(BusError::from(e)),
                    },
                }
            }
            Source::Local(rx) => {
                tokio::select! {
                    _ = signal.notify.notified() => Ok(None),
                    recv = tokio::time::timeout(timeout, rx.recv()) => match recv {
                        Err(_) => Ok(None),
                        Ok(Ok(n)) if n.topic == *topic => Ok(Some(n)),
                        Ok(Ok(_)) => Ok(None),
                        Ok(Err(broadcast::error::RecvError::Lagged(skipped))) => {
                            debug!(topic = %topic, skipped, "Subscription lagged; messages dropped");
                            Ok(None)
                        }
                        Ok(Err(broadcast::error::RecvError::Closed)) => Err(BusError::Closed),
                    },
                }
            }
        };

        if outcome.is_err() || self.closer.is_closed() {
            self.source = Source::Empty;
        }
        outcome
    }

    /// Release the underlying socket. Idempotent.
    pub fn close(&mut self) {
        self.closer.close();
        self.source = Source::Empty;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.closer.close();
    }
}

/// Frames are `[topic, payload]`. ZMQ filters by prefix, so the topic frame
/// is compared exactly here.
fn decode_frames(topic: &Topic, msg: ZmqMessage) -> Option<Notification> {
    let frames = msg.into_vec();
    let received = frames.first().map(|f| String::from_utf8_lossy(f).into_owned())?;
    if received != topic.as_str() {
        debug!(expected = %topic, received = %received, "Ignoring frame for other topic");
        return None;
    }
    let payload = frames
        .get(1)
        .map(|f| String::from_utf8_lossy(f).into_owned())
        .unwrap_or_default();
    Some(Notification::new(topic.clone(), payload))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_subscription_times_out() {
        let mut sub = Subscription::empty(Topic::new("valuation/team1_updates"));
        assert!(!sub.is_live());
        let got = sub.next_message(Duration::from_millis(10)).await.unwrap();
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let mut sub = Subscription::empty(Topic::new("t"));
        let closer = sub.closer();
        closer.close();
        closer.close();
        sub.close();
        sub.close();
        assert!(closer.is_closed());
        assert!(sub.next_message(Duration::from_millis(5)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_closer_wakes_pending_read() {
        let mut sub = Subscription::empty(Topic::new("t"));
        let closer = sub.closer();

        let reader = tokio::spawn(async move {
            let start = std::time::Instant::now();
            let _ = sub.next_message(Duration::from_secs(30)).await;
            start.elapsed()
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        closer.close();

        let elapsed = tokio::time::timeout(Duration::from_secs(2), reader)
            .await
            .expect("reader did not wake")
            .unwrap();
        assert!(elapsed < Duration::from_secs(2));
    }

    #[test]
    fn test_decode_frames_exact_topic() {
        let topic = Topic::new("valuation/team1_updates");

        let mut msg = ZmqMessage::from(b"valuation/team1_updates".to_vec());
        msg.push_back(b"EBITDA".to_vec().into());
        let n = decode_frames(&topic, msg).unwrap();
        assert_eq!(n.payload, "EBITDA");

        let mut other = ZmqMessage::from(b"valuation/team1_updates_extra".to_vec());
        other.push_back(b"x".to_vec().into());
        assert!(decode_frames(&topic, other).is_none());
    }
}
