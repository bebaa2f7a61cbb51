//! Topic forwarder between publishers and subscribers.
//!
//! Publishers connect a PUB socket to the inbound endpoint; subscribers
//! connect SUB sockets to the outbound endpoint. The relay forwards every
//! frame unchanged, so topic filtering still happens at the subscriber.

use std::future::Future;

use dealroom_protocol::BusEndpoints;
use tracing::{debug, info, warn};
use zeromq::{PubSocket, Socket, SocketRecv, SocketSend, SubSocket};

use crate::error::Result;

pub struct Relay {
    inbound: SubSocket,
    outbound: PubSocket,
    inbound_addr: String,
    outbound_addr: String,
}

impl Relay {
    /// Bind both sides. Port 0 picks a free port; the resolved addresses
    /// are available from [`endpoints`](Self::endpoints).
    pub async fn bind(endpoints: &BusEndpoints) -> Result<Self> {
        let mut inbound = SubSocket::new();
        let inbound_addr = inbound.bind(&endpoints.publish_addr).await?.to_string();
        inbound.subscribe("").await?;

        let mut outbound = PubSocket::new();
        let outbound_addr = outbound.bind(&endpoints.subscribe_addr).await?.to_string();

        info!(inbound = %inbound_addr, outbound = %outbound_addr, "Relay bound");

        Ok(Self {
            inbound,
            outbound,
            inbound_addr,
            outbound_addr,
        })
    }

    pub fn endpoints(&self) -> BusEndpoints {
        BusEndpoints {
            publish_addr: self.inbound_addr.clone(),
            subscribe_addr: self.outbound_addr.clone(),
        }
    }

    /// Forward until `shutdown` resolves. Returns the number of messages
    /// forwarded.
    pub async fn run<F>(mut self, shutdown: F) -> Result<u64>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut forwarded = 0u64;

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!(forwarded, "Relay shutting down");
                    break;
                }
                recv = self.inbound.recv() => match recv {
                    Ok(msg) => {
                        if let Err(e) = self.outbound.send(msg).await {
                            warn!(error = %e, "Relay forward failed");
                            continue;
                        }
                        forwarded += 1;
                        debug!(forwarded, "Relayed message");
                    }
                    Err(e) => {
                        warn!(error = %e, "Relay receive failed");
                        return Err(e.into());
                    }
                },
            }
        }

        Ok(forwarded)
    }
}
