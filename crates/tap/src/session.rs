//! Per-connection subscriber session
//!
//! A `Session` bridges one subscriber's mailbox to its transport:
//!
//! ```text
//! Connecting ──activate()──► Active ──(peer closed | send failed |
//!                                      evicted | shutdown)──► Closed
//! ```
//!
//! Registration is held by a membership guard whose `Drop` calls
//! `Broker::leave`, so the registry entry is removed exactly once on every
//! exit path, including an aborted task or a panicking transport.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::broker::Broker;
use crate::error::Result;
use crate::mailbox::Mailbox;

/// Session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Transport up, not yet registered
    Connecting,
    /// Registered and forwarding records
    Active,
    /// Deregistered; terminal
    Closed,
}

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Client closed the connection
    PeerClosed,
    /// Writing to the transport failed
    SendFailed,
    /// The broker removed this subscriber
    Evicted,
    /// Server shutting down
    Shutdown,
}

/// Summary returned when a session closes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionReport {
    pub subscriber_id: u64,
    pub reason: CloseReason,
    /// Records written to the transport
    pub sent: u64,
}

/// Outbound half of a subscriber transport
///
/// Each `send` carries one serialized record as one discrete message.
#[async_trait]
pub trait RecordSink: Send {
    /// Write one message
    async fn send(&mut self, text: String) -> Result<()>;

    /// Release the transport; errors are ignored
    async fn close(&mut self) {}
}

/// Registry entry owned by a session; leaves on drop
#[derive(Debug)]
struct Membership {
    broker: Arc<Broker>,
    id: u64,
}

impl Drop for Membership {
    fn drop(&mut self) {
        self.broker.leave(self.id);
    }
}

/// One live subscriber connection
#[derive(Debug)]
pub struct Session {
    broker: Arc<Broker>,
    state: SessionState,
    subscriber_id: Option<u64>,
    mailbox: Option<Mailbox>,
    membership: Option<Membership>,
    sent: u64,
}

impl Session {
    /// New session for a connection whose handshake has completed
    pub fn new(broker: Arc<Broker>) -> Self {
        Self {
            broker,
            state: SessionState::Connecting,
            subscriber_id: None,
            mailbox: None,
            membership: None,
            sent: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Broker-assigned ID, once active
    pub fn subscriber_id(&self) -> Option<u64> {
        self.subscriber_id
    }

    /// Register with the broker: `Connecting → Active`
    ///
    /// Idempotent. A session never registers twice, so a closed session
    /// stays closed.
    pub fn activate(&mut self) -> u64 {
        if let Some(id) = self.subscriber_id {
            return id;
        }

        let mailbox = self.broker.join();
        let id = mailbox.id();
        self.membership = Some(Membership {
            broker: Arc::clone(&self.broker),
            id,
        });
        self.mailbox = Some(mailbox);
        self.subscriber_id = Some(id);
        self.state = SessionState::Active;

        info!(
            subscriber_id = id,
            subscribers = self.broker.subscriber_count(),
            "subscriber connected"
        );
        id
    }

    /// Forward records until the session ends, then close it
    ///
    /// `peer_closed` resolves when the client goes away. On `shutdown` the
    /// records already buffered are still sent before closing.
    pub async fn run<S, P>(
        mut self,
        mut sink: S,
        peer_closed: P,
        shutdown: CancellationToken,
    ) -> SessionReport
    where
        S: RecordSink,
        P: Future<Output = ()> + Send,
    {
        let subscriber_id = self.activate();

        let reason = match self.mailbox.take() {
            Some(mut mailbox) => {
                let reason = self
                    .forward(&mut mailbox, &mut sink, peer_closed, &shutdown)
                    .await;
                drop(mailbox);
                reason
            }
            None => CloseReason::Evicted,
        };

        self.close();
        sink.close().await;

        info!(
            subscriber_id,
            reason = ?reason,
            sent = self.sent,
            subscribers = self.broker.subscriber_count(),
            "subscriber disconnected"
        );

        SessionReport {
            subscriber_id,
            reason,
            sent: self.sent,
        }
    }

    async fn forward<S, P>(
        &mut self,
        mailbox: &mut Mailbox,
        sink: &mut S,
        peer_closed: P,
        shutdown: &CancellationToken,
    ) -> CloseReason
    where
        S: RecordSink,
        P: Future<Output = ()> + Send,
    {
        tokio::pin!(peer_closed);

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    self.drain(mailbox, sink).await;
                    return CloseReason::Shutdown;
                }

                _ = &mut peer_closed => return CloseReason::PeerClosed,

                record = mailbox.take() => {
                    let Some(record) = record else {
                        return CloseReason::Evicted;
                    };
                    // A dequeued record is always attempted before anything
                    // else is observed.
                    if let Err(e) = sink.send(record.to_json()).await {
                        debug!(subscriber_id = mailbox.id(), error = %e, "send failed");
                        return CloseReason::SendFailed;
                    }
                    self.sent += 1;
                }
            }
        }
    }

    /// Best-effort flush of whatever is already buffered
    async fn drain<S: RecordSink>(&mut self, mailbox: &mut Mailbox, sink: &mut S) {
        while let Some(record) = mailbox.try_take() {
            if sink.send(record.to_json()).await.is_err() {
                break;
            }
            self.sent += 1;
        }
    }

    /// `Active → Closed`: deregister exactly once
    fn close(&mut self) {
        self.mailbox = None;
        self.membership = None;
        self.state = SessionState::Closed;
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
