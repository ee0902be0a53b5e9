//! Subscriber registry and fan-out
//!
//! The `Broker` owns every live subscriber's `MailboxSender`. Sessions join
//! to get a `Mailbox` and leave when they end; the tailer publishes each
//! record once and the broker offers it to every registered mailbox.
//!
//! # Concurrency
//!
//! The registry sits behind a `parking_lot::RwLock`. `publish` holds the read
//! lock while it offers (never awaiting, `offer` is `try_send`), so it sees a
//! consistent snapshot. `join` and `leave` take the write lock, which orders a
//! completed `leave` after any in-flight publish: once `leave` returns, no
//! later record can reach the removed mailbox.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, trace};

use herald_config::{BrokerConfig, DEFAULT_MAILBOX_CAPACITY};

use crate::mailbox::{Mailbox, MailboxSender, Offer, mailbox};
use crate::record::Record;

/// Fan-out coordinator for live subscribers
#[derive(Debug)]
pub struct Broker {
    /// Registered mailboxes, in join order
    registry: RwLock<Vec<MailboxSender>>,
    /// Slots per new mailbox
    mailbox_capacity: usize,
    /// Next subscriber ID
    next_id: AtomicU64,
    published: AtomicU64,
    delivered: AtomicU64,
    dropped: AtomicU64,
    joined: AtomicU64,
    left: AtomicU64,
}

/// Per-publish outcome
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Mailboxes that accepted the record
    pub delivered: usize,
    /// Mailboxes that were full
    pub dropped: usize,
    /// Mailboxes whose owner already went away but had not left yet
    pub closed: usize,
}

/// Counters since the broker was created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BrokerStats {
    /// Records published
    pub published: u64,
    /// Successful offers, summed over subscribers
    pub delivered: u64,
    /// Offers rejected because a mailbox was full
    pub dropped: u64,
    /// Currently registered subscribers
    pub subscribers: usize,
    /// Subscribers ever joined
    pub joined: u64,
    /// Subscribers removed
    pub left: u64,
}

impl Broker {
    /// Create a broker whose mailboxes hold `mailbox_capacity` records
    pub fn new(mailbox_capacity: usize) -> Self {
        Self {
            registry: RwLock::new(Vec::new()),
            mailbox_capacity: mailbox_capacity.max(1),
            next_id: AtomicU64::new(1),
            published: AtomicU64::new(0),
            delivered: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            joined: AtomicU64::new(0),
            left: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &BrokerConfig) -> Self {
        Self::new(config.mailbox_capacity)
    }

    #[inline]
    pub fn mailbox_capacity(&self) -> usize {
        self.mailbox_capacity
    }

    /// Register a new subscriber and hand back its mailbox
    pub fn join(&self) -> Mailbox {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, mailbox) = mailbox(id, self.mailbox_capacity);

        let subscribers = {
            let mut registry = self.registry.write();
            registry.push(sender);
            registry.len()
        };
        self.joined.fetch_add(1, Ordering::Relaxed);

        debug!(subscriber_id = id, subscribers, "subscriber joined");
        mailbox
    }

    /// Remove a subscriber
    ///
    /// Idempotent: returns `false` if the ID was not registered. Dropping the
    /// sender lets the owner's `take()` observe the end of the mailbox.
    pub fn leave(&self, id: u64) -> bool {
        let (removed, subscribers) = {
            let mut registry = self.registry.write();
            let removed = registry
                .iter()
                .position(|s| s.id() == id)
                .map(|pos| registry.remove(pos));
            (removed, registry.len())
        };

        match removed {
            Some(_) => {
                self.left.fetch_add(1, Ordering::Relaxed);
                debug!(subscriber_id = id, subscribers, "subscriber left");
                true
            }
            None => false,
        }
    }

    /// Offer a record to every registered subscriber
    ///
    /// Never waits on a subscriber. A full mailbox loses this record and
    /// nothing else.
    pub fn publish(&self, record: Arc<Record>) -> PublishReport {
        let mut report = PublishReport::default();

        {
            let registry = self.registry.read();
            for sender in registry.iter() {
                match sender.offer(Arc::clone(&record)) {
                    Offer::Accepted => report.delivered += 1,
                    Offer::Full => {
                        report.dropped += 1;
                        trace!(subscriber_id = sender.id(), "mailbox full, record dropped");
                    }
                    Offer::Closed => report.closed += 1,
                }
            }
        }

        self.published.fetch_add(1, Ordering::Relaxed);
        self.delivered
            .fetch_add(report.delivered as u64, Ordering::Relaxed);
        self.dropped.fetch_add(report.dropped as u64, Ordering::Relaxed);

        report
    }

    /// Number of registered subscribers
    pub fn subscriber_count(&self) -> usize {
        self.registry.read().len()
    }

    #[inline]
    pub fn has_subscribers(&self) -> bool {
        !self.registry.read().is_empty()
    }

    /// Whether `id` is currently registered
    pub fn contains(&self, id: u64) -> bool {
        self.registry.read().iter().any(|s| s.id() == id)
    }

    pub fn stats(&self) -> BrokerStats {
        BrokerStats {
            published: self.published.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            subscribers: self.subscriber_count(),
            joined: self.joined.load(Ordering::Relaxed),
            left: self.left.load(Ordering::Relaxed),
        }
    }
}

impl Default for Broker {
    fn default() -> Self {
        Self::new(DEFAULT_MAILBOX_CAPACITY)
    }
}

#[cfg(test)]
#[path = "broker_test.rs"]
mod tests;
