//! Bounded per-subscriber mailbox
//!
//! Each subscriber owns one `Mailbox`; the broker holds the matching
//! `MailboxSender`. The sender side never blocks: `offer` either accepts the
//! record or reports why it could not. When the mailbox is full the newest
//! record is rejected and the buffered ones are kept, so a slow subscriber
//! sees gaps but never reordering.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::record::Record;

/// Outcome of a non-blocking offer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer {
    /// Record buffered
    Accepted,
    /// Mailbox at capacity; record dropped for this subscriber
    Full,
    /// Receiving side is gone
    Closed,
}

impl Offer {
    #[inline]
    pub fn is_accepted(self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// Create a mailbox with `capacity` slots (at least one)
pub fn mailbox(id: u64, capacity: usize) -> (MailboxSender, Mailbox) {
    let capacity = capacity.max(1);
    let (sender, receiver) = mpsc::channel(capacity);
    (
        MailboxSender { id, sender },
        Mailbox {
            id,
            receiver,
            capacity,
        },
    )
}

/// Producer half, held by the broker
#[derive(Debug)]
pub struct MailboxSender {
    id: u64,
    sender: mpsc::Sender<Arc<Record>>,
}

impl MailboxSender {
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Try to buffer a record without waiting
    #[inline]
    pub fn offer(&self, record: Arc<Record>) -> Offer {
        match self.sender.try_send(record) {
            Ok(()) => Offer::Accepted,
            Err(TrySendError::Full(_)) => Offer::Full,
            Err(TrySendError::Closed(_)) => Offer::Closed,
        }
    }

    /// Whether the owning `Mailbox` has been dropped
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Consumer half, owned by exactly one session
#[derive(Debug)]
pub struct Mailbox {
    id: u64,
    receiver: mpsc::Receiver<Arc<Record>>,
    capacity: usize,
}

impl Mailbox {
    /// Subscriber ID this mailbox was registered under
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Records currently buffered
    #[inline]
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Wait for the next record
    ///
    /// Returns `None` once the broker has dropped its sender (the subscriber
    /// left the registry) and the buffer is drained. Cancel safe.
    pub async fn take(&mut self) -> Option<Arc<Record>> {
        self.receiver.recv().await
    }

    /// Next buffered record, if any, without waiting
    pub fn try_take(&mut self) -> Option<Arc<Record>> {
        self.receiver.try_recv().ok()
    }
}

#[cfg(test)]
#[path = "mailbox_test.rs"]
mod tests;
