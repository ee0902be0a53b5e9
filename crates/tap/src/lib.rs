//! Herald Tap - live fan-out of a growing JSON-lines log
//!
//! This crate follows an append-only record source and pushes every record
//! to all currently connected subscribers, in order, without ever letting a
//! slow subscriber hold up the others:
//!
//! - One producer (`Tailer`), many consumers (`Session`s)
//! - Bounded per-subscriber mailboxes; a full mailbox drops the new record
//! - No history: a subscriber only sees records published after it joined
//! - Registry cleanup on every session exit path
//!
//! # Architecture
//!
//! ```text
//! messages.json (appended by an external producer)
//!     │
//!     ▼
//!  Tailer ──parse──► Arc<Record>
//!     │
//!     ▼
//!  Broker.publish() ──try_send──┬──► Mailbox (16) ──► Session ──► transport
//!                               ├──► Mailbox (16) ──► Session ──► transport
//!                               └──► Mailbox (full: record dropped)
//! ```
//!
//! The transport is abstract (`RecordSink`); the HTTP layer supplies a
//! WebSocket implementation.

mod error;

pub mod broker;
pub mod mailbox;
pub mod record;
pub mod session;
pub mod tailer;

pub use broker::{Broker, BrokerStats, PublishReport};
pub use error::{Result, TapError};
pub use mailbox::{Mailbox, MailboxSender, Offer, mailbox};
pub use record::Record;
pub use session::{CloseReason, RecordSink, Session, SessionReport, SessionState};
pub use tailer::{Tailer, TailerConfig, TailerReport};
