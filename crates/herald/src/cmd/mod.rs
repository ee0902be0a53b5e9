//! Command implementations for the Herald CLI

pub mod serve;
pub mod server;
pub mod tail;
