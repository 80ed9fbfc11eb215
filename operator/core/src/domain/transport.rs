// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Message transport seams.
//!
//! Publisher and subscriber are separate traits so the alarm pipeline can be
//! driven by an in-memory transport in tests and by a real partitioned log in
//! production. The contract is at-least-once: a send that returns `Ok` will
//! be delivered one or more times; duplicates are the consumer's problem.

use async_trait::async_trait;

/// A message handed to a subscriber, with enough position metadata to log
/// a skipped message observably.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub topic: String,
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    pub partition: u32,
    pub offset: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("transport is closed")]
    Closed,

    #[error("publish failed: {0}")]
    Publish(String),

    #[error("receive failed: {0}")]
    Receive(String),
}

/// Write side. `send` does not retry internally; retry policy belongs to the
/// caller.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn send(&self, topic: &str, key: &[u8], value: &[u8]) -> Result<(), TransportError>;

    /// Flushes outstanding writes. Safe to call once after the write path
    /// has quiesced.
    async fn close(&self) -> Result<(), TransportError>;
}

/// Read side. `receive` blocks until a message is available and is
/// cancel-safe, so callers select between it and a cancellation token.
#[async_trait]
pub trait EventSubscriber: Send + Sync {
    async fn receive(&self) -> Result<InboundMessage, TransportError>;

    /// Releases the read position. Safe to call once after the read loop has
    /// exited.
    async fn close(&self) -> Result<(), TransportError>;
}
