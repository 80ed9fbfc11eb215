// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! In-process partitioned log transport.
//!
//! Backs the `EventPublisher`/`EventSubscriber` seams with an append-only,
//! partitioned log held in memory: records are routed to a partition by key
//! hash, so per-key ordering holds, and each consumer group keeps one read
//! cursor per partition. Events are lost on restart; production deployments
//! swap in a durable broker behind the same traits.
//!
//! Delivery is at-least-once from the log's point of view: a record stays in
//! the log after delivery and is re-delivered to any group whose cursor sits
//! before it. Blocked receivers are woken by `Notify`; there are no polling
//! sleeps anywhere on this path.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use async_trait::async_trait;

use crate::domain::transport::{EventPublisher, EventSubscriber, InboundMessage, TransportError};

const DEFAULT_PARTITIONS: u32 = 4;

struct StoredRecord {
    key: Vec<u8>,
    value: Vec<u8>,
}

struct TopicLog {
    partitions: Vec<Vec<StoredRecord>>,
}

impl TopicLog {
    fn new(partitions: u32) -> Self {
        Self {
            partitions: (0..partitions).map(|_| Vec::new()).collect(),
        }
    }
}

struct LogInner {
    partitions: u32,
    topics: Mutex<HashMap<String, TopicLog>>,
    // (group, topic) → next offset per partition
    cursors: Mutex<HashMap<(String, String), Vec<u64>>>,
    notify: Notify,
}

impl LogInner {
    fn partition_for(&self, key: &[u8]) -> u32 {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() % self.partitions as u64) as u32
    }
}

/// The shared log. Cloneable handle factory: every publisher and subscriber
/// created from one `MemoryLog` sees the same records.
#[derive(Clone)]
pub struct MemoryLog {
    inner: Arc<LogInner>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::with_partitions(DEFAULT_PARTITIONS)
    }

    pub fn with_partitions(partitions: u32) -> Self {
        Self {
            inner: Arc::new(LogInner {
                partitions: partitions.max(1),
                topics: Mutex::new(HashMap::new()),
                cursors: Mutex::new(HashMap::new()),
                notify: Notify::new(),
            }),
        }
    }

    pub fn publisher(&self) -> MemoryPublisher {
        MemoryPublisher {
            inner: self.inner.clone(),
            closed: AtomicBool::new(false),
        }
    }

    /// Subscribes a consumer group to a topic, reading from the earliest
    /// retained offset the group has not consumed yet.
    pub fn subscriber(&self, group: &str, topic: &str) -> MemorySubscriber {
        MemorySubscriber {
            inner: self.inner.clone(),
            group: group.to_string(),
            topic: topic.to_string(),
            closed: AtomicBool::new(false),
        }
    }
}

impl Default for MemoryLog {
    fn default() -> Self {
        Self::new()
    }
}

pub struct MemoryPublisher {
    inner: Arc<LogInner>,
    closed: AtomicBool,
}

#[async_trait]
impl EventPublisher for MemoryPublisher {
    async fn send(&self, topic: &str, key: &[u8], value: &[u8]) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        let partition = self.inner.partition_for(key);
        {
            let mut topics = self
                .inner
                .topics
                .lock()
                .map_err(|_| TransportError::Publish("log mutex poisoned".to_string()))?;
            let log = topics
                .entry(topic.to_string())
                .or_insert_with(|| TopicLog::new(self.inner.partitions));
            log.partitions[partition as usize].push(StoredRecord {
                key: key.to_vec(),
                value: value.to_vec(),
            });
        }
        self.inner.notify.notify_waiters();
        Ok(())
    }

    async fn close(&self) -> Result<(), TransportError> {
        // Writes are appended synchronously, so there is nothing to flush;
        // closing only fences off further sends.
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

pub struct MemorySubscriber {
    inner: Arc<LogInner>,
    group: String,
    topic: String,
    closed: AtomicBool,
}

impl MemorySubscriber {
    fn try_next(&self) -> Result<Option<InboundMessage>, TransportError> {
        let topics = self
            .inner
            .topics
            .lock()
            .map_err(|_| TransportError::Receive("log mutex poisoned".to_string()))?;
        let Some(log) = topics.get(&self.topic) else {
            return Ok(None);
        };
        let mut cursors = self
            .inner
            .cursors
            .lock()
            .map_err(|_| TransportError::Receive("cursor mutex poisoned".to_string()))?;
        let cursor = cursors
            .entry((self.group.clone(), self.topic.clone()))
            .or_insert_with(|| vec![0; self.inner.partitions as usize]);

        for (partition, records) in log.partitions.iter().enumerate() {
            let next = cursor[partition];
            if let Some(record) = records.get(next as usize) {
                cursor[partition] = next + 1;
                return Ok(Some(InboundMessage {
                    topic: self.topic.clone(),
                    key: record.key.clone(),
                    value: record.value.clone(),
                    partition: partition as u32,
                    offset: next,
                }));
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl EventSubscriber for MemorySubscriber {
    async fn receive(&self) -> Result<InboundMessage, TransportError> {
        loop {
            if self.closed.load(Ordering::SeqCst) {
                return Err(TransportError::Closed);
            }
            // Arm the waiter before checking the log, so a publish between
            // the check and the await cannot be missed.
            let notified = self.inner.notify.notified();
            if let Some(msg) = self.try_next()? {
                return Ok(msg);
            }
            notified.await;
        }
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.closed.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn delivers_published_records_in_order_per_key() {
        let log = MemoryLog::new();
        let publisher = log.publisher();
        let subscriber = log.subscriber("g1", "alarm.triggered");

        publisher.send("alarm.triggered", b"k1", b"a").await.unwrap();
        publisher.send("alarm.triggered", b"k2", b"x").await.unwrap();
        publisher.send("alarm.triggered", b"k1", b"b").await.unwrap();

        let mut by_key: HashMap<Vec<u8>, Vec<Vec<u8>>> = HashMap::new();
        for _ in 0..3 {
            let msg = subscriber.receive().await.unwrap();
            by_key.entry(msg.key).or_default().push(msg.value);
        }
        assert_eq!(by_key[b"k1".as_slice()], vec![b"a".to_vec(), b"b".to_vec()]);
        assert_eq!(by_key[b"k2".as_slice()], vec![b"x".to_vec()]);
    }

    #[tokio::test]
    async fn wakes_blocked_receiver_on_publish() {
        let log = MemoryLog::new();
        let publisher = log.publisher();
        let subscriber = Arc::new(log.subscriber("g1", "alarm.triggered"));

        let pending = {
            let subscriber = subscriber.clone();
            tokio::spawn(async move { subscriber.receive().await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        publisher.send("alarm.triggered", b"k", b"v").await.unwrap();

        let msg = tokio::time::timeout(Duration::from_secs(1), pending)
            .await
            .expect("receiver did not wake")
            .unwrap()
            .unwrap();
        assert_eq!(msg.value, b"v");
    }

    #[tokio::test]
    async fn close_unblocks_receiver() {
        let log = MemoryLog::new();
        let subscriber = Arc::new(log.subscriber("g1", "alarm.triggered"));

        let pending = {
            let subscriber = subscriber.clone();
            tokio::spawn(async move { subscriber.receive().await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        subscriber.close().await.unwrap();

        let result = tokio::time::timeout(Duration::from_secs(1), pending)
            .await
            .expect("receiver did not wake")
            .unwrap();
        assert!(matches!(result, Err(TransportError::Closed)));
    }

    #[tokio::test]
    async fn groups_consume_independently() {
        let log = MemoryLog::new();
        let publisher = log.publisher();
        publisher.send("alarm.triggered", b"k", b"v").await.unwrap();

        let first = log.subscriber("g1", "alarm.triggered");
        let second = log.subscriber("g2", "alarm.triggered");
        assert_eq!(first.receive().await.unwrap().value, b"v");
        assert_eq!(second.receive().await.unwrap().value, b"v");
    }

    #[tokio::test]
    async fn send_after_close_is_rejected() {
        let log = MemoryLog::new();
        let publisher = log.publisher();
        publisher.close().await.unwrap();
        assert!(matches!(
            publisher.send("alarm.triggered", b"k", b"v").await,
            Err(TransportError::Closed)
        ));
    }
}
