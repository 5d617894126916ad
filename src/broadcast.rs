// Copyright (c) Quill Team
// SPDX-License-Identifier: Apache-2.0

//! Live-update broadcaster.
//!
//! Holds the registry of currently-connected subscriber channels and
//! pushes a content-free signal to all of them whenever state changes.
//! Receivers are expected to re-fetch whatever they care about; the
//! signal carries no payload and no per-recipient targeting.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use tracing::{debug, warn};

use crate::config::Config;

pub type SubscriberId = u64;

/// The "update happened" signal. Deliberately empty.
#[derive(Debug, Clone, Copy)]
pub struct Signal;

/// Outcome of one broadcast pass.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub evicted: usize,
}

/// Registry of connected live-update subscribers.
///
/// Cheap to clone; all clones share one registry. Mutations and the
/// broadcast iteration are serialized through an async `RwLock`, so a
/// subscriber connecting mid-broadcast or failing mid-iteration never
/// corrupts the registry.
#[derive(Clone)]
pub struct Broadcaster {
    inner: Arc<Inner>,
}

struct Inner {
    subscribers: RwLock<HashMap<SubscriberId, mpsc::Sender<Signal>>>,
    next_id: AtomicU64,
    capacity: usize,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::with_capacity(Config::get().live.channel_capacity)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                subscribers: RwLock::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                capacity: capacity.max(1),
            }),
        }
    }

    /// Register a new subscriber and hand back its signal channel.
    pub async fn subscribe(&self) -> (SubscriberId, mpsc::Receiver<Signal>) {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.inner.capacity);

        let mut subs = self.inner.subscribers.write().await;
        subs.insert(id, tx);
        debug!("Live subscriber {} connected ({} total)", id, subs.len());

        (id, rx)
    }

    /// Remove a subscriber on voluntary disconnect. Unknown ids are a
    /// no-op, so eviction and teardown may race freely.
    pub async fn unsubscribe(&self, id: SubscriberId) {
        let mut subs = self.inner.subscribers.write().await;
        if subs.remove(&id).is_some() {
            debug!("Live subscriber {} disconnected ({} total)", id, subs.len());
        }
    }

    /// Push the update signal to every registered subscriber.
    ///
    /// Delivery is best-effort: a subscriber whose channel is closed or
    /// whose buffer is full does not block the others; it is evicted
    /// from the registry instead. The bounded buffer stands in for a
    /// per-send timeout, so one stalled consumer cannot hold up the
    /// broadcast. Zero subscribers is a successful no-op.
    pub async fn broadcast(&self) -> BroadcastReport {
        let mut delivered = 0;
        let mut failed = Vec::new();

        {
            let subs = self.inner.subscribers.read().await;
            if subs.is_empty() {
                return BroadcastReport::default();
            }
            for (&id, tx) in subs.iter() {
                match tx.try_send(Signal) {
                    Ok(()) => delivered += 1,
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        warn!("Live subscriber {} is not draining, evicting", id);
                        failed.push(id);
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        debug!("Live subscriber {} is gone, evicting", id);
                        failed.push(id);
                    }
                }
            }
        }

        if !failed.is_empty() {
            let mut subs = self.inner.subscribers.write().await;
            for id in &failed {
                subs.remove(id);
            }
        }

        BroadcastReport {
            delivered,
            evicted: failed.len(),
        }
    }

    pub async fn subscriber_count(&self) -> usize {
        self.inner.subscribers.read().await.len()
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn broadcast_with_no_subscribers_is_a_noop() {
        let broadcaster = Broadcaster::with_capacity(8);
        let report = broadcaster.broadcast().await;
        assert_eq!(report, BroadcastReport::default());
    }

    #[test_log::test(tokio::test)]
    async fn every_connected_subscriber_receives_the_signal() {
        let broadcaster = Broadcaster::with_capacity(8);
        let (_id_a, mut rx_a) = broadcaster.subscribe().await;
        let (_id_b, mut rx_b) = broadcaster.subscribe().await;
        let (_id_c, mut rx_c) = broadcaster.subscribe().await;

        let report = broadcaster.broadcast().await;
        assert_eq!(report.delivered, 3);
        assert_eq!(report.evicted, 0);

        assert!(rx_a.recv().await.is_some());
        assert!(rx_b.recv().await.is_some());
        assert!(rx_c.recv().await.is_some());
    }

    #[tokio::test]
    async fn a_dead_subscriber_does_not_block_the_rest() {
        let broadcaster = Broadcaster::with_capacity(8);
        let (_id_a, mut rx_a) = broadcaster.subscribe().await;
        let (_id_b, rx_b) = broadcaster.subscribe().await;
        drop(rx_b);

        let report = broadcaster.broadcast().await;
        assert_eq!(report.delivered, 1);
        assert_eq!(report.evicted, 1);
        assert!(rx_a.recv().await.is_some());
        assert_eq!(broadcaster.subscriber_count().await, 1);

        // The evicted subscriber stays gone.
        let report = broadcaster.broadcast().await;
        assert_eq!(report.delivered, 1);
        assert_eq!(report.evicted, 0);
    }

    #[tokio::test]
    async fn a_stalled_subscriber_is_evicted_once_its_buffer_fills() {
        let broadcaster = Broadcaster::with_capacity(1);
        let (_id, _rx) = broadcaster.subscribe().await;

        // First signal fills the buffer; the second finds it full.
        assert_eq!(broadcaster.broadcast().await.delivered, 1);
        let report = broadcaster.broadcast().await;
        assert_eq!(report.delivered, 0);
        assert_eq!(report.evicted, 1);
        assert_eq!(broadcaster.subscriber_count().await, 0);
    }

    #[tokio::test]
    async fn unsubscribe_shrinks_the_registry() {
        let broadcaster = Broadcaster::with_capacity(8);
        let (id, _rx) = broadcaster.subscribe().await;
        assert_eq!(broadcaster.subscriber_count().await, 1);

        broadcaster.unsubscribe(id).await;
        assert_eq!(broadcaster.subscriber_count().await, 0);

        // Double-unsubscribe is harmless.
        broadcaster.unsubscribe(id).await;
        assert_eq!(broadcaster.subscriber_count().await, 0);
    }
}
