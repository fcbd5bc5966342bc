//! Per-view bookkeeping of open subscriptions.
//!
//! A view keeps every handle it acquires in a [`SubscriptionRegistry`] keyed
//! by what the handle was opened for (a user scope, an event kind). Keys are
//! unique, so the number of open handles always equals the number of distinct
//! subscriptions the view asked for. Dropping the registry releases everything
//! it still holds.

use futures_util::future::select_all;
use painel_bridge::change::ChangeEvent;
use painel_feed::{Subscription, SubscriptionId};

/// Handles owned by one view, at most one per key, in insertion order.
pub struct SubscriptionRegistry<K, E = ChangeEvent> {
    entries: Vec<(K, Subscription<E>)>,
}

impl<K, E> Default for SubscriptionRegistry<K, E> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<K: PartialEq, E> SubscriptionRegistry<K, E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracks `handle` under `key`. A handle already tracked under the same
    /// key is released first. Returns `true` in that case.
    pub fn insert(&mut self, key: K, handle: Subscription<E>) -> bool {
        let replaced = self.release(&key);
        self.entries.push((key, handle));
        replaced
    }

    /// Releases and forgets the handle tracked under `key`.
    pub fn release(&mut self, key: &K) -> bool {
        match self.entries.iter().position(|(entry_key, _)| entry_key == key) {
            Some(index) => {
                let (_, mut handle) = self.entries.remove(index);
                handle.release();
                true
            }
            None => false,
        }
    }

    /// Releases every tracked handle. Returns how many were released.
    pub fn release_all(&mut self) -> usize {
        let count = self.entries.len();
        for (_, mut handle) in self.entries.drain(..) {
            handle.release();
        }
        count
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.iter().any(|(entry_key, _)| entry_key == key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys in acquisition order.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.iter().map(|(key, _)| key)
    }

    pub fn ids(&self) -> impl Iterator<Item = SubscriptionId> + '_ {
        self.entries.iter().map(|(_, handle)| handle.id())
    }

    /// Next event already queued on the handle tracked under `key`.
    pub fn try_recv(&mut self, key: &K) -> Option<E> {
        self.entries
            .iter_mut()
            .find(|(entry_key, _)| entry_key == key)
            .and_then(|(_, handle)| handle.try_recv())
    }
}

impl<K: PartialEq + Clone, E> SubscriptionRegistry<K, E> {
    /// Waits for the next event on any tracked handle. Returns `None` when
    /// nothing is tracked or when the first handle to wake up was closed by
    /// the feed.
    pub async fn recv_any(&mut self) -> Option<(K, E)> {
        if self.entries.is_empty() {
            return None;
        }

        let receives = self
            .entries
            .iter_mut()
            .map(|(key, handle)| Box::pin(async move { (key.clone(), handle.recv().await) }));
        let ((key, event), _, _) = select_all(receives).await;
        event.map(|event| (key, event))
    }
}

impl<K, E> std::fmt::Debug for SubscriptionRegistry<K, E>
where
    K: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(key, handle)| (key, handle.id())))
            .finish()
    }
}
