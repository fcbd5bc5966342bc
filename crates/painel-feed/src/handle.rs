//! Owned handles to active feed subscriptions.
//!
//! A [`Subscription`] is the only way a view holds on to a channel. Releasing
//! it unregisters the channel from the feed and drops every payload that is
//! still queued for it. Dropping the handle releases it, so a view that goes
//! away through any exit path cannot leak a channel.

use std::sync::Arc;

use painel_bridge::change::ChangeEvent;
use painel_bridge::status::SystemSignal;
use tokio::sync::mpsc::UnboundedReceiver;

/// Identifier of one subscription, unique within a feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Capability to stop delivery for a subscription.
pub trait Release: Send + Sync {
    /// Unregisters `id`. Returns `true` if it was still registered; repeated
    /// calls return `false` and have no other effect.
    fn release(&self, id: SubscriptionId) -> bool;
}

/// Handle to an active channel delivering events of type `E` in FIFO order.
pub struct Subscription<E> {
    id: SubscriptionId,
    channel: String,
    receiver: Option<UnboundedReceiver<E>>,
    releaser: Arc<dyn Release>,
}

/// Handle to a table-scoped subscription.
pub type SubscriptionHandle = Subscription<ChangeEvent>;

/// Handle to the system-level lifecycle channel.
pub type SystemHandle = Subscription<SystemSignal>;

impl<E> Subscription<E> {
    /// Wraps a registered channel. `releaser` is invoked exactly once, on the
    /// first [`Subscription::release`] or on drop.
    pub fn new(
        id: SubscriptionId,
        channel: impl Into<String>,
        receiver: UnboundedReceiver<E>,
        releaser: Arc<dyn Release>,
    ) -> Self {
        Self {
            id,
            channel: channel.into(),
            receiver: Some(receiver),
            releaser,
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Channel name the subscription was opened on.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn is_released(&self) -> bool {
        self.receiver.is_none()
    }

    /// Releases the subscription. Returns `true` if this call performed the
    /// release; later calls are no-ops returning `false`.
    pub fn release(&mut self) -> bool {
        let Some(mut receiver) = self.receiver.take() else {
            return false;
        };

        receiver.close();
        let registered = self.releaser.release(self.id);
        log::debug!(
            "Released {} on channel {} (registered: {registered})",
            self.id,
            self.channel
        );
        true
    }

    /// Returns the next queued event without waiting. Always `None` once the
    /// handle is released.
    pub fn try_recv(&mut self) -> Option<E> {
        self.receiver.as_mut()?.try_recv().ok()
    }

    /// Waits for the next event. Returns `None` once the handle is released
    /// or the feed has dropped the channel.
    pub async fn recv(&mut self) -> Option<E> {
        self.receiver.as_mut()?.recv().await
    }
}

impl<E> Drop for Subscription<E> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<E> std::fmt::Debug for Subscription<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("channel", &self.channel)
            .field("released", &self.is_released())
            .finish()
    }
}
