use std::sync::Arc;

use painel_bridge::status::{ConnectionStatus, SystemSignal};
use painel_feed::{ChangeFeed, SystemHandle};

/// Follows the feed's system channel and exposes a tri-state status.
///
/// The status starts at `Connecting` on every mount. Once unmounted, the
/// monitor keeps its last status and observes nothing else.
pub struct StatusMonitor {
    handle: Option<SystemHandle>,
    status: ConnectionStatus,
}

impl StatusMonitor {
    pub fn mount(feed: &Arc<dyn ChangeFeed>) -> Self {
        Self {
            handle: Some(feed.subscribe_system()),
            status: ConnectionStatus::Connecting,
        }
    }

    /// Releases the current channel and starts over from `Connecting`.
    pub fn remount(&mut self, feed: &Arc<dyn ChangeFeed>) {
        self.unmount();
        *self = Self::mount(feed);
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn is_mounted(&self) -> bool {
        self.handle.is_some()
    }

    fn apply(&mut self, signal: SystemSignal) -> bool {
        let next = self.status.after(signal);
        let changed = next != self.status;
        if changed {
            log::info!("Feed connection is now {next} (after {signal:?})");
        }
        self.status = next;
        changed
    }

    /// Applies every signal already queued. Returns whether the status
    /// changed.
    pub fn pump(&mut self) -> bool {
        let mut changed = false;
        while let Some(signal) = self.handle.as_mut().and_then(|handle| handle.try_recv()) {
            changed |= self.apply(signal);
        }
        changed
    }

    /// Waits until the status changes and returns the new value. Returns
    /// `None` once unmounted or when the feed drops the channel.
    pub async fn changed(&mut self) -> Option<ConnectionStatus> {
        loop {
            let signal = self.handle.as_mut()?.recv().await?;
            if self.apply(signal) {
                return Some(self.status);
            }
        }
    }

    /// Releases the system channel.
    pub fn unmount(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use painel_feed::InMemoryFeed;

    use super::*;

    fn feed() -> (InMemoryFeed, Arc<dyn ChangeFeed>) {
        let feed = InMemoryFeed::new();
        let shared: Arc<dyn ChangeFeed> = Arc::new(feed.clone());
        (feed, shared)
    }

    #[test]
    fn test_lifecycle() {
        let (feed, shared) = feed();
        let mut monitor = StatusMonitor::mount(&shared);
        assert_eq!(monitor.status(), ConnectionStatus::Connecting);

        assert!(monitor.pump());
        assert_eq!(monitor.status(), ConnectionStatus::Connected);

        feed.signal(SystemSignal::ChannelError);
        assert!(monitor.pump());
        assert_eq!(monitor.status(), ConnectionStatus::Disconnected);

        monitor.unmount();
        assert_eq!(feed.signal(SystemSignal::Subscribed), 0);
        assert!(!monitor.pump());
        assert_eq!(monitor.status(), ConnectionStatus::Disconnected);
        assert_eq!(feed.stats().active, 0);
    }

    #[test]
    fn test_any_system_event_means_connected() {
        let (feed, shared) = feed();
        let mut monitor = StatusMonitor::mount(&shared);
        monitor.pump();
        feed.signal(SystemSignal::Event);

        assert!(!monitor.pump());
        assert_eq!(monitor.status(), ConnectionStatus::Connected);
    }

    #[test]
    fn test_close_is_terminal_until_remount() {
        let (feed, shared) = feed();
        let mut monitor = StatusMonitor::mount(&shared);
        feed.close();
        feed.signal(SystemSignal::Subscribed);
        monitor.pump();
        assert_eq!(monitor.status(), ConnectionStatus::Disconnected);

        monitor.remount(&shared);
        assert_eq!(monitor.status(), ConnectionStatus::Connecting);
        monitor.pump();
        assert_eq!(monitor.status(), ConnectionStatus::Connected);

        let stats = feed.stats();
        assert_eq!((stats.acquired, stats.released, stats.active), (2, 1, 1));
    }

    #[tokio::test]
    async fn test_changed_reports_transitions() {
        let (feed, shared) = feed();
        let mut monitor = StatusMonitor::mount(&shared);

        assert_eq!(monitor.changed().await, Some(ConnectionStatus::Connected));
        feed.signal(SystemSignal::Event);
        feed.signal(SystemSignal::Closed);
        assert_eq!(monitor.changed().await, Some(ConnectionStatus::Disconnected));

        monitor.unmount();
        assert_eq!(monitor.changed().await, None);
    }
}
