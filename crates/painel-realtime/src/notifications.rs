//! Live administrator notifications.
//!
//! A [`NotificationCenter`] holds at most one subscription: insert events on
//! the notification table. The signed-in user only switches it on and off;
//! rows are not filtered by addressee, so broadcast rows (no `userId`) arrive
//! as well. Every row it receives becomes a [`Notification`] at the front of
//! an in-memory list and a transient alert styled after the notification's
//! severity.
//!
//! The list is not bounded. It only shrinks through [`NotificationCenter::clear`]
//! or [`NotificationCenter::unmount`].

use std::collections::VecDeque;
use std::sync::Arc;

use painel_bridge::change::{ChangeEvent, ChangeKind, EventFilter};
use painel_bridge::config::{Config, NotificationsConfig};
use painel_bridge::notification::{Alert, Notification};
use painel_feed::{ChangeFeed, SubscriptionRequest};
use serde_json::Value;

use crate::alert::Alerter;
use crate::registry::SubscriptionRegistry;

/// Errors raised while turning a delivered payload into a [`Notification`].
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    /// The inserted row does not have the notification shape.
    #[error("payload is not a notification row: {0}")]
    MalformedPayload(#[from] serde_json::Error),
    /// Only inserts create notifications.
    #[error("expected an INSERT payload, got {0}")]
    UnexpectedEvent(ChangeKind),
}

/// Live list of administrator notifications for the signed-in user.
///
/// Alerts are raised through `A` as rows are delivered.
pub struct NotificationCenter<A> {
    feed: Arc<dyn ChangeFeed>,
    alerter: A,
    schema: String,
    settings: NotificationsConfig,
    scope: Option<String>,
    registry: SubscriptionRegistry<String>,
    notifications: VecDeque<Notification>,
}

impl<A: Alerter> NotificationCenter<A> {
    /// Creates an inactive center. Nothing is received until a scope is set.
    pub fn new(feed: Arc<dyn ChangeFeed>, alerter: A, config: &Config) -> Self {
        Self {
            feed,
            alerter,
            schema: config.schema.clone(),
            settings: config.notifications.clone(),
            scope: None,
            registry: SubscriptionRegistry::new(),
            notifications: VecDeque::new(),
        }
    }

    /// Creates a center scoped to the configured user, if any.
    pub fn mount(feed: Arc<dyn ChangeFeed>, alerter: A, config: &Config) -> Self {
        let mut center = Self::new(feed, alerter, config);
        center.set_scope(config.user_id.as_deref());
        center
    }

    /// Points the center at another user. A blank or missing id deactivates
    /// it. The id is not used to filter rows. The previous subscription is
    /// released before the new one is opened; setting the current scope again
    /// does nothing. Returns whether the scope changed.
    pub fn set_scope(&mut self, scope: Option<&str>) -> bool {
        let scope = scope.map(str::trim).filter(|scope| !scope.is_empty());
        if scope == self.scope.as_deref() {
            return false;
        }

        self.registry.release_all();
        self.scope = scope.map(str::to_string);
        if let Some(scope) = scope {
            let request = SubscriptionRequest::table(
                self.schema.clone(),
                self.settings.table.clone(),
                EventFilter::Insert,
            );
            let handle = self.feed.subscribe(request);
            log::info!("Listening for notifications of user {scope} ({})", handle.id());
            self.registry.insert(scope.to_string(), handle);
        }
        true
    }

    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    /// Whether the scoped subscription is currently held.
    pub fn is_connected(&self) -> bool {
        !self.registry.is_empty()
    }

    /// Handles one delivered change: narrows it into a [`Notification`],
    /// raises its alert, and puts it at the front of the list.
    ///
    /// Malformed payloads leave both the list and the subscription untouched.
    pub fn deliver(&mut self, event: ChangeEvent) -> Result<&Notification, NotificationError> {
        let row = match event {
            ChangeEvent::Insert { row } => row,
            other => return Err(NotificationError::UnexpectedEvent(other.kind())),
        };
        let notification: Notification = serde_json::from_value(Value::Object(row))?;
        log::debug!("Received notification {}", notification.id);

        self.alerter.alert(Alert::from(&notification));
        self.notifications.push_front(notification);
        Ok(&self.notifications[0])
    }

    /// Delivers every payload already queued on the subscription, in arrival
    /// order. Stops at the first malformed payload; the ones behind it stay
    /// queued for the next call.
    pub fn pump(&mut self) -> Result<usize, NotificationError> {
        let Some(scope) = self.scope.clone() else {
            return Ok(0);
        };

        let mut delivered = 0;
        while let Some(event) = self.registry.try_recv(&scope) {
            self.deliver(event)?;
            delivered += 1;
        }
        Ok(delivered)
    }

    /// Waits for the next payload and delivers it. Returns `None` when the
    /// center is inactive or its channel was closed by the feed.
    pub async fn next(&mut self) -> Option<Result<&Notification, NotificationError>> {
        let (_, event) = self.registry.recv_any().await?;
        Some(self.deliver(event))
    }

    /// Received notifications, newest first.
    pub fn notifications(&self) -> impl Iterator<Item = &Notification> {
        self.notifications.iter()
    }

    pub fn latest(&self) -> Option<&Notification> {
        self.notifications.front()
    }

    pub fn unread_count(&self) -> usize {
        self.notifications.len()
    }

    /// Empties the list. The subscription stays open.
    pub fn clear(&mut self) {
        self.notifications.clear();
    }

    /// Releases the subscription and discards the list.
    pub fn unmount(&mut self) {
        self.registry.release_all();
        self.scope = None;
        self.notifications.clear();
    }
}
