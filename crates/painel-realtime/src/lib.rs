//! Realtime views over the database change feed.
//!
//! Every view receives its feed explicitly and owns the subscriptions it
//! opens:
//! - [`NotificationCenter`] turns inserted notification rows into an
//!   in-memory list and transient alerts.
//! - [`TableWatcher`] hands inserted, updated, and deleted rows of any table
//!   to per-kind callbacks.
//! - [`StatusMonitor`] follows the feed's system channel.
//!
//! Views are driven cooperatively, either by draining what is already queued
//! (`pump`) or by awaiting the next delivery on a tokio runtime. Releasing a
//! view's subscriptions (on scope change, unmount, or drop) discards any
//! payload still in flight for them.

pub mod alert;
pub mod notifications;
pub mod registry;
pub mod status;
pub mod watcher;

pub use crate::alert::{Alerter, ChannelAlerter};
pub use crate::notifications::{NotificationCenter, NotificationError};
pub use crate::registry::SubscriptionRegistry;
pub use crate::status::StatusMonitor;
pub use crate::watcher::{RowCallback, TableWatcher, WatchCallbacks, WatchError};
