//! The change-feed contract the realtime views depend on.

use painel_bridge::change::{ChangeEvent, EventFilter};
use painel_bridge::filter::RowFilter;

use crate::handle::{Release, SubscriptionHandle, SystemHandle};

/// Name of the system-level lifecycle channel.
pub const SYSTEM_CHANNEL: &str = "system";

/// Interest in row-level changes of one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionRequest {
    /// Client-side channel name, used for diagnostics.
    pub channel: String,
    pub schema: String,
    pub table: String,
    /// Change kinds to deliver.
    pub events: EventFilter,
    /// Server-side row predicate.
    pub filter: Option<RowFilter>,
}

impl SubscriptionRequest {
    /// Request for `events` on `schema.table`, on the `<schema>:<table>`
    /// channel and without a row filter.
    pub fn table(schema: impl Into<String>, table: impl Into<String>, events: EventFilter) -> Self {
        let schema = schema.into();
        let table = table.into();
        Self {
            channel: format!("{schema}:{table}"),
            schema,
            table,
            events,
            filter: None,
        }
    }

    pub fn with_filter(mut self, filter: RowFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Returns whether a change of `schema.table` should be delivered.
    pub fn admits(&self, schema: &str, table: &str, event: &ChangeEvent) -> bool {
        self.schema == schema
            && self.table == table
            && self.events.admits(event.kind())
            && self
                .filter
                .as_ref()
                .is_none_or(|filter| filter.matches(event.subject_row()))
    }
}

/// Publish/subscribe connection to a database change stream.
///
/// Implementations are passed down to views explicitly (usually as
/// `Arc<dyn ChangeFeed>`), so tests can substitute an in-process feed.
/// Subscribing never fails and never blocks: payloads arrive later on the
/// returned handle. Releasing goes through the [`Release`] capability, which
/// handles invoke themselves when released or dropped.
pub trait ChangeFeed: Release {
    /// Registers interest in the changes described by `request`.
    fn subscribe(&self, request: SubscriptionRequest) -> SubscriptionHandle;

    /// Opens the system-level channel delivering lifecycle signals.
    fn subscribe_system(&self) -> SystemHandle;
}
