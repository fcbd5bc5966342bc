//! Shared types between the change feed, the realtime views, and the UI.
//!
//! This crate defines the data that flows through the realtime plumbing of
//! the electoral dashboard:
//! - Rows and typed change events delivered by the database change feed.
//! - Notification rows and the transient alerts derived from them.
//! - System-level lifecycle signals and the connection status they imply.
//! - Application configuration.
//!
//! Views push everything the user should see over a bounded
//! [`tokio::sync::mpsc`] channel wrapped in [`UiChannels`]. Alerts are
//! transient, so a full channel drops them instead of blocking the view.

pub mod change;
pub mod config;
pub mod filter;
pub mod notification;
pub mod status;

use tokio::sync::mpsc::{self, Receiver, Sender};

/// Messages emitted by the realtime views for the user interface.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageToUi {
    /// A toast to show for a short while.
    Alert(notification::Alert),
    /// The feed connection status changed.
    StatusChanged(status::ConnectionStatus),
    /// A row of a watched table changed.
    RowChanged {
        /// Table the row belongs to.
        table: String,
        /// What happened to the row.
        kind: change::ChangeKind,
        /// New row for inserts and updates, old row for deletes.
        row: change::Row,
    },
}

/// `tokio::mpsc` channel pair between the realtime views and the UI.
pub struct UiChannels {
    /// Receiver used by the UI to get messages from the views.
    pub ui_rx: Receiver<MessageToUi>,
    /// Sender cloned into every view that reports to the UI.
    pub views_tx: Sender<MessageToUi>,
}

impl UiChannels {
    /// Creates a new channel pair with the given buffer capacity.
    pub fn new(buffer: usize) -> Self {
        let (views_tx, ui_rx) = mpsc::channel(buffer.max(1));
        Self { ui_rx, views_tx }
    }
}

impl Default for UiChannels {
    fn default() -> Self {
        Self::new(64)
    }
}
