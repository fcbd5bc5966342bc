use serde::{Deserialize, Serialize};

/// Where administrator notifications are stored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct NotificationsConfig {
    /// Table receiving one row per notification.
    pub table: String,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            table: "admin_notifications".into(),
        }
    }
}

/// Global application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Database schema that every watched table lives in.
    pub schema: String,
    /// Identifier of the signed-in user. Notifications are only received
    /// while this is set.
    pub user_id: Option<String>,
    /// Configuration of the notification center.
    pub notifications: NotificationsConfig,
    /// Additional tables whose row changes are reported to the UI.
    pub watched_tables: Vec<String>,
    /// Capacity of the channel carrying messages to the UI.
    pub ui_buffer: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema: "public".into(),
            user_id: None,
            notifications: NotificationsConfig::default(),
            watched_tables: Vec::new(),
            ui_buffer: 64,
        }
    }
}
