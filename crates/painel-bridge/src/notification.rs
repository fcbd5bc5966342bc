use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Opaque, server-assigned identifier of a row.
///
/// The change feed sends serial keys as JSON numbers and text keys as
/// strings. Both are accepted and kept as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(from = "RawRecordId", into = "String")]
pub struct RecordId(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawRecordId {
    Text(String),
    Integer(i64),
}

impl From<RawRecordId> for RecordId {
    fn from(raw: RawRecordId) -> Self {
        match raw {
            RawRecordId::Text(text) => Self(text),
            RawRecordId::Integer(number) => Self(number.to_string()),
        }
    }
}

impl From<RecordId> for String {
    fn from(id: RecordId) -> Self {
        id.0
    }
}

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Severity tag of a notification row, determining its visual treatment.
///
/// Tags outside of the known set are kept verbatim in [`Severity::Other`]
/// rather than rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum Severity {
    /// Neutral informational message. Default value.
    #[default]
    Info,
    /// Non-critical issue that the user should be aware of.
    Warning,
    /// Failure that may affect functionality.
    Error,
    /// Successful operation or positive outcome.
    Success,
    /// Any tag the dashboard does not know about.
    Other(String),
}

impl From<String> for Severity {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "info" => Self::Info,
            "warning" => Self::Warning,
            "error" => Self::Error,
            "success" => Self::Success,
            _ => Self::Other(tag),
        }
    }
}

impl From<Severity> for String {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Info => "info".into(),
            Severity::Warning => "warning".into(),
            Severity::Error => "error".into(),
            Severity::Success => "success".into(),
            Severity::Other(tag) => tag,
        }
    }
}

impl Severity {
    /// Presentation used for the transient alert. Unrecognized tags are shown
    /// exactly like [`Severity::Info`].
    pub fn alert_style(&self) -> AlertStyle {
        match self {
            Severity::Warning => AlertStyle::Warning,
            Severity::Error => AlertStyle::Error,
            Severity::Success => AlertStyle::Success,
            Severity::Info | Severity::Other(_) => AlertStyle::Info,
        }
    }
}

/// Area of the system a notification refers to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    /// Database backups and restores.
    Backup,
    /// Access control and suspicious activity.
    Security,
    /// General platform events. Default value.
    #[default]
    System,
    /// Administrator and voter account changes.
    User,
    /// Bulk data imports such as electoral results.
    Import,
    /// Any category the dashboard does not know about.
    Other(String),
}

impl From<String> for Category {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "backup" => Self::Backup,
            "security" => Self::Security,
            "system" => Self::System,
            "user" => Self::User,
            "import" => Self::Import,
            _ => Self::Other(tag),
        }
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        match category {
            Category::Backup => "backup".into(),
            Category::Security => "security".into(),
            Category::System => "system".into(),
            Category::User => "user".into(),
            Category::Import => "import".into(),
            Category::Other(tag) => tag,
        }
    }
}

/// Treats an explicit JSON `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A notification row inserted into the administrators' notification table.
///
/// Immutable once received. Only `id`, `title`, `message` and `createdAt` are
/// required; the remaining columns fall back to the table defaults.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: RecordId,
    pub title: String,
    pub message: String,
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub severity: Severity,
    #[serde(alias = "created_at")]
    pub created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub category: Category,
    #[serde(default, alias = "is_read", deserialize_with = "null_as_default")]
    pub is_read: bool,
    #[serde(default, alias = "action_url")]
    pub action_url: Option<String>,
    /// Addressee of the notification; `None` means every administrator.
    #[serde(default, alias = "user_id")]
    pub user_id: Option<RecordId>,
}

/// Visual style of a transient alert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AlertStyle {
    /// Neutral styling. Default value.
    #[default]
    Info,
    /// Positive outcome.
    Success,
    /// Needs attention.
    Warning,
    /// Something failed.
    Error,
}

impl std::fmt::Display for AlertStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            AlertStyle::Info => "info",
            AlertStyle::Success => "success",
            AlertStyle::Warning => "warning",
            AlertStyle::Error => "error",
        };
        f.write_str(label)
    }
}

/// A transient alert (toast) intended for the user interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    /// Presentation of the alert.
    pub style: AlertStyle,
    /// Short heading.
    pub title: String,
    /// Longer text shown under the heading.
    pub description: String,
}

impl From<&Notification> for Alert {
    fn from(notification: &Notification) -> Self {
        Self {
            style: notification.severity.alert_style(),
            title: notification.title.clone(),
            description: notification.message.clone(),
        }
    }
}
