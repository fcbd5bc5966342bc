use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A database row as delivered by the change feed.
pub type Row = Map<String, Value>;

/// Kind of row-level change produced by the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    /// A row was added.
    Insert,
    /// An existing row was modified.
    Update,
    /// A row was removed.
    Delete,
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ChangeKind::Insert => "INSERT",
            ChangeKind::Update => "UPDATE",
            ChangeKind::Delete => "DELETE",
        })
    }
}

/// Which change kinds a subscription is interested in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum EventFilter {
    /// Only inserted rows.
    #[serde(rename = "INSERT")]
    Insert,
    /// Only updated rows.
    #[serde(rename = "UPDATE")]
    Update,
    /// Only deleted rows.
    #[serde(rename = "DELETE")]
    Delete,
    /// Every change kind. Default value.
    #[default]
    #[serde(rename = "*")]
    Any,
}

impl EventFilter {
    /// Returns whether a change of the given kind passes this filter.
    pub fn admits(self, kind: ChangeKind) -> bool {
        match self {
            EventFilter::Any => true,
            EventFilter::Insert => kind == ChangeKind::Insert,
            EventFilter::Update => kind == ChangeKind::Update,
            EventFilter::Delete => kind == ChangeKind::Delete,
        }
    }
}

impl From<ChangeKind> for EventFilter {
    fn from(kind: ChangeKind) -> Self {
        match kind {
            ChangeKind::Insert => EventFilter::Insert,
            ChangeKind::Update => EventFilter::Update,
            ChangeKind::Delete => EventFilter::Delete,
        }
    }
}

impl std::fmt::Display for EventFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            EventFilter::Insert => "INSERT",
            EventFilter::Update => "UPDATE",
            EventFilter::Delete => "DELETE",
            EventFilter::Any => "*",
        })
    }
}

/// A single row-level change, as handed to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    /// A row was inserted.
    Insert { row: Row },
    /// A row was updated. `old` is only present when the table publishes
    /// full previous values.
    Update { row: Row, old: Option<Row> },
    /// A row was deleted. `old` holds at least the primary key.
    Delete { old: Row },
}

impl ChangeEvent {
    pub fn kind(&self) -> ChangeKind {
        match self {
            ChangeEvent::Insert { .. } => ChangeKind::Insert,
            ChangeEvent::Update { .. } => ChangeKind::Update,
            ChangeEvent::Delete { .. } => ChangeKind::Delete,
        }
    }

    /// The row this change is about: the new row for inserts and updates,
    /// the old row for deletes.
    pub fn subject_row(&self) -> &Row {
        match self {
            ChangeEvent::Insert { row } | ChangeEvent::Update { row, .. } => row,
            ChangeEvent::Delete { old } => old,
        }
    }

    /// Consumes the event, returning the row described by
    /// [`ChangeEvent::subject_row`].
    pub fn into_subject_row(self) -> Row {
        match self {
            ChangeEvent::Insert { row } | ChangeEvent::Update { row, .. } => row,
            ChangeEvent::Delete { old } => old,
        }
    }
}

/// Errors raised while converting a raw feed payload into a [`ChangeEvent`].
#[derive(Debug, thiserror::Error)]
pub enum ChangeError {
    /// An insert or update arrived without the new row.
    #[error("{0} payload is missing the new row")]
    MissingNewRow(ChangeKind),
    /// A delete arrived without the old row.
    #[error("DELETE payload is missing the old row")]
    MissingOldRow,
}

/// Payload in the shape the hosted change feed delivers it.
///
/// `new` is populated for inserts and updates, `old` for deletes. The feed
/// sends an empty object instead of `null` for the unused side.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RawChange {
    #[serde(rename = "eventType")]
    pub event_type: ChangeKind,
    #[serde(default)]
    pub schema: Option<String>,
    pub table: String,
    #[serde(default)]
    pub new: Option<Row>,
    #[serde(default)]
    pub old: Option<Row>,
    #[serde(default)]
    pub commit_timestamp: Option<String>,
}

impl RawChange {
    /// Narrows the payload into the typed [`ChangeEvent`].
    pub fn into_event(self) -> Result<ChangeEvent, ChangeError> {
        let old = self.old.filter(|row| !row.is_empty());
        match self.event_type {
            ChangeKind::Insert => match self.new {
                Some(row) if !row.is_empty() => Ok(ChangeEvent::Insert { row }),
                _ => Err(ChangeError::MissingNewRow(ChangeKind::Insert)),
            },
            ChangeKind::Update => match self.new {
                Some(row) if !row.is_empty() => Ok(ChangeEvent::Update { row, old }),
                _ => Err(ChangeError::MissingNewRow(ChangeKind::Update)),
            },
            ChangeKind::Delete => old
                .map(|old| ChangeEvent::Delete { old })
                .ok_or(ChangeError::MissingOldRow),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawChange {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_event_filter_admits() {
        assert!(EventFilter::Any.admits(ChangeKind::Delete));
        assert!(EventFilter::Insert.admits(ChangeKind::Insert));
        assert!(!EventFilter::Insert.admits(ChangeKind::Update));
        assert_eq!(EventFilter::from(ChangeKind::Delete), EventFilter::Delete);
        assert_eq!(EventFilter::Any.to_string(), "*");
    }

    #[test]
    fn test_raw_insert_into_event() {
        let change = raw(json!({
            "eventType": "INSERT",
            "schema": "public",
            "table": "admin_notifications",
            "new": { "id": 1, "title": "Olá" },
            "old": {},
        }));

        let event = change.into_event().unwrap();
        assert_eq!(event.kind(), ChangeKind::Insert);
        assert_eq!(event.subject_row()["title"], json!("Olá"));
    }

    #[test]
    fn test_raw_update_drops_empty_old_row() {
        let change = raw(json!({
            "eventType": "UPDATE",
            "table": "candidatos",
            "new": { "id": 3, "nome": "Maria" },
            "old": {},
        }));

        match change.into_event().unwrap() {
            ChangeEvent::Update { row, old } => {
                assert_eq!(row["nome"], json!("Maria"));
                assert!(old.is_none());
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_raw_delete_uses_old_row() {
        let change = raw(json!({
            "eventType": "DELETE",
            "table": "partidos",
            "new": {},
            "old": { "id": 9 },
        }));

        let event = change.into_event().unwrap();
        assert_eq!(event.kind(), ChangeKind::Delete);
        assert_eq!(event.into_subject_row()["id"], json!(9));
    }

    #[test]
    fn test_raw_missing_rows_are_errors() {
        let insert = raw(json!({ "eventType": "INSERT", "table": "t", "new": null }));
        assert!(matches!(
            insert.into_event(),
            Err(ChangeError::MissingNewRow(ChangeKind::Insert))
        ));

        let delete = raw(json!({ "eventType": "DELETE", "table": "t", "old": {} }));
        assert!(matches!(delete.into_event(), Err(ChangeError::MissingOldRow)));
    }
}
