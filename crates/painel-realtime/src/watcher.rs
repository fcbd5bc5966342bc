//! Row-change callbacks for arbitrary tables.

use std::marker::PhantomData;
use std::sync::Arc;

use painel_bridge::change::{ChangeEvent, ChangeKind};
use painel_feed::{ChangeFeed, SubscriptionRequest};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::registry::SubscriptionRegistry;

/// Callback receiving one decoded row.
pub type RowCallback<T> = Box<dyn FnMut(T) + Send>;

/// Errors raised while handing a changed row to a callback.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// The row could not be decoded into the watcher's row type.
    #[error("{kind} row of table {table} could not be decoded: {source}")]
    MalformedRow {
        table: String,
        kind: ChangeKind,
        #[source]
        source: serde_json::Error,
    },
}

/// Up to one callback per change kind.
pub struct WatchCallbacks<T> {
    on_insert: Option<RowCallback<T>>,
    on_update: Option<RowCallback<T>>,
    on_delete: Option<RowCallback<T>>,
}

impl<T> Default for WatchCallbacks<T> {
    fn default() -> Self {
        Self {
            on_insert: None,
            on_update: None,
            on_delete: None,
        }
    }
}

impl<T> WatchCallbacks<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_insert(mut self, callback: impl FnMut(T) + Send + 'static) -> Self {
        self.on_insert = Some(Box::new(callback));
        self
    }

    pub fn on_update(mut self, callback: impl FnMut(T) + Send + 'static) -> Self {
        self.on_update = Some(Box::new(callback));
        self
    }

    pub fn on_delete(mut self, callback: impl FnMut(T) + Send + 'static) -> Self {
        self.on_delete = Some(Box::new(callback));
        self
    }

    /// Change kinds with a callback, in insert/update/delete order.
    pub fn kinds(&self) -> Vec<ChangeKind> {
        [
            (ChangeKind::Insert, self.on_insert.is_some()),
            (ChangeKind::Update, self.on_update.is_some()),
            (ChangeKind::Delete, self.on_delete.is_some()),
        ]
        .into_iter()
        .filter_map(|(kind, present)| present.then_some(kind))
        .collect()
    }

    fn get_mut(&mut self, kind: ChangeKind) -> Option<&mut RowCallback<T>> {
        match kind {
            ChangeKind::Insert => self.on_insert.as_mut(),
            ChangeKind::Update => self.on_update.as_mut(),
            ChangeKind::Delete => self.on_delete.as_mut(),
        }
    }
}

/// Watches one table, with a dedicated subscription for every change kind
/// that has a callback.
///
/// Inserted and updated rows are decoded from the new row, deleted rows from
/// the old one. Kinds are delivered on independent channels, so there is no
/// ordering between, say, an update and a delete of the same row.
pub struct TableWatcher<T> {
    feed: Arc<dyn ChangeFeed>,
    schema: String,
    table: String,
    callbacks: WatchCallbacks<T>,
    registry: SubscriptionRegistry<ChangeKind>,
    _row: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> TableWatcher<T> {
    /// Creates the watcher and opens its subscriptions.
    pub fn mount(
        feed: Arc<dyn ChangeFeed>,
        schema: impl Into<String>,
        table: impl Into<String>,
        callbacks: WatchCallbacks<T>,
    ) -> Self {
        let mut watcher = Self {
            feed,
            schema: schema.into(),
            table: table.into(),
            callbacks,
            registry: SubscriptionRegistry::new(),
            _row: PhantomData,
        };
        watcher.resubscribe();
        watcher
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Moves the watcher to another table. Returns `false` when `table` is
    /// already the watched one.
    pub fn set_table(&mut self, table: impl Into<String>) -> bool {
        let table = table.into();
        if table == self.table {
            return false;
        }
        self.table = table;
        self.resubscribe();
        true
    }

    /// Replaces the callbacks. Every replacement reopens the subscriptions.
    pub fn set_callbacks(&mut self, callbacks: WatchCallbacks<T>) {
        self.callbacks = callbacks;
        self.resubscribe();
    }

    /// True iff at least one callback is set, that is, at least one
    /// subscription is open. Says nothing about the health of the channels.
    pub fn is_connected(&self) -> bool {
        !self.registry.is_empty()
    }

    /// Number of open subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.registry.len()
    }

    fn resubscribe(&mut self) {
        let released = self.registry.release_all();
        for kind in self.callbacks.kinds() {
            let request =
                SubscriptionRequest::table(self.schema.clone(), self.table.clone(), kind.into());
            self.registry.insert(kind, self.feed.subscribe(request));
        }
        log::debug!(
            "Watching {}.{} with {} subscription(s), released {released}",
            self.schema,
            self.table,
            self.registry.len()
        );
    }

    fn dispatch(&mut self, kind: ChangeKind, event: ChangeEvent) -> Result<(), WatchError> {
        let Some(callback) = self.callbacks.get_mut(kind) else {
            return Ok(());
        };
        let row = serde_json::from_value(Value::Object(event.into_subject_row())).map_err(
            |source| WatchError::MalformedRow {
                table: self.table.clone(),
                kind,
                source,
            },
        )?;
        callback(row);
        Ok(())
    }

    /// Hands every already queued row to its callback, channel by channel.
    /// Stops at the first row that cannot be decoded.
    pub fn pump(&mut self) -> Result<usize, WatchError> {
        let mut delivered = 0;
        for kind in self.registry.keys().copied().collect::<Vec<_>>() {
            while let Some(event) = self.registry.try_recv(&kind) {
                self.dispatch(kind, event)?;
                delivered += 1;
            }
        }
        Ok(delivered)
    }

    /// Waits for the next row on any channel and hands it to its callback.
    /// Returns `None` when no callback is set or a channel was closed by the
    /// feed.
    pub async fn next(&mut self) -> Option<Result<ChangeKind, WatchError>> {
        let (kind, event) = self.registry.recv_any().await?;
        Some(self.dispatch(kind, event).map(|()| kind))
    }

    /// Releases every subscription. Callbacks are kept.
    pub fn unmount(&mut self) {
        self.registry.release_all();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use painel_bridge::change::Row;
    use painel_feed::InMemoryFeed;
    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    #[derive(Debug, Clone, PartialEq, Deserialize)]
    struct Candidato {
        id: u32,
        nome: String,
    }

    fn row(value: Value) -> Row {
        serde_json::from_value(value).unwrap()
    }

    fn recorder() -> (Arc<Mutex<Vec<(ChangeKind, Candidato)>>>, WatchCallbacks<Candidato>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (inserts, updates, deletes) = (seen.clone(), seen.clone(), seen.clone());
        let callbacks = WatchCallbacks::new()
            .on_insert(move |c: Candidato| inserts.lock().unwrap().push((ChangeKind::Insert, c)))
            .on_update(move |c: Candidato| updates.lock().unwrap().push((ChangeKind::Update, c)))
            .on_delete(move |c: Candidato| deletes.lock().unwrap().push((ChangeKind::Delete, c)));
        (seen, callbacks)
    }

    #[test]
    fn test_one_subscription_per_callback() {
        let feed = InMemoryFeed::new();
        let insert_only = WatchCallbacks::<Candidato>::new().on_insert(|_| {});
        let watcher = TableWatcher::mount(Arc::new(feed.clone()), "public", "candidatos", insert_only);

        assert!(watcher.is_connected());
        assert_eq!(watcher.subscription_count(), 1);
        assert_eq!(feed.stats().active, 1);
    }

    #[test]
    fn test_without_callbacks_is_disconnected() {
        let feed = InMemoryFeed::new();
        let watcher: TableWatcher<Candidato> =
            TableWatcher::mount(Arc::new(feed.clone()), "public", "candidatos", WatchCallbacks::new());

        assert!(!watcher.is_connected());
        assert_eq!(feed.stats().acquired, 0);
    }

    #[test]
    fn test_rows_are_narrowed_per_kind() {
        let feed = InMemoryFeed::new();
        let (seen, callbacks) = recorder();
        let mut watcher = TableWatcher::mount(Arc::new(feed.clone()), "public", "candidatos", callbacks);

        feed.publish(
            "public",
            "candidatos",
            ChangeEvent::Insert {
                row: row(json!({ "id": 1, "nome": "Ana" })),
            },
        );
        feed.publish(
            "public",
            "candidatos",
            ChangeEvent::Update {
                row: row(json!({ "id": 1, "nome": "Ana Paula" })),
                old: Some(row(json!({ "id": 1, "nome": "Ana" }))),
            },
        );
        feed.publish(
            "public",
            "candidatos",
            ChangeEvent::Delete {
                old: row(json!({ "id": 1, "nome": "Ana Paula" })),
            },
        );

        assert_eq!(watcher.pump().unwrap(), 3);
        let mut seen = seen.lock().unwrap().clone();
        seen.sort_by_key(|(kind, _)| kind.to_string());
        assert_eq!(
            seen,
            vec![
                (ChangeKind::Delete, Candidato { id: 1, nome: "Ana Paula".into() }),
                (ChangeKind::Insert, Candidato { id: 1, nome: "Ana".into() }),
                (ChangeKind::Update, Candidato { id: 1, nome: "Ana Paula".into() }),
            ]
        );
    }

    #[test]
    fn test_table_change_reopens_same_number_of_subscriptions() {
        let feed = InMemoryFeed::new();
        let callbacks = WatchCallbacks::<Candidato>::new()
            .on_insert(|_| {})
            .on_delete(|_| {});
        let mut watcher = TableWatcher::mount(Arc::new(feed.clone()), "public", "candidatos", callbacks);
        let before: Vec<_> = watcher.registry.ids().collect();

        assert!(!watcher.set_table("candidatos"));
        assert!(watcher.set_table("partidos"));

        assert_eq!(watcher.subscription_count(), 2);
        assert!(before.iter().all(|id| !feed.is_active(*id)));
        assert_eq!(feed.subscribed_tables(), vec!["partidos".to_string(), "partidos".to_string()]);
        assert_eq!(feed.stats().released, 2);
    }

    #[test]
    fn test_callback_change_resubscribes() {
        let feed = InMemoryFeed::new();
        let mut watcher = TableWatcher::mount(
            Arc::new(feed.clone()),
            "public",
            "resultados",
            WatchCallbacks::<Value>::new().on_update(|_| {}),
        );

        watcher.set_callbacks(WatchCallbacks::new().on_update(|_| {}));
        assert_eq!(feed.stats().acquired, 2);
        assert_eq!(feed.stats().active, 1);

        watcher.set_callbacks(WatchCallbacks::new());
        assert!(!watcher.is_connected());
        assert_eq!(feed.stats().active, 0);
    }

    #[test]
    fn test_malformed_row_is_reported() {
        let feed = InMemoryFeed::new();
        let (seen, callbacks) = recorder();
        let mut watcher = TableWatcher::mount(Arc::new(feed.clone()), "public", "candidatos", callbacks);

        feed.publish(
            "public",
            "candidatos",
            ChangeEvent::Insert {
                row: row(json!({ "id": "not a number" })),
            },
        );

        assert!(matches!(
            watcher.pump(),
            Err(WatchError::MalformedRow {
                kind: ChangeKind::Insert,
                ..
            })
        ));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_unmount_releases_everything() {
        let feed = InMemoryFeed::new();
        let (_, callbacks) = recorder();
        let mut watcher = TableWatcher::mount(Arc::new(feed.clone()), "public", "candidatos", callbacks);
        assert_eq!(feed.stats().active, 3);

        watcher.unmount();
        assert!(!watcher.is_connected());
        drop(watcher);
        assert_eq!(feed.stats().released, 3);
    }

    #[tokio::test]
    async fn test_next_dispatches_from_any_channel() {
        let feed = InMemoryFeed::new();
        let (seen, callbacks) = recorder();
        let mut watcher = TableWatcher::mount(Arc::new(feed.clone()), "public", "candidatos", callbacks);

        feed.publish(
            "public",
            "candidatos",
            ChangeEvent::Delete {
                old: row(json!({ "id": 5, "nome": "Rui" })),
            },
        );

        assert_eq!(watcher.next().await.unwrap().unwrap(), ChangeKind::Delete);
        assert_eq!(seen.lock().unwrap()[0].1.nome, "Rui");
    }
}
