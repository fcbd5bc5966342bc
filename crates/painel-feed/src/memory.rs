//! In-process change feed.
//!
//! [`InMemoryFeed`] implements the [`ChangeFeed`] contract without a network
//! connection. Changes are pushed in with [`InMemoryFeed::publish`] and routed
//! to every registered subscription whose table, event kind and row filter
//! admit them. Delivery order follows subscription ids, so it is
//! deterministic, but views must not rely on it across channels.
//!
//! The feed keeps acquisition and release counters, which makes leaked
//! channels visible to tests.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use painel_bridge::change::{ChangeError, ChangeEvent, RawChange};
use painel_bridge::status::SystemSignal;
use tokio::sync::mpsc::{self, UnboundedSender};

use crate::feed::{ChangeFeed, SYSTEM_CHANNEL, SubscriptionRequest};
use crate::handle::{Release, Subscription, SubscriptionHandle, SubscriptionId, SystemHandle};

/// Counters describing the subscription traffic of a feed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedStats {
    /// Subscriptions ever opened, system channels included.
    pub acquired: u64,
    /// Subscriptions released.
    pub released: u64,
    /// Subscriptions currently registered.
    pub active: usize,
}

enum Route {
    Table {
        request: SubscriptionRequest,
        tx: UnboundedSender<ChangeEvent>,
    },
    System {
        tx: UnboundedSender<SystemSignal>,
    },
}

impl Route {
    fn channel(&self) -> &str {
        match self {
            Route::Table { request, .. } => &request.channel,
            Route::System { .. } => SYSTEM_CHANNEL,
        }
    }
}

#[derive(Default)]
struct RouterState {
    next_id: u64,
    routes: BTreeMap<SubscriptionId, Route>,
    acquired: u64,
    released: u64,
}

#[derive(Default)]
struct Router {
    state: Mutex<RouterState>,
}

impl Router {
    fn lock(&self) -> MutexGuard<'_, RouterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn register(&self, route: Route) -> SubscriptionId {
        let mut state = self.lock();
        state.next_id += 1;
        state.acquired += 1;
        let id = SubscriptionId(state.next_id);
        log::debug!("Registered {id} on channel {}", route.channel());
        state.routes.insert(id, route);
        id
    }
}

impl Release for Router {
    fn release(&self, id: SubscriptionId) -> bool {
        let mut state = self.lock();
        match state.routes.remove(&id) {
            Some(route) => {
                state.released += 1;
                log::debug!("Unregistered {id} from channel {}", route.channel());
                true
            }
            None => false,
        }
    }
}

/// Change feed living entirely in the current process.
#[derive(Clone, Default)]
pub struct InMemoryFeed {
    router: Arc<Router>,
}

impl InMemoryFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers `event` for `schema.table` to every admitting subscription.
    /// Returns the number of subscriptions it was delivered to.
    pub fn publish(&self, schema: &str, table: &str, event: ChangeEvent) -> usize {
        let state = self.router.lock();
        let mut delivered = 0;
        for route in state.routes.values() {
            if let Route::Table { request, tx } = route {
                if request.admits(schema, table, &event) && tx.send(event.clone()).is_ok() {
                    delivered += 1;
                }
            }
        }
        log::debug!(
            "Published {} on {schema}.{table} to {delivered} subscription(s)",
            event.kind()
        );
        delivered
    }

    /// Narrows a payload in the hosted feed's shape and publishes it. Payloads
    /// without a schema are attributed to `default_schema`.
    pub fn publish_raw(&self, default_schema: &str, change: RawChange) -> Result<usize, ChangeError> {
        let schema = change
            .schema
            .clone()
            .unwrap_or_else(|| default_schema.to_string());
        let table = change.table.clone();
        let event = change.into_event()?;
        Ok(self.publish(&schema, &table, event))
    }

    /// Delivers a lifecycle signal to every system channel.
    pub fn signal(&self, signal: SystemSignal) -> usize {
        let state = self.router.lock();
        let mut delivered = 0;
        for route in state.routes.values() {
            if let Route::System { tx } = route {
                if tx.send(signal).is_ok() {
                    delivered += 1;
                }
            }
        }
        delivered
    }

    /// Announces that the connection went away.
    pub fn close(&self) -> usize {
        log::info!("Closing the in-memory change feed");
        self.signal(SystemSignal::Closed)
    }

    pub fn stats(&self) -> FeedStats {
        let state = self.router.lock();
        FeedStats {
            acquired: state.acquired,
            released: state.released,
            active: state.routes.len(),
        }
    }

    pub fn is_active(&self, id: SubscriptionId) -> bool {
        self.router.lock().routes.contains_key(&id)
    }

    /// Channel names of all registered subscriptions, in id order.
    pub fn channels(&self) -> Vec<String> {
        self.router
            .lock()
            .routes
            .values()
            .map(|route| route.channel().to_string())
            .collect()
    }

    /// Tables with at least one registered subscription, in id order.
    pub fn subscribed_tables(&self) -> Vec<String> {
        self.router
            .lock()
            .routes
            .values()
            .filter_map(|route| match route {
                Route::Table { request, .. } => Some(request.table.clone()),
                Route::System { .. } => None,
            })
            .collect()
    }
}

impl ChangeFeed for InMemoryFeed {
    fn subscribe(&self, request: SubscriptionRequest) -> SubscriptionHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let channel = request.channel.clone();
        let id = self.router.register(Route::Table { request, tx });
        Subscription::new(id, channel, rx, self.router.clone())
    }

    fn subscribe_system(&self) -> SystemHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        // the join is acknowledged right away, there is no remote side
        let _ = tx.send(SystemSignal::Subscribed);
        let id = self.router.register(Route::System { tx });
        Subscription::new(id, SYSTEM_CHANNEL, rx, self.router.clone())
    }
}

impl Release for InMemoryFeed {
    fn release(&self, id: SubscriptionId) -> bool {
        self.router.release(id)
    }
}

#[cfg(test)]
mod tests {
    use painel_bridge::change::{EventFilter, Row};
    use painel_bridge::filter::RowFilter;
    use serde_json::json;

    use super::*;

    fn row(value: serde_json::Value) -> Row {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_subscribe_and_release_updates_stats() {
        let feed = InMemoryFeed::new();
        let mut handle =
            feed.subscribe(SubscriptionRequest::table("public", "partidos", EventFilter::Any));
        assert_eq!(
            feed.stats(),
            FeedStats {
                acquired: 1,
                released: 0,
                active: 1
            }
        );
        assert!(feed.is_active(handle.id()));

        assert!(handle.release());
        let shared: Arc<dyn ChangeFeed> = Arc::new(feed.clone());
        assert!(!shared.release(handle.id()));
        assert_eq!(
            feed.stats(),
            FeedStats {
                acquired: 1,
                released: 1,
                active: 0
            }
        );
    }

    #[test]
    fn test_publish_routes_by_table_and_kind() {
        let feed = InMemoryFeed::new();
        let mut inserts =
            feed.subscribe(SubscriptionRequest::table("public", "candidatos", EventFilter::Insert));
        let mut deletes =
            feed.subscribe(SubscriptionRequest::table("public", "candidatos", EventFilter::Delete));
        let mut other =
            feed.subscribe(SubscriptionRequest::table("public", "partidos", EventFilter::Any));

        let delivered = feed.publish(
            "public",
            "candidatos",
            ChangeEvent::Insert {
                row: row(json!({ "id": 1 })),
            },
        );

        assert_eq!(delivered, 1);
        assert!(inserts.try_recv().is_some());
        assert!(deletes.try_recv().is_none());
        assert!(other.try_recv().is_none());
    }

    #[test]
    fn test_publish_applies_row_filter() {
        let feed = InMemoryFeed::new();
        let mut scoped = feed.subscribe(
            SubscriptionRequest::table("public", "admin_notifications", EventFilter::Insert)
                .with_filter(RowFilter::eq("user_id", "3")),
        );

        for user_id in [3, 4, 3] {
            feed.publish(
                "public",
                "admin_notifications",
                ChangeEvent::Insert {
                    row: row(json!({ "user_id": user_id })),
                },
            );
        }

        assert!(scoped.try_recv().is_some());
        assert!(scoped.try_recv().is_some());
        assert!(scoped.try_recv().is_none());
    }

    #[test]
    fn test_fifo_within_a_channel() {
        let feed = InMemoryFeed::new();
        let mut handle =
            feed.subscribe(SubscriptionRequest::table("public", "resultados", EventFilter::Any));

        for id in 0..5 {
            feed.publish(
                "public",
                "resultados",
                ChangeEvent::Insert {
                    row: row(json!({ "id": id })),
                },
            );
        }

        let ids: Vec<_> = std::iter::from_fn(|| handle.try_recv())
            .map(|event| event.subject_row()["id"].clone())
            .collect();
        assert_eq!(ids, vec![json!(0), json!(1), json!(2), json!(3), json!(4)]);
    }

    #[test]
    fn test_released_handles_receive_nothing() {
        let feed = InMemoryFeed::new();
        let mut handle =
            feed.subscribe(SubscriptionRequest::table("public", "eleitorado", EventFilter::Any));
        let insert = ChangeEvent::Insert {
            row: row(json!({ "id": 1 })),
        };

        feed.publish("public", "eleitorado", insert.clone());
        handle.release();
        assert_eq!(feed.publish("public", "eleitorado", insert), 0);
        assert!(handle.try_recv().is_none());
    }

    #[test]
    fn test_publish_raw_uses_default_schema() {
        let feed = InMemoryFeed::new();
        let mut handle =
            feed.subscribe(SubscriptionRequest::table("public", "coligacoes", EventFilter::Update));
        let change: RawChange = serde_json::from_value(json!({
            "eventType": "UPDATE",
            "table": "coligacoes",
            "new": { "id": 2, "nome": "Frente" },
            "old": {},
        }))
        .unwrap();

        assert_eq!(feed.publish_raw("public", change).unwrap(), 1);
        assert_eq!(
            handle.try_recv().map(|event| event.kind()),
            Some(painel_bridge::change::ChangeKind::Update)
        );
    }

    #[test]
    fn test_system_channel_is_acknowledged_and_signalled() {
        let feed = InMemoryFeed::new();
        let mut system = feed.subscribe_system();

        assert_eq!(system.channel(), SYSTEM_CHANNEL);
        assert_eq!(system.try_recv(), Some(SystemSignal::Subscribed));
        assert_eq!(feed.signal(SystemSignal::ChannelError), 1);
        assert_eq!(system.try_recv(), Some(SystemSignal::ChannelError));
        assert_eq!(feed.close(), 1);
        assert_eq!(system.try_recv(), Some(SystemSignal::Closed));
    }

    #[test]
    fn test_channels_lists_registered_names() {
        let feed = InMemoryFeed::new();
        let _system = feed.subscribe_system();
        let _table = feed.subscribe(
            SubscriptionRequest::table("public", "admin_notifications", EventFilter::Insert),
        );

        assert_eq!(
            feed.channels(),
            vec!["system".to_string(), "public:admin_notifications".to_string()]
        );
        assert_eq!(feed.subscribed_tables(), vec!["admin_notifications".to_string()]);
    }
}
