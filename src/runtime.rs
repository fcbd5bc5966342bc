//! Replay runtime: mounts the dashboard views on an in-memory feed and
//! drives them from newline-delimited JSON on stdin.

use std::sync::Arc;

use painel_bridge::change::Row;
use painel_bridge::config::Config;
use painel_bridge::{MessageToUi, UiChannels};
use painel_feed::{ChangeFeed, InMemoryFeed};
use painel_realtime::{
    ChannelAlerter, NotificationCenter, StatusMonitor, TableWatcher, WatchCallbacks,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::{Receiver, Sender};

use crate::replay::{self, ReplayRecord};

/// Every view of the dashboard, mounted on one feed.
pub struct Dashboard {
    feed: InMemoryFeed,
    schema: String,
    views_tx: Sender<MessageToUi>,
    status: StatusMonitor,
    notifications: NotificationCenter<ChannelAlerter>,
    watchers: Vec<TableWatcher<Row>>,
}

fn forward_row(
    tx: &Sender<MessageToUi>,
    table: &str,
    kind: painel_bridge::change::ChangeKind,
) -> impl FnMut(Row) + Send + 'static {
    let tx = tx.clone();
    let table = table.to_string();
    move |row: Row| {
        let message = MessageToUi::RowChanged {
            table: table.clone(),
            kind,
            row,
        };
        if let Err(err) = tx.try_send(message) {
            log::warn!("Dropping {kind} on {table}: {err}");
        }
    }
}

fn row_callbacks(tx: &Sender<MessageToUi>, table: &str) -> WatchCallbacks<Row> {
    use painel_bridge::change::ChangeKind;

    WatchCallbacks::new()
        .on_insert(forward_row(tx, table, ChangeKind::Insert))
        .on_update(forward_row(tx, table, ChangeKind::Update))
        .on_delete(forward_row(tx, table, ChangeKind::Delete))
}

impl Dashboard {
    pub fn mount(config: &Config, feed: InMemoryFeed, views_tx: Sender<MessageToUi>) -> Self {
        let shared: Arc<dyn ChangeFeed> = Arc::new(feed.clone());

        let status = StatusMonitor::mount(&shared);
        let notifications = NotificationCenter::mount(
            shared.clone(),
            ChannelAlerter::new(views_tx.clone()),
            config,
        );
        if notifications.scope().is_none() {
            log::warn!("No user id configured, notifications are disabled");
        }

        let watchers = config
            .watched_tables
            .iter()
            .map(|table| {
                TableWatcher::mount(
                    shared.clone(),
                    config.schema.clone(),
                    table.clone(),
                    row_callbacks(&views_tx, table),
                )
            })
            .collect();

        log::info!("Mounted dashboard on channels {:?}", feed.channels());

        Self {
            feed,
            schema: config.schema.clone(),
            views_tx,
            status,
            notifications,
            watchers,
        }
    }

    /// Publishes one replayed line. Malformed lines are logged and skipped.
    pub fn replay_line(&self, line: &str) {
        let record = match replay::parse_line(line) {
            Ok(Some(record)) => record,
            Ok(None) => return,
            Err(err) => {
                log::warn!("Skipping unreadable line: {err}");
                return;
            }
        };
        self.apply(record);
    }

    pub fn apply(&self, record: ReplayRecord) {
        match record.apply(&self.feed, &self.schema) {
            Ok(0) => log::debug!("Record reached no subscription"),
            Ok(reached) => log::trace!("Record reached {reached} subscription(s)"),
            Err(err) => log::warn!("Skipping invalid change: {err}"),
        }
    }

    /// Drains everything queued on every view.
    pub fn pump(&mut self) {
        if self.status.pump() {
            let status = self.status.status();
            if let Err(err) = self.views_tx.try_send(MessageToUi::StatusChanged(status)) {
                log::warn!("Dropping status change to {status}: {err}");
            }
        }

        loop {
            match self.notifications.pump() {
                Ok(_) => break,
                Err(err) => log::warn!("Discarding notification: {err}"),
            }
        }

        for watcher in &mut self.watchers {
            loop {
                match watcher.pump() {
                    Ok(_) => break,
                    Err(err) => log::warn!("Discarding row: {err}"),
                }
            }
        }
    }

    pub fn unread_count(&self) -> usize {
        self.notifications.unread_count()
    }

    /// Announces the disconnect to the views, then releases every
    /// subscription. Does nothing once shut down.
    pub fn shutdown(&mut self) {
        if !self.status.is_mounted() {
            return;
        }
        self.feed.close();
        self.pump();

        self.notifications.unmount();
        for watcher in &mut self.watchers {
            watcher.unmount();
        }
        self.status.unmount();

        let stats = self.feed.stats();
        log::info!(
            "Released {} of {} subscription(s)",
            stats.released,
            stats.acquired
        );
    }
}

/// Logs what the UI would show.
fn render(ui_rx: &mut Receiver<MessageToUi>) {
    while let Ok(message) = ui_rx.try_recv() {
        match message {
            MessageToUi::Alert(alert) => {
                log::info!("[{}] {}: {}", alert.style, alert.title, alert.description)
            }
            MessageToUi::StatusChanged(status) => log::info!("Connection: {status}"),
            MessageToUi::RowChanged { table, kind, row } => {
                log::info!("{kind} on {table}: {}", serde_json::Value::Object(row))
            }
        }
    }
}

/// Replays stdin until EOF or Ctrl-C.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let UiChannels { mut ui_rx, views_tx } = UiChannels::new(config.ui_buffer);
    let mut dashboard = Dashboard::mount(&config, InMemoryFeed::new(), views_tx);
    dashboard.pump();
    render(&mut ui_rx);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => dashboard.replay_line(&line),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                log::info!("Interrupted");
                break;
            }
        }
        dashboard.pump();
        render(&mut ui_rx);
    }

    dashboard.shutdown();
    render(&mut ui_rx);
    log::info!("{} notification(s) received", dashboard.unread_count());
    Ok(())
}
