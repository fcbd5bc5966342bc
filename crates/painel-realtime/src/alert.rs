use painel_bridge::MessageToUi;
use painel_bridge::notification::Alert;
use tokio::sync::mpsc::{Sender, error::TrySendError};

/// Sink for transient alerts (toasts).
pub trait Alerter {
    fn alert(&self, alert: Alert);
}

impl<F: Fn(Alert)> Alerter for F {
    fn alert(&self, alert: Alert) {
        self(alert)
    }
}

/// Forwards alerts to the UI over the bridge channel.
///
/// Never waits: an alert that does not fit into the channel is dropped.
#[derive(Debug, Clone)]
pub struct ChannelAlerter {
    tx: Sender<MessageToUi>,
}

impl ChannelAlerter {
    pub fn new(tx: Sender<MessageToUi>) -> Self {
        Self { tx }
    }
}

impl Alerter for ChannelAlerter {
    fn alert(&self, alert: Alert) {
        match self.tx.try_send(MessageToUi::Alert(alert)) {
            Ok(()) => {}
            Err(TrySendError::Full(MessageToUi::Alert(alert))) => {
                log::warn!("UI channel is full, dropping alert {:?}", alert.title);
            }
            Err(err) => log::debug!("UI is gone, dropping alert: {err}"),
        }
    }
}
