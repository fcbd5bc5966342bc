use serde::{Deserialize, Serialize};

/// Lifecycle signals delivered on the feed's system-level channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemSignal {
    /// The channel join was confirmed by the platform.
    Subscribed,
    /// The channel was closed.
    Closed,
    /// The platform reported an error on the channel.
    ChannelError,
    /// Any other system message; its arrival proves the link is alive.
    Event,
}

/// Tri-state view of the feed connection, derived from [`SystemSignal`]s.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    /// Waiting for the first system signal. Default value.
    #[default]
    Connecting,
    /// The system channel is live.
    Connected,
    /// The channel was closed or failed.
    Disconnected,
}

impl ConnectionStatus {
    /// Status after observing `signal`. `Disconnected` is terminal: only a
    /// fresh mount starts over from `Connecting`.
    pub fn after(self, signal: SystemSignal) -> Self {
        if self == ConnectionStatus::Disconnected {
            return self;
        }
        match signal {
            SystemSignal::Subscribed | SystemSignal::Event => ConnectionStatus::Connected,
            SystemSignal::Closed | SystemSignal::ChannelError => ConnectionStatus::Disconnected,
        }
    }
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Disconnected => "disconnected",
        })
    }
}
