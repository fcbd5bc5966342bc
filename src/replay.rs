//! Newline-delimited JSON records fed into the in-memory change feed.

use painel_bridge::change::{ChangeError, RawChange};
use painel_bridge::status::SystemSignal;
use painel_feed::InMemoryFeed;
use serde::Deserialize;

/// One replayed line: either a row change in the hosted feed's payload shape
/// or a lifecycle signal for the system channel.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ReplayRecord {
    System { system: SystemSignal },
    Change(RawChange),
}

/// Parses one line. Blank lines and lines starting with `#` yield `None`.
pub fn parse_line(line: &str) -> Result<Option<ReplayRecord>, serde_json::Error> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    serde_json::from_str(line).map(Some)
}

impl ReplayRecord {
    /// Publishes the record. Returns the number of subscriptions reached.
    pub fn apply(self, feed: &InMemoryFeed, default_schema: &str) -> Result<usize, ChangeError> {
        match self {
            ReplayRecord::System { system } => Ok(feed.signal(system)),
            ReplayRecord::Change(change) => feed.publish_raw(default_schema, change),
        }
    }
}
