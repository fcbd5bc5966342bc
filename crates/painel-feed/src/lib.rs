//! Change-feed contract and its in-process implementation.
//!
//! This crate owns the boundary with the database change stream:
//! - [`ChangeFeed`], the subscribe/release contract views are built against.
//! - [`Subscription`] handles, released exactly once (explicitly or on drop).
//! - [`InMemoryFeed`], a feed routing published changes inside the process.
//! - Loading of the application configuration.
//!
//! The hosted platform delivering changes over the network is not part of
//! this crate; anything implementing [`ChangeFeed`] can stand in for it.

pub mod config;
mod feed;
mod handle;
mod memory;

pub use crate::feed::{ChangeFeed, SYSTEM_CHANNEL, SubscriptionRequest};
pub use crate::handle::{
    Release, Subscription, SubscriptionHandle, SubscriptionId, SystemHandle,
};
pub use crate::memory::{FeedStats, InMemoryFeed};
