//! Publish/subscribe channel broadcaster for push events.

mod hub;
mod message;
mod ticker;

pub use hub::{ChannelHub, ConnectionGuard, ConnectionId};
pub use message::{now_iso, ClientMessage, ServerMessage};
pub use ticker::{collect_stats, spawn_stats_ticker, STATS_CHANNEL};
