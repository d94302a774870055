//! HTTP handlers for model browsing and the push channel.

pub mod model;
pub mod ws;
pub use model::*;
pub use ws::ws_upgrade;
