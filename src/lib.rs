//! Model Browser: declarative per-model list/query/CSV handlers over pluggable accessors,
//! plus a publish/subscribe channel broadcaster.

pub mod broadcast;
pub mod config;
pub mod error;
pub mod handlers;
pub mod model;
pub mod query;
pub mod response;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;
pub mod store;

pub use broadcast::{spawn_stats_ticker, ChannelHub, ConnectionGuard, STATS_CHANNEL};
pub use config::{load_models_file, FieldDescriptor, FieldType, Settings};
pub use error::{AppError, ConfigError};
pub use model::{FieldValue, InMemoryAccessor, ModelAccessor, ModelDescriptor, ModelRegistry, Record, RecordId};
pub use query::{execute, QueryOutput, QueryParams};
pub use response::{csv_attachment, success_one, success_page};
pub use routes::{app, common_routes, model_routes, ws_routes, API_PREFIX};
pub use service::PgTableAccessor;
pub use state::AppState;
pub use store::{discover_tables, introspect_table, register_discovered};
