//! Records, accessors and the model registry.

mod accessor;
mod memory;
mod record;
mod registry;

pub use accessor::{AccessorError, ModelAccessor, Operation, RecordId};
pub use memory::InMemoryAccessor;
pub use record::{parse_float_prefix, FieldValue, Record};
pub use registry::{display_name_for_table, path_for_table, ModelDescriptor, ModelMetadata, ModelRegistry, RESERVED_PATHS};
