mod loader;
mod settings;
mod types;

pub use loader::{load_models_file, parse_models, ModelDefinition, ModelFile};
pub use settings::*;
pub use types::*;
