/// Database connection and schema management
pub mod database;

/// Engine settings loaded from config.toml
pub mod settings;

pub use settings::{EngineConfig, load_config, load_default_config};
