//! gradebook-store — `EvaluationStore` adapters and configuration.
//!
//! Implements the store trait for an in-process map, a local JSON file, and
//! a remote HTTP document API, and builds the configured one.

pub mod config;
pub mod file;
pub mod http;
pub mod memory;

pub use config::{create_store, load_config, load_config_from, GradebookConfig, StoreConfig};
pub use file::JsonFileStore;
pub use http::HttpStore;
pub use memory::InMemoryStore;
