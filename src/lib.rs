pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliConfig, Command};
pub use config::ViewerConfig;

pub use adapters::{HttpProjectStore, LocalProjectStore, SceneMap};
pub use core::{ingest::Ingestor, list::ListController, notify::NotificationCenter, registry::LayerRegistry};
pub use utils::error::{Result, ViewerError};
