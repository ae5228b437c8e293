pub mod filename;
pub mod ingest;
pub mod kml;
pub mod list;
pub mod messages;
pub mod notify;
pub mod overlay;
pub mod registry;
pub mod selection;

pub use crate::domain::model::{IncomingFile, IngestSummary, LayerEntry, LineStyle};
pub use crate::domain::ports::{ConfigProvider, MapSurface, Notifier, ProjectStore};
pub use crate::utils::error::Result;
