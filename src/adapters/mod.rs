// Adapters layer: concrete implementations of the domain ports (map surface, project stores)

pub mod http;
pub mod scene;
pub mod storage;

pub use http::HttpProjectStore;
pub use scene::SceneMap;
pub use storage::LocalProjectStore;
