use crate::domain::model::{Bounds, Highlight, Overlay, OverlayId, OverlayStyle};
use crate::utils::error::Result;
use async_trait::async_trait;

/// The map the overlays are drawn on.
pub trait MapSurface {
    fn attach(&mut self, overlay: &Overlay);
    fn detach(&mut self, id: OverlayId);
    fn restyle(&mut self, id: OverlayId, style: &OverlayStyle);
    fn fit_bounds(&mut self, bounds: Bounds);
    fn show_highlight(&mut self, highlight: &Highlight);
    fn clear_highlight(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationHandle {
    pub id: u64,
    pub height_px: u32,
    pub bottom_px: u32,
}

pub trait Notifier {
    fn show(&mut self, message: &str, color: &str, duration_ms: u64, offset_px: u32)
        -> NotificationHandle;
}

/// 專案／使用者資料夾的存取介面
#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn list_projects(&self) -> Result<Vec<String>>;
    async fn create_project(&self, raw_name: &str) -> Result<String>;
    async fn list_users(&self) -> Result<Vec<String>>;
    async fn list_kml_files(&self, project: &str) -> Result<Vec<String>>;
    async fn read_kml(&self, project: &str, file_name: &str) -> Result<String>;
    async fn save_user_settings(&self, user: &str, settings: &serde_json::Value) -> Result<()>;
}

pub trait ConfigProvider {
    fn projects_root(&self) -> &str;
    fn users_root(&self) -> &str;
    fn server_url(&self) -> Option<&str>;
    fn line_style(&self) -> crate::domain::model::LineStyle;
    fn notification_duration_ms(&self) -> u64;
}
