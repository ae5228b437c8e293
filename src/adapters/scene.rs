use crate::domain::model::{Bounds, Highlight, Overlay, OverlayId, OverlayKind, OverlayStyle};
use crate::domain::ports::MapSurface;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct SceneItem {
    pub kind: OverlayKind,
    pub style: OverlayStyle,
    pub feature_count: usize,
    pub popup_count: usize,
}

/// In-memory map surface. Tracks what is drawn, in which order and style,
/// plus the current viewport and hover outline.
#[derive(Debug, Default)]
pub struct SceneMap {
    items: HashMap<OverlayId, SceneItem>,
    draw_order: Vec<OverlayId>,
    viewport: Option<Bounds>,
    highlight: Option<Highlight>,
}

impl SceneMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_attached(&self, id: OverlayId) -> bool {
        self.items.contains_key(&id)
    }

    pub fn attached_count(&self) -> usize {
        self.items.len()
    }

    pub fn item(&self, id: OverlayId) -> Option<&SceneItem> {
        self.items.get(&id)
    }

    pub fn style_of(&self, id: OverlayId) -> Option<&OverlayStyle> {
        self.items.get(&id).map(|item| &item.style)
    }

    /// Bottom to top.
    pub fn draw_order(&self) -> &[OverlayId] {
        &self.draw_order
    }

    pub fn viewport(&self) -> Option<Bounds> {
        self.viewport
    }

    pub fn highlight(&self) -> Option<&Highlight> {
        self.highlight.as_ref()
    }
}

impl MapSurface for SceneMap {
    fn attach(&mut self, overlay: &Overlay) {
        let item = SceneItem {
            kind: overlay.kind,
            style: overlay.style.clone(),
            feature_count: overlay.features.features.len(),
            popup_count: overlay.popups.len(),
        };
        if self.items.insert(overlay.id, item).is_none() {
            self.draw_order.push(overlay.id);
        }
    }

    fn detach(&mut self, id: OverlayId) {
        if self.items.remove(&id).is_some() {
            self.draw_order.retain(|other| *other != id);
        }
    }

    fn restyle(&mut self, id: OverlayId, style: &OverlayStyle) {
        if let Some(item) = self.items.get_mut(&id) {
            item.style = style.clone();
        }
    }

    fn fit_bounds(&mut self, bounds: Bounds) {
        tracing::debug!(
            "Viewport -> [{:.5}, {:.5}] - [{:.5}, {:.5}]",
            bounds.south,
            bounds.west,
            bounds.north,
            bounds.east
        );
        self.viewport = Some(bounds);
    }

    fn show_highlight(&mut self, highlight: &Highlight) {
        self.highlight = Some(highlight.clone());
    }

    fn clear_highlight(&mut self) {
        self.highlight = None;
    }
}
