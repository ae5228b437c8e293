use crate::core::filename::extract_key;
use crate::core::messages;
use crate::core::registry::LayerRegistry;
use crate::domain::model::{
    HexColor, Highlight, LayerEntry, LineStyle, MAX_LINE_WEIGHT, MIN_LINE_WEIGHT,
};
use crate::domain::ports::MapSurface;
use crate::utils::error::{Result, ViewerError};
use crate::utils::validation::validate_range;
use serde::Serialize;
use std::collections::HashSet;

/// Keyboard modifier held while clicking a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickModifier {
    /// Plain click: select only this row.
    None,
    /// Ctrl/Cmd click: toggle this row.
    Toggle,
    /// Shift click: select the range from the anchor to this row.
    Range,
}

/// What a list row shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowView {
    pub name: String,
    pub key: String,
    pub color: String,
    pub visible: bool,
    pub selected: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextMenuKind {
    ZoomToBounds,
    ChangeColor,
    ToggleVisibility,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextMenuItem {
    pub kind: ContextMenuKind,
    pub label: &'static str,
    pub icon: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ContextAction {
    ZoomToBounds,
    ChangeColor(HexColor),
    ToggleVisibility,
    Delete,
}

/// 清單控制器：顯示順序、選取、可見性與右鍵選單
///
/// Owns the registry and the map surface so that every change to an entry and
/// its overlays happens inside one `&mut self` call.
pub struct ListController<M: MapSurface> {
    registry: LayerRegistry,
    map: M,
    style: LineStyle,
    order: Vec<String>,
    hovered: Option<String>,
}

impl<M: MapSurface> ListController<M> {
    pub fn new(registry: LayerRegistry, map: M, style: LineStyle) -> Self {
        let mut controller = Self {
            order: registry.names(),
            registry,
            map,
            style,
            hovered: None,
        };
        controller.resort();
        controller
    }

    pub fn registry(&self) -> &LayerRegistry {
        &self.registry
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    pub fn map_mut(&mut self) -> &mut M {
        &mut self.map
    }

    pub fn style(&self) -> &LineStyle {
        &self.style
    }

    pub fn display_order(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn row_of(&self, entry: &LayerEntry) -> RowView {
        RowView {
            name: entry.name.clone(),
            key: extract_key(&entry.name),
            color: entry.color.to_string(),
            visible: entry.visible,
            selected: self.registry.is_selected(&entry.name),
        }
    }

    pub fn rows(&self) -> Vec<RowView> {
        self.order
            .iter()
            .filter_map(|name| self.registry.find_by_name(name))
            .map(|entry| self.row_of(entry))
            .collect()
    }

    pub fn row(&self, name: &str) -> Option<RowView> {
        self.registry.find_by_name(name).map(|e| self.row_of(e))
    }

    /// Selected names in display order.
    pub fn selected_names(&self) -> Vec<String> {
        self.order
            .iter()
            .filter(|name| self.registry.is_selected(name))
            .cloned()
            .collect()
    }

    /// Stores the entry, draws its overlays and inserts its row.
    pub fn insert(&mut self, entry: LayerEntry) -> Result<()> {
        let name = entry.name.clone();
        self.registry.add(entry, &mut self.map)?;
        self.order.push(name);
        self.resort();
        Ok(())
    }

    /// Ascending by decoded key; equal keys fall back to the full name.
    fn resort(&mut self) {
        self.order
            .sort_by_cached_key(|name| (extract_key(name), name.clone()));
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.order.iter().position(|n| n == name)
    }

    fn ensure_known(&self, name: &str) -> Result<()> {
        self.registry.get_or_unknown(name).map(|_| ())
    }

    /// Brings every shadow overlay in line with the selection.
    fn refresh_selection_styles(&mut self) {
        let selected: HashSet<String> = self.registry.selection().iter().cloned().collect();
        for entry in self.registry.iter_mut() {
            let wanted = self.style.shadow_style(selected.contains(&entry.name));
            if entry.shadow.style != wanted {
                entry.shadow.style = wanted;
                self.map.restyle(entry.shadow.id, &entry.shadow.style);
            }
        }
    }

    pub fn click(&mut self, name: &str, modifier: ClickModifier) -> Result<()> {
        self.ensure_known(name)?;

        match modifier {
            ClickModifier::None => self.select_only(name),
            ClickModifier::Toggle => {
                if self.registry.is_selected(name) {
                    self.registry.deselect(name);
                } else {
                    self.registry.select(name);
                    self.registry.set_anchor(name);
                }
            }
            ClickModifier::Range => {
                // 錨點被取消選取時，改用顯示順序中第一個仍被選取的列
                let anchor_index = match self.registry.selection().anchor() {
                    Some(anchor) => self.position(anchor),
                    None => self.order.iter().position(|n| self.registry.is_selected(n)),
                };
                match (anchor_index, self.position(name)) {
                    (Some(from), Some(to)) => {
                        let (start, end) = (from.min(to), from.max(to));
                        let range = self.order[start..=end].to_vec();
                        self.registry.replace_selection(range);
                    }
                    _ => self.select_only(name),
                }
            }
        }

        self.refresh_selection_styles();
        tracing::debug!(
            "Selection after {:?} click on '{}': {:?}",
            modifier,
            name,
            self.selected_names()
        );
        Ok(())
    }

    fn select_only(&mut self, name: &str) {
        self.registry.replace_selection(vec![name.to_string()]);
        self.registry.set_anchor(name);
    }

    pub fn select_all(&mut self, selected: bool) {
        if selected {
            self.registry.replace_selection(self.order.clone());
        } else {
            self.registry.clear_selection();
        }
        self.refresh_selection_styles();
    }

    /// Shows or hides both overlays of a layer. Returns the new visibility.
    pub fn toggle_visibility(&mut self, name: &str) -> Result<bool> {
        let visible = !self.registry.get_or_unknown(name)?.visible;
        self.set_visible(name, visible)?;
        Ok(visible)
    }

    pub fn set_visible(&mut self, name: &str, visible: bool) -> Result<()> {
        let entry = self.registry.get_mut_or_unknown(name)?;
        if entry.visible == visible {
            return Ok(());
        }
        if visible {
            self.map.attach(&entry.shadow);
            self.map.attach(&entry.main);
        } else {
            self.map.detach(entry.main.id);
            self.map.detach(entry.shadow.id);
        }
        entry.visible = visible;
        Ok(())
    }

    pub fn delete(&mut self, name: &str) -> Result<LayerEntry> {
        if self.hovered.as_deref() == Some(name) {
            self.hover_leave();
        }
        let entry = self
            .registry
            .remove(name, &mut self.map)
            .ok_or_else(|| ViewerError::UnknownLayer {
                name: name.to_string(),
            })?;
        self.order.retain(|n| n != name);
        tracing::info!("🗑️ Deleted layer '{}'", name);
        Ok(entry)
    }

    pub fn hover_enter(&mut self, name: &str) -> Result<()> {
        self.hover_leave();
        let entry = self.registry.get_or_unknown(name)?;
        let Some(bounds) = entry.bounds() else {
            return Ok(());
        };
        let highlight = Highlight {
            layer: name.to_string(),
            outline: bounds,
            style: self.style.highlight_style(),
            label: format!("KML {}", extract_key(name)),
            label_position: bounds.top_center(),
        };
        self.map.show_highlight(&highlight);
        self.hovered = Some(name.to_string());
        Ok(())
    }

    pub fn hover_leave(&mut self) {
        if self.hovered.take().is_some() {
            self.map.clear_highlight();
        }
    }

    pub fn zoom_to(&mut self, name: &str) -> Result<()> {
        if let Some(bounds) = self.registry.get_or_unknown(name)?.bounds() {
            self.map.fit_bounds(bounds);
        }
        Ok(())
    }

    pub fn set_color(&mut self, name: &str, color: HexColor) -> Result<()> {
        let entry = self.registry.get_mut_or_unknown(name)?;
        entry.main.style.color = color.clone();
        entry.color = color;
        self.map.restyle(entry.main.id, &entry.main.style);
        Ok(())
    }

    /// Applies a color to every selected layer. Returns how many changed.
    pub fn recolor_selection(&mut self, color: HexColor) -> Result<usize> {
        let names = self.selected_names();
        if names.is_empty() {
            return Err(ViewerError::validation(messages::NO_SELECTION));
        }
        for name in &names {
            self.set_color(name, color.clone())?;
        }
        Ok(names.len())
    }

    pub fn set_line_weight(&mut self, weight: u32) -> Result<()> {
        validate_range("line_weight", weight, MIN_LINE_WEIGHT, MAX_LINE_WEIGHT)?;
        self.style.base_weight = weight;

        let selected: HashSet<String> = self.registry.selection().iter().cloned().collect();
        for entry in self.registry.iter_mut() {
            entry.main.style.weight = weight;
            entry.shadow.style = self.style.shadow_style(selected.contains(&entry.name));
            self.map.restyle(entry.main.id, &entry.main.style);
            self.map.restyle(entry.shadow.id, &entry.shadow.style);
        }
        tracing::info!("Line weight set to {}", weight);
        Ok(())
    }

    pub fn context_menu(&self, name: &str) -> Result<Vec<ContextMenuItem>> {
        let entry = self.registry.get_or_unknown(name)?;
        let visibility = if entry.visible {
            ContextMenuItem {
                kind: ContextMenuKind::ToggleVisibility,
                label: "Hide layer",
                icon: "fa-eye-slash",
            }
        } else {
            ContextMenuItem {
                kind: ContextMenuKind::ToggleVisibility,
                label: "Show layer",
                icon: "fa-eye",
            }
        };

        Ok(vec![
            ContextMenuItem {
                kind: ContextMenuKind::ZoomToBounds,
                label: "Zoom to layer",
                icon: "fa-search",
            },
            ContextMenuItem {
                kind: ContextMenuKind::ChangeColor,
                label: "Change color",
                icon: "fa-palette",
            },
            visibility,
            ContextMenuItem {
                kind: ContextMenuKind::Delete,
                label: "Delete layer",
                icon: "fa-trash",
            },
        ])
    }

    pub fn apply_context_action(&mut self, name: &str, action: ContextAction) -> Result<()> {
        match action {
            ContextAction::ZoomToBounds => self.zoom_to(name),
            ContextAction::ChangeColor(color) => self.set_color(name, color),
            ContextAction::ToggleVisibility => self.toggle_visibility(name).map(|_| ()),
            ContextAction::Delete => self.delete(name).map(|_| ()),
        }
    }

    /// Debug dump of one row.
    pub fn inspect(&self, name: &str) -> Result<RowView> {
        let row = self.row_of(self.registry.get_or_unknown(name)?);
        tracing::debug!(
            "Layer '{}': key={} color={} visible={} selected={}",
            row.name,
            row.key,
            row.color,
            row.visible,
            row.selected
        );
        Ok(row)
    }

    /// Removes every layer, row and selection.
    pub fn clear(&mut self) {
        self.hover_leave();
        self.registry.clear(&mut self.map);
        self.order.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::scene::SceneMap;
    use crate::core::kml::parse_document;
    use crate::core::overlay::OverlayFactory;

    fn entry(name: &str, offset: f64) -> LayerEntry {
        let kml = format!(
            "<kml><Placemark><name>{name}</name><LineString><coordinates>{a},50 {b},51</coordinates></LineString></Placemark></kml>",
            name = name,
            a = 10.0 + offset,
            b = 11.0 + offset
        );
        let collection = parse_document(&kml).unwrap();
        let pair = OverlayFactory::new(LineStyle::default()).build(&collection, &HexColor::red());
        LayerEntry::new(name, pair, HexColor::red())
    }

    /// Keys "03", "01", "02" inserted out of order.
    fn controller() -> ListController<SceneMap> {
        let mut list = ListController::new(LayerRegistry::new(), SceneMap::new(), LineStyle::default());
        list.insert(entry("Befahrung_03_2024-05-17.kml", 2.0)).unwrap();
        list.insert(entry("Befahrung_01_2024-05-17.kml", 0.0)).unwrap();
        list.insert(entry("Befahrung_02_2024-05-17.kml", 1.0)).unwrap();
        list
    }

    fn name(n: u8) -> String {
        format!("Befahrung_{:02}_2024-05-17.kml", n)
    }

    fn shadow_style(list: &ListController<SceneMap>, name: &str) -> crate::domain::model::OverlayStyle {
        let id = list.registry().find_by_name(name).unwrap().shadow.id;
        list.map().style_of(id).unwrap().clone()
    }

    #[test]
    fn test_rows_sorted_by_key() {
        let list = controller();
        let keys: Vec<String> = list.rows().into_iter().map(|r| r.key).collect();
        assert_eq!(keys, vec!["01", "02", "03"]);
    }

    #[test]
    fn test_plain_click_replaces_selection_and_emphasises_shadow() {
        let mut list = controller();
        list.click(&name(1), ClickModifier::None).unwrap();
        list.click(&name(2), ClickModifier::None).unwrap();

        assert_eq!(list.selected_names(), vec![name(2)]);
        assert_eq!(shadow_style(&list, &name(2)).opacity, 1.0);
        assert_eq!(shadow_style(&list, &name(2)).weight, 12);
        assert_eq!(shadow_style(&list, &name(1)).opacity, 0.5);
        assert_eq!(shadow_style(&list, &name(1)).weight, 6);
    }

    #[test]
    fn test_toggle_click_flips_membership_only() {
        let mut list = controller();
        list.click(&name(1), ClickModifier::None).unwrap();
        list.click(&name(3), ClickModifier::Toggle).unwrap();
        assert_eq!(list.selected_names(), vec![name(1), name(3)]);

        list.click(&name(1), ClickModifier::Toggle).unwrap();
        assert_eq!(list.selected_names(), vec![name(3)]);
        assert_eq!(shadow_style(&list, &name(1)).opacity, 0.5);
    }

    #[test]
    fn test_range_click_uses_display_order() {
        let mut list = controller();
        list.click(&name(3), ClickModifier::None).unwrap();
        list.click(&name(1), ClickModifier::Range).unwrap();
        assert_eq!(list.selected_names(), vec![name(1), name(2), name(3)]);

        list.click(&name(2), ClickModifier::Range).unwrap();
        assert_eq!(list.selected_names(), vec![name(2), name(3)]);
        assert_eq!(shadow_style(&list, &name(1)).opacity, 0.5);
    }

    #[test]
    fn test_range_click_without_anchor_acts_as_plain_click() {
        let mut list = controller();
        list.click(&name(2), ClickModifier::Range).unwrap();
        assert_eq!(list.selected_names(), vec![name(2)]);
    }

    #[test]
    fn test_range_click_after_anchor_deselected_starts_at_first_selected_row() {
        let mut list = controller();
        list.insert(entry("Befahrung_04_2024-05-17.kml", 3.0)).unwrap();
        list.insert(entry("Befahrung_05_2024-05-17.kml", 4.0)).unwrap();

        list.click(&name(1), ClickModifier::None).unwrap();
        list.click(&name(2), ClickModifier::Toggle).unwrap();
        list.click(&name(2), ClickModifier::Toggle).unwrap();
        assert_eq!(list.registry().selection().anchor(), None);

        list.click(&name(4), ClickModifier::Range).unwrap();
        assert_eq!(
            list.selected_names(),
            vec![name(1), name(2), name(3), name(4)]
        );
    }

    #[test]
    fn test_toggle_visibility_twice_restores_map_state() {
        let mut list = controller();
        let entry = list.registry().find_by_name(&name(1)).unwrap();
        let (main, shadow) = (entry.main.id, entry.shadow.id);

        assert!(!list.toggle_visibility(&name(1)).unwrap());
        assert!(!list.map().is_attached(main));
        assert!(!list.map().is_attached(shadow));

        assert!(list.toggle_visibility(&name(1)).unwrap());
        assert!(list.map().is_attached(main));
        assert!(list.map().is_attached(shadow));
    }

    #[test]
    fn test_delete_removes_row_and_selection() {
        let mut list = controller();
        list.click(&name(2), ClickModifier::None).unwrap();
        list.hover_enter(&name(2)).unwrap();

        list.delete(&name(2)).unwrap();

        assert_eq!(list.display_order(), &[name(1), name(3)]);
        assert!(!list.registry().is_selected(&name(2)));
        assert!(list.map().highlight().is_none());
        assert_eq!(list.map().attached_count(), 4);
        assert!(list.delete(&name(2)).is_err());
    }

    #[test]
    fn test_hover_draws_outline_with_key_label() {
        let mut list = controller();
        list.hover_enter(&name(2)).unwrap();

        let highlight = list.map().highlight().unwrap();
        assert_eq!(highlight.label, "KML 02");
        assert_eq!(highlight.style.weight, 10);
        assert_eq!(highlight.outline.west, 11.0);
        assert_eq!(highlight.label_position.lat, 51.0);

        list.hover_leave();
        assert!(list.map().highlight().is_none());
    }

    #[test]
    fn test_context_menu_follows_visibility() {
        let mut list = controller();
        let items = list.context_menu(&name(1)).unwrap();
        assert_eq!(items.len(), 4);
        assert_eq!(items[2].label, "Hide layer");

        list.apply_context_action(&name(1), ContextAction::ToggleVisibility)
            .unwrap();
        assert_eq!(list.context_menu(&name(1)).unwrap()[2].label, "Show layer");
    }

    #[test]
    fn test_context_actions_zoom_color_delete() {
        let mut list = controller();
        list.apply_context_action(&name(3), ContextAction::ZoomToBounds)
            .unwrap();
        assert_eq!(list.map().viewport().unwrap().west, 12.0);

        let blue = HexColor::parse("#0000ff").unwrap();
        list.apply_context_action(&name(3), ContextAction::ChangeColor(blue.clone()))
            .unwrap();
        assert_eq!(list.row(&name(3)).unwrap().color, "#0000ff");
        let main = list.registry().find_by_name(&name(3)).unwrap().main.id;
        assert_eq!(list.map().style_of(main).unwrap().color, blue);

        list.apply_context_action(&name(3), ContextAction::Delete)
            .unwrap();
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_recolor_selection_requires_selection() {
        let mut list = controller();
        let green = HexColor::parse("#4caf50").unwrap();
        assert!(list.recolor_selection(green.clone()).is_err());

        list.select_all(true);
        assert_eq!(list.recolor_selection(green).unwrap(), 3);
        assert!(list.rows().iter().all(|r| r.color == "#4caf50"));
    }

    #[test]
    fn test_set_line_weight_keeps_selection_emphasis() {
        let mut list = controller();
        list.click(&name(1), ClickModifier::None).unwrap();
        list.set_line_weight(5).unwrap();

        assert_eq!(shadow_style(&list, &name(1)).weight, 20);
        assert_eq!(shadow_style(&list, &name(2)).weight, 10);
        let main = list.registry().find_by_name(&name(2)).unwrap().main.id;
        assert_eq!(list.map().style_of(main).unwrap().weight, 5);

        assert!(list.set_line_weight(0).is_err());
        assert!(list.set_line_weight(11).is_err());
    }

    #[test]
    fn test_hidden_layer_keeps_style_changes() {
        let mut list = controller();
        list.set_visible(&name(1), false).unwrap();
        list.set_color(&name(1), HexColor::parse("#00ff00").unwrap())
            .unwrap();
        list.set_visible(&name(1), true).unwrap();

        let main = list.registry().find_by_name(&name(1)).unwrap().main.id;
        assert_eq!(list.map().style_of(main).unwrap().color.as_str(), "#00ff00");
    }

    #[test]
    fn test_unknown_layer_errors() {
        let mut list = controller();
        assert!(matches!(
            list.click("nope.kml", ClickModifier::None),
            Err(ViewerError::UnknownLayer { .. })
        ));
        assert!(list.toggle_visibility("nope.kml").is_err());
        assert!(list.hover_enter("nope.kml").is_err());
    }

    #[test]
    fn test_clear_flushes_rows_and_map() {
        let mut list = controller();
        list.click(&name(1), ClickModifier::None).unwrap();
        list.clear();
        assert!(list.is_empty());
        assert!(list.registry().is_empty());
        assert_eq!(list.map().attached_count(), 0);
    }
}
