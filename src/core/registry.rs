use crate::core::selection::SelectionSet;
use crate::domain::model::LayerEntry;
use crate::domain::ports::MapSurface;
use crate::utils::error::{Result, ViewerError};

/// Loaded layers and the current selection.
///
/// Names are unique. Every selected name refers to an entry in the registry;
/// removing an entry also deselects it and detaches both of its overlays.
#[derive(Debug, Default)]
pub struct LayerRegistry {
    entries: Vec<LayerEntry>,
    selection: SelectionSet,
}

impl LayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<M: MapSurface>(&mut self, entry: LayerEntry, map: &mut M) -> Result<()> {
        if self.contains(&entry.name) {
            return Err(ViewerError::DuplicateName { name: entry.name });
        }

        if entry.visible {
            // 陰影線先加，主線畫在上面
            map.attach(&entry.shadow);
            map.attach(&entry.main);
        }
        tracing::debug!("Registered layer '{}'", entry.name);
        self.entries.push(entry);
        Ok(())
    }

    pub fn remove<M: MapSurface>(&mut self, name: &str, map: &mut M) -> Option<LayerEntry> {
        let index = self.entries.iter().position(|e| e.name == name)?;
        let entry = self.entries.remove(index);
        map.detach(entry.main.id);
        map.detach(entry.shadow.id);
        self.selection.remove(name);
        tracing::debug!("Removed layer '{}'", name);
        Some(entry)
    }

    pub fn clear<M: MapSurface>(&mut self, map: &mut M) {
        for entry in self.entries.drain(..) {
            map.detach(entry.main.id);
            map.detach(entry.shadow.id);
        }
        self.selection.clear();
    }

    pub fn find_by_name(&self, name: &str) -> Option<&LayerEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn find_by_name_mut(&mut self, name: &str) -> Option<&mut LayerEntry> {
        self.entries.iter_mut().find(|e| e.name == name)
    }

    pub(crate) fn get_or_unknown(&self, name: &str) -> Result<&LayerEntry> {
        self.find_by_name(name).ok_or_else(|| ViewerError::UnknownLayer {
            name: name.to_string(),
        })
    }

    pub(crate) fn get_mut_or_unknown(&mut self, name: &str) -> Result<&mut LayerEntry> {
        self.find_by_name_mut(name)
            .ok_or_else(|| ViewerError::UnknownLayer {
                name: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LayerEntry> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut LayerEntry> {
        self.entries.iter_mut()
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name.clone()).collect()
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn is_selected(&self, name: &str) -> bool {
        self.selection.contains(name)
    }

    /// Adds `name` to the selection. Unknown names are ignored.
    pub(crate) fn select(&mut self, name: &str) -> bool {
        if !self.contains(name) {
            return false;
        }
        self.selection.insert(name)
    }

    pub(crate) fn deselect(&mut self, name: &str) -> bool {
        self.selection.remove(name)
    }

    pub(crate) fn set_anchor(&mut self, name: &str) {
        if self.contains(name) {
            self.selection.set_anchor(name);
        }
    }

    pub(crate) fn replace_selection(&mut self, names: Vec<String>) {
        let known: Vec<String> = names.into_iter().filter(|n| self.contains(n)).collect();
        self.selection.replace(known);
    }

    pub(crate) fn clear_selection(&mut self) {
        self.selection.clear();
    }
}
