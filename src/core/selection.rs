use std::collections::BTreeSet;

/// Names of the selected layers plus the anchor used for range selection.
#[derive(Debug, Clone, Default)]
pub struct SelectionSet {
    members: BTreeSet<String>,
    anchor: Option<String>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.members.contains(name)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.members.iter()
    }

    /// The last layer added by a plain or modifier click, if it is still selected.
    pub fn anchor(&self) -> Option<&str> {
        self.anchor
            .as_deref()
            .filter(|name| self.members.contains(*name))
    }

    pub(crate) fn insert(&mut self, name: &str) -> bool {
        self.members.insert(name.to_string())
    }

    pub(crate) fn set_anchor(&mut self, name: &str) {
        self.anchor = Some(name.to_string());
    }

    pub(crate) fn remove(&mut self, name: &str) -> bool {
        if self.anchor.as_deref() == Some(name) {
            self.anchor = None;
        }
        self.members.remove(name)
    }

    /// Replaces the members. The stored anchor is left as is; `anchor()`
    /// hides it while it is not a member.
    pub(crate) fn replace<I>(&mut self, names: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.members = names.into_iter().collect();
    }

    pub(crate) fn clear(&mut self) {
        self.members.clear();
        self.anchor = None;
    }
}
