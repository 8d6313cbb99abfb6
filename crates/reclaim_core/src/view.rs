//! Stable position-to-handle mapping for filtered presentations of items.

use crate::types::{Handle, Item};

/// A filtered view over a scan result.
///
/// Positions are only meaningful for the view they came from; callers turn
/// them into handles immediately and act on handles. Rebuild the view
/// whenever the filter changes.
#[derive(Debug, Clone, Default)]
pub struct FilteredView {
    handles: Vec<Handle>,
}

impl FilteredView {
    pub fn build<'a, I, F>(items: I, mut keep: F) -> Self
    where
        I: IntoIterator<Item = &'a Item>,
        F: FnMut(&Item) -> bool,
    {
        Self {
            handles: items
                .into_iter()
                .filter(|item| keep(item))
                .map(|item| item.handle().clone())
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn handle_at(&self, position: usize) -> Option<&Handle> {
        self.handles.get(position)
    }

    /// Resolves a set of visible positions to handles, ignoring stale ones.
    pub fn handles_at(&self, positions: &[usize]) -> Vec<Handle> {
        positions
            .iter()
            .filter_map(|&p| self.handle_at(p).cloned())
            .collect()
    }

    pub fn position_of(&self, handle: &Handle) -> Option<usize> {
        self.handles.iter().position(|h| h == handle)
    }

    pub fn handles(&self) -> &[Handle] {
        &self.handles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Kind;

    fn items() -> Vec<Item> {
        ["a.jpg", "b.mp4", "c.jpg", "d.zip"]
            .iter()
            .map(|name| Item::new(Handle::from(format!("/src/{name}")), *name, None, 1, None, false))
            .collect()
    }

    #[test]
    fn test_selection_survives_refilter() {
        let items = items();
        let all = FilteredView::build(&items, |_| true);
        let picked = all.handles_at(&[2]);
        assert_eq!(picked[0].as_str(), "/src/c.jpg");

        let images = FilteredView::build(&items, |i| i.kind() == Kind::Image);
        assert_eq!(images.len(), 2);
        assert_eq!(images.position_of(&picked[0]), Some(1));
        assert_eq!(images.handle_at(1), Some(&picked[0]));
    }

    #[test]
    fn test_stale_positions_are_dropped() {
        let items = items();
        let view = FilteredView::build(&items, |i| i.kind() == Kind::Archive);
        assert_eq!(view.handles_at(&[0, 3, 9]).len(), 1);
    }
}
