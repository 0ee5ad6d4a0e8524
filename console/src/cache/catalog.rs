//! Page-indexed catalog of templates

use std::ops::Range;
use std::sync::RwLock;

use tracing::warn;
use vcloud_model::Template;

#[derive(Debug, Default)]
struct CatalogState {
    /// Sparse while pages are still arriving
    slots: Vec<Option<Template>>,
    complete: bool,
}

/// Deployable templates, in server page order
#[derive(Debug, Default)]
pub struct Catalog {
    state: RwLock<CatalogState>,
}

/// Largest page a caller may ask for
pub const MAX_PAGE_SIZE: usize = 1024;

/// Slots beyond this offset are never allocated
pub const MAX_TEMPLATES: usize = 1 << 20;

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slot range of a page, or `None` when it lies outside the catalog's bounds
    pub fn page_range(page: usize, size: usize) -> Option<Range<usize>> {
        if size == 0 || size > MAX_PAGE_SIZE {
            return None;
        }
        let start = page.saturating_sub(1).checked_mul(size)?;
        let end = start.checked_add(size)?;
        (end <= MAX_TEMPLATES).then_some(start..end)
    }

    /// Place a page of templates at `(page - 1) * size`. A last page marks the catalog complete.
    /// Returns false when the page is out of bounds and was dropped.
    pub fn place_page(&self, page: usize, size: usize, templates: Vec<Template>, last: bool) -> bool {
        let Some(range) = Self::page_range(page, size) else {
            warn!("Dropping catalog page {} of size {}: out of bounds", page, size);
            return false;
        };
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        let start = range.start;
        let end = start + templates.len().min(size);
        if !templates.is_empty() && state.slots.len() < end {
            state.slots.resize(end, None);
        }
        for (i, template) in templates.into_iter().take(size).enumerate() {
            state.slots[start + i] = Some(template);
        }
        if last {
            let keep = end.min(state.slots.len());
            state.slots.truncate(keep);
            state.complete = true;
        }
        true
    }

    /// Whether any slot of the page is still missing
    pub fn has_holes(&self, page: usize, size: usize) -> bool {
        let Some(range) = Self::page_range(page, size) else {
            return false;
        };
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        if range.end > state.slots.len() {
            if !state.complete {
                return true;
            }
            if range.start >= state.slots.len() {
                return false;
            }
        }
        let end = range.end.min(state.slots.len());
        state.slots[range.start..end].iter().any(Option::is_none)
    }

    pub fn is_complete(&self) -> bool {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state.complete
    }

    /// Templates received so far, in order
    pub fn templates(&self) -> Vec<Template> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state.slots.iter().flatten().cloned().collect()
    }

    /// Templates of one page, skipping missing slots
    pub fn page(&self, page: usize, size: usize) -> Vec<Template> {
        let Some(range) = Self::page_range(page, size) else {
            return Vec::new();
        };
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        let start = range.start.min(state.slots.len());
        let end = range.end.min(state.slots.len());
        state.slots[start..end].iter().flatten().cloned().collect()
    }

    pub fn template(&self, href: &str) -> Option<Template> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state
            .slots
            .iter()
            .flatten()
            .find(|t| t.href() == Some(href))
            .cloned()
    }

    /// Apply `f` to the template with this href, returning the updated copy
    pub fn update<F>(&self, href: &str, f: F) -> Option<Template>
    where
        F: FnOnce(&mut Template),
    {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        let template = state
            .slots
            .iter_mut()
            .flatten()
            .find(|t| t.href() == Some(href))?;
        f(template);
        Some(template.clone())
    }

    /// Replace the whole catalog (cache blob restore)
    pub fn restore(&self, templates: Vec<Template>, complete: bool) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.slots = templates.into_iter().map(Some).collect();
        state.complete = complete;
    }

    pub fn len(&self) -> usize {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state.slots.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
