use tracing::{debug, trace};

use crate::mode::Layout;

/// What the host must do so a freshly activated layout shows the tracked page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// Ask the flip engine to turn to this zero-based index.
    TurnFlipEngine(usize),
    /// Scroll the element of this one-based page into view.
    ScrollIntoView(usize),
    None,
}

/// Single authority for the current one-based page.
#[derive(Debug, Clone)]
pub struct PositionTracker {
    current_page: usize,
    total_pages: usize,
    pending_jump: Option<usize>,
}

impl Default for PositionTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl PositionTracker {
    pub fn new() -> Self {
        Self {
            current_page: 1,
            total_pages: 0,
            pending_jump: None,
        }
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn total_pages(&self) -> usize {
        self.total_pages
    }

    pub fn pending_jump(&self) -> Option<usize> {
        self.pending_jump
    }

    pub fn is_navigable(&self) -> bool {
        self.total_pages > 0
    }

    pub fn set_total_pages(&mut self, total_pages: usize) {
        self.total_pages = total_pages;
        self.current_page = 1;
        self.pending_jump = None;
    }

    /// Validates a one-based target. Out-of-range targets are dropped.
    pub fn accept_target(&self, page: usize) -> Option<usize> {
        if !self.is_navigable() {
            trace!(page, "navigation ignored while page count is unknown");
            return None;
        }
        if page < 1 || page > self.total_pages {
            trace!(page, total = self.total_pages, "navigation target out of range");
            return None;
        }
        Some(page)
    }

    /// Moves directly to `page`. Returns `true` when the index changed.
    pub fn set_current(&mut self, page: usize) -> bool {
        let Some(page) = self.accept_target(page) else {
            return false;
        };
        self.pending_jump = None;
        if page == self.current_page {
            return false;
        }
        debug!(from = self.current_page, to = page, "current page changed");
        self.current_page = page;
        true
    }

    /// Remembers a jump the flip engine has yet to confirm.
    pub fn request_jump(&mut self, page: usize) -> Option<usize> {
        let page = self.accept_target(page)?;
        self.pending_jump = Some(page);
        Some(page)
    }

    pub fn next_target(&self) -> Option<usize> {
        self.accept_target(self.current_page + 1)
    }

    pub fn previous_target(&self) -> Option<usize> {
        self.current_page
            .checked_sub(1)
            .and_then(|page| self.accept_target(page))
    }

    /// Applies a zero-based flip settlement. Settlement wins over any pending
    /// jump.
    pub fn on_flip_settled(&mut self, index: usize) -> bool {
        if !self.is_navigable() {
            trace!(index, "settlement ignored while page count is unknown");
            return false;
        }
        let page = (index + 1).clamp(1, self.total_pages.max(1));
        if let Some(pending) = self.pending_jump.take() {
            if pending != page {
                debug!(pending, settled = page, "settlement overrides pending jump");
            }
        }
        if page == self.current_page {
            return false;
        }
        debug!(from = self.current_page, to = page, "flip settled");
        self.current_page = page;
        true
    }

    /// Works out how `layout` gets to show the current page without changing it.
    pub fn reconcile_for_layout(&self, layout: Layout) -> Reconciliation {
        if !self.is_navigable() {
            return Reconciliation::None;
        }
        match layout {
            Layout::Book => Reconciliation::TurnFlipEngine(self.current_page - 1),
            Layout::Scroll => Reconciliation::ScrollIntoView(self.current_page),
            Layout::Single => Reconciliation::None,
        }
    }
}
