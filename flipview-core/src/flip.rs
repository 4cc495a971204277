use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

/// Imperative side of a page-flip animation engine. Completion is reported
/// back through `ViewerEngine::on_flip_settled` with a zero-based index.
pub trait FlipEngine: Send {
    fn flip_next(&mut self);
    fn flip_prev(&mut self);
    fn turn_to_page(&mut self, index: usize);
}

#[derive(Debug, Default)]
struct FlipBookState {
    page_count: usize,
    show_cover: bool,
    index: usize,
    settled: VecDeque<usize>,
}

impl FlipBookState {
    fn spread_start(&self, index: usize) -> usize {
        if self.show_cover {
            if index == 0 {
                0
            } else {
                (index - 1) / 2 * 2 + 1
            }
        } else {
            index / 2 * 2
        }
    }

    fn spread_end(&self, index: usize) -> usize {
        let start = self.spread_start(index);
        if self.show_cover && start == 0 {
            0
        } else {
            (start + 1).min(self.page_count.saturating_sub(1))
        }
    }

    fn settle(&mut self, index: usize) {
        self.index = index;
        self.settled.push_back(index);
    }
}

/// Instant flip engine for hosts without an animation layer. Every operation
/// settles immediately; the host drains settlements with
/// [`FlipBook::take_settlements`].
#[derive(Debug, Clone, Default)]
pub struct FlipBook {
    inner: Arc<Mutex<FlipBookState>>,
}

impl FlipBook {
    pub fn new(show_cover: bool) -> Self {
        Self {
            inner: Arc::new(Mutex::new(FlipBookState {
                show_cover,
                ..FlipBookState::default()
            })),
        }
    }

    pub fn set_page_count(&self, page_count: usize) {
        let mut state = self.inner.lock();
        state.page_count = page_count;
        state.index = state.index.min(page_count.saturating_sub(1));
    }

    pub fn page_count(&self) -> usize {
        self.inner.lock().page_count
    }

    pub fn index(&self) -> usize {
        self.inner.lock().index
    }

    /// Zero-based pages shown together with `index`.
    pub fn spread(&self, index: usize) -> (usize, Option<usize>) {
        let state = self.inner.lock();
        let start = state.spread_start(index);
        let end = state.spread_end(index);
        (start, (end != start).then_some(end))
    }

    pub fn take_settlements(&self) -> Vec<usize> {
        self.inner.lock().settled.drain(..).collect()
    }
}

impl FlipEngine for FlipBook {
    fn flip_next(&mut self) {
        let mut state = self.inner.lock();
        let next = state.spread_end(state.index) + 1;
        if next >= state.page_count {
            trace!(index = state.index, "flip_next at last spread");
            return;
        }
        state.settle(next);
    }

    fn flip_prev(&mut self) {
        let mut state = self.inner.lock();
        let start = state.spread_start(state.index);
        if start == 0 {
            trace!("flip_prev at first spread");
            return;
        }
        let previous = state.spread_start(start - 1);
        state.settle(previous);
    }

    fn turn_to_page(&mut self, index: usize) {
        let mut state = self.inner.lock();
        if state.page_count == 0 {
            return;
        }
        let index = index.min(state.page_count - 1);
        state.settle(index);
    }
}
