use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, instrument, trace, warn};

use crate::config::ViewerConfig;
use crate::document::{Document, DocumentProvider, DocumentRef, DocumentSource, LoadState};
use crate::error::{ConfigError, LoadError};
use crate::flip::FlipEngine;
use crate::mode::{Layout, ModeController, ModeSwitch, ViewMode, ViewportClass};
use crate::position::{PositionTracker, Reconciliation};
use crate::surface::{stack_geometry, RenderSurface, SurfaceInputs, Theme};
use crate::zoom::{PointerButton, PointerPosition, ScrollOffset, ZoomPan};
use crate::{Command, ViewerEvent};

#[derive(Debug, Clone)]
pub struct ViewerOptions {
    pub theme: Theme,
    pub viewport: ViewportClass,
    pub config: ViewerConfig,
}

impl Default for ViewerOptions {
    fn default() -> Self {
        Self {
            theme: Theme::Light,
            viewport: ViewportClass::Desktop,
            config: ViewerConfig::default(),
        }
    }
}

/// Read-only view of the state hosts render their controls from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewerSnapshot {
    pub title: String,
    pub mode: ViewMode,
    pub viewport_class: ViewportClass,
    pub theme: Theme,
    pub current_page: usize,
    pub total_pages: usize,
    pub scale: f32,
    pub page_input: String,
    pub loading: bool,
    pub load_failed: bool,
}

impl ViewerSnapshot {
    pub fn zoom_percent(&self) -> u32 {
        (self.scale * 100.0).round() as u32
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

pub struct ViewerEngine {
    config: ViewerConfig,
    document: Document,
    theme: Theme,
    modes: ModeController,
    position: PositionTracker,
    zoom: ZoomPan,
    flip: Box<dyn FlipEngine>,
    page_input: String,
    scroll: ScrollOffset,
    viewport_width: Option<f32>,
    viewport_height: Option<f32>,
    mounted: bool,
    events: Arc<Mutex<Vec<ViewerEvent>>>,
}

impl ViewerEngine {
    pub fn new(
        reference: DocumentRef,
        options: ViewerOptions,
        flip: Box<dyn FlipEngine>,
    ) -> Result<Self, ConfigError> {
        let ViewerOptions {
            theme,
            viewport,
            config,
        } = options;
        config.validate()?;

        let modes = ModeController::new(viewport, config.mobile_scale, config.desktop_scale);
        let initial_scale = modes.defaults_for(viewport).scale;
        let zoom = ZoomPan::new(
            initial_scale,
            config.min_scale,
            config.max_scale,
            config.zoom_step,
            config.drag_multiplier,
        );
        let position = PositionTracker::new();
        let page_input = position.current_page().to_string();

        Ok(Self {
            config,
            document: Document::new(reference),
            theme,
            modes,
            position,
            zoom,
            flip,
            page_input,
            scroll: ScrollOffset::default(),
            viewport_width: None,
            viewport_height: None,
            mounted: false,
            events: Arc::new(Mutex::new(Vec::new())),
        })
    }

    pub fn events(&self) -> Arc<Mutex<Vec<ViewerEvent>>> {
        Arc::clone(&self.events)
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn mode(&self) -> ViewMode {
        self.modes.mode()
    }

    pub fn layout(&self) -> Layout {
        self.modes.layout()
    }

    pub fn viewport_class(&self) -> ViewportClass {
        self.modes.viewport()
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn current_page(&self) -> usize {
        self.position.current_page()
    }

    pub fn total_pages(&self) -> usize {
        self.position.total_pages()
    }

    pub fn scale(&self) -> f32 {
        self.zoom.scale()
    }

    pub fn page_input(&self) -> &str {
        &self.page_input
    }

    pub fn scroll_offset(&self) -> ScrollOffset {
        self.scroll
    }

    pub fn is_dragging(&self) -> bool {
        self.zoom.is_dragging()
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn snapshot(&self) -> ViewerSnapshot {
        ViewerSnapshot {
            title: self.document.title().to_owned(),
            mode: self.mode(),
            viewport_class: self.viewport_class(),
            theme: self.theme,
            current_page: self.current_page(),
            total_pages: self.total_pages(),
            scale: self.scale(),
            page_input: self.page_input.clone(),
            loading: !self.position.is_navigable(),
            load_failed: self.document.state() == LoadState::Failed,
        }
    }

    pub fn surface(&self) -> RenderSurface {
        RenderSurface::build(SurfaceInputs {
            config: &self.config,
            layout: self.layout(),
            viewport: self.viewport_class(),
            theme: self.theme,
            scale: self.scale(),
            current_page: self.current_page(),
            total_pages: self.total_pages(),
            failed: self.document.state() == LoadState::Failed,
        })
    }

    /// Opens the document through `provider` and records the outcome. A
    /// failure leaves the viewer in its loading presentation.
    #[instrument(skip(self, provider), fields(reference = %self.document.reference()))]
    pub async fn open_with<P: DocumentProvider + ?Sized>(
        &mut self,
        provider: &P,
    ) -> Option<Arc<dyn DocumentSource>> {
        let reference = self.document.reference().clone();
        match provider.open(&reference).await {
            Ok(source) => {
                let info = source.info();
                self.document_loaded(info.page_count, info.title.clone());
                Some(source)
            }
            Err(err) => {
                self.document_failed(&err);
                None
            }
        }
    }

    /// Records the page count. Only the first call has any effect.
    pub fn document_loaded(&mut self, total_pages: usize, title: Option<String>) -> bool {
        if !self.document.mark_loaded(total_pages, title) {
            trace!(state = ?self.document.state(), "document load ignored");
            return false;
        }
        debug!(total_pages, "document loaded");
        self.position.set_total_pages(total_pages);
        self.scroll = ScrollOffset::default();
        self.sync_page_input();
        self.push(ViewerEvent::DocumentLoaded { total_pages });
        self.push(ViewerEvent::RedrawNeeded);
        true
    }

    pub fn document_failed(&mut self, error: &LoadError) {
        warn!(%error, "document failed to load");
        if self.document.mark_failed() {
            self.push(ViewerEvent::DocumentFailed);
            self.push(ViewerEvent::RedrawNeeded);
        }
    }

    pub fn mount(&mut self) {
        self.mounted = true;
    }

    /// Detaches input handling. An active pan ends here.
    pub fn unmount(&mut self) {
        if self.zoom.release() {
            debug!("pan released on unmount");
        }
        self.mounted = false;
    }

    pub fn set_viewport_width(&mut self, width: u32) -> bool {
        self.viewport_width = Some(width as f32);
        let class = ViewportClass::from_width(width, self.config.mobile_breakpoint);
        let changed = self.set_viewport_class(class);
        self.rebound_scroll();
        changed
    }

    /// Height of the area pages are drawn into. Only bounds scrolling.
    pub fn set_viewport_height(&mut self, height: u32) {
        self.viewport_height = Some(height as f32);
        self.rebound_scroll();
    }

    /// Reapplies the responsive defaults whenever the class changes value.
    pub fn set_viewport_class(&mut self, viewport: ViewportClass) -> bool {
        let before = self.modes.mode();
        let Some(reset) = self.modes.set_viewport_class(viewport) else {
            return false;
        };
        self.zoom.set_scale(reset.scale);
        if before != reset.mode {
            self.push(ViewerEvent::ModeChanged {
                from: before,
                to: reset.mode,
            });
        }
        self.after_layout_change();
        true
    }

    pub fn set_mode(&mut self, mode: ViewMode) -> bool {
        match self.modes.set_mode(mode) {
            ModeSwitch::Accepted { from, to } => {
                self.push(ViewerEvent::ModeChanged { from, to });
                self.after_layout_change();
                true
            }
            ModeSwitch::Unchanged | ModeSwitch::Rejected => false,
        }
    }

    pub fn set_theme(&mut self, theme: Theme) {
        if self.theme != theme {
            self.theme = theme;
            self.push(ViewerEvent::RedrawNeeded);
        }
    }

    pub fn toggle_theme(&mut self) {
        self.set_theme(self.theme.toggled());
    }

    pub fn next(&mut self) -> bool {
        if !self.position.is_navigable() {
            return false;
        }
        match self.layout() {
            Layout::Book => {
                self.flip.flip_next();
                true
            }
            Layout::Scroll | Layout::Single => match self.position.next_target() {
                Some(page) => self.go_to_page(page),
                None => false,
            },
        }
    }

    pub fn previous(&mut self) -> bool {
        if !self.position.is_navigable() {
            return false;
        }
        match self.layout() {
            Layout::Book => {
                self.flip.flip_prev();
                true
            }
            Layout::Scroll | Layout::Single => match self.position.previous_target() {
                Some(page) => self.go_to_page(page),
                None => false,
            },
        }
    }

    /// Jumps to a one-based page. Targets outside `[1, total_pages]` are
    /// ignored. In book layout the page only changes once the flip engine
    /// settles.
    pub fn go_to_page(&mut self, page: usize) -> bool {
        match self.layout() {
            Layout::Book => match self.position.request_jump(page) {
                Some(page) => {
                    self.flip.turn_to_page(page - 1);
                    true
                }
                None => false,
            },
            Layout::Scroll => {
                if self.position.accept_target(page).is_none() {
                    return false;
                }
                self.move_to(page);
                self.scroll_into_view(page);
                true
            }
            Layout::Single => {
                if self.position.accept_target(page).is_none() {
                    return false;
                }
                self.move_to(page);
                true
            }
        }
    }

    pub fn first_page(&mut self) -> bool {
        self.go_to_page(1)
    }

    pub fn last_page(&mut self) -> bool {
        let last = self.total_pages();
        self.go_to_page(last)
    }

    pub fn set_page_input(&mut self, text: impl Into<String>) {
        self.page_input = text.into();
    }

    /// Discards edits and shows the current page again.
    pub fn reset_page_input(&mut self) {
        self.sync_page_input();
    }

    /// Parses the page field and jumps. Invalid text is kept for correction.
    pub fn submit_page_input(&mut self) -> bool {
        match self.page_input.trim().parse::<usize>() {
            Ok(page) => self.go_to_page(page),
            Err(_) => {
                trace!(input = %self.page_input, "page input is not a number");
                false
            }
        }
    }

    /// Zero-based settlement from the flip engine.
    pub fn on_flip_settled(&mut self, index: usize) {
        if self.position.on_flip_settled(index) {
            self.sync_page_input();
            self.push(ViewerEvent::RedrawNeeded);
        }
    }

    pub fn zoom_in(&mut self) -> bool {
        self.zoom_by(self.zoom.step())
    }

    pub fn zoom_out(&mut self) -> bool {
        self.zoom_by(-self.zoom.step())
    }

    pub fn zoom_by(&mut self, delta: f32) -> bool {
        let changed = self.zoom.zoom_by(delta);
        if changed {
            debug!(scale = self.zoom.scale(), "zoom changed");
            self.rebound_scroll();
            self.push(ViewerEvent::RedrawNeeded);
        }
        changed
    }

    pub fn pointer_down(&mut self, button: PointerButton, pointer: PointerPosition) -> bool {
        if !self.mounted {
            return false;
        }
        let pannable = self.layout().is_pannable();
        self.zoom.press(button, pointer, self.scroll, pannable)
    }

    pub fn pointer_move(&mut self, pointer: PointerPosition) -> bool {
        if !self.mounted {
            return false;
        }
        match self.zoom.drag_to(pointer) {
            Some(offset) => {
                self.scroll = offset.bounded_by(self.scroll_limit());
                self.push(ViewerEvent::RedrawNeeded);
                true
            }
            None => false,
        }
    }

    /// Ends a pan wherever the pointer is released.
    pub fn pointer_up(&mut self) -> bool {
        self.zoom.release()
    }

    /// Native scroll reported by the host.
    pub fn set_scroll_offset(&mut self, offset: ScrollOffset) {
        self.scroll = offset.bounded_by(self.scroll_limit());
    }

    pub fn scroll_by(&mut self, delta_x: f32, delta_y: f32) -> bool {
        if !self.layout().is_pannable() {
            return false;
        }
        let next = ScrollOffset::new(self.scroll.x + delta_x, self.scroll.y + delta_y)
            .bounded_by(self.scroll_limit());
        if next == self.scroll {
            return false;
        }
        self.scroll = next;
        self.push(ViewerEvent::RedrawNeeded);
        true
    }

    pub fn apply(&mut self, command: Command) -> bool {
        match command {
            Command::NextPage => self.next(),
            Command::PrevPage => self.previous(),
            Command::GotoPage { page } => self.go_to_page(page),
            Command::FirstPage => self.first_page(),
            Command::LastPage => self.last_page(),
            Command::SetPageInput { text } => {
                self.set_page_input(text);
                true
            }
            Command::SubmitPageInput => self.submit_page_input(),
            Command::ResetPageInput => {
                self.reset_page_input();
                true
            }
            Command::SetMode { mode } => self.set_mode(mode),
            Command::ZoomIn => self.zoom_in(),
            Command::ZoomOut => self.zoom_out(),
            Command::ZoomBy { delta } => self.zoom_by(delta),
            Command::ToggleTheme => {
                self.toggle_theme();
                true
            }
            Command::SetViewportWidth { width } => self.set_viewport_width(width),
            Command::SetViewportHeight { height } => {
                self.set_viewport_height(height);
                true
            }
            Command::PointerDown { button, x, y } => {
                self.pointer_down(button, PointerPosition::new(x, y))
            }
            Command::PointerMove { x, y } => self.pointer_move(PointerPosition::new(x, y)),
            Command::PointerUp => self.pointer_up(),
            Command::ScrollBy { delta_x, delta_y } => self.scroll_by(delta_x, delta_y),
        }
    }

    fn after_layout_change(&mut self) {
        if !self.layout().is_pannable() && self.zoom.release() {
            debug!("pan released, layout has no scroll container");
        }
        self.scroll = self.scroll.bounded_by(self.scroll_limit());
        self.reconcile();
        self.push(ViewerEvent::RedrawNeeded);
    }

    fn reconcile(&mut self) {
        match self.position.reconcile_for_layout(self.layout()) {
            Reconciliation::TurnFlipEngine(index) => self.flip.turn_to_page(index),
            Reconciliation::ScrollIntoView(page) => self.scroll_into_view(page),
            Reconciliation::None => {}
        }
    }

    fn move_to(&mut self, page: usize) {
        if self.position.set_current(page) {
            self.sync_page_input();
            self.push(ViewerEvent::RedrawNeeded);
        }
    }

    fn scroll_into_view(&mut self, page: usize) {
        let geometry = stack_geometry(&self.config, self.viewport_class(), self.total_pages());
        self.scroll = ScrollOffset::new(self.scroll.x, geometry.page_top(page) * self.scale())
            .bounded_by(self.scroll_limit());
        self.push(ViewerEvent::ScrollIntoView { page });
    }

    /// Largest offset the active layout's scroll container allows. Without a
    /// reported viewport size the viewport is taken to hold one unscaled page.
    fn scroll_limit(&self) -> ScrollOffset {
        let total_pages = self.total_pages();
        if total_pages == 0 {
            return ScrollOffset::default();
        }
        let (page_width, page_height, content_height) = match self.layout() {
            Layout::Book => return ScrollOffset::default(),
            Layout::Scroll => {
                let geometry = stack_geometry(&self.config, self.viewport_class(), total_pages);
                (geometry.page_width, geometry.page_height, geometry.content_height())
            }
            Layout::Single => {
                let width = self.config.page_width as f32;
                let height = self.config.page_height_for_width(width);
                (width, height, height)
            }
        };
        let scale = self.scale();
        let view_width = self.viewport_width.unwrap_or(page_width);
        let view_height = self.viewport_height.unwrap_or(page_height);
        ScrollOffset::new(
            (page_width * scale - view_width).max(0.0),
            (content_height * scale - view_height).max(0.0),
        )
    }

    fn rebound_scroll(&mut self) {
        let bounded = self.scroll.bounded_by(self.scroll_limit());
        if bounded != self.scroll {
            trace!(?bounded, "scroll offset pulled back into content");
            self.scroll = bounded;
            self.push(ViewerEvent::RedrawNeeded);
        }
    }

    fn sync_page_input(&mut self) {
        self.page_input = self.position.current_page().to_string();
    }

    fn push(&self, event: ViewerEvent) {
        self.events.lock().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::document::{DocumentInfo, RenderImage, RenderRequest};
    use crate::error::PageFault;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum FlipCall {
        Next,
        Prev,
        TurnTo(usize),
    }

    #[derive(Clone, Default)]
    struct RecordingFlip {
        calls: Arc<Mutex<Vec<FlipCall>>>,
    }

    impl RecordingFlip {
        fn take(&self) -> Vec<FlipCall> {
            std::mem::take(&mut *self.calls.lock())
        }
    }

    impl FlipEngine for RecordingFlip {
        fn flip_next(&mut self) {
            self.calls.lock().push(FlipCall::Next);
        }

        fn flip_prev(&mut self) {
            self.calls.lock().push(FlipCall::Prev);
        }

        fn turn_to_page(&mut self, index: usize) {
            self.calls.lock().push(FlipCall::TurnTo(index));
        }
    }

    fn engine(viewport: ViewportClass) -> (ViewerEngine, RecordingFlip) {
        let flip = RecordingFlip::default();
        let options = ViewerOptions {
            viewport,
            ..ViewerOptions::default()
        };
        let engine =
            ViewerEngine::new(DocumentRef::new("libro.pdf"), options, Box::new(flip.clone()))
                .unwrap();
        (engine, flip)
    }

    fn loaded(viewport: ViewportClass, pages: usize) -> (ViewerEngine, RecordingFlip) {
        let (mut engine, flip) = engine(viewport);
        engine.mount();
        engine.document_loaded(pages, None);
        (engine, flip)
    }

    #[test]
    fn construction_applies_viewport_defaults() {
        let (desktop, _) = engine(ViewportClass::Desktop);
        assert_eq!(desktop.mode(), ViewMode::Book);
        assert_eq!(desktop.scale(), 1.0);
        assert_eq!(desktop.current_page(), 1);

        let (mobile, _) = engine(ViewportClass::Mobile);
        assert_eq!(mobile.mode(), ViewMode::Scroll);
        assert!((mobile.scale() - 0.8).abs() < f32::EPSILON);
    }

    #[test]
    fn invalid_config_is_rejected_at_construction() {
        let options = ViewerOptions {
            config: ViewerConfig {
                min_scale: 3.0,
                ..ViewerConfig::default()
            },
            ..ViewerOptions::default()
        };
        let result = ViewerEngine::new(
            DocumentRef::new("libro.pdf"),
            options,
            Box::new(RecordingFlip::default()),
        );
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn navigation_is_inert_until_page_count_is_known() {
        let (mut engine, flip) = engine(ViewportClass::Desktop);
        assert!(!engine.next());
        assert!(!engine.previous());
        assert!(!engine.go_to_page(1));
        engine.set_mode(ViewMode::Scroll);
        engine.set_mode(ViewMode::Book);
        assert!(flip.take().is_empty());
        assert!(engine.surface().is_loading());
        assert!(engine.snapshot().loading);
    }

    #[test]
    fn second_load_is_ignored() {
        let (mut engine, _) = loaded(ViewportClass::Desktop, 10);
        engine.on_flip_settled(4);
        assert!(!engine.document_loaded(99, Some("Other".into())));
        assert_eq!(engine.total_pages(), 10);
        assert_eq!(engine.current_page(), 5);
    }

    #[test]
    fn book_scenario_settles_then_survives_mode_switch() {
        let (mut engine, flip) = loaded(ViewportClass::Desktop, 10);
        assert_eq!(engine.mode(), ViewMode::Book);

        for settled in 1..=3 {
            assert!(engine.next());
            engine.on_flip_settled(settled);
        }
        assert_eq!(flip.take(), vec![FlipCall::Next, FlipCall::Next, FlipCall::Next]);
        assert_eq!(engine.current_page(), 4);

        engine.events().lock().clear();
        assert!(engine.set_mode(ViewMode::Scroll));
        assert_eq!(engine.current_page(), 4);
        assert!(engine
            .events()
            .lock()
            .contains(&ViewerEvent::ScrollIntoView { page: 4 }));

        assert!(!engine.go_to_page(15));
        assert_eq!(engine.current_page(), 4);
    }

    #[test]
    fn mode_switches_preserve_the_page() {
        let (mut engine, flip) = loaded(ViewportClass::Desktop, 20);
        engine.set_mode(ViewMode::Single);
        engine.go_to_page(7);
        flip.take();

        for mode in [
            ViewMode::Scroll,
            ViewMode::Book,
            ViewMode::Single,
            ViewMode::Book,
            ViewMode::Scroll,
            ViewMode::Single,
        ] {
            engine.set_mode(mode);
            assert_eq!(engine.current_page(), 7);
        }
        assert_eq!(flip.take(), vec![FlipCall::TurnTo(6), FlipCall::TurnTo(6)]);
    }

    #[test]
    fn book_jump_waits_for_settlement() {
        let (mut engine, flip) = loaded(ViewportClass::Desktop, 10);
        assert!(engine.go_to_page(8));
        assert_eq!(flip.take(), vec![FlipCall::TurnTo(7)]);
        assert_eq!(engine.current_page(), 1);

        // the engine clamped or landed elsewhere: settlement wins
        engine.on_flip_settled(5);
        assert_eq!(engine.current_page(), 6);
        assert_eq!(engine.page_input(), "6");
    }

    #[test]
    fn out_of_range_jumps_never_reach_the_flip_engine() {
        let (mut engine, flip) = loaded(ViewportClass::Desktop, 10);
        assert!(!engine.go_to_page(0));
        assert!(!engine.go_to_page(11));
        assert!(flip.take().is_empty());
    }

    #[test]
    fn single_layout_steps_within_bounds() {
        let (mut engine, flip) = loaded(ViewportClass::Desktop, 3);
        engine.set_mode(ViewMode::Single);
        assert!(!engine.previous());
        assert!(engine.next());
        assert!(engine.next());
        assert!(!engine.next());
        assert_eq!(engine.current_page(), 3);
        assert!(flip.take().is_empty());
        assert!(engine.first_page());
        assert_eq!(engine.current_page(), 1);
        assert!(engine.last_page());
        assert_eq!(engine.current_page(), 3);
    }

    #[test]
    fn scroll_jump_moves_offset_to_page_top() {
        let (mut engine, _) = loaded(ViewportClass::Desktop, 10);
        engine.set_mode(ViewMode::Scroll);
        engine.go_to_page(3);
        let geometry = match engine.surface() {
            RenderSurface::Scroll { geometry, .. } => geometry,
            other => panic!("unexpected surface: {:?}", other),
        };
        assert_eq!(engine.current_page(), 3);
        assert_eq!(engine.scroll_offset().y, geometry.page_top(3));
    }

    #[test]
    fn page_input_is_kept_when_invalid() {
        let (mut engine, _) = loaded(ViewportClass::Desktop, 10);
        engine.set_mode(ViewMode::Single);

        engine.set_page_input("abc");
        assert!(!engine.submit_page_input());
        assert_eq!(engine.page_input(), "abc");

        engine.set_page_input("42");
        assert!(!engine.submit_page_input());
        assert_eq!(engine.page_input(), "42");
        assert_eq!(engine.current_page(), 1);

        engine.set_page_input(" 9 ");
        assert!(engine.submit_page_input());
        assert_eq!(engine.current_page(), 9);
        assert_eq!(engine.page_input(), "9");
    }

    #[test]
    fn book_is_rejected_on_mobile() {
        let (mut engine, flip) = loaded(ViewportClass::Mobile, 10);
        engine.set_mode(ViewMode::Single);
        assert!(!engine.set_mode(ViewMode::Book));
        assert_eq!(engine.mode(), ViewMode::Single);
        assert!(flip.take().is_empty());
    }

    #[test]
    fn mobile_to_desktop_resets_to_book() {
        let (mut engine, _) = loaded(ViewportClass::Mobile, 10);
        assert_eq!(engine.mode(), ViewMode::Scroll);

        assert!(engine.set_viewport_class(ViewportClass::Desktop));
        assert_eq!(engine.mode(), ViewMode::Book);
        assert_eq!(engine.scale(), 1.0);
    }

    #[test]
    fn responsive_reset_is_edge_triggered() {
        let (mut engine, _) = loaded(ViewportClass::Desktop, 10);
        engine.set_mode(ViewMode::Single);
        engine.zoom_in();

        assert!(!engine.set_viewport_class(ViewportClass::Desktop));
        assert_eq!(engine.mode(), ViewMode::Single);

        engine.set_viewport_class(ViewportClass::Mobile);
        assert_eq!(engine.mode(), ViewMode::Scroll);
        engine.set_viewport_class(ViewportClass::Desktop);
        assert_eq!(engine.mode(), ViewMode::Book);
        engine.set_viewport_class(ViewportClass::Mobile);
        engine.set_viewport_class(ViewportClass::Desktop);
        assert_eq!(engine.mode(), ViewMode::Book);
        assert_eq!(engine.scale(), 1.0);
    }

    #[test]
    fn viewport_width_is_classified() {
        let (mut engine, _) = loaded(ViewportClass::Desktop, 10);
        assert!(engine.set_viewport_width(500));
        assert_eq!(engine.viewport_class(), ViewportClass::Mobile);
        assert!(!engine.set_viewport_width(600));
        assert!(engine.set_viewport_width(1280));
        assert_eq!(engine.viewport_class(), ViewportClass::Desktop);
    }

    #[test]
    fn zoom_is_clamped_and_leaves_position_alone() {
        let (mut engine, _) = loaded(ViewportClass::Desktop, 10);
        engine.on_flip_settled(2);
        for _ in 0..40 {
            engine.zoom_in();
        }
        assert_eq!(engine.scale(), 2.5);
        assert!(!engine.zoom_in());
        for _ in 0..40 {
            engine.zoom_out();
        }
        assert_eq!(engine.scale(), 0.5);
        assert!(!engine.zoom_out());
        assert_eq!(engine.current_page(), 3);
        assert_eq!(engine.mode(), ViewMode::Book);
    }

    #[test]
    fn drag_scrolls_pannable_layouts_only() {
        let (mut engine, _) = loaded(ViewportClass::Desktop, 10);
        engine.set_mode(ViewMode::Scroll);
        // zoomed past the viewport so there is room to pan sideways
        while engine.zoom_in() {}
        engine.set_scroll_offset(ScrollOffset::new(300.0, 400.0));
        assert_eq!(engine.scroll_offset(), ScrollOffset::new(300.0, 400.0));

        assert!(engine.pointer_down(PointerButton::Auxiliary, PointerPosition::new(0.0, 0.0)));
        assert!(engine.pointer_move(PointerPosition::new(50.0, 0.0)));
        assert!(engine.pointer_up());
        let multiplier = engine.config().drag_multiplier;
        assert_eq!(
            engine.scroll_offset(),
            ScrollOffset::new(300.0 - 50.0 * multiplier, 400.0)
        );

        engine.set_mode(ViewMode::Book);
        let before = engine.scroll_offset();
        assert!(!engine.pointer_down(PointerButton::Auxiliary, PointerPosition::new(0.0, 0.0)));
        assert!(!engine.pointer_move(PointerPosition::new(50.0, 0.0)));
        assert!(!engine.pointer_up());
        assert_eq!(engine.scroll_offset(), before);
    }

    #[test]
    fn leaving_scroll_layout_pulls_offset_into_the_page() {
        let (mut engine, _) = loaded(ViewportClass::Desktop, 20);
        engine.set_mode(ViewMode::Scroll);
        engine.go_to_page(10);
        assert!(engine.scroll_offset().y > 5000.0);

        assert!(engine.set_mode(ViewMode::Single));
        assert_eq!(engine.current_page(), 10);
        assert_eq!(engine.scroll_offset(), ScrollOffset::default());

        // a zoomed page taller than the viewport can still be panned to its bottom edge
        engine.set_viewport_height(400);
        while engine.zoom_in() {}
        for _ in 0..100 {
            engine.scroll_by(0.0, 48.0);
        }
        let page_height = engine.config().page_height_for_width(450.0);
        let bottom = page_height * engine.scale() - 400.0;
        assert!((engine.scroll_offset().y - bottom).abs() < 0.01);

        // zooming back out shrinks the page under the offset
        while engine.zoom_out() {}
        assert_eq!(engine.scroll_offset().y, 0.0);
    }

    #[test]
    fn wheel_scrolling_stops_at_the_last_page() {
        let (mut engine, _) = loaded(ViewportClass::Desktop, 10);
        engine.set_mode(ViewMode::Scroll);
        engine.set_viewport_height(800);

        let mut moved = 0;
        for _ in 0..500 {
            if engine.scroll_by(0.0, 48.0) {
                moved += 1;
            }
        }
        assert!(moved < 500);

        let geometry = match engine.surface() {
            RenderSurface::Scroll { geometry, .. } => geometry,
            other => panic!("unexpected surface: {:?}", other),
        };
        let offset = engine.scroll_offset().y;
        assert!((offset - (geometry.content_height() - 800.0)).abs() < 0.01);
        let visible = geometry.visible_pages(offset, 800.0).unwrap();
        assert_eq!(*visible.end(), 10);
        assert!(!engine.scroll_by(0.0, 48.0));
    }

    #[test]
    fn switching_to_book_mid_drag_ends_the_pan() {
        let (mut engine, _) = loaded(ViewportClass::Desktop, 10);
        engine.set_mode(ViewMode::Single);
        engine.pointer_down(PointerButton::Auxiliary, PointerPosition::new(0.0, 0.0));
        assert!(engine.is_dragging());
        engine.set_mode(ViewMode::Book);
        assert!(!engine.is_dragging());
    }

    #[test]
    fn unmount_releases_active_drag_and_ignores_pointer() {
        let (mut engine, _) = loaded(ViewportClass::Desktop, 10);
        engine.set_mode(ViewMode::Scroll);
        engine.pointer_down(PointerButton::Auxiliary, PointerPosition::new(0.0, 0.0));
        engine.unmount();
        assert!(!engine.is_dragging());
        assert!(!engine.pointer_down(PointerButton::Auxiliary, PointerPosition::new(0.0, 0.0)));
    }

    #[test]
    fn theme_changes_only_presentation() {
        let (mut engine, _) = loaded(ViewportClass::Desktop, 10);
        engine.toggle_theme();
        assert_eq!(engine.theme(), Theme::Dark);
        assert!(engine.surface().slots().iter().all(|slot| slot.invert));
        assert_eq!(engine.current_page(), 1);
        assert_eq!(engine.mode(), ViewMode::Book);
    }

    #[test]
    fn apply_dispatches_commands() {
        let (mut engine, flip) = loaded(ViewportClass::Desktop, 10);
        engine.apply(Command::SetMode {
            mode: ViewMode::Single,
        });
        engine.apply(Command::SetPageInput { text: "5".into() });
        engine.apply(Command::SubmitPageInput);
        engine.apply(Command::NextPage);
        engine.apply(Command::ZoomIn);
        assert_eq!(engine.current_page(), 6);
        assert!((engine.scale() - 1.1).abs() < 1e-6);
        assert!(flip.take().is_empty());

        let snapshot = engine.snapshot();
        assert_eq!(snapshot.zoom_percent(), 110);
        assert_eq!(snapshot.mode, ViewMode::Single);
        let json = snapshot.to_json_pretty().unwrap();
        assert!(json.contains("\"mode\": \"single\""));
    }

    struct FakeSource {
        info: DocumentInfo,
    }

    impl DocumentSource for FakeSource {
        fn info(&self) -> &DocumentInfo {
            &self.info
        }

        fn render_page(&self, request: RenderRequest) -> Result<RenderImage, PageFault> {
            Ok(RenderImage {
                width: 1,
                height: 1,
                pixels: vec![request.page_number as u8],
            })
        }
    }

    struct FakeProvider {
        pages: Option<usize>,
    }

    #[async_trait::async_trait]
    impl DocumentProvider for FakeProvider {
        async fn open(
            &self,
            reference: &DocumentRef,
        ) -> Result<Arc<dyn DocumentSource>, LoadError> {
            match self.pages {
                Some(page_count) => Ok(Arc::new(FakeSource {
                    info: DocumentInfo {
                        id: reference.id(),
                        reference: reference.clone(),
                        title: Some("Rayuela".into()),
                        page_count,
                    },
                })),
                None => Err(LoadError::NotFound {
                    reference: reference.to_string(),
                }),
            }
        }
    }

    #[tokio::test]
    async fn open_with_records_page_count() {
        let (mut engine, _) = engine(ViewportClass::Desktop);
        let source = engine
            .open_with(&FakeProvider { pages: Some(12) })
            .await
            .unwrap();
        assert_eq!(source.info().page_count, 12);
        assert_eq!(engine.total_pages(), 12);
        assert_eq!(engine.snapshot().title, "Rayuela");
        assert!(engine
            .events()
            .lock()
            .contains(&ViewerEvent::DocumentLoaded { total_pages: 12 }));
    }

    #[tokio::test]
    async fn failed_open_leaves_viewer_loading() {
        let (mut engine, _) = engine(ViewportClass::Desktop);
        assert!(engine.open_with(&FakeProvider { pages: None }).await.is_none());
        let snapshot = engine.snapshot();
        assert!(snapshot.loading);
        assert!(snapshot.load_failed);
        assert_eq!(engine.surface(), RenderSurface::Loading { failed: true });
        assert!(!engine.next());

        // a late success does not revive a failed document
        assert!(!engine.document_loaded(12, None));
        assert!(engine.snapshot().load_failed);
        assert_eq!(engine.total_pages(), 0);
        assert!(engine.surface().is_loading());
    }
}
