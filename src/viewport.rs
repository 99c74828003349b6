//! Viewport controller: page index, zoom scale, and layout mode.
//!
//! The controller is the single source of truth for what is on screen. Every
//! successful navigation, zoom, or layout change bumps a render ticket and
//! returns a [`ViewChange`] carrying the [`RenderRequest`] the host must
//! rasterize. Render completions come back through [`ViewportController::complete_render`];
//! a completion whose ticket is no longer the latest is discarded, so
//! out-of-order rasterization can never paint a stale frame.

#[cfg(test)]
#[path = "viewport_test.rs"]
mod viewport_test;

use tracing::{debug, info, warn};

use crate::consts::{MAX_SCALE, MIN_SCALE, SCALE_EPSILON, ZOOM_PRESETS};
use crate::error::{DocumentLoadError, RenderError};
use crate::geom::Size;
use crate::raster::Bitmap;

/// How many pages are shown side by side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayoutMode {
    #[default]
    Single,
    /// Two pages side by side; the trailing odd page renders alone.
    DoublePage,
}

impl LayoutMode {
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Single => Self::DoublePage,
            Self::DoublePage => Self::Single,
        }
    }
}

/// A loaded PDF as seen by the viewport: per-page sizes at scale 1.0.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentHandle {
    page_sizes: Vec<Size>,
}

impl DocumentHandle {
    /// # Errors
    ///
    /// Returns [`DocumentLoadError::Empty`] when there are no pages.
    pub fn new(page_sizes: Vec<Size>) -> Result<Self, DocumentLoadError> {
        if page_sizes.is_empty() {
            return Err(DocumentLoadError::Empty);
        }
        Ok(Self { page_sizes })
    }

    #[must_use]
    pub fn page_count(&self) -> u32 {
        u32::try_from(self.page_sizes.len()).unwrap_or(u32::MAX)
    }

    /// Unscaled size of a 1-based page.
    #[must_use]
    pub fn page_size(&self, page: u32) -> Option<Size> {
        let idx = usize::try_from(page.checked_sub(1)?).unwrap_or(usize::MAX);
        self.page_sizes.get(idx).copied()
    }
}

/// What is currently shown.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportState {
    /// 1-based index of the (left) page.
    pub page_index: u32,
    pub scale: f64,
    pub layout: LayoutMode,
}

impl Default for ViewportState {
    fn default() -> Self {
        Self { page_index: 1, scale: 1.0, layout: LayoutMode::Single }
    }
}

/// One rasterization job for the base bitmap.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRequest {
    pub ticket: u64,
    /// Pages to draw left to right.
    pub pages: Vec<u32>,
    pub scale: f64,
    /// Bitmap pixels per CSS pixel.
    pub dpr: f64,
    /// Horizontal gap between pages, in CSS pixels.
    pub gap: f64,
    /// Frame size in CSS pixels.
    pub frame: Size,
}

/// The result of a successful viewport operation.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewChange {
    pub previous: ViewportState,
    pub current: ViewportState,
    pub request: RenderRequest,
}

impl ViewChange {
    /// The scene must be rebuilt: a different page or a different layout.
    #[must_use]
    pub fn needs_rebuild(&self) -> bool {
        self.previous.page_index != self.current.page_index || self.previous.layout != self.current.layout
    }

    /// Only the zoom changed.
    #[must_use]
    pub fn is_rescale(&self) -> bool {
        !self.needs_rebuild() && (self.previous.scale - self.current.scale).abs() > SCALE_EPSILON
    }
}

pub struct ViewportController {
    doc: Option<DocumentHandle>,
    state: ViewportState,
    dpr: f64,
    gap: f64,
    next_ticket: u64,
    pending: Option<u64>,
    /// Ticket of the frame currently on screen.
    shown: Option<u64>,
    bitmap: Option<Bitmap>,
}

impl ViewportController {
    #[must_use]
    pub fn new(dpr: f64, gap: f64) -> Self {
        Self {
            doc: None,
            state: ViewportState::default(),
            dpr,
            gap,
            next_ticket: 0,
            pending: None,
            shown: None,
            bitmap: None,
        }
    }

    // --- Queries ---

    #[must_use]
    pub fn state(&self) -> ViewportState {
        self.state
    }

    #[must_use]
    pub fn page_index(&self) -> u32 {
        self.state.page_index
    }

    #[must_use]
    pub fn scale(&self) -> f64 {
        self.state.scale
    }

    #[must_use]
    pub fn layout(&self) -> LayoutMode {
        self.state.layout
    }

    #[must_use]
    pub fn page_count(&self) -> u32 {
        self.doc.as_ref().map_or(0, DocumentHandle::page_count)
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.doc.is_some()
    }

    #[must_use]
    pub fn document(&self) -> Option<&DocumentHandle> {
        self.doc.as_ref()
    }

    /// Pages shown for the current state. An odd trailing page in a spread
    /// renders alone.
    #[must_use]
    pub fn visible_pages(&self) -> Vec<u32> {
        self.pages_for(self.state)
    }

    /// Frame size in CSS pixels for the current state.
    #[must_use]
    pub fn frame_size(&self) -> Size {
        self.frame_for(&self.pages_for(self.state), self.state.scale)
    }

    /// Ticket of the most recent render request still awaiting completion.
    #[must_use]
    pub fn pending_ticket(&self) -> Option<u64> {
        self.pending
    }

    #[must_use]
    pub fn shown_ticket(&self) -> Option<u64> {
        self.shown
    }

    /// The base bitmap currently on screen.
    #[must_use]
    pub fn bitmap(&self) -> Option<&Bitmap> {
        self.bitmap.as_ref()
    }

    // --- Document ---

    /// Install a document and reset to `initial_page` (clamped) at scale 1.0.
    pub fn open(&mut self, doc: DocumentHandle, initial_page: Option<u32>) -> ViewChange {
        let count = doc.page_count();
        info!(page_count = count, "viewport: document opened");
        self.doc = Some(doc);
        self.shown = None;
        self.bitmap = None;
        let previous = self.state;
        self.state.page_index = initial_page.unwrap_or(1).clamp(1, count);
        self.state.scale = 1.0;
        self.change(previous)
    }

    /// Release the document handle.
    pub fn close(&mut self) {
        self.doc = None;
        self.pending = None;
        self.shown = None;
        self.bitmap = None;
        self.state = ViewportState::default();
    }

    // --- Navigation ---

    /// Jump to `page`, clamped to `[1, page_count]`.
    pub fn go_to(&mut self, page: u32) -> Option<ViewChange> {
        let count = self.page_count();
        if count == 0 {
            return None;
        }
        let target = page.clamp(1, count);
        if target == self.state.page_index {
            return None;
        }
        let previous = self.state;
        self.state.page_index = target;
        Some(self.change(previous))
    }

    /// Advance one page, or one spread when showing two pages and a full
    /// spread remains ahead.
    pub fn next_page(&mut self) -> Option<ViewChange> {
        let page = self.state.page_index;
        let count = self.page_count();
        let step = match self.state.layout {
            LayoutMode::DoublePage if page + 3 <= count => 2,
            _ if page < count => 1,
            _ => return None,
        };
        self.go_to(page + step)
    }

    /// Go back one page, or one spread when there is room for it.
    pub fn prev_page(&mut self) -> Option<ViewChange> {
        let page = self.state.page_index;
        let step = match self.state.layout {
            LayoutMode::DoublePage if page >= 3 => 2,
            _ if page > 1 => 1,
            _ => return None,
        };
        self.go_to(page - step)
    }

    // --- Zoom ---

    /// Set the zoom scale, clamped to `[MIN_SCALE, MAX_SCALE]`.
    ///
    /// Returns `None` when nothing changes (closed document, non-finite input,
    /// or a difference within `SCALE_EPSILON`).
    pub fn set_scale(&mut self, scale: f64) -> Option<ViewChange> {
        if self.doc.is_none() || !scale.is_finite() {
            return None;
        }
        let clamped = scale.clamp(MIN_SCALE, MAX_SCALE);
        if (clamped - self.state.scale).abs() <= SCALE_EPSILON {
            return None;
        }
        let previous = self.state;
        self.state.scale = clamped;
        debug!(from = previous.scale, to = clamped, "viewport: scale changed");
        Some(self.change(previous))
    }

    /// Step to the next zoom preset above the current scale.
    pub fn zoom_in(&mut self) -> Option<ViewChange> {
        let current = self.state.scale;
        let next = ZOOM_PRESETS
            .iter()
            .map(|p| f64::from(*p) / 100.0)
            .find(|s| *s > current + SCALE_EPSILON)?;
        self.set_scale(next)
    }

    /// Step to the next zoom preset below the current scale.
    pub fn zoom_out(&mut self) -> Option<ViewChange> {
        let current = self.state.scale;
        let next = ZOOM_PRESETS
            .iter()
            .rev()
            .map(|p| f64::from(*p) / 100.0)
            .find(|s| *s < current - SCALE_EPSILON)?;
        self.set_scale(next)
    }

    // --- Layout ---

    pub fn set_layout_mode(&mut self, layout: LayoutMode) -> Option<ViewChange> {
        if self.doc.is_none() || layout == self.state.layout {
            return None;
        }
        let previous = self.state;
        self.state.layout = layout;
        Some(self.change(previous))
    }

    // --- Render completion ---

    /// Swap in a finished frame if it answers the latest request.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Superseded`] when a newer request was issued
    /// after `ticket`; the frame is dropped and the current one kept.
    pub fn complete_render(&mut self, ticket: u64, bitmap: Bitmap) -> Result<&Bitmap, RenderError> {
        if self.pending != Some(ticket) {
            debug!(ticket, latest = ?self.pending, "viewport: stale render discarded");
            return Err(RenderError::Superseded(ticket));
        }
        self.pending = None;
        self.shown = Some(ticket);
        debug!(ticket, width = bitmap.width(), height = bitmap.height(), "viewport: frame applied");
        Ok(self.bitmap.insert(bitmap))
    }

    /// Record a failed render. The previously shown frame stays in place.
    pub fn fail_render(&mut self, ticket: u64, err: &RenderError) {
        warn!(ticket, error = %err, "viewport: render failed; keeping previous frame");
        if self.pending == Some(ticket) {
            self.pending = None;
        }
    }

    // --- Internal ---

    fn change(&mut self, previous: ViewportState) -> ViewChange {
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        self.pending = Some(ticket);
        let pages = self.pages_for(self.state);
        let frame = self.frame_for(&pages, self.state.scale);
        debug!(ticket, ?pages, scale = self.state.scale, "viewport: render requested");
        ViewChange {
            previous,
            current: self.state,
            request: RenderRequest { ticket, pages, scale: self.state.scale, dpr: self.dpr, gap: self.gap, frame },
        }
    }

    fn pages_for(&self, state: ViewportState) -> Vec<u32> {
        let count = self.page_count();
        if count == 0 {
            return Vec::new();
        }
        match state.layout {
            LayoutMode::DoublePage if state.page_index < count => vec![state.page_index, state.page_index + 1],
            _ => vec![state.page_index],
        }
    }

    fn frame_for(&self, pages: &[u32], scale: f64) -> Size {
        let Some(doc) = &self.doc else {
            return Size::default();
        };
        let sizes: Vec<Size> = pages.iter().filter_map(|p| doc.page_size(*p)).map(|s| s.scaled(scale)).collect();
        let width: f64 = sizes.iter().map(|s| s.width).sum();
        let height = sizes.iter().map(|s| s.height).fold(0.0, f64::max);
        #[allow(clippy::cast_precision_loss)]
        let gaps = sizes.len().saturating_sub(1) as f64 * self.gap;
        Size::new(width + gaps, height)
    }
}
