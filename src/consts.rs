//! Shared numeric constants for the annotation engine.

// ── Viewport ────────────────────────────────────────────────────

/// Smallest zoom scale the viewport accepts.
pub const MIN_SCALE: f64 = 0.1;

/// Largest zoom scale the viewport accepts.
pub const MAX_SCALE: f64 = 3.0;

/// Scale differences at or below this are treated as "no change".
pub const SCALE_EPSILON: f64 = 1e-6;

/// Bitmap pixels per CSS pixel.
pub const DEVICE_PIXEL_RATIO: f64 = 2.0;

/// Horizontal gap between the two pages of a spread, in CSS pixels.
pub const PAGE_GAP_PX: f64 = 12.0;

/// Zoom presets offered by the toolbar, as percentages.
pub const ZOOM_PRESETS: [u32; 6] = [50, 75, 100, 125, 150, 200];

// ── Gestures ────────────────────────────────────────────────────

/// Pointer travel beyond which a press becomes a drag, in CSS pixels.
pub const DRAG_THRESHOLD_PX: f64 = 4.0;

/// Window in which a second tap on the same text object starts editing.
pub const DOUBLE_TAP_MS: u64 = 300;

/// Extra slop around thin strokes when hit-testing, in CSS pixels.
pub const STROKE_HIT_SLOP_PX: f64 = 3.0;

// ── Persistence ─────────────────────────────────────────────────

/// Debounce window for annotation saves.
pub const SAVE_DEBOUNCE_MS: u64 = 1000;

/// Current scene document format version.
pub const SCENE_DOCUMENT_VERSION: u32 = 1;

// ── Brush ───────────────────────────────────────────────────────

pub const DEFAULT_BRUSH_COLOR: &str = "#8B4513";
pub const DEFAULT_BRUSH_WIDTH: f64 = 4.0;
pub const MIN_BRUSH_WIDTH: f64 = 1.0;
pub const MAX_BRUSH_WIDTH: f64 = 20.0;

// ── Text ────────────────────────────────────────────────────────

/// Content given to a freshly placed text object.
pub const TEXT_PLACEHOLDER: &str = "Text";

/// Fill used when a requested text colour would be invisible.
pub const FALLBACK_TEXT_COLOR: &str = "#8B4513";

pub const DEFAULT_TEXT_COLOR: &str = "#00AA00";
pub const DEFAULT_FONT_SIZE: f64 = 18.0;
pub const DEFAULT_FONT_FAMILY: &str = "Arial";

/// New text objects are never created smaller than this.
pub const MIN_NEW_FONT_SIZE: f64 = 14.0;

/// Outline colour drawn around text without a background.
pub const TEXT_OUTLINE_COLOR: &str = "#111111";

/// Outline width as a fraction of font size.
pub const TEXT_OUTLINE_RATIO: f64 = 0.08;

/// Dark halo drawn behind text without a background.
pub const TEXT_HALO_COLOR: &str = "rgba(0,0,0,0.45)";
pub const TEXT_HALO_BLUR: f64 = 2.0;
pub const TEXT_HALO_OFFSET: f64 = 1.0;

/// Line height as a multiple of font size.
pub const TEXT_LINE_HEIGHT: f64 = 1.16;

/// Average glyph advance as a multiple of font size, used to size text boxes.
pub const TEXT_GLYPH_ADVANCE: f64 = 0.6;
