//! Interactive PDF annotation engine for sheet-music scores.
//!
//! The crate rasterizes score pages into a base bitmap, keeps an
//! independently scaled scene of freehand strokes and text on top of it, and
//! persists each page's scene with debounced, latest-wins saves. The core
//! ([`engine::AnnotationEngine`]) is synchronous and performs no I/O; it
//! returns [`engine::Action`]s that [`session::AnnotationSession`] executes
//! against a [`raster::Rasterizer`] and an [`store::AnnotationStore`].
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Composes viewport, surface, tools, and persistence into one input → actions core |
//! | [`session`] | Async driver that performs rendering and store I/O for the engine |
//! | [`viewport`] | Page index, zoom, layout mode, render tickets |
//! | [`raster`] | Rasterizer seam and the RGBA frame bitmap |
//! | [`surface`] | One live scene per page: rebuild, rescale, snapshots |
//! | [`scene`] | Scene graph with selection, brush, and an event queue |
//! | [`tools`] | Tool modes and the pointer gesture state machine |
//! | [`persistence`] | Per-page debounced saves and the snapshot cache |
//! | [`store`] | Annotation store seam and its HTTP client |
//! | [`doc`] | Annotation object types and the serialized scene document |
//! | [`legacy`] | Normalization of documents written by older clients |
//! | [`hit`] | Hit-testing against annotation objects |
//! | [`geom`] | Point, size, and bounds value types |
//! | [`config`] | Environment-driven engine configuration |
//! | [`error`] | Error families and stable error codes |
//! | [`consts`] | Shared numeric constants (scale limits, windows, text defaults) |

pub mod config;
pub mod consts;
pub mod doc;
pub mod engine;
pub mod error;
pub mod geom;
pub mod hit;
pub mod legacy;
pub mod persistence;
pub mod raster;
pub mod scene;
pub mod session;
pub mod store;
pub mod surface;
pub mod tools;
pub mod viewport;
