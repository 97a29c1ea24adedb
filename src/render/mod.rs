//! Page rendering infrastructure

mod cache;
mod document;
mod error;
#[cfg(feature = "pdf")]
mod mupdf_source;
mod registry;
mod scheduler;
mod service;
mod types;
mod variant;

pub use cache::{CacheEntry, CacheKey, PageCache};
pub use document::{PageSource, SyntheticDocument};
pub use error::{CacheError, RenderFailure};
#[cfg(feature = "pdf")]
pub use mupdf_source::MuPdfDocument;
pub use registry::{Command, Effect, SurfaceRegistry};
pub use scheduler::{PrerenderScheduler, PrerenderWindow, SweepState};
pub use service::{CacheStats, RenderService};
pub use types::*;
pub use variant::{NotesMode, VariantResolver};

/// Pages rendered ahead of the current one
pub const DEFAULT_PRERENDER_FORWARD: usize = 4;
/// Pages rendered behind the current one
pub const DEFAULT_PRERENDER_BACKWARD: usize = 2;
/// Extra attempts after a failed rasterization
pub const DEFAULT_RENDER_RETRIES: u32 = 1;
pub const MAX_RENDER_RETRIES: u32 = 1;
/// Prerender units run per idle callback
pub const DEFAULT_IDLE_UNITS_PER_TICK: usize = 1;
