// Export modules for use in tests
pub mod panic_handler;
pub mod presentation;
pub mod render;
pub mod settings;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-export the window-layer facade
pub use presentation::{Presentation, TalkTimer};
pub use render::{CacheError, RenderService, SurfaceId, SurfaceRole, Variant};
