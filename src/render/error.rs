//! Error types for the render cache

use super::types::SurfaceId;

/// Errors from the document rasterizer
#[derive(Debug, thiserror::Error)]
pub enum RenderFailure {
    #[cfg(feature = "pdf")]
    #[error("PDF engine: {0}")]
    Pdf(#[from] mupdf::error::Error),

    #[error("{detail}")]
    Generic { detail: String },
}

impl RenderFailure {
    pub fn generic(msg: impl Into<String>) -> Self {
        Self::Generic { detail: msg.into() }
    }
}

/// Errors surfaced to the window layer
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("unknown surface {0}")]
    UnknownSurface(SurfaceId),

    #[error("no surface named {0:?}")]
    UnknownSurfaceName(String),

    #[error("surface {0:?} is already registered")]
    DuplicateSurface(String),

    #[error("page {page} out of range (document has {page_count} pages)")]
    PageOutOfRange { page: usize, page_count: usize },

    #[error("surface {0:?} has no area yet")]
    ZeroSizedSurface(String),

    #[error("bitmap is {actual_width}x{actual_height}, surface {surface:?} is {width}x{height}")]
    SizeMismatch {
        surface: String,
        width: u32,
        height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    #[error("failed to render page {page}: {source}")]
    Render {
        page: usize,
        #[source]
        source: RenderFailure,
    },
}

impl CacheError {
    /// True for errors that indicate a wiring bug in the window layer
    #[must_use]
    pub fn is_programming_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownSurface(_) | Self::UnknownSurfaceName(_) | Self::DuplicateSurface(_)
        )
    }
}
