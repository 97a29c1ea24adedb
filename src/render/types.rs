//! Core types for page rendering

use std::fmt;
use std::path::Path;

/// Which portion of a page a surface wants rendered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Variant {
    /// The whole page
    #[default]
    Plain,
    /// Left (slide) half of a notes-annotated page
    ContentHalf,
    /// Right (notes) half of a notes-annotated page
    NotesHalf,
}

impl Variant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::Plain => "plain",
            Variant::ContentHalf => "content",
            Variant::NotesHalf => "notes",
        }
    }

    /// Whether rendering this variant needs the document's secondary content
    #[must_use]
    pub const fn needs_notes(self) -> bool {
        matches!(self, Self::ContentHalf | Self::NotesHalf)
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable handle for a registered surface.
///
/// Handed out by the registry on registration; never reused during a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(pub(crate) usize);

impl SurfaceId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The three surfaces of the two presentation windows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SurfaceRole {
    /// Full-screen page in the Content window
    Content,
    /// Current page in the Presenter window
    PresenterCurrent,
    /// Next page in the Presenter window
    PresenterNext,
}

impl SurfaceRole {
    pub const ALL: [SurfaceRole; 3] = [
        SurfaceRole::Content,
        SurfaceRole::PresenterCurrent,
        SurfaceRole::PresenterNext,
    ];

    /// Canonical surface name for this role
    pub fn name(&self) -> &'static str {
        match self {
            SurfaceRole::Content => "content",
            SurfaceRole::PresenterCurrent => "presenter-current",
            SurfaceRole::PresenterNext => "presenter-next",
        }
    }
}

/// Last-known configuration of a surface
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SurfaceState {
    /// Requested variant (before notes fallback)
    pub variant: Variant,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl SurfaceState {
    #[must_use]
    pub const fn is_zero_sized(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// A fully rasterized page, ready to blit.
///
/// Contains RGB pixel data (3 bytes per pixel) at exactly the size the
/// surface asked for.
#[derive(Clone, PartialEq, Eq)]
pub struct Bitmap {
    /// Raw RGB pixel data
    pub pixels: Vec<u8>,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Bitmap {
    /// Create a bitmap filled with one colour
    #[must_use]
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let len = width as usize * height as usize;
        let mut pixels = Vec::with_capacity(len * 3);
        for _ in 0..len {
            pixels.extend_from_slice(&rgb);
        }
        Self {
            pixels,
            width,
            height,
        }
    }

    /// Size of the pixel buffer in bytes
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.pixels.len()
    }

    /// RGB value at (x, y), if inside the bitmap
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 3;
        let px = self.pixels.get(offset..offset + 3)?;
        Some([px[0], px[1], px[2]])
    }

    /// Write the bitmap as a PNG file
    pub fn save_png(&self, path: &Path) -> Result<(), image::ImageError> {
        image::save_buffer(
            path,
            &self.pixels,
            self.width,
            self.height,
            image::ColorType::Rgb8,
        )
    }
}

impl fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bitmap")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filled_bitmap_has_rgb_layout() {
        let bmp = Bitmap::filled(4, 2, [1, 2, 3]);
        assert_eq!(bmp.byte_len(), 4 * 2 * 3);
        assert_eq!(bmp.pixel(3, 1), Some([1, 2, 3]));
        assert_eq!(bmp.pixel(4, 0), None);
    }

    #[test]
    fn png_export_preserves_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.png");
        let bmp = Bitmap::filled(3, 2, [10, 20, 30]);
        bmp.save_png(&path).unwrap();

        let decoded = image::open(&path).unwrap().to_rgb8();
        assert_eq!(decoded.dimensions(), (3, 2));
        assert_eq!(decoded.as_raw(), &bmp.pixels);
    }

    #[test]
    fn only_split_variants_need_notes() {
        assert!(!Variant::Plain.needs_notes());
        assert!(Variant::ContentHalf.needs_notes());
        assert!(Variant::NotesHalf.needs_notes());
    }

    #[test]
    fn zero_sized_surface() {
        let state = SurfaceState {
            variant: Variant::Plain,
            width: 0,
            height: 600,
        };
        assert!(state.is_zero_sized());
        assert!(!SurfaceState { width: 1, height: 1, ..state }.is_zero_sized());
    }
}
