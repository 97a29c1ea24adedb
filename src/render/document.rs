//! Document model seen by the render cache

use super::error::RenderFailure;
use super::types::{Bitmap, Variant};

/// The page source the cache renders from.
///
/// Implementations rasterize one page at a time; the cache never asks for
/// more than one page per call.
pub trait PageSource {
    /// Number of pages in the document
    fn page_count(&self) -> usize;

    /// Render `page` into a `width` x `height` bitmap.
    ///
    /// The returned bitmap must be complete; partial output is an error.
    fn rasterize(
        &self,
        page: usize,
        width: u32,
        height: u32,
        variant: Variant,
    ) -> Result<Bitmap, RenderFailure>;

    /// Whether pages carry a notes half next to the slide
    fn has_secondary_content(&self) -> bool;

    /// Optional document title for logs
    fn title(&self) -> Option<String> {
        None
    }
}

impl<T: PageSource + ?Sized> PageSource for Box<T> {
    fn page_count(&self) -> usize {
        (**self).page_count()
    }

    fn rasterize(
        &self,
        page: usize,
        width: u32,
        height: u32,
        variant: Variant,
    ) -> Result<Bitmap, RenderFailure> {
        (**self).rasterize(page, width, height, variant)
    }

    fn has_secondary_content(&self) -> bool {
        (**self).has_secondary_content()
    }

    fn title(&self) -> Option<String> {
        (**self).title()
    }
}

/// Generated test-pattern document.
///
/// Every page is a flat colour derived from its index, with a darker band
/// whose height encodes the variant. Used by the CLI when no PDF is given.
#[derive(Clone, Debug)]
pub struct SyntheticDocument {
    page_count: usize,
    notes: bool,
}

impl SyntheticDocument {
    #[must_use]
    pub fn new(page_count: usize, notes: bool) -> Self {
        Self { page_count, notes }
    }

    /// Base colour for a page
    #[must_use]
    pub fn page_color(page: usize) -> [u8; 3] {
        let hue = (page.wrapping_mul(47) % 256) as u8;
        [hue, 255 - hue, 0x80]
    }
}

impl PageSource for SyntheticDocument {
    fn page_count(&self) -> usize {
        self.page_count
    }

    fn rasterize(
        &self,
        page: usize,
        width: u32,
        height: u32,
        variant: Variant,
    ) -> Result<Bitmap, RenderFailure> {
        if page >= self.page_count {
            return Err(RenderFailure::generic(format!(
                "page {page} does not exist"
            )));
        }

        let mut bitmap = Bitmap::filled(width, height, Self::page_color(page));
        let band_rows = match variant {
            Variant::Plain => 0,
            Variant::ContentHalf => height / 8,
            Variant::NotesHalf => height / 4,
        };
        let row_bytes = width as usize * 3;
        if row_bytes == 0 {
            return Ok(bitmap);
        }
        for row in bitmap.pixels.chunks_exact_mut(row_bytes).take(band_rows as usize) {
            for byte in row.iter_mut() {
                *byte /= 2;
            }
        }

        Ok(bitmap)
    }

    fn has_secondary_content(&self) -> bool {
        self.notes
    }

    fn title(&self) -> Option<String> {
        Some(format!("synthetic ({} pages)", self.page_count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_renders_requested_size() {
        let doc = SyntheticDocument::new(3, false);
        let bmp = doc.rasterize(1, 40, 30, Variant::Plain).unwrap();
        assert_eq!((bmp.width, bmp.height), (40, 30));
        assert_eq!(bmp.pixel(0, 0), Some(SyntheticDocument::page_color(1)));
    }

    #[test]
    fn synthetic_variants_differ() {
        let doc = SyntheticDocument::new(1, true);
        let plain = doc.rasterize(0, 16, 16, Variant::Plain).unwrap();
        let content = doc.rasterize(0, 16, 16, Variant::ContentHalf).unwrap();
        let notes = doc.rasterize(0, 16, 16, Variant::NotesHalf).unwrap();
        assert_ne!(plain, content);
        assert_ne!(content, notes);
    }

    #[test]
    fn synthetic_rejects_missing_page() {
        let doc = SyntheticDocument::new(2, false);
        assert!(doc.rasterize(2, 10, 10, Variant::Plain).is_err());
    }

    #[test]
    fn boxed_source_delegates() {
        let doc: Box<dyn PageSource> = Box::new(SyntheticDocument::new(5, true));
        assert_eq!(doc.page_count(), 5);
        assert!(doc.has_secondary_content());
    }
}
