//! MuPDF-backed page source

use std::path::Path;

use log::debug;
use mupdf::{Colorspace, Document, Matrix, Pixmap};

use super::document::PageSource;
use super::error::RenderFailure;
use super::types::{Bitmap, Variant};

/// Pages at least this many times wider than tall carry notes on the right
const NOTES_ASPECT_RATIO: f32 = 2.0;

const BACKGROUND_RGB: [u8; 3] = [0, 0, 0];

/// A PDF opened with MuPDF
pub struct MuPdfDocument {
    doc: Document,
    page_count: usize,
    has_notes: bool,
    title: Option<String>,
}

impl MuPdfDocument {
    pub fn open(path: &Path) -> Result<Self, RenderFailure> {
        let doc = Document::open(path.to_string_lossy().as_ref())?;
        let page_count = doc.page_count()?.max(0) as usize;

        let has_notes = if page_count > 0 {
            let bounds = doc.load_page(0)?.bounds()?;
            let (width, height) = (bounds.x1 - bounds.x0, bounds.y1 - bounds.y0);
            height > 0.0 && width / height >= NOTES_ASPECT_RATIO
        } else {
            false
        };

        let title = doc
            .metadata(mupdf::MetadataName::Title)
            .ok()
            .filter(|t| !t.is_empty());

        debug!("Opened {path:?}: {page_count} pages, notes: {has_notes}");

        Ok(Self {
            doc,
            page_count,
            has_notes,
            title,
        })
    }
}

impl PageSource for MuPdfDocument {
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
        let page = self.doc.load_page(page as i32)?;
        let bounds = page.bounds()?;
        let page_width = bounds.x1 - bounds.x0;
        let page_height = bounds.y1 - bounds.y0;
        if page_width <= 0.0 || page_height <= 0.0 {
            return Err(RenderFailure::generic("page has no area"));
        }

        // Horizontal slice of the page this variant shows
        let (slice_x0, slice_width) = match variant {
            Variant::Plain => (0.0, page_width),
            Variant::ContentHalf => (0.0, page_width / 2.0),
            Variant::NotesHalf => (page_width / 2.0, page_width / 2.0),
        };

        let mag = (width as f32 / slice_width).min(height as f32 / page_height);
        let rgb = Colorspace::device_rgb();
        let pixmap = page.to_pixmap(&Matrix::new_scale(mag, mag), &rgb, false, false)?;

        let mut bitmap = Bitmap::filled(width, height, BACKGROUND_RGB);
        copy_slice_centred(&pixmap, slice_x0 * mag, slice_width * mag, &mut bitmap)?;
        Ok(bitmap)
    }

    fn has_secondary_content(&self) -> bool {
        self.has_notes
    }

    fn title(&self) -> Option<String> {
        self.title.clone()
    }
}

/// Copy columns `[x0, x0 + slice_width)` of the pixmap into the middle of
/// `bitmap`, dropping any channels past RGB.
fn copy_slice_centred(
    pixmap: &Pixmap,
    x0: f32,
    slice_width: f32,
    bitmap: &mut Bitmap,
) -> Result<(), RenderFailure> {
    let n = pixmap.n() as usize;
    if n < 3 {
        return Err(RenderFailure::generic(format!(
            "Unsupported pixmap format: {n} channels"
        )));
    }

    let pix_width = pixmap.width() as usize;
    let pix_height = pixmap.height() as usize;
    let stride = pixmap.stride() as usize;
    let samples = pixmap.samples();
    if samples.len() < stride.saturating_mul(pix_height) || pix_width * n > stride {
        return Err(RenderFailure::generic("Pixmap buffer size mismatch"));
    }

    let width = bitmap.width as usize;
    let height = bitmap.height as usize;
    let src_x0 = (x0.round() as usize).min(pix_width);
    let copy_width = (slice_width.round() as usize)
        .min(pix_width - src_x0)
        .min(width);
    let copy_height = pix_height.min(height);
    let dst_x0 = (width - copy_width) / 2;
    let dst_y0 = (height - copy_height) / 2;

    for row in 0..copy_height {
        let src_row = &samples[row * stride + src_x0 * n..][..copy_width * n];
        let dst_start = ((dst_y0 + row) * width + dst_x0) * 3;
        let dst_row = &mut bitmap.pixels[dst_start..dst_start + copy_width * 3];
        if n == 3 {
            dst_row.copy_from_slice(src_row);
        } else {
            for (dst, src) in dst_row.chunks_exact_mut(3).zip(src_row.chunks_exact(n)) {
                dst.copy_from_slice(&src[..3]);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use super::*;

    const RED: [u8; 3] = [255, 0, 0];
    const BLUE: [u8; 3] = [0, 0, 255];

    /// Single-page PDF with the left half filled red and the right half blue
    fn write_split_page(dir: &Path, width: u32, height: u32) -> PathBuf {
        let half = width / 2;
        let content = format!(
            "1 0 0 rg 0 0 {half} {height} re f\n0 0 1 rg {half} 0 {half} {height} re f\n"
        );
        let objects = [
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
            format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {width} {height}] /Contents 4 0 R >>"
            ),
            format!(
                "<< /Length {} >>\nstream\n{content}endstream",
                content.len()
            ),
        ];

        let mut pdf = String::from("%PDF-1.4\n");
        let mut offsets = Vec::with_capacity(objects.len());
        for (i, body) in objects.iter().enumerate() {
            offsets.push(pdf.len());
            pdf.push_str(&format!("{} 0 obj\n{body}\nendobj\n", i + 1));
        }
        let xref = pdf.len();
        pdf.push_str(&format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1));
        for offset in offsets {
            pdf.push_str(&format!("{offset:010} 00000 n \n"));
        }
        pdf.push_str(&format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref}\n%%EOF\n",
            objects.len() + 1
        ));

        let path = dir.join(format!("split-{width}x{height}.pdf"));
        fs::write(&path, pdf).unwrap();
        path
    }

    fn assert_close(actual: Option<[u8; 3]>, expected: [u8; 3]) {
        let actual = actual.expect("pixel in bounds");
        for (a, e) in actual.iter().zip(expected) {
            assert!(a.abs_diff(e) < 16, "{actual:?} is not {expected:?}");
        }
    }

    #[test]
    fn wide_pages_carry_notes() {
        let dir = tempfile::tempdir().unwrap();
        let doc = MuPdfDocument::open(&write_split_page(dir.path(), 320, 120)).unwrap();
        assert_eq!(doc.page_count(), 1);
        assert!(doc.has_secondary_content());

        let regular = MuPdfDocument::open(&write_split_page(dir.path(), 160, 120)).unwrap();
        assert!(!regular.has_secondary_content());
    }

    #[test]
    fn variants_show_their_half_of_the_page() {
        let dir = tempfile::tempdir().unwrap();
        let doc = MuPdfDocument::open(&write_split_page(dir.path(), 320, 120)).unwrap();

        let content = doc.rasterize(0, 80, 60, Variant::ContentHalf).unwrap();
        assert_eq!((content.width, content.height), (80, 60));
        assert_close(content.pixel(10, 30), RED);
        assert_close(content.pixel(70, 30), RED);

        let notes = doc.rasterize(0, 80, 60, Variant::NotesHalf).unwrap();
        assert_eq!((notes.width, notes.height), (80, 60));
        assert_close(notes.pixel(10, 30), BLUE);
        assert_close(notes.pixel(70, 30), BLUE);

        let plain = doc.rasterize(0, 160, 60, Variant::Plain).unwrap();
        assert_close(plain.pixel(20, 30), RED);
        assert_close(plain.pixel(140, 30), BLUE);
    }

    #[test]
    fn slice_is_centred_on_a_wider_surface() {
        let dir = tempfile::tempdir().unwrap();
        let doc = MuPdfDocument::open(&write_split_page(dir.path(), 320, 120)).unwrap();

        // Height limits the scale: an 80x60 slice in the middle of 160x60
        let notes = doc.rasterize(0, 160, 60, Variant::NotesHalf).unwrap();
        assert_eq!((notes.width, notes.height), (160, 60));
        assert_close(notes.pixel(10, 30), BACKGROUND_RGB);
        assert_close(notes.pixel(80, 30), BLUE);
        assert_close(notes.pixel(150, 30), BACKGROUND_RGB);
    }
}
