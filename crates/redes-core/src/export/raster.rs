//! PNG rendering of the SVG charts.

use std::path::Path;
use std::sync::{Arc, OnceLock};

use resvg::{tiny_skia, usvg};

use crate::error::{PipelineError, Result};
use crate::export::write_bytes;

/// First eight bytes of every PNG file.
pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

/// System fonts, loaded once per process.
fn fonts() -> Arc<usvg::fontdb::Database> {
    static FONTS: OnceLock<Arc<usvg::fontdb::Database>> = OnceLock::new();
    FONTS
        .get_or_init(|| {
            let mut db = usvg::fontdb::Database::new();
            db.load_system_fonts();
            if db.is_empty() {
                log::warn!("no system fonts found; chart text will be missing from PNGs");
            }
            Arc::new(db)
        })
        .clone()
}

/// Rasterize `svg` at its own size and encode it as PNG.
pub fn render_png(svg: &str) -> std::result::Result<Vec<u8>, String> {
    let options = usvg::Options {
        fontdb: fonts(),
        ..Default::default()
    };
    let tree = usvg::Tree::from_str(svg, &options).map_err(|e| e.to_string())?;
    let size = tree.size().to_int_size();
    let mut pixmap = tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| format!("empty canvas {}x{}", size.width(), size.height()))?;
    resvg::render(&tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());
    pixmap.encode_png().map_err(|e| e.to_string())
}

/// Render `svg` and write it to `path` as PNG.
pub fn write_png(path: &Path, svg: &str) -> Result<()> {
    let png = render_png(svg).map_err(|e| PipelineError::export(path, e))?;
    write_bytes(path, &png)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::charts::histogram;

    fn dimensions(png: &[u8]) -> (u32, u32) {
        // IHDR follows the signature and chunk header
        let w = u32::from_be_bytes([png[16], png[17], png[18], png[19]]);
        let h = u32::from_be_bytes([png[20], png[21], png[22], png[23]]);
        (w, h)
    }

    #[test]
    fn renders_chart_at_its_own_size() {
        let svg = histogram("Values", "R$", &[1.0, 2.0, 2.5, 10.0], 5, false, "seagreen");
        let png = render_png(&svg).unwrap();
        assert!(png.starts_with(&PNG_SIGNATURE));
        assert_eq!(dimensions(&png), (1000, 700));
    }

    #[test]
    fn malformed_svg_is_an_export_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        let err = write_png(&path, "<svg").unwrap_err();
        assert!(matches!(err, PipelineError::Export { .. }));
        assert!(!path.exists());
    }
}
