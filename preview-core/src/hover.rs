// ABOUTME: Hover content for a line: a preview link plus pixel dimensions when probing works
// ABOUTME: Dimension probing sits behind a trait; its failures never leave this module

use crate::constants::hover::PREVIEW_HEIGHT;
use crate::error::{PreviewError, Result};
use crate::location::is_data_image;
use crate::session::ScanResult;
use base64::Engine;
use std::io::Cursor;

pub trait DimensionProbe {
    /// Pixel `(width, height)` of the image at `local_path` (a file or data URI)
    fn probe(&self, local_path: &str) -> Result<(u32, u32)>;
}

/// Reads image headers with the `image` crate
pub struct ImageProbe;

impl DimensionProbe for ImageProbe {
    fn probe(&self, local_path: &str) -> Result<(u32, u32)> {
        if is_data_image(local_path) {
            let bytes = decode_data_uri(local_path)?;
            let reader = image::ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
            return Ok(reader.into_dimensions()?);
        }

        Ok(image::image_dimensions(local_path)?)
    }
}

fn decode_data_uri(uri: &str) -> Result<Vec<u8>> {
    let (header, payload) = uri
        .split_once(',')
        .ok_or_else(|| PreviewError::Probe("data URI without payload".to_string()))?;

    if !header.ends_with(";base64") {
        return Err(PreviewError::Probe(format!(
            "unsupported data URI encoding: {}",
            header
        )));
    }

    base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| PreviewError::Probe(e.to_string()))
}

/// Markup for the first decoration on `line`, or `None` when the line has none.
pub fn hover(scan: &ScanResult, line: usize, probe: &dyn DimensionProbe) -> Option<String> {
    let decoration = scan.on_line(line).next()?;
    let location = &decoration.original_location;
    let preview = format!("![{0}]({0}|height={1})", location, PREVIEW_HEIGHT);

    match probe.probe(&decoration.local_path) {
        Ok((width, height)) => Some(format!("{}  \n{}x{}", preview, width, height)),
        Err(e) => {
            log::debug!("Dimension probe failed for {}: {}", decoration.local_path, e);
            Some(preview)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MarkerSpec;
    use crate::session::Decoration;
    use crate::test_helpers::png_bytes;
    use tempfile::TempDir;

    struct FailingProbe;

    impl DimensionProbe for FailingProbe {
        fn probe(&self, _local_path: &str) -> Result<(u32, u32)> {
            Err(PreviewError::Probe("unreadable".to_string()))
        }
    }

    fn scan_with(line: usize, original: &str, local_path: &str) -> ScanResult {
        ScanResult {
            generation: 1,
            decorations: vec![Decoration {
                renderer: None,
                marker: MarkerSpec::contain(local_path),
                line,
                reference: original.to_string(),
                original_location: original.to_string(),
                local_path: local_path.to_string(),
            }],
        }
    }

    #[test]
    fn test_hover_with_dimensions() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cached.png");
        std::fs::write(&path, png_bytes(16, 9)).unwrap();
        let path = path.to_string_lossy().into_owned();

        let scan = scan_with(3, "https://example.com/a.png", &path);
        let markup = hover(&scan, 3, &ImageProbe).unwrap();

        assert_eq!(
            markup,
            "![https://example.com/a.png](https://example.com/a.png|height=100)  \n16x9"
        );
    }

    #[test]
    fn test_hover_without_dimensions_on_probe_failure() {
        let scan = scan_with(0, "/proj/logo.svg", "/tmp/whatever.svg");
        let markup = hover(&scan, 0, &FailingProbe).unwrap();
        assert_eq!(markup, "![/proj/logo.svg](/proj/logo.svg|height=100)");
    }

    #[test]
    fn test_hover_on_line_without_decoration() {
        let scan = scan_with(0, "/proj/logo.png", "/tmp/x.png");
        assert!(hover(&scan, 1, &ImageProbe).is_none());
        assert!(hover(&ScanResult::default(), 0, &ImageProbe).is_none());
    }

    #[test]
    fn test_probe_data_uri() {
        let encoded = base64::engine::general_purpose::STANDARD.encode(png_bytes(2, 5));
        let uri = format!("data:image/png;base64,{}", encoded);
        assert_eq!(ImageProbe.probe(&uri).unwrap(), (2, 5));
    }

    #[test]
    fn test_probe_errors_are_values() {
        assert!(ImageProbe.probe("data:image/png;base64,!!!").is_err());
        assert!(ImageProbe.probe("data:image/svg+xml;utf8,<svg/>").is_err());
        assert!(ImageProbe.probe("/definitely/not/here.png").is_err());
    }
}
