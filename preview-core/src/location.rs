// ABOUTME: Raw references, resolved locations, and the image extension filter
// ABOUTME: Handles rendering-hint stripping and lexical path normalization

use crate::constants::images::{ACCEPTED_EXTENSIONS, DATA_IMAGE_PREFIX, RENDER_HINT_SEPARATOR};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use url::Url;

static RENDER_HINT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\|(?:width|height)=\d+)+$").expect("render hint pattern is valid")
});

/// A string lifted verbatim from a line of text. Not yet known to be an image.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RawReference(String);

impl RawReference {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// The filesystem-relevant part of the reference: rendering hint, query
    /// string and fragment removed.
    pub fn path_portion(&self) -> &str {
        let value = strip_render_hint(self.0.trim());
        let end = value.find(['?', '#']).unwrap_or(value.len());
        &value[..end]
    }

    /// True when the reference names something other than a filesystem path
    pub fn has_scheme(&self) -> bool {
        let value = self.0.trim_start();
        value.starts_with("//") || value.starts_with("data:") || value.contains("://")
    }
}

impl fmt::Display for RawReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A concrete, fetchable identifier for image bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResolvedLocation {
    DataUri(String),
    NetworkUrl(String),
    LocalPath(String),
}

impl ResolvedLocation {
    /// Canonical string form, used as the fetch cache key
    pub fn as_str(&self) -> &str {
        match self {
            ResolvedLocation::DataUri(s)
            | ResolvedLocation::NetworkUrl(s)
            | ResolvedLocation::LocalPath(s) => s,
        }
    }

    pub fn is_data_uri(&self) -> bool {
        matches!(self, ResolvedLocation::DataUri(_))
    }

    pub fn is_empty(&self) -> bool {
        self.as_str().is_empty()
    }

    /// Drops a trailing `|width=N|height=N` hint. Data URIs are left alone.
    pub fn without_render_hint(self) -> Self {
        match self {
            ResolvedLocation::NetworkUrl(s) => {
                ResolvedLocation::NetworkUrl(strip_render_hint(&s).to_string())
            }
            ResolvedLocation::LocalPath(s) => {
                ResolvedLocation::LocalPath(strip_render_hint(&s).to_string())
            }
            data => data,
        }
    }

    /// Lowercased extension of the path component, if any
    pub fn extension(&self) -> Option<String> {
        let path = match self {
            ResolvedLocation::DataUri(_) => return None,
            ResolvedLocation::NetworkUrl(s) => {
                let stripped = strip_render_hint(s);
                match Url::parse(stripped) {
                    Ok(url) => url.path().to_string(),
                    Err(_) => stripped.to_string(),
                }
            }
            ResolvedLocation::LocalPath(s) => strip_render_hint(s).to_string(),
        };

        Path::new(&path)
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
    }
}

impl fmt::Display for ResolvedLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Removes a trailing rendering hint such as `|width=40|height=20`.
pub fn strip_render_hint(value: &str) -> &str {
    if !value.contains(RENDER_HINT_SEPARATOR) {
        return value;
    }
    match RENDER_HINT.find(value) {
        Some(m) => &value[..m.start()],
        None => value,
    }
}

pub fn is_data_image(value: &str) -> bool {
    value.starts_with(DATA_IMAGE_PREFIX)
}

/// Only data URIs and paths ending in a known image extension are previewed.
pub fn is_accepted_image(location: &ResolvedLocation) -> bool {
    if location.is_data_uri() {
        return true;
    }

    location
        .extension()
        .is_some_and(|ext| ACCEPTED_EXTENSIONS.contains(&ext.as_str()))
}

/// Resolves `.` and `..` components without touching the filesystem.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let can_pop = matches!(
                    normalized.components().next_back(),
                    Some(Component::Normal(_))
                );
                if can_pop {
                    normalized.pop();
                } else if !normalized.has_root() {
                    normalized.push(component);
                }
            }
            other => normalized.push(other),
        }
    }

    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_render_hint() {
        assert_eq!(strip_render_hint("a.png|width=10|height=20"), "a.png");
        assert_eq!(strip_render_hint("a.png|height=20"), "a.png");
        assert_eq!(strip_render_hint("a.png"), "a.png");
        // Only a well-formed trailing hint is removed
        assert_eq!(strip_render_hint("a|b.png"), "a|b.png");
    }

    #[test]
    fn test_path_portion() {
        assert_eq!(
            RawReference::new("./img/logo.png?raw=true").path_portion(),
            "./img/logo.png"
        );
        assert_eq!(
            RawReference::new("img/logo.png#frag").path_portion(),
            "img/logo.png"
        );
        assert_eq!(
            RawReference::new("img/logo.png|width=3").path_portion(),
            "img/logo.png"
        );
    }

    #[test]
    fn test_extension_detection() {
        assert_eq!(
            ResolvedLocation::NetworkUrl("https://example.com/a/B.PNG?x=1".into()).extension(),
            Some("png".to_string())
        );
        assert_eq!(
            ResolvedLocation::LocalPath("/tmp/pic.JpEg|width=4".into()).extension(),
            Some("jpeg".to_string())
        );
        assert_eq!(
            ResolvedLocation::DataUri("data:image/png;base64,AA".into()).extension(),
            None
        );
        assert_eq!(
            ResolvedLocation::LocalPath("/tmp/noext".into()).extension(),
            None
        );
    }

    #[test]
    fn test_accepted_images() {
        assert!(is_accepted_image(&ResolvedLocation::DataUri(
            "data:image/svg+xml;utf8,<svg/>".into()
        )));
        assert!(is_accepted_image(&ResolvedLocation::LocalPath(
            "/proj/logo.SVG".into()
        )));
        assert!(is_accepted_image(&ResolvedLocation::NetworkUrl(
            "http://cdn.example.com/a.gif".into()
        )));
        assert!(!is_accepted_image(&ResolvedLocation::LocalPath(
            "/proj/asset.xyz".into()
        )));
        assert!(!is_accepted_image(&ResolvedLocation::NetworkUrl(
            "https://example.com/doc.pdf".into()
        )));
    }

    #[test]
    fn test_without_render_hint() {
        let location =
            ResolvedLocation::NetworkUrl("https://example.com/a.png|width=10|height=5".into());
        assert_eq!(
            location.without_render_hint().as_str(),
            "https://example.com/a.png"
        );
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(
            normalize_path(Path::new("/proj/docs/./img/../img/logo.png")),
            PathBuf::from("/proj/docs/img/logo.png")
        );
        assert_eq!(normalize_path(Path::new("../a.png")), PathBuf::from("../a.png"));
    }

    #[test]
    fn test_has_scheme() {
        assert!(RawReference::new("https://a/b.png").has_scheme());
        assert!(RawReference::new("//cdn/b.png").has_scheme());
        assert!(RawReference::new("data:image/png;base64,AA").has_scheme());
        assert!(!RawReference::new("./b.png").has_scheme());
    }
}
