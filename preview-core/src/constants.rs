// ABOUTME: Centralized constants for the preview core
// ABOUTME: Contains debounce windows, accepted image types, and hover/cleanup limits

/// Scan scheduling windows
pub mod debounce {
    use std::time::Duration;

    /// Delay applied to editor-driven rescans (typing, editor switches)
    pub const SCAN_DEBOUNCE: Duration = Duration::from_millis(500);

    /// Delay applied when a watched local image changed and must be refetched
    pub const REFRESH_DEBOUNCE: Duration = Duration::from_millis(50);
}

/// Image type acceptance
pub mod images {
    /// Extensions (lowercase, without dot) that are rendered as previews
    pub const ACCEPTED_EXTENSIONS: &[&str] = &["svg", "png", "jpeg", "jpg", "bmp", "gif"];

    /// Scheme prefix identifying inline image data
    pub const DATA_IMAGE_PREFIX: &str = "data:image";

    /// Separator introducing a `|width=N|height=N` rendering hint
    pub const RENDER_HINT_SEPARATOR: char = '|';
}

/// Hover rendering
pub mod hover {
    /// Height in pixels requested for the hover preview image
    pub const PREVIEW_HEIGHT: u32 = 100;
}

/// Cache lifecycle
pub mod cache {
    use std::time::Duration;

    /// How long cleanup waits for an in-flight fetch before aborting it
    pub const FLUSH_GRACE: Duration = Duration::from_secs(2);

    /// Prefix used for temporary files holding fetched image bytes
    pub const TEMP_FILE_PREFIX: &str = "gutter-preview-";
}

/// Host configuration
pub mod settings {
    /// Configuration namespace the host stores settings under
    pub const NAMESPACE: &str = "gutterpreview";
}
