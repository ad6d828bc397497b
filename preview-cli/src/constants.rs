// ABOUTME: Centralized constants for the gutter preview CLI
// ABOUTME: Contains environment variable names, timeouts, and language guesses

/// Environment variables read by the CLI
pub mod env {
    /// Overrides `source_folder` from config files
    pub const SOURCE_FOLDER: &str = "GUTTER_PREVIEW_SOURCE_FOLDER";

    /// When set, markers are tracked but not drawn
    pub const HIDE_GUTTER: &str = "GUTTER_PREVIEW_HIDE_GUTTER";
}

/// Timeout configurations for various operations
pub mod timeouts {
    /// How long one-shot commands wait for fetches to settle, in seconds
    pub const DEFAULT_SETTLE_SECS: u64 = 10;
}

/// Language id for a lowercase file extension
pub fn language_for_extension(extension: &str) -> &'static str {
    match extension {
        "md" | "markdown" | "mdown" => "markdown",
        "css" => "css",
        "scss" => "scss",
        "less" => "less",
        "html" | "htm" => "html",
        "vue" => "vue",
        "svelte" => "svelte",
        "js" | "mjs" | "cjs" => "javascript",
        "jsx" => "javascriptreact",
        "ts" => "typescript",
        "tsx" => "typescriptreact",
        "py" => "python",
        "rs" => "rust",
        "go" => "go",
        "java" => "java",
        "json" => "json",
        "yaml" | "yml" => "yaml",
        "toml" => "toml",
        _ => "plaintext",
    }
}
