// ABOUTME: Narrow interfaces to the host editor: documents, settings, events, markers
// ABOUTME: The editor's buffer model and decoration surface stay behind the EditorHost trait

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Notifications from the host that cause a rescan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    TextChanged,
    ActiveEditorChanged,
    WorkspaceFoldersChanged,
    DocumentOpened,
}

/// Settings read from the host configuration store before every scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub show_image_preview_on_gutter: bool,
    pub source_folder: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            show_image_preview_on_gutter: true,
            source_folder: String::new(),
        }
    }
}

impl Settings {
    /// Reads the settings object stored under the configuration namespace.
    /// Missing or malformed sections fall back to defaults.
    pub fn from_host_json(store: &serde_json::Value) -> Self {
        store
            .get(crate::constants::settings::NAMESPACE)
            .cloned()
            .and_then(|section| serde_json::from_value(section).ok())
            .unwrap_or_default()
    }
}

/// Snapshot of the active buffer as handed over by the host.
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub path: Option<PathBuf>,
    pub language_id: String,
    pub text: String,
    pub workspace_folders: Vec<PathBuf>,
}

impl Document {
    pub fn context(&self) -> DocumentContext {
        DocumentContext {
            path: self.path.clone(),
            language_id: self.language_id.clone(),
            workspace_root: self.containing_workspace_folder().map(Path::to_path_buf),
        }
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.lines()
    }

    /// The deepest workspace folder that contains the document
    fn containing_workspace_folder(&self) -> Option<&Path> {
        let path = self.path.as_deref()?;
        self.workspace_folders
            .iter()
            .filter(|folder| path.starts_with(folder))
            .max_by_key(|folder| folder.components().count())
            .map(PathBuf::as_path)
    }
}

/// What recognizers and resolvers know about the document being scanned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentContext {
    pub path: Option<PathBuf>,
    pub language_id: String,
    pub workspace_root: Option<PathBuf>,
}

impl DocumentContext {
    pub fn directory(&self) -> Option<&Path> {
        self.path.as_deref().and_then(Path::parent)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RendererHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IconSize {
    Contain,
}

/// Gutter icon registration applied to a zero-width range on one line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerSpec {
    pub icon_path: String,
    pub icon_size_mode: IconSize,
}

impl MarkerSpec {
    pub fn contain(icon_path: impl Into<String>) -> Self {
        Self {
            icon_path: icon_path.into(),
            icon_size_mode: IconSize::Contain,
        }
    }
}

pub trait EditorHost {
    /// The buffer currently shown, if any
    fn active_document(&self) -> Option<Document>;

    /// Current values from the configuration store
    fn settings(&self) -> Settings;

    /// Draw a gutter marker at `line` (zero-based)
    fn render_marker(&mut self, line: usize, marker: &MarkerSpec) -> RendererHandle;

    /// Remove a marker previously returned by `render_marker`
    fn clear_marker(&mut self, handle: RendererHandle);
}
