// ABOUTME: Test helpers: an in-memory editor host that records marker traffic
// ABOUTME: Also builds small real PNG payloads for fetch and probe tests

use crate::host::{Document, EditorHost, MarkerSpec, RendererHandle, Settings};
use std::io::Cursor;
use std::path::PathBuf;

pub struct RecordingHost {
    document: Document,
    settings: Settings,
    next_handle: u64,
    live: Vec<(RendererHandle, MarkerSpec, usize)>,
    cleared: Vec<RendererHandle>,
    rendered: usize,
}

impl RecordingHost {
    pub fn with_language(language_id: &str, text: impl Into<String>) -> Self {
        Self {
            document: Document {
                path: None,
                language_id: language_id.to_string(),
                text: text.into(),
                workspace_folders: Vec::new(),
            },
            settings: Settings::default(),
            next_handle: 0,
            live: Vec::new(),
            cleared: Vec::new(),
            rendered: 0,
        }
    }

    pub fn markdown(path: PathBuf, text: impl Into<String>) -> Self {
        Self::with_language("markdown", text).with_path(path)
    }

    pub fn with_path(mut self, path: PathBuf) -> Self {
        self.document.path = Some(path);
        self
    }

    pub fn with_workspace(mut self, folder: PathBuf) -> Self {
        self.document.workspace_folders.push(folder);
        self
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn set_text(&mut self, text: &str) {
        self.document.text = text.to_string();
    }

    pub fn live_markers(&self) -> &[(RendererHandle, MarkerSpec, usize)] {
        &self.live
    }

    pub fn cleared(&self) -> &[RendererHandle] {
        &self.cleared
    }

    pub fn rendered_count(&self) -> usize {
        self.rendered
    }
}

impl EditorHost for RecordingHost {
    fn active_document(&self) -> Option<Document> {
        Some(self.document.clone())
    }

    fn settings(&self) -> Settings {
        self.settings.clone()
    }

    fn render_marker(&mut self, line: usize, marker: &MarkerSpec) -> RendererHandle {
        self.next_handle += 1;
        self.rendered += 1;
        let handle = RendererHandle(self.next_handle);
        self.live.push((handle, marker.clone(), line));
        handle
    }

    fn clear_marker(&mut self, handle: RendererHandle) {
        self.live.retain(|(h, _, _)| *h != handle);
        self.cleared.push(handle);
    }
}

/// A valid PNG of the given size
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = Vec::new();
    image::RgbaImage::new(width, height)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("encoding an in-memory PNG cannot fail");
    bytes
}
