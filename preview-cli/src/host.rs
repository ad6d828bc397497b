// ABOUTME: File-backed editor host that lets the preview session run outside an editor
// ABOUTME: Reads the document from disk on every scan and keeps its own marker table

use crate::cli_output::CliOutput;
use crate::config::Config;
use preview_core::{Document, EditorHost, MarkerSpec, RendererHandle, Settings};
use std::collections::BTreeMap;
use std::path::PathBuf;

pub struct FileHost {
    path: PathBuf,
    language_id: String,
    workspace_folders: Vec<PathBuf>,
    config: Config,
    next_handle: u64,
    markers: BTreeMap<RendererHandle, (usize, MarkerSpec)>,
    echo: Option<CliOutput>,
}

impl FileHost {
    pub fn new(
        path: PathBuf,
        language_id: String,
        workspace_folders: Vec<PathBuf>,
        config: Config,
    ) -> Self {
        Self {
            path,
            language_id,
            workspace_folders,
            config,
            next_handle: 1,
            markers: BTreeMap::new(),
            echo: None,
        }
    }

    /// Print every marker change as it happens
    pub fn with_echo(mut self, output: CliOutput) -> Self {
        self.echo = Some(output);
        self
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Markers currently drawn, ordered by the time they were drawn
    pub fn markers(&self) -> impl Iterator<Item = (usize, &MarkerSpec)> {
        self.markers.values().map(|(line, marker)| (*line, marker))
    }
}

impl EditorHost for FileHost {
    fn active_document(&self) -> Option<Document> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) => {
                log::warn!("Cannot read {}: {}", self.path.display(), e);
                return None;
            }
        };

        Some(Document {
            path: Some(self.path.clone()),
            language_id: self.language_id.clone(),
            text,
            workspace_folders: self.workspace_folders.clone(),
        })
    }

    fn settings(&self) -> Settings {
        self.config.to_settings()
    }

    fn render_marker(&mut self, line: usize, marker: &MarkerSpec) -> RendererHandle {
        let handle = RendererHandle(self.next_handle);
        self.next_handle += 1;

        if let Some(ref output) = self.echo {
            output.status("+", &format!("line {}: {}", line + 1, marker.icon_path));
        }
        self.markers.insert(handle, (line, marker.clone()));
        handle
    }

    fn clear_marker(&mut self, handle: RendererHandle) {
        if let Some((line, _)) = self.markers.remove(&handle) {
            if let Some(ref output) = self.echo {
                output.status("-", &format!("line {}", line + 1));
            }
        }
    }
}
