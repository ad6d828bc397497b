// ABOUTME: Resolvers that map a raw reference onto concrete image locations
// ABOUTME: All variants run; every unique, non-empty result is kept

use crate::host::{DocumentContext, Settings};
use crate::location::{is_data_image, normalize_path, RawReference, ResolvedLocation};
use std::path::{Path, PathBuf};

pub trait Resolver: Send {
    fn name(&self) -> &'static str;

    /// Pick up configuration that may have changed since the last scan.
    fn refresh_config(&mut self, _settings: &Settings) {}

    fn resolve(&self, ctx: &DocumentContext, reference: &RawReference) -> Option<ResolvedLocation>;
}

/// Inline `data:image/...` payloads, passed through untouched
pub struct DataUriResolver;

impl Resolver for DataUriResolver {
    fn name(&self) -> &'static str {
        "data-uri"
    }

    fn resolve(&self, _ctx: &DocumentContext, reference: &RawReference) -> Option<ResolvedLocation> {
        let value = reference.as_str().trim();
        is_data_image(value).then(|| ResolvedLocation::DataUri(value.to_string()))
    }
}

/// http(s) URLs, protocol-relative URLs and existing absolute paths
pub struct AbsoluteResolver;

impl Resolver for AbsoluteResolver {
    fn name(&self) -> &'static str {
        "absolute"
    }

    fn resolve(&self, _ctx: &DocumentContext, reference: &RawReference) -> Option<ResolvedLocation> {
        let value = reference.as_str().trim();

        if value.starts_with("http://") || value.starts_with("https://") {
            return Some(ResolvedLocation::NetworkUrl(value.to_string()));
        }

        if value.starts_with("//") {
            return Some(ResolvedLocation::NetworkUrl(format!("http:{}", value)));
        }

        if reference.has_scheme() {
            return None;
        }

        let path = Path::new(reference.path_portion());
        if path.is_absolute() && path.exists() {
            return Some(local(normalize_path(path)));
        }

        None
    }
}

/// Paths relative to the directory of the document being edited
pub struct RelativeToDocumentResolver;

impl Resolver for RelativeToDocumentResolver {
    fn name(&self) -> &'static str {
        "relative-to-document"
    }

    fn resolve(&self, ctx: &DocumentContext, reference: &RawReference) -> Option<ResolvedLocation> {
        if reference.has_scheme() {
            return None;
        }

        let directory = ctx.directory()?;
        let candidate = normalize_path(&directory.join(reference.path_portion()));
        candidate.exists().then(|| local(candidate))
    }
}

/// Paths relative to the workspace root, then to the configured source folder
#[derive(Default)]
pub struct RelativeToWorkspaceResolver {
    source_folder: String,
}

impl RelativeToWorkspaceResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source_folder(&self) -> &str {
        &self.source_folder
    }
}

impl Resolver for RelativeToWorkspaceResolver {
    fn name(&self) -> &'static str {
        "relative-to-workspace"
    }

    fn refresh_config(&mut self, settings: &Settings) {
        self.source_folder = settings.source_folder.clone();
    }

    fn resolve(&self, ctx: &DocumentContext, reference: &RawReference) -> Option<ResolvedLocation> {
        if reference.has_scheme() {
            return None;
        }

        let root = ctx.workspace_root.as_deref()?;
        // Root-relative web paths such as `/assets/a.png` are workspace-relative here
        let relative = reference.path_portion().trim_start_matches(['/', '\\']);
        if relative.is_empty() {
            return None;
        }

        let direct = normalize_path(&root.join(relative));
        if direct.exists() {
            return Some(local(direct));
        }

        let source_folder = self.source_folder.trim();
        if source_folder.is_empty() {
            return None;
        }

        let in_source = normalize_path(&root.join(source_folder).join(relative));
        in_source.exists().then(|| local(in_source))
    }
}

fn local(path: PathBuf) -> ResolvedLocation {
    ResolvedLocation::LocalPath(path.to_string_lossy().into_owned())
}

pub fn default_resolvers() -> Vec<Box<dyn Resolver>> {
    vec![
        Box::new(DataUriResolver),
        Box::new(AbsoluteResolver),
        Box::new(RelativeToDocumentResolver),
        Box::new(RelativeToWorkspaceResolver::new()),
    ]
}

/// Runs every resolver and keeps the unique, non-empty locations in first-seen order.
pub fn resolve_reference(
    resolvers: &[Box<dyn Resolver>],
    ctx: &DocumentContext,
    reference: &RawReference,
) -> Vec<ResolvedLocation> {
    let mut locations: Vec<ResolvedLocation> = Vec::new();

    for resolver in resolvers {
        let Some(location) = resolver.resolve(ctx, reference) else {
            continue;
        };
        if location.is_empty() || locations.contains(&location) {
            continue;
        }
        log::trace!("{} resolved {} -> {}", resolver.name(), reference, location);
        locations.push(location);
    }

    locations
}
