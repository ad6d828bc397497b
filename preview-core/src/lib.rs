// ABOUTME: Image reference recognition, resolution and fetch caching for editor gutter previews
// ABOUTME: Hosts drive a Session with editor events and draw the markers it hands back

pub mod cache;
pub mod constants;
pub mod downloader;
pub mod error;
pub mod host;
pub mod hover;
pub mod location;
pub mod recognizer;
pub mod resolver;
pub mod scheduler;
pub mod session;

#[cfg(test)]
mod test_helpers;

pub use cache::{CacheEvent, FetchCache, FetchResult, SharedFetch};
pub use downloader::ImageDownloader;
pub use error::{PreviewError, Result};
pub use host::{
    Document, DocumentContext, EditorHost, HostEvent, IconSize, MarkerSpec, RendererHandle,
    Settings,
};
pub use hover::{hover, DimensionProbe, ImageProbe};
pub use location::{is_accepted_image, strip_render_hint, RawReference, ResolvedLocation};
pub use recognizer::{default_recognizers, recognize_line, Recognizer};
pub use resolver::{default_resolvers, resolve_reference, Resolver};
pub use scheduler::{ScanScheduler, ScanState};
pub use session::{Decoration, ScanResult, Session};
