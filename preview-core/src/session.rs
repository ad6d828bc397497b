// ABOUTME: Scan orchestration: recognize, resolve and fetch across every line of the active buffer
// ABOUTME: Owns the fetch cache and the last scan result; all mutation funnels through here

use crate::cache::{CacheEvent, FetchCache, FetchResult};
use crate::constants::debounce::{REFRESH_DEBOUNCE, SCAN_DEBOUNCE};
use crate::downloader::ImageDownloader;
use crate::host::{EditorHost, HostEvent, MarkerSpec, RendererHandle, Settings};
use crate::hover::{self, DimensionProbe};
use crate::location::{is_accepted_image, ResolvedLocation};
use crate::recognizer::{default_recognizers, recognize_line, Recognizer};
use crate::resolver::{default_resolvers, resolve_reference, Resolver};
use crate::scheduler::{ScanScheduler, ScanState};
use futures_util::FutureExt;
use serde::Serialize;
use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

/// One accepted reference occurrence and the marker drawn for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Decoration {
    /// `None` when gutter previews are switched off
    pub renderer: Option<RendererHandle>,
    pub marker: MarkerSpec,
    pub line: usize,
    /// Text as it appeared in the buffer
    pub reference: String,
    /// The resolved location the preview was fetched from
    pub original_location: String,
    /// Local file (or data URI) the renderer reads
    pub local_path: String,
}

/// Everything one scan pass produced. Replaced wholesale by the next pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanResult {
    pub generation: u64,
    pub decorations: Vec<Decoration>,
}

impl ScanResult {
    pub fn on_line(&self, line: usize) -> impl Iterator<Item = &Decoration> {
        self.decorations.iter().filter(move |d| d.line == line)
    }

    pub fn len(&self) -> usize {
        self.decorations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decorations.is_empty()
    }
}

/// Where a marker goes once its fetch settles.
#[derive(Debug, Clone)]
struct PendingMarker {
    line: usize,
    reference: String,
    location: ResolvedLocation,
}

/// Posted by a fetch waiter when the fetch behind a marker settles.
#[derive(Debug)]
pub struct FetchSettled {
    generation: u64,
    marker: PendingMarker,
    result: FetchResult,
}

enum Message {
    Host(HostEvent),
    ScanDue(u64),
    Cache(CacheEvent),
    Settled(FetchSettled),
}

pub struct Session<H: EditorHost> {
    host: H,
    recognizers: Vec<Box<dyn Recognizer>>,
    resolvers: Vec<Box<dyn Resolver>>,
    cache: FetchCache,
    scheduler: ScanScheduler,
    last_scan: ScanResult,
    settings: Settings,
    generation: u64,
    pending: usize,
    closed: bool,
    cache_rx: UnboundedReceiver<CacheEvent>,
    due_rx: UnboundedReceiver<u64>,
    settled_tx: UnboundedSender<FetchSettled>,
    settled_rx: UnboundedReceiver<FetchSettled>,
}

impl<H: EditorHost> Session<H> {
    /// Opens a session with the default recognizers and resolvers.
    pub fn open(host: H) -> Self {
        Self::with_downloader(host, ImageDownloader::new())
    }

    pub fn with_downloader(host: H, downloader: ImageDownloader) -> Self {
        let (cache_tx, cache_rx) = unbounded_channel();
        let (due_tx, due_rx) = unbounded_channel();
        let (settled_tx, settled_rx) = unbounded_channel();

        Self {
            host,
            recognizers: default_recognizers(),
            resolvers: default_resolvers(),
            cache: FetchCache::with_downloader(downloader, cache_tx),
            scheduler: ScanScheduler::new(due_tx),
            last_scan: ScanResult::default(),
            settings: Settings::default(),
            generation: 0,
            pending: 0,
            closed: false,
            cache_rx,
            due_rx,
            settled_tx,
            settled_rx,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn last_scan(&self) -> &ScanResult {
        &self.last_scan
    }

    pub fn cache(&self) -> &FetchCache {
        &self.cache
    }

    pub fn scan_state(&self) -> ScanState {
        self.scheduler.state()
    }

    /// Fetches of the current scan that have not settled yet
    pub fn pending_fetches(&self) -> usize {
        self.pending
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Reacts to a host notification. Editor switches and workspace changes
    /// flush the cache before the rescan is scheduled.
    pub async fn handle_event(&mut self, event: HostEvent) {
        log::debug!("Host event: {:?}", event);
        match event {
            HostEvent::TextChanged => {}
            HostEvent::DocumentOpened => self.supersede(),
            HostEvent::ActiveEditorChanged | HostEvent::WorkspaceFoldersChanged => {
                // Waiters still holding the old generation must not draw
                // into the new editor once the flush deletes their files
                self.supersede();
                self.cache.cleanup().await;
            }
        }
        self.scheduler.schedule(SCAN_DEBOUNCE);
    }

    /// Reacts to a message from the fetch cache.
    pub fn handle_cache_event(&mut self, event: CacheEvent) {
        match event {
            CacheEvent::SourceChanged { key, entry_id } => {
                if self.cache.invalidate(&key, entry_id) {
                    log::debug!("Source changed, refreshing: {}", key);
                    self.scheduler.schedule(REFRESH_DEBOUNCE);
                }
            }
            // Evicted so the next scan retries; nothing is shown to the user
            CacheEvent::FetchFailed { key, entry_id } => {
                self.cache.invalidate(&key, entry_id);
            }
        }
    }

    /// Runs one full scan pass right away.
    pub fn scan_now(&mut self) {
        self.scheduler.mark_running();
        self.generation += 1;
        self.pending = 0;
        self.clear_markers();

        self.settings = self.host.settings();
        for resolver in &mut self.resolvers {
            resolver.refresh_config(&self.settings);
        }

        let mut fresh = ScanResult {
            generation: self.generation,
            decorations: Vec::new(),
        };

        if let Some(document) = self.host.active_document() {
            let ctx = document.context();

            for (line, text) in document.lines().enumerate() {
                let mut seen: HashSet<ResolvedLocation> = HashSet::new();

                for reference in recognize_line(&self.recognizers, &ctx, text) {
                    for location in resolve_reference(&self.resolvers, &ctx, &reference) {
                        let location = location.without_render_hint();
                        if !is_accepted_image(&location) {
                            log::trace!("Not an image type, skipping: {}", location);
                            continue;
                        }
                        if !seen.insert(location.clone()) {
                            continue;
                        }

                        let marker = PendingMarker {
                            line,
                            reference: reference.as_str().to_string(),
                            location,
                        };
                        if let Some(decoration) = self.materialize(marker) {
                            fresh.decorations.push(decoration);
                        }
                    }
                }
            }
        }

        log::debug!(
            "Scan {} rendered {} markers, {} pending",
            self.generation,
            fresh.len(),
            self.pending
        );
        self.last_scan = fresh;
        self.scheduler.mark_idle();
    }

    /// Renders the marker now if its bytes are ready, otherwise leaves a
    /// waiter behind that reports back when the fetch settles.
    fn materialize(&mut self, marker: PendingMarker) -> Option<Decoration> {
        let fetch = match self.cache.materialize(&marker.location) {
            Ok(fetch) => fetch,
            Err(e) => {
                log::debug!("Skipping {} this pass: {}", marker.location, e);
                return None;
            }
        };

        match fetch.clone().now_or_never() {
            Some(Ok(local_path)) => Some(self.decorate(marker, local_path)),
            Some(Err(e)) => {
                log::debug!("Fetch previously failed for {}: {}", marker.location, e);
                None
            }
            None => {
                self.pending += 1;
                let generation = self.generation;
                let settled = self.settled_tx.clone();
                tokio::spawn(async move {
                    let result = fetch.await;
                    let _ = settled.send(FetchSettled {
                        generation,
                        marker,
                        result,
                    });
                });
                None
            }
        }
    }

    fn decorate(&mut self, marker: PendingMarker, local_path: String) -> Decoration {
        let spec = MarkerSpec::contain(local_path.clone());
        let renderer = self
            .settings
            .show_image_preview_on_gutter
            .then(|| self.host.render_marker(marker.line, &spec));

        Decoration {
            renderer,
            marker: spec,
            line: marker.line,
            reference: marker.reference,
            original_location: marker.location.as_str().to_string(),
            local_path,
        }
    }

    /// Applies a settled fetch. Completions from superseded scans are dropped.
    pub fn handle_settled(&mut self, settled: FetchSettled) {
        if settled.generation != self.generation {
            log::trace!(
                "Discarding completion from scan {} (current {})",
                settled.generation,
                self.generation
            );
            return;
        }
        self.pending = self.pending.saturating_sub(1);

        match settled.result {
            Ok(local_path) => {
                let decoration = self.decorate(settled.marker, local_path);
                self.last_scan.decorations.push(decoration);
            }
            Err(e) => log::debug!("No preview for {}: {}", settled.marker.location, e),
        }
    }

    /// Waits until every fetch of the current scan has settled or `timeout`
    /// elapses. Returns whether everything settled.
    pub async fn settle(&mut self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;

        while self.pending > 0 {
            match tokio::time::timeout_at(deadline, self.settled_rx.recv()).await {
                Ok(Some(settled)) => self.handle_settled(settled),
                Ok(None) | Err(_) => return false,
            }
        }
        true
    }

    /// Hover content for `line` from the last scan.
    pub fn hover(&self, line: usize, probe: &dyn DimensionProbe) -> Option<String> {
        hover::hover(&self.last_scan, line, probe)
    }

    /// Event loop: host notifications, debounce ticks, cache messages and
    /// fetch completions, until the host hangs up. Closes the session on exit.
    pub async fn run(&mut self, mut events: UnboundedReceiver<HostEvent>) {
        while let Some(message) = self.next_message(&mut events).await {
            match message {
                Message::Host(event) => self.handle_event(event).await,
                Message::ScanDue(ticket) => {
                    if self.scheduler.take_due(ticket) {
                        self.scan_now();
                    }
                }
                Message::Cache(event) => self.handle_cache_event(event),
                Message::Settled(settled) => self.handle_settled(settled),
            }
        }
        self.close().await;
    }

    async fn next_message(&mut self, events: &mut UnboundedReceiver<HostEvent>) -> Option<Message> {
        tokio::select! {
            event = events.recv() => event.map(Message::Host),
            Some(ticket) = self.due_rx.recv() => Some(Message::ScanDue(ticket)),
            Some(event) = self.cache_rx.recv() => Some(Message::Cache(event)),
            Some(settled) = self.settled_rx.recv() => Some(Message::Settled(settled)),
        }
    }

    /// Tears the session down: pending scan cancelled, markers cleared,
    /// cache flushed and temp files removed.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.scheduler.cancel();
        self.supersede();
        self.cache.cleanup().await;
        self.closed = true;
        log::debug!("Session closed");
    }

    /// Retires the current scan: outstanding completions belong to no scan
    /// anymore and every marker it drew is cleared.
    fn supersede(&mut self) {
        self.generation += 1;
        self.pending = 0;
        self.clear_markers();
        self.last_scan = ScanResult::default();
    }

    fn clear_markers(&mut self) {
        for decoration in self.last_scan.decorations.drain(..) {
            if let Some(handle) = decoration.renderer {
                self.host.clear_marker(handle);
            }
        }
    }
}
