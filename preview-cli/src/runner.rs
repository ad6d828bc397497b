// ABOUTME: Command implementations shared by the binary and the integration tests
// ABOUTME: Builds a file host, drives a preview session and renders what it found

use crate::cli::DocumentArgs;
use crate::cli_output::CliOutput;
use crate::config::Config;
use crate::host::FileHost;
use crate::output::OutputFormat;
use anyhow::{Context, Result};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use preview_core::{HostEvent, ImageProbe, Session};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc::unbounded_channel;

/// Explicit `--config` wins over the standard lookup
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from_file(path),
        None => Config::load(),
    }
}

pub fn build_host(args: &DocumentArgs, config: Config) -> Result<FileHost> {
    let path = std::fs::canonicalize(&args.file)
        .with_context(|| format!("Cannot open {}", args.file.display()))?;

    let mut workspaces: Vec<PathBuf> = if !args.workspaces.is_empty() {
        args.workspaces.clone()
    } else {
        config.workspace_folders.clone().unwrap_or_default()
    };
    if workspaces.is_empty() {
        workspaces.push(std::env::current_dir().context("Cannot determine current directory")?);
    }

    // Containment checks compare canonical paths
    let workspaces = workspaces
        .iter()
        .filter_map(|folder| match std::fs::canonicalize(folder) {
            Ok(folder) => Some(folder),
            Err(e) => {
                log::warn!("Ignoring workspace folder {}: {}", folder.display(), e);
                None
            }
        })
        .collect();

    let language_id = args
        .language
        .clone()
        .unwrap_or_else(|| config.language_for(&path));

    log::debug!("Opening {} as {}", path.display(), language_id);
    Ok(FileHost::new(path, language_id, workspaces, config))
}

/// One scan pass, waiting up to `timeout` for fetches. The session is closed
/// before returning, so temp files are gone once the report is printed.
pub async fn scan(
    host: FileHost,
    timeout: Duration,
    formatter: &dyn OutputFormat,
    output: &CliOutput,
) -> Result<String> {
    let mut session = Session::open(host);
    session.scan_now();
    if !session.settle(timeout).await {
        output.warning(&format!(
            "{} fetches still pending after {}s",
            session.pending_fetches(),
            timeout.as_secs()
        ));
    }

    let report = formatter.format_scan(session.last_scan(), &ImageProbe);
    session.close().await;
    report
}

/// Hover content for a 1-based line
pub async fn hover(
    host: FileHost,
    line: usize,
    timeout: Duration,
    output: &CliOutput,
) -> Result<Option<String>> {
    let mut session = Session::open(host);
    session.scan_now();
    if !session.settle(timeout).await {
        output.warning("Some images did not finish loading");
    }

    let content = session.hover(line.saturating_sub(1), &ImageProbe);
    session.close().await;
    Ok(content)
}

/// Rescans whenever the file changes on disk until Ctrl-C.
pub async fn watch(host: FileHost, output: CliOutput) -> Result<()> {
    let target = host.path().clone();
    let parent = target
        .parent()
        .map(Path::to_path_buf)
        .context("Watched file has no parent directory")?;

    let (events, rx) = unbounded_channel();
    events
        .send(HostEvent::DocumentOpened)
        .context("Preview session is not running")?;

    let changes = events.clone();
    let watched = target.clone();
    // Editors often save by replacing the file, so watch the directory
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) => {
            let relevant = matches!(
                event.kind,
                EventKind::Modify(_) | EventKind::Create(_)
            ) && event.paths.iter().any(|p| p == &watched);
            if relevant {
                let _ = changes.send(HostEvent::TextChanged);
            }
        }
        Err(e) => log::warn!("Watch error: {}", e),
    })
    .context("Failed to create file watcher")?;
    watcher
        .watch(&parent, RecursiveMode::NonRecursive)
        .with_context(|| format!("Failed to watch {}", parent.display()))?;

    output.info(&format!("Watching {} (Ctrl-C to stop)", target.display()));

    let mut session = Session::open(host.with_echo(output));
    tokio::select! {
        _ = session.run(rx) => {}
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for Ctrl-C")?;
        }
    }

    drop(watcher);
    drop(events);
    session.close().await;
    Ok(())
}
