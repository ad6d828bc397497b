// ABOUTME: This module handles output formatting for scan results
// ABOUTME: It provides table formatting with color support and JSON output

use anyhow::Result;
use owo_colors::OwoColorize;
use preview_core::{Decoration, DimensionProbe, ScanResult};
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

pub trait OutputFormat {
    fn format_scan(&self, scan: &ScanResult, probe: &dyn DimensionProbe) -> Result<String>;
}

/// One marker as shown to the user. Line numbers are 1-based.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerView<'a> {
    pub line: usize,
    pub reference: &'a str,
    pub location: &'a str,
    pub local_path: &'a str,
    pub rendered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

impl<'a> MarkerView<'a> {
    pub fn new(decoration: &'a Decoration, probe: &dyn DimensionProbe) -> Self {
        let dimensions = probe.probe(&decoration.local_path).ok();
        Self {
            line: decoration.line + 1,
            reference: &decoration.reference,
            location: &decoration.original_location,
            local_path: &decoration.local_path,
            rendered: decoration.renderer.is_some(),
            width: dimensions.map(|(w, _)| w),
            height: dimensions.map(|(_, h)| h),
        }
    }
}

/// Views sorted by line, in discovery order within a line
pub fn marker_views<'a>(scan: &'a ScanResult, probe: &dyn DimensionProbe) -> Vec<MarkerView<'a>> {
    let mut views: Vec<MarkerView<'a>> = scan
        .decorations
        .iter()
        .map(|decoration| MarkerView::new(decoration, probe))
        .collect();
    views.sort_by_key(|view| view.line);
    views
}

pub struct TableFormatter {
    use_color: bool,
}

impl TableFormatter {
    pub fn new(use_color: bool) -> Self {
        Self { use_color }
    }

    fn truncate(text: &str, max_len: usize) -> String {
        if text.chars().count() <= max_len {
            text.to_string()
        } else {
            let kept: String = text.chars().take(max_len - 3).collect();
            format!("{}...", kept)
        }
    }

    fn format_size(&self, view: &MarkerView) -> String {
        match (view.width, view.height) {
            (Some(w), Some(h)) => format!("{}x{}", w, h),
            _ if self.use_color => "?".dimmed().to_string(),
            _ => "?".to_string(),
        }
    }

    fn format_line(&self, view: &MarkerView) -> String {
        if self.use_color && !view.rendered {
            view.line.to_string().dimmed().to_string()
        } else if self.use_color {
            view.line.to_string().green().to_string()
        } else {
            view.line.to_string()
        }
    }
}

#[derive(Tabled)]
struct TableRow {
    #[tabled(rename = "Line")]
    line: String,
    #[tabled(rename = "Reference")]
    reference: String,
    #[tabled(rename = "Location")]
    location: String,
    #[tabled(rename = "Size")]
    size: String,
}

impl OutputFormat for TableFormatter {
    fn format_scan(&self, scan: &ScanResult, probe: &dyn DimensionProbe) -> Result<String> {
        let rows: Vec<TableRow> = marker_views(scan, probe)
            .iter()
            .map(|view| TableRow {
                line: self.format_line(view),
                reference: Self::truncate(view.reference, 40),
                location: Self::truncate(view.location, 60),
                size: self.format_size(view),
            })
            .collect();

        let mut table = Table::new(rows);
        table.with(Style::psql());
        Ok(table.to_string())
    }
}

pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }
}

impl OutputFormat for JsonFormatter {
    fn format_scan(&self, scan: &ScanResult, probe: &dyn DimensionProbe) -> Result<String> {
        let views = marker_views(scan, probe);
        if self.pretty {
            Ok(serde_json::to_string_pretty(&views)?)
        } else {
            Ok(serde_json::to_string(&views)?)
        }
    }
}
