//! Crawl progress reporting.
//!
//! Reports observable progress during `tds2stac harvest` and `tds2stac count`
//! so users see which catalogs are being walked and how many items are
//! connected. Progress is emitted on **stderr** so stdout remains parseable
//! for scripts.

use std::io::Write;

/// A single progress event emitted by the crawler.
#[derive(Clone, Debug, PartialEq)]
pub enum CrawlProgress {
    /// Counter pass: `documents` catalogs read so far.
    Counting { documents: u64, datasets: u64 },
    /// Build pass: a catalog document was parsed and its branches registered.
    CatalogProcessed { url: String, catalogs: u64 },
    /// Build pass: an item was attached. `total` is 0 when unknown.
    ItemConnected { id: String, items: u64, total: u64 },
    /// Build pass: a dataset produced no item.
    DatasetSkipped { id: String, reason: String },
}

/// Receives crawl progress. Implementations write to stderr (human or JSON).
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: CrawlProgress);
}

/// Human-friendly progress on stderr: "harvest  items  1,234 / 5,000".
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, event: CrawlProgress) {
        let line = match &event {
            CrawlProgress::Counting {
                documents,
                datasets,
            } => format!(
                "count  {} catalogs  {} datasets\n",
                format_number(*documents),
                format_number(*datasets)
            ),
            CrawlProgress::CatalogProcessed { url, catalogs } => {
                format!("harvest  catalog {}  {}\n", format_number(*catalogs), url)
            }
            CrawlProgress::ItemConnected { id, items, total } => {
                if *total > 0 {
                    format!(
                        "harvest  items  {} / {}  {}\n",
                        format_number(*items),
                        format_number(*total),
                        id
                    )
                } else {
                    format!("harvest  items  {}  {}\n", format_number(*items), id)
                }
            }
            CrawlProgress::DatasetSkipped { id, reason } => {
                format!("harvest  skipped {}: {}\n", id, reason)
            }
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl ProgressReporter for JsonProgress {
    fn report(&self, event: CrawlProgress) {
        let obj = match &event {
            CrawlProgress::Counting {
                documents,
                datasets,
            } => serde_json::json!({
                "event": "progress",
                "phase": "counting",
                "documents": documents,
                "datasets": datasets
            }),
            CrawlProgress::CatalogProcessed { url, catalogs } => serde_json::json!({
                "event": "progress",
                "phase": "catalog",
                "url": url,
                "n": catalogs
            }),
            CrawlProgress::ItemConnected { id, items, total } => serde_json::json!({
                "event": "progress",
                "phase": "item",
                "id": id,
                "n": items,
                "total": total
            }),
            CrawlProgress::DatasetSkipped { id, reason } => serde_json::json!({
                "event": "skipped",
                "id": id,
                "reason": reason
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _event: CrawlProgress) {}
}

pub(crate) fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    /// Build a reporter for this mode.
    pub fn reporter(&self) -> Box<dyn ProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_number_comma() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }

    #[test]
    fn off_mode_is_silent() {
        let reporter = ProgressMode::Off.reporter();
        reporter.report(CrawlProgress::Counting {
            documents: 1,
            datasets: 2,
        });
    }
}
