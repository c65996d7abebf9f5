//! Harvest orchestration.
//!
//! Coordinates the full flow: fetch root → counter pass → build pass →
//! write catalog. A summary is printed to stdout; progress goes through the
//! configured [`ProgressReporter`](crate::progress::ProgressReporter).

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::config::Config;
use crate::crawl::{self, CrawlContext};
use crate::fetch::HttpFetcher;
use crate::progress::ProgressMode;
use crate::writer;

/// Command-line overrides for `harvest`.
#[derive(Debug, Clone, Default)]
pub struct HarvestOptions {
    pub out: Option<PathBuf>,
    pub catalog_id: Option<String>,
    pub description: Option<String>,
}

/// `tds2stac count <url>`: run the counter pass only.
pub async fn run_count(config: &Config, url: &str, mode: ProgressMode) -> Result<()> {
    let fetcher = HttpFetcher::new(&config.http)?;
    let reporter = mode.reporter();
    let ctx = CrawlContext::new(&fetcher, url).with_progress(reporter.as_ref());

    let root_xml = ctx.root_document().await;
    let counts = crawl::count_pass(&ctx, &root_xml).await;

    println!("count {}", ctx.root_url);
    println!("  catalogs read: {}", counts.documents);
    println!("  branches: {}", counts.branches);
    println!("  datasets: {}", counts.datasets);
    if counts.skipped > 0 {
        println!("  unreachable catalogs: {}", counts.skipped);
    }
    println!("ok");
    Ok(())
}

/// `tds2stac harvest <url>`: run both passes and write the catalog.
pub async fn run_harvest(
    config: &Config,
    url: &str,
    options: HarvestOptions,
    mode: ProgressMode,
) -> Result<()> {
    let fetcher = HttpFetcher::new(&config.http)?;
    let reporter = mode.reporter();
    let description = options
        .description
        .clone()
        .unwrap_or_else(|| config.output.description.clone());
    let ctx = CrawlContext::new(&fetcher, url)
        .with_progress(reporter.as_ref())
        .with_description(description);

    let report = harvest(&ctx, config, &options).await?;

    println!("harvest {}", ctx.root_url);
    println!("  branches counted: {}", report.expected.branches);
    println!("  datasets counted: {}", report.expected.datasets);
    println!("  catalogs created: {}", report.catalogs);
    println!("  items connected: {}", report.items);
    if report.skipped_datasets > 0 {
        println!("  datasets skipped: {}", report.skipped_datasets);
    }
    if report.skipped_catalogs > 0 {
        println!("  unreachable catalogs: {}", report.skipped_catalogs);
    }
    match &report.written_to {
        Some(dir) => println!("  written to: {}", dir.display()),
        None => println!("  not written (no output directory)"),
    }
    println!("ok");
    Ok(())
}

/// Outcome of [`harvest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestReport {
    pub expected: crawl::CrawlCounts,
    pub catalogs: usize,
    pub items: u64,
    pub skipped_datasets: usize,
    pub skipped_catalogs: u64,
    pub written_to: Option<PathBuf>,
}

/// Crawl from `ctx` and save the tree when an output directory is set.
///
/// `options` override `config.output`. The root catalog's id is the
/// configured id if any, else derived from its URL. An unreachable root
/// yields a tree holding only the root catalog.
pub async fn harvest(
    ctx: &CrawlContext<'_>,
    config: &Config,
    options: &HarvestOptions,
) -> Result<HarvestReport> {
    let root_xml = ctx.root_document().await;

    let expected = crawl::count_pass(ctx, &root_xml).await;
    let mut outcome = crawl::build_pass(ctx, &root_xml, expected.datasets).await;

    let root = outcome
        .tree
        .lookup(&ctx.root_url)
        .context("root catalog missing from tree")?;
    if let Some(id) = options.catalog_id.as_ref().or(config.output.catalog_id.as_ref()) {
        if !outcome.tree.rename(root, id) {
            anyhow::bail!("catalog id '{}' is already used by a sub-catalog", id);
        }
    }

    let dest = options.out.clone().or_else(|| config.output.dir.clone());
    if let Some(dir) = &dest {
        writer::save(&outcome.tree, root, dir)
            .with_context(|| format!("Failed to save catalog to {}", dir.display()))?;
    }

    Ok(HarvestReport {
        expected,
        catalogs: outcome.tree.len(),
        items: outcome.items,
        skipped_datasets: outcome.skipped_datasets.len(),
        skipped_catalogs: outcome.counts.skipped,
        written_to: dest,
    })
}
