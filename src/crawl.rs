//! Two-pass catalog traversal.
//!
//! Both passes share one tree-walking primitive, [`walk`], which visits every
//! reachable catalog document exactly once using an explicit work stack:
//!
//! ```text
//! Enter(url) ─▶ fetch ─▶ parse ─▶ on_document ─▶ Enter(children...) ─▶ Exit(url) ─▶ on_leaves
//! ```
//!
//! - [`count_pass`] tallies branches and datasets ([`CrawlCounts`]).
//! - [`build_pass`] builds the [`CatalogTree`] and attaches one STAC item per
//!   leaf dataset whose metadata can be extracted ([`BuildOutcome`]).
//!
//! Every failure below the root is recovered locally: an unreachable or
//! malformed child catalog contributes nothing, and a dataset whose metadata
//! is incomplete is skipped. All crawl state lives in the visitor and the
//! walk's own [`VisitedSet`], so independent crawls never interfere.

use std::collections::HashSet;

use async_trait::async_trait;
use tds_stac_core::{CatalogTree, Item};
use tracing::{debug, info, warn};

use crate::assemble::assemble;
use crate::error::{DatasetError, FetchError};
use crate::fetch::Fetcher;
use crate::metadata;
use crate::progress::{CrawlProgress, NoProgress, ProgressReporter};
use crate::thredds::{CatalogDocument, DocumentKind, LeafDataset};
use crate::urls;

/// Catalog URLs already entered during one walk.
#[derive(Debug, Default, Clone)]
pub struct VisitedSet {
    urls: HashSet<String>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `url` as visited. Returns `false` if it already was.
    pub fn insert(&mut self, url: &str) -> bool {
        self.urls.insert(url.to_string())
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

/// Callbacks driven by [`walk`].
#[async_trait]
pub trait CatalogVisitor: Send {
    /// A catalog document was parsed. Called before any child is entered.
    async fn on_document(&mut self, url: &str, document: &CatalogDocument);

    /// Every child of `url` has been walked; `datasets` are its own leaves.
    async fn on_leaves(&mut self, url: &str, datasets: &[LeafDataset]);

    /// `url` could not be fetched or parsed and was treated as empty.
    fn on_unreadable(&mut self, _url: &str, _reason: &str) {}
}

enum Frame {
    Enter { url: String, body: Option<String> },
    Exit { url: String, datasets: Vec<LeafDataset> },
}

/// Walk the catalog graph rooted at `root_url`, whose XML is `root_xml`.
///
/// Children are entered depth-first in document order. A URL is marked
/// visited when it is entered, so cycles and shared sub-catalogs are walked
/// once. Returns the set of visited URLs.
pub async fn walk(
    fetcher: &dyn Fetcher,
    root_url: &str,
    root_xml: &str,
    visitor: &mut dyn CatalogVisitor,
) -> VisitedSet {
    let mut visited = VisitedSet::new();
    let mut stack = vec![Frame::Enter {
        url: root_url.to_string(),
        body: Some(root_xml.to_string()),
    }];

    while let Some(frame) = stack.pop() {
        match frame {
            Frame::Enter { url, body } => {
                if !visited.insert(&url) {
                    continue;
                }

                let body = match body {
                    Some(b) => b,
                    None => match fetcher.fetch(&url).await {
                        Ok(b) => b,
                        Err(e) => {
                            warn!(catalog = %url, "skipping unreachable catalog: {}", e);
                            visitor.on_unreadable(&url, &e.to_string());
                            continue;
                        }
                    },
                };

                let document = match CatalogDocument::parse(&url, &body) {
                    Ok(d) => d,
                    Err(e) => {
                        warn!(catalog = %url, "treating catalog as empty: {}", e);
                        visitor.on_unreadable(&url, &e.to_string());
                        continue;
                    }
                };
                debug!(
                    catalog = %url,
                    branches = document.branches.len(),
                    datasets = document.datasets.len(),
                    "parsed catalog"
                );

                visitor.on_document(&url, &document).await;

                let CatalogDocument {
                    branches, datasets, ..
                } = document;
                stack.push(Frame::Exit { url, datasets });
                for child in branches.into_iter().rev() {
                    if !visited.contains(&child) {
                        stack.push(Frame::Enter {
                            url: child,
                            body: None,
                        });
                    }
                }
            }
            Frame::Exit { url, datasets } => {
                visitor.on_leaves(&url, &datasets).await;
            }
        }
    }

    visited
}

/// Totals gathered by the counter pass.
///
/// A document with at least one `catalogRef` adds its reference count to
/// `branches`; a document without any adds its leaf datasets to `datasets`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlCounts {
    pub branches: u64,
    pub datasets: u64,
    /// Catalog documents parsed.
    pub documents: u64,
    /// Catalog documents that could not be fetched or parsed.
    pub skipped: u64,
}

impl CrawlCounts {
    fn record(&mut self, document: &CatalogDocument) {
        self.documents += 1;
        match document.kind() {
            DocumentKind::HasBranches => self.branches += document.catalog_ref_count as u64,
            DocumentKind::HasLeaves => self.datasets += document.datasets.len() as u64,
            DocumentKind::Empty => {}
        }
    }
}

/// Shared inputs of a crawl.
pub struct CrawlContext<'a> {
    pub fetcher: &'a dyn Fetcher,
    pub progress: &'a dyn ProgressReporter,
    /// Root catalog URL (`catalog.xml` form).
    pub root_url: String,
    /// Description of the root catalog.
    pub description: String,
}

impl<'a> CrawlContext<'a> {
    pub fn new(fetcher: &'a dyn Fetcher, root_url: &str) -> Self {
        Self {
            fetcher,
            progress: &NoProgress,
            root_url: urls::html_to_xml(root_url),
            description: String::new(),
        }
    }

    pub fn with_progress(mut self, progress: &'a dyn ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Fetch the root catalog document.
    pub async fn fetch_root(&self) -> Result<String, FetchError> {
        self.fetcher.fetch(&self.root_url).await
    }

    /// The root catalog document, or an empty body when it cannot be
    /// fetched. Both passes then treat the root as an unreadable catalog.
    pub async fn root_document(&self) -> String {
        match self.fetch_root().await {
            Ok(body) => body,
            Err(e) => {
                warn!(catalog = %self.root_url, "root catalog unreachable: {}", e);
                String::new()
            }
        }
    }
}

struct Counter<'a> {
    progress: &'a dyn ProgressReporter,
    counts: CrawlCounts,
}

#[async_trait]
impl<'a> CatalogVisitor for Counter<'a> {
    async fn on_document(&mut self, _url: &str, document: &CatalogDocument) {
        self.counts.record(document);
        self.progress.report(CrawlProgress::Counting {
            documents: self.counts.documents,
            datasets: self.counts.datasets,
        });
    }

    async fn on_leaves(&mut self, _url: &str, _datasets: &[LeafDataset]) {}

    fn on_unreadable(&mut self, _url: &str, _reason: &str) {
        self.counts.skipped += 1;
    }
}

/// Counter pass: walk the catalog graph and tally branches and datasets.
pub async fn count_pass(ctx: &CrawlContext<'_>, root_xml: &str) -> CrawlCounts {
    let mut counter = Counter {
        progress: ctx.progress,
        counts: CrawlCounts::default(),
    };
    walk(ctx.fetcher, &ctx.root_url, root_xml, &mut counter).await;
    info!(
        branches = counter.counts.branches,
        datasets = counter.counts.datasets,
        "count pass finished"
    );
    counter.counts
}

/// A leaf dataset that produced no item.
#[derive(Debug)]
pub struct SkippedDataset {
    pub catalog_url: String,
    pub dataset_id: String,
    pub error: DatasetError,
}

/// Result of the build pass.
pub struct BuildOutcome {
    pub tree: CatalogTree,
    pub counts: CrawlCounts,
    /// Items attached to the tree.
    pub items: u64,
    pub skipped_datasets: Vec<SkippedDataset>,
}

struct Builder<'a> {
    fetcher: &'a dyn Fetcher,
    progress: &'a dyn ProgressReporter,
    expected_items: u64,
    tree: CatalogTree,
    counts: CrawlCounts,
    items: u64,
    skipped_datasets: Vec<SkippedDataset>,
}

#[async_trait]
impl<'a> CatalogVisitor for Builder<'a> {
    async fn on_document(&mut self, url: &str, document: &CatalogDocument) {
        self.counts.record(document);
        let node = self.tree.get_or_create(url, url);
        for branch in &document.branches {
            let child = self.tree.get_or_create(branch, branch);
            self.tree.attach_child(node, child);
        }
        self.progress.report(CrawlProgress::CatalogProcessed {
            url: url.to_string(),
            catalogs: self.counts.documents,
        });
    }

    async fn on_leaves(&mut self, url: &str, datasets: &[LeafDataset]) {
        if datasets.is_empty() {
            return;
        }
        let node = self.tree.get_or_create(url, url);
        for leaf in datasets {
            match harvest_dataset(self.fetcher, url, leaf).await {
                Ok(item) => {
                    let id = item.id.clone();
                    self.tree.attach_item(node, item);
                    self.items += 1;
                    self.progress.report(CrawlProgress::ItemConnected {
                        id,
                        items: self.items,
                        total: self.expected_items,
                    });
                }
                Err(error) => {
                    warn!(catalog = %url, dataset = %leaf.id, "skipping dataset: {}", error);
                    self.progress.report(CrawlProgress::DatasetSkipped {
                        id: leaf.id.clone(),
                        reason: error.to_string(),
                    });
                    self.skipped_datasets.push(SkippedDataset {
                        catalog_url: url.to_string(),
                        dataset_id: leaf.id.clone(),
                        error,
                    });
                }
            }
        }
    }

    fn on_unreadable(&mut self, _url: &str, _reason: &str) {
        self.counts.skipped += 1;
    }
}

/// Extract and assemble the STAC item for one leaf dataset.
pub async fn harvest_dataset(
    fetcher: &dyn Fetcher,
    catalog_url: &str,
    leaf: &LeafDataset,
) -> Result<Item, DatasetError> {
    let extracted = metadata::extract(fetcher, catalog_url, leaf).await?;
    Ok(assemble(&extracted)?)
}

/// Build pass: construct the catalog tree and attach items.
///
/// `expected_items` (usually the counter pass's `datasets`) is only used
/// for progress totals; pass 0 when unknown. The root node always exists,
/// even when the root document cannot be parsed.
pub async fn build_pass(
    ctx: &CrawlContext<'_>,
    root_xml: &str,
    expected_items: u64,
) -> BuildOutcome {
    let mut tree = CatalogTree::new(urls::catalog_id);
    tree.get_or_create(&ctx.root_url, &ctx.description);

    let mut builder = Builder {
        fetcher: ctx.fetcher,
        progress: ctx.progress,
        expected_items,
        tree,
        counts: CrawlCounts::default(),
        items: 0,
        skipped_datasets: Vec::new(),
    };
    walk(ctx.fetcher, &ctx.root_url, root_xml, &mut builder).await;
    info!(
        catalogs = builder.tree.len(),
        items = builder.items,
        skipped = builder.skipped_datasets.len(),
        "build pass finished"
    );

    BuildOutcome {
        tree: builder.tree,
        counts: builder.counts,
        items: builder.items,
        skipped_datasets: builder.skipped_datasets,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::StaticFetcher;
    use crate::thredds::ns;

    fn catalog(body: &str) -> String {
        format!(
            r#"<catalog xmlns="{}" xmlns:xlink="{}">{}</catalog>"#,
            ns::THREDDS,
            ns::XLINK,
            body
        )
    }

    fn reference(href: &str) -> String {
        format!(r#"<catalogRef xlink:href="{}" xlink:title="{}"/>"#, href, href)
    }

    #[derive(Default)]
    struct Recorder {
        entered: Vec<String>,
        left: Vec<String>,
        unreadable: Vec<String>,
    }

    #[async_trait]
    impl CatalogVisitor for Recorder {
        async fn on_document(&mut self, url: &str, _document: &CatalogDocument) {
            self.entered.push(url.to_string());
        }

        async fn on_leaves(&mut self, url: &str, _datasets: &[LeafDataset]) {
            self.left.push(url.to_string());
        }

        fn on_unreadable(&mut self, url: &str, _reason: &str) {
            self.unreadable.push(url.to_string());
        }
    }

    #[tokio::test]
    async fn cycle_is_walked_once() {
        let a = "http://h/a/catalog.xml";
        let b = "http://h/b/catalog.xml";
        let fetcher = StaticFetcher::new()
            .with(a, catalog(&reference("../b/catalog.xml")))
            .with(b, catalog(&reference("../a/catalog.xml")));

        let mut recorder = Recorder::default();
        let root_xml = catalog(&reference("../b/catalog.xml"));
        let visited = walk(&fetcher, a, &root_xml, &mut recorder).await;

        assert_eq!(visited.len(), 2);
        assert_eq!(recorder.entered, vec![a, b]);
        assert_eq!(fetcher.request_count(a), 0);
        assert_eq!(fetcher.request_count(b), 1);
    }

    #[tokio::test]
    async fn leaves_are_processed_after_children() {
        let root = "http://h/catalog.xml";
        let fetcher = StaticFetcher::new()
            .with("http://h/x/catalog.xml", catalog(&reference("y/catalog.xml")))
            .with("http://h/x/y/catalog.xml", catalog(""))
            .with("http://h/z/catalog.xml", catalog(""));

        let root_xml = catalog(&format!(
            "{}{}",
            reference("x/catalog.xml"),
            reference("z/catalog.xml")
        ));
        let mut recorder = Recorder::default();
        walk(&fetcher, root, &root_xml, &mut recorder).await;

        assert_eq!(
            recorder.entered,
            vec![
                root,
                "http://h/x/catalog.xml",
                "http://h/x/y/catalog.xml",
                "http://h/z/catalog.xml"
            ]
        );
        assert_eq!(
            recorder.left,
            vec![
                "http://h/x/y/catalog.xml",
                "http://h/x/catalog.xml",
                "http://h/z/catalog.xml",
                root
            ]
        );
    }

    #[tokio::test]
    async fn unreachable_child_is_skipped() {
        let root = "http://h/catalog.xml";
        let fetcher = StaticFetcher::new()
            .with("http://h/ok/catalog.xml", catalog(""))
            .with("http://h/bad/catalog.xml", "<catalog><unclosed>");
        let root_xml = catalog(&format!(
            "{}{}{}",
            reference("gone/catalog.xml"),
            reference("bad/catalog.xml"),
            reference("ok/catalog.xml")
        ));

        let mut recorder = Recorder::default();
        walk(&fetcher, root, &root_xml, &mut recorder).await;
        assert_eq!(recorder.entered, vec![root, "http://h/ok/catalog.xml"]);
        assert_eq!(
            recorder.unreadable,
            vec!["http://h/gone/catalog.xml", "http://h/bad/catalog.xml"]
        );
    }

    #[tokio::test]
    async fn counts_partition_documents() {
        let fetcher = StaticFetcher::new()
            .with(
                "http://h/a/catalog.xml",
                catalog(r#"<dataset name="d" ID="d" urlPath="d.nc"/><dataset name="e" ID="e" urlPath="e.nc"/>"#),
            )
            .with("http://h/b/catalog.xml", catalog(""));
        let root_xml = catalog(&format!(
            r#"{}{}<dataset name="ignored" ID="ignored" urlPath="ignored.nc"/>"#,
            reference("a/catalog.xml"),
            reference("b/catalog.xml")
        ));

        let ctx = CrawlContext::new(&fetcher, "http://h/catalog.xml");
        let counts = count_pass(&ctx, &root_xml).await;
        assert_eq!(
            counts,
            CrawlCounts {
                branches: 2,
                datasets: 2,
                documents: 3,
                skipped: 0
            }
        );
    }

    #[tokio::test]
    async fn unparseable_root_yields_lone_root_node() {
        let fetcher = StaticFetcher::new();
        let ctx = CrawlContext::new(&fetcher, "http://h/thredds/catalog.html")
            .with_description("root");
        let outcome = build_pass(&ctx, "not xml at all <", 0).await;

        assert_eq!(outcome.tree.len(), 1);
        assert_eq!(outcome.items, 0);
        assert_eq!(outcome.counts.skipped, 1);
        let (_, node) = outcome.tree.iter().next().unwrap();
        assert_eq!(node.url, "http://h/thredds/catalog.xml");
        assert_eq!(node.description, "root");
    }

    #[test]
    fn visited_set_insert_if_absent() {
        let mut visited = VisitedSet::new();
        assert!(visited.is_empty());
        assert!(visited.insert("http://h/a"));
        assert!(!visited.insert("http://h/a"));
        assert!(visited.contains("http://h/a"));
        assert_eq!(visited.len(), 1);
    }
}
