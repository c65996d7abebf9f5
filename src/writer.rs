//! Write a catalog tree to disk as a self-contained STAC catalog.
//!
//! ```text
//! <dest>/catalog.json                          root catalog
//! <dest>/<child-id>/catalog.json               every other catalog
//! <catalog dir>/<item>/<item>.json             items
//! ```
//!
//! All hrefs are relative and no `self` links are written, so the output
//! directory can be moved or published as-is. A catalog reached from more
//! than one parent gets its `parent` link from the first one in walk order.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tds_stac_core::{Catalog, CatalogTree, Item, Link, NodeId};
use tracing::debug;

const CATALOG_FILE: &str = "catalog.json";

/// What [`save`] wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveSummary {
    pub catalogs: usize,
    pub items: usize,
}

/// File-name-safe form of an item id.
pub fn item_stem(id: &str) -> String {
    let stem: String = id
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '?' | '*' | '"' | '<' | '>' | '|' => '_',
            c => c,
        })
        .collect();
    match stem.trim_matches('.') {
        "" => "item".to_string(),
        s => s.to_string(),
    }
}

/// Stem for `id` not yet in `used`, suffixed `_2`, `_3`, ... on collision.
fn unique_stem(id: &str, used: &mut HashSet<String>) -> String {
    let base = item_stem(id);
    let mut stem = base.clone();
    let mut n = 2;
    while used.contains(&stem) {
        stem = format!("{}_{}", base, n);
        n += 1;
    }
    used.insert(stem.clone());
    stem
}

/// Href of catalog `node` relative to the directory of another catalog.
fn catalog_href(from_root: bool, node_dir: Option<&str>) -> String {
    match (from_root, node_dir) {
        (true, None) => format!("./{}", CATALOG_FILE),
        (true, Some(dir)) => format!("./{}/{}", dir, CATALOG_FILE),
        (false, None) => format!("../{}", CATALOG_FILE),
        (false, Some(dir)) => format!("../{}/{}", dir, CATALOG_FILE),
    }
}

/// Save every catalog reachable from `root` below `dest`.
pub fn save(tree: &CatalogTree, root: NodeId, dest: &Path) -> Result<SaveSummary> {
    let order = tree.spanning_order(root);

    // Directory name of each written node below `dest`; `None` for the root.
    let dirs: HashMap<NodeId, Option<String>> = order
        .iter()
        .map(|(id, parent)| {
            let dir = parent.map(|_| tree.node(*id).id.clone());
            (*id, dir)
        })
        .collect();

    let mut summary = SaveSummary::default();
    for (id, parent) in &order {
        let node = tree.node(*id);
        let own_dir = dirs.get(id).cloned().flatten();
        let is_root = own_dir.is_none();
        let catalog_dir = match &own_dir {
            Some(dir) => dest.join(dir),
            None => dest.to_path_buf(),
        };

        let mut catalog = Catalog::new(node.id.clone(), node.description.clone());
        catalog
            .links
            .push(Link::new("root", catalog_href(is_root, None)).json());
        if let Some(parent) = parent {
            let parent_dir = dirs.get(parent).cloned().flatten();
            catalog
                .links
                .push(Link::new("parent", catalog_href(false, parent_dir.as_deref())).json());
        }
        for child in node.children() {
            if let Some(child_dir) = dirs.get(child) {
                let child_node = tree.node(*child);
                let href = catalog_href(is_root, child_dir.as_deref());
                catalog
                    .links
                    .push(Link::new("child", href).json().with_title(child_node.url.clone()));
            }
        }

        // Item directories share `catalog_dir` with the catalog file and, in
        // the root, with every other catalog's directory.
        let mut used: HashSet<String> = HashSet::from([CATALOG_FILE.to_string()]);
        if is_root {
            used.extend(dirs.values().flatten().cloned());
        }
        for item in node.items() {
            let stem = unique_stem(&item.id, &mut used);
            catalog
                .links
                .push(Link::new("item", format!("./{}/{}.json", stem, stem)).geojson());

            let item_path = catalog_dir.join(&stem).join(format!("{}.json", stem));
            write_item(item, is_root, &item_path)?;
            summary.items += 1;
        }

        write_json(&catalog, &catalog_dir.join(CATALOG_FILE))?;
        summary.catalogs += 1;
        debug!(catalog = %node.id, dir = %catalog_dir.display(), "catalog written");
    }

    Ok(summary)
}

fn write_item(item: &Item, in_root: bool, path: &Path) -> Result<()> {
    let root_href = if in_root {
        format!("../{}", CATALOG_FILE)
    } else {
        format!("../../{}", CATALOG_FILE)
    };

    let mut item = item.clone();
    item.links.push(Link::new("root", root_href).json());
    item.links
        .push(Link::new("parent", format!("../{}", CATALOG_FILE)).json());
    write_json(&item, path)
}

fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
