//! Catalog tree registry.
//!
//! [`CatalogTree`] owns every [`CatalogNode`] created during a crawl and
//! guarantees one node per catalog URL. Nodes refer to each other by
//! [`NodeId`], so a catalog reached through two `catalogRef`s is shared
//! rather than duplicated, and the child graph may be a DAG (or even contain
//! cycles when the source catalogs do).

use std::collections::{HashMap, HashSet};

use crate::models::Item;

/// Index of a node inside its [`CatalogTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// One STAC catalog, keyed by the THREDDS catalog URL it mirrors.
#[derive(Debug, Clone)]
pub struct CatalogNode {
    /// Catalog id, derived from the URL.
    pub id: String,
    /// The THREDDS catalog URL.
    pub url: String,
    pub description: String,
    children: Vec<NodeId>,
    items: Vec<Item>,
}

impl CatalogNode {
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }
}

/// Maps a catalog URL to a catalog id.
pub type Normalizer = fn(&str) -> String;

/// URL → node registry.
pub struct CatalogTree {
    normalize: Normalizer,
    nodes: Vec<CatalogNode>,
    by_url: HashMap<String, NodeId>,
    ids: HashSet<String>,
}

impl CatalogTree {
    /// Create an empty registry that derives node ids with `normalize`.
    pub fn new(normalize: Normalizer) -> Self {
        Self {
            normalize,
            nodes: Vec::new(),
            by_url: HashMap::new(),
            ids: HashSet::new(),
        }
    }

    /// Return the node for `url`, creating it on first sight.
    ///
    /// `description` is only used when the node is created. If the
    /// normalized id is already taken by a different URL, a numeric suffix
    /// (`_2`, `_3`, ...) keeps ids unique.
    pub fn get_or_create(&mut self, url: &str, description: &str) -> NodeId {
        if let Some(id) = self.by_url.get(url) {
            return *id;
        }

        let base = (self.normalize)(url);
        let mut id = base.clone();
        let mut n = 2;
        while self.ids.contains(&id) {
            id = format!("{}_{}", base, n);
            n += 1;
        }

        let node_id = NodeId(self.nodes.len());
        self.ids.insert(id.clone());
        self.nodes.push(CatalogNode {
            id,
            url: url.to_string(),
            description: description.to_string(),
            children: Vec::new(),
            items: Vec::new(),
        });
        self.by_url.insert(url.to_string(), node_id);
        node_id
    }

    /// Link `child` under `parent`. Returns `false` if the link already
    /// existed or would make a node its own child.
    pub fn attach_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        if parent == child {
            return false;
        }
        let node = &mut self.nodes[parent.0];
        if node.children.contains(&child) {
            return false;
        }
        node.children.push(child);
        true
    }

    /// Give `node` a new id. Returns `false`, leaving the node untouched,
    /// if another node already uses `id`.
    pub fn rename(&mut self, node: NodeId, id: &str) -> bool {
        let current = &self.nodes[node.0].id;
        if current == id {
            return true;
        }
        if self.ids.contains(id) {
            return false;
        }
        self.ids.remove(current);
        self.ids.insert(id.to_string());
        self.nodes[node.0].id = id.to_string();
        true
    }

    pub fn attach_item(&mut self, node: NodeId, item: Item) {
        self.nodes[node.0].items.push(item);
    }

    pub fn lookup(&self, url: &str) -> Option<NodeId> {
        self.by_url.get(url).copied()
    }

    pub fn node(&self, id: NodeId) -> &CatalogNode {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn item_count(&self) -> usize {
        self.nodes.iter().map(|n| n.items.len()).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &CatalogNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    /// Depth-first pre-order walk from `root`, each node paired with the
    /// parent it was first reached from. Every node appears once; later
    /// links to an already-visited node are ignored.
    pub fn spanning_order(&self, root: NodeId) -> Vec<(NodeId, Option<NodeId>)> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut stack = vec![(root, None)];

        while let Some((id, parent)) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            out.push((id, parent));
            for child in self.nodes[id.0].children.iter().rev() {
                if !seen.contains(child) {
                    stack.push((*child, Some(id)));
                }
            }
        }
        out
    }
}
