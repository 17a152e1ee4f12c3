//! Facet (filter) trees built from aggregation buckets.
//!
//! Text facets are hierarchical: bucket paths are folded into a raw count
//! tree, counts are summed bottom-up, and the result is laid out in
//! taxonomy order. Sheet facets are a flat list, one node per bucket.

pub mod taxonomy;

pub use taxonomy::{StaticTaxonomy, Taxonomy, TaxonomyNode, Term};

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::Bucket;

/// Aggregation type of the category-path facet.
pub const PATH_AGG_TYPE: &str = "path";

/// Legacy branches whose per-category subtrees are hoisted into a
/// "Commentary" sibling of each root category.
const COMMENTARY_ROOTS: [&str; 2] = ["Commentary", "Commentary2"];

/// Localized prefix of a hoisted commentary node's title.
const COMMENTARY_HE_PREFIX: &str = "מפרשי";

/// One node of a filter tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterNode {
    pub title: String,
    pub he_title: String,
    /// `/`-joined path identifying the node.
    pub agg_key: String,
    /// Documents at or below this node.
    pub doc_count: u64,
    pub agg_type: String,
    pub selected: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<FilterNode>,
}

impl FilterNode {
    /// A node with no count and no children.
    pub fn new(
        title: impl Into<String>,
        he_title: impl Into<String>,
        agg_key: impl Into<String>,
        agg_type: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            he_title: he_title.into(),
            agg_key: agg_key.into(),
            agg_type: agg_type.into(),
            ..Default::default()
        }
    }

    /// Add `child` as the last child.
    pub fn append(&mut self, child: FilterNode) {
        self.children.push(child);
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Select or deselect this node and every descendant.
    pub fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
        for child in &mut self.children {
            child.set_selected(selected);
        }
    }

    /// Keys applied under this node.
    ///
    /// A selected node contributes its own key only; otherwise its children
    /// are asked in order.
    pub fn applied_filters(&self) -> Vec<String> {
        if self.selected {
            return vec![self.agg_key.clone()];
        }
        self.children.iter().flat_map(FilterNode::applied_filters).collect()
    }
}

/// Root filter nodes plus an index from aggregation key to node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterTree {
    /// Root nodes in display order.
    pub available_filters: Vec<FilterNode>,
    /// Child-index path of every registered node.
    registry: HashMap<String, Vec<usize>>,
}

impl FilterTree {
    fn indexed(available_filters: Vec<FilterNode>) -> Self {
        let mut registry = HashMap::new();
        let mut trail = Vec::new();
        index_nodes(&available_filters, &mut trail, &mut registry);
        Self {
            available_filters,
            registry,
        }
    }

    fn flat(available_filters: Vec<FilterNode>) -> Self {
        Self {
            available_filters,
            registry: HashMap::new(),
        }
    }

    /// The registered node for `agg_key`.
    pub fn get(&self, agg_key: &str) -> Option<&FilterNode> {
        let trail = self.registry.get(agg_key)?;
        let (first, rest) = trail.split_first()?;
        let mut node = self.available_filters.get(*first)?;
        for &i in rest {
            node = node.children.get(i)?;
        }
        Some(node)
    }

    /// Mutable access to the registered node for `agg_key`.
    pub fn get_mut(&mut self, agg_key: &str) -> Option<&mut FilterNode> {
        let trail = self.registry.get(agg_key)?;
        let (first, rest) = trail.split_first()?;
        let mut node = self.available_filters.get_mut(*first)?;
        for &i in rest {
            node = node.children.get_mut(i)?;
        }
        Some(node)
    }

    /// Number of registered nodes.
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Select every node in `applied` and return the keys with no node.
    pub fn apply_filters(&mut self, applied: &[String]) -> Vec<String> {
        let mut orphans = Vec::new();
        for key in applied {
            match self.get_mut(key) {
                Some(node) => node.set_selected(true),
                None => orphans.push(key.clone()),
            }
        }
        orphans
    }
}

fn index_nodes(nodes: &[FilterNode], trail: &mut Vec<usize>, registry: &mut HashMap<String, Vec<usize>>) {
    for (i, node) in nodes.iter().enumerate() {
        trail.push(i);
        registry.insert(node.agg_key.clone(), trail.clone());
        index_nodes(&node.children, trail, registry);
        trail.pop();
    }
}

/// A built tree together with the applied keys it could not place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppliedFilterTree {
    pub tree: FilterTree,
    pub orphans: Vec<String>,
}

/// Nested counts keyed by path segment.
#[derive(Debug, Default)]
struct RawNode {
    doc_count: Option<u64>,
    children: HashMap<String, RawNode>,
}

impl RawNode {
    /// Set the count at `path`, creating intermediate nodes. Existing
    /// children of the target are kept.
    fn insert(&mut self, path: &str, doc_count: u64) {
        let mut node = self;
        for segment in path.split('/') {
            node = node.children.entry(segment.to_string()).or_default();
        }
        node.doc_count = Some(doc_count);
    }

    /// Fill unset or zero counts with the sum of the children's counts.
    fn aggregate(&mut self) -> u64 {
        let sum: u64 = self.children.values_mut().map(RawNode::aggregate).sum();
        match self.doc_count {
            Some(count) if count > 0 => count,
            _ => {
                self.doc_count = Some(sum);
                sum
            }
        }
    }

    fn lookup<S: AsRef<str>>(&self, path: &[S]) -> Option<&RawNode> {
        path.iter()
            .try_fold(self, |node, segment| node.children.get(segment.as_ref()))
    }

    fn count(&self) -> u64 {
        self.doc_count.unwrap_or(0)
    }
}

/// Build the hierarchical text filter tree.
///
/// Applied keys are inserted with a zero count first so that filters with
/// no current matches still surface. Taxonomy nodes with no counts below
/// them are dropped.
pub fn build_filter_tree(buckets: &[Bucket], applied: &[String], taxonomy: &impl Taxonomy) -> FilterTree {
    let mut raw = RawNode::default();
    for key in applied {
        raw.insert(key, 0);
    }
    for bucket in buckets {
        raw.insert(&bucket.key, bucket.doc_count);
    }
    raw.aggregate();

    let mut roots = Vec::new();
    let mut path = Vec::new();
    for root in taxonomy.categories() {
        if let Some(node) = walk(root, &mut path, &raw) {
            roots.push(node);
        }
        if let TaxonomyNode::Branch {
            category, he_category, ..
        } = root
        {
            if let Some(node) = commentary_node(&raw, category, he_category, taxonomy) {
                roots.push(node);
            }
        }
    }
    FilterTree::indexed(roots)
}

fn walk(branch: &TaxonomyNode, path: &mut Vec<String>, raw: &RawNode) -> Option<FilterNode> {
    path.push(branch.name().to_string());
    let mut node = FilterNode::new(branch.name(), branch.localized_name(), path.join("/"), PATH_AGG_TYPE);

    if let TaxonomyNode::Branch { contents, .. } = branch {
        for child in contents {
            if let Some(child) = walk(child, path, raw) {
                node.append(child);
            }
        }
    }

    let found = raw.lookup(path.as_slice());
    path.pop();
    node.doc_count = found?.count();
    Some(node)
}

fn commentary_node(
    raw: &RawNode,
    category: &str,
    he_category: &str,
    taxonomy: &impl Taxonomy,
) -> Option<FilterNode> {
    let mut node = FilterNode::new(
        format!("{category} Commentary"),
        format!("{COMMENTARY_HE_PREFIX} {he_category}"),
        format!("Commentary/{category}"),
        PATH_AGG_TYPE,
    );
    for root in COMMENTARY_ROOTS {
        let Some(branch) = raw.lookup(&[root, category][..]) else {
            continue;
        };
        node.doc_count += branch.count();

        let mut keys: Vec<&String> = branch.children.keys().collect();
        keys.sort();
        for key in keys {
            let Some(child) = branch.children.get(key) else {
                continue;
            };
            let he_title = taxonomy.term(key).map(|t| t.he).unwrap_or_default();
            let mut leaf = FilterNode::new(key.as_str(), he_title, format!("{root}/{category}/{key}"), PATH_AGG_TYPE);
            leaf.doc_count = child.count();
            node.append(leaf);
        }
    }
    node.has_children().then_some(node)
}

/// Build the text filter tree and select the applied keys.
pub fn build_and_apply_text_filters(
    buckets: &[Bucket],
    applied: &[String],
    taxonomy: &impl Taxonomy,
) -> AppliedFilterTree {
    let mut tree = build_filter_tree(buckets, applied, taxonomy);
    let orphans = tree.apply_filters(applied);
    if !orphans.is_empty() {
        tracing::debug!(?orphans, "applied filters missing from tree");
    }
    AppliedFilterTree { tree, orphans }
}

/// Build the flat sheet filter list.
///
/// Each bucket becomes one node. Keys in the primary script are English
/// titles; other keys are localized titles, with the English form looked up
/// in `taxonomy` unless `agg_type` is `group`. A node is selected when its
/// key is applied with the same aggregation type.
pub fn build_and_apply_sheet_filters(
    buckets: &[Bucket],
    applied: &[String],
    applied_agg_types: &[String],
    agg_type: &str,
    taxonomy: &impl Taxonomy,
) -> AppliedFilterTree {
    let nodes = buckets
        .iter()
        .map(|bucket| {
            let hebrew = is_hebrew(&bucket.key);
            let title = if hebrew { String::new() } else { bucket.key.clone() };
            let he_title = if hebrew {
                bucket.key.clone()
            } else if agg_type == "group" {
                String::new()
            } else {
                taxonomy.term(&bucket.key).map(|t| t.he).unwrap_or_default()
            };
            let agg_key = if title.is_empty() { he_title.clone() } else { title.clone() };
            let selected = applied
                .iter()
                .position(|k| *k == agg_key)
                .and_then(|i| applied_agg_types.get(i))
                .is_some_and(|t| t == agg_type);
            FilterNode {
                doc_count: bucket.doc_count,
                selected,
                ..FilterNode::new(title, he_title, agg_key, agg_type)
            }
        })
        .collect();
    AppliedFilterTree {
        tree: FilterTree::flat(nodes),
        orphans: Vec::new(),
    }
}

/// Applied keys of a filter list, each paired with its root's type.
pub fn applied_search_filters(available: &[FilterNode]) -> (Vec<String>, Vec<String>) {
    let mut keys = Vec::new();
    let mut agg_types = Vec::new();
    for root in available {
        let applied = root.applied_filters();
        agg_types.extend(std::iter::repeat_n(root.agg_type.clone(), applied.len()));
        keys.extend(applied);
    }
    (keys, agg_types)
}

/// Returns `true` if `text` contains a Hebrew-block character.
pub fn is_hebrew(text: &str) -> bool {
    text.chars().any(|c| ('\u{0590}'..='\u{05FF}').contains(&c))
}
