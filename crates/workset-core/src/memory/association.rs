//! Association linking and graph rendering.
//!
//! Edges are directed and formed only at insertion time: each existing item
//! gains an edge to the newcomer when it shares the newcomer's category or
//! their contents overlap lexically. The newcomer gets no back-edges.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use workset_state::{Item, ItemCategory, ItemId};

const LABEL_MAX_CHARS: usize = 50;
const EDGE_WEIGHT_FACTOR: f64 = 0.5;

/// Lowercased whitespace tokens of `content`, deduplicated.
pub fn tokenize(content: &str) -> HashSet<String> {
    content
        .split_whitespace()
        .map(str::to_lowercase)
        .collect()
}

/// `|A ∩ B| / min(|A|, |B|)` over the token sets of `a` and `b`.
///
/// Zero when either side has no tokens.
pub fn lexical_overlap(a: &str, b: &str) -> f64 {
    let ta = tokenize(a);
    let tb = tokenize(b);
    let smaller = ta.len().min(tb.len());
    if smaller == 0 {
        return 0.0;
    }
    let shared = ta.intersection(&tb).count();
    shared as f64 / smaller as f64
}

/// Add an edge `existing -> new_item` on every item that matches.
///
/// Returns the ids that were linked. Items already pointing at the
/// newcomer are left as they are; `new_item` itself is skipped if present.
pub fn link_new_item(items: &mut [Item], new_item: &Item, overlap_threshold: f64) -> Vec<ItemId> {
    let mut linked = Vec::new();
    for existing in items.iter_mut() {
        if existing.id == new_item.id {
            continue;
        }
        let related = existing.category == new_item.category
            || lexical_overlap(&existing.content, &new_item.content) > overlap_threshold;
        if related && !existing.is_linked_to(&new_item.id) {
            existing.associations.push(new_item.id.clone());
            linked.push(existing.id.clone());
        }
    }
    linked
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: ItemId,
    pub label: String,
    pub category: ItemCategory,
    pub activation: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: ItemId,
    pub target: ItemId,
    pub weight: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphView {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

/// Render `items` as nodes and edges.
///
/// Edges whose target is not among `items` (evicted or pruned since the
/// link was made) are dropped.
pub fn build_graph_view(items: &[Item]) -> GraphView {
    let present: HashSet<&ItemId> = items.iter().map(|i| &i.id).collect();

    let nodes = items
        .iter()
        .map(|item| GraphNode {
            id: item.id.clone(),
            label: truncate_label(&item.content),
            category: item.category,
            activation: item.activation,
        })
        .collect();

    let mut edges = Vec::new();
    for source in items {
        for target in source.associations.iter().filter(|t| present.contains(t)) {
            edges.push(GraphEdge {
                source: source.id.clone(),
                target: target.clone(),
                weight: source.activation * EDGE_WEIGHT_FACTOR,
            });
        }
    }

    GraphView { nodes, edges }
}

fn truncate_label(content: &str) -> String {
    content.chars().take(LABEL_MAX_CHARS).collect()
}
