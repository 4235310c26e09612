use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::models::ItemAttributes;

/// Node type name for catalog items; attribute and value node types are
/// named by the graph artifact (e.g. `attr_color_value`, `val_fabric`).
pub const ITEM_NODE_TYPE: &str = "item";

/// A (source type, relation, destination type) triple naming the scope of
/// one attention convolution
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeType {
    pub src: String,
    pub relation: String,
    pub dst: String,
}

impl std::fmt::Display for EdgeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.src, self.relation, self.dst)
    }
}

/// Adjacency for one edge type: `(source index, destination index)` pairs
/// into the respective node types' dense index spaces
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeSet {
    pub edge_type: EdgeType,
    pub edges: Vec<[u32; 2]>,
}

/// Bijection between semantic node names and dense tensor indices.
///
/// Built once at graph-construction time; index `i` owns row `i` of the
/// node type's embedding matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct NodeMapping {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl NodeMapping {
    pub fn from_names(names: Vec<String>) -> AppResult<Self> {
        let mut index = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            if index.insert(name.clone(), i).is_some() {
                return Err(AppError::Artifact(format!(
                    "node mapping contains duplicate name: {}",
                    name
                )));
            }
        }
        Ok(Self { names, index })
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn name_of(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl TryFrom<Vec<String>> for NodeMapping {
    type Error = AppError;

    fn try_from(names: Vec<String>) -> AppResult<Self> {
        Self::from_names(names)
    }
}

impl From<NodeMapping> for Vec<String> {
    fn from(mapping: NodeMapping) -> Self {
        mapping.names
    }
}

/// One item vertex with its typed attribute record.
///
/// The record is populated when the graph is built, so inference never
/// walks attribute/value neighbours or parses node names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemNode {
    pub article_id: u64,
    pub name: String,
    pub product_group: String,
    pub gender_group: i32,
    #[serde(default)]
    pub gender_name: String,
    #[serde(default)]
    pub attributes: ItemAttributes,
}

/// The heterogeneous item/attribute graph as loaded from `graph.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FashionGraph {
    pub version: u32,
    /// Node count per node type; must agree with the model's embedding rows
    pub node_counts: HashMap<String, usize>,
    /// Item vertices, aligned with `item_mapping` indices
    pub items: Vec<ItemNode>,
    /// `item_<article_id>` name to dense index
    pub item_mapping: NodeMapping,
    pub edge_sets: Vec<EdgeSet>,
}

impl FashionGraph {
    /// Resolves an article id to its dense item index
    pub fn item_index(&self, article_id: u64) -> Option<usize> {
        self.item_mapping.index_of(&format!("item_{}", article_id))
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Structural validation: the mapping is aligned with the item table and
    /// every edge endpoint is inside its node type's index space
    pub fn validate(&self) -> AppResult<()> {
        let declared_items = self
            .node_counts
            .get(ITEM_NODE_TYPE)
            .copied()
            .unwrap_or_default();
        if self.items.len() != declared_items || self.item_mapping.len() != declared_items {
            return Err(AppError::Artifact(format!(
                "item table size mismatch: {} items, {} mapped names, {} declared",
                self.items.len(),
                self.item_mapping.len(),
                declared_items
            )));
        }
        for (i, item) in self.items.iter().enumerate() {
            let name = format!("item_{}", item.article_id);
            if self.item_mapping.index_of(&name) != Some(i) {
                return Err(AppError::Artifact(format!(
                    "item mapping out of alignment at index {}: {}",
                    i, name
                )));
            }
        }
        for set in &self.edge_sets {
            let src_count = self.node_counts.get(&set.edge_type.src).copied();
            let dst_count = self.node_counts.get(&set.edge_type.dst).copied();
            let (src_count, dst_count) = match (src_count, dst_count) {
                (Some(s), Some(d)) => (s, d),
                _ => {
                    return Err(AppError::Artifact(format!(
                        "edge type {} references an unknown node type",
                        set.edge_type
                    )))
                }
            };
            for &[s, d] in &set.edges {
                if s as usize >= src_count || d as usize >= dst_count {
                    return Err(AppError::Artifact(format!(
                        "edge ({}, {}) out of bounds for edge type {}",
                        s, d, set.edge_type
                    )));
                }
            }
        }
        Ok(())
    }
}
