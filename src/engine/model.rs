use std::collections::HashMap;

use ndarray::{s, Array1, Array2};

use crate::error::{AppError, AppResult};
use crate::models::AttributeImportance;

use super::gat::{softmax, GatConv};
use super::graph::{EdgeSet, EdgeType};

/// Number of attribute categories the importance head scores
pub const ATTRIBUTE_COUNT: usize = 7;

/// Two-layer feed-forward compatibility scorer: ReLU hidden layer, logistic
/// output squashing into [0, 1]
#[derive(Debug, Clone)]
pub struct FeedForward {
    w1: Array2<f32>,
    b1: Array1<f32>,
    w2: Array2<f32>,
    b2: Array1<f32>,
}

impl FeedForward {
    pub fn new(w1: Array2<f32>, b1: Array1<f32>, w2: Array2<f32>, b2: Array1<f32>) -> AppResult<Self> {
        if b1.len() != w1.ncols() || w2.nrows() != w1.ncols() {
            return Err(AppError::Artifact(
                "scorer hidden layer dimensions disagree".to_string(),
            ));
        }
        if w2.ncols() != 1 || b2.len() != 1 {
            return Err(AppError::Artifact(
                "scorer output layer must be scalar".to_string(),
            ));
        }
        Ok(Self { w1, b1, w2, b2 })
    }

    pub fn input_width(&self) -> usize {
        self.w1.nrows()
    }

    /// Scores a batch of concatenated pair embeddings, one row each
    pub fn forward(&self, pairs: &Array2<f32>) -> Array1<f32> {
        let mut hidden = pairs.dot(&self.w1) + &self.b1;
        hidden.mapv_inplace(|x| x.max(0.0));
        let logits = hidden.dot(&self.w2) + &self.b2;
        logits.column(0).mapv(sigmoid)
    }
}

/// Attribute-importance head: shared tanh layer, 7-way projection, softmax.
///
/// A pure function of the two embeddings; it never consults the raw
/// categorical attribute values, so an attribute can receive nonzero weight
/// even when neither item has a value for it.
#[derive(Debug, Clone)]
pub struct ImportanceHead {
    shared_w: Array2<f32>,
    shared_b: Array1<f32>,
    attention_w: Array2<f32>,
    attention_b: Array1<f32>,
}

impl ImportanceHead {
    pub fn new(
        shared_w: Array2<f32>,
        shared_b: Array1<f32>,
        attention_w: Array2<f32>,
        attention_b: Array1<f32>,
    ) -> AppResult<Self> {
        if shared_b.len() != shared_w.ncols() || attention_w.nrows() != shared_w.ncols() {
            return Err(AppError::Artifact(
                "importance head hidden dimensions disagree".to_string(),
            ));
        }
        if attention_w.ncols() != ATTRIBUTE_COUNT || attention_b.len() != ATTRIBUTE_COUNT {
            return Err(AppError::Artifact(format!(
                "importance head must project to {} attributes",
                ATTRIBUTE_COUNT
            )));
        }
        Ok(Self {
            shared_w,
            shared_b,
            attention_w,
            attention_b,
        })
    }

    pub fn input_width(&self) -> usize {
        self.shared_w.nrows()
    }

    pub fn forward(&self, pair: &Array1<f32>) -> AttributeImportance {
        let mut hidden = pair.dot(&self.shared_w) + &self.shared_b;
        hidden.mapv_inplace(f32::tanh);
        let logits = hidden.dot(&self.attention_w) + &self.attention_b;
        let weights = softmax(&logits.to_vec());
        let mut out = [0.0_f32; ATTRIBUTE_COUNT];
        out.copy_from_slice(&weights);
        AttributeImportance::from_weights(out)
    }
}

/// The trained graph-attention model: per-node-type embeddings, two
/// convolution layers keyed by edge type, and the two output heads
#[derive(Debug)]
pub struct GatModel {
    node_embeddings: HashMap<String, Array2<f32>>,
    conv1: HashMap<EdgeType, GatConv>,
    conv2: HashMap<EdgeType, GatConv>,
    scorer: FeedForward,
    importance: ImportanceHead,
}

impl GatModel {
    pub fn new(
        node_embeddings: HashMap<String, Array2<f32>>,
        conv1: HashMap<EdgeType, GatConv>,
        conv2: HashMap<EdgeType, GatConv>,
        scorer: FeedForward,
        importance: ImportanceHead,
    ) -> Self {
        Self {
            node_embeddings,
            conv1,
            conv2,
            scorer,
            importance,
        }
    }

    pub fn embedding_width(&self, node_type: &str) -> Option<usize> {
        self.node_embeddings.get(node_type).map(Array2::ncols)
    }

    pub fn embedding_rows(&self, node_type: &str) -> Option<usize> {
        self.node_embeddings.get(node_type).map(Array2::nrows)
    }

    /// Source/destination input widths of the layer-1 convolution, if any
    pub fn conv1_in_widths(&self, edge_type: &EdgeType) -> Option<(usize, usize)> {
        self.conv1.get(edge_type).map(|c| (c.in_src(), c.in_dst()))
    }

    pub fn conv1_out_width(&self, edge_type: &EdgeType) -> Option<usize> {
        self.conv1.get(edge_type).map(GatConv::out_width)
    }

    /// Source/destination input widths of the layer-2 convolution, if any
    pub fn conv2_in_widths(&self, edge_type: &EdgeType) -> Option<(usize, usize)> {
        self.conv2.get(edge_type).map(|c| (c.in_src(), c.in_dst()))
    }

    /// Output width of the layer-2 convolution for an edge type, if any
    pub fn conv2_out_width(&self, edge_type: &EdgeType) -> Option<usize> {
        self.conv2.get(edge_type).map(GatConv::out_width)
    }

    pub fn scorer_input_width(&self) -> usize {
        self.scorer.input_width()
    }

    pub fn importance_input_width(&self) -> usize {
        self.importance.input_width()
    }

    /// Propagates embeddings through both attention layers.
    ///
    /// Returns output embeddings for every node type. Per layer, node types
    /// untouched by any edge type keep their pre-layer embedding; when
    /// several edge types share a destination type the last one in artifact
    /// order wins.
    pub fn forward(&self, edge_sets: &[EdgeSet]) -> AppResult<HashMap<String, Array2<f32>>> {
        let h0 = &self.node_embeddings;

        let mut h1: HashMap<String, Array2<f32>> = HashMap::new();
        for set in edge_sets {
            let conv = self.conv_for(&self.conv1, &set.edge_type, 1)?;
            let x_src = node_input(h0, &set.edge_type.src)?;
            let x_dst = node_input(h0, &set.edge_type.dst)?;
            let mut out = conv.forward(x_src, x_dst, &set.edges)?;
            out.mapv_inplace(|x| x.max(0.0));
            h1.insert(set.edge_type.dst.clone(), out);
        }

        let mut h2: HashMap<String, Array2<f32>> = HashMap::new();
        for set in edge_sets {
            let conv = self.conv_for(&self.conv2, &set.edge_type, 2)?;
            let x_src = h1
                .get(&set.edge_type.src)
                .map(Ok)
                .unwrap_or_else(|| node_input(h0, &set.edge_type.src))?;
            let x_dst = h1
                .get(&set.edge_type.dst)
                .map(Ok)
                .unwrap_or_else(|| node_input(h0, &set.edge_type.dst))?;
            let mut out = conv.forward(x_src, x_dst, &set.edges)?;
            out.mapv_inplace(|x| x.max(0.0));
            h2.insert(set.edge_type.dst.clone(), out);
        }

        // Identity pass-through for node types no layer touched
        let mut result = h2;
        for (node_type, embedding) in h0 {
            if result.contains_key(node_type) {
                continue;
            }
            match h1.remove(node_type) {
                Some(hidden) => {
                    result.insert(node_type.clone(), hidden);
                }
                None => {
                    result.insert(node_type.clone(), embedding.clone());
                }
            }
        }
        Ok(result)
    }

    fn conv_for<'a>(
        &self,
        layer: &'a HashMap<EdgeType, GatConv>,
        edge_type: &EdgeType,
        index: usize,
    ) -> AppResult<&'a GatConv> {
        layer.get(edge_type).ok_or_else(|| {
            AppError::Internal(format!(
                "no layer-{} convolution for edge type {}",
                index, edge_type
            ))
        })
    }

    /// Scores `(query, candidate)` pairs against shared item embeddings.
    ///
    /// Ordering matters: the query embedding always occupies the first half
    /// of the concatenated input, so scoring is not symmetric.
    pub fn score_batch(
        &self,
        item_embeddings: &Array2<f32>,
        query: usize,
        candidates: &[usize],
    ) -> Array1<f32> {
        let width = item_embeddings.ncols();
        let mut pairs = Array2::<f32>::zeros((candidates.len(), 2 * width));
        for (row, &candidate) in candidates.iter().enumerate() {
            pairs
                .slice_mut(s![row, ..width])
                .assign(&item_embeddings.row(query));
            pairs
                .slice_mut(s![row, width..])
                .assign(&item_embeddings.row(candidate));
        }
        self.scorer.forward(&pairs)
    }

    /// Single-pair score; runs through the same batched routine so the two
    /// variants cannot drift apart numerically
    pub fn score_pair(&self, item_embeddings: &Array2<f32>, query: usize, candidate: usize) -> f32 {
        self.score_batch(item_embeddings, query, &[candidate])[0]
    }

    /// Importance distribution over the seven attribute categories for one pair
    pub fn attribute_importance(
        &self,
        item_embeddings: &Array2<f32>,
        query: usize,
        candidate: usize,
    ) -> AttributeImportance {
        let width = item_embeddings.ncols();
        let mut pair = Array1::<f32>::zeros(2 * width);
        pair.slice_mut(s![..width]).assign(&item_embeddings.row(query));
        pair.slice_mut(s![width..])
            .assign(&item_embeddings.row(candidate));
        self.importance.forward(&pair)
    }
}

fn node_input<'a>(
    embeddings: &'a HashMap<String, Array2<f32>>,
    node_type: &str,
) -> AppResult<&'a Array2<f32>> {
    embeddings
        .get(node_type)
        .ok_or_else(|| AppError::Internal(format!("no embeddings for node type {}", node_type)))
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
