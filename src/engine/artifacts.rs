use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

use super::gat::GatConv;
use super::graph::{EdgeType, FashionGraph};
use super::model::{FeedForward, GatModel, ImportanceHead, ATTRIBUTE_COUNT};
use super::tensor::{vector_of_len, Matrix};

/// Supported artifact schema version
pub const ARTIFACT_VERSION: u32 = 1;

/// File names inside the model directory
pub const MODEL_FILE: &str = "model.json";
pub const GRAPH_FILE: &str = "graph.json";

/// Persisted weights for one attention convolution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvWeights {
    pub edge_type: EdgeType,
    pub heads: usize,
    pub lin_src: Matrix,
    pub lin_dst: Matrix,
    pub att_src: Matrix,
    pub att_dst: Matrix,
    pub bias: Vec<f32>,
}

impl ConvWeights {
    fn into_conv(self, layer: usize) -> AppResult<(EdgeType, GatConv)> {
        let tag = format!("conv{} {}", layer, self.edge_type);
        let lin_src = self.lin_src.into_array(&format!("{} lin_src", tag))?;
        let out_width = lin_src.ncols();
        let conv = GatConv::new(
            lin_src,
            self.lin_dst.into_array(&format!("{} lin_dst", tag))?,
            self.att_src.into_array(&format!("{} att_src", tag))?,
            self.att_dst.into_array(&format!("{} att_dst", tag))?,
            vector_of_len(self.bias, out_width, &format!("{} bias", tag))?,
            self.heads,
        )?;
        Ok((self.edge_type, conv))
    }
}

/// Persisted scorer MLP weights
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScorerWeights {
    pub w1: Matrix,
    pub b1: Vec<f32>,
    pub w2: Matrix,
    pub b2: Vec<f32>,
}

/// Persisted attribute-importance head weights
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportanceWeights {
    pub shared_w: Matrix,
    pub shared_b: Vec<f32>,
    pub attention_w: Matrix,
    pub attention_b: Vec<f32>,
}

/// The trained model as persisted in `model.json`: an explicit, versioned
/// schema rather than an opaque serialized object graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub version: u32,
    pub hidden_channels: usize,
    pub out_channels: usize,
    pub heads: usize,
    pub node_embeddings: HashMap<String, Matrix>,
    pub conv1: Vec<ConvWeights>,
    pub conv2: Vec<ConvWeights>,
    pub scorer: ScorerWeights,
    pub importance: ImportanceWeights,
}

impl ModelArtifact {
    /// Validates and assembles the runtime model
    pub fn into_model(self) -> AppResult<GatModel> {
        if self.version != ARTIFACT_VERSION {
            return Err(AppError::Artifact(format!(
                "unsupported model artifact version {} (expected {})",
                self.version, ARTIFACT_VERSION
            )));
        }

        let mut node_embeddings = HashMap::with_capacity(self.node_embeddings.len());
        for (node_type, matrix) in self.node_embeddings {
            let array = matrix.into_array(&format!("embeddings for {}", node_type))?;
            if array.ncols() != self.hidden_channels {
                return Err(AppError::Artifact(format!(
                    "embeddings for {} are {} wide, expected hidden_channels = {}",
                    node_type,
                    array.ncols(),
                    self.hidden_channels
                )));
            }
            node_embeddings.insert(node_type, array);
        }

        let mut conv1 = HashMap::with_capacity(self.conv1.len());
        for weights in self.conv1 {
            let (edge_type, conv) = weights.into_conv(1)?;
            conv1.insert(edge_type, conv);
        }
        let mut conv2 = HashMap::with_capacity(self.conv2.len());
        for weights in self.conv2 {
            let (edge_type, conv) = weights.into_conv(2)?;
            conv2.insert(edge_type, conv);
        }

        let scorer_w1 = self.scorer.w1.into_array("scorer w1")?;
        let scorer_b1 = vector_of_len(self.scorer.b1, scorer_w1.ncols(), "scorer b1")?;
        let scorer = FeedForward::new(
            scorer_w1,
            scorer_b1,
            self.scorer.w2.into_array("scorer w2")?,
            vector_of_len(self.scorer.b2, 1, "scorer b2")?,
        )?;
        let shared_w = self.importance.shared_w.into_array("importance shared_w")?;
        let shared_b = vector_of_len(self.importance.shared_b, shared_w.ncols(), "importance shared_b")?;
        let importance = ImportanceHead::new(
            shared_w,
            shared_b,
            self.importance.attention_w.into_array("importance attention_w")?,
            vector_of_len(self.importance.attention_b, ATTRIBUTE_COUNT, "importance attention_b")?,
        )?;

        Ok(GatModel::new(
            node_embeddings,
            conv1,
            conv2,
            scorer,
            importance,
        ))
    }
}

/// Reads and parses `model.json`
pub fn load_model(path: &Path) -> AppResult<ModelArtifact> {
    let file = File::open(path)?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| AppError::Artifact(format!("failed to parse {}: {}", path.display(), e)))
}

/// Reads and parses `graph.json`
pub fn load_graph(path: &Path) -> AppResult<FashionGraph> {
    let file = File::open(path)?;
    let graph: FashionGraph = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| AppError::Artifact(format!("failed to parse {}: {}", path.display(), e)))?;
    if graph.version != ARTIFACT_VERSION {
        return Err(AppError::Artifact(format!(
            "unsupported graph artifact version {} (expected {})",
            graph.version, ARTIFACT_VERSION
        )));
    }
    Ok(graph)
}
