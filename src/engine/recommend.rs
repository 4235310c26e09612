use std::collections::HashMap;
use std::time::Instant;

use crate::error::{AppError, AppResult};
use crate::models::Explanation;

use super::explain::build_explanation;
use super::filter::filter_candidates;
use super::graph::{FashionGraph, ITEM_NODE_TYPE};
use super::model::GatModel;

/// Candidates are scored in fixed-size batches
const SCORE_BATCH_SIZE: usize = 512;

/// Default number of recommendations per query
pub const DEFAULT_TOP_K: usize = 5;

/// One ranked recommendation with its structured explanation
#[derive(Debug, Clone)]
pub struct Recommendation {
    pub item_id: u64,
    pub score: f32,
    pub explanation: Explanation,
}

/// The loaded recommendation engine: trained model plus the graph it was
/// trained over. Immutable after construction; safe to share across handlers.
#[derive(Debug)]
pub struct Engine {
    model: GatModel,
    graph: FashionGraph,
}

impl Engine {
    /// Cross-validates the model against the graph so that dimension
    /// mismatches surface at load time rather than per request
    pub fn new(model: GatModel, graph: FashionGraph) -> AppResult<Self> {
        graph.validate()?;

        for (node_type, &count) in &graph.node_counts {
            match model.embedding_rows(node_type) {
                Some(rows) if rows == count => {}
                Some(rows) => {
                    return Err(AppError::Artifact(format!(
                        "node type {}: graph declares {} nodes but model has {} embeddings",
                        node_type, count, rows
                    )))
                }
                None => {
                    return Err(AppError::Artifact(format!(
                        "model has no embeddings for node type {}",
                        node_type
                    )))
                }
            }
        }

        // Layer-1 convolutions read the initial embeddings; their output
        // widths feed layer 2, with pass-through for untouched node types.
        // Mismatched widths must fail here, not inside a request.
        let mut after_layer1: HashMap<String, usize> = HashMap::new();
        for set in &graph.edge_sets {
            let (in_src, in_dst) =
                model.conv1_in_widths(&set.edge_type).ok_or_else(|| {
                    AppError::Artifact(format!(
                        "model has no layer-1 convolution for edge type {}",
                        set.edge_type
                    ))
                })?;
            let src_width = model.embedding_width(&set.edge_type.src).unwrap_or(0);
            let dst_width = model.embedding_width(&set.edge_type.dst).unwrap_or(0);
            if in_src != src_width || in_dst != dst_width {
                return Err(AppError::Artifact(format!(
                    "layer-1 convolution for {} expects {}/{} wide inputs but embeddings are {}/{} wide",
                    set.edge_type, in_src, in_dst, src_width, dst_width
                )));
            }
            if let Some(out_width) = model.conv1_out_width(&set.edge_type) {
                after_layer1.insert(set.edge_type.dst.clone(), out_width);
            }
        }
        for set in &graph.edge_sets {
            let (in_src, in_dst) =
                model.conv2_in_widths(&set.edge_type).ok_or_else(|| {
                    AppError::Artifact(format!(
                        "model has no layer-2 convolution for edge type {}",
                        set.edge_type
                    ))
                })?;
            let src_width = after_layer1
                .get(&set.edge_type.src)
                .copied()
                .or_else(|| model.embedding_width(&set.edge_type.src))
                .unwrap_or(0);
            let dst_width = after_layer1
                .get(&set.edge_type.dst)
                .copied()
                .or_else(|| model.embedding_width(&set.edge_type.dst))
                .unwrap_or(0);
            if in_src != src_width || in_dst != dst_width {
                return Err(AppError::Artifact(format!(
                    "layer-2 convolution for {} expects {}/{} wide inputs but layer-1 outputs are {}/{} wide",
                    set.edge_type, in_src, in_dst, src_width, dst_width
                )));
            }
        }

        // The item embedding width the heads will actually see: the layer-2
        // output when items are a convolution destination, the initial
        // embedding width otherwise (identity pass-through).
        let item_width = graph
            .edge_sets
            .iter()
            .filter(|set| set.edge_type.dst == ITEM_NODE_TYPE)
            .last()
            .and_then(|set| model.conv2_out_width(&set.edge_type))
            .or_else(|| model.embedding_width(ITEM_NODE_TYPE))
            .ok_or_else(|| {
                AppError::Artifact("model has no item embeddings".to_string())
            })?;
        if model.scorer_input_width() != 2 * item_width {
            return Err(AppError::Artifact(format!(
                "scorer expects input width {} but item pairs are {} wide",
                model.scorer_input_width(),
                2 * item_width
            )));
        }
        if model.importance_input_width() != 2 * item_width {
            return Err(AppError::Artifact(format!(
                "importance head expects input width {} but item pairs are {} wide",
                model.importance_input_width(),
                2 * item_width
            )));
        }

        Ok(Self { model, graph })
    }

    pub fn item_count(&self) -> usize {
        self.graph.item_count()
    }

    /// Returns the top-k compatible items for the query article, ranked by
    /// compatibility score descending, each with a structured explanation.
    ///
    /// Unknown article ids are a `NotFound` error; a valid article with no
    /// eligible candidates yields an empty list. One full-graph forward pass
    /// is shared across all candidates of the call; importance and
    /// explanations are computed only for the selected k.
    pub fn recommend(&self, article_id: u64, top_k: usize) -> AppResult<Vec<Recommendation>> {
        let start = Instant::now();

        let query_index = self.graph.item_index(article_id).ok_or_else(|| {
            AppError::NotFound(format!("Item {} not found in the graph", article_id))
        })?;

        let outcome = filter_candidates(query_index, &self.graph.items);
        tracing::info!(
            article_id,
            candidates = outcome.indices.len(),
            rejected_gender = outcome.rejected_gender,
            rejected_group_conflict = outcome.rejected_group_conflict,
            rejected_same_group = outcome.rejected_same_group,
            "Candidate filtering completed"
        );
        if outcome.indices.is_empty() {
            return Ok(Vec::new());
        }

        let mut embeddings = self.model.forward(&self.graph.edge_sets)?;
        let item_embeddings = embeddings.remove(ITEM_NODE_TYPE).ok_or_else(|| {
            AppError::Internal("forward pass produced no item embeddings".to_string())
        })?;

        let mut scored: Vec<(usize, f32)> = Vec::with_capacity(outcome.indices.len());
        for chunk in outcome.indices.chunks(SCORE_BATCH_SIZE) {
            let scores = self.model.score_batch(&item_embeddings, query_index, chunk);
            scored.extend(chunk.iter().copied().zip(scores.iter().copied()));
        }

        // Stable: exact ties keep candidate insertion order
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);

        let query_node = &self.graph.items[query_index];
        let recommendations: Vec<Recommendation> = scored
            .into_iter()
            .map(|(index, score)| {
                let importance =
                    self.model
                        .attribute_importance(&item_embeddings, query_index, index);
                let node = &self.graph.items[index];
                Recommendation {
                    item_id: node.article_id,
                    score,
                    explanation: build_explanation(score, query_node, node, &importance),
                }
            })
            .collect();

        tracing::info!(
            article_id,
            returned = recommendations.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Recommendation completed"
        );
        Ok(recommendations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::gat::GatConv;
    use crate::engine::graph::{EdgeSet, EdgeType, ItemNode, NodeMapping};
    use crate::engine::model::{FeedForward, ImportanceHead, ATTRIBUTE_COUNT};
    use crate::models::ItemAttributes;
    use ndarray::{Array1, Array2};

    fn item(article_id: u64, product_group: &str, gender_group: i32) -> ItemNode {
        ItemNode {
            article_id,
            name: format!("Item {}", article_id),
            product_group: product_group.to_string(),
            gender_group,
            gender_name: String::new(),
            attributes: ItemAttributes {
                appearance: Some("Solid".to_string()),
                ..Default::default()
            },
        }
    }

    fn test_graph(items: Vec<ItemNode>) -> FashionGraph {
        let names = items
            .iter()
            .map(|i| format!("item_{}", i.article_id))
            .collect();
        let edges = (0..items.len() as u32).map(|i| [i, 0]).collect();
        FashionGraph {
            version: 1,
            node_counts: [
                ("item".to_string(), items.len()),
                ("val_color".to_string(), 1),
            ]
            .into_iter()
            .collect(),
            item_mapping: NodeMapping::from_names(names).unwrap(),
            items,
            edge_sets: vec![EdgeSet {
                edge_type: EdgeType {
                    src: "item".to_string(),
                    relation: "has_color".to_string(),
                    dst: "val_color".to_string(),
                },
                edges,
            }],
        }
    }

    fn conv_with_width(width: usize) -> GatConv {
        GatConv::new(
            Array2::eye(width),
            Array2::eye(width),
            Array2::from_elem((1, width), 0.1),
            Array2::from_elem((1, width), -0.1),
            Array1::zeros(width),
            1,
        )
        .unwrap()
    }

    // Deterministic 2-wide model; items are never convolution destinations,
    // so item embeddings pass through and pairs are 4 wide.
    fn build_engine(
        items: Vec<ItemNode>,
        conv1_width: usize,
        conv2_width: usize,
    ) -> AppResult<Engine> {
        let n = items.len();
        let graph = test_graph(items);

        let item_emb = Array2::from_shape_fn((n, 2), |(i, j)| {
            ((i as f32 + 1.0) * 0.7 + j as f32 * 1.3).sin()
        });
        let val_emb = Array2::zeros((1, 2));
        let edge_type = graph.edge_sets[0].edge_type.clone();

        let scorer = FeedForward::new(
            Array2::from_shape_fn((4, 3), |(i, j)| ((i * 3 + j) as f32 * 0.4).cos()),
            Array1::zeros(3),
            Array2::from_shape_fn((3, 1), |(i, _)| 0.9 - i as f32 * 0.3),
            Array1::zeros(1),
        )
        .unwrap();
        let importance = ImportanceHead::new(
            Array2::from_shape_fn((4, 3), |(i, j)| ((i + 2 * j) as f32 * 0.25).sin()),
            Array1::zeros(3),
            Array2::from_shape_fn((3, ATTRIBUTE_COUNT), |(i, j)| ((i + j) as f32 * 0.15).cos()),
            Array1::zeros(ATTRIBUTE_COUNT),
        )
        .unwrap();

        let model = GatModel::new(
            [
                ("item".to_string(), item_emb),
                ("val_color".to_string(), val_emb),
            ]
            .into_iter()
            .collect(),
            [(edge_type.clone(), conv_with_width(conv1_width))]
                .into_iter()
                .collect(),
            [(edge_type, conv_with_width(conv2_width))]
                .into_iter()
                .collect(),
            scorer,
            importance,
        );
        Engine::new(model, graph)
    }

    fn test_engine(items: Vec<ItemNode>) -> Engine {
        build_engine(items, 2, 2).unwrap()
    }

    fn wardrobe() -> Vec<ItemNode> {
        vec![
            item(10, "Garment Full body", 1),
            item(20, "Garment Upper body", 1),
            item(30, "Garment Lower body", 1),
            item(40, "Accessories", 1),
            item(50, "Shoes", 1),
            item(60, "Shoes", 2),
        ]
    }

    #[test]
    fn test_unknown_item_is_not_found() {
        let engine = test_engine(wardrobe());
        let err = engine.recommend(999, 5).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_full_body_query_never_pairs_with_upper_or_lower() {
        let engine = test_engine(wardrobe());
        for k in 1..=6 {
            let recommendations = engine.recommend(10, k).unwrap();
            for rec in &recommendations {
                assert!(
                    rec.item_id != 20 && rec.item_id != 30,
                    "full-body query returned body-conflicting item {}",
                    rec.item_id
                );
                assert_ne!(rec.item_id, 10, "query item recommended to itself");
            }
        }
    }

    #[test]
    fn test_scores_ranked_descending() {
        let engine = test_engine(wardrobe());
        let recommendations = engine.recommend(40, 5).unwrap();
        assert!(!recommendations.is_empty());
        for pair in recommendations.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        for rec in &recommendations {
            assert!((0.0..=1.0).contains(&rec.score));
        }
    }

    #[test]
    fn test_empty_candidate_set_is_empty_result_not_error() {
        // Both items share a product group, so each filters the other out
        let engine = test_engine(vec![
            item(10, "Garment Upper body", 1),
            item(20, "Garment Upper body", 1),
        ]);
        let recommendations = engine.recommend(10, 5).unwrap();
        assert!(recommendations.is_empty());
    }

    #[test]
    fn test_explanations_carry_reasons_and_importance() {
        let engine = test_engine(wardrobe());
        let recommendations = engine.recommend(10, 3).unwrap();
        assert!(!recommendations.is_empty());
        for rec in &recommendations {
            let explanation = &rec.explanation;
            assert!(!explanation.reasons.is_empty() && explanation.reasons.len() <= 3);
            assert!((explanation.attribute_importance.sum() - 1.0).abs() < 1e-4);
            assert_eq!(explanation.query.id, 10);
            assert_eq!(explanation.candidate.id, rec.item_id);
        }
    }

    #[test]
    fn test_top_k_truncates() {
        let engine = test_engine(wardrobe());
        let all = engine.recommend(40, 10).unwrap();
        let one = engine.recommend(40, 1).unwrap();
        assert!(all.len() > 1);
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].item_id, all[0].item_id);
    }

    #[test]
    fn test_layer1_width_mismatch_rejected_at_construction() {
        // Convolutions expecting 3-wide inputs over 2-wide embeddings must
        // fail construction, not surface later from inside recommend
        let err = build_engine(wardrobe(), 3, 3).unwrap_err();
        assert!(matches!(err, AppError::Artifact(_)));
        assert!(err.to_string().contains("layer-1"), "got: {}", err);
    }

    #[test]
    fn test_layer2_width_checked_against_layer1_output() {
        let err = build_engine(wardrobe(), 2, 3).unwrap_err();
        assert!(matches!(err, AppError::Artifact(_)));
        assert!(err.to_string().contains("layer-2"), "got: {}", err);
    }

    #[test]
    fn test_tied_scores_keep_item_table_order() {
        // An all-zero scorer gives every candidate the same score; the
        // stable sort must then preserve item-table order
        let n = wardrobe().len();
        let graph = test_graph(wardrobe());
        let edge_type = graph.edge_sets[0].edge_type.clone();
        let scorer = FeedForward::new(
            Array2::zeros((4, 3)),
            Array1::zeros(3),
            Array2::zeros((3, 1)),
            Array1::zeros(1),
        )
        .unwrap();
        let importance = ImportanceHead::new(
            Array2::zeros((4, 3)),
            Array1::zeros(3),
            Array2::zeros((3, ATTRIBUTE_COUNT)),
            Array1::zeros(ATTRIBUTE_COUNT),
        )
        .unwrap();
        let model = GatModel::new(
            [
                ("item".to_string(), Array2::zeros((n, 2))),
                ("val_color".to_string(), Array2::zeros((1, 2))),
            ]
            .into_iter()
            .collect(),
            [(edge_type.clone(), conv_with_width(2))].into_iter().collect(),
            [(edge_type, conv_with_width(2))].into_iter().collect(),
            scorer,
            importance,
        );
        let engine = Engine::new(model, graph).unwrap();

        let recommendations = engine.recommend(40, 10).unwrap();
        let ids: Vec<u64> = recommendations.iter().map(|r| r.item_id).collect();
        // Item 60 is gender-excluded; the rest keep their table order
        assert_eq!(ids, vec![10, 20, 30, 50]);
        for rec in &recommendations {
            assert_eq!(rec.score, recommendations[0].score);
        }
    }

    #[test]
    fn test_recommendation_is_deterministic() {
        let engine = test_engine(wardrobe());
        let first = engine.recommend(10, 5).unwrap();
        let second = engine.recommend(10, 5).unwrap();
        let ids: Vec<u64> = first.iter().map(|r| r.item_id).collect();
        let ids_again: Vec<u64> = second.iter().map(|r| r.item_id).collect();
        assert_eq!(ids, ids_again);
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.score, b.score);
        }
    }
}
