use serde::{Deserialize, Serialize};

use super::AttributeImportance;

/// Catalog metadata for a single article
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Item {
    pub article_id: u64,
    pub prod_name: String,
    pub product_type_name: String,
    pub product_group_name: String,
    pub graphical_appearance_name: String,
    pub colour_group_name: String,
    pub perceived_colour_value_name: String,
    pub perceived_colour_master_name: String,
    /// Small integer code segmenting the catalog into broad demographic groups
    pub index_group_no: i32,
    pub index_group_name: String,
    pub garment_group_name: String,
    pub detail_desc: String,
    pub sleeve_prediction: String,
    pub length_prediction: String,
    pub neckline_prediction: String,
    pub detected_fabrics: Vec<String>,
}

/// The categorical attributes the graph encodes for one item.
///
/// Populated once at graph-construction time; fabric is the only
/// attribute that may carry multiple values.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ItemAttributes {
    #[serde(default)]
    pub color_value: Option<String>,
    #[serde(default)]
    pub color_master: Option<String>,
    #[serde(default)]
    pub appearance: Option<String>,
    #[serde(default)]
    pub fabric: Vec<String>,
    #[serde(default)]
    pub sleeve: Option<String>,
    #[serde(default)]
    pub length: Option<String>,
    #[serde(default)]
    pub neckline: Option<String>,
}

/// A recommended item: catalog metadata plus the model's scores
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendedItem {
    #[serde(flatten)]
    pub item: Item,

    pub compatibility_score: f32,

    // Per-attribute share of influence on the pairing decision
    pub color_importance: f32,
    pub luminance_importance: f32,
    pub appearance_importance: f32,
    pub fabric_importance: f32,
    pub neckline_importance: f32,
    pub sleeve_importance: f32,
    pub length_importance: f32,
}

impl RecommendedItem {
    pub fn new(item: Item, score: f32, importance: &AttributeImportance) -> Self {
        Self {
            item,
            compatibility_score: score,
            color_importance: importance.color_master,
            luminance_importance: importance.color_value,
            appearance_importance: importance.appearance,
            fabric_importance: importance.fabric,
            neckline_importance: importance.neckline,
            sleeve_importance: importance.sleeve,
            length_importance: importance.length,
        }
    }
}
