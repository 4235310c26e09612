use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::models::Item;

/// One row of the flat metadata snapshot. Every field except the article id
/// defaults to an empty placeholder, so partially-populated rows load
/// instead of aborting the lookup table.
#[derive(Debug, Deserialize)]
struct CatalogRow {
    article_id: u64,
    #[serde(default)]
    prod_name: String,
    #[serde(default)]
    product_type_name: String,
    #[serde(default)]
    product_group_name: String,
    #[serde(default)]
    graphical_appearance_name: String,
    #[serde(default)]
    colour_group_name: String,
    #[serde(default)]
    perceived_colour_value_name: String,
    #[serde(default)]
    perceived_colour_master_name: String,
    #[serde(default)]
    index_group_no: Option<i32>,
    #[serde(default)]
    index_group_name: String,
    #[serde(default)]
    garment_group_name: String,
    #[serde(default)]
    detail_desc: String,
    #[serde(rename = "Sleeve_prediction", default)]
    sleeve_prediction: String,
    #[serde(rename = "Length_prediction", default)]
    length_prediction: String,
    #[serde(rename = "Neckline_prediction", default)]
    neckline_prediction: String,
    #[serde(default)]
    detected_fabrics: String,
}

impl From<CatalogRow> for Item {
    fn from(row: CatalogRow) -> Self {
        Item {
            article_id: row.article_id,
            prod_name: row.prod_name,
            product_type_name: row.product_type_name,
            product_group_name: row.product_group_name,
            graphical_appearance_name: row.graphical_appearance_name,
            colour_group_name: row.colour_group_name,
            perceived_colour_value_name: row.perceived_colour_value_name,
            perceived_colour_master_name: row.perceived_colour_master_name,
            index_group_no: row.index_group_no.unwrap_or_default(),
            index_group_name: row.index_group_name,
            garment_group_name: row.garment_group_name,
            detail_desc: row.detail_desc,
            sleeve_prediction: row.sleeve_prediction,
            length_prediction: row.length_prediction,
            neckline_prediction: row.neckline_prediction,
            detected_fabrics: parse_fabric_list(&row.detected_fabrics),
        }
    }
}

/// In-memory article metadata lookup, keyed by article id
pub struct Catalog {
    items: HashMap<u64, Item>,
}

impl Catalog {
    /// An empty catalog; every lookup misses. Used when the snapshot could
    /// not be loaded, keeping the service up in a degraded state.
    pub fn empty() -> Self {
        Self {
            items: HashMap::new(),
        }
    }

    pub fn from_items(items: Vec<Item>) -> Self {
        Self {
            items: items.into_iter().map(|i| (i.article_id, i)).collect(),
        }
    }

    /// Loads the CSV snapshot. Rows that fail to parse are skipped and
    /// counted; a missing or unreadable file is an error.
    pub fn load(path: &Path) -> AppResult<Self> {
        let mut reader = csv::Reader::from_path(path).map_err(|e| {
            AppError::Artifact(format!("failed to open catalog {}: {}", path.display(), e))
        })?;

        let mut items = HashMap::new();
        let mut skipped = 0usize;
        for row in reader.deserialize::<CatalogRow>() {
            match row {
                Ok(row) => {
                    let item = Item::from(row);
                    items.insert(item.article_id, item);
                }
                Err(e) => {
                    skipped += 1;
                    tracing::debug!(error = %e, "Skipping malformed catalog row");
                }
            }
        }

        if skipped > 0 {
            tracing::warn!(skipped, "Some catalog rows could not be parsed");
        }
        tracing::info!(items = items.len(), path = %path.display(), "Catalog loaded");
        Ok(Self { items })
    }

    pub fn get(&self, article_id: u64) -> Option<&Item> {
        self.items.get(&article_id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Parses the fabric snapshot column, which arrives either as a Python-style
/// list literal (`"['silk', 'cotton']"`) or a plain comma-separated string
fn parse_fabric_list(raw: &str) -> Vec<String> {
    raw.trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(',')
        .map(|s| s.trim().trim_matches('\'').trim_matches('"').to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
