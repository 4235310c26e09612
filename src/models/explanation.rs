use serde::{Deserialize, Serialize};

use super::ItemAttributes;

/// Share of influence each attribute category had on a pairing decision.
///
/// Softmax output: each weight is in [0, 1] and the seven weights sum to 1.
/// The weights describe what the network attended to, not which attributes
/// are actually populated on either item.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AttributeImportance {
    pub color_value: f32,
    pub color_master: f32,
    pub appearance: f32,
    pub fabric: f32,
    pub sleeve: f32,
    pub length: f32,
    pub neckline: f32,
}

impl AttributeImportance {
    /// Builds an importance vector from weights in the fixed attribute order:
    /// color value, color master, appearance, fabric, sleeve, length, neckline.
    pub fn from_weights(weights: [f32; 7]) -> Self {
        Self {
            color_value: weights[0],
            color_master: weights[1],
            appearance: weights[2],
            fabric: weights[3],
            sleeve: weights[4],
            length: weights[5],
            neckline: weights[6],
        }
    }

    /// Weights in the fixed attribute order
    pub fn as_array(&self) -> [f32; 7] {
        [
            self.color_value,
            self.color_master,
            self.appearance,
            self.fabric,
            self.sleeve,
            self.length,
            self.neckline,
        ]
    }

    pub fn sum(&self) -> f32 {
        self.as_array().iter().sum()
    }
}

/// Why a pair of items was judged compatible
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Explanation {
    pub score: f32,
    pub query: ItemSummary,
    pub candidate: ItemSummary,
    /// At most 3 reasons, ordered by importance descending
    pub reasons: Vec<Reason>,
    pub attribute_importance: AttributeImportance,
}

/// Minimal item snapshot carried inside an explanation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemSummary {
    pub id: u64,
    pub name: String,
    pub product_group: String,
    pub attributes: ItemAttributes,
}

/// One human-readable justification for a pairing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reason {
    #[serde(rename = "type")]
    pub kind: ReasonKind,
    pub description: String,
    pub importance: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonKind {
    StyleCombination,
    ColorHarmony,
    LuminanceBalance,
    TextureBalance,
    ProportionBalance,
    SeasonalCoordination,
    NecklineHarmony,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_importance_round_trips_fixed_order() {
        let importance = AttributeImportance::from_weights([0.1, 0.2, 0.3, 0.1, 0.1, 0.1, 0.1]);
        assert_eq!(importance.color_master, 0.2);
        assert_eq!(importance.appearance, 0.3);
        assert_eq!(
            importance.as_array(),
            [0.1, 0.2, 0.3, 0.1, 0.1, 0.1, 0.1]
        );
    }

    #[test]
    fn test_reason_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ReasonKind::ColorHarmony).unwrap();
        assert_eq!(json, "\"color_harmony\"");
    }
}
