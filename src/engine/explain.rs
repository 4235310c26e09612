use crate::models::{AttributeImportance, Explanation, ItemSummary, Reason, ReasonKind};

use super::graph::ItemNode;

/// Fabrics that get the "luxurious texture" phrasing
const LUXURIOUS_FABRICS: [&str; 4] = ["silk", "satin", "velvet", "leather"];

/// Maximum number of reasons carried in one explanation
const MAX_REASONS: usize = 3;

/// Builds the full structured explanation for a scored pair.
///
/// The reason list holds the top `MAX_REASONS` applicable reasons by
/// importance weight; ties keep generation order (stable sort). The style
/// reason always applies, so the list is never empty.
pub fn build_explanation(
    score: f32,
    query: &ItemNode,
    candidate: &ItemNode,
    importance: &AttributeImportance,
) -> Explanation {
    let mut reasons = build_reasons(query, candidate, importance);
    reasons.sort_by(|a, b| {
        b.importance
            .partial_cmp(&a.importance)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    reasons.truncate(MAX_REASONS);

    Explanation {
        score,
        query: summarize(query),
        candidate: summarize(candidate),
        reasons,
        attribute_importance: importance.clone(),
    }
}

fn summarize(node: &ItemNode) -> ItemSummary {
    ItemSummary {
        id: node.article_id,
        name: node.name.clone(),
        product_group: node.product_group.clone(),
        attributes: node.attributes.clone(),
    }
}

/// Generates every applicable reason in fixed order. Each reason except the
/// style combination is gated on both items having the attribute populated.
fn build_reasons(
    query: &ItemNode,
    candidate: &ItemNode,
    importance: &AttributeImportance,
) -> Vec<Reason> {
    let q = &query.attributes;
    let c = &candidate.attributes;
    let mut reasons = Vec::new();

    // Style combination: the one reason that is always present
    let mut style = format!(
        "This {} pairs well with the {}",
        candidate.product_group.to_lowercase(),
        query.product_group.to_lowercase()
    );
    if let (Some(query_look), Some(candidate_look)) = (&q.appearance, &c.appearance) {
        style.push_str(&format!(
            ", creating a {} look with {} elements",
            candidate_look.to_lowercase(),
            query_look.to_lowercase()
        ));
    }
    style.push('.');
    reasons.push(Reason {
        kind: ReasonKind::StyleCombination,
        description: style,
        importance: importance.appearance,
    });

    if let (Some(query_color), Some(candidate_color)) = (&q.color_master, &c.color_master) {
        let color1 = clean_value(query_color, "master_");
        let color2 = clean_value(candidate_color, "master_");
        let description = if color1 == color2 {
            format!("The matching {} tones create a cohesive look.", color1)
        } else {
            format!("The {} complements the {} beautifully.", color1, color2)
        };
        reasons.push(Reason {
            kind: ReasonKind::ColorHarmony,
            description,
            importance: importance.color_master,
        });
    }

    if let (Some(query_value), Some(candidate_value)) = (&q.color_value, &c.color_value) {
        let luminance1 = clean_value(query_value, "value_");
        let luminance2 = clean_value(candidate_value, "value_");
        let description = if luminance1 == luminance2 {
            format!(
                "The consistent {} luminance creates a harmonious look.",
                luminance1
            )
        } else {
            format!(
                "The {} and {} luminance levels create an interesting contrast.",
                luminance1, luminance2
            )
        };
        reasons.push(Reason {
            kind: ReasonKind::LuminanceBalance,
            description,
            importance: importance.color_value,
        });
    }

    if !q.fabric.is_empty() && !c.fabric.is_empty() {
        let luxurious = q
            .fabric
            .iter()
            .chain(&c.fabric)
            .any(|f| LUXURIOUS_FABRICS.contains(&f.to_lowercase().as_str()));
        let mut description = format!(
            "The combination of {} with {} ",
            q.fabric.join(", ").to_lowercase(),
            c.fabric.join(", ").to_lowercase()
        );
        if luxurious {
            description.push_str("adds luxurious texture contrast.");
        } else {
            description.push_str("creates an interesting texture mix.");
        }
        reasons.push(Reason {
            kind: ReasonKind::TextureBalance,
            description,
            importance: importance.fabric,
        });
    }

    if let (Some(query_length), Some(candidate_length)) = (&q.length, &c.length) {
        let length1 = normalize(query_length);
        let length2 = normalize(candidate_length);
        let cropped_high_waisted = (length1.contains("crop") && length2.contains("high waisted"))
            || (length2.contains("crop") && length1.contains("high waisted"));
        let long_short = (length1.contains("long") && length2.contains("short"))
            || (length2.contains("long") && length1.contains("short"));
        let description = if cropped_high_waisted {
            "The cropped length pairs perfectly with the high-waisted style, creating a balanced silhouette.".to_string()
        } else if long_short {
            "The contrast between the lengths creates an interesting and balanced proportion."
                .to_string()
        } else {
            format!(
                "The {} length works harmoniously with the {} length.",
                length1, length2
            )
        };
        reasons.push(Reason {
            kind: ReasonKind::ProportionBalance,
            description,
            importance: importance.length,
        });
    }

    // Seasonal coordination applies only to recognisably warm or cool sleeve
    // styles; anything else emits no reason at all
    if let (Some(query_sleeve), Some(candidate_sleeve)) = (&q.sleeve, &c.sleeve) {
        let combined = format!("{} {}", normalize(query_sleeve), normalize(candidate_sleeve));
        let description = if combined.contains("sleeveless") || combined.contains("short") {
            Some("Perfect for warmer weather with its lightweight sleeve combination.")
        } else if combined.contains("long") || combined.contains("full") {
            Some("Ideal for cooler weather with its cozy sleeve styling.")
        } else {
            None
        };
        if let Some(description) = description {
            reasons.push(Reason {
                kind: ReasonKind::SeasonalCoordination,
                description: description.to_string(),
                importance: importance.sleeve,
            });
        }
    }

    if let (Some(query_neck), Some(candidate_neck)) = (&q.neckline, &c.neckline) {
        let neck1 = normalize(query_neck);
        let combined = format!("{} {}", neck1, normalize(candidate_neck));
        let description = if combined.contains("high") {
            "The high neckline adds sophistication to the overall look.".to_string()
        } else if combined.contains('v') {
            "The v-neckline creates an elongating effect that enhances the silhouette.".to_string()
        } else {
            format!("The {} neckline style complements the overall look.", neck1)
        };
        reasons.push(Reason {
            kind: ReasonKind::NecklineHarmony,
            description,
            importance: importance.neckline,
        });
    }

    reasons
}

fn clean_value(value: &str, prefix: &str) -> String {
    value.trim_start_matches(prefix).to_lowercase()
}

fn normalize(value: &str) -> String {
    value.replace('_', " ").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ItemAttributes;

    fn node(article_id: u64, product_group: &str, attributes: ItemAttributes) -> ItemNode {
        ItemNode {
            article_id,
            name: format!("Item {}", article_id),
            product_group: product_group.to_string(),
            gender_group: 1,
            gender_name: String::new(),
            attributes,
        }
    }

    fn uniform_importance() -> AttributeImportance {
        let w = 1.0 / 7.0;
        AttributeImportance::from_weights([w; 7])
    }

    #[test]
    fn test_style_reason_always_present_even_without_attributes() {
        let query = node(1, "Garment Upper body", ItemAttributes::default());
        let candidate = node(2, "Garment Lower body", ItemAttributes::default());

        let explanation = build_explanation(0.8, &query, &candidate, &uniform_importance());
        assert_eq!(explanation.reasons.len(), 1);
        assert_eq!(explanation.reasons[0].kind, ReasonKind::StyleCombination);
        assert_eq!(
            explanation.reasons[0].description,
            "This garment lower body pairs well with the garment upper body."
        );
    }

    #[test]
    fn test_at_most_three_reasons_ranked_by_importance() {
        let attributes = ItemAttributes {
            color_value: Some("Dark".to_string()),
            color_master: Some("Blue".to_string()),
            appearance: Some("Solid".to_string()),
            fabric: vec!["cotton".to_string()],
            sleeve: Some("long_sleeve".to_string()),
            length: Some("long".to_string()),
            neckline: Some("high_neck".to_string()),
        };
        let query = node(1, "Garment Upper body", attributes.clone());
        let mut candidate_attrs = attributes;
        candidate_attrs.length = Some("short".to_string());
        let candidate = node(2, "Garment Lower body", candidate_attrs);

        let importance =
            AttributeImportance::from_weights([0.05, 0.4, 0.05, 0.3, 0.05, 0.1, 0.05]);
        let explanation = build_explanation(0.9, &query, &candidate, &importance);

        assert_eq!(explanation.reasons.len(), 3);
        assert_eq!(explanation.reasons[0].kind, ReasonKind::ColorHarmony);
        assert_eq!(explanation.reasons[1].kind, ReasonKind::TextureBalance);
        assert_eq!(explanation.reasons[2].kind, ReasonKind::ProportionBalance);
        assert!(explanation.reasons[0].importance >= explanation.reasons[1].importance);
        assert!(explanation.reasons[1].importance >= explanation.reasons[2].importance);
    }

    #[test]
    fn test_equal_importance_keeps_generation_order() {
        // Every reason applies and all weights tie; the stable sort must
        // keep the first three reasons in generation order
        let attributes = ItemAttributes {
            color_value: Some("Dark".to_string()),
            color_master: Some("Blue".to_string()),
            appearance: Some("Solid".to_string()),
            fabric: vec!["cotton".to_string()],
            sleeve: Some("long_sleeve".to_string()),
            length: Some("long".to_string()),
            neckline: Some("high_neck".to_string()),
        };
        let query = node(1, "Garment Upper body", attributes.clone());
        let candidate = node(2, "Garment Lower body", attributes);

        let explanation = build_explanation(0.7, &query, &candidate, &uniform_importance());
        let kinds: Vec<ReasonKind> = explanation.reasons.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ReasonKind::StyleCombination,
                ReasonKind::ColorHarmony,
                ReasonKind::LuminanceBalance,
            ]
        );
    }

    #[test]
    fn test_matching_color_master_gets_cohesive_phrasing() {
        let attrs = ItemAttributes {
            color_master: Some("master_Blue".to_string()),
            ..Default::default()
        };
        let query = node(1, "Garment Upper body", attrs.clone());
        let candidate = node(2, "Garment Lower body", attrs);

        let reasons = build_reasons(&query, &candidate, &uniform_importance());
        let color = reasons
            .iter()
            .find(|r| r.kind == ReasonKind::ColorHarmony)
            .unwrap();
        assert_eq!(
            color.description,
            "The matching blue tones create a cohesive look."
        );
    }

    #[test]
    fn test_luxurious_fabric_phrasing() {
        let query = node(
            1,
            "Garment Upper body",
            ItemAttributes {
                fabric: vec!["Silk".to_string()],
                ..Default::default()
            },
        );
        let candidate = node(
            2,
            "Garment Lower body",
            ItemAttributes {
                fabric: vec!["cotton".to_string(), "wool".to_string()],
                ..Default::default()
            },
        );

        let reasons = build_reasons(&query, &candidate, &uniform_importance());
        let texture = reasons
            .iter()
            .find(|r| r.kind == ReasonKind::TextureBalance)
            .unwrap();
        assert_eq!(
            texture.description,
            "The combination of silk with cotton, wool adds luxurious texture contrast."
        );
    }

    #[test]
    fn test_crop_and_high_waisted_special_case() {
        let query = node(
            1,
            "Garment Upper body",
            ItemAttributes {
                length: Some("cropped".to_string()),
                ..Default::default()
            },
        );
        let candidate = node(
            2,
            "Garment Lower body",
            ItemAttributes {
                length: Some("high_waisted".to_string()),
                ..Default::default()
            },
        );

        let reasons = build_reasons(&query, &candidate, &uniform_importance());
        let proportion = reasons
            .iter()
            .find(|r| r.kind == ReasonKind::ProportionBalance)
            .unwrap();
        assert!(proportion.description.contains("balanced silhouette"));
    }

    #[test]
    fn test_seasonal_reason_omitted_for_unrecognised_sleeves() {
        let attrs = ItemAttributes {
            sleeve: Some("puff".to_string()),
            ..Default::default()
        };
        let query = node(1, "Garment Upper body", attrs.clone());
        let candidate = node(2, "Garment Lower body", attrs);

        let reasons = build_reasons(&query, &candidate, &uniform_importance());
        assert!(!reasons
            .iter()
            .any(|r| r.kind == ReasonKind::SeasonalCoordination));
    }

    #[test]
    fn test_seasonal_reason_for_short_sleeves() {
        let attrs = ItemAttributes {
            sleeve: Some("Short_sleeve".to_string()),
            ..Default::default()
        };
        let query = node(1, "Garment Upper body", attrs.clone());
        let candidate = node(2, "Garment Lower body", attrs);

        let reasons = build_reasons(&query, &candidate, &uniform_importance());
        let seasonal = reasons
            .iter()
            .find(|r| r.kind == ReasonKind::SeasonalCoordination)
            .unwrap();
        assert!(seasonal.description.contains("warmer weather"));
    }

    #[test]
    fn test_high_neckline_phrasing() {
        let attrs = ItemAttributes {
            neckline: Some("High_neck".to_string()),
            ..Default::default()
        };
        let query = node(1, "Garment Upper body", attrs.clone());
        let candidate = node(2, "Garment Lower body", attrs);

        let reasons = build_reasons(&query, &candidate, &uniform_importance());
        let neckline = reasons
            .iter()
            .find(|r| r.kind == ReasonKind::NecklineHarmony)
            .unwrap();
        assert!(neckline.description.contains("sophistication"));
    }
}
