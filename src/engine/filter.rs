use super::graph::ItemNode;

/// Product-group pairings that never belong in one outfit, checked in both
/// orders: a full-body garment already covers the upper and lower body.
const INCOMPATIBLE_GROUPS: [(&str, &str); 4] = [
    ("Garment Full body", "Garment Upper body"),
    ("Garment Full body", "Garment Lower body"),
    ("Garment Upper body", "Garment Full body"),
    ("Garment Lower body", "Garment Full body"),
];

/// Gender codes for the two mutually exclusive adult segments. Any other
/// code (children, divided/neutral) pairs freely with everything.
const EXCLUSIVE_GENDER_CODES: [i32; 2] = [1, 2];

/// Candidate indices plus per-rule rejection counters for logging
#[derive(Debug, Default, PartialEq)]
pub struct FilterOutcome {
    pub indices: Vec<usize>,
    pub rejected_gender: usize,
    pub rejected_group_conflict: usize,
    pub rejected_same_group: usize,
}

/// Rule-based pre-filter over the full item set.
///
/// Pure function: returns the indices eligible for scoring against the query
/// item, in item-table order. The query item itself is always excluded. An
/// empty result is a valid outcome, never an error.
pub fn filter_candidates(query_index: usize, items: &[ItemNode]) -> FilterOutcome {
    let mut outcome = FilterOutcome::default();
    let query = &items[query_index];

    for (index, candidate) in items.iter().enumerate() {
        if index == query_index {
            continue;
        }

        if EXCLUSIVE_GENDER_CODES.contains(&query.gender_group)
            && EXCLUSIVE_GENDER_CODES.contains(&candidate.gender_group)
            && query.gender_group != candidate.gender_group
        {
            outcome.rejected_gender += 1;
            continue;
        }

        let pairing = (query.product_group.as_str(), candidate.product_group.as_str());
        if INCOMPATIBLE_GROUPS.contains(&pairing) {
            outcome.rejected_group_conflict += 1;
            continue;
        }

        if candidate.product_group == query.product_group {
            outcome.rejected_same_group += 1;
            continue;
        }

        outcome.indices.push(index);
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ItemAttributes;

    fn item(article_id: u64, product_group: &str, gender_group: i32) -> ItemNode {
        ItemNode {
            article_id,
            name: format!("Item {}", article_id),
            product_group: product_group.to_string(),
            gender_group,
            gender_name: String::new(),
            attributes: ItemAttributes::default(),
        }
    }

    #[test]
    fn test_query_item_never_in_candidates() {
        let items = vec![
            item(1, "Garment Upper body", 1),
            item(2, "Garment Lower body", 1),
        ];
        for query in 0..items.len() {
            let outcome = filter_candidates(query, &items);
            assert!(!outcome.indices.contains(&query));
        }
    }

    #[test]
    fn test_exclusive_adult_segments_never_mix() {
        let items = vec![
            item(1, "Garment Upper body", 1),
            item(2, "Garment Lower body", 2),
        ];
        let outcome = filter_candidates(0, &items);
        assert!(outcome.indices.is_empty());
        assert_eq!(outcome.rejected_gender, 1);

        let reverse = filter_candidates(1, &items);
        assert!(reverse.indices.is_empty());
        assert_eq!(reverse.rejected_gender, 1);
    }

    #[test]
    fn test_neutral_segment_pairs_with_both_adult_segments() {
        let items = vec![
            item(1, "Garment Upper body", 3),
            item(2, "Garment Lower body", 1),
            item(3, "Accessories", 2),
        ];
        let outcome = filter_candidates(0, &items);
        assert_eq!(outcome.indices, vec![1, 2]);
        assert_eq!(outcome.rejected_gender, 0);
    }

    #[test]
    fn test_full_body_rejects_upper_and_lower_body() {
        let items = vec![
            item(1, "Garment Full body", 1),
            item(2, "Garment Upper body", 1),
            item(3, "Garment Lower body", 1),
            item(4, "Accessories", 1),
        ];
        let outcome = filter_candidates(0, &items);
        assert_eq!(outcome.indices, vec![3]);
        assert_eq!(outcome.rejected_group_conflict, 2);

        // And in the other order
        let reverse = filter_candidates(1, &items);
        assert!(!reverse.indices.contains(&0));
    }

    #[test]
    fn test_same_product_group_rejected() {
        let items = vec![
            item(1, "Garment Upper body", 1),
            item(2, "Garment Upper body", 1),
            item(3, "Garment Lower body", 1),
        ];
        let outcome = filter_candidates(0, &items);
        assert_eq!(outcome.indices, vec![2]);
        assert_eq!(outcome.rejected_same_group, 1);
    }

    #[test]
    fn test_single_item_catalog_yields_empty_set() {
        let items = vec![item(1, "Garment Upper body", 1)];
        let outcome = filter_candidates(0, &items);
        assert!(outcome.indices.is_empty());
    }
}
