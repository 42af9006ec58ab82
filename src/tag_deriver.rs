use crate::nutrient_aggregator::AggregateNutrients;

const HIGH_PROTEIN_TAG: &str = "high protein";
const QUICK_TAG: &str = "< 30min";

/// High-protein threshold: protein per kcal, as a percentage.
const HIGH_PROTEIN_RATIO_PCT: f64 = 7.0;
const QUICK_COOKING_TIME_MIN: u32 = 30;
/// A recipe without a cooking time counts as "not fast".
const MISSING_COOKING_TIME: u32 = 999;

/// Derive descriptive tags from the aggregated nutrients and cooking time,
/// appended after the upstream tags. Each rule appends at most one tag;
/// duplicates with upstream tags are allowed. Pure and deterministic.
pub fn derive_tags(
    base_tags: &[String],
    aggregate: &AggregateNutrients,
    cooking_time: Option<u32>,
) -> Vec<String> {
    let mut tags = base_tags.to_vec();

    if aggregate.kcal > 0.0
        && (aggregate.protein / aggregate.kcal) * 100.0 > HIGH_PROTEIN_RATIO_PCT
    {
        tags.push(HIGH_PROTEIN_TAG.to_string());
    }

    if cooking_time.unwrap_or(MISSING_COOKING_TIME) <= QUICK_COOKING_TIME_MIN {
        tags.push(QUICK_TAG.to_string());
    }

    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aggregate_with(kcal: f64, protein: f64) -> AggregateNutrients {
        AggregateNutrients {
            kcal,
            protein,
            ..Default::default()
        }
    }

    #[test]
    fn test_high_protein_above_threshold() {
        // 8 g protein per 100 kcal -> ratio 8% > 7%
        let tags = derive_tags(&[], &aggregate_with(100.0, 8.0), None);
        assert_eq!(tags, vec!["high protein".to_string()]);
    }

    #[test]
    fn test_high_protein_below_threshold() {
        // 6% ratio stays untagged
        let tags = derive_tags(&[], &aggregate_with(100.0, 6.0), None);
        assert!(tags.is_empty());
    }

    #[test]
    fn test_no_protein_tag_for_zero_kcal() {
        let tags = derive_tags(&[], &aggregate_with(0.0, 10.0), None);
        assert!(tags.is_empty());
    }

    #[test]
    fn test_quick_tag_at_boundary() {
        let tags = derive_tags(&[], &aggregate_with(0.0, 0.0), Some(30));
        assert_eq!(tags, vec!["< 30min".to_string()]);

        let tags = derive_tags(&[], &aggregate_with(0.0, 0.0), Some(31));
        assert!(tags.is_empty());
    }

    #[test]
    fn test_missing_cooking_time_is_not_fast() {
        let tags = derive_tags(&[], &aggregate_with(0.0, 0.0), None);
        assert!(tags.is_empty());
    }

    #[test]
    fn test_base_tags_kept_and_duplicates_allowed() {
        let base = vec!["high protein".to_string(), "dinner".to_string()];
        let tags = derive_tags(&base, &aggregate_with(100.0, 8.0), Some(20));
        assert_eq!(
            tags,
            vec![
                "high protein".to_string(),
                "dinner".to_string(),
                "high protein".to_string(),
                "< 30min".to_string(),
            ]
        );
    }
}
