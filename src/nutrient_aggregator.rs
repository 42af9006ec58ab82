use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

use crate::normalizer::IngredientEstimate;
use crate::nutrient_resolver;
use crate::nutrient_store::{NutrientProfile, NutrientStore};

/// Weighted nutrient totals across a whole recipe. Recomputed per
/// enrichment, never persisted.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct AggregateNutrients {
    pub kcal: f64,
    pub protein: f64,
    pub fat: f64,
    pub saturated_fat: f64,
    pub carbs: f64,
    pub sugar: f64,
    pub fiber: f64,
    pub salt: f64,
}

impl AggregateNutrients {
    fn add_scaled(&mut self, profile: &NutrientProfile, weight_factor: f64) {
        self.kcal += profile.kcal * weight_factor;
        self.protein += profile.protein * weight_factor;
        self.fat += profile.fat * weight_factor;
        self.saturated_fat += profile.saturated_fat * weight_factor;
        self.carbs += profile.carbs * weight_factor;
        self.sugar += profile.sugar * weight_factor;
        self.fiber += profile.fiber * weight_factor;
        self.salt += profile.salt * weight_factor;
    }
}

/// Aggregation result plus the slugs of estimates that were absorbed as
/// zero contributions (missing or non-positive weight, or no profile to
/// resolve). Malformed input is a report, not a failure.
#[derive(Debug, Default)]
pub struct AggregationOutcome {
    pub nutrients: AggregateNutrients,
    pub malformed: Vec<String>,
}

/// Element-wise weighted sum over all ingredients:
/// `total.field += profile.field * est_weight_g / 100.0`.
///
/// Every occurrence of a duplicate slug is summed, but its profile is
/// resolved against the store only once per call. An ingredient with a
/// non-positive weight still resolves (and therefore caches) its profile
/// before being absorbed as a zero contribution.
pub async fn aggregate(
    store: &NutrientStore,
    ingredients: &[IngredientEstimate],
) -> Result<AggregationOutcome, sqlx::Error> {
    let mut totals = AggregateNutrients::default();
    let mut malformed = Vec::new();
    let mut resolved_by_slug: HashMap<String, NutrientProfile> = HashMap::new();

    for ingredient in ingredients {
        let profile = match resolved_by_slug.get(&ingredient.id_slug) {
            Some(profile) => Some(profile.clone()),
            None => {
                let profile = nutrient_resolver::resolve(store, ingredient).await?;
                if let Some(profile) = &profile {
                    resolved_by_slug.insert(ingredient.id_slug.clone(), profile.clone());
                }
                profile
            }
        };

        let Some(profile) = profile else {
            warn!(
                slug = %ingredient.id_slug,
                "no cached profile and no per_100g estimate; contributes nothing"
            );
            malformed.push(ingredient.id_slug.clone());
            continue;
        };

        if ingredient.est_weight_g <= 0.0 {
            warn!(
                slug = %ingredient.id_slug,
                est_weight_g = ingredient.est_weight_g,
                "non-positive estimated weight; contributes nothing"
            );
            malformed.push(ingredient.id_slug.clone());
            continue;
        }

        let weight_factor = ingredient.est_weight_g / 100.0;
        totals.add_scaled(&profile, weight_factor);
    }

    Ok(AggregationOutcome {
        nutrients: totals,
        malformed,
    })
}
