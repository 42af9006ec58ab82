use crate::normalizer::IngredientEstimate;
use crate::nutrient_store::{NutrientProfile, NutrientStore};

/// Resolve one ingredient estimate against the nutrient cache.
///
/// A cached profile is authoritative: on a hit the estimate's own `per_100g`
/// values are discarded. On a miss the estimate is persisted and the value
/// that ends up stored is returned, so concurrent resolutions of the same
/// never-seen slug all observe the single winning row. An estimate with no
/// `per_100g` on a miss resolves to nothing; there is nothing to cache.
pub async fn resolve(
    store: &NutrientStore,
    estimate: &IngredientEstimate,
) -> Result<Option<NutrientProfile>, sqlx::Error> {
    if let Some(cached) = store.get(&estimate.id_slug).await? {
        return Ok(Some(cached));
    }

    match &estimate.per_100g {
        Some(profile) => Ok(Some(store.put(&estimate.id_slug, profile).await?)),
        None => Ok(None),
    }
}
