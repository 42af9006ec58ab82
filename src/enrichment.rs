use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use tracing::{debug, warn};

use crate::image_synthesis::{ImageSynthesisError, ImageSynthesizer};
use crate::normalizer::{IngredientEstimate, NormalizedRecipe};
use crate::nutrient_aggregator::{self, AggregateNutrients};
use crate::tag_deriver;
use crate::nutrient_store::NutrientStore;

/// The fully enriched recipe: the normalized structure plus the synthesized
/// image and aggregated nutrients. Built once per ingestion request and
/// handed to the downstream consumer; the core keeps no other state.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EnrichedRecipePayload {
    pub title: String,
    pub servings: Option<u32>,
    pub ingredients: Vec<IngredientEstimate>,
    pub steps: Vec<String>,
    pub cooking_time: Option<u32>,
    pub tags: Vec<String>,
    /// Base64-encoded image bytes, opaque to the core.
    pub image: String,
    pub nutrients: AggregateNutrients,
}

#[derive(Debug)]
pub enum EnrichmentError {
    Store(sqlx::Error),
    ImageSynthesis(ImageSynthesisError),
}

impl fmt::Display for EnrichmentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnrichmentError::Store(err) => write!(f, "Nutrient store unavailable: {}", err),
            EnrichmentError::ImageSynthesis(err) => write!(f, "Image synthesis failed: {}", err),
        }
    }
}

impl Error for EnrichmentError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            EnrichmentError::Store(err) => Some(err),
            EnrichmentError::ImageSynthesis(err) => Some(err),
        }
    }
}

impl From<sqlx::Error> for EnrichmentError {
    fn from(err: sqlx::Error) -> Self {
        EnrichmentError::Store(err)
    }
}

impl From<ImageSynthesisError> for EnrichmentError {
    fn from(err: ImageSynthesisError) -> Self {
        EnrichmentError::ImageSynthesis(err)
    }
}

/// Enrich a normalized recipe: synthesize the illustration and aggregate
/// the nutrients concurrently, then assemble the payload and append derived
/// tags.
///
/// Both branches are cooperative tasks on the caller's runtime; the first
/// failure drops the still-pending branch and surfaces as the single
/// enrichment error, so a half-filled payload can never escape. Retries are
/// the caller's responsibility.
pub async fn enrich<S>(
    recipe: NormalizedRecipe,
    store: &NutrientStore,
    synthesizer: &S,
) -> Result<EnrichedRecipePayload, EnrichmentError>
where
    S: ImageSynthesizer + ?Sized,
{
    debug!(title = %recipe.title, state = "awaiting_concurrent_tasks", "enrichment started");

    let (image, aggregation) = tokio::try_join!(
        async {
            synthesizer
                .synthesize(&recipe)
                .await
                .map_err(EnrichmentError::from)
        },
        async {
            nutrient_aggregator::aggregate(store, &recipe.ingredients)
                .await
                .map_err(EnrichmentError::from)
        },
    )?;

    debug!(state = "assembling", "concurrent branches joined");
    if !aggregation.malformed.is_empty() {
        warn!(
            title = %recipe.title,
            malformed_slugs = ?aggregation.malformed,
            "some ingredient estimates were malformed and contributed nothing"
        );
    }

    let tags = tag_deriver::derive_tags(&recipe.tags, &aggregation.nutrients, recipe.cooking_time);

    let payload = EnrichedRecipePayload {
        title: recipe.title,
        servings: recipe.servings,
        ingredients: recipe.ingredients,
        steps: recipe.steps,
        cooking_time: recipe.cooking_time,
        tags,
        image,
        nutrients: aggregation.nutrients,
    };

    debug!(title = %payload.title, state = "complete", "enrichment finished");
    Ok(payload)
}
