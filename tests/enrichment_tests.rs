use async_trait::async_trait;
use recipe_enrich::enrichment::{enrich, EnrichmentError};
use recipe_enrich::image_synthesis::{ImageSynthesisError, ImageSynthesizer};
use recipe_enrich::normalizer::{IngredientEstimate, NormalizedRecipe};
use recipe_enrich::nutrient_aggregator::aggregate;
use recipe_enrich::nutrient_resolver::resolve;
use recipe_enrich::nutrient_store::{NutrientProfile, NutrientStore};
use tempfile::TempDir;

async fn open_test_store() -> (NutrientStore, TempDir) {
    let dir = TempDir::new().expect("failed to create temp dir");
    let url = format!("sqlite://{}/nutrients.db", dir.path().display());
    let store = NutrientStore::new(&url)
        .await
        .expect("failed to open test store");
    (store, dir)
}

fn profile(kcal: f64, protein: f64, fiber: f64) -> NutrientProfile {
    NutrientProfile {
        kcal,
        protein,
        fat: 1.0,
        saturated_fat: 0.5,
        carbs: 20.0,
        sugar: 10.0,
        fiber,
        salt: 0.1,
    }
}

fn estimate(slug: &str, est_weight_g: f64, per_100g: Option<NutrientProfile>) -> IngredientEstimate {
    IngredientEstimate {
        name: slug.to_string(),
        id_slug: slug.to_string(),
        search_term: format!("{} raw", slug),
        amount: None,
        unit: None,
        est_weight_g,
        per_100g,
    }
}

fn recipe_with(ingredients: Vec<IngredientEstimate>) -> NormalizedRecipe {
    NormalizedRecipe {
        title: "Test Dish".to_string(),
        ingredients,
        steps: vec!["Combine everything.".to_string()],
        servings: Some(2),
        cooking_time: Some(20),
        tags: vec!["dinner".to_string()],
    }
}

struct StaticImageSynthesizer;

#[async_trait]
impl ImageSynthesizer for StaticImageSynthesizer {
    async fn synthesize(&self, _recipe: &NormalizedRecipe) -> Result<String, ImageSynthesisError> {
        Ok("aW1hZ2UtYnl0ZXM=".to_string())
    }
}

struct FailingImageSynthesizer;

#[async_trait]
impl ImageSynthesizer for FailingImageSynthesizer {
    async fn synthesize(&self, _recipe: &NormalizedRecipe) -> Result<String, ImageSynthesisError> {
        Err(ImageSynthesisError::NoImageReturned)
    }
}

async fn row_count(store: &NutrientStore) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM ingredient_nutrients")
        .fetch_one(store.pool())
        .await
        .expect("count query failed")
}

#[tokio::test]
async fn test_first_write_wins() {
    let (store, _dir) = open_test_store().await;

    let first = resolve(&store, &estimate("banana", 100.0, Some(profile(89.0, 1.1, 2.6))))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.kcal, 89.0);

    // A second resolution with different numbers must return the cached
    // values, not the new estimate.
    let second = resolve(&store, &estimate("banana", 100.0, Some(profile(500.0, 50.0, 0.0))))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(second, first);
    assert_eq!(row_count(&store).await, 1);
}

#[tokio::test]
async fn test_concurrent_resolution_creates_one_row() {
    let (store, _dir) = open_test_store().await;

    let mut handles = Vec::new();
    for i in 0..8 {
        let store = store.clone();
        let est = estimate("olive-oil", 10.0, Some(profile(800.0 + f64::from(i), 0.0, 0.0)));
        handles.push(tokio::spawn(async move {
            resolve(&store, &est).await.unwrap().unwrap()
        }));
    }

    let mut observed = Vec::new();
    for handle in handles {
        observed.push(handle.await.unwrap());
    }

    // Exactly one row, and every caller saw the same stored values.
    assert_eq!(row_count(&store).await, 1);
    let stored = store.get("olive-oil").await.unwrap().unwrap();
    for seen in observed {
        assert_eq!(seen, stored);
    }
}

#[tokio::test]
async fn test_store_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let url = format!("sqlite://{}/nutrients.db", dir.path().display());

    {
        let store = NutrientStore::new(&url).await.unwrap();
        store.put("lentils", &profile(116.0, 9.0, 7.9)).await.unwrap();
    }

    let reopened = NutrientStore::new(&url).await.unwrap();
    let stored = reopened.get("lentils").await.unwrap().unwrap();
    assert_eq!(stored.protein, 9.0);
}

#[tokio::test]
async fn test_weighted_aggregation_law() {
    let (store, _dir) = open_test_store().await;

    // kcal 100 per 100 g at 250 g -> 250 kcal; fiber 2 -> 5.
    let ingredients = vec![estimate("banana", 250.0, Some(profile(100.0, 1.0, 2.0)))];
    let outcome = aggregate(&store, &ingredients).await.unwrap();

    assert_eq!(outcome.nutrients.kcal, 250.0);
    assert_eq!(outcome.nutrients.fiber, 5.0);
    assert_eq!(outcome.nutrients.carbs, 50.0);
    assert!(outcome.malformed.is_empty());
}

#[tokio::test]
async fn test_empty_ingredient_list_aggregates_to_zero() {
    let (store, _dir) = open_test_store().await;
    let outcome = aggregate(&store, &[]).await.unwrap();
    assert_eq!(outcome.nutrients, Default::default());
    assert!(outcome.malformed.is_empty());
}

#[tokio::test]
async fn test_duplicate_slugs_sum_once_per_occurrence() {
    let (store, _dir) = open_test_store().await;

    let ingredients = vec![
        estimate("rice", 100.0, Some(profile(130.0, 2.7, 0.4))),
        estimate("rice", 50.0, Some(profile(999.0, 99.0, 9.0))),
    ];
    let outcome = aggregate(&store, &ingredients).await.unwrap();

    // Both occurrences count, both priced from the first-stored profile.
    assert_eq!(outcome.nutrients.kcal, 130.0 + 65.0);
    assert_eq!(row_count(&store).await, 1);
}

#[tokio::test]
async fn test_cached_profile_overrides_estimate_in_aggregation() {
    let (store, _dir) = open_test_store().await;
    store.put("banana", &profile(89.0, 1.1, 2.6)).await.unwrap();

    let ingredients = vec![estimate("banana", 100.0, Some(profile(1000.0, 0.0, 0.0)))];
    let outcome = aggregate(&store, &ingredients).await.unwrap();
    assert_eq!(outcome.nutrients.kcal, 89.0);
}

#[tokio::test]
async fn test_zero_weight_contributes_nothing_but_still_caches() {
    let (store, _dir) = open_test_store().await;

    let ingredients = vec![estimate("salt", 0.0, Some(profile(0.0, 0.0, 0.0)))];
    let outcome = aggregate(&store, &ingredients).await.unwrap();

    assert_eq!(outcome.nutrients, Default::default());
    assert_eq!(outcome.malformed, vec!["salt".to_string()]);
    // The profile is useful beyond this request, so it is stored anyway.
    assert!(store.get("salt").await.unwrap().is_some());
}

#[tokio::test]
async fn test_missing_per_100g_is_reported_not_fatal() {
    let (store, _dir) = open_test_store().await;

    let ingredients = vec![
        estimate("mystery-spice", 5.0, None),
        estimate("banana", 100.0, Some(profile(89.0, 1.1, 2.6))),
    ];
    let outcome = aggregate(&store, &ingredients).await.unwrap();

    assert_eq!(outcome.nutrients.kcal, 89.0);
    assert_eq!(outcome.malformed, vec!["mystery-spice".to_string()]);
    assert!(store.get("mystery-spice").await.unwrap().is_none());
}

#[tokio::test]
async fn test_enrich_assembles_full_payload() {
    let (store, _dir) = open_test_store().await;

    // 8 g protein per 100 kcal -> "high protein"; 20 min -> "< 30min".
    let recipe = recipe_with(vec![estimate(
        "chicken-breast",
        100.0,
        Some(profile(100.0, 8.0, 0.0)),
    )]);

    let payload = enrich(recipe, &store, &StaticImageSynthesizer).await.unwrap();

    assert_eq!(payload.title, "Test Dish");
    assert_eq!(payload.image, "aW1hZ2UtYnl0ZXM=");
    assert_eq!(payload.nutrients.kcal, 100.0);
    assert_eq!(payload.nutrients.protein, 8.0);
    assert_eq!(
        payload.tags,
        vec![
            "dinner".to_string(),
            "high protein".to_string(),
            "< 30min".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_enrich_fails_fast_on_image_failure() {
    let (store, _dir) = open_test_store().await;

    let recipe = recipe_with(vec![estimate("banana", 100.0, Some(profile(89.0, 1.1, 2.6)))]);
    let result = enrich(recipe, &store, &FailingImageSynthesizer).await;

    assert!(matches!(result, Err(EnrichmentError::ImageSynthesis(_))));
}

#[tokio::test]
async fn test_enrich_fails_fast_on_store_failure() {
    let (store, _dir) = open_test_store().await;
    store.pool().close().await;

    let recipe = recipe_with(vec![estimate("banana", 100.0, Some(profile(89.0, 1.1, 2.6)))]);
    let result = enrich(recipe, &store, &StaticImageSynthesizer).await;

    // The image branch would succeed; the nutrient branch failing must still
    // surface as a single failure with no payload.
    assert!(matches!(result, Err(EnrichmentError::Store(_))));
}

#[tokio::test]
#[ignore]
async fn test_live_normalization_round_trip() {
    dotenv::dotenv().ok();
    if std::env::var("OPENROUTER_API_KEY").is_err() {
        println!("Skipping test_live_normalization_round_trip: OPENROUTER_API_KEY not set.");
        return;
    }

    let raw_text = "Grandma's best banana pancakes! Mash 2 ripe bananas, whisk with 2 eggs \
                    and 100 g flour, fry in butter for about 10 minutes. Serves 2.";
    let recipe = recipe_enrich::normalizer::normalize_recipe_text(raw_text, "OPENROUTER_API_KEY")
        .await
        .expect("normalization failed");

    assert!(!recipe.title.is_empty());
    assert!(!recipe.ingredients.is_empty());
    for ingredient in &recipe.ingredients {
        assert!(!ingredient.id_slug.is_empty());
    }
}
