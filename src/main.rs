use anyhow::{Context, Result};
use recipe_enrich::cli::parse_args;
use recipe_enrich::enrichment::enrich;
use recipe_enrich::image_synthesis::{GeminiImageSynthesizer, PlaceholderImageSynthesizer};
use recipe_enrich::normalizer::normalize_recipe_text;
use recipe_enrich::nutrient_store::NutrientStore;
use tokio::fs;

const OPENROUTER_KEY_ENV_VAR: &str = "OPENROUTER_API_KEY";
const GEMINI_KEY_ENV_VAR: &str = "GEMINI_API_KEY";
const STYLE_REFERENCE_PATH: &str = "style_reference.png";

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok(); // Load .env file for API keys

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt().with_env_filter(log_level).init();

    let cli_args = parse_args();

    println!("Opening nutrient store at {}", cli_args.database_url);
    let store = NutrientStore::new(&cli_args.database_url)
        .await
        .with_context(|| format!("Failed to open nutrient store at '{}'", cli_args.database_url))?;

    println!("Reading raw recipe content from: {}", cli_args.recipe_file);
    let raw_text = fs::read_to_string(&cli_args.recipe_file)
        .await
        .with_context(|| format!("Failed to read recipe file '{}'", cli_args.recipe_file))?;

    println!("\nNormalizing recipe content via LLM...");
    let recipe = normalize_recipe_text(&raw_text, OPENROUTER_KEY_ENV_VAR)
        .await
        .map_err(|e| anyhow::anyhow!("Recipe normalization failed: {}", e))?;
    println!(
        "Normalized '{}' with {} ingredients.",
        recipe.title,
        recipe.ingredients.len()
    );

    println!("Enriching recipe (image synthesis + nutrient aggregation)...");
    let payload = if cli_args.skip_image {
        enrich(recipe, &store, &PlaceholderImageSynthesizer).await
    } else {
        let synthesizer = GeminiImageSynthesizer::new(GEMINI_KEY_ENV_VAR, STYLE_REFERENCE_PATH);
        enrich(recipe, &store, &synthesizer).await
    }
    .map_err(|e| anyhow::anyhow!("Enrichment failed: {}", e))?;

    println!("\nEnriched recipe:");
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("Failed to serialize enriched payload")?
    );

    Ok(())
}
