use serde::{Deserialize, Serialize};

use crate::api_connection::connection::ApiConnectionError;
use crate::api_connection::endpoints::{
    ChatCompletionRequest, ChatMessage, Provider, ResponseFormat,
};
use crate::nutrient_store::NutrientProfile;

const NORMALIZER_MODEL: &str = "qwen/qwen3-32b";

/// One ingredient as estimated by the normalizer. Untrusted input: the
/// weight and per-100 g numbers are model estimates, and `est_weight_g` or
/// `per_100g` may be missing entirely. A malformed estimate must survive
/// deserialization so the aggregator can absorb it as a zero contribution
/// instead of the whole recipe failing.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct IngredientEstimate {
    pub name: String,
    pub id_slug: String,
    #[serde(default)]
    pub search_term: String,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub est_weight_g: f64,
    #[serde(default)]
    pub per_100g: Option<NutrientProfile>,
}

/// The structured recipe produced by the normalizer, before enrichment.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NormalizedRecipe {
    pub title: String,
    pub ingredients: Vec<IngredientEstimate>,
    pub steps: Vec<String>,
    #[serde(default)]
    pub servings: Option<u32>,
    #[serde(default)]
    pub cooking_time: Option<u32>,
    #[serde(default)]
    pub tags: Vec<String>,
}

fn build_system_prompt() -> String {
    "/no_thinking
You are a professional recipe editor for a cooking app. Your task is to turn unstructured recipe text (scraped webpage content or a video description plus audio transcript) into a clean, standardized recipe record.

STYLE GUIDE (follow strictly):

1. LANGUAGE:
- Write every step in the imperative.
- Never use passive voice.

2. QUANTITIES:
- Convert fractions to decimals (1/2 -> 0.5).
- Use only these units: g, kg, ml, l, tbsp, tsp, pinch, piece, bunch, slice, leaf
- If no unit is given, leave it null.

3. CONTENT:
- Remove personal anecdotes and brand or product names.
- Keep ingredient names short; drop irrelevant extras.
- Merge steps that logically belong together.
- Estimate the cooking time in minutes, rounded to 5-minute steps.

4. TITLE:
- Give the recipe a factual, neutral title describing the dish type. Strip adjectives like \"grandma's favourite\" or \"super tasty\". Keep proper dish names (e.g. \"Spaghetti alla Carbonara\").

5. NUTRIENT ESTIMATES (per ingredient):
- \"id_slug\": a stable lowercase hyphenated English identifier for the ingredient kind (e.g. \"olive-oil\", \"chicken-breast\"). The same kind of ingredient must always get the same slug.
- \"search_term\": a short English search phrase for the ingredient.
- \"est_weight_g\": your best estimate of the consumed weight in grams (must be > 0).
- \"per_100g\": estimated nutrient values per 100 g of the raw ingredient, an object with exactly these numeric fields: kcal, protein, fat, saturated_fat, carbs, sugar, fiber, salt.

OUTPUT FORMAT:
Return only a valid JSON object with exactly these fields:

title: string
servings: number or null
ingredients: list of objects with name, id_slug, search_term, amount (number or null), unit (string or null), est_weight_g, per_100g
steps: list of strings
cooking_time: number (minutes)
tags: list of strings (cuisine or dish-type keywords)

IMPORTANT:
- No markdown. No code fences. No explanations. Only raw JSON.
- Your response must start with { and end with }.
"
    .to_string()
}

/// Strip ```json / ``` fences the model sometimes wraps its output in.
fn strip_markdown_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let without_prefix = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_prefix
        .strip_suffix("```")
        .unwrap_or(without_prefix)
        .trim()
}

/// Send raw scraped/transcribed recipe text to the LLM and deserialize the
/// reply into the typed recipe record. Schema validation happens here, at
/// the boundary where the normalizer's output enters the core.
pub async fn normalize_recipe_text(
    raw_text: &str,
    api_key_env_var: &str,
) -> Result<NormalizedRecipe, ApiConnectionError> {
    let provider = Provider::openrouter(api_key_env_var);

    let request = ChatCompletionRequest {
        model: NORMALIZER_MODEL.to_string(),
        messages: vec![
            ChatMessage {
                role: "system".to_string(),
                content: build_system_prompt(),
            },
            ChatMessage {
                role: "user".to_string(),
                content: raw_text.to_string(),
            },
        ],
        response_format: Some(ResponseFormat {
            format_type: "json_object".to_string(),
        }),
        temperature: Some(0.1),
        max_tokens: Some(4096),
    };

    let response = provider.call_chat_completion(request).await?;

    let choice = response
        .choices
        .first()
        .ok_or_else(|| ApiConnectionError::ApiError {
            status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            error_body: "No response choices received from API".to_string(),
        })?;

    let content = strip_markdown_fences(&choice.message.content);
    if content.is_empty() {
        return Err(ApiConnectionError::ApiError {
            status: reqwest::StatusCode::NO_CONTENT,
            error_body: "API returned empty content after stripping markdown.".to_string(),
        });
    }

    serde_json::from_str(content).map_err(ApiConnectionError::SerializationError)
}
