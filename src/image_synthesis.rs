use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use std::error::Error;
use std::fmt;
use std::path::PathBuf;

use crate::api_connection::connection::ApiConnectionError;
use crate::api_connection::endpoints::{Content, ContentPart, GenerateContentRequest, Provider};
use crate::normalizer::NormalizedRecipe;

const IMAGE_MODEL: &str = "gemini-2.5-flash-image";

#[derive(Debug)]
pub enum ImageSynthesisError {
    Api(ApiConnectionError),
    StyleReference(std::io::Error),
    NoImageReturned,
}

impl fmt::Display for ImageSynthesisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageSynthesisError::Api(err) => write!(f, "Image model call failed: {}", err),
            ImageSynthesisError::StyleReference(err) => {
                write!(f, "Failed to read style reference image: {}", err)
            }
            ImageSynthesisError::NoImageReturned => {
                write!(f, "Image model returned no image part")
            }
        }
    }
}

impl Error for ImageSynthesisError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ImageSynthesisError::Api(err) => Some(err),
            ImageSynthesisError::StyleReference(err) => Some(err),
            ImageSynthesisError::NoImageReturned => None,
        }
    }
}

impl From<ApiConnectionError> for ImageSynthesisError {
    fn from(err: ApiConnectionError) -> Self {
        ImageSynthesisError::Api(err)
    }
}

/// Seam for the external image model. The orchestrator only sees this
/// trait; tests substitute their own implementations.
#[async_trait]
pub trait ImageSynthesizer: Send + Sync {
    /// Returns the synthesized illustration as base64-encoded image bytes.
    async fn synthesize(&self, recipe: &NormalizedRecipe) -> Result<String, ImageSynthesisError>;
}

/// Production synthesizer: Gemini `generateContent` with a fixed style
/// reference photo so every recipe illustration looks like it was shot in
/// the same studio session.
pub struct GeminiImageSynthesizer {
    provider: Provider,
    style_reference_path: PathBuf,
}

impl GeminiImageSynthesizer {
    pub fn new(api_key_env_var: &str, style_reference_path: impl Into<PathBuf>) -> Self {
        Self {
            provider: Provider::gemini(api_key_env_var),
            style_reference_path: style_reference_path.into(),
        }
    }

    fn build_prompt(recipe: &NormalizedRecipe) -> String {
        let ingredient_names: Vec<&str> = recipe
            .ingredients
            .iter()
            .map(|i| i.name.as_str())
            .collect();

        format!(
            "Recipe: {title}. Ingredients: {ingredients}. Steps: {steps}.
Create an image in the identical studio style as the reference image, showing food that matches this recipe.
Keep the same background (same table, same surface, same colour and texture).
Lighting, camera position, perspective and mood must look as if the photo was taken in the same studio during the same session.
Keep the main plate centred at exactly the same position as in the reference image, and keep format and resolution identical.
Plates may be rearranged, added or removed as long as they belong to the same tableware series; the main plate never moves.
Only the dish in focus changes. Background, lighting style and overall aesthetic stay consistent.",
            title = recipe.title,
            ingredients = ingredient_names.join(", "),
            steps = recipe.steps.join(" ")
        )
    }
}

#[async_trait]
impl ImageSynthesizer for GeminiImageSynthesizer {
    async fn synthesize(&self, recipe: &NormalizedRecipe) -> Result<String, ImageSynthesisError> {
        let reference_bytes = tokio::fs::read(&self.style_reference_path)
            .await
            .map_err(ImageSynthesisError::StyleReference)?;

        let request = GenerateContentRequest {
            contents: vec![Content {
                role: None,
                parts: vec![
                    ContentPart::text(Self::build_prompt(recipe)),
                    ContentPart::inline_data("image/png", BASE64.encode(reference_bytes)),
                ],
            }],
        };

        let response = self
            .provider
            .call_generate_content(IMAGE_MODEL, request)
            .await?;

        response
            .first_inline_image()
            .map(|image| image.data.clone())
            .ok_or(ImageSynthesisError::NoImageReturned)
    }
}

/// Offline stand-in used by `--skip-image`: a 1x1 PNG, base64-encoded.
pub struct PlaceholderImageSynthesizer;

const PLACEHOLDER_PNG_BASE64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

#[async_trait]
impl ImageSynthesizer for PlaceholderImageSynthesizer {
    async fn synthesize(&self, _recipe: &NormalizedRecipe) -> Result<String, ImageSynthesisError> {
        Ok(PLACEHOLDER_PNG_BASE64.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::IngredientEstimate;

    fn sample_recipe() -> NormalizedRecipe {
        NormalizedRecipe {
            title: "Tomato Soup".to_string(),
            ingredients: vec![IngredientEstimate {
                name: "Tomato".to_string(),
                id_slug: "tomato".to_string(),
                search_term: "tomato raw".to_string(),
                amount: Some(4.0),
                unit: Some("piece".to_string()),
                est_weight_g: 400.0,
                per_100g: None,
            }],
            steps: vec!["Simmer the tomatoes.".to_string()],
            servings: Some(2),
            cooking_time: Some(25),
            tags: vec![],
        }
    }

    #[test]
    fn prompt_contains_recipe_material() {
        let prompt = GeminiImageSynthesizer::build_prompt(&sample_recipe());
        assert!(prompt.contains("Tomato Soup"));
        assert!(prompt.contains("Tomato"));
        assert!(prompt.contains("Simmer the tomatoes."));
    }

    #[tokio::test]
    async fn missing_style_reference_is_reported() {
        let synthesizer =
            GeminiImageSynthesizer::new("GEMINI_API_KEY", "this_file_does_not_exist.png");
        let result = synthesizer.synthesize(&sample_recipe()).await;
        assert!(matches!(
            result,
            Err(ImageSynthesisError::StyleReference(_))
        ));
    }

    #[tokio::test]
    async fn placeholder_returns_decodable_png() {
        let image = PlaceholderImageSynthesizer
            .synthesize(&sample_recipe())
            .await
            .unwrap();
        let bytes = BASE64.decode(image).unwrap();
        assert_eq!(bytes[1..4], *b"PNG");
    }
}
