use dotenv::dotenv;
use reqwest::Client;
use std::env;
use std::error::Error;
use std::fmt;

use super::endpoints::{
    ChatCompletionRequest, ChatCompletionResponse, GenerateContentRequest,
    GenerateContentResponse, Provider,
};

const OPENROUTER_CHAT_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Debug)]
pub enum ApiConnectionError {
    MissingApiKey(String),
    NetworkError(reqwest::Error),
    SerializationError(serde_json::Error),
    ApiError {
        status: reqwest::StatusCode,
        error_body: String,
    },
    UnsupportedProvider(String),
}

impl fmt::Display for ApiConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiConnectionError::MissingApiKey(key_name) => {
                write!(f, "API key not found in environment: {}", key_name)
            }
            ApiConnectionError::NetworkError(err) => write!(f, "Network error: {}", err),
            ApiConnectionError::SerializationError(err) => {
                write!(f, "Serialization error: {}", err)
            }
            ApiConnectionError::ApiError { status, error_body } => {
                write!(f, "API error {}: {}", status, error_body)
            }
            ApiConnectionError::UnsupportedProvider(provider_name) => {
                write!(f, "Unsupported provider: {}", provider_name)
            }
        }
    }
}

impl Error for ApiConnectionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ApiConnectionError::NetworkError(err) => Some(err),
            ApiConnectionError::SerializationError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiConnectionError {
    fn from(err: reqwest::Error) -> Self {
        ApiConnectionError::NetworkError(err)
    }
}

impl From<serde_json::Error> for ApiConnectionError {
    fn from(err: serde_json::Error) -> Self {
        ApiConnectionError::SerializationError(err)
    }
}

fn resolve_api_key(api_key_env_var: &str) -> Result<String, ApiConnectionError> {
    dotenv().ok();
    env::var(api_key_env_var)
        .map_err(|_| ApiConnectionError::MissingApiKey(api_key_env_var.to_string()))
}

impl Provider {
    pub fn openrouter(api_key_env_var: &str) -> Self {
        Self::OpenRouter {
            api_key_env_var: api_key_env_var.to_string(),
        }
    }

    pub fn gemini(api_key_env_var: &str) -> Self {
        Self::Gemini {
            api_key_env_var: api_key_env_var.to_string(),
        }
    }

    /// Chat completion call used by the recipe normalizer. Only the
    /// OpenRouter provider speaks this endpoint.
    pub async fn call_chat_completion(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, ApiConnectionError> {
        match self {
            Provider::OpenRouter { api_key_env_var } => {
                let actual_api_key = resolve_api_key(api_key_env_var)?;

                let client = Client::new();
                let site_url =
                    env::var("SITE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
                let app_name =
                    env::var("APP_NAME").unwrap_or_else(|_| "RecipeEnrich".to_string());

                let response = client
                    .post(OPENROUTER_CHAT_URL)
                    .bearer_auth(actual_api_key)
                    .header("Content-Type", "application/json")
                    .header("HTTP-Referer", site_url)
                    .header("X-Title", app_name)
                    .json(&request)
                    .send()
                    .await?;

                if response.status().is_success() {
                    let chat_response = response.json::<ChatCompletionResponse>().await?;
                    Ok(chat_response)
                } else {
                    let status = response.status();
                    let error_body = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Failed to read error body".to_string());
                    Err(ApiConnectionError::ApiError { status, error_body })
                }
            }
            Provider::Gemini { .. } => Err(ApiConnectionError::UnsupportedProvider(
                "Gemini does not expose the chat completions endpoint".to_string(),
            )),
        }
    }

    /// generateContent call used by image synthesis. Only the Gemini
    /// provider speaks this endpoint.
    pub async fn call_generate_content(
        &self,
        model: &str,
        request: GenerateContentRequest,
    ) -> Result<GenerateContentResponse, ApiConnectionError> {
        match self {
            Provider::Gemini { api_key_env_var } => {
                let actual_api_key = resolve_api_key(api_key_env_var)?;

                let client = Client::new();
                let url = format!("{}/{}:generateContent", GEMINI_BASE_URL, model);

                let response = client
                    .post(&url)
                    .header("x-goog-api-key", actual_api_key)
                    .header("Content-Type", "application/json")
                    .json(&request)
                    .send()
                    .await?;

                if response.status().is_success() {
                    let generate_response = response.json::<GenerateContentResponse>().await?;
                    Ok(generate_response)
                } else {
                    let status = response.status();
                    let error_body = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Failed to read error body".to_string());
                    Err(ApiConnectionError::ApiError { status, error_body })
                }
            }
            Provider::OpenRouter { .. } => Err(ApiConnectionError::UnsupportedProvider(
                "OpenRouter does not expose the generateContent endpoint".to_string(),
            )),
        }
    }
}
