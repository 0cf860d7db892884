use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::model::Sentence;

use super::{OracleCredentials, OracleError, RelevanceOracle, build_scoring_prompt};

/// Default Gemini model used for scoring.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
/// Default Gemini API base URL.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Connection settings for [`GeminiOracle`].
#[derive(Clone)]
pub struct GeminiOracleConfig {
    pub base_url: String,
    pub model: String,
    /// Process-level fallback key; request keys take precedence.
    pub api_key: Option<String>,
    pub request_timeout: Duration,
}

impl Default for GeminiOracleConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl fmt::Debug for GeminiOracleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiOracleConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// Gemini-backed relevance oracle.
///
/// API keys travel in the `x-goog-api-key` header, never in URLs, so
/// they cannot leak through request logs.
pub struct GeminiOracle {
    config: GeminiOracleConfig,
    client: reqwest::Client,
}

impl GeminiOracle {
    pub fn new(config: GeminiOracleConfig) -> Result<Self, OracleError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| OracleError::Unavailable {
                reason: format!("failed to build HTTP client: {err}"),
            })?;
        Ok(Self { config, client })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    fn resolve_key<'a>(
        &'a self,
        credentials: &'a OracleCredentials,
    ) -> Result<&'a str, OracleError> {
        credentials
            .api_key()
            .or(self.config.api_key.as_deref())
            .ok_or(OracleError::MissingCredentials)
    }
}

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    /// Zero temperature keeps repeat scoring calls as stable as the
    /// model allows.
    temperature: f64,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[async_trait]
impl RelevanceOracle for GeminiOracle {
    #[instrument(skip_all, fields(model = %self.config.model, sentence_count = sentences.len()))]
    async fn score(
        &self,
        sentences: &[Sentence],
        question: &str,
        credentials: &OracleCredentials,
    ) -> Result<String, OracleError> {
        let key = self.resolve_key(credentials)?;
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: build_scoring_prompt(sentences, question),
                }],
            }],
            generation_config: GenerationConfig { temperature: 0.0 },
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", key)
            .json(&request)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        let payload: GenerateContentResponse =
            response
                .json()
                .await
                .map_err(|err| OracleError::Unavailable {
                    reason: format!("undecodable oracle response: {err}"),
                })?;

        let text: String = payload
            .candidates
            .into_iter()
            .filter_map(|candidate| candidate.content)
            .flat_map(|content| content.parts)
            .map(|part| part.text)
            .collect();

        if text.trim().is_empty() {
            return Err(OracleError::Unavailable {
                reason: "oracle returned an empty response".to_string(),
            });
        }
        debug!(response_chars = text.len(), "Oracle response received");
        Ok(text)
    }
}

fn classify_status(status: StatusCode, body: &str) -> OracleError {
    let reason = format!("oracle returned {status}: {}", truncate_body(body));
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            OracleError::InvalidCredentials { reason }
        }
        StatusCode::TOO_MANY_REQUESTS | StatusCode::REQUEST_TIMEOUT => {
            OracleError::Unavailable { reason }
        }
        _ if status.is_client_error() => OracleError::Rejected { reason },
        _ => OracleError::Unavailable { reason },
    }
}

fn classify_transport_error(err: reqwest::Error) -> OracleError {
    let reason = if err.is_timeout() {
        "oracle request timed out".to_string()
    } else {
        format!("oracle request failed: {err}")
    };
    OracleError::Unavailable { reason }
}

fn truncate_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= MAX_ERROR_BODY_CHARS {
        trimmed.to_string()
    } else {
        let head: String = trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect();
        format!("{head}...")
    }
}
