use async_trait::async_trait;
use log::{ debug, info };
use serde::{ Deserialize, Serialize };

use super::{ ChatGateway, ChatSession, GatewayError };
use crate::llm::{ GenerationConfig, LlmConfig };
use crate::models::chat::{ Role, Turn };

/// One message in the shape the Gemini API expects: `{ role, parts: [{ text }] }`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GeminiContent {
    pub role: String,
    pub parts: Vec<GeminiPart>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GeminiPart {
    pub text: String,
}

impl GeminiContent {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role: role.as_str().to_string(),
            parts: vec![GeminiPart { text: text.into() }],
        }
    }
}

impl From<&Turn> for GeminiContent {
    fn from(turn: &Turn) -> Self {
        Self::new(turn.role, turn.text.clone())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: &'a [GeminiContent],
    generation_config: &'a GenerationConfig,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleResponse {
    #[serde(default)]
    candidates: Vec<GoogleCandidate>,
    prompt_feedback: Option<GooglePromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleCandidate {
    content: Option<GoogleContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct GoogleContent {
    #[serde(default)]
    parts: Vec<GooglePart>,
}

#[derive(Deserialize)]
struct GooglePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GooglePromptFeedback {
    block_reason: Option<String>,
}

fn extract_answer(resp: GoogleResponse) -> Result<String, GatewayError> {
    let candidate = match resp.candidates.into_iter().next() {
        Some(c) => c,
        None => {
            let reason = resp.prompt_feedback
                .and_then(|f| f.block_reason)
                .unwrap_or_else(|| "no candidates".to_string());
            return Err(GatewayError::EmptyResponse(reason));
        }
    };

    let text: String = candidate.content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        let reason = candidate.finish_reason.unwrap_or_else(|| "empty content".to_string());
        return Err(GatewayError::EmptyResponse(reason));
    }
    Ok(text)
}

pub struct GeminiChatClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiChatClient {
    pub fn new(
        api_key: String,
        model: String,
        base_url: String,
        timeout: Option<std::time::Duration>
    ) -> Result<Self, GatewayError> {
        if api_key.trim().is_empty() {
            return Err(GatewayError::Config("Google API key is required for GeminiChatClient".into()));
        }

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| GatewayError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { http, api_key, model, base_url })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, GatewayError> {
        Self::new(
            config.api_key.clone(),
            config.completion_model.clone(),
            config.base_url.clone(),
            config.timeout
        )
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url.trim_end_matches('/'), self.model)
    }
}

impl ChatGateway for GeminiChatClient {
    fn start_session(&self, config: &GenerationConfig, history: &[Turn]) -> Box<dyn ChatSession> {
        Box::new(GeminiSession {
            http: self.http.clone(),
            endpoint: self.endpoint(),
            api_key: self.api_key.clone(),
            generation: config.clone(),
            contents: history.iter().map(GeminiContent::from).collect(),
        })
    }

    fn get_model(&self) -> String {
        self.model.clone()
    }
}

pub struct GeminiSession {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    generation: GenerationConfig,
    contents: Vec<GeminiContent>,
}

impl GeminiSession {
    async fn generate(&self) -> Result<String, GatewayError> {
        let payload = GenerateContentRequest {
            contents: &self.contents,
            generation_config: &self.generation,
        };
        info!(
            "GeminiSession::send() → endpoint={} contents={}",
            self.endpoint,
            self.contents.len()
        );

        let resp = self.http
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&payload)
            .send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GatewayError::Provider { status: status.as_u16(), body });
        }

        let parsed: GoogleResponse = resp
            .json().await
            .map_err(|e| GatewayError::InvalidPayload(e.to_string()))?;
        extract_answer(parsed)
    }
}

#[async_trait]
impl ChatSession for GeminiSession {
    async fn send(&mut self, prompt: &str) -> Result<String, GatewayError> {
        self.contents.push(GeminiContent::new(Role::User, prompt));
        match self.generate().await {
            Ok(answer) => {
                debug!("Gemini answered with {} bytes", answer.len());
                self.contents.push(GeminiContent::new(Role::Model, answer.clone()));
                Ok(answer)
            }
            Err(e) => {
                self.contents.pop();
                Err(e)
            }
        }
    }
}
