use anyhow::Context;
use async_trait::async_trait;
use axum::{extract::State, routing::get, Json, Router};
use rally_core::advisor::Advisor;
use rally_shared::Masked;
use rally_store::app_config::AdvisorConfig;
use serde::Serialize;
use serde_json::{json, Value};

use crate::{error::AppError, state::AppState};

const DEFAULT_MODEL: &str = "gemini-2.0-flash";

const SYSTEM_INSTRUCTION: &str =
    "You help run a community badminton club. Answers are practical, light-hearted and formatted as a Markdown list.";

#[derive(Debug, Serialize)]
pub struct AdviceResponse {
    pub advice: String,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/advice", get(advice))
}

async fn advice(State(state): State<AppState>) -> Result<Json<AdviceResponse>, AppError> {
    Ok(Json(AdviceResponse { advice: state.service.advice().await? }))
}

#[derive(Debug, thiserror::Error)]
pub enum AdvisorError {
    #[error("Advisor responded with status {0}")]
    Status(u16),

    #[error("Advisor reply had no text")]
    EmptyReply,
}

/// Generative-language endpoint speaking the `generateContent` JSON shape.
pub struct HttpAdvisor {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<Masked<String>>,
}

impl HttpAdvisor {
    pub fn from_config(config: &AdvisorConfig) -> anyhow::Result<Self> {
        let endpoint = config
            .endpoint
            .clone()
            .context("advisor.endpoint is not set")?;
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone().unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            api_key: config.api_key.clone(),
        })
    }

    fn prompt(summary: &str) -> String {
        format!(
            "You manage a badminton club. Based on this summary of recent sessions, give three short \
             suggestions about session frequency, cost control or court booking. Be encouraging.\n\n\
             Summary:\n{}",
            summary
        )
    }

    fn request_body(summary: &str) -> Value {
        json!({
            "systemInstruction": { "parts": [{ "text": SYSTEM_INSTRUCTION }] },
            "contents": [{ "parts": [{ "text": Self::prompt(summary) }] }],
            "generationConfig": { "temperature": 0.7 }
        })
    }

    fn reply_text(reply: &Value) -> Option<String> {
        let text = reply
            .pointer("/candidates/0/content/parts")?
            .as_array()?
            .iter()
            .filter_map(|part| part.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("");
        if text.trim().is_empty() { None } else { Some(text) }
    }

    async fn generate(&self, summary: &str) -> anyhow::Result<String> {
        let url = format!("{}/{}:generateContent", self.endpoint, self.model);
        let mut request = self.client.post(&url).json(&Self::request_body(summary));
        if let Some(key) = &self.api_key {
            request = request.header("x-goog-api-key", key.expose());
        }

        let response = request.send().await.context("failed to complete request")?;
        if !response.status().is_success() {
            return Err(AdvisorError::Status(response.status().as_u16()).into());
        }
        let reply: Value = response.json().await.context("failed to deserialize response")?;
        Self::reply_text(&reply).ok_or_else(|| AdvisorError::EmptyReply.into())
    }
}

#[async_trait]
impl Advisor for HttpAdvisor {
    async fn advise(&self, summary: &str) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        tracing::debug!("Requesting advice from {}", self.model);
        Ok(self.generate(summary).await?)
    }
}
