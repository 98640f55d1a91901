use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::{Duration, Instant};

use super::{ExtractionRequest, RelationSource};
use crate::config::LlmConfig;
use crate::error::{RelgraphError, Result};
use crate::graph::RelationshipGraph;
use crate::ingest::ParserRegistry;

/// Rate-limit backoff is this many times the server-error backoff.
const RATE_LIMIT_FACTOR: u32 = 5;

/// Request body for the chat completions API
#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    response_format: Value,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

/// OpenAI chat-completions relation extractor
///
/// Asks for schema-constrained JSON (`center_person` + `relationships`) and
/// parses the reply with the same registry used for files, so fenced or CSV
/// replies still work. 429 and 5xx responses are retried with exponential
/// backoff.
pub struct OpenAiExtractor {
    client: Client,
    api_key: String,
    api_base: String,
    model: String,
    system_prompt: String,
    max_retries: usize,
    backoff_unit: Duration,
    parsers: ParserRegistry,
}

impl OpenAiExtractor {
    pub fn new(api_key: String, config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RelgraphError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            system_prompt: config.system_prompt.clone(),
            max_retries: config.max_retries,
            backoff_unit: Duration::from_secs(1),
            parsers: ParserRegistry::new(),
        })
    }

    /// Base delay for the first retry after a server error (default 1 s).
    pub fn with_backoff_unit(mut self, unit: Duration) -> Self {
        self.backoff_unit = unit;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request(&self, request: &ExtractionRequest) -> ChatRequest<'_> {
        ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: self.system_prompt.clone(),
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt(request),
                },
            ],
            temperature: 0.3,
            response_format: response_schema(),
        }
    }

    /// Single API call, no retry
    async fn complete(&self, request: &ExtractionRequest) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&self.build_request(request))
            .send()
            .await
            .map_err(|e| RelgraphError::Llm(format!("Network error: {}", e)))?;

        let status = response.status();

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());

            return Err(RelgraphError::LlmStatus {
                status: status.as_u16(),
                body,
            });
        }

        let result: ChatResponse = response
            .json()
            .await
            .map_err(|e| RelgraphError::Llm(format!("Failed to parse response: {}", e)))?;

        let message = result
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| RelgraphError::Llm("Empty response from chat API".to_string()))?;

        match message.content {
            Some(content) if !content.trim().is_empty() => Ok(content),
            _ => Err(RelgraphError::Llm(format!(
                "Model returned no content{}",
                message
                    .refusal
                    .map(|r| format!(" (refusal: {})", r))
                    .unwrap_or_default()
            ))),
        }
    }

    async fn complete_with_retry(&self, request: &ExtractionRequest) -> Result<String> {
        let start = Instant::now();
        let mut attempt = 0;

        loop {
            match self.complete(request).await {
                Ok(content) => {
                    log::debug!(
                        "Chat API call took {:?} (attempt {})",
                        start.elapsed(),
                        attempt + 1
                    );
                    return Ok(content);
                }
                Err(e) if attempt < self.max_retries && e.is_retryable() => {
                    let delay = self.backoff_delay(attempt, e.is_rate_limited());
                    log::warn!(
                        "Retry {}/{} in {:?} after error: {}",
                        attempt + 1,
                        self.max_retries,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// 1/2/4 units for server errors, 5/10/20 units when rate limited
    fn backoff_delay(&self, attempt: usize, rate_limited: bool) -> Duration {
        let base = if rate_limited {
            self.backoff_unit * RATE_LIMIT_FACTOR
        } else {
            self.backoff_unit
        };
        base * 2u32.saturating_pow(attempt as u32)
    }
}

#[async_trait]
impl RelationSource for OpenAiExtractor {
    async fn extract(&self, request: &ExtractionRequest) -> Result<RelationshipGraph> {
        let content = self.complete_with_retry(request).await?;
        let graph = self.parsers.parse(&content, "chat completion", "json")?;
        log::info!(
            "Extracted {} relationships (focus: {})",
            graph.relationships.len(),
            graph.focus.join(", ")
        );
        Ok(graph)
    }
}

fn user_prompt(request: &ExtractionRequest) -> String {
    format!(
        "Story:\n{}\n\nQuestion: {}\n\n\
         Task: identify the character the question is about (center_person) and output the \
         relationship diagram around that character.\n\
         Rules:\n\
         1. Include center_person in the relationships.\n\
         2. Use concrete character names only. Never use placeholders such as \"unknown\", \
         \"subject\", \"object\", \"不明\", \"主体\" or \"客体\".\n\
         3. Only the main relationships (about 5-10 characters).\n\
         4. relation_type: directed (one-way), bidirectional (mutual), dotted (secondary).\n\
         5. Keep label to five characters or fewer.\n\
         6. At most two relationships between the same two characters.",
        request.story_text, request.question
    )
}

/// Structured-output schema matching the JSON input format
fn response_schema() -> Value {
    json!({
        "type": "json_schema",
        "json_schema": {
            "name": "character_graph",
            "strict": true,
            "schema": {
                "type": "object",
                "properties": {
                    "center_person": { "type": "string" },
                    "relationships": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "source": { "type": "string" },
                                "target": { "type": "string" },
                                "relation_type": {
                                    "type": "string",
                                    "enum": ["directed", "bidirectional", "dotted"]
                                },
                                "label": { "type": "string" },
                                "group": { "type": "string" }
                            },
                            "required": ["source", "target", "relation_type", "label", "group"],
                            "additionalProperties": false
                        }
                    }
                },
                "required": ["center_person", "relationships"],
                "additionalProperties": false
            }
        }
    })
}
