// chat completion client and the agent operations built on it

use super::prompts::{self, AnalysisContext, RelevanceContext};
use crate::error::{LensError, Result};
use crate::types::{AgentPlan, AgentThought, IssueRelevance};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const GROQ_API_URL: &str = "https://api.groq.com/openai/v1";

/// one single-message completion call
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub json_output: bool,
}

#[async_trait]
pub trait ChatClient: Send + Sync {
    /// text of the first completion choice
    async fn complete(&self, request: ChatRequest) -> Result<String>;
}

#[async_trait]
impl<T: ChatClient + ?Sized> ChatClient for &T {
    async fn complete(&self, request: ChatRequest) -> Result<String> {
        (**self).complete(request).await
    }
}

// openai-compatible wire structures
#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

pub struct GroqClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GroqClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, GROQ_API_URL)
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl ChatClient for GroqClient {
    async fn complete(&self, request: ChatRequest) -> Result<String> {
        let body = CompletionRequest {
            model: &request.model,
            messages: vec![Message {
                role: "user",
                content: &request.prompt,
            }],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            response_format: request.json_output.then_some(ResponseFormat {
                kind: "json_object",
            }),
        };
        debug!(model = %request.model, prompt_chars = request.prompt.len(), "sending completion request");

        let response = self
            .http
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(LensError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let completion: CompletionResponse = response.json().await?;
        first_content(completion)
    }
}

fn first_content(completion: CompletionResponse) -> Result<String> {
    completion
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or(LensError::EmptyModelResponse)
}

/// the five agent operations over one chat client and model
pub struct LlmAgent<C> {
    client: C,
    model: String,
}

impl<C: ChatClient> LlmAgent<C> {
    pub fn new(client: C, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request(&self, prompt: String, temperature: f32, json_output: bool) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            prompt,
            temperature,
            max_tokens: None,
            json_output,
        }
    }

    pub async fn create_plan(&self, task: &str, context: &str) -> Result<AgentPlan> {
        let request = self.request(prompts::plan_prompt(task, context), 0.3, true);
        let content = self.client.complete(request).await?;
        serde_json::from_str(&content).map_err(|e| LensError::model_output("plan", e))
    }

    /// the returned thought always carries `step`, whatever the model echoed back
    pub async fn think(
        &self,
        step: u32,
        plan: &AgentPlan,
        context: &str,
        previous: &[AgentThought],
    ) -> Result<AgentThought> {
        let request = self.request(prompts::think_prompt(step, plan, context, previous), 0.5, true);
        let content = self.client.complete(request).await?;
        let mut thought: AgentThought =
            serde_json::from_str(&content).map_err(|e| LensError::model_output("think", e))?;
        thought.step = step;
        Ok(thought)
    }

    /// raw analysis json, parsed by the caller
    pub async fn analyze_code(&self, ctx: &AnalysisContext<'_>) -> Result<String> {
        let request = self.request(prompts::analysis_prompt(ctx), 0.4, true);
        self.client.complete(request).await
    }

    pub async fn generate_pr_title(&self, commit_message: &str, summary: &str) -> Result<String> {
        let mut request = self.request(prompts::pr_title_prompt(commit_message, summary), 0.7, false);
        request.max_tokens = Some(100);
        let title = self.client.complete(request).await?;
        let title = title.trim().trim_matches('"').trim();
        if title.is_empty() {
            return Err(LensError::EmptyModelResponse);
        }
        Ok(title.to_string())
    }

    pub async fn check_issue_relevance(&self, ctx: &RelevanceContext<'_>) -> Result<IssueRelevance> {
        let request = self.request(prompts::relevance_prompt(ctx), 0.3, true);
        let content = self.client.complete(request).await?;
        IssueRelevance::from_model_json(&content)
    }
}
