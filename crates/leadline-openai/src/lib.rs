// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI-compatible chat completion provider.
//!
//! Talks to any server exposing `POST {base_url}/chat/completions`. The
//! default configuration targets Groq.

pub mod client;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use leadline_config::model::LlmConfig;
use leadline_core::types::{
    AdapterType, HealthStatus, ProviderRequest, ProviderResponse, TokenUsage,
};
use leadline_core::{LeadlineError, PluginAdapter, ProviderAdapter, Role};
use tracing::{debug, info};

use crate::client::OpenAiClient;
use crate::types::{ChatMessage, ChatRequest};

/// Provider implementing [`ProviderAdapter`] over `/chat/completions`.
///
/// API key resolution order: `llm.api_key` -> the `llm.api_key_env`
/// variable -> error.
pub struct OpenAiProvider {
    client: OpenAiClient,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiProvider {
    pub fn from_config(config: &LlmConfig) -> Result<Self, LeadlineError> {
        let api_key = resolve_api_key(&config.api_key, &config.api_key_env)?;
        let client = OpenAiClient::new(
            &api_key,
            &config.base_url,
            Duration::from_secs(config.timeout_secs),
            config.max_retries,
        )?;

        info!(
            model = %config.model_name,
            base_url = %config.base_url,
            "chat completion provider initialized"
        );

        Ok(Self::with_client(client, config))
    }

    /// Wraps a prebuilt client, e.g. one pointed at a mock server.
    pub fn with_client(client: OpenAiClient, config: &LlmConfig) -> Self {
        Self {
            client,
            model: config.model_name.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    fn to_chat_request(&self, request: &ProviderRequest) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: request
                .messages
                .iter()
                .map(|m| ChatMessage {
                    role: role_name(m.role()).to_string(),
                    content: m.content().to_string(),
                })
                .collect(),
            max_tokens: Some(request.max_tokens.unwrap_or(self.max_tokens)),
            temperature: Some(request.temperature.unwrap_or(self.temperature)),
            stream: false,
        }
    }
}

fn role_name(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::System => "system",
    }
}

#[async_trait]
impl PluginAdapter for OpenAiProvider {
    fn name(&self) -> &str {
        "openai-compatible"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, LeadlineError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), LeadlineError> {
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiProvider {
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, LeadlineError> {
        let chat_request = self.to_chat_request(&request);
        let response = self.client.chat_completion(&chat_request).await?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LeadlineError::Provider {
                message: "response contained no choices".into(),
                source: None,
            })?;
        let content = choice
            .message
            .content
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| LeadlineError::Provider {
                message: "response contained no text".into(),
                source: None,
            })?;

        let usage = response.usage.unwrap_or_default();
        debug!(
            model = %response.model,
            input_tokens = usage.prompt_tokens,
            output_tokens = usage.completion_tokens,
            "completion succeeded"
        );

        Ok(ProviderResponse {
            id: response.id,
            content,
            model: response.model,
            stop_reason: choice.finish_reason,
            usage: TokenUsage {
                input_tokens: usage.prompt_tokens,
                output_tokens: usage.completion_tokens,
            },
        })
    }
}

/// Resolves the API key from config, falling back to `env_var`.
fn resolve_api_key(config_key: &Option<String>, env_var: &str) -> Result<String, LeadlineError> {
    if let Some(key) = config_key
        && !key.is_empty()
    {
        return Ok(key.clone());
    }

    match std::env::var(env_var) {
        Ok(key) if !key.is_empty() => Ok(key),
        _ => Err(LeadlineError::Config(format!(
            "LLM API key not found. Set llm.api_key in config or the {env_var} environment variable."
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadline_core::Message;
    use serial_test::serial;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider_for(server: &MockServer) -> OpenAiProvider {
        let config = LlmConfig {
            api_key: Some("test-key".into()),
            base_url: server.uri(),
            max_retries: 0,
            ..LlmConfig::default()
        };
        OpenAiProvider::from_config(&config).unwrap()
    }

    #[test]
    fn api_key_from_config_wins() {
        assert_eq!(
            resolve_api_key(&Some("gsk-123".into()), "LEADLINE_TEST_UNSET_KEY").unwrap(),
            "gsk-123"
        );
    }

    #[test]
    #[serial]
    fn api_key_falls_back_to_env() {
        // SAFETY: serialized with the other env-mutating tests.
        unsafe { std::env::set_var("LEADLINE_TEST_LLM_KEY", "from-env") };
        let key = resolve_api_key(&Some(String::new()), "LEADLINE_TEST_LLM_KEY");
        unsafe { std::env::remove_var("LEADLINE_TEST_LLM_KEY") };
        assert_eq!(key.unwrap(), "from-env");
    }

    #[test]
    #[serial]
    fn missing_api_key_names_variable() {
        unsafe { std::env::remove_var("LEADLINE_TEST_LLM_KEY") };
        let err = resolve_api_key(&None, "LEADLINE_TEST_LLM_KEY")
            .unwrap_err()
            .to_string();
        assert!(err.contains("LEADLINE_TEST_LLM_KEY"), "got: {err}");
    }

    #[test]
    fn request_maps_roles_and_defaults() {
        let config = LlmConfig {
            api_key: Some("k".into()),
            ..LlmConfig::default()
        };
        let provider = OpenAiProvider::from_config(&config).unwrap();
        let mut request = ProviderRequest::new(vec![
            Message::system("Be brief."),
            Message::user("Hi"),
            Message::assistant("Hello!"),
        ]);
        request.temperature = Some(0.0);

        let chat = provider.to_chat_request(&request);
        let roles: Vec<&str> = chat.messages.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, ["system", "user", "assistant"]);
        assert_eq!(chat.model, "llama-3.1-8b-instant");
        assert_eq!(chat.max_tokens, Some(512));
        assert_eq!(chat.temperature, Some(0.0));
    }

    #[tokio::test]
    async fn complete_returns_trimmed_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(serde_json::json!({"model": "llama-3.1-8b-instant"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "chatcmpl-9",
                "model": "llama-3.1-8b-instant",
                "choices": [{"message": {"role": "assistant", "content": "  We open at 9.\n"}, "finish_reason": "stop"}],
                "usage": {"prompt_tokens": 30, "completion_tokens": 5}
            })))
            .mount(&server)
            .await;

        let resp = provider_for(&server)
            .complete(ProviderRequest::new(vec![Message::user("When do you open?")]))
            .await
            .unwrap();
        assert_eq!(resp.content, "We open at 9.");
        assert_eq!(resp.stop_reason.as_deref(), Some("stop"));
        assert_eq!(resp.usage.input_tokens, 30);
    }

    #[tokio::test]
    async fn null_content_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": null}}]
            })))
            .mount(&server)
            .await;

        let err = provider_for(&server)
            .complete(ProviderRequest::new(vec![Message::user("hi")]))
            .await
            .unwrap_err();
        assert!(matches!(err, LeadlineError::Provider { .. }), "got: {err}");
    }

    #[tokio::test]
    async fn empty_choices_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})))
            .mount(&server)
            .await;

        let err = provider_for(&server)
            .complete(ProviderRequest::new(vec![Message::user("hi")]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no choices"), "got: {err}");
    }
}
