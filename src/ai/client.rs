//! OpenAI-compatible chat completion client.

use super::TextGenerator;
use crate::error::{Result, TableTalkError};
use anyhow::Context as _;
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequest,
        CreateChatCompletionRequestArgs,
    },
};
use async_trait::async_trait;
use secrecy::{ExposeSecret as _, SecretString};
use std::time::Duration;

pub use crate::config::AIConfig;

/// AI Assistant client for answering questions about a table
pub struct AIAssistant {
    client: Client<OpenAIConfig>,
    config: AIConfig,
}

impl AIAssistant {
    pub fn new(api_key: &SecretString, config: AIConfig) -> Self {
        let mut openai_config = OpenAIConfig::new().with_api_key(api_key.expose_secret());
        if let Some(base) = &config.api_base {
            openai_config = openai_config.with_api_base(base);
        }
        let client = Client::with_config(openai_config);

        Self { client, config }
    }

    pub fn config(&self) -> &AIConfig {
        &self.config
    }

    fn system_prompt() -> &'static str {
        "You answer questions about tabular datasets from a statistical summary. \
         Be precise with numbers and never invent columns or values."
    }

    fn build_request(&self, prompt: &str) -> anyhow::Result<CreateChatCompletionRequest> {
        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(Self::system_prompt())
                .build()
                .context("Failed to build system message")?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt)
                .build()
                .context("Failed to build user message")?
                .into(),
        ];

        CreateChatCompletionRequestArgs::default()
            .model(&self.config.model)
            .messages(messages)
            .temperature(self.config.temperature)
            .top_p(self.config.top_p)
            .max_tokens(self.config.max_tokens)
            .build()
            .context("Failed to build chat completion request")
    }
}

#[async_trait]
impl TextGenerator for AIAssistant {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = self.build_request(prompt)?;
        let timeout = Duration::from_secs(self.config.request_timeout_secs);

        let response = tokio::time::timeout(timeout, self.client.chat().create(request))
            .await
            .map_err(|_elapsed| {
                TableTalkError::ExternalService(format!(
                    "No response within {}s",
                    timeout.as_secs()
                ))
            })?
            .map_err(|e| TableTalkError::ExternalService(format!("OpenAI API error: {e}")))?;

        response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| {
                TableTalkError::ExternalService("No response content received".to_owned())
            })
    }
}
