use crate::event_bus::{Event, EventBus, emit_to};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Trait representing an LLM provider.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Name of the provider.
    fn name(&self) -> &str;

    /// Send a prompt to the provider and return the response.
    async fn send_prompt(&self, prompt: &str) -> Result<String>;

    /// Model name of the provider.
    fn model_name(&self) -> &str {
        "Unknown"
    }
}

/// Front for the active provider that reports every call on the event bus.
pub struct LLMManager {
    provider: Arc<dyn LLMProvider>,
    event_bus: Option<Arc<EventBus>>,
}

impl LLMManager {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self {
            provider,
            event_bus: None,
        }
    }

    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    /// Get the active provider.
    #[cfg(test)]
    pub fn provider(&self) -> &dyn LLMProvider {
        &*self.provider
    }

    /// Send a prompt to the active provider.
    pub async fn send_prompt(&self, prompt: &str) -> Result<String> {
        let provider = &self.provider;

        emit_to(
            &self.event_bus,
            Event::APICallStarted {
                provider: provider.name().to_string(),
                model: provider.model_name().to_string(),
            },
        )
        .await;

        let result = provider.send_prompt(prompt).await;

        match &result {
            Ok(response) => {
                // Rough estimate: 1 token ≈ 4 characters
                let tokens = (prompt.len() + response.len()) / 4;
                emit_to(
                    &self.event_bus,
                    Event::APICallCompleted {
                        provider: provider.name().to_string(),
                        tokens,
                    },
                )
                .await;
            }
            Err(e) => {
                emit_to(
                    &self.event_bus,
                    Event::APIError {
                        provider: provider.name().to_string(),
                        error: format!("{:#}", e),
                    },
                )
                .await;
            }
        }

        result
    }
}
