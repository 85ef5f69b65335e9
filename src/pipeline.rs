use async_trait::async_trait;
use log::info;
use serde::Serialize;
use std::sync::Arc;

use crate::checklist::ChecklistItem;
use crate::error::PipelineError;
use crate::event_bus::{Event, EventBus, emit_to};
use crate::recommender::Recommendation;
use crate::searcher::SearchResultGroup;

/// State threaded through the stages. Each stage returns a new value that
/// carries every field it did not produce unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineState {
    pub question: String,
    pub checklist_message: String,
    /// Accepted item names joined with ", ".
    pub checklist: String,
    pub items: Vec<ChecklistItem>,
    /// Index-aligned with `items`.
    pub search_results: Vec<SearchResultGroup>,
    pub recommendations: Vec<Recommendation>,
}

impl PipelineState {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Self::default()
        }
    }
}

/// One step of the pipeline.
#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(&self, state: PipelineState) -> Result<PipelineState, PipelineError>;
}

/// Runs its stages strictly in order, each on the previous stage's output.
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
    event_bus: Option<Arc<EventBus>>,
}

impl Pipeline {
    pub fn new(stages: Vec<Box<dyn Stage>>) -> Self {
        Self {
            stages,
            event_bus: None,
        }
    }

    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub async fn run(&self, question: &str) -> Result<PipelineState, PipelineError> {
        if question.trim().is_empty() {
            return Err(PipelineError::EmptyQuestion);
        }

        if let Some(bus) = &self.event_bus {
            bus.reset_metrics().await;
        }

        let mut state = PipelineState::new(question);
        for stage in &self.stages {
            emit_to(
                &self.event_bus,
                Event::StageStarted {
                    stage: stage.name().to_string(),
                },
            )
            .await;

            state = stage.run(state).await?;

            let summary = format!(
                "{} items, {} result groups, {} recommendations",
                state.items.len(),
                state.search_results.len(),
                state.recommendations.len()
            );
            info!("[{}] done: {}", stage.name(), summary);
            emit_to(
                &self.event_bus,
                Event::StageCompleted {
                    stage: stage.name().to_string(),
                    summary,
                },
            )
            .await;
        }

        Ok(state)
    }
}
