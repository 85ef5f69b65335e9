use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{RwLock, broadcast};

/// Events emitted while a pipeline run is in progress
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Stage events
    StageStarted {
        stage: String,
    },
    StageCompleted {
        stage: String,
        summary: String,
    },

    // Language model events
    APICallStarted {
        provider: String,
        model: String,
    },
    APICallCompleted {
        provider: String,
        tokens: usize,
    },
    APIError {
        provider: String,
        error: String,
    },

    // Item events
    SearchCompleted {
        keyword: String,
        listings: usize,
    },
    ItemDegraded {
        keyword: String,
        reason: String,
    },
}

/// Event bus shared by the pipeline stages and collaborators
pub struct EventBus {
    sender: broadcast::Sender<Event>,
    metrics: Arc<RwLock<Metrics>>,
}

/// Accumulated metrics for the current run
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Metrics {
    pub llm_calls: usize,
    pub llm_errors: usize,
    pub approx_tokens: usize,
    pub searches: usize,
    pub listings_found: usize,
    pub degraded_items: usize,
}

impl EventBus {
    /// Create a new event bus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            metrics: Arc::new(RwLock::new(Metrics::default())),
        }
    }

    /// Subscribe to events
    #[cfg(test)]
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Emit an event to all subscribers
    pub async fn emit(&self, event: Event) -> Result<()> {
        self.update_metrics(&event).await;

        // No receivers is fine
        let _ = self.sender.send(event);
        Ok(())
    }

    /// Get current metrics
    pub async fn get_metrics(&self) -> Metrics {
        self.metrics.read().await.clone()
    }

    /// Start a fresh metrics window
    pub async fn reset_metrics(&self) {
        *self.metrics.write().await = Metrics::default();
    }

    async fn update_metrics(&self, event: &Event) {
        let mut metrics = self.metrics.write().await;

        match event {
            Event::APICallCompleted { tokens, .. } => {
                metrics.llm_calls += 1;
                metrics.approx_tokens += tokens;
            }
            Event::APIError { .. } => {
                metrics.llm_errors += 1;
            }
            Event::SearchCompleted { listings, .. } => {
                metrics.searches += 1;
                metrics.listings_found += listings;
            }
            Event::ItemDegraded { .. } => {
                metrics.degraded_items += 1;
            }
            _ => {}
        }
    }
}

/// Emit on an optional bus, ignoring delivery problems.
pub async fn emit_to(bus: &Option<Arc<EventBus>>, event: Event) {
    if let Some(bus) = bus {
        let _ = bus.emit(event).await;
    }
}
