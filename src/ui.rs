use anyhow::{Context, Result};
use colored::*;

use crate::event_bus::Metrics;
use crate::pipeline::PipelineState;

/// Renders the final pipeline state to stdout.
pub struct UIHandler {
    pub json: bool,
}

impl UIHandler {
    pub fn new(json: bool) -> Self { Self { json } }

    pub fn render(&self, state: &PipelineState) -> Result<()> {
        if self.json {
            println!("{}", render_json(state)?);
        } else {
            print!("{}", render_text(state));
        }
        Ok(())
    }

    pub fn render_metrics(&self, metrics: &Metrics) {
        eprintln!(
            "{}",
            format!(
                "LLM calls: {} ({} failed, ~{} tokens) | searches: {} ({} listings) | degraded items: {}",
                metrics.llm_calls,
                metrics.llm_errors,
                metrics.approx_tokens,
                metrics.searches,
                metrics.listings_found,
                metrics.degraded_items
            )
            .dimmed()
        );
    }
}

pub fn render_json(state: &PipelineState) -> Result<String> {
    serde_json::to_string_pretty(state).context("Failed to serialize pipeline state")
}

pub fn render_text(state: &PipelineState) -> String {
    let mut out = String::new();

    if !state.checklist_message.is_empty() {
        out.push_str(&format!("{}\n\n", state.checklist_message.bright_white()));
    }
    if !state.checklist.is_empty() {
        out.push_str(&format!("{} {}\n", "📝 추천 리스트:".bold(), state.checklist));
    }

    out.push_str(&format!("\n{}\n", "🎯 최종 추천 요약 결과".bright_blue().bold()));
    if state.recommendations.is_empty() {
        out.push_str("추천할 상품이 없습니다.\n");
    }
    for rec in &state.recommendations {
        out.push_str(&format!(
            "\n📌 [{}] ({}) 추천 요약:\n{}\n",
            rec.keyword.bright_green(),
            rec.category,
            rec.summary
        ));
    }

    out
}
