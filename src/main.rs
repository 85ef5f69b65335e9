use clap::Parser;
use std::sync::Arc;

mod checklist;
mod concurrency;
mod config;
mod criteria;
mod error;
mod event_bus;
mod llm_manager;
mod logger;
mod pipeline;
mod providers;
mod recommender;
mod searcher;
mod shopping;
mod ui;

use checklist::ChecklistExtractor;
use config::Config;
use criteria::CategoryCriteriaTable;
use event_bus::EventBus;
use llm_manager::LLMManager;
use pipeline::Pipeline;
use providers::gemini::GeminiProvider;
use recommender::Recommender;
use searcher::ItemSearcher;
use shopping::NaverShoppingClient;

const DEFAULT_QUESTION: &str = "아무 상품이나 추천해줘.";

#[derive(Parser)]
#[command(name = "aiwi")]
struct Args {
    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<String>,
    /// Print the final pipeline state as JSON
    #[arg(long)]
    json: bool,
    /// The situation to shop for
    #[arg(last = true)]
    question: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    logger::init(args.verbose);

    let config = Config::load(&args.config)?;
    let event_bus = Arc::new(EventBus::new(256));

    let provider = GeminiProvider::from_env(&config.llm)?;
    let search = NaverShoppingClient::from_env(&config.search)?;

    let llm = Arc::new(LLMManager::new(Arc::new(provider)).with_event_bus(event_bus.clone()));
    let criteria = Arc::new(CategoryCriteriaTable::standard());

    let pipeline = Pipeline::new(vec![
        Box::new(ChecklistExtractor::new(llm.clone())),
        Box::new(ItemSearcher::new(Arc::new(search), config.concurrency()).with_event_bus(event_bus.clone())),
        Box::new(Recommender::new(llm, criteria, config.concurrency()).with_event_bus(event_bus.clone())),
    ])
    .with_event_bus(event_bus.clone());

    let question = if args.question.is_empty() {
        DEFAULT_QUESTION.to_string()
    } else {
        args.question.join(" ")
    };

    let state = pipeline.run(&question).await?;

    let ui = ui::UIHandler::new(args.json);
    ui.render(&state)?;
    if args.verbose {
        ui.render_metrics(&event_bus.get_metrics().await);
    }
    Ok(())
}
