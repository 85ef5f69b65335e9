use async_trait::async_trait;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::checklist::ChecklistItem;
use crate::concurrency::run_ordered;
use crate::error::PipelineError;
use crate::event_bus::{Event, EventBus, emit_to};
use crate::pipeline::{PipelineState, Stage};
use crate::shopping::{Listing, SearchQuery, ShoppingSearch, SortOrder};

/// Listings requested per item.
pub const PAGE_SIZE: usize = 3;
const PAGE_OFFSET: usize = 1;

/// Search hits for one checklist item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResultGroup {
    pub keyword: String,
    pub listings: Vec<Listing>,
}

/// Looks up shopping listings for every checklist item.
pub struct ItemSearcher {
    search: Arc<dyn ShoppingSearch>,
    concurrency: usize,
    event_bus: Option<Arc<EventBus>>,
}

impl ItemSearcher {
    pub fn new(search: Arc<dyn ShoppingSearch>, concurrency: usize) -> Self {
        Self {
            search,
            concurrency,
            event_bus: None,
        }
    }

    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    /// One group per item, in item order. A failed lookup yields no listings.
    pub async fn search_all(&self, items: &[ChecklistItem]) -> Vec<SearchResultGroup> {
        let futs = items.iter().map(|item| self.search_item(item)).collect();
        run_ordered(futs, self.concurrency).await
    }

    async fn search_item(&self, item: &ChecklistItem) -> SearchResultGroup {
        let query = SearchQuery {
            query: item.keyword.clone(),
            page_size: PAGE_SIZE,
            page_offset: PAGE_OFFSET,
            sort: SortOrder::Relevance,
        };

        let mut listings = match self.search.search(&query).await {
            Ok(listings) => listings,
            Err(e) => {
                warn!("Search failed for '{}': {:#}", item.keyword, e);
                emit_to(
                    &self.event_bus,
                    Event::ItemDegraded {
                        keyword: item.keyword.clone(),
                        reason: format!("{:#}", e),
                    },
                )
                .await;
                Vec::new()
            }
        };
        listings.truncate(PAGE_SIZE);

        info!("[ItemSearcher] '{}': {} listings", item.keyword, listings.len());
        emit_to(
            &self.event_bus,
            Event::SearchCompleted {
                keyword: item.keyword.clone(),
                listings: listings.len(),
            },
        )
        .await;

        SearchResultGroup {
            keyword: item.keyword.clone(),
            listings,
        }
    }
}

#[async_trait]
impl Stage for ItemSearcher {
    fn name(&self) -> &'static str {
        "ItemSearcher"
    }

    async fn run(&self, state: PipelineState) -> Result<PipelineState, PipelineError> {
        let search_results = self.search_all(&state.items).await;
        Ok(PipelineState {
            search_results,
            ..state
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testing::FixedSearch;

    fn items(keywords: &[&str]) -> Vec<ChecklistItem> {
        keywords
            .iter()
            .map(|k| ChecklistItem {
                keyword: k.to_string(),
                category: "생활용품".to_string(),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_groups_follow_item_order() {
        let search = Arc::new(FixedSearch::default().with("텐트", 3).with("랜턴", 2).with("매트", 3));
        let searcher = ItemSearcher::new(search, 2);

        let groups = searcher.search_all(&items(&["텐트", "랜턴", "매트"])).await;

        let keywords: Vec<_> = groups.iter().map(|g| g.keyword.as_str()).collect();
        assert_eq!(keywords, vec!["텐트", "랜턴", "매트"]);
        assert_eq!(groups[1].listings.len(), 2);
        assert_eq!(groups[0].listings[0].title, "텐트 상품 1");
    }

    #[tokio::test]
    async fn test_oversized_result_page_is_capped() {
        let search = Arc::new(FixedSearch::default().with("텐트", 5));
        let groups = ItemSearcher::new(search, 1).search_all(&items(&["텐트"])).await;

        assert_eq!(groups[0].listings.len(), PAGE_SIZE);
        let titles: Vec<_> = groups[0].listings.iter().map(|l| l.title.as_str()).collect();
        assert_eq!(titles, vec!["텐트 상품 1", "텐트 상품 2", "텐트 상품 3"]);
    }

    #[tokio::test]
    async fn test_query_parameters_are_fixed() {
        let search = Arc::new(FixedSearch::default().with("침낭", 3));
        ItemSearcher::new(search.clone(), 1).search_all(&items(&["침낭"])).await;

        let queries = search.queries();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].query, "침낭");
        assert_eq!(queries[0].page_size, 3);
        assert_eq!(queries[0].page_offset, 1);
        assert_eq!(queries[0].sort, SortOrder::Relevance);
    }

    #[tokio::test]
    async fn test_failed_lookup_degrades_to_empty() {
        let search = Arc::new(FixedSearch::default().with("텐트", 3));
        let bus = Arc::new(EventBus::new(16));
        let searcher = ItemSearcher::new(search, 4).with_event_bus(bus.clone());

        let groups = searcher.search_all(&items(&["없는상품", "텐트"])).await;

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].keyword, "없는상품");
        assert!(groups[0].listings.is_empty());
        assert_eq!(groups[1].listings.len(), 3);
        assert_eq!(bus.get_metrics().await.degraded_items, 1);
    }

    #[tokio::test]
    async fn test_no_items_no_queries() {
        let search = Arc::new(FixedSearch::default());
        let state = ItemSearcher::new(search.clone(), 4)
            .run(PipelineState::new("뭐든"))
            .await
            .unwrap();
        assert!(state.search_results.is_empty());
        assert!(search.queries().is_empty());
    }
}
