use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::checklist::ChecklistItem;
use crate::concurrency::run_ordered;
use crate::criteria::CategoryCriteriaTable;
use crate::error::PipelineError;
use crate::event_bus::{Event, EventBus, emit_to};
use crate::llm_manager::LLMManager;
use crate::pipeline::{PipelineState, Stage};
use crate::searcher::SearchResultGroup;
use crate::shopping::Listing;

/// Listings needed before a comparison is attempted; also how many are compared.
pub const COMPARISON_SIZE: usize = 3;

/// The purchase advice for one checklist item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub keyword: String,
    pub category: String,
    pub summary: String,
}

pub fn insufficient_notice(keyword: &str) -> String {
    format!("'{}'에 대한 상품이 부족하여 비교할 수 없습니다.", keyword)
}

pub fn unavailable_notice(keyword: &str) -> String {
    format!("'{}'에 대한 추천을 생성하지 못했습니다. 잠시 후 다시 시도해주세요.", keyword)
}

/// Compares the top listings per item and asks the model for one pick.
pub struct Recommender {
    llm: Arc<LLMManager>,
    criteria: Arc<CategoryCriteriaTable>,
    concurrency: usize,
    event_bus: Option<Arc<EventBus>>,
}

impl Recommender {
    pub fn new(llm: Arc<LLMManager>, criteria: Arc<CategoryCriteriaTable>, concurrency: usize) -> Self {
        Self {
            llm,
            criteria,
            concurrency,
            event_bus: None,
        }
    }

    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    /// One recommendation per item, in item order.
    pub async fn recommend_all(
        &self,
        items: &[ChecklistItem],
        groups: &[SearchResultGroup],
    ) -> Result<Vec<Recommendation>, PipelineError> {
        let fault = alignment_fault(items, groups);
        if let Some(detail) = &fault {
            error!("Search results are misaligned with checklist items: {}", detail);
        }
        debug_assert!(fault.is_none(), "search results misaligned with checklist items: {:?}", fault);
        if let Some(detail) = fault {
            return Err(PipelineError::Misaligned {
                stage: "Recommender",
                detail,
            });
        }

        let futs = items
            .iter()
            .zip(groups)
            .map(|(item, group)| self.recommend(item, &group.listings))
            .collect();
        Ok(run_ordered(futs, self.concurrency).await)
    }

    async fn recommend(&self, item: &ChecklistItem, listings: &[Listing]) -> Recommendation {
        info!(
            "[Recommender] '{}' ({}): {} listings",
            item.keyword,
            item.category,
            listings.len()
        );

        let summary = if listings.len() < COMPARISON_SIZE {
            insufficient_notice(&item.keyword)
        } else {
            match self.compare(item, &listings[..COMPARISON_SIZE]).await {
                Ok(summary) => summary,
                Err(e) => {
                    warn!("Recommendation failed for '{}': {:#}", item.keyword, e);
                    emit_to(
                        &self.event_bus,
                        Event::ItemDegraded {
                            keyword: item.keyword.clone(),
                            reason: format!("{:#}", e),
                        },
                    )
                    .await;
                    unavailable_notice(&item.keyword)
                }
            }
        };

        Recommendation {
            keyword: item.keyword.clone(),
            category: item.category.clone(),
            summary,
        }
    }

    async fn compare(&self, item: &ChecklistItem, top: &[Listing]) -> Result<String> {
        let criteria = self.criteria.lookup(&item.category);
        let prompt = build_comparison_prompt(&item.keyword, top, criteria);
        let response = self
            .llm
            .send_prompt(&prompt)
            .await
            .with_context(|| format!("Failed to get comparison for '{}' from LLM", item.keyword))?;
        Ok(response.trim().to_string())
    }
}

/// Describes the first way `groups` fails to line up with `items`, if any.
fn alignment_fault(items: &[ChecklistItem], groups: &[SearchResultGroup]) -> Option<String> {
    if items.len() != groups.len() {
        return Some(format!("{} items, {} result groups", items.len(), groups.len()));
    }
    items
        .iter()
        .zip(groups)
        .position(|(item, group)| item.keyword != group.keyword)
        .map(|i| {
            format!(
                "item {} is '{}' but its result group is '{}'",
                i, items[i].keyword, groups[i].keyword
            )
        })
}

pub fn build_comparison_prompt(keyword: &str, listings: &[Listing], criteria: &str) -> String {
    let lines = listings
        .iter()
        .enumerate()
        .map(|(i, listing)| format!("{}. {} - {}원", i + 1, listing.title, listing.low_price))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"다음은 네이버 쇼핑에서 '{keyword}' 키워드로 검색한 상품 {count}개야:

{lines}

{criteria}
각 제품을 기준에 따라 비교하고, 가장 추천할 제품 1개를 골라 이유와 함께 말해줘.

🔍 출력 예시 (키워드: '대형 스테인리스 얼음컵', 기준: 실용성, 내구성, 사용 편의성, 디자인, 가격 등):

제품 비교:
1번은 플라스틱 소재로 가볍지만 내구성이 떨어지고,
2번은 스테인리스 재질로 보온 유지가 뛰어나며 세척도 쉬워요.
3번은 유리 제품으로 고급스럽지만 무겁고 깨지기 쉬워요.

추천:
2번 제품은 내구성, 기능성, 위생 면에서 가장 균형이 좋고, 가격도 합리적입니다. 따라서 추천드립니다."#,
        count = listings.len(),
    )
}

#[async_trait]
impl Stage for Recommender {
    fn name(&self) -> &'static str {
        "Recommender"
    }

    async fn run(&self, state: PipelineState) -> Result<PipelineState, PipelineError> {
        let recommendations = self.recommend_all(&state.items, &state.search_results).await?;
        Ok(PipelineState {
            recommendations,
            ..state
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testing::ScriptedLlm;
    use std::collections::HashMap;

    fn item(keyword: &str, category: &str) -> ChecklistItem {
        ChecklistItem {
            keyword: keyword.to_string(),
            category: category.to_string(),
        }
    }

    fn group(keyword: &str, count: usize) -> SearchResultGroup {
        SearchResultGroup {
            keyword: keyword.to_string(),
            listings: (1..=count)
                .map(|i| Listing::new(format!("{} 모델{}", keyword, i), format!("{}", i * 1000)))
                .collect(),
        }
    }

    fn recommender(llm: Arc<ScriptedLlm>) -> Recommender {
        Recommender::new(
            Arc::new(LLMManager::new(llm)),
            Arc::new(CategoryCriteriaTable::standard()),
            2,
        )
    }

    #[tokio::test]
    async fn test_too_few_listings_skips_llm() {
        let llm = Arc::new(ScriptedLlm::default().reply("키워드로", "비교"));
        let recs = recommender(llm.clone())
            .recommend_all(&[item("랜턴", "생활용품")], &[group("랜턴", 2)])
            .await
            .unwrap();

        assert_eq!(recs[0].summary, insufficient_notice("랜턴"));
        assert_eq!(recs[0].category, "생활용품");
        assert!(llm.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_only_first_three_listings_compared() {
        let llm = Arc::new(ScriptedLlm::default().reply("키워드로", "\n 2번 추천 \n"));
        let recs = recommender(llm.clone())
            .recommend_all(&[item("텐트", "스포츠/레저")], &[group("텐트", 5)])
            .await
            .unwrap();

        assert_eq!(recs[0].summary, "2번 추천");
        let prompts = llm.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("1. 텐트 모델1 - 1000원"));
        assert!(prompts[0].contains("3. 텐트 모델3 - 3000원"));
        assert!(!prompts[0].contains("텐트 모델4"));
        assert!(prompts[0].contains("상품 3개야"));
    }

    #[tokio::test]
    async fn test_known_and_unknown_categories_both_call_llm() {
        let llm = Arc::new(ScriptedLlm::default().reply("키워드로", "추천"));
        let recs = recommender(llm.clone())
            .recommend_all(
                &[item("선풍기", "가전"), item("우주복", "우주용품")],
                &[group("선풍기", 3), group("우주복", 3)],
            )
            .await
            .unwrap();

        assert_eq!(recs.len(), 2);
        let prompts = llm.prompts();
        assert_eq!(prompts.len(), 2);
        let fan = prompts.iter().find(|p| p.contains("'선풍기'")).unwrap();
        let suit = prompts.iter().find(|p| p.contains("'우주복'")).unwrap();
        assert!(fan.contains("성능, 에너지 효율, 브랜드 신뢰도, 편의 기능, 가격 등을 기준으로 비교해줘."));
        assert!(suit.contains("가격, 성능, 사용자 리뷰, 가성비 등을 기준으로 비교해줘."));
        assert_eq!(recs[1].category, "우주용품");
    }

    #[tokio::test]
    async fn test_substitute_criteria_table() {
        let llm = Arc::new(ScriptedLlm::default().reply("키워드로", "추천"));
        let mut entries = HashMap::new();
        entries.insert("가전".to_string(), "소음만 비교해줘.".to_string());
        let recommender = Recommender::new(
            Arc::new(LLMManager::new(llm.clone())),
            Arc::new(CategoryCriteriaTable::new(entries, "아무 기준")),
            1,
        );

        recommender
            .recommend_all(&[item("선풍기", "가전")], &[group("선풍기", 3)])
            .await
            .unwrap();

        assert!(llm.prompts()[0].contains("소음만 비교해줘."));
    }

    #[tokio::test]
    async fn test_llm_failure_degrades_single_item() {
        let llm = Arc::new(
            ScriptedLlm::default()
                .fail("'텐트'", "503 Service Unavailable")
                .reply("키워드로", "매트 추천"),
        );
        let bus = Arc::new(EventBus::new(16));
        let recs = recommender(llm)
            .with_event_bus(bus.clone())
            .recommend_all(
                &[item("텐트", "스포츠/레저"), item("매트", "가구")],
                &[group("텐트", 3), group("매트", 3)],
            )
            .await
            .unwrap();

        assert_eq!(recs[0].summary, unavailable_notice("텐트"));
        assert_eq!(recs[1].summary, "매트 추천");
        assert_eq!(bus.get_metrics().await.degraded_items, 1);
    }

    #[test]
    fn test_alignment_fault() {
        let items = [item("텐트", "스포츠/레저"), item("매트", "가구")];
        assert_eq!(alignment_fault(&items, &[group("텐트", 3), group("매트", 0)]), None);
        assert_eq!(
            alignment_fault(&items, &[group("텐트", 3)]),
            Some("2 items, 1 result groups".to_string())
        );
        assert_eq!(
            alignment_fault(&items, &[group("텐트", 3), group("랜턴", 3)]),
            Some("item 1 is '매트' but its result group is '랜턴'".to_string())
        );
    }

    #[tokio::test]
    #[cfg_attr(debug_assertions, should_panic(expected = "misaligned"))]
    async fn test_length_mismatch_is_rejected() {
        let llm = Arc::new(ScriptedLlm::default());
        let err = recommender(llm)
            .recommend_all(&[item("텐트", "스포츠/레저"), item("매트", "가구")], &[group("텐트", 3)])
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Misaligned { stage: "Recommender", .. }));
    }

    #[tokio::test]
    #[cfg_attr(debug_assertions, should_panic(expected = "misaligned"))]
    async fn test_keyword_mismatch_is_rejected_before_any_comparison() {
        let llm = Arc::new(ScriptedLlm::default().reply("키워드로", "랜턴 추천"));
        let err = recommender(llm.clone())
            .recommend_all(&[item("텐트", "스포츠/레저")], &[group("랜턴", 3)])
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Misaligned { .. }));
        assert!(llm.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_order_matches_items() {
        let llm = Arc::new(ScriptedLlm::default().reply("키워드로", "ok"));
        let keywords = ["a", "b", "c", "d", "e"];
        let items: Vec<_> = keywords.iter().map(|k| item(k, "공구")).collect();
        let groups: Vec<_> = keywords
            .iter()
            .enumerate()
            .map(|(i, k)| group(k, if i % 2 == 0 { 3 } else { 1 }))
            .collect();

        let recs = recommender(llm).recommend_all(&items, &groups).await.unwrap();

        let order: Vec<_> = recs.iter().map(|r| r.keyword.as_str()).collect();
        assert_eq!(order, keywords);
        assert_eq!(recs[1].summary, insufficient_notice("b"));
        assert_eq!(recs[2].summary, "ok");
    }
}
