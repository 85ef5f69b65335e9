use anyhow::{Context, Result};
use async_trait::async_trait;
use log::info;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};

use crate::error::PipelineError;
use crate::llm_manager::LLMManager;
use crate::pipeline::{PipelineState, Stage};

/// A recommended item paired with the shopping category the model chose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub keyword: String,
    /// Model-provided label; kept as-is even when it is not a known category.
    pub category: String,
}

/// The model reply split into its conversational part and its items.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedChecklist {
    pub message: String,
    pub items: Vec<ChecklistItem>,
}

impl ParsedChecklist {
    /// Item names joined for display, in marker order.
    pub fn checklist(&self) -> String {
        self.items
            .iter()
            .map(|item| item.keyword.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

const MARKER_LABELS: &str = r"(?:추천 리스트|recommendation-list)";

fn opening_regex() -> &'static Regex {
    static OPENING: OnceLock<Regex> = OnceLock::new();
    OPENING.get_or_init(|| {
        Regex::new(&format!(r"\[{}:", MARKER_LABELS)).expect("Invalid marker opening regex")
    })
}

fn marker_regex() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| {
        Regex::new(&format!(r"(?s)\[{}:\s*(.*?)\]", MARKER_LABELS)).expect("Invalid marker regex")
    })
}

/// Parse a marker body of the form `item | category, item | category`.
///
/// Segments without a `|` or with an empty item name are dropped. Only the
/// first `|` separates name from category.
pub fn parse_marker_body(body: &str) -> Vec<ChecklistItem> {
    body.split(',')
        .filter_map(|segment| {
            let (name, category) = segment.split_once('|')?;
            let keyword = name.trim();
            if keyword.is_empty() {
                return None;
            }
            Some(ChecklistItem {
                keyword: keyword.to_string(),
                category: category.trim().to_string(),
            })
        })
        .collect()
}

/// Split a full model reply into the acknowledgement and the item list.
///
/// A missing or unterminated marker yields no items; it is never an error.
pub fn parse_reply(reply: &str) -> ParsedChecklist {
    let message = match opening_regex().find(reply) {
        Some(opening) => &reply[..opening.start()],
        None => reply,
    };

    let body = marker_regex()
        .captures(reply)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or("");

    ParsedChecklist {
        message: message.trim().to_string(),
        items: parse_marker_body(body),
    }
}

/// Turns the user's situation into an acknowledgement and a checklist.
pub struct ChecklistExtractor {
    llm: Arc<LLMManager>,
    prompt_template: String,
}

impl ChecklistExtractor {
    pub fn new(llm: Arc<LLMManager>) -> Self {
        Self {
            llm,
            prompt_template: Self::default_prompt(),
        }
    }

    pub fn build_prompt(&self, question: &str) -> String {
        self.prompt_template.replace("{question}", question)
    }

    pub async fn extract(&self, question: &str) -> Result<ParsedChecklist> {
        let prompt = self.build_prompt(question);
        let response = self
            .llm
            .send_prompt(&prompt)
            .await
            .context("Failed to get checklist response from LLM")?;
        Ok(parse_reply(response.trim()))
    }

    fn default_prompt() -> String {
        r#"다음은 사용자의 상황입니다: '{question}'

사용자의 말에 자연스럽게 반응해주고, 어떤 물건을 추천하는지 간단히 설명해줘.
그 뒤에 [추천 리스트: 항목1, 항목2, 항목3, ...] 형식으로, **물건 이름만 간단하게 나열**하고 **한두 단어짜리 명사 형태로만** 항목을 써줘.

그리고 각 항목에 대해:
- 아래 목록 중 가장 적절한 **카테고리**를 붙여줘.

카테고리 목록:
여성의류, 남성의류, 패션잡화, 신발, 화장품/미용, 신선식품, 가공식품, 건강식품,
출산/유아동, 반려동물용품, 가전, 휴대폰/카메라, PC/주변기기, 가구,
조명/인테리어, 패브릭/홈데코, 주방용품, 생활용품, 스포츠/레저, 자동차/오토바이,
키덜트/취미, 건강의료용품, 악기/문구, 공구, 렌탈관, e쿠폰/티켓/생활편의, 여행

형식 예시:
- 사용자가 '내일 캠핑갈건데 뭐가 필요할까?'라고 하면 →
캠핑 가신다니 설레네요! 텐트, 침낭, 매트는 꼭 챙기시면 좋아요.
[추천 리스트: 텐트 | 스포츠/레저, 랜턴 | 생활용품, 매트 | 가구]

- 사용자가 '물놀이 가게 됐어'라고 하면 →
재밌겠네요! 수영복, 물안경, 방수팩은 필수예요.
[추천 리스트: 수영복 | 스포츠/레저, 물안경 | 스포츠/레저, 방수팩 | 생활용품]

지금 사용자 입력: '{question}'"#
            .to_string()
    }
}

#[async_trait]
impl Stage for ChecklistExtractor {
    fn name(&self) -> &'static str {
        "ChecklistExtractor"
    }

    async fn run(&self, state: PipelineState) -> Result<PipelineState, PipelineError> {
        info!("[{}] question: {}", self.name(), state.question);

        let parsed = self
            .extract(&state.question)
            .await
            .map_err(|e| PipelineError::stage(self.name(), e))?;

        let checklist = parsed.checklist();
        info!("[{}] message: {}", self.name(), parsed.message);
        info!("[{}] items: {:?}", self.name(), parsed.items);

        Ok(PipelineState {
            checklist_message: parsed.message,
            checklist,
            items: parsed.items,
            ..state
        })
    }
}
