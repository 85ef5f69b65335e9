use std::collections::HashMap;

const GENERIC_CRITERIA: &str = "가격, 성능, 사용자 리뷰, 가성비 등을 기준으로 비교해줘.";

const STANDARD_CRITERIA: &[(&str, &str)] = &[
    ("여성의류", "디자인, 계절 적합성, 소재, 사이즈 다양성, 가격 등을 기준으로 비교해줘."),
    ("남성의류", "스타일, 활용도, 소재 품질, 브랜드, 가격 등을 기준으로 비교해줘."),
    ("패션잡화", "디자인, 실용성, 브랜드, 재질, 가격 등을 기준으로 비교해줘."),
    ("신발", "착화감, 용도, 재질, 내구성, 디자인, 가격 등을 기준으로 비교해줘."),
    ("화장품/미용", "성분, 피부타입 적합성, 사용감, 브랜드, 가격 등을 기준으로 비교해줘."),
    ("신선식품", "신선도, 영양 성분, 수확 시기, 원산지, 유통기한 등을 기준으로 비교해줘."),
    ("가공식품", "맛, 유통기한, 성분, 조리 편의성, 가격 등을 기준으로 비교해줘."),
    ("건강식품", "주요 영양소, 건강에 미치는 효과, 복용 편의성, 인증 여부, 가격 등을 비교해줘."),
    ("출산/유아동", "안전성, 피부 친화성, 연령 적합성, 기능성, 가격 등을 기준으로 비교해줘."),
    ("반려동물용품", "안전성, 반려동물 선호도, 기능, 재질, 가격 등을 기준으로 비교해줘."),
    ("가전", "성능, 에너지 효율, 브랜드 신뢰도, 편의 기능, 가격 등을 기준으로 비교해줘."),
    ("휴대폰/카메라", "성능, 브랜드, 배터리 수명, 기능, 가격 등을 기준으로 비교해줘."),
    ("PC/주변기기", "성능, 호환성, 브랜드, 기능성, 가격 등을 기준으로 비교해줘."),
    ("가구", "디자인, 내구성, 크기, 수납 기능, 가격 등을 기준으로 비교해줘."),
    ("조명/인테리어", "밝기, 디자인, 에너지 효율, 설치 편의성, 가격 등을 기준으로 비교해줘."),
    ("패브릭/홈데코", "재질, 세탁 용이성, 디자인, 계절성, 가격 등을 기준으로 비교해줘."),
    ("주방용품", "재질, 내구성, 세척 용이성, 기능성, 가격 등을 기준으로 비교해줘."),
    ("생활용품", "실용성, 내구성, 사용 편의성, 디자인, 가격 등을 기준으로 비교해줘."),
    ("스포츠/레저", "내구성, 사용 목적 적합성, 기능성, 휴대성, 가격 등을 기준으로 비교해줘."),
    ("자동차/오토바이", "성능, 브랜드, 연비, 안전 기능, 유지비용 등을 기준으로 비교해줘."),
    ("키덜트/취미", "희소성, 디자인, 만족도, 수집 가치, 가격 등을 기준으로 비교해줘."),
    ("건강의료용품", "정확성, 안전성, 사용 편의성, 인증 여부, 가격 등을 기준으로 비교해줘."),
    ("악기/문구", "사용감, 내구성, 기능성, 브랜드, 가격 등을 기준으로 비교해줘."),
    ("공구", "내구성, 사용 용이성, 기능, 브랜드, 가격 등을 기준으로 비교해줘."),
    ("렌탈관", "렌탈 기간, 비용, 유지보수 조건, 최신 모델 여부, 브랜드 신뢰도 등을 기준으로 비교해줘."),
    ("e쿠폰/티켓/생활편의", "사용처, 유효기간, 할인율, 사용 조건, 가격 등을 기준으로 비교해줘."),
    ("여행", "여행지 매력도, 일정 구성, 가격, 포함 혜택, 후기 평점 등을 기준으로 비교해줘."),
];

/// Category label to comparison-dimension sentence, with a generic fallback
/// for labels the table does not know.
#[derive(Debug, Clone)]
pub struct CategoryCriteriaTable {
    entries: HashMap<String, String>,
    fallback: String,
}

impl CategoryCriteriaTable {
    pub fn new(entries: HashMap<String, String>, fallback: impl Into<String>) -> Self {
        Self {
            entries,
            fallback: fallback.into(),
        }
    }

    /// The shopping categories offered to the model in the checklist prompt.
    pub fn standard() -> Self {
        let entries = STANDARD_CRITERIA
            .iter()
            .map(|(category, criteria)| (category.to_string(), criteria.to_string()))
            .collect();
        Self::new(entries, GENERIC_CRITERIA)
    }

    /// Exact-match lookup; labels are not normalized.
    pub fn lookup(&self, category: &str) -> &str {
        self.entries
            .get(category)
            .map(String::as_str)
            .unwrap_or(&self.fallback)
    }

    #[cfg(test)]
    pub fn contains(&self, category: &str) -> bool {
        self.entries.contains_key(category)
    }

    #[cfg(test)]
    pub fn fallback(&self) -> &str {
        &self.fallback
    }
}
