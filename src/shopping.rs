use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use crate::config::SearchConfig;
use crate::error::PipelineError;

pub const CLIENT_ID_VAR: &str = "NAVER_CLIENT_ID";
pub const CLIENT_SECRET_VAR: &str = "NAVER_CLIENT_SECRET";

/// Ordering requested from the search backend.
#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Relevance,
    Date,
    PriceAscending,
    PriceDescending,
}

impl SortOrder {
    pub fn as_param(&self) -> &'static str {
        match self {
            SortOrder::Relevance => "sim",
            SortOrder::Date => "date",
            SortOrder::PriceAscending => "asc",
            SortOrder::PriceDescending => "dsc",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub query: String,
    pub page_size: usize,
    /// 1-based offset of the first result.
    pub page_offset: usize,
    pub sort: SortOrder,
}

/// One shopping search hit. Only `title` and `low_price` feed the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub title: String,
    #[serde(rename = "lprice")]
    pub low_price: String,
    #[serde(default, rename = "hprice", skip_serializing_if = "Option::is_none")]
    pub high_price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mall_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maker: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category3: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category4: Option<String>,
}

impl Listing {
    #[cfg(test)]
    pub fn new(title: impl Into<String>, low_price: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            low_price: low_price.into(),
            high_price: None,
            link: None,
            image: None,
            mall_name: None,
            product_id: None,
            brand: None,
            maker: None,
            category1: None,
            category2: None,
            category3: None,
            category4: None,
        }
    }
}

/// Shopping search collaborator.
#[async_trait]
pub trait ShoppingSearch: Send + Sync {
    /// Return listings in backend order. A non-success response is an error.
    async fn search(&self, query: &SearchQuery) -> Result<Vec<Listing>>;
}

#[derive(Debug, Deserialize)]
struct ShopResponse {
    #[serde(default)]
    items: Vec<Listing>,
}

/// Naver shopping search client
pub struct NaverShoppingClient {
    client_id: String,
    client_secret: String,
    endpoint: String,
    client: reqwest::Client,
}

fn required_var(name: &'static str) -> Result<String> {
    env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| PipelineError::MissingCredential(name).into())
}

impl NaverShoppingClient {
    pub fn from_env(config: &SearchConfig) -> Result<Self> {
        let client_id = required_var(CLIENT_ID_VAR)?;
        let client_secret = required_var(CLIENT_SECRET_VAR)?;
        Self::with_config(client_id, client_secret, config)
    }

    pub fn with_config(client_id: String, client_secret: String, config: &SearchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client for shopping search")?;
        Ok(Self {
            client_id,
            client_secret,
            endpoint: config.endpoint.clone(),
            client,
        })
    }
}

fn query_params(query: &SearchQuery) -> Vec<(&'static str, String)> {
    vec![
        ("query", query.query.clone()),
        ("display", query.page_size.to_string()),
        ("start", query.page_offset.to_string()),
        ("sort", query.sort.as_param().to_string()),
    ]
}

fn parse_listings(body: &str) -> Result<Vec<Listing>> {
    let response: ShopResponse =
        serde_json::from_str(body).context("Failed to parse shopping search response")?;
    Ok(response.items)
}

#[async_trait]
impl ShoppingSearch for NaverShoppingClient {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<Listing>> {
        let response = self
            .client
            .get(&self.endpoint)
            .header("X-Naver-Client-Id", &self.client_id)
            .header("X-Naver-Client-Secret", &self.client_secret)
            .query(&query_params(query))
            .send()
            .await
            .with_context(|| format!("Failed to send shopping search for '{}'", query.query))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("Shopping search error (status {}) for '{}'", status, query.query));
        }

        let body = response.text().await?;
        parse_listings(&body)
    }
}
