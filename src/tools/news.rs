//! Headline and article search via NewsAPI.

use super::args::NewsArgs;
use super::http::{endpoint, generic, get_json};
use super::{ToolContext, NEWS};
use crate::error::ToolError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const FAILURE: &str = "Failed to fetch news data";

/// Most articles returned per request.
pub const PAGE_SIZE: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsArticle {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub url: String,
    pub source: NewsSource,
    pub published_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsSource {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct NewsResponse {
    #[serde(default)]
    articles: Vec<NewsArticle>,
}

/// Which NewsAPI feed a request resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NewsFeed {
    Search(String),
    Category(String),
    TopHeadlines,
}

impl NewsFeed {
    /// A non-blank query wins over a category; neither means top headlines.
    pub fn select(args: &NewsArgs) -> Self {
        let non_blank = |s: &Option<String>| {
            s.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        if let Some(query) = non_blank(&args.query) {
            Self::Search(query)
        } else if let Some(category) = non_blank(&args.category) {
            Self::Category(category.to_lowercase())
        } else {
            Self::TopHeadlines
        }
    }
}

pub async fn news(ctx: &ToolContext, args: &NewsArgs) -> Result<Value, ToolError> {
    let api_key = ctx
        .config
        .news_api_key
        .expose()
        .ok_or_else(|| ToolError::missing_key("News"))?;

    let page_size = PAGE_SIZE.to_string();
    let mut params: Vec<(&str, &str)> = vec![
        ("apiKey", api_key),
        ("pageSize", page_size.as_str()),
        ("language", "en"),
    ];

    let feed = NewsFeed::select(args);
    let path = match &feed {
        NewsFeed::Search(query) => {
            params.push(("q", query.as_str()));
            "everything"
        }
        NewsFeed::Category(category) => {
            params.push(("category", category.as_str()));
            params.push(("country", "us"));
            "top-headlines"
        }
        NewsFeed::TopHeadlines => {
            params.push(("country", "us"));
            "top-headlines"
        }
    };

    let url = endpoint(&ctx.config.news_api_url, path);
    let body: NewsResponse = get_json(&ctx.http, &url, &params)
        .await
        .map_err(generic(NEWS, FAILURE))?;

    let articles: Vec<NewsArticle> = body.articles.into_iter().take(PAGE_SIZE).collect();
    serde_json::to_value(articles).map_err(|e| ToolError::Execution(e.to_string()))
}
