use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::Config;
use crate::reddit::{CountSource, DocumentSource, Publisher, SampleFeed, SourceError};
use crate::store::{normalize_name, UNKNOWN_SUBSCRIBERS};

const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 6;
const LISTING_PAGE_SIZE: usize = 100;
const PREVIEW_CHARS: usize = 180;
const EDIT_REASON: &str = "automated subscriber count update";

pub struct RedditClient {
    client: Client,
    base_url: String,
    wiki_subreddit: String,
    access_token: Option<String>,
}

impl RedditClient {
    pub fn new(config: &Config) -> Result<Self, SourceError> {
        let client = Client::builder()
            .user_agent(config.reddit.user_agent.clone())
            .timeout(Duration::from_secs(config.reddit.request_timeout_secs.max(1)))
            .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(SourceError::Client)?;
        let access_token = Some(config.reddit.access_token.trim().to_string())
            .filter(|token| !token.is_empty());
        Ok(Self {
            client,
            base_url: config.resolved_base_url(),
            wiki_subreddit: config.wiki.subreddit.clone(),
            access_token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, SourceError> {
        let url = self.url(path);
        let response = self
            .authorize(self.client.get(&url).query(query))
            .send()
            .await
            .map_err(|source| SourceError::Request {
                url: url.clone(),
                source,
            })?;
        let body = success_body(&url, response).await?;
        serde_json::from_str(&body).map_err(|e| SourceError::Shape {
            url,
            detail: format!("invalid JSON: {e}"),
        })
    }

    pub async fn fetch_subscriber_count(&self, name: &str) -> Result<i64, SourceError> {
        let path = format!("/r/{name}/about.json");
        let value = self.get_json(&path, &[("raw_json", "1".to_string())]).await?;
        parse_subscribers(&value).ok_or_else(|| SourceError::Shape {
            url: self.url(&path),
            detail: "no subreddit subscriber count".to_string(),
        })
    }

    pub async fn fetch_hot(&self, limit: usize) -> Result<Vec<String>, SourceError> {
        let mut names = Vec::new();
        let mut after: Option<String> = None;
        while names.len() < limit {
            let page_size = (limit - names.len()).min(LISTING_PAGE_SIZE);
            let mut query = vec![("limit", page_size.to_string())];
            if let Some(cursor) = &after {
                query.push(("after", cursor.clone()));
            }
            let value = self.get_json("/r/all/hot.json", &query).await?;
            let (page, next) = parse_listing(&value);
            if page.is_empty() {
                break;
            }
            names.extend(page);
            match next {
                Some(cursor) => after = Some(cursor),
                None => break,
            }
        }
        names.truncate(limit);
        Ok(names)
    }

    pub async fn fetch_wiki_page(&self, page: &str) -> Result<String, SourceError> {
        let path = format!("/r/{}/wiki/{page}.json", self.wiki_subreddit);
        let value = self.get_json(&path, &[]).await?;
        parse_wiki_content(&value).ok_or_else(|| SourceError::Shape {
            url: self.url(&path),
            detail: "wiki page has no content_md".to_string(),
        })
    }

    pub async fn edit_wiki_page(&self, page: &str, content: &str) -> Result<(), SourceError> {
        let url = self.url(&format!("/r/{}/api/wiki/edit", self.wiki_subreddit));
        let form = [("page", page), ("content", content), ("reason", EDIT_REASON)];
        let response = self
            .authorize(self.client.post(&url).form(&form))
            .send()
            .await
            .map_err(|source| SourceError::Request {
                url: url.clone(),
                source,
            })?;
        success_body(&url, response).await?;
        Ok(())
    }

    /// Username behind the configured token.
    pub async fn identity(&self) -> Result<String, SourceError> {
        let value = self.get_json("/api/v1/me", &[]).await?;
        value
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| SourceError::Shape {
                url: self.url("/api/v1/me"),
                detail: "no account name".to_string(),
            })
    }
}

#[async_trait]
impl CountSource for RedditClient {
    async fn subscriber_count(&self, name: &str) -> i64 {
        match self.fetch_subscriber_count(name).await {
            Ok(count) => count,
            Err(err) => {
                warn!("could not fetch subscribers for /r/{name}: {err}");
                UNKNOWN_SUBSCRIBERS
            }
        }
    }
}

#[async_trait]
impl SampleFeed for RedditClient {
    async fn sample(&self, limit: usize) -> Result<Vec<String>, SourceError> {
        self.fetch_hot(limit).await
    }
}

#[async_trait]
impl DocumentSource for RedditClient {
    async fn document(&self, page: &str) -> Result<String, SourceError> {
        self.fetch_wiki_page(page).await
    }
}

#[async_trait]
impl Publisher for RedditClient {
    async fn publish(&self, page: &str, text: &str) -> Result<(), SourceError> {
        debug!("editing wiki page {page} ({} bytes)", text.len());
        self.edit_wiki_page(page, text).await
    }
}

async fn success_body(url: &str, response: Response) -> Result<String, SourceError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|source| SourceError::Request {
            url: url.to_string(),
            source,
        })?;
    if !status.is_success() {
        let preview: String = body.chars().take(PREVIEW_CHARS).collect();
        return Err(SourceError::Status {
            url: url.to_string(),
            status,
            preview,
        });
    }
    Ok(body)
}

/// `about.json` answers with a `t5` thing for real subreddits; anything else
/// (search redirects, banned or private communities) has no usable count.
pub fn parse_subscribers(value: &Value) -> Option<i64> {
    if value.get("kind").and_then(Value::as_str) != Some("t5") {
        return None;
    }
    value
        .get("data")?
        .get("subscribers")?
        .as_i64()
        .filter(|count| *count >= 0)
}

pub fn parse_listing(value: &Value) -> (Vec<String>, Option<String>) {
    let Some(data) = value.get("data") else {
        return (Vec::new(), None);
    };
    let names: Vec<String> = data
        .get("children")
        .and_then(Value::as_array)
        .map(|children| {
            children
                .iter()
                .filter_map(|child| child.get("data")?.get("subreddit")?.as_str())
                .map(normalize_name)
                .collect()
        })
        .unwrap_or_default();
    let after = data
        .get("after")
        .and_then(Value::as_str)
        .filter(|cursor| !cursor.is_empty())
        .map(str::to_string);
    (names, after)
}

pub fn parse_wiki_content(value: &Value) -> Option<String> {
    value
        .get("data")?
        .get("content_md")?
        .as_str()
        .map(str::to_string)
}
