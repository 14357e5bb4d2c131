//! Social feed announcements
//!
//! One short post per approved item, sent as `{"text": ...}` to the
//! configured endpoint with a bearer token. Any 2xx status counts as
//! success.

use crate::config::SocialConfig;
use crate::models::Content;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Characters of content included in a post
const EXCERPT_CHARS: usize = 100;

#[async_trait]
pub trait SocialPoster: Send + Sync {
    async fn post(&self, text: &str) -> Result<()>;
}

/// Announcement text for an approved item
pub fn compose_post(item: &Content) -> String {
    let excerpt: String = item.content.chars().take(EXCERPT_CHARS).collect();
    format!("New {}: {} - {}...", item.kind.label(), item.title, excerpt)
}

/// Posts over HTTP with reqwest
pub struct HttpSocialPoster {
    client: reqwest::Client,
    api_url: String,
    bearer_token: Option<String>,
}

impl HttpSocialPoster {
    pub fn new(config: &SocialConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            bearer_token: config.bearer_token.clone(),
        })
    }
}

#[async_trait]
impl SocialPoster for HttpSocialPoster {
    async fn post(&self, text: &str) -> Result<()> {
        let mut request = self
            .client
            .post(&self.api_url)
            .json(&serde_json::json!({ "text": text }));
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.context("Social post request failed")?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Social post returned HTTP {}: {}", status.as_u16(), body));
        }
        Ok(())
    }
}

/// Poster used when social posting is switched off
#[derive(Debug, Default)]
pub struct DisabledPoster;

#[async_trait]
impl SocialPoster for DisabledPoster {
    async fn post(&self, text: &str) -> Result<()> {
        tracing::debug!("Social posting disabled, skipped: {}", text);
        Ok(())
    }
}

/// Choose the poster for `config`
pub fn poster_from_config(config: &SocialConfig) -> Result<Arc<dyn SocialPoster>> {
    if config.enabled {
        Ok(Arc::new(HttpSocialPoster::new(config)?))
    } else {
        Ok(Arc::new(DisabledPoster))
    }
}
