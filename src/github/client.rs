use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use moka::future::Cache;
use octocrab::Octocrab;

use crate::config::types::GitHubConfig;
use crate::github::auth;

/// A GitHub API client for one host, created lazily on first use, plus an
/// LRU cache for search and issue responses.
pub struct GitHubClient {
    host: String,
    instance: Option<Arc<Octocrab>>,
    cache: Cache<String, String>,
}

impl GitHubClient {
    pub fn new(config: &GitHubConfig) -> Self {
        Self {
            host: config.host.clone(),
            instance: None,
            cache: build_cache(config.cache_ttl_minutes),
        }
    }

    /// Wrap an already-built Octocrab instance (custom base URI, tests).
    pub fn with_octocrab(octocrab: Arc<Octocrab>, cache_ttl_minutes: u32) -> Self {
        Self {
            host: String::new(),
            instance: Some(octocrab),
            cache: build_cache(cache_ttl_minutes),
        }
    }

    /// Get or create the Octocrab instance for the configured host.
    pub fn octocrab(&mut self) -> Result<Arc<Octocrab>> {
        if let Some(instance) = &self.instance {
            return Ok(Arc::clone(instance));
        }

        let token = auth::resolve_token(&self.host)?;

        let builder = if self.host == "github.com" {
            Octocrab::builder().personal_token(token)
        } else {
            Octocrab::builder()
                .personal_token(token)
                .base_uri(format!("https://{}/api/v3", self.host))
                .context("setting GHE base URI")?
        };

        let instance = Arc::new(builder.build().context("building octocrab instance")?);
        self.instance = Some(Arc::clone(&instance));
        Ok(instance)
    }

    /// Return a clone of the internal cache (Arc-backed, cheap to clone).
    pub fn cache(&self) -> Cache<String, String> {
        self.cache.clone()
    }
}

fn build_cache(ttl_minutes: u32) -> Cache<String, String> {
    Cache::builder()
        .max_capacity(500)
        .time_to_live(Duration::from_secs(u64::from(ttl_minutes.max(1)) * 60))
        .build()
}
