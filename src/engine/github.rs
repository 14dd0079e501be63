use std::sync::Arc;

use octocrab::Octocrab;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::config::types::GitHubConfig;
use crate::github::{client::GitHubClient, graphql, rate_limit::describe_fetch_error};

use super::interface::{Engine, EngineHandle, Event, Request};

/// The real GitHub backend engine.
pub struct GitHubEngine {
    client: GitHubClient,
    page_size: u32,
}

impl GitHubEngine {
    pub fn new(config: &GitHubConfig) -> Self {
        Self {
            client: GitHubClient::new(config),
            page_size: config.effective_page_size(),
        }
    }

    /// Use a pre-built Octocrab instance (custom base URI, tests).
    pub fn with_octocrab(octocrab: Arc<Octocrab>, config: &GitHubConfig) -> Self {
        Self {
            client: GitHubClient::with_octocrab(octocrab, config.cache_ttl_minutes),
            page_size: config.effective_page_size(),
        }
    }
}

impl Engine for GitHubEngine {
    fn start(self) -> EngineHandle {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<Request>();
        let handle = EngineHandle::new(tx);
        let _ = std::thread::Builder::new()
            .name("issue-finder-engine".to_owned())
            .spawn(move || {
                let rt = tokio::runtime::Runtime::new().expect("tokio runtime init");
                rt.block_on(self.run_loop(rx));
            });
        handle
    }
}

impl GitHubEngine {
    async fn run_loop(mut self, mut rx: UnboundedReceiver<Request>) {
        // Requests are handled one at a time, in arrival order.
        while let Some(req) = rx.recv().await {
            match req {
                Request::Shutdown => break,
                req => self.handle_request(req).await,
            }
        }
        tracing::debug!("engine: shutting down");
    }

    async fn handle_request(&mut self, req: Request) {
        match req {
            Request::SearchIssues { request, reply_tx } => {
                let octocrab = match self.client.octocrab() {
                    Ok(o) => o,
                    Err(e) => {
                        tracing::warn!("engine: SearchIssues: GitHub client failed: {e:#}");
                        let _ = reply_tx.send(Event::SearchFailed {
                            request,
                            message: format!("{e:#}"),
                        });
                        return;
                    }
                };
                let cache = self.client.cache();
                tracing::debug!(
                    "engine: SearchIssues {:?} after {:?}",
                    request.query,
                    request.after
                );
                match graphql::search_issues(
                    &octocrab,
                    &request.query,
                    self.page_size,
                    request.after.clone(),
                    Some(&cache),
                )
                .await
                {
                    Ok(result) => {
                        tracing::debug!(
                            "engine: sending PageFetched count={}",
                            result.page.as_ref().map_or(0, |p| p.edges.len())
                        );
                        let _ = reply_tx.send(Event::PageFetched {
                            request,
                            page: result.page,
                            rate_limit: result.rate_limit,
                        });
                    }
                    Err(e) => {
                        tracing::warn!("engine: SearchIssues {:?} error: {e:#}", request.query);
                        let _ = reply_tx.send(Event::SearchFailed {
                            request,
                            message: describe_fetch_error(&e),
                        });
                    }
                }
            }

            Request::FetchIssue { id, reply_tx } => {
                let octocrab = match self.client.octocrab() {
                    Ok(o) => o,
                    Err(e) => {
                        tracing::warn!("engine: FetchIssue: GitHub client failed: {e:#}");
                        let _ = reply_tx.send(Event::FetchError {
                            context: format!("FetchIssue[{id}]"),
                            message: format!("{e:#}"),
                        });
                        return;
                    }
                };
                let cache = self.client.cache();
                match graphql::fetch_issue(&octocrab, &id, Some(&cache)).await {
                    Ok((issue, rate_limit)) => {
                        let _ = reply_tx.send(Event::IssueFetched {
                            id,
                            issue,
                            rate_limit,
                        });
                    }
                    Err(e) => {
                        tracing::warn!("engine: FetchIssue {id} error: {e:#}");
                        let _ = reply_tx.send(Event::FetchError {
                            context: format!("FetchIssue[{id}]"),
                            message: describe_fetch_error(&e),
                        });
                    }
                }
            }

            Request::Shutdown => {}
        }
    }
}
