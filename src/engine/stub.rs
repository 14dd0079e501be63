use std::sync::{Arc, Mutex};

use tokio::sync::mpsc::UnboundedReceiver;

use crate::pagination::FetchRequest;
use crate::types::{Issue, ResultPage};

use super::interface::{Engine, EngineHandle, Event, Request};

/// Every search request the stub has received, in order.
pub type RequestLog = Arc<Mutex<Vec<FetchRequest>>>;

/// A stub engine that serves pre-loaded fixture pages without any network calls.
///
/// The first page answers requests without a cursor; a request with cursor
/// `c` gets the page following the one whose `end_cursor` is `c`.
/// Useful for integration tests and demos that must not require a token.
#[derive(Default)]
pub struct StubEngine {
    pub pages: Vec<ResultPage>,
    pub issues: Vec<Issue>,
    /// Number of search requests to fail before answering normally.
    pub fail_searches: usize,
    /// Like `fail_searches`, but only counts requests that carry a cursor.
    pub fail_follow_ups: usize,
    pub log: RequestLog,
}

impl StubEngine {
    pub fn with_pages(pages: Vec<ResultPage>) -> Self {
        Self {
            pages,
            ..Self::default()
        }
    }

    pub fn request_log(&self) -> RequestLog {
        Arc::clone(&self.log)
    }

    fn page_for(&self, request: &FetchRequest) -> Result<ResultPage, String> {
        let Some(after) = request.after.as_deref() else {
            return Ok(self.pages.first().cloned().unwrap_or_default());
        };
        self.pages
            .iter()
            .position(|p| p.page_info.end_cursor.as_deref() == Some(after))
            .and_then(|i| self.pages.get(i + 1))
            .cloned()
            .ok_or_else(|| format!("no page after cursor {after:?}"))
    }

    fn issue_by_id(&self, id: &str) -> Option<Issue> {
        self.issues
            .iter()
            .chain(self.pages.iter().flat_map(|p| p.edges.iter().map(|e| &e.node)))
            .find(|i| i.id == id)
            .cloned()
    }
}

impl Engine for StubEngine {
    fn start(self) -> EngineHandle {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<Request>();
        std::thread::spawn(move || {
            let rt = tokio::runtime::Runtime::new().expect("stub tokio runtime");
            rt.block_on(self.run_loop(rx));
        });
        EngineHandle::new(tx)
    }
}

impl StubEngine {
    async fn run_loop(mut self, mut rx: UnboundedReceiver<Request>) {
        while let Some(req) = rx.recv().await {
            match req {
                Request::SearchIssues { request, reply_tx } => {
                    if let Ok(mut log) = self.log.lock() {
                        log.push(request.clone());
                    }
                    let scripted = if request.is_first_page() || self.fail_searches > 0 {
                        &mut self.fail_searches
                    } else {
                        &mut self.fail_follow_ups
                    };
                    if *scripted > 0 {
                        *scripted -= 1;
                        let _ = reply_tx.send(Event::SearchFailed {
                            request,
                            message: "stub failure".into(),
                        });
                        continue;
                    }
                    let event = match self.page_for(&request) {
                        Ok(page) => Event::PageFetched {
                            request,
                            page: Some(page),
                            rate_limit: None,
                        },
                        Err(message) => Event::SearchFailed { request, message },
                    };
                    let _ = reply_tx.send(event);
                }
                Request::FetchIssue { id, reply_tx } => {
                    let issue = self.issue_by_id(&id);
                    let _ = reply_tx.send(Event::IssueFetched {
                        id,
                        issue,
                        rate_limit: None,
                    });
                }
                Request::Shutdown => break,
            }
        }
    }
}
