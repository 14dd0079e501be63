use std::sync::mpsc::Sender;

use crate::pagination::FetchRequest;
use crate::types::{Issue, RateLimitInfo, ResultPage};

/// Handle to the backend engine held by the controller.
///
/// Cheaply cloneable. When the last handle is dropped the sender channel
/// closes, signalling the engine to shut down.
#[derive(Clone)]
pub struct EngineHandle {
    tx: tokio::sync::mpsc::UnboundedSender<Request>,
}

impl EngineHandle {
    pub(super) fn new(tx: tokio::sync::mpsc::UnboundedSender<Request>) -> Self {
        Self { tx }
    }

    /// Send a request to the engine. Non-blocking.
    pub fn send(&self, req: Request) {
        // Ignore errors: if the receiver is gone the engine has already shut down.
        let _ = self.tx.send(req);
    }
}

/// Trait implemented by both `GitHubEngine` and `StubEngine`.
pub trait Engine: Send + 'static {
    fn start(self) -> EngineHandle;
}

/// All operations the controller can send to the engine.
pub enum Request {
    /// One page of issue search results.
    SearchIssues {
        request: FetchRequest,
        reply_tx: Sender<Event>,
    },
    /// A single issue by GraphQL node id.
    FetchIssue {
        id: String,
        reply_tx: Sender<Event>,
    },
    Shutdown,
}

/// All events the engine can push back to the controller.
pub enum Event {
    /// A search page arrived. `page` is `None` when the response carried no
    /// search data at all.
    PageFetched {
        request: FetchRequest,
        page: Option<ResultPage>,
        rate_limit: Option<RateLimitInfo>,
    },
    /// A search page failed. Carries the originating request so stale
    /// failures can be told apart.
    SearchFailed {
        request: FetchRequest,
        message: String,
    },
    IssueFetched {
        id: String,
        issue: Option<Issue>,
        rate_limit: Option<RateLimitInfo>,
    },
    /// Error for requests that are not part of a page sequence.
    FetchError {
        context: String,
        message: String,
    },
}
