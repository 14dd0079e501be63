//! Cursor pagination over a single search query.
//!
//! The [`Paginator`] owns the accumulated edges for the active query. It never
//! performs I/O itself: it hands out [`FetchRequest`]s and is fed the replies.
//! Replies whose originating query is no longer active are dropped.

use crate::types::{IssueEdge, PageInfo, ResultPage};

/// One outgoing search request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub query: String,
    /// `None` for the first page.
    pub after: Option<String>,
}

impl FetchRequest {
    pub fn first(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            after: None,
        }
    }

    pub fn is_first_page(&self) -> bool {
        self.after.is_none()
    }
}

/// Observable fetch state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    /// No searchable query.
    Idle,
    /// First page in flight, nothing accumulated.
    LoadingFirst,
    /// At least one page present.
    Loaded,
    /// A follow-up page is in flight.
    LoadingMore,
    /// The first page failed; nothing to show until a retry or a new query.
    Failed,
}

/// Append `page` to `previous`.
///
/// Edge order is arrival order; nothing is reordered or de-duplicated. A
/// missing page leaves `previous` untouched and yields no new page info.
pub fn merge(
    mut previous: Vec<IssueEdge>,
    page: Option<ResultPage>,
) -> (Vec<IssueEdge>, Option<PageInfo>) {
    match page {
        Some(page) => {
            previous.extend(page.edges);
            (previous, Some(page.page_info))
        }
        None => (previous, None),
    }
}

#[derive(Debug, Default)]
pub struct Paginator {
    query: Option<String>,
    edges: Vec<IssueEdge>,
    page_info: Option<PageInfo>,
    in_flight: Option<FetchRequest>,
    failed: Option<FetchRequest>,
    error: Option<String>,
}

impl Paginator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> FetchState {
        match (&self.query, &self.in_flight) {
            (None, _) => FetchState::Idle,
            (Some(_), Some(req)) if req.is_first_page() => FetchState::LoadingFirst,
            (Some(_), Some(_)) => FetchState::LoadingMore,
            (Some(_), None) if self.page_info.is_some() => FetchState::Loaded,
            (Some(_), None) => FetchState::Failed,
        }
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn edges(&self) -> &[IssueEdge] {
        &self.edges
    }

    pub fn page_info(&self) -> Option<&PageInfo> {
        self.page_info.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn has_next_page(&self) -> bool {
        self.page_info
            .as_ref()
            .is_some_and(|p| p.next_cursor().is_some())
    }

    /// Point the paginator at `query` (or at nothing).
    ///
    /// A different query discards every accumulated page and returns the
    /// first-page request to issue. The same query is a no-op.
    pub fn sync_query(&mut self, query: Option<String>) -> Option<FetchRequest> {
        if query == self.query {
            return None;
        }
        tracing::debug!("paginator: query {:?} -> {query:?}", self.query);
        *self = Self {
            query,
            ..Self::default()
        };
        let request = FetchRequest::first(self.query.clone()?);
        self.in_flight = Some(request.clone());
        Some(request)
    }

    /// Request the next page. Returns `None` while a fetch is in flight, when
    /// there is no next page, or when idle.
    ///
    /// After a failed first page this re-issues it, same as [`Self::retry`].
    pub fn fetch_more(&mut self) -> Option<FetchRequest> {
        match self.state() {
            FetchState::Loaded => {
                let cursor = self.page_info.as_ref()?.next_cursor()?.to_owned();
                let request = FetchRequest {
                    query: self.query.clone()?,
                    after: Some(cursor),
                };
                // A fresh request supersedes any earlier failure.
                self.failed = None;
                self.error = None;
                self.in_flight = Some(request.clone());
                Some(request)
            }
            FetchState::Failed => self.retry(),
            FetchState::Idle | FetchState::LoadingFirst | FetchState::LoadingMore => None,
        }
    }

    /// Re-issue the last failed request, if any and nothing is in flight.
    pub fn retry(&mut self) -> Option<FetchRequest> {
        if self.in_flight.is_some() {
            return None;
        }
        let request = self.failed.take()?;
        self.error = None;
        self.in_flight = Some(request.clone());
        Some(request)
    }

    /// Whether a reply for `request` belongs to the outstanding fetch.
    fn is_current(&self, request: &FetchRequest) -> bool {
        self.in_flight.as_ref() == Some(request)
    }

    /// Feed a page reply. Returns `false` if it was stale and dropped.
    pub fn on_page(&mut self, request: &FetchRequest, page: Option<ResultPage>) -> bool {
        if !self.is_current(request) {
            tracing::debug!(
                "paginator: dropping stale page for {:?} after {:?}",
                request.query,
                request.after
            );
            return false;
        }
        self.in_flight = None;
        self.failed = None;
        self.error = None;

        let previous = if request.is_first_page() {
            Vec::new()
        } else {
            std::mem::take(&mut self.edges)
        };
        let (edges, page_info) = merge(previous, page);
        self.edges = edges;
        if let Some(info) = page_info {
            self.page_info = Some(info);
        } else if request.is_first_page() {
            self.page_info = Some(PageInfo::default());
        }
        tracing::debug!(
            "paginator: {} edges, has_next_page={}",
            self.edges.len(),
            self.has_next_page()
        );
        true
    }

    /// Feed a failed reply. Returns `false` if it was stale and dropped.
    ///
    /// Accumulated edges are kept; the request is remembered for [`Self::retry`].
    pub fn on_error(&mut self, request: &FetchRequest, message: &str) -> bool {
        if !self.is_current(request) {
            tracing::debug!("paginator: dropping stale error for {:?}", request.query);
            return false;
        }
        self.in_flight = None;
        self.failed = Some(request.clone());
        self.error = Some(message.to_owned());
        true
    }
}
