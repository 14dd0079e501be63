use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

use crate::context::AppContext;
use crate::engine::{Event, Request};
use crate::filter::FilterState;
use crate::local::{LocalField, LocalStoreError, LocalValue};
use crate::pagination::{FetchRequest, FetchState, Paginator};
use crate::query::build_query;
use crate::types::{Issue, IssueEdge, RateLimitInfo};
use crate::url::{Navigator, RouteParams};

// ---------------------------------------------------------------------------
// Read model
// ---------------------------------------------------------------------------

/// Everything the presentation layer needs to draw the issue list.
#[derive(Debug, Clone, Copy)]
pub struct IssueListView<'a> {
    pub language: &'a str,
    pub labels: &'a [String],
    /// The active search query, if the filters are searchable.
    pub query: Option<&'a str>,
    /// Accumulated results for `query` only.
    pub edges: &'a [IssueEdge],
    /// True while a first page or a follow-up page is in flight.
    pub loading: bool,
    pub has_next_page: bool,
    pub error: Option<&'a str>,
    pub state: FetchState,
}

/// State of a single-issue lookup.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum IssueLookup {
    #[default]
    None,
    Loading(String),
    Found(Box<Issue>),
    NotFound(String),
    Failed(String),
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// Wires the filter store, query builder, paginator, engine and navigator
/// together.
///
/// Engine replies are only applied when [`IssueFinder::pump`] or one of the
/// `wait_*` methods runs, one event at a time.
pub struct IssueFinder<N: Navigator> {
    ctx: AppContext,
    paginator: Paginator,
    navigator: N,
    route: RouteParams,
    path: String,
    reply_tx: Sender<Event>,
    reply_rx: Receiver<Event>,
    rate_limit: Option<RateLimitInfo>,
    lookup: IssueLookup,
}

impl<N: Navigator> IssueFinder<N> {
    /// Build the controller and issue the first fetch if the initial filters
    /// are searchable. `route` holds the parameters of the current location;
    /// unrelated parameters are kept on every navigation push.
    pub fn new(ctx: AppContext, navigator: N, route: RouteParams, path: impl Into<String>) -> Self {
        let (reply_tx, reply_rx) = std::sync::mpsc::channel();
        let mut finder = Self {
            ctx,
            paginator: Paginator::new(),
            navigator,
            route,
            path: path.into(),
            reply_tx,
            reply_rx,
            rate_limit: None,
            lookup: IssueLookup::None,
        };
        finder.refresh();
        finder
    }

    // -----------------------------------------------------------------------
    // Read side
    // -----------------------------------------------------------------------

    pub fn view(&self) -> IssueListView<'_> {
        let (language, labels) = match self.ctx.store().filters() {
            Ok(f) => (f.language.as_str(), f.labels.as_slice()),
            Err(_) => ("", &[][..]),
        };
        IssueListView {
            language,
            labels,
            query: self.paginator.query(),
            edges: self.paginator.edges(),
            loading: self.paginator.is_loading(),
            has_next_page: self.paginator.has_next_page(),
            error: self.paginator.error(),
            state: self.paginator.state(),
        }
    }

    pub fn language(&self) -> Result<&str, LocalStoreError> {
        self.ctx.store().language()
    }

    pub fn labels(&self) -> Result<&[String], LocalStoreError> {
        self.ctx.store().labels()
    }

    pub fn rate_limit(&self) -> Option<&RateLimitInfo> {
        self.rate_limit.as_ref()
    }

    pub fn lookup(&self) -> &IssueLookup {
        &self.lookup
    }

    pub fn navigator(&self) -> &N {
        &self.navigator
    }

    /// Href reproducing the current filters.
    pub fn href(&self) -> String {
        self.route.to_href(&self.path)
    }

    /// The query the filters currently derive, if they are searchable.
    fn derived_query(&self) -> Option<String> {
        let filters = self.ctx.store().filters().ok()?;
        filters
            .is_searchable()
            .then(|| build_query(&filters.language, &filters.labels))
    }

    pub fn subscribe(&mut self, field: LocalField, callback: impl FnMut(&LocalValue) + 'static) {
        self.ctx.store_mut().subscribe(field, callback);
    }

    // -----------------------------------------------------------------------
    // Actions
    // -----------------------------------------------------------------------

    pub fn set_language(&mut self, language: &str) -> Result<(), LocalStoreError> {
        self.ctx.store_mut().set_language(language)?;
        self.navigate();
        self.refresh();
        Ok(())
    }

    /// Append a label. Blank input changes nothing and returns `false`.
    pub fn add_label(&mut self, label: &str) -> Result<bool, LocalStoreError> {
        let added = self.ctx.store_mut().add_label(label)?;
        if added {
            self.navigate();
            self.refresh();
        }
        Ok(added)
    }

    /// Reset the filters to `defaults` and navigate to the bare path.
    ///
    /// Every route parameter is dropped; the defaults apply again on reload.
    pub fn clear(&mut self, defaults: &FilterState) -> Result<(), LocalStoreError> {
        let store = self.ctx.store_mut();
        store.set(LocalValue::Language(defaults.language.clone()))?;
        store.set(LocalValue::Labels(defaults.labels.clone()))?;
        self.route = RouteParams::default();
        self.navigator.push(self.route.to_href(&self.path));
        self.refresh();
        Ok(())
    }

    /// Request the next page. Returns whether a request was issued.
    pub fn fetch_next_page(&mut self) -> bool {
        let request = self.paginator.fetch_more();
        self.send_search(request)
    }

    /// Re-issue the last failed page request. Returns whether one was issued.
    pub fn retry(&mut self) -> bool {
        let request = self.paginator.retry();
        self.send_search(request)
    }

    /// Look up a single issue by node id.
    pub fn lookup_issue(&mut self, id: &str) {
        self.lookup = IssueLookup::Loading(id.to_owned());
        self.ctx.engine().send(Request::FetchIssue {
            id: id.to_owned(),
            reply_tx: self.reply_tx.clone(),
        });
    }

    fn navigate(&mut self) {
        let Ok(filters) = self.ctx.store().filters() else {
            return;
        };
        self.route = std::mem::take(&mut self.route).with_filters(&filters.language, &filters.labels);
        let href = self.route.to_href(&self.path);
        self.navigator.push(href);
    }

    /// Re-derive the query and restart pagination if it changed.
    fn refresh(&mut self) {
        let request = self.paginator.sync_query(self.derived_query());
        self.send_search(request);
    }

    fn send_search(&self, request: Option<FetchRequest>) -> bool {
        let Some(request) = request else {
            return false;
        };
        tracing::debug!("finder: fetching {:?} after {:?}", request.query, request.after);
        self.ctx.engine().send(Request::SearchIssues {
            request,
            reply_tx: self.reply_tx.clone(),
        });
        true
    }

    // -----------------------------------------------------------------------
    // Engine replies
    // -----------------------------------------------------------------------

    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::PageFetched {
                request,
                page,
                rate_limit,
            } => {
                if rate_limit.is_some() {
                    self.rate_limit = rate_limit;
                }
                self.paginator.on_page(&request, page);
            }
            Event::SearchFailed { request, message } => {
                if self.paginator.on_error(&request, &message) {
                    tracing::warn!("finder: search {:?} failed: {message}", request.query);
                }
            }
            Event::IssueFetched {
                id,
                issue,
                rate_limit,
            } => {
                if rate_limit.is_some() {
                    self.rate_limit = rate_limit;
                }
                if !matches!(&self.lookup, IssueLookup::Loading(pending) if *pending == id) {
                    tracing::debug!("finder: dropping stale issue reply for {id}");
                    return;
                }
                self.lookup = match issue {
                    Some(issue) => IssueLookup::Found(Box::new(issue)),
                    None => IssueLookup::NotFound(id),
                };
            }
            Event::FetchError { context, message } => {
                tracing::warn!("finder: {context}: {message}");
                if matches!(self.lookup, IssueLookup::Loading(_)) {
                    self.lookup = IssueLookup::Failed(message);
                }
            }
        }
    }

    /// Apply every reply that has already arrived. Returns how many.
    pub fn pump(&mut self) -> usize {
        let mut count = 0;
        while let Ok(event) = self.reply_rx.try_recv() {
            self.handle_event(event);
            count += 1;
        }
        count
    }

    /// Wait up to `timeout` for one reply and apply it.
    pub fn wait_for_event(&mut self, timeout: Duration) -> bool {
        match self.reply_rx.recv_timeout(timeout) {
            Ok(event) => {
                self.handle_event(event);
                true
            }
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => false,
        }
    }

    /// Apply replies until nothing is in flight or `timeout` elapses.
    /// Returns `true` if everything settled in time.
    pub fn wait_until_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.paginator.is_loading() || matches!(self.lookup, IssueLookup::Loading(_)) {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() || !self.wait_for_event(remaining) {
                return false;
            }
        }
        true
    }

    /// Stop the engine and release the context.
    pub fn shutdown(self) {
        self.ctx.shutdown();
    }
}
