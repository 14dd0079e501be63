//! Plain-text rendering of the issue list and of a single issue.

use std::fmt::Write as _;

use crate::app::{IssueListView, IssueLookup};
use crate::config::types::LanguageOption;
use crate::pagination::FetchState;
use crate::types::Issue;
use crate::util::{excerpt, expand_emoji, format_date};

const BODY_EXCERPT_CHARS: usize = 100;

/// One line per issue: `[state] owner/repo #N title (published) {labels}`.
fn issue_line(issue: &Issue, date_format: &str) -> String {
    let repo = issue
        .repo
        .as_ref()
        .map_or_else(String::new, crate::types::RepoRef::full_name);
    let published = issue
        .published_at
        .as_ref()
        .map(|dt| format!(" ({})", format_date(dt, date_format)))
        .unwrap_or_default();
    let labels = issue.label_names().collect::<Vec<_>>().join(", ");
    let mut line = format!(
        "[{}] {repo} #{} {}{published}",
        issue.state.as_str(),
        issue.number,
        expand_emoji(&issue.title),
    );
    if !labels.is_empty() {
        let _ = write!(line, " {{{labels}}}");
    }
    line
}

/// Render the whole list view.
pub fn render_list(view: &IssueListView<'_>, date_format: &str) -> String {
    let mut out = String::new();
    let language = if view.language.is_empty() {
        "(choose your language)"
    } else {
        view.language
    };
    let _ = writeln!(out, "Language: {language}");
    let _ = writeln!(out, "Labels: {}", view.labels.join(", "));

    if view.state == FetchState::Idle {
        let _ = writeln!(out, "Pick a language and at least one label to search.");
        return out;
    }
    if let Some(query) = view.query {
        let _ = writeln!(out, "Query: {query}");
    }

    if view.loading && view.edges.is_empty() {
        let _ = writeln!(out, "Loading...");
    }
    for (i, edge) in view.edges.iter().enumerate() {
        let _ = writeln!(out, "{:>3}. {}", i + 1, issue_line(&edge.node, date_format));
        let body = excerpt(&expand_emoji(&edge.node.body), BODY_EXCERPT_CHARS);
        if !body.is_empty() {
            let _ = writeln!(out, "     {body}");
        }
    }
    if view.loading && !view.edges.is_empty() {
        let _ = writeln!(out, "Loading...");
    }
    if let Some(error) = view.error {
        let _ = writeln!(out, "Error: {error} (type `retry` to try again)");
    }
    if !view.loading && view.state == FetchState::Loaded {
        if view.edges.is_empty() {
            let _ = writeln!(out, "No issues found.");
        } else if view.has_next_page {
            let _ = writeln!(out, "Type `more` to fetch more.");
        }
    }
    out
}

/// Render a single issue in full.
pub fn render_issue(issue: &Issue, date_format: &str) -> String {
    let mut out = issue_line(issue, date_format);
    out.push('\n');
    let _ = writeln!(out, "{}", issue.url);
    if let Some(repo) = issue.repo.as_ref().filter(|r| !r.url.is_empty()) {
        let _ = writeln!(out, "Repository: {}", repo.url);
    }
    let body = expand_emoji(&issue.body);
    if !body.trim().is_empty() {
        out.push('\n');
        out.push_str(body.trim_end());
        out.push('\n');
    }
    out
}

pub fn render_lookup(lookup: &IssueLookup, date_format: &str) -> String {
    match lookup {
        IssueLookup::None => String::new(),
        IssueLookup::Loading(id) => format!("Loading {id}...\n"),
        IssueLookup::Found(issue) => render_issue(issue, date_format),
        IssueLookup::NotFound(id) => format!("No issue with id {id}.\n"),
        IssueLookup::Failed(message) => format!("Error: {message}\n"),
    }
}

pub fn render_languages(options: &[LanguageOption]) -> String {
    options
        .iter()
        .map(|o| format!("{:<12} {}\n", o.value, o.label))
        .collect()
}
