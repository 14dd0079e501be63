use crate::url::{RouteParams, percent_decode};

// ---------------------------------------------------------------------------
// Filter state
// ---------------------------------------------------------------------------

/// The locally-owned search filters: one language and an ordered label list.
///
/// An empty `language` means "unset". Labels keep insertion order and
/// duplicates; every entry is trimmed and non-empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    pub language: String,
    pub labels: Vec<String>,
}

impl FilterState {
    /// Build the initial state from URL parameters.
    ///
    /// A missing language starts unset. When `url_labels` yields no labels
    /// (absent, blank, or undecodable) the `default_labels` are used instead.
    pub fn initialize(
        url_language: Option<&str>,
        url_labels: Option<&str>,
        default_labels: &[String],
    ) -> Self {
        let language = url_language.unwrap_or_default().to_owned();
        let mut labels = url_labels.map(labels_from_param).unwrap_or_default();
        if labels.is_empty() {
            labels = default_labels
                .iter()
                .map(|l| l.trim())
                .filter(|l| !l.is_empty())
                .map(str::to_owned)
                .collect();
        }
        Self { language, labels }
    }

    /// Convenience wrapper over [`FilterState::initialize`] for parsed route
    /// parameters. A missing `language` falls back to `default_language`.
    pub fn from_route(
        params: &RouteParams,
        default_language: &str,
        default_labels: &[String],
    ) -> Self {
        let language = params
            .language()
            .unwrap_or_else(|| default_language.to_owned());
        Self::initialize(Some(&language), params.labels_raw(), default_labels)
    }

    pub fn set_language(&mut self, language: impl Into<String>) {
        self.language = language.into();
    }

    /// Append `label` (trimmed). Blank input is ignored; returns whether the
    /// label list changed.
    ///
    /// The `labels` parameter is comma-separated, so `"a,b"` is appended as
    /// two labels. Otherwise a reload of the pushed URL would disagree with
    /// the session.
    pub fn add_label(&mut self, label: &str) -> bool {
        let before = self.labels.len();
        self.labels.extend(
            label
                .split(',')
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_owned),
        );
        self.labels.len() != before
    }

    /// A search only makes sense with a language and at least one label.
    pub fn is_searchable(&self) -> bool {
        !self.language.is_empty() && !self.labels.is_empty()
    }
}

/// Decode a `labels` parameter into a label list.
///
/// The value is percent-decoded, split on commas, trimmed, and blank tokens
/// are dropped. A value that fails to decode yields no labels.
pub fn labels_from_param(raw: &str) -> Vec<String> {
    let decoded = match percent_decode(raw) {
        Ok(decoded) => decoded,
        Err(e) => {
            tracing::debug!("ignoring undecodable labels parameter {raw:?}: {e}");
            return Vec::new();
        }
    };
    decoded
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}
