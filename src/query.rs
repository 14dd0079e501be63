//! Search query string for the GitHub `search` endpoint.

const LANGUAGE_PREFIX: &str = "language:";
const LABEL_PREFIX: &str = "label:";

/// Build `language:<language> label:<l1> label:<l2> ...`.
///
/// An empty language still produces the bare `language:` term. Labels are
/// emitted verbatim, in order, without escaping.
pub fn build_query(language: &str, labels: &[String]) -> String {
    let mut query = format!("{LANGUAGE_PREFIX}{language}");
    for label in labels {
        query.push(' ');
        query.push_str(LABEL_PREFIX);
        query.push_str(label);
    }
    query
}

/// Split a query produced by [`build_query`] back into language and labels.
///
/// Terms are recognised by their `language:` / `label:` prefix; anything
/// else is skipped. A label containing a space cannot be recovered exactly,
/// since the query carries no quoting.
pub fn parse_query(query: &str) -> (String, Vec<String>) {
    let mut language = String::new();
    let mut labels = Vec::new();
    for term in query.split(' ') {
        if let Some(lang) = term.strip_prefix(LANGUAGE_PREFIX) {
            lang.clone_into(&mut language);
        } else if let Some(label) = term.strip_prefix(LABEL_PREFIX) {
            labels.push(label.to_owned());
        }
    }
    (language, labels)
}
