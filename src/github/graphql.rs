use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use moka::future::Cache;
use octocrab::Octocrab;
use serde::{Deserialize, Serialize};

use crate::types::{
    Issue, IssueEdge, IssueState, Label, PageInfo, RateLimitInfo, RepoRef, ResultPage,
};

// ---------------------------------------------------------------------------
// GraphQL query strings
// ---------------------------------------------------------------------------

const SEARCH_ISSUES_QUERY: &str = r"
query FindIssues($query: String!, $first: Int!, $after: String) {
  rateLimit { limit remaining cost }
  search(query: $query, type: ISSUE, first: $first, after: $after) {
    pageInfo { hasNextPage endCursor }
    edges {
      cursor
      node {
        ... on Issue {
          id
          number
          title
          body
          state
          url
          publishedAt
          repository { nameWithOwner url }
          labels(first: 10) { nodes { name color } }
        }
      }
    }
  }
}
";

const FIND_ONE_ISSUE_QUERY: &str = r"
query FindOneIssue($id: ID!) {
  rateLimit { limit remaining cost }
  node(id: $id) {
    ... on Issue {
      id
      number
      title
      body
      state
      url
      publishedAt
      repository { nameWithOwner url }
      labels(first: 10) { nodes { name color } }
    }
  }
}
";

// ---------------------------------------------------------------------------
// Query helpers
// ---------------------------------------------------------------------------

/// Ensure the search query contains `is:issue`. If missing, prepend it so the
/// search never returns pull requests, whose nodes would come back empty.
fn ensure_issue_qualifier(query: &str) -> String {
    if query
        .split_whitespace()
        .any(|token| token.eq_ignore_ascii_case("is:issue"))
    {
        query.to_owned()
    } else {
        format!("is:issue {query}")
    }
}

// ---------------------------------------------------------------------------
// Request payload
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct GraphQLPayload<V: Serialize> {
    query: &'static str,
    variables: V,
}

#[derive(Serialize)]
struct SearchVariables {
    query: String,
    first: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    after: Option<String>,
}

#[derive(Serialize)]
struct NodeVariables {
    id: String,
}

// ---------------------------------------------------------------------------
// Response types (mirror the GraphQL response shape)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct GraphQLResponse<D> {
    data: Option<D>,
    errors: Option<Vec<GraphQLError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQLError {
    message: String,
}

#[derive(Debug, Clone, Deserialize)]
struct RawRateLimit {
    limit: u32,
    remaining: u32,
    cost: u32,
}

impl RawRateLimit {
    fn into_info(self) -> RateLimitInfo {
        RateLimitInfo {
            limit: self.limit,
            remaining: self.remaining,
            cost: self.cost,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchData {
    #[serde(rename = "rateLimit", default)]
    rate_limit: Option<RawRateLimit>,
    search: Option<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(rename = "pageInfo")]
    page_info: PageInfo,
    #[serde(default)]
    edges: Vec<Option<RawEdge>>,
}

#[derive(Debug, Deserialize)]
struct RawEdge {
    #[serde(default)]
    cursor: String,
    node: Option<RawIssue>,
}

#[derive(Debug, Deserialize)]
struct NodeData {
    #[serde(rename = "rateLimit", default)]
    rate_limit: Option<RawRateLimit>,
    node: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: serde::de::DeserializeOwned"))]
struct Connection<T> {
    #[serde(default)]
    nodes: Vec<Option<T>>,
}

#[derive(Debug, Deserialize)]
struct RawLabel {
    name: String,
    #[serde(default)]
    color: String,
}

#[derive(Debug, Deserialize)]
struct RawRepository {
    #[serde(rename = "nameWithOwner")]
    name_with_owner: String,
    #[serde(default)]
    url: String,
}

/// Raw Issue as returned by the GraphQL API.
#[derive(Debug, Deserialize)]
struct RawIssue {
    id: String,
    number: u64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    body: String,
    state: IssueState,
    url: String,
    #[serde(rename = "publishedAt")]
    published_at: Option<DateTime<Utc>>,
    repository: Option<RawRepository>,
    labels: Option<Connection<RawLabel>>,
}

// ---------------------------------------------------------------------------
// Conversion: Raw → Domain
// ---------------------------------------------------------------------------

impl RawIssue {
    fn into_domain(self) -> Issue {
        let labels = self
            .labels
            .map(|c| {
                c.nodes
                    .into_iter()
                    .flatten()
                    .map(|l| Label {
                        name: l.name,
                        color: l.color,
                    })
                    .collect()
            })
            .unwrap_or_default();

        let repo = self.repository.and_then(|r| {
            RepoRef::from_full_name(&r.name_with_owner).map(|repo| RepoRef { url: r.url, ..repo })
        });

        Issue {
            id: self.id,
            number: self.number,
            title: self.title,
            body: self.body,
            state: self.state,
            url: self.url,
            published_at: self.published_at,
            repo,
            labels,
        }
    }
}

fn check_errors(errors: Option<Vec<GraphQLError>>) -> Result<()> {
    if let Some(errors) = errors
        && !errors.is_empty()
    {
        let messages: Vec<_> = errors.iter().map(|e| e.message.as_str()).collect();
        bail!("GraphQL errors: {}", messages.join("; "));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Issue search API
// ---------------------------------------------------------------------------

/// Result of a single page of issue search results.
#[derive(Debug)]
pub struct SearchIssuePage {
    /// `None` when the response had no `search` field.
    pub page: Option<ResultPage>,
    pub rate_limit: Option<RateLimitInfo>,
}

/// Execute the `FindIssues` GraphQL query for a single page.
///
/// When a `cache` is provided, pages are served from the moka LRU cache if a
/// fresh entry exists. On cache hit, `rate_limit` is `None`.
pub async fn search_issues(
    octocrab: &Arc<Octocrab>,
    query: &str,
    first: u32,
    after: Option<String>,
    cache: Option<&Cache<String, String>>,
) -> Result<SearchIssuePage> {
    let cache_key = format!(
        "search:{query}:{first}:{}",
        after.as_deref().unwrap_or_default()
    );

    if let Some(c) = cache
        && let Some(cached) = c.get(&cache_key).await
        && let Ok(page) = serde_json::from_str::<ResultPage>(&cached)
    {
        tracing::debug!("cache hit for {cache_key}");
        return Ok(SearchIssuePage {
            page: Some(page),
            rate_limit: None,
        });
    }

    let payload = GraphQLPayload {
        query: SEARCH_ISSUES_QUERY,
        variables: SearchVariables {
            query: ensure_issue_qualifier(query),
            first,
            after,
        },
    };

    let response: GraphQLResponse<SearchData> = octocrab
        .graphql(&payload)
        .await
        .with_context(|| format!("GraphQL issue search failed for query: {query}"))?;

    check_errors(response.errors)?;

    let data = response
        .data
        .context("GraphQL response missing data field")?;

    let rate_limit = data.rate_limit.map(RawRateLimit::into_info);

    let page = data.search.map(|search| ResultPage {
        edges: search
            .edges
            .into_iter()
            .flatten()
            .filter_map(|edge| {
                let node = edge.node?.into_domain();
                Some(IssueEdge {
                    cursor: edge.cursor,
                    node,
                })
            })
            .collect(),
        page_info: search.page_info,
    });

    if let Some(c) = cache
        && let Some(page) = &page
        && let Ok(json) = serde_json::to_string(page)
    {
        c.insert(cache_key, json).await;
    }

    Ok(SearchIssuePage { page, rate_limit })
}

// ---------------------------------------------------------------------------
// Single issue API
// ---------------------------------------------------------------------------

/// Fetch one issue by GraphQL node id.
///
/// Returns `None` when the id does not resolve to an issue.
pub async fn fetch_issue(
    octocrab: &Arc<Octocrab>,
    id: &str,
    cache: Option<&Cache<String, String>>,
) -> Result<(Option<Issue>, Option<RateLimitInfo>)> {
    let cache_key = format!("issue:{id}");

    if let Some(c) = cache
        && let Some(cached) = c.get(&cache_key).await
        && let Ok(issue) = serde_json::from_str::<Issue>(&cached)
    {
        tracing::debug!("cache hit for {cache_key}");
        return Ok((Some(issue), None));
    }

    let payload = GraphQLPayload {
        query: FIND_ONE_ISSUE_QUERY,
        variables: NodeVariables { id: id.to_owned() },
    };

    let response: GraphQLResponse<NodeData> = octocrab
        .graphql(&payload)
        .await
        .context("GraphQL issue request failed")?;

    check_errors(response.errors)?;

    let data = response
        .data
        .context("GraphQL response missing data field")?;

    let rate_limit = data.rate_limit.map(RawRateLimit::into_info);

    // Non-issue nodes come back as `{}` from the inline fragment.
    let issue = match data.node {
        Some(node) if node.get("id").is_some() => {
            let raw: RawIssue = serde_json::from_value(node).context("decoding issue node")?;
            Some(raw.into_domain())
        }
        _ => None,
    };

    if let Some(c) = cache
        && let Some(issue) = &issue
        && let Ok(json) = serde_json::to_string(issue)
    {
        c.insert(cache_key, json).await;
    }

    Ok((issue, rate_limit))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn octocrab_for(server: &MockServer) -> Arc<Octocrab> {
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
        Arc::new(
            Octocrab::builder()
                .base_uri(server.uri())
                .unwrap()
                .personal_token("test-token".to_owned())
                .build()
                .unwrap(),
        )
    }

    fn issue_node(id: &str, number: u64) -> serde_json::Value {
        json!({
            "id": id,
            "number": number,
            "title": format!("Issue {number}"),
            "body": "It breaks :tada:",
            "state": "OPEN",
            "url": format!("https://github.com/acme/widgets/issues/{number}"),
            "publishedAt": "2024-03-01T12:00:00Z",
            "repository": { "nameWithOwner": "acme/widgets", "url": "https://github.com/acme/widgets" },
            "labels": { "nodes": [{ "name": "bug", "color": "d73a4a" }] }
        })
    }

    fn search_body(ids: &[(&str, u64)], end_cursor: &str, has_next_page: bool) -> serde_json::Value {
        let edges: Vec<_> = ids
            .iter()
            .map(|(id, n)| json!({ "cursor": format!("cur-{id}"), "node": issue_node(id, *n) }))
            .collect();
        json!({
            "data": {
                "rateLimit": { "limit": 5000, "remaining": 4999, "cost": 1 },
                "search": {
                    "pageInfo": { "hasNextPage": has_next_page, "endCursor": end_cursor },
                    "edges": edges
                }
            }
        })
    }

    #[test]
    fn issue_qualifier_is_prepended_once() {
        assert_eq!(
            ensure_issue_qualifier("language:java label:bug"),
            "is:issue language:java label:bug"
        );
        assert_eq!(
            ensure_issue_qualifier("IS:ISSUE language:java"),
            "IS:ISSUE language:java"
        );
    }

    #[tokio::test]
    async fn search_issues_parses_edges_and_page_info() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .and(body_partial_json(json!({
                "variables": { "query": "is:issue language:java label:bug", "first": 10 }
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(search_body(&[("I_1", 1), ("I_2", 2)], "c1", true)),
            )
            .mount(&server)
            .await;

        let octocrab = octocrab_for(&server);
        let result = search_issues(&octocrab, "language:java label:bug", 10, None, None)
            .await
            .unwrap();

        let page = result.page.unwrap();
        assert_eq!(page.edges.len(), 2);
        assert_eq!(page.edges[0].node.id, "I_1");
        assert_eq!(page.edges[0].cursor, "cur-I_1");
        assert_eq!(page.edges[1].node.number, 2);
        assert_eq!(page.page_info.end_cursor.as_deref(), Some("c1"));
        assert!(page.page_info.has_next_page);

        let node = &page.edges[0].node;
        assert_eq!(node.state, IssueState::Open);
        assert_eq!(node.repo.as_ref().unwrap().full_name(), "acme/widgets");
        assert_eq!(node.label_names().collect::<Vec<_>>(), ["bug"]);
        assert!(node.published_at.is_some());

        assert_eq!(result.rate_limit.unwrap().remaining, 4999);
    }

    #[tokio::test]
    async fn search_issues_sends_cursor() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .and(body_partial_json(json!({ "variables": { "after": "c1" } })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(search_body(&[("I_3", 3)], "c2", false)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let octocrab = octocrab_for(&server);
        let result = search_issues(&octocrab, "language:java", 10, Some("c1".into()), None)
            .await
            .unwrap();
        let page = result.page.unwrap();
        assert_eq!(page.edges[0].node.id, "I_3");
        assert!(!page.page_info.has_next_page);
    }

    #[tokio::test]
    async fn graphql_errors_become_fetch_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": null,
                "errors": [{ "message": "API rate limit exceeded" }]
            })))
            .mount(&server)
            .await;

        let octocrab = octocrab_for(&server);
        let err = search_issues(&octocrab, "language:java", 10, None, None)
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("API rate limit exceeded"));
    }

    #[tokio::test]
    async fn missing_search_field_yields_no_page() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": {} })))
            .mount(&server)
            .await;

        let octocrab = octocrab_for(&server);
        let result = search_issues(&octocrab, "language:java", 10, None, None)
            .await
            .unwrap();
        assert!(result.page.is_none());
    }

    #[tokio::test]
    async fn cached_page_skips_the_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(search_body(&[("I_1", 1)], "c1", false)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let octocrab = octocrab_for(&server);
        let cache: Cache<String, String> = Cache::builder().max_capacity(10).build();
        let first = search_issues(&octocrab, "language:go", 10, None, Some(&cache))
            .await
            .unwrap();
        let second = search_issues(&octocrab, "language:go", 10, None, Some(&cache))
            .await
            .unwrap();
        assert_eq!(first.page, second.page);
        assert!(second.rate_limit.is_none());
    }

    #[tokio::test]
    async fn fetch_issue_by_node_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .and(body_partial_json(json!({ "variables": { "id": "I_7" } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "node": issue_node("I_7", 7) }
            })))
            .mount(&server)
            .await;

        let octocrab = octocrab_for(&server);
        let (issue, _) = fetch_issue(&octocrab, "I_7", None).await.unwrap();
        let issue = issue.unwrap();
        assert_eq!(issue.number, 7);
        assert_eq!(issue.url, "https://github.com/acme/widgets/issues/7");
    }

    #[tokio::test]
    async fn fetch_issue_non_issue_node_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "data": { "node": {} } })),
            )
            .mount(&server)
            .await;

        let octocrab = octocrab_for(&server);
        let (issue, _) = fetch_issue(&octocrab, "PR_1", None).await.unwrap();
        assert!(issue.is_none());
    }
}
