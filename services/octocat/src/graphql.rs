//! GraphQL queries for branches and commit history.
//!
//! GraphQL reports most failures in the response body with a `200 OK`, so the
//! envelope is checked for errors before the data is used.

use api_client::{paginate, Page};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;

use crate::models::graphql::{
    Envelope, GraphQlError, HistoryCommit, HistoryData, PageInfo, Query, RefsData,
};
use crate::{Error, GithubClient, Pages};

const BRANCHES_QUERY: &str = r#"query Branches($owner: String!, $name: String!, $first: Int!, $after: String) {
  repository(owner: $owner, name: $name) {
    refs(refPrefix: "refs/heads/", first: $first, after: $after) {
      pageInfo { hasNextPage endCursor }
      nodes { name }
    }
  }
}"#;

const HISTORY_QUERY: &str = r#"query History($owner: String!, $name: String!, $branch: String!, $first: Int!, $after: String) {
  repository(owner: $owner, name: $name) {
    ref(qualifiedName: $branch) {
      target {
        ... on Commit {
          history(first: $first, after: $after) {
            pageInfo { hasNextPage endCursor }
            nodes {
              oid
              message
              committedDate
              author { name email date user { login avatarUrl url } }
            }
          }
        }
      }
    }
  }
}"#;

fn query_error(errors: &[GraphQlError]) -> Error {
    let kinds = || errors.iter().filter_map(|error| error.kind.as_deref());
    if kinds().any(|kind| kind == "RATE_LIMITED") {
        return Error::RateLimited { reset: None };
    }

    let message = errors
        .iter()
        .map(|error| error.message.as_str())
        .collect::<Vec<_>>()
        .join("; ");

    if kinds().any(|kind| kind == "NOT_FOUND") {
        Error::NotFound(message)
    } else {
        Error::GraphQl(message)
    }
}

fn next_page<T>(items: Vec<T>, info: PageInfo) -> Page<T, Option<String>> {
    match (info.has_next_page, info.end_cursor) {
        (true, Some(cursor)) => Page::new(items, Some(cursor)),
        _ => Page::last(items),
    }
}

impl GithubClient {
    /// Run a GraphQL query and return its `data`.
    #[tracing::instrument(skip_all, level = "debug")]
    pub async fn graphql<V, T>(&self, query: &str, variables: V) -> Result<T, Error>
    where
        V: Serialize,
        T: DeserializeOwned,
    {
        let request = self.post("graphql").json(&Query { query, variables });
        let envelope: Envelope<T> = self
            .send_json(request)
            .await?
            .ok_or_else(|| Error::NotModified("graphql".to_owned()))?;

        if !envelope.errors.is_empty() {
            return Err(query_error(&envelope.errors));
        }

        envelope
            .data
            .ok_or_else(|| Error::GraphQl("response has neither data nor errors".to_owned()))
    }

    /// List branch names of `owner/repo`, following cursors.
    pub fn graphql_branches(&self, owner: &str, repo: &str) -> Pages<String> {
        let client = self.clone();
        let owner = owner.to_owned();
        let repo = repo.to_owned();
        paginate(None, move |after: Option<String>| {
            let client = client.clone();
            let variables = json!({
                "owner": owner,
                "name": repo,
                "first": client.per_page(),
                "after": after,
            });
            let name = format!("{owner}/{repo}");
            async move {
                let data: RefsData = client.graphql(BRANCHES_QUERY, variables).await?;
                let refs = data.repository.ok_or(Error::NotFound(name))?.refs;
                let names = refs.nodes.into_iter().map(|node| node.name).collect();
                Ok(next_page(names, refs.page_info))
            }
        })
    }

    /// Walk the history of `branch`, newest first, following cursors.
    pub fn graphql_history(&self, owner: &str, repo: &str, branch: &str) -> Pages<HistoryCommit> {
        let client = self.clone();
        let owner = owner.to_owned();
        let repo = repo.to_owned();
        let qualified = format!("refs/heads/{branch}");
        paginate(None, move |after: Option<String>| {
            let client = client.clone();
            let variables = json!({
                "owner": owner,
                "name": repo,
                "branch": qualified,
                "first": client.per_page(),
                "after": after,
            });
            let name = format!("{owner}/{repo}@{qualified}");
            async move {
                let data: HistoryData = client.graphql(HISTORY_QUERY, variables).await?;
                let reference = data
                    .repository
                    .and_then(|repository| repository.reference)
                    .ok_or(Error::NotFound(name))?;

                match reference.target.and_then(|target| target.history) {
                    Some(history) => Ok(next_page(history.nodes, history.page_info)),
                    None => Ok(Page::last(Vec::new())),
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use api_client::mock::{MockResponse, MockService};
    use futures::TryStreamExt as _;
    use http::{Method, StatusCode};
    use serde_json::{json, Value};

    use crate::tests::client;

    fn history_page(oids: &[&str], next: Option<&str>) -> Value {
        let nodes: Vec<Value> = oids
            .iter()
            .map(|oid| {
                json!({
                    "oid": oid,
                    "message": "Fix it",
                    "author": {"name": "Octo Cat", "email": "octo@example.com", "date": "2025-01-01T00:00:00Z", "user": null}
                })
            })
            .collect();

        json!({"data": {"repository": {"ref": {"target": {"history": {
            "pageInfo": {"hasNextPage": next.is_some(), "endCursor": next},
            "nodes": nodes
        }}}}}})
    }

    #[tokio::test]
    async fn history_follows_cursor() {
        let mock = MockService::new();
        mock.route(Some(Method::POST), "/graphql", &[], |req| {
            let body: Value = req.json().unwrap();
            assert_eq!(body["variables"]["branch"], "refs/heads/main");
            let page = match body["variables"]["after"].as_str() {
                None => history_page(&["c3", "c2"], Some("cursor-1")),
                Some("cursor-1") => history_page(&["c1"], None),
                Some(other) => panic!("unexpected cursor {other}"),
            };
            MockResponse::json(StatusCode::OK, &page)
        });

        let pages: Vec<_> = client(&mock)
            .graphql_history("octo", "cat", "main")
            .try_collect()
            .await
            .unwrap();

        let oids: Vec<String> = pages.into_iter().flatten().map(|c| c.oid).collect();
        assert_eq!(oids, vec!["c3", "c2", "c1"]);
        assert_eq!(mock.count("/graphql"), 2);
    }

    #[tokio::test]
    async fn rate_limited_in_body() {
        let mock = MockService::new();
        mock.add_json(
            "/graphql",
            &[],
            StatusCode::OK,
            &json!({"errors": [{"type": "RATE_LIMITED", "message": "API rate limit exceeded"}]}),
        );

        let result: Result<Vec<_>, _> = client(&mock)
            .graphql_branches("octo", "cat")
            .try_collect()
            .await;
        assert!(result.unwrap_err().is_rate_limited());
    }

    #[tokio::test]
    async fn missing_branch_is_not_found() {
        let mock = MockService::new();
        mock.add_json(
            "/graphql",
            &[],
            StatusCode::OK,
            &json!({"data": {"repository": {"ref": null}}}),
        );

        let result: Result<Vec<_>, _> = client(&mock)
            .graphql_history("octo", "cat", "gone")
            .try_collect()
            .await;
        assert!(matches!(result.unwrap_err(), crate::Error::NotFound(_)));
    }

    #[tokio::test]
    async fn branches_single_page() {
        let mock = MockService::new();
        mock.add_json(
            "/graphql",
            &[],
            StatusCode::OK,
            &json!({"data": {"repository": {"refs": {
                "pageInfo": {"hasNextPage": false, "endCursor": null},
                "nodes": [{"name": "main"}, {"name": "dev"}]
            }}}}),
        );

        let pages: Vec<Vec<String>> = client(&mock)
            .graphql_branches("octo", "cat")
            .try_collect()
            .await
            .unwrap();
        assert_eq!(pages.concat(), vec!["main", "dev"]);
    }
}
