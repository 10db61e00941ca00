use std::sync::Arc;

use api_client::mock::{MockResponse, MockService};
use cache::{Cache, CacheError, CacheErrorKind, Driver, Entry, LocalDriver, MemoryDriver, Record};
use chronicle::{
    Chronicle, Commit, Error, FetchOptions, Fetcher, GraphQlSource, Origin, RestSource,
};
use http::{Method, StatusCode};
use octocat::{GithubClient, GithubConfig};
use serde_json::{json, Value};

const BRANCHES: &str = "/repos/octo/cat/branches";
const COMMITS: &str = "/repos/octo/cat/commits";

fn github(mock: &MockService) -> GithubClient {
    let config = GithubConfig {
        token: Some("ghp_test".into()),
        base: "https://api.github.test/".parse().unwrap(),
        per_page: 2,
        ..Default::default()
    };
    GithubClient::new_with_inner_service(&config, mock.clone())
}

fn options(files: bool) -> FetchOptions {
    FetchOptions {
        files,
        ..Default::default()
    }
}

fn rest_with_cache(mock: &MockService, cache: Cache, files: bool) -> Chronicle {
    let source = Arc::new(RestSource::new(github(mock)));
    Chronicle::new(cache, Fetcher::new(source, options(files)))
}

fn rest(mock: &MockService) -> Chronicle {
    rest_with_cache(mock, Cache::new(MemoryDriver::new()), false)
}

fn commit(sha: &str, login: &str, date: &str) -> Value {
    json!({
        "sha": sha,
        "commit": {
            "author": {"name": login.to_uppercase(), "email": format!("{login}@example.com"), "date": date},
            "message": format!("Commit {sha}")
        },
        "author": {"login": login}
    })
}

fn branches(mock: &MockService, names: &[&str]) {
    let page: Vec<Value> = names
        .iter()
        .map(|name| json!({"name": name, "commit": {"sha": "tip"}}))
        .collect();
    mock.add_json(BRANCHES, &[("page", "1")], StatusCode::OK, &page);
    mock.add_json(BRANCHES, &[("page", "2")], StatusCode::OK, &json!([]));
}

fn history(mock: &MockService, branch: &str, pages: &[Value]) {
    for (n, page) in pages.iter().enumerate() {
        let number = (n + 1).to_string();
        mock.add_json(
            COMMITS,
            &[("sha", branch), ("page", number.as_str())],
            StatusCode::OK,
            page,
        );
    }
    let last = (pages.len() + 1).to_string();
    mock.add_json(
        COMMITS,
        &[("sha", branch), ("page", last.as_str())],
        StatusCode::OK,
        &json!([]),
    );
}

fn shas(commits: &[Commit]) -> Vec<&str> {
    commits.iter().map(|commit| commit.sha.as_str()).collect()
}

#[tokio::test]
async fn pages_until_empty() {
    let mock = MockService::new();
    branches(&mock, &["main"]);
    history(
        &mock,
        "main",
        &[
            json!([commit("c5", "ada", "2025-01-05T00:00:00Z"), commit("c4", "ada", "2025-01-04T00:00:00Z")]),
            json!([commit("c3", "ada", "2025-01-03T00:00:00Z"), commit("c2", "ada", "2025-01-02T00:00:00Z")]),
            json!([commit("c1", "ada", "2025-01-01T00:00:00Z")]),
        ],
    );

    let aggregate = rest(&mock).load("octo/cat").await.unwrap();

    assert_eq!(mock.count(COMMITS), 4);
    assert_eq!(shas(&aggregate.commits), vec!["c5", "c4", "c3", "c2", "c1"]);
    assert_eq!(aggregate.origin, Origin::Fetched);
}

#[tokio::test]
async fn shared_commit_is_kept_per_branch() {
    let mock = MockService::new();
    branches(&mock, &["main", "dev"]);
    history(
        &mock,
        "main",
        &[json!([commit("shared", "ada", "2025-01-01T00:00:00Z")])],
    );
    history(
        &mock,
        "dev",
        &[json!([
            commit("feature", "grace", "2025-01-02T00:00:00Z"),
            commit("shared", "ada", "2025-01-01T00:00:00Z")
        ])],
    );

    let aggregate = rest(&mock).load("octo/cat").await.unwrap();

    let shared: Vec<Option<&str>> = aggregate
        .commits
        .iter()
        .filter(|commit| commit.sha == "shared")
        .map(|commit| commit.branch.as_deref())
        .collect();
    assert_eq!(shared, vec![Some("main"), Some("dev")]);
    assert_eq!(aggregate.commits.len(), 3);
}

#[tokio::test]
async fn cached_aggregate_is_reused() {
    let mock = MockService::new();
    branches(&mock, &["main"]);
    history(
        &mock,
        "main",
        &[json!([commit("c1", "ada", "2025-01-01T00:00:00Z")])],
    );

    let dir = tempfile::tempdir().unwrap();
    let root = camino::Utf8PathBuf::from_path_buf(dir.path().to_owned()).unwrap();
    let chronicle = rest_with_cache(&mock, Cache::new(LocalDriver::new(root)), false);

    let first = chronicle.load("octo/cat").await.unwrap();
    let requests = mock.requests().len();

    let second = chronicle.load("https://github.com/octo/cat.git").await.unwrap();
    assert_eq!(second.origin, Origin::Cache);
    assert_eq!(second.commits, first.commits);
    assert_eq!(mock.requests().len(), requests);

    let third = chronicle.refresh("octo/cat").await.unwrap();
    assert_eq!(third.origin, Origin::Fetched);
    assert!(mock.requests().len() > requests);
}

#[tokio::test]
async fn rate_limit_writes_nothing() {
    let mock = MockService::new();
    branches(&mock, &["main"]);
    mock.add_json(
        COMMITS,
        &[("sha", "main"), ("page", "1")],
        StatusCode::OK,
        &json!([commit("c2", "ada", "2025-01-02T00:00:00Z")]),
    );
    mock.route(
        Some(Method::GET),
        COMMITS,
        &[("sha", "main"), ("page", "2")],
        |_| {
            MockResponse::status(StatusCode::FORBIDDEN)
                .with_header("x-ratelimit-remaining", "0")
                .with_header("x-ratelimit-reset", "1735693200")
        },
    );

    let chronicle = rest(&mock);
    let error = chronicle.load("octo/cat").await.unwrap_err();
    match error {
        Error::RateLimited { reset } => assert!(reset.is_some()),
        other => panic!("expected rate limit, got {other:?}"),
    }

    let cached: Option<Entry<Vec<Commit>>> = chronicle.cache().get("octo/cat").await;
    assert!(cached.is_none());
}

#[tokio::test]
async fn failed_refresh_keeps_previous_entry() {
    let mock = MockService::new();
    branches(&mock, &["main"]);
    history(
        &mock,
        "main",
        &[json!([commit("c1", "ada", "2025-01-01T00:00:00Z")])],
    );

    let chronicle = rest(&mock);
    chronicle.load("octo/cat").await.unwrap();

    mock.route(None, COMMITS, &[("sha", "main"), ("page", "1")], |_| {
        MockResponse::status(StatusCode::TOO_MANY_REQUESTS)
    });
    let error = chronicle.refresh("octo/cat").await.unwrap_err();
    assert!(matches!(error, Error::RateLimited { .. }));

    let cached: Entry<Vec<Commit>> = chronicle.cache().get("octo/cat").await.unwrap();
    assert_eq!(shas(&cached.value), vec!["c1"]);
}

#[tokio::test]
async fn bad_token_is_unauthorized() {
    let mock = MockService::new();
    mock.route(None, BRANCHES, &[], |_| {
        MockResponse::new(
            StatusCode::UNAUTHORIZED,
            http::HeaderMap::new(),
            r#"{"message":"Bad credentials"}"#,
        )
    });

    let error = rest(&mock).load("octo/cat").await.unwrap_err();
    assert!(matches!(error, Error::Unauthorized(_)), "{error:?}");
}

#[tokio::test]
async fn server_error_names_branch_and_page() {
    let mock = MockService::new();
    branches(&mock, &["main"]);
    mock.route(None, COMMITS, &[("sha", "main")], |_| {
        MockResponse::status(StatusCode::INTERNAL_SERVER_ERROR)
    });

    let error = rest(&mock).load("octo/cat").await.unwrap_err();
    match error {
        Error::FetchFailed { branch, page, .. } => {
            assert_eq!(branch.as_deref(), Some("main"));
            assert_eq!(page, Some(1));
        }
        other => panic!("expected fetch failure, got {other:?}"),
    }
}

#[tokio::test]
async fn not_modified_branch_is_empty() {
    let mock = MockService::new();
    branches(&mock, &["main", "stale"]);
    history(
        &mock,
        "main",
        &[json!([commit("c1", "ada", "2025-01-01T00:00:00Z")])],
    );
    mock.route(None, COMMITS, &[("sha", "stale")], |_| {
        MockResponse::status(StatusCode::NOT_MODIFIED)
    });

    let aggregate = rest(&mock).load("octo/cat").await.unwrap();
    assert_eq!(shas(&aggregate.commits), vec!["c1"]);
}

#[tokio::test]
async fn details_fill_in_files() {
    let mock = MockService::new();
    branches(&mock, &["main"]);
    history(
        &mock,
        "main",
        &[json!([
            commit("c2", "ada", "2025-01-02T00:00:00Z"),
            commit("c1", "ada", "2025-01-01T00:00:00Z")
        ])],
    );
    for sha in ["c1", "c2"] {
        let mut detail = commit(sha, "ada", "2025-01-01T00:00:00Z");
        detail["files"] = json!([{"filename": format!("src/{sha}.rs"), "status": "added"}]);
        mock.add_json(&format!("{COMMITS}/{sha}"), &[], StatusCode::OK, &detail);
    }

    let chronicle = rest_with_cache(&mock, Cache::new(MemoryDriver::new()), true);
    let aggregate = chronicle.load("octo/cat").await.unwrap();

    let files: Vec<Vec<&str>> = aggregate
        .commits
        .iter()
        .map(|commit| commit.filenames().collect())
        .collect();
    assert_eq!(files, vec![vec!["src/c2.rs"], vec!["src/c1.rs"]]);
    assert_eq!(mock.count(&format!("{COMMITS}/c1")), 1);
}

#[derive(Debug)]
struct Offline;

#[async_trait::async_trait]
impl Driver for Offline {
    fn name(&self) -> &'static str {
        "offline"
    }

    async fn get(&self, key: &str) -> Result<Option<Record>, CacheError> {
        Err(CacheError::builder(self.name(), CacheErrorKind::ServiceUnavailable, "no route to host")
            .key(key)
            .build())
    }

    async fn put(&self, record: Record) -> Result<(), CacheError> {
        Err(CacheError::builder(self.name(), CacheErrorKind::ServiceUnavailable, "no route to host")
            .key(&record.key)
            .build())
    }

    async fn delete(&self, _key: &str) -> Result<(), CacheError> {
        Ok(())
    }
}

#[tokio::test]
async fn unavailable_cache_still_loads() {
    let mock = MockService::new();
    branches(&mock, &["main"]);
    history(
        &mock,
        "main",
        &[json!([commit("c1", "ada", "2025-01-01T00:00:00Z")])],
    );

    let chronicle = rest_with_cache(&mock, Cache::new(Offline), false);
    let aggregate = chronicle.load("octo/cat").await.unwrap();
    assert_eq!(aggregate.origin, Origin::Fetched);
    assert_eq!(aggregate.commits.len(), 1);
}

fn graphql_page(data: Value) -> MockResponse {
    MockResponse::json(StatusCode::OK, &json!({ "data": data }))
}

#[tokio::test]
async fn graphql_matches_rest() {
    let mock = MockService::new();
    mock.route(Some(Method::POST), "/graphql", &[], |req| {
        let body: Value = req.json().unwrap();
        let variables = &body["variables"];

        if body["query"].as_str().unwrap().contains("refs(") {
            return graphql_page(json!({"repository": {"refs": {
                "pageInfo": {"hasNextPage": false, "endCursor": null},
                "nodes": [{"name": "main"}]
            }}}));
        }

        let (nodes, info) = match variables["after"].as_str() {
            None => (
                json!([{"oid": "c2", "message": "Commit c2", "author": {
                    "name": "ADA", "email": "ada@example.com", "date": "2025-01-02T00:00:00Z",
                    "user": {"login": "ada"}
                }}]),
                json!({"hasNextPage": true, "endCursor": "c2 0"}),
            ),
            Some(_) => (
                json!([{"oid": "c1", "message": "Commit c1", "author": {
                    "name": "ADA", "email": "ada@example.com", "date": "2025-01-01T00:00:00Z",
                    "user": {"login": "ada"}
                }}]),
                json!({"hasNextPage": false, "endCursor": "c1 0"}),
            ),
        };
        graphql_page(json!({"repository": {"ref": {"target": {"history": {
            "pageInfo": info,
            "nodes": nodes
        }}}}}))
    });

    let source = Arc::new(GraphQlSource::new(github(&mock)));
    let chronicle = Chronicle::new(
        Cache::new(MemoryDriver::new()),
        Fetcher::new(source, options(false)),
    );
    let graphql = chronicle.load("octo/cat").await.unwrap();
    assert_eq!(mock.count("/graphql"), 3);

    let rest_mock = MockService::new();
    branches(&rest_mock, &["main"]);
    history(
        &rest_mock,
        "main",
        &[json!([
            commit("c2", "ada", "2025-01-02T00:00:00Z"),
            commit("c1", "ada", "2025-01-01T00:00:00Z")
        ])],
    );
    let rest = rest(&rest_mock).load("octo/cat").await.unwrap();

    assert_eq!(graphql.commits, rest.commits);
}

#[tokio::test]
async fn invalid_reference_makes_no_requests() {
    let mock = MockService::new();
    let error = rest(&mock).load("just-a-name").await.unwrap_err();
    assert!(matches!(error, Error::InvalidReference(_)));
    assert!(mock.requests().is_empty());
}
