//! REST endpoints for branches and commits.

use api_client::{paginate, Page};
use serde::de::DeserializeOwned;

use crate::models::{Branch, Commit};
use crate::{Error, GithubClient, Pages};

impl GithubClient {
    /// List the branches of `owner/repo`, one page per poll.
    pub fn branches(&self, owner: &str, repo: &str) -> Pages<Branch> {
        let client = self.clone();
        let endpoint = format!("repos/{owner}/{repo}/branches");
        paginate(1u32, move |page| {
            let client = client.clone();
            let endpoint = endpoint.clone();
            async move { client.list_page(&endpoint, &[], page).await }
        })
    }

    /// List the commits reachable from `branch`, newest first.
    ///
    /// Entries do not include changed files; see [GithubClient::commit].
    pub fn commits(&self, owner: &str, repo: &str, branch: &str) -> Pages<Commit> {
        let client = self.clone();
        let endpoint = format!("repos/{owner}/{repo}/commits");
        let branch = branch.to_owned();
        paginate(1u32, move |page| {
            let client = client.clone();
            let endpoint = endpoint.clone();
            let branch = branch.clone();
            async move {
                client
                    .list_page(&endpoint, &[("sha", branch.as_str())], page)
                    .await
            }
        })
    }

    /// Fetch a single commit, including the files it changed.
    #[tracing::instrument(skip(self))]
    pub async fn commit(&self, owner: &str, repo: &str, sha: &str) -> Result<Commit, Error> {
        let endpoint = format!("repos/{owner}/{repo}/commits/{sha}");
        self.send_json(self.get(&endpoint))
            .await?
            .ok_or(Error::NotModified(endpoint))
    }

    #[tracing::instrument(skip(self, extra), level = "debug")]
    async fn list_page<T>(
        &self,
        endpoint: &str,
        extra: &[(&str, &str)],
        page: u32,
    ) -> Result<Page<T, u32>, Error>
    where
        T: DeserializeOwned,
    {
        let request = self
            .get(endpoint)
            .query(extra.iter().copied())
            .query([
                ("per_page", self.per_page.to_string()),
                ("page", page.to_string()),
            ]);

        let items: Vec<T> = self.send_json(request).await?.unwrap_or_default();
        tracing::debug!(items = items.len(), "fetched page");
        Ok(Page::new(items, page + 1))
    }
}

#[cfg(test)]
mod tests {
    use api_client::mock::{MockResponse, MockService};
    use futures::TryStreamExt as _;
    use http::StatusCode;
    use serde_json::json;

    use crate::tests::client;

    fn commit(sha: &str) -> serde_json::Value {
        json!({
            "sha": sha,
            "commit": {
                "author": {"name": "Octo Cat", "email": "octo@example.com", "date": "2025-01-01T00:00:00Z"},
                "message": format!("commit {sha}")
            },
            "author": {"login": "octocat"}
        })
    }

    #[tokio::test]
    async fn branches_until_empty_page() {
        let mock = MockService::new();
        let branch = |name: &str| json!({"name": name, "commit": {"sha": "abc"}});
        mock.add_json(
            "/repos/octo/cat/branches",
            &[("page", "1")],
            StatusCode::OK,
            &json!([branch("main"), branch("dev")]),
        );
        mock.add_json(
            "/repos/octo/cat/branches",
            &[("page", "2")],
            StatusCode::OK,
            &json!([branch("release")]),
        );
        mock.add_json(
            "/repos/octo/cat/branches",
            &[("page", "3")],
            StatusCode::OK,
            &json!([]),
        );

        let pages: Vec<_> = client(&mock)
            .branches("octo", "cat")
            .try_collect()
            .await
            .unwrap();

        let names: Vec<String> = pages.into_iter().flatten().map(|b| b.name).collect();
        assert_eq!(names, vec!["main", "dev", "release"]);
        assert_eq!(mock.count("/repos/octo/cat/branches"), 3);

        let requests = mock.requests();
        assert_eq!(requests[0].query("per_page").as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn commits_are_scoped_to_branch() {
        let mock = MockService::new();
        mock.add_json(
            "/repos/octo/cat/commits",
            &[("sha", "feature/x"), ("page", "1")],
            StatusCode::OK,
            &json!([commit("a1"), commit("b2")]),
        );
        mock.add_json(
            "/repos/octo/cat/commits",
            &[("sha", "feature/x"), ("page", "2")],
            StatusCode::OK,
            &json!([]),
        );

        let commits: Vec<_> = client(&mock)
            .commits("octo", "cat", "feature/x")
            .try_collect::<Vec<_>>()
            .await
            .unwrap()
            .concat();

        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].sha, "a1");
        assert_eq!(commits[0].author.as_ref().unwrap().login, "octocat");
        assert!(mock.requests()[0].uri.to_string().contains("sha=feature%2Fx"));
    }

    #[tokio::test]
    async fn not_modified_ends_listing() {
        let mock = MockService::new();
        mock.route(None, "/repos/octo/cat/commits", &[], |_| {
            MockResponse::status(StatusCode::NOT_MODIFIED)
        });

        let pages: Vec<_> = client(&mock)
            .commits("octo", "cat", "main")
            .try_collect()
            .await
            .unwrap();

        assert!(pages.concat().is_empty());
        assert_eq!(mock.count("/repos/octo/cat/commits"), 1);
    }

    #[tokio::test]
    async fn failed_page_stops_stream() {
        let mock = MockService::new();
        mock.add_json(
            "/repos/octo/cat/commits",
            &[("page", "1")],
            StatusCode::OK,
            &json!([commit("a1")]),
        );
        mock.route(None, "/repos/octo/cat/commits", &[("page", "2")], |_| {
            MockResponse::status(StatusCode::TOO_MANY_REQUESTS)
        });

        let result: Result<Vec<_>, _> = client(&mock)
            .commits("octo", "cat", "main")
            .try_collect()
            .await;

        assert!(result.unwrap_err().is_rate_limited());
        assert_eq!(mock.count("/repos/octo/cat/commits"), 2);
    }

    #[tokio::test]
    async fn commit_detail_includes_files() {
        let mock = MockService::new();
        let mut detail = commit("a1");
        detail["files"] = json!([
            {"filename": "src/lib.rs", "status": "modified", "additions": 3, "deletions": 1},
            {"filename": "README.md", "status": "added"}
        ]);
        mock.add_json("/repos/octo/cat/commits/a1", &[], StatusCode::OK, &detail);

        let commit = client(&mock).commit("octo", "cat", "a1").await.unwrap();
        let files = commit.files.unwrap();
        assert_eq!(files[0].filename, "src/lib.rs");
        assert_eq!(files[1].additions, 0);
    }

    #[tokio::test]
    async fn missing_repository_is_not_found() {
        let mock = MockService::new();
        let error = client(&mock)
            .commit("octo", "missing", "a1")
            .await
            .unwrap_err();
        assert!(matches!(error, crate::Error::NotFound(_)));
    }
}
