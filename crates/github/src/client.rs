//! GitHub API client.
//!
//! Async HTTP client using `reqwest` with Bearer token authentication.

use std::time::Duration;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

use crate::types::{GitObject, GitRef, NewRepository, RepoSlug, Repository, TreeEntry};

const DEFAULT_BASE_URL: &str = "https://api.github.com";
const API_VERSION: &str = "2022-11-28";
const USER_AGENT: &str = concat!("shipyard/", env!("CARGO_PKG_VERSION"));

/// Characters left unescaped in a ref name path segment.
const REF_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

/// Errors from the GitHub client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid API token")]
    InvalidToken,

    #[error("invalid repository {0:?}: expected owner/repo")]
    InvalidRepo(String),
}

impl Error {
    /// HTTP status of an API error, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// GitHub API client.
pub struct Client {
    http: reqwest::Client,
    base_url: String,
}

impl Client {
    /// Creates a new client with the given token and per-request timeout.
    pub fn new(token: &str, timeout: Duration) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| Error::InvalidToken)?,
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static(API_VERSION),
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Sets a custom base URL (GitHub Enterprise, tests).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn repo_url(&self, repo: &RepoSlug, path: &str) -> String {
        format!(
            "{}/repos/{}/{}{}",
            self.base_url, repo.owner, repo.name, path
        )
    }

    /// Sends a request and returns the body of a 2xx response.
    async fn execute(&self, req: RequestBuilder) -> Result<Vec<u8>, Error> {
        let resp = req.send().await?;
        let status = resp.status();

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(resp.bytes().await?.to_vec())
    }

    /// Like [`execute`](Self::execute), but maps 404 to `None`.
    async fn execute_optional(&self, req: RequestBuilder) -> Result<Option<Vec<u8>>, Error> {
        match self.execute(req).await {
            Ok(body) => Ok(Some(body)),
            Err(Error::Api { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn execute_json<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, Error> {
        let body = self.execute(req).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Looks up a repository. Returns `None` if it does not exist.
    pub async fn get_repository(&self, repo: &RepoSlug) -> Result<Option<Repository>, Error> {
        let req = self.http.get(self.repo_url(repo, ""));
        match self.execute_optional(req).await? {
            Some(body) => Ok(Some(serde_json::from_slice(&body)?)),
            None => Ok(None),
        }
    }

    /// Creates a repository owned by the authenticated user.
    pub async fn create_repository(&self, new_repo: &NewRepository) -> Result<Repository, Error> {
        let req = self
            .http
            .post(format!("{}/user/repos", self.base_url))
            .json(new_repo);
        self.execute_json(req).await
    }

    /// Reads `refs/heads/<branch>`. Returns `None` if the branch does not exist.
    pub async fn get_branch_ref(
        &self,
        repo: &RepoSlug,
        branch: &str,
    ) -> Result<Option<GitRef>, Error> {
        let branch = utf8_percent_encode(branch, REF_SEGMENT);
        let req = self
            .http
            .get(self.repo_url(repo, &format!("/git/ref/heads/{branch}")));
        match self.execute_optional(req).await? {
            Some(body) => Ok(Some(serde_json::from_slice(&body)?)),
            None => Ok(None),
        }
    }

    /// Creates `refs/heads/<branch>` pointing at `sha`.
    pub async fn create_branch_ref(
        &self,
        repo: &RepoSlug,
        branch: &str,
        sha: &str,
    ) -> Result<GitRef, Error> {
        let req = self
            .http
            .post(self.repo_url(repo, "/git/refs"))
            .json(&json!({
                "ref": format!("refs/heads/{branch}"),
                "sha": sha,
            }));
        self.execute_json(req).await
    }

    /// Moves `refs/heads/<branch>` to `sha`.
    ///
    /// With `force` set, the update succeeds even when `sha` does not
    /// descend from the current head.
    pub async fn update_branch_ref(
        &self,
        repo: &RepoSlug,
        branch: &str,
        sha: &str,
        force: bool,
    ) -> Result<GitRef, Error> {
        let branch = utf8_percent_encode(branch, REF_SEGMENT);
        let req = self
            .http
            .patch(self.repo_url(repo, &format!("/git/refs/heads/{branch}")))
            .json(&json!({ "sha": sha, "force": force }));
        let updated: GitRef = self.execute_json(req).await?;
        debug!(git_ref = %updated.name, sha = updated.sha(), force, "branch ref moved");
        Ok(updated)
    }

    /// Uploads a UTF-8 text blob.
    pub async fn create_blob(&self, repo: &RepoSlug, content: &str) -> Result<GitObject, Error> {
        let req = self
            .http
            .post(self.repo_url(repo, "/git/blobs"))
            .json(&json!({ "content": content, "encoding": "utf-8" }));
        self.execute_json(req).await
    }

    /// Creates a tree from a complete entry list (no base tree).
    pub async fn create_tree(
        &self,
        repo: &RepoSlug,
        entries: &[TreeEntry],
    ) -> Result<GitObject, Error> {
        let req = self
            .http
            .post(self.repo_url(repo, "/git/trees"))
            .json(&json!({ "tree": entries }));
        self.execute_json(req).await
    }

    /// Creates a commit object.
    pub async fn create_commit(
        &self,
        repo: &RepoSlug,
        message: &str,
        tree: &str,
        parents: &[String],
    ) -> Result<GitObject, Error> {
        let req = self
            .http
            .post(self.repo_url(repo, "/git/commits"))
            .json(&json!({
                "message": message,
                "tree": tree,
                "parents": parents,
            }));
        self.execute_json(req).await
    }
}
