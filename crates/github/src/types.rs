//! API types for the GitHub REST v3 endpoints used by the publisher.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::client::Error;

/// File mode GitHub expects for a regular, non-executable file.
pub const MODE_FILE: &str = "100644";

/// An `owner/repo` pair identifying a repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoSlug {
    pub owner: String,
    pub name: String,
}

impl RepoSlug {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Public clone URL of the repository on github.com.
    pub fn https_url(&self) -> String {
        format!("https://github.com/{}/{}", self.owner, self.name)
    }
}

impl FromStr for RepoSlug {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().split('/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty() => {
                Ok(Self::new(owner, name))
            }
            _ => Err(Error::InvalidRepo(s.to_string())),
        }
    }
}

impl fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Repository metadata (subset).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Repository {
    pub id: u64,
    pub full_name: String,
    #[serde(default)]
    pub default_branch: String,
    #[serde(default)]
    pub private: bool,
}

/// Body of `POST /user/repos`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewRepository {
    pub name: String,
    pub description: String,
    pub private: bool,
    pub auto_init: bool,
}

/// A git reference such as `refs/heads/main`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GitRef {
    #[serde(rename = "ref")]
    pub name: String,
    pub object: GitRefTarget,
}

impl GitRef {
    /// SHA of the object the ref points at.
    pub fn sha(&self) -> &str {
        &self.object.sha
    }
}

/// Object a ref points at.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GitRefTarget {
    pub sha: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

/// Response of the blob, tree, and commit create endpoints.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GitObject {
    pub sha: String,
}

/// One entry of a tree object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    pub path: String,
    pub mode: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub sha: String,
}

impl TreeEntry {
    /// A regular file entry pointing at an existing blob.
    pub fn blob(path: impl Into<String>, sha: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mode: MODE_FILE.to_string(),
            kind: "blob".to_string(),
            sha: sha.into(),
        }
    }
}
