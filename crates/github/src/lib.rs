//! GitHub REST client for publishing generated sources.
//!
//! Covers the slice of the GitHub v3 API needed to write a commit without a
//! local checkout: repository lookup and creation, branch refs, and the
//! blob/tree/commit object endpoints of the Git Database API.

pub mod client;
pub mod types;

pub use client::{Client, Error};
pub use types::{GitObject, GitRef, NewRepository, RepoSlug, Repository, TreeEntry};
