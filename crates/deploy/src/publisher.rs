//! Repository publisher.
//!
//! Writes a deployment unit to one branch of the apps repository as a
//! single commit on top of the branch's current head, then force-moves the
//! branch to it. A failure at any step aborts the publish; nothing is
//! retried or rolled back.

use shipyard_github::TreeEntry;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::DeployError;
use crate::hosts::GitHost;
use crate::synth::DeploymentUnit;
use crate::types::PublishOutcome;

/// Branches tried, in order, when a deploy branch has to be created.
pub const DEFAULT_BRANCHES: [&str; 2] = ["main", "master"];

pub const REPOSITORY_DESCRIPTION: &str = "Generated applications deployed by Shipyard";

/// Publishes deployment units through a [`GitHost`].
pub struct RepositoryPublisher<'a> {
    host: &'a dyn GitHost,
    cancel: &'a CancellationToken,
}

impl<'a> RepositoryPublisher<'a> {
    pub fn new(host: &'a dyn GitHost, cancel: &'a CancellationToken) -> Self {
        Self { host, cancel }
    }

    /// Publishes `unit` to `branch` with a single commit.
    ///
    /// 1. Ensure the repository exists
    /// 2. Resolve the parent commit (creating the branch if needed)
    /// 3. Upload one blob per file, in path order
    /// 4. Create the tree
    /// 5. Create the commit
    /// 6. Force-update the branch
    pub async fn publish(
        &self,
        branch: &str,
        unit: &DeploymentUnit,
        message: &str,
    ) -> Result<PublishOutcome, DeployError> {
        self.check_cancelled()?;
        self.ensure_repository().await?;

        self.check_cancelled()?;
        let (base_sha, created_branch) = self.resolve_base(branch).await?;

        let mut entries = Vec::with_capacity(unit.len());
        for (path, content) in unit.iter() {
            self.check_cancelled()?;
            let sha = self.host.create_blob(content).await?;
            debug!(path, sha = %sha, bytes = content.len(), "blob created");
            entries.push(TreeEntry::blob(path, sha));
        }

        self.check_cancelled()?;
        let tree = self.host.create_tree(&entries).await?;

        self.check_cancelled()?;
        let parents = [base_sha.clone()];
        let commit_sha = self.host.create_commit(message, &tree, &parents).await?;

        self.check_cancelled()?;
        self.host.update_branch(branch, &commit_sha, true).await?;

        info!(
            branch,
            commit = %commit_sha,
            parent = %base_sha,
            files = entries.len(),
            "branch published"
        );

        Ok(PublishOutcome {
            branch: branch.to_string(),
            commit_sha,
            base_sha,
            created_branch,
        })
    }

    async fn ensure_repository(&self) -> Result<(), DeployError> {
        if self.host.repository_exists().await? {
            return Ok(());
        }
        info!("apps repository missing, creating it");
        self.host.create_repository(REPOSITORY_DESCRIPTION).await
    }

    /// Returns the parent commit and whether the branch was created.
    async fn resolve_base(&self, branch: &str) -> Result<(String, bool), DeployError> {
        if let Some(head) = self.host.branch_head(branch).await? {
            debug!(branch, head = %head, "branch exists");
            return Ok((head, false));
        }

        let mut base = None;
        for default in DEFAULT_BRANCHES {
            if let Some(head) = self.host.branch_head(default).await? {
                base = Some((default, head));
                break;
            }
        }
        let Some((from, sha)) = base else {
            return Err(DeployError::NoDefaultBranch {
                tried: DEFAULT_BRANCHES.join(", "),
            });
        };

        self.host.create_branch(branch, &sha).await?;
        info!(branch, from, base = %sha, "branch created");
        Ok((sha, true))
    }

    fn check_cancelled(&self) -> Result<(), DeployError> {
        if self.cancel.is_cancelled() {
            Err(DeployError::Cancelled)
        } else {
            Ok(())
        }
    }
}
