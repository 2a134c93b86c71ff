//! Data types for the deploy flow.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A generated project, as handed over by the task layer.
///
/// Read-only here; status transitions belong to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: u64,
    /// Owner's username.
    pub owner: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Stored generated frontend. Either a JSON object, a JSON-encoded
    /// string, or a legacy literal string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frontend_code: Option<serde_json::Value>,
}

/// Derived identifiers for a project's deployment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DeployNames {
    /// Branch in the apps repository.
    pub branch: String,
    /// Static-site service name on the hosting side.
    pub service: String,
}

/// A deployment step that can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployStep {
    Pending,
    Extracting,
    Synthesizing,
    Publishing,
    Provisioning,
}

impl DeployStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeployStep::Pending => "pending",
            DeployStep::Extracting => "extracting",
            DeployStep::Synthesizing => "synthesizing",
            DeployStep::Publishing => "publishing",
            DeployStep::Provisioning => "provisioning",
        }
    }
}

impl fmt::Display for DeployStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress event emitted during deployment.
#[derive(Debug, Clone, PartialEq)]
pub enum DeployEvent {
    /// A step has started.
    StepStarted { project_id: u64, step: DeployStep },
    /// Deployment finished and the site is reachable at `url`.
    Completed { project_id: u64, url: String },
    /// Deployment stopped at `step`.
    Failed {
        project_id: u64,
        step: DeployStep,
        error: String,
    },
}

/// Outcome of a repository publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOutcome {
    pub branch: String,
    /// Commit the branch now points at.
    pub commit_sha: String,
    /// Parent of that commit.
    pub base_sha: String,
    /// Whether the branch was created by this publish.
    pub created_branch: bool,
}

/// A hosting service as seen by the provisioner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRecord {
    pub id: String,
    pub name: String,
    pub url: Option<String>,
}

/// Outcome of provisioning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionOutcome {
    pub service_id: String,
    pub url: String,
    /// True when an existing service was redeployed instead of created.
    pub redeployed: bool,
}

/// Result record returned to the task layer. Always well-formed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployResult {
    pub project_id: u64,
    pub success: bool,
    pub url: Option<String>,
    pub branch: String,
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_step: Option<DeployStep>,
}

impl DeployResult {
    pub fn succeeded(project_id: u64, branch: String, url: String) -> Self {
        Self {
            project_id,
            success: true,
            url: Some(url),
            branch,
            error: None,
            failed_step: None,
        }
    }

    pub fn failed(project_id: u64, branch: String, step: DeployStep, error: String) -> Self {
        Self {
            project_id,
            success: false,
            url: None,
            branch,
            error: Some(error),
            failed_step: Some(step),
        }
    }
}
