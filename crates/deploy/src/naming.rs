//! Deterministic branch and service names.
//!
//! Re-deploying a project must hit the same branch and the same hosting
//! service, so names depend only on (owner, project name, project id). The
//! id suffix keeps projects whose names sanitize alike apart.

use crate::types::DeployNames;

/// Maximum length of the owner token.
pub const MAX_OWNER_TOKEN: usize = 15;
/// Maximum length of the project-name token.
pub const MAX_PROJECT_TOKEN: usize = 20;

const PREFIX: &str = "app";

/// Reduces untrusted text to `[a-z0-9-]`, at most `cap` characters, with no
/// leading or trailing hyphen. May return an empty string.
pub fn sanitize_token(input: &str, cap: usize) -> String {
    let cleaned: String = input
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
        .take(cap)
        .collect();
    cleaned.trim_matches('-').to_string()
}

/// Project names read better with spaces kept as word breaks.
fn project_token(name: &str) -> String {
    sanitize_token(&name.replace(' ', "-"), MAX_PROJECT_TOKEN)
}

fn owner_token(owner: &str) -> String {
    sanitize_token(owner, MAX_OWNER_TOKEN)
}

/// Branch name: `app-<owner>-<project>-<id>`, skipping empty tokens.
pub fn branch_name(owner: &str, project_name: &str, id: u64) -> String {
    let id = id.to_string();
    let owner = owner_token(owner);
    let project = project_token(project_name);
    [PREFIX, owner.as_str(), project.as_str(), id.as_str()]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("-")
}

/// Hosting service name: `app-<id>-<project>`, skipping an empty token.
pub fn service_name(project_name: &str, id: u64) -> String {
    let project = project_token(project_name);
    if project.is_empty() {
        format!("{PREFIX}-{id}")
    } else {
        format!("{PREFIX}-{id}-{project}")
    }
}

/// Resolves both names for a project.
pub fn resolve_names(owner: &str, project_name: &str, id: u64) -> DeployNames {
    DeployNames {
        branch: branch_name(owner, project_name, id),
        service: service_name(project_name, id),
    }
}
