//! Deploy error types.

/// Broad classification of a [`DeployError`], for callers deciding whether
/// a retry could help.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A credential or identifier is missing or malformed. Retrying won't help.
    Configuration,
    /// A host answered with a non-success status.
    Upstream,
    /// The request never got an answer (connect failure, timeout).
    Network,
    /// Another deployment of the same project is running.
    Conflict,
    Cancelled,
    /// Local I/O or decoding failure.
    Internal,
}

/// Errors produced during deployment.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("{key} not configured")]
    MissingConfig { key: &'static str },

    #[error("invalid {key}: {reason}")]
    InvalidConfig { key: &'static str, reason: String },

    #[error("GitHub error: {0}")]
    GitHost(#[from] shipyard_github::Error),

    #[error("Render error: {0}")]
    StaticHost(#[from] shipyard_render::Error),

    #[error("could not find a default branch (tried {tried})")]
    NoDefaultBranch { tried: String },

    #[error("deployment already in progress for project {project_id}")]
    AlreadyInProgress { project_id: u64 },

    #[error("cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("settings error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DeployError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DeployError::MissingConfig { .. } | DeployError::InvalidConfig { .. } => {
                ErrorKind::Configuration
            }
            DeployError::GitHost(shipyard_github::Error::InvalidToken)
            | DeployError::GitHost(shipyard_github::Error::InvalidRepo(_))
            | DeployError::StaticHost(shipyard_render::Error::InvalidKey) => {
                ErrorKind::Configuration
            }
            DeployError::GitHost(shipyard_github::Error::Http(_))
            | DeployError::StaticHost(shipyard_render::Error::Http(_)) => ErrorKind::Network,
            DeployError::GitHost(_)
            | DeployError::StaticHost(_)
            | DeployError::NoDefaultBranch { .. } => ErrorKind::Upstream,
            DeployError::AlreadyInProgress { .. } => ErrorKind::Conflict,
            DeployError::Cancelled => ErrorKind::Cancelled,
            DeployError::Io(_) | DeployError::Toml(_) | DeployError::Json(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// True for errors caused by missing or malformed configuration.
    pub fn is_config(&self) -> bool {
        self.kind() == ErrorKind::Configuration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_names_the_key() {
        let err = DeployError::MissingConfig {
            key: "GITHUB_TOKEN",
        };
        assert_eq!(err.to_string(), "GITHUB_TOKEN not configured");
        assert!(err.is_config());
    }

    #[test]
    fn api_errors_are_upstream() {
        let err = DeployError::GitHost(shipyard_github::Error::Api {
            status: 422,
            body: "bad".into(),
        });
        assert_eq!(err.kind(), ErrorKind::Upstream);
        assert!(!err.is_config());
        assert!(err.to_string().contains("422"));

        let err = DeployError::StaticHost(shipyard_render::Error::Api {
            status: 500,
            body: "boom".into(),
        });
        assert_eq!(err.kind(), ErrorKind::Upstream);
    }

    #[test]
    fn invalid_token_is_configuration() {
        let err = DeployError::StaticHost(shipyard_render::Error::InvalidKey);
        assert!(err.is_config());
    }
}
