//! Shipyard deploy flow: extract, synthesize, publish, provision.
//!
//! Turns a generated project into a live static site. The crate holds the
//! business logic only; GitHub and Render are reached through the
//! [`GitHost`] and [`StaticHost`] seams, which [`HttpConnector`] backs with
//! the `shipyard-github` and `shipyard-render` clients.
//!
//! # Pipeline
//!
//! 1. **Extract** — normalize the stored frontend payload (JSON or legacy
//!    literal) into generated sources, falling back to a welcome app
//! 2. **Synthesize** — wrap the sources in the Vite + React scaffold
//! 3. **Publish** — commit the file tree to the project's branch of the
//!    apps repository and force-move the branch
//! 4. **Provision** — redeploy the project's static site, or create it

pub mod config;
pub mod deploy;
pub mod error;
pub mod extract;
pub mod hosts;
pub mod literal;
pub mod naming;
pub mod provisioner;
pub mod publisher;
pub mod synth;
pub mod types;

#[cfg(test)]
mod mock;

// Re-export primary types for convenience.
pub use config::{ConfigSource, EnvConfig, MapConfig, Settings};
pub use deploy::DeployOrchestrator;
pub use error::{DeployError, ErrorKind};
pub use extract::{GeneratedCode, StoredPayload, extract};
pub use hosts::{ConnectOptions, GitHost, HostConnector, HttpConnector, StaticHost};
pub use naming::resolve_names;
pub use provisioner::HostingProvisioner;
pub use publisher::RepositoryPublisher;
pub use synth::{DeploymentUnit, synthesize};
pub use types::{DeployEvent, DeployNames, DeployResult, DeployStep, Project};
