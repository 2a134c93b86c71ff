//! Host seams.
//!
//! The publisher and provisioner talk to the git host and the static host
//! through [`GitHost`] and [`StaticHost`]. A [`HostConnector`] builds them
//! from credentials that are read fresh for every deployment. The HTTP
//! implementations wrap the `shipyard-github` and `shipyard-render`
//! clients; tests substitute recording mocks.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use shipyard_github::{NewRepository, RepoSlug, TreeEntry};
use shipyard_render::NewStaticSite;

use crate::error::DeployError;
use crate::types::ServiceRecord;

/// Boxed future returned by host operations.
pub type HostFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, DeployError>> + Send + 'a>>;

/// Git-hosting operations, bound to one repository.
pub trait GitHost: Send + Sync {
    /// Whether the repository exists.
    fn repository_exists(&self) -> HostFuture<'_, bool>;

    /// Creates the repository (public, auto-initialised).
    fn create_repository<'a>(&'a self, description: &'a str) -> HostFuture<'a, ()>;

    /// Head commit of `branch`, or `None` if the branch doesn't exist.
    fn branch_head<'a>(&'a self, branch: &'a str) -> HostFuture<'a, Option<String>>;

    /// Creates `branch` at `sha`.
    fn create_branch<'a>(&'a self, branch: &'a str, sha: &'a str) -> HostFuture<'a, ()>;

    /// Uploads a text blob and returns its sha.
    fn create_blob<'a>(&'a self, content: &'a str) -> HostFuture<'a, String>;

    /// Creates a tree and returns its sha.
    fn create_tree<'a>(&'a self, entries: &'a [TreeEntry]) -> HostFuture<'a, String>;

    /// Creates a commit and returns its sha.
    fn create_commit<'a>(
        &'a self,
        message: &'a str,
        tree: &'a str,
        parents: &'a [String],
    ) -> HostFuture<'a, String>;

    /// Points `branch` at `sha`, discarding history when `force` is set.
    fn update_branch<'a>(&'a self, branch: &'a str, sha: &'a str, force: bool)
    -> HostFuture<'a, ()>;
}

/// Static-hosting operations.
pub trait StaticHost: Send + Sync {
    /// Service named exactly `name`, if any.
    fn find_service<'a>(&'a self, name: &'a str) -> HostFuture<'a, Option<ServiceRecord>>;

    /// Creates a static site.
    fn create_static_site<'a>(&'a self, site: &'a NewStaticSite) -> HostFuture<'a, ServiceRecord>;

    /// Triggers a deploy without waiting for the build.
    fn trigger_deploy<'a>(&'a self, service_id: &'a str) -> HostFuture<'a, ()>;
}

/// Per-connection options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectOptions {
    pub timeout: Duration,
    /// API base URL override.
    pub base_url: Option<String>,
}

/// Builds host handles from credentials.
pub trait HostConnector: Send + Sync {
    fn git(
        &self,
        token: &str,
        repo: &RepoSlug,
        opts: &ConnectOptions,
    ) -> Result<Box<dyn GitHost>, DeployError>;

    fn static_host(
        &self,
        api_key: &str,
        opts: &ConnectOptions,
    ) -> Result<Box<dyn StaticHost>, DeployError>;
}

/// Connector for the real GitHub and Render APIs.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpConnector;

impl HostConnector for HttpConnector {
    fn git(
        &self,
        token: &str,
        repo: &RepoSlug,
        opts: &ConnectOptions,
    ) -> Result<Box<dyn GitHost>, DeployError> {
        let mut client = shipyard_github::Client::new(token, opts.timeout)?;
        if let Some(url) = &opts.base_url {
            client = client.with_base_url(url.clone());
        }
        Ok(Box::new(GithubHost {
            client,
            repo: repo.clone(),
        }))
    }

    fn static_host(
        &self,
        api_key: &str,
        opts: &ConnectOptions,
    ) -> Result<Box<dyn StaticHost>, DeployError> {
        let mut client = shipyard_render::Client::new(api_key, opts.timeout)?;
        if let Some(url) = &opts.base_url {
            client = client.with_base_url(url.clone());
        }
        Ok(Box::new(RenderHost { client }))
    }
}

/// [`GitHost`] over the GitHub REST API.
pub struct GithubHost {
    client: shipyard_github::Client,
    repo: RepoSlug,
}

impl GitHost for GithubHost {
    fn repository_exists(&self) -> HostFuture<'_, bool> {
        Box::pin(async move {
            let repo = self.client.get_repository(&self.repo).await?;
            Ok::<_, DeployError>(repo.is_some())
        })
    }

    fn create_repository<'a>(&'a self, description: &'a str) -> HostFuture<'a, ()> {
        Box::pin(async move {
            let new_repo = NewRepository {
                name: self.repo.name.clone(),
                description: description.to_string(),
                private: false,
                auto_init: true,
            };
            self.client.create_repository(&new_repo).await?;
            Ok::<_, DeployError>(())
        })
    }

    fn branch_head<'a>(&'a self, branch: &'a str) -> HostFuture<'a, Option<String>> {
        Box::pin(async move {
            let head = self.client.get_branch_ref(&self.repo, branch).await?;
            Ok::<_, DeployError>(head.map(|r| r.object.sha))
        })
    }

    fn create_branch<'a>(&'a self, branch: &'a str, sha: &'a str) -> HostFuture<'a, ()> {
        Box::pin(async move {
            self.client
                .create_branch_ref(&self.repo, branch, sha)
                .await?;
            Ok::<_, DeployError>(())
        })
    }

    fn create_blob<'a>(&'a self, content: &'a str) -> HostFuture<'a, String> {
        Box::pin(async move {
            let blob = self.client.create_blob(&self.repo, content).await?;
            Ok::<_, DeployError>(blob.sha)
        })
    }

    fn create_tree<'a>(&'a self, entries: &'a [TreeEntry]) -> HostFuture<'a, String> {
        Box::pin(async move {
            let tree = self.client.create_tree(&self.repo, entries).await?;
            Ok::<_, DeployError>(tree.sha)
        })
    }

    fn create_commit<'a>(
        &'a self,
        message: &'a str,
        tree: &'a str,
        parents: &'a [String],
    ) -> HostFuture<'a, String> {
        Box::pin(async move {
            let commit = self
                .client
                .create_commit(&self.repo, message, tree, parents)
                .await?;
            Ok::<_, DeployError>(commit.sha)
        })
    }

    fn update_branch<'a>(
        &'a self,
        branch: &'a str,
        sha: &'a str,
        force: bool,
    ) -> HostFuture<'a, ()> {
        Box::pin(async move {
            self.client
                .update_branch_ref(&self.repo, branch, sha, force)
                .await?;
            Ok::<_, DeployError>(())
        })
    }
}

/// [`StaticHost`] over the Render REST API.
pub struct RenderHost {
    client: shipyard_render::Client,
}

fn service_record(svc: shipyard_render::Service) -> ServiceRecord {
    let url = svc.url().map(str::to_string);
    ServiceRecord {
        id: svc.id,
        name: svc.name,
        url,
    }
}

impl StaticHost for RenderHost {
    fn find_service<'a>(&'a self, name: &'a str) -> HostFuture<'a, Option<ServiceRecord>> {
        Box::pin(async move {
            let found = self.client.find_service_by_name(name).await?;
            Ok::<_, DeployError>(found.map(service_record))
        })
    }

    fn create_static_site<'a>(&'a self, site: &'a NewStaticSite) -> HostFuture<'a, ServiceRecord> {
        Box::pin(async move {
            let created = self.client.create_static_site(site).await?;
            Ok::<_, DeployError>(service_record(created))
        })
    }

    fn trigger_deploy<'a>(&'a self, service_id: &'a str) -> HostFuture<'a, ()> {
        Box::pin(async move {
            self.client.trigger_deploy(service_id).await?;
            Ok::<_, DeployError>(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> ConnectOptions {
        ConnectOptions {
            timeout: Duration::from_secs(1),
            base_url: Some("http://127.0.0.1:1".into()),
        }
    }

    #[test]
    fn http_connector_builds_hosts() {
        let repo = RepoSlug::new("acme", "apps");
        assert!(HttpConnector.git("tok", &repo, &opts()).is_ok());
        assert!(HttpConnector.static_host("key", &opts()).is_ok());
    }

    #[test]
    fn http_connector_rejects_bad_token_as_config_error() {
        let repo = RepoSlug::new("acme", "apps");
        let err = HttpConnector
            .git("bad\ntoken", &repo, &opts())
            .err()
            .unwrap();
        assert!(err.is_config());
    }

    #[tokio::test]
    async fn unreachable_host_is_network_error() {
        let repo = RepoSlug::new("acme", "apps");
        let host = HttpConnector.git("tok", &repo, &opts()).unwrap();
        let err = host.repository_exists().await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Network);
    }

    #[tokio::test]
    async fn silent_host_times_out_as_network_error() {
        let opts = ConnectOptions {
            timeout: Duration::from_secs(1),
            base_url: Some(crate::mock::silent_server().await),
        };
        let started = std::time::Instant::now();

        let repo = RepoSlug::new("acme", "apps");
        let git = HttpConnector.git("tok", &repo, &opts).unwrap();
        let err = git.repository_exists().await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Network);
        assert!(matches!(
            &err,
            DeployError::GitHost(shipyard_github::Error::Http(e)) if e.is_timeout()
        ));

        let render = HttpConnector.static_host("key", &opts).unwrap();
        let err = render.find_service("app-1").await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Network);

        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
