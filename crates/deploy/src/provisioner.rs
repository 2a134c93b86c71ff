//! Hosting provisioner.
//!
//! Makes sure a static site builds the deploy branch: redeploys the
//! service when one with the exact name exists, creates it otherwise.

use shipyard_github::RepoSlug;
use shipyard_render::{NewStaticSite, StaticSiteDetails};
use tracing::info;

use crate::config::ConfigSource;
use crate::error::DeployError;
use crate::hosts::StaticHost;
use crate::types::{DeployNames, ProvisionOutcome};

pub const BUILD_COMMAND: &str = "npm install && npm run build";
pub const PUBLISH_PATH: &str = "dist";
pub const HOSTING_DOMAIN: &str = "onrender.com";

/// URL a service is reachable at when the host doesn't report one.
pub fn fallback_url(service: &str) -> String {
    format!("https://{service}.{HOSTING_DOMAIN}")
}

pub struct HostingProvisioner<'a> {
    host: &'a dyn StaticHost,
}

impl<'a> HostingProvisioner<'a> {
    pub fn new(host: &'a dyn StaticHost) -> Self {
        Self { host }
    }

    /// Redeploys or creates the service for `names`.
    ///
    /// The owner id is only read when a service has to be created.
    pub async fn provision(
        &self,
        names: &DeployNames,
        repo: &RepoSlug,
        config: &dyn ConfigSource,
    ) -> Result<ProvisionOutcome, DeployError> {
        if let Some(existing) = self.host.find_service(&names.service).await? {
            self.host.trigger_deploy(&existing.id).await?;
            let url = existing
                .url
                .unwrap_or_else(|| fallback_url(&names.service));
            info!(service = %names.service, id = %existing.id, url = %url, "redeploy triggered");
            return Ok(ProvisionOutcome {
                service_id: existing.id,
                url,
                redeployed: true,
            });
        }

        let owner_id = config.render_owner_id()?;
        let site = NewStaticSite::new(
            names.service.as_str(),
            owner_id,
            repo.https_url(),
            names.branch.as_str(),
            StaticSiteDetails {
                build_command: BUILD_COMMAND.to_string(),
                publish_path: PUBLISH_PATH.to_string(),
                pull_request_previews_enabled: "no",
            },
        );
        let created = self.host.create_static_site(&site).await?;
        let url = created
            .url
            .unwrap_or_else(|| fallback_url(&names.service));
        info!(service = %names.service, id = %created.id, url = %url, "static site created");

        Ok(ProvisionOutcome {
            service_id: created.id,
            url,
            redeployed: false,
        })
    }
}
