//! Deploy orchestrator.
//!
//! Runs one project through extract, synthesize, publish and provision,
//! reporting progress events and folding every failure into a
//! [`DeployResult`].

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use shipyard_github::RepoSlug;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::{self, ConfigSource};
use crate::error::DeployError;
use crate::extract::extract;
use crate::hosts::{ConnectOptions, HostConnector, HttpConnector};
use crate::naming::resolve_names;
use crate::provisioner::HostingProvisioner;
use crate::publisher::RepositoryPublisher;
use crate::synth::{DeploymentUnit, synthesize};
use crate::types::{DeployEvent, DeployNames, DeployResult, DeployStep, ProvisionOutcome, Project};

type StepError = (DeployStep, DeployError);

fn at(step: DeployStep) -> impl FnOnce(DeployError) -> StepError {
    move |e| (step, e)
}

/// Orchestrates project deployments.
pub struct DeployOrchestrator {
    config: Arc<dyn ConfigSource>,
    connector: Arc<dyn HostConnector>,
    events_tx: mpsc::Sender<DeployEvent>,
    events_rx: Option<mpsc::Receiver<DeployEvent>>,
    cancel: CancellationToken,
    in_flight: Mutex<HashSet<u64>>,
}

impl DeployOrchestrator {
    /// Creates an orchestrator over the given configuration and hosts.
    pub fn new(config: Arc<dyn ConfigSource>, connector: Arc<dyn HostConnector>) -> Self {
        let (events_tx, events_rx) = mpsc::channel(256);
        Self {
            config,
            connector,
            events_tx,
            events_rx: Some(events_rx),
            cancel: CancellationToken::new(),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Creates an orchestrator talking to the real GitHub and Render APIs.
    pub fn with_http(config: Arc<dyn ConfigSource>) -> Self {
        Self::new(config, Arc::new(HttpConnector))
    }

    /// Takes the event receiver. Can only be called once.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<DeployEvent>> {
        self.events_rx.take()
    }

    /// Returns the cancellation token shared by all deployments.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Deploys a project. Never fails; errors are reported in the result.
    ///
    /// A second deployment of a project that is still running on this
    /// orchestrator fails immediately at [`DeployStep::Pending`].
    pub async fn deploy(&self, project: &Project) -> DeployResult {
        let names = resolve_names(&project.owner, &project.name, project.id);

        let Some(_claim) = self.claim(project.id) else {
            let err = DeployError::AlreadyInProgress {
                project_id: project.id,
            };
            return self.fail(project, &names, DeployStep::Pending, err);
        };

        info!(project_id = project.id, branch = %names.branch, "deploy started");
        match self.run(project, &names).await {
            Ok(outcome) => {
                self.emit(DeployEvent::Completed {
                    project_id: project.id,
                    url: outcome.url.clone(),
                });
                info!(
                    project_id = project.id,
                    branch = %names.branch,
                    url = %outcome.url,
                    redeployed = outcome.redeployed,
                    "deploy completed"
                );
                DeployResult::succeeded(project.id, names.branch, outcome.url)
            }
            Err((step, err)) => self.fail(project, &names, step, err),
        }
    }

    async fn run(
        &self,
        project: &Project,
        names: &DeployNames,
    ) -> Result<ProvisionOutcome, StepError> {
        let step = DeployStep::Extracting;
        self.begin(project.id, step).map_err(at(step))?;
        let code = extract(project);

        let step = DeployStep::Synthesizing;
        self.begin(project.id, step).map_err(at(step))?;
        let unit = synthesize(&code, project);

        let step = DeployStep::Publishing;
        self.begin(project.id, step).map_err(at(step))?;
        let repo = self.config.apps_repo().map_err(at(step))?;
        self.publish(project, names, &repo, &unit)
            .await
            .map_err(at(step))?;

        let step = DeployStep::Provisioning;
        self.begin(project.id, step).map_err(at(step))?;
        self.provision(names, &repo).await.map_err(at(step))
    }

    async fn publish(
        &self,
        project: &Project,
        names: &DeployNames,
        repo: &RepoSlug,
        unit: &DeploymentUnit,
    ) -> Result<(), DeployError> {
        let token = self.config.github_token()?;
        let opts = ConnectOptions {
            timeout: self.config.request_timeout()?,
            base_url: self.config.get(config::GITHUB_API_URL),
        };
        let host = self.connector.git(&token, repo, &opts)?;

        info!(
            project_id = project.id,
            repo = %repo,
            branch = %names.branch,
            files = unit.len(),
            "publishing"
        );
        let message = format!("Deploy {}", project.name);
        RepositoryPublisher::new(host.as_ref(), &self.cancel)
            .publish(&names.branch, unit, &message)
            .await?;
        Ok(())
    }

    async fn provision(
        &self,
        names: &DeployNames,
        repo: &RepoSlug,
    ) -> Result<ProvisionOutcome, DeployError> {
        let api_key = self.config.render_api_key()?;
        let opts = ConnectOptions {
            timeout: self.config.request_timeout()?,
            base_url: self.config.get(config::RENDER_API_URL),
        };
        let host = self.connector.static_host(&api_key, &opts)?;

        info!(service = %names.service, branch = %names.branch, "provisioning");
        HostingProvisioner::new(host.as_ref())
            .provision(names, repo, self.config.as_ref())
            .await
    }

    fn begin(&self, project_id: u64, step: DeployStep) -> Result<(), DeployError> {
        if self.cancel.is_cancelled() {
            return Err(DeployError::Cancelled);
        }
        self.emit(DeployEvent::StepStarted { project_id, step });
        Ok(())
    }

    fn fail(
        &self,
        project: &Project,
        names: &DeployNames,
        step: DeployStep,
        err: DeployError,
    ) -> DeployResult {
        let message = err.to_string();
        error!(
            project_id = project.id,
            step = %step,
            kind = ?err.kind(),
            error = %message,
            "deploy failed"
        );
        self.emit(DeployEvent::Failed {
            project_id: project.id,
            step,
            error: message.clone(),
        });
        DeployResult::failed(project.id, names.branch.clone(), step, message)
    }

    /// Events are best-effort; a full or closed channel never stalls a deploy.
    fn emit(&self, event: DeployEvent) {
        let _ = self.events_tx.try_send(event);
    }

    fn claim(&self, project_id: u64) -> Option<InFlight<'_>> {
        let mut set = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        set.insert(project_id).then(|| InFlight {
            set: &self.in_flight,
            project_id,
        })
    }
}

/// Marks a project as deploying until dropped.
struct InFlight<'a> {
    set: &'a Mutex<HashSet<u64>>,
    project_id: u64,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.project_id);
    }
}
