//! Recording host mocks for tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use shipyard_github::{RepoSlug, TreeEntry};
use shipyard_render::NewStaticSite;
use tokio::sync::Notify;

use crate::config::{self, MapConfig};
use crate::error::DeployError;
use crate::hosts::{ConnectOptions, GitHost, HostConnector, HostFuture, StaticHost};
use crate::types::ServiceRecord;

pub const TOKEN: &str = "gh-token";
pub const API_KEY: &str = "rnd-key";
pub const OWNER_ID: &str = "own-1";
pub const MAIN_SHA: &str = "main-sha";

/// Starts a server that accepts connections and never answers.
pub async fn silent_server() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });
    format!("http://{addr}")
}

/// Configuration with every credential present.
pub fn test_config() -> MapConfig {
    MapConfig::new()
        .with(config::GITHUB_TOKEN, TOKEN)
        .with(config::RENDER_API_KEY, API_KEY)
        .with(config::RENDER_OWNER_ID, OWNER_ID)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitCall {
    RepositoryExists,
    CreateRepository(String),
    BranchHead(String),
    CreateBranch { branch: String, sha: String },
    CreateBlob(String),
    CreateTree(Vec<TreeEntry>),
    CreateCommit {
        message: String,
        tree: String,
        parents: Vec<String>,
    },
    UpdateBranch {
        branch: String,
        sha: String,
        force: bool,
    },
}

#[derive(Debug)]
struct GitState {
    repo_exists: bool,
    branches: HashMap<String, String>,
    /// 1-based blob index that fails with an API error.
    fail_blob_at: Option<usize>,
    blobs: usize,
    commits: usize,
    calls: Vec<GitCall>,
}

/// In-memory git host. Clones share state.
#[derive(Debug, Clone)]
pub struct MockGit {
    state: Arc<Mutex<GitState>>,
    gate: Option<Arc<Notify>>,
}

impl Default for MockGit {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGit {
    /// Existing repository with a `main` branch.
    pub fn new() -> Self {
        let mut branches = HashMap::new();
        branches.insert("main".to_string(), MAIN_SHA.to_string());
        Self {
            state: Arc::new(Mutex::new(GitState {
                repo_exists: true,
                branches,
                fail_blob_at: None,
                blobs: 0,
                commits: 0,
                calls: Vec::new(),
            })),
            gate: None,
        }
    }

    /// Repository that doesn't exist yet.
    pub fn empty() -> Self {
        let mock = Self::new();
        {
            let mut state = mock.state.lock().unwrap();
            state.repo_exists = false;
            state.branches.clear();
        }
        mock
    }

    pub fn with_branch(self, branch: &str, sha: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .branches
            .insert(branch.to_string(), sha.to_string());
        self
    }

    pub fn without_branch(self, branch: &str) -> Self {
        self.state.lock().unwrap().branches.remove(branch);
        self
    }

    pub fn fail_blob_at(self, index: usize) -> Self {
        self.state.lock().unwrap().fail_blob_at = Some(index);
        self
    }

    /// Blocks the first host call until `gate` is notified.
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn calls(&self) -> Vec<GitCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn branch(&self, branch: &str) -> Option<String> {
        self.state.lock().unwrap().branches.get(branch).cloned()
    }

    pub fn count(&self, pred: impl Fn(&GitCall) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: GitCall) {
        self.state.lock().unwrap().calls.push(call);
    }
}

impl GitHost for MockGit {
    fn repository_exists(&self) -> HostFuture<'_, bool> {
        self.record(GitCall::RepositoryExists);
        let gate = self.gate.clone();
        Box::pin(async move {
            if let Some(gate) = gate {
                gate.notified().await;
            }
            Ok(self.state.lock().unwrap().repo_exists)
        })
    }

    fn create_repository<'a>(&'a self, description: &'a str) -> HostFuture<'a, ()> {
        self.record(GitCall::CreateRepository(description.to_string()));
        let mut state = self.state.lock().unwrap();
        state.repo_exists = true;
        state
            .branches
            .insert("main".to_string(), MAIN_SHA.to_string());
        Box::pin(async { Ok(()) })
    }

    fn branch_head<'a>(&'a self, branch: &'a str) -> HostFuture<'a, Option<String>> {
        self.record(GitCall::BranchHead(branch.to_string()));
        let head = self.branch(branch);
        Box::pin(async move { Ok(head) })
    }

    fn create_branch<'a>(&'a self, branch: &'a str, sha: &'a str) -> HostFuture<'a, ()> {
        self.record(GitCall::CreateBranch {
            branch: branch.to_string(),
            sha: sha.to_string(),
        });
        self.state
            .lock()
            .unwrap()
            .branches
            .insert(branch.to_string(), sha.to_string());
        Box::pin(async { Ok(()) })
    }

    fn create_blob<'a>(&'a self, content: &'a str) -> HostFuture<'a, String> {
        self.record(GitCall::CreateBlob(content.to_string()));
        let mut state = self.state.lock().unwrap();
        state.blobs += 1;
        let result = if state.fail_blob_at == Some(state.blobs) {
            Err(DeployError::GitHost(shipyard_github::Error::Api {
                status: 422,
                body: r#"{"message":"blob rejected"}"#.into(),
            }))
        } else {
            Ok(format!("blob-{}", state.blobs))
        };
        Box::pin(async move { result })
    }

    fn create_tree<'a>(&'a self, entries: &'a [TreeEntry]) -> HostFuture<'a, String> {
        self.record(GitCall::CreateTree(entries.to_vec()));
        Box::pin(async { Ok("tree-sha".to_string()) })
    }

    fn create_commit<'a>(
        &'a self,
        message: &'a str,
        tree: &'a str,
        parents: &'a [String],
    ) -> HostFuture<'a, String> {
        self.record(GitCall::CreateCommit {
            message: message.to_string(),
            tree: tree.to_string(),
            parents: parents.to_vec(),
        });
        let mut state = self.state.lock().unwrap();
        state.commits += 1;
        let sha = format!("commit-{}", state.commits);
        Box::pin(async move { Ok(sha) })
    }

    fn update_branch<'a>(
        &'a self,
        branch: &'a str,
        sha: &'a str,
        force: bool,
    ) -> HostFuture<'a, ()> {
        self.record(GitCall::UpdateBranch {
            branch: branch.to_string(),
            sha: sha.to_string(),
            force,
        });
        self.state
            .lock()
            .unwrap()
            .branches
            .insert(branch.to_string(), sha.to_string());
        Box::pin(async { Ok(()) })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StaticCall {
    FindService(String),
    CreateStaticSite(NewStaticSite),
    TriggerDeploy(String),
}

#[derive(Debug, Default)]
struct StaticState {
    services: Vec<ServiceRecord>,
    /// URL the host reports for newly created services.
    create_url: Option<String>,
    fail_trigger: bool,
    calls: Vec<StaticCall>,
}

/// In-memory static host. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockStatic {
    state: Arc<Mutex<StaticState>>,
}

impl MockStatic {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_service(self, id: &str, name: &str, url: Option<&str>) -> Self {
        self.state.lock().unwrap().services.push(ServiceRecord {
            id: id.to_string(),
            name: name.to_string(),
            url: url.map(str::to_string),
        });
        self
    }

    pub fn with_create_url(self, url: &str) -> Self {
        self.state.lock().unwrap().create_url = Some(url.to_string());
        self
    }

    pub fn failing_trigger(self) -> Self {
        self.state.lock().unwrap().fail_trigger = true;
        self
    }

    pub fn calls(&self) -> Vec<StaticCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn created(&self) -> Vec<NewStaticSite> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                StaticCall::CreateStaticSite(site) => Some(site),
                _ => None,
            })
            .collect()
    }

    pub fn triggered(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                StaticCall::TriggerDeploy(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: StaticCall) {
        self.state.lock().unwrap().calls.push(call);
    }
}

impl StaticHost for MockStatic {
    fn find_service<'a>(&'a self, name: &'a str) -> HostFuture<'a, Option<ServiceRecord>> {
        self.record(StaticCall::FindService(name.to_string()));
        let found = self
            .state
            .lock()
            .unwrap()
            .services
            .iter()
            .find(|s| s.name == name)
            .cloned();
        Box::pin(async move { Ok(found) })
    }

    fn create_static_site<'a>(&'a self, site: &'a NewStaticSite) -> HostFuture<'a, ServiceRecord> {
        self.record(StaticCall::CreateStaticSite(site.clone()));
        let mut state = self.state.lock().unwrap();
        let record = ServiceRecord {
            id: format!("srv-{}", state.services.len() + 1),
            name: site.name.clone(),
            url: state.create_url.clone(),
        };
        state.services.push(record.clone());
        Box::pin(async move { Ok(record) })
    }

    fn trigger_deploy<'a>(&'a self, service_id: &'a str) -> HostFuture<'a, ()> {
        self.record(StaticCall::TriggerDeploy(service_id.to_string()));
        let fail = self.state.lock().unwrap().fail_trigger;
        Box::pin(async move {
            if fail {
                Err(DeployError::StaticHost(shipyard_render::Error::Api {
                    status: 503,
                    body: "unavailable".into(),
                }))
            } else {
                Ok(())
            }
        })
    }
}

/// Connector handing out shared mocks and recording credentials.
#[derive(Debug, Default)]
pub struct MockConnector {
    pub git: MockGit,
    pub hosting: MockStatic,
    tokens: Mutex<Vec<String>>,
    repos: Mutex<Vec<RepoSlug>>,
}

impl MockConnector {
    pub fn new(git: MockGit, hosting: MockStatic) -> Self {
        Self {
            git,
            hosting,
            tokens: Mutex::new(Vec::new()),
            repos: Mutex::new(Vec::new()),
        }
    }

    /// Every credential handed to the connector, in order.
    pub fn tokens(&self) -> Vec<String> {
        self.tokens.lock().unwrap().clone()
    }

    pub fn repos(&self) -> Vec<RepoSlug> {
        self.repos.lock().unwrap().clone()
    }
}

impl HostConnector for MockConnector {
    fn git(
        &self,
        token: &str,
        repo: &RepoSlug,
        _opts: &ConnectOptions,
    ) -> Result<Box<dyn GitHost>, DeployError> {
        self.tokens.lock().unwrap().push(token.to_string());
        self.repos.lock().unwrap().push(repo.clone());
        Ok(Box::new(self.git.clone()))
    }

    fn static_host(
        &self,
        api_key: &str,
        _opts: &ConnectOptions,
    ) -> Result<Box<dyn StaticHost>, DeployError> {
        self.tokens.lock().unwrap().push(api_key.to_string());
        Ok(Box::new(self.hosting.clone()))
    }
}
