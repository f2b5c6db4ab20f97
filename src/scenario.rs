//! Scenario aggregate: the declarative description of simulator state.
//!
//! A [`Scenario`] is built from entity records (see [`models`]), optionally
//! composed from fragments ([`compose::merge_scenarios`]), and validated once.
//! Validation produces [`ScenarioIndexes`], which are memoized on the scenario
//! so serialization and token resolution do not rebuild them.
//!
//! ## Validation order
//! Violations are reported one at a time, in this order:
//! organizations, users, repositories, tokens, apps, installations,
//! default token, branches (including default-branch merge), issues, pull
//! requests.

use crate::error::ValidationError;
use crate::sim_config::SimConfig;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::OnceLock;

mod access;
mod checks;
pub mod compose;
pub mod credentials;
pub mod factories;
mod issues;
pub mod models;
mod validate;

pub use compose::merge_scenarios;
pub use credentials::select_auth_token;
pub use factories::{
    empty_org_scenario, github_app_scenario, monorepo_with_apps_scenario, single_repo_scenario,
    GitHubAppScenario,
};
pub use models::{
    AccessToken, AppInstallation, Branch, DefaultBranch, GitHubApp, Issue, ItemState,
    Organization, PullRequest, Repository, RepositoryVisibility, User,
};

/// Repository identity: `(owner, name)`.
pub type RepositoryKey = (String, String);

/// Lookup tables derived from a validated scenario.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScenarioIndexes {
    pub org_logins: BTreeSet<String>,
    pub user_logins: BTreeSet<String>,
    pub repositories: BTreeMap<RepositoryKey, Repository>,
    /// Explicit branches merged with repository default branches.
    pub branches: BTreeMap<RepositoryKey, BTreeMap<String, Branch>>,
    pub app_slugs: BTreeSet<String>,
}

impl ScenarioIndexes {
    pub fn is_account(&self, login: &str) -> bool {
        self.user_logins.contains(login) || self.org_logins.contains(login)
    }

    /// Merged branches in repository order, then branch-name order.
    pub fn merged_branches(&self) -> impl Iterator<Item = &Branch> {
        self.branches.values().flat_map(|branches| branches.values())
    }
}

/// Container for scenario configuration.
///
/// Collections keep declaration order. The scenario is never mutated after
/// construction apart from the write-once index cache.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    #[serde(default)]
    pub(crate) users: Vec<User>,
    #[serde(default)]
    pub(crate) organizations: Vec<Organization>,
    #[serde(default)]
    pub(crate) repositories: Vec<Repository>,
    #[serde(default)]
    pub(crate) branches: Vec<Branch>,
    #[serde(default)]
    pub(crate) issues: Vec<Issue>,
    #[serde(default)]
    pub(crate) pull_requests: Vec<PullRequest>,
    #[serde(default)]
    pub(crate) tokens: Vec<AccessToken>,
    #[serde(default)]
    pub(crate) apps: Vec<GitHubApp>,
    #[serde(default)]
    pub(crate) app_installations: Vec<AppInstallation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) default_token: Option<String>,
    #[serde(skip)]
    indexes: OnceLock<ScenarioIndexes>,
}

impl PartialEq for Scenario {
    fn eq(&self, other: &Self) -> bool {
        self.users == other.users
            && self.organizations == other.organizations
            && self.repositories == other.repositories
            && self.branches == other.branches
            && self.issues == other.issues
            && self.pull_requests == other.pull_requests
            && self.tokens == other.tokens
            && self.apps == other.apps
            && self.app_installations == other.app_installations
            && self.default_token == other.default_token
    }
}

impl Eq for Scenario {}

impl Scenario {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a scenario from JSON text.
    ///
    /// Shape problems (unknown keys, a string where a list is expected, a
    /// boolean where an integer is expected) are reported as validation
    /// errors. Referential checks still require [`Scenario::validate`].
    pub fn from_json(text: &str) -> Result<Self, ValidationError> {
        serde_json::from_str(text)
            .map_err(|err| ValidationError::new(format!("Invalid scenario definition: {err}")))
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, ValidationError> {
        serde_json::from_value(value)
            .map_err(|err| ValidationError::new(format!("Invalid scenario definition: {err}")))
    }

    pub fn load(path: &Path) -> Result<Self, ValidationError> {
        let text = std::fs::read_to_string(path).map_err(|err| {
            ValidationError::new(format!("read scenario {}: {err}", path.display()))
        })?;
        Self::from_json(&text)
    }

    pub fn with_user(mut self, user: User) -> Self {
        self.users.push(user);
        self.invalidated()
    }

    pub fn with_organization(mut self, organization: Organization) -> Self {
        self.organizations.push(organization);
        self.invalidated()
    }

    pub fn with_repository(mut self, repository: Repository) -> Self {
        self.repositories.push(repository);
        self.invalidated()
    }

    pub fn with_branch(mut self, branch: Branch) -> Self {
        self.branches.push(branch);
        self.invalidated()
    }

    pub fn with_issue(mut self, issue: Issue) -> Self {
        self.issues.push(issue);
        self.invalidated()
    }

    pub fn with_pull_request(mut self, pull_request: PullRequest) -> Self {
        self.pull_requests.push(pull_request);
        self.invalidated()
    }

    pub fn with_token(mut self, token: AccessToken) -> Self {
        self.tokens.push(token);
        self.invalidated()
    }

    pub fn with_app(mut self, app: GitHubApp) -> Self {
        self.apps.push(app);
        self.invalidated()
    }

    pub fn with_app_installation(mut self, installation: AppInstallation) -> Self {
        self.app_installations.push(installation);
        self.invalidated()
    }

    pub fn with_default_token(mut self, value: impl Into<String>) -> Self {
        self.default_token = Some(value.into());
        self.invalidated()
    }

    // Builders consume the scenario, so a cached index can only be stale here.
    fn invalidated(mut self) -> Self {
        self.indexes = OnceLock::new();
        self
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn organizations(&self) -> &[Organization] {
        &self.organizations
    }

    pub fn repositories(&self) -> &[Repository] {
        &self.repositories
    }

    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn pull_requests(&self) -> &[PullRequest] {
        &self.pull_requests
    }

    pub fn tokens(&self) -> &[AccessToken] {
        &self.tokens
    }

    pub fn apps(&self) -> &[GitHubApp] {
        &self.apps
    }

    pub fn app_installations(&self) -> &[AppInstallation] {
        &self.app_installations
    }

    pub fn default_token(&self) -> Option<&str> {
        self.default_token.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
            && self.organizations.is_empty()
            && self.repositories.is_empty()
            && self.branches.is_empty()
            && self.issues.is_empty()
            && self.pull_requests.is_empty()
            && self.tokens.is_empty()
            && self.apps.is_empty()
            && self.app_installations.is_empty()
            && self.default_token.is_none()
    }

    /// Validate the scenario and return its indexes.
    ///
    /// The first successful call caches the indexes; later calls return the
    /// cached value without re-running any checks.
    pub fn validate(&self) -> Result<&ScenarioIndexes, ValidationError> {
        if let Some(indexes) = self.indexes.get() {
            return Ok(indexes);
        }
        let built = validate::build_indexes(self)?;
        tracing::debug!(
            repositories = built.repositories.len(),
            branches = built.merged_branches().count(),
            "scenario indexes built"
        );
        Ok(self.indexes.get_or_init(|| built))
    }

    pub fn is_validated(&self) -> bool {
        self.indexes.get().is_some()
    }

    /// Resolve the token to send as the `Authorization` header, if any.
    ///
    /// Installation access tokens join the candidate pool after standalone
    /// tokens. One candidate auto-selects; several require `default_token`.
    pub fn resolve_auth_token(&self) -> Result<Option<String>, ValidationError> {
        self.validate()?;
        let values = credentials::collect_token_values(self);
        select_auth_token(&values, self.default_token())
    }

    /// Serialize into the simulator's configuration format.
    ///
    /// Issues and pull requests are emitted only when `include_unsupported`
    /// is set; tokens and app metadata are never emitted.
    pub fn to_simulator_config(
        &self,
        include_unsupported: bool,
    ) -> Result<SimConfig, ValidationError> {
        SimConfig::from_scenario(self, include_unsupported)
    }
}

#[cfg(test)]
#[path = "scenario_tests.rs"]
mod tests;
