//! Named scenario fragments for common GitHub layouts.
//!
//! Each factory returns an unvalidated [`Scenario`]; compose fragments with
//! [`super::merge_scenarios`] and validate the result.

use super::checks::{ensure_unique, parse_repo_reference, require_text, CheckResult};
use super::{
    AppInstallation, Branch, DefaultBranch, GitHubApp, Organization, Repository, Scenario, User,
};
use crate::error::ValidationError;

/// Owner account as either a user or an organization.
fn with_account(scenario: Scenario, login: &str, is_org: bool) -> Scenario {
    if is_org {
        scenario.with_organization(Organization::new(login))
    } else {
        scenario.with_user(User::new(login))
    }
}

/// A single repository owned by a user or organization.
pub fn single_repo_scenario(
    owner: &str,
    name: &str,
    owner_is_org: bool,
    default_branch: &str,
) -> CheckResult<Scenario> {
    let owner = require_text(owner, "Owner")?;
    let name = require_text(name, "Repository name")?;
    let default_branch = require_text(default_branch, "Default branch")?;

    let repository =
        Repository::new(owner, name).with_default_branch(DefaultBranch::new(default_branch));
    Ok(with_account(Scenario::new(), owner, owner_is_org).with_repository(repository))
}

/// A single organization with no repositories.
pub fn empty_org_scenario(login: &str) -> CheckResult<Scenario> {
    let login = require_text(login, "Organization login")?;
    Ok(Scenario::new().with_organization(Organization::new(login)))
}

/// A monorepo on a `main` default branch with one `apps/<name>` branch per app.
pub fn monorepo_with_apps_scenario(
    owner: &str,
    repo: &str,
    apps: &[&str],
    owner_is_org: bool,
) -> CheckResult<Scenario> {
    let owner = require_text(owner, "Owner")?;
    let repo = require_text(repo, "Repository name")?;
    if apps.is_empty() {
        return Err(ValidationError::new("Apps must include at least one entry"));
    }
    for app in apps {
        require_text(app, "App name")?;
    }
    ensure_unique(apps, "app name")?;

    let repository = Repository::new(owner, repo).with_default_branch(DefaultBranch::new("main"));
    let mut scenario =
        with_account(Scenario::new(), owner, owner_is_org).with_repository(repository);
    for app in apps {
        scenario = scenario.with_branch(Branch::new(owner, repo, format!("apps/{app}")));
    }
    Ok(scenario)
}

/// Parameters for [`github_app_scenario`].
#[derive(Debug, Clone, Default)]
pub struct GitHubAppScenario {
    pub app_slug: String,
    pub name: String,
    /// Login the app is installed on.
    pub account: String,
    pub account_is_org: bool,
    /// `owner/name` references visible to the installation.
    pub repositories: Vec<String>,
    pub permissions: Vec<String>,
    pub access_token: Option<String>,
    pub app_id: Option<i64>,
}

impl GitHubAppScenario {
    pub fn new(
        app_slug: impl Into<String>,
        name: impl Into<String>,
        account: impl Into<String>,
    ) -> Self {
        Self {
            app_slug: app_slug.into(),
            name: name.into(),
            account: account.into(),
            ..Self::default()
        }
    }
}

/// A GitHub App with one installation (id 1) on `params.account`.
///
/// A bare repository is added for every reference in `params.repositories`.
/// Repository owners other than the installation account are not created.
pub fn github_app_scenario(params: GitHubAppScenario) -> CheckResult<Scenario> {
    let app_slug = require_text(&params.app_slug, "App slug")?;
    let name = require_text(&params.name, "App name")?;
    let account = require_text(&params.account, "Account")?;

    let mut repositories = Vec::with_capacity(params.repositories.len());
    for repo_ref in &params.repositories {
        let (owner, repo) = parse_repo_reference(repo_ref, "Repository reference")?;
        repositories.push(Repository::new(owner, repo));
    }

    let app = GitHubApp {
        app_id: params.app_id,
        ..GitHubApp::new(app_slug, name)
    };
    let installation = AppInstallation {
        repositories: params.repositories.clone(),
        permissions: params.permissions.clone(),
        access_token: params.access_token.clone(),
        ..AppInstallation::new(1, app_slug, account)
    };

    let mut scenario = with_account(Scenario::new(), account, params.account_is_org);
    for repository in repositories {
        scenario = scenario.with_repository(repository);
    }
    Ok(scenario.with_app(app).with_app_installation(installation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::merge_scenarios;

    #[test]
    fn single_repo_for_user_owner() {
        let scenario = single_repo_scenario("octocat", "demo-repo", false, "main").unwrap();
        assert_eq!(scenario.users().len(), 1);
        assert!(scenario.organizations().is_empty());
        let repo = &scenario.repositories()[0];
        assert_eq!(repo.default_branch, Some(DefaultBranch::new("main")));
        scenario.validate().unwrap();
    }

    #[test]
    fn single_repo_for_org_owner() {
        let scenario = single_repo_scenario("octo-org", "repo", true, "trunk").unwrap();
        assert!(scenario.users().is_empty());
        assert_eq!(scenario.organizations()[0].login, "octo-org");
        let indexes = scenario.validate().unwrap();
        let names: Vec<&str> = indexes
            .merged_branches()
            .map(|branch| branch.name.as_str())
            .collect();
        assert_eq!(names, ["trunk"]);
    }

    #[test]
    fn blank_inputs_are_rejected() {
        let err = single_repo_scenario(" ", "repo", false, "main").unwrap_err();
        assert_eq!(err.message, "Owner must be a non-empty string");
        let err = empty_org_scenario("").unwrap_err();
        assert_eq!(err.message, "Organization login must be a non-empty string");
    }

    #[test]
    fn monorepo_creates_app_branches() {
        let scenario = monorepo_with_apps_scenario("acme", "mono", &["web", "api"], true).unwrap();
        let names: Vec<&str> = scenario
            .branches()
            .iter()
            .map(|branch| branch.name.as_str())
            .collect();
        assert_eq!(names, ["apps/web", "apps/api"]);
        scenario.validate().unwrap();
    }

    #[test]
    fn monorepo_rejects_empty_and_duplicate_apps() {
        let err = monorepo_with_apps_scenario("acme", "mono", &[], false).unwrap_err();
        assert_eq!(err.message, "Apps must include at least one entry");
        let err = monorepo_with_apps_scenario("acme", "mono", &["web", "web"], false).unwrap_err();
        assert_eq!(err.message, "Duplicate app name: \"web\"");
    }

    #[test]
    fn github_app_scenario_installs_on_account() {
        let scenario = github_app_scenario(GitHubAppScenario {
            repositories: vec!["octocat/hello".to_string()],
            access_token: Some("ghs_app".to_string()),
            app_id: Some(42),
            ..GitHubAppScenario::new("my-bot", "My Bot", "octocat")
        })
        .unwrap();
        assert_eq!(scenario.app_installations()[0].installation_id, 1);
        assert_eq!(scenario.repositories()[0], Repository::new("octocat", "hello"));
        assert_eq!(scenario.resolve_auth_token().unwrap().as_deref(), Some("ghs_app"));
    }

    #[test]
    fn github_app_scenario_rejects_malformed_reference() {
        let err = github_app_scenario(GitHubAppScenario {
            repositories: vec!["hello".to_string()],
            ..GitHubAppScenario::new("my-bot", "My Bot", "octocat")
        })
        .unwrap_err();
        assert_eq!(
            err.message,
            "Repository reference must be in the form 'owner/repo'"
        );
    }

    #[test]
    fn factories_compose() {
        let merged = merge_scenarios(&[
            single_repo_scenario("octocat", "hello", false, "main").unwrap(),
            github_app_scenario(GitHubAppScenario {
                repositories: vec!["octocat/hello".to_string()],
                ..GitHubAppScenario::new("my-bot", "My Bot", "octocat")
            })
            .unwrap(),
        ]);
        // The app fragment declares a bare `octocat/hello`, which differs from
        // the single-repo fragment's definition.
        let err = merged.unwrap_err();
        assert_eq!(err.message, "Conflicting repository definition for octocat/hello");
    }
}
