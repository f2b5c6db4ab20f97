//! Entity records for scenario configuration.
//!
//! These types describe simulator state (users, repositories, branches, and
//! so on) independently of the simulator's JSON schema. They are plain values:
//! construct them, compose them into a [`super::Scenario`], and let validation
//! decide whether the graph is consistent.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Open/closed state shared by issues and pull requests.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(try_from = "String", into = "String")]
pub enum ItemState {
    #[default]
    Open,
    Closed,
}

impl ItemState {
    pub const ALLOWED: [&'static str; 2] = ["closed", "open"];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

impl TryFrom<String> for ItemState {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            other => Err(format!(
                "state must be one of {:?} (got {other:?})",
                Self::ALLOWED
            )),
        }
    }
}

impl From<ItemState> for String {
    fn from(value: ItemState) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for ItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Repository visibility scope granted to an access token.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub enum RepositoryVisibility {
    All,
    Private,
    Public,
}

impl RepositoryVisibility {
    pub const ALLOWED: [&'static str; 3] = ["all", "private", "public"];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Private => "private",
            Self::Public => "public",
        }
    }
}

impl TryFrom<String> for RepositoryVisibility {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "all" => Ok(Self::All),
            "private" => Ok(Self::Private),
            "public" => Ok(Self::Public),
            _ => Err(format!(
                "Token repository visibility must be one of {:?}",
                Self::ALLOWED
            )),
        }
    }
}

impl From<RepositoryVisibility> for String {
    fn from(value: RepositoryVisibility) -> Self {
        value.as_str().to_string()
    }
}

/// A GitHub user account.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct User {
    pub login: String,
    #[serde(default)]
    pub organizations: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
}

impl User {
    pub fn new(login: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            ..Self::default()
        }
    }

    pub fn member_of<I, S>(mut self, organizations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.organizations = organizations.into_iter().map(Into::into).collect();
        self
    }
}

/// A GitHub organization.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct Organization {
    pub login: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
}

impl Organization {
    pub fn new(login: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            ..Self::default()
        }
    }
}

/// Default branch metadata declared on a repository.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct DefaultBranch {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protected: Option<bool>,
}

impl DefaultBranch {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn to_branch(&self, owner: &str, repository: &str) -> Branch {
        Branch {
            owner: owner.to_string(),
            repository: repository.to_string(),
            name: self.name.clone(),
            sha: self.sha.clone(),
            protected: self.protected,
        }
    }
}

/// A GitHub repository, identified by `(owner, name)`.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct Repository {
    pub owner: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub private: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_branch: Option<DefaultBranch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
}

impl Repository {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_default_branch(mut self, branch: DefaultBranch) -> Self {
        self.default_branch = Some(branch);
        self
    }
}

/// A git branch, identified by `(owner, repository, name)`.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct Branch {
    pub owner: String,
    pub repository: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protected: Option<bool>,
}

impl Branch {
    pub fn new(
        owner: impl Into<String>,
        repository: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            owner: owner.into(),
            repository: repository.into(),
            name: name.into(),
            ..Self::default()
        }
    }
}

/// An issue, identified by `(owner, repository, number)`.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct Issue {
    pub owner: String,
    pub repository: String,
    pub number: i64,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default)]
    pub state: ItemState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

impl Issue {
    pub fn new(
        owner: impl Into<String>,
        repository: impl Into<String>,
        number: i64,
        title: impl Into<String>,
    ) -> Self {
        Self {
            owner: owner.into(),
            repository: repository.into(),
            number,
            title: title.into(),
            ..Self::default()
        }
    }
}

/// A pull request, identified by `(owner, repository, number)`.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct PullRequest {
    pub owner: String,
    pub repository: String,
    pub number: i64,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default)]
    pub state: ItemState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head_branch: Option<String>,
    #[serde(default)]
    pub draft: bool,
}

impl PullRequest {
    pub fn new(
        owner: impl Into<String>,
        repository: impl Into<String>,
        number: i64,
        title: impl Into<String>,
    ) -> Self {
        Self {
            owner: owner.into(),
            repository: repository.into(),
            number,
            title: title.into(),
            ..Self::default()
        }
    }
}

/// An access token used for `Authorization` headers.
///
/// `repositories` holds `owner/name` references. Permissions and visibility
/// are descriptive only; the simulator does not enforce them.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct AccessToken {
    pub value: String,
    pub owner: String,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub repositories: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository_visibility: Option<RepositoryVisibility>,
}

impl AccessToken {
    pub fn new(value: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            owner: owner.into(),
            ..Self::default()
        }
    }
}

/// A GitHub App definition, identified by its slug.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct GitHubApp {
    pub app_slug: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

impl GitHubApp {
    pub fn new(app_slug: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            app_slug: app_slug.into(),
            name: name.into(),
            ..Self::default()
        }
    }
}

/// An installation of a [`GitHubApp`] on a user or organization account.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct AppInstallation {
    pub installation_id: i64,
    pub app_slug: String,
    pub account: String,
    #[serde(default)]
    pub repositories: Vec<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

impl AppInstallation {
    pub fn new(
        installation_id: i64,
        app_slug: impl Into<String>,
        account: impl Into<String>,
    ) -> Self {
        Self {
            installation_id,
            app_slug: app_slug.into(),
            account: account.into(),
            ..Self::default()
        }
    }
}
