// github issue lookup - read-only access to a single issue by number

use crate::error::{LensError, Result};
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

pub const GITHUB_API_URL: &str = "https://api.github.com";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GitHubIssue {
    pub number: u64,
    pub title: String,
    pub body: String,
    pub state: String,
    pub labels: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
    pub html_url: String,
}

// raw api shapes
#[derive(Deserialize)]
struct ApiIssue {
    number: u64,
    title: String,
    body: Option<String>,
    state: String,
    #[serde(default)]
    labels: Vec<ApiLabel>,
    created_at: String,
    updated_at: String,
    html_url: String,
    pull_request: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct ApiLabel {
    name: String,
}

impl ApiIssue {
    /// pull requests show up in the issues api, they are not issues
    fn into_issue(self) -> Option<GitHubIssue> {
        if self.pull_request.is_some() {
            return None;
        }
        Some(GitHubIssue {
            number: self.number,
            title: self.title,
            body: self.body.unwrap_or_default(),
            state: self.state,
            labels: self.labels.into_iter().map(|l| l.name).collect(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            html_url: self.html_url,
        })
    }
}

/// owner/repo pair of a github repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSlug {
    pub owner: String,
    pub repo: String,
}

/// whether the checkout is a fork, judged from its `origin` and `upstream` remotes
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ForkInfo {
    pub is_fork: bool,
    pub current: Option<RepoSlug>,
    pub parent: Option<RepoSlug>,
}

impl ForkInfo {
    /// the repository issues should be looked up in
    pub fn issue_repo(&self) -> Option<&RepoSlug> {
        self.parent.as_ref().or(self.current.as_ref())
    }
}

/// parse https and ssh github remote urls
pub fn parse_github_url(url: &str) -> Option<RepoSlug> {
    lazy_static! {
        static ref HTTPS_URL: Regex =
            Regex::new(r"https://github\.com/([^/]+)/([^/.]+)").unwrap();
        static ref SSH_URL: Regex = Regex::new(r"git@github\.com:([^/]+)/([^/.]+)").unwrap();
    }

    [&*HTTPS_URL, &*SSH_URL].iter().find_map(|re| {
        re.captures(url).map(|caps| RepoSlug {
            owner: caps[1].to_string(),
            repo: caps[2].to_string(),
        })
    })
}

pub fn fork_info(repo_path: &Path) -> ForkInfo {
    let Ok(repo) = git2::Repository::discover(repo_path) else {
        return ForkInfo::default();
    };
    let remote_slug = |name: &str| {
        repo.find_remote(name)
            .ok()
            .and_then(|remote| remote.url().and_then(parse_github_url))
    };

    let current = remote_slug("origin");
    if current.is_none() {
        return ForkInfo::default();
    }
    let parent = remote_slug("upstream");

    ForkInfo {
        is_fork: parent.is_some(),
        current,
        parent,
    }
}

pub struct GitHubClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl GitHubClient {
    pub fn new(token: Option<String>) -> Self {
        Self::with_base_url(GITHUB_API_URL, token)
    }

    pub fn with_base_url(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    pub fn issue_url(&self, owner: &str, repo: &str, number: u64) -> String {
        format!("{}/repos/{owner}/{repo}/issues/{number}", self.base_url)
    }

    /// fetch one issue; a missing issue or a pull request yields `None`
    pub async fn get_issue(&self, owner: &str, repo: &str, number: u64) -> Result<Option<GitHubIssue>> {
        let url = self.issue_url(owner, repo, number);
        debug!(%url, "fetching issue");

        let mut request = self
            .http
            .get(&url)
            .header("Accept", "application/vnd.github.v3+json")
            .header("User-Agent", "commit-lens");
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("Bearer {token}"));
        }

        let response = request.send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let issue: ApiIssue = response.json().await?;
                Ok(issue.into_issue())
            }
            status => Err(LensError::GitHub {
                status: status.as_u16(),
                url,
            }),
        }
    }
}
