// shallow clone of a remote repository into a scoped temporary directory

use crate::error::{CloneFailure, LensError, Result};
use crate::git::{self, CommitInfo};
use git2::FetchOptions;
use git2::build::RepoBuilder;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

/// latest commit of a cloned remote, plus the checkout when it was kept
#[derive(Debug)]
pub struct RemoteCommit {
    pub commit: CommitInfo,
    pub kept_path: Option<PathBuf>,
}

/// clone `url` at depth 1 into the system temp directory and collect its latest commit.
/// the checkout is removed afterwards unless `keep` is set
pub fn analyze_remote(url: &str, branch: Option<&str>, keep: bool) -> Result<RemoteCommit> {
    analyze_remote_in(&std::env::temp_dir(), url, branch, keep)
}

/// like `analyze_remote`, with the checkout created under `parent`
pub fn analyze_remote_in(
    parent: &Path,
    url: &str,
    branch: Option<&str>,
    keep: bool,
) -> Result<RemoteCommit> {
    let dir = tempfile::Builder::new()
        .prefix("commit-lens-")
        .tempdir_in(parent)?;
    debug!(url, path = %dir.path().display(), "cloning into temporary directory");

    // an early return drops the guard, which removes the checkout
    shallow_clone(url, branch, &dir)?;
    let commit = git::latest_commit(dir.path())?;

    let kept_path = keep.then(|| dir.keep());
    if let Some(path) = &kept_path {
        info!(path = %path.display(), "keeping cloned repository");
    }

    Ok(RemoteCommit { commit, kept_path })
}

fn shallow_clone(url: &str, branch: Option<&str>, dir: &TempDir) -> Result<()> {
    let mut fetch = FetchOptions::new();
    fetch.depth(1);

    let mut builder = RepoBuilder::new();
    builder.fetch_options(fetch);
    if let Some(branch) = branch {
        builder.branch(branch);
    }

    builder
        .clone(url, dir.path())
        .map(|_| ())
        .map_err(|e| LensError::Clone {
            url: url.to_string(),
            failure: classify_clone_error(e.message()),
        })
}

/// map a libgit2 clone message to a user-facing failure kind
pub fn classify_clone_error(message: &str) -> CloneFailure {
    let lower = message.to_lowercase();
    let any = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

    if any(&["not found", "404", "does not exist"]) {
        CloneFailure::NotFound
    } else if any(&["authentication", "auth", "401", "403", "credentials"]) {
        CloneFailure::Auth
    } else if any(&[
        "could not resolve",
        "failed to resolve address",
        "name or service not known",
        "enotfound",
        "timed out",
        "failed to connect",
        "network",
    ]) {
        CloneFailure::Network
    } else {
        CloneFailure::Other(message.to_string())
    }
}
