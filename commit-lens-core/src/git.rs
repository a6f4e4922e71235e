use crate::error::{LensError, Result};
use crate::github::GitHubIssue;
use chrono::{DateTime, FixedOffset, Offset, Utc};
use encoding_rs::UTF_8;
use git2::{
    BranchType, Commit, Delta, Diff, DiffFindOptions, DiffFormat, DiffOptions, ErrorCode,
    Repository, Status, StatusOptions, Tree,
};
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::debug;

pub const UNSTAGED_HASH: &str = "unstaged";
pub const CODEBASE_HASH: &str = "codebase";

/// default size limit for files read into a codebase snapshot
pub const DEFAULT_MAX_FILE_SIZE: u64 = 100 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Added,
    Modified,
    Deleted,
    Renamed,
}

impl FileStatus {
    fn from_delta(delta: Delta) -> Self {
        match delta {
            Delta::Added | Delta::Untracked | Delta::Copied => FileStatus::Added,
            Delta::Deleted => FileStatus::Deleted,
            Delta::Renamed => FileStatus::Renamed,
            _ => FileStatus::Modified,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FileStatus::Added => "added",
            FileStatus::Modified => "modified",
            FileStatus::Deleted => "deleted",
            FileStatus::Renamed => "renamed",
        }
    }
}

/// one file's change within a commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileChange {
    pub path: String,
    pub status: FileStatus,
    pub additions: usize,
    pub deletions: usize,
    pub diff: String,
}

/// a unit of review: a real commit or an unstaged / codebase pseudo-commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitInfo {
    pub hash: String,
    pub message: String,
    pub author: String,
    pub date: String,
    pub files: Vec<FileChange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_number: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_body: Option<String>,
}

impl CommitInfo {
    fn new(hash: String, message: String, author: String, date: String, files: Vec<FileChange>) -> Self {
        Self {
            hash,
            message,
            author,
            date,
            files,
            issue_number: None,
            issue_title: None,
            issue_body: None,
        }
    }

    pub fn attach_issue(&mut self, issue: &GitHubIssue) {
        self.issue_number = Some(issue.number);
        self.issue_title = Some(issue.title.clone());
        self.issue_body = Some(issue.body.clone());
    }

    pub fn has_issue(&self) -> bool {
        self.issue_number.is_some()
    }

    pub fn is_pseudo(&self) -> bool {
        self.hash == UNSTAGED_HASH || self.hash == CODEBASE_HASH
    }
}

/// basic facts about the repository at a path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoInfo {
    pub is_repo: bool,
    pub has_remote: bool,
    pub default_branch: String,
}

pub fn open_repository(repo_path: &Path) -> Result<Repository> {
    Ok(Repository::discover(repo_path)?)
}

/// the newest commit on HEAD
pub fn latest_commit(repo_path: &Path) -> Result<CommitInfo> {
    let repo = open_repository(repo_path)?;
    let head = match repo.head() {
        Ok(head) => head,
        Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => {
            return Err(LensError::NoCommitsFound);
        }
        Err(e) => return Err(e.into()),
    };
    let commit = head.peel_to_commit()?;
    commit_info(&repo, &commit)
}

/// a commit by hash or any other revspec git understands
pub fn commit_by_hash(repo_path: &Path, rev: &str) -> Result<CommitInfo> {
    let repo = open_repository(repo_path)?;
    let commit = repo
        .revparse_single(rev)
        .and_then(|object| object.peel_to_commit())
        .map_err(|e| {
            debug!(rev, error = %e, "failed to resolve commit");
            LensError::CommitNotFound(rev.to_string())
        })?;
    commit_info(&repo, &commit)
}

/// uncommitted working tree changes as a pseudo-commit
pub fn unstaged_changes(repo_path: &Path) -> Result<CommitInfo> {
    let repo = open_repository(repo_path)?;
    let head_tree = repo.head().ok().and_then(|head| head.peel_to_tree().ok());

    let mut status_opts = StatusOptions::new();
    status_opts.include_untracked(false).include_ignored(false);
    let statuses = repo.statuses(Some(&mut status_opts))?;

    let mut files = Vec::new();
    for entry in statuses.iter() {
        let Some(path) = entry.path() else {
            continue;
        };
        let status = entry.status();

        if status.intersects(Status::WT_DELETED | Status::INDEX_DELETED) {
            files.push(FileChange {
                path: path.to_string(),
                status: FileStatus::Deleted,
                additions: 0,
                deletions: 0,
                diff: String::new(),
            });
        } else {
            let file_status = if status.contains(Status::INDEX_NEW) {
                FileStatus::Added
            } else if status.intersects(
                Status::WT_MODIFIED
                    | Status::INDEX_MODIFIED
                    | Status::WT_TYPECHANGE
                    | Status::INDEX_TYPECHANGE,
            ) {
                FileStatus::Modified
            } else {
                continue;
            };
            // HEAD against the working tree, so staged and unstaged edits both count
            let mut opts = pathspec_options(path);
            let diff = repo.diff_tree_to_workdir_with_index(head_tree.as_ref(), Some(&mut opts))?;
            files.push(single_file_change(&diff, path, file_status)?);
        }
    }

    debug!(files = files.len(), "collected unstaged changes");
    Ok(CommitInfo::new(
        UNSTAGED_HASH.to_string(),
        "Unstaged changes".to_string(),
        current_user(&repo),
        Utc::now().to_rfc3339(),
        files,
    ))
}

/// every tracked file in the working tree as a pseudo-commit of additions
pub fn codebase_snapshot(repo_path: &Path, max_file_size: u64) -> Result<CommitInfo> {
    let repo = open_repository(repo_path)?;
    let workdir = repo
        .workdir()
        .ok_or_else(|| git2::Error::from_str("repository has no working tree"))?
        .to_path_buf();

    let index = repo.index()?;
    let mut files = Vec::new();

    for entry in index.iter() {
        let rel_path = String::from_utf8_lossy(&entry.path).to_string();
        let full_path = workdir.join(&rel_path);

        let Ok(metadata) = fs::metadata(&full_path) else {
            continue;
        };
        if metadata.len() > max_file_size {
            debug!(path = %rel_path, size = metadata.len(), "skipping large file");
            continue;
        }
        let Ok(bytes) = fs::read(&full_path) else {
            continue;
        };
        if looks_binary(&bytes) {
            debug!(path = %rel_path, "skipping binary file");
            continue;
        }

        let content = decode_line_content(&bytes);
        let mut diff = String::with_capacity(content.len() + content.len() / 20);
        for line in content.lines() {
            diff.push('+');
            diff.push_str(line);
            diff.push('\n');
        }

        files.push(FileChange {
            path: rel_path,
            status: FileStatus::Added,
            additions: content.lines().count(),
            deletions: 0,
            diff,
        });
    }

    Ok(CommitInfo::new(
        CODEBASE_HASH.to_string(),
        "Full codebase analysis".to_string(),
        current_user(&repo),
        Utc::now().to_rfc3339(),
        files,
    ))
}

/// per-file changes between two revisions
pub fn diff_between(repo_path: &Path, from: &str, to: &str) -> Result<Vec<FileChange>> {
    let repo = open_repository(repo_path)?;
    let from_tree = resolve_tree(&repo, from)?;
    let to_tree = resolve_tree(&repo, to)?;

    let mut opts = diff_options();
    let mut diff = repo.diff_tree_to_tree(Some(&from_tree), Some(&to_tree), Some(&mut opts))?;
    detect_renames(&mut diff)?;
    collect_file_changes(&diff)
}

pub fn repository_info(repo_path: &Path) -> RepoInfo {
    let Ok(repo) = Repository::discover(repo_path) else {
        return RepoInfo {
            is_repo: false,
            has_remote: false,
            default_branch: String::new(),
        };
    };

    let has_remote = repo.remotes().map(|r| !r.is_empty()).unwrap_or(false);
    let default_branch = ["main", "master"]
        .into_iter()
        .find(|name| repo.find_branch(name, BranchType::Local).is_ok())
        .unwrap_or("main")
        .to_string();

    RepoInfo {
        is_repo: true,
        has_remote,
        default_branch,
    }
}

pub fn current_branch(repo_path: &Path) -> Result<Option<String>> {
    let repo = open_repository(repo_path)?;
    let head = match repo.head() {
        Ok(head) => head,
        Err(e) if e.code() == ErrorCode::UnbornBranch => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(head.shorthand().map(str::to_string))
}

fn resolve_tree<'r>(repo: &'r Repository, rev: &str) -> Result<Tree<'r>> {
    repo.revparse_single(rev)
        .and_then(|object| object.peel_to_tree())
        .map_err(|_| LensError::CommitNotFound(rev.to_string()))
}

fn commit_info(repo: &Repository, commit: &Commit) -> Result<CommitInfo> {
    let tree = commit.tree()?;
    // root commits and shallow clones have no parent tree, diff against the empty tree
    let parent_tree = match commit.parent(0) {
        Ok(parent) => Some(parent.tree()?),
        Err(_) => None,
    };

    let mut opts = diff_options();
    let mut diff = repo.diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), Some(&mut opts))?;
    detect_renames(&mut diff)?;
    let files = collect_file_changes(&diff)?;

    let author = commit.author();
    Ok(CommitInfo::new(
        commit.id().to_string(),
        commit.message().unwrap_or_default().trim_end().to_string(),
        author.name().unwrap_or("unknown").to_string(),
        format_git_time(commit.time()),
        files,
    ))
}

fn diff_options() -> DiffOptions {
    let mut opts = DiffOptions::new();
    opts.show_binary(false);
    opts
}

fn pathspec_options(path: &str) -> DiffOptions {
    let mut opts = diff_options();
    opts.pathspec(path).disable_pathspec_match(true);
    opts
}

fn detect_renames(diff: &mut Diff) -> Result<()> {
    let mut find_opts = DiffFindOptions::new();
    find_opts.renames(true);
    diff.find_similar(Some(&mut find_opts))?;
    Ok(())
}

/// walk a diff in patch form, one entry per delta in delta order
fn collect_file_changes(diff: &Diff) -> Result<Vec<FileChange>> {
    let mut files: Vec<FileChange> = Vec::new();
    let mut by_path: HashMap<String, usize> = HashMap::new();

    for delta in diff.deltas() {
        let Some(path) = delta_path(&delta) else {
            continue;
        };
        by_path.insert(path.clone(), files.len());
        files.push(FileChange {
            path,
            status: FileStatus::from_delta(delta.status()),
            additions: 0,
            deletions: 0,
            diff: String::new(),
        });
    }

    diff.print(DiffFormat::Patch, |delta, _hunk, line| {
        if delta.new_file().is_binary() || delta.old_file().is_binary() {
            return true;
        }
        let Some(entry) = delta_path(&delta)
            .and_then(|path| by_path.get(&path).copied())
            .and_then(|i| files.get_mut(i))
        else {
            return true;
        };

        let content = decode_line_content(line.content());
        match line.origin() {
            origin @ ('+' | '-' | ' ') => {
                if origin == '+' {
                    entry.additions += 1;
                } else if origin == '-' {
                    entry.deletions += 1;
                }
                entry.diff.push(origin);
                entry.diff.push_str(&content);
            }
            // file headers, hunk headers and end-of-file markers carry their own text
            _ => entry.diff.push_str(&content),
        }
        true
    })?;

    Ok(files)
}

/// a diff expected to touch exactly one path; empty diffs yield a zero-count entry
fn single_file_change(diff: &Diff, path: &str, status: FileStatus) -> Result<FileChange> {
    let changes = collect_file_changes(diff)?;
    let mut change = changes
        .into_iter()
        .find(|c| c.path == path)
        .unwrap_or_else(|| FileChange {
            path: path.to_string(),
            status,
            additions: 0,
            deletions: 0,
            diff: String::new(),
        });
    change.status = status;
    Ok(change)
}

fn delta_path(delta: &git2::DiffDelta) -> Option<String> {
    delta
        .new_file()
        .path()
        .or_else(|| delta.old_file().path())
        .map(|p| p.to_string_lossy().to_string())
}

fn current_user(repo: &Repository) -> String {
    repo.signature()
        .ok()
        .and_then(|sig| sig.name().map(str::to_string))
        .unwrap_or_else(|| "current user".to_string())
}

fn format_git_time(time: git2::Time) -> String {
    let offset = FixedOffset::east_opt(time.offset_minutes() * 60).unwrap_or(Utc.fix());
    DateTime::<Utc>::from_timestamp(time.seconds(), 0)
        .map(|dt| dt.with_timezone(&offset).to_rfc3339())
        .unwrap_or_default()
}

fn looks_binary(bytes: &[u8]) -> bool {
    bytes.iter().take(8000).any(|&b| b == 0)
}

/// decode line content with appropriate encoding
fn decode_line_content(content: &[u8]) -> String {
    let (cow, _encoding_used, had_errors) = UTF_8.decode(content);

    if had_errors {
        // fall back to lossy conversion if there were decoding errors
        String::from_utf8_lossy(content).to_string()
    } else {
        cow.to_string()
    }
}
