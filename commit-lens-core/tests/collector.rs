use commit_lens_core::error::LensError;
use commit_lens_core::clone;
use commit_lens_core::git::{self, CODEBASE_HASH, FileStatus, UNSTAGED_HASH};
use git2::{Oid, Repository, Signature};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn init_repo() -> (TempDir, Repository) {
    let dir = tempfile::tempdir().unwrap();
    let repo = Repository::init(dir.path()).unwrap();
    (dir, repo)
}

fn write(dir: &Path, path: &str, content: &[u8]) {
    let full = dir.join(path);
    if let Some(parent) = full.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(full, content).unwrap();
}

fn stage(repo: &Repository, path: &str) {
    let mut index = repo.index().unwrap();
    index.add_path(Path::new(path)).unwrap();
    index.write().unwrap();
}

fn commit_index(repo: &Repository, message: &str) -> Oid {
    let mut index = repo.index().unwrap();
    let tree_id = index.write_tree().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();
    let sig = Signature::now("Test Dev", "dev@example.com").unwrap();
    let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
    let parents: Vec<&git2::Commit> = parent.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .unwrap()
}

fn commit_file(repo: &Repository, dir: &Path, path: &str, content: &str, message: &str) -> Oid {
    write(dir, path, content.as_bytes());
    stage(repo, path);
    commit_index(repo, message)
}

#[test]
fn latest_commit_diffs_against_parent() {
    let (dir, repo) = init_repo();
    commit_file(&repo, dir.path(), "src/lib.rs", "a\nb\n", "feat: start");
    commit_file(&repo, dir.path(), "src/lib.rs", "a\nc\nd\n", "fix: tweak lib");

    let commit = git::latest_commit(dir.path()).unwrap();
    assert_eq!(commit.message, "fix: tweak lib");
    assert_eq!(commit.author, "Test Dev");
    assert_eq!(commit.hash.len(), 40);
    assert_eq!(commit.files.len(), 1);

    let file = &commit.files[0];
    assert_eq!(file.path, "src/lib.rs");
    assert_eq!(file.status, FileStatus::Modified);
    assert_eq!(file.additions, 2);
    assert_eq!(file.deletions, 1);
    assert!(file.diff.contains("-b\n"));
    assert!(file.diff.contains("+c\n"));
}

#[test]
fn root_commit_is_all_additions() {
    let (dir, repo) = init_repo();
    let first = commit_file(&repo, dir.path(), "README.md", "hello\nworld\n", "docs: readme");
    commit_file(&repo, dir.path(), "README.md", "hello\n", "docs: trim");

    let commit = git::commit_by_hash(dir.path(), &first.to_string()).unwrap();
    assert_eq!(commit.message, "docs: readme");
    assert_eq!(commit.files[0].status, FileStatus::Added);
    assert_eq!(commit.files[0].additions, 2);
    assert_eq!(commit.files[0].deletions, 0);
}

#[test]
fn short_hashes_and_revspecs_resolve() {
    let (dir, repo) = init_repo();
    let first = commit_file(&repo, dir.path(), "a.txt", "1\n", "one");
    commit_file(&repo, dir.path(), "a.txt", "2\n", "two");

    let by_prefix = git::commit_by_hash(dir.path(), &first.to_string()[..8]).unwrap();
    assert_eq!(by_prefix.message, "one");
    let by_rev = git::commit_by_hash(dir.path(), "HEAD~1").unwrap();
    assert_eq!(by_rev.hash, first.to_string());
}

#[test]
fn unknown_hash_is_commit_not_found() {
    let (dir, repo) = init_repo();
    commit_file(&repo, dir.path(), "a.txt", "1\n", "one");

    let err = git::commit_by_hash(dir.path(), "deadbeefdeadbeef").unwrap_err();
    assert!(matches!(err, LensError::CommitNotFound(ref rev) if rev == "deadbeefdeadbeef"));
}

#[test]
fn empty_repository_has_no_commits() {
    let (dir, _repo) = init_repo();
    let err = git::latest_commit(dir.path()).unwrap_err();
    assert!(matches!(err, LensError::NoCommitsFound));
}

#[test]
fn unstaged_changes_cover_modified_new_and_deleted() {
    let (dir, repo) = init_repo();
    write(dir.path(), "gone.txt", b"bye\n");
    stage(&repo, "gone.txt");
    commit_file(&repo, dir.path(), "keep.txt", "one\n", "init");

    write(dir.path(), "keep.txt", b"one\ntwo\n");
    write(dir.path(), "new.txt", b"x\ny\n");
    stage(&repo, "new.txt");
    fs::remove_file(dir.path().join("gone.txt")).unwrap();

    let commit = git::unstaged_changes(dir.path()).unwrap();
    assert_eq!(commit.hash, UNSTAGED_HASH);
    assert_eq!(commit.message, "Unstaged changes");
    assert!(commit.is_pseudo());

    let mut files: Vec<_> = commit
        .files
        .iter()
        .map(|f| (f.path.as_str(), f.status, f.additions, f.deletions))
        .collect();
    files.sort_by(|a, b| a.0.cmp(b.0));
    assert_eq!(
        files,
        vec![
            ("gone.txt", FileStatus::Deleted, 0, 0),
            ("keep.txt", FileStatus::Modified, 1, 0),
            ("new.txt", FileStatus::Added, 2, 0),
        ]
    );
}

#[test]
fn staged_new_file_includes_later_edits() {
    let (dir, repo) = init_repo();
    commit_file(&repo, dir.path(), "keep.txt", "one\n", "init");

    write(dir.path(), "new.txt", b"a\n");
    stage(&repo, "new.txt");
    write(dir.path(), "new.txt", b"a\nb\nc\n");

    let commit = git::unstaged_changes(dir.path()).unwrap();
    assert_eq!(commit.files.len(), 1);
    let file = &commit.files[0];
    assert_eq!(file.status, FileStatus::Added);
    assert_eq!(file.additions, 3);
    assert!(file.diff.contains("+c\n"));
}

#[cfg(unix)]
#[test]
fn typechange_is_reported_as_modified() {
    let (dir, repo) = init_repo();
    commit_file(&repo, dir.path(), "target.txt", "x\n", "init");
    commit_file(&repo, dir.path(), "link.txt", "y\n", "add link");

    fs::remove_file(dir.path().join("link.txt")).unwrap();
    std::os::unix::fs::symlink("target.txt", dir.path().join("link.txt")).unwrap();

    let commit = git::unstaged_changes(dir.path()).unwrap();
    let paths: Vec<_> = commit
        .files
        .iter()
        .map(|f| (f.path.as_str(), f.status))
        .collect();
    assert_eq!(paths, vec![("link.txt", FileStatus::Modified)]);
}

#[test]
fn clean_tree_has_no_unstaged_changes() {
    let (dir, repo) = init_repo();
    commit_file(&repo, dir.path(), "a.txt", "1\n", "one");
    let commit = git::unstaged_changes(dir.path()).unwrap();
    assert!(commit.files.is_empty());
}

#[test]
fn codebase_snapshot_skips_binary_and_large_files() {
    let (dir, repo) = init_repo();
    write(dir.path(), "src/main.rs", b"fn main() {}\n");
    stage(&repo, "src/main.rs");
    write(dir.path(), "logo.png", b"\x89PNG\0\0\x01");
    stage(&repo, "logo.png");
    write(dir.path(), "big.txt", "line\n".repeat(100).as_bytes());
    stage(&repo, "big.txt");
    commit_index(&repo, "init");

    let commit = git::codebase_snapshot(dir.path(), 64).unwrap();
    assert_eq!(commit.hash, CODEBASE_HASH);
    assert_eq!(commit.message, "Full codebase analysis");
    assert_eq!(commit.files.len(), 1);
    assert_eq!(commit.files[0].path, "src/main.rs");
    assert_eq!(commit.files[0].status, FileStatus::Added);
    assert_eq!(commit.files[0].additions, 1);
    assert_eq!(commit.files[0].diff, "+fn main() {}\n");

    let everything = git::codebase_snapshot(dir.path(), git::DEFAULT_MAX_FILE_SIZE).unwrap();
    assert_eq!(everything.files.len(), 2);
}

#[test]
fn renames_are_detected() {
    let (dir, repo) = init_repo();
    let body = "pub fn parse() {}\npub fn lex() {}\npub fn emit() {}\n";
    commit_file(&repo, dir.path(), "old_name.rs", body, "init");

    fs::rename(dir.path().join("old_name.rs"), dir.path().join("new_name.rs")).unwrap();
    let mut index = repo.index().unwrap();
    index.remove_path(Path::new("old_name.rs")).unwrap();
    index.add_path(Path::new("new_name.rs")).unwrap();
    index.write().unwrap();
    commit_index(&repo, "refactor: rename module");

    let commit = git::latest_commit(dir.path()).unwrap();
    assert_eq!(commit.files.len(), 1);
    assert_eq!(commit.files[0].path, "new_name.rs");
    assert_eq!(commit.files[0].status, FileStatus::Renamed);
    assert_eq!(commit.files[0].additions, 0);
}

#[test]
fn diff_between_two_revisions() {
    let (dir, repo) = init_repo();
    let first = commit_file(&repo, dir.path(), "a.txt", "1\n", "one");
    commit_file(&repo, dir.path(), "b.txt", "2\n", "two");
    let third = commit_file(&repo, dir.path(), "a.txt", "1\n3\n", "three");

    let files = git::diff_between(dir.path(), &first.to_string(), &third.to_string()).unwrap();
    let summary: Vec<_> = files
        .iter()
        .map(|f| (f.path.as_str(), f.status, f.additions))
        .collect();
    assert_eq!(
        summary,
        vec![("a.txt", FileStatus::Modified, 1), ("b.txt", FileStatus::Added, 1)]
    );
}

#[test]
fn repository_info_for_plain_directory() {
    let dir = tempfile::tempdir().unwrap();
    assert!(!git::repository_info(dir.path()).is_repo);

    let (repo_dir, repo) = init_repo();
    commit_file(&repo, repo_dir.path(), "a.txt", "1\n", "one");
    let info = git::repository_info(repo_dir.path());
    assert!(info.is_repo);
    assert!(!info.has_remote);
}

#[test]
fn current_branch_follows_head() {
    let (dir, repo) = init_repo();
    assert_eq!(git::current_branch(dir.path()).unwrap(), None);

    let head = commit_file(&repo, dir.path(), "a.txt", "1\n", "one");
    let commit = repo.find_commit(head).unwrap();
    repo.branch("feature/login", &commit, false).unwrap();
    repo.set_head("refs/heads/feature/login").unwrap();

    assert_eq!(
        git::current_branch(dir.path()).unwrap().as_deref(),
        Some("feature/login")
    );
}

fn file_url(path: &Path) -> String {
    format!("file://{}", path.display())
}

fn entry_count(dir: &Path) -> usize {
    fs::read_dir(dir).unwrap().count()
}

#[test]
fn remote_checkout_is_removed_after_analysis() {
    let (src, repo) = init_repo();
    commit_file(&repo, src.path(), "a.txt", "1\n", "init");
    let scratch = tempfile::tempdir().unwrap();

    let remote =
        clone::analyze_remote_in(scratch.path(), &file_url(src.path()), None, false).unwrap();
    assert_eq!(remote.commit.message, "init");
    assert_eq!(remote.commit.files.len(), 1);
    assert!(remote.kept_path.is_none());
    assert_eq!(entry_count(scratch.path()), 0);
}

#[test]
fn remote_checkout_can_be_kept() {
    let (src, repo) = init_repo();
    commit_file(&repo, src.path(), "a.txt", "1\n", "init");
    let scratch = tempfile::tempdir().unwrap();

    let remote =
        clone::analyze_remote_in(scratch.path(), &file_url(src.path()), None, true).unwrap();
    let kept = remote.kept_path.unwrap();
    assert!(kept.starts_with(scratch.path()));
    assert!(kept.join("a.txt").is_file());
    assert_eq!(entry_count(scratch.path()), 1);
}

#[test]
fn failed_clone_leaves_nothing_behind() {
    let missing = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();

    let err = clone::analyze_remote_in(
        scratch.path(),
        &file_url(&missing.path().join("no-such-repo")),
        None,
        false,
    )
    .unwrap_err();
    assert!(matches!(err, LensError::Clone { .. }));
    assert_eq!(entry_count(scratch.path()), 0);
}
