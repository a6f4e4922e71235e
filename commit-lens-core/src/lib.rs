// commit-lens-core/src/lib.rs

pub mod agent;
pub mod clone;
pub mod config;
pub mod error;
pub mod git;
pub mod github;
pub mod metrics;
pub mod readiness;
pub mod report;
pub mod types;
pub mod utils;

// re-export for the cli crate
pub use clap::Parser;
pub use console::style;

pub use crate::agent::{AnalysisRun, GroqClient, LlmAgent, Orchestrator};
pub use crate::config::{Config, Credentials};
pub use crate::error::{LensError, Result as LensResult};
pub use crate::git::{CommitInfo, FileChange, FileStatus};
pub use crate::types::AnalysisResult;

use anyhow::{Context, Result, bail};
use clap::{Args, Subcommand};
use config::{EnvFile, Verbosity};
use dialoguer::Confirm;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const ENV_TEMPLATE: &str = "GROQ_API_KEY=your_api_key_here\n";

#[derive(Parser, Debug, Clone)]
#[command(name = "commit-lens", version, about = "ai-assisted commit review and pr readiness checks")]
pub struct CoreCliArgs {
    #[command(subcommand)]
    pub command: Command,

    /// show plan steps, low-severity issues and debug logs
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// analyse a commit, unstaged changes, the whole codebase or a remote repository
    Analyze(AnalyzeArgs),
    /// write a default config file and a .env template
    Init {
        /// directory to write into (defaults to current directory)
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// overwrite existing files without asking
        #[arg(long)]
        force: bool,
    },
    /// print the effective configuration as json
    Config {
        /// explicit config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// directory to search for config files
        #[arg(short, long)]
        path: Option<PathBuf>,
    },
}

#[derive(Args, Debug, Clone, Default)]
#[command(group(
    clap::ArgGroup::new("source").args(["commit", "unstaged", "codebase", "repo_url"])
))]
pub struct AnalyzeArgs {
    /// commit hash or any revision to analyse (defaults to the latest commit)
    #[arg(short, long)]
    pub commit: Option<String>,

    /// analyse unstaged and staged working-tree changes
    #[arg(short, long)]
    pub unstaged: bool,

    /// analyse every tracked file as one change set
    #[arg(long)]
    pub codebase: bool,

    /// shallow-clone a remote repository and analyse its latest commit
    #[arg(long)]
    pub repo_url: Option<String>,

    /// branch to clone with --repo-url
    #[arg(short, long, requires = "repo_url")]
    pub branch: Option<String>,

    /// keep the cloned repository instead of deleting it
    #[arg(long, requires = "repo_url")]
    pub keep_clone: bool,

    /// github issue number to check the change against
    #[arg(short, long)]
    pub issue: Option<u64>,

    /// explicit config file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// write a markdown report to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// model to use (overrides GROQ_MODEL)
    #[arg(short, long)]
    pub model: Option<String>,

    /// path to git repository (defaults to current directory)
    #[arg(short, long)]
    pub path: Option<PathBuf>,

    /// maximum file size in kb for --codebase (larger files are skipped)
    #[arg(long, default_value_t = git::DEFAULT_MAX_FILE_SIZE / 1024)]
    pub max_size: u64,
}

/// how a finished run should end the process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Success,
    BelowThreshold,
}

impl RunOutcome {
    pub fn exit_code(self) -> i32 {
        match self {
            RunOutcome::Success => 0,
            RunOutcome::BelowThreshold => 1,
        }
    }
}

pub async fn run(args: CoreCliArgs) -> Result<RunOutcome> {
    match args.command {
        Command::Analyze(analyze) => execute_analyze_flow(analyze, args.verbose).await,
        Command::Init { path, force } => {
            execute_init_flow(&working_dir(path.as_deref())?, force)?;
            Ok(RunOutcome::Success)
        }
        Command::Config { config, path } => {
            let dir = working_dir(path.as_deref())?;
            let (config, source) = load_config(config.as_deref(), &dir)?;
            match source {
                Some(source) => println!("{}", style(format!("# {}", source.display())).dim()),
                None => println!("{}", style("# defaults (no config file found)").dim()),
            }
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(RunOutcome::Success)
        }
    }
}

fn working_dir(path: Option<&Path>) -> Result<PathBuf> {
    match path {
        Some(path) => Ok(path.to_path_buf()),
        None => std::env::current_dir().context("failed to read current directory"),
    }
}

fn load_config(explicit: Option<&Path>, dir: &Path) -> Result<(Config, Option<PathBuf>)> {
    if let Some(path) = explicit {
        if !path.is_file() {
            bail!("config file {} does not exist", path.display());
        }
    }
    let (config, source) = Config::load(explicit, dir)?;
    config.validate()?;
    Ok((config, source))
}

/// env file next to the repository first, then in the current directory
fn load_credentials(repo_path: &Path) -> Result<Credentials> {
    let mut candidates = vec![repo_path.join(".env")];
    if let Ok(cwd) = std::env::current_dir() {
        candidates.push(cwd.join(".env"));
    }

    let env_file = match config::resolve_env_file(&candidates) {
        Some(path) => match EnvFile::load(&path) {
            Ok(file) => {
                debug!(path = %path.display(), "loaded env file");
                Some(file)
            }
            Err(e) => {
                warn!(error = %e, "ignoring unreadable env file");
                None
            }
        },
        None => None,
    };

    Credentials::resolve(env_file.as_ref(), |key| std::env::var(key).ok()).with_context(|| {
        format!(
            "set {} in the environment or a .env file (run `commit-lens init` for a template)",
            config::GROQ_API_KEY
        )
    })
}

/// collect the change set the arguments ask for
fn collect_commit(args: &AnalyzeArgs, repo_path: &Path) -> Result<(CommitInfo, Option<PathBuf>)> {
    if let Some(url) = &args.repo_url {
        let pb = utils::spinner(format!("cloning {url}..."), false);
        let remote = clone::analyze_remote(url, args.branch.as_deref(), args.keep_clone);
        pb.finish_and_clear();
        let remote = remote?;
        return Ok((remote.commit, remote.kept_path));
    }

    if !git::repository_info(repo_path).is_repo {
        bail!("{} is not a git repository", repo_path.display());
    }
    if let Ok(Some(branch)) = git::current_branch(repo_path) {
        debug!(%branch, "analysing checkout");
    }

    let commit = if args.unstaged {
        git::unstaged_changes(repo_path)?
    } else if args.codebase {
        git::codebase_snapshot(repo_path, args.max_size * 1024)?
    } else if let Some(rev) = &args.commit {
        git::commit_by_hash(repo_path, rev)?
    } else {
        git::latest_commit(repo_path)?
    };
    Ok((commit, None))
}

/// fetch the linked issue and attach it; lookup failures only warn
async fn attach_issue(
    commit: &mut CommitInfo,
    number: u64,
    args: &AnalyzeArgs,
    repo_path: &Path,
    token: Option<String>,
) {
    let slug = match &args.repo_url {
        Some(url) => github::parse_github_url(url),
        None => github::fork_info(repo_path).issue_repo().cloned(),
    };
    let Some(slug) = slug else {
        println!(
            "{}",
            style("⚠️  no github remote found, skipping issue lookup").yellow()
        );
        return;
    };

    let client = github::GitHubClient::new(token);
    match client.get_issue(&slug.owner, &slug.repo, number).await {
        Ok(Some(issue)) => {
            println!(
                "{}",
                style(format!("linked issue #{}: {}", issue.number, issue.title)).cyan()
            );
            commit.attach_issue(&issue);
        }
        Ok(None) => println!(
            "{}",
            style(format!(
                "⚠️  issue #{number} not found in {}/{}",
                slug.owner, slug.repo
            ))
            .yellow()
        ),
        Err(e) => {
            warn!(error = %e, "issue lookup failed");
            println!(
                "{}",
                style(format!("⚠️  could not fetch issue #{number}: {e}")).yellow()
            );
        }
    }
}

pub async fn execute_analyze_flow(args: AnalyzeArgs, verbose: bool) -> Result<RunOutcome> {
    let repo_path = working_dir(args.path.as_deref())?;
    let (mut config, source) = load_config(args.config.as_deref(), &repo_path)?;
    if verbose {
        config.agent.verbosity = Verbosity::Verbose;
    }
    if let Some(source) = &source {
        debug!(path = %source.display(), "using config file");
    }

    let credentials = load_credentials(&repo_path)?;

    if config.agent.verbosity != Verbosity::Quiet {
        println!("{}", style("\ncommit-lens 🔍").cyan().bold());
        println!("{}\n", style("ai-assisted commit review").dim());
    }

    let (mut commit, kept_clone) = collect_commit(&args, &repo_path)?;
    if commit.files.is_empty() {
        println!("{}", style("⚠️  no file changes found to analyse").yellow());
    }

    if let Some(number) = args.issue {
        attach_issue(
            &mut commit,
            number,
            &args,
            &repo_path,
            credentials.github_token.clone(),
        )
        .await;
    }

    let model = agent::resolve_model(args.model.as_deref(), credentials.groq_model.as_deref());
    debug!(%model, "selected model");

    let agent = LlmAgent::new(GroqClient::new(credentials.groq_api_key), model);
    let orchestrator = Orchestrator::new(agent, config.clone());
    let run = orchestrator
        .analyze_commit(&commit)
        .await
        .context("analysis failed")?;

    report::print_report(&commit, &run.result, &config);

    if let Some(output) = &args.output {
        report::save_markdown(output, &commit, &run.result)
            .with_context(|| format!("failed to write report to {}", output.display()))?;
        println!(
            "{}",
            style(format!("report saved to {}", output.display())).green()
        );
    }
    if let Some(path) = kept_clone {
        println!(
            "{}",
            style(format!("cloned repository kept at {}", path.display())).dim()
        );
    }

    if report::passes(&run.result, config.analysis.min_score) {
        Ok(RunOutcome::Success)
    } else {
        Ok(RunOutcome::BelowThreshold)
    }
}

/// write `commit-lens.yaml` and a `.env` template into `dir`
pub fn execute_init_flow(dir: &Path, force: bool) -> Result<()> {
    let config_path = dir.join(config::CONFIG_FILE_NAMES[0]);
    let env_path = dir.join(".env");

    if config_path.exists() && !force {
        let overwrite = Confirm::new()
            .with_prompt(format!("{} already exists, overwrite?", config_path.display()))
            .default(false)
            .interact()?;
        if !overwrite {
            println!("{}", style("keeping existing config").yellow());
            return Ok(());
        }
    }

    fs::write(&config_path, Config::default_yaml())
        .with_context(|| format!("failed to write {}", config_path.display()))?;
    println!(
        "{}",
        style(format!("✅ wrote {}", config_path.display())).green()
    );

    if env_path.exists() {
        println!(
            "{}",
            style(format!("{} already exists, leaving it untouched", env_path.display())).dim()
        );
    } else {
        fs::write(&env_path, ENV_TEMPLATE)
            .with_context(|| format!("failed to write {}", env_path.display()))?;
        println!(
            "{}",
            style(format!("✅ wrote {} (add your GROQ_API_KEY)", env_path.display())).green()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_analyze_arguments() {
        let args = CoreCliArgs::parse_from([
            "commit-lens",
            "analyze",
            "--commit",
            "abc123",
            "--issue",
            "42",
            "-o",
            "report.md",
        ]);
        let Command::Analyze(analyze) = args.command else {
            panic!("expected analyze");
        };
        assert_eq!(analyze.commit.as_deref(), Some("abc123"));
        assert_eq!(analyze.issue, Some(42));
        assert_eq!(analyze.output, Some(PathBuf::from("report.md")));
        assert_eq!(analyze.max_size, 100);
    }

    #[test]
    fn sources_are_mutually_exclusive() {
        let err = CoreCliArgs::try_parse_from(["commit-lens", "analyze", "--unstaged", "--codebase"]);
        assert!(err.is_err());
        let err = CoreCliArgs::try_parse_from(["commit-lens", "analyze", "--branch", "main"]);
        assert!(err.is_err());
    }

    #[test]
    fn init_writes_config_and_env_template() {
        let dir = tempfile::tempdir().unwrap();
        execute_init_flow(dir.path(), true).unwrap();

        let config = Config::from_file(&dir.path().join("commit-lens.yaml")).unwrap();
        assert_eq!(config, Config::default());
        let env = fs::read_to_string(dir.path().join(".env")).unwrap();
        assert_eq!(env, ENV_TEMPLATE);
    }

    #[test]
    fn init_keeps_existing_env_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".env"), "GROQ_API_KEY=real\n").unwrap();
        execute_init_flow(dir.path(), true).unwrap();
        let env = fs::read_to_string(dir.path().join(".env")).unwrap();
        assert_eq!(env, "GROQ_API_KEY=real\n");
    }

    #[test]
    fn invalid_config_values_abort_the_flow() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("commit-lens.yaml");
        fs::write(&path, "analysis:\n  minScore: 95\nagent:\n  verbosity: loud\n").unwrap();

        let err = load_config(None, dir.path()).unwrap_err();
        assert!(err.to_string().contains("invalid configuration"));
        assert!(load_config(Some(&path), dir.path()).is_err());

        fs::write(&path, "analysis:\n  minScore: 95\n").unwrap();
        let (config, source) = load_config(None, dir.path()).unwrap();
        assert_eq!(config.analysis.min_score, 95);
        assert_eq!(source, Some(path));
    }

    #[test]
    fn outcome_exit_codes() {
        assert_eq!(RunOutcome::Success.exit_code(), 0);
        assert_eq!(RunOutcome::BelowThreshold.exit_code(), 1);
    }
}
