// analysis pipeline: metrics, plan, think, analyze, title, relevance

use super::api::{ChatClient, LlmAgent};
use super::prompts::{AnalysisContext, PLAN_TASK, RelevanceContext};
use crate::config::{Config, Verbosity};
use crate::error::Result;
use crate::git::CommitInfo;
use crate::metrics::{self, Detection, IgnoreMatcher, Metrics};
use crate::readiness::{self, ProductionReadinessReport};
use crate::types::{AgentPlan, AgentThought, AnalysisResult, IssueRelevance};
use crate::utils::{spinner, truncate_chars, truncate_with_ellipsis};
use console::style;
use std::fmt;
use tracing::{debug, warn};

pub const MAX_THINK_STEPS: usize = 5;
pub const THINK_CONTEXT_CHARS: usize = 8000;
pub const RELEVANCE_CONTEXT_CHARS: usize = 4000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Metrics,
    Plan,
    Think,
    Analyze,
    Title,
    Relevance,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Metrics => "metrics",
            Stage::Plan => "plan",
            Stage::Think => "think",
            Stage::Analyze => "analyze",
            Stage::Title => "title",
            Stage::Relevance => "relevance",
            Stage::Done => "done",
        })
    }
}

/// result of an optional enrichment step
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome<T> {
    Done(T),
    Skipped(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedStep {
    pub stage: Stage,
    pub step: Option<u32>,
    pub reason: String,
}

/// everything one pipeline run produced
#[derive(Debug, Clone)]
pub struct AnalysisRun {
    pub result: AnalysisResult,
    pub metrics: Metrics,
    pub detection: Detection,
    pub readiness: Option<ProductionReadinessReport>,
    pub plan: AgentPlan,
    pub thoughts: Vec<AgentThought>,
    pub skipped: Vec<SkippedStep>,
}

/// local scan feeding the prompts
struct Scan {
    metrics: Metrics,
    detection: Detection,
    readiness: Option<ProductionReadinessReport>,
    code_context: String,
}

// pipeline state, each variant owns what the next transition needs
enum State {
    Metrics,
    Plan(Scan),
    Think {
        scan: Scan,
        plan: AgentPlan,
        thoughts: Vec<AgentThought>,
        step: u32,
    },
    Analyze {
        scan: Scan,
        plan: AgentPlan,
        thoughts: Vec<AgentThought>,
    },
    Title(Box<AnalysisRun>),
    Relevance(Box<AnalysisRun>),
    Done(Box<AnalysisRun>),
}

impl State {
    fn stage(&self) -> Stage {
        match self {
            State::Metrics => Stage::Metrics,
            State::Plan(_) => Stage::Plan,
            State::Think { .. } => Stage::Think,
            State::Analyze { .. } => Stage::Analyze,
            State::Title(_) => Stage::Title,
            State::Relevance(_) => Stage::Relevance,
            State::Done(_) => Stage::Done,
        }
    }
}

pub struct Orchestrator<C> {
    agent: LlmAgent<C>,
    config: Config,
    show_progress: bool,
}

impl<C: ChatClient> Orchestrator<C> {
    pub fn new(agent: LlmAgent<C>, config: Config) -> Self {
        Self {
            agent,
            config,
            show_progress: true,
        }
    }

    /// run without spinners or plan/thought echo
    pub fn without_progress(mut self) -> Self {
        self.show_progress = false;
        self
    }

    fn verbosity(&self) -> Verbosity {
        if self.show_progress {
            self.config.agent.verbosity
        } else {
            Verbosity::Quiet
        }
    }

    fn spinners_hidden(&self) -> bool {
        self.verbosity() == Verbosity::Quiet
    }

    /// run the whole pipeline for one commit. plan and analyze failures abort the run,
    /// think, title and relevance failures are recorded in `skipped`
    pub async fn analyze_commit(&self, commit: &CommitInfo) -> Result<AnalysisRun> {
        let mut skipped = Vec::new();
        let mut state = State::Metrics;

        loop {
            debug!(stage = %state.stage(), "pipeline stage");
            state = match state {
                State::Metrics => State::Plan(self.scan(commit)),
                State::Plan(scan) => {
                    let plan = self.plan(commit, &scan).await?;
                    State::Think {
                        scan,
                        plan,
                        thoughts: Vec::new(),
                        step: 1,
                    }
                }
                State::Think {
                    scan,
                    plan,
                    mut thoughts,
                    step,
                } => {
                    if step as usize > plan.steps.len().min(MAX_THINK_STEPS) {
                        State::Analyze {
                            scan,
                            plan,
                            thoughts,
                        }
                    } else {
                        match self.think(step, &plan, &scan, &thoughts).await {
                            StepOutcome::Done(thought) => thoughts.push(thought),
                            StepOutcome::Skipped(reason) => skipped.push(SkippedStep {
                                stage: Stage::Think,
                                step: Some(step),
                                reason,
                            }),
                        }
                        State::Think {
                            scan,
                            plan,
                            thoughts,
                            step: step + 1,
                        }
                    }
                }
                State::Analyze {
                    scan,
                    plan,
                    thoughts,
                } => {
                    let result = self.analyze(commit, &scan, &plan, &thoughts).await?;
                    State::Title(Box::new(AnalysisRun {
                        result,
                        metrics: scan.metrics,
                        detection: scan.detection,
                        readiness: scan.readiness,
                        plan,
                        thoughts,
                        skipped: Vec::new(),
                    }))
                }
                State::Title(mut run) => {
                    let description = run
                        .result
                        .pr_description
                        .clone()
                        .filter(|_| self.config.agent.generate_pr_description);
                    if let Some(description) = description {
                        match self.title(commit, &run.result.summary).await {
                            StepOutcome::Done(title) => {
                                run.result.pr_description =
                                    Some(format!("# {title}\n\n{description}"));
                            }
                            StepOutcome::Skipped(reason) => skipped.push(SkippedStep {
                                stage: Stage::Title,
                                step: None,
                                reason,
                            }),
                        }
                    }
                    State::Relevance(run)
                }
                State::Relevance(mut run) => {
                    if commit.has_issue() {
                        match self.relevance(commit).await {
                            StepOutcome::Done(relevance) => {
                                run.result.issue_relevance = Some(relevance);
                            }
                            StepOutcome::Skipped(reason) => skipped.push(SkippedStep {
                                stage: Stage::Relevance,
                                step: None,
                                reason,
                            }),
                        }
                    }
                    State::Done(run)
                }
                State::Done(mut run) => {
                    run.result
                        .trim_suggestions(self.config.agent.suggestion_cap());
                    run.skipped = skipped;
                    return Ok(*run);
                }
            };
        }
    }

    fn scan(&self, commit: &CommitInfo) -> Scan {
        let pb = spinner("analyzing commit metrics...", self.spinners_hidden());

        let ignore = IgnoreMatcher::new(&self.config.analysis.ignore);
        let scan = Scan {
            metrics: metrics::analyze_commit(commit),
            detection: metrics::detect_languages_and_frameworks(&commit.files),
            readiness: self.config.analysis.production_readiness.then(|| {
                readiness::analyze_production_readiness_with(
                    commit,
                    self.config.checks.security_issues,
                )
            }),
            code_context: metrics::extract_code_context(&commit.files, &ignore),
        };

        pb.finish_with_message("commit metrics analyzed");
        scan
    }

    /// the fixed summary the plan is built from
    fn context_summary(&self, commit: &CommitInfo, scan: &Scan) -> String {
        let yes_no = |b: bool| if b { "Yes" } else { "No" };
        let checks = &self.config.checks;
        let focus = if self.config.agent.focus_areas.is_empty() {
            "General".to_string()
        } else {
            self.config.agent.focus_areas.join(", ")
        };

        let mut lines = Vec::new();
        if checks.commit_message {
            lines.push(format!("Commit: {}", commit.message));
        }
        lines.extend([
            format!("Files Changed: {}", scan.metrics.files_changed),
            format!("Languages: {} detected", scan.detection.languages.len()),
            format!("Frameworks: {} detected", scan.detection.frameworks.len()),
            format!(
                "Testing Frameworks: {}",
                yes_no(!scan.detection.testing_frameworks.is_empty())
            ),
            format!(
                "Build Tools: {}",
                yes_no(!scan.detection.build_tools.is_empty())
            ),
        ]);
        if checks.complexity {
            lines.push(format!("Complexity: {}", scan.metrics.complexity));
        }
        if checks.tests_included {
            lines.push(format!("Has Tests: {}", scan.metrics.has_tests()));
        }
        if checks.breaking_changes {
            lines.push(format!(
                "Breaking Changes: {}",
                scan.metrics.has_breaking_changes
            ));
        }
        lines.push(format!(
            "Production Ready: {}",
            scan.readiness
                .as_ref()
                .map(|r| format!("{}/100", r.score))
                .unwrap_or_else(|| "Not analyzed".to_string())
        ));
        lines.push(format!("Focus Areas: {focus}"));
        lines.join("\n")
    }

    async fn plan(&self, commit: &CommitInfo, scan: &Scan) -> Result<AgentPlan> {
        let pb = spinner("agent creating analysis plan...", self.spinners_hidden());

        let plan = match self
            .agent
            .create_plan(PLAN_TASK, &self.context_summary(commit, scan))
            .await
        {
            Ok(plan) => plan,
            Err(e) => {
                pb.abandon_with_message(style("failed to create plan").red().to_string());
                return Err(e);
            }
        };
        pb.finish_with_message("analysis plan created");

        let verbosity = self.verbosity();
        if verbosity != Verbosity::Quiet {
            println!("\n{}", style("agent plan:").cyan());
            println!("{}", style(format!("   goal: {}", plan.goal)).dim());
            println!(
                "{}",
                style(format!("   complexity: {}", plan.estimated_complexity)).dim()
            );
            if verbosity == Verbosity::Verbose {
                println!("{}", style("   steps:").dim());
                for (i, step) in plan.steps.iter().enumerate() {
                    println!("{}", style(format!("     {}. {step}", i + 1)).dim());
                }
            }
            println!("\n{}", style("agent thinking process:").cyan());
        }

        Ok(plan)
    }

    async fn think(
        &self,
        step: u32,
        plan: &AgentPlan,
        scan: &Scan,
        thoughts: &[AgentThought],
    ) -> StepOutcome<AgentThought> {
        let title = plan
            .steps
            .get(step as usize - 1)
            .map(String::as_str)
            .unwrap_or_default();
        let pb = spinner(
            format!(
                "step {step}/{}: {}",
                plan.steps.len(),
                truncate_with_ellipsis(title, 60)
            ),
            self.spinners_hidden(),
        );

        let context = truncate_chars(&scan.code_context, THINK_CONTEXT_CHARS);
        match self.agent.think(step, plan, context, thoughts).await {
            Ok(thought) => {
                pb.finish();
                if self.verbosity() != Verbosity::Quiet {
                    println!("{}", style(format!("   {}", thought.thought)).dim());
                }
                StepOutcome::Done(thought)
            }
            Err(e) => {
                pb.abandon();
                warn!(step, error = %e, "think step failed, continuing");
                if self.verbosity() != Verbosity::Quiet {
                    println!(
                        "{}",
                        style(format!("   step {step} failed, continuing...")).yellow()
                    );
                }
                StepOutcome::Skipped(e.to_string())
            }
        }
    }

    async fn analyze(
        &self,
        commit: &CommitInfo,
        scan: &Scan,
        plan: &AgentPlan,
        thoughts: &[AgentThought],
    ) -> Result<AnalysisResult> {
        let pb = spinner("performing deep code analysis...", self.spinners_hidden());

        let ctx = AnalysisContext {
            commit_message: &commit.message,
            code_context: &scan.code_context,
            max_context_chars: self.config.agent.context_profile.max_chars(),
            metrics: &scan.metrics,
            detection: &scan.detection,
            readiness: scan.readiness.as_ref(),
            plan,
            thoughts,
            analysis: &self.config.analysis,
            focus_areas: &self.config.agent.focus_areas,
        };

        let parsed = match self.agent.analyze_code(&ctx).await {
            Ok(json) => AnalysisResult::from_model_json(&json),
            Err(e) => Err(e),
        };
        match parsed {
            Ok(mut result) => {
                pb.finish_with_message("deep analysis completed");
                // relevance is only ever filled in by the relevance step
                result.issue_relevance = None;
                Ok(result)
            }
            Err(e) => {
                pb.abandon_with_message(style("analysis failed").red().to_string());
                Err(e)
            }
        }
    }

    async fn title(&self, commit: &CommitInfo, summary: &str) -> StepOutcome<String> {
        let pb = spinner("generating pr title...", self.spinners_hidden());
        match self.agent.generate_pr_title(&commit.message, summary).await {
            Ok(title) => {
                pb.finish_with_message("pr title generated");
                StepOutcome::Done(title)
            }
            Err(e) => {
                pb.abandon_with_message(style("pr title generation failed").yellow().to_string());
                warn!(error = %e, "pr title generation failed");
                StepOutcome::Skipped(e.to_string())
            }
        }
    }

    async fn relevance(&self, commit: &CommitInfo) -> StepOutcome<IssueRelevance> {
        let Some(issue_number) = commit.issue_number else {
            return StepOutcome::Skipped("no linked issue".to_string());
        };
        let pb = spinner(
            format!("checking relevance to issue #{issue_number}..."),
            self.spinners_hidden(),
        );

        let ignore = IgnoreMatcher::new(&self.config.analysis.ignore);
        let code_context = metrics::extract_code_context(&commit.files, &ignore);
        let files: Vec<String> = commit.files.iter().map(|f| f.path.clone()).collect();
        let ctx = RelevanceContext {
            issue_number,
            issue_title: commit.issue_title.as_deref().unwrap_or_default(),
            issue_body: commit.issue_body.as_deref().unwrap_or_default(),
            commit_message: &commit.message,
            files: &files,
            code_excerpt: truncate_chars(&code_context, RELEVANCE_CONTEXT_CHARS),
        };

        match self.agent.check_issue_relevance(&ctx).await {
            Ok(relevance) => {
                pb.finish_with_message(format!("issue relevance: {}/100", relevance.score));
                StepOutcome::Done(relevance)
            }
            Err(e) => {
                pb.abandon_with_message(style("issue relevance check failed").yellow().to_string());
                warn!(issue = issue_number, error = %e, "issue relevance check failed");
                StepOutcome::Skipped(e.to_string())
            }
        }
    }
}
