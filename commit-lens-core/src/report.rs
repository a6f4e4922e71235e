// report rendering - terminal output and markdown export

use crate::config::{Config, Verbosity};
use crate::error::Result;
use crate::git::CommitInfo;
use crate::types::{AnalysisResult, Issue, Priority, ReadinessStatus, Severity};
use crate::utils::short_hash;
use chrono::{DateTime, SecondsFormat, Utc};
use console::style;
use std::fmt::Display;
use std::fs;
use std::path::Path;

const RULE_WIDTH: usize = 80;

/// a result is good enough for a pull request when it meets the minimum score
/// and the model did not call it not-ready
pub fn passes(result: &AnalysisResult, min_score: i64) -> bool {
    i64::from(result.score) >= min_score && result.status != ReadinessStatus::NotReady
}

fn line(out: &mut String, text: impl Display) {
    out.push_str(&text.to_string());
    out.push('\n');
}

pub fn print_report(commit: &CommitInfo, result: &AnalysisResult, config: &Config) {
    print!("{}", render_terminal(commit, result, config));
}

pub fn render_terminal(commit: &CommitInfo, result: &AnalysisResult, config: &Config) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut out = String::new();

    line(&mut out, format!("\n{rule}"));
    line(&mut out, style("COMMIT ANALYSIS REPORT").cyan().bold());
    line(&mut out, &rule);

    line(&mut out, style("\ncommit information:").bold());
    if commit.is_pseudo() {
        line(&mut out, format!("   source:  {}", style(&commit.hash).dim()));
    } else {
        line(&mut out, format!("   hash:    {}", style(short_hash(&commit.hash)).dim()));
    }
    line(&mut out, format!("   message: {}", commit.message));
    line(&mut out, format!("   author:  {}", style(&commit.author).dim()));
    line(&mut out, format!("   files:   {} changed", style(commit.files.len()).dim()));

    line(&mut out, style("\noverall score:").bold());
    let score = format!("{}/100", result.score);
    let score = match result.score {
        80.. => style(score).green(),
        60..=79 => style(score).yellow(),
        _ => style(score).red(),
    };
    line(&mut out, format!("   {score}"));

    line(&mut out, style("\nstatus:").bold());
    let status = result.status.to_string().to_uppercase();
    let status = match result.status {
        ReadinessStatus::Ready => style(status).green(),
        ReadinessStatus::NeedsWork => style(status).yellow(),
        ReadinessStatus::NotReady => style(status).red(),
    };
    line(&mut out, format!("   {status}"));

    line(&mut out, style("\nsummary:").bold());
    line(&mut out, style(format!("   {}", result.summary)).dim());

    line(&mut out, style("\nissues found:").bold());
    if result.issues.is_empty() {
        line(&mut out, style("   no issues found!").green());
    } else {
        let verbose = config.agent.verbosity == Verbosity::Verbose;
        for severity in [
            Severity::Critical,
            Severity::High,
            Severity::Medium,
            Severity::Low,
        ] {
            if severity == Severity::Low && !verbose {
                continue;
            }
            let group: Vec<&Issue> = result
                .issues
                .iter()
                .filter(|i| i.severity == severity)
                .collect();
            if group.is_empty() {
                continue;
            }
            let heading = format!("\n   {} ({}):", severity.as_str().to_uppercase(), group.len());
            let heading = match severity {
                Severity::Critical => style(heading).red().bold(),
                Severity::High => style(heading).red(),
                Severity::Medium => style(heading).yellow(),
                Severity::Low => style(heading).dim(),
            };
            line(&mut out, heading);
            for issue in group {
                push_issue(&mut out, issue);
            }
        }
    }

    if config.agent.suggest_improvements && !result.suggestions.is_empty() {
        line(&mut out, style("\nsuggestions:").bold());
        for (i, suggestion) in result.suggestions.iter().enumerate() {
            let priority = suggestion.priority.as_str().to_uppercase();
            let priority = match suggestion.priority {
                Priority::High => style(priority).red(),
                Priority::Medium => style(priority).yellow(),
                Priority::Low => style(priority).dim(),
            };
            line(
                &mut out,
                format!(
                    "   {}. [{priority}] {}",
                    i + 1,
                    style(&suggestion.category).cyan()
                ),
            );
            line(&mut out, format!("      {}", style(&suggestion.message).dim()));
        }
    }

    let min_score = config.analysis.min_score;
    line(&mut out, style("\npr readiness:").bold());
    if passes(result, min_score) {
        line(&mut out, style("   ready for pull request!").green());
        line(
            &mut out,
            style(format!(
                "   score ({}) meets minimum requirement ({min_score})",
                result.score
            ))
            .dim(),
        );
    } else {
        line(&mut out, style("   needs improvement before pr").yellow());
        let reason = if i64::from(result.score) < min_score {
            format!(
                "   score ({}) below minimum requirement ({min_score})",
                result.score
            )
        } else {
            "   status is not-ready".to_string()
        };
        line(&mut out, style(reason).dim());
    }

    if let Some(relevance) = &result.issue_relevance {
        let number = commit
            .issue_number
            .map(|n| format!(" #{n}"))
            .unwrap_or_default();
        line(&mut out, style(format!("\nissue{number} relevance:")).bold());
        let verdict = if relevance.is_relevant {
            style(format!("   addresses the issue ({}/100)", relevance.score)).green()
        } else {
            style(format!(
                "   does not address the issue ({}/100)",
                relevance.score
            ))
            .yellow()
        };
        line(&mut out, verdict);
        if !relevance.reasoning.is_empty() {
            line(&mut out, style(format!("   {}", relevance.reasoning)).dim());
        }
        for aspect in &relevance.addressed_aspects {
            line(&mut out, format!("   {} {aspect}", style("+").green()));
        }
        for aspect in &relevance.missing_aspects {
            line(&mut out, format!("   {} {aspect}", style("-").red()));
        }
    }

    if config.agent.generate_pr_description {
        if let Some(description) = &result.pr_description {
            let divider = style(format!("   {}", "─".repeat(RULE_WIDTH - 4))).dim();
            line(&mut out, style("\ngenerated pr description:").bold());
            line(&mut out, &divider);
            for text in description.lines() {
                line(&mut out, format!("   {text}"));
            }
            line(&mut out, &divider);
        }
    }

    line(&mut out, format!("\n{rule}\n"));
    out
}

fn push_issue(out: &mut String, issue: &Issue) {
    let location = match (&issue.file, issue.line) {
        (Some(file), Some(line)) => format!("{file}:{line}"),
        (Some(file), None) => file.clone(),
        (None, _) => "general".to_string(),
    };
    line(out, format!("      • {}: {}", style(&issue.category).bold(), issue.message));
    line(
        out,
        format!("        {} {}", style("location:").dim(), style(location).dim()),
    );
    if let Some(suggestion) = &issue.suggestion {
        line(
            out,
            format!(
                "        {} {}",
                style("suggestion:").dim(),
                style(suggestion).cyan()
            ),
        );
    }
}

pub fn markdown_report(
    commit: &CommitInfo,
    result: &AnalysisResult,
    generated_at: DateTime<Utc>,
) -> String {
    let mut md = String::from("# Commit Analysis Report\n\n");
    line(
        &mut md,
        format!(
            "**Generated:** {}\n",
            generated_at.to_rfc3339_opts(SecondsFormat::Secs, true)
        ),
    );

    md.push_str("## Commit Information\n\n");
    if commit.is_pseudo() {
        line(&mut md, format!("- **Source:** {}", commit.hash));
    } else {
        line(&mut md, format!("- **Hash:** `{}`", commit.hash));
    }
    line(&mut md, format!("- **Message:** {}", commit.message));
    line(&mut md, format!("- **Author:** {}", commit.author));
    line(&mut md, format!("- **Files Changed:** {}\n", commit.files.len()));

    md.push_str("## Analysis Results\n\n");
    line(&mut md, format!("- **Score:** {}/100", result.score));
    line(&mut md, format!("- **Status:** {}\n", result.status));
    line(&mut md, format!("### Summary\n\n{}\n", result.summary));

    if !result.issues.is_empty() {
        md.push_str("### Issues\n\n");
        for issue in &result.issues {
            line(
                &mut md,
                format!(
                    "- **[{}]** {}: {}",
                    issue.severity.as_str().to_uppercase(),
                    issue.category,
                    issue.message
                ),
            );
            match (&issue.file, issue.line) {
                (Some(file), Some(at)) => line(&mut md, format!("  - File: `{file}:{at}`")),
                (Some(file), None) => line(&mut md, format!("  - File: `{file}`")),
                (None, _) => {}
            }
            if let Some(suggestion) = &issue.suggestion {
                line(&mut md, format!("  - Suggestion: {suggestion}"));
            }
        }
        md.push('\n');
    }

    if !result.suggestions.is_empty() {
        md.push_str("### Suggestions\n\n");
        for s in &result.suggestions {
            line(
                &mut md,
                format!(
                    "- **[{}]** {}: {}",
                    s.priority.as_str().to_uppercase(),
                    s.category,
                    s.message
                ),
            );
        }
        md.push('\n');
    }

    if let Some(relevance) = &result.issue_relevance {
        md.push_str("## Issue Relevance\n\n");
        if let Some(number) = commit.issue_number {
            let title = commit.issue_title.as_deref().unwrap_or_default();
            line(&mut md, format!("- **Issue:** #{number} {title}"));
        }
        line(&mut md, format!("- **Score:** {}/100", relevance.score));
        let relevant = if relevance.is_relevant { "yes" } else { "no" };
        line(&mut md, format!("- **Relevant:** {relevant}"));
        if !relevance.reasoning.is_empty() {
            line(&mut md, format!("\n{}", relevance.reasoning));
        }
        for aspect in &relevance.addressed_aspects {
            line(&mut md, format!("- [x] {aspect}"));
        }
        for aspect in &relevance.missing_aspects {
            line(&mut md, format!("- [ ] {aspect}"));
        }
        md.push('\n');
    }

    if let Some(description) = &result.pr_description {
        line(&mut md, format!("## PR Description\n\n{description}"));
    }

    md
}

/// write the markdown report to `path`, stamped with the current time
pub fn save_markdown(path: &Path, commit: &CommitInfo, result: &AnalysisResult) -> Result<()> {
    fs::write(path, markdown_report(commit, result, Utc::now()))?;
    Ok(())
}
