// prompt construction - pure templates for each agent call

use crate::config::AnalysisConfig;
use crate::metrics::{Detection, Metrics};
use crate::readiness::ProductionReadinessReport;
use crate::types::{AgentPlan, AgentThought};
use crate::utils::truncate_chars;

pub const PLAN_TASK: &str = "Analyze this commit for PR readiness and code quality";

pub const TRUNCATION_MARKER: &str = "...(truncated)";

/// everything the main analysis prompt embeds
pub struct AnalysisContext<'a> {
    pub commit_message: &'a str,
    pub code_context: &'a str,
    pub max_context_chars: usize,
    pub metrics: &'a Metrics,
    pub detection: &'a Detection,
    pub readiness: Option<&'a ProductionReadinessReport>,
    pub plan: &'a AgentPlan,
    pub thoughts: &'a [AgentThought],
    pub analysis: &'a AnalysisConfig,
    pub focus_areas: &'a [String],
}

/// the issue and the change it is checked against
pub struct RelevanceContext<'a> {
    pub issue_number: u64,
    pub issue_title: &'a str,
    pub issue_body: &'a str,
    pub commit_message: &'a str,
    pub files: &'a [String],
    pub code_excerpt: &'a str,
}

/// cap `text` at `max_chars`, marking the cut
pub fn cap_context(text: &str, max_chars: usize) -> String {
    let capped = truncate_chars(text, max_chars);
    if capped.len() < text.len() {
        format!("{capped} {TRUNCATION_MARKER}")
    } else {
        capped.to_string()
    }
}

pub fn plan_prompt(task: &str, context: &str) -> String {
    format!(
        r#"You are an expert code review agent. Your task is to create a detailed plan for analyzing a code commit.

Task: {task}

Context:
{context}

Create a detailed plan with:
1. The main goal of the analysis
2. Step-by-step approach to analyze the commit
3. Estimated complexity of the analysis

Respond in JSON format:
{{
    "goal": "main goal",
    "steps": ["step 1", "step 2", ...],
    "estimatedComplexity": "low|medium|high"
}}"#
    )
}

pub fn think_prompt(step: u32, plan: &AgentPlan, context: &str, previous: &[AgentThought]) -> String {
    let current_step = step
        .checked_sub(1)
        .and_then(|i| plan.steps.get(i as usize))
        .map(String::as_str)
        .unwrap_or("");
    let previous_context = previous
        .iter()
        .map(|t| {
            format!(
                "Step {}: {}\nAction: {}\nReasoning: {}",
                t.step, t.thought, t.action, t.reasoning
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        r#"You are an expert code review agent executing step {step} of {total}.

Goal: {goal}
Current Step: {current_step}

Context:
{context}

Previous Thoughts:
{previous_context}

Think through this step carefully. What should you do? What are you looking for?

Respond in JSON format:
{{
    "step": {step},
    "thought": "your analytical thought process",
    "action": "what you will analyze in this step",
    "reasoning": "why this is important"
}}"#,
        total = plan.steps.len(),
        goal = plan.goal,
    )
}

/// review areas the analysis should cover, following the analysis toggles
pub fn review_areas(analysis: &AnalysisConfig) -> Vec<&'static str> {
    let toggles = [
        (analysis.code_quality, "Code Quality (structure, readability, maintainability)"),
        (analysis.security, "Security Issues (vulnerabilities, unsafe patterns)"),
        (analysis.performance, "Performance Concerns (inefficiencies, bottlenecks)"),
        (analysis.best_practices, "Best Practices (adherence to standards, patterns)"),
        (analysis.documentation, "Documentation (comments, clarity)"),
    ];
    let mut areas: Vec<&str> = toggles
        .iter()
        .filter(|(enabled, _)| *enabled)
        .map(|(_, area)| *area)
        .collect();
    areas.push("Testing (test coverage, quality)");
    areas.push("Breaking Changes (impact, migration)");
    areas.push("Overall PR Readiness");
    areas
}

fn readiness_summary(report: &ProductionReadinessReport) -> String {
    let mut out = format!("Production Readiness Score: {}/100\n", report.score);
    if report.issues.is_empty() {
        out.push_str("- no pattern-based issues detected\n");
    }
    for issue in &report.issues {
        out.push_str(&format!(
            "- [{}] {}: {} ({})\n",
            issue.severity,
            issue.category,
            issue.message,
            issue.file.as_deref().unwrap_or("unknown file")
        ));
    }
    out
}

fn list_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "none detected".to_string()
    } else {
        items.join(", ")
    }
}

pub fn analysis_prompt(ctx: &AnalysisContext<'_>) -> String {
    let metrics = ctx.metrics;
    let thoughts_context = ctx
        .thoughts
        .iter()
        .map(|t| format!("Step {} - {}: {}", t.step, t.action, t.reasoning))
        .collect::<Vec<_>>()
        .join("\n");

    let mut prompt = String::new();
    prompt.push_str("You are an expert code review agent. Analyze this commit thoroughly.\n\n");
    prompt.push_str(&format!("Commit Message: {}\n\n", ctx.commit_message));

    prompt.push_str("Analysis Metrics:\n");
    prompt.push_str(&format!("- Files Changed: {}\n", metrics.files_changed));
    prompt.push_str(&format!("- Lines Added: {}\n", metrics.lines_added));
    prompt.push_str(&format!("- Lines Deleted: {}\n", metrics.lines_deleted));
    prompt.push_str(&format!("- Complexity: {}\n", metrics.complexity));
    prompt.push_str(&format!("- Test Files: {}\n", metrics.test_files.len()));
    prompt.push_str(&format!("- Code Files: {}\n", metrics.code_files.len()));
    prompt.push_str(&format!(
        "- Has Breaking Changes: {}\n",
        metrics.has_breaking_changes
    ));
    prompt.push_str(&format!(
        "- Languages: {}\n",
        list_or_none(ctx.detection.languages.as_slice())
    ));
    prompt.push_str(&format!(
        "- Frameworks: {}\n",
        list_or_none(ctx.detection.frameworks.as_slice())
    ));
    prompt.push_str(&format!(
        "- Testing Frameworks: {}\n",
        list_or_none(ctx.detection.testing_frameworks.as_slice())
    ));
    prompt.push_str(&format!(
        "- Build Tools: {}\n\n",
        list_or_none(ctx.detection.build_tools.as_slice())
    ));

    if let Some(report) = ctx.readiness {
        prompt.push_str(&readiness_summary(report));
        prompt.push('\n');
    }

    if !ctx.focus_areas.is_empty() {
        prompt.push_str(&format!("Focus Areas: {}\n\n", ctx.focus_areas.join(", ")));
    }

    prompt.push_str(&format!("Agent's Analysis Plan:\n{}\n\n", ctx.plan.goal));
    prompt.push_str(&format!("Agent's Thoughts:\n{thoughts_context}\n\n"));
    prompt.push_str(&format!(
        "Code Changes:\n{}\n\n",
        cap_context(ctx.code_context, ctx.max_context_chars)
    ));

    prompt.push_str(
        "Based on your plan and thoughts, provide a comprehensive analysis covering:\n",
    );
    for (i, area) in review_areas(ctx.analysis).iter().enumerate() {
        prompt.push_str(&format!("{}. {area}\n", i + 1));
    }

    prompt.push_str(
        r#"
Respond in JSON format:
{
    "score": 0-100,
    "status": "ready|needs-work|not-ready",
    "summary": "brief overall summary",
    "issues": [
        {
            "severity": "critical|high|medium|low",
            "category": "category name",
            "message": "issue description",
            "file": "optional file path",
            "line": optional line number,
            "suggestion": "optional fix suggestion"
        }
    ],
    "suggestions": [
        {
            "category": "category name",
            "message": "suggestion text",
            "priority": "high|medium|low"
        }
    ],
    "prDescription": "auto-generated PR description in markdown format"
}"#,
    );
    prompt
}

pub fn pr_title_prompt(commit_message: &str, summary: &str) -> String {
    format!(
        "Generate a concise, descriptive PR title based on:
Commit Message: {commit_message}
Summary: {summary}

Guidelines:
- Keep it under 72 characters
- Use imperative mood
- Be specific and descriptive
- Don't include PR/commit prefixes

Return only the title, nothing else."
    )
}

pub fn relevance_prompt(ctx: &RelevanceContext<'_>) -> String {
    let issue_body = if ctx.issue_body.trim().is_empty() {
        "(no description)"
    } else {
        ctx.issue_body
    };

    format!(
        r#"You are an expert code review agent. Judge whether this commit addresses the linked issue.

Issue #{number}: {title}
{issue_body}

Commit Message: {message}

Files Changed:
{files}

Code Changes (excerpt):
{excerpt}

Score how well the change resolves the issue from 0 (unrelated) to 100 (fully resolved).

Respond in JSON format:
{{
    "score": 0-100,
    "isRelevant": true|false,
    "reasoning": "why the change does or does not address the issue",
    "addressedAspects": ["aspect of the issue the change covers", ...],
    "missingAspects": ["aspect of the issue still open", ...]
}}"#,
        number = ctx.issue_number,
        title = ctx.issue_title,
        message = ctx.commit_message,
        files = ctx
            .files
            .iter()
            .map(|f| format!("- {f}"))
            .collect::<Vec<_>>()
            .join("\n"),
        excerpt = ctx.code_excerpt,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Complexity;

    fn plan() -> AgentPlan {
        AgentPlan {
            goal: "assess the parser change".to_string(),
            steps: vec!["read diff".to_string(), "check tests".to_string()],
            estimated_complexity: Complexity::Low,
        }
    }

    #[test]
    fn cap_marks_truncation() {
        assert_eq!(cap_context("short", 10), "short");
        assert_eq!(cap_context("abcdefghij", 4), "abcd ...(truncated)");
    }

    #[test]
    fn think_prompt_names_current_step_and_history() {
        let previous = vec![AgentThought {
            step: 1,
            thought: "the diff touches the lexer".to_string(),
            action: "scan lexer".to_string(),
            reasoning: "entry point".to_string(),
        }];
        let prompt = think_prompt(2, &plan(), "ctx", &previous);
        assert!(prompt.contains("executing step 2 of 2"));
        assert!(prompt.contains("Current Step: check tests"));
        assert!(prompt.contains("Step 1: the diff touches the lexer"));
        assert!(prompt.contains("\"step\": 2"));
    }

    #[test]
    fn review_areas_follow_toggles() {
        let mut analysis = AnalysisConfig::default();
        assert_eq!(review_areas(&analysis).len(), 8);

        analysis.security = false;
        analysis.documentation = false;
        let areas = review_areas(&analysis);
        assert_eq!(areas.len(), 6);
        assert!(!areas.iter().any(|a| a.starts_with("Security")));
        assert_eq!(areas.last(), Some(&"Overall PR Readiness"));
    }

    #[test]
    fn relevance_prompt_lists_files() {
        let files = vec!["src/auth.rs".to_string(), "src/login.rs".to_string()];
        let prompt = relevance_prompt(&RelevanceContext {
            issue_number: 12,
            issue_title: "login fails",
            issue_body: "",
            commit_message: "fix: login",
            files: &files,
            code_excerpt: "+fix",
        });
        assert!(prompt.contains("Issue #12: login fails"));
        assert!(prompt.contains("(no description)"));
        assert!(prompt.contains("- src/auth.rs\n- src/login.rs"));
    }
}
