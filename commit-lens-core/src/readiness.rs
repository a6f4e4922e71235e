// production readiness scan - a fixed battery of pattern checks per file

use crate::git::{CommitInfo, FileChange};
use crate::metrics::{self, extension};
use crate::types::{Issue, Severity};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

const JS_FAMILY: &[&str] = &[
    ".js", ".jsx", ".mjs", ".cjs", ".ts", ".tsx", ".vue", ".svelte", ".html",
];

lazy_static! {
    static ref TODO_COMMENT: Regex = Regex::new(r"(?i)(//|#)\s*(TODO|FIXME|HACK)").unwrap();
    static ref HARDCODED_CREDENTIAL: Regex =
        Regex::new(r#"(?i)(password|secret|key|token)\s*=\s*['"][^'"]+['"]"#).unwrap();
    static ref SQL_CONCAT: Regex = Regex::new(r#"(?i)query\s*\(\s*['"]\s*SELECT.*\+"#).unwrap();
    static ref SYNC_FS: Regex = Regex::new(r"fs\.(readFileSync|writeFileSync)").unwrap();
    static ref LODASH_STAR: Regex =
        Regex::new(r#"import\s+\*\s+as\s+\w+\s+from\s+['"]lodash['"]"#).unwrap();
    static ref EMPTY_CATCH: Regex = Regex::new(r"catch\s*\([^)]*\)\s*\{\s*\}").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    All,
    JsFamily,
}

impl Scope {
    fn applies_to(self, path: &str) -> bool {
        match self {
            Scope::All => true,
            Scope::JsFamily => extension(path).is_some_and(|ext| JS_FAMILY.contains(&ext)),
        }
    }
}

const SECURITY: &str = "Security";

struct Rule {
    scope: Scope,
    severity: Severity,
    category: &'static str,
    message: &'static str,
    suggestion: &'static str,
    matches: fn(&FileChange) -> bool,
}

const RULES: &[Rule] = &[
    Rule {
        scope: Scope::JsFamily,
        severity: Severity::Medium,
        category: "Production Readiness",
        message: "Console.log statements found in production code",
        suggestion: "Replace with proper logging framework",
        matches: |f| f.diff.contains("console.log") && !metrics::is_test_file(&f.path),
    },
    Rule {
        scope: Scope::All,
        severity: Severity::Low,
        category: "Code Quality",
        message: "TODO/FIXME comments found",
        suggestion: "Resolve pending issues before production",
        matches: |f| TODO_COMMENT.is_match(&f.diff),
    },
    Rule {
        scope: Scope::All,
        severity: Severity::Critical,
        category: SECURITY,
        message: "Potential hardcoded credentials found",
        suggestion: "Use environment variables or secure secret management",
        matches: |f| HARDCODED_CREDENTIAL.is_match(&f.diff),
    },
    Rule {
        scope: Scope::JsFamily,
        severity: Severity::High,
        category: "Production Readiness",
        message: "Debug code found",
        suggestion: "Remove debug statements before production",
        matches: |f| f.diff.contains("debugger;") || f.diff.contains("console.trace"),
    },
    Rule {
        scope: Scope::All,
        severity: Severity::Critical,
        category: SECURITY,
        message: "Potential SQL injection vulnerability",
        suggestion: "Use parameterized queries or ORM",
        matches: |f| SQL_CONCAT.is_match(&f.diff),
    },
    Rule {
        scope: Scope::JsFamily,
        severity: Severity::High,
        category: SECURITY,
        message: "Potential XSS vulnerability with innerHTML",
        suggestion: "Sanitize input or use textContent/innerText",
        matches: |f| f.diff.contains("innerHTML") && !f.diff.contains("sanitize"),
    },
    Rule {
        scope: Scope::All,
        severity: Severity::Medium,
        category: SECURITY,
        message: "Insecure HTTP protocol used",
        suggestion: "Use HTTPS for production endpoints",
        matches: |f| f.diff.contains("http://") && !metrics::is_test_file(&f.path),
    },
    Rule {
        scope: Scope::JsFamily,
        severity: Severity::Medium,
        category: "Performance",
        message: "Synchronous file operations found",
        suggestion: "Use asynchronous file operations",
        matches: |f| SYNC_FS.is_match(&f.diff),
    },
    Rule {
        scope: Scope::JsFamily,
        severity: Severity::Low,
        category: "Code Quality",
        message: "Promise chains found, consider async/await",
        suggestion: "Refactor to use async/await for better readability",
        matches: |f| f.diff.contains(".then(") && f.diff.contains(".catch("),
    },
    Rule {
        scope: Scope::JsFamily,
        severity: Severity::Medium,
        category: "Performance",
        message: "Importing entire library instead of specific functions",
        suggestion: "Import only needed functions to reduce bundle size",
        matches: |f| LODASH_STAR.is_match(&f.diff),
    },
    Rule {
        scope: Scope::JsFamily,
        severity: Severity::Medium,
        category: "Error Handling",
        message: "Async operations without error handling",
        suggestion: "Wrap async operations in try-catch blocks",
        matches: |f| f.diff.contains("await ") && !f.diff.contains("try {"),
    },
    Rule {
        scope: Scope::JsFamily,
        severity: Severity::High,
        category: "Error Handling",
        message: "Empty catch block found",
        suggestion: "Add proper error handling and logging",
        matches: |f| EMPTY_CATCH.is_match(&f.diff),
    },
    Rule {
        scope: Scope::JsFamily,
        severity: Severity::Medium,
        category: "Monitoring",
        message: "Error caught but not logged",
        suggestion: "Add error logging for debugging and monitoring",
        matches: |f| f.diff.contains("catch (") && !f.diff.contains("log"),
    },
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductionReadinessReport {
    pub score: u32,
    pub issues: Vec<Issue>,
    pub recommendations: Vec<String>,
}

impl ProductionReadinessReport {
    pub fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }
}

/// 100 minus the severity penalties of every issue, floored at 0
pub fn readiness_score(issues: &[Issue]) -> u32 {
    let penalty: u32 = issues.iter().map(|i| i.severity.penalty()).sum();
    100u32.saturating_sub(penalty)
}

/// issues for one file, in rule order
pub fn scan_file(file: &FileChange) -> Vec<Issue> {
    RULES
        .iter()
        .filter(|rule| rule.scope.applies_to(&file.path) && (rule.matches)(file))
        .map(|rule| Issue {
            severity: rule.severity,
            category: rule.category.to_string(),
            message: rule.message.to_string(),
            file: Some(file.path.clone()),
            line: None,
            suggestion: Some(rule.suggestion.to_string()),
        })
        .collect()
}

pub fn analyze_production_readiness(commit: &CommitInfo) -> ProductionReadinessReport {
    analyze_production_readiness_with(commit, true)
}

/// like `analyze_production_readiness`, leaving out the Security rules when
/// `security_checks` is off
pub fn analyze_production_readiness_with(
    commit: &CommitInfo,
    security_checks: bool,
) -> ProductionReadinessReport {
    let issues: Vec<Issue> = commit
        .files
        .iter()
        .flat_map(scan_file)
        .filter(|issue| security_checks || issue.category != SECURITY)
        .collect();

    ProductionReadinessReport {
        score: readiness_score(&issues),
        recommendations: recommendations(&commit.files, &issues),
        issues,
    }
}

fn recommendations(files: &[FileChange], issues: &[Issue]) -> Vec<String> {
    let detection = metrics::detect_languages_and_frameworks(files);
    let has_category = |category: &str| issues.iter().any(|i| i.category == category);
    let mut out = Vec::new();

    if has_category(SECURITY) {
        out.push("Run security audit tools like npm audit, bandit, or security linters");
    }
    if has_category("Performance") {
        out.push("Profile application performance and optimize critical paths");
    }
    if detection.languages.contains("JavaScript") || detection.languages.contains("TypeScript") {
        out.push("Run bundle analyzer to check for optimization opportunities");
        out.push("Ensure proper tree-shaking and code splitting");
    }
    if detection.frameworks.contains("React") {
        out.push("Implement React DevTools profiling for performance");
        out.push("Consider React.memo and useMemo for optimization");
    }
    if detection.languages.contains("Python") {
        out.push("Use production WSGI server like Gunicorn or uWSGI");
        out.push("Implement proper Python logging configuration");
    }

    out.push("Set up proper CI/CD pipeline with automated testing");
    out.push("Configure production monitoring and alerting");
    out.push("Implement health checks and readiness probes");

    out.into_iter().map(String::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::FileStatus;
    use pretty_assertions::assert_eq;

    fn file(path: &str, diff: &str) -> FileChange {
        FileChange {
            path: path.to_string(),
            status: FileStatus::Modified,
            additions: diff.lines().filter(|l| l.starts_with('+')).count(),
            deletions: 0,
            diff: diff.to_string(),
        }
    }

    fn commit(message: &str, files: Vec<FileChange>) -> CommitInfo {
        CommitInfo {
            hash: "0123456789abcdef0123456789abcdef01234567".to_string(),
            message: message.to_string(),
            author: "dev".to_string(),
            date: String::new(),
            files,
            issue_number: None,
            issue_title: None,
            issue_body: None,
        }
    }

    #[test]
    fn hardcoded_password_in_python_is_one_critical_issue() {
        let report = analyze_production_readiness(&commit(
            "fix: login bug",
            vec![file("auth.py", "+password = \"abc123\"\n")],
        ));

        assert_eq!(report.issues.len(), 1);
        let issue = &report.issues[0];
        assert_eq!(issue.severity, Severity::Critical);
        assert_eq!(issue.category, "Security");
        assert_eq!(issue.file.as_deref(), Some("auth.py"));
        assert!(report.score <= 80);
        assert!(
            report
                .recommendations
                .iter()
                .any(|r| r.contains("security audit"))
        );
        assert!(report.recommendations.iter().any(|r| r.contains("WSGI")));
    }

    #[test]
    fn security_rules_can_be_switched_off() {
        let commit = commit(
            "fix: login bug",
            vec![file("auth.py", "+password = \"abc123\"\n+# TODO: rotate\n")],
        );

        let full = analyze_production_readiness(&commit);
        assert_eq!(full.issues.len(), 2);

        let report = analyze_production_readiness_with(&commit, false);
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].category, "Code Quality");
        assert_eq!(report.score, 98);
        assert!(
            !report
                .recommendations
                .iter()
                .any(|r| r.contains("security audit"))
        );
    }

    #[test]
    fn js_rules_only_fire_for_js_family_files() {
        let diff = "+console.log('x');\n+debugger;\n";
        assert_eq!(scan_file(&file("src/app.ts", diff)).len(), 2);
        assert!(scan_file(&file("src/app.py", diff)).is_empty());
        assert!(scan_file(&file("src/app.rs", diff)).is_empty());
    }

    #[test]
    fn console_log_in_tests_is_allowed() {
        let issues = scan_file(&file("src/app.test.js", "+console.log('debug');\n"));
        assert!(issues.is_empty());
    }

    #[test]
    fn issues_follow_file_then_rule_order() {
        let report = analyze_production_readiness(&commit(
            "feat: ui",
            vec![
                file("web/view.js", "+el.innerHTML = x;\n+// TODO escape\n"),
                file("web/api.js", "+fetch('http://example.com');\n"),
            ],
        ));
        let messages: Vec<_> = report.issues.iter().map(|i| i.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "TODO/FIXME comments found",
                "Potential XSS vulnerability with innerHTML",
                "Insecure HTTP protocol used",
            ]
        );
        assert_eq!(report.score, 100 - 2 - 10 - 5);
    }

    #[test]
    fn empty_catch_and_unlogged_catch() {
        let issues = scan_file(&file("a.js", "+try { run(); } catch (e) {}\n"));
        let messages: Vec<_> = issues.iter().map(|i| i.message.as_str()).collect();
        assert!(messages.contains(&"Empty catch block found"));
        assert!(messages.contains(&"Error caught but not logged"));
    }

    #[test]
    fn sql_concatenation_is_flagged_everywhere() {
        let issues = scan_file(&file(
            "repo.go",
            "+db.query(\"SELECT * FROM users WHERE id = \" + id)\n",
        ));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].message, "Potential SQL injection vulnerability");
    }

    #[test]
    fn score_is_floored_and_monotonic() {
        let many: Vec<FileChange> = (0..10)
            .map(|i| file(&format!("s{i}.py"), "+secret = \"hunter2\"\n"))
            .collect();
        let report = analyze_production_readiness(&commit("x", many.clone()));
        assert_eq!(report.count(Severity::Critical), 10);
        assert_eq!(report.score, 0);

        let mut previous = 100;
        for n in 0..=many.len() {
            let score = analyze_production_readiness(&commit("x", many[..n].to_vec())).score;
            assert!(score <= previous);
            assert!(score <= 100);
            previous = score;
        }
    }

    #[test]
    fn clean_commit_scores_100_with_baseline_recommendations() {
        let report = analyze_production_readiness(&commit(
            "docs: readme",
            vec![file("README.md", "+hello\n")],
        ));
        assert_eq!(report.score, 100);
        assert!(report.issues.is_empty());
        assert_eq!(report.recommendations.len(), 3);
    }

    #[test]
    fn scan_is_idempotent() {
        let c = commit(
            "feat",
            vec![file("a.ts", "+await load();\n+const token = 'abc';\n")],
        );
        assert_eq!(
            analyze_production_readiness(&c),
            analyze_production_readiness(&c)
        );
    }
}
