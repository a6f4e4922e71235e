// heuristic commit metrics - pure functions over the collected file list

use crate::git::{CommitInfo, FileChange};
use crate::types::Complexity;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use tracing::warn;

const HIGH_LINES: usize = 500;
const HIGH_FILES: usize = 10;
const MEDIUM_LINES: usize = 200;
const MEDIUM_FILES: usize = 5;

/// diffs at or above this size are summarised instead of embedded in the prompt context
pub const MAX_EMBEDDED_DIFF: usize = 5000;

const BREAKING_KEYWORDS: &[&str] = &[
    "BREAKING CHANGE",
    "breaking change",
    "breaking:",
    "BREAKING:",
    "!:",
];

const CODE_EXTENSIONS: &[&str] = &[
    ".ts", ".tsx", ".js", ".jsx", ".py", ".java", ".cpp", ".c", ".h", ".go", ".rs", ".rb", ".php",
    ".cs", ".swift", ".kt", ".scala",
];

lazy_static! {
    static ref TEST_PATTERNS: Vec<Regex> = [
        r"\.test\.",
        r"\.spec\.",
        r"__tests__/",
        r"(^|/)tests?/",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect();

    static ref CONFIG_PATTERNS: Vec<Regex> = [
        r"package\.json$",
        r"tsconfig\.json$",
        r"\.config\.(js|ts|json)$",
        r"\.rc$",
        r"\.yaml$",
        r"\.yml$",
        r"Dockerfile$",
        r"docker-compose",
        r"\.env",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect();
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Metrics {
    pub complexity: Complexity,
    pub files_changed: usize,
    pub lines_added: usize,
    pub lines_deleted: usize,
    pub test_files: Vec<String>,
    pub config_files: Vec<String>,
    pub code_files: Vec<String>,
    pub has_breaking_changes: bool,
}

impl Metrics {
    pub fn has_tests(&self) -> bool {
        !self.test_files.is_empty()
    }

    pub fn total_changes(&self) -> usize {
        self.lines_added + self.lines_deleted
    }
}

pub fn analyze_commit(commit: &CommitInfo) -> Metrics {
    let files_changed = commit.files.len();
    let lines_added = commit.files.iter().map(|f| f.additions).sum();
    let lines_deleted = commit.files.iter().map(|f| f.deletions).sum();

    let paths_where = |pred: &dyn Fn(&str) -> bool| -> Vec<String> {
        commit
            .files
            .iter()
            .filter(|f| pred(&f.path))
            .map(|f| f.path.clone())
            .collect()
    };

    Metrics {
        complexity: complexity_bucket(lines_added + lines_deleted, files_changed),
        files_changed,
        lines_added,
        lines_deleted,
        test_files: paths_where(&is_test_file),
        config_files: paths_where(&is_config_file),
        code_files: paths_where(&|p| is_code_file(p) && !is_test_file(p)),
        has_breaking_changes: detect_breaking_changes(&commit.message),
    }
}

/// high above 500 changed lines or 10 files, medium above 200 lines or 5 files
pub fn complexity_bucket(total_changes: usize, files_changed: usize) -> Complexity {
    if total_changes > HIGH_LINES || files_changed > HIGH_FILES {
        Complexity::High
    } else if total_changes > MEDIUM_LINES || files_changed > MEDIUM_FILES {
        Complexity::Medium
    } else {
        Complexity::Low
    }
}

pub fn detect_breaking_changes(message: &str) -> bool {
    BREAKING_KEYWORDS.iter().any(|keyword| message.contains(keyword))
}

pub fn is_test_file(path: &str) -> bool {
    TEST_PATTERNS.iter().any(|re| re.is_match(path))
}

pub fn is_config_file(path: &str) -> bool {
    CONFIG_PATTERNS.iter().any(|re| re.is_match(path))
}

pub fn is_code_file(path: &str) -> bool {
    CODE_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// the extension of the last path component including the dot, e.g. `.rs`
pub fn extension(path: &str) -> Option<&str> {
    let name = path.rsplit('/').next().unwrap_or(path);
    name.rfind('.').map(|i| &name[i..])
}

pub fn language_for_path(path: &str) -> Option<&'static str> {
    let language = match extension(path)? {
        ".ts" | ".tsx" => "TypeScript",
        ".js" | ".jsx" | ".mjs" | ".cjs" => "JavaScript",
        ".py" | ".pyw" => "Python",
        ".java" => "Java",
        ".go" => "Go",
        ".rs" => "Rust",
        ".cpp" | ".cxx" | ".cc" => "C++",
        ".c" => "C",
        ".h" | ".hpp" => "C/C++",
        ".cs" => "C#",
        ".php" => "PHP",
        ".rb" => "Ruby",
        ".swift" => "Swift",
        ".kt" | ".kts" => "Kotlin",
        ".scala" => "Scala",
        ".dart" => "Dart",
        ".sol" => "Solidity",
        _ => return None,
    };
    Some(language)
}

/// distinct values in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct OrderedSet(Vec<String>);

impl OrderedSet {
    pub fn insert(&mut self, value: &str) {
        if !self.contains(value) {
            self.0.push(value.to_string());
        }
    }

    pub fn contains(&self, value: &str) -> bool {
        self.0.iter().any(|v| v == value)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn join(&self, sep: &str) -> String {
        self.0.join(sep)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Detection {
    pub languages: OrderedSet,
    pub frameworks: OrderedSet,
    pub testing_frameworks: OrderedSet,
    pub build_tools: OrderedSet,
}

pub fn detect_languages_and_frameworks(files: &[FileChange]) -> Detection {
    let mut detection = Detection::default();
    for file in files {
        if let Some(language) = language_for_path(&file.path) {
            detection.languages.insert(language);
        }
        detect_frameworks_and_tools(file, &mut detection);
    }
    detection
}

fn detect_frameworks_and_tools(file: &FileChange, detection: &mut Detection) {
    let content = file.diff.to_lowercase();
    let path = file.path.to_lowercase();
    let in_content = |needle: &str| content.contains(needle);
    let in_either = |needle: &str| content.contains(needle) || path.contains(needle);
    let ext = extension(&file.path);

    let frameworks: &[(&str, bool)] = &[
        ("React", in_either("react")),
        ("Vue.js", in_either("vue")),
        ("Angular", in_content("angular")),
        ("Next.js", in_either("next")),
        ("Nuxt.js", in_content("nuxt")),
        ("Svelte", in_content("svelte")),
        ("Express.js", in_content("express")),
        ("Fastify", in_content("fastify")),
        ("Koa.js", in_content("koa")),
        ("NestJS", in_content("nestjs")),
        ("Gatsby", in_content("gatsby")),
        ("Django", in_either("django")),
        ("Flask", in_either("flask")),
        ("FastAPI", in_either("fastapi")),
        ("Pyramid", in_content("pyramid")),
        ("Tornado", in_content("tornado")),
        ("Spring", in_either("spring")),
        ("Hibernate", in_content("hibernate")),
        ("Struts", in_content("struts")),
        ("Gin", ext == Some(".go") && in_content("gin")),
        ("Echo", ext == Some(".go") && in_content("echo")),
        ("Fiber", ext == Some(".go") && in_content("fiber")),
        ("Actix", ext == Some(".rs") && in_content("actix")),
        ("Rocket", ext == Some(".rs") && in_content("rocket")),
        ("Warp", ext == Some(".rs") && in_content("warp")),
    ];
    for (name, _) in frameworks.iter().filter(|(_, hit)| *hit) {
        detection.frameworks.insert(name);
    }

    let testing: &[(&str, &str)] = &[
        ("Jest", "jest"),
        ("Mocha", "mocha"),
        ("Jasmine", "jasmine"),
        ("Cypress", "cypress"),
        ("Playwright", "playwright"),
        ("Selenium", "selenium"),
        ("PyTest", "pytest"),
        ("unittest", "unittest"),
        ("JUnit", "junit"),
        ("TestNG", "testng"),
        ("RSpec", "rspec"),
    ];
    for (name, needle) in testing {
        if in_content(needle) {
            detection.testing_frameworks.insert(name);
        }
    }

    let file_name = path.rsplit('/').next().unwrap_or(&path);
    let build_tools: &[(&str, bool)] = &[
        ("npm/yarn", file_name == "package.json"),
        ("Webpack", file_name == "webpack.config.js" || in_content("webpack")),
        ("Vite", file_name.starts_with("vite.config") || in_content("vite")),
        ("Rollup", file_name.starts_with("rollup.config") || in_content("rollup")),
        ("Gulp", file_name.starts_with("gulpfile") || in_content("gulp")),
        ("Grunt", file_name.starts_with("gruntfile") || in_content("grunt")),
        ("Maven", file_name == "pom.xml"),
        ("Gradle", file_name == "build.gradle" || file_name == "build.gradle.kts"),
        ("Cargo", file_name == "cargo.toml"),
        ("Go Modules", file_name == "go.mod"),
        ("Make", file_name == "makefile"),
        ("Docker", file_name == "dockerfile"),
    ];
    for (name, _) in build_tools.iter().filter(|(_, hit)| *hit) {
        detection.build_tools.insert(name);
    }
}

/// glob-like ignore patterns: `**` spans directories, `*` stays within one segment
#[derive(Debug, Clone, Default)]
pub struct IgnoreMatcher {
    patterns: Vec<Regex>,
}

impl IgnoreMatcher {
    pub fn new<S: AsRef<str>>(globs: &[S]) -> Self {
        let patterns = globs
            .iter()
            .filter_map(|glob| {
                let glob = glob.as_ref();
                match Regex::new(&glob_to_regex(glob)) {
                    Ok(re) => Some(re),
                    Err(e) => {
                        warn!(pattern = glob, error = %e, "ignoring invalid ignore pattern");
                        None
                    }
                }
            })
            .collect();
        Self { patterns }
    }

    pub fn is_ignored(&self, path: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(path))
    }
}

fn glob_to_regex(glob: &str) -> String {
    let mut out = String::with_capacity(glob.len() * 2);
    let mut chars = glob.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                out.push_str(".*");
            }
            '*' => out.push_str("[^/]*"),
            c => out.push_str(&regex::escape(&c.to_string())),
        }
    }
    out
}

/// the per-file diff context embedded in prompts, skipping ignored paths
pub fn extract_code_context(files: &[FileChange], ignore: &IgnoreMatcher) -> String {
    let mut context = String::new();

    for file in files.iter().filter(|f| !ignore.is_ignored(&f.path)) {
        context.push_str(&format!(
            "\n## File: {}\nStatus: {}\nChanges: +{} -{}\n",
            file.path,
            file.status.as_str(),
            file.additions,
            file.deletions
        ));

        if !file.diff.is_empty() && file.diff.len() < MAX_EMBEDDED_DIFF {
            context.push_str(&format!("\nDiff:\n{}\n", file.diff));
        } else if !file.diff.is_empty() {
            context.push_str("\n(Diff too large, showing summary only)\n");
        }
        context.push_str("\n---\n");
    }

    context
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::FileStatus;
    use pretty_assertions::assert_eq;

    fn file(path: &str, additions: usize, deletions: usize, diff: &str) -> FileChange {
        FileChange {
            path: path.to_string(),
            status: FileStatus::Modified,
            additions,
            deletions,
            diff: diff.to_string(),
        }
    }

    fn commit(message: &str, files: Vec<FileChange>) -> CommitInfo {
        CommitInfo {
            hash: "abc".to_string(),
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
    fn sums_lines_and_counts_files() {
        let metrics = analyze_commit(&commit(
            "feat: add parser",
            vec![
                file("src/parser.ts", 40, 3, ""),
                file("src/parser.test.ts", 25, 0, ""),
                file("package.json", 1, 1, ""),
            ],
        ));
        assert_eq!(metrics.files_changed, 3);
        assert_eq!(metrics.lines_added, 66);
        assert_eq!(metrics.lines_deleted, 4);
        assert_eq!(metrics.test_files, vec!["src/parser.test.ts".to_string()]);
        assert_eq!(metrics.config_files, vec!["package.json".to_string()]);
        // the test file is code by extension but excluded from code files
        assert_eq!(metrics.code_files, vec!["src/parser.ts".to_string()]);
        assert!(!metrics.has_breaking_changes);
    }

    #[test]
    fn complexity_thresholds_are_strict() {
        assert_eq!(complexity_bucket(600, 3), Complexity::High);
        assert_eq!(complexity_bucket(50, 2), Complexity::Low);
        assert_eq!(complexity_bucket(250, 3), Complexity::Medium);
        assert_eq!(complexity_bucket(500, 10), Complexity::Medium);
        assert_eq!(complexity_bucket(200, 5), Complexity::Low);
        assert_eq!(complexity_bucket(0, 11), Complexity::High);
        assert_eq!(complexity_bucket(0, 6), Complexity::Medium);
    }

    #[test]
    fn breaking_change_keywords() {
        assert!(detect_breaking_changes("feat!: remove old api"));
        assert!(detect_breaking_changes("refactor: x\n\nBREAKING CHANGE: drops v1"));
        assert!(!detect_breaking_changes("fix: minor tweak"));
        // case-sensitive
        assert!(!detect_breaking_changes("Breaking Change ahead"));
    }

    #[test]
    fn classifies_test_and_config_paths() {
        assert!(is_test_file("src/__tests__/a.js"));
        assert!(is_test_file("pkg/tests/helpers.py"));
        assert!(is_test_file("tests/integration.rs"));
        assert!(!is_test_file("src/contest.rs"));
        assert!(is_config_file("deploy/app.yml"));
        assert!(is_config_file("vite.config.ts"));
        assert!(is_config_file(".env.local"));
        assert!(!is_config_file("src/main.rs"));
    }

    #[test]
    fn detects_languages_and_tools() {
        let files = vec![
            file("web/App.tsx", 1, 0, "+import React from 'react';\n+import { test } from 'jest';"),
            file("server/main.rs", 1, 0, "+use actix_web::App;"),
            file("Cargo.toml", 1, 0, "+serde = \"1\""),
            file("api/views.py", 1, 0, "+from django.http import HttpResponse"),
        ];
        let detection = detect_languages_and_frameworks(&files);

        assert_eq!(detection.languages.as_slice(), &["TypeScript", "Rust", "Python"]);
        assert!(detection.frameworks.contains("React"));
        assert!(detection.frameworks.contains("Actix"));
        assert!(detection.frameworks.contains("Django"));
        assert!(detection.testing_frameworks.contains("Jest"));
        assert!(detection.build_tools.contains("Cargo"));
    }

    #[test]
    fn go_frameworks_need_go_files() {
        let detection =
            detect_languages_and_frameworks(&[file("notes.md", 1, 0, "+gin and tonic")]);
        assert!(!detection.frameworks.contains("Gin"));
    }

    #[test]
    fn ignore_globs() {
        let matcher = IgnoreMatcher::new(&["node_modules/**", "*.lock", "docs/*.md"]);
        assert!(matcher.is_ignored("node_modules/left-pad/index.js"));
        assert!(matcher.is_ignored("Cargo.lock"));
        assert!(matcher.is_ignored("docs/intro.md"));
        assert!(!matcher.is_ignored("src/lock.rs"));
        // the dot is literal, not a wildcard
        assert!(!matcher.is_ignored("Cargoxlock"));
    }

    #[test]
    fn code_context_skips_ignored_and_large_diffs() {
        let big = "+x\n".repeat(MAX_EMBEDDED_DIFF);
        let files = vec![
            file("src/lib.rs", 1, 0, "+pub fn a() {}\n"),
            file("yarn.lock", 100, 0, "+lots"),
            file("src/big.rs", 5000, 0, &big),
        ];
        let ignore = IgnoreMatcher::new(&["*.lock"]);
        let context = extract_code_context(&files, &ignore);

        assert!(context.contains("## File: src/lib.rs"));
        assert!(context.contains("+pub fn a() {}"));
        assert!(!context.contains("yarn.lock"));
        assert!(context.contains("## File: src/big.rs"));
        assert!(context.contains("(Diff too large, showing summary only)"));
    }

    #[test]
    fn repeated_scans_are_identical() {
        let c = commit("feat!: x", vec![file("a.py", 3, 1, "+import flask")]);
        assert_eq!(analyze_commit(&c), analyze_commit(&c));
        assert_eq!(
            detect_languages_and_frameworks(&c.files),
            detect_languages_and_frameworks(&c.files)
        );
    }
}
