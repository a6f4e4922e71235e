// configuration loading - defaults, config file discovery, env file and credentials

use crate::error::{LensError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const CONFIG_FILE_NAMES: &[&str] = &[
    "commit-lens.yaml",
    "commit-lens.yml",
    ".commit-lens.yaml",
    ".commit-lens.yml",
    "commit-lens.toml",
];

pub const GROQ_API_KEY: &str = "GROQ_API_KEY";
pub const GROQ_MODEL: &str = "GROQ_MODEL";
pub const GITHUB_TOKEN: &str = "GITHUB_TOKEN";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub analysis: AnalysisConfig,
    pub checks: ChecksConfig,
    pub agent: AgentConfig,
    pub project: ProjectConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnalysisConfig {
    pub code_quality: bool,
    pub security: bool,
    pub performance: bool,
    pub best_practices: bool,
    pub documentation: bool,
    pub production_readiness: bool,
    pub min_score: i64,
    pub ignore: Vec<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            code_quality: true,
            security: true,
            performance: true,
            best_practices: true,
            documentation: true,
            production_readiness: true,
            min_score: 70,
            ignore: [
                "node_modules/**",
                "dist/**",
                "build/**",
                "*.log",
                "*.lock",
                ".git/**",
            ]
            .iter()
            .map(|p| p.to_string())
            .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChecksConfig {
    pub commit_message: bool,
    pub tests_included: bool,
    pub breaking_changes: bool,
    pub complexity: bool,
    pub security_issues: bool,
}

impl Default for ChecksConfig {
    fn default() -> Self {
        Self {
            commit_message: true,
            tests_included: true,
            breaking_changes: true,
            complexity: true,
            security_issues: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    Quiet,
    #[default]
    Normal,
    Verbose,
}

/// how much of the diff context the main analysis prompt may carry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextProfile {
    #[default]
    Standard,
    Extended,
}

impl ContextProfile {
    pub fn max_chars(self) -> usize {
        match self {
            ContextProfile::Standard => 15_000,
            ContextProfile::Extended => 20_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AgentConfig {
    pub verbosity: Verbosity,
    #[serde(rename = "generatePRDescription", alias = "generatePrDescription")]
    pub generate_pr_description: bool,
    pub suggest_improvements: bool,
    pub max_suggestions: i64,
    pub focus_areas: Vec<String>,
    pub context_profile: ContextProfile,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            verbosity: Verbosity::Normal,
            generate_pr_description: true,
            suggest_improvements: true,
            max_suggestions: 5,
            focus_areas: Vec::new(),
            context_profile: ContextProfile::Standard,
        }
    }
}

impl AgentConfig {
    pub fn suggestion_cap(&self) -> usize {
        self.max_suggestions.max(1) as usize
    }
}

/// a config value that may be written as a single string or a list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl Default for OneOrMany {
    fn default() -> Self {
        OneOrMany::One("auto".to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    #[serde(rename = "type")]
    pub project_type: String,
    pub languages: OneOrMany,
    pub frameworks: OneOrMany,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            project_type: "auto".to_string(),
            languages: OneOrMany::default(),
            frameworks: OneOrMany::default(),
        }
    }
}

impl Config {
    /// config files looked for in `cwd`, in priority order
    pub fn search_paths(cwd: &Path) -> Vec<PathBuf> {
        CONFIG_FILE_NAMES.iter().map(|name| cwd.join(name)).collect()
    }

    /// load the explicit file, or the first discovered file that parses, falling back to defaults.
    /// an explicit file must load. a discovered file with broken syntax is skipped with a
    /// warning, but one with invalid values is an error
    pub fn load(explicit: Option<&Path>, cwd: &Path) -> Result<(Config, Option<PathBuf>)> {
        if let Some(path) = explicit {
            let config = Config::from_file(path)?;
            debug!(path = %path.display(), "loaded config");
            return Ok((config, Some(path.to_path_buf())));
        }

        for path in Config::search_paths(cwd) {
            if !path.exists() {
                continue;
            }
            match Config::from_file(&path) {
                Ok(config) => {
                    debug!(path = %path.display(), "loaded config");
                    return Ok((config, Some(path)));
                }
                Err(e @ LensError::ConfigParse { .. }) => {
                    warn!(path = %path.display(), error = %e, "skipping unparseable config")
                }
                Err(e) => return Err(e),
            }
        }
        Ok((Config::default(), None))
    }

    /// parse one config file (yaml, or toml by extension) over the defaults.
    /// broken syntax is `ConfigParse`, values of the wrong type are `InvalidConfig`
    pub fn from_file(path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path)?;
        let parse_err = |message: String| LensError::ConfigParse {
            path: path.display().to_string(),
            message,
        };

        let user: Value = if path.extension().is_some_and(|ext| ext == "toml") {
            toml::from_str(&content).map_err(|e| parse_err(e.to_string()))?
        } else {
            serde_yaml::from_str(&content).map_err(|e| parse_err(e.to_string()))?
        };

        Config::merged_with(user)
            .map_err(|e| LensError::InvalidConfig(vec![format!("{}: {e}", path.display())]))
    }

    /// shallow-merge user sections over the defaults, one level deep
    pub fn merged_with(user: Value) -> std::result::Result<Config, serde_json::Error> {
        let mut merged = serde_json::to_value(Config::default())?;

        if let (Value::Object(base), Value::Object(overrides)) = (&mut merged, user) {
            for (section, values) in overrides {
                match (base.get_mut(&section), values) {
                    (Some(Value::Object(base_section)), Value::Object(user_section)) => {
                        base_section.extend(user_section);
                    }
                    (_, Value::Null) => {}
                    (_, other) => {
                        base.insert(section, other);
                    }
                }
            }
        }

        serde_json::from_value(merged)
    }

    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if !(0..=100).contains(&self.analysis.min_score) {
            errors.push("analysis.minScore must be between 0 and 100".to_string());
        }
        if self.agent.max_suggestions < 1 {
            errors.push("agent.maxSuggestions must be at least 1".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(LensError::InvalidConfig(errors))
        }
    }

    /// yaml written by `init`
    pub fn default_yaml() -> String {
        // serialising a plain struct of strings, bools and numbers cannot fail
        serde_yaml::to_string(&Config::default()).unwrap_or_default()
    }
}

/// first existing env file among the candidates
pub fn resolve_env_file(search_paths: &[PathBuf]) -> Option<PathBuf> {
    search_paths.iter().find(|p| p.is_file()).cloned()
}

/// variables read from an env file, kept out of the process environment
#[derive(Debug, Clone, Default)]
pub struct EnvFile {
    pub path: PathBuf,
    pub vars: HashMap<String, String>,
}

impl EnvFile {
    pub fn load(path: &Path) -> Result<EnvFile> {
        let parse_err = |message: String| LensError::ConfigParse {
            path: path.display().to_string(),
            message,
        };

        let mut vars = HashMap::new();
        for item in dotenv::from_path_iter(path).map_err(|e| parse_err(e.to_string()))? {
            let (key, value) = item.map_err(|e| parse_err(e.to_string()))?;
            vars.insert(key, value);
        }

        Ok(EnvFile {
            path: path.to_path_buf(),
            vars,
        })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub groq_api_key: String,
    pub groq_model: Option<String>,
    pub github_token: Option<String>,
}

impl Credentials {
    /// look each key up in the given environment first, then the env file
    pub fn resolve<F>(env_file: Option<&EnvFile>, lookup: F) -> Result<Credentials>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .or_else(|| env_file.and_then(|f| f.get(key)).map(str::to_string))
                .filter(|v| !v.trim().is_empty())
        };

        let groq_api_key =
            get(GROQ_API_KEY).ok_or_else(|| LensError::MissingCredential(GROQ_API_KEY.to_string()))?;

        Ok(Credentials {
            groq_api_key,
            groq_model: get(GROQ_MODEL),
            github_token: get(GITHUB_TOKEN),
        })
    }
}
