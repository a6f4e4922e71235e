// data model shared by the scanner, the agent and the report renderer

use crate::error::{LensError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// score at or above which an issue is considered addressed by the commit
pub const RELEVANCE_THRESHOLD: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    /// points subtracted from the production-readiness score per issue
    pub fn penalty(self) -> u32 {
        match self {
            Severity::Critical => 20,
            Severity::High => 10,
            Severity::Medium => 5,
            Severity::Low => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Low,
    #[default]
    Medium,
    High,
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Complexity::Low => "low",
            Complexity::Medium => "medium",
            Complexity::High => "high",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReadinessStatus {
    Ready,
    NeedsWork,
    NotReady,
}

impl fmt::Display for ReadinessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ReadinessStatus::Ready => "ready",
            ReadinessStatus::NeedsWork => "needs-work",
            ReadinessStatus::NotReady => "not-ready",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub severity: Severity,
    pub category: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub category: String,
    pub message: String,
    pub priority: Priority,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentPlan {
    pub goal: String,
    pub steps: Vec<String>,
    #[serde(default)]
    pub estimated_complexity: Complexity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentThought {
    #[serde(default)]
    pub step: u32,
    pub thought: String,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub reasoning: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueRelevance {
    pub score: u32,
    #[serde(default)]
    pub is_relevant: bool,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub addressed_aspects: Vec<String>,
    #[serde(default)]
    pub missing_aspects: Vec<String>,
}

impl IssueRelevance {
    /// parse a relevance judgement, replacing the model's own verdict with the score threshold
    pub fn from_model_json(text: &str) -> Result<Self> {
        let mut relevance: IssueRelevance =
            serde_json::from_str(text).map_err(|e| LensError::model_output("relevance", e))?;
        if relevance.score > 100 {
            return Err(LensError::model_output(
                "relevance",
                format!("score {} is outside 0..=100", relevance.score),
            ));
        }
        relevance.is_relevant = relevance.score >= RELEVANCE_THRESHOLD;
        Ok(relevance)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub score: u32,
    pub status: ReadinessStatus,
    pub summary: String,
    #[serde(default)]
    pub issues: Vec<Issue>,
    #[serde(default)]
    pub suggestions: Vec<Suggestion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pr_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_relevance: Option<IssueRelevance>,
}

impl AnalysisResult {
    /// parse and check the main analysis response
    pub fn from_model_json(text: &str) -> Result<Self> {
        let result: AnalysisResult =
            serde_json::from_str(text).map_err(|e| LensError::model_output("analysis", e))?;
        if result.score > 100 {
            return Err(LensError::model_output(
                "analysis",
                format!("score {} is outside 0..=100", result.score),
            ));
        }
        Ok(result)
    }

    /// keep at most `max` suggestions, highest priority first, original order within a priority
    pub fn trim_suggestions(&mut self, max: usize) {
        if self.suggestions.len() <= max {
            return;
        }
        // sort_by_key is stable
        self.suggestions.sort_by_key(|s| s.priority);
        self.suggestions.truncate(max);
    }
}
