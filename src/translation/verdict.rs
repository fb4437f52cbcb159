/*!
 * Structured result of a translation review.
 */

use serde::{Deserialize, Serialize};

/// Quality dimension an issue belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueCategory {
    Terminology,
    Naturalness,
    Completeness,
    Consistency,
    Grammar,
    /// HTML tags, classes or attributes were changed
    Structure,
}

impl IssueCategory {
    pub const ALL: [IssueCategory; 6] = [
        Self::Terminology,
        Self::Naturalness,
        Self::Completeness,
        Self::Consistency,
        Self::Grammar,
        Self::Structure,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Terminology => "terminology",
            Self::Naturalness => "naturalness",
            Self::Completeness => "completeness",
            Self::Consistency => "consistency",
            Self::Grammar => "grammar",
            Self::Structure => "structure",
        }
    }

    /// Parse a category name, accepting a few common synonyms.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "terminology" | "terms" => Some(Self::Terminology),
            "naturalness" | "fluency" | "style" => Some(Self::Naturalness),
            "completeness" | "content" => Some(Self::Completeness),
            "consistency" => Some(Self::Consistency),
            "grammar" | "grammar and style" | "punctuation" => Some(Self::Grammar),
            "structure" | "html" | "html structure" | "markup" => Some(Self::Structure),
            _ => None,
        }
    }

    /// A blocking issue fails the review whatever the score.
    pub fn is_blocking(&self) -> bool {
        matches!(self, Self::Structure)
    }
}

impl std::fmt::Display for IssueCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One concrete problem found in a candidate translation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewIssue {
    pub category: IssueCategory,
    pub description: String,
}

impl ReviewIssue {
    pub fn new(category: IssueCategory, description: impl Into<String>) -> Self {
        Self {
            category,
            description: description.into(),
        }
    }

    /// Build an issue from free text. A leading `Category:` or `[Category]`
    /// tag selects the category; untagged text counts as naturalness.
    pub fn from_text(text: &str) -> Self {
        let text = text.trim();
        let tagged = if let Some(rest) = text.strip_prefix('[') {
            rest.split_once(']')
        } else {
            text.split_once(':')
        };

        if let Some((tag, rest)) = tagged {
            if let Some(category) = IssueCategory::parse(tag) {
                return Self::new(category, rest.trim());
            }
        }
        Self::new(IssueCategory::Naturalness, text)
    }
}

impl std::fmt::Display for ReviewIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.description)
    }
}

/// Pass/fail judgment with score and feedback for the next attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawVerdict")]
pub struct ReviewVerdict {
    pub passed: bool,
    /// Always within `[0.0, 1.0]`
    pub score: f32,
    pub issues: Vec<ReviewIssue>,
    pub suggestions: Vec<String>,
    pub reasoning: String,
}

impl ReviewVerdict {
    pub fn new(
        passed: bool,
        score: f32,
        issues: Vec<ReviewIssue>,
        suggestions: Vec<String>,
        reasoning: impl Into<String>,
    ) -> Self {
        Self {
            passed,
            score: clamp_score(score),
            issues,
            suggestions,
            reasoning: reasoning.into(),
        }
    }

    pub fn pass(score: f32) -> Self {
        Self::new(true, score, Vec::new(), Vec::new(), "")
    }

    pub fn fail(score: f32, issues: Vec<ReviewIssue>) -> Self {
        Self::new(false, score, issues, Vec::new(), "")
    }

    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions = suggestions;
        self
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = reasoning.into();
        self
    }

    pub fn has_blocking_issue(&self) -> bool {
        self.issues.iter().any(|i| i.category.is_blocking())
    }

    pub fn issues_in(&self, category: IssueCategory) -> impl Iterator<Item = &ReviewIssue> {
        self.issues.iter().filter(move |i| i.category == category)
    }

    /// Feedback for the producer:
    /// `"Issues: a; b\nSuggestions: c; d"`, empty lines omitted.
    pub fn feedback_text(&self) -> String {
        let mut lines = Vec::with_capacity(2);
        if !self.issues.is_empty() {
            let joined: Vec<String> = self.issues.iter().map(ToString::to_string).collect();
            lines.push(format!("Issues: {}", joined.join("; ")));
        }
        if !self.suggestions.is_empty() {
            lines.push(format!("Suggestions: {}", self.suggestions.join("; ")));
        }
        if lines.is_empty() && !self.reasoning.trim().is_empty() {
            lines.push(format!("Issues: {}", self.reasoning.trim()));
        }
        lines.join("\n")
    }
}

fn clamp_score(score: f32) -> f32 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}

/// Reviewer output as the service returns it; issues may be strings or
/// `{category, description}` objects.
#[derive(Debug, Deserialize)]
struct RawVerdict {
    #[serde(default)]
    passed: bool,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    issues: Vec<RawIssue>,
    #[serde(default)]
    suggestions: Vec<String>,
    #[serde(default)]
    reasoning: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawIssue {
    Text(String),
    Tagged {
        category: String,
        #[serde(alias = "issue", alias = "text")]
        description: String,
    },
}

impl From<RawIssue> for ReviewIssue {
    fn from(raw: RawIssue) -> Self {
        match raw {
            RawIssue::Text(text) => ReviewIssue::from_text(&text),
            RawIssue::Tagged {
                category,
                description,
            } => ReviewIssue::new(
                IssueCategory::parse(&category).unwrap_or(IssueCategory::Naturalness),
                description,
            ),
        }
    }
}

impl From<RawVerdict> for ReviewVerdict {
    fn from(raw: RawVerdict) -> Self {
        ReviewVerdict::new(
            raw.passed,
            raw.score,
            raw.issues.into_iter().map(Into::into).collect(),
            raw.suggestions,
            raw.reasoning,
        )
    }
}
