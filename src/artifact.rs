/*!
 * Resume content flowing through the pipeline.
 *
 * - `ResumeSource`: the resume as uploaded by the user
 * - `JobPosting`: the parsed job the resume is tailored for
 * - `ResumeArtifact`: HTML resume body in one specific language
 */

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Original resume as uploaded by the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeSource {
    /// Raw resume text (any format: plain text, markdown, LaTeX...)
    pub content: String,

    #[serde(default)]
    pub first_name: Option<String>,

    #[serde(default)]
    pub last_name: Option<String>,

    /// Free-form notes from the user
    #[serde(default)]
    pub notes: Option<String>,
}

impl ResumeSource {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            first_name: None,
            last_name: None,
            notes: None,
        }
    }

    /// SHA-256 hex digest of the resume content
    pub fn checksum(&self) -> String {
        sha256_hex(&self.content)
    }
}

/// Job posting the resume is tailored for.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobPosting {
    pub title: String,
    pub company: String,
    #[serde(default)]
    pub requirements: Vec<String>,
    /// Field keywords, most relevant first
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl JobPosting {
    pub fn new(title: impl Into<String>, company: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            company: company.into(),
            ..Default::default()
        }
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    /// The first `limit` keywords joined for prompt context.
    pub fn keyword_summary(&self, limit: usize) -> String {
        self.keywords
            .iter()
            .take(limit)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// HTML resume body in a specific language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeArtifact {
    /// HTML body markup
    pub html: String,

    /// ISO 639-1 code of the language `html` is written in
    pub language_code: String,

    /// Checksum of the `ResumeSource` this artifact descends from
    #[serde(default)]
    pub source_checksum: String,

    /// Notable decisions made by whichever stage produced this artifact
    #[serde(default)]
    pub changes: Vec<String>,
}

impl ResumeArtifact {
    pub fn new(html: impl Into<String>, language_code: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            language_code: language_code.into(),
            source_checksum: String::new(),
            changes: Vec::new(),
        }
    }

    pub fn with_source_checksum(mut self, checksum: impl Into<String>) -> Self {
        self.source_checksum = checksum.into();
        self
    }

    /// A new artifact in `language_code` that keeps this one's lineage.
    pub fn derive(&self, html: impl Into<String>, language_code: &str, changes: Vec<String>) -> Self {
        Self {
            html: html.into(),
            language_code: language_code.to_string(),
            source_checksum: self.source_checksum.clone(),
            changes,
        }
    }

    /// True when the body has no visible content at all.
    pub fn is_blank(&self) -> bool {
        crate::markup::visible_text(&self.html).trim().is_empty()
    }
}

pub(crate) fn sha256_hex(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}
