/*!
 * Folder-based storage of rendered resumes.
 *
 * No index file: everything `list_all` reports is derived from file names
 * and modification times. Every stored name carries a language suffix,
 * `{base}_{code}.pdf`, so outputs for different languages never collide.
 */

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use walkdir::WalkDir;

use crate::errors::PipelineError;
use crate::language::validate_language_code;

/// Language code used when none is given.
pub const DEFAULT_LANGUAGE_CODE: &str = "en";

static UNSAFE_CHARS_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("Invalid filename regex"));

/// Persists rendered documents.
pub trait DocumentStore: Send + Sync {
    fn store(
        &self,
        document: &[u8],
        base_name: &str,
        language_code: Option<&str>,
    ) -> Result<PathBuf, PipelineError>;
}

/// Lowercase `name` and collapse runs of anything but `[a-z0-9]` into `_`.
pub fn sanitize_filename(name: &str) -> String {
    UNSAFE_CHARS_REGEX
        .replace_all(&name.to_lowercase(), "_")
        .trim_matches('_')
        .to_string()
}

/// A document found in the output folder.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub path: PathBuf,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub company: String,
    pub job_title: String,
    pub language_code: Option<String>,
    pub modified: DateTime<Local>,
}

/// Storage rooted at an output folder.
#[derive(Debug, Clone)]
pub struct PdfStorage {
    output_dir: PathBuf,
}

impl PdfStorage {
    /// Create the storage, creating `output_dir` if needed.
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self, PipelineError> {
        let output_dir = output_dir.into();
        fs::create_dir_all(&output_dir).map_err(|e| {
            PipelineError::Storage(format!(
                "failed to create output directory {}: {}",
                output_dir.display(),
                e
            ))
        })?;
        Ok(Self { output_dir })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// `{first}_{last}_{company}_{role}_{lang}.pdf`, absent parts skipped.
    pub fn generate_path(
        &self,
        first_name: Option<&str>,
        last_name: Option<&str>,
        company: &str,
        role: Option<&str>,
        language_code: Option<&str>,
    ) -> PathBuf {
        let mut parts: Vec<String> = Vec::new();
        for part in [first_name, last_name, Some(company), role].into_iter().flatten() {
            let part = sanitize_filename(part);
            if !part.is_empty() {
                parts.push(part);
            }
        }
        parts.push(language_suffix(language_code));
        self.output_dir.join(format!("{}.pdf", parts.join("_")))
    }

    /// `debug_{company}_{role}/` inside the output folder, created if needed.
    pub fn generate_debug_dir(&self, company: &str, role: Option<&str>) -> Result<PathBuf, PipelineError> {
        let mut parts = vec!["debug".to_string(), sanitize_filename(company)];
        if let Some(role) = role {
            parts.push(sanitize_filename(role));
        }
        let dir = self.output_dir.join(parts.join("_"));
        fs::create_dir_all(&dir).map_err(|e| {
            PipelineError::Storage(format!("failed to create {}: {}", dir.display(), e))
        })?;
        Ok(dir)
    }

    /// Every `*.pdf` directly in the output folder, newest first.
    pub fn list_all(&self) -> Vec<StoredDocument> {
        let mut records: Vec<StoredDocument> = WalkDir::new(&self.output_dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Skipping unreadable entry in {}: {}", self.output_dir.display(), e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| {
                entry
                    .path()
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
            })
            .filter_map(|entry| {
                let modified = entry.metadata().ok()?.modified().ok()?;
                Some(parse_document_name(entry.path(), DateTime::<Local>::from(modified)))
            })
            .collect();

        records.sort_by(|a, b| b.modified.cmp(&a.modified));
        records
    }
}

impl DocumentStore for PdfStorage {
    fn store(
        &self,
        document: &[u8],
        base_name: &str,
        language_code: Option<&str>,
    ) -> Result<PathBuf, PipelineError> {
        let base = sanitize_filename(base_name);
        if base.is_empty() {
            return Err(PipelineError::Storage(format!(
                "base name '{}' has no usable characters",
                base_name
            )));
        }

        let path = self
            .output_dir
            .join(format!("{}_{}.pdf", base, language_suffix(language_code)));
        fs::write(&path, document)
            .map_err(|e| PipelineError::Storage(format!("failed to write {}: {}", path.display(), e)))?;
        debug!("Stored {} bytes at {}", document.len(), path.display());
        Ok(path)
    }
}

fn language_suffix(language_code: Option<&str>) -> String {
    language_code
        .map(sanitize_filename)
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| DEFAULT_LANGUAGE_CODE.to_string())
}

/// Heuristic split of `first_last_company_role_lang`: 4+ parts are read
/// as name, company and role; 2-3 as company and role.
fn parse_document_name(path: &Path, modified: DateTime<Local>) -> StoredDocument {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let mut parts: Vec<&str> = stem.split('_').filter(|p| !p.is_empty()).collect();

    // Stored names always end in a 2-letter code; 3-letter tokens like
    // "swe" are role abbreviations
    let has_language = parts.len() > 1
        && parts.last().is_some_and(|last| {
            last.len() == 2
                && last.chars().all(|c| c.is_ascii_alphabetic())
                && validate_language_code(last).is_ok()
        });
    let language_code = if has_language {
        parts.pop().map(str::to_string)
    } else {
        None
    };

    let title = |words: &[&str]| words.iter().map(|w| title_case(w)).collect::<Vec<_>>().join(" ");

    let (first_name, last_name, company, job_title) = match parts.len() {
        n if n >= 4 => (
            Some(title_case(parts[0])),
            Some(title_case(parts[1])),
            title(&parts[2..n - 1]),
            title_case(parts[n - 1]),
        ),
        n if n >= 2 => (None, None, title(&parts[..n - 1]), title_case(parts[n - 1])),
        1 => (None, None, title_case(parts[0]), "Unknown".to_string()),
        _ => (None, None, "Unknown".to_string(), "Unknown".to_string()),
    };

    StoredDocument {
        path: path.to_path_buf(),
        first_name,
        last_name,
        company,
        job_title,
        language_code,
        modified,
    }
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
