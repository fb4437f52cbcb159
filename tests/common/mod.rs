/*!
 * Common test utilities for the cvlingo test suite
 */

use std::path::{Path, PathBuf};
use std::fs;
use anyhow::Result;
use tempfile::TempDir;

use cvlingo::artifact::{JobPosting, ResumeArtifact, ResumeSource};


/// Route library logs to the test harness; repeated calls are ignored
pub fn init_test_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

pub const SAMPLE_RESUME_HTML: &str = r#"<section class="summary"><h1>Jane Doe</h1><p>Backend engineer with 8 years of Rust and Kubernetes experience.</p></section><section class="experience"><h2>Experience</h2><ul><li>Led a team of 5 at Acme building PostgreSQL tooling</li></ul></section>"#;

/// Approved English resume body
pub fn sample_artifact() -> ResumeArtifact {
    ResumeArtifact::new(SAMPLE_RESUME_HTML, "en").with_source_checksum("fixture")
}

pub fn sample_source() -> ResumeSource {
    ResumeSource::new("Jane Doe\nBackend engineer, 8 years Rust, Kubernetes, PostgreSQL")
}

pub fn sample_job() -> JobPosting {
    JobPosting::new("Senior Backend Engineer", "Acme")
        .with_keywords(["rust", "kubernetes", "postgresql"])
}
