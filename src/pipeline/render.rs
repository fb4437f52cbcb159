/*!
 * Rendering of final artifacts into documents.
 *
 * The rendering engine itself is external: `CommandRenderer` wraps the
 * resume body in a minimal HTML document and hands it to an HTML-to-PDF
 * program (WeasyPrint by default).
 */

use std::io::Write;
use std::process::Stdio;

use async_trait::async_trait;
use bytes::Bytes;
use log::debug;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::artifact::ResumeArtifact;
use crate::errors::PipelineError;

/// Argument placeholder replaced with the path of a temporary HTML file.
/// Without it the document is piped to the program's stdin.
pub const INPUT_PLACEHOLDER: &str = "{input}";

/// Turns an artifact into document bytes.
#[async_trait]
pub trait DocumentRenderer: Send + Sync {
    async fn render(&self, artifact: &ResumeArtifact) -> Result<Bytes, PipelineError>;
}

/// Complete HTML document for an artifact body, tagged with its language.
pub fn wrap_document(artifact: &ResumeArtifact, title: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"{}\">\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>\n{}\n</body>\n</html>\n",
        artifact.language_code, title, artifact.html
    )
}

/// Renderer returning the wrapped HTML itself.
#[derive(Debug, Clone, Default)]
pub struct HtmlRenderer;

#[async_trait]
impl DocumentRenderer for HtmlRenderer {
    async fn render(&self, artifact: &ResumeArtifact) -> Result<Bytes, PipelineError> {
        Ok(Bytes::from(wrap_document(artifact, "Resume")))
    }
}

/// Renderer delegating to an external program that writes the document
/// to stdout.
#[derive(Debug, Clone)]
pub struct CommandRenderer {
    program: String,
    args: Vec<String>,
    title: String,
}

impl CommandRenderer {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            title: "Resume".to_string(),
        }
    }

    /// Build from a full command line, first element being the program.
    pub fn from_command(command: &[String]) -> Result<Self, PipelineError> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| PipelineError::Config("render command is empty".to_string()))?;
        Ok(Self::new(program.clone(), args.to_vec()))
    }

    /// `weasyprint - -`
    pub fn weasyprint() -> Self {
        Self::new("weasyprint", vec!["-".to_string(), "-".to_string()])
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }
}

#[async_trait]
impl DocumentRenderer for CommandRenderer {
    async fn render(&self, artifact: &ResumeArtifact) -> Result<Bytes, PipelineError> {
        let document = wrap_document(artifact, &self.title);
        let uses_file = self.args.iter().any(|a| a == INPUT_PLACEHOLDER);

        // Kept alive until the program has exited
        let input_file = if uses_file {
            let mut file = tempfile::Builder::new()
                .suffix(".html")
                .tempfile()
                .map_err(|e| PipelineError::Render(format!("failed to create temp file: {}", e)))?;
            file.write_all(document.as_bytes())
                .map_err(|e| PipelineError::Render(format!("failed to write temp file: {}", e)))?;
            Some(file)
        } else {
            None
        };

        let args: Vec<String> = match &input_file {
            Some(file) => {
                let path = file.path().to_string_lossy().to_string();
                self.args
                    .iter()
                    .map(|a| if a == INPUT_PLACEHOLDER { path.clone() } else { a.clone() })
                    .collect()
            }
            None => self.args.clone(),
        };

        debug!("Rendering {} document with {}", artifact.language_code, self.program);
        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(if uses_file { Stdio::null() } else { Stdio::piped() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| PipelineError::Render(format!("failed to start {}: {}", self.program, e)))?;

        // stdin is fed while stdout drains; dropping it signals EOF
        let stdin = child.stdin.take();
        let input = document.as_bytes();
        let feed_input = async move {
            match stdin {
                Some(mut stdin) => stdin.write_all(input).await,
                None => Ok(()),
            }
        };
        let (written, output) = tokio::join!(feed_input, child.wait_with_output());

        let output = output
            .map_err(|e| PipelineError::Render(format!("{} did not finish: {}", self.program, e)))?;

        if !output.status.success() {
            return Err(PipelineError::Render(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        written
            .map_err(|e| PipelineError::Render(format!("failed to write to {}: {}", self.program, e)))?;
        if output.stdout.is_empty() {
            return Err(PipelineError::Render(format!("{} produced no output", self.program)));
        }

        Ok(Bytes::from(output.stdout))
    }
}
