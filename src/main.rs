// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};

use cvlingo::app_config::{self, Config, TranslationProvider};
use cvlingo::language::LanguageRegistry;
use cvlingo::pipeline::{DocumentRenderer, HtmlRenderer, PipelineCoordinator};
use cvlingo::providers::create_provider;
use cvlingo::storage::PdfStorage;
use cvlingo::translation::TransitionEvent;
use cvlingo::{JobPosting, ResumeArtifact};

/// CLI Wrapper for TranslationProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliTranslationProvider {
    OpenAI,
    Anthropic,
    LMStudio,
}

impl From<CliTranslationProvider> for TranslationProvider {
    fn from(cli_provider: CliTranslationProvider) -> Self {
        match cli_provider {
            CliTranslationProvider::OpenAI => TranslationProvider::OpenAI,
            CliTranslationProvider::Anthropic => TranslationProvider::Anthropic,
            CliTranslationProvider::LMStudio => TranslationProvider::LMStudio,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate an approved HTML resume and store the rendered document
    Translate(TranslateArgs),

    /// List the supported output languages
    Languages {
        /// Configuration file path
        #[arg(short, long, default_value = "conf.json")]
        config_path: String,
    },

    /// List documents stored in the output folder, newest first
    List {
        /// Configuration file path
        #[arg(short, long, default_value = "conf.json")]
        config_path: String,
    },

    /// Generate shell completions for cvlingo
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct TranslateArgs {
    /// Approved resume body (HTML)
    #[arg(value_name = "HTML_FILE")]
    html_file: PathBuf,

    /// Target language code (e.g., 'ru', 'de'); 'none' keeps the source language
    #[arg(short, long)]
    target_language: Option<String>,

    /// Language of the input resume, defaults to the configured default language
    #[arg(short, long)]
    source_language: Option<String>,

    /// Base name of the stored document, defaults to the input file stem
    #[arg(short, long)]
    base_name: Option<String>,

    /// Job title, used as context for translation and review
    #[arg(long)]
    job_title: Option<String>,

    /// Company name, used as context for translation and review
    #[arg(long)]
    company: Option<String>,

    /// Job keywords, comma separated, most relevant first
    #[arg(long, value_delimiter = ',')]
    keywords: Vec<String>,

    /// Translation provider to use
    #[arg(short, long, value_enum)]
    provider: Option<CliTranslationProvider>,

    /// Model name to use for translation and review
    #[arg(short, long)]
    model: Option<String>,

    /// Output folder for rendered documents
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,

    /// Print the translated HTML document instead of rendering and storing it
    #[arg(long)]
    no_render: bool,
}

/// cvlingo - Resume translation with AI review
///
/// Translates an approved resume into another language, reviews every
/// candidate with a second model call and retries with the reviewer's
/// feedback until a candidate passes or the attempt budget runs out.
#[derive(Parser, Debug)]
#[command(name = "cvlingo")]
#[command(version = "1.0.0")]
#[command(about = "AI-powered resume translation with quality review")]
#[command(long_about = "cvlingo translates an approved HTML resume and renders it to PDF.

EXAMPLES:
    cvlingo translate resume.html -t ru                      # Translate to Russian
    cvlingo translate resume.html -t de --company Acme \\
        --job-title 'Backend Engineer' --keywords rust,tokio  # With job context
    cvlingo translate resume.html -t ru --no-render          # Keep HTML output
    cvlingo languages                                         # Supported languages
    cvlingo list                                              # Stored documents
    cvlingo completions bash > cvlingo.bash                  # Shell completions

CONFIGURATION:
    Configuration is stored in conf.json by default. If the file doesn't exist,
    a default one is created. DEFAULT_LANGUAGE, TRANSLATION_MAX_ITERATIONS,
    TRANSLATION_PROVIDER, ANTHROPIC_API_KEY and OPENAI_API_KEY from the
    environment or a .env file override it.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color code for log level
    fn get_color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "1;31",
            Level::Warn => "1;33",
            Level::Info => "1;32",
            Level::Debug => "1;36",
            Level::Trace => "1;35",
        }
    }

    // @returns: Emoji for log level
    fn get_emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌ ",
            Level::Warn => "🚧 ",
            Level::Info => " ",
            Level::Debug => "🔍 ",
            Level::Trace => "📋 ",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "\x1B[{}m{} {} {}\x1B[0m",
                Self::get_color_for_level(record.level()),
                now,
                Self::get_emoji_for_level(record.level()),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Trace is the ceiling; the effective level is set after loading config
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    match cli.command {
        Commands::Translate(args) => run_translate(args).await,
        Commands::Languages { config_path } => {
            let config = load_config(&config_path, None)?;
            let registry = build_registry(&config)?;
            for language in registry.list() {
                let marker = if language == registry.default_language() { " (default)" } else { "" };
                println!("{}  {} / {}{}", language.code(), language.english_name(), language.native_name(), marker);
            }
            Ok(())
        }
        Commands::List { config_path } => {
            let config = load_config(&config_path, None)?;
            let storage = PdfStorage::new(&config.output_dir)?;
            for doc in storage.list_all() {
                println!(
                    "{}  {} / {}  [{}]  {}",
                    doc.modified.format("%Y-%m-%d %H:%M"),
                    doc.company,
                    doc.job_title,
                    doc.language_code.as_deref().unwrap_or("?"),
                    doc.path.display()
                );
            }
            Ok(())
        }
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "cvlingo", &mut std::io::stdout());
            Ok(())
        }
    }
}

/// Load the config file, creating a default one when it is missing.
fn load_config(config_path: &str, log_level: Option<&CliLogLevel>) -> Result<Config> {
    let path = Path::new(config_path);
    if !path.exists() {
        warn!("Config file not found at '{}', creating default config.", config_path);
        Config::default()
            .save(path)
            .context("Failed to write default config")?;
    }

    let mut config = Config::load(path)?;
    if let Some(level) = log_level {
        config.log_level = level.clone().into();
    }
    log::set_max_level(config.log_level.to_level_filter());
    Ok(config)
}

/// Built-in languages plus the configured extra and default languages.
fn build_registry(config: &Config) -> Result<LanguageRegistry> {
    Ok(LanguageRegistry::extended(&config.extra_languages, &config.default_language)?)
}

fn spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.green} [{elapsed_precise}] {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    spinner.set_style(style);
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}

async fn run_translate(options: TranslateArgs) -> Result<()> {
    let mut config = load_config(&options.config_path, options.log_level.as_ref())?;

    if let Some(provider) = &options.provider {
        config.translation.provider = provider.clone().into();
    }
    if let Some(model) = &options.model {
        let provider = config.translation.provider.clone();
        config.translation.provider_config_mut(provider).model = model.clone();
    }
    if let Some(dir) = &options.output_dir {
        config.output_dir = dir.clone();
    }

    config.validate().context("Configuration validation failed")?;

    let html = std::fs::read_to_string(&options.html_file)
        .with_context(|| format!("Failed to read resume: {}", options.html_file.display()))?;
    let source_language = options
        .source_language
        .clone()
        .unwrap_or_else(|| config.default_language.clone());
    let artifact = ResumeArtifact::new(html, source_language);
    if artifact.is_blank() {
        return Err(anyhow!("Resume is empty: {}", options.html_file.display()));
    }

    let job = match (&options.job_title, &options.company) {
        (None, None) => None,
        (title, company) => Some(
            JobPosting::new(
                title.clone().unwrap_or_default(),
                company.clone().unwrap_or_default(),
            )
            .with_keywords(options.keywords.iter().map(|k| k.trim().to_string())),
        ),
    };

    let base_name = match &options.base_name {
        Some(name) => name.clone(),
        None => options
            .html_file
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .ok_or_else(|| anyhow!("Cannot derive a base name from {}", options.html_file.display()))?,
    };

    info!(
        "cvlingo: {} - {}",
        config.translation.provider.display_name(),
        config.translation.get_model()
    );

    let registry = Arc::new(build_registry(&config)?);
    let provider = create_provider(&config.translation);
    let coordinator = PipelineCoordinator::from_config(&config, registry, provider)?;

    let progress = spinner();
    let observer = {
        let progress = progress.clone();
        move |event: &TransitionEvent| progress.set_message(event.status_message())
    };

    let result = coordinator
        .translate_existing(&artifact, options.target_language.as_deref(), job.as_ref(), &observer)
        .await;

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            progress.abandon_with_message("Translation failed");
            if e.is_retryable_later() {
                error!("{}. The service is temporarily unavailable, please try again later.", e);
            }
            return Err(e.into());
        }
    };
    progress.finish_and_clear();

    if outcome.is_best_effort() {
        warn!(
            "No {} translation passed review after {} attempts, keeping the best effort (score {:.2})",
            outcome.language_code,
            outcome.attempts,
            outcome.final_score().unwrap_or(0.0)
        );
    } else if outcome.is_translated() {
        info!(
            "Translation accepted after {} attempt(s) (score {:.2})",
            outcome.attempts,
            outcome.final_score().unwrap_or(0.0)
        );
    }

    if options.no_render {
        let document = HtmlRenderer.render(&outcome.artifact).await?;
        std::io::stdout().write_all(&document)?;
        return Ok(());
    }

    let path = coordinator.publish(&outcome, &base_name).await?;
    info!("Success: {}", path.display());

    Ok(())
}
