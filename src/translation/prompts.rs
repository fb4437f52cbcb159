/*!
 * Prompt templates for resume translation and translation review.
 *
 * Both templates ask for structured JSON output. Placeholders:
 * `{language_english}`, `{language_native}`, `{source_language}` and, for the
 * reviewer, `{pass_threshold}`.
 */

use crate::artifact::ResumeArtifact;
use crate::language::{get_language_name, Language};
use crate::translation::translator::{DraftFeedback, Glossary, TranslationTask};

/// Number of job keywords given to the translator as terminology context
pub const TRANSLATOR_KEYWORD_LIMIT: usize = 15;

/// Number of job keywords given to the reviewer as field context
pub const REVIEWER_KEYWORD_LIMIT: usize = 10;

/// System prompt template with language placeholders.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    /// The default system prompt for resume translation.
    pub const RESUME_TRANSLATOR: &'static str = r#"You are a professional resume translator specializing in {language_english} ({language_native}).

Your task: translate the HTML resume body from {source_language} to {language_english}.

## Critical Rules
- Preserve ALL HTML tags, CSS classes, attributes and structure exactly as they are
- Translate ONLY the visible text between HTML tags
- Do not add, remove or modify any tag or class
- The output must be valid HTML with a structure identical to the input

## Translation Quality
- Use the professional terminology of the {language_english} job market for this field
- Write as a native {language_english} speaker would, not as a machine translation
- Keep a formal resume tone appropriate for {language_english}-language resumes
- Prefer natural phrasing over literal word-for-word translation

## Preserve Unchanged
- Company names, product names and brand names
- Certifications and their abbreviations (AWS, PMP...)
- Programming languages, frameworks and tools (Python, React, Docker...)
- Numbers, dates, percentages and metrics
- URLs, e-mail addresses and links
- The person's name

## Technical Terms
- Keep English technical terms that are standard in the {language_english}-speaking professional community
- Use accepted {language_english} equivalents where they are common
- When in doubt, keep the English term

## Output Requirements
- Return ONLY valid JSON: {"html": "...", "changes": ["..."]}
- `changes` lists notable translation decisions"#;

    /// The default system prompt for translation review.
    pub const TRANSLATION_REVIEWER: &'static str = r#"You are a bilingual resume quality reviewer fluent in {source_language} and {language_english} ({language_native}).

Your task: review a resume translation from {source_language} to {language_english}.

## Evaluation Criteria
1. Terminology (most important): correct professional terms for the field, no awkward literal translations, technical terms kept in English when standard
2. Naturalness: reads like a native {language_english} speaker wrote it, professional tone throughout
3. Completeness: no content lost or added, numbers, dates and metrics preserved exactly
4. Consistency: the same term for the same concept, one register across all sections
5. Grammar: correct {language_english} grammar and punctuation in resume style
6. Structure: all HTML tags and CSS classes preserved intact

## Scoring
- 1.0: perfect, natural, accurate and professional
- 0.8-0.99: minor issues, small phrasing improvements possible
- 0.6-0.79: noticeable issues, awkward phrasing, wrong terms or missing content
- 0.4-0.59: significant problems, multiple wrong terms
- 0.0-0.39: poor quality, reads like machine translation

Set passed=true only if score >= {pass_threshold}.

## Output Requirements
Return ONLY valid JSON:
{"passed": bool, "score": 0.0-1.0, "issues": [{"category": "terminology|naturalness|completeness|consistency|grammar|structure", "description": "..."}], "suggestions": ["..."], "reasoning": "..."}
Quote the problematic text in each issue and suggest a correction."#;

    pub fn new(template: &str) -> Self {
        Self {
            template: template.to_string(),
        }
    }

    pub fn resume_translator() -> Self {
        Self::new(Self::RESUME_TRANSLATOR)
    }

    pub fn translation_reviewer() -> Self {
        Self::new(Self::TRANSLATION_REVIEWER)
    }

    /// Render the template for a source language name and a target.
    pub fn render(&self, source_language: &str, target: &Language) -> String {
        self.template
            .replace("{language_english}", target.english_name())
            .replace("{language_native}", target.native_name())
            .replace("{source_language}", source_language)
    }
}

/// English name of the artifact's language, falling back to its code.
pub fn source_language_name(artifact: &ResumeArtifact) -> String {
    get_language_name(&artifact.language_code).unwrap_or_else(|_| artifact.language_code.clone())
}

fn current_date_line() -> String {
    format!("Today's date: {}", chrono::Local::now().format("%B %Y"))
}

fn job_context(task: &TranslationTask<'_>, keyword_limit: usize, keyword_label: &str) -> String {
    match task.job {
        Some(job) => {
            let mut context = format!("- Title: {}\n- Company: {}\n", job.title, job.company);
            let keywords = job.keyword_summary(keyword_limit);
            if !keywords.is_empty() {
                context.push_str(&format!("- {}: {}\n", keyword_label, keywords));
            }
            context
        }
        None => "- No job posting provided\n".to_string(),
    }
}

/// Builder for the translator's prompts.
#[derive(Debug)]
pub struct TranslationPromptBuilder<'a> {
    task: &'a TranslationTask<'a>,
    glossary: Option<&'a Glossary>,
    feedback: Option<&'a DraftFeedback>,
}

impl<'a> TranslationPromptBuilder<'a> {
    pub fn new(task: &'a TranslationTask<'a>) -> Self {
        Self {
            task,
            glossary: None,
            feedback: None,
        }
    }

    pub fn with_glossary(mut self, glossary: &'a Glossary) -> Self {
        self.glossary = Some(glossary);
        self
    }

    pub fn with_feedback(mut self, feedback: Option<&'a DraftFeedback>) -> Self {
        self.feedback = feedback;
        self
    }

    pub fn build_system_prompt(&self) -> String {
        let source = source_language_name(self.task.source);
        format!(
            "{}\n\n{}",
            PromptTemplate::resume_translator().render(&source, self.task.target),
            current_date_line()
        )
    }

    pub fn build_user_prompt(&self) -> String {
        let source = source_language_name(self.task.source);
        let target = self.task.target.english_name();

        let mut prompt = format!(
            "Translate this resume HTML from {} to {}.\n\n## Job Context (for terminology):\n{}",
            source,
            target,
            job_context(self.task, TRANSLATOR_KEYWORD_LIMIT, "Field keywords")
        );

        if let Some(glossary) = self.glossary.filter(|g| !g.is_empty()) {
            prompt.push_str("\n## Glossary:\n");
            prompt.push_str(&glossary.render());
        }

        prompt.push_str(&format!(
            "\n## {} HTML to translate:\n{}\n",
            source, self.task.source.html
        ));

        if let Some(feedback) = self.feedback {
            prompt.push_str(&format!(
                "\n## Previous {} translation:\n{}\n\n## Reviewer Feedback (fix these issues):\n{}\n\n\
                 IMPORTANT: Revise the previous translation rather than starting over. \
                 Address all reviewer concerns while keeping the translation natural and professional.\n",
                target, feedback.previous_html, feedback.notes
            ));
        }

        prompt.push_str(
            "\nReturn JSON with:\n\
             - html: The translated HTML body (same structure, translated text)\n\
             - changes: List of notable translation decisions (e.g. \"Kept 'Machine Learning' in English as standard term\")\n",
        );
        prompt
    }

    pub fn build(&self) -> (String, String) {
        (self.build_system_prompt(), self.build_user_prompt())
    }
}

/// Builder for the reviewer's prompts.
#[derive(Debug)]
pub struct ReviewPromptBuilder<'a> {
    task: &'a TranslationTask<'a>,
    candidate: &'a ResumeArtifact,
    pass_threshold: f32,
}

impl<'a> ReviewPromptBuilder<'a> {
    pub fn new(task: &'a TranslationTask<'a>, candidate: &'a ResumeArtifact) -> Self {
        Self {
            task,
            candidate,
            pass_threshold: 0.8,
        }
    }

    pub fn with_threshold(mut self, pass_threshold: f32) -> Self {
        self.pass_threshold = pass_threshold;
        self
    }

    pub fn build_system_prompt(&self) -> String {
        let source = source_language_name(self.task.source);
        let rendered = PromptTemplate::translation_reviewer()
            .render(&source, self.task.target)
            .replace("{pass_threshold}", &format!("{:.2}", self.pass_threshold));
        format!("{}\n\n{}", rendered, current_date_line())
    }

    pub fn build_user_prompt(&self) -> String {
        let source = source_language_name(self.task.source);
        let target = self.task.target.english_name();
        format!(
            "Review this resume translation from {source} to {target}.\n\n\
             ## Job Context:\n{context}\n\
             ## Original {source} HTML:\n{original}\n\n\
             ## Translated {target} HTML:\n{translated}\n\n\
             Evaluate the translation quality. Be specific about any issues.\n\
             Focus especially on:\n\
             - Are professional terms correct for this industry in {target}?\n\
             - Does it read naturally, like a native speaker wrote it?\n\
             - Is all content preserved?\n",
            context = job_context(self.task, REVIEWER_KEYWORD_LIMIT, "Field"),
            original = self.task.source.html,
            translated = self.candidate.html,
        )
    }

    pub fn build(&self) -> (String, String) {
        (self.build_system_prompt(), self.build_user_prompt())
    }
}
