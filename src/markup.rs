/*!
 * Lightweight inspection of resume HTML.
 *
 * Translation must keep the tag structure of the resume verbatim and only
 * change text nodes. The helpers here extract the tag skeleton, the visible
 * text and the terms that must survive translation untouched, so reviewers
 * can check a candidate without a full HTML parser.
 */

use once_cell::sync::Lazy;
use regex::Regex;

static COMMENT_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").expect("Invalid comment regex"));

static TAG_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<\s*(/)?\s*([a-zA-Z][a-zA-Z0-9-]*)([^>]*)>").expect("Invalid tag regex")
});

static ATTR_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([a-zA-Z_:][-a-zA-Z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
        .expect("Invalid attribute regex")
});

static URL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"https?://[^\s<>"']+"#).expect("Invalid URL regex"));

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("Invalid email regex")
});

static WHITESPACE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("Invalid whitespace regex"));

/// Elements that never have a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Attributes whose values are structural and must not be translated.
/// `alt` and `title` carry human text and are intentionally absent.
const STRUCTURAL_ATTRIBUTES: &[&str] = &["class", "id", "href", "src", "style", "colspan", "rowspan"];

/// Technical and proper terms that stay in English in every target language.
pub const DEFAULT_PRESERVED_TERMS: &[&str] = &[
    "Python", "Rust", "Java", "JavaScript", "TypeScript", "Go", "C++", "C#", "Kotlin", "Swift",
    "SQL", "PostgreSQL", "MySQL", "MongoDB", "Redis", "Kafka", "React", "Angular", "Vue",
    "Node.js", "Django", "Flask", "FastAPI", "Spring", "Docker", "Kubernetes", "Terraform",
    "AWS", "GCP", "Azure", "Linux", "Git", "GitHub", "GitLab", "CI/CD", "REST", "GraphQL",
    "gRPC", "PMP", "Scrum", "Jira",
];

/// One opening or closing tag with its structural attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagToken {
    pub name: String,
    pub closing: bool,
    pub attributes: Vec<(String, String)>,
}

impl std::fmt::Display for TagToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.closing {
            return write!(f, "</{}>", self.name);
        }
        write!(f, "<{}", self.name)?;
        for (name, value) in &self.attributes {
            write!(f, " {}=\"{}\"", name, value)?;
        }
        write!(f, ">")
    }
}

/// Result of comparing two tag skeletons.
#[derive(Debug, Clone, PartialEq)]
pub struct StructureReport {
    /// Whether both skeletons are identical
    pub matches: bool,
    pub source_tags: usize,
    pub candidate_tags: usize,
    /// Index of the first differing tag, if any
    pub first_divergence: Option<usize>,
    /// Human readable description of the divergence
    pub detail: Option<String>,
}

/// Extract the ordered tag skeleton of an HTML fragment.
pub fn tag_skeleton(html: &str) -> Vec<TagToken> {
    let cleaned = COMMENT_REGEX.replace_all(html, "");
    TAG_REGEX
        .captures_iter(&cleaned)
        .map(|cap| {
            let name = cap[2].to_lowercase();
            let closing = cap.get(1).is_some();
            let mut attributes: Vec<(String, String)> = cap
                .get(3)
                .map(|raw| {
                    ATTR_REGEX
                        .captures_iter(raw.as_str())
                        .filter_map(|a| {
                            let attr = a[1].to_lowercase();
                            if !STRUCTURAL_ATTRIBUTES.contains(&attr.as_str()) {
                                return None;
                            }
                            let value = a
                                .get(2)
                                .or_else(|| a.get(3))
                                .map(|m| m.as_str().trim().to_string())
                                .unwrap_or_default();
                            Some((attr, value))
                        })
                        .collect()
                })
                .unwrap_or_default();
            attributes.sort();
            TagToken {
                name,
                closing,
                attributes,
            }
        })
        .collect()
}

/// Compare the tag skeleton of a candidate against its source.
pub fn compare_structure(source: &str, candidate: &str) -> StructureReport {
    let expected = tag_skeleton(source);
    let actual = tag_skeleton(candidate);

    let first_divergence = expected
        .iter()
        .zip(actual.iter())
        .position(|(a, b)| a != b)
        .or_else(|| (expected.len() != actual.len()).then(|| expected.len().min(actual.len())));

    let detail = first_divergence.map(|i| {
        match (expected.get(i), actual.get(i)) {
            (Some(e), Some(a)) => format!("tag {} differs: expected {} but found {}", i + 1, e, a),
            (Some(e), None) => format!("candidate is missing {} and {} later tag(s)", e, expected.len() - i - 1),
            (None, Some(a)) => format!("candidate adds {} and {} later tag(s)", a, actual.len() - i - 1),
            (None, None) => "tag skeletons differ".to_string(),
        }
    });

    StructureReport {
        matches: first_divergence.is_none(),
        source_tags: expected.len(),
        candidate_tags: actual.len(),
        first_divergence,
        detail,
    }
}

/// Whether every non-void element is closed in order.
pub fn is_balanced(html: &str) -> bool {
    let mut stack: Vec<String> = Vec::new();
    let cleaned = COMMENT_REGEX.replace_all(html, "");
    for cap in TAG_REGEX.captures_iter(&cleaned) {
        let name = cap[2].to_lowercase();
        let self_closing = cap.get(3).is_some_and(|raw| raw.as_str().trim_end().ends_with('/'));
        if VOID_ELEMENTS.contains(&name.as_str()) || self_closing {
            continue;
        }
        if cap.get(1).is_some() {
            if stack.pop().as_deref() != Some(name.as_str()) {
                return false;
            }
        } else {
            stack.push(name);
        }
    }
    stack.is_empty()
}

/// Text content between tags, one entry per non-blank text node.
pub fn text_nodes(html: &str) -> Vec<String> {
    let cleaned = COMMENT_REGEX.replace_all(html, "");
    TAG_REGEX
        .split(&cleaned)
        .map(|t| WHITESPACE_REGEX.replace_all(&decode_entities(t), " ").trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// All visible text joined by single spaces.
pub fn visible_text(html: &str) -> String {
    text_nodes(html).join(" ")
}

/// Terms from `known` plus every URL and e-mail address that occur in the
/// visible text of `html`, in first-occurrence order without duplicates.
pub fn protected_terms(html: &str, known: &[&str]) -> Vec<String> {
    let text = visible_text(html);
    let mut found: Vec<(usize, String)> = Vec::new();

    for term in known {
        if let Some(pos) = find_term(&text, term) {
            found.push((pos, term.to_string()));
        }
    }
    for m in URL_REGEX.find_iter(&text).chain(EMAIL_REGEX.find_iter(&text)) {
        found.push((m.start(), m.as_str().trim_end_matches(['.', ',']).to_string()));
    }

    found.sort_by_key(|(pos, _)| *pos);
    let mut terms: Vec<String> = Vec::new();
    for (_, term) in found {
        if !terms.contains(&term) {
            terms.push(term);
        }
    }
    terms
}

/// Protected terms of `source` that no longer appear in `candidate`.
pub fn missing_terms(source: &str, candidate: &str, known: &[&str]) -> Vec<String> {
    let candidate_text = visible_text(candidate);
    protected_terms(source, known)
        .into_iter()
        .filter(|term| find_term(&candidate_text, term).is_none())
        .collect()
}

/// Find `term` in `text` as a whole word (neighbours are not alphanumeric).
fn find_term(text: &str, term: &str) -> Option<usize> {
    if term.is_empty() {
        return None;
    }
    text.match_indices(term).map(|(i, _)| i).find(|&i| {
        let before = text[..i].chars().next_back();
        let after = text[i + term.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
