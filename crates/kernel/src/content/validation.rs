//! Submission validation for blog posts.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::sanitize::{SanitizationPolicy, sanitize};

pub const TITLE_MIN_CHARS: usize = 4;
pub const BUILDER_TITLE_MAX_CHARS: usize = 32;
pub const QUICK_TITLE_MAX_CHARS: usize = 100;
pub const BODY_MIN_CHARS: usize = 20;
pub const BODY_MAX_CHARS: usize = 20_000;

/// Wire name of the title field.
pub const TITLE_FIELD: &str = "blogTitle";
/// Wire name of the body field.
pub const BODY_FIELD: &str = "blogPost";

/// The form a post was submitted through.
///
/// Each entry point fixes its title limit and its sanitization policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryPoint {
    /// Full editor with embeds and inline styles.
    #[default]
    Builder,
    /// Plain quick-post form.
    Quick,
}

impl EntryPoint {
    pub fn as_str(self) -> &'static str {
        match self {
            EntryPoint::Builder => "builder",
            EntryPoint::Quick => "quick",
        }
    }

    pub fn title_max_chars(self) -> usize {
        match self {
            EntryPoint::Builder => BUILDER_TITLE_MAX_CHARS,
            EntryPoint::Quick => QUICK_TITLE_MAX_CHARS,
        }
    }

    pub fn sanitization_policy(self) -> SanitizationPolicy {
        match self {
            EntryPoint::Builder => SanitizationPolicy::Extended,
            EntryPoint::Quick => SanitizationPolicy::Default,
        }
    }
}

impl fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-field validation messages, keyed by wire field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, String>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message for `field`. The first message per field wins.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_insert_with(|| message.into());
    }

    /// Errors for a submission that omitted `field` entirely.
    ///
    /// Title and body report the same message as an empty value.
    pub fn missing(field: &str) -> Self {
        let mut errors = Self::new();
        match field {
            TITLE_FIELD => validate_title(EntryPoint::default(), "", &mut errors),
            BODY_FIELD => validate_body("", &mut errors),
            other => errors.add(other, "This field is required"),
        }
        errors
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// A submission that passed validation, with its body sanitized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedPost {
    pub title: String,
    pub body: String,
}

/// Validate a title against the entry point's limits.
pub fn validate_title(entry: EntryPoint, title: &str, errors: &mut ValidationErrors) {
    let len = title.trim().chars().count();
    let max = entry.title_max_chars();

    if len < TITLE_MIN_CHARS {
        errors.add(
            TITLE_FIELD,
            format!("Title must be at least {TITLE_MIN_CHARS} characters"),
        );
    } else if len > max {
        errors.add(TITLE_FIELD, format!("Title must be less than {max} characters"));
    }
}

/// Validate a body's length. Length is counted in characters after trimming.
pub fn validate_body(body: &str, errors: &mut ValidationErrors) {
    let len = body.trim().chars().count();

    if len < BODY_MIN_CHARS {
        errors.add(
            BODY_FIELD,
            format!("Blog post must be at least {BODY_MIN_CHARS} characters"),
        );
    } else if len > BODY_MAX_CHARS {
        errors.add(
            BODY_FIELD,
            format!("Blog post must be at most {BODY_MAX_CHARS} characters"),
        );
    }
}

/// Validate a submission and sanitize its body under the entry point's policy.
///
/// The body is checked both before and after sanitizing, so the stored HTML
/// always respects the length limits.
pub fn prepare_post(
    entry: EntryPoint,
    title: &str,
    body: &str,
) -> Result<ValidatedPost, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    validate_title(entry, title, &mut errors);
    validate_body(body, &mut errors);
    if !errors.is_empty() {
        return Err(errors);
    }

    let clean = sanitize(body.trim(), entry.sanitization_policy());
    validate_body(&clean, &mut errors);
    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(ValidatedPost {
        title: title.trim().to_string(),
        body: clean.trim().to_string(),
    })
}
