//! Blog content pipeline: submission validation and HTML sanitization.

pub mod sanitize;
pub mod validation;

pub use sanitize::{PolicyRules, SanitizationPolicy, filter_style, sanitize};
pub use validation::{
    BODY_FIELD, BODY_MAX_CHARS, BODY_MIN_CHARS, BUILDER_TITLE_MAX_CHARS, EntryPoint,
    QUICK_TITLE_MAX_CHARS, TITLE_FIELD, TITLE_MIN_CHARS, ValidatedPost, ValidationErrors,
    prepare_post, validate_body, validate_title,
};
