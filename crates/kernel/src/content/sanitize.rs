//! HTML sanitization for user-authored rich text.
//!
//! Every write path names a [`SanitizationPolicy`]; the policy maps to a fixed
//! rule set applied on top of ammonia's default safe-HTML allow-list.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use ammonia::Builder;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Sanitization profile applied to submitted HTML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SanitizationPolicy {
    /// Safe-HTML defaults: scripts, styles, event handlers and
    /// `javascript:` URLs are removed.
    #[default]
    Default,
    /// Default plus embedded iframes and inline styles, with `<script>` and
    /// `<svg>` removed together with their content.
    Extended,
}

/// The rule set a policy adds to the base allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyRules {
    /// Elements removed along with everything inside them.
    pub forbidden_tags: &'static [&'static str],
    pub added_tags: &'static [&'static str],
    /// Allowed elements kept empty. Their content is raw text to the HTML
    /// parser and would otherwise be written back out unescaped.
    pub emptied_tags: &'static [&'static str],
    /// Per-element attributes; the `"*"` entry applies to every element.
    pub added_attributes: &'static [(&'static str, &'static [&'static str])],
    /// CSS properties kept inside a `style` attribute.
    pub allowed_style_properties: &'static [&'static str],
}

const DEFAULT_RULES: PolicyRules = PolicyRules {
    forbidden_tags: &[],
    added_tags: &[],
    emptied_tags: &[],
    added_attributes: &[],
    allowed_style_properties: &[],
};

const EXTENDED_RULES: PolicyRules = PolicyRules {
    forbidden_tags: &["script", "svg"],
    added_tags: &["iframe"],
    emptied_tags: &["iframe"],
    added_attributes: &[
        (
            "iframe",
            &[
                "src",
                "width",
                "height",
                "title",
                "allow",
                "allowfullscreen",
                "frameborder",
                "scrolling",
            ],
        ),
        ("*", &["style"]),
    ],
    allowed_style_properties: &[
        "color",
        "background-color",
        "text-align",
        "text-decoration",
        "font-weight",
        "font-style",
        "font-size",
        "width",
        "height",
        "max-width",
        "border",
        "border-radius",
        "margin",
        "padding",
        "aspect-ratio",
    ],
};

/// Fragments that make a CSS value unsafe regardless of property.
const FORBIDDEN_STYLE_VALUES: &[&str] = &["url(", "expression", "javascript:", "\\"];

static DEFAULT_BUILDER: LazyLock<Builder<'static>> =
    LazyLock::new(|| build(SanitizationPolicy::Default));
static EXTENDED_BUILDER: LazyLock<Builder<'static>> =
    LazyLock::new(|| build(SanitizationPolicy::Extended));

impl SanitizationPolicy {
    pub const ALL: [SanitizationPolicy; 2] =
        [SanitizationPolicy::Default, SanitizationPolicy::Extended];

    pub fn as_str(self) -> &'static str {
        match self {
            SanitizationPolicy::Default => "default",
            SanitizationPolicy::Extended => "extended",
        }
    }

    pub fn rules(self) -> &'static PolicyRules {
        match self {
            SanitizationPolicy::Default => &DEFAULT_RULES,
            SanitizationPolicy::Extended => &EXTENDED_RULES,
        }
    }

    fn builder(self) -> &'static Builder<'static> {
        match self {
            SanitizationPolicy::Default => &DEFAULT_BUILDER,
            SanitizationPolicy::Extended => &EXTENDED_BUILDER,
        }
    }
}

impl fmt::Display for SanitizationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SanitizationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "default" => Ok(SanitizationPolicy::Default),
            "extended" => Ok(SanitizationPolicy::Extended),
            other => Err(format!(
                "unknown sanitization policy '{other}' (expected 'default' or 'extended')"
            )),
        }
    }
}

fn build(policy: SanitizationPolicy) -> Builder<'static> {
    let rules = policy.rules();
    let mut builder = Builder::default();

    builder
        .rm_tags(rules.forbidden_tags)
        .add_clean_content_tags(rules.forbidden_tags)
        .add_tags(rules.added_tags);

    for (tag, attributes) in rules.added_attributes {
        if *tag == "*" {
            builder.add_generic_attributes(*attributes);
        } else {
            builder.add_tag_attributes(*tag, *attributes);
        }
    }

    if !rules.allowed_style_properties.is_empty() {
        let allowed = rules.allowed_style_properties;
        builder.attribute_filter(move |_element, attribute, value| {
            if attribute == "style" {
                filter_style(value, allowed).map(Cow::Owned)
            } else {
                Some(Cow::Borrowed(value))
            }
        });
    }

    builder
}

/// Keep only the declarations of `style` whose property is allowed.
///
/// Returns `None` when nothing survives, which drops the attribute.
pub fn filter_style(style: &str, allowed: &[&str]) -> Option<String> {
    let kept: Vec<String> = style
        .split(';')
        .filter_map(|declaration| {
            let (property, value) = declaration.split_once(':')?;
            let property = property.trim().to_ascii_lowercase();
            let value = value.trim();

            if value.is_empty() || !allowed.contains(&property.as_str()) {
                return None;
            }

            let lowered = value.to_ascii_lowercase();
            if FORBIDDEN_STYLE_VALUES.iter().any(|bad| lowered.contains(bad)) {
                return None;
            }

            Some(format!("{property}: {value}"))
        })
        .collect();

    if kept.is_empty() {
        None
    } else {
        Some(kept.join("; "))
    }
}

/// Drop everything between `<tag ...>` and `</tag>` in serialized HTML.
///
/// Expects ammonia's output: text is escaped, attribute values are double
/// quoted, and a raw-text element's content never contains its end tag.
fn empty_elements(html: &str, tag: &str) -> String {
    let end_tag = format!("</{tag}>");
    let mut out = String::with_capacity(html.len());
    let mut rest = html;

    while let Some(start) = rest.find('<') {
        out.push_str(&rest[..start]);
        rest = &rest[start..];

        let mut quoted = false;
        let tag_end = rest.char_indices().find_map(|(i, c)| match c {
            '"' => {
                quoted = !quoted;
                None
            }
            '>' if !quoted => Some(i),
            _ => None,
        });
        let Some(tag_end) = tag_end else {
            break;
        };

        let markup = &rest[..=tag_end];
        out.push_str(markup);
        rest = &rest[tag_end + 1..];

        let opens_tag = markup[1..]
            .strip_prefix(tag)
            .is_some_and(|after| after.starts_with(['>', ' ', '/']));
        if opens_tag {
            rest = rest.find(&end_tag).map_or("", |close| &rest[close..]);
        }
    }

    out.push_str(rest);
    out
}

/// Sanitize untrusted HTML under `policy`.
pub fn sanitize(html: &str, policy: SanitizationPolicy) -> String {
    let mut clean = policy.builder().clean(html).to_string();
    for tag in policy.rules().emptied_tags {
        clean = empty_elements(&clean, tag);
    }

    if clean.len() != html.len() {
        debug!(
            policy = %policy,
            input_bytes = html.len(),
            output_bytes = clean.len(),
            "sanitizer altered submitted HTML"
        );
    }

    clean
}
