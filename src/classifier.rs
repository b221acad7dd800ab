//! Classification and canonicalization of resource text.
//!
//! Input is trimmed before matching and the four shapes are tried in a fixed
//! order: short URI, long URI, blank node, literal. Text matching none of them
//! is unclassified and passes through [`canonicalize`] untouched.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::{LiteralParts, LiteralSeparator, Resource, ResourceType};

static SHORT_URI: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[A-Za-z0-9_.\-]*[A-Za-z0-9.\-])?:[A-Za-z0-9_.\-]*$")
        .expect("valid short uri pattern")
});

static LONG_URI: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^[A-Za-z][A-Za-z0-9+.\-]*://[^\s<>"{}|\\^`]*$"#).expect("valid long uri pattern")
});

static BLANK_NODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^_:[A-Za-z0-9_.\-]*$").expect("valid blank node pattern"));

static LITERAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)^"(.*)"(?:(@|\^\^)([^\s"]+))?$"#).expect("valid literal pattern")
});

/// Priority order of the patterns; the first match wins.
static PATTERNS: Lazy<[(ResourceType, &'static Lazy<Regex>); 4]> = Lazy::new(|| {
    [
        (ResourceType::ShortUri, &SHORT_URI),
        (ResourceType::LongUri, &LONG_URI),
        (ResourceType::BlankNode, &BLANK_NODE),
        (ResourceType::Literal, &LITERAL),
    ]
});

/// Trim the input and unwrap `<…>` around a long URI.
pub fn normalize(text: &str) -> &str {
    let trimmed = text.trim();
    if let Some(inner) = trimmed
        .strip_prefix('<')
        .and_then(|rest| rest.strip_suffix('>'))
    {
        if LONG_URI.is_match(inner) {
            return inner;
        }
    }
    trimmed
}

pub fn classify(text: &str) -> Option<ResourceType> {
    let value = normalize(text);
    PATTERNS
        .iter()
        .find(|(_, re)| re.is_match(value))
        .map(|(kind, _)| *kind)
}

pub fn parse(text: &str) -> Option<Resource> {
    let value = normalize(text);
    classify(value).map(|kind| Resource::new(value, kind))
}

pub fn is_long_uri(text: &str) -> bool {
    LONG_URI.is_match(text)
}

pub fn is_short_uri(text: &str) -> bool {
    SHORT_URI.is_match(text)
}

/// Canonical form of `text`, or the input unchanged when it is unclassified.
pub fn canonicalize(text: &str) -> String {
    match parse(text) {
        Some(resource) => resource.canonical(),
        None => text.to_string(),
    }
}

/// Split a literal into body, separator and tag. Triple-quoted bodies are unwrapped.
pub fn literal_parts(text: &str) -> Option<LiteralParts<'_>> {
    let caps = LITERAL.captures(text)?;
    let body = caps.get(1).map_or("", |m| m.as_str());
    let body = body
        .strip_prefix("\"\"")
        .and_then(|b| b.strip_suffix("\"\""))
        .unwrap_or(body);
    let separator = caps.get(2).map(|m| match m.as_str() {
        "@" => LiteralSeparator::Language,
        _ => LiteralSeparator::Datatype,
    });
    Some(LiteralParts {
        body,
        separator,
        tag: caps.get(3).map(|m| m.as_str()),
    })
}

pub(crate) fn canonical_literal(text: &str) -> Option<String> {
    let parts = literal_parts(text)?;
    let body = escape_quotes(parts.body);
    let quote = if body.contains(['\n', '\r']) {
        "\"\"\""
    } else {
        "\""
    };

    let mut out = format!("{quote}{body}{quote}");
    if let (Some(separator), Some(tag)) = (parts.separator, parts.tag) {
        out.push_str(&separator.to_string());
        match separator {
            LiteralSeparator::Datatype => out.push_str(&canonical_tag(tag)),
            LiteralSeparator::Language => out.push_str(tag),
        }
    }
    Some(out)
}

// Datatype tags that are not URIs are kept as written.
fn canonical_tag(tag: &str) -> String {
    match parse(tag) {
        Some(res)
            if matches!(
                res.resource_type(),
                ResourceType::LongUri | ResourceType::ShortUri
            ) =>
        {
            res.canonical()
        }
        _ => tag.to_string(),
    }
}

fn escape_quotes(body: &str) -> Cow<'_, str> {
    if !body.contains('"') {
        return Cow::Borrowed(body);
    }
    let mut out = String::with_capacity(body.len() + 8);
    let mut backslashes = 0usize;
    for c in body.chars() {
        if c == '"' && backslashes % 2 == 0 {
            out.push('\\');
        }
        if c == '\\' {
            backslashes += 1;
        } else {
            backslashes = 0;
        }
        out.push(c);
    }
    Cow::Owned(out)
}
