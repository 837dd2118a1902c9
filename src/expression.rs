//! # Security Expression Module
//!
//! Normalizes the access-control metadata attached to a handler into a flat
//! list of [`SecurityExpression`] records.
//!
//! Two metadata shapes are understood:
//!
//! - **Legacy `Security`** - a free-form expression string such as
//!   `is_granted('ROLE_ADMIN') or is_granted('EDIT', post)`. Every
//!   `is_granted(...)` call found in the string yields one record, in
//!   left-to-right order.
//! - **Structured `IsGranted`** - an explicit attribute name plus an optional
//!   subject, emitted as-is.
//!
//! Anything else contributes nothing.
//!
//! ## Usage
//!
//! ```rust
//! use annotation_audit::expression::{parse_is_granted_calls, SecurityExpression};
//!
//! let found = parse_is_granted_calls("is_granted('EDIT', subject.getPost())");
//! assert_eq!(
//!     found,
//!     vec![SecurityExpression::new("EDIT", Some("subject.getPost()".to_string()))]
//! );
//! ```

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::metadata::Metadata;
use regex::Regex;

/// Start of an `is_granted('NAME'` call. The rest of the call is scanned by hand
/// so the subject can contain nested parentheses.
static IS_GRANTED_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bis_granted\(\s*'([^']+)'").expect("is_granted regex should be valid")
});

/// A single access-control check: the attribute being granted and, optionally,
/// the subject it is checked against.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SecurityExpression {
    /// Role or permission name (e.g. `ROLE_ADMIN`, `EDIT`)
    pub attribute: String,
    /// Expression text identifying the checked resource, if any
    pub subject: Option<String>,
}

impl SecurityExpression {
    pub fn new(attribute: impl Into<String>, subject: Option<String>) -> Self {
        SecurityExpression {
            attribute: attribute.into(),
            subject,
        }
    }
}

impl fmt::Display for SecurityExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.subject {
            Some(subject) => write!(f, "is_granted('{}', {})", self.attribute, subject),
            None => write!(f, "is_granted('{}')", self.attribute),
        }
    }
}

/// Extract security expressions from a sequence of metadata objects.
///
/// Order follows the metadata order; a legacy expression with several
/// `is_granted` calls is expanded in place.
pub fn extract_security_expressions(metadata: &[Metadata]) -> Vec<SecurityExpression> {
    let mut expressions = Vec::new();

    for item in metadata {
        match item {
            Metadata::Security { expression } => {
                expressions.extend(parse_is_granted_calls(expression));
            }
            Metadata::IsGranted { attribute, subject } => {
                expressions.push(SecurityExpression::new(attribute.as_str(), subject.clone()));
            }
            Metadata::Other { .. } => {}
        }
    }

    expressions
}

/// Find every `is_granted('NAME')` / `is_granted('NAME', SUBJECT)` call in a
/// free-form expression string.
///
/// The subject is captured verbatim (trimmed) up to the parenthesis closing the
/// call. A call that is never closed, or whose first argument is followed by
/// anything other than a comma or `)`, is ignored.
pub fn parse_is_granted_calls(expression: &str) -> Vec<SecurityExpression> {
    let mut params = Vec::new();
    let mut cursor = 0;

    while let Some(caps) = IS_GRANTED_REGEX.captures_at(expression, cursor) {
        let (Some(call), Some(name)) = (caps.get(0), caps.get(1)) else {
            break;
        };

        match scan_call_tail(&expression[call.end()..]) {
            Some((subject, consumed)) => {
                params.push(SecurityExpression::new(name.as_str(), subject));
                cursor = call.end() + consumed;
            }
            None => cursor = call.end(),
        }
    }

    params
}

/// Scan what follows the quoted attribute name of an `is_granted` call.
///
/// Returns the optional subject text and the number of bytes consumed up to
/// and including the closing parenthesis.
fn scan_call_tail(rest: &str) -> Option<(Option<String>, usize)> {
    let trimmed = rest.trim_start();
    let skipped = rest.len() - trimmed.len();

    if trimmed.starts_with(')') {
        return Some((None, skipped + 1));
    }
    let argument = trimmed.strip_prefix(',')?;
    let start = skipped + 1;

    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (offset, ch) in argument.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }

        match ch {
            '\'' | '"' => quote = Some(ch),
            '(' | '[' | '{' => depth += 1,
            ']' | '}' => depth = depth.saturating_sub(1),
            ')' if depth == 0 => {
                let subject = argument[..offset].trim();
                let subject = (!subject.is_empty()).then(|| subject.to_string());
                return Some((subject, start + offset + 1));
            }
            ')' => depth -= 1,
            _ => {}
        }
    }

    None
}
