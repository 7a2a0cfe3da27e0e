//! Subscription path grammar.
//!
//! # Syntax
//! - Segments separated by `/`, leading and trailing separators trimmed
//! - No empty segments (`//` is rejected before trimming)
//! - Templates may contain placeholders of the form `{name}`, never as the first segment
//! - Concrete request paths contain no brace characters at all
//!
//! Literal segments are lower-cased; placeholder segments keep their braces and case.

use crate::subscriptions::error::PathError;

pub const PATH_SEPARATOR: char = '/';
pub const OPEN_PLACEHOLDER: char = '{';
pub const CLOSE_PLACEHOLDER: char = '}';

const DOUBLE_PATH_SEPARATOR: &str = "//";

/// Split a path into normalized segments.
///
/// `registering` selects the template grammar (placeholders allowed) over the
/// request grammar (no braces).
pub fn split(path: &str, registering: bool) -> Result<Vec<String>, PathError> {
    Ok(split_raw(path, registering)?
        .into_iter()
        .map(normalize_segment)
        .collect())
}

/// Validate a path and return its segments exactly as written.
pub(crate) fn split_raw(path: &str, registering: bool) -> Result<Vec<&str>, PathError> {
    if path.trim().is_empty() {
        return Err(PathError::Empty);
    }

    if path.contains(DOUBLE_PATH_SEPARATOR) {
        return Err(PathError::EmptySegment);
    }

    let trimmed = path.trim_matches(PATH_SEPARATOR);
    if trimmed.is_empty() {
        return Err(PathError::Empty);
    }

    let segments: Vec<&str> = trimmed.split(PATH_SEPARATOR).collect();

    if registering {
        if is_placeholder(segments[0]) {
            return Err(PathError::LeadingPlaceholder);
        }

        if let Some(segment) = segments.iter().find(|s| is_ill_formed_placeholder(s)) {
            return Err(PathError::IllFormedPlaceholder {
                segment: segment.to_string(),
            });
        }
    } else if let Some(segment) = segments
        .iter()
        .find(|s| s.contains([OPEN_PLACEHOLDER, CLOSE_PLACEHOLDER]))
    {
        return Err(PathError::PlaceholderInRequest {
            segment: segment.to_string(),
        });
    }

    Ok(segments)
}

/// Normalized registry key for a concrete path.
pub fn normalize(path: &str) -> Result<String, PathError> {
    Ok(split(path, false)?.join("/"))
}

/// True if the segment is `{name}` with a non-empty name.
pub fn is_placeholder(segment: &str) -> bool {
    segment.len() > 2
        && segment.starts_with(OPEN_PLACEHOLDER)
        && segment.ends_with(CLOSE_PLACEHOLDER)
}

/// Name of a placeholder segment without its braces.
pub fn placeholder_name(segment: &str) -> Option<&str> {
    if is_placeholder(segment) {
        Some(&segment[1..segment.len() - 1])
    } else {
        None
    }
}

/// True if the segment contains braces but is not a well-formed placeholder.
pub fn is_ill_formed_placeholder(segment: &str) -> bool {
    let opens = segment.matches(OPEN_PLACEHOLDER).count();
    let closes = segment.matches(CLOSE_PLACEHOLDER).count();

    if opens == 0 && closes == 0 {
        return false;
    }

    if opens > 1 || closes > 1 || segment.len() == 2 {
        return true;
    }

    !(segment.starts_with(OPEN_PLACEHOLDER) && segment.ends_with(CLOSE_PLACEHOLDER))
}

pub(crate) fn normalize_segment(segment: &str) -> String {
    if is_placeholder(segment) {
        segment.to_string()
    } else {
        segment.to_lowercase()
    }
}
