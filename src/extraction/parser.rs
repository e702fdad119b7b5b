//! Collaborator response parsing.
//!
//! Models frequently wrap JSON payloads in markdown code fences despite the
//! "no formatting" instruction, so the fence is stripped before parsing. The
//! payload must be a JSON array of objects; anything else is a
//! `ResponseShape` failure, which a correction session treats as a failed
//! round rather than a fatal error.

use super::types::ContainerRecord;
use super::ExtractionError;

/// Strip a surrounding markdown code fence, if present.
pub fn clean_response(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}

/// Parse a collaborator response into a container record list.
pub fn parse_record_array(content: &str) -> Result<Vec<ContainerRecord>, ExtractionError> {
    let cleaned = clean_response(content);
    serde_json::from_str(cleaned).map_err(|e| ExtractionError::ResponseShape(e.to_string()))
}
