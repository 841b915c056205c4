//! Job variation input parsing: a semicolon-separated list of
//! `<logical-name>=<path>` bindings, plus `{token}` template substitution
//! against those bindings.

use std::collections::BTreeMap;

use crate::error::{ExternalError, ExternalResult};

/// A parsed `<logical-name>=<path>[;...]` binding list.
///
/// Some callers inconsistently accept `entities`/`entites` for the same
/// logical name; this parser does not normalize logical names at all — it
/// stores exactly what was written on either side of `=`, leaving any such
/// canonicalization to the caller that defines the accepted token set.
#[derive(Debug, Clone, Default)]
pub struct JobVariation {
    bindings: BTreeMap<String, String>,
}

impl JobVariation {
    /// Parse `input`, a `;`-separated list of `name=path` pairs. Blank
    /// segments (a trailing `;`, or an all-whitespace entry) are skipped
    /// rather than treated as malformed.
    pub fn parse(input: &str) -> ExternalResult<Self> {
        let mut bindings = BTreeMap::new();
        for segment in input.split(';') {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            let (name, path) = segment
                .split_once('=')
                .ok_or_else(|| ExternalError::MalformedBinding(segment.to_string()))?;
            let (name, path) = (name.trim(), path.trim());
            if name.is_empty() || path.is_empty() {
                return Err(ExternalError::MalformedBinding(segment.to_string()));
            }
            bindings.insert(name.to_string(), path.to_string());
        }
        Ok(Self { bindings })
    }

    /// Look up the path bound to `logical_name`, if any.
    pub fn get(&self, logical_name: &str) -> Option<&str> {
        self.bindings.get(logical_name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Every bound logical name, in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    /// Substitute every `{token}` occurrence in `template` with its bound
    /// path, failing with [`ExternalError::UnknownTemplate`] on the first
    /// token that has no binding.
    pub fn resolve_template(&self, template: &str) -> ExternalResult<String> {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(open) = rest.find('{') {
            let Some(close) = rest[open..].find('}') else {
                // Unterminated `{` — pass the rest through literally, same
                // as a template with no more tokens to substitute.
                out.push_str(rest);
                return Ok(out);
            };
            out.push_str(&rest[..open]);
            let token = &rest[open + 1..open + close];
            let value = self.get(token).ok_or_else(|| ExternalError::UnknownTemplate(token.to_string()))?;
            out.push_str(value);
            rest = &rest[open + close + 1..];
        }
        out.push_str(rest);
        Ok(out)
    }
}
