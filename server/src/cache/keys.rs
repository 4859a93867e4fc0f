//! Cache key construction.
//!
//! A key is every canonical `name_value` pair, sorted by name and joined with
//! `_`. Keys are not hashed, so a value that itself contains `_` followed by a
//! parameter name can in principle collide with another parameter set.

use std::collections::BTreeMap;
use std::fmt;

use crate::utils::escape_glob;

const SEPARATOR: &str = "_";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Build a key from canonical parameters. `BTreeMap` iteration is
    /// already ascending by name, so insertion order never matters.
    pub fn from_params(params: &BTreeMap<&'static str, String>) -> Self {
        let key = params
            .iter()
            .map(|(name, value)| segment(name, value))
            .collect::<Vec<_>>()
            .join(SEPARATOR);
        CacheKey(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One `name_value` segment, also usable as an invalidation pattern.
pub fn segment(name: &str, value: &str) -> String {
    format!("{}{}{}", name, SEPARATOR, value)
}

/// Sweep pattern for every key whose `q` is exactly `location`.
///
/// `lang` always sorts before `q` and `units` always after it, so the `q`
/// segment sits between two separators and is followed by `units`.
pub fn location_pattern(location: &str) -> String {
    format!(
        "{sep}{}{sep}units{sep}",
        segment("q", &escape_glob(location.trim())),
        sep = SEPARATOR
    )
}
