//! SQL LIKE pattern matching for in-memory evaluation.
//!
//! LIKE patterns are translated to anchored regular expressions and
//! compiled once per (pattern, case sensitivity) pair. Patterns come from
//! lookup values, so the cache is bounded and starts over when full.

use regex::Regex;
use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

/// Compiled patterns kept before the cache is cleared.
const MAX_CACHED_PATTERNS: usize = 256;

/// Thread-safe cache of compiled LIKE patterns.
struct LikeCache {
    cache: RwLock<HashMap<(String, bool), Regex>>,
}

impl LikeCache {
    fn new() -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
        }
    }

    fn get_or_compile(&self, pattern: &str, case_insensitive: bool) -> Result<Regex, regex::Error> {
        let key = (pattern.to_string(), case_insensitive);
        {
            let cache = self.cache.read().unwrap_or_else(|e| e.into_inner());
            if let Some(regex) = cache.get(&key) {
                return Ok(regex.clone());
            }
        }

        let regex = Regex::new(&like_to_regex(pattern, case_insensitive))?;
        tracing::trace!(pattern, case_insensitive, "Compiled LIKE pattern");
        {
            let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
            if cache.len() >= MAX_CACHED_PATTERNS {
                tracing::debug!(entries = cache.len(), "LIKE pattern cache full, clearing");
                cache.clear();
            }
            cache.insert(key, regex.clone());
        }
        Ok(regex)
    }
}

fn like_cache() -> &'static LikeCache {
    static CACHE: OnceLock<LikeCache> = OnceLock::new();
    CACHE.get_or_init(LikeCache::new)
}

/// Translate a LIKE pattern into an anchored regex source.
///
/// `%` matches any run of characters, `_` exactly one, and a backslash
/// escapes the following character.
pub fn like_to_regex(pattern: &str, case_insensitive: bool) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    out.push_str(if case_insensitive { "(?is)^" } else { "(?s)^" });

    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '%' => out.push_str(".*"),
            '_' => out.push('.'),
            '\\' => {
                if let Some(escaped) = chars.next() {
                    out.push_str(&regex::escape(&escaped.to_string()));
                } else {
                    out.push_str(r"\\");
                }
            }
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }

    out.push('$');
    out
}

/// Does `value` match the LIKE `pattern`?
pub fn like_matches(
    value: &str,
    pattern: &str,
    case_insensitive: bool,
) -> Result<bool, regex::Error> {
    let regex = like_cache().get_or_compile(pattern, case_insensitive)?;
    Ok(regex.is_match(value))
}

/// Escape `%`, `_` and `\` so `text` matches literally inside a LIKE pattern.
pub fn escape_like(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
