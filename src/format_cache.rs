//! Per-format-string cache of analysis results.
//!
//! Analyzing a format string is cheap but not free, and a call site logs the
//! same literal over and over. The cache analyzes each distinct string once and
//! hands out the shared [`ParsedFormat`] together with a compact numeric ID
//! that a binary record can carry in place of the text.
//!
//! # Thread Safety
//!
//! Lookups take a shared read lock. A miss analyzes the string outside any lock
//! and then inserts it under the write lock, keeping whichever entry got there
//! first, so every caller observes one ID per string.

use std::collections::HashMap;
use std::sync::Arc;

use lazy_static::lazy_static;
use parking_lot::RwLock;
use thiserror::Error;
use tracing::{debug, warn};

use crate::format_analyzer::{analyze, AnalysisError, ParsedFormat};

/// Compact identifier of a cached format string. ID 0 is reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FormatId(u32);

impl FormatId {
    pub const fn get(self) -> u32 {
        self.0
    }
}

/// A cached format string and its analysis.
#[derive(Debug, Clone)]
pub struct FormatHandle {
    pub id: FormatId,
    pub format_string: &'static str,
    pub params: Arc<ParsedFormat>,
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("invalid format string: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("format registry is full")]
    Exhausted,
}

#[derive(Default)]
struct CacheInner {
    by_text: HashMap<&'static str, FormatHandle>,
    by_id: Vec<FormatHandle>,
}

impl CacheInner {
    fn handle(&self, id: FormatId) -> Option<FormatHandle> {
        let index = (id.0 as usize).checked_sub(1)?;
        self.by_id.get(index).cloned()
    }
}

/// A read-mostly map from format strings to their analysis.
#[derive(Default)]
pub struct FormatCache {
    inner: RwLock<CacheInner>,
}

impl FormatCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached entry for `fmt`, analyzing it on first sight.
    ///
    /// Formats with bad specifiers are cached too, so a faulty call site is
    /// parsed once; the entry's `params` report the problem.
    pub fn get_or_analyze(&self, fmt: &'static str) -> Result<FormatHandle, RegistryError> {
        // Fast path: already analyzed
        if let Some(handle) = self.inner.read().by_text.get(fmt) {
            return Ok(handle.clone());
        }

        // Slow path: analyze without holding the lock
        let parsed = Arc::new(analyze(fmt));

        let mut inner = self.inner.write();
        if let Some(handle) = inner.by_text.get(fmt) {
            return Ok(handle.clone());
        }
        let raw_id = u32::try_from(inner.by_id.len() + 1).map_err(|_| RegistryError::Exhausted)?;
        let handle = FormatHandle {
            id: FormatId(raw_id),
            format_string: fmt,
            params: parsed,
        };
        inner.by_id.push(handle.clone());
        inner.by_text.insert(fmt, handle.clone());

        if handle.params.is_valid() {
            debug!(id = raw_id, params = handle.params.len(), format = fmt, "registered format");
        } else {
            warn!(
                id = raw_id,
                issues = handle.params.issues().len(),
                format = fmt,
                "registered invalid format"
            );
        }
        Ok(handle)
    }

    /// Like [`FormatCache::get_or_analyze`], but fails when the format has a bad specifier.
    pub fn register(&self, fmt: &'static str) -> Result<FormatHandle, RegistryError> {
        let handle = self.get_or_analyze(fmt)?;
        handle.params.validate()?;
        Ok(handle)
    }

    pub fn lookup(&self, id: FormatId) -> Option<FormatHandle> {
        self.inner.read().handle(id)
    }

    pub fn len(&self) -> usize {
        self.inner.read().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

lazy_static! {
    /// Process-wide cache shared by every call site.
    static ref FORMAT_CACHE: FormatCache = FormatCache::new();
}

/// Registers a format string in the global cache and returns its handle.
///
/// The first registration analyzes the string; later ones reuse the result.
/// Fails when the format contains an invalid or unsupported specifier, since
/// such a statement must never be logged.
///
/// # Examples
///
/// ```
/// # use binlog_format::format_cache::{register_format, lookup_format};
/// let first = register_format("connected to %s:%u").unwrap();
/// let again = register_format("connected to %s:%u").unwrap();
/// assert_eq!(first.id, again.id);
/// assert_eq!(first.params.len(), 2);
///
/// let found = lookup_format(first.id).unwrap();
/// assert_eq!(found.format_string, "connected to %s:%u");
///
/// assert!(register_format("wrote %n bytes").is_err());
/// ```
pub fn register_format(fmt: &'static str) -> Result<FormatHandle, RegistryError> {
    FORMAT_CACHE.register(fmt)
}

/// Looks up a registered format by ID, e.g. when decoding a record.
pub fn lookup_format(id: FormatId) -> Option<FormatHandle> {
    FORMAT_CACHE.lookup(id)
}

/// The text of a registered format, if the ID is known.
pub fn format_string(id: FormatId) -> Option<&'static str> {
    lookup_format(id).map(|handle| handle.format_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_start_at_one() {
        let cache = FormatCache::new();
        assert!(cache.is_empty());
        let handle = cache.get_or_analyze("%d").unwrap();
        assert_eq!(handle.id.get(), 1);
        assert!(cache.lookup(FormatId(0)).is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_invalid_format_cached_once() {
        let cache = FormatCache::new();
        assert!(matches!(
            cache.register("bad %y"),
            Err(RegistryError::Analysis(AnalysisError::Invalid { conversion: 'y', .. }))
        ));
        assert!(cache.register("bad %y").is_err());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_handles_share_analysis() {
        let cache = FormatCache::new();
        let a = cache.get_or_analyze("%s").unwrap();
        let b = cache.get_or_analyze("%s").unwrap();
        assert!(Arc::ptr_eq(&a.params, &b.params));
    }
}
