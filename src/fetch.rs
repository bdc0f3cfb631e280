//! Resource retrieval seam.
//!
//! Everything the engine pulls from outside (template text, fragment
//! files, the data document) goes through [`Fetcher`]. Retrievals are
//! blocking and strictly sequential; the assembly pass never overlaps two
//! of them, so ordering of dependent replacements is preserved by
//! construction.
//!
//! [`FsFetcher`] resolves targets against a base directory; tests swap in
//! an in-memory [`MapFetcher`].

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// Loads raw resource bytes by target locator.
pub trait Fetcher {
    fn fetch(&self, target: &str) -> Result<Vec<u8>>;
}

// ============================================================================
// Filesystem Fetcher
// ============================================================================

/// Resolves targets as paths relative to a base directory.
///
/// A leading `/` on the target is treated as site-root-relative, the way
/// page templates reference resources, and maps into the base directory.
pub struct FsFetcher {
    base: PathBuf,
}

impl FsFetcher {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }
}

impl Fetcher for FsFetcher {
    fn fetch(&self, target: &str) -> Result<Vec<u8>> {
        let path = self.base.join(target.trim_start_matches('/'));
        fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))
    }
}

// ============================================================================
// In-memory Fetcher
// ============================================================================

/// Serves resources from an in-memory table.
#[cfg(test)]
#[derive(Default)]
pub struct MapFetcher {
    entries: std::collections::HashMap<String, Vec<u8>>,
}

#[cfg(test)]
impl MapFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, target: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.entries.insert(target.into(), content.into());
    }
}

#[cfg(test)]
impl Fetcher for MapFetcher {
    fn fetch(&self, target: &str) -> Result<Vec<u8>> {
        match self.entries.get(target) {
            Some(content) => Ok(content.clone()),
            None => anyhow::bail!("no resource registered for `{target}`"),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
