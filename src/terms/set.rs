// RestrictedTermSet: the shared, read-mostly vocabulary.
//
// Readers (the scanner) take a shared lock for the duration of one scan and
// never block each other. Writers (load, add, discovery) take the exclusive
// lock only for the replace/union itself; normalization and file reading
// happen before the lock is acquired.

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard};

use anyhow::{Context, Result};
use tracing::{info, warn};

use super::defaults::DEFAULT_TERMS;

/// Where the current vocabulary came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TermSource {
    File(PathBuf),
    BuiltIn,
}

impl std::fmt::Display for TermSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TermSource::File(path) => write!(f, "{}", path.display()),
            TermSource::BuiltIn => write!(f, "built-in defaults"),
        }
    }
}

/// Set of lowercase, whitespace-trimmed restricted terms.
#[derive(Debug, Default)]
pub struct RestrictedTermSet {
    terms: RwLock<HashSet<String>>,
}

/// Lowercase and trim a term. Returns None for terms that are empty after trimming.
pub fn normalize_term(term: &str) -> Option<String> {
    let normalized = term.trim().to_lowercase();
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

impl RestrictedTermSet {
    /// An empty set. Call `load` to populate it.
    pub fn new() -> Self {
        Self::default()
    }

    /// A set populated with the built-in vocabulary.
    pub fn with_defaults() -> Self {
        let set = Self::new();
        set.replace(built_in_terms());
        set
    }

    /// Replace the vocabulary from `path` (one term per line) or, when no
    /// path is given or it can't be read, from the built-in defaults.
    ///
    /// Never fails: an unreadable file is logged and treated as absent.
    pub fn load(&self, path: Option<&Path>) -> TermSource {
        if let Some(path) = path.filter(|p| p.exists()) {
            match read_term_file(path) {
                Ok(terms) => {
                    let count = terms.len();
                    self.replace(terms);
                    info!(count, path = %path.display(), "Loaded restricted terms from file");
                    return TermSource::File(path.to_path_buf());
                }
                Err(e) => {
                    warn!(error = %e, path = %path.display(), "Term file unreadable, using defaults");
                }
            }
        }

        let terms = built_in_terms();
        let count = terms.len();
        self.replace(terms);
        info!(count, "Loaded default restricted terms");
        TermSource::BuiltIn
    }

    /// Union `terms` into the set. Returns how many were new.
    pub fn add<I, S>(&self, terms: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let normalized: Vec<String> = terms
            .into_iter()
            .filter_map(|t| normalize_term(t.as_ref()))
            .collect();

        let mut guard = self.terms.write().unwrap_or_else(PoisonError::into_inner);
        normalized
            .into_iter()
            .map(|t| guard.insert(t))
            .filter(|inserted| *inserted)
            .count()
    }

    /// Read-only copy of the current vocabulary, sorted for display.
    pub fn snapshot(&self) -> BTreeSet<String> {
        self.read().iter().cloned().collect()
    }

    pub fn contains(&self, term: &str) -> bool {
        self.read().contains(term)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Write the vocabulary to `path`, one term per line in sorted order.
    pub fn export(&self, path: &Path) -> Result<usize> {
        let snapshot = self.snapshot();
        let mut body = String::new();
        for term in &snapshot {
            body.push_str(term);
            body.push('\n');
        }
        std::fs::write(path, body)
            .with_context(|| format!("Failed to write term file {}", path.display()))?;
        Ok(snapshot.len())
    }

    /// Shared read access for scanning many tokens under one lock.
    pub(crate) fn read(&self) -> RwLockReadGuard<'_, HashSet<String>> {
        self.terms.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn replace(&self, terms: HashSet<String>) {
        let mut guard = self.terms.write().unwrap_or_else(PoisonError::into_inner);
        *guard = terms;
    }
}

fn built_in_terms() -> HashSet<String> {
    DEFAULT_TERMS.iter().map(|t| t.to_string()).collect()
}

fn read_term_file(path: &Path) -> Result<HashSet<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read term file {}", path.display()))?;
    Ok(content.lines().filter_map(normalize_term).collect())
}
