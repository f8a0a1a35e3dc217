// Term discovery: grow the restricted set by using an external classifier
// as an oracle.
//
// Each candidate is classified on its own; the ones the classifier flags
// (with the service actually available) are unioned into the term set.
// This is an explicit batch operation: the engine never runs it implicitly,
// and it never removes terms.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::set::{normalize_term, RestrictedTermSet};
use crate::classifier::{ExternalResult, SignalSource};

pub struct TermDiscovery {
    terms: Arc<RestrictedTermSet>,
    source: Arc<dyn SignalSource>,
}

impl TermDiscovery {
    pub fn new(terms: Arc<RestrictedTermSet>, source: Arc<dyn SignalSource>) -> Self {
        Self { terms, source }
    }

    /// Probe every candidate and add the confirmed ones to the term set.
    /// Returns the confirmed terms.
    pub async fn discover<S: AsRef<str>>(&self, candidates: &[S]) -> BTreeSet<String> {
        self.discover_with_progress(candidates, |_, _| {}).await
    }

    /// Like `discover`, calling `on_probe` after each candidate is classified.
    ///
    /// Candidates are normalized (trimmed, lowercased) and deduplicated before
    /// probing, so the oracle sees each distinct term once.
    pub async fn discover_with_progress<S, F>(
        &self,
        candidates: &[S],
        mut on_probe: F,
    ) -> BTreeSet<String>
    where
        S: AsRef<str>,
        F: FnMut(&str, &ExternalResult),
    {
        let mut seen = BTreeSet::new();
        let mut confirmed = BTreeSet::new();
        let mut unavailable = 0usize;

        for candidate in candidates {
            let Some(term) = normalize_term(candidate.as_ref()) else {
                continue;
            };
            if !seen.insert(term.clone()) {
                continue;
            }

            let result = self.source.classify(&term).await;
            on_probe(&term, &result);

            if result.fires() {
                debug!(term = %term, "Classifier confirmed term");
                confirmed.insert(term);
            } else if !result.available {
                unavailable += 1;
            }
        }

        let added = self.terms.add(&confirmed);

        if unavailable > 0 {
            warn!(
                unavailable,
                probed = seen.len(),
                "Some discovery probes got no answer from the classifier"
            );
        }
        info!(
            probed = seen.len(),
            confirmed = confirmed.len(),
            added,
            total = self.terms.len(),
            "Term discovery complete"
        );

        confirmed
    }
}
