//! Validation and deduplication of lookup results.

use std::collections::HashSet;

use serde::Serialize;
use tracing::warn;

use crate::candidates::Candidate;
use crate::offsets::{Offset, find_offsets};
use crate::snowstorm::{LookupError, LookupHit};

/// A lookup hit whose term was found verbatim in the raw text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Match {
    #[serde(rename = "match")]
    pub term: String,
    #[serde(rename = "conceptId")]
    pub concept_id: Option<String>,
    pub fsn: Option<String>,
    #[serde(rename = "semanticTag")]
    pub semantic_tag: Option<String>,
    pub offsets: Vec<Offset>,
}

impl Match {
    /// Confirm `hit` against `raw`. Returns `None` when the term is missing,
    /// empty, or does not literally occur in the text.
    pub fn locate(raw: &str, hit: LookupHit) -> Option<Self> {
        let term = hit.term?;
        let offsets = find_offsets(raw, &term);
        if offsets.is_empty() {
            return None;
        }
        Some(Self {
            term,
            concept_id: hit.concept_id,
            fsn: hit.fsn,
            semantic_tag: hit.semantic_tag,
            offsets,
        })
    }

    fn dedup_key(&self) -> (Option<String>, String) {
        (self.concept_id.clone(), self.term.to_lowercase())
    }
}

/// Fold per-candidate outcomes, in candidate order, into the final match list.
///
/// Failed lookups contribute nothing. Matches are unique by
/// `(concept id, lowercased term)`; the first one seen wins.
pub fn aggregate<'c, I>(raw: &str, outcomes: I) -> Vec<Match>
where
    I: IntoIterator<Item = (&'c Candidate, Result<Vec<LookupHit>, LookupError>)>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for (candidate, outcome) in outcomes {
        let hits = match outcome {
            Ok(hits) => hits,
            Err(err) => {
                warn!("lookup for {:?} failed: {err}", candidate.text());
                continue;
            }
        };
        for hit in hits {
            let Some(found) = Match::locate(raw, hit) else {
                continue;
            };
            if seen.insert(found.dedup_key()) {
                out.push(found);
            }
        }
    }
    out
}
