//! Candidate phrase generation.
//!
//! Unigrams, bigrams and trigrams are built from adjacent tokens, filtered by
//! a stopword and length heuristic, deduplicated by normalized form, and
//! capped. Multi-token phrases are joined with a single space whatever the
//! original separator was, so a hyphenated or slash-separated phrase may later
//! fail literal validation against the raw text.

use std::collections::HashSet;

use serde::Serialize;

use crate::stopwords::Stopwords;
use crate::text::{Token, normalize, tokenize};

pub const DEFAULT_MAX_CANDIDATES: usize = 60;
/// Minimum normalized length, in chars, for a token to stand on its own.
pub const MIN_QUALIFYING_LEN: usize = 4;

/// A phrase to look up. Serializes as its surface text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Candidate {
    text: String,
    #[serde(skip)]
    key: String,
}

impl Candidate {
    fn new(text: String) -> Self {
        let key = normalize(&text);
        Self { text, key }
    }

    /// Surface form, original casing retained.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Normalized form used as the deduplication key.
    pub fn key(&self) -> &str {
        &self.key
    }
}

pub struct CandidateGenerator<'a> {
    stopwords: &'a Stopwords,
}

impl<'a> CandidateGenerator<'a> {
    pub fn new(stopwords: &'a Stopwords) -> Self {
        Self { stopwords }
    }

    fn qualifies(&self, normalized: &str) -> bool {
        normalized.chars().count() >= MIN_QUALIFYING_LEN && !self.stopwords.contains(normalized)
    }

    /// Generate at most `max_candidates` unique candidates from `raw`.
    pub fn generate(&self, raw: &str, max_candidates: usize) -> Vec<Candidate> {
        let tokens = tokenize(raw);
        let keep: Vec<bool> = tokens
            .iter()
            .map(|t| self.qualifies(&normalize(t.text)))
            .collect();

        let unigrams = tokens
            .iter()
            .zip(&keep)
            .filter(|(_, ok)| **ok)
            .map(|(t, _)| t.text.to_string());
        let bigrams = windows(&tokens, &keep, 2);
        let trigrams = windows(&tokens, &keep, 3);

        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for phrase in unigrams.chain(bigrams).chain(trigrams) {
            if out.len() >= max_candidates {
                break;
            }
            let candidate = Candidate::new(phrase);
            if seen.insert(candidate.key().to_string()) {
                out.push(candidate);
            }
        }
        out
    }
}

/// Sliding windows of `n` tokens joined by one space, kept when any member
/// qualifies on its own.
fn windows<'t>(
    tokens: &'t [Token<'t>],
    keep: &'t [bool],
    n: usize,
) -> impl Iterator<Item = String> + 't {
    tokens
        .windows(n)
        .zip(keep.windows(n))
        .filter(|(_, ok)| ok.iter().any(|k| *k))
        .map(|(win, _)| {
            win.iter()
                .map(|t| t.text)
                .collect::<Vec<_>>()
                .join(" ")
        })
}
