//! One annotate run: candidates, concurrent lookups, validation, dedup.

use std::sync::Arc;
use std::time::Instant;

use futures_util::future::join_all;
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{debug, info};

use crate::aggregate::{Match, aggregate};
use crate::candidates::{Candidate, CandidateGenerator, DEFAULT_MAX_CANDIDATES};
use crate::snowstorm::{LookupError, LookupHit, Terminology};
use crate::stopwords::Stopwords;

pub const DISCLAIMER: &str = "Demo only. Matches come from a public Snowstorm terminology server \
and are not authoritative; for production, host your own Snowstorm and set SNOWSTORM_BASE.";
pub const EMPTY_TEXT_NOTE: &str = "Empty text";

/// Input of a single annotate run.
#[derive(Debug, Clone, Default)]
pub struct AnnotateRequest {
    pub text: String,
    /// Candidate cap; `None` means [`DEFAULT_MAX_CANDIDATES`].
    pub max_candidates: Option<usize>,
    /// Accept-Language sent to the terminology server; `None` or blank means
    /// the annotator's default.
    pub lang: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Annotation {
    pub matches: Vec<Match>,
    pub candidates: Vec<Candidate>,
    pub lang: String,
    pub source: String,
    pub disclaimer: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<&'static str>,
}

pub struct Annotator<T> {
    terminology: T,
    stopwords: Arc<Stopwords>,
    default_lang: String,
    /// Lookups allowed in flight per run; zero means unbounded.
    lookup_concurrency: usize,
}

impl<T: Terminology> Annotator<T> {
    pub fn new(terminology: T, stopwords: Arc<Stopwords>, default_lang: impl Into<String>) -> Self {
        Self {
            terminology,
            stopwords,
            default_lang: default_lang.into(),
            lookup_concurrency: 0,
        }
    }

    /// Bound the number of lookups in flight within one run. Each run gets
    /// its own permits. Zero keeps the fan-out unbounded.
    pub fn with_lookup_concurrency(mut self, permits: usize) -> Self {
        self.lookup_concurrency = permits;
        self
    }

    pub fn default_lang(&self) -> &str {
        &self.default_lang
    }

    pub fn source(&self) -> &str {
        self.terminology.source()
    }

    pub async fn annotate(&self, request: AnnotateRequest) -> Annotation {
        let lang = request
            .lang
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| self.default_lang.clone());
        let mut annotation = Annotation {
            matches: Vec::new(),
            candidates: Vec::new(),
            lang,
            source: self.terminology.source().to_string(),
            disclaimer: DISCLAIMER,
            note: None,
        };

        let raw = request.text.as_str();
        if raw.trim().is_empty() {
            annotation.note = Some(EMPTY_TEXT_NOTE);
            return annotation;
        }

        let start = Instant::now();
        let max_candidates = request.max_candidates.unwrap_or(DEFAULT_MAX_CANDIDATES);
        let candidates = CandidateGenerator::new(&self.stopwords).generate(raw, max_candidates);

        let outcomes = self.lookup_all(&candidates, &annotation.lang).await;
        let failed = outcomes.iter().filter(|o| o.is_err()).count();
        let matches = aggregate(raw, candidates.iter().zip(outcomes));

        info!(
            "annotated {} chars: {} candidates, {} failed lookups, {} matches in {} ms",
            raw.chars().count(),
            candidates.len(),
            failed,
            matches.len(),
            start.elapsed().as_millis()
        );

        annotation.matches = matches;
        annotation.candidates = candidates;
        annotation
    }

    /// Look every candidate up concurrently. The result at index `i` belongs
    /// to `candidates[i]` regardless of completion order.
    async fn lookup_all(
        &self,
        candidates: &[Candidate],
        lang: &str,
    ) -> Vec<Result<Vec<LookupHit>, LookupError>> {
        let limiter = (self.lookup_concurrency > 0).then(|| Semaphore::new(self.lookup_concurrency));
        join_all(
            candidates
                .iter()
                .map(|c| self.lookup(c, lang, limiter.as_ref())),
        )
        .await
    }

    async fn lookup(
        &self,
        candidate: &Candidate,
        lang: &str,
        limiter: Option<&Semaphore>,
    ) -> Result<Vec<LookupHit>, LookupError> {
        let _permit = match limiter {
            Some(limiter) => limiter.acquire().await.ok(),
            None => None,
        };
        debug!("looking up {:?}", candidate.text());
        self.terminology.search(candidate.text(), lang).await
    }
}
