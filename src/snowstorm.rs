//! Terminology lookup against a Snowstorm SNOMED CT server.

use std::future::Future;
use std::time::Duration;

use reqwest::header::ACCEPT_LANGUAGE;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_SNOWSTORM_BASE: &str = "https://snowstorm.snomedtools.org";
pub const DEFAULT_LANG: &str = "es";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
pub const RESULTS_PER_TERM: usize = 5;

const DESCRIPTIONS_PATH: &str = "/snowstorm/snomed-ct/v2/descriptions";

/// One description returned for a searched term.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupHit {
    pub term: Option<String>,
    pub concept_id: Option<String>,
    pub fsn: Option<String>,
    pub semantic_tag: Option<String>,
}

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(reqwest::StatusCode),
    #[error("malformed response: {0}")]
    Decode(String),
}

/// A vocabulary service that resolves a free-text term to concept hits.
pub trait Terminology: Send + Sync {
    fn search(
        &self,
        term: &str,
        lang: &str,
    ) -> impl Future<Output = Result<Vec<LookupHit>, LookupError>> + Send;

    /// Label reported to callers as the source of the matches.
    fn source(&self) -> &str;
}

#[derive(Debug, Clone)]
pub struct SnowstormClient {
    http: reqwest::Client,
    base: String,
}

impl SnowstormClient {
    /// Build a client with a per-request `timeout`. All lookups share the
    /// same connection pool.
    pub fn new(base: impl Into<String>, timeout: Duration) -> Result<Self, LookupError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(LookupError::Transport)?;
        Ok(Self {
            http,
            base: base.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    fn descriptions_url(&self) -> String {
        format!("{}{}", self.base, DESCRIPTIONS_PATH)
    }
}

impl Terminology for SnowstormClient {
    async fn search(&self, term: &str, lang: &str) -> Result<Vec<LookupHit>, LookupError> {
        let limit = RESULTS_PER_TERM.to_string();
        let response = self
            .http
            .get(self.descriptions_url())
            .query(&[
                ("active", "true"),
                ("conceptActive", "true"),
                ("groupByConcept", "true"),
                ("searchMode", "STANDARD"),
                ("term", term),
                ("limit", limit.as_str()),
            ])
            .header(ACCEPT_LANGUAGE, lang)
            .send()
            .await
            .map_err(LookupError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::Status(status));
        }
        let body = response.bytes().await.map_err(LookupError::Transport)?;
        let hits = decode_hits(&body)?;
        debug!("snowstorm returned {} hits for {term:?}", hits.len());
        Ok(hits)
    }

    fn source(&self) -> &str {
        &self.base
    }
}

#[derive(Deserialize)]
struct DescriptionPage {
    #[serde(default)]
    items: Option<Vec<DescriptionItem>>,
    #[serde(default)]
    matches: Option<Vec<DescriptionItem>>,
}

#[derive(Deserialize)]
struct DescriptionItem {
    term: Option<String>,
    concept: Option<ConceptRef>,
}

#[derive(Deserialize)]
struct ConceptRef {
    #[serde(rename = "conceptId")]
    concept_id: Option<String>,
    fsn: Option<FsnRef>,
}

#[derive(Deserialize)]
struct FsnRef {
    term: Option<String>,
    #[serde(rename = "semanticTag")]
    semantic_tag: Option<String>,
}

/// Decode a descriptions page. Hits come from `items`, or from `matches` when
/// `items` is absent or empty.
pub fn decode_hits(body: &[u8]) -> Result<Vec<LookupHit>, LookupError> {
    let page: DescriptionPage =
        serde_json::from_slice(body).map_err(|e| LookupError::Decode(e.to_string()))?;
    let items = match (page.items, page.matches) {
        (Some(items), _) if !items.is_empty() => items,
        (_, Some(matches)) => matches,
        _ => Vec::new(),
    };
    Ok(items.into_iter().map(LookupHit::from).collect())
}

impl From<DescriptionItem> for LookupHit {
    fn from(item: DescriptionItem) -> Self {
        let (concept_id, fsn) = match item.concept {
            Some(c) => (c.concept_id, c.fsn),
            None => (None, None),
        };
        let (fsn, semantic_tag) = match fsn {
            Some(f) => (f.term, f.semantic_tag),
            None => (None, None),
        };
        LookupHit {
            term: item.term,
            concept_id,
            fsn,
            semantic_tag,
        }
    }
}
