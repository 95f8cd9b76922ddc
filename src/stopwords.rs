use std::collections::HashSet;

use crate::text::normalize;

/// Spanish function words plus a few clinical-discourse fillers that never
/// stand on their own as a candidate.
const SPANISH_CLINICAL: &[&str] = &[
    // articles
    "el", "la", "lo", "los", "las", "un", "una", "al", "del",
    // prepositions
    "a", "ante", "bajo", "cabe", "con", "contra", "de", "desde", "en", "entre", "hacia",
    "hasta", "para", "por", "según", "sin", "so", "sobre", "tras",
    // conjunctions
    "y", "e", "ni", "o", "u", "que",
    // clinical fillers
    "actual", "previa", "previo", "antecedente", "antecedentes", "paciente", "pacientes",
];

/// Immutable stopword set, stored in normalized form.
///
/// Built once at startup and shared by reference into every pipeline run.
#[derive(Debug)]
pub struct Stopwords {
    words: HashSet<String>,
}

impl Stopwords {
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            words: words.into_iter().map(|w| normalize(w.as_ref())).collect(),
        }
    }

    pub fn spanish_clinical() -> Self {
        Self::from_words(SPANISH_CLINICAL)
    }

    /// `normalized` must already be in normalized form.
    pub fn contains(&self, normalized: &str) -> bool {
        self.words.contains(normalized)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl Default for Stopwords {
    fn default() -> Self {
        Self::spanish_clinical()
    }
}
