//! Tokenization and comparison-form normalization.
//!
//! Tokens keep the caller's casing and accents; the normalized form is only
//! ever used as a filtering or deduplication key.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// A contiguous run of letters and digits taken from the raw text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub text: &'a str,
    /// Character (not byte) index of the first char in the raw text.
    pub start: usize,
}

/// Spanish accented letters accepted inside a token, in addition to ASCII
/// letters and digits.
const ACCENTED: &str = "ÁÉÍÓÚÜÑáéíóúüñ";

fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || ACCENTED.contains(c)
}

/// Split `raw` into tokens. Whitespace, punctuation and any other character
/// outside the token alphabet act as delimiters and are dropped.
pub fn tokenize(raw: &str) -> Vec<Token<'_>> {
    let mut out = Vec::new();
    let mut current: Option<(usize, usize)> = None;

    for (char_idx, (byte_idx, c)) in raw.char_indices().enumerate() {
        if is_token_char(c) {
            if current.is_none() {
                current = Some((byte_idx, char_idx));
            }
        } else if let Some((byte_start, char_start)) = current.take() {
            out.push(Token {
                text: &raw[byte_start..byte_idx],
                start: char_start,
            });
        }
    }
    if let Some((byte_start, char_start)) = current {
        out.push(Token {
            text: &raw[byte_start..],
            start: char_start,
        });
    }
    out
}

/// Lowercase, decompose, and drop combining marks.
///
/// `normalize(normalize(s)) == normalize(s)` for every input.
pub fn normalize(s: &str) -> String {
    s.to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect()
}
