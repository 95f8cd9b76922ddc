use serde::Serialize;

/// Half-open `[start, end)` range of character indices into the raw text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Offset {
    pub start: usize,
    pub end: usize,
}

/// Per-char simple lowercase: one char in, one char out, so positions stay
/// aligned with the raw text. For `İ` the full lowercase is `i` plus a
/// combining dot; only the leading `i` is kept. No case folding beyond
/// lowercase, so `ſ` (long s) does not match `s` as it would under a regex
/// engine's ignore-case mode.
fn fold(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

/// Every non-overlapping occurrence of `term` in `raw`, scanning left to
/// right. Case-insensitive, accent-sensitive. An empty term never matches.
pub fn find_offsets(raw: &str, term: &str) -> Vec<Offset> {
    let needle: Vec<char> = term.chars().map(fold).collect();
    if needle.is_empty() {
        return Vec::new();
    }
    let hay: Vec<char> = raw.chars().map(fold).collect();

    let mut out = Vec::new();
    let mut i = 0;
    while i + needle.len() <= hay.len() {
        if hay[i..i + needle.len()] == needle[..] {
            out.push(Offset {
                start: i,
                end: i + needle.len(),
            });
            i += needle.len();
        } else {
            i += 1;
        }
    }
    out
}
