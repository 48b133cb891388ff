// src/pipeline/coref.rs

//! Coreference replacement: rewrite a sentence with each pronoun-like mention
//! replaced by its representative mention.

use tracing::{trace, warn};

/// Replace `text[begin..end]` (byte offsets) with `replacement`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CorefSpan {
    pub begin: usize,
    pub end: usize,
    pub replacement: String,
}

impl CorefSpan {
    pub fn new(begin: usize, end: usize, replacement: impl Into<String>) -> Self {
        Self {
            begin,
            end,
            replacement: replacement.into(),
        }
    }
}

/// Rebuild `text` with the given replacements spliced in.
///
/// Spans are deduplicated and processed in ascending `(begin, end)` order. A
/// span that starts before the previously kept span ends is dropped: the
/// earliest start wins, regardless of length. Spans outside `text` or not on
/// char boundaries are dropped too.
pub fn resolve_spans(text: &str, spans: &[CorefSpan]) -> String {
    let mut ordered: Vec<&CorefSpan> = spans
        .iter()
        .filter(|span| {
            let valid = span.begin <= span.end
                && span.end <= text.len()
                && text.is_char_boundary(span.begin)
                && text.is_char_boundary(span.end);
            if !valid {
                warn!(
                    begin = span.begin,
                    end = span.end,
                    len = text.len(),
                    "invalid coreference span; ignoring"
                );
            }
            valid
        })
        .collect();
    ordered.sort();
    ordered.dedup();

    let mut kept: Vec<&CorefSpan> = Vec::with_capacity(ordered.len());
    let mut dropped = 0usize;
    for span in ordered {
        match kept.last() {
            Some(previous) if span.begin < previous.end => dropped += 1,
            _ => kept.push(span),
        }
    }

    if dropped > 0 {
        trace!(dropped, "removed overlapping coreference spans");
    }

    let mut resolved = String::with_capacity(text.len());
    let mut last = 0;
    for span in kept {
        resolved.push_str(&text[last..span.begin]);
        resolved.push_str(&span.replacement);
        last = span.end;
    }
    resolved.push_str(&text[last..]);
    resolved
}
