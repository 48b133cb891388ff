// src/pipeline/basic.rs

//! Simple text-only collaborators, enough to drive the pipeline from the CLI
//! without any NLP models.

use std::collections::HashSet;
use std::sync::Arc;

use regex::Regex;
use tracing::{trace, warn};

use crate::errors::TaskError;
use crate::pipeline::types::{
    Document, DocumentParser, GeneratedQuestion, ParsedDocument, ParsedSentence,
    QuestionGenerator, RankedSentence, SentenceSelector,
};

const SENTENCE_PATTERN: &str = r"[^.!?]+[.!?]*";
const BLANK: &str = "_____";

/// Splits text into sentences on `.`, `!` and `?`.
#[derive(Debug, Clone)]
pub struct BasicParser {
    splitter: Option<Regex>,
}

impl Default for BasicParser {
    fn default() -> Self {
        Self::new()
    }
}

impl BasicParser {
    pub fn new() -> Self {
        Self::with_pattern(SENTENCE_PATTERN)
    }

    /// Use a custom sentence pattern; each match is one sentence.
    ///
    /// An invalid pattern is logged and the whole document becomes a single
    /// sentence.
    pub fn with_pattern(pattern: &str) -> Self {
        let splitter = match Regex::new(pattern) {
            Ok(re) => Some(re),
            Err(e) => {
                warn!(pattern = %pattern, error = %e, "invalid sentence pattern; not splitting");
                None
            }
        };
        Self { splitter }
    }

    fn split<'t>(&self, text: &'t str) -> Vec<&'t str> {
        let pieces: Vec<&str> = match &self.splitter {
            Some(re) => re.find_iter(text).map(|m| m.as_str()).collect(),
            None => vec![text],
        };
        pieces
            .into_iter()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }
}

impl DocumentParser for BasicParser {
    fn parse(&self, doc: &Arc<Document>) -> Result<ParsedDocument, TaskError> {
        let sentences: Vec<ParsedSentence> = self
            .split(&doc.text)
            .into_iter()
            .enumerate()
            .map(|(index, text)| ParsedSentence::new(index, text))
            .collect();

        trace!(document = %doc.id, sentences = sentences.len(), "document split");

        Ok(ParsedDocument {
            source: Arc::clone(doc),
            sentences,
        })
    }
}

/// Ranks sentences by how many distinct content words they carry.
#[derive(Debug, Clone, Copy)]
pub struct BasicSelector {
    /// Sentences with fewer words are not worth asking about.
    pub min_words: usize,
    /// Words shorter than this do not count as content words.
    pub min_content_len: usize,
}

impl Default for BasicSelector {
    fn default() -> Self {
        Self {
            min_words: 4,
            min_content_len: 4,
        }
    }
}

impl BasicSelector {
    fn score(&self, text: &str) -> Option<f64> {
        let words: Vec<&str> = text.split_whitespace().collect();
        if words.len() < self.min_words {
            return None;
        }
        let content: HashSet<String> = words
            .iter()
            .map(|w| core_word(w).to_lowercase())
            .filter(|w| w.chars().count() >= self.min_content_len)
            .collect();
        Some(content.len() as f64)
    }
}

impl SentenceSelector for BasicSelector {
    fn select(&self, doc: &ParsedDocument) -> Result<Vec<RankedSentence>, TaskError> {
        let mut ranked: Vec<RankedSentence> = doc
            .sentences
            .iter()
            .filter_map(|sentence| {
                self.score(&sentence.resolved).map(|score| RankedSentence {
                    sentence: sentence.clone(),
                    score,
                })
            })
            .collect();

        // Stable: equal scores keep document order.
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(ranked)
    }
}

/// Fill-in-the-blank questions.
///
/// Blanks capitalised words (other than the first) and numbers; if the
/// sentence has none, blanks its longest word of at least `fallback_len`
/// characters.
#[derive(Debug, Clone, Copy)]
pub struct ClozeGenerator {
    pub fallback_len: usize,
}

impl Default for ClozeGenerator {
    fn default() -> Self {
        Self { fallback_len: 5 }
    }
}

impl ClozeGenerator {
    fn candidates(&self, tokens: &[&str]) -> Vec<usize> {
        let picked: Vec<usize> = tokens
            .iter()
            .enumerate()
            .filter(|(i, token)| {
                let word = core_word(token);
                let numeric = word.chars().any(|c| c.is_ascii_digit());
                let proper = *i > 0 && word.chars().next().is_some_and(char::is_uppercase);
                !word.is_empty() && (numeric || proper)
            })
            .map(|(i, _)| i)
            .collect();

        if !picked.is_empty() {
            return picked;
        }

        // Earliest of the longest words wins.
        let mut best: Option<(usize, usize)> = None;
        for (i, token) in tokens.iter().enumerate() {
            let len = core_word(token).chars().count();
            if len >= self.fallback_len && best.is_none_or(|(_, best_len)| len > best_len) {
                best = Some((i, len));
            }
        }
        best.map(|(i, _)| vec![i]).unwrap_or_default()
    }
}

impl QuestionGenerator for ClozeGenerator {
    fn generate(&self, sentence: &RankedSentence) -> Result<Vec<GeneratedQuestion>, TaskError> {
        let tokens: Vec<&str> = sentence.sentence.resolved.split_whitespace().collect();

        let questions = self
            .candidates(&tokens)
            .into_iter()
            .map(|blanked| {
                let answer = core_word(tokens[blanked]);
                let question = tokens
                    .iter()
                    .enumerate()
                    .map(|(i, token)| {
                        if i == blanked {
                            token.replacen(answer, BLANK, 1)
                        } else {
                            (*token).to_string()
                        }
                    })
                    .collect::<Vec<_>>()
                    .join(" ");
                GeneratedQuestion::new(question, answer)
            })
            .collect();

        Ok(questions)
    }
}

/// Strip surrounding punctuation from a whitespace-delimited token.
fn core_word(token: &str) -> &str {
    token.trim_matches(|c: char| !c.is_alphanumeric())
}
