// src/pipeline/types.rs

//! Data flowing through the question pipeline, and the collaborator traits
//! that produce it.

use std::sync::Arc;

use crate::errors::TaskError;
use crate::pipeline::coref::{resolve_spans, CorefSpan};

/// A plain-text source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: String,
    pub text: String,
}

impl Document {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// One sentence of a parsed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSentence {
    /// Position of the sentence in the document.
    pub index: usize,
    /// Sentence text as it appears in the document.
    pub text: String,
    /// Coreference replacements reported by the parser, relative to `text`.
    pub coref_spans: Vec<CorefSpan>,
    /// `text` with coreference replacements applied; equal to `text` until
    /// [`resolve_coreferences`](ParsedSentence::resolve_coreferences) runs.
    pub resolved: String,
}

impl ParsedSentence {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            index,
            resolved: text.clone(),
            text,
            coref_spans: Vec::new(),
        }
    }

    pub fn with_coref_spans(mut self, spans: Vec<CorefSpan>) -> Self {
        self.coref_spans = spans;
        self
    }

    pub fn resolve_coreferences(&mut self) {
        if !self.coref_spans.is_empty() {
            self.resolved = resolve_spans(&self.text, &self.coref_spans);
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub source: Arc<Document>,
    pub sentences: Vec<ParsedSentence>,
}

/// A sentence chosen by the selector, in rank order.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedSentence {
    pub sentence: ParsedSentence,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedQuestion {
    pub question: String,
    pub answer: String,
    pub distractors: Vec<String>,
}

impl GeneratedQuestion {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            distractors: Vec::new(),
        }
    }

    /// A question is only usable if it has a non-blank answer.
    pub fn has_answer(&self) -> bool {
        !self.answer.trim().is_empty()
    }
}

/// Final output of one question-generation run.
#[derive(Debug, Clone)]
pub struct QuestionGenerationOutput {
    pub source: Arc<Document>,
    /// At most `num_questions` questions, in sentence rank order.
    pub questions: Vec<GeneratedQuestion>,
}

/// Stage 1: annotate a document and split it into sentences.
pub trait DocumentParser: Send + Sync {
    fn parse(&self, doc: &Arc<Document>) -> Result<ParsedDocument, TaskError>;
}

/// Stage 2: rank the sentences worth asking about, best first.
pub trait SentenceSelector: Send + Sync {
    fn select(&self, doc: &ParsedDocument) -> Result<Vec<RankedSentence>, TaskError>;
}

/// Stage 3: generate candidate questions for one sentence.
pub trait QuestionGenerator: Send + Sync {
    fn generate(&self, sentence: &RankedSentence) -> Result<Vec<GeneratedQuestion>, TaskError>;
}
