//! Scripted pipeline collaborators.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use jobflow::errors::TaskError;
use jobflow::pipeline::coref::CorefSpan;
use jobflow::pipeline::{
    Document, DocumentParser, GeneratedQuestion, ParsedDocument, ParsedSentence,
    QuestionGenerator, RankedSentence, SentenceSelector,
};

/// Ignores the document text and returns a fixed list of sentences.
#[derive(Debug, Clone, Default)]
pub struct StubParser {
    sentences: Vec<ParsedSentence>,
    fail: Option<String>,
}

impl StubParser {
    pub fn new<S: AsRef<str>>(sentences: &[S]) -> Self {
        Self {
            sentences: sentences
                .iter()
                .enumerate()
                .map(|(i, s)| ParsedSentence::new(i, s.as_ref()))
                .collect(),
            fail: None,
        }
    }

    /// `n` sentences named "sentence 0" … "sentence n-1".
    pub fn numbered(n: usize) -> Self {
        let sentences: Vec<String> = (0..n).map(|i| format!("sentence {i}")).collect();
        Self::new(&sentences)
    }

    pub fn with_spans(mut self, index: usize, spans: Vec<CorefSpan>) -> Self {
        if let Some(sentence) = self.sentences.get_mut(index) {
            sentence.coref_spans = spans;
        }
        self
    }

    pub fn failing(message: &str) -> Self {
        Self {
            sentences: Vec::new(),
            fail: Some(message.to_string()),
        }
    }
}

impl DocumentParser for StubParser {
    fn parse(&self, doc: &Arc<Document>) -> Result<ParsedDocument, TaskError> {
        if let Some(message) = &self.fail {
            return Err(TaskError::failed(message.clone()));
        }
        Ok(ParsedDocument {
            source: Arc::clone(doc),
            sentences: self.sentences.clone(),
        })
    }
}

/// Keeps every sentence, in document order, with descending scores.
#[derive(Debug, Clone, Copy, Default)]
pub struct InOrderSelector;

impl SentenceSelector for InOrderSelector {
    fn select(&self, doc: &ParsedDocument) -> Result<Vec<RankedSentence>, TaskError> {
        let n = doc.sentences.len();
        Ok(doc
            .sentences
            .iter()
            .enumerate()
            .map(|(i, sentence)| RankedSentence {
                sentence: sentence.clone(),
                score: (n - i) as f64,
            })
            .collect())
    }
}

#[derive(Debug, Clone)]
enum Script {
    Questions(Vec<GeneratedQuestion>),
    Empty,
    Fail(String),
    Panic,
}

/// Generator scripted per sentence index.
///
/// Unscripted sentences yield one question, "question {i}?", answered by
/// "answer {i}". Every call is recorded with the resolved sentence text.
#[derive(Debug, Default)]
pub struct ScriptedGenerator {
    scripts: HashMap<usize, Script>,
    calls: Mutex<Vec<(usize, String)>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn questions_for(mut self, index: usize, questions: Vec<GeneratedQuestion>) -> Self {
        self.scripts.insert(index, Script::Questions(questions));
        self
    }

    pub fn empty_for(mut self, index: usize) -> Self {
        self.scripts.insert(index, Script::Empty);
        self
    }

    pub fn fail_for(mut self, index: usize) -> Self {
        self.scripts
            .insert(index, Script::Fail(format!("scripted failure for sentence {index}")));
        self
    }

    pub fn panic_for(mut self, index: usize) -> Self {
        self.scripts.insert(index, Script::Panic);
        self
    }

    /// Sentence indices generated for, in call order.
    pub fn called_indices(&self) -> Vec<usize> {
        self.calls.lock().unwrap().iter().map(|(i, _)| *i).collect()
    }

    /// Resolved text of every sentence generated for, in call order.
    pub fn called_texts(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(_, t)| t.clone()).collect()
    }
}

impl QuestionGenerator for ScriptedGenerator {
    fn generate(&self, ranked: &RankedSentence) -> Result<Vec<GeneratedQuestion>, TaskError> {
        let index = ranked.sentence.index;
        self.calls
            .lock()
            .unwrap()
            .push((index, ranked.sentence.resolved.clone()));

        match self.scripts.get(&index) {
            Some(Script::Questions(questions)) => Ok(questions.clone()),
            Some(Script::Empty) => Ok(Vec::new()),
            Some(Script::Fail(message)) => Err(TaskError::failed(message.clone())),
            Some(Script::Panic) => panic!("scripted panic for sentence {index}"),
            None => Ok(vec![GeneratedQuestion::new(
                format!("question {index}?"),
                format!("answer {index}"),
            )]),
        }
    }
}
