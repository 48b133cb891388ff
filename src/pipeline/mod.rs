// src/pipeline/mod.rs

//! Pipelines built on the scheduling engine.
//!
//! A pipeline registers result handlers on a [`TaskLinker`](crate::job::TaskLinker),
//! seeds its first task and lets the handlers drive the rest of the job.
//!
//! - [`op`] is the common [`PipelineOp`] surface (cancel, completion state,
//!   description).
//! - [`questgen`] is the parse → select → generate question pipeline.
//! - [`types`] holds the documents, sentences and questions flowing through it
//!   and the collaborator traits that do the actual language work.
//! - [`coref`] splices coreference replacements into sentence text.
//! - [`distractors`] picks questions and distractors with an injectable RNG.
//! - [`basic`] has simple collaborators used by the CLI.

pub mod basic;
pub mod coref;
pub mod distractors;
pub mod op;
pub mod questgen;
pub mod types;

pub use op::PipelineOp;
pub use questgen::{
    CompletionCallback, QuestGenParams, QuestGenResult, QuestGenStage, QuestionGenerationInput,
    QuestionGenerationOp, SelectionCallback,
};
pub use types::{
    Document, DocumentParser, GeneratedQuestion, ParsedDocument, ParsedSentence,
    QuestionGenerationOutput, QuestionGenerator, RankedSentence, SentenceSelector,
};
