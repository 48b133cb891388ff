// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

/// Default executor names, one per question-generation stage.
pub const PARSE_EXECUTOR: &str = "parse";
pub const SELECT_EXECUTOR: &str = "select";
pub const GENERATE_EXECUTOR: &str = "generate";

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [executor.parse]
/// workers = 2
///
/// [executor.generate]
/// workers = 4
///
/// [questgen]
/// num_questions = 5
/// num_distractors = 3
/// seed = 42
/// ```
///
/// All sections are optional. Declaring any `[executor.<name>]` table
/// replaces the default set of executors entirely.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    /// Worker pools from `[executor.<name>]`, keyed by name.
    #[serde(default = "default_executors")]
    pub executor: BTreeMap<String, ExecutorConfig>,

    /// Question-generation parameters from `[questgen]`.
    #[serde(default)]
    pub questgen: QuestGenSection,
}

impl Default for RawConfigFile {
    fn default() -> Self {
        Self {
            executor: default_executors(),
            questgen: QuestGenSection::default(),
        }
    }
}

/// Validated configuration.
///
/// Only constructible through `TryFrom<RawConfigFile>` (see `validate.rs`),
/// so every executor reference is known to resolve.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub executor: BTreeMap<String, ExecutorConfig>,
    pub questgen: QuestGenSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        executor: BTreeMap<String, ExecutorConfig>,
        questgen: QuestGenSection,
    ) -> Self {
        Self { executor, questgen }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        let raw = RawConfigFile::default();
        Self::new_unchecked(raw.executor, raw.questgen)
    }
}

/// `[executor.<name>]` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ExecutorConfig {
    /// Maximum number of task bodies running at once on this pool.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
        }
    }
}

/// `[questgen]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QuestGenSection {
    /// Target number of questions per document (K).
    #[serde(default = "default_num_questions")]
    pub num_questions: usize,

    /// Distractors attached to each question (D).
    #[serde(default = "default_num_distractors")]
    pub num_distractors: usize,

    /// The question kept for a sentence is picked among its first N candidates.
    #[serde(default = "default_best_question_pool")]
    pub best_question_pool: usize,

    #[serde(default = "default_parse_executor")]
    pub parse_executor: String,

    #[serde(default = "default_select_executor")]
    pub select_executor: String,

    #[serde(default = "default_generate_executor")]
    pub generate_executor: String,

    /// Seed for question and distractor picks; random when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for QuestGenSection {
    fn default() -> Self {
        Self {
            num_questions: default_num_questions(),
            num_distractors: default_num_distractors(),
            best_question_pool: default_best_question_pool(),
            parse_executor: default_parse_executor(),
            select_executor: default_select_executor(),
            generate_executor: default_generate_executor(),
            seed: None,
        }
    }
}

fn default_executors() -> BTreeMap<String, ExecutorConfig> {
    let mut executors = BTreeMap::new();
    executors.insert(PARSE_EXECUTOR.to_string(), ExecutorConfig { workers: 2 });
    executors.insert(SELECT_EXECUTOR.to_string(), ExecutorConfig { workers: 1 });
    executors.insert(GENERATE_EXECUTOR.to_string(), ExecutorConfig { workers: 4 });
    executors
}

fn default_workers() -> usize {
    1
}

fn default_num_questions() -> usize {
    5
}

fn default_num_distractors() -> usize {
    3
}

fn default_best_question_pool() -> usize {
    3
}

fn default_parse_executor() -> String {
    PARSE_EXECUTOR.to_string()
}

fn default_select_executor() -> String {
    SELECT_EXECUTOR.to_string()
}

fn default_generate_executor() -> String {
    GENERATE_EXECUTOR.to_string()
}
