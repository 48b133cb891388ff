#![allow(dead_code)]

use std::collections::BTreeMap;

use jobflow::config::{ConfigFile, ExecutorConfig, QuestGenSection, RawConfigFile};
use jobflow::errors::Result;

/// Builder for `ConfigFile` to simplify test setup.
///
/// Starts with no executors at all; add the ones the test needs.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                executor: BTreeMap::new(),
                questgen: QuestGenSection::default(),
            },
        }
    }

    /// The three default stage executors, one worker each.
    pub fn with_stage_executors(self) -> Self {
        self.with_executor("parse", 1)
            .with_executor("select", 1)
            .with_executor("generate", 1)
    }

    pub fn with_executor(mut self, name: &str, workers: usize) -> Self {
        self.config
            .executor
            .insert(name.to_string(), ExecutorConfig { workers });
        self
    }

    pub fn num_questions(mut self, n: usize) -> Self {
        self.config.questgen.num_questions = n;
        self
    }

    pub fn num_distractors(mut self, n: usize) -> Self {
        self.config.questgen.num_distractors = n;
        self
    }

    pub fn best_question_pool(mut self, n: usize) -> Self {
        self.config.questgen.best_question_pool = n;
        self
    }

    pub fn generate_executor(mut self, name: &str) -> Self {
        self.config.questgen.generate_executor = name.to_string();
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.questgen.seed = Some(seed);
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn try_build(self) -> Result<ConfigFile> {
        ConfigFile::try_from(self.config)
    }

    pub fn build(self) -> ConfigFile {
        self.try_build()
            .expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}
