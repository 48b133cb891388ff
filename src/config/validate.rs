// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{JobflowError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::JobflowError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.executor, raw.questgen))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_executors(cfg)?;
    validate_executors(cfg)?;
    validate_questgen(cfg)?;
    validate_executor_references(cfg)?;
    Ok(())
}

fn ensure_has_executors(cfg: &RawConfigFile) -> Result<()> {
    if cfg.executor.is_empty() {
        return Err(JobflowError::ConfigError(
            "config must declare at least one [executor.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_executors(cfg: &RawConfigFile) -> Result<()> {
    for (name, executor) in cfg.executor.iter() {
        if executor.workers == 0 {
            return Err(JobflowError::ConfigError(format!(
                "[executor.{}].workers must be >= 1 (got 0)",
                name
            )));
        }
    }
    Ok(())
}

fn validate_questgen(cfg: &RawConfigFile) -> Result<()> {
    let qg = &cfg.questgen;

    if qg.num_questions == 0 {
        return Err(JobflowError::ConfigError(
            "[questgen].num_questions must be >= 1 (got 0)".to_string(),
        ));
    }

    if qg.best_question_pool == 0 {
        return Err(JobflowError::ConfigError(
            "[questgen].best_question_pool must be >= 1 (got 0)".to_string(),
        ));
    }

    Ok(())
}

fn validate_executor_references(cfg: &RawConfigFile) -> Result<()> {
    let qg = &cfg.questgen;
    let references = [
        ("parse_executor", &qg.parse_executor),
        ("select_executor", &qg.select_executor),
        ("generate_executor", &qg.generate_executor),
    ];

    for (field, name) in references {
        if !cfg.executor.contains_key(name.as_str()) {
            return Err(JobflowError::ConfigError(format!(
                "[questgen].{} refers to unknown executor '{}'",
                field, name
            )));
        }
    }
    Ok(())
}
