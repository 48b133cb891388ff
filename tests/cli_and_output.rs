mod common;
use crate::common::builders::ConfigFileBuilder;

use std::fs;
use std::sync::Arc;

use clap::Parser;
use jobflow::cli::{CliArgs, LogLevel};
use jobflow::logging::build_filter;
use jobflow::pipeline::{Document, GeneratedQuestion, QuestionGenerationOutput};
use jobflow::{load_config, render_dry_run, render_output};

type TestResult = Result<(), Box<dyn std::error::Error>>;

#[test]
fn args_parse_with_overrides() -> TestResult {
    let args = CliArgs::try_parse_from([
        "jobflow",
        "--config",
        "custom.toml",
        "--num-questions",
        "3",
        "--seed",
        "9",
        "--log-level",
        "debug",
        "a.txt",
        "b.txt",
    ])?;

    assert_eq!(args.files.len(), 2);
    assert_eq!(args.config.as_deref(), Some(std::path::Path::new("custom.toml")));
    assert_eq!(args.num_questions, Some(3));
    assert_eq!(args.seed, Some(9));
    assert!(matches!(args.log_level, Some(LogLevel::Debug)));
    assert!(!args.dry_run);
    Ok(())
}

#[test]
fn files_are_required_unless_dry_run() {
    assert!(CliArgs::try_parse_from(["jobflow"]).is_err());
    assert!(CliArgs::try_parse_from(["jobflow", "--dry-run"]).is_ok());
}

#[test]
fn overrides_apply_before_validation() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("Jobflow.toml");
    fs::write(&path, "[questgen]\nnum_questions = 2\nseed = 1\n")?;
    let path_arg = path.to_string_lossy().to_string();

    let args = CliArgs::try_parse_from(["jobflow", "--config", path_arg.as_str(), "--seed", "8", "x.txt"])?;
    let cfg = load_config(&args)?;
    assert_eq!(cfg.questgen.num_questions, 2);
    assert_eq!(cfg.questgen.seed, Some(8));

    let args = CliArgs::try_parse_from([
        "jobflow",
        "--config",
        path_arg.as_str(),
        "--num-questions",
        "0",
        "x.txt",
    ])?;
    let err = load_config(&args).unwrap_err();
    assert!(format!("{err:#}").contains("num_questions"), "{err:#}");
    Ok(())
}

#[test]
fn missing_explicit_config_is_an_error() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path_arg = dir.path().join("absent.toml").to_string_lossy().to_string();
    let args = CliArgs::try_parse_from(["jobflow", "--config", path_arg.as_str(), "x.txt"])?;

    let err = load_config(&args).unwrap_err();
    assert!(format!("{err:#}").contains("absent.toml"), "{err:#}");
    Ok(())
}

#[test]
fn output_lists_questions_answers_and_distractors() {
    let mut q = GeneratedQuestion::new("Who discovered _____?", "Curie");
    q.distractors = vec!["Bohr".to_string(), "Planck".to_string()];
    let output = QuestionGenerationOutput {
        source: Arc::new(Document::new("notes.txt", "")),
        questions: vec![q],
    };

    let text = render_output(&output);

    assert_eq!(
        text,
        "== notes.txt ==\n\
         1. Who discovered _____?\n   \
         answer: Curie\n   \
         distractors: Bohr, Planck\n\n"
    );

    let empty = QuestionGenerationOutput {
        source: Arc::new(Document::new("blank.txt", "")),
        questions: Vec::new(),
    };
    assert!(render_output(&empty).contains("(no questions)"));
}

#[test]
fn dry_run_prints_effective_config() {
    let cfg = ConfigFileBuilder::new()
        .with_stage_executors()
        .with_executor("generate", 4)
        .seed(42)
        .build();

    let text = render_dry_run(&cfg);

    assert!(text.starts_with("jobflow dry-run\n"));
    assert!(text.contains("  - generate: workers = 4\n"));
    assert!(text.contains("  num_questions = 5\n"));
    assert!(text.contains("  seed = 42\n"));
}

#[test]
fn log_filter_precedence() {
    assert_eq!(build_filter(Some(LogLevel::Trace), Some("warn")).to_string(), "trace");
    assert_eq!(build_filter(None, Some("jobflow=debug")).to_string(), "jobflow=debug");
    assert_eq!(build_filter(None, Some("  ")).to_string(), "info");
    assert_eq!(build_filter(None, None).to_string(), "info");
}
