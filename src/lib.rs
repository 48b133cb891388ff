// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod job;
pub mod logging;
pub mod pipeline;

use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{ConfigFile, RawConfigFile, default_config_path, load_from_path};
use crate::exec::{Executor, ExecutorSet};
use crate::job::JobHandle;
use crate::pipeline::{
    Document, PipelineOp, QuestGenParams, QuestGenResult, QuestionGenerationInput,
    QuestionGenerationOp, QuestionGenerationOutput,
};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and CLI overrides
/// - one executor pool per `[executor.<name>]`
/// - one question-generation job per input file, all sharing those pools
/// - Ctrl-C handling (cancels every running job)
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_config(&args)?;

    if args.dry_run {
        print!("{}", render_dry_run(&cfg));
        return Ok(());
    }

    let documents = read_documents(&args.files)?;

    let executors = ExecutorSet::from_config(&cfg, &Handle::current());
    let parse: Arc<dyn Executor<QuestGenResult>> = executors.get(&cfg.questgen.parse_executor)?;
    let select: Arc<dyn Executor<QuestGenResult>> = executors.get(&cfg.questgen.select_executor)?;
    let generate: Arc<dyn Executor<QuestGenResult>> =
        executors.get(&cfg.questgen.generate_executor)?;
    let params = QuestGenParams::from(&cfg.questgen);

    let mut running = Vec::with_capacity(documents.len());
    for document in documents {
        let (tx, rx) = oneshot::channel::<QuestionGenerationOutput>();
        let source = document.id.clone();

        let input = QuestionGenerationInput::new(
            document,
            Arc::clone(&parse),
            Arc::clone(&select),
            Arc::clone(&generate),
        )
        .params(params)
        .on_selection(move |top| {
            debug!(source = %source, selected = top.len(), "top sentences chosen");
        })
        .on_complete(move |output| {
            // Receiver gone means the CLI is already shutting down.
            let _ = tx.send(output);
        });

        let op = QuestionGenerationOp::start(input)?;
        info!(op = %op.description(), "operation started");
        running.push((op, rx));
    }

    // Ctrl-C → cancel every job; completion still fires for each.
    let jobs: Vec<JobHandle<QuestGenResult>> =
        running.iter().map(|(op, _)| op.job().clone()).collect();
    let interrupt = tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            eprintln!("failed to listen for Ctrl+C: {e}");
            return;
        }
        warn!(jobs = jobs.len(), "interrupted; cancelling running jobs");
        for job in &jobs {
            job.cancel();
        }
    });

    for (op, rx) in running {
        match rx.await {
            Ok(output) => print!("{}", render_output(&output)),
            Err(_) => {
                // The op dropped its sender without calling back: cancelled.
                println!("== {} ==\n  (cancelled)\n", op.source().id);
            }
        }
        debug!(op = %op.description(), "operation finished");
    }

    interrupt.abort();
    executors.close_all();
    Ok(())
}

/// Load the config (explicit path, `Jobflow.toml` if present, or defaults),
/// apply CLI overrides, then validate.
pub fn load_config(args: &CliArgs) -> Result<ConfigFile> {
    let mut raw = match &args.config {
        Some(path) => load_from_path(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => {
            let path = default_config_path();
            if path.exists() {
                load_from_path(&path)
                    .with_context(|| format!("loading config from {}", path.display()))?
            } else {
                debug!(path = %path.display(), "no config file; using defaults");
                RawConfigFile::default()
            }
        }
    };

    if let Some(n) = args.num_questions {
        raw.questgen.num_questions = n;
    }
    if let Some(seed) = args.seed {
        raw.questgen.seed = Some(seed);
    }

    Ok(ConfigFile::try_from(raw)?)
}

fn read_documents(files: &[PathBuf]) -> Result<Vec<Document>> {
    files
        .iter()
        .map(|path| {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading document {}", path.display()))?;
            Ok(Document::new(path.display().to_string(), text))
        })
        .collect()
}

/// Human-readable listing of one document's questions.
pub fn render_output(output: &QuestionGenerationOutput) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== {} ==", output.source.id);
    if output.questions.is_empty() {
        let _ = writeln!(out, "  (no questions)");
    }
    for (i, q) in output.questions.iter().enumerate() {
        let _ = writeln!(out, "{}. {}", i + 1, q.question);
        let _ = writeln!(out, "   answer: {}", q.answer);
        if !q.distractors.is_empty() {
            let _ = writeln!(out, "   distractors: {}", q.distractors.join(", "));
        }
    }
    out.push('\n');
    out
}

/// Effective configuration, as printed by `--dry-run`.
pub fn render_dry_run(cfg: &ConfigFile) -> String {
    let qg = &cfg.questgen;
    let mut out = String::new();
    let _ = writeln!(out, "jobflow dry-run");
    let _ = writeln!(out, "executors ({}):", cfg.executor.len());
    for (name, executor) in cfg.executor.iter() {
        let _ = writeln!(out, "  - {name}: workers = {}", executor.workers);
    }
    let _ = writeln!(out, "questgen:");
    let _ = writeln!(out, "  num_questions = {}", qg.num_questions);
    let _ = writeln!(out, "  num_distractors = {}", qg.num_distractors);
    let _ = writeln!(out, "  best_question_pool = {}", qg.best_question_pool);
    let _ = writeln!(out, "  parse_executor = {}", qg.parse_executor);
    let _ = writeln!(out, "  select_executor = {}", qg.select_executor);
    let _ = writeln!(out, "  generate_executor = {}", qg.generate_executor);
    match qg.seed {
        Some(seed) => {
            let _ = writeln!(out, "  seed = {seed}");
        }
        None => {
            let _ = writeln!(out, "  seed = (random)");
        }
    }
    out
}
