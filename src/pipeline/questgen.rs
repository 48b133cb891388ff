// src/pipeline/questgen.rs

//! Question generation: parse → select sentences → generate questions.
//!
//! The parse task seeds one selection task; the selection handler fans out
//! up to K generation tasks and the generation handlers fan back in. Once no
//! generation task is outstanding, the last handler aggregates one question
//! per sentence (with distractors drawn from the other sentences' answers)
//! and the job drains through the scheduler's own count.
//!
//! Generation slots: a completion that yields a usable question, or that
//! fails, consumes one of the K slots. A successful completion that yields no
//! usable question frees its slot and the next unused sentence is queued in
//! its place. Failed tasks are not replaced.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, Weak};

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use crate::config::QuestGenSection;
use crate::errors::{JobflowError, Result, TaskError};
use crate::exec::Executor;
use crate::job::{task_fn, JobHandle, Scheduler, TaggedResult, TaskFailure, TaskLinker};
use crate::pipeline::basic::{BasicParser, BasicSelector, ClozeGenerator};
use crate::pipeline::distractors::{distractor_pool, pick_distractors, pick_question_index};
use crate::pipeline::op::PipelineOp;
use crate::pipeline::types::{
    Document, DocumentParser, GeneratedQuestion, ParsedDocument, QuestionGenerationOutput,
    QuestionGenerator, RankedSentence, SentenceSelector,
};

const OP_NAME: &str = "question-generation";

/// Result kinds of the question pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuestGenStage {
    Parse,
    Select,
    Generate,
}

impl QuestGenStage {
    pub fn as_str(self) -> &'static str {
        match self {
            QuestGenStage::Parse => "parse",
            QuestGenStage::Select => "select",
            QuestGenStage::Generate => "generate",
        }
    }
}

impl fmt::Display for QuestGenStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub enum QuestGenResult {
    Parsed(ParsedDocument),
    Selected(Vec<RankedSentence>),
    /// Questions generated for the sentence at position `rank` of the
    /// selection.
    Generated {
        rank: usize,
        questions: Vec<GeneratedQuestion>,
    },
}

impl TaggedResult for QuestGenResult {
    type Kind = QuestGenStage;

    fn kind(&self) -> QuestGenStage {
        match self {
            QuestGenResult::Parsed(_) => QuestGenStage::Parse,
            QuestGenResult::Selected(_) => QuestGenStage::Select,
            QuestGenResult::Generated { .. } => QuestGenStage::Generate,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestGenParams {
    /// Target number of questions (K).
    pub num_questions: usize,
    /// Distractors per question (D).
    pub num_distractors: usize,
    pub best_question_pool: usize,
    pub seed: Option<u64>,
}

impl Default for QuestGenParams {
    fn default() -> Self {
        Self::from(&QuestGenSection::default())
    }
}

impl From<&QuestGenSection> for QuestGenParams {
    fn from(section: &QuestGenSection) -> Self {
        Self {
            num_questions: section.num_questions,
            num_distractors: section.num_distractors,
            best_question_pool: section.best_question_pool,
            seed: section.seed,
        }
    }
}

pub type SelectionCallback = Box<dyn Fn(&[RankedSentence]) + Send + Sync>;
pub type CompletionCallback = Box<dyn FnOnce(QuestionGenerationOutput) + Send>;

type StageExecutor = Arc<dyn Executor<QuestGenResult>>;

/// Everything needed to start one question-generation run.
pub struct QuestionGenerationInput {
    pub document: Document,
    pub parser: Arc<dyn DocumentParser>,
    pub selector: Arc<dyn SentenceSelector>,
    pub generator: Arc<dyn QuestionGenerator>,
    pub parse_executor: StageExecutor,
    pub select_executor: StageExecutor,
    pub generate_executor: StageExecutor,
    pub params: QuestGenParams,
    /// Called with the top `min(K, n)` sentences as soon as selection is done.
    pub on_selection: Option<SelectionCallback>,
    /// Called with the output when the job completes without being cancelled.
    pub on_complete: Option<CompletionCallback>,
}

impl QuestionGenerationInput {
    /// Input using the basic collaborators and default parameters.
    pub fn new(
        document: Document,
        parse_executor: StageExecutor,
        select_executor: StageExecutor,
        generate_executor: StageExecutor,
    ) -> Self {
        Self {
            document,
            parser: Arc::new(BasicParser::new()),
            selector: Arc::new(BasicSelector::default()),
            generator: Arc::new(ClozeGenerator::default()),
            parse_executor,
            select_executor,
            generate_executor,
            params: QuestGenParams::default(),
            on_selection: None,
            on_complete: None,
        }
    }

    pub fn parser(mut self, parser: Arc<dyn DocumentParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn selector(mut self, selector: Arc<dyn SentenceSelector>) -> Self {
        self.selector = selector;
        self
    }

    pub fn generator(mut self, generator: Arc<dyn QuestionGenerator>) -> Self {
        self.generator = generator;
        self
    }

    pub fn params(mut self, params: QuestGenParams) -> Self {
        self.params = params;
        self
    }

    pub fn on_selection<F>(mut self, callback: F) -> Self
    where
        F: Fn(&[RankedSentence]) + Send + Sync + 'static,
    {
        self.on_selection = Some(Box::new(callback));
        self
    }

    pub fn on_complete<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(QuestionGenerationOutput) + Send + 'static,
    {
        self.on_complete = Some(Box::new(callback));
        self
    }
}

/// Job-scoped accumulator. Only touched by result handlers and the
/// completion continuation, always under the `Stages::state` lock.
struct QuestGenState {
    ranked: Vec<RankedSentence>,
    next_sentence: usize,
    /// Generation tasks planned or running.
    outstanding: usize,
    /// Generation slots used up by usable output or failure.
    consumed: usize,
    /// Usable questions keyed by sentence rank.
    generated: BTreeMap<usize, Vec<GeneratedQuestion>>,
    output: Vec<GeneratedQuestion>,
    aggregated: bool,
    rng: StdRng,
}

impl QuestGenState {
    fn new(params: &QuestGenParams) -> Self {
        let rng = match params.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            ranked: Vec::new(),
            next_sentence: 0,
            outstanding: 0,
            consumed: 0,
            generated: BTreeMap::new(),
            output: Vec::new(),
            aggregated: false,
            rng,
        }
    }

    /// Reserve generation slots for unused sentences, up to `target`.
    fn plan_wave(&mut self, target: usize) -> Vec<(usize, RankedSentence)> {
        let mut wave = Vec::new();
        while self.outstanding + self.consumed < target && self.next_sentence < self.ranked.len()
        {
            let rank = self.next_sentence;
            wave.push((rank, self.ranked[rank].clone()));
            self.next_sentence += 1;
            self.outstanding += 1;
        }
        wave
    }

    fn aggregate(&mut self, params: &QuestGenParams) {
        if self.aggregated {
            return;
        }
        self.aggregated = true;

        let pool = distractor_pool(
            self.generated
                .values()
                .flatten()
                .map(|q| q.answer.as_str()),
        );

        for questions in self.generated.values() {
            if self.output.len() >= params.num_questions {
                break;
            }

            let index = pick_question_index(questions.len(), params.best_question_pool, &mut self.rng);
            let mut pick = questions[index].clone();
            pick.distractors =
                pick_distractors(&pick.answer, &pool, params.num_distractors, &mut self.rng);

            if pick.distractors.len() < params.num_distractors {
                warn!(
                    question = %pick.question,
                    found = pick.distractors.len(),
                    wanted = params.num_distractors,
                    "not enough distractors for question"
                );
            }

            self.output.push(pick);
        }
    }
}

/// Shared wiring captured by the result handlers.
struct Stages {
    name: String,
    selector: Arc<dyn SentenceSelector>,
    generator: Arc<dyn QuestionGenerator>,
    select_executor: StageExecutor,
    generate_executor: StageExecutor,
    params: QuestGenParams,
    on_selection: Option<SelectionCallback>,
    state: Mutex<QuestGenState>,
    /// Weak: the linker owns the handlers that own `Stages`.
    linker: OnceLock<Weak<TaskLinker<QuestGenResult>>>,
}

impl Stages {
    fn state(&self) -> MutexGuard<'_, QuestGenState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn linker(&self) -> Result<Arc<TaskLinker<QuestGenResult>>> {
        self.linker
            .get()
            .and_then(Weak::upgrade)
            .ok_or_else(|| JobflowError::Other(anyhow::anyhow!("{} linker no longer alive", self.name)))
    }

    fn on_parsed(&self, scheduler: &mut Scheduler<QuestGenResult>, doc: ParsedDocument) -> Result<()> {
        debug!(
            job = %scheduler.job().id(),
            sentences = doc.sentences.len(),
            "document parsed; queuing sentence selection"
        );

        let selector = Arc::clone(&self.selector);
        let linker = self.linker()?;
        let body = task_fn(QuestGenStage::Select.as_str(), move || {
            selector.select(&doc).map(QuestGenResult::Selected)
        })
        .producing(QuestGenStage::Select);

        scheduler
            .new_task(body)
            .with(Arc::clone(&self.select_executor))
            .then(&linker)
            .queue()?;
        scheduler.fire()?;
        Ok(())
    }

    fn on_selected(
        &self,
        scheduler: &mut Scheduler<QuestGenResult>,
        ranked: Vec<RankedSentence>,
    ) -> Result<()> {
        let top = {
            let mut state = self.state();
            state.ranked = ranked;
            let shown = state.ranked.len().min(self.params.num_questions);
            state.ranked[..shown].to_vec()
        };

        debug!(
            job = %scheduler.job().id(),
            selected = top.len(),
            "sentences selected"
        );

        if let Some(callback) = &self.on_selection {
            callback(&top);
        }

        self.queue_generation_wave(scheduler)
    }

    fn on_generated(
        &self,
        scheduler: &mut Scheduler<QuestGenResult>,
        rank: usize,
        questions: Vec<GeneratedQuestion>,
    ) -> Result<()> {
        {
            let mut state = self.state();
            state.outstanding = state.outstanding.saturating_sub(1);

            let usable: Vec<GeneratedQuestion> =
                questions.into_iter().filter(GeneratedQuestion::has_answer).collect();

            if usable.is_empty() {
                debug!(
                    job = %scheduler.job().id(),
                    rank,
                    "sentence produced no answerable question; freeing its slot"
                );
            } else {
                state.consumed += 1;
                if state.generated.insert(rank, usable).is_some() {
                    warn!(
                        job = %scheduler.job().id(),
                        rank,
                        "multiple generation tasks for one sentence; keeping the latest"
                    );
                }
            }
        }

        self.queue_generation_wave(scheduler)
    }

    fn on_failed(
        &self,
        scheduler: &mut Scheduler<QuestGenResult>,
        failure: TaskFailure<QuestGenStage>,
    ) -> Result<()> {
        warn!(
            job = %scheduler.job().id(),
            task = %failure.task,
            task_id = %failure.task_id,
            error = %failure.error,
            "question pipeline task failed"
        );

        match failure.produces {
            Some(QuestGenStage::Generate) => {
                {
                    let mut state = self.state();
                    state.outstanding = state.outstanding.saturating_sub(1);
                    state.consumed += 1;
                }
                self.queue_generation_wave(scheduler)
            }
            // Nothing downstream to wait for; the job drains with no output.
            _ => Ok(()),
        }
    }

    /// Top up generation tasks, or aggregate once none is outstanding.
    fn queue_generation_wave(&self, scheduler: &mut Scheduler<QuestGenResult>) -> Result<()> {
        let wave = {
            let mut state = self.state();
            let wave = state.plan_wave(self.params.num_questions);
            if wave.is_empty() && state.outstanding == 0 && !state.aggregated {
                state.aggregate(&self.params);
                info!(
                    job = %scheduler.job().id(),
                    questions = state.output.len(),
                    wanted = self.params.num_questions,
                    "question generation aggregated"
                );
            }
            wave
        };

        if wave.is_empty() {
            return Ok(());
        }

        let linker = self.linker()?;
        for (rank, sentence) in wave {
            let generator = Arc::clone(&self.generator);
            let body = task_fn(QuestGenStage::Generate.as_str(), move || {
                generator
                    .generate(&sentence)
                    .map(|questions| QuestGenResult::Generated { rank, questions })
            })
            .producing(QuestGenStage::Generate);

            scheduler
                .new_task(body)
                .with(Arc::clone(&self.generate_executor))
                .then(&linker)
                .queue()?;
        }

        if scheduler.has_tasks() {
            scheduler.fire()?;
        }
        Ok(())
    }
}

fn mismatched(expected: QuestGenStage, result: &QuestGenResult) -> JobflowError {
    JobflowError::Other(anyhow::anyhow!(
        "{expected} handler received a {} result",
        result.kind()
    ))
}

fn register_handlers(linker: &mut TaskLinker<QuestGenResult>, stages: &Arc<Stages>) -> Result<()> {
    let s = Arc::clone(stages);
    linker.add_handler(QuestGenStage::Parse, move |scheduler, result| match result {
        QuestGenResult::Parsed(doc) => s.on_parsed(scheduler, doc),
        other => Err(mismatched(QuestGenStage::Parse, &other)),
    })?;

    let s = Arc::clone(stages);
    linker.add_handler(QuestGenStage::Select, move |scheduler, result| match result {
        QuestGenResult::Selected(ranked) => s.on_selected(scheduler, ranked),
        other => Err(mismatched(QuestGenStage::Select, &other)),
    })?;

    let s = Arc::clone(stages);
    linker.add_handler(QuestGenStage::Generate, move |scheduler, result| match result {
        QuestGenResult::Generated { rank, questions } => s.on_generated(scheduler, rank, questions),
        other => Err(mismatched(QuestGenStage::Generate, &other)),
    })?;

    let s = Arc::clone(stages);
    linker.on_failure(move |scheduler, failure| s.on_failed(scheduler, failure));

    Ok(())
}

fn parse_document(
    parser: &dyn DocumentParser,
    doc: &Arc<Document>,
) -> std::result::Result<QuestGenResult, TaskError> {
    let mut parsed = parser.parse(doc)?;
    for sentence in &mut parsed.sentences {
        sentence.resolve_coreferences();
    }
    Ok(QuestGenResult::Parsed(parsed))
}

/// A running question-generation pipeline for one document.
pub struct QuestionGenerationOp {
    source: Arc<Document>,
    stages: Arc<Stages>,
    _linker: Arc<TaskLinker<QuestGenResult>>,
    job: JobHandle<QuestGenResult>,
}

impl fmt::Debug for QuestionGenerationOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuestionGenerationOp")
            .field("source", &self.source.id)
            .field("params", &self.stages.params)
            .field("job", &self.job)
            .finish_non_exhaustive()
    }
}

impl QuestionGenerationOp {
    /// Register the handlers, seed the parse task and fire it.
    pub fn start(input: QuestionGenerationInput) -> Result<Self> {
        let QuestionGenerationInput {
            document,
            parser,
            selector,
            generator,
            parse_executor,
            select_executor,
            generate_executor,
            params,
            on_selection,
            on_complete,
        } = input;

        let source = Arc::new(document);
        let stages = Arc::new(Stages {
            name: OP_NAME.to_string(),
            selector,
            generator,
            select_executor,
            generate_executor,
            params,
            on_selection,
            state: Mutex::new(QuestGenState::new(&params)),
            linker: OnceLock::new(),
        });

        let mut linker = TaskLinker::new();
        register_handlers(&mut linker, &stages)?;
        let linker = Arc::new(linker);
        // Freshly created; cannot already be set.
        let _ = stages.linker.set(Arc::downgrade(&linker));

        let completion_stages = Arc::clone(&stages);
        let completion_source = Arc::clone(&source);
        let mut scheduler = Scheduler::new_job(move |job: &JobHandle<QuestGenResult>| {
            if job.is_cancelled() {
                info!(job = %job.id(), source = %completion_source.id, "question generation cancelled");
                return;
            }

            let questions = completion_stages.state().output.clone();
            info!(
                job = %job.id(),
                source = %completion_source.id,
                questions = questions.len(),
                "question generation complete"
            );

            if let Some(callback) = on_complete {
                callback(QuestionGenerationOutput {
                    source: completion_source,
                    questions,
                });
            }
        });

        info!(
            job = %scheduler.job().id(),
            source = %source.id,
            num_questions = params.num_questions,
            "starting question generation"
        );

        let doc = Arc::clone(&source);
        let body = task_fn(QuestGenStage::Parse.as_str(), move || {
            parse_document(parser.as_ref(), &doc)
        })
        .producing(QuestGenStage::Parse);

        scheduler
            .new_task(body)
            .with(parse_executor)
            .then(&linker)
            .queue()?;
        let job = scheduler.fire()?;

        Ok(Self {
            source,
            stages,
            _linker: linker,
            job,
        })
    }

    pub fn source(&self) -> &Arc<Document> {
        &self.source
    }

    pub fn params(&self) -> &QuestGenParams {
        &self.stages.params
    }

    /// Questions aggregated so far (empty until generation has fanned in).
    pub fn output(&self) -> Vec<GeneratedQuestion> {
        self.stages.state().output.clone()
    }
}

impl PipelineOp for QuestionGenerationOp {
    type Result = QuestGenResult;

    fn name(&self) -> &str {
        &self.stages.name
    }

    fn job(&self) -> &JobHandle<QuestGenResult> {
        &self.job
    }

    fn description(&self) -> String {
        let params = &self.stages.params;
        format!(
            "{} ({}): source '{}', {} question(s) with {} distractor(s) requested, {} generated",
            self.stages.name,
            self.job.id(),
            self.source.id,
            params.num_questions,
            params.num_distractors,
            self.output().len(),
        )
    }
}
