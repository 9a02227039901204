//! Well-Architected interview assessment CLI.
//!
//! Drives one assessment end to end: scaffolding pillar reports from the
//! fetched question catalogue, gathering and merging evidence, recording
//! human answers, syncing Kanbus tasks, and validating report invariants.
//!
//! Exit codes: `0` success, `2` validation or usage failure, `3` storage or
//! external-collaborator failure.

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand, ValueEnum};
use mockable::{Clock, DefaultClock};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::error;
use wai::assessment::adapters::{
    detect_inventory, CommandScanner, FsAssessmentStore, FsCatalogSource, InMemoryTracker,
    KanbusTracker,
};
use wai::assessment::ports::{CatalogSource, EvidenceScanner, TaskTracker};
use wai::assessment::services::{
    AssessmentService, MergeOptions, OrchestratorError, RecordedStatus, RunSummary,
};
use wai::config::{assessment_slug, default_cache_dir, AssessmentConfig, REPORTS_DIR_DEFAULT};
use wai::report::domain::{Confidence, PillarId, QuestionId, ReportDomainError};

const EXIT_VALIDATION: u8 = 2;
const EXIT_EXTERNAL: u8 = 3;

type Service = AssessmentService<FsAssessmentStore, Box<dyn TaskTracker>, DefaultClock>;

#[derive(Debug, Parser)]
#[command(name = "wai", about = "AWS Well-Architected interview assessment tool")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

/// Flags shared by every command operating on an existing assessment.
#[derive(Debug, Args)]
struct AssessmentArgs {
    /// Assessment name (the report subdirectory).
    #[arg(long)]
    assessment: String,

    /// Directory containing per-assessment report subdirectories.
    #[arg(long, default_value = REPORTS_DIR_DEFAULT)]
    reports_dir: Utf8PathBuf,

    /// Kanbus binary to invoke for task operations.
    #[arg(long, default_value = "kanbus")]
    kanbus_program: String,

    /// Skip the external tracker and record sync actions in memory only.
    #[arg(long)]
    no_tracker: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create pillar reports from the question catalogue and one tracker
    /// task per question.
    InitializeAssessment {
        /// Repository under assessment; its name seeds the default slug.
        target_dir: Utf8PathBuf,

        /// Assessment name; defaults to `<target-name>-<yyyymmdd>`.
        #[arg(long)]
        assessment: Option<String>,

        #[arg(long, default_value = REPORTS_DIR_DEFAULT)]
        reports_dir: Utf8PathBuf,

        /// Directory holding the fetched `questions.json` cache.
        #[arg(long)]
        cache_dir: Option<Utf8PathBuf>,

        #[arg(long, default_value = "kanbus")]
        kanbus_program: String,

        #[arg(long)]
        no_tracker: bool,
    },

    /// Inventory the target tree and run the optional scanners, persisting
    /// the evidence bundle.
    ScanEvidence {
        /// Repository to scan.
        target_dir: Utf8PathBuf,

        #[command(flatten)]
        assessment: AssessmentArgs,
    },

    /// Merge the persisted evidence bundle into every pillar report.
    ApplyEvidence {
        #[command(flatten)]
        assessment: AssessmentArgs,

        /// Regress `answered` entries to `partial` when new evidence lands.
        #[arg(long)]
        reopen_answered: bool,
    },

    /// List every question not yet answered.
    ListUnanswered {
        #[command(flatten)]
        assessment: AssessmentArgs,
    },

    /// Record a human decision for one question.
    RecordAnswer {
        #[command(flatten)]
        assessment: AssessmentArgs,

        /// Pillar the question belongs to.
        #[arg(long)]
        pillar: String,

        /// Question identifier, e.g. `SEC-1`.
        #[arg(long)]
        question: String,

        /// Status to record.
        #[arg(long, value_enum)]
        status: StatusArg,

        /// Answer confidence.
        #[arg(long, value_enum, default_value_t = ConfidenceArg::NotApplicable)]
        confidence: ConfidenceArg,

        /// Answer (or open-question) text.
        #[arg(long, conflicts_with = "answer_file")]
        answer: Option<String>,

        /// File containing the answer text.
        #[arg(long)]
        answer_file: Option<Utf8PathBuf>,
    },

    /// Reconcile every question with its linked Kanbus task.
    SyncTasks {
        #[command(flatten)]
        assessment: AssessmentArgs,
    },

    /// Check every pillar report against the data-model invariants.
    ValidateAssessment {
        #[command(flatten)]
        assessment: AssessmentArgs,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StatusArg {
    Answered,
    NeedsHuman,
    Partial,
}

impl From<StatusArg> for RecordedStatus {
    fn from(status: StatusArg) -> Self {
        match status {
            StatusArg::Answered => Self::Answered,
            StatusArg::NeedsHuman => Self::NeedsHuman,
            StatusArg::Partial => Self::Partial,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ConfidenceArg {
    Low,
    Medium,
    High,
    NotApplicable,
}

impl From<ConfidenceArg> for Confidence {
    fn from(confidence: ConfidenceArg) -> Self {
        match confidence {
            ConfidenceArg::Low => Self::Low,
            ConfidenceArg::Medium => Self::Medium,
            ConfidenceArg::High => Self::High,
            ConfidenceArg::NotApplicable => Self::NotApplicable,
        }
    }
}

/// Errors surfaced at the CLI boundary, each mapped to an exit code.
#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),

    #[error(transparent)]
    Domain(#[from] ReportDomainError),

    #[error("failed to read {path}: {source}")]
    AnswerFile {
        path: Utf8PathBuf,
        source: std::io::Error,
    },

    #[error("{0}")]
    Usage(String),

    #[error("{0} invariant violation(s) found")]
    ValidationFailed(usize),

    #[error("{0} operation(s) failed; see log output")]
    PartialFailure(usize),
}

impl CliError {
    fn exit_code(&self) -> u8 {
        match self {
            Self::Orchestrator(
                OrchestratorError::Store(_)
                | OrchestratorError::Catalog(_)
                | OrchestratorError::NoEvidence,
            )
            | Self::AnswerFile { .. }
            | Self::PartialFailure(_) => EXIT_EXTERNAL,
            Self::Orchestrator(_) | Self::Domain(_) | Self::Usage(_) | Self::ValidationFailed(_) => {
                EXIT_VALIDATION
            }
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            error!(error = %err, "failed to start runtime");
            return ExitCode::from(EXIT_EXTERNAL);
        }
    };
    match runtime.block_on(dispatch(cli.command)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "command failed");
            ExitCode::from(err.exit_code())
        }
    }
}

async fn dispatch(command: Command) -> Result<(), CliError> {
    match command {
        Command::InitializeAssessment {
            target_dir,
            assessment,
            reports_dir,
            cache_dir,
            kanbus_program,
            no_tracker,
        } => {
            let name = assessment
                .unwrap_or_else(|| assessment_slug(&target_dir, DefaultClock.utc()));
            let mut config = AssessmentConfig::new(name)
                .with_reports_dir(reports_dir)
                .with_cache_dir(cache_dir.unwrap_or_else(default_cache_dir));
            config.kanbus_program = kanbus_program;
            cmd_initialize(&config, no_tracker).await
        }
        Command::ScanEvidence {
            target_dir,
            assessment,
        } => cmd_scan(&target_dir, &assessment).await,
        Command::ApplyEvidence {
            assessment,
            reopen_answered,
        } => cmd_apply_evidence(&assessment, reopen_answered).await,
        Command::ListUnanswered { assessment } => cmd_list_unanswered(&assessment).await,
        Command::RecordAnswer {
            assessment,
            pillar,
            question,
            status,
            confidence,
            answer,
            answer_file,
        } => {
            let text = answer_text(answer, answer_file)?;
            cmd_record_answer(
                &assessment,
                &pillar,
                &question,
                status.into(),
                confidence.into(),
                text.as_deref(),
            )
            .await
        }
        Command::SyncTasks { assessment } => cmd_sync_tasks(&assessment).await,
        Command::ValidateAssessment { assessment } => cmd_validate(&assessment).await,
    }
}

/// Builds the orchestrator for one assessment, choosing between the real
/// Kanbus tracker and the in-memory one.
fn open_service(config: &AssessmentConfig, no_tracker: bool) -> Result<Service, CliError> {
    let store = FsAssessmentStore::open(&config.reports_dir, &config.assessment)
        .map_err(OrchestratorError::from)?;
    let tracker: Box<dyn TaskTracker> = if no_tracker {
        Box::new(InMemoryTracker::new())
    } else {
        Box::new(KanbusTracker::new(config.kanbus_program.clone()))
    };
    Ok(AssessmentService::new(
        config.assessment.clone(),
        Arc::new(store),
        Arc::new(tracker),
        Arc::new(DefaultClock),
    ))
}

fn service_from(args: &AssessmentArgs) -> Result<Service, CliError> {
    let mut config = AssessmentConfig::new(args.assessment.clone())
        .with_reports_dir(args.reports_dir.clone());
    config.kanbus_program = args.kanbus_program.clone();
    open_service(&config, args.no_tracker)
}

fn answer_text(
    answer: Option<String>,
    answer_file: Option<Utf8PathBuf>,
) -> Result<Option<String>, CliError> {
    match (answer, answer_file) {
        (Some(answer), _) => Ok(Some(answer)),
        (None, Some(path)) => std::fs::read_to_string(&path)
            .map(Some)
            .map_err(|source| CliError::AnswerFile { path, source }),
        (None, None) => Ok(None),
    }
}

fn check_summary(summary: &RunSummary) -> Result<(), CliError> {
    log_failures(summary);
    if summary.failures.is_empty() {
        Ok(())
    } else {
        Err(CliError::PartialFailure(summary.failures.len()))
    }
}

fn log_failures(summary: &RunSummary) {
    for failure in &summary.failures {
        error!(
            pillar = failure.pillar.as_ref().map(PillarId::as_str),
            question = failure.question.as_ref().map(QuestionId::as_str),
            message = %failure.message,
            "operation failed for entry"
        );
    }
}

#[expect(clippy::print_stdout, reason = "operator-facing command output")]
async fn cmd_initialize(config: &AssessmentConfig, no_tracker: bool) -> Result<(), CliError> {
    let catalog = FsCatalogSource::new(config.cache_dir.clone())
        .load()
        .await
        .map_err(OrchestratorError::from)?;
    let service = open_service(config, no_tracker)?;
    let summary = service.initialize(&catalog).await?;
    println!(
        "initialized assessment '{}': {} report(s) created, {} already present",
        config.assessment, summary.changed, summary.unchanged
    );
    check_summary(&summary)
}

#[expect(clippy::print_stdout, reason = "operator-facing command output")]
async fn cmd_scan(target_dir: &Utf8PathBuf, args: &AssessmentArgs) -> Result<(), CliError> {
    let service = service_from(args)?;
    let inventory = detect_inventory(target_dir)
        .map_err(|err| CliError::Usage(format!("cannot scan {target_dir}: {err}")))?;
    let scanners: Vec<Arc<dyn EvidenceScanner>> = vec![
        Arc::new(CommandScanner::semgrep()),
        Arc::new(CommandScanner::trivy()),
    ];
    let (bundle, summary) = service.scan_evidence(inventory, &scanners, target_dir).await?;
    println!("inventory: {}", bundle.inventory.summary());
    for source in bundle.missing_sources() {
        println!("scanner {source}: not available");
    }
    check_summary(&summary)
}

#[expect(clippy::print_stdout, reason = "operator-facing command output")]
async fn cmd_apply_evidence(args: &AssessmentArgs, reopen_answered: bool) -> Result<(), CliError> {
    let service = service_from(args)?;
    let summary = service
        .apply_evidence(MergeOptions { reopen_answered })
        .await?;
    println!(
        "evidence applied: {} entry(ies) updated, {} unchanged",
        summary.changed, summary.unchanged
    );
    check_summary(&summary)
}

#[expect(clippy::print_stdout, reason = "operator-facing command output")]
async fn cmd_list_unanswered(args: &AssessmentArgs) -> Result<(), CliError> {
    let service = service_from(args)?;
    let (open, summary) = service.list_unanswered().await?;
    for entry in &open {
        println!(
            "{}\t{}\t{}\t{}",
            entry.pillar, entry.question, entry.status, entry.title
        );
        if !entry.human_questions.is_empty() {
            println!("\topen: {}", entry.human_questions.replace('\n', "; "));
        }
    }
    println!("{} question(s) open", open.len());
    check_summary(&summary)
}

#[expect(clippy::print_stdout, reason = "operator-facing command output")]
async fn cmd_record_answer(
    args: &AssessmentArgs,
    pillar: &str,
    question: &str,
    status: RecordedStatus,
    confidence: Confidence,
    text: Option<&str>,
) -> Result<(), CliError> {
    let service = service_from(args)?;
    let pillar = PillarId::new(pillar)?;
    let question = QuestionId::new(question)?;
    let summary = service
        .record_answer(&pillar, &question, status, confidence, text)
        .await?;
    println!("recorded {question} in {pillar}");
    check_summary(&summary)
}

#[expect(clippy::print_stdout, reason = "operator-facing command output")]
async fn cmd_sync_tasks(args: &AssessmentArgs) -> Result<(), CliError> {
    let service = service_from(args)?;
    let (report, summary) = service.sync_tasks().await?;
    println!(
        "sync: {} created, {} closed, {} reopened, {} unchanged, {} conflict(s)",
        report.created(),
        report.closed(),
        report.reopened(),
        report.unchanged(),
        report.conflicts()
    );
    log_failures(&summary);
    let failed = report.failures() + summary.failures.len();
    if failed > 0 {
        return Err(CliError::PartialFailure(failed));
    }
    Ok(())
}

#[expect(clippy::print_stdout, reason = "operator-facing command output")]
async fn cmd_validate(args: &AssessmentArgs) -> Result<(), CliError> {
    let service = service_from(args)?;
    let (violations, summary) = service.validate_assessment().await?;
    for (pillar, violation) in &violations {
        println!("{pillar}: {violation}");
    }
    log_failures(&summary);
    let total = violations.len() + summary.failures.len();
    if total > 0 {
        return Err(CliError::ValidationFailed(total));
    }
    println!("all reports valid");
    Ok(())
}
