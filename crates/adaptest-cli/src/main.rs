//! Adaptest CLI
//!
//! Main entry point for simulating mock exams, taking a live timed section,
//! quick-scoring answer logs and checking question pools.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use adaptest_engine::{
    quick_scaled_score, AnswerOutcome, Difficulty, EngineConfig, EngineError, Graded, InMemoryPool,
    LiveSection, MemorySink, MockOrchestrator, MockProgress, MockSession, PoolSummary,
    QuestionDescriptor, ResultPayload, Section, SectionResult, SectionScore, SectionSession,
    SessionSnapshot,
};
use adaptest_report::{
    AnswerInput, MarkdownGenerator, Report, ReportInput, SectionInput, SectionOutcome,
};
use clap::{Parser, Subcommand, ValueEnum};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

/// Simulated seconds spent on each question by default.
const DEFAULT_SECONDS_PER_QUESTION: u32 = 120;

/// Mixed into the configured seed so the simulated test-taker draws
/// independently of question selection.
const TAKER_SEED_SALT: u64 = 0x5eed_7a4e;

/// File the latest outbound result payload is written to.
const RESULT_FILE_NAME: &str = "adaptest-result.json";

/// Adaptest - Adaptive Mock Exam Engine
///
/// Runs adaptive, timed mock exams over a question pool and scores them.
#[derive(Parser, Debug)]
#[command(name = "adaptest")]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file (default: adaptest.json in current directory)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a full mock exam with a simulated test-taker and write a report
    Simulate {
        /// Path to the question pool JSON file
        #[arg(short, long, value_name = "FILE")]
        pool: PathBuf,

        /// Probability that the simulated test-taker answers correctly
        #[arg(short, long, default_value_t = 0.7, value_parser = parse_probability)]
        accuracy: f64,

        /// Seconds the simulated test-taker spends on each question
        #[arg(long, default_value_t = DEFAULT_SECONDS_PER_QUESTION)]
        seconds_per_question: u32,

        /// Seed for reproducible runs (overrides the config file)
        #[arg(long)]
        seed: Option<u64>,

        /// Output directory for reports (overrides the config file)
        #[arg(short, long, value_name = "DIR")]
        output_dir: Option<String>,

        /// Report formats to write
        #[arg(short, long, value_enum, default_value_t = ReportFormat::Both)]
        format: ReportFormat,
    },

    /// Take one live, timed section on the terminal
    Take {
        /// Path to the question pool JSON file
        #[arg(short, long, value_name = "FILE")]
        pool: PathBuf,

        /// Section to take (quant, verbal, di)
        #[arg(short, long)]
        section: String,
    },

    /// Quick-score a JSON list of graded answers
    Score {
        /// Path to a JSON array of {"difficulty", "isCorrect"} objects
        #[arg(short, long, value_name = "FILE")]
        answers: PathBuf,
    },

    /// Check a question pool against the configured section rules
    ValidatePool {
        /// Path to the question pool JSON file
        #[arg(short, long, value_name = "FILE")]
        pool: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ReportFormat {
    Json,
    Markdown,
    Both,
}

impl ReportFormat {
    const fn includes_json(self) -> bool {
        matches!(self, Self::Json | Self::Both)
    }

    const fn includes_markdown(self) -> bool {
        matches!(self, Self::Markdown | Self::Both)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if args.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::debug!(config = ?args.config, "Config file");

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(exit_status(&e))
        }
    }
}

/// Exit status for a failed run: 2 for bad config or pool input, 1 otherwise.
fn exit_status(err: &anyhow::Error) -> u8 {
    if err
        .downcast_ref::<EngineError>()
        .is_some_and(EngineError::is_fatal)
    {
        2
    } else {
        1
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = load_config(args.config.as_deref())?;

    match args.command {
        Command::Simulate {
            pool,
            accuracy,
            seconds_per_question,
            seed,
            output_dir,
            format,
        } => {
            let mut config = config;
            if seed.is_some() {
                config.seed = seed;
            }
            if let Some(output_dir) = output_dir {
                config.output_dir = output_dir;
            }
            config.validate()?;
            run_simulate(&config, &pool, accuracy, seconds_per_question, format)
        }
        Command::Take { pool, section } => run_take(&config, &pool, &section).await,
        Command::Score { answers } => run_score(&answers),
        Command::ValidatePool { pool } => run_validate_pool(&config, &pool),
    }
}

/// Loads configuration from the specified path or default location.
fn load_config(config_path: Option<&str>) -> anyhow::Result<EngineConfig> {
    match config_path {
        Some(path_str) => {
            let path = Path::new(path_str);
            if !path.exists() {
                anyhow::bail!(
                    "Config file not found: '{}'\n\nSuggestion: Check the path or remove the --config flag to use defaults",
                    path.display()
                );
            }
            Ok(EngineConfig::load_from_file(path)?)
        }
        None => Ok(EngineConfig::load()?),
    }
}

fn parse_probability(s: &str) -> Result<f64, String> {
    let value: f64 = s.parse().map_err(|_| format!("'{s}' is not a number"))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("{value} is not between 0 and 1"))
    }
}

fn section_rng(config: &EngineConfig, salt: u64) -> StdRng {
    config
        .seed
        .map_or_else(StdRng::from_entropy, |seed| StdRng::seed_from_u64(seed ^ salt))
}

// ============================================================================
// simulate
// ============================================================================

fn run_simulate(
    config: &EngineConfig,
    pool_path: &Path,
    accuracy: f64,
    seconds_per_question: u32,
    format: ReportFormat,
) -> anyhow::Result<()> {
    let pool = InMemoryPool::load_from_file(pool_path)?;
    println!("Loaded {} questions from {}", pool.len(), pool_path.display());

    let output_dir = PathBuf::from(&config.output_dir);
    let mut taker = section_rng(config, TAKER_SEED_SALT);
    let sink = Arc::new(MemorySink::new());
    let mut mock = MockOrchestrator::new(Arc::new(pool), config.clone()).with_sink(sink.clone());

    tracing::info!(accuracy, seconds_per_question, "Simulating mock exam");
    let mut progress = mock.start()?;
    let mut last_section = None;
    while !progress.is_finalized() {
        if let Some(section) = mock.current_section() {
            if last_section != Some(section) {
                println!();
                println!("Starting {section}...");
                last_section = Some(section);
            }
        }
        progress = simulate_question(&mut mock, &mut taker, accuracy, seconds_per_question)?;
    }

    let session = mock.into_session();
    print_mock_summary(&session);

    let input = create_report_input(&session, config);
    write_reports(&input, &output_dir, format)?;

    if let Some(payload) = sink.results().last() {
        let path = write_result_payload(payload, &output_dir)?;
        println!("  Result payload: {}", path.display());
    }

    Ok(())
}

/// Writes `payload` as pretty JSON into `output_dir` and returns the path.
fn write_result_payload(payload: &ResultPayload, output_dir: &Path) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(output_dir)?;
    let path = output_dir.join(RESULT_FILE_NAME);
    std::fs::write(&path, serde_json::to_string_pretty(payload)?)?;
    Ok(path)
}

/// Spends the configured time on the current question, then answers it.
///
/// Returns early if the section clock runs out first.
fn simulate_question(
    mock: &mut MockOrchestrator,
    taker: &mut StdRng,
    accuracy: f64,
    seconds: u32,
) -> anyhow::Result<MockProgress> {
    for _ in 0..seconds {
        let progress = mock.tick()?;
        if !matches!(progress, MockProgress::Running { .. }) {
            return Ok(progress);
        }
    }
    Ok(mock.submit_answer(taker.gen_bool(accuracy))?)
}

fn print_mock_summary(session: &MockSession) {
    println!();
    println!("=== Mock Exam Summary ===");
    for result in &session.results {
        println!(
            "  {:<14} {:>2}/{:<2} answered, {:>2} correct, quick score {} ({})",
            result.section.to_string(),
            result.history.len(),
            result.required_count,
            result.correct_count(),
            result.score_estimate,
            result.completion_reason,
        );
    }
    if let Some(score) = &session.score {
        for (section, s) in &score.per_section {
            println!("  {section}: scaled score {} ({:.1}% weighted)", s.scaled_score, s.accuracy);
        }
        println!("  Total scaled score: {}", score.total_scaled_score);
    }
    println!("  Time taken: {}s", session.time_taken_seconds());
}

/// Creates a `ReportInput` from a finished mock.
fn create_report_input(session: &MockSession, config: &EngineConfig) -> ReportInput {
    ReportInput {
        title: format!(
            "Mock exam {}",
            session.started_at.map_or_else(
                || "(not started)".to_string(),
                |t| t.format("%Y-%m-%d %H:%M UTC").to_string()
            )
        ),
        expected_sections: config.sections.len(),
        total_scaled_score: session.score.as_ref().map(|s| s.total_scaled_score),
        sections: session.results.iter().map(convert_section).collect(),
    }
}

/// Converts a `SectionResult` to `SectionInput`.
fn convert_section(result: &SectionResult) -> SectionInput {
    let score = SectionScore::from_answers(&result.history);
    SectionInput {
        name: result.section.to_string(),
        required_count: result.required_count,
        scaled_score: score.scaled_score,
        quick_score: result.score_estimate,
        accuracy: score.accuracy,
        outcome: convert_reason(result.completion_reason),
        time_taken_seconds: result.time_taken_seconds,
        answers: result
            .history
            .iter()
            .map(|r| AnswerInput::new(&r.question_id, r.difficulty.value(), r.is_correct))
            .collect(),
        difficulty_trajectory: result
            .cursor_trajectory
            .iter()
            .map(|d| d.value())
            .collect(),
    }
}

/// Converts `CompletionReason` to `SectionOutcome`.
const fn convert_reason(reason: adaptest_engine::CompletionReason) -> SectionOutcome {
    use adaptest_engine::CompletionReason;
    match reason {
        CompletionReason::RequiredCountReached => SectionOutcome::RequiredCountReached,
        CompletionReason::TimeExpired => SectionOutcome::TimeExpired,
        CompletionReason::PoolExhausted => SectionOutcome::PoolExhausted,
    }
}

/// Generates reports in the output directory.
fn write_reports(
    input: &ReportInput,
    output_dir: &Path,
    format: ReportFormat,
) -> anyhow::Result<()> {
    println!();
    println!("Generating reports...");

    let report = Report::from_input(input)?;
    std::fs::create_dir_all(output_dir)?;

    if format.includes_markdown() {
        let md_path = output_dir.join(report.file_name("md"));
        std::fs::write(&md_path, MarkdownGenerator::new(&report).generate())?;
        println!("  Markdown report: {}", md_path.display());
    }

    if format.includes_json() {
        let json_path = report.write_json(output_dir)?;
        println!("  JSON report: {}", json_path.display());
    }

    if let Some(weakest) = report.weakest_section() {
        println!();
        println!("Weakest section: {} (scaled score {})", weakest.name, weakest.scaled_score);
    }

    Ok(())
}

// ============================================================================
// take
// ============================================================================

async fn run_take(
    config: &EngineConfig,
    pool_path: &Path,
    section_name: &str,
) -> anyhow::Result<()> {
    let section = Section::from_str_case_insensitive(section_name).ok_or_else(|| {
        anyhow::anyhow!(
            "Unknown section '{section_name}'\n\nSuggestion: Use one of quant, verbal, di"
        )
    })?;

    let pool = InMemoryPool::load_from_file(pool_path)?;
    let rule = config.section_rules.get(section);
    let session = SectionSession::from_pool(section, rule, &pool, section_rng(config, 0));
    let sink = Arc::new(MemorySink::new());
    let live = LiveSection::spawn_with_sink(session, config.tick_interval(), sink.clone())?;
    let handle = live.handle();

    println!(
        "{section}: {} questions, {} minutes. Enter c (correct), w (wrong), s (status) or q (quit).",
        rule.required_count,
        rule.time_limit_seconds / 60
    );
    match live.first_question() {
        Some(question) => print_question(question),
        None => println!("The pool has no {section} questions."),
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            () = handle.closed() => {
                println!("Section closed.");
                break;
            }
        };

        let Some(line) = line else {
            handle.teardown().await;
            break;
        };

        let is_correct = match line.trim() {
            "c" => true,
            "w" => false,
            "s" => {
                if let Ok(snapshot) = handle.snapshot().await {
                    print_snapshot(&snapshot);
                }
                continue;
            }
            "q" => {
                handle.teardown().await;
                break;
            }
            _ => {
                println!("Enter c, w, s or q.");
                continue;
            }
        };

        match handle.submit_answer(is_correct).await {
            Ok(AnswerOutcome::Next(question)) => print_question(&question),
            Ok(AnswerOutcome::Completed(reason)) => {
                println!("Section complete: {reason}.");
                break;
            }
            Err(EngineError::SessionClosed { .. }) => break,
            Err(e) => return Err(e.into()),
        }
    }

    match live.finished().await {
        Ok(result) => {
            println!();
            println!(
                "{}: {} answered, {} correct, quick score {}, {}s used ({}).",
                result.section,
                result.history.len(),
                result.correct_count(),
                result.score_estimate,
                result.time_taken_seconds,
                result.completion_reason,
            );
            let path = write_result_payload(&result.payload(), Path::new(&config.output_dir))?;
            println!("Result payload: {}", path.display());
            println!("Attempts at {section}: {}", sink.attempts(section));
            Ok(())
        }
        Err(EngineError::SessionTornDown { answered, .. }) => {
            println!("Section abandoned after {answered} answers; nothing recorded.");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn print_question(question: &QuestionDescriptor) {
    println!(
        "Question {} (difficulty {})",
        question.id, question.difficulty
    );
}

fn print_snapshot(snapshot: &SessionSnapshot) {
    println!(
        "{}/{} answered, difficulty {}, {}m {}s left",
        snapshot.answered,
        snapshot.required_count,
        snapshot.cursor,
        snapshot.remaining_seconds / 60,
        snapshot.remaining_seconds % 60
    );
}

// ============================================================================
// score
// ============================================================================

fn run_score(answers_path: &Path) -> anyhow::Result<()> {
    let contents = std::fs::read_to_string(answers_path).map_err(|e| {
        anyhow::anyhow!(
            "Failed to read answers file '{}': {e}",
            answers_path.display()
        )
    })?;
    let answers: Vec<Graded> = serde_json::from_str(&contents).map_err(|e| {
        anyhow::anyhow!(
            "Invalid answers file '{}': {e}\n\nSuggestion: Provide a JSON array like [{{\"difficulty\": 3, \"isCorrect\": true}}]",
            answers_path.display()
        )
    })?;

    let quick = quick_scaled_score(&answers);
    let bucketed = SectionScore::from_answers(&answers);
    println!("Answers:            {}", answers.len());
    println!("Correct:            {}", bucketed.correct_count);
    println!("Weighted accuracy:  {:.1}%", bucketed.accuracy);
    println!("Quick score:        {quick}");
    println!("Scaled score:       {}", bucketed.scaled_score);
    Ok(())
}

// ============================================================================
// validate-pool
// ============================================================================

fn run_validate_pool(config: &EngineConfig, pool_path: &Path) -> anyhow::Result<()> {
    let pool = InMemoryPool::load_from_file(pool_path)?;
    let summary = pool.summary();
    print_pool_summary(&summary);

    for section in &config.sections {
        let missing = empty_buckets(&summary, *section);
        if !missing.is_empty() {
            let missing: Vec<String> = missing.iter().map(ToString::to_string).collect();
            tracing::warn!(
                %section,
                missing = %missing.join(", "),
                "No questions at some difficulties; the selector will fall back"
            );
        }
    }

    let short: Vec<Section> = summary
        .short_sections(|s| config.section_rules.get(s).required_count)
        .into_iter()
        .filter(|s| config.sections.contains(s))
        .collect();

    if short.is_empty() {
        println!();
        println!("Pool can serve every configured section in full.");
        return Ok(());
    }

    for section in &short {
        println!(
            "  {section}: {} valid questions, {} required",
            summary.section(*section).valid,
            config.section_rules.get(*section).required_count
        );
    }
    anyhow::bail!(
        "{} section(s) cannot be served in full\n\nSuggestion: Add questions or lower requiredCount in adaptest.json",
        short.len()
    )
}

/// Difficulty buckets of `section` that hold no valid question.
fn empty_buckets(summary: &PoolSummary, section: Section) -> Vec<Difficulty> {
    Difficulty::all()
        .filter(|d| !summary.has_bucket(section, *d))
        .collect()
}

fn print_pool_summary(summary: &PoolSummary) {
    println!("=== Question Pool ===");
    for section in Section::ALL {
        let counts = summary.section(section);
        let buckets: Vec<String> = Difficulty::all()
            .map(|d| {
                let n = counts.by_difficulty.get(&d.value()).copied().unwrap_or(0);
                format!("{d}:{n}")
            })
            .collect();
        println!(
            "  {:<14} {:>4} valid, {:>3} invalid  [{}]",
            section.to_string(),
            counts.valid,
            counts.invalid,
            buckets.join(" ")
        );
    }
}
