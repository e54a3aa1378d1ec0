//! Command-line interface for voiceplan.
//!
//! The subcommands mirror the pipeline stages: record, transcribe,
//! extract, then select and add. `run` chains transcription and extraction
//! for an existing audio file in one go.

use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand, ValueEnum};

use crate::audio::normalize;
use crate::calendar::links::LinkSheet;
use crate::calendar::store::TaskStore;
use crate::calendar::{dispatch_selected, CalendarTarget, DispatchReport};
use crate::config;
use crate::domain::{AudioCapture, ExtractedTask, Session, Transcript};
use crate::extract::ExtractionEngine;
use crate::history::{History, HistoryEntry};
use crate::transcribe::TranscriptionClient;

/// voiceplan - Turn voice memos into calendar tasks
#[derive(Parser, Debug)]
#[command(name = "voiceplan")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Record from the microphone into the current session
    Record {
        /// Where to write the recording (defaults to the session directory)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Recording length in seconds
        #[arg(short, long, default_value = "30")]
        duration: u64,

        /// Input device name (system default if not given)
        #[arg(long)]
        device: Option<String>,
    },

    /// Transcribe the session recording, or a given audio file
    Transcribe {
        /// Audio file (defaults to the session's recording)
        file: Option<PathBuf>,

        /// Language tag, e.g. en-US or de-DE
        #[arg(short, long)]
        language: Option<String>,
    },

    /// Extract tasks from the session transcript, or from given text
    Extract {
        /// Text file with a transcript (defaults to the session transcript)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Read the transcript from stdin
        #[arg(long)]
        stdin: bool,
    },

    /// Transcribe and extract in one go
    Run {
        /// Audio file to process
        file: PathBuf,

        /// Language tag, e.g. en-US or de-DE
        #[arg(short, long)]
        language: Option<String>,
    },

    /// Change which extracted tasks are selected
    Select {
        /// "all", "none", or comma-separated task numbers to toggle
        spec: String,
    },

    /// Add the selected tasks to a calendar target
    Add {
        /// Where to send the tasks
        #[arg(long, value_enum, default_value = "store")]
        to: Target,

        /// Google Calendar access token (or GOOGLE_CALENDAR_TOKEN env)
        #[arg(long, env = "GOOGLE_CALENDAR_TOKEN")]
        token: Option<String>,

        /// Owner recorded on stored tasks
        #[arg(long)]
        owner: Option<String>,
    },

    /// List tasks in the local store
    Tasks {
        /// Maximum number of tasks to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Show recent extraction runs
    History {
        /// Maximum number of entries to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Show resolved configuration (debug)
    Config,
}

/// Calendar targets reachable from the CLI.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Target {
    /// Local JSONL task store
    Store,

    /// Google Calendar (needs an access token)
    Google,

    /// Print provider links instead of dispatching anywhere
    Links,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Record {
                output,
                duration,
                device,
            } => record(output, duration, device).await,
            Commands::Transcribe { file, language } => transcribe(file, language).await,
            Commands::Extract { input, stdin } => extract(input, stdin).await,
            Commands::Run { file, language } => run(file, language).await,
            Commands::Select { spec } => select(&spec).await,
            Commands::Add { to, token, owner } => add(to, token, owner).await,
            Commands::Tasks { limit } => list_tasks(limit).await,
            Commands::History { limit } => show_history(limit).await,
            Commands::Config => show_config(),
        }
    }
}

/// Load the persisted session, or start a fresh one.
async fn load_session() -> Result<Session> {
    let cfg = config::config()?;
    Ok(Session::load(&cfg.session_path())
        .await?
        .unwrap_or_else(|| Session::new(cfg.language.clone())))
}

async fn save_session(session: &Session) -> Result<()> {
    let cfg = config::config()?;
    session.save(&cfg.session_path()).await
}

#[cfg(feature = "cpal-audio")]
async fn record(output: Option<PathBuf>, duration: u64, device: Option<String>) -> Result<()> {
    use std::time::{Duration, Instant};

    use crate::audio::{CpalAudioSource, Recorder};

    let cfg = config::config()?;
    let output = output.unwrap_or_else(|| cfg.home.join("recording.wav"));

    let source = CpalAudioSource::new(device.as_deref())?;
    let mut recorder = Recorder::new(Box::new(source));
    recorder.start()?;
    eprintln!("🎙️ Recording for {duration}s... (Ctrl-C to abort)");

    let deadline = Instant::now() + Duration::from_secs(duration);
    while Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(100)).await;
        recorder.poll()?;
    }

    let capture = recorder.stop()?;
    if let Some(parent) = output.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&output, &capture.bytes).await?;

    let session = load_session().await?.with_capture(output.clone());
    save_session(&session).await?;

    eprintln!(
        "✅ Recorded {:.1}s to {}",
        capture.duration_secs,
        output.display()
    );
    Ok(())
}

#[cfg(not(feature = "cpal-audio"))]
async fn record(_output: Option<PathBuf>, _duration: u64, _device: Option<String>) -> Result<()> {
    anyhow::bail!(
        "This build has no microphone support. Rebuild with --features cpal-audio, \
         or use 'voiceplan run <file>' on an existing recording."
    )
}

async fn transcribe(file: Option<PathBuf>, language: Option<String>) -> Result<()> {
    let mut session = load_session().await?;
    if let Some(lang) = language {
        session.language = lang;
    }

    let path = file
        .or_else(|| session.audio_path.clone())
        .context("No recording in the session. Record first, or pass a file")?;

    let transcript = transcribe_file(&path, &session.language).await?;
    println!("{}", transcript.text);

    let session = session.with_transcript(transcript);
    save_session(&session).await?;
    Ok(())
}

/// Read, normalize and transcribe one audio file.
async fn transcribe_file(path: &PathBuf, language: &str) -> Result<Transcript> {
    let cfg = config::config()?;

    let capture = AudioCapture::from_file(path)
        .with_context(|| format!("Failed to read audio file: {}", path.display()))?;
    let outcome = normalize::normalize(capture)?;
    if let Some(warning) = &outcome.warning {
        eprintln!("⚠️ {warning}");
    }

    let client = TranscriptionClient::new(
        &cfg.base_url,
        &cfg.transcription_model,
        &config::api_key()?,
    );
    Ok(client.transcribe(&outcome.capture, language).await?)
}

async fn extract(input: Option<PathBuf>, use_stdin: bool) -> Result<()> {
    let session = load_session().await?;

    let external = if let Some(path) = input {
        Some(
            std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read input file: {}", path.display()))?,
        )
    } else if use_stdin {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read from stdin")?;
        Some(buffer)
    } else {
        None
    };

    let (session, text) = session_with_source_text(session, external)?;

    let session = extract_into_session(session, &text).await?;
    print_tasks(&session);
    save_session(&session).await?;
    Ok(())
}

/// Resolve the text to extract from. External text replaces whatever
/// transcript the session already holds, so the persisted transcript always
/// matches the tasks extracted from it.
fn session_with_source_text(
    session: Session,
    external: Option<String>,
) -> Result<(Session, String)> {
    let (session, text) = match external {
        Some(text) => {
            let session = session.with_transcript(Transcript::new(text.clone(), None));
            (session, text)
        }
        None => {
            let text = session
                .transcript
                .as_ref()
                .map(|t| t.text.clone())
                .context("No transcript in the session. Transcribe first, or pass --input")?;
            (session, text)
        }
    };

    if text.trim().is_empty() {
        anyhow::bail!("Transcript is empty");
    }
    Ok((session, text))
}

/// Run extraction, update the session and record history.
async fn extract_into_session(session: Session, text: &str) -> Result<Session> {
    let cfg = config::config()?;

    let engine = ExtractionEngine::new(&cfg.base_url, &cfg.extraction_model, &config::api_key()?);
    let transcript = Transcript::new(text.to_string(), None);
    let outcome = engine.extract(&transcript).await?;

    if outcome.degraded {
        eprintln!("⚠️ Model output was unusable; kept the transcript as a single task");
    }

    let history = History::new(cfg.history_path());
    history
        .record(&HistoryEntry {
            timestamp: chrono::Utc::now(),
            session_id: session.id,
            transcript: text.to_string(),
            task_count: outcome.tasks.len(),
            degraded: outcome.degraded,
        })
        .await?;

    Ok(session.with_tasks(outcome.tasks))
}

async fn run(file: PathBuf, language: Option<String>) -> Result<()> {
    let cfg = config::config()?;
    let language = language.unwrap_or_else(|| cfg.language.clone());

    let transcript = transcribe_file(&file, &language).await?;
    eprintln!("📝 {}", transcript.text);

    let text = transcript.text.clone();
    let session = Session::new(language).with_transcript(transcript);
    let session = extract_into_session(session, &text).await?;

    print_tasks(&session);
    save_session(&session).await?;
    Ok(())
}

async fn select(spec: &str) -> Result<()> {
    let mut session = load_session().await?;
    if session.tasks.is_empty() {
        anyhow::bail!("No extracted tasks in the session");
    }

    let count = session.tasks.len();
    match spec.trim().to_lowercase().as_str() {
        "all" => session.selection = crate::domain::TaskSelection::all(count),
        "none" => session.selection = crate::domain::TaskSelection::none(),
        list => {
            for part in list.split(',') {
                let number: usize = part
                    .trim()
                    .parse()
                    .with_context(|| format!("Not a task number: '{}'", part.trim()))?;
                if number == 0 || !session.selection.toggle(number - 1, count) {
                    anyhow::bail!("Task number out of range: {} (have {})", number, count);
                }
            }
        }
    }

    print_tasks(&session);
    save_session(&session).await?;
    Ok(())
}

async fn add(to: Target, token: Option<String>, owner: Option<String>) -> Result<()> {
    let cfg = config::config()?;
    let mut session = load_session().await?;

    let selected = session.selected_tasks();
    if selected.is_empty() {
        anyhow::bail!("No tasks selected. Extract first, then use 'voiceplan select'");
    }

    let target: Box<dyn CalendarTarget> = match to {
        Target::Store => Box::new(TaskStore::new(
            cfg.store_path(),
            owner.unwrap_or_else(|| cfg.owner.clone()),
        )),
        Target::Google => {
            let token = match token {
                Some(t) => t,
                None => config::google_token()?,
            };
            Box::new(crate::calendar::google::GoogleCalendarClient::new(&token))
        }
        Target::Links => Box::new(LinkSheet),
    };

    let now = Local::now().naive_local();
    let report = dispatch_selected(target.as_ref(), &selected, now).await;
    print_report(&session, &report);

    if report.all_succeeded() {
        // Materialization done: the session starts over
        save_session(&session.cleared()).await?;
    } else {
        // Dispatched tasks leave the selection, so a retry only re-sends
        // the failures. Targets like Google Calendar are not idempotent.
        for (index, _) in &report.succeeded {
            session.selection.deselect(*index);
        }
        save_session(&session).await?;
        std::process::exit(1);
    }

    Ok(())
}

async fn list_tasks(limit: usize) -> Result<()> {
    let cfg = config::config()?;
    let store = TaskStore::new(cfg.store_path(), cfg.owner.clone());

    let tasks = store.replay().await?;
    if tasks.is_empty() {
        println!("Store is empty. Use 'voiceplan add --to store' after extracting.");
        return Ok(());
    }

    println!(
        "{:<14} {:<8} {:<30} {:<12} {:<8}",
        "ID", "STATUS", "TITLE", "DATE", "PRIORITY"
    );
    println!("{}", "-".repeat(76));
    for stored in tasks.iter().rev().take(limit) {
        println!(
            "{:<14} {:<8} {:<30} {:<12} {:<8}",
            stored.id,
            stored.status,
            truncate(&stored.task.title, 28),
            stored.task.date,
            stored.task.priority.to_string(),
        );
    }

    Ok(())
}

async fn show_history(limit: usize) -> Result<()> {
    let cfg = config::config()?;
    let history = History::new(cfg.history_path());

    let entries = history.recent(limit).await?;
    if entries.is_empty() {
        println!("No history yet.");
        return Ok(());
    }

    for entry in entries {
        let marker = if entry.degraded { "⚠️ " } else { "" };
        println!(
            "{}  {}{} task(s)  \"{}\"",
            entry.timestamp.format("%Y-%m-%d %H:%M"),
            marker,
            entry.task_count,
            truncate(&entry.transcript, 60),
        );
    }

    Ok(())
}

fn show_config() -> Result<()> {
    let cfg = config::config()?;

    println!("voiceplan configuration");
    println!("{}", "=".repeat(60));
    println!(
        "Config file:  {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Paths:");
    println!("  Home:     {}", cfg.home.display());
    println!("  Session:  {}", cfg.session_path().display());
    println!("  Store:    {}", cfg.store_path().display());
    println!("  History:  {}", cfg.history_path().display());
    println!();
    println!("API:");
    println!("  Base URL:            {}", cfg.base_url);
    println!("  Transcription model: {}", cfg.transcription_model);
    println!("  Extraction model:    {}", cfg.extraction_model);
    println!();
    println!("Defaults:");
    println!("  Language: {}", cfg.language);
    println!("  Owner:    {}", cfg.owner);

    Ok(())
}

fn print_tasks(session: &Session) {
    if session.tasks.is_empty() {
        println!("No tasks extracted.");
        return;
    }

    println!();
    for (i, task) in session.tasks.iter().enumerate() {
        let marker = if session.selection.contains(i) { "x" } else { " " };
        let time = task.time.as_deref().unwrap_or("all-day");
        println!(
            "  [{}] {}. {} ({}, {} {}, {} priority, {})",
            marker,
            i + 1,
            task.title,
            task.kind,
            task.date,
            time,
            task.priority,
            task.category,
        );
    }
    println!();
    println!(
        "{} of {} selected. Use 'voiceplan select <numbers>' to change, then 'voiceplan add'.",
        session.selection.len(),
        session.tasks.len()
    );
}

fn print_report(session: &Session, report: &DispatchReport) {
    for (index, receipt) in &report.succeeded {
        let title = task_title(session, *index);
        println!("✅ {}: {}", title, receipt);
    }
    for err in &report.failed {
        eprintln!("❌ {}", err);
    }
    eprintln!(
        "\n{} added, {} failed",
        report.succeeded.len(),
        report.failed.len()
    );
}

fn task_title(session: &Session, index: usize) -> &str {
    session
        .tasks
        .get(index)
        .map(|t: &ExtractedTask| t.title.as_str())
        .unwrap_or("?")
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    } else {
        s.to_string()
    }
}
