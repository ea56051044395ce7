use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use memo_core::model::{ConceptList, PracticeBundle, SessionId, SongRequestDraft};
use services::{AppServices, Clock, PracticeSession, ServicesConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod terminal;

use terminal::TerminalPractice;

const DEFAULT_DB_URL: &str = "sqlite://memo.sqlite3";
const LIBRARY_LIMIT: u32 = 50;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidSessionId { raw: String },
    InvalidDuration { raw: String },
    MissingBundle,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidSessionId { raw } => {
                write!(f, "invalid --session-id value: {raw}")
            }
            ArgsError::InvalidDuration { raw } => write!(f, "invalid --duration value: {raw}"),
            ArgsError::MissingBundle => write!(f, "practice needs --bundle or --session-id"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!(
        "  cargo run -p app -- practice (--bundle <file.json> | --session-id <uuid>) [--db <sqlite_url>] [--duration <secs>]"
    );
    eprintln!("  cargo run -p app -- library  [--db <sqlite_url>]");
    eprintln!(
        "  cargo run -p app -- generate --topic <topic> --style <style> [--custom-topic <t>] [--custom-style <s>] [--notes <text>] [--concept <c>]... [--out <file.json>] [--db <sqlite_url>]"
    );
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db {DEFAULT_DB_URL}");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  MEMO_DB_URL, MEMO_API_BASE_URL, MEMO_API_KEY, MEMO_LEAD_IN_SECS, MEMO_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Practice,
    Library,
    Generate,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "practice" => Some(Self::Practice),
            "library" => Some(Self::Library),
            "generate" => Some(Self::Generate),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct Args {
    db_url: String,
    bundle: Option<PathBuf>,
    session_id: Option<SessionId>,
    duration: Option<f64>,
    request: SongRequestDraft,
    out: Option<PathBuf>,
}

impl Args {
    fn parse(
        cmd: Command,
        args: &mut impl Iterator<Item = String>,
    ) -> Result<Self, ArgsError> {
        let mut parsed = Self {
            db_url: std::env::var("MEMO_DB_URL")
                .ok()
                .map_or_else(|| DEFAULT_DB_URL.into(), normalize_sqlite_url),
            ..Self::default()
        };
        let mut concepts = ConceptList::new();

        while let Some(arg) = args.next() {
            match (cmd, arg.as_str()) {
                (_, "--db") => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    parsed.db_url = normalize_sqlite_url(value);
                }
                (Command::Practice, "--bundle") => {
                    parsed.bundle = Some(PathBuf::from(require_value(args, "--bundle")?));
                }
                (Command::Practice, "--session-id") => {
                    let value = require_value(args, "--session-id")?;
                    let id = value
                        .parse::<SessionId>()
                        .map_err(|_| ArgsError::InvalidSessionId { raw: value.clone() })?;
                    parsed.session_id = Some(id);
                }
                (Command::Practice, "--duration") => {
                    let value = require_value(args, "--duration")?;
                    let secs = value
                        .parse::<f64>()
                        .ok()
                        .filter(|secs| secs.is_finite() && *secs > 0.0)
                        .ok_or_else(|| ArgsError::InvalidDuration { raw: value.clone() })?;
                    parsed.duration = Some(secs);
                }
                (Command::Generate, "--topic") => {
                    parsed.request.topic = require_value(args, "--topic")?;
                }
                (Command::Generate, "--custom-topic") => {
                    parsed.request.custom_topic = require_value(args, "--custom-topic")?;
                }
                (Command::Generate, "--style") => {
                    parsed.request.style = require_value(args, "--style")?;
                }
                (Command::Generate, "--custom-style") => {
                    parsed.request.custom_style = require_value(args, "--custom-style")?;
                }
                (Command::Generate, "--notes") => {
                    parsed.request.notes = require_value(args, "--notes")?;
                }
                (Command::Generate, "--concept") => {
                    concepts.add(&require_value(args, "--concept")?);
                }
                (Command::Generate, "--out") => {
                    parsed.out = Some(PathBuf::from(require_value(args, "--out")?));
                }
                (_, "--help" | "-h") => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        if cmd == Command::Practice && parsed.bundle.is_none() && parsed.session_id.is_none() {
            return Err(ArgsError::MissingBundle);
        }
        parsed.request.concepts = concepts.into_vec();
        Ok(parsed)
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("MEMO_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn load_bundle(
    args: &Args,
    services: &AppServices,
) -> Result<PracticeBundle, Box<dyn std::error::Error>> {
    let mut bundle = match (&args.bundle, args.session_id) {
        (Some(path), _) => {
            let raw = tokio::fs::read_to_string(path).await?;
            serde_json::from_str::<PracticeBundle>(&raw)?
        }
        (None, Some(id)) => services.generation().fetch_session(id).await?,
        (None, None) => return Err(ArgsError::MissingBundle.into()),
    };
    if let Some(id) = args.session_id {
        bundle.session_id = Some(id);
    }
    Ok(bundle)
}

async fn practice(args: Args, services: AppServices) -> Result<(), Box<dyn std::error::Error>> {
    let bundle = load_bundle(&args, &services).await?;
    let session_id = bundle.session_id;
    let material = bundle.into_material()?;
    let duration = args
        .duration
        .unwrap_or_else(|| terminal::default_duration(&material));
    let (audio, handle) = TerminalPractice::playback(duration);

    let (sink, writer) = services.progress_writer();
    let writer_task = tokio::spawn(writer.run());

    let session = PracticeSession::new(Arc::new(material), Some(handle))?
        .with_session_id(session_id)
        .with_sink(Arc::new(sink))
        .with_clock(services.clock())
        .with_lead_in(services.config().lead_in);
    let session = TerminalPractice::new(session, audio).run().await?;
    // Closes the progress channel so the writer can drain and stop.
    drop(session);

    let stats = writer_task.await?;
    info!(
        saved = stats.local.saved,
        failed = stats.local.failed,
        remote_saved = stats.remote.saved,
        remote_failed = stats.remote.failed,
        skipped = stats.skipped,
        "progress writer finished"
    );
    Ok(())
}

async fn library(services: AppServices) -> Result<(), Box<dyn std::error::Error>> {
    let tracks = services.library().list(LIBRARY_LIMIT).await?;
    if tracks.is_empty() {
        println!("No saved tracks.");
    }
    for track in &tracks {
        println!(
            "#{} {} [{}] {}",
            track.id(),
            track.title(),
            track.topic(),
            track.description()
        );
        if !track.concepts().is_empty() {
            println!("    concepts: {}", track.concepts().join(", "));
        }
        println!("    {}", track.audio_url());
    }

    let progress = services.recent_progress(LIBRARY_LIMIT).await?;
    if !progress.is_empty() {
        println!();
        println!("Recent practice:");
    }
    for row in &progress {
        println!(
            "  {} {}/{} ({:.0}%) at {}",
            row.session_id,
            row.progress.completed_blanks(),
            row.progress.total_blanks(),
            row.progress.completion_rate() * 100.0,
            row.progress.last_practiced_at().to_rfc3339()
        );
    }
    Ok(())
}

async fn generate(args: Args, services: AppServices) -> Result<(), Box<dyn std::error::Error>> {
    let request = args.request.validate()?;
    let bundle = services.generation().generate(&request).await?;
    info!(session_id = ?bundle.session_id, "song generated");

    if bundle.audio_url.is_some() {
        let track = services.library().save_bundle(&request, &bundle).await?;
        println!("Saved track #{}: {}", track.id(), track.title());
    }

    let json = serde_json::to_string_pretty(&bundle)?;
    match &args.out {
        Some(path) => {
            tokio::fs::write(path, json).await?;
            println!("Bundle written to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let argv: Vec<String> = std::env::args().skip(1).collect();

    let cmd = match argv.first().map(String::as_str) {
        None | Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    let mut iter = argv.into_iter().skip(1);
    let parsed = Args::parse(cmd, &mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let config = ServicesConfig::from_env()?;
    prepare_sqlite_file(&parsed.db_url)?;
    let services = AppServices::new_sqlite(&parsed.db_url, Clock::system(), config).await?;

    match cmd {
        Command::Practice => practice(parsed, services).await,
        Command::Library => library(services).await,
        Command::Generate => generate(parsed, services).await,
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
