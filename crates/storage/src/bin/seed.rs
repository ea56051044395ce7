use std::fmt;

use chrono::{DateTime, Duration, Utc};
use memo_core::model::{SongRequestDraft, TrackDraft};
use storage::repository::Storage;

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    audio_base: String,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
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

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("MEMO_DB_URL").unwrap_or_else(|_| "sqlite:memo.sqlite3?mode=rwc".into());
        let mut audio_base = std::env::var("MEMO_AUDIO_BASE")
            .unwrap_or_else(|_| "https://cdn.example.com/demo".into());
        let mut now: Option<DateTime<Utc>> = None;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--audio-base" => {
                    audio_base = require_value(&mut args, "--audio-base")?;
                }
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    now = Some(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            audio_base,
            now,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>      SQLite URL (default: sqlite:memo.sqlite3?mode=rwc)");
    eprintln!("  --audio-base <url>     Base URL for demo audio files");
    eprintln!("  --now <rfc3339>        Timestamp for the newest demo track");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  MEMO_DB_URL, MEMO_AUDIO_BASE");
}

/// The three demo songs the product ships with.
fn demo_requests() -> Vec<(SongRequestDraft, &'static str)> {
    let demo = |topic: &str, style: &str, concepts: &[&str], notes: &str| {
        let mut draft = SongRequestDraft::new(topic, style);
        draft.concepts = concepts.iter().map(|c| (*c).to_owned()).collect();
        draft.notes = notes.to_owned();
        draft
    };
    vec![
        (
            demo(
                "Computer Science",
                "rap",
                &["stack", "last one in first one out", "push", "pop"],
                "Demo song for stack data structure",
            ),
            "stack.mp3",
        ),
        (
            demo(
                "Biology",
                "pop",
                &["photosynthesis", "chlorophyll", "glucose", "oxygen"],
                "Demo song for photosynthesis",
            ),
            "photosynthesis.mp3",
        ),
        (
            demo(
                "Physics",
                "r&b",
                &["gravity", "force", "mass", "Newton"],
                "Demo song for gravity",
            ),
            "gravity.mp3",
        ),
    ]
}

/// Space demo tracks a minute apart so the last one lands exactly on `newest`.
fn demo_timestamp(newest: DateTime<Utc>, count: usize, offset: usize) -> DateTime<Utc> {
    let steps = count.saturating_sub(offset + 1);
    newest - Duration::minutes(i64::try_from(steps).unwrap_or(0))
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let newest = args.now.unwrap_or_else(Utc::now);
    let base = args.audio_base.trim_end_matches('/');

    let requests = demo_requests();
    let count = requests.len();
    for (offset, (draft, file)) in requests.into_iter().enumerate() {
        let request = draft.validate()?;
        let created_at = demo_timestamp(newest, count, offset);
        let track = TrackDraft::from_request(&request, format!("{base}/{file}"), created_at)?;
        let saved = storage.tracks.insert_track(&track).await?;
        println!("seeded track {} ({})", saved.id(), saved.title());
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
