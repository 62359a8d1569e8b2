use clap::{Parser, Subcommand};
use crossterm::{
    cursor, execute,
    style::Print,
    terminal::{Clear, ClearType},
};
use keyreplay::{
    analytics::{analyze_session_with, SessionAnalytics},
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore},
    event::WritingSession,
    playback::{encode_session, PlainJsonCodec, PlaybackEngine, RenderTarget},
    runtime::{FixedTicker, Runner, SystemClock},
    store::RecordingStore,
    summary::{generate_summary, write_csv},
};
use std::{
    error::Error,
    fs::File,
    io::{self, Write},
    path::PathBuf,
    time::Duration,
};

/// keystroke session analytics and playback
#[derive(Parser, Debug)]
#[clap(
    version,
    about,
    long_about = "Analyze captured keystroke sessions for pauses, bursts and revisions, summarize progress across sessions, and replay stored sessions at adjustable speed."
)]
pub struct Cli {
    /// recordings database (defaults to ~/.local/state/keyreplay/recordings.db)
    #[clap(long, global = true)]
    db: Option<PathBuf>,

    /// config file (defaults to the platform config dir)
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// print writing analytics for a captured session file
    Analyze {
        session: PathBuf,

        /// emit the full analytics as JSON
        #[clap(long)]
        json: bool,
    },
    /// summarize several sessions, given oldest first
    Summary {
        #[clap(required = true)]
        sessions: Vec<PathBuf>,

        /// also write per-session rows to this CSV file
        #[clap(long)]
        csv: Option<PathBuf>,
    },
    /// store a captured session as a playable recording
    Import {
        session: PathBuf,

        /// recording id (defaults to the session id)
        #[clap(long)]
        id: Option<String>,
    },
    /// list stored recordings
    List,
    /// replay a stored recording in the terminal
    Replay {
        id: String,

        /// playback speed multiplier
        #[clap(short = 's', long)]
        speed: Option<f64>,

        /// start position in seconds
        #[clap(long)]
        from: Option<f64>,
    },
}

/// Redraws the whole terminal with the replayed text
struct TerminalTarget;

impl RenderTarget for TerminalTarget {
    fn render(&mut self, text: &str) {
        let mut stdout = io::stdout();
        let _ = execute!(
            stdout,
            cursor::MoveTo(0, 0),
            Clear(ClearType::All),
            Print(text)
        );
    }
}

fn format_duration(ms: u64) -> String {
    let secs = ms / 1000;
    match (secs / 3600, (secs / 60) % 60, secs % 60) {
        (0, 0, s) => format!("{}.{}s", s, (ms % 1000) / 100),
        (0, m, s) => format!("{}m {:02}s", m, s),
        (h, m, s) => format!("{}h {:02}m {:02}s", h, m, s),
    }
}

fn print_analytics(a: &SessionAnalytics) {
    let p = &a.pause_analysis;
    println!("session     {}", a.session_id);
    println!(
        "duration    {} (active {})",
        format_duration(a.total_duration),
        format_duration(a.active_writing_time)
    );
    println!(
        "keystrokes  {} (productive {}, deletions {})",
        a.total_keystrokes, a.productive_keystrokes, a.deletions
    );
    println!("wpm         {:.1}", a.words_per_minute);
    println!(
        "pauses      short {} / medium {} / long {} (longest {})",
        p.short_pauses,
        p.medium_pauses,
        p.long_pauses,
        format_duration(p.longest_pause)
    );
    println!(
        "bursts      {} · revisions {} · editing ratio {:.2}",
        a.bursts_of_activity.len(),
        a.revision_patterns.len(),
        a.editing_ratio
    );
    println!(
        "scores      focus {:.0} · productivity {:.0} · engagement {:.0}",
        a.focus_score, a.productivity_score, a.engagement_score
    );
    if let Some(peak) = a.peak_productivity_time {
        println!(
            "peak        {} - {}",
            format_duration(peak.start),
            format_duration(peak.end)
        );
    }
    println!("type        {}", a.session_type);
}

fn open_store(cli: &Cli) -> Result<RecordingStore, Box<dyn Error>> {
    let path = cli
        .db
        .clone()
        .or_else(AppDirs::db_path)
        .unwrap_or_else(|| PathBuf::from("keyreplay_recordings.db"));
    Ok(RecordingStore::open(path)?)
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let config: Config = match &cli.config {
        Some(path) => FileConfigStore::with_path(path).load(),
        None => FileConfigStore::new().load(),
    };

    match &cli.command {
        Command::Analyze { session, json } => {
            let session = WritingSession::load(session)?;
            let analytics = analyze_session_with(&session, &config.analytics);
            if *json {
                println!("{}", serde_json::to_string_pretty(&analytics)?);
            } else {
                print_analytics(&analytics);
            }
        }
        Command::Summary { sessions, csv } => {
            let analytics = sessions
                .iter()
                .map(|path| {
                    WritingSession::load(path)
                        .map(|session| analyze_session_with(&session, &config.analytics))
                })
                .collect::<io::Result<Vec<_>>>()?;
            let summary = generate_summary(&analytics);

            println!("sessions      {}", summary.total_sessions);
            println!(
                "time on task  {}",
                format_duration(summary.total_time_on_task)
            );
            println!("avg wpm       {:.1}", summary.average_wpm);
            println!(
                "avg scores    focus {:.0} · productivity {:.0} · engagement {:.0}",
                summary.average_focus_score,
                summary.average_productivity_score,
                summary.average_engagement_score
            );
            for (session_type, count) in &summary.session_type_distribution {
                println!("  {:<12}{}", session_type.to_string(), count);
            }
            println!("trend         {}", summary.improvement_trend);

            if let Some(path) = csv {
                write_csv(File::create(path)?, &analytics)?;
            }
        }
        Command::Import { session, id } => {
            let session = WritingSession::load(session)?;
            let recording_id = id.clone().unwrap_or_else(|| session.id.clone());
            let raw = encode_session(&session, &recording_id, &PlainJsonCodec)?;
            let mut store = open_store(&cli)?;
            store.save_recording(&raw)?;
            println!(
                "imported {} ({} keystrokes, {})",
                recording_id,
                raw.recording.total_keystrokes,
                format_duration(raw.recording.duration_ms)
            );
        }
        Command::List => {
            let store = open_store(&cli)?;
            for rec in store.list_recordings()? {
                println!(
                    "{}\t{}\t{}\t{} keys\t{}",
                    rec.id,
                    rec.session_id,
                    format_duration(rec.duration_ms),
                    rec.total_keystrokes,
                    rec.privacy_level
                );
            }
        }
        Command::Replay { id, speed, from } => {
            let store = open_store(&cli)?;
            let tick = Duration::from_millis(config.playback.tick_interval_ms.max(1));
            let mut engine = PlaybackEngine::new(
                Box::new(store),
                Box::new(PlainJsonCodec),
                Box::new(SystemClock::new()),
                config.playback.clone(),
            );
            engine.load_recording(id)?;
            engine.set_target(Some(Box::new(TerminalTarget)));
            if let Some(speed) = speed {
                engine.set_speed(*speed);
            }
            if let Some(from) = from {
                engine.seek(from * 1000.0)?;
            }

            engine.play()?;
            Runner::new(FixedTicker::new(tick)).run(&mut engine);

            let stats = engine.get_analytics();
            let mut stdout = io::stdout();
            writeln!(stdout)?;
            writeln!(
                stdout,
                "replayed in {} at {:.2}x average",
                format_duration(stats.total_play_time),
                stats.average_speed
            )?;
            engine.destroy();
        }
    }

    Ok(())
}
