use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone};
use clap::{Parser, Subcommand, ValueEnum};
use commute_pro::{
    celebration::Celebration,
    config::{Config, ConfigStore, FileConfigStore},
    error::{CommuteError, Result},
    export,
    model::{Commute, CommuteId, SessionId},
    runtime::{CrosstermEventSource, FixedTicker, Runner, TimerAction, TimerEvent},
    store::SqliteStore,
    timing::{SubmitOutcome, TimingPhase},
    util::{format_duration, parse_duration, title_case},
    Tracker,
};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    fs::File,
    io::{self, stdin, Write},
    path::PathBuf,
    process::ExitCode,
    time::Duration,
};
use tracing_subscriber::EnvFilter;
use ui::{Notice, TimerScreen};

mod ui;

const TICK_RATE_MS: u64 = 100;

/// time your commutes and chase personal records
#[derive(Parser, Debug)]
#[clap(
    version,
    about,
    long_about = "Track repeatable trips, time each run, keep the history, and get told when you set a new personal record."
)]
pub struct Cli {
    /// database file to use instead of the default location
    #[clap(long, global = true)]
    db: Option<PathBuf>,

    /// config file to use instead of the default location
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// create, list or delete commutes
    Commute {
        #[clap(subcommand)]
        action: CommuteAction,
    },
    /// time a trip interactively (space: start/stop, enter: save, r: reset, q: quit)
    Time {
        /// commute name or id
        commute: String,
        /// transport mode for this trip
        #[clap(short, long)]
        mode: Option<String>,
    },
    /// record a trip timed elsewhere
    Log {
        /// commute name or id
        commute: String,
        /// duration as SS, MM:SS or HH:MM:SS
        duration: String,
        /// when the trip finished (YYYY-MM-DD, "YYYY-MM-DD HH:MM" or RFC 3339); defaults to now
        #[clap(short, long)]
        date: Option<String>,
        /// transport mode for this trip
        #[clap(short, long)]
        mode: Option<String>,
    },
    /// list a commute's sessions, most recent first
    Sessions {
        /// commute name or id
        commute: String,
    },
    /// manage single sessions
    Session {
        #[clap(subcommand)]
        action: SessionAction,
    },
    /// delete every session of a commute but keep the commute
    Clear {
        /// commute name or id
        commute: String,
    },
    /// average, best and trip count
    Stats {
        /// commute name or id
        commute: String,
        /// print as JSON
        #[clap(long)]
        json: bool,
    },
    /// write a commute's sessions to a file or stdout
    Export {
        /// commute name or id
        commute: String,
        #[clap(short, long, value_enum, default_value_t = ExportFormat::Csv)]
        format: ExportFormat,
        /// output file (stdout when omitted)
        #[clap(short, long)]
        out: Option<PathBuf>,
    },
    /// show or initialize the configuration
    Config {
        #[clap(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum CommuteAction {
    /// add a commute
    Add {
        name: String,
        /// transport mode (defaults to the configured default)
        #[clap(short, long)]
        mode: Option<String>,
    },
    /// list commutes
    List,
    /// delete a commute and all of its sessions
    Delete {
        /// commute name or id
        commute: String,
    },
}

#[derive(Subcommand, Debug)]
enum SessionAction {
    /// delete one session by id
    Delete { id: String },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// print the active configuration
    Show,
    /// write the default configuration to disk
    Init,
}

#[derive(Debug, Copy, Clone, ValueEnum, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
enum ExportFormat {
    Csv,
    Json,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .compact()
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!("command failed: {e:?}");
            eprintln!("error: {}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

fn config_store(cli: &Cli) -> FileConfigStore {
    match &cli.config {
        Some(path) => FileConfigStore::with_path(path),
        None => FileConfigStore::new(),
    }
}

fn open_tracker(cli: &Cli, config: Config) -> Result<Tracker<SqliteStore>> {
    let store = match &cli.db {
        Some(path) => SqliteStore::open(path)?,
        None => SqliteStore::open_default()?,
    };
    Tracker::new(store, config)
}

fn run(cli: Cli) -> Result<()> {
    let cfg_store = config_store(&cli);

    if let Command::Config { action } = &cli.command {
        return match action {
            ConfigAction::Show => {
                println!("# {}", cfg_store.path().display());
                println!("{}", serde_json::to_string_pretty(&cfg_store.load())?);
                Ok(())
            }
            ConfigAction::Init => {
                cfg_store.save(&Config::default())?;
                println!("Wrote default config to {}", cfg_store.path().display());
                Ok(())
            }
        };
    }

    let mut tracker = open_tracker(&cli, cfg_store.load())?;

    match cli.command {
        Command::Commute { action } => match action {
            CommuteAction::Add { name, mode } => {
                let id = tracker.create_commute(&title_case(&name), mode.as_deref())?;
                let commute = tracker.commute(id)?;
                println!("Created {} ({}) {}", commute.name, commute.mode, commute.id);
            }
            CommuteAction::List => {
                let commutes = tracker.commutes()?;
                if commutes.is_empty() {
                    println!("No commutes yet. Add one with `commute add <name>`.");
                }
                for commute in commutes {
                    let stats = tracker.get_statistics(commute.id)?;
                    println!(
                        "{:<24} {:<10} trips {:>3}  best {}  {}",
                        commute.name,
                        commute.mode,
                        stats.count,
                        format_duration(stats.best_secs),
                        commute.id
                    );
                }
            }
            CommuteAction::Delete { commute } => {
                let commute = tracker.find_commute(&commute)?;
                tracker.delete_commute(commute.id)?;
                println!("Deleted {} and its sessions", commute.name);
            }
        },
        Command::Time { commute, mode } => {
            if !stdin().is_tty() {
                return Err(CommuteError::InvalidInput(
                    "the interactive timer needs a terminal".into(),
                ));
            }
            let commute = tracker.find_commute(&commute)?;
            run_timer(&mut tracker, &commute, mode.as_deref())?;
        }
        Command::Log {
            commute,
            duration,
            date,
            mode,
        } => {
            let commute = tracker.find_commute(&commute)?;
            let secs = parse_duration(&duration).ok_or_else(|| {
                CommuteError::InvalidInput(format!(
                    "'{}' is not a duration; use SS, MM:SS or HH:MM:SS",
                    duration
                ))
            })?;
            let date = date.as_deref().map(parse_date).transpose()?;
            let session = tracker.add_manual_session(commute.id, secs, date, mode.as_deref())?;
            println!(
                "Logged {} for {} ({})",
                format_duration(session.duration_secs),
                commute.name,
                session.mode
            );
        }
        Command::Sessions { commute } => {
            let commute = tracker.find_commute(&commute)?;
            print_sessions(&tracker, &commute)?;
        }
        Command::Session { action } => match action {
            SessionAction::Delete { id } => {
                let id: SessionId = id
                    .parse()
                    .map_err(|_| CommuteError::InvalidInput(format!("'{}' is not a session id", id)))?;
                tracker.delete_session(id)?;
                println!("Deleted session {}", id);
            }
        },
        Command::Clear { commute } => {
            let commute = tracker.find_commute(&commute)?;
            let removed = tracker.clear_sessions(commute.id)?;
            println!("Removed {} sessions from {}", removed, commute.name);
        }
        Command::Stats { commute, json } => {
            let commute = tracker.find_commute(&commute)?;
            print_stats(&tracker, &commute, json)?;
        }
        Command::Export {
            commute,
            format,
            out,
        } => {
            let commute = tracker.find_commute(&commute)?;
            let sessions = tracker.sessions_for(commute.id)?;
            let writer: Box<dyn Write> = match &out {
                Some(path) => Box::new(File::create(path)?),
                None => Box::new(io::stdout()),
            };
            match format {
                ExportFormat::Csv => export::write_csv(writer, &commute, &sessions)?,
                ExportFormat::Json => export::write_json(writer, &commute, &sessions)?,
            }
            if let Some(path) = out {
                eprintln!(
                    "Exported {} sessions as {} to {}",
                    sessions.len(),
                    format,
                    path.display()
                );
            }
        }
        Command::Config { .. } => {}
    }

    Ok(())
}

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM[:SS]` or a bare `YYYY-MM-DD` (local time)
fn parse_date(input: &str) -> Result<DateTime<Local>> {
    let input = input.trim();
    if let Ok(date) = DateTime::parse_from_rfc3339(input) {
        return Ok(date.with_timezone(&Local));
    }

    let naive = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(input, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(input, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(12, 0, 0))
        });

    naive
        .and_then(|n| Local.from_local_datetime(&n).earliest())
        .ok_or_else(|| CommuteError::InvalidInput(format!("'{}' is not a date", input)))
}

fn print_sessions(tracker: &Tracker<SqliteStore>, commute: &Commute) -> Result<()> {
    let sessions = tracker.sessions_for(commute.id)?;
    if sessions.is_empty() {
        println!("No sessions for {} yet", commute.name);
        return Ok(());
    }

    let now = tracker.now();
    let best = tracker.get_statistics(commute.id)?.best_secs;
    println!("{} ({})", commute.name, commute.mode);
    for s in sessions {
        let marker = if !s.is_valid_at(now) {
            "-"
        } else if s.duration_secs == best {
            "*"
        } else {
            " "
        };
        println!(
            "{} {}  {:>8}  {:<10} {}",
            marker,
            s.date.format("%Y-%m-%d %H:%M"),
            format_duration(s.duration_secs),
            s.mode,
            s.id
        );
    }
    Ok(())
}

fn print_stats(tracker: &Tracker<SqliteStore>, commute: &Commute, json: bool) -> Result<()> {
    let stats = tracker.get_statistics(commute.id)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("{} ({})", commute.name, commute.mode);
    println!("  trips    {}", stats.count);
    println!("  average  {}", format_duration(stats.average_secs));
    println!("  best     {}", format_duration(stats.best_secs));
    if stats.count > 1 {
        println!("  spread   ±{:.1}s", stats.std_dev_secs);
    }
    Ok(())
}

fn run_timer(
    tracker: &mut Tracker<SqliteStore>,
    commute: &Commute,
    mode: Option<&str>,
) -> Result<()> {
    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let result = timer_loop(&mut terminal, tracker, &runner, commute, mode);
    // Leaving mid-attempt abandons it
    tracker.reset_timing(commute.id);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    result
}

fn best_secs(tracker: &Tracker<SqliteStore>, id: CommuteId) -> Result<Option<f64>> {
    let stats = tracker.get_statistics(id)?;
    Ok((!stats.is_empty()).then_some(stats.best_secs))
}

fn timer_loop<B: Backend>(
    terminal: &mut Terminal<B>,
    tracker: &mut Tracker<SqliteStore>,
    runner: &Runner<CrosstermEventSource, FixedTicker>,
    commute: &Commute,
    mode: Option<&str>,
) -> Result<()> {
    let id = commute.id;
    let shown_mode = mode.unwrap_or(commute.mode.as_str());
    let mut best = best_secs(tracker, id)?;
    let mut notice: Option<Notice> = None;

    loop {
        let screen = TimerScreen {
            commute,
            mode: shown_mode,
            phase: tracker.timing_phase(id),
            elapsed_secs: tracker.elapsed(id),
            best_secs: best,
            notice: notice.as_ref(),
        };
        terminal.draw(|f| f.render_widget(&screen, f.area()))?;

        let TimerEvent::Key(key) = runner.step() else {
            continue;
        };
        let Some(action) = TimerAction::from_key(&key) else {
            continue;
        };

        match (action, tracker.timing_phase(id)) {
            (TimerAction::Quit, _) => return Ok(()),
            (TimerAction::Reset, _) => tracker.reset_timing(id),
            (TimerAction::Toggle, TimingPhase::Idle) => {
                notice = None;
                tracker.start_timing(id)?;
            }
            (TimerAction::Toggle | TimerAction::Submit, TimingPhase::Running) => {
                tracker.stop_timing(id)?;
            }
            (TimerAction::Toggle | TimerAction::Submit, TimingPhase::AwaitingSubmit) => {
                notice = Some(match tracker.submit_timing(id, mode) {
                    Ok(outcome) => {
                        best = best_secs(tracker, id)?;
                        notice_for(&outcome)
                    }
                    Err(e) => Notice::Error(e.user_message()),
                });
            }
            (TimerAction::Submit, TimingPhase::Idle) => {}
        }
    }
}

fn notice_for(outcome: &SubmitOutcome) -> Notice {
    match Celebration::for_outcome(outcome) {
        Some(c) => Notice::Celebration(c),
        None => Notice::Info(format!(
            "{} is too short to count, not saved",
            format_duration(outcome.candidate_secs)
        )),
    }
}
