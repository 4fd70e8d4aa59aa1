use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand, ValueEnum};
use log::{error, info};
use parking_lot::Mutex;
use timekeeper_core::format::{format_countdown, format_lap, parse_duration};
use timekeeper_core::{Clock, ExpiryPolicy, Poll, ReloadPolicy, SystemClock};
use tracing_subscriber::EnvFilter;

use timekeeper::alerts::{AlertSink, LogAlerts};
use timekeeper::config::Settings;
use timekeeper::countdown::{TimerBoard, TimerId};
use timekeeper::error::AppResult;
use timekeeper::pump::TickScheduler;
use timekeeper::stopwatch::StopwatchController;
use timekeeper::storage::TimerStorage;

#[derive(Parser)]
#[command(name = "timekeeper", version, about = "Stopwatch and countdown timers")]
struct Cli {
    /// Directory holding saved timers and settings
    #[arg(long, default_value = ".timekeeper")]
    data_dir: PathBuf,

    /// Override the display refresh interval in milliseconds
    #[arg(long)]
    tick_ms: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the stopwatch, optionally recording laps at a fixed interval
    Stopwatch {
        /// How long to run, e.g. "10s" or "01:30"
        #[arg(long, default_value = "5s", value_parser = duration_arg)]
        run: u64,
        #[arg(long, value_parser = duration_arg)]
        lap_every: Option<u64>,
        /// Forget the saved stopwatch before starting
        #[arg(long)]
        fresh: bool,
    },
    /// Save a countdown preset, start it and wait for it to expire
    Countdown {
        #[arg(value_parser = duration_arg)]
        duration: u64,
        #[arg(long)]
        label: Option<String>,
        #[arg(long)]
        sound: Option<String>,
    },
    /// Start a saved preset by id and wait for it to expire
    Start { id: u32 },
    /// List recent presets and the saved stopwatch
    Timers,
    /// Delete a saved preset
    Delete { id: u32 },
    /// Wait on a countdown that was running when the last session ended
    Resume,
    /// Show or change settings
    Config {
        #[arg(long)]
        expiry: Option<ExpiryArg>,
        #[arg(long)]
        stopwatch_reload: Option<ReloadArg>,
        #[arg(long)]
        countdown_reload: Option<ReloadArg>,
        #[arg(long)]
        vibration: Option<bool>,
        #[arg(long)]
        notification: Option<bool>,
        #[arg(long)]
        audio: Option<bool>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ExpiryArg {
    Rearm,
    Hold,
}

impl From<ExpiryArg> for ExpiryPolicy {
    fn from(arg: ExpiryArg) -> Self {
        match arg {
            ExpiryArg::Rearm => ExpiryPolicy::Rearm,
            ExpiryArg::Hold => ExpiryPolicy::HoldAtZero,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ReloadArg {
    Resume,
    Reset,
}

impl From<ReloadArg> for ReloadPolicy {
    fn from(arg: ReloadArg) -> Self {
        match arg {
            ReloadArg::Resume => ReloadPolicy::Resume,
            ReloadArg::Reset => ReloadPolicy::Reset,
        }
    }
}

fn duration_arg(s: &str) -> Result<u64, String> {
    parse_duration(s).map_err(|e| e.to_string())
}

/// Logs the alert, then wakes the thread waiting on the countdown.
struct NotifyingAlerts {
    inner: LogAlerts,
    done: Sender<TimerId>,
}

impl AlertSink for NotifyingAlerts {
    fn timer_expired(&self, id: TimerId, message: &str) {
        self.inner.timer_expired(id, message);
        self.done.send(id).ok();
    }
}

struct App {
    storage: TimerStorage,
    settings: Settings,
    clock: SystemClock,
    tick_override: Option<Duration>,
}

impl App {
    fn run_stopwatch(&self, run_ms: u64, lap_every_ms: Option<u64>, fresh: bool) -> AppResult<()> {
        if fresh {
            self.storage.reset_stopwatch();
        }
        let mut sw = match self.storage.load_stopwatch() {
            Some(snapshot) => {
                StopwatchController::restore(self.clock, snapshot, self.settings.stopwatch_reload)
            }
            None => StopwatchController::new(self.clock),
        };
        sw.start();
        let sw = Arc::new(Mutex::new(sw));

        let interval = self.tick_override.unwrap_or(self.settings.stopwatch_tick());
        let mut pump = {
            let sw = Arc::clone(&sw);
            TickScheduler::start(interval, move || {
                let display = sw.lock().display();
                print!("\r{}", display);
                io::stdout().flush().ok();
            })?
        };

        let started = Instant::now();
        let end = started + Duration::from_millis(run_ms);
        let lap_every = lap_every_ms.map(Duration::from_millis);
        let mut next_lap = lap_every.map(|every| started + every);
        loop {
            let now = Instant::now();
            if now >= end {
                break;
            }
            let wake = next_lap.map_or(end, |at| at.min(end));
            thread::sleep(wake.saturating_duration_since(now));
            if let (Some(at), Some(every)) = (next_lap, lap_every) {
                if Instant::now() >= at && at < end {
                    if let Some(lap) = sw.lock().lap() {
                        info!("lap {}: {}", lap.sequence, format_lap(lap.split_ms));
                    }
                    next_lap = Some(at + every);
                }
            }
        }

        pump.stop();
        let mut sw = sw.lock();
        sw.stop();
        println!("\r{}", sw.display());
        print_laps(&*sw);
        self.storage.save_stopwatch(&sw.snapshot());
        Ok(())
    }

    fn load_board(&self) -> TimerBoard<SystemClock> {
        match self.storage.load_countdowns() {
            Some(snapshot) => TimerBoard::restore(
                self.clock,
                snapshot,
                self.settings.expiry_policy,
                self.settings.countdown_reload,
            ),
            None => TimerBoard::new(self.clock, self.settings.expiry_policy),
        }
    }

    fn run_countdown(
        &self,
        duration_ms: u64,
        label: Option<String>,
        sound: Option<String>,
    ) -> AppResult<()> {
        let mut board = self.load_board();
        let id = board.add_preset(label, sound, duration_ms)?;
        board.start(id)?;
        self.storage.save_countdowns(&board.snapshot());
        self.wait_for_expiry(board)
    }

    fn run_start(&self, id: TimerId) -> AppResult<()> {
        let mut board = self.load_board();
        board.start(id)?;
        self.storage.save_countdowns(&board.snapshot());
        self.wait_for_expiry(board)
    }

    fn run_resume(&self) -> AppResult<()> {
        let board = self.load_board();
        if !board.is_running() {
            println!("No countdown is running");
            self.storage.save_countdowns(&board.snapshot());
            return Ok(());
        }
        self.wait_for_expiry(board)
    }

    /// Poll the board until its active countdown expires, then save it.
    fn wait_for_expiry(&self, board: TimerBoard<SystemClock>) -> AppResult<()> {
        let (done_tx, done_rx) = mpsc::channel();
        let alerts = NotifyingAlerts {
            inner: LogAlerts::new(self.settings.alerts.clone()),
            done: done_tx,
        };
        let board = Arc::new(Mutex::new(board));

        let interval = self.tick_override.unwrap_or(self.settings.countdown_tick());
        let mut pump = {
            let board = Arc::clone(&board);
            TickScheduler::start(interval, move || {
                let mut board = board.lock();
                if let Some(Poll::Running { remaining_ms }) = board.tick(&alerts) {
                    print!(
                        "\r{}  {}",
                        board.active_label().unwrap_or("Timer"),
                        format_countdown(remaining_ms)
                    );
                    io::stdout().flush().ok();
                }
            })?
        };

        let expired = done_rx.recv().ok();
        pump.stop();
        println!();
        if let Some(id) = expired {
            println!("Timer {} finished", id);
        }
        self.storage.save_countdowns(&board.lock().snapshot());
        Ok(())
    }

    fn list_timers(&self) {
        let board = self.load_board();
        if let Some(display) = board.display() {
            println!("Active: {} ({:?})", display, board.active_state());
        }
        let recent = board.recent();
        if recent.is_empty() {
            println!("No saved timers");
        }
        for preset in recent {
            println!(
                "{:>4}  {:<20}  {:>8}  {}",
                preset.id.to_string(),
                preset.display_label(),
                format_countdown(preset.duration_ms),
                preset.sound
            );
        }
        if let Some(snapshot) = self.storage.load_stopwatch() {
            let sw = StopwatchController::restore(self.clock, snapshot, ReloadPolicy::Resume);
            println!("Stopwatch: {} ({} laps)", sw.display(), sw.laps().len());
        }
    }

    fn delete_timer(&self, id: TimerId) -> AppResult<()> {
        let mut board = self.load_board();
        board.delete(id)?;
        self.storage.save_countdowns(&board.snapshot());
        println!("Deleted timer {}", id);
        Ok(())
    }
}

fn print_laps<C: Clock>(sw: &StopwatchController<C>) {
    let laps = sw.laps();
    let marked = laps.len() >= 2;
    let fastest = laps.fastest().map(|l| l.sequence);
    let slowest = laps.slowest().map(|l| l.sequence);
    for lap in laps.iter().rev() {
        let mark = if marked && Some(lap.sequence) == fastest {
            "  fastest"
        } else if marked && Some(lap.sequence) == slowest {
            "  slowest"
        } else {
            ""
        };
        println!(
            "Lap {:>2}  {}  {}{}",
            lap.sequence,
            format_lap(lap.split_ms),
            format_lap(lap.cumulative_ms),
            mark
        );
    }
}

fn run(cli: Cli) -> AppResult<()> {
    let storage = TimerStorage::open(&cli.data_dir)?;
    let settings = storage.load_settings();
    let app = App {
        storage,
        settings,
        clock: SystemClock,
        tick_override: cli.tick_ms.map(Duration::from_millis),
    };

    match cli.command {
        Command::Stopwatch { run, lap_every, fresh } => app.run_stopwatch(run, lap_every, fresh),
        Command::Countdown { duration, label, sound } => app.run_countdown(duration, label, sound),
        Command::Start { id } => app.run_start(TimerId(id)),
        Command::Timers => {
            app.list_timers();
            Ok(())
        }
        Command::Delete { id } => app.delete_timer(TimerId(id)),
        Command::Resume => app.run_resume(),
        Command::Config {
            expiry,
            stopwatch_reload,
            countdown_reload,
            vibration,
            notification,
            audio,
        } => {
            let mut settings = app.settings.clone();
            if let Some(v) = expiry {
                settings.expiry_policy = v.into();
            }
            if let Some(v) = stopwatch_reload {
                settings.stopwatch_reload = v.into();
            }
            if let Some(v) = countdown_reload {
                settings.countdown_reload = v.into();
            }
            if let Some(v) = vibration {
                settings.alerts.vibration = v;
            }
            if let Some(v) = notification {
                settings.alerts.notification = v;
            }
            if let Some(v) = audio {
                settings.alerts.audio = v;
            }
            if settings != app.settings {
                app.storage.save_settings(&settings);
            }
            println!("{:#?}", settings);
            Ok(())
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();
    info!("Timekeeper PID is {}", std::process::id());

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
