use chrono::{DateTime, Utc};
use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

mod cli;
mod config;

use cli::Cli;
use cli::commands::Commands;
use config::Config;
use slotgrab::backend::{BackendScript, ScriptedBackend};
use slotgrab::clock::{Clock, ManualClock, add_duration};
use slotgrab::coordination::CancelToken;
use slotgrab::domain::{CandidateSlot, EngineResult, EngineStatus};
use slotgrab::engine::AcquisitionEngine;
use slotgrab::id::resource_key;
use slotgrab::matcher::SlotMatcher;
use slotgrab::observer::{FanOutObserver, JsonlObserver, LogObserver};
use slotgrab::runner::AcquisitionAttempt;

/// Rehearsal file: a backend script plus an optional simulated start time.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Rehearsal {
    start_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    backend: BackendScript,
}

fn setup_logging(default_level: &str) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("slotgrab")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("slotgrab.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

fn run_application(cli: &Cli, config: &Config) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    match &cli.command {
        Commands::Plan => handle_plan_command(config),
        Commands::Select { candidates } => handle_select_command(candidates, config),
        Commands::Rehearse {
            script,
            check_only: true,
            ..
        } => handle_check_command(script, config),
        Commands::Rehearse { script, no_history, .. } => handle_rehearse_command(script, *no_history, config),
    }
}

fn handle_plan_command(config: &Config) -> Result<()> {
    let now = Utc::now();
    let schedule = config.to_schedule(now)?;
    let preference = config.to_preference()?;
    let deadline = add_duration(schedule.utc(), config.retry_budget());
    let engine = config.engine_config();

    info!("Planning run for release {}", schedule);

    println!("{} {}", "Release:".green(), schedule);
    println!("{} {}", "Release (UTC):".green(), schedule.utc().format("%Y-%m-%d %H:%M:%S"));
    println!("{} {}", "Time remaining:".green(), format_duration(schedule.remaining(now)));
    println!(
        "{} {} ({} budget)",
        "Retry deadline:".green(),
        deadline.with_timezone(&schedule.timezone()).format("%Y-%m-%d %H:%M:%S %Z"),
        format_duration(config.retry_budget())
    );
    println!("{} every {} ms", "Retry interval:".green(), engine.interval.as_millis());
    if let Some(lead) = engine.prepare_lead {
        println!("{} {} before release", "Prepare:".green(), format_duration(lead));
    }
    println!("{} {}", "Preference:".green(), preference);
    println!("{} {}", "Resource key:".green(), resource_key(&preference));
    Ok(())
}

fn handle_select_command(path: &Path, config: &Config) -> Result<()> {
    let content =
        fs::read_to_string(path).context(format!("Failed to read candidates from {}", path.display()))?;
    let candidates: Vec<CandidateSlot> = serde_json::from_str(&content).context("Failed to parse candidates")?;
    let preference = config.to_preference()?;

    info!("Selecting among {} candidates for {}", candidates.len(), preference);

    let matcher = SlotMatcher::new();
    let ranked = matcher.rank(&candidates, &preference);

    println!("{} {}", "Preference:".green(), preference);
    println!("{} {} listed, {} eligible", "Candidates:".green(), candidates.len(), ranked.len());

    let Some(best) = ranked.first() else {
        println!("{}", "No matching slot (no availability)".yellow());
        return Ok(());
    };

    for (rank, slot) in ranked.iter().enumerate() {
        let distance = SlotMatcher::distance_secs(slot, preference.target_time());
        let line = format!(
            "{:>3}. {} {} (capacity {}, {} min from target)",
            rank + 1,
            slot.slot_time.format("%Y-%m-%d %H:%M"),
            slot.identifier,
            slot.capacity,
            distance / 60
        );
        if rank == 0 {
            println!("{}", line.bold());
        } else {
            println!("{}", line);
        }
    }
    println!("{} {}", "Selected:".green(), best.identifier);
    Ok(())
}

fn load_rehearsal(path: &Path) -> Result<Rehearsal> {
    let content = fs::read_to_string(path).context(format!("Failed to read script from {}", path.display()))?;
    let rehearsal: Rehearsal = serde_yaml::from_str(&content).context("Failed to parse rehearsal script")?;
    Ok(rehearsal)
}

fn handle_check_command(path: &Path, config: &Config) -> Result<()> {
    let rehearsal = load_rehearsal(path)?;
    let preference = config.to_preference()?;
    let backend = ScriptedBackend::from_script(rehearsal.backend);

    info!("Checking availability for {}", preference);

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    let availability = runtime
        .block_on(AcquisitionAttempt::new().check(&backend, &preference))
        .context("Availability check failed")?;

    println!("{} {}", "Preference:".cyan(), preference);
    println!(
        "{} {} listed, {} eligible",
        "Candidates:".cyan(),
        availability.listed,
        availability.eligible
    );
    match &availability.best {
        Some(best) => println!(
            "{} {} at {} (capacity {})",
            "AVAILABLE".green().bold(),
            best.identifier,
            best.slot_time.format("%Y-%m-%d %H:%M"),
            best.capacity
        ),
        None => println!("{}", "NO AVAILABILITY".yellow().bold()),
    }
    Ok(())
}

fn handle_rehearse_command(path: &Path, no_history: bool, config: &Config) -> Result<()> {
    let rehearsal = load_rehearsal(path)?;

    let clock = Arc::new(ManualClock::new(rehearsal.start_at.unwrap_or_else(Utc::now)));
    let schedule = config.to_schedule(clock.now())?;
    let preference = config.to_preference()?;
    let backend = Arc::new(ScriptedBackend::from_script(rehearsal.backend));

    let mut observer = FanOutObserver::new().with(Arc::new(LogObserver));
    if config.history.enabled && !no_history {
        observer = observer.with(Arc::new(JsonlObserver::new(&config.history.path)));
    }

    let cancel = CancelToken::new();
    let engine = AcquisitionEngine::new(backend.clone(), clock.clone())
        .with_config(config.engine_config())
        .with_observer(Arc::new(observer))
        .with_cancel_token(cancel.clone());

    println!("{} {}", "Rehearsing release:".cyan(), schedule);

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    let result = runtime.block_on(async {
        let trigger = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                trigger.cancel();
            }
        });
        engine.run(&schedule, &preference, config.retry_budget()).await
    });

    print_result(&result);
    println!(
        "{} {} listings, {} claims, {} simulated",
        "Backend calls:".cyan(),
        backend.list_calls(),
        backend.claim_calls(),
        format_duration(clock.total_slept())
    );
    Ok(())
}

fn print_result(result: &EngineResult) {
    let status = match result.status {
        EngineStatus::Booked => "BOOKED".green().bold(),
        EngineStatus::TimedOut => "TIMED OUT".yellow().bold(),
        EngineStatus::Aborted => "ABORTED".red().bold(),
    };
    println!(
        "{} after {} attempt(s) in {}",
        status,
        result.attempts_made,
        format_duration(result.elapsed)
    );
    if let Some(confirmation) = &result.confirmation {
        println!("{} {}", "Confirmation:".green(), confirmation);
    }
    if let Some(reason) = &result.reason {
        println!("{} {}", "Reason:".red(), reason);
    }
}

fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{}h {:02}m {:02}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {:02}s", minutes, seconds)
    } else {
        format!("{}.{:03}s", seconds, duration.subsec_millis())
    }
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    // Setup logging with the configured default level
    let level = config.log_level.clone().unwrap_or_else(|| "info".to_string());
    setup_logging(&level).context("Failed to setup logging")?;

    info!("Starting with config from: {:?}", cli.config);

    // Run the main application logic
    run_application(&cli, &config).context("Application failed")?;

    Ok(())
}
