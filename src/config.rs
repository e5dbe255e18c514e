use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use slotgrab::domain::{DateRange, ReleaseSchedule, SlotPreference};
use slotgrab::engine::EngineConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: Option<String>,
    pub release: ReleaseConfig,
    pub preference: PreferenceConfig,
    pub retry: RetryConfig,
    pub history: HistoryConfig,
}

/// When the site opens bookings. Without a date the release is the next
/// daily occurrence of `time`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReleaseConfig {
    pub date: Option<NaiveDate>,
    pub time: String,
    pub timezone: String,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            date: None,
            time: "07:00".to_string(),
            timezone: "America/Los_Angeles".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreferenceConfig {
    pub target_time: String,
    pub window_start: Option<String>,
    pub window_end: Option<String>,
    pub party_size: u32,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl Default for PreferenceConfig {
    fn default() -> Self {
        Self {
            target_time: "09:00".to_string(),
            window_start: None,
            window_end: None,
            party_size: 1,
            start_date: None,
            end_date: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub interval_ms: u64,
    pub budget_secs: u64,
    pub wait_granularity_secs: u64,
    pub prepare_lead_secs: Option<u64>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            interval_ms: 2000,
            budget_secs: 1320,
            wait_granularity_secs: 30,
            prepare_lead_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub enabled: bool,
    pub path: PathBuf,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("slotgrab")
                .join("history.jsonl"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            release: ReleaseConfig::default(),
            preference: PreferenceConfig::default(),
            retry: RetryConfig::default(),
            history: HistoryConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        let project_name = env!("CARGO_PKG_NAME");

        // Try primary location: ~/.config/<project>/<project>.yml
        if let Some(config_dir) = dirs::config_dir() {
            let primary_config = config_dir.join(project_name).join(format!("{}.yml", project_name));
            if primary_config.exists() {
                match Self::load_from_file(&primary_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", primary_config.display(), e);
                    }
                }
            }
        }

        // Try fallback location: ./<project>.yml
        let fallback_config = PathBuf::from(format!("{}.yml", project_name));
        if fallback_config.exists() {
            match Self::load_from_file(&fallback_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load config from {}: {}", fallback_config.display(), e);
                }
            }
        }

        // No config file found, use defaults
        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Resolve the release instant. `now` picks the next daily occurrence
    /// when no date is configured.
    pub fn to_schedule(&self, now: DateTime<Utc>) -> Result<ReleaseSchedule> {
        let timezone = ReleaseSchedule::parse_timezone(&self.release.timezone)?;
        let time = parse_time_of_day(&self.release.time).context("Invalid release.time")?;

        let schedule = match self.release.date {
            Some(date) => ReleaseSchedule::at_local(date, time, timezone)?,
            None => ReleaseSchedule::next_daily(time, timezone, now)?,
        };
        Ok(schedule)
    }

    pub fn to_preference(&self) -> Result<SlotPreference> {
        let pref = &self.preference;
        let target = parse_time_of_day(&pref.target_time).context("Invalid preference.target_time")?;
        let window_start = parse_optional(pref.window_start.as_deref()).context("Invalid preference.window_start")?;
        let window_end = parse_optional(pref.window_end.as_deref()).context("Invalid preference.window_end")?;

        let start = pref
            .start_date
            .ok_or_else(|| eyre!("preference.start_date is required"))?;
        let end = pref.end_date.unwrap_or(start);
        let range = DateRange::new(start, end)?;

        let preference = SlotPreference::new(target, pref.party_size, range)?.with_window(window_start, window_end)?;
        Ok(preference)
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            interval: Duration::from_millis(self.retry.interval_ms),
            wait_granularity: Duration::from_secs(self.retry.wait_granularity_secs),
            prepare_lead: self.retry.prepare_lead_secs.map(Duration::from_secs),
        }
    }

    pub fn retry_budget(&self) -> Duration {
        Duration::from_secs(self.retry.budget_secs)
    }
}

/// Parse `HH:MM`, `HH:MM:SS`, `H:MM AM/PM` or `H:MM:SS AM/PM`.
pub fn parse_time_of_day(input: &str) -> Result<NaiveTime> {
    const FORMATS: [&str; 4] = ["%H:%M", "%H:%M:%S", "%I:%M %p", "%I:%M:%S %p"];

    let trimmed = input.trim();
    FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(trimmed, format).ok())
        .ok_or_else(|| eyre!("Unrecognised time of day '{}'", input))
}

fn parse_optional(input: Option<&str>) -> Result<Option<NaiveTime>> {
    input.map(parse_time_of_day).transpose()
}
