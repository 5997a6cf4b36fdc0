use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use masterly_algo::{
    AccuracyHeuristic, DifficultyBands, SessionConfig, DEFAULT_MASTERY_THRESHOLD,
    DEFAULT_MIN_ATTEMPTS, DEFAULT_MIN_SAMPLES,
};

use crate::db::config::DbConfig;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub database: DbConfig,
    pub tutor: TutorConfig,
    pub seed_demo_data: bool,
}

impl Config {
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(3000);

        let host = std::env::var("HOST")
            .ok()
            .and_then(|value| value.parse::<IpAddr>().ok())
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));

        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Self {
            host,
            port,
            log_level,
            database: DbConfig::from_env(),
            tutor: TutorConfig::from_env(),
            seed_demo_data: env_bool("SEED_DEMO_DATA", false),
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TieBreakMode {
    Random,
    LowestId,
}

impl TieBreakMode {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "random" => Some(Self::Random),
            "lowest_id" | "lowest-id" => Some(Self::LowestId),
            _ => None,
        }
    }
}

const MAX_SESSION_WINDOW_HOURS: i64 = 24 * 365;
const MAX_CALIBRATION_WINDOW_DAYS: i64 = 3650;

/// Practice and calibration policy
#[derive(Debug, Clone)]
pub struct TutorConfig {
    pub session: SessionConfig,
    pub tie_break: TieBreakMode,
    /// Attempts newer than this form the current session record
    pub session_window_hours: i64,
    /// Attempts newer than this feed recalibration
    pub calibration_window_days: i64,
    pub calibration: AccuracyHeuristic,
}

impl Default for TutorConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            tie_break: TieBreakMode::Random,
            session_window_hours: 24,
            calibration_window_days: 7,
            calibration: AccuracyHeuristic::default(),
        }
    }
}

impl TutorConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let mastery_threshold = match env_f64("MASTERY_THRESHOLD") {
            Some(value) if value > 0.0 && value <= 1.0 => value,
            Some(value) => {
                tracing::warn!(value, "MASTERY_THRESHOLD outside (0, 1], using default");
                DEFAULT_MASTERY_THRESHOLD
            }
            None => DEFAULT_MASTERY_THRESHOLD,
        };

        let min_attempts = env_u32("MIN_ATTEMPTS", DEFAULT_MIN_ATTEMPTS);

        let tie_break = std::env::var("SELECTION_TIE_BREAK")
            .ok()
            .as_deref()
            .and_then(TieBreakMode::parse)
            .unwrap_or(defaults.tie_break);

        let session_window_hours = env_i64("SESSION_WINDOW_HOURS", defaults.session_window_hours)
            .clamp(1, MAX_SESSION_WINDOW_HOURS);
        let calibration_window_days =
            env_i64("CALIBRATION_WINDOW_DAYS", defaults.calibration_window_days)
                .clamp(1, MAX_CALIBRATION_WINDOW_DAYS);
        let min_samples = calibration_min_samples(env_u32(
            "MIN_CALIBRATION_SAMPLES",
            defaults.calibration.min_samples as u32,
        ));

        Self {
            session: SessionConfig {
                mastery_threshold,
                min_attempts,
                bands: DifficultyBands::default(),
            },
            tie_break,
            session_window_hours,
            calibration_window_days,
            calibration: AccuracyHeuristic::with_min_samples(min_samples),
        }
    }
}

/// Configured sample floor, never below the estimator's own minimum.
fn calibration_min_samples(configured: u32) -> usize {
    (configured as usize).max(DEFAULT_MIN_SAMPLES)
}

pub(crate) fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

pub(crate) fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

pub(crate) fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

pub(crate) fn env_i64(key: &str, default: i64) -> i64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_f64(key: &str) -> Option<f64> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}
