//! Application-level configuration loading: draw cadence, seeding and admin access.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use serde_with::{DurationSeconds, serde_as};
use tracing::{info, warn};

use crate::state::draw::{
    MAX_DRAW_INTERVAL_SECONDS, MAX_START_DRAW_NUMBER, MIN_DRAW_INTERVAL_SECONDS,
};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "ROULETTE_BACK_CONFIG_PATH";

const DEFAULT_DRAW_INTERVAL: Duration = Duration::from_secs(180);
const DEFAULT_HISTORY_LIMIT: usize = 100;
const DEFAULT_UPCOMING_DRAWS: usize = 5;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    draw_interval: Duration,
    initial_draw_number: u32,
    seed_on_startup: bool,
    admin_token: Option<String>,
    history_limit: usize,
    upcoming_draws: usize,
}

impl AppConfig {
    /// Load the configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        draw_interval_seconds = app_config.draw_interval_seconds(),
                        "loaded configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Interval used when the game state is first seeded, clamped to the allowed range.
    pub fn draw_interval_seconds(&self) -> u32 {
        let seconds = u32::try_from(self.draw_interval.as_secs()).unwrap_or(u32::MAX);
        seconds.clamp(MIN_DRAW_INTERVAL_SECONDS, MAX_DRAW_INTERVAL_SECONDS)
    }

    /// First draw number used when seeding an empty store.
    pub fn initial_draw_number(&self) -> u32 {
        self.initial_draw_number
    }

    /// Whether the server seeds the game state as soon as storage becomes available.
    pub fn seed_on_startup(&self) -> bool {
        self.seed_on_startup
    }

    /// Static admin token accepted alongside the one handed out by the admin SSE stream.
    pub fn admin_token(&self) -> Option<&str> {
        self.admin_token.as_deref()
    }

    /// Cap applied to draw history listings.
    pub fn history_limit(&self) -> usize {
        self.history_limit
    }

    /// Number of scheduled draws returned by the upcoming-draws view.
    pub fn upcoming_draws(&self) -> usize {
        self.upcoming_draws
    }

    /// Replace the static admin token.
    pub fn with_admin_token(mut self, token: impl Into<String>) -> Self {
        self.admin_token = Some(token.into());
        self
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            draw_interval: DEFAULT_DRAW_INTERVAL,
            initial_draw_number: 1,
            seed_on_startup: true,
            admin_token: None,
            history_limit: DEFAULT_HISTORY_LIMIT,
            upcoming_draws: DEFAULT_UPCOMING_DRAWS,
        }
    }
}

#[serde_as]
#[derive(Debug, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde_as(as = "DurationSeconds<u64>")]
    draw_interval_seconds: Duration,
    initial_draw_number: u32,
    seed_on_startup: bool,
    admin_token: Option<String>,
    history_limit: usize,
    upcoming_draws: usize,
}

impl Default for RawConfig {
    fn default() -> Self {
        let defaults = AppConfig::default();
        Self {
            draw_interval_seconds: defaults.draw_interval,
            initial_draw_number: defaults.initial_draw_number,
            seed_on_startup: defaults.seed_on_startup,
            admin_token: defaults.admin_token,
            history_limit: defaults.history_limit,
            upcoming_draws: defaults.upcoming_draws,
        }
    }
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        Self {
            draw_interval: value.draw_interval_seconds,
            initial_draw_number: value.initial_draw_number.clamp(1, MAX_START_DRAW_NUMBER),
            seed_on_startup: value.seed_on_startup,
            admin_token: value.admin_token.filter(|token| !token.is_empty()),
            history_limit: value.history_limit.max(1),
            upcoming_draws: value.upcoming_draws,
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let raw: RawConfig = serde_json::from_str(r#"{"draw_interval_seconds": 90}"#).unwrap();
        let config = AppConfig::from(raw);
        assert_eq!(config.draw_interval_seconds(), 90);
        assert_eq!(config.initial_draw_number(), 1);
        assert!(config.seed_on_startup());
        assert_eq!(config.history_limit(), DEFAULT_HISTORY_LIMIT);
        assert!(config.admin_token().is_none());
    }

    #[test]
    fn interval_is_clamped() {
        let raw: RawConfig = serde_json::from_str(r#"{"draw_interval_seconds": 5}"#).unwrap();
        assert_eq!(AppConfig::from(raw).draw_interval_seconds(), 30);

        let raw: RawConfig = serde_json::from_str(r#"{"draw_interval_seconds": 3600}"#).unwrap();
        assert_eq!(AppConfig::from(raw).draw_interval_seconds(), 300);
    }

    #[test]
    fn empty_admin_token_is_ignored() {
        let raw: RawConfig =
            serde_json::from_str(r#"{"admin_token": "", "initial_draw_number": 0}"#).unwrap();
        let config = AppConfig::from(raw);
        assert!(config.admin_token().is_none());
        assert_eq!(config.initial_draw_number(), 1);
    }
}
