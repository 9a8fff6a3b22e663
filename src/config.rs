//! Application-level configuration loading, including the level table.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use indexmap::IndexMap;
use serde::Deserialize;
use tracing::{info, warn};

use crate::dao::models::TaskEntity;

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "CHARADES_BACK_CONFIG_PATH";

/// Read-only game parameters, fixed for the whole process lifetime.
#[derive(Debug, Clone)]
pub struct GameConfiguration {
    /// Key into the level table selecting the task set for every session.
    pub level: String,
    /// Per-round countdown duration.
    pub round_time: Duration,
    /// Minimum similarity score at which a fuzzy match is accepted.
    pub error_sensitivity: f32,
}

/// Immutable runtime configuration shared across the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    game: GameConfiguration,
    levels: IndexMap<String, Vec<TaskEntity>>,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to the
    /// baked-in demo level when the file is absent or unreadable.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        level = %config.game.level,
                        levels = config.levels.len(),
                        "loaded game configuration"
                    );
                    config
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

    /// The process-wide game parameters.
    pub fn game(&self) -> &GameConfiguration {
        &self.game
    }

    /// Ordered task list for `level`, when the level exists.
    pub fn level_tasks(&self, level: &str) -> Option<&[TaskEntity]> {
        self.levels.get(level).map(Vec::as_slice)
    }

    /// Names of all configured levels, in declaration order.
    pub fn level_names(&self) -> impl Iterator<Item = &str> {
        self.levels.keys().map(String::as_str)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            game: GameConfiguration {
                level: DEFAULT_LEVEL.to_string(),
                round_time: Duration::from_millis(60_000),
                error_sensitivity: 0.8,
            },
            levels: default_levels(),
        }
    }
}

/// JSON representation of the configuration file.
#[derive(Debug, Deserialize)]
struct RawConfig {
    game: RawGame,
    levels: IndexMap<String, Vec<TaskEntity>>,
}

/// JSON representation of the game parameters block.
#[derive(Debug, Deserialize)]
struct RawGame {
    level: String,
    time_ms: u64,
    error_sensitivity: f32,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        Self {
            game: GameConfiguration {
                level: value.game.level,
                round_time: Duration::from_millis(value.game.time_ms),
                error_sensitivity: value.game.error_sensitivity,
            },
            levels: value.levels,
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

const DEFAULT_LEVEL: &str = "developer";

/// Built-in demo level shipped with the binary.
fn default_levels() -> IndexMap<String, Vec<TaskEntity>> {
    let task = |slug: &str, answer: &str, factor: u32| TaskEntity {
        prompt: format!("videos/{slug}.mp4"),
        right_answer: answer.to_string(),
        factor,
    };

    let mut levels = IndexMap::new();
    levels.insert(
        DEFAULT_LEVEL.to_string(),
        vec![
            task("git", "git", 5),
            task("docker", "docker", 3),
            task("branch", "branch", 2),
            task("merge", "merge request", 4),
            task("ci", "continuous integration", 5),
            task("refactoring", "refactoring", 1),
        ],
    );
    levels
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_reference_an_existing_level() {
        let config = AppConfig::default();
        assert!(config.level_tasks(&config.game().level).is_some());
    }

    #[test]
    fn raw_config_parses_task_lists() {
        let raw: RawConfig = serde_json::from_str(
            r#"{
                "game": {"level": "movies", "time_ms": 10000, "error_sensitivity": 0.8},
                "levels": {
                    "movies": [
                        {"prompt": "videos/alien.mp4", "rightAnswer": "alien", "factor": 2}
                    ]
                }
            }"#,
        )
        .unwrap();

        let config: AppConfig = raw.into();
        assert_eq!(config.game().level, "movies");
        assert_eq!(config.game().round_time, Duration::from_secs(10));
        let tasks = config.level_tasks("movies").unwrap();
        assert_eq!(tasks[0].right_answer, "alien");
    }
}
