use std::{env, fs, path::PathBuf, time::Duration};

use thiserror::Error;

use crate::domain::Tuning;

// Runtime/server constants (not gameplay tuning).

pub const INPUT_CHANNEL_CAPACITY: usize = 1024;
// Snapshots queued per client before that client starts missing ticks.
pub const SNAPSHOT_CHANNEL_CAPACITY: usize = 8;
pub const CHAT_BROADCAST_CAPACITY: usize = 64;

pub const TICK_INTERVAL: Duration = Duration::from_millis(1000 / 60);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read tuning file {path}: {source}")]
    ReadTuning {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid tuning file {path}: {source}")]
    ParseTuning {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("GAME_WORLD_SEED must be an unsigned integer, got {0:?}")]
    InvalidSeed(String),
}

impl From<ConfigError> for std::io::Error {
    fn from(e: ConfigError) -> Self {
        std::io::Error::other(e)
    }
}

pub fn http_port() -> u16 {
    env::var("GAME_SERVER_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(5000)
}

pub fn tuning_path() -> Option<PathBuf> {
    env::var_os("GAME_TUNING_PATH").map(PathBuf::from)
}

/// Fixed world seed for reproducible sessions; None means seed from entropy.
pub fn world_seed() -> Result<Option<u64>, ConfigError> {
    match env::var("GAME_WORLD_SEED") {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidSeed(raw)),
        Err(_) => Ok(None),
    }
}

/// Gameplay tuning from `path`, or the built-in defaults when no file is configured.
pub fn load_tuning(path: Option<PathBuf>) -> Result<Tuning, ConfigError> {
    let Some(path) = path else {
        return Ok(Tuning::default());
    };
    let raw = fs::read_to_string(&path).map_err(|source| ConfigError::ReadTuning {
        path: path.clone(),
        source,
    })?;
    toml::from_str(&raw).map_err(|source| ConfigError::ParseTuning { path, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn when_no_tuning_file_then_defaults() {
        let tuning = load_tuning(None).expect("defaults always load");

        assert_eq!(tuning.construct.turret.cost, 30);
        assert_eq!(tuning.snapshot.leaderboard_size, 10);
    }

    #[test]
    fn when_tuning_file_overrides_a_field_then_the_rest_keep_defaults() {
        let path = env::temp_dir().join(format!("obsidio-tuning-{}.toml", std::process::id()));
        fs::write(&path, "[player]\nspeed = 0.5\n").expect("write temp tuning");

        let tuning = load_tuning(Some(path.clone()));
        let _ = fs::remove_file(&path);

        let tuning = tuning.expect("valid tuning");
        assert_eq!(tuning.player.speed, 0.5);
        assert_eq!(tuning.player.max_health, 10);
    }

    #[test]
    fn when_tuning_file_is_missing_then_read_error() {
        let missing = env::temp_dir().join("obsidio-tuning-does-not-exist.toml");

        let result = load_tuning(Some(missing));

        assert!(matches!(result, Err(ConfigError::ReadTuning { .. })));
    }
}
