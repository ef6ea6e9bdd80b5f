//! Configuration file – reads/writes `~/.reefbot/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use reefbot_runtime::RobotConfig;
use reefbot_types::RobotError;

/// Return the path to `~/.reefbot/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".reefbot").join("config.toml")
}

/// Load, apply environment overrides and validate.  A missing file yields
/// the defaults.
pub fn load(path: &Path) -> Result<RobotConfig, RobotError> {
    let mut cfg = load_from(path)?.unwrap_or_default();
    apply_env_overrides(&mut cfg);
    cfg.validate()?;
    Ok(cfg)
}

/// Parse the file at `path`.  Returns `None` if it does not exist.
pub(crate) fn load_from(path: &Path) -> Result<Option<RobotConfig>, RobotError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|e| {
        RobotError::Config(format!("failed to read config at {}: {e}", path.display()))
    })?;
    let cfg = toml::from_str(&raw)
        .map_err(|e| RobotError::Config(format!("failed to parse config: {e}")))?;
    Ok(Some(cfg))
}

/// Apply `REEFBOT_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `REEFBOT_DEADBAND` | `driver.deadband` |
/// | `REEFBOT_AUTO_MODE` | `autonomous.default_mode` |
/// | `REEFBOT_PERIOD_MS` | `control.period_ms` |
///
/// Unparseable numbers are ignored.
pub fn apply_env_overrides(cfg: &mut RobotConfig) {
    if let Ok(v) = std::env::var("REEFBOT_DEADBAND")
        && let Ok(deadband) = v.parse::<f64>()
    {
        cfg.driver.deadband = deadband;
    }
    if let Ok(v) = std::env::var("REEFBOT_AUTO_MODE") {
        cfg.autonomous.default_mode = v;
    }
    if let Ok(v) = std::env::var("REEFBOT_PERIOD_MS")
        && let Ok(period) = v.parse::<u64>()
    {
        cfg.control.period_ms = period;
    }
}

/// Write `cfg` to `path`, creating the parent directory if necessary.
pub fn save_to(cfg: &RobotConfig, path: &Path) -> Result<(), RobotError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| RobotError::Config(format!("failed to create config directory: {e}")))?;
    }
    let raw = toml::to_string_pretty(cfg)
        .map_err(|e| RobotError::Config(format!("failed to serialize config: {e}")))?;
    fs::write(path, raw).map_err(|e| {
        RobotError::Config(format!("failed to write config at {}: {e}", path.display()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_path_points_to_reefbot_dir() {
        let p = config_path_for_home("/home/driver");
        assert!(p.to_string_lossy().contains(".reefbot"));
        assert!(p.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn roundtrip_default_config() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        save_to(&RobotConfig::default(), &path).expect("save");
        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded, RobotConfig::default());
    }

    #[test]
    fn missing_file_yields_none() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        assert!(load_from(&path).expect("no error").is_none());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "[driver]\ndeadband = 0.05\n\n[climber]\nspeed_up = 0.7\n").expect("write");

        let cfg = load_from(&path).expect("load ok").expect("some");
        assert_eq!(cfg.driver.deadband, 0.05);
        assert_eq!(cfg.driver.port, 0);
        assert_eq!(cfg.climber.speed_up, 0.7);
        assert_eq!(cfg.roller.algae_in, -0.8);
    }

    #[test]
    fn invalid_values_fail_validation() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "[driver]\ndeadband = 1.5\n").expect("write");
        let cfg = load_from(&path).expect("parses").expect("some");
        assert!(matches!(cfg.validate(), Err(RobotError::Config(_))));
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "[driver\n").expect("write");
        assert!(matches!(load_from(&path), Err(RobotError::Config(_))));
    }

    #[test]
    fn env_overrides_apply() {
        // SAFETY: single test touching these variables.
        unsafe {
            std::env::set_var("REEFBOT_DEADBAND", "0.15");
            std::env::set_var("REEFBOT_AUTO_MODE", "Drive Forward Auto");
            std::env::set_var("REEFBOT_PERIOD_MS", "not-a-number");
        }
        let mut cfg = RobotConfig::default();
        apply_env_overrides(&mut cfg);
        unsafe {
            std::env::remove_var("REEFBOT_DEADBAND");
            std::env::remove_var("REEFBOT_AUTO_MODE");
            std::env::remove_var("REEFBOT_PERIOD_MS");
        }
        assert_eq!(cfg.driver.deadband, 0.15);
        assert_eq!(cfg.autonomous.default_mode, "Drive Forward Auto");
        assert_eq!(cfg.control.period_ms, 20);
    }
}
