//! Coil configuration file handling

use anyhow::{Context, Result};
use coil_animation::SystemSettings;
use std::fs;
use std::path::Path;

/// Name of the settings file looked up in the working directory
pub const CONFIG_FILE: &str = "coil.toml";

/// Load system settings
///
/// An explicit path must exist. Without one, `coil.toml` in the working
/// directory is used when present and the defaults otherwise.
pub fn load_settings(path: Option<&Path>) -> Result<SystemSettings> {
    let config_path = match path {
        Some(path) if path.is_dir() => path.join(CONFIG_FILE),
        Some(path) => path.to_path_buf(),
        None => {
            let local = Path::new(CONFIG_FILE);
            if !local.exists() {
                tracing::debug!("no {} found, using default settings", CONFIG_FILE);
                return Ok(SystemSettings::default());
            }
            local.to_path_buf()
        }
    };

    if !config_path.exists() {
        anyhow::bail!("No settings file found at {}", config_path.display());
    }

    let content = fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read {}", config_path.display()))?;

    let is_json = config_path
        .extension()
        .is_some_and(|extension| extension == "json");
    let settings = if is_json {
        SystemSettings::from_json_str(&content)
    } else {
        SystemSettings::from_toml_str(&content)
    }
    .with_context(|| format!("Failed to parse {}", config_path.display()))?;

    tracing::debug!("loaded settings from {}", config_path.display());
    Ok(settings)
}

/// Render settings as a TOML document
pub fn to_toml(settings: &SystemSettings) -> Result<String> {
    toml::to_string_pretty(settings).context("Failed to serialize settings")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("coil-cli-{}-{}", name, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = scratch_dir("missing");
        let err = load_settings(Some(&dir.join("nope.toml"))).unwrap_err();
        assert!(err.to_string().contains("No settings file found"));
    }

    #[test]
    fn test_load_toml_from_directory() {
        let dir = scratch_dir("toml");
        fs::write(dir.join(CONFIG_FILE), "overshoot_clamping = true\n").unwrap();
        let settings = load_settings(Some(&dir)).unwrap();
        assert!(settings.overshoot_clamping);
    }

    #[test]
    fn test_load_json_by_extension() {
        let dir = scratch_dir("json");
        let path = dir.join("settings.json");
        fs::write(&path, r#"{"simulation_timestep_ms": 8.0}"#).unwrap();
        let settings = load_settings(Some(&path)).unwrap();
        assert_eq!(settings.simulation_timestep_ms, 8.0);
    }

    #[test]
    fn test_invalid_settings_report_the_file() {
        let dir = scratch_dir("invalid");
        let path = dir.join("bad.toml");
        fs::write(&path, "rest_speed_threshold = -1.0\n").unwrap();
        let err = load_settings(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }

    #[test]
    fn test_settings_round_trip_through_toml() {
        let settings = SystemSettings::default();
        let rendered = to_toml(&settings).unwrap();
        assert_eq!(SystemSettings::from_toml_str(&rendered).unwrap(), settings);
    }
}
