use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "config.json";
pub const DEFAULT_BREAKDOWN_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_MONTHLY_LIMIT: f64 = 1000.0;

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("~/.local/share"))
        .join("droidplan")
}

fn default_breakdown_model() -> String {
    DEFAULT_BREAKDOWN_MODEL.to_string()
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct DroidPlanConfig {
    pub data_directory: PathBuf,
    /// Used until a limit has been saved to the store.
    pub default_monthly_limit: f64,
    pub breakdown_model: String,
    pub debug_logging: bool,
}

impl Default for DroidPlanConfig {
    fn default() -> Self {
        Self {
            data_directory: default_data_dir(),
            default_monthly_limit: DEFAULT_MONTHLY_LIMIT,
            breakdown_model: default_breakdown_model(),
            debug_logging: false,
        }
    }
}

impl DroidPlanConfig {
    /// `<config_dir>/droidplan/config.json`
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("droidplan")
            .join(CONFIG_FILE)
    }

    /// Load from `path`, falling back to defaults when the file is missing or unreadable.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                log::warn!("Ignoring malformed config {}: {}", path.display(), e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
    }

    /// Ensure the data directory exists.
    pub fn ensure_data_dir(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.data_directory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = DroidPlanConfig::load(&dir.path().join("nope.json"));
        assert_eq!(cfg, DroidPlanConfig::default());
        assert_eq!(cfg.breakdown_model, DEFAULT_BREAKDOWN_MODEL);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, r#"{"debug_logging": true, "data_directory": "/tmp/dp"}"#).unwrap();
        let cfg = DroidPlanConfig::load(&path);
        assert!(cfg.debug_logging);
        assert_eq!(cfg.data_directory, PathBuf::from("/tmp/dp"));
        assert_eq!(cfg.default_monthly_limit, DEFAULT_MONTHLY_LIMIT);
    }

    #[test]
    fn malformed_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(DroidPlanConfig::load(&path), DroidPlanConfig::default());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);
        let cfg = DroidPlanConfig {
            data_directory: dir.path().join("data"),
            default_monthly_limit: 250.0,
            breakdown_model: "gemini-2.5-flash".to_string(),
            debug_logging: true,
        };
        cfg.save(&path).unwrap();
        assert_eq!(DroidPlanConfig::load(&path), cfg);
        cfg.ensure_data_dir().unwrap();
        assert!(cfg.data_directory.is_dir());
    }
}
