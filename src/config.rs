use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

/// Optional settings file. Absence means defaults: `data/` next to the
/// binary and no remote sheet.
#[derive(Debug, Default, Deserialize)]
pub struct AppConfig {
    pub data_dir: Option<String>,
    pub sheet_url: Option<String>,
}

pub fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("invalid config {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let config = load_config(Path::new("does-not-exist.json")).unwrap();
        assert!(config.data_dir.is_none());
        assert!(config.sheet_url.is_none());
    }

    #[test]
    fn parses_settings() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"data_dir": "/var/lib/wellbeing", "sheet_url": "https://sheet.example/table"}"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.data_dir.as_deref(), Some("/var/lib/wellbeing"));
        assert_eq!(config.sheet_url.as_deref(), Some("https://sheet.example/table"));
    }
}
