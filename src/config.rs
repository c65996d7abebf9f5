use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Skip TLS certificate verification (some THREDDS servers use
    /// self-signed certificates).
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            accept_invalid_certs: false,
        }
    }
}

fn default_timeout_secs() -> u64 {
    60
}
fn default_user_agent() -> String {
    format!("tds2stac/{}", env!("CARGO_PKG_VERSION"))
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    #[serde(default)]
    pub dir: Option<PathBuf>,
    #[serde(default)]
    pub catalog_id: Option<String>,
    #[serde(default = "default_description")]
    pub description: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: None,
            catalog_id: None,
            description: default_description(),
        }
    }
}

fn default_description() -> String {
    "STAC catalog harvested from a THREDDS data server".to_string()
}

impl Config {
    /// Defaults used when no configuration file exists.
    pub fn minimal() -> Self {
        Self::default()
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.http.timeout_secs == 0 {
        anyhow::bail!("http.timeout_secs must be > 0");
    }

    if config.http.user_agent.trim().is_empty() {
        anyhow::bail!("http.user_agent must not be empty");
    }

    if let Some(id) = &config.output.catalog_id {
        if id.trim().is_empty() || id.contains('/') || id.contains('\\') {
            anyhow::bail!(
                "output.catalog_id '{}' must be non-empty and contain no path separators",
                id
            );
        }
    }

    Ok(config)
}

/// Load `path` if it exists, otherwise fall back to [`Config::minimal`].
pub fn load_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        Ok(Config::minimal())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(tmp: &TempDir, body: &str) -> PathBuf {
        let path = tmp.path().join("tds2stac.toml");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn empty_file_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let cfg = load_config(&write(&tmp, "")).unwrap();
        assert_eq!(cfg.http.timeout_secs, 60);
        assert!(!cfg.http.accept_invalid_certs);
        assert!(cfg.output.dir.is_none());
    }

    #[test]
    fn sections_are_read() {
        let tmp = TempDir::new().unwrap();
        let cfg = load_config(&write(
            &tmp,
            r#"
[http]
timeout_secs = 5
accept_invalid_certs = true

[output]
dir = "./out"
catalog_id = "regclim"
description = "Regional climate"
"#,
        ))
        .unwrap();
        assert_eq!(cfg.http.timeout_secs, 5);
        assert!(cfg.http.accept_invalid_certs);
        assert_eq!(cfg.output.dir, Some(PathBuf::from("./out")));
        assert_eq!(cfg.output.catalog_id.as_deref(), Some("regclim"));
        assert_eq!(cfg.output.description, "Regional climate");
    }

    #[test]
    fn zero_timeout_rejected() {
        let tmp = TempDir::new().unwrap();
        let err = load_config(&write(&tmp, "[http]\ntimeout_secs = 0\n")).unwrap_err();
        assert!(err.to_string().contains("timeout_secs"));
    }

    #[test]
    fn catalog_id_with_separator_rejected() {
        let tmp = TempDir::new().unwrap();
        assert!(load_config(&write(&tmp, "[output]\ncatalog_id = \"a/b\"\n")).is_err());
    }

    #[test]
    fn missing_file_falls_back() {
        let tmp = TempDir::new().unwrap();
        let cfg = load_or_default(&tmp.path().join("nope.toml")).unwrap();
        assert_eq!(cfg.http.timeout_secs, 60);
    }
}
