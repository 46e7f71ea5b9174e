use anyhow::Context as _;
use box_mcp_tools::BoxServerConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Persisted CLI settings. Flags and environment variables take precedence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CliConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_base: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth_base: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl CliConfig {
    /// Copy of the config safe to print.
    #[must_use]
    pub fn redacted(&self) -> Self {
        Self {
            access_token: self.access_token.as_ref().map(|_| "<redacted>".to_string()),
            ..self.clone()
        }
    }

    /// Apply the persisted settings to a tool source configuration.
    pub fn apply(&self, server: &mut BoxServerConfig) {
        if let Some(api) = &self.api_base {
            server.servers.api.clone_from(api);
        }
        if let Some(upload) = &self.upload_base {
            server.servers.upload.clone_from(upload);
        }
        if let Some(oauth) = &self.oauth_base {
            server.servers.oauth.clone_from(oauth);
        }
        if let Some(secs) = self.timeout_secs {
            server.defaults.timeout = Some(secs);
        }
    }
}

const APP_DIR: &str = "box-mcp";
const CONFIG_FILE: &str = "config.json";

/// `$XDG_CONFIG_HOME/box-mcp/config.json`, falling back to `~/.config`.
pub fn default_config_path() -> anyhow::Result<PathBuf> {
    let config_home = match std::env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        Some(dir) => PathBuf::from(dir),
        None => std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(".config"))
            .context("cannot locate the box-mcp config: neither XDG_CONFIG_HOME nor HOME is set")?,
    };
    Ok(config_home.join(APP_DIR).join(CONFIG_FILE))
}

/// A missing file means nothing has been saved yet.
pub fn load_config(path: &Path) -> anyhow::Result<CliConfig> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(CliConfig::default()),
        Err(e) => {
            return Err(e).with_context(|| format!("read box-mcp config at {}", path.display()));
        }
    };
    serde_json::from_str(&raw)
        .with_context(|| format!("box-mcp config at {} is not valid JSON", path.display()))
}

/// Written to a sibling `.tmp` file, then renamed over `path`.
pub fn save_config(path: &Path, cfg: &CliConfig) -> anyhow::Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("create box-mcp config directory {}", dir.display()))?;
    }
    let mut json = serde_json::to_string_pretty(cfg).context("encode box-mcp config")?;
    json.push('\n');

    let staging = path.with_extension("json.tmp");
    std::fs::write(&staging, json)
        .with_context(|| format!("write box-mcp config to {}", staging.display()))?;
    restrict_to_owner(&staging)?;
    std::fs::rename(&staging, path)
        .with_context(|| format!("move box-mcp config into place at {}", path.display()))
}

// The file may hold a Box access token.
#[cfg(unix)]
fn restrict_to_owner(path: &Path) -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt as _;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .with_context(|| format!("restrict permissions on {}", path.display()))
}

#[cfg(not(unix))]
fn restrict_to_owner(_path: &Path) -> anyhow::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_is_an_empty_config() {
        let dir = tempdir().expect("tempdir");
        let cfg = load_config(&dir.path().join("nope.json")).expect("load");
        assert_eq!(cfg, CliConfig::default());
    }

    #[test]
    fn save_then_load_creates_parent_dirs() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("box-mcp").join("config.json");
        let cfg = CliConfig {
            api_base: Some("http://127.0.0.1:9/2.0".to_string()),
            access_token: Some("t".to_string()),
            ..CliConfig::default()
        };
        save_config(&path, &cfg).expect("save");

        let raw = std::fs::read_to_string(&path).expect("read");
        assert!(raw.contains("\"apiBase\""));
        assert!(!raw.contains("uploadBase"));
        assert_eq!(load_config(&path).expect("load"), cfg);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[cfg(unix)]
    #[test]
    fn saved_config_is_private_to_the_owner() {
        use std::os::unix::fs::PermissionsExt as _;

        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        let cfg = CliConfig {
            access_token: Some("t".to_string()),
            ..CliConfig::default()
        };
        save_config(&path, &cfg).expect("save");
        save_config(&path, &cfg).expect("overwrite");

        let mode = std::fs::metadata(&path).expect("metadata").permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").expect("write");
        let err = load_config(&path).expect_err("malformed");
        assert!(err.to_string().contains("is not valid JSON"), "{err}");
    }

    #[test]
    fn apply_overrides_only_what_is_set() {
        let mut server = BoxServerConfig::default();
        let cfg = CliConfig {
            upload_base: Some("http://localhost:1".to_string()),
            timeout_secs: Some(30),
            ..CliConfig::default()
        };
        cfg.apply(&mut server);
        assert_eq!(server.servers.api, box_mcp_tools::config::DEFAULT_API_BASE);
        assert_eq!(server.servers.upload, "http://localhost:1");
        assert_eq!(server.defaults.timeout, Some(30));
    }

    #[test]
    fn redacted_hides_the_token() {
        let cfg = CliConfig {
            access_token: Some("secret".to_string()),
            ..CliConfig::default()
        };
        let shown = serde_json::to_string(&cfg.redacted()).expect("json");
        assert!(!shown.contains("secret"));
    }
}
