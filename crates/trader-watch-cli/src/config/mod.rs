//! Configuration loading and resolution.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use trader_watch::{ControllerOptions, DiscoverOptions, OverlayOptions};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "TRADER_WATCH_CONFIG";
pub const BOT_TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";
pub const CHAT_ID_ENV: &str = "TELEGRAM_CHAT_ID";

/// Config file picked up from the working directory.
pub const LOCAL_CONFIG: &str = "trader-watch.json";

/// Settings for scans and discovery. Every field has a default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
    pub ids_file: PathBuf,
    pub output_dir: PathBuf,
    pub trader_url_template: String,
    pub listing_url: String,
    pub max_listing_pages: usize,
    pub headless: bool,
    pub hours: f64,
    pub symbol: Option<String>,
    pub snapshots: bool,
    pub navigation_timeout_ms: u64,
    pub settle_ms: u64,
    pub overlay_selector: String,
    pub overlay_timeout_ms: u64,
    pub overlay_step_pause_ms: u64,
    pub active_view_label: String,
    pub activation_timeout_ms: u64,
}

/// Command-line flags that override loaded settings.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub ids_file: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub symbol: Option<String>,
    pub hours: Option<f64>,
    pub max_listing_pages: Option<usize>,
    pub headed: bool,
    pub no_snapshots: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        let controller = ControllerOptions::default();
        let discover = DiscoverOptions::default();
        Self {
            bot_token: None,
            chat_id: None,
            ids_file: PathBuf::from("ids.txt"),
            output_dir: PathBuf::from("reports"),
            trader_url_template: controller.url_template,
            listing_url: discover.listing_url,
            max_listing_pages: discover.max_pages,
            headless: true,
            hours: 24.0,
            symbol: None,
            snapshots: controller.snapshots,
            navigation_timeout_ms: controller.navigation_timeout.as_millis() as u64,
            settle_ms: controller.settle.as_millis() as u64,
            overlay_selector: controller.overlay.selector,
            overlay_timeout_ms: controller.overlay.timeout.as_millis() as u64,
            overlay_step_pause_ms: controller.overlay.step_pause.as_millis() as u64,
            active_view_label: controller.active_view_label,
            activation_timeout_ms: controller.activation_timeout.as_millis() as u64,
        }
    }
}

impl WatchConfig {
    /// Load the config from the resolved path, falling back to defaults when
    /// no file is found. An explicitly named file must exist.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match resolve_config_path(explicit) {
            Some(path) => {
                let text = std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read config {}", path.display()))?;
                let config: WatchConfig = serde_json::from_str(&text)
                    .with_context(|| format!("invalid config {}", path.display()))?;
                tracing::info!("loaded config from {}", path.display());
                config
            }
            None => {
                tracing::debug!("no config file found, using defaults");
                WatchConfig::default()
            }
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Override Telegram credentials from the environment.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup(BOT_TOKEN_ENV).filter(|v| !v.is_empty()) {
            self.bot_token = Some(token);
        }
        if let Some(chat) = lookup(CHAT_ID_ENV).filter(|v| !v.is_empty()) {
            self.chat_id = Some(chat);
        }
    }

    /// Apply command-line flags on top of file and env values. Flags that
    /// were not given leave the loaded value alone.
    pub fn apply_overrides(&mut self, overrides: CliOverrides) {
        if let Some(ids) = overrides.ids_file {
            self.ids_file = ids;
        }
        if let Some(dir) = overrides.output_dir {
            self.output_dir = dir;
        }
        if overrides.symbol.is_some() {
            self.symbol = overrides.symbol;
        }
        if let Some(hours) = overrides.hours {
            self.hours = hours;
        }
        if let Some(max_pages) = overrides.max_listing_pages {
            self.max_listing_pages = max_pages;
        }
        if overrides.headed {
            self.headless = false;
        }
        if overrides.no_snapshots {
            self.snapshots = false;
        }
    }

    /// Token and chat id, when both are configured.
    pub fn telegram_credentials(&self) -> Option<(&str, &str)> {
        match (self.bot_token.as_deref(), self.chat_id.as_deref()) {
            (Some(token), Some(chat)) if !token.is_empty() && !chat.is_empty() => Some((token, chat)),
            _ => None,
        }
    }

    pub fn controller_options(&self) -> ControllerOptions {
        ControllerOptions {
            url_template: self.trader_url_template.clone(),
            navigation_timeout: Duration::from_millis(self.navigation_timeout_ms),
            settle: Duration::from_millis(self.settle_ms),
            overlay: OverlayOptions {
                selector: self.overlay_selector.clone(),
                timeout: Duration::from_millis(self.overlay_timeout_ms),
                step_pause: Duration::from_millis(self.overlay_step_pause_ms),
            },
            active_view_label: self.active_view_label.clone(),
            activation_timeout: Duration::from_millis(self.activation_timeout_ms),
            activation_settle: Duration::from_millis(self.settle_ms),
            snapshots: self.snapshots,
        }
    }

    pub fn discover_options(&self) -> DiscoverOptions {
        DiscoverOptions {
            listing_url: self.listing_url.clone(),
            max_pages: self.max_listing_pages,
            navigation_timeout: Duration::from_millis(self.navigation_timeout_ms),
            settle: Duration::from_millis(self.settle_ms),
        }
    }
}

/// Resolve the config file path: explicit > env > working directory > user
/// config directory.
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    resolve_config_path_from(
        explicit,
        std::env::var(CONFIG_ENV).ok(),
        Path::new("."),
        dirs::config_dir(),
    )
}

/// [`resolve_config_path`] with its environment passed in.
///
/// An explicit or env path is returned even if missing so loading reports
/// it. The local and user config files are only used when they exist.
pub fn resolve_config_path_from(
    explicit: Option<&Path>,
    env_path: Option<String>,
    cwd: &Path,
    config_dir: Option<PathBuf>,
) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    if let Some(env_path) = env_path.filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(env_path));
    }

    let local = cwd.join(LOCAL_CONFIG);
    if local.exists() {
        return Some(local);
    }

    config_dir
        .map(|dir| dir.join("trader-watch").join("config.json"))
        .filter(|path| path.exists())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: WatchConfig =
            serde_json::from_str(r#"{ "hours": 6.5, "symbol": "ETH", "headless": false }"#).unwrap();
        assert_eq!(config.hours, 6.5);
        assert_eq!(config.symbol.as_deref(), Some("ETH"));
        assert!(!config.headless);
        assert_eq!(config.ids_file, PathBuf::from("ids.txt"));
        assert_eq!(config.active_view_label, ControllerOptions::default().active_view_label);
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.json");
        std::fs::write(&path, r#"{ "ids_file": "traders.txt", "max_listing_pages": 3 }"#).unwrap();
        let config = WatchConfig::load(Some(&path)).unwrap();
        assert_eq!(config.ids_file, PathBuf::from("traders.txt"));
        assert_eq!(config.discover_options().max_pages, 3);
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(WatchConfig::load(Some(&dir.path().join("missing.json"))).is_err());
    }

    #[test]
    fn test_load_invalid_json_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(WatchConfig::load(Some(&path)).is_err());
    }

    #[test]
    fn test_env_overrides_credentials() {
        let mut config = WatchConfig {
            bot_token: Some("file-token".into()),
            ..WatchConfig::default()
        };
        assert!(config.telegram_credentials().is_none());

        config.apply_env(|key| match key {
            CHAT_ID_ENV => Some("42".into()),
            BOT_TOKEN_ENV => Some(String::new()),
            _ => None,
        });
        assert_eq!(config.telegram_credentials(), Some(("file-token", "42")));
    }

    #[test]
    fn test_controller_options_mapping() {
        let config = WatchConfig {
            overlay_timeout_ms: 1500,
            snapshots: false,
            ..WatchConfig::default()
        };
        let options = config.controller_options();
        assert_eq!(options.overlay.timeout, Duration::from_millis(1500));
        assert!(!options.snapshots);
        assert_eq!(options.trader_url("x"), config.trader_url_template.replace("{id}", "x"));
    }

    #[test]
    fn test_resolve_prefers_explicit_then_env() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(LOCAL_CONFIG), "{}").unwrap();
        let explicit = dir.path().join("given.json");

        assert_eq!(
            resolve_config_path_from(Some(&explicit), Some("env.json".into()), dir.path(), None),
            Some(explicit)
        );
        assert_eq!(
            resolve_config_path_from(None, Some("env.json".into()), dir.path(), None),
            Some(PathBuf::from("env.json"))
        );
        assert_eq!(
            resolve_config_path_from(None, Some(String::new()), dir.path(), None),
            Some(dir.path().join(LOCAL_CONFIG))
        );
    }

    #[test]
    fn test_resolve_falls_back_to_user_config_dir() {
        let cwd = tempfile::tempdir().unwrap();
        let home = tempfile::tempdir().unwrap();
        assert_eq!(
            resolve_config_path_from(None, None, cwd.path(), Some(home.path().to_path_buf())),
            None
        );

        let user_config = home.path().join("trader-watch").join("config.json");
        std::fs::create_dir_all(user_config.parent().unwrap()).unwrap();
        std::fs::write(&user_config, "{}").unwrap();
        assert_eq!(
            resolve_config_path_from(None, None, cwd.path(), Some(home.path().to_path_buf())),
            Some(user_config.clone())
        );

        std::fs::write(cwd.path().join(LOCAL_CONFIG), "{}").unwrap();
        assert_eq!(
            resolve_config_path_from(None, None, cwd.path(), Some(home.path().to_path_buf())),
            Some(cwd.path().join(LOCAL_CONFIG))
        );
    }

    #[test]
    fn test_file_then_env_then_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.json");
        std::fs::write(
            &path,
            r#"{ "hours": 6, "symbol": "ETH", "bot_token": "file-token", "chat_id": "1" }"#,
        )
        .unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let mut config: WatchConfig = serde_json::from_str(&text).unwrap();

        config.apply_env(|key| (key == BOT_TOKEN_ENV).then(|| "env-token".to_string()));
        config.apply_overrides(CliOverrides {
            hours: Some(2.0),
            headed: true,
            ..CliOverrides::default()
        });

        assert_eq!(config.hours, 2.0);
        assert_eq!(config.symbol.as_deref(), Some("ETH"));
        assert!(!config.headless);
        assert!(config.snapshots);
        assert_eq!(config.telegram_credentials(), Some(("env-token", "1")));

        config.apply_overrides(CliOverrides {
            symbol: Some("BTC".into()),
            ids_file: Some(PathBuf::from("other.txt")),
            no_snapshots: true,
            ..CliOverrides::default()
        });
        assert_eq!(config.symbol.as_deref(), Some("BTC"));
        assert_eq!(config.ids_file, PathBuf::from("other.txt"));
        assert!(!config.snapshots);
        assert_eq!(config.hours, 2.0);
    }
}
