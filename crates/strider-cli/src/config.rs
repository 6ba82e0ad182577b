//! Configuration Vault – reads/writes `~/.strider/config.toml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use strider_kernel::SafetyConfig;
use strider_runtime::{PostprocessorConfig, ProfileConfig};
use strider_types::StriderError;

/// Robot client settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Deadline for every robot call, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Switch vendor obstacle avoidance off at startup.
    #[serde(default = "default_disable_obstacle_avoidance")]
    pub disable_obstacle_avoidance: bool,

    /// Wait after disabling obstacle avoidance, in milliseconds.
    #[serde(default = "default_obstacle_settle_ms")]
    pub obstacle_settle_ms: u64,
}

fn default_timeout_ms() -> u64 {
    500
}
fn default_disable_obstacle_avoidance() -> bool {
    true
}
fn default_obstacle_settle_ms() -> u64 {
    3000
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            disable_obstacle_avoidance: default_disable_obstacle_avoidance(),
            obstacle_settle_ms: default_obstacle_settle_ms(),
        }
    }
}

impl ClientConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn obstacle_settle(&self) -> Duration {
        Duration::from_millis(self.obstacle_settle_ms)
    }
}

/// Persisted configuration stored in `~/.strider/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Log every tick at `debug` level unless `RUST_LOG` says otherwise.
    #[serde(default)]
    pub debug: bool,

    /// Velocity decay, deadzones and envelope.
    #[serde(default)]
    pub profile: ProfileConfig,

    /// Tick rate, increase rates, gait selection.
    #[serde(default)]
    pub postprocessor: PostprocessorConfig,

    /// Debounce window and resume policy.
    #[serde(default)]
    pub safety: SafetyConfig,

    #[serde(default)]
    pub client: ClientConfig,
}

impl Config {
    /// Check the profile and loop sections.
    pub fn validate(&self) -> Result<(), StriderError> {
        self.profile.validate()?;
        self.postprocessor.validate()
    }

    /// Default `tracing` filter for this configuration.
    pub fn log_filter(&self) -> &'static str {
        if self.debug { "debug" } else { "info" }
    }
}

/// Return the path to `~/.strider/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".strider").join("config.toml")
}

/// Load the config from disk.  Returns `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, StriderError> {
    load_from(&config_path())
}

/// Load the config from a specific path.
pub(crate) fn load_from(path: &PathBuf) -> Result<Option<Config>, StriderError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|e| {
        StriderError::Config(format!("failed to read config at {}: {e}", path.display()))
    })?;
    let mut cfg: Config = toml::from_str(&raw)
        .map_err(|e| StriderError::Config(format!("failed to parse config: {e}")))?;
    apply_env_overrides(&mut cfg);
    cfg.validate()?;
    Ok(Some(cfg))
}

/// Apply `STRIDER_*` environment variable overrides to `cfg`.
///
/// Unparseable values are ignored.
///
/// | Variable | Config field |
/// |---|---|
/// | `STRIDER_TICK_MS` | `postprocessor.tick_ms` |
/// | `STRIDER_DEBOUNCE_MS` | `safety.debounce_ms` |
/// | `STRIDER_VX_MAX` | `profile.vx_max` |
/// | `STRIDER_DEBUG` | `debug` |
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("STRIDER_TICK_MS")
        && let Ok(ms) = v.parse::<u64>()
    {
        cfg.postprocessor.tick_ms = ms;
    }
    if let Ok(v) = std::env::var("STRIDER_DEBOUNCE_MS")
        && let Ok(ms) = v.parse::<u64>()
    {
        cfg.safety.debounce_ms = ms;
    }
    if let Ok(v) = std::env::var("STRIDER_VX_MAX")
        && let Ok(vx_max) = v.parse::<f32>()
    {
        cfg.profile.vx_max = vx_max;
    }
    if let Ok(v) = std::env::var("STRIDER_DEBUG")
        && let Some(debug) = parse_flag(&v)
    {
        cfg.debug = debug;
    }
}

/// Built-in defaults with environment overrides applied.  Used when no
/// config file exists or the existing one cannot be read.
pub fn defaults_with_env() -> Config {
    let mut cfg = Config::default();
    apply_env_overrides(&mut cfg);
    cfg
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Save the config to disk, creating `~/.strider/` if necessary.
pub fn save(cfg: &Config) -> Result<(), StriderError> {
    save_to(cfg, &config_path())
}

/// Save the config to a specific path.
pub(crate) fn save_to(cfg: &Config, path: &PathBuf) -> Result<(), StriderError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            StriderError::Config(format!("failed to create config directory: {e}"))
        })?;
        // Owner only (rwx------) on Unix.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700)).map_err(|e| {
                StriderError::Config(format!("failed to set config directory permissions: {e}"))
            })?;
        }
    }
    let raw = toml::to_string_pretty(cfg)
        .map_err(|e| StriderError::Config(format!("failed to serialize config: {e}")))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| {
                use std::io::Write;
                f.write_all(raw.as_bytes())
            })
            .map_err(|e| {
                StriderError::Config(format!("failed to write config at {}: {e}", path.display()))
            })?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw).map_err(|e| {
        StriderError::Config(format!("failed to write config at {}: {e}", path.display()))
    })?;
    Ok(())
}
