use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

/// Shortest refresh period the scheduler accepts.
pub const MIN_REFRESH: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub devices: DevicesConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Refresh period in milliseconds (I/O sampling rate)
    pub refresh_interval_ms: u64,
    /// Probe temperatures every N refresh ticks
    pub temperature_every: u32,
    /// Smallest elapsed time a rate is divided by, in milliseconds
    pub min_elapsed_ms: u64,
    /// Kill an external command after this many milliseconds
    pub probe_timeout_ms: u64,
    /// Weight of the newest rate, 0 < smoothing <= 1 (1 = no smoothing)
    pub smoothing: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DevicesConfig {
    /// Patterns of devices to ignore; a trailing `*` matches a prefix ("disk1*")
    pub exclude: Vec<String>,
    /// Friendly names by device or RAID id: { "disk4" = "photos", "md0" = "backup" }
    pub aliases: HashMap<String, String>,
}

// ── Defaults ─────────────────────────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            refresh_interval_ms: 2000,
            temperature_every:   5,
            min_elapsed_ms:      1,
            probe_timeout_ms:    3000,
            smoothing:           1.0,
        }
    }
}

impl GeneralConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms).max(MIN_REFRESH)
    }

    pub fn min_elapsed(&self) -> Duration {
        Duration::from_millis(self.min_elapsed_ms.max(1))
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms.max(100))
    }

    pub fn temperature_every(&self) -> u32 {
        self.temperature_every.max(1)
    }
}

impl DevicesConfig {
    pub fn is_excluded(&self, id: &str) -> bool {
        self.exclude.iter().any(|pat| glob_match(pat, id))
    }

    pub fn alias(&self, id: &str) -> Option<&str> {
        self.aliases.get(id).map(String::as_str)
    }
}

fn glob_match(pattern: &str, name: &str) -> bool {
    if let Some(prefix) = pattern.strip_suffix('*') {
        name.starts_with(prefix)
    } else {
        pattern == name
    }
}

// ── Load / Save ───────────────────────────────────────────────────────

impl Config {
    pub fn load() -> Self {
        let Some(path) = Config::config_path() else {
            return Config::default();
        };
        match fs::read_to_string(&path) {
            Ok(text) => Config::parse(&text).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "invalid config, using defaults");
                Config::default()
            }),
            Err(_) => {
                // Write defaults on first run (best-effort)
                if let Err(e) = try_write_defaults(&path) {
                    debug!(error = %e, "could not write default config");
                }
                Config::default()
            }
        }
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("xdmon").join("xdmon.toml"))
    }
}

fn try_write_defaults(path: &PathBuf) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let text = toml::to_string_pretty(&Config::default())?;
    fs::write(path, format!("# xdmon configuration\n# Generated on first run, edit freely\n\n{}", text))?;
    Ok(())
}
