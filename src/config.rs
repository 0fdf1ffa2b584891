//! Limit configuration parsing and validation.
//!
//! The configuration file is TOML:
//!
//! ```toml
//! [global]
//! interface = "eth0"
//! download = "1000kbps"
//! upload-minimum = "10kbps"
//!
//! [[process]]
//! match = [{ name = "chrome" }, { name = "chromium" }]
//! upload = "200kbps"
//! ```
//!
//! Every reconciliation re-reads the file from scratch through a
//! [`ConfigLoader`]; nothing is cached between loads.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::models::limit::{LimitSpec, LimitTarget, MatchRule};
use crate::models::rate::LimitValue;
use crate::{AppError, Result};

/// A validated limit configuration, ready to reconcile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    /// Network interface the agent shapes.
    pub interface: String,
    /// Interface-wide limits; always present, possibly unbounded.
    pub global: LimitSpec,
    /// Per-process limits in declared order.
    pub processes: Vec<LimitSpec>,
}

impl Configuration {
    /// Validate and build a configuration.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the interface name is empty or contains
    /// whitespace, if `global` is not a global spec, or if any entry of
    /// `processes` is not a named spec or its first match name contains
    /// whitespace.
    pub fn new(interface: String, global: LimitSpec, processes: Vec<LimitSpec>) -> Result<Self> {
        if interface.trim().is_empty() {
            return Err(AppError::Config("interface must not be empty".into()));
        }
        if interface.chars().any(char::is_whitespace) {
            return Err(AppError::Config(format!(
                "interface {interface:?} must not contain whitespace"
            )));
        }
        if global.target != LimitTarget::Global {
            return Err(AppError::Config("global limits must target the interface".into()));
        }
        for (index, spec) in processes.iter().enumerate() {
            let name = spec.process_name().ok_or_else(|| {
                AppError::Config("process limits must name a process".into())
            })?;
            // Only the first name goes on the wire, where fields split on whitespace.
            if name.chars().any(char::is_whitespace) {
                return Err(AppError::Config(format!(
                    "process #{index}: name {name:?} must not contain whitespace"
                )));
            }
        }
        Ok(Self {
            interface,
            global,
            processes,
        })
    }

    /// Parse configuration from a TOML string.
    ///
    /// `interface_override`, when set, replaces `global.interface`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str, interface_override: Option<&str>) -> Result<Self> {
        let file: ConfigFile = toml::from_str(raw)?;

        let interface = interface_override
            .map(str::to_owned)
            .or(file.global.interface)
            .ok_or_else(|| {
                AppError::Config(
                    "no interface configured: set global.interface or pass --interface".into(),
                )
            })?;

        let global = file.global.limits.into_spec(LimitTarget::Global);

        let processes = file
            .process
            .into_iter()
            .enumerate()
            .map(|(index, process)| {
                let names = process.matches.into_iter().map(|m| m.name).collect();
                let rule = MatchRule::new(names)
                    .map_err(|err| AppError::Config(format!("process #{index}: {err}")))?;
                Ok(process.limits.into_spec(LimitTarget::Named(rule)))
            })
            .collect::<Result<Vec<_>>>()?;

        Self::new(interface, global, processes)
    }
}

/// Produces a fresh [`Configuration`] from a file.
pub trait ConfigLoader: Send + Sync {
    /// Read, parse, and validate the configuration at `path`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` on any read, parse, or validation failure.
    fn load(&self, path: &Path) -> Result<Configuration>;
}

/// [`ConfigLoader`] for the TOML dialect described in the module docs.
#[derive(Debug, Clone, Default)]
pub struct TomlConfigLoader {
    interface_override: Option<String>,
}

impl TomlConfigLoader {
    /// Loader that takes the interface from the file.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Force the interface regardless of what the file says.
    #[must_use]
    pub fn with_interface_override(mut self, interface: Option<String>) -> Self {
        self.interface_override = interface;
        self
    }
}

impl ConfigLoader for TomlConfigLoader {
    fn load(&self, path: &Path) -> Result<Configuration> {
        info!(path = %path.display(), "loading limit configuration");
        let raw = fs::read_to_string(path).map_err(|err| {
            AppError::Config(format!("failed to read {}: {err}", path.display()))
        })?;
        let config = Configuration::from_toml_str(&raw, self.interface_override.as_deref())?;
        log_summary(&config);
        Ok(config)
    }
}

fn log_summary(config: &Configuration) {
    info!(
        interface = %config.interface,
        download = ?config.global.download.map(|v| v.to_string()),
        upload = ?config.global.upload.map(|v| v.to_string()),
        download_minimum = ?config.global.download_minimum.map(|v| v.to_string()),
        upload_minimum = ?config.global.upload_minimum.map(|v| v.to_string()),
        unbounded = config.global.is_unbounded(),
        "global limits"
    );
    for spec in &config.processes {
        info!(
            process = spec.process_name().unwrap_or_default(),
            download = ?spec.download.map(|v| v.to_string()),
            upload = ?spec.upload.map(|v| v.to_string()),
            download_minimum = ?spec.download_minimum.map(|v| v.to_string()),
            upload_minimum = ?spec.upload_minimum.map(|v| v.to_string()),
            "process limits"
        );
    }
}

// ── File format ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    global: GlobalSection,
    #[serde(default)]
    process: Vec<ProcessSection>,
}

#[derive(Debug, Default, Deserialize)]
struct GlobalSection {
    interface: Option<String>,
    #[serde(flatten)]
    limits: RateFields,
}

#[derive(Debug, Deserialize)]
struct ProcessSection {
    #[serde(rename = "match")]
    matches: Vec<MatchEntry>,
    #[serde(flatten)]
    limits: RateFields,
}

#[derive(Debug, Deserialize)]
struct MatchEntry {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RateFields {
    download: Option<LimitValue>,
    upload: Option<LimitValue>,
    #[serde(alias = "download_minimum")]
    download_minimum: Option<LimitValue>,
    #[serde(alias = "upload_minimum")]
    upload_minimum: Option<LimitValue>,
}

impl RateFields {
    fn into_spec(self, target: LimitTarget) -> LimitSpec {
        LimitSpec {
            target,
            download: self.download,
            upload: self.upload,
            download_minimum: self.download_minimum,
            upload_minimum: self.upload_minimum,
        }
    }
}
