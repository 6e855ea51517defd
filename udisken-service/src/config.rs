// SPDX-License-Identifier: GPL-3.0-only

use std::path::{Path, PathBuf};

use clap::Parser;
use serde::Deserialize;
use thiserror::Error;
use udisken_contracts::MountOptions;

const APP_DIR: &str = "udisken";
const CONFIG_FILE: &str = "config.toml";

/// Automount removable storage through UDisks2
#[derive(Parser, Debug, Default, Clone)]
#[command(name = "udisken", version, about, long_about = None)]
pub struct Cli {
    /// Do not show desktop notifications
    #[arg(long)]
    pub no_notify: bool,

    /// Track devices without mounting anything
    #[arg(long)]
    pub no_automount: bool,

    /// Enable debug logging
    #[arg(short = 'd', long, visible_alias = "verbose")]
    pub debug: bool,

    /// Configuration file (default: $XDG_CONFIG_HOME/udisken/config.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Option passed to Filesystem.Mount, may be repeated
    #[arg(long = "mount-option", value_name = "OPT")]
    pub mount_options: Vec<String>,

    /// Filesystem type passed to Filesystem.Mount instead of the probed one
    #[arg(long = "mount-fstype", value_name = "TYPE")]
    pub mount_fstype: Option<String>,

    /// Also automount filesystems that appear on an already known device
    #[arg(long)]
    pub automount_on_attach: bool,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LoggingLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LoggingLevel {
    pub fn as_directive(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// On-disk configuration. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub automount: Option<bool>,
    pub notify: Option<bool>,
    pub log_level: Option<LoggingLevel>,
    pub mount_options: Option<Vec<String>>,
    pub mount_fstype: Option<String>,
    pub automount_on_attach: Option<bool>,
}

impl FileConfig {
    /// Read `path`; a missing file is `Ok(None)`.
    pub fn load(path: &Path) -> Result<Option<Self>, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        toml::from_str(&contents)
            .map(Some)
            .map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })
    }
}

/// Environment switches, read once at startup.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct Environment {
    pub debug: bool,
    pub no_notify: bool,
}

impl Environment {
    pub fn from_process() -> Self {
        Self {
            debug: non_zero_env("DEBUG"),
            no_notify: non_zero_env("UDISKEN_NO_NOTIFY"),
        }
    }
}

/// Effective runtime settings.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Settings {
    pub automount: bool,
    pub notify: bool,
    pub log_level: LoggingLevel,
    pub mount_options: MountOptions,
    pub automount_on_attach: bool,
    /// File the settings were read from, if one existed.
    pub source: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            automount: true,
            notify: true,
            log_level: LoggingLevel::Info,
            mount_options: MountOptions::default(),
            automount_on_attach: false,
            source: None,
        }
    }
}

impl Settings {
    pub fn load(cli: &Cli, env: &Environment) -> Result<Self, ConfigError> {
        let path = cli.config.clone().or_else(default_config_path);
        let file = match path.as_deref() {
            Some(path) => FileConfig::load(path)?,
            None => None,
        };

        let mut settings = Self::resolve(cli, file.as_ref(), env);
        if file.is_some() {
            settings.source = path;
        }
        Ok(settings)
    }

    /// Layer defaults, then the file, then the environment, then the CLI.
    pub fn resolve(cli: &Cli, file: Option<&FileConfig>, env: &Environment) -> Self {
        let mut settings = Self::default();

        if let Some(file) = file {
            if let Some(automount) = file.automount {
                settings.automount = automount;
            }
            if let Some(notify) = file.notify {
                settings.notify = notify;
            }
            if let Some(level) = file.log_level {
                settings.log_level = level;
            }
            if let Some(options) = &file.mount_options {
                settings.mount_options.options = options.clone();
            }
            if let Some(fs_type) = &file.mount_fstype {
                settings.mount_options.fs_type = Some(fs_type.clone());
            }
            if let Some(on_attach) = file.automount_on_attach {
                settings.automount_on_attach = on_attach;
            }
        }

        if env.debug {
            settings.log_level = LoggingLevel::Debug;
        }
        if env.no_notify {
            settings.notify = false;
        }

        if cli.debug {
            settings.log_level = LoggingLevel::Debug;
        }
        if cli.no_notify {
            settings.notify = false;
        }
        if cli.no_automount {
            settings.automount = false;
        }
        if !cli.mount_options.is_empty() {
            settings.mount_options.options = cli.mount_options.clone();
        }
        if let Some(fs_type) = &cli.mount_fstype {
            settings.mount_options.fs_type = Some(fs_type.clone());
        }
        if cli.automount_on_attach {
            settings.automount_on_attach = true;
        }

        settings
    }
}

fn default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config) = std::env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(xdg_config).join(APP_DIR).join(CONFIG_FILE));
    }

    std::env::var_os("HOME").map(|home| {
        PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join(CONFIG_FILE)
    })
}

/// Unset, empty and all-`0` values are false; anything else is true.
fn non_zero(value: &str) -> bool {
    value.chars().any(|c| c != '0')
}

fn non_zero_env(name: &str) -> bool {
    std::env::var_os(name).is_some_and(|value| non_zero(&value.to_string_lossy()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(contents: &str) -> FileConfig {
        toml::from_str(contents).unwrap()
    }

    #[test]
    fn non_zero_values() {
        assert!(!non_zero(""));
        assert!(!non_zero("0"));
        assert!(!non_zero("000"));
        assert!(non_zero("1"));
        assert!(non_zero("01"));
        assert!(non_zero("yes"));
    }

    #[test]
    fn defaults_automount_and_notify() {
        let settings = Settings::resolve(&Cli::default(), None, &Environment::default());
        assert_eq!(settings, Settings::default());
        assert!(settings.automount);
        assert!(settings.notify);
        assert!(!settings.automount_on_attach);
        assert!(settings.mount_options.is_default());
    }

    #[test]
    fn file_overrides_defaults() {
        let file = file(
            r#"
            automount = false
            log_level = "warn"
            mount_options = ["noexec", "nosuid"]
            automount_on_attach = true
            "#,
        );
        let settings = Settings::resolve(&Cli::default(), Some(&file), &Environment::default());

        assert!(!settings.automount);
        assert!(settings.notify);
        assert_eq!(settings.log_level, LoggingLevel::Warn);
        assert_eq!(settings.mount_options.options, vec!["noexec", "nosuid"]);
        assert!(settings.automount_on_attach);
    }

    #[test]
    fn environment_overrides_file_and_cli_overrides_everything() {
        let file = file("notify = true\nlog_level = \"error\"\nmount_options = [\"ro\"]");
        let env = Environment {
            debug: true,
            no_notify: true,
        };

        let settings = Settings::resolve(&Cli::default(), Some(&file), &env);
        assert!(!settings.notify);
        assert_eq!(settings.log_level, LoggingLevel::Debug);

        let cli = Cli {
            no_automount: true,
            mount_options: vec!["noatime".into()],
            ..Cli::default()
        };
        let settings = Settings::resolve(&cli, Some(&file), &env);
        assert!(!settings.automount);
        assert_eq!(settings.mount_options.options, vec!["noatime"]);
    }

    #[test]
    fn mount_fstype_comes_from_file_or_cli() {
        let file = file("mount_fstype = \"exfat\"");
        let settings = Settings::resolve(&Cli::default(), Some(&file), &Environment::default());
        assert_eq!(settings.mount_options.fs_type.as_deref(), Some("exfat"));
        assert!(!settings.mount_options.is_default());

        let cli = Cli::parse_from(["udisken", "--mount-fstype", "vfat"]);
        let settings = Settings::resolve(&cli, Some(&file), &Environment::default());
        assert_eq!(settings.mount_options.fs_type.as_deref(), Some("vfat"));
        assert!(settings.mount_options.options.is_empty());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(toml::from_str::<FileConfig>("automout = true").is_err());
    }

    #[test]
    fn missing_file_means_defaults() {
        let path = std::env::temp_dir().join("udisken-missing-config-does-not-exist.toml");
        assert_eq!(FileConfig::load(&path).unwrap(), None);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let path = std::env::temp_dir().join(format!("udisken-bad-{}.toml", std::process::id()));
        std::fs::write(&path, "automount = \"sometimes\"").unwrap();

        let result = FileConfig::load(&path);
        std::fs::remove_file(&path).unwrap();

        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn cli_parses_flags() {
        let cli = Cli::parse_from([
            "udisken",
            "--verbose",
            "--no-notify",
            "--mount-option",
            "noexec",
            "--mount-option",
            "nosuid",
        ]);
        assert!(cli.debug);
        assert!(cli.no_notify);
        assert!(!cli.no_automount);
        assert_eq!(cli.mount_options, vec!["noexec", "nosuid"]);
    }
}
