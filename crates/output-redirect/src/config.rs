use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{RedirectError, Result};

pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_LOG_FORMAT: &str = "console";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectConfig {
    pub general: GeneralConfig,
    pub debug: DebugConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneralConfig {
    pub root_dir: Option<PathBuf>,
    pub no_json: bool,
}

/// Switches for the plugin's own diagnostic messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DebugConfig {
    pub output_redirect: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            format: DEFAULT_LOG_FORMAT.to_string(),
        }
    }
}

/// Values handed over by the runner's command line. They win over the file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedirectOptions {
    pub no_redirect: bool,
    pub no_json: bool,
    pub root_dir: Option<PathBuf>,
}

/// What a session is started with once file and options are merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSettings {
    pub redirect: bool,
    pub json_log: bool,
    pub root_dir: Option<PathBuf>,
    pub debug: bool,
}

impl Default for RedirectConfig {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            debug: DebugConfig {
                output_redirect: true,
            },
            logging: LoggingConfig::default(),
        }
    }
}

impl RedirectConfig {
    pub fn resolve(&self, options: &RedirectOptions) -> Result<ResolvedSettings> {
        let json_log = !(options.no_json || self.general.no_json);
        let root_dir = options
            .root_dir
            .clone()
            .or_else(|| self.general.root_dir.clone());
        if json_log && root_dir.is_none() {
            return Err(RedirectError::MissingRootDir);
        }
        Ok(ResolvedSettings {
            redirect: !options.no_redirect,
            json_log,
            root_dir,
            debug: self.debug.output_redirect,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
struct PartialConfig {
    #[serde(default)]
    general: PartialGeneralConfig,
    #[serde(default)]
    debug: PartialDebugConfig,
    #[serde(default)]
    logging: PartialLoggingConfig,
}

#[derive(Debug, Default, Deserialize)]
struct PartialGeneralConfig {
    #[serde(default)]
    root_dir: String,
    #[serde(default)]
    no_json: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct PartialDebugConfig {
    #[serde(default)]
    output_redirect: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct PartialLoggingConfig {
    #[serde(default)]
    level: String,
    #[serde(default)]
    format: String,
}

/// Load config with precedence defaults < (optional) config file. An explicit
/// path that cannot be read is a hard error; a missing default file is not.
pub fn load_config(config_file: Option<&str>) -> Result<(RedirectConfig, Option<PathBuf>)> {
    let mut cfg = RedirectConfig::default();

    let explicit = config_file
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(PathBuf::from);

    let (path_to_try, used) = if let Some(path) = explicit {
        (Some(path), true)
    } else {
        (default_config_path(), false)
    };

    if let Some(path) = path_to_try {
        match std::fs::read_to_string(&path) {
            Ok(text) => {
                apply_yaml(&mut cfg, &text)?;
                return Ok((cfg, Some(path)));
            }
            Err(err) => {
                if used {
                    return Err(RedirectError::io(path, err));
                }
            }
        }
    }

    Ok((cfg, None))
}

pub fn parse_config(text: &str) -> Result<RedirectConfig> {
    let mut cfg = RedirectConfig::default();
    apply_yaml(&mut cfg, text)?;
    Ok(cfg)
}

fn apply_yaml(cfg: &mut RedirectConfig, text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Ok(());
    }
    let parsed: PartialConfig = serde_yaml::from_str(text)
        .map_err(|err| RedirectError::Config(format!("parse config: {err}")))?;
    apply_partial(cfg, parsed)
}

fn default_config_path() -> Option<PathBuf> {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        if !xdg.trim().is_empty() {
            return Some(
                PathBuf::from(xdg)
                    .join("output-redirect")
                    .join("config.yaml"),
            );
        }
    }
    if let Ok(home) = std::env::var("HOME") {
        if !home.trim().is_empty() {
            return Some(
                PathBuf::from(home)
                    .join(".config")
                    .join("output-redirect")
                    .join("config.yaml"),
            );
        }
    }
    None
}

fn apply_partial(cfg: &mut RedirectConfig, partial: PartialConfig) -> Result<()> {
    if !partial.general.root_dir.trim().is_empty() {
        cfg.general.root_dir = Some(expand_tilde(partial.general.root_dir.trim())?);
    }
    if let Some(no_json) = partial.general.no_json {
        cfg.general.no_json = no_json;
    }
    if let Some(enabled) = partial.debug.output_redirect {
        cfg.debug.output_redirect = enabled;
    }
    if !partial.logging.level.trim().is_empty() {
        cfg.logging.level = partial.logging.level.trim().to_string();
    }
    if !partial.logging.format.trim().is_empty() {
        cfg.logging.format = partial.logging.format.trim().to_string();
    }
    Ok(())
}

fn expand_tilde(input: &str) -> Result<PathBuf> {
    if input == "~" {
        let home = std::env::var("HOME")
            .map_err(|_| RedirectError::Config("failed to resolve HOME".to_string()))?;
        return Ok(PathBuf::from(home));
    }
    if let Some(rest) = input.strip_prefix("~/") {
        let home = std::env::var("HOME")
            .map_err(|_| RedirectError::Config("failed to resolve HOME".to_string()))?;
        return Ok(PathBuf::from(home).join(rest));
    }
    Ok(Path::new(input).to_path_buf())
}
