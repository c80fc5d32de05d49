// Configuration loading and validation (config/pipeline.toml).

use courtstats_core::identity::MatcherConfig;
use courtstats_core::metrics::DefensiveBaseline;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    /// Directory every relative path is resolved against.
    pub base_dir: PathBuf,
    pub paths: PathsConfig,
    pub matching: MatcherConfig,
    pub metrics: MetricsConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Directory holding the per-season input files.
    pub fn data_dir(&self) -> PathBuf {
        self.base_dir.join(&self.paths.data_dir)
    }

    /// Location of a named output file.
    pub fn output_file(&self, name: &str) -> PathBuf {
        self.base_dir.join(&self.paths.output_dir).join(name)
    }

    /// Resolve an optional input path from `[paths]`.
    pub fn input_file(&self, path: Option<&str>) -> Option<PathBuf> {
        path.map(|p| self.base_dir.join(p))
    }
}

// ---------------------------------------------------------------------------
// pipeline.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
struct PipelineFile {
    #[serde(default)]
    paths: PathsConfig,
    #[serde(default)]
    matching: MatcherConfig,
    #[serde(default)]
    metrics: MetricsConfig,
    #[serde(default)]
    logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub data_dir: String,
    pub output_dir: String,
    pub identity_map: String,
    pub team_index: String,
    pub unmapped: String,
    pub master: String,
    pub shooting_baseline: String,
    pub run_summary: String,
    pub on_off_output: String,
    /// Salary table (`Year, nba_id, Salary`).
    pub salary: Option<String>,
    /// On/off shooting breakdown to merge onto the master table.
    pub on_off: Option<String>,
    /// Previously verified identity map whose links take priority.
    pub seed_identity_map: Option<String>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".into(),
            output_dir: "data".into(),
            identity_map: "player_index_map.csv".into(),
            team_index: "wteam_index.csv".into(),
            unmapped: "unmapped_players.csv".into(),
            master: "wnba_master.csv".into(),
            shooting_baseline: "avg_shooting.csv".into(),
            run_summary: "run_summary.json".into(),
            on_off_output: "updated_wnba_master.csv".into(),
            salary: None,
            on_off: None,
            seed_identity_map: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Subtract the offensive-rating year average from `drtg_on`.
    pub legacy_rdrtg_baseline: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            legacy_rdrtg_baseline: true,
        }
    }
}

impl MetricsConfig {
    pub fn defensive_baseline(&self) -> DefensiveBaseline {
        if self.legacy_rdrtg_baseline {
            DefensiveBaseline::OffensiveAverage
        } else {
            DefensiveBaseline::DefensiveAverage
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
    /// Log to this file instead of stderr.
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "courtstats=info,courtstats_app=info,courtstats_core=info,warn".into(),
            file: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load and validate `config/pipeline.toml` under `base_dir`.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join("pipeline.toml");
    let text = read_file(&path)?;
    let file: PipelineFile = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        source: e,
    })?;

    let config = Config {
        base_dir: base_dir.to_path_buf(),
        paths: file.paths,
        matching: file.matching,
        metrics: file.metrics,
        logging: file.logging,
    };
    validate(&config)?;
    Ok(config)
}

/// Config files shipped in `defaults/`.
const DEFAULT_FILES: [&str; 1] = ["pipeline.toml"];

/// Copy the shipped config files from `defaults/` into `config/` when they are
/// missing. Existing files in `config/` are never overwritten. Returns the
/// paths that were created.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     pass --base-dir or ensure defaults/ is present",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let mut copied = Vec::new();
    for file_name in DEFAULT_FILES {
        let source = defaults_dir.join(file_name);
        if !source.is_file() {
            continue;
        }
        let target = config_dir.join(file_name);

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(mut dest) => {
                let content = std::fs::read(&source).map_err(|e| ConfigError::DefaultsCopyError {
                    message: format!("failed to read {}: {e}", source.display()),
                })?;
                std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                    ConfigError::DefaultsCopyError {
                        message: format!("failed to write {}: {e}", target.display()),
                    }
                })?;
                copied.push(target);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(e) => {
                return Err(ConfigError::DefaultsCopyError {
                    message: format!("failed to create {}: {e}", target.display()),
                });
            }
        }
    }

    Ok(copied)
}

/// Copy defaults if needed, then load.
pub fn load_config(base_dir: &Path) -> Result<Config, ConfigError> {
    ensure_config_files(base_dir)?;
    load_config_from(base_dir)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn invalid(field: &str, message: &str) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let m = &config.matching;
    if !(m.fuzzy_threshold > 0.0 && m.fuzzy_threshold <= 1.0) {
        return Err(invalid(
            "matching.fuzzy_threshold",
            "must be in the range (0, 1]",
        ));
    }
    if !m.minutes_tolerance.is_finite() || m.minutes_tolerance < 0.0 {
        return Err(invalid("matching.minutes_tolerance", "must be non-negative"));
    }
    if !m.points_tolerance.is_finite() || m.points_tolerance < 0.0 {
        return Err(invalid("matching.points_tolerance", "must be non-negative"));
    }
    if m.multi_team_marker.trim().is_empty() {
        return Err(invalid("matching.multi_team_marker", "must not be empty"));
    }

    let p = &config.paths;
    let required = [
        ("paths.data_dir", &p.data_dir),
        ("paths.output_dir", &p.output_dir),
        ("paths.identity_map", &p.identity_map),
        ("paths.team_index", &p.team_index),
        ("paths.unmapped", &p.unmapped),
        ("paths.master", &p.master),
        ("paths.shooting_baseline", &p.shooting_baseline),
        ("paths.run_summary", &p.run_summary),
        ("paths.on_off_output", &p.on_off_output),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(invalid(field, "must not be empty"));
        }
    }

    if config.logging.filter.trim().is_empty() {
        return Err(invalid("logging.filter", "must not be empty"));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
