use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_COMPILE_TIMEOUT_SECS, DEFAULT_MAX_OUTPUT_BYTES, DEFAULT_SCORER_BASE_URL,
    SCORING_TEMPERATURE,
};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

/// Process-wide settings of the grading service. Per-submission knobs live in
/// `ScoringConfiguration` instead.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraderSettings {
    /// Parent directory of all per-run artifact scopes.
    pub work_dir: PathBuf,
    pub compile_timeout_secs: u64,
    /// Capture limit for each of stdout and stderr of an executed program.
    pub max_output_bytes: usize,
    pub toolchains: ToolchainSettings,
    pub scorer: ScorerSettings,
}

impl Default for GraderSettings {
    fn default() -> Self {
        Self {
            work_dir: std::env::temp_dir().join("grader"),
            compile_timeout_secs: DEFAULT_COMPILE_TIMEOUT_SECS,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            toolchains: ToolchainSettings::default(),
            scorer: ScorerSettings::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainSettings {
    pub rustc_path: PathBuf,
    pub gnucpp_path: PathBuf,
    pub mcs_path: PathBuf,
    pub mono_path: PathBuf,
}

impl Default for ToolchainSettings {
    fn default() -> Self {
        Self {
            rustc_path: "rustc".into(),
            gnucpp_path: "g++".into(),
            mcs_path: "mcs".into(),
            mono_path: "mono".into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScorerSettings {
    /// Base URL of an OpenAI-compatible API, without the trailing
    /// `/chat/completions`.
    pub base_url: String,
    pub request_timeout_secs: u64,
    pub temperature: f32,
}

impl Default for ScorerSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SCORER_BASE_URL.to_string(),
            request_timeout_secs: 60,
            temperature: SCORING_TEMPERATURE,
        }
    }
}

impl ScorerSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl GraderSettings {
    /// Loads settings from `path` (if any) and applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut settings = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_toml_str(&content)?
            }
            None => Self::default(),
        };

        settings.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn compile_timeout(&self) -> Duration {
        Duration::from_secs(self.compile_timeout_secs)
    }

    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("GRADER_WORK_DIR") {
            self.work_dir = dir.into();
        }
        if let Some(path) = lookup("RUSTC_PATH") {
            self.toolchains.rustc_path = path.into();
        }
        if let Some(path) = lookup("GNUCPP_PATH") {
            self.toolchains.gnucpp_path = path.into();
        }
        if let Some(path) = lookup("MCS_PATH") {
            self.toolchains.mcs_path = path.into();
        }
        if let Some(path) = lookup("MONO_PATH") {
            self.toolchains.mono_path = path.into();
        }
        if let Some(url) = lookup("GRADER_SCORER_BASE_URL") {
            self.scorer.base_url = url;
        }
        if let Some(secs) = lookup("GRADER_COMPILE_TIMEOUT_SECS") {
            self.compile_timeout_secs = secs.parse().map_err(|_| ConfigError::InvalidValue {
                key: "GRADER_COMPILE_TIMEOUT_SECS".to_string(),
                value: secs.clone(),
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings = GraderSettings::from_toml_str(
            r#"
            work_dir = "/var/lib/grader"

            [toolchains]
            gnucpp_path = "/usr/bin/g++-13"

            [scorer]
            base_url = "http://localhost:8080/v1"
            "#,
        )
        .unwrap();

        assert_eq!(settings.work_dir, PathBuf::from("/var/lib/grader"));
        assert_eq!(settings.toolchains.gnucpp_path, PathBuf::from("/usr/bin/g++-13"));
        assert_eq!(settings.toolchains.rustc_path, PathBuf::from("rustc"));
        assert_eq!(settings.scorer.base_url, "http://localhost:8080/v1");
        assert_eq!(settings.scorer.request_timeout_secs, 60);
        assert_eq!(settings.compile_timeout_secs, DEFAULT_COMPILE_TIMEOUT_SECS);
    }

    #[test]
    fn test_invalid_toml() {
        let result = GraderSettings::from_toml_str("compile_timeout_secs = \"soon\"");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("GRADER_WORK_DIR", "/srv/grader"),
            ("RUSTC_PATH", "/opt/rust/bin/rustc"),
            ("GRADER_COMPILE_TIMEOUT_SECS", "5"),
        ]);

        let mut settings = GraderSettings::default();
        settings
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(settings.work_dir, PathBuf::from("/srv/grader"));
        assert_eq!(settings.toolchains.rustc_path, PathBuf::from("/opt/rust/bin/rustc"));
        assert_eq!(settings.compile_timeout(), Duration::from_secs(5));
        assert_eq!(settings.toolchains.mono_path, PathBuf::from("mono"));
    }

    #[test]
    fn test_invalid_env_override() {
        let mut settings = GraderSettings::default();
        let result = settings.apply_overrides(|key| {
            (key == "GRADER_COMPILE_TIMEOUT_SECS").then(|| "never".to_string())
        });
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_load_missing_file() {
        let result = GraderSettings::load(Some(Path::new("/nonexistent/grader.toml")));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }
}
