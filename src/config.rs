use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Which backend a sink writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    #[default]
    Console,
    DelimitedFile,
    EmbeddedTable,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Console => "console",
            Self::DelimitedFile => "delimited-file",
            Self::EmbeddedTable => "embedded-table",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "console" => Ok(Self::Console),
            "delimited-file" | "file" | "csv" => Ok(Self::DelimitedFile),
            "embedded-table" | "table" | "sqlite" => Ok(Self::EmbeddedTable),
            other => Err(Error::Configuration(format!("unknown backend kind: {other}"))),
        }
    }
}

/// Sink construction options
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkOptions {
    pub backend: BackendKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,
}

impl SinkOptions {
    pub fn console() -> Self {
        Self::default()
    }

    pub fn delimited_file(path: impl Into<PathBuf>) -> Self {
        Self {
            backend: BackendKind::DelimitedFile,
            file_path: Some(path.into()),
            database_path: None,
        }
    }

    pub fn embedded_table(path: impl Into<PathBuf>) -> Self {
        Self {
            backend: BackendKind::EmbeddedTable,
            file_path: None,
            database_path: Some(path.into()),
        }
    }

    /// Check that the path required by the selected backend is present
    pub fn validate(&self) -> Result<()> {
        match self.backend {
            BackendKind::Console => Ok(()),
            BackendKind::DelimitedFile if self.file_path.is_none() => Err(Error::Configuration(
                "file_path is required for the delimited-file backend".to_string(),
            )),
            BackendKind::EmbeddedTable if self.database_path.is_none() => {
                Err(Error::Configuration(
                    "database_path is required for the embedded-table backend".to_string(),
                ))
            }
            _ => Ok(()),
        }
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("forgelog.toml")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<SinkOptions>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let options: SinkOptions = toml::from_str(&contents)?;
    Ok(Some(options))
}

pub fn write_config(path: &Path, options: &SinkOptions, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(options)?;
    std::fs::write(path, contents)?;
    Ok(())
}

/// Create the parent directory of a log destination if it is missing
pub fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
