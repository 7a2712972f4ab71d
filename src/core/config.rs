use serde::{Serialize, Deserialize};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::core::color::{ColorChoice, Palette};
use crate::core::error::{ReportError, Result};
use crate::core::output::{OutputChannel, Sink};
use crate::reporters::ReporterKind;

/// Run configuration, fixed for the whole run.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub parallel: bool,
    pub machine_output: bool,
    pub quiet: bool,
    pub color: ColorChoice,
    pub output: OutputTarget,
}

/// Serializable description of the output destination.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputTarget {
    #[default]
    Stdout,
    Stderr,
    /// A single shared report file.
    File(PathBuf),
    /// One file per write, named `<prefix><index>`.
    Split(PathBuf),
}

impl RunConfig {
    /// The reporter binding for this run's (parallel, machine output) pair.
    pub fn reporter_kind(&self) -> ReporterKind {
        ReporterKind::select(self.parallel, self.machine_output)
    }

    /// Opens the output destination.
    pub fn channel(&self) -> Result<OutputChannel> {
        let sink = match &self.output {
            OutputTarget::Stdout => Sink::Stdout,
            OutputTarget::Stderr => Sink::Stderr,
            OutputTarget::File(path) => {
                let file = File::create(path).map_err(|source| ReportError::CreateFile {
                    path: path.clone(),
                    source,
                })?;
                Sink::Shared(Arc::new(Mutex::new(file)))
            }
            OutputTarget::Split(prefix) => Sink::Split { prefix: prefix.clone() },
        };

        Ok(OutputChannel::new(sink, self.quiet))
    }

    /// Color markup is only worth emitting for human output.
    pub fn palette(&self) -> Palette {
        if self.machine_output {
            return Palette::plain();
        }
        Palette::for_choice(self.color, self.output == OutputTarget::Stdout)
    }

    /// Loads a config from TOML (`.toml`) or JSON (anything else).
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ReportError::ConfigError(format!("Config file not found: {}", path.display())));
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| ReportError::ConfigError(format!("Failed to read config file: {}", e)))?;

        let config = if path.extension().and_then(|ext| ext.to_str()) == Some("toml") {
            toml::from_str::<Self>(&contents)
                .map_err(|e| ReportError::ConfigError(format!("Failed to parse TOML config: {}", e)))?
        } else {
            serde_json::from_str::<Self>(&contents)
                .map_err(|e| ReportError::ConfigError(format!("Failed to parse JSON config: {}", e)))?
        };

        Ok(config)
    }
}
