use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::SurveyError;

/// Where the survey partitions and zone boundaries live, and how to read them.
///
/// ```toml
/// data_dir = "csv"
/// partitions = ["Grupo_00.csv", "Grupo_01.csv"]
///
/// [csv]
/// delimiter = "|"
/// row_index = true
///
/// [boundaries]
/// path = "map.geo.json"
/// zone_property = "Nueva_Zona"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SurveyConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Partition file names, read in this order.
    #[serde(default = "default_partitions")]
    pub partitions: Vec<String>,
    #[serde(default)]
    pub csv: CsvConfig,
    #[serde(default)]
    pub boundaries: BoundaryConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CsvConfig {
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    /// The first column of every partition is a synthetic row index.
    #[serde(default = "default_true")]
    pub row_index: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BoundaryConfig {
    #[serde(default = "default_boundary_path")]
    pub path: PathBuf,
    #[serde(default = "default_zone_property")]
    pub zone_property: String,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("csv")
}

fn default_partitions() -> Vec<String> {
    (0..4).map(|i| format!("Grupo_{i:02}.csv")).collect()
}

fn default_delimiter() -> char {
    ','
}

fn default_true() -> bool {
    true
}

fn default_boundary_path() -> PathBuf {
    PathBuf::from("map.geo.json")
}

fn default_zone_property() -> String {
    "Nueva_Zona".to_string()
}

impl Default for CsvConfig {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            row_index: true,
        }
    }
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            path: default_boundary_path(),
            zone_property: default_zone_property(),
        }
    }
}

impl Default for SurveyConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            partitions: default_partitions(),
            csv: CsvConfig::default(),
            boundaries: BoundaryConfig::default(),
        }
    }
}

impl SurveyConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, SurveyError> {
        let config: SurveyConfig =
            toml::from_str(text).map_err(|e| SurveyError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read a TOML config file. Relative paths inside it are resolved against
    /// the directory containing the file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SurveyError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| SurveyError::Config(format!("{}: {e}", path.display())))?;
        let mut config = Self::from_toml_str(&text)?;

        if let Some(base) = path.parent() {
            config.data_dir = base.join(&config.data_dir);
            config.boundaries.path = base.join(&config.boundaries.path);
        }
        Ok(config)
    }

    pub fn partition_paths(&self) -> Vec<PathBuf> {
        self.partitions
            .iter()
            .map(|name| self.data_dir.join(name))
            .collect()
    }

    pub fn delimiter_byte(&self) -> Result<u8, SurveyError> {
        u8::try_from(self.csv.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| {
                SurveyError::Config(format!(
                    "delimiter '{}' is not a single ASCII character",
                    self.csv.delimiter
                ))
            })
    }

    fn validate(&self) -> Result<(), SurveyError> {
        if self.partitions.is_empty() {
            return Err(SurveyError::Config(
                "at least one partition file is required".to_string(),
            ));
        }
        self.delimiter_byte()?;
        Ok(())
    }
}
