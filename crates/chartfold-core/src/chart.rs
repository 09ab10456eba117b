//! Chart.yaml metadata

use serde::Deserialize;

use crate::error::{CoreError, Result};

/// Chart metadata, read from the input chart's Chart.yaml
///
/// Only the fields the generated templates refer to are modeled; the
/// Chart.yaml file itself is copied through untouched.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartInfo {
    /// Chart name, used in helper include names (`<name>.fullname`)
    #[serde(default = "default_name")]
    pub name: String,

    /// Chart version (SemVer)
    #[serde(default = "default_version")]
    pub version: String,

    /// Application version
    #[serde(default = "default_version")]
    pub app_version: String,
}

fn default_name() -> String {
    "helm".to_string()
}

fn default_version() -> String {
    "0.1.0".to_string()
}

impl Default for ChartInfo {
    fn default() -> Self {
        Self {
            name: default_name(),
            version: default_version(),
            app_version: default_version(),
        }
    }
}

impl ChartInfo {
    /// Parse a Chart.yaml string
    pub fn parse(content: &str) -> Result<Self> {
        let chart: ChartInfo = serde_yaml::from_str(content)?;

        if chart.name.is_empty() {
            return Err(CoreError::InvalidChart {
                message: "missing required field: name".to_string(),
            });
        }

        Ok(chart)
    }

    /// The chart version as a parsed SemVer version, when valid
    pub fn semver_version(&self) -> Option<semver::Version> {
        semver::Version::parse(&self.version).ok()
    }

    /// Helper include reference for the chart's fullname template
    pub fn fullname_helper(&self) -> String {
        format!("{}.fullname", self.name)
    }
}
