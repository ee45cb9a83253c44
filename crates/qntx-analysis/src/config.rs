//! Analysis configuration.
//!
//! Every section falls back to its defaults, so a file only needs the
//! options it changes:
//!
//! ```json
//! { "tsne": { "perplexity": 30.0, "metric": "euclidean" }, "report": { "top_k": 3 } }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::reduce::{SvdConfig, TsneConfig};
use crate::report::ReportConfig;

/// Options for every helper in the crate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub tsne: TsneConfig,
    pub svd: SvdConfig,
    pub report: ReportConfig,
}

impl AnalysisConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }
}
