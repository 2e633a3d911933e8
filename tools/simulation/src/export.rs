//! Report export
//!
//! Serializes scenario results to JSON for external consumption.

use crate::config::SimulationConfig;
use crate::scenarios::ScenarioResult;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Combined export containing all simulation outputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationExport {
    pub version: String,
    pub config: SimulationConfig,
    pub scenarios: Vec<ScenarioResult>,
    pub passed: bool,
}

/// Build a complete simulation export.
pub fn build_export(config: &SimulationConfig, scenarios: Vec<ScenarioResult>) -> SimulationExport {
    SimulationExport {
        version: crate::VERSION.to_string(),
        config: config.clone(),
        passed: scenarios.iter().all(|s| s.passed),
        scenarios,
    }
}

/// Export complete simulation data as pretty JSON.
pub fn export_json(export: &SimulationExport) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(export)
}

/// Write export to a file path.
pub fn write_to_file(export: &SimulationExport, path: impl AsRef<Path>) -> std::io::Result<()> {
    let json = export_json(export)?;
    std::fs::write(path, json)
}
