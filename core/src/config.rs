use std::{fs, path::Path};

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Settings of a weight-sweep evaluation, stored next to its outputs.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    pub charts: ChartConfig,
    pub report: ReportConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    /// Canvas size of single charts in pixels.
    pub chart_size: (u32, u32),
    /// Size of one panel of the weight-sensitivity grid.
    pub panel_size: (u32, u32),
    /// Accuracy axis of the weight-sensitivity panels.
    pub accuracy_range: (f64, f64),
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            chart_size: (800, 600),
            panel_size: (500, 430),
            accuracy_range: (0.0, 1.0),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Inline the charts as data URLs instead of linking the files.
    pub embed_charts: bool,
}

impl EvaluatorConfig {
    /// Read the configuration at `path`, or write the defaults there when the
    /// file does not exist yet. Fields missing from the file keep their defaults.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("failed to read config from {}", path.display()))?;
            serde_json::from_str::<Self>(&contents)
                .with_context(|| format!("failed to parse config from {}", path.display()))?
        } else {
            let config = Self::default();
            config.save(path)?;
            info!(path = %path.display(), "wrote default configuration");
            config
        };

        config
            .validate()
            .with_context(|| format!("invalid config in {}", path.display()))?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
        let serialized = serde_json::to_string_pretty(self)?;
        fs::write(path, serialized)
            .with_context(|| format!("failed to write config to {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        let charts = &self.charts;
        let sizes = [("chart_size", charts.chart_size), ("panel_size", charts.panel_size)];
        for (name, (width, height)) in sizes {
            ensure!(width > 0 && height > 0, "{name} must be non-zero, got {width}x{height}");
        }
        let (low, high) = charts.accuracy_range;
        ensure!(
            low.is_finite() && high.is_finite() && low < high,
            "accuracy_range must be an increasing finite range, got ({low}, {high})"
        );
        Ok(())
    }
}
