//! Renderer-agnostic chart descriptions.
//!
//! The comparison engine only produces these values; a [`ChartSink`] decides
//! how they end up on disk.

use std::path::PathBuf;

use anyhow::Result;

#[derive(Clone, Debug, PartialEq)]
pub struct Chart {
    /// File name without extension, relative to the sink's output directory.
    pub file_stem: String,
    pub title: String,
    pub kind: ChartKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ChartKind {
    Pie {
        slices: Vec<(String, f64)>,
    },
    Bars {
        x_desc: Option<String>,
        bars: Vec<(String, f64)>,
        /// Print each bar's value above it.
        annotate: bool,
    },
    Panels {
        x_desc: String,
        panels: Vec<Panel>,
    },
}

/// One line-chart panel sharing the x values across its series.
#[derive(Clone, Debug, PartialEq)]
pub struct Panel {
    pub title: String,
    pub x: Vec<f64>,
    pub series: Vec<Series>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Series {
    pub name: String,
    pub values: Vec<f64>,
}

impl Series {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// Destination for rendered charts.
pub trait ChartSink {
    /// Render the chart and return where it was written.
    fn render(&mut self, chart: &Chart) -> Result<PathBuf>;
}

/// Sink that keeps the charts in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub charts: Vec<Chart>,
}

impl ChartSink for RecordingSink {
    fn render(&mut self, chart: &Chart) -> Result<PathBuf> {
        self.charts.push(chart.clone());
        Ok(PathBuf::from(&chart.file_stem))
    }
}
