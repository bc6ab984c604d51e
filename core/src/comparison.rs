//! Loading a directory of runs and comparing them against the baseline.

use std::{
    fmt::Write,
    fs,
    path::{Path, PathBuf},
};

use tracing::{debug, info, warn};

use crate::{
    charts::{Chart, ChartKind, ChartSink, Panel, Series},
    dataset::load_rows,
    error::{EvaluationError, Result},
    statistics::{ratio, RunStatistics, RunSummary},
    weights::{run_identifier, RunKind, WeightParameter},
};

/// File name fragments of result sets that are incompatible with the others.
pub const EXCLUDED_PATTERNS: [&str; 2] = ["receiverType", "baseline_new"];

pub const SIMILARITY_BINS: usize = 10;
pub const SIMILARITY_BIN_LABELS: [&str; SIMILARITY_BINS] = [
    "0-0.1", "0.1-0.2", "0.2-0.3", "0.3-0.4", "0.4-0.5", "0.5-0.6", "0.6-0.7", "0.7-0.8",
    "0.8-0.9", "0.9-1",
];
const SIMILARITY_BIN_EDGES: [f64; SIMILARITY_BINS - 1] =
    [0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9];

const SEPARATOR: &str = "----------------------------------------";

pub fn is_excluded(file_name: &str) -> bool {
    EXCLUDED_PATTERNS
        .iter()
        .any(|pattern| file_name.contains(pattern))
}

/// Bin index of a similarity score; bins are half-open except the last one,
/// and out-of-range scores land in the outermost bins.
pub fn similarity_bin(similarity: f64) -> usize {
    SIMILARITY_BIN_EDGES
        .iter()
        .take_while(|edge| **edge <= similarity)
        .count()
}

/// Accuracy of one run at its position in a weight sweep.
#[derive(Clone, Debug, PartialEq)]
pub struct SensitivityPoint {
    pub weight: f64,
    pub is_baseline: bool,
    pub top1_ratio: f64,
    pub top3_ratio: f64,
    pub top5_ratio: f64,
}

/// All runs varying one parameter plus the baseline, ordered by weight.
#[derive(Clone, Debug, PartialEq)]
pub struct SensitivityGroup {
    pub parameter: WeightParameter,
    pub points: Vec<SensitivityPoint>,
}

impl SensitivityGroup {
    pub fn weights(&self) -> Vec<f64> {
        self.points.iter().map(|point| point.weight).collect()
    }

    fn panel(&self) -> Panel {
        let top1 = self.points.iter().map(|point| point.top1_ratio).collect();
        let top3 = self.points.iter().map(|point| point.top3_ratio).collect();
        let top5 = self.points.iter().map(|point| point.top5_ratio).collect();
        Panel {
            title: self.parameter.to_string(),
            x: self.weights(),
            series: vec![
                Series::new("Top 1", top1),
                Series::new("Top 3", top3),
                Series::new("Top 5", top5),
            ],
        }
    }
}

/// Top-1 correctness of the baseline bucketed by the first recommendation's similarity.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SimilarityCorrelation {
    pub correct: [usize; SIMILARITY_BINS],
    pub incorrect: [usize; SIMILARITY_BINS],
}

impl SimilarityCorrelation {
    pub fn record(&mut self, similarity: f64, correct: bool) {
        let bin = similarity_bin(similarity);
        if correct {
            self.correct[bin] += 1;
        } else {
            self.incorrect[bin] += 1;
        }
    }

    pub fn ratios(&self) -> [f64; SIMILARITY_BINS] {
        std::array::from_fn(|bin| ratio(self.correct[bin], self.correct[bin] + self.incorrect[bin]))
    }
}

#[derive(Debug, Default)]
pub struct ComparisonEngine {
    runs: Vec<RunStatistics>,
    baseline: Option<RunStatistics>,
    baseline_source: Option<PathBuf>,
}

impl ComparisonEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every run in `dir`; a missing path is the only fatal input error.
    pub fn load(dir: Option<&Path>) -> Result<Self> {
        let dir = dir.ok_or(EvaluationError::MissingInputPath)?;
        Self::load_dir(dir)
    }

    pub fn load_dir(dir: &Path) -> Result<Self> {
        let mut entries = fs::read_dir(dir)?
            .map(|entry| entry.map(|entry| entry.path()))
            .collect::<std::io::Result<Vec<_>>>()?;
        entries.retain(|path| path.is_file());
        entries.sort();

        let mut engine = Self::new();
        for path in entries {
            match Self::load_run(&path) {
                Ok(Some(run)) => engine.insert(run, &path),
                Ok(None) => debug!(file = %path.display(), "skipping excluded result file"),
                Err(err) => warn!("skipping {}: {err}", path.display()),
            }
        }

        if engine.runs.is_empty() {
            warn!(dir = %dir.display(), "no variant runs found; only baseline outputs will be produced");
        }
        if engine.baseline.is_none() {
            warn!(dir = %dir.display(), "no baseline run found");
        }
        info!(
            variants = engine.runs.len(),
            baseline = engine.baseline.is_some(),
            "loaded evaluation runs"
        );

        Ok(engine)
    }

    fn load_run(path: &Path) -> Result<Option<RunStatistics>> {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| EvaluationError::unreadable(path, "file name is not valid UTF-8"))?;
        if is_excluded(file_name) {
            return Ok(None);
        }

        let identifier = run_identifier(file_name);
        let kind = RunKind::from_identifier(identifier)?;
        let loaded = load_rows(path)?;
        debug!(
            file = %path.display(),
            rows = loaded.rows.len(),
            dropped = loaded.dropped,
            "loaded result file"
        );
        Ok(Some(RunStatistics::with_label(kind, identifier, loaded.rows)))
    }

    /// Route a run to the baseline slot or the variant list.
    pub fn insert(&mut self, run: RunStatistics, source: &Path) {
        if !run.is_baseline() {
            self.runs.push(run);
            return;
        }

        if let Some(previous) = &self.baseline_source {
            warn!(
                previous = %previous.display(),
                replacement = %source.display(),
                "multiple baseline files; keeping the last one"
            );
        }
        self.baseline = Some(run);
        self.baseline_source = Some(source.to_path_buf());
    }

    pub fn baseline(&self) -> Option<&RunStatistics> {
        self.baseline.as_ref()
    }

    pub fn runs(&self) -> &[RunStatistics] {
        &self.runs
    }

    /// Baseline first, then the variants in load order.
    pub fn all_runs(&self) -> impl Iterator<Item = &RunStatistics> {
        self.baseline.iter().chain(self.runs.iter())
    }

    pub fn summaries(&self) -> Vec<RunSummary> {
        self.all_runs().map(RunStatistics::summary).collect()
    }

    /// Human-readable statistics of the baseline run.
    pub fn general_statistics(&self) -> Option<String> {
        let run = self.baseline.as_ref()?;
        let counters = run.counters();
        let mut output = String::new();

        let _ = write!(&mut output, "{} (", run.name());
        for (parameter, weight) in run.weights().iter() {
            let _ = write!(&mut output, "{parameter}: {weight:?}, ");
        }
        let _ = writeln!(&mut output, ")\n");

        let _ = writeln!(
            &mut output,
            "{}/{} recommendations evaluated ({:?})",
            counters.total_evaluated, counters.total_recommendations, counters.evaluated_ratio
        );
        let _ = writeln!(
            &mut output,
            "{}/{} recommendations not evaluated ({:?})\n",
            counters.total_not_evaluated,
            counters.total_recommendations,
            counters.not_evaluated_ratio
        );
        for (k, (count, ratio)) in counters
            .correct_top
            .iter()
            .zip(counters.correct_top_ratio.iter())
            .enumerate()
        {
            let _ = writeln!(&mut output, "Top{}: {} ({:?})", k + 1, count, ratio);
        }
        let _ = writeln!(&mut output, "{SEPARATOR}");

        Some(output)
    }

    /// One group per parameter, each sorted by that parameter's weight with
    /// the baseline placed at its own weight.
    pub fn weight_sensitivity(&self) -> Vec<SensitivityGroup> {
        WeightParameter::ALL
            .into_iter()
            .map(|parameter| {
                let mut members: Vec<&RunStatistics> = self
                    .runs
                    .iter()
                    .filter(|run| {
                        matches!(run.kind(), RunKind::Variant { parameter: varied, .. } if varied == parameter)
                    })
                    .chain(self.baseline.iter())
                    .collect();
                members.sort_by(|a, b| {
                    a.weights()
                        .get(parameter)
                        .total_cmp(&b.weights().get(parameter))
                });

                let points = members
                    .into_iter()
                    .map(|run| {
                        let counters = run.counters();
                        SensitivityPoint {
                            weight: run.weights().get(parameter),
                            is_baseline: run.is_baseline(),
                            top1_ratio: counters.top1_ratio(),
                            top3_ratio: counters.top3_ratio(),
                            top5_ratio: counters.top5_ratio(),
                        }
                    })
                    .collect();

                SensitivityGroup { parameter, points }
            })
            .collect()
    }

    pub fn similarity_correlation(&self) -> Option<SimilarityCorrelation> {
        let baseline = self.baseline.as_ref()?;
        let mut correlation = SimilarityCorrelation::default();

        for row in baseline.rows().iter().filter(|row| row.evaluated) {
            match row.similarity {
                Some(similarity) => correlation.record(similarity, row.is_top1_hit()),
                None => debug!("evaluated row without similarity left out of the correlation"),
            }
        }

        Some(correlation)
    }

    /// Every chart of the comparison, in rendering order.
    pub fn charts(&self) -> Vec<Chart> {
        let mut charts = Vec::new();

        if let Some(baseline) = &self.baseline {
            if !self.runs.is_empty() {
                charts.push(accuracy_chart(baseline));
            }
        }

        charts.extend(self.all_runs().map(top5_chart));

        if self.baseline.is_some() || !self.runs.is_empty() {
            charts.push(Chart {
                file_stem: "weight_change".to_string(),
                title: "Recommendation quality change for different weights".to_string(),
                kind: ChartKind::Panels {
                    x_desc: "Weight".to_string(),
                    panels: self
                        .weight_sensitivity()
                        .iter()
                        .map(SensitivityGroup::panel)
                        .collect(),
                },
            });
        }

        if let Some(correlation) = self.similarity_correlation() {
            charts.push(Chart {
                file_stem: "similarity_correlation".to_string(),
                title: "Top 1 accuracy by similarity".to_string(),
                kind: ChartKind::Bars {
                    x_desc: Some("Similarity".to_string()),
                    bars: SIMILARITY_BIN_LABELS
                        .iter()
                        .map(|label| label.to_string())
                        .zip(correlation.ratios())
                        .collect(),
                    annotate: false,
                },
            });
        }

        charts
    }

    pub fn render_charts(&self, sink: &mut dyn ChartSink) -> anyhow::Result<Vec<PathBuf>> {
        self.charts()
            .iter()
            .map(|chart| sink.render(chart))
            .collect()
    }
}

fn accuracy_chart(run: &RunStatistics) -> Chart {
    let counters = run.counters();
    Chart {
        file_stem: "evaluation_accuracy".to_string(),
        title: "Evaluation accuracy".to_string(),
        kind: ChartKind::Pie {
            slices: vec![
                ("evaluated".to_string(), counters.total_evaluated as f64),
                ("not evaluated".to_string(), counters.total_not_evaluated as f64),
            ],
        },
    }
}

fn top5_chart(run: &RunStatistics) -> Chart {
    let counters = run.counters();
    let label = run.label().to_string();
    Chart {
        file_stem: format!("top5_plots/{label}"),
        title: label,
        kind: ChartKind::Bars {
            x_desc: None,
            bars: vec![
                ("Top 1".to_string(), counters.top1_ratio()),
                ("Top 3".to_string(), counters.top3_ratio()),
                ("Top 5".to_string(), counters.top5_ratio()),
            ],
            annotate: true,
        },
    }
}
