use serde::Serialize;

use crate::{
    dataset::ResultRow,
    error::Result,
    weights::{run_identifier, RunKind, Weights},
};

pub const TOP_K: usize = 5;

/// Accuracy counters of one run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct RunCounters {
    pub total_recommendations: usize,
    pub total_evaluated: usize,
    pub total_not_evaluated: usize,
    pub evaluated_ratio: f64,
    pub not_evaluated_ratio: f64,
    /// `correct_top[k - 1]`: evaluated rows whose selection is within the first `k` recommendations.
    pub correct_top: [usize; TOP_K],
    pub correct_top_ratio: [f64; TOP_K],
}

impl RunCounters {
    pub fn from_rows(rows: &[ResultRow]) -> Self {
        let total_recommendations = rows.len();
        let total_evaluated = rows.iter().filter(|row| row.evaluated).count();
        let total_not_evaluated = total_recommendations - total_evaluated;

        let mut correct_top = [0; TOP_K];
        for rank in rows.iter().filter(|row| row.evaluated).filter_map(ResultRow::hit_rank) {
            for count in &mut correct_top[rank - 1..] {
                *count += 1;
            }
        }

        Self {
            total_recommendations,
            total_evaluated,
            total_not_evaluated,
            evaluated_ratio: ratio(total_evaluated, total_recommendations),
            not_evaluated_ratio: ratio(total_not_evaluated, total_recommendations),
            correct_top,
            correct_top_ratio: correct_top.map(|count| ratio(count, total_evaluated)),
        }
    }

    pub fn top1_ratio(&self) -> f64 {
        self.correct_top_ratio[0]
    }

    pub fn top3_ratio(&self) -> f64 {
        self.correct_top_ratio[2]
    }

    pub fn top5_ratio(&self) -> f64 {
        self.correct_top_ratio[4]
    }
}

/// `count / total`, or zero for an empty denominator.
pub fn ratio(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}

/// One evaluation run: its weight configuration, raw rows and derived counters.
#[derive(Clone, Debug)]
pub struct RunStatistics {
    kind: RunKind,
    label: String,
    weights: Weights,
    rows: Vec<ResultRow>,
    counters: RunCounters,
}

impl RunStatistics {
    pub fn new(kind: RunKind, rows: Vec<ResultRow>) -> Self {
        Self::with_label(kind, kind.label(), rows)
    }

    /// A run titled `label` rather than the canonical label of `kind`.
    pub fn with_label(kind: RunKind, label: impl Into<String>, rows: Vec<ResultRow>) -> Self {
        let counters = RunCounters::from_rows(&rows);
        Self {
            kind,
            label: label.into(),
            weights: kind.weights(),
            rows,
            counters,
        }
    }

    /// Parse the run from its file name, keeping the weight exactly as written.
    pub fn from_file_name(file_name: &str, rows: Vec<ResultRow>) -> Result<Self> {
        let identifier = run_identifier(file_name);
        let kind = RunKind::from_identifier(identifier)?;
        Ok(Self::with_label(kind, identifier, rows))
    }

    /// Recompute the counters from the owned rows.
    pub fn compute_statistics(&mut self) {
        self.counters = RunCounters::from_rows(&self.rows);
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn kind(&self) -> RunKind {
        self.kind
    }

    pub fn is_baseline(&self) -> bool {
        self.kind.is_baseline()
    }

    pub fn weights(&self) -> &Weights {
        &self.weights
    }

    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }

    pub fn counters(&self) -> &RunCounters {
        &self.counters
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            name: self.name(),
            label: self.label.clone(),
            weights: self.weights,
            counters: self.counters,
        }
    }
}

/// Serialisable view of a run without its rows.
#[derive(Clone, Debug, Serialize)]
pub struct RunSummary {
    pub name: &'static str,
    pub label: String,
    pub weights: Weights,
    #[serde(flatten)]
    pub counters: RunCounters,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weights::WeightParameter;

    fn row(evaluated: bool, selected: &str, recommended: [&str; 5]) -> ResultRow {
        let text = |value: &str| (!value.is_empty()).then(|| value.to_string());
        ResultRow {
            evaluated,
            selected_method: text(selected),
            recommended: recommended.map(text),
            similarity: Some(0.5),
        }
    }

    /// 10 rows, 8 evaluated: 5 top-1 hits, 2 hits at rank 2..3, 1 hit at rank 4..5.
    fn scenario_rows() -> Vec<ResultRow> {
        let mut rows = Vec::new();
        for _ in 0..5 {
            rows.push(row(true, "m", ["m", "a", "b", "c", "d"]));
        }
        rows.push(row(true, "m", ["a", "m", "b", "c", "d"]));
        rows.push(row(true, "m", ["a", "b", "m", "c", "d"]));
        rows.push(row(true, "m", ["a", "b", "c", "d", "m"]));
        rows.push(row(false, "m", ["m", "a", "b", "c", "d"]));
        rows.push(row(false, "x", ["a", "b", "c", "d", "e"]));
        rows
    }

    #[test]
    fn scenario_counts() {
        let stats = RunStatistics::new(RunKind::Baseline, scenario_rows());
        let counters = stats.counters();

        assert_eq!(counters.total_recommendations, 10);
        assert_eq!(counters.total_evaluated, 8);
        assert_eq!(counters.total_not_evaluated, 2);
        assert_eq!(counters.correct_top, [5, 6, 7, 7, 8]);
        assert_eq!(counters.top5_ratio(), 1.0);
        assert_eq!(counters.top1_ratio(), 5.0 / 8.0);
        assert_eq!(counters.evaluated_ratio, 0.8);
        assert_eq!(counters.not_evaluated_ratio, 0.2);
    }

    #[test]
    fn counters_are_consistent_and_monotone() {
        let mut rows = scenario_rows();
        rows.push(row(true, "z", ["a", "b", "c", "d", "e"]));
        rows.push(row(true, "", ["", "", "", "", ""]));
        let counters = RunCounters::from_rows(&rows);

        assert_eq!(
            counters.total_evaluated + counters.total_not_evaluated,
            counters.total_recommendations
        );
        for pair in counters.correct_top.windows(2) {
            assert!(pair[0] <= pair[1]);
        }
        assert!(counters.correct_top[TOP_K - 1] <= counters.total_evaluated);
    }

    #[test]
    fn empty_evaluated_set_yields_zero_ratios() {
        let counters = RunCounters::from_rows(&[row(false, "m", ["m", "", "", "", ""])]);
        assert_eq!(counters.total_evaluated, 0);
        assert_eq!(counters.correct_top, [0; TOP_K]);
        assert!(counters.correct_top_ratio.iter().all(|ratio| *ratio == 0.0));

        let empty = RunCounters::from_rows(&[]);
        assert_eq!(empty.evaluated_ratio, 0.0);
        assert_eq!(empty.not_evaluated_ratio, 0.0);
    }

    #[test]
    fn recomputing_is_idempotent() {
        let mut stats = RunStatistics::new(RunKind::Baseline, scenario_rows());
        let before = *stats.counters();
        stats.compute_statistics();
        stats.compute_statistics();
        assert_eq!(*stats.counters(), before);
    }

    #[test]
    fn variant_weights_follow_the_file_name() {
        let stats =
            RunStatistics::from_file_name("ASE_Evaluation_objectOrigin_1.5.csv", Vec::new()).unwrap();
        assert_eq!(stats.name(), "objectOrigin");
        assert_eq!(stats.weights().get(WeightParameter::ObjectOrigin), 1.5);
        assert_eq!(stats.weights().get(WeightParameter::RequiredType), 1.0);
        assert!(!stats.is_baseline());
    }

    #[test]
    fn label_keeps_the_weight_as_written() {
        let stats =
            RunStatistics::from_file_name("ASE_Evaluation_requiredType_0.50.csv", Vec::new()).unwrap();
        assert_eq!(stats.label(), "requiredType_0.50");
        assert_eq!(stats.weights().get(WeightParameter::RequiredType), 0.5);

        let stats = RunStatistics::new(RunKind::from_identifier("objectOrigin_2").unwrap(), Vec::new());
        assert_eq!(stats.label(), "objectOrigin_2.0");
    }

    #[test]
    fn summary_serialises_weights_by_name() {
        let stats = RunStatistics::from_file_name("requiredType_0.5", scenario_rows()).unwrap();
        let value = serde_json::to_value(stats.summary()).unwrap();
        assert_eq!(value["name"], "requiredType");
        assert_eq!(value["label"], "requiredType_0.5");
        assert_eq!(value["weights"]["requiredType"], 0.5);
        assert_eq!(value["weights"]["enclosingMethodSuper"], 1.0);
        assert_eq!(value["total_evaluated"], 8);
        assert_eq!(value["correct_top"][4], 8);
    }
}
