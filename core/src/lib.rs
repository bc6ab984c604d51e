pub mod charts;
pub mod comparison;
pub mod config;
pub mod dataset;
pub mod error;
pub mod report;
pub mod statistics;
pub mod visualization;
pub mod weights;

pub use charts::{Chart, ChartKind, ChartSink, Panel, RecordingSink, Series};
pub use comparison::{
    is_excluded, similarity_bin, ComparisonEngine, SensitivityGroup, SensitivityPoint,
    SimilarityCorrelation, SIMILARITY_BIN_LABELS,
};
pub use config::{ChartConfig, EvaluatorConfig, ReportConfig};
pub use dataset::{load_rows, read_rows, LoadedRows, ResultRow};
pub use error::EvaluationError;
pub use report::{
    comparison_sections, ensure_report_file, update_sections, RenderedChart, ReportSection,
    SectionId, DEFAULT_REPORT_TEMPLATE,
};
pub use statistics::{RunCounters, RunStatistics, RunSummary};
pub use visualization::{encode_svg_data_url, SvgRenderer};
pub use weights::{run_identifier, RunKind, WeightParameter, Weights};
