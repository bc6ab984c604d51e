use std::{
    fmt::Write as _,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};
use tracing::warn;

use crate::{
    comparison::{ComparisonEngine, SIMILARITY_BIN_LABELS},
    visualization::encode_svg_data_url,
};

pub const DEFAULT_REPORT_TEMPLATE: &str = r"# Weight Sweep Report

<!-- SECTION:overview start -->
<!-- Populated automatically with the runs found in the results directory. -->
<!-- SECTION:overview end -->

## Baseline

<!-- SECTION:baseline start -->
<!-- Populated automatically with the baseline accuracy. -->
<!-- SECTION:baseline end -->

## Runs

<!-- SECTION:runs start -->
<!-- Populated automatically with one row per run. -->
<!-- SECTION:runs end -->

## Weight Sensitivity

<!-- SECTION:weight-sensitivity start -->
<!-- Populated automatically with top-1/3/5 accuracy per weight. -->
<!-- SECTION:weight-sensitivity end -->

## Similarity Correlation

<!-- SECTION:similarity-correlation start -->
<!-- Populated automatically with top-1 accuracy per similarity bin. -->
<!-- SECTION:similarity-correlation end -->

## Charts

<!-- SECTION:charts start -->
<!-- Populated automatically with the rendered charts. -->
<!-- SECTION:charts end -->

## Notes

Free-form notes below the generated sections are kept between runs. Keep the
`<!-- SECTION:name start/end -->` markers around any region that should be
programmatically updated.
";

/// Generated regions of the report, in document order.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SectionId {
    Overview,
    Baseline,
    Runs,
    WeightSensitivity,
    SimilarityCorrelation,
    Charts,
}

impl SectionId {
    pub const ALL: [SectionId; 6] = [
        Self::Overview,
        Self::Baseline,
        Self::Runs,
        Self::WeightSensitivity,
        Self::SimilarityCorrelation,
        Self::Charts,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Overview => "overview",
            Self::Baseline => "baseline",
            Self::Runs => "runs",
            Self::WeightSensitivity => "weight-sensitivity",
            Self::SimilarityCorrelation => "similarity-correlation",
            Self::Charts => "charts",
        }
    }

    /// Heading written above the section when it has to be re-added.
    fn heading(&self) -> Option<&'static str> {
        match self {
            Self::Overview => None,
            Self::Baseline => Some("Baseline"),
            Self::Runs => Some("Runs"),
            Self::WeightSensitivity => Some("Weight Sensitivity"),
            Self::SimilarityCorrelation => Some("Similarity Correlation"),
            Self::Charts => Some("Charts"),
        }
    }

    fn start_marker(&self) -> String {
        format!("<!-- SECTION:{} start -->", self.as_str())
    }

    fn end_marker(&self) -> String {
        format!("<!-- SECTION:{} end -->", self.as_str())
    }
}

#[derive(Clone, Debug)]
pub struct ReportSection {
    pub id: SectionId,
    pub content: String,
}

impl ReportSection {
    pub fn new(id: SectionId, content: impl Into<String>) -> Self {
        Self {
            id,
            content: content.into(),
        }
    }

    fn body(&self) -> String {
        let trimmed = self.content.trim_matches('\n');
        if trimmed.is_empty() {
            "\n".to_string()
        } else {
            format!("\n{trimmed}\n")
        }
    }
}

/// A chart that has already been written to disk.
#[derive(Clone, Debug)]
pub struct RenderedChart {
    pub title: String,
    pub path: PathBuf,
}

/// Write [`DEFAULT_REPORT_TEMPLATE`] to `path` unless a report is already there.
pub fn ensure_report_file(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    fs::write(path, DEFAULT_REPORT_TEMPLATE)
        .with_context(|| format!("failed to write report template to {}", path.display()))
}

/// Rewrite the generated sections of the report at `path`. Text outside the
/// markers is kept; a section whose markers were removed is appended again.
pub fn update_sections(path: &Path, sections: &[ReportSection]) -> Result<()> {
    let mut content = fs::read_to_string(path)
        .with_context(|| format!("failed to read report at {}", path.display()))?;

    for section in sections {
        content = match replace_section(&content, section)? {
            Some(updated) => updated,
            None => {
                warn!(
                    report = %path.display(),
                    section = section.id.as_str(),
                    "report section missing; appending it"
                );
                append_section(content, section)
            }
        };
    }

    fs::write(path, content)
        .with_context(|| format!("failed to write updated report to {}", path.display()))
}

/// `None` when the section has no start marker; an unterminated section is an error.
fn replace_section(content: &str, section: &ReportSection) -> Result<Option<String>> {
    let start_marker = section.id.start_marker();
    let end_marker = section.id.end_marker();

    let Some(start_idx) = content.find(&start_marker) else {
        return Ok(None);
    };
    let after_start = start_idx + start_marker.len();
    let end_idx = content[after_start..]
        .find(&end_marker)
        .map(|relative| after_start + relative)
        .ok_or_else(|| anyhow!("report section '{}' has no end marker", section.id.as_str()))?;

    let mut updated = String::with_capacity(content.len() + section.content.len());
    updated.push_str(&content[..after_start]);
    updated.push_str(&section.body());
    updated.push_str(&content[end_idx..]);
    Ok(Some(updated))
}

fn append_section(mut content: String, section: &ReportSection) -> String {
    if !content.is_empty() && !content.ends_with('\n') {
        content.push('\n');
    }
    if let Some(heading) = section.id.heading() {
        let _ = write!(&mut content, "\n## {heading}\n");
    }
    let _ = writeln!(
        &mut content,
        "\n{}{}{}",
        section.id.start_marker(),
        section.body(),
        section.id.end_marker()
    );
    content
}

/// All generated sections of the report for a loaded comparison.
pub fn comparison_sections(
    engine: &ComparisonEngine,
    charts: &[RenderedChart],
    report_dir: &Path,
    embed_charts: bool,
) -> Result<Vec<ReportSection>> {
    Ok(vec![
        ReportSection::new(SectionId::Overview, render_overview(engine)),
        ReportSection::new(SectionId::Baseline, render_baseline(engine)),
        ReportSection::new(SectionId::Runs, render_runs(engine)),
        ReportSection::new(SectionId::WeightSensitivity, render_weight_sensitivity(engine)),
        ReportSection::new(SectionId::SimilarityCorrelation, render_similarity(engine)),
        ReportSection::new(
            SectionId::Charts,
            render_charts(charts, report_dir, embed_charts)?,
        ),
    ])
}

fn render_overview(engine: &ComparisonEngine) -> String {
    let baseline = if engine.baseline().is_some() {
        "present"
    } else {
        "missing"
    };
    format!(
        "- Variant runs: {}\n- Baseline: {}\n",
        engine.runs().len(),
        baseline
    )
}

fn render_baseline(engine: &ComparisonEngine) -> String {
    match engine.general_statistics() {
        Some(text) => format!("```text\n{}```\n", text),
        None => "No baseline run was loaded.".to_string(),
    }
}

fn render_runs(engine: &ComparisonEngine) -> String {
    let mut output = String::new();
    let _ = writeln!(
        &mut output,
        "| Run | Evaluated | Not evaluated | Top 1 | Top 2 | Top 3 | Top 4 | Top 5 |"
    );
    let _ = writeln!(&mut output, "| --- | --- | --- | --- | --- | --- | --- | --- |");

    for run in engine.all_runs() {
        let counters = run.counters();
        let _ = write!(
            &mut output,
            "| {} | {} ({:.2}%) | {} ({:.2}%) |",
            run.label(),
            counters.total_evaluated,
            counters.evaluated_ratio * 100.0,
            counters.total_not_evaluated,
            counters.not_evaluated_ratio * 100.0
        );
        for ratio in counters.correct_top_ratio {
            let _ = write!(&mut output, " {:.2}% |", ratio * 100.0);
        }
        output.push('\n');
    }

    output
}

fn render_weight_sensitivity(engine: &ComparisonEngine) -> String {
    let mut output = String::new();

    for group in engine.weight_sensitivity() {
        let _ = writeln!(&mut output, "### {}\n", group.parameter);
        let _ = writeln!(&mut output, "| Weight | Top 1 | Top 3 | Top 5 |");
        let _ = writeln!(&mut output, "| --- | --- | --- | --- |");
        for point in &group.points {
            let marker = if point.is_baseline { " (baseline)" } else { "" };
            let _ = writeln!(
                &mut output,
                "| {:?}{} | {:.2}% | {:.2}% | {:.2}% |",
                point.weight,
                marker,
                point.top1_ratio * 100.0,
                point.top3_ratio * 100.0,
                point.top5_ratio * 100.0
            );
        }
        output.push('\n');
    }

    output
}

fn render_similarity(engine: &ComparisonEngine) -> String {
    let Some(correlation) = engine.similarity_correlation() else {
        return "No baseline run was loaded.".to_string();
    };

    let mut output = String::new();
    let _ = writeln!(&mut output, "| Similarity | Correct | Incorrect | Top 1 accuracy |");
    let _ = writeln!(&mut output, "| --- | --- | --- | --- |");
    for (bin, ratio) in correlation.ratios().iter().enumerate() {
        let _ = writeln!(
            &mut output,
            "| {} | {} | {} | {:.2}% |",
            SIMILARITY_BIN_LABELS[bin],
            correlation.correct[bin],
            correlation.incorrect[bin],
            ratio * 100.0
        );
    }

    output
}

fn render_charts(charts: &[RenderedChart], report_dir: &Path, embed: bool) -> Result<String> {
    if charts.is_empty() {
        return Ok("No charts were rendered.".to_string());
    }

    let mut output = String::new();
    for chart in charts {
        let target = if embed {
            let svg = fs::read_to_string(&chart.path)
                .with_context(|| format!("failed to read chart {}", chart.path.display()))?;
            encode_svg_data_url(&svg)
        } else {
            let relative = chart.path.strip_prefix(report_dir).unwrap_or(&chart.path);
            relative.display().to_string().replace('\\', "/")
        };
        let _ = writeln!(&mut output, "#### {}\n\n![{}]({})\n", chart.title, chart.title, target);
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sections_are_replaced_and_notes_survive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.md");
        ensure_report_file(&path).unwrap();

        let mut content = fs::read_to_string(&path).unwrap();
        content.push_str("\nmy own note\n");
        fs::write(&path, content).unwrap();

        update_sections(&path, &[ReportSection::new(SectionId::Overview, "- Variant runs: 3\n")]).unwrap();
        update_sections(&path, &[ReportSection::new(SectionId::Overview, "- Variant runs: 4\n")]).unwrap();

        let updated = fs::read_to_string(&path).unwrap();
        assert!(updated.contains(
            "<!-- SECTION:overview start -->\n- Variant runs: 4\n<!-- SECTION:overview end -->"
        ));
        assert!(!updated.contains("Variant runs: 3"));
        assert!(updated.contains("my own note"));
    }

    #[test]
    fn existing_report_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.md");
        fs::write(&path, "custom").unwrap();
        ensure_report_file(&path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "custom");
    }

    #[test]
    fn removed_sections_are_appended_again() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.md");
        fs::write(&path, "# Notes only").unwrap();

        update_sections(
            &path,
            &[
                ReportSection::new(SectionId::Overview, "- Variant runs: 2"),
                ReportSection::new(SectionId::Runs, "| run |"),
            ],
        )
        .unwrap();
        update_sections(&path, &[ReportSection::new(SectionId::Runs, "| other |")]).unwrap();

        let updated = fs::read_to_string(&path).unwrap();
        assert!(updated.starts_with("# Notes only\n"));
        assert!(updated.contains(
            "<!-- SECTION:overview start -->\n- Variant runs: 2\n<!-- SECTION:overview end -->"
        ));
        assert!(updated.contains(
            "## Runs\n\n<!-- SECTION:runs start -->\n| other |\n<!-- SECTION:runs end -->"
        ));
        assert_eq!(updated.matches("SECTION:runs start").count(), 1);
    }

    #[test]
    fn unterminated_section_is_an_error() {
        let content = "<!-- SECTION:runs start -->\nstale";
        let err = replace_section(content, &ReportSection::new(SectionId::Runs, "x")).unwrap_err();
        assert!(err.to_string().contains("'runs' has no end marker"));
        assert!(replace_section("", &ReportSection::new(SectionId::Runs, "x"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn template_carries_every_section() {
        for id in SectionId::ALL {
            let section = ReportSection::new(id, "x");
            assert!(
                replace_section(DEFAULT_REPORT_TEMPLATE, &section).unwrap().is_some(),
                "{} missing from the template",
                id.as_str()
            );
        }
    }

    #[test]
    fn empty_engine_still_produces_every_section() {
        let engine = ComparisonEngine::new();
        let sections = comparison_sections(&engine, &[], Path::new("."), false).unwrap();
        let ids: Vec<SectionId> = sections.iter().map(|section| section.id).collect();
        assert_eq!(ids, SectionId::ALL);
        assert!(sections[1].content.contains("No baseline"));
    }

    #[test]
    fn chart_links_are_relative_to_the_report() {
        let charts = [RenderedChart {
            title: "baseline".to_string(),
            path: PathBuf::from("plots/top5_plots/baseline.svg"),
        }];
        let output = render_charts(&charts, Path::new("plots"), false).unwrap();
        assert!(output.contains("![baseline](top5_plots/baseline.svg)"));
    }

    #[test]
    fn embedded_charts_use_data_urls() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chart.svg");
        fs::write(&path, "<svg/>").unwrap();
        let charts = [RenderedChart {
            title: "chart".to_string(),
            path,
        }];
        let output = render_charts(&charts, dir.path(), true).unwrap();
        assert!(output.contains("(data:image/svg+xml;base64,PHN2Zy8+)"));
    }
}
