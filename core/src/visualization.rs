use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use base64::Engine;
use plotters::{
    coord::Shift,
    prelude::*,
    style::text_anchor::{HPos, Pos, VPos},
};

use crate::{
    charts::{Chart, ChartKind, ChartSink, Panel},
    config::ChartConfig,
};

type Area<'a> = DrawingArea<SVGBackend<'a>, Shift>;

const FONT: &str = "sans-serif";
const ORANGE: RGBColor = RGBColor(255, 165, 0);
const SERIES_COLORS: [RGBColor; 3] = [BLUE, GREEN, ORANGE];
const PANEL_COLUMNS: usize = 4;
const TITLE_HEIGHT: u32 = 40;

/// Encode an SVG document as a data URL for inline embedding.
pub fn encode_svg_data_url(svg: &str) -> String {
    let base64 = base64::engine::general_purpose::STANDARD.encode(svg.as_bytes());
    format!("data:image/svg+xml;base64,{base64}")
}

/// Renders charts as SVG files below an output directory.
#[derive(Clone, Debug)]
pub struct SvgRenderer {
    output_dir: PathBuf,
    config: ChartConfig,
}

impl SvgRenderer {
    pub fn new(output_dir: impl Into<PathBuf>, config: ChartConfig) -> Self {
        Self {
            output_dir: output_dir.into(),
            config,
        }
    }

    pub fn output_path(&self, chart: &Chart) -> PathBuf {
        self.output_dir.join(format!("{}.svg", chart.file_stem))
    }

    pub fn render_to_string(&self, chart: &Chart) -> Result<String> {
        let size = self.canvas_size(chart);
        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, size).into_drawing_area();
            root.fill(&WHITE)?;
            match &chart.kind {
                ChartKind::Pie { slices } => draw_pie(&root, &chart.title, slices)?,
                ChartKind::Bars {
                    x_desc,
                    bars,
                    annotate,
                } => draw_bars(&root, &chart.title, x_desc.as_deref(), bars, *annotate)?,
                ChartKind::Panels { x_desc, panels } => {
                    self.draw_panels(&root, &chart.title, x_desc, panels)?
                }
            }
            root.present()?;
        }
        Ok(svg)
    }

    fn canvas_size(&self, chart: &Chart) -> (u32, u32) {
        match &chart.kind {
            ChartKind::Panels { panels, .. } => {
                let (width, height) = self.config.panel_size;
                let rows = panels.len().div_ceil(PANEL_COLUMNS).max(1) as u32;
                (width * PANEL_COLUMNS as u32, height * rows + TITLE_HEIGHT)
            }
            _ => self.config.chart_size,
        }
    }

    fn draw_panels(&self, root: &Area, title: &str, x_desc: &str, panels: &[Panel]) -> Result<()> {
        let body = root.titled(title, (FONT, 28))?;
        let rows = panels.len().div_ceil(PANEL_COLUMNS).max(1);
        let areas = body.split_evenly((rows, PANEL_COLUMNS));
        let (y_min, y_max) = self.config.accuracy_range;

        for (panel, area) in panels.iter().zip(areas.iter()) {
            let (x_min, x_max) = padded_range(&panel.x);
            let mut chart = ChartBuilder::on(area)
                .caption(&panel.title, (FONT, 20))
                .margin(10)
                .x_label_area_size(40)
                .y_label_area_size(55)
                .build_cartesian_2d(x_min..x_max, y_min..y_max)?;

            chart
                .configure_mesh()
                .x_desc(x_desc)
                .y_desc("Accuracy")
                .y_labels(11)
                .y_label_formatter(&percent)
                .draw()?;

            for (series, color) in panel.series.iter().zip(SERIES_COLORS) {
                let points = panel.x.iter().copied().zip(series.values.iter().copied());
                chart
                    .draw_series(LineSeries::new(points, color.stroke_width(2)).point_size(4))?
                    .label(series.name.as_str())
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
            }

            chart
                .configure_series_labels()
                .position(SeriesLabelPosition::LowerRight)
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK)
                .draw()?;
        }

        Ok(())
    }
}

impl ChartSink for SvgRenderer {
    fn render(&mut self, chart: &Chart) -> Result<PathBuf> {
        let svg = self
            .render_to_string(chart)
            .with_context(|| format!("failed to render chart '{}'", chart.title))?;
        let path = self.output_path(chart);
        write_file(&path, &svg)?;
        Ok(path)
    }
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("failed to write chart to {}", path.display()))
}

fn percent(value: &f64) -> String {
    format!("{:.0}%", value * 100.0)
}

/// Axis range covering `values` with a quarter step of slack on each side.
fn padded_range(values: &[f64]) -> (f64, f64) {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !min.is_finite() || !max.is_finite() {
        return (0.0, 2.0);
    }
    (min - 0.25, max + 0.25)
}

fn draw_pie(root: &Area, title: &str, slices: &[(String, f64)]) -> Result<()> {
    let body = root.titled(title, (FONT, 24))?;
    let (width, height) = body.dim_in_pixel();
    let center = (width as i32 / 2, height as i32 / 2);

    let total: f64 = slices.iter().map(|(_, value)| value).sum();
    if total <= 0.0 {
        body.draw(&Text::new(
            "no recommendations",
            center,
            TextStyle::from((FONT, 18).into_font()).pos(Pos::new(HPos::Center, VPos::Center)),
        ))?;
        return Ok(());
    }

    let radius = f64::from(width.min(height)) * 0.35;
    let sizes: Vec<f64> = slices.iter().map(|(_, value)| *value).collect();
    let labels: Vec<&str> = slices.iter().map(|(label, _)| label.as_str()).collect();
    let colors: Vec<RGBColor> = (0..slices.len())
        .map(|index| SERIES_COLORS[index % SERIES_COLORS.len()])
        .collect();

    let mut pie = Pie::new(&center, &radius, &sizes, &colors, &labels);
    pie.start_angle(-90.0);
    pie.label_style((FONT, 18).into_font().color(&BLACK));
    pie.percentages((FONT, 16).into_font().color(&WHITE));
    body.draw(&pie)?;
    Ok(())
}

fn draw_bars(
    root: &Area,
    title: &str,
    x_desc: Option<&str>,
    bars: &[(String, f64)],
    annotate: bool,
) -> Result<()> {
    let count = bars.len() as u32;
    let mut chart = ChartBuilder::on(root)
        .caption(title, (FONT, 24))
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(60)
        .build_cartesian_2d((0u32..count).into_segmented(), 0.0f64..1.0f64)?;

    let label_of = |value: &SegmentValue<u32>| match value {
        SegmentValue::CenterOf(index) => bars
            .get(*index as usize)
            .map(|(label, _)| label.clone())
            .unwrap_or_default(),
        _ => String::new(),
    };

    let mut mesh = chart.configure_mesh();
    mesh.disable_x_mesh()
        .x_labels(bars.len() + 1)
        .x_label_formatter(&label_of)
        .y_desc("Accuracy")
        .y_labels(11)
        .y_label_formatter(&percent);
    if let Some(desc) = x_desc {
        mesh.x_desc(desc);
    }
    mesh.draw()?;

    chart.draw_series(bars.iter().enumerate().map(|(index, (_, value))| {
        let index = index as u32;
        let mut bar = Rectangle::new(
            [
                (SegmentValue::Exact(index), 0.0),
                (SegmentValue::Exact(index + 1), value.clamp(0.0, 1.0)),
            ],
            BLUE.mix(0.75).filled(),
        );
        bar.set_margin(0, 0, 12, 12);
        bar
    }))?;

    if annotate {
        let style = TextStyle::from((FONT, 16).into_font()).pos(Pos::new(HPos::Center, VPos::Bottom));
        chart.draw_series(bars.iter().enumerate().map(|(index, (_, value))| {
            Text::new(
                format!("{:.0}%", value * 100.0),
                (SegmentValue::CenterOf(index as u32), value.clamp(0.0, 1.0)),
                style.clone(),
            )
        }))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::Series;

    fn renderer() -> SvgRenderer {
        SvgRenderer::new("unused", ChartConfig::default())
    }

    #[test]
    fn data_url_has_svg_mime_type() {
        let url = encode_svg_data_url("<svg/>");
        assert_eq!(url, "data:image/svg+xml;base64,PHN2Zy8+");
    }

    #[test]
    fn bar_chart_renders_labels_and_values() {
        let chart = Chart {
            file_stem: "top5_plots/baseline".to_string(),
            title: "baseline".to_string(),
            kind: ChartKind::Bars {
                x_desc: None,
                bars: vec![
                    ("Top 1".to_string(), 0.5),
                    ("Top 3".to_string(), 0.75),
                    ("Top 5".to_string(), 1.0),
                ],
                annotate: true,
            },
        };
        let svg = renderer().render_to_string(&chart).unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("baseline"));
        assert!(svg.contains("Top 3"));
        assert!(svg.contains("75%"));
    }

    #[test]
    fn panel_chart_uses_a_wider_canvas() {
        let panel = Panel {
            title: "requiredType".to_string(),
            x: vec![0.0, 1.0],
            series: vec![Series::new("Top 1", vec![0.2, 0.4])],
        };
        let chart = Chart {
            file_stem: "weight_change".to_string(),
            title: "weights".to_string(),
            kind: ChartKind::Panels {
                x_desc: "Weight".to_string(),
                panels: vec![panel; 7],
            },
        };
        let config = ChartConfig::default();
        let (width, height) = renderer().canvas_size(&chart);
        assert_eq!(width, config.panel_size.0 * 4);
        assert_eq!(height, config.panel_size.1 * 2 + TITLE_HEIGHT);

        let svg = renderer().render_to_string(&chart).unwrap();
        assert!(svg.contains("requiredType"));
    }

    #[test]
    fn empty_pie_renders_a_placeholder() {
        let chart = Chart {
            file_stem: "evaluation_accuracy".to_string(),
            title: "Evaluation accuracy".to_string(),
            kind: ChartKind::Pie {
                slices: vec![("evaluated".to_string(), 0.0), ("not evaluated".to_string(), 0.0)],
            },
        };
        let svg = renderer().render_to_string(&chart).unwrap();
        assert!(svg.contains("no recommendations"));
    }

    #[test]
    fn padded_range_handles_single_and_empty_inputs() {
        assert_eq!(padded_range(&[1.0]), (0.75, 1.25));
        assert_eq!(padded_range(&[]), (0.0, 2.0));
        assert_eq!(padded_range(&[0.0, 2.0]), (-0.25, 2.25));
    }
}
