//! Chart rendering
//!
//! Line and scatter charts drawn with `plotters`. The backend follows the
//! file extension: `.svg` renders vector output, anything else a bitmap.

use std::fs;
use std::ops::Range;
use std::path::Path;

use plotters::coord::Shift;
use plotters::prelude::*;

const SIZE: (u32, u32) = (1024, 720);

const PALETTE: [RGBColor; 5] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesKind {
    /// Estimated curve, coloured from the palette
    Line,
    /// Closed-form overlay, drawn in black
    Reference,
    Scatter,
}

#[derive(Debug, Clone)]
pub struct Series {
    pub label: String,
    pub points: Vec<(f64, f64)>,
    pub kind: SeriesKind,
}

impl Series {
    pub fn line(label: impl Into<String>, points: Vec<(f64, f64)>) -> Self {
        Self {
            label: label.into(),
            points,
            kind: SeriesKind::Line,
        }
    }

    pub fn reference(label: impl Into<String>, points: Vec<(f64, f64)>) -> Self {
        Self {
            label: label.into(),
            points,
            kind: SeriesKind::Reference,
        }
    }

    pub fn scatter(label: impl Into<String>, points: Vec<(f64, f64)>) -> Self {
        Self {
            label: label.into(),
            points,
            kind: SeriesKind::Scatter,
        }
    }

    /// Points with `lo <= x <= hi` and, for log axes, `y > 0`.
    pub fn clipped(&self, x_range: &Range<f64>, log_y: bool) -> Vec<(f64, f64)> {
        self.points
            .iter()
            .copied()
            .filter(|&(x, y)| x >= x_range.start && x <= x_range.end && y.is_finite())
            .filter(|&(_, y)| !log_y || y > 0.0)
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct ChartSpec {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub x_range: Range<f64>,
    pub y_range: Range<f64>,
    pub log_y: bool,
}

impl ChartSpec {
    pub fn new(title: &str, x_label: &str, y_label: &str) -> Self {
        Self {
            title: title.to_string(),
            x_label: x_label.to_string(),
            y_label: y_label.to_string(),
            x_range: 0.0..1.0,
            y_range: 0.0..1.0,
            log_y: false,
        }
    }

    pub fn x_range(mut self, range: Range<f64>) -> Self {
        self.x_range = range;
        self
    }

    pub fn y_range(mut self, range: Range<f64>) -> Self {
        self.y_range = range;
        self
    }

    pub fn log_y(mut self, range: Range<f64>) -> Self {
        self.y_range = range;
        self.log_y = true;
        self
    }

    /// X range spanning every finite point, with a margin.
    pub fn fit_x(mut self, series: &[Series]) -> Self {
        let xs = series.iter().flat_map(|s| s.points.iter().map(|p| p.0));
        if let Some(range) = padded_range(xs) {
            self.x_range = range;
        }
        self
    }

    /// Y range spanning every series inside the x range, with a margin.
    pub fn fit_y(mut self, series: &[Series]) -> Self {
        let x_range = self.x_range.clone();
        if let Some(range) = padded_range(
            series
                .iter()
                .flat_map(|s| s.clipped(&x_range, false))
                .map(|(_, y)| y),
        ) {
            self.y_range = range;
        }
        self
    }
}

fn padded_range(values: impl Iterator<Item = f64>) -> Option<Range<f64>> {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if !(lo.is_finite() && hi.is_finite()) {
        return None;
    }
    let pad = 0.05 * (hi - lo).max(1e-12);
    Some((lo - pad)..(hi + pad))
}

/// One chart within a figure file
#[derive(Debug, Clone)]
pub struct Panel {
    pub spec: ChartSpec,
    pub series: Vec<Series>,
}

impl Panel {
    pub fn new(spec: ChartSpec, series: Vec<Series>) -> Self {
        Self { spec, series }
    }
}

/// Render panels side by side into `path`.
pub fn render_panels(path: &Path, panels: &[Panel]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    anyhow::ensure!(!panels.is_empty(), "no panels to render for {}", path.display());

    let size = (SIZE.0 * panels.len() as u32, SIZE.1);
    let is_svg = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("svg"))
        .unwrap_or(false);
    if is_svg {
        draw_panels(SVGBackend::new(path, size).into_drawing_area(), panels)
    } else {
        draw_panels(BitMapBackend::new(path, size).into_drawing_area(), panels)
    }
}

fn draw_panels<DB: DrawingBackend>(
    root: DrawingArea<DB, Shift>,
    panels: &[Panel],
) -> anyhow::Result<()>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;
    for (area, panel) in root.split_evenly((1, panels.len())).iter().zip(panels) {
        draw(area, &panel.spec, &panel.series)?;
    }
    root.present()?;
    Ok(())
}

// Shared between the linear and logarithmic coordinate systems.
macro_rules! draw_series {
    ($chart:ident, $spec:ident, $series:ident) => {
        let mut color_index = 0usize;
        for s in $series {
            let points = s.clipped(&$spec.x_range, $spec.log_y);
            let color = match s.kind {
                SeriesKind::Reference => BLACK,
                _ => {
                    let c = PALETTE[color_index % PALETTE.len()];
                    color_index += 1;
                    c
                }
            };
            match s.kind {
                SeriesKind::Scatter => {
                    $chart
                        .draw_series(
                            points
                                .iter()
                                .map(|&p| Circle::new(p, 3, color.mix(0.6).filled())),
                        )?
                        .label(s.label.as_str())
                        .legend(move |(x, y)| Circle::new((x + 10, y), 4, color.filled()));
                }
                SeriesKind::Line | SeriesKind::Reference => {
                    let width = if s.kind == SeriesKind::Reference { 2 } else { 1 };
                    $chart
                        .draw_series(LineSeries::new(points, color.stroke_width(width)))?
                        .label(s.label.as_str())
                        .legend(move |(x, y)| {
                            PathElement::new(vec![(x, y), (x + 25, y)], color.stroke_width(3))
                        });
                }
            }
        }
        $chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(WHITE.mix(0.85))
            .border_style(BLACK)
            .draw()?;
    };
}

fn draw<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    spec: &ChartSpec,
    series: &[Series],
) -> anyhow::Result<()>
where
    DB::ErrorType: 'static,
{
    let mut builder = ChartBuilder::on(area);
    builder
        .caption(&spec.title, ("sans-serif", 28).into_font())
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(80);

    if spec.log_y {
        let mut chart = builder
            .build_cartesian_2d(spec.x_range.clone(), spec.y_range.clone().log_scale())?;
        chart
            .configure_mesh()
            .x_desc(spec.x_label.as_str())
            .y_desc(spec.y_label.as_str())
            .draw()?;
        draw_series!(chart, spec, series);
    } else {
        let mut chart =
            builder.build_cartesian_2d(spec.x_range.clone(), spec.y_range.clone())?;
        chart
            .configure_mesh()
            .x_desc(spec.x_label.as_str())
            .y_desc(spec.y_label.as_str())
            .draw()?;
        draw_series!(chart, spec, series);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clipping_drops_nonpositive_on_log_axis() {
        let s = Series::line("a", vec![(0.0, 1.0), (0.5, 0.0), (2.0, 3.0), (0.7, f64::NAN)]);
        assert_eq!(s.clipped(&(0.0..1.0), true), vec![(0.0, 1.0)]);
        assert_eq!(s.clipped(&(0.0..1.0), false), vec![(0.0, 1.0), (0.5, 0.0)]);
    }

    #[test]
    fn test_fit_y_covers_series() {
        let series = [Series::line("a", vec![(0.0, -1.0), (1.0, 3.0), (5.0, 100.0)])];
        let spec = ChartSpec::new("t", "x", "y").x_range(0.0..2.0).fit_y(&series);
        assert!(spec.y_range.start < -1.0 && spec.y_range.end > 3.0);
        assert!(spec.y_range.end < 100.0);
    }

    #[test]
    fn test_fit_x_then_y_for_scatter() {
        let series = [Series::scatter("peaks", vec![(2.5, 3.0), (4.0, 2.6), (f64::NAN, 9.0)])];
        let spec = ChartSpec::new("t", "A_n", "A_n+1").fit_x(&series).fit_y(&series);
        assert!(spec.x_range.start < 2.5 && spec.x_range.end > 4.0);
        assert!(spec.y_range.start < 2.6 && spec.y_range.end > 3.0);
        assert!(spec.y_range.end < 9.0);
    }
}
