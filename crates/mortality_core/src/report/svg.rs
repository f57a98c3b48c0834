//! SVG line-chart rendering with `plotters`.

use super::{Chart, Plotter};
use plotters::prelude::*;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::path::PathBuf;

const CHART_SIZE: (u32, u32) = (1024, 640);

#[derive(Debug)]
pub enum PlotError {
    Io { path: PathBuf, source: io::Error },
    Render(String),
}

impl Display for PlotError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to prepare `{}`: {source}", path.display())
            }
            Self::Render(message) => write!(f, "chart rendering failed: {message}"),
        }
    }
}

impl Error for PlotError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Render(_) => None,
        }
    }
}

/// Writes `res_<report>.svg` files into one output directory.
pub struct SvgPlotter {
    output_dir: PathBuf,
}

impl SvgPlotter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn path_for(&self, chart: &Chart) -> PathBuf {
        self.output_dir.join(format!("res_{}.svg", chart.kind.as_str()))
    }
}

impl Plotter for SvgPlotter {
    fn plot(&self, chart: &Chart) -> Result<PathBuf, PlotError> {
        std::fs::create_dir_all(&self.output_dir).map_err(|source| PlotError::Io {
            path: self.output_dir.clone(),
            source,
        })?;
        let path = self.path_for(chart);

        let x_min = chart.x.iter().copied().fold(f64::INFINITY, f64::min);
        let x_max = chart.x.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let (x_min, x_max) = if x_min.is_finite() && x_max > x_min {
            (x_min, x_max)
        } else {
            (0.0, 1.0)
        };
        let y_max = chart
            .series
            .iter()
            .flat_map(|series| series.values.iter().copied())
            .fold(0.0, f64::max);
        let y_max = if y_max > 0.0 { y_max * 1.05 } else { 1.0 };

        {
            let root = SVGBackend::new(&path, CHART_SIZE).into_drawing_area();
            root.fill(&WHITE).map_err(render_error)?;
            let mut ctx = ChartBuilder::on(&root)
                .caption(&chart.title, ("sans-serif", 24).into_font())
                .margin(20)
                .x_label_area_size(40)
                .y_label_area_size(70)
                .build_cartesian_2d(x_min..x_max, 0.0..y_max)
                .map_err(render_error)?;
            ctx.configure_mesh()
                .x_desc(chart.x_label.as_str())
                .y_desc(chart.y_label.as_str())
                .draw()
                .map_err(render_error)?;

            for (index, series) in chart.series.iter().enumerate() {
                let style = Palette99::pick(index).to_rgba().stroke_width(2);
                let points = chart
                    .x
                    .iter()
                    .copied()
                    .zip(series.values.iter().copied());
                ctx.draw_series(LineSeries::new(points, style))
                    .map_err(render_error)?
                    .label(series.label.as_str())
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], style));
            }

            ctx.configure_series_labels()
                .background_style(&WHITE.mix(0.8))
                .border_style(&BLACK)
                .draw()
                .map_err(render_error)?;
            root.present().map_err(render_error)?;
        }
        Ok(path)
    }
}

fn render_error<E: Display>(err: E) -> PlotError {
    PlotError::Render(err.to_string())
}
