//! Divergence and gap charts for a finished sweep.

use std::path::{Path, PathBuf};

use plotters::prelude::*;

use crate::config::Paths;
use crate::error::{MmdError, MmdResult};
use crate::games::GameKind;
use crate::record::{ExperimentRecord, SweepResults};

const DIVERGENCE_FLOOR: f64 = 1e-6;
const GAP_FLOOR: f64 = 1e-10;
const FIGURE_SIZE: (u32, u32) = (1024, 768);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Divergence,
    Gap,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Divergence => "divergence",
            Metric::Gap => "gap",
        }
    }

    fn title(&self) -> &'static str {
        match self {
            Metric::Divergence => "Divergence to NF QRE",
            Metric::Gap => "Saddle Point Gap",
        }
    }

    /// Lower bound of the log-scaled value axis.
    fn floor(&self) -> f64 {
        match self {
            Metric::Divergence => DIVERGENCE_FLOOR,
            Metric::Gap => GAP_FLOOR,
        }
    }

    fn series<'a>(&self, record: &'a ExperimentRecord) -> &'a [f64] {
        match self {
            Metric::Divergence => &record.divergences,
            Metric::Gap => &record.gap,
        }
    }
}

pub fn figure_path(paths: &Paths, game: GameKind, metric: Metric) -> PathBuf {
    paths
        .figure_dir()
        .join(format!("{}_{}.svg", game.file_name(), metric.as_str()))
}

pub fn series_label(alpha: f64) -> String {
    format!("α={:.2}", alpha)
}

/// `(label, values)` for every record whose series is non-empty.
pub fn chart_series<'a>(sweep: &'a SweepResults, metric: Metric) -> Vec<(String, &'a [f64])> {
    sweep
        .records
        .iter()
        .map(|record| (series_label(record.alpha), metric.series(record)))
        .filter(|(_, values)| !values.is_empty())
        .collect()
}

pub fn plot_divergence(sweep: &SweepResults, paths: &Paths) -> MmdResult<Option<PathBuf>> {
    plot_metric(sweep, paths, Metric::Divergence)
}

pub fn plot_gap(sweep: &SweepResults, paths: &Paths) -> MmdResult<Option<PathBuf>> {
    plot_metric(sweep, paths, Metric::Gap)
}

/// Render one chart; `None` when no record has data for `metric`.
pub fn plot_metric(
    sweep: &SweepResults,
    paths: &Paths,
    metric: Metric,
) -> MmdResult<Option<PathBuf>> {
    let series = chart_series(sweep, metric);
    if series.is_empty() {
        log::warn!("{}: no {} data to plot", sweep.game, metric.as_str());
        return Ok(None);
    }

    let path = figure_path(paths, sweep.game, metric);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let title = format!("{} | {}", sweep.game.display_name(), metric.title());
    draw_chart(&path, &title, metric.floor(), &series)?;
    Ok(Some(path))
}

fn plot_err<E: std::fmt::Display>(e: E) -> MmdError {
    MmdError::Plot(e.to_string())
}

fn draw_chart(path: &Path, title: &str, floor: f64, series: &[(String, &[f64])]) -> MmdResult<()> {
    let x_max = series.iter().map(|(_, v)| v.len()).max().unwrap_or(1).max(2) as f64;
    let y_max = series
        .iter()
        .flat_map(|(_, v)| v.iter().copied())
        .filter(|y| y.is_finite())
        .fold(floor * 10.0, f64::max);

    let root = SVGBackend::new(path, FIGURE_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 24))
        .margin(12)
        .x_label_area_size(42)
        .y_label_area_size(72)
        .build_cartesian_2d(0f64..x_max, (floor..y_max).log_scale())
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .x_desc("Iterations")
        .draw()
        .map_err(plot_err)?;

    for (i, (label, values)) in series.iter().enumerate() {
        let color = Palette99::pick(i).mix(0.9);
        // Non-positive or tiny values sit on the floor of the log axis.
        let points = values
            .iter()
            .enumerate()
            .map(move |(x, &y)| (x as f64, if y.is_finite() { y.max(floor) } else { floor }));
        chart
            .draw_series(LineSeries::new(points, color.stroke_width(2)))
            .map_err(plot_err)?
            .label(label.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 18, y)], color));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(plot_err)?;

    root.present().map_err(plot_err)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn record(inverse_alpha: u32, divergences: Vec<f64>, gap: Vec<f64>) -> ExperimentRecord {
        let mut r = ExperimentRecord::new(inverse_alpha);
        r.divergences = divergences;
        r.gap = gap;
        r
    }

    #[test]
    fn empty_series_skipped() {
        let sweep = SweepResults {
            game: GameKind::Leduc,
            records: vec![
                record(2, vec![], vec![0.1, 0.01]),
                record(5, vec![], vec![]),
                record(10, vec![], vec![0.2]),
            ],
        };
        let gap = chart_series(&sweep, Metric::Gap);
        assert_eq!(gap.len(), 2);
        assert_eq!(gap[0].0, "α=0.50");
        assert_eq!(gap[1].0, "α=0.10");
        assert!(chart_series(&sweep, Metric::Divergence).is_empty());
    }

    #[test]
    fn figure_paths_follow_game_file_name() {
        let paths = Paths::new("out");
        assert_eq!(
            figure_path(&paths, GameKind::Kuhn, Metric::Divergence),
            PathBuf::from("out/figures/kuhn_poker_divergence.svg")
        );
        assert_eq!(
            figure_path(&paths, GameKind::DarkHex, Metric::Gap),
            PathBuf::from("out/figures/dark_hex_gap.svg")
        );
    }

    #[test]
    fn nothing_rendered_without_data() {
        let sweep = SweepResults {
            game: GameKind::Leduc,
            records: vec![record(2, vec![], vec![])],
        };
        let paths = Paths::new(std::env::temp_dir().join("mmd_plot_nothing_rendered"));
        assert_eq!(plot_gap(&sweep, &paths).unwrap(), None);
        assert!(!figure_path(&paths, GameKind::Leduc, Metric::Gap).exists());
    }
}
