//! Diagnostic artifacts rendered as standalone SVG files

mod svg;

use crate::error::Result;
use crate::training::ModelReport;
use chrono::Utc;
use ndarray::{Array1, Array2};
use std::fs;
use std::path::{Path, PathBuf};
use svg::SvgDocument;
use tracing::{info, warn};

const BAR_FILL: &str = "#4472c4";
const HIST_FILL: &str = "#70ad47";
const AXIS: &str = "#808080";

/// Renders run artifacts under `output_dir`. Filenames carry a timestamp so
/// repeated runs never overwrite each other.
pub struct Visualizer {
    output_dir: PathBuf,
}

impl Visualizer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Render every chart. Each chart failure is logged and skipped so one
    /// bad artifact never aborts a run; returns the paths that succeeded.
    pub fn render_all(
        &self,
        reports: &[ModelReport],
        importance: &[(String, f64)],
        predictions: &Array1<f64>,
        features: &Array2<f64>,
        feature_names: &[String],
    ) -> Vec<PathBuf> {
        let stamp = Utc::now().format("%Y%m%d_%H%M%S").to_string();
        let mut paths = Vec::new();

        let charts: Vec<(&str, Result<String>)> = vec![
            ("model_comparison", self.metric_comparison(reports)),
            ("feature_importance", self.importance_chart(importance)),
            ("prediction_histogram", self.prediction_histogram(predictions)),
            (
                "correlation_heatmap",
                self.correlation_heatmap(features, feature_names),
            ),
        ];

        for (name, rendered) in charts {
            match rendered {
                Ok(body) => {
                    let path = self.output_dir.join(format!("{name}_{stamp}.svg"));
                    match self.write_artifact(&path, &body) {
                        Ok(()) => {
                            info!(path = %path.display(), "Artifact written");
                            paths.push(path);
                        }
                        Err(e) => warn!(chart = name, error = %e, "Failed to write artifact"),
                    }
                }
                Err(e) => warn!(chart = name, error = %e, "Failed to render artifact"),
            }
        }

        paths
    }

    fn write_artifact(&self, path: &Path, body: &str) -> Result<()> {
        fs::create_dir_all(&self.output_dir)?;
        fs::write(path, body)?;
        Ok(())
    }

    /// Horizontal bars of R2 and CV R2 per model
    pub fn metric_comparison(&self, reports: &[ModelReport]) -> Result<String> {
        let width = 640u32;
        let row_height = 48.0;
        let height = 60 + (reports.len() as f64 * row_height) as u32;
        let mut doc = SvgDocument::new(width, height);

        doc.text(20.0, 30.0, 16, "Model comparison (held-out R2)");

        let label_x = 180.0;
        let bar_max = width as f64 - label_x - 80.0;

        for (i, report) in reports.iter().enumerate() {
            let y = 60.0 + i as f64 * row_height;
            let r2 = report.metrics.r2.clamp(0.0, 1.0);
            doc.text_anchored(label_x - 10.0, y + 16.0, 12, "end", &report.name);
            doc.rect(label_x, y, bar_max * r2, 20.0, BAR_FILL);
            doc.text(
                label_x + bar_max * r2 + 6.0,
                y + 16.0,
                11,
                &format!("r2={:.3} cv={:.3}", report.metrics.r2, report.cv_r2_mean),
            );
        }

        Ok(doc.render())
    }

    /// Descending importance bars
    pub fn importance_chart(&self, importance: &[(String, f64)]) -> Result<String> {
        let width = 640u32;
        let row_height = 28.0;
        let height = 60 + (importance.len() as f64 * row_height) as u32;
        let mut doc = SvgDocument::new(width, height);

        doc.text(20.0, 30.0, 16, "Feature importance");

        let max_value = importance
            .iter()
            .map(|(_, v)| *v)
            .fold(f64::MIN, f64::max)
            .max(1e-12);
        let label_x = 220.0;
        let bar_max = width as f64 - label_x - 70.0;

        for (i, (name, value)) in importance.iter().enumerate() {
            let y = 50.0 + i as f64 * row_height;
            doc.text_anchored(label_x - 10.0, y + 12.0, 11, "end", name);
            doc.rect(label_x, y, bar_max * (value / max_value), 16.0, BAR_FILL);
            doc.text(
                label_x + bar_max * (value / max_value) + 6.0,
                y + 12.0,
                10,
                &format!("{value:.4}"),
            );
        }

        Ok(doc.render())
    }

    /// 30-bin histogram of held-out predictions
    pub fn prediction_histogram(&self, predictions: &Array1<f64>) -> Result<String> {
        let width = 640u32;
        let height = 400u32;
        let mut doc = SvgDocument::new(width, height);

        doc.text(20.0, 30.0, 16, "Prediction distribution");

        let finite: Vec<f64> = predictions.iter().copied().filter(|v| v.is_finite()).collect();
        if finite.is_empty() {
            return Ok(doc.render());
        }

        let min = finite.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = finite.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let span = (max - min).max(1e-12);

        const BINS: usize = 30;
        let mut counts = [0usize; BINS];
        for &v in &finite {
            let bin = (((v - min) / span) * BINS as f64) as usize;
            counts[bin.min(BINS - 1)] += 1;
        }
        let peak = counts.iter().copied().max().unwrap_or(1).max(1) as f64;

        let plot_left = 50.0;
        let plot_bottom = height as f64 - 50.0;
        let plot_width = width as f64 - plot_left - 30.0;
        let plot_height = plot_bottom - 60.0;
        let bin_width = plot_width / BINS as f64;

        for (i, &count) in counts.iter().enumerate() {
            let bar_height = plot_height * count as f64 / peak;
            doc.rect(
                plot_left + i as f64 * bin_width,
                plot_bottom - bar_height,
                bin_width - 1.0,
                bar_height,
                HIST_FILL,
            );
        }

        doc.line(plot_left, plot_bottom, plot_left + plot_width, plot_bottom, AXIS);
        doc.text(plot_left, plot_bottom + 20.0, 10, &format!("{min:.3}"));
        doc.text_anchored(
            plot_left + plot_width,
            plot_bottom + 20.0,
            10,
            "end",
            &format!("{max:.3}"),
        );

        Ok(doc.render())
    }

    /// Pearson correlation heatmap over the engineered feature matrix
    pub fn correlation_heatmap(
        &self,
        features: &Array2<f64>,
        feature_names: &[String],
    ) -> Result<String> {
        let n = feature_names.len().min(features.ncols());
        let cell = 36.0;
        let origin = 140.0;
        let size = (origin + n as f64 * cell + 40.0) as u32;
        let mut doc = SvgDocument::new(size, size);

        doc.text(20.0, 30.0, 16, "Feature correlation");

        for i in 0..n {
            for j in 0..n {
                let r = pearson(&features.column(i).to_vec(), &features.column(j).to_vec());
                doc.rect(
                    origin + j as f64 * cell,
                    origin + i as f64 * cell,
                    cell - 1.0,
                    cell - 1.0,
                    &correlation_color(r),
                );
                doc.text_anchored(
                    origin + j as f64 * cell + cell / 2.0,
                    origin + i as f64 * cell + cell / 2.0 + 4.0,
                    9,
                    "middle",
                    &format!("{r:.2}"),
                );
            }
            doc.text_anchored(
                origin - 8.0,
                origin + i as f64 * cell + cell / 2.0 + 4.0,
                10,
                "end",
                &feature_names[i],
            );
        }

        Ok(doc.render())
    }
}

fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n == 0 {
        return 0.0;
    }
    let mean_a = a[..n].iter().sum::<f64>() / n as f64;
    let mean_b = b[..n].iter().sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for i in 0..n {
        let da = a[i] - mean_a;
        let db = b[i] - mean_b;
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }
    let denom = (var_a * var_b).sqrt();
    if denom < 1e-12 {
        0.0
    } else {
        cov / denom
    }
}

/// Blue for negative, white near zero, red for positive
fn correlation_color(r: f64) -> String {
    let r = r.clamp(-1.0, 1.0);
    if r >= 0.0 {
        let other = (255.0 * (1.0 - r)) as u8;
        format!("rgb(255,{other},{other})")
    } else {
        let other = (255.0 * (1.0 + r)) as u8;
        format!("rgb({other},{other},255)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_pearson_known_values() {
        assert!((pearson(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]) - 1.0).abs() < 1e-12);
        assert!((pearson(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]) + 1.0).abs() < 1e-12);
        assert_eq!(pearson(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]), 0.0);
    }

    #[test]
    fn test_histogram_renders_for_constant_predictions() {
        let viz = Visualizer::new("unused");
        let svg = viz
            .prediction_histogram(&Array1::from_elem(10, 0.5))
            .unwrap();
        assert!(svg.contains("Prediction distribution"));
    }

    #[test]
    fn test_heatmap_contains_feature_labels() {
        let viz = Visualizer::new("unused");
        let x = array![[1.0, 2.0], [2.0, 4.0], [3.0, 6.0]];
        let names = vec!["alpha".to_string(), "beta".to_string()];
        let svg = viz.correlation_heatmap(&x, &names).unwrap();
        assert!(svg.contains("alpha"));
        assert!(svg.contains("beta"));
        assert!(svg.contains("1.00"));
    }

    #[test]
    fn test_render_all_writes_files() {
        let dir = tempfile::tempdir().unwrap();
        let viz = Visualizer::new(dir.path());
        let preds = Array1::from_vec(vec![0.1, 0.2, 0.5, 0.4, 0.3]);
        let x = array![[1.0, 0.0], [2.0, 1.0], [3.0, 0.0], [4.0, 1.0], [5.0, 0.0]];
        let names = vec!["a".to_string(), "b".to_string()];
        let importance = vec![("a".to_string(), 0.7), ("b".to_string(), 0.3)];

        let paths = viz.render_all(&[], &importance, &preds, &x, &names);
        assert_eq!(paths.len(), 4);
        for path in &paths {
            assert!(path.exists());
        }
    }
}
