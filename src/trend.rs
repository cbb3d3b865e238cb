// src/trend.rs
//
// Log-linear trend fitting and extrapolation. Independent of the merge
// engine: it only consumes a date-indexed numeric series such as the one the
// engine produces.

use chrono::NaiveDate;
use tracing::debug;

/// A fitted log-linear trend: `value(i) = exp(intercept + slope * i)` where
/// `i` counts observations from the start of the calibration window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendModel {
    pub intercept: f64,
    pub slope: f64,
    /// Length of the calibration window the fit was made over.
    pub observations: usize,
}

impl TrendModel {
    /// Fitted or extrapolated value at observation index `index` (indices at
    /// or past `observations` are projections).
    pub fn predict(&self, index: usize) -> f64 {
        (self.intercept + self.slope * index as f64).exp()
    }

    /// Per-period growth rate implied by the trend, e.g. 0.02 for 2%.
    pub fn growth_rate(&self) -> f64 {
        self.slope.exp() - 1.0
    }

    /// Project `periods` values past the end of the calibration window.
    pub fn project(&self, periods: usize) -> Vec<f64> {
        (0..periods)
            .map(|i| self.predict(self.observations + i))
            .collect()
    }
}

/// Fit a log-linear trend over the trailing `window` dated observations by
/// ordinary least squares on `ln(value)`. Missing and non-positive values
/// are skipped (the logarithm is undefined for them). Returns `None` when
/// fewer than two usable observations remain or the window is degenerate.
pub fn fit_log_linear(
    series: &[(NaiveDate, Option<f64>)],
    window: usize,
) -> Option<TrendModel> {
    let start = series.len().saturating_sub(window);
    let points: Vec<(f64, f64)> = series[start..]
        .iter()
        .enumerate()
        .filter_map(|(i, (_, value))| match value {
            Some(v) if *v > 0.0 => Some((i as f64, v.ln())),
            _ => None,
        })
        .collect();
    if points.len() < 2 {
        debug!(usable = points.len(), "too few observations for a trend fit");
        return None;
    }

    let n = points.len() as f64;
    let sum_x: f64 = points.iter().map(|(x, _)| x).sum();
    let sum_y: f64 = points.iter().map(|(_, y)| y).sum();
    let mean_x = sum_x / n;
    let mean_y = sum_y / n;

    let sxx: f64 = points.iter().map(|(x, _)| (x - mean_x).powi(2)).sum();
    if sxx == 0.0 {
        return None;
    }
    let sxy: f64 = points
        .iter()
        .map(|(x, y)| (x - mean_x) * (y - mean_y))
        .sum();

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;
    Some(TrendModel {
        intercept,
        slope,
        observations: series.len() - start,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dated(values: &[Option<f64>]) -> Vec<(NaiveDate, Option<f64>)> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let date = NaiveDate::from_ymd_opt(2000, (i % 12 + 1) as u32, 1).unwrap();
                (date, *v)
            })
            .collect()
    }

    #[test]
    fn recovers_a_known_growth_rate() {
        let series = dated(
            &(0..10)
                .map(|i| Some((0.1 * i as f64).exp()))
                .collect::<Vec<_>>(),
        );
        let model = fit_log_linear(&series, 10).unwrap();
        assert!((model.slope - 0.1).abs() < 1e-9);
        assert!((model.growth_rate() - (0.1f64.exp() - 1.0)).abs() < 1e-9);
    }

    #[test]
    fn projection_extends_the_trend() {
        let series = dated(&(0..5).map(|i| Some((0.2 * i as f64).exp())).collect::<Vec<_>>());
        let model = fit_log_linear(&series, 5).unwrap();
        let projected = model.project(2);
        assert_eq!(projected.len(), 2);
        assert!((projected[0] - (0.2f64 * 5.0).exp()).abs() < 1e-6);
        assert!((projected[1] - (0.2f64 * 6.0).exp()).abs() < 1e-6);
    }

    #[test]
    fn skips_missing_and_non_positive_values() {
        let series = dated(&[Some(1.0), None, Some(-3.0), Some(0.0), Some(1.0)]);
        let model = fit_log_linear(&series, 5).unwrap();
        assert_eq!(model.observations, 5);
        // flat between the two usable points
        assert!(model.slope.abs() < 1e-9);
    }

    #[test]
    fn too_few_points_yields_none() {
        assert!(fit_log_linear(&dated(&[Some(1.0)]), 5).is_none());
        assert!(fit_log_linear(&dated(&[None, None]), 2).is_none());
    }

    #[test]
    fn window_limits_calibration_to_trailing_observations() {
        // old flat history followed by steady growth; a short window should
        // only see the growth
        let mut values: Vec<Option<f64>> = vec![Some(1.0); 10];
        values.extend((0..5).map(|i| Some((0.3 * i as f64).exp())));
        let model = fit_log_linear(&dated(&values), 5).unwrap();
        assert!((model.slope - 0.3).abs() < 1e-9);
    }
}
