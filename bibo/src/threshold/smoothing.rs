use nalgebra::{DMatrix, DVector, SVD};
use serde::{Deserialize, Serialize};

/// Optional smoothing of the threshold series.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum Smoothing {
    #[default]
    None,
    /// Backward recursion `out[i] = alpha * out[i + 1] + (1 - alpha) * data[i]`.
    Exponential { alpha: f64 },
    /// Local polynomial least squares over an odd `window`.
    SavitzkyGolay { window: usize, order: usize },
}

impl Smoothing {
    pub fn validate(&self) {
        match *self {
            Smoothing::None => {}
            Smoothing::Exponential { alpha } => {
                assert!((0.0..=1.0).contains(&alpha), "alpha must be in [0, 1], got {alpha}");
            }
            Smoothing::SavitzkyGolay { window, order } => {
                assert!(window % 2 == 1, "Savitzky-Golay window must be odd, got {window}");
                assert!(order < window, "Savitzky-Golay order must be < window");
            }
        }
    }

    pub fn apply(&self, data: &[f64]) -> Vec<f64> {
        match *self {
            Smoothing::None => data.to_vec(),
            Smoothing::Exponential { alpha } => exponential_backward(data, alpha),
            Smoothing::SavitzkyGolay { window, order } => savitzky_golay(data, window, order),
        }
    }
}

/// Exponential smoothing scanned from the last sample to the first.
pub fn exponential_backward(data: &[f64], alpha: f64) -> Vec<f64> {
    let mut out = data.to_vec();
    for i in (0..out.len().saturating_sub(1)).rev() {
        out[i] = alpha * out[i + 1] + (1.0 - alpha) * data[i];
    }
    out
}

/// Savitzky-Golay filter. The first and last `window / 2` samples evaluate the
/// polynomial fitted to the first and last full window. Data shorter than the
/// window is returned unchanged.
pub fn savitzky_golay(data: &[f64], window: usize, order: usize) -> Vec<f64> {
    let n = data.len();
    if window < 3 || n < window {
        return data.to_vec();
    }
    let Some(projection) = fit_projection(window, order) else {
        tracing::warn!(window, order, "Savitzky-Golay fit is singular, data left unsmoothed");
        return data.to_vec();
    };
    let half = window / 2;
    let fit = |start: usize| &projection * DVector::from_column_slice(&data[start..start + window]);
    let evaluate = |coefs: &DVector<f64>, z: f64| coefs.iter().rev().fold(0.0, |acc, &c| acc * z + c);

    let center = projection.row(0);
    let mut out = vec![0.0; n];
    for i in half..n - half {
        out[i] = center
            .iter()
            .zip(&data[i - half..=i + half])
            .map(|(c, v)| c * v)
            .sum();
    }

    let head = fit(0);
    for (i, value) in out.iter_mut().enumerate().take(half) {
        *value = evaluate(&head, i as f64 - half as f64);
    }
    let tail_start = n - window;
    let tail = fit(tail_start);
    for (i, value) in out.iter_mut().enumerate().skip(n - half) {
        *value = evaluate(&tail, (i - tail_start) as f64 - half as f64);
    }
    out
}

/// Pseudo-inverse of the Vandermonde matrix over offsets `-half..=half`.
/// Row `j` gives coefficient `j` of the fitted polynomial.
fn fit_projection(window: usize, order: usize) -> Option<DMatrix<f64>> {
    let half = (window / 2) as f64;
    let vandermonde = DMatrix::from_fn(window, order + 1, |r, c| (r as f64 - half).powi(c as i32));
    SVD::new(vandermonde, true, true).pseudo_inverse(1e-12).ok()
}
