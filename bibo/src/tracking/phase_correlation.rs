//! FFT phase correlation between two equally sized crops.
//!
//! Both crops are zero-padded to power-of-two sizes (per axis), optionally
//! Hann-windowed, transformed, and their normalized cross-power spectrum is
//! transformed back. The peak of that surface is the offset that maps the
//! target crop back onto the reference crop.

use std::sync::Arc;

use common::Buffer2;
use glam::DVec2;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseCorrelationConfig {
    /// Apply a Hann window to reduce edge effects.
    pub use_windowing: bool,
    pub subpixel: SubpixelMethod,
    /// Correlation peaks below this are rejected.
    pub min_peak_value: f32,
}

impl Default for PhaseCorrelationConfig {
    fn default() -> Self {
        Self {
            use_windowing: true,
            subpixel: SubpixelMethod::Parabolic,
            min_peak_value: 0.05,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SubpixelMethod {
    None,
    /// Parabola through the peak and its two neighbors, per axis.
    #[default]
    Parabolic,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Correlation {
    /// Offset from target to reference content, pixels.
    pub offset: DVec2,
    pub peak_value: f64,
}

pub struct PhaseCorrelator {
    config: PhaseCorrelationConfig,
    size_x: usize,
    size_y: usize,
    forward_x: Arc<dyn Fft<f32>>,
    forward_y: Arc<dyn Fft<f32>>,
    inverse_x: Arc<dyn Fft<f32>>,
    inverse_y: Arc<dyn Fft<f32>>,
    window_x: Vec<f32>,
    window_y: Vec<f32>,
}

impl PhaseCorrelator {
    pub fn new(width: usize, height: usize, config: PhaseCorrelationConfig) -> Self {
        let size_x = width.max(1).next_power_of_two();
        let size_y = height.max(1).next_power_of_two();

        let mut planner = FftPlanner::new();
        let window = |n: usize| {
            if config.use_windowing {
                hann_window(n)
            } else {
                vec![1.0; n]
            }
        };

        Self {
            config,
            size_x,
            size_y,
            forward_x: planner.plan_fft_forward(size_x),
            forward_y: planner.plan_fft_forward(size_y),
            inverse_x: planner.plan_fft_inverse(size_x),
            inverse_y: planner.plan_fft_inverse(size_y),
            window_x: window(size_x),
            window_y: window(size_y),
        }
    }

    /// Offset mapping `target` onto `reference`, or `None` when the crops differ in
    /// size or the correlation peak is too weak.
    pub fn correlate(&self, reference: &Buffer2<f32>, target: &Buffer2<f32>) -> Option<Correlation> {
        let (width, height) = (reference.width(), reference.height());
        if (target.width(), target.height()) != (width, height)
            || width > self.size_x
            || height > self.size_y
            || reference.is_empty()
        {
            return None;
        }

        let ref_fft = self.fft_2d(self.prepare(reference), false);
        let tar_fft = self.fft_2d(self.prepare(target), false);
        let cross_power = cross_power_spectrum(&ref_fft, &tar_fft);
        let surface = self.fft_2d(cross_power, true);

        let norm = 1.0 / (self.size_x * self.size_y) as f32;
        let correlation: Vec<f32> = surface.iter().map(|c| c.re * norm).collect();

        let (peak_x, peak_y, peak) = self.find_peak(&correlation);
        if peak.is_nan() || peak < self.config.min_peak_value {
            return None;
        }

        let wrap = |p: usize, n: usize| {
            if p > n / 2 {
                p as f64 - n as f64
            } else {
                p as f64
            }
        };
        let mut offset = DVec2::new(wrap(peak_x, self.size_x), wrap(peak_y, self.size_y));
        if self.config.subpixel == SubpixelMethod::Parabolic {
            offset += self.parabolic_refinement(&correlation, peak_x, peak_y);
        }

        Some(Correlation {
            offset,
            peak_value: peak as f64,
        })
    }

    fn prepare(&self, image: &Buffer2<f32>) -> Vec<Complex<f32>> {
        let (nx, ny) = (self.size_x, self.size_y);
        let mut padded = vec![Complex::new(0.0, 0.0); nx * ny];
        let offset_x = (nx - image.width()) / 2;
        let offset_y = (ny - image.height()) / 2;

        for y in 0..image.height() {
            let wy = self.window_y[y + offset_y];
            for (x, &value) in image.row(y).iter().enumerate() {
                let wx = self.window_x[x + offset_x];
                padded[(y + offset_y) * nx + x + offset_x] = Complex::new(value * wx * wy, 0.0);
            }
        }
        padded
    }

    /// Row transforms followed by column transforms.
    fn fft_2d(&self, mut data: Vec<Complex<f32>>, inverse: bool) -> Vec<Complex<f32>> {
        let (nx, ny) = (self.size_x, self.size_y);
        let (along_x, along_y) = if inverse {
            (&self.inverse_x, &self.inverse_y)
        } else {
            (&self.forward_x, &self.forward_y)
        };

        for row in data.chunks_exact_mut(nx) {
            along_x.process(row);
        }

        let mut column = vec![Complex::new(0.0, 0.0); ny];
        for x in 0..nx {
            for (y, c) in column.iter_mut().enumerate() {
                *c = data[y * nx + x];
            }
            along_y.process(&mut column);
            for (y, c) in column.iter().enumerate() {
                data[y * nx + x] = *c;
            }
        }
        data
    }

    fn find_peak(&self, correlation: &[f32]) -> (usize, usize, f32) {
        let nx = self.size_x;
        let (index, value) = correlation
            .iter()
            .copied()
            .enumerate()
            .fold((0, f32::NEG_INFINITY), |best, (i, v)| if v > best.1 { (i, v) } else { best });
        (index % nx, index / nx, value)
    }

    fn parabolic_refinement(&self, correlation: &[f32], peak_x: usize, peak_y: usize) -> DVec2 {
        let (nx, ny) = (self.size_x, self.size_y);
        let at = |x: usize, y: usize| correlation[(y % ny) * nx + (x % nx)];

        let c = at(peak_x, peak_y);
        let l = at(peak_x + nx - 1, peak_y);
        let r = at(peak_x + 1, peak_y);
        let t = at(peak_x, peak_y + ny - 1);
        let b = at(peak_x, peak_y + 1);

        let vertex = |lo: f32, hi: f32| {
            let denom = 2.0 * (lo + hi - 2.0 * c);
            if denom.abs() > 1e-10 {
                ((lo - hi) / denom).clamp(-0.5, 0.5) as f64
            } else {
                0.0
            }
        };
        DVec2::new(vertex(l, r), vertex(t, b))
    }
}

fn cross_power_spectrum(reference: &[Complex<f32>], target: &[Complex<f32>]) -> Vec<Complex<f32>> {
    reference
        .iter()
        .zip(target)
        .map(|(&a, &b)| {
            let product = a * b.conj();
            let magnitude = product.norm();
            if magnitude > 1e-10 {
                product / magnitude
            } else {
                Complex::new(0.0, 0.0)
            }
        })
        .collect()
}

pub fn hann_window(size: usize) -> Vec<f32> {
    use std::f32::consts::PI;
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / size as f32).cos()))
        .collect()
}
