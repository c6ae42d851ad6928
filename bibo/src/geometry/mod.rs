//! Capillary ROI geometry: polylines, integer bounding boxes, rasterization.

mod bbox;
pub mod bresenham;


pub use bbox::Aabb;

use glam::DVec2;
use serde::{Deserialize, Serialize};

/// Ordered capillary outline, first point at the capillary's open end.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Polyline {
    points: Vec<DVec2>,
}

impl Polyline {
    pub fn new(points: Vec<DVec2>) -> Self {
        Self { points }
    }

    /// Two-point polyline.
    pub fn line(from: DVec2, to: DVec2) -> Self {
        Self {
            points: vec![from, to],
        }
    }

    pub fn points(&self) -> &[DVec2] {
        &self.points
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    /// Summed segment length in pixels.
    pub fn length(&self) -> f64 {
        self.points.windows(2).map(|w| w[0].distance(w[1])).sum()
    }

    pub fn translated(&self, offset: DVec2) -> Polyline {
        Polyline {
            points: self.points.iter().map(|&p| p + offset).collect(),
        }
    }

    /// Integer box enclosing every point; `None` if empty or entirely at negative coordinates.
    pub fn bounding_box(&self) -> Option<Aabb> {
        let first = self.points.first()?;
        let (mut min, mut max) = (*first, *first);
        for &p in &self.points[1..] {
            min = min.min(p);
            max = max.max(p);
        }
        if max.x < 0.0 || max.y < 0.0 {
            return None;
        }
        Some(Aabb::new(
            min.x.floor().max(0.0) as usize,
            max.x.ceil() as usize,
            min.y.floor().max(0.0) as usize,
            max.y.ceil() as usize,
        ))
    }

    /// Redistributes `count` points at equal arc length along the same path.
    ///
    /// Endpoints are preserved. Returns a clone if `count < 2` or the polyline is degenerate.
    pub fn resampled(&self, count: usize) -> Polyline {
        let total = self.length();
        if count < 2 || self.points.len() < 2 || total <= 0.0 {
            return self.clone();
        }

        let step = total / (count - 1) as f64;
        let mut out = Vec::with_capacity(count);
        out.push(self.points[0]);

        let mut segment = 0;
        let mut walked = 0.0;
        for i in 1..count - 1 {
            let target = step * i as f64;
            loop {
                let (a, b) = (self.points[segment], self.points[segment + 1]);
                let seg_len = a.distance(b);
                if walked + seg_len >= target || segment + 2 == self.points.len() {
                    let t = if seg_len > 0.0 {
                        ((target - walked) / seg_len).clamp(0.0, 1.0)
                    } else {
                        0.0
                    };
                    out.push(a.lerp(b, t));
                    break;
                }
                walked += seg_len;
                segment += 1;
            }
        }

        out.push(*self.points.last().unwrap_or(&self.points[0]));
        Polyline { points: out }
    }

    /// Point-wise comparison within `eps` pixels.
    pub fn approx_eq(&self, other: &Polyline, eps: f64) -> bool {
        self.points.len() == other.points.len()
            && self
                .points
                .iter()
                .zip(&other.points)
                .all(|(a, b)| a.abs_diff_eq(*b, eps))
    }
}

impl From<Vec<DVec2>> for Polyline {
    fn from(points: Vec<DVec2>) -> Self {
        Self::new(points)
    }
}
