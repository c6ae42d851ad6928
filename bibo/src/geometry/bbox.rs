//! Axis-aligned bounding box for pixel regions.

/// Axis-aligned bounding box with `usize` coordinates.
///
/// Inclusive bounds: a pixel at (x, y) is inside if
/// `x_min <= x <= x_max` and `y_min <= y <= y_max`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Aabb {
    pub x_min: usize,
    pub x_max: usize,
    pub y_min: usize,
    pub y_max: usize,
}

impl Aabb {
    #[inline]
    pub const fn new(x_min: usize, x_max: usize, y_min: usize, y_max: usize) -> Self {
        Self {
            x_min,
            x_max,
            y_min,
            y_max,
        }
    }

    /// Number of columns.
    #[inline]
    pub const fn width(&self) -> usize {
        self.x_max.saturating_sub(self.x_min) + 1
    }

    /// Number of rows.
    #[inline]
    pub const fn height(&self) -> usize {
        self.y_max.saturating_sub(self.y_min) + 1
    }

    #[inline]
    pub const fn contains(&self, x: usize, y: usize) -> bool {
        x >= self.x_min && x <= self.x_max && y >= self.y_min && y <= self.y_max
    }

    /// Grows every side by `margin`, saturating at 0.
    pub fn expanded(&self, margin: usize) -> Aabb {
        Aabb {
            x_min: self.x_min.saturating_sub(margin),
            x_max: self.x_max.saturating_add(margin),
            y_min: self.y_min.saturating_sub(margin),
            y_max: self.y_max.saturating_add(margin),
        }
    }

    /// Intersection with a `width x height` image, `None` if they do not overlap.
    pub fn clipped(&self, width: usize, height: usize) -> Option<Aabb> {
        if width == 0 || height == 0 || self.x_min >= width || self.y_min >= height {
            return None;
        }
        Some(Aabb {
            x_min: self.x_min,
            x_max: self.x_max.min(width - 1),
            y_min: self.y_min,
            y_max: self.y_max.min(height - 1),
        })
    }
}
