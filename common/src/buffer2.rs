use std::ops::{Index, IndexMut};

/// Row-major 2D buffer addressed as `(x, y)`.
///
/// Used both for image planes (x = column, y = row) and for kymographs, where
/// x is the time bin and y the sample position along the capillary.
#[derive(Debug, Clone, PartialEq)]
pub struct Buffer2<T> {
    pixels: Vec<T>,
    width: usize,
    height: usize,
}

impl<T> Buffer2<T> {
    pub fn new(width: usize, height: usize, pixels: Vec<T>) -> Self {
        assert_eq!(
            pixels.len(),
            width * height,
            "pixels length must equal width * height"
        );
        Self {
            pixels,
            width,
            height,
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> &T {
        debug_assert!(x < self.width && y < self.height);
        &self.pixels[y * self.width + x]
    }

    #[inline]
    pub fn get_mut(&mut self, x: usize, y: usize) -> &mut T {
        debug_assert!(x < self.width && y < self.height);
        &mut self.pixels[y * self.width + x]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn pixels(&self) -> &[T] {
        &self.pixels
    }

    #[inline]
    pub fn pixels_mut(&mut self) -> &mut [T] {
        &mut self.pixels
    }

    #[inline]
    pub fn into_vec(self) -> Vec<T> {
        self.pixels
    }

    /// One row as a contiguous slice.
    #[inline]
    pub fn row(&self, y: usize) -> &[T] {
        let start = y * self.width;
        &self.pixels[start..start + self.width]
    }

    pub fn map<U, F: Fn(&T) -> U>(&self, f: F) -> Buffer2<U> {
        Buffer2 {
            pixels: self.pixels.iter().map(f).collect(),
            width: self.width,
            height: self.height,
        }
    }
}

impl<T: Copy> Buffer2<T> {
    /// Copies column `x` top to bottom.
    pub fn column(&self, x: usize) -> Vec<T> {
        assert!(x < self.width, "column {x} out of range (width {})", self.width);
        (0..self.height).map(|y| self.pixels[y * self.width + x]).collect()
    }

    /// Writes `values` into column `x`, starting at row 0. Extra rows are left untouched.
    pub fn set_column(&mut self, x: usize, values: &[T]) {
        assert!(x < self.width, "column {x} out of range (width {})", self.width);
        for (y, &v) in values.iter().take(self.height).enumerate() {
            self.pixels[y * self.width + x] = v;
        }
    }

    /// Copies the `width x height` window with top-left corner `(x0, y0)`.
    pub fn crop(&self, x0: usize, y0: usize, width: usize, height: usize) -> Buffer2<T> {
        assert!(
            x0 + width <= self.width && y0 + height <= self.height,
            "crop window exceeds buffer bounds"
        );
        let mut pixels = Vec::with_capacity(width * height);
        for y in y0..y0 + height {
            let start = y * self.width + x0;
            pixels.extend_from_slice(&self.pixels[start..start + width]);
        }
        Buffer2::new(width, height, pixels)
    }

    /// Grows the buffer to `width x height`, keeping content at the top-left corner.
    pub fn padded(&self, width: usize, height: usize, fill: T) -> Buffer2<T> {
        assert!(
            width >= self.width && height >= self.height,
            "padding cannot shrink a buffer"
        );
        let mut out = Buffer2::new_filled(width, height, fill);
        for y in 0..self.height {
            let dst = y * width;
            out.pixels[dst..dst + self.width].copy_from_slice(self.row(y));
        }
        out
    }
}

impl<T: Default + Clone> Buffer2<T> {
    pub fn new_default(width: usize, height: usize) -> Self {
        Self {
            pixels: vec![T::default(); width * height],
            width,
            height,
        }
    }
}

impl<T: Clone> Buffer2<T> {
    pub fn new_filled(width: usize, height: usize, value: T) -> Self {
        Self {
            pixels: vec![value; width * height],
            width,
            height,
        }
    }
}

impl<T> Index<(usize, usize)> for Buffer2<T> {
    type Output = T;

    #[inline]
    fn index(&self, (x, y): (usize, usize)) -> &Self::Output {
        &self.pixels[y * self.width + x]
    }
}

impl<T> IndexMut<(usize, usize)> for Buffer2<T> {
    #[inline]
    fn index_mut(&mut self, (x, y): (usize, usize)) -> &mut Self::Output {
        &mut self.pixels[y * self.width + x]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_stores_dimensions() {
        let buf = Buffer2::new(3, 2, vec![10, 20, 30, 40, 50, 60]);
        assert_eq!(buf.width(), 3);
        assert_eq!(buf.height(), 2);
        assert_eq!(buf.len(), 6);
        assert!(!buf.is_empty());
    }

    #[test]
    #[should_panic(expected = "pixels length must equal width * height")]
    fn test_new_panics_on_size_mismatch() {
        Buffer2::new(3, 2, vec![1, 2, 3]);
    }

    #[test]
    fn test_index_tuple_is_x_then_y() {
        let buf = Buffer2::new(3, 2, vec![10, 20, 30, 40, 50, 60]);
        assert_eq!(buf[(0, 0)], 10);
        assert_eq!(buf[(2, 0)], 30);
        assert_eq!(buf[(0, 1)], 40);
        assert_eq!(buf[(2, 1)], 60);
    }

    #[test]
    fn test_column_roundtrip() {
        let mut buf = Buffer2::<i32>::new_default(3, 4);
        buf.set_column(1, &[1, 2, 3, 4]);
        assert_eq!(buf.column(1), vec![1, 2, 3, 4]);
        assert_eq!(buf.column(0), vec![0, 0, 0, 0]);
    }

    #[test]
    fn test_set_column_short_input_leaves_tail() {
        let mut buf = Buffer2::new_filled(2, 3, 7);
        buf.set_column(0, &[1]);
        assert_eq!(buf.column(0), vec![1, 7, 7]);
    }

    #[test]
    fn test_crop() {
        // 4x3: value = y * 10 + x
        let pixels: Vec<i32> = (0..3).flat_map(|y| (0..4).map(move |x| y * 10 + x)).collect();
        let buf = Buffer2::new(4, 3, pixels);
        let crop = buf.crop(1, 1, 2, 2);
        assert_eq!(crop.pixels(), &[11, 12, 21, 22]);
    }

    #[test]
    #[should_panic(expected = "crop window exceeds buffer bounds")]
    fn test_crop_out_of_bounds_panics() {
        Buffer2::new_filled(2, 2, 0u8).crop(1, 1, 2, 2);
    }

    #[test]
    fn test_padded_keeps_top_left() {
        let buf = Buffer2::new(2, 1, vec![5, 6]);
        let padded = buf.padded(3, 2, 0);
        assert_eq!(padded.pixels(), &[5, 6, 0, 0, 0, 0]);
    }

    #[test]
    fn test_map() {
        let buf = Buffer2::new(2, 1, vec![1u8, 2]);
        let mapped = buf.map(|&v| v as f32 * 0.5);
        assert_eq!(mapped.pixels(), &[0.5, 1.0]);
    }
}
