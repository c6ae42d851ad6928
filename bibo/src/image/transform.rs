use common::Buffer2;
use serde::{Deserialize, Serialize};

use crate::image::RasterImage;

/// Single-plane view of a raster that level and ridge scans score against.
///
/// Color transforms need an RGB image; on fewer channels [`ImageTransform::apply`]
/// returns `None` and the caller skips the capillary.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum_macros::Display,
)]
pub enum ImageTransform {
    /// First channel as is.
    #[default]
    None,
    Red,
    Green,
    Blue,
    /// Mean of the three color channels.
    Rgb,
    /// `2R - (G + B)`
    R2MinusGb,
    /// `2G - (R + B)`
    G2MinusRb,
    /// `2B - (R + G)`
    B2MinusRg,
    /// Absolute horizontal difference summed over `span` pixels on each side.
    XDiffN { span: usize },
    /// Absolute vertical difference summed over `span` pixels on each side.
    YDiffN { span: usize },
    /// `XDiffN + YDiffN`.
    XyDiffN { span: usize },
}

impl ImageTransform {
    pub fn apply(&self, image: &RasterImage) -> Option<Buffer2<f32>> {
        let rgb = |f: fn(f32, f32, f32) -> f32| -> Option<Buffer2<f32>> {
            if image.channel_count() < 3 {
                return None;
            }
            let (r, g, b) = (image.plane(0), image.plane(1), image.plane(2));
            let pixels = r
                .pixels()
                .iter()
                .zip(g.pixels())
                .zip(b.pixels())
                .map(|((&r, &g), &b)| f(r, g, b))
                .collect();
            Some(Buffer2::new(image.width(), image.height(), pixels))
        };

        match *self {
            ImageTransform::None => Some(image.plane(0).clone()),
            ImageTransform::Red => rgb(|r, _, _| r),
            ImageTransform::Green => rgb(|_, g, _| g),
            ImageTransform::Blue => rgb(|_, _, b| b),
            ImageTransform::Rgb => rgb(|r, g, b| (r + g + b) / 3.0),
            ImageTransform::R2MinusGb => rgb(|r, g, b| 2.0 * r - (g + b)),
            ImageTransform::G2MinusRb => rgb(|r, g, b| 2.0 * g - (r + b)),
            ImageTransform::B2MinusRg => rgb(|r, g, b| 2.0 * b - (r + g)),
            ImageTransform::XDiffN { span } => Some(diff_x(&luminance(image), span)),
            ImageTransform::YDiffN { span } => Some(diff_y(&luminance(image), span)),
            ImageTransform::XyDiffN { span } => {
                let lum = luminance(image);
                let mut out = diff_x(&lum, span);
                let dy = diff_y(&lum, span);
                out.pixels_mut()
                    .iter_mut()
                    .zip(dy.pixels())
                    .for_each(|(a, &b)| *a += b);
                Some(out)
            }
        }
    }
}

fn luminance(image: &RasterImage) -> Buffer2<f32> {
    if image.channel_count() == 1 {
        return image.plane(0).clone();
    }
    let n = image.channel_count() as f32;
    let mut out = Buffer2::new_default(image.width(), image.height());
    for plane in image.planes() {
        out.pixels_mut()
            .iter_mut()
            .zip(plane.pixels())
            .for_each(|(o, &v)| *o += v / n);
    }
    out
}

/// Pixels closer than `span` to the left/right border are 0.
fn diff_x(plane: &Buffer2<f32>, span: usize) -> Buffer2<f32> {
    let (w, h) = (plane.width(), plane.height());
    let mut out = Buffer2::new_default(w, h);
    if span == 0 || w <= 2 * span {
        return out;
    }
    for y in 0..h {
        let row = plane.row(y);
        for x in span..w - span {
            let sum: f32 = (1..=span).map(|i| row[x + i] - row[x - i]).sum();
            out[(x, y)] = sum.abs();
        }
    }
    out
}

/// Pixels closer than `span` to the top/bottom border are 0.
fn diff_y(plane: &Buffer2<f32>, span: usize) -> Buffer2<f32> {
    let (w, h) = (plane.width(), plane.height());
    let mut out = Buffer2::new_default(w, h);
    if span == 0 || h <= 2 * span {
        return out;
    }
    for y in span..h - span {
        for x in 0..w {
            let sum: f32 = (1..=span)
                .map(|i| plane[(x, y + i)] - plane[(x, y - i)])
                .sum();
            out[(x, y)] = sum.abs();
        }
    }
    out
}
