//! Planar raster images, frame sources and pixel transforms.

mod source;
mod transform;


pub use source::{FileFrameSource, FrameSource, MemoryFrameSource};
pub use transform::ImageTransform;

use ::image::{DynamicImage, ImageBuffer, Luma, Rgb};
use common::Buffer2;

/// Multi-channel `f32` raster with one [`Buffer2`] plane per channel.
///
/// Values keep the 8-bit scale of the decoded frames (0..=255) so that level
/// thresholds read the same as in the acquisition software.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    planes: Vec<Buffer2<f32>>,
}

impl RasterImage {
    pub fn new(width: usize, height: usize, channels: usize) -> Self {
        assert!(channels > 0, "image needs at least one channel");
        Self {
            planes: (0..channels)
                .map(|_| Buffer2::new_default(width, height))
                .collect(),
        }
    }

    pub fn from_planes(planes: Vec<Buffer2<f32>>) -> Self {
        assert!(!planes.is_empty(), "image needs at least one channel");
        let (w, h) = (planes[0].width(), planes[0].height());
        assert!(
            planes.iter().all(|p| p.width() == w && p.height() == h),
            "all planes must share dimensions"
        );
        Self { planes }
    }

    /// Builds an image by evaluating `f(x, y, channel)` for every sample.
    pub fn from_fn<F>(width: usize, height: usize, channels: usize, f: F) -> Self
    where
        F: Fn(usize, usize, usize) -> f32,
    {
        let planes = (0..channels)
            .map(|c| {
                let pixels = (0..height)
                    .flat_map(|y| (0..width).map(move |x| (x, y)))
                    .map(|(x, y)| f(x, y, c))
                    .collect();
                Buffer2::new(width, height, pixels)
            })
            .collect();
        Self::from_planes(planes)
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.planes[0].width()
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.planes[0].height()
    }

    #[inline]
    pub fn channel_count(&self) -> usize {
        self.planes.len()
    }

    #[inline]
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width(), self.height())
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize, channel: usize) -> f32 {
        self.planes[channel][(x, y)]
    }

    #[inline]
    pub fn set_pixel(&mut self, x: usize, y: usize, channel: usize, value: f32) {
        self.planes[channel][(x, y)] = value;
    }

    #[inline]
    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width() && (y as usize) < self.height()
    }

    pub fn plane(&self, channel: usize) -> &Buffer2<f32> {
        &self.planes[channel]
    }

    pub fn plane_mut(&mut self, channel: usize) -> &mut Buffer2<f32> {
        &mut self.planes[channel]
    }

    pub fn planes(&self) -> &[Buffer2<f32>] {
        &self.planes
    }

    pub fn crop(&self, x0: usize, y0: usize, width: usize, height: usize) -> RasterImage {
        RasterImage {
            planes: self
                .planes
                .iter()
                .map(|p| p.crop(x0, y0, width, height))
                .collect(),
        }
    }

    /// Zero-pads to `width x height`, content anchored at the top-left corner.
    pub fn padded(&self, width: usize, height: usize) -> RasterImage {
        RasterImage {
            planes: self
                .planes
                .iter()
                .map(|p| p.padded(width, height, 0.0))
                .collect(),
        }
    }

    /// Grayscale sources become one channel, everything else RGB.
    pub fn from_dynamic(image: &DynamicImage) -> Self {
        let (width, height) = (image.width() as usize, image.height() as usize);
        match image {
            DynamicImage::ImageLuma8(_)
            | DynamicImage::ImageLuma16(_)
            | DynamicImage::ImageLumaA8(_)
            | DynamicImage::ImageLumaA16(_) => {
                let luma = image.to_luma8();
                let pixels = luma.as_raw().iter().map(|&v| v as f32).collect();
                Self::from_planes(vec![Buffer2::new(width, height, pixels)])
            }
            _ => {
                let rgb = image.to_rgb8();
                let raw = rgb.as_raw();
                let planes = (0..3)
                    .map(|c| {
                        let pixels = raw.iter().skip(c).step_by(3).map(|&v| v as f32).collect();
                        Buffer2::new(width, height, pixels)
                    })
                    .collect();
                Self::from_planes(planes)
            }
        }
    }

    /// 8-bit export, values clamped to 0..=255. Images with 3+ channels export as RGB.
    pub fn to_dynamic(&self) -> DynamicImage {
        let (w, h) = (self.width() as u32, self.height() as u32);
        let to_u8 = |v: f32| v.round().clamp(0.0, 255.0) as u8;
        if self.channel_count() >= 3 {
            DynamicImage::ImageRgb8(ImageBuffer::from_fn(w, h, |x, y| {
                let (x, y) = (x as usize, y as usize);
                Rgb([
                    to_u8(self.pixel(x, y, 0)),
                    to_u8(self.pixel(x, y, 1)),
                    to_u8(self.pixel(x, y, 2)),
                ])
            }))
        } else {
            DynamicImage::ImageLuma8(ImageBuffer::from_fn(w, h, |x, y| {
                Luma([to_u8(self.pixel(x as usize, y as usize, 0))])
            }))
        }
    }
}
