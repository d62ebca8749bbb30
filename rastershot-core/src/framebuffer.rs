/// Color and depth buffers for one render, plus PNG output
use std::io::Cursor;
use std::path::Path;

use image::{ImageFormat, ImageResult, RgbImage};

use crate::camera::Resolution;
use crate::color::{Rgb, BACKGROUND_COLOR};

pub struct Framebuffer {
    width: usize,
    height: usize,
    /// Row-major RGB bytes, top row first
    color_buffer: Vec<u8>,
    depth_buffer: Vec<f32>,
}

impl Framebuffer {
    pub fn new(resolution: Resolution) -> Self {
        let size = resolution.pixel_count();
        Self {
            width: resolution.width as usize,
            height: resolution.height as usize,
            color_buffer: BACKGROUND_COLOR.repeat(size),
            depth_buffer: vec![f32::INFINITY; size],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixel(&self, x: usize, y: usize) -> Rgb {
        let idx = (y * self.width + x) * 3;
        [
            self.color_buffer[idx],
            self.color_buffer[idx + 1],
            self.color_buffer[idx + 2],
        ]
    }

    pub fn depth(&self, x: usize, y: usize) -> f32 {
        self.depth_buffer[y * self.width + x]
    }

    /// True when no fragment has been written
    pub fn is_blank(&self) -> bool {
        self.depth_buffer.iter().all(|d| d.is_infinite())
    }

    /// Mutable color and depth slices, for the rasterizer to split into row bands
    pub(crate) fn buffers_mut(&mut self) -> (&mut [u8], &mut [f32]) {
        (&mut self.color_buffer, &mut self.depth_buffer)
    }

    pub fn to_image(&self) -> RgbImage {
        let mut image = RgbImage::new(self.width as u32, self.height as u32);
        image.copy_from_slice(&self.color_buffer);
        image
    }

    /// Write an RGB PNG regardless of the path's extension
    pub fn save_png(&self, path: impl AsRef<Path>) -> ImageResult<()> {
        self.to_image().save_with_format(path, ImageFormat::Png)
    }

    pub fn encode_png(&self) -> ImageResult<Vec<u8>> {
        let mut bytes = Cursor::new(Vec::new());
        self.to_image().write_to(&mut bytes, ImageFormat::Png)?;
        Ok(bytes.into_inner())
    }
}
