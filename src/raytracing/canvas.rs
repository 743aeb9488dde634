use std::path::PathBuf;

use anyhow::Context;
use image::{Rgb, RgbImage};

use super::math::Vec3;
use super::render::from_centered;

/// Surface the renderer writes into.
/// Pixels are addressed with the origin at the center and y growing upward.
pub trait Canvas {
    fn dimensions(&self) -> (u32, u32);
    /// `color` channels are expected in [0, 1], anything outside is saturated
    fn put_pixel(&mut self, x: i64, y: i64, color: Vec3);
    /// Shows the finished picture
    fn present(&mut self) -> anyhow::Result<()>;
}

impl From<Vec3> for Rgb<u8> {
    fn from(value: Vec3) -> Self {
        // float to int casts saturate, so negative values become 0
        let r = (value.x * 255.0) as u8;
        let g = (value.y * 255.0) as u8;
        let b = (value.z * 255.0) as u8;
        Rgb([r, g, b])
    }
}

pub fn gamma_correction(value: f64) -> f64 {
    if value > 0.0 {
        value.powf(1.0 / 2.2)
    } else {
        0.0
    }
}

/// Canvas backed by an in-memory image, saved to `path` on present.
/// The file format is picked from the extension.
pub struct ImageCanvas {
    buffer: RgbImage,
    path: PathBuf,
    gamma_correction: bool,
}

impl ImageCanvas {
    pub fn new(width: u32, height: u32, path: impl Into<PathBuf>, gamma_correction: bool) -> Self {
        ImageCanvas {
            buffer: RgbImage::new(width, height),
            path: path.into(),
            gamma_correction,
        }
    }

    #[cfg(test)]
    pub fn buffer(&self) -> &RgbImage {
        &self.buffer
    }
}

impl Canvas for ImageCanvas {
    fn dimensions(&self) -> (u32, u32) {
        self.buffer.dimensions()
    }

    fn put_pixel(&mut self, x: i64, y: i64, color: Vec3) {
        let (width, height) = self.buffer.dimensions();
        let Some((column, row)) = from_centered(x, y, width, height) else {
            return;
        };
        let color = if self.gamma_correction {
            color.map(gamma_correction)
        } else {
            color
        };
        self.buffer.put_pixel(column, row, color.into());
    }

    fn present(&mut self) -> anyhow::Result<()> {
        self.buffer
            .save(&self.path)
            .with_context(|| format!("cannot save image to {}", self.path.display()))
    }
}

#[cfg(feature = "preview")]
pub use preview::PreviewCanvas;

#[cfg(feature = "preview")]
mod preview {
    use anyhow::anyhow;
    use minifb::{Key, Window, WindowOptions};

    use super::{from_centered, Canvas, Vec3};

    /// Canvas drawing into a resizable window.
    pub struct PreviewCanvas {
        window: Window,
        buffer: Vec<u32>,
        width: usize,
        height: usize,
    }

    fn pack(color: Vec3) -> u32 {
        let channel = |value: f64| (value.clamp(0.0, 1.0) * 255.0) as u32;
        (channel(color.x) << 16) | (channel(color.y) << 8) | channel(color.z)
    }

    impl PreviewCanvas {
        pub fn open(title: &str, width: usize, height: usize) -> anyhow::Result<Self> {
            let mut window = Window::new(
                title,
                width,
                height,
                WindowOptions {
                    resize: true,
                    ..WindowOptions::default()
                },
            )
            .map_err(|err| anyhow!("cannot open the preview window: {}", err))?;
            window.set_target_fps(60);
            Ok(PreviewCanvas {
                window,
                buffer: vec![0; width * height],
                width,
                height,
            })
        }

        /// False once the window is closed or a quit key (q, Escape) is pressed
        pub fn is_open(&self) -> bool {
            self.window.is_open()
                && !self.window.is_key_down(Key::Escape)
                && !self.window.is_key_down(Key::Q)
        }

        /// Picks up a new window size, returning true when the picture must be redrawn
        pub fn resized(&mut self) -> bool {
            let (width, height) = self.window.get_size();
            if (width, height) == (self.width, self.height) || width == 0 || height == 0 {
                return false;
            }
            self.width = width;
            self.height = height;
            self.buffer = vec![0; width * height];
            true
        }

        /// Keeps the window responsive between redraws
        pub fn idle(&mut self) -> anyhow::Result<()> {
            self.present()
        }
    }

    impl Canvas for PreviewCanvas {
        fn dimensions(&self) -> (u32, u32) {
            (self.width as u32, self.height as u32)
        }

        fn put_pixel(&mut self, x: i64, y: i64, color: Vec3) {
            let (width, height) = self.dimensions();
            if let Some((column, row)) = from_centered(x, y, width, height) {
                self.buffer[row as usize * self.width + column as usize] = pack(color);
            }
        }

        fn present(&mut self) -> anyhow::Result<()> {
            self.window
                .update_with_buffer(&self.buffer, self.width, self.height)
                .map_err(|err| anyhow!("cannot update the preview window: {}", err))
        }
    }
}
