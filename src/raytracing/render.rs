use rayon::prelude::*;

use super::canvas::Canvas;
use super::core::Scene;
use super::math::Vec3;
use super::shading::cast;

/// Sub-pixel samples taken along each axis, on a fixed grid
pub const SUPERSAMPLING: u32 = 3;

/// Maps a buffer position (row 0 at the top) to coordinates centered on the image,
/// with y growing upward.
pub fn to_centered(column: u32, row: u32, width: u32, height: u32) -> (i64, i64) {
    let x = column as i64 - (width / 2) as i64;
    let y = (height / 2) as i64 - row as i64;
    (x, y)
}

/// Inverse of [`to_centered`], None when the point lays outside the image.
pub fn from_centered(x: i64, y: i64, width: u32, height: u32) -> Option<(u32, u32)> {
    let column = x + (width / 2) as i64;
    let row = (height / 2) as i64 - y;
    if column < 0 || row < 0 || column >= width as i64 || row >= height as i64 {
        return None;
    }
    Some((column as u32, row as u32))
}

/// Average color of the pixel at centered coordinates (x, y).
pub fn render_pixel(scene: &Scene, x: i64, y: i64) -> Vec3 {
    let mut color = Vec3::zero();
    let step = 1.0 / SUPERSAMPLING as f64;
    for sy in 0..SUPERSAMPLING {
        for sx in 0..SUPERSAMPLING {
            let u = x as f64 + sx as f64 * step;
            let v = y as f64 + sy as f64 * step;
            let ray = scene.camera.shoot_to(u, v);
            color += cast(scene, &ray);
        }
    }
    color / (SUPERSAMPLING * SUPERSAMPLING) as f64
}

/// Position of a pixel in a row-major buffer, computed in `usize` so large images do not overflow
fn pixel_index(width: u32, column: u32, row: u32) -> usize {
    row as usize * width as usize + column as usize
}

/// A rendered image, stored row by row from the top.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pixels: Vec<Vec3>,
}

impl Frame {
    fn blank(width: u32, height: u32) -> Self {
        // the first pixel past the last row is the buffer length
        let len = pixel_index(width, 0, height);
        Frame {
            width,
            height,
            pixels: vec![Vec3::zero(); len],
        }
    }

    #[cfg(test)]
    pub fn get(&self, column: u32, row: u32) -> Vec3 {
        self.pixels[pixel_index(self.width, column, row)]
    }

    /// Color at centered coordinates, None outside the image
    #[cfg(test)]
    pub fn at(&self, x: i64, y: i64) -> Option<Vec3> {
        from_centered(x, y, self.width, self.height).map(|(column, row)| self.get(column, row))
    }

    /// Iterates over the pixels as (x, y, color) in centered coordinates
    pub fn centered_pixels(&self) -> impl Iterator<Item = (i64, i64, Vec3)> + '_ {
        self.pixels.iter().enumerate().map(|(i, color)| {
            let column = (i % self.width as usize) as u32;
            let row = (i / self.width as usize) as u32;
            let (x, y) = to_centered(column, row, self.width, self.height);
            (x, y, *color)
        })
    }
}

fn render_row(scene: &Scene, row: u32, line: &mut [Vec3], width: u32, height: u32) {
    for (column, pixel) in line.iter_mut().enumerate() {
        let (x, y) = to_centered(column as u32, row, width, height);
        *pixel = render_pixel(scene, x, y);
    }
}

/// Renders the whole image, one row per rayon task.
/// The scene is only read, so the result does not depend on the scheduling.
pub fn render(scene: &Scene, width: u32, height: u32) -> Frame {
    let mut frame = Frame::blank(width, height);
    if width == 0 || height == 0 {
        return frame;
    }
    frame
        .pixels
        .par_chunks_mut(width as usize)
        .enumerate()
        .for_each(|(row, line)| render_row(scene, row as u32, line, width, height));
    frame
}

/// Renders a frame sized after the canvas, writes every pixel and presents it.
pub fn draw(scene: &Scene, canvas: &mut impl Canvas) -> anyhow::Result<()> {
    let (width, height) = canvas.dimensions();
    let frame = render(scene, width, height);
    for (x, y, color) in frame.centered_pixels() {
        canvas.put_pixel(x, y, color);
    }
    canvas.present()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render_sequential(scene: &Scene, width: u32, height: u32) -> Frame {
        let mut frame = Frame::blank(width, height);
        for (row, line) in frame.pixels.chunks_mut(width as usize).enumerate() {
            render_row(scene, row as u32, line, width, height);
        }
        frame
    }

    #[test]
    fn centered_coordinates_round_trip() {
        for (width, height) in [(401, 401), (400, 300), (1, 1)] {
            for row in 0..height {
                for column in 0..width {
                    let (x, y) = to_centered(column, row, width, height);
                    assert_eq!(from_centered(x, y, width, height), Some((column, row)));
                }
            }
        }
    }

    #[test]
    fn odd_size_is_symmetric() {
        assert_eq!(to_centered(0, 0, 401, 401), (-200, 200));
        assert_eq!(to_centered(400, 400, 401, 401), (200, -200));
        assert_eq!(from_centered(201, 0, 401, 401), None);
    }

    #[test]
    fn center_pixel_hits_sphere() {
        let scene = Scene::default();
        let color = render_pixel(&scene, 0, 0);
        for channel in [color.x, color.y, color.z] {
            assert!(channel >= scene.ambient);
            assert!(channel <= 1.0);
        }
        // the green and blue channels carry the sphere tint
        assert!(color.y > color.x);
    }

    #[test]
    fn top_corner_is_background() {
        let scene = Scene::default();
        assert_eq!(render_pixel(&scene, -200, 200), scene.background);
    }

    #[test]
    fn render_is_deterministic_and_parallel_safe() {
        let scene = Scene::default();
        let a = render(&scene, 41, 31);
        let b = render(&scene, 41, 31);
        assert_eq!(a, b);
        assert_eq!(a, render_sequential(&scene, 41, 31));
        assert_eq!(a.at(0, 0), Some(render_pixel(&scene, 0, 0)));
    }

    #[test]
    fn pixel_index_past_u32_range() {
        let index = pixel_index(70_000, 5, 70_000);
        assert_eq!(index, 4_900_000_005);
        assert!(index > u32::MAX as usize);
        assert_eq!(pixel_index(41, 3, 2), 85);
    }

    #[test]
    fn empty_frame() {
        let frame = render(&Scene::default(), 0, 10);
        assert_eq!(frame.centered_pixels().count(), 0);
    }

    struct RecordingCanvas {
        pixels: Vec<(i64, i64, Vec3)>,
        presented: bool,
    }

    impl Canvas for RecordingCanvas {
        fn dimensions(&self) -> (u32, u32) {
            (5, 3)
        }

        fn put_pixel(&mut self, x: i64, y: i64, color: Vec3) {
            self.pixels.push((x, y, color));
        }

        fn present(&mut self) -> anyhow::Result<()> {
            self.presented = true;
            Ok(())
        }
    }

    #[test]
    fn draw_fills_canvas_then_presents() {
        let mut canvas = RecordingCanvas {
            pixels: Vec::new(),
            presented: false,
        };
        draw(&Scene::default(), &mut canvas).unwrap();
        assert!(canvas.presented);
        assert_eq!(canvas.pixels.len(), 15);
        assert!(canvas.pixels.contains(&(-2, 1, render_pixel(&Scene::default(), -2, 1))));
    }
}
