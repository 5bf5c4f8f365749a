//! PNG output: axes, grid and curves rasterized into an RGB buffer.

use super::axis::Frame;
use super::{PlotError, PlotRequest, color};

const WHITE: (u8, u8, u8) = (255, 255, 255);
const GRID: (u8, u8, u8) = (224, 224, 224);
const BORDER: (u8, u8, u8) = (51, 51, 51);

struct Canvas {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Canvas {
    fn new(width: u32, height: u32) -> Self {
        let (r, g, b) = WHITE;
        let pixels = [r, g, b].repeat(width as usize * height as usize);
        Self {
            width,
            height,
            pixels,
        }
    }

    fn put(&mut self, x: i64, y: i64, (r, g, b): (u8, u8, u8)) {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return;
        }
        let i = (y as usize * self.width as usize + x as usize) * 3;
        self.pixels[i..i + 3].copy_from_slice(&[r, g, b]);
    }

    /// Bresenham line; `thick` also paints the pixel below each point.
    fn line(&mut self, (x0, y0): (f64, f64), (x1, y1): (f64, f64), rgb: (u8, u8, u8), thick: bool) {
        let (mut x, mut y) = (x0.round() as i64, y0.round() as i64);
        let (x1, y1) = (x1.round() as i64, y1.round() as i64);
        let dx = (x1 - x).abs();
        let dy = -(y1 - y).abs();
        let sx = if x < x1 { 1 } else { -1 };
        let sy = if y < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        loop {
            self.put(x, y, rgb);
            if thick {
                self.put(x, y + 1, rgb);
            }
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    fn encode(&self) -> Result<Vec<u8>, PlotError> {
        let mut out = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut out, self.width, self.height);
            encoder.set_color(png::ColorType::Rgb);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder.write_header()?;
            writer.write_image_data(&self.pixels)?;
            writer.finish()?;
        }
        Ok(out)
    }
}

pub(super) fn render(request: &PlotRequest) -> Result<Vec<u8>, PlotError> {
    let frame = Frame::layout(request)?;
    let mut canvas = Canvas::new(request.width, request.height);

    for t in frame.x.ticks() {
        let x = frame.left + frame.x.fraction(t) * frame.width;
        canvas.line((x, frame.top), (x, frame.bottom()), GRID, false);
    }
    for t in frame.y.ticks() {
        let y = frame.top + (1.0 - frame.y.fraction(t)) * frame.height;
        canvas.line((frame.left, y), (frame.right(), y), GRID, false);
    }

    let corners = [
        (frame.left, frame.top),
        (frame.right(), frame.top),
        (frame.right(), frame.bottom()),
        (frame.left, frame.bottom()),
    ];
    for i in 0..corners.len() {
        canvas.line(corners[i], corners[(i + 1) % corners.len()], BORDER, false);
    }

    for (i, series) in request.series.iter().enumerate() {
        let rgb = color(i);
        for line in frame.polylines(series) {
            if let [only] = line.as_slice() {
                canvas.line(*only, *only, rgb, true);
            }
            for pair in line.windows(2) {
                canvas.line(pair[0], pair[1], rgb, true);
            }
        }
    }

    canvas.encode()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plot::Series;

    #[test]
    fn test_curve_pixels_are_painted() {
        let request = PlotRequest::new("", "", "")
            .with_size(200, 150)
            .with_series(Series::new("a", vec![0.0, 1.0], vec![0.0, 1.0]));
        let frame = Frame::layout(&request).unwrap();
        let mut canvas = Canvas::new(200, 150);
        for line in frame.polylines(&request.series[0]) {
            for pair in line.windows(2) {
                canvas.line(pair[0], pair[1], color(0), true);
            }
        }
        let (x, y) = frame.to_pixel(0.5, 0.5);
        let i = (y.round() as usize * 200 + x.round() as usize) * 3;
        assert_eq!(&canvas.pixels[i..i + 3], &[31, 119, 180]);
    }

    #[test]
    fn test_out_of_bounds_is_clipped() {
        let mut canvas = Canvas::new(64, 64);
        canvas.line((-10.0, -10.0), (100.0, 100.0), BORDER, true);
        assert_eq!(canvas.pixels.len(), 64 * 64 * 3);
    }
}
