//! Plot requests and rendering.
//!
//! Tools decide what goes into a plot ([`PlotRequest`]); a [`PlotRenderer`]
//! turns it into image bytes. [`BasicRenderer`] writes SVG markup directly and
//! rasterizes PNG without text.

mod axis;
mod raster;
mod svg;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlotError {
    #[error("nothing to plot: no finite samples")]
    NoData,

    #[error("series '{name}' has {x} x values but {y} y values")]
    LengthMismatch { name: String, x: usize, y: usize },

    #[error("plot size {width}x{height} is outside 64..=4096")]
    InvalidSize { width: u32, height: u32 },

    #[error("PNG encoding failed: {0}")]
    Png(#[from] png::EncodingError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    Svg,
}

impl ImageFormat {
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "png" => Some(ImageFormat::Png),
            "svg" => Some(ImageFormat::Svg),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Svg => "svg",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Svg => "image/svg+xml",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AxisScale {
    #[default]
    Linear,
    Log,
}

/// One named curve.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl Series {
    pub fn new(name: impl Into<String>, x: Vec<f64>, y: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            x,
            y,
        }
    }
}

/// Everything a renderer needs to draw one chart.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotRequest {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub width: u32,
    pub height: u32,
    pub x_scale: AxisScale,
    pub y_scale: AxisScale,
    pub series: Vec<Series>,
}

impl PlotRequest {
    pub fn new(title: impl Into<String>, x_label: impl Into<String>, y_label: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            x_label: x_label.into(),
            y_label: y_label.into(),
            width: 800,
            height: 600,
            x_scale: AxisScale::Linear,
            y_scale: AxisScale::Linear,
            series: Vec::new(),
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_x_scale(mut self, scale: AxisScale) -> Self {
        self.x_scale = scale;
        self
    }

    pub fn with_y_scale(mut self, scale: AxisScale) -> Self {
        self.y_scale = scale;
        self
    }

    pub fn with_series(mut self, series: Series) -> Self {
        self.series.push(series);
        self
    }

    pub fn validate(&self) -> Result<(), PlotError> {
        let size_ok = |v: u32| (64..=4096).contains(&v);
        if !size_ok(self.width) || !size_ok(self.height) {
            return Err(PlotError::InvalidSize {
                width: self.width,
                height: self.height,
            });
        }
        for s in &self.series {
            if s.x.len() != s.y.len() {
                return Err(PlotError::LengthMismatch {
                    name: s.name.clone(),
                    x: s.x.len(),
                    y: s.y.len(),
                });
            }
        }
        Ok(())
    }
}

/// Encoded image bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPlot {
    pub format: ImageFormat,
    pub bytes: Vec<u8>,
}

/// Turns plot requests into images.
pub trait PlotRenderer: Send + Sync {
    fn render(&self, request: &PlotRequest, format: ImageFormat) -> Result<RenderedPlot, PlotError>;
}

/// Dependency-light renderer: hand-written SVG and an unlabeled PNG raster.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicRenderer;

impl PlotRenderer for BasicRenderer {
    fn render(&self, request: &PlotRequest, format: ImageFormat) -> Result<RenderedPlot, PlotError> {
        request.validate()?;
        let bytes = match format {
            ImageFormat::Svg => svg::render(request)?.into_bytes(),
            ImageFormat::Png => raster::render(request)?,
        };
        Ok(RenderedPlot { format, bytes })
    }
}

/// Stroke colors, cycled per series.
const PALETTE: &[(u8, u8, u8)] = &[
    (31, 119, 180),
    (255, 127, 14),
    (44, 160, 44),
    (214, 39, 40),
    (148, 103, 189),
    (140, 86, 75),
];

fn color(index: usize) -> (u8, u8, u8) {
    PALETTE[index % PALETTE.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

    fn request() -> PlotRequest {
        let x: Vec<f64> = (0..50).map(|i| i as f64).collect();
        let y = x.iter().map(|v| (v / 5.0).sin()).collect();
        PlotRequest::new("Step Response", "Time (s)", "Voltage (V)")
            .with_size(320, 240)
            .with_series(Series::new("v(out)", x, y))
    }

    #[test]
    fn test_png_signature() {
        let plot = BasicRenderer.render(&request(), ImageFormat::Png).unwrap();
        assert_eq!(plot.bytes[..8], PNG_SIGNATURE);
        assert_eq!(plot.format.mime_type(), "image/png");
    }

    #[test]
    fn test_svg_contains_labels() {
        let plot = BasicRenderer.render(&request(), ImageFormat::Svg).unwrap();
        let text = String::from_utf8(plot.bytes).unwrap();
        assert!(text.trim_start().starts_with("<?xml"));
        assert!(text.contains("<svg") && text.contains("</svg>"));
        assert!(text.contains("Step Response"));
        assert!(text.contains("Time (s)"));
        assert!(text.contains("Voltage (V)"));
    }

    #[test]
    fn test_invalid_size() {
        let r = request().with_size(10, 10);
        assert!(matches!(
            BasicRenderer.render(&r, ImageFormat::Png),
            Err(PlotError::InvalidSize { .. })
        ));
    }

    #[test]
    fn test_empty_plot_is_error() {
        let r = PlotRequest::new("t", "x", "y").with_series(Series::new("a", vec![0.0], vec![f64::NAN]));
        assert!(matches!(BasicRenderer.render(&r, ImageFormat::Svg), Err(PlotError::NoData)));
    }

    #[test]
    fn test_format_tokens() {
        assert_eq!(ImageFormat::parse("SVG"), Some(ImageFormat::Svg));
        assert_eq!(ImageFormat::parse("jpeg"), None);
    }
}
