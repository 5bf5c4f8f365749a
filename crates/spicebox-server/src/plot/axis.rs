//! Data bounds, ticks and the data-to-pixel mapping shared by both outputs.

use spicebox_core::units::format_value;

use super::{AxisScale, PlotError, PlotRequest, Series};

const MARGIN_LEFT: f64 = 76.0;
const MARGIN_RIGHT: f64 = 24.0;
const MARGIN_TOP: f64 = 44.0;
const MARGIN_BOTTOM: f64 = 56.0;

fn usable(v: f64, scale: AxisScale) -> bool {
    v.is_finite() && (scale == AxisScale::Linear || v > 0.0)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct Axis {
    pub min: f64,
    pub max: f64,
    pub scale: AxisScale,
}

impl Axis {
    fn fit(values: impl Iterator<Item = f64>, scale: AxisScale) -> Option<Self> {
        let (mut lo, mut hi) = (f64::INFINITY, f64::NEG_INFINITY);
        for v in values {
            lo = lo.min(v);
            hi = hi.max(v);
        }
        if !lo.is_finite() {
            return None;
        }

        match scale {
            AxisScale::Log => {
                let lo_dec = lo.log10().floor();
                let mut hi_dec = hi.log10().ceil();
                if hi_dec <= lo_dec {
                    hi_dec = lo_dec + 1.0;
                }
                Some(Self {
                    min: 10f64.powf(lo_dec),
                    max: 10f64.powf(hi_dec),
                    scale,
                })
            }
            AxisScale::Linear => {
                if lo == hi {
                    let pad = if lo == 0.0 { 1.0 } else { lo.abs() * 0.1 };
                    lo -= pad;
                    hi += pad;
                } else {
                    let pad = (hi - lo) * 0.05;
                    lo -= pad;
                    hi += pad;
                }
                Some(Self { min: lo, max: hi, scale })
            }
        }
    }

    /// Position of `v` along the axis, 0 at `min` and 1 at `max`.
    pub fn fraction(&self, v: f64) -> f64 {
        match self.scale {
            AxisScale::Linear => (v - self.min) / (self.max - self.min),
            AxisScale::Log => (v.log10() - self.min.log10()) / (self.max.log10() - self.min.log10()),
        }
    }

    pub fn ticks(&self) -> Vec<f64> {
        match self.scale {
            AxisScale::Linear => {
                let step = nice_step((self.max - self.min) / 5.0);
                let mut ticks = Vec::new();
                let mut t = (self.min / step).ceil() * step;
                while t <= self.max + step * 1e-9 {
                    ticks.push(if t.abs() < step * 1e-9 { 0.0 } else { t });
                    t += step;
                }
                ticks
            }
            AxisScale::Log => {
                let first = self.min.log10().round() as i32;
                let last = self.max.log10().round() as i32;
                let stride = ((last - first) as usize).div_ceil(10).max(1);
                (first..=last)
                    .step_by(stride)
                    .map(|d| 10f64.powi(d))
                    .collect()
            }
        }
    }
}

/// 1, 2 or 5 times a power of ten, at least `raw`.
fn nice_step(raw: f64) -> f64 {
    let magnitude = 10f64.powf(raw.log10().floor());
    let f = raw / magnitude;
    let nice = if f <= 1.0 {
        1.0
    } else if f <= 2.0 {
        2.0
    } else if f <= 5.0 {
        5.0
    } else {
        10.0
    };
    nice * magnitude
}

/// Compact SI label: `1k`, `2.5m`, `0`.
pub(super) fn tick_label(v: f64) -> String {
    let formatted = format_value(v);
    let split = formatted
        .find(|c: char| c.is_ascii_alphabetic())
        .unwrap_or(formatted.len());
    let (number, suffix) = formatted.split_at(split);
    let number = if number.contains('.') {
        number.trim_end_matches('0').trim_end_matches('.')
    } else {
        number
    };
    let number = if number == "-0" { "0" } else { number };
    format!("{}{}", number, suffix)
}

/// Plot area and axes for one request.
#[derive(Debug, Clone, Copy)]
pub(super) struct Frame {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    pub x: Axis,
    pub y: Axis,
}

impl Frame {
    pub fn layout(request: &PlotRequest) -> Result<Self, PlotError> {
        let (xs, ys) = (request.x_scale, request.y_scale);
        let points = || {
            request.series.iter().flat_map(move |s| {
                s.x.iter()
                    .zip(&s.y)
                    .filter(move |(x, y)| usable(**x, xs) && usable(**y, ys))
            })
        };
        let x = Axis::fit(points().map(|(x, _)| *x), request.x_scale).ok_or(PlotError::NoData)?;
        let y = Axis::fit(points().map(|(_, y)| *y), request.y_scale).ok_or(PlotError::NoData)?;

        Ok(Self {
            left: MARGIN_LEFT,
            top: MARGIN_TOP,
            width: request.width as f64 - MARGIN_LEFT - MARGIN_RIGHT,
            height: request.height as f64 - MARGIN_TOP - MARGIN_BOTTOM,
            x,
            y,
        })
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.left + self.x.fraction(x) * self.width,
            self.top + (1.0 - self.y.fraction(y)) * self.height,
        )
    }

    /// Pixel polylines for a series, broken wherever a sample cannot be
    /// placed (non-finite, or non-positive on a log axis).
    pub fn polylines(&self, series: &Series) -> Vec<Vec<(f64, f64)>> {
        let mut lines = Vec::new();
        let mut current = Vec::new();
        for (&x, &y) in series.x.iter().zip(&series.y) {
            if usable(x, self.x.scale) && usable(y, self.y.scale) {
                current.push(self.to_pixel(x, y));
            } else if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
        }
        if !current.is_empty() {
            lines.push(current);
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_labels() {
        assert_eq!(tick_label(1000.0), "1k");
        assert_eq!(tick_label(2.5e-3), "2.5m");
        assert_eq!(tick_label(0.0), "0");
        assert_eq!(tick_label(-4.0), "-4");
    }

    #[test]
    fn test_linear_ticks_are_round() {
        let axis = Axis {
            min: -0.05,
            max: 1.05,
            scale: AxisScale::Linear,
        };
        assert_eq!(axis.ticks(), vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_log_axis_snaps_to_decades() {
        let axis = Axis::fit([15.0, 2500.0].into_iter(), AxisScale::Log).unwrap();
        assert_eq!(axis.min, 10.0);
        assert_eq!(axis.max, 10000.0);
        assert_eq!(axis.ticks().len(), 4);
        assert!((axis.fraction(100.0) - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_polyline_breaks_on_gaps() {
        let request = PlotRequest::new("", "", "").with_series(Series::new(
            "z",
            vec![1.0, 2.0, 3.0, 4.0],
            vec![1.0, f64::INFINITY, 2.0, 3.0],
        ));
        let frame = Frame::layout(&request).unwrap();
        let lines = frame.polylines(&request.series[0]);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].len(), 1);
        assert_eq!(lines[1].len(), 2);
    }
}
