//! SVG output.

use std::fmt::Write;

use super::axis::{Frame, tick_label};
use super::{PlotError, PlotRequest, color};

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
    out
}

pub(super) fn render(request: &PlotRequest) -> Result<String, PlotError> {
    let frame = Frame::layout(request)?;
    let (w, h) = (request.width, request.height);
    let mut svg = String::new();

    // Writing into a String cannot fail.
    let _ = writeln!(svg, r#"<?xml version="1.0" encoding="UTF-8" standalone="no"?>"#);
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="sans-serif">"#
    );
    let _ = writeln!(svg, r#"<rect width="{w}" height="{h}" fill="white"/>"#);
    let _ = writeln!(
        svg,
        r#"<text x="{:.1}" y="26" text-anchor="middle" font-size="16">{}</text>"#,
        w as f64 / 2.0,
        escape(&request.title)
    );

    for t in frame.x.ticks() {
        let x = frame.left + frame.x.fraction(t) * frame.width;
        let _ = writeln!(
            svg,
            r##"<line x1="{x:.1}" y1="{:.1}" x2="{x:.1}" y2="{:.1}" stroke="#e0e0e0"/>"##,
            frame.top,
            frame.bottom()
        );
        let _ = writeln!(
            svg,
            r#"<text x="{x:.1}" y="{:.1}" text-anchor="middle" font-size="11">{}</text>"#,
            frame.bottom() + 16.0,
            tick_label(t)
        );
    }
    for t in frame.y.ticks() {
        let y = frame.top + (1.0 - frame.y.fraction(t)) * frame.height;
        let _ = writeln!(
            svg,
            r##"<line x1="{:.1}" y1="{y:.1}" x2="{:.1}" y2="{y:.1}" stroke="#e0e0e0"/>"##,
            frame.left,
            frame.right()
        );
        let _ = writeln!(
            svg,
            r#"<text x="{:.1}" y="{:.1}" text-anchor="end" font-size="11">{}</text>"#,
            frame.left - 6.0,
            y + 4.0,
            tick_label(t)
        );
    }
    let _ = writeln!(
        svg,
        r##"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="none" stroke="#333333"/>"##,
        frame.left, frame.top, frame.width, frame.height
    );

    for (i, series) in request.series.iter().enumerate() {
        let (r, g, b) = color(i);
        for line in frame.polylines(series) {
            let points: Vec<String> = line.iter().map(|(x, y)| format!("{:.2},{:.2}", x, y)).collect();
            let _ = writeln!(
                svg,
                r#"<polyline fill="none" stroke="rgb({r},{g},{b})" stroke-width="1.5" points="{}"/>"#,
                points.join(" ")
            );
        }
        let ly = frame.top + 16.0 + 16.0 * i as f64;
        let lx = frame.right() - 140.0;
        let _ = writeln!(
            svg,
            r#"<line x1="{lx:.1}" y1="{ly:.1}" x2="{:.1}" y2="{ly:.1}" stroke="rgb({r},{g},{b})" stroke-width="2"/>"#,
            lx + 20.0
        );
        let _ = writeln!(
            svg,
            r#"<text x="{:.1}" y="{:.1}" font-size="11">{}</text>"#,
            lx + 26.0,
            ly + 4.0,
            escape(&series.name)
        );
    }

    let _ = writeln!(
        svg,
        r#"<text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="13">{}</text>"#,
        frame.left + frame.width / 2.0,
        h as f64 - 14.0,
        escape(&request.x_label)
    );
    let cy = frame.top + frame.height / 2.0;
    let _ = writeln!(
        svg,
        r#"<text x="18" y="{cy:.1}" text-anchor="middle" font-size="13" transform="rotate(-90 18 {cy:.1})">{}</text>"#,
        escape(&request.y_label)
    );
    svg.push_str("</svg>\n");
    Ok(svg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plot::Series;

    #[test]
    fn test_escapes_markup() {
        assert_eq!(escape("a<b & \"c\""), "a&lt;b &amp; &quot;c&quot;");
    }

    #[test]
    fn test_one_polyline_per_segment() {
        let request = PlotRequest::new("t", "x", "y")
            .with_series(Series::new("a", vec![0.0, 1.0, 2.0], vec![0.0, 1.0, 0.5]))
            .with_series(Series::new("b", vec![0.0, 1.0, 2.0], vec![1.0, f64::NAN, 0.0]));
        let svg = render(&request).unwrap();
        assert_eq!(svg.matches("<polyline").count(), 3);
    }
}
