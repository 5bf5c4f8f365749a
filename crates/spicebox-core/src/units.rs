//! SI-suffixed values as they appear in netlists and tool arguments.

/// Scale factors recognised after the numeric part, longest token first so
/// `MEG` and `MIL` win over `M`.
const SCALE_FACTORS: &[(&str, f64)] = &[
    ("MEG", 1e6),
    ("MIL", 25.4e-6),
    ("T", 1e12),
    ("G", 1e9),
    ("K", 1e3),
    ("M", 1e-3),
    ("U", 1e-6),
    ("N", 1e-9),
    ("P", 1e-12),
    ("F", 1e-15),
];

/// Display prefixes, largest first. Magnitudes below the last threshold are
/// printed unscaled.
const DISPLAY_PREFIXES: &[(f64, &str)] = &[
    (1e12, "T"),
    (1e9, "G"),
    (1e6, "M"),
    (1e3, "k"),
    (1.0, ""),
    (1e-3, "m"),
    (1e-6, "u"),
    (1e-9, "n"),
    (1e-12, "p"),
    (1e-15, "f"),
];

/// Parse a value such as `4.7k`, `10MEG`, `100n` or `2.5e-3`.
///
/// Matching is case-insensitive, so `M` is milli and mega must be written
/// `MEG`. Letters after the scale factor are unit names and are ignored:
/// `10uF`, `4.7kOhm` and `1V` all parse.
pub fn parse_value(s: &str) -> Option<f64> {
    let s = s.trim().to_uppercase();
    if let Ok(v) = s.parse::<f64>() {
        return Some(v);
    }

    let (number, rest) = s.split_at(numeric_prefix_len(&s));
    if number.is_empty() {
        return None;
    }
    let value: f64 = number.parse().ok()?;

    let scale = match SCALE_FACTORS.iter().find(|(token, _)| rest.starts_with(token)) {
        Some(&(_, factor)) => factor,
        None if rest.starts_with(|c: char| c.is_ascii_alphabetic()) => 1.0,
        None => return None,
    };
    Some(value * scale)
}

/// Length of the leading `[sign] digits [. digits] [E [sign] digits]` run.
fn numeric_prefix_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    let digits_from = |mut i: usize| {
        while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
            i += 1;
        }
        i
    };
    let sign_from = |i: usize| match bytes.get(i) {
        Some(b'+') | Some(b'-') => i + 1,
        _ => i,
    };

    let mantissa_start = sign_from(0);
    let end = digits_from(mantissa_start);
    if end == mantissa_start {
        return 0;
    }

    // E is an exponent only when digits follow it.
    if bytes.get(end) == Some(&b'E') {
        let exp_start = sign_from(end + 1);
        let exp_end = digits_from(exp_start);
        if exp_end > exp_start && !bytes[exp_start..exp_end].contains(&b'.') {
            return exp_end;
        }
    }
    end
}

/// Render a value with four decimals and an SI prefix, e.g. `4.7000u`.
pub fn format_value(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let magnitude = value.abs();
    match DISPLAY_PREFIXES.iter().find(|(threshold, _)| magnitude >= *threshold) {
        Some(&(threshold, prefix)) => format!("{:.4}{}", value / threshold, prefix),
        None => format!("{:.4}", value),
    }
}
