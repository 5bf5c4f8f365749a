//! Logical-line reader for SPICE library text.
//!
//! Joins `+` continuation lines onto the preceding line, drops `*` comment
//! lines and strips `;` / `$` inline comments. Each logical line keeps the
//! number of the physical line it started on.

/// One logical line of a library file.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalLine {
    pub line: usize,
    pub text: String,
}

/// Split library text into logical lines.
pub fn logical_lines(input: &str) -> Vec<LogicalLine> {
    let mut lines: Vec<LogicalLine> = Vec::new();

    for (index, raw) in input.lines().enumerate() {
        let line = index + 1;
        let trimmed = raw.trim_start();

        if trimmed.starts_with('*') {
            continue;
        }
        let content = strip_inline_comment(trimmed).trim_end();

        if let Some(rest) = content.strip_prefix('+') {
            if let Some(last) = lines.last_mut() {
                last.text.push(' ');
                last.text.push_str(rest.trim());
            }
            // A continuation with nothing to continue is ignored.
            continue;
        }
        if content.is_empty() {
            continue;
        }
        lines.push(LogicalLine {
            line,
            text: content.to_string(),
        });
    }

    lines
}

/// Remove a `;` or `$` comment. `$` only starts a comment after whitespace,
/// so names like `Q$1` survive.
fn strip_inline_comment(line: &str) -> &str {
    let mut prev_space = true;
    for (i, c) in line.char_indices() {
        match c {
            ';' => return &line[..i],
            '$' if prev_space => return &line[..i],
            _ => {}
        }
        prev_space = c.is_whitespace();
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_continuation_and_comments() {
        let text = "* header\n.MODEL D1 D(IS=1e-14\n+ N=1.8) ; trailing\n\n$ whole line\n.END\n";
        let lines = logical_lines(text);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].line, 2);
        assert_eq!(lines[0].text, ".MODEL D1 D(IS=1e-14 N=1.8)");
        assert_eq!(lines[1].text, ".END");
    }

    #[test]
    fn test_dollar_inside_name_kept() {
        let lines = logical_lines("XQ$1 a b c SUB $ comment");
        assert_eq!(lines[0].text, "XQ$1 a b c SUB");
    }

    #[test]
    fn test_indented_comment_and_crlf() {
        let lines = logical_lines("   * indented\r\n.SUBCKT X a b\r\n.ENDS\r\n");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, ".SUBCKT X a b");
    }
}
