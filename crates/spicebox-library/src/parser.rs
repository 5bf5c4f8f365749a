//! `.MODEL` and `.SUBCKT` parsing.

use std::collections::BTreeMap;
use std::path::Path;

use spicebox_core::units::parse_value;

use crate::device::DeviceType;
use crate::entry::{ModelEntry, ParsedLibrary, SubcircuitEntry};
use crate::error::{Error, Result};
use crate::lexer::{Token, tokenize};
use crate::reader::logical_lines;

/// Parse library text. Problems with individual directives become warnings;
/// the rest of the file is still indexed.
pub fn parse_library(input: &str, file: &Path) -> ParsedLibrary {
    let mut parser = LibraryParser::new(file);
    for logical in logical_lines(input) {
        if let Err(err) = parser.directive(logical.line, &logical.text) {
            parser.out.warnings.push(format!("{}: {}", file.display(), err));
        }
    }
    parser.finish()
}

struct LibraryParser<'a> {
    file: &'a Path,
    /// Open subcircuits, innermost last, with the line each was opened on.
    open: Vec<(String, usize)>,
    out: ParsedLibrary,
}

impl<'a> LibraryParser<'a> {
    fn new(file: &'a Path) -> Self {
        Self {
            file,
            open: Vec::new(),
            out: ParsedLibrary::default(),
        }
    }

    fn directive(&mut self, line: usize, text: &str) -> Result<()> {
        let tokens = tokenize(text);
        let Some(Token::Word(first)) = tokens.first() else {
            return Ok(());
        };
        match first.to_ascii_uppercase().as_str() {
            ".MODEL" => self.parse_model(line, &tokens[1..]),
            ".SUBCKT" => self.parse_subckt(line, &tokens[1..]),
            ".ENDS" => self.parse_ends(line, &tokens[1..]),
            _ => Ok(()),
        }
    }

    /// .MODEL name TYPE [(] KEY=value ... [)]
    fn parse_model(&mut self, line: usize, tokens: &[Token]) -> Result<()> {
        let (name, device) = match tokens {
            [Token::Word(name), Token::Word(device), ..] => (name.clone(), device.clone()),
            _ => {
                return Err(Error::ParseError {
                    line,
                    message: ".MODEL needs a name and a device type".to_string(),
                });
            }
        };

        let (parameters, flags) = parse_assignments(&tokens[2..]);
        self.out.models.push(ModelEntry {
            name,
            device_type: DeviceType::normalize(&device, &flags),
            parameters,
            file: self.file.to_path_buf(),
            line,
            subcircuit: self.open.last().map(|(name, _)| name.clone()),
        });
        Ok(())
    }

    /// .SUBCKT name node... [PARAMS: key=value ...]
    fn parse_subckt(&mut self, line: usize, tokens: &[Token]) -> Result<()> {
        let Some(Token::Word(name)) = tokens.first() else {
            return Err(Error::ParseError {
                line,
                message: "expected subcircuit name after .SUBCKT".to_string(),
            });
        };

        let rest = &tokens[1..];
        let mut nodes = Vec::new();
        let mut params_start = rest.len();
        for (i, token) in rest.iter().enumerate() {
            match token {
                Token::Word(w) if w.eq_ignore_ascii_case("PARAMS:") => {
                    params_start = i + 1;
                    break;
                }
                Token::Word(_) if matches!(rest.get(i + 1), Some(Token::Equals)) => {
                    params_start = i;
                    break;
                }
                Token::Word(w) if w.ends_with(':') => {}
                Token::Word(w) => nodes.push(w.clone()),
                _ => {}
            }
        }
        let (parameters, _) = parse_assignments(&rest[params_start..]);

        self.out.subcircuits.push(SubcircuitEntry {
            name: name.clone(),
            nodes,
            file: self.file.to_path_buf(),
            line,
            parameters,
        });
        self.open.push((name.clone(), line));
        Ok(())
    }

    /// .ENDS [name]
    fn parse_ends(&mut self, line: usize, tokens: &[Token]) -> Result<()> {
        let Some((open_name, _)) = self.open.pop() else {
            return Err(Error::ParseError {
                line,
                message: ".ENDS without matching .SUBCKT".to_string(),
            });
        };
        if let Some(Token::Word(end_name)) = tokens.first()
            && !end_name.eq_ignore_ascii_case(&open_name)
        {
            self.out.warnings.push(format!(
                "{}: line {}: .ENDS {} closes .SUBCKT {}",
                self.file.display(),
                line,
                end_name,
                open_name
            ));
        }
        Ok(())
    }

    fn finish(mut self) -> ParsedLibrary {
        while let Some((name, line)) = self.open.pop() {
            self.out.warnings.push(format!(
                "{}: unterminated .SUBCKT {} (opened at line {}) closed at end of file",
                self.file.display(),
                name,
                line
            ));
        }
        self.out
    }
}

/// Collect `KEY=value` pairs with numeric values and bare flag words.
/// Parentheses and commas are separators; non-numeric values are skipped.
fn parse_assignments(tokens: &[Token]) -> (BTreeMap<String, f64>, Vec<String>) {
    let mut parameters = BTreeMap::new();
    let mut flags = Vec::new();
    let mut i = 0;

    while i < tokens.len() {
        match &tokens[i] {
            Token::Word(key) if matches!(tokens.get(i + 1), Some(Token::Equals)) => {
                if let Some(Token::Word(value)) = tokens.get(i + 2)
                    && let Some(v) = parse_value(value)
                {
                    parameters.insert(key.to_ascii_uppercase(), v);
                }
                i += 3;
            }
            Token::Word(word) => {
                flags.push(word.clone());
                i += 1;
            }
            _ => i += 1,
        }
    }

    (parameters, flags)
}
