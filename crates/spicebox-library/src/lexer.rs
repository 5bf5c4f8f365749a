//! Tokenizer for one logical library line.

/// Token types on a `.MODEL` or `.SUBCKT` line.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Name, node, keyword or value (`D1N4001`, `1e-14`, `PARAMS:`).
    Word(String),
    /// Brace expression kept verbatim (`{W*2}`).
    Expr(String),
    Equals,
    LParen,
    RParen,
    Comma,
}

/// Split a logical line into tokens.
pub fn tokenize(line: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '=' => {
                chars.next();
                tokens.push(Token::Equals);
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            '{' | '\'' => {
                let close = if c == '{' { '}' } else { '\'' };
                chars.next();
                let mut depth = 1;
                let mut expr = String::new();
                for ch in chars.by_ref() {
                    if c == '{' && ch == '{' {
                        depth += 1;
                    } else if ch == close {
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                    }
                    expr.push(ch);
                }
                tokens.push(Token::Expr(expr));
            }
            _ => {
                let mut word = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_whitespace() || matches!(ch, '=' | '(' | ')' | ',' | '{') {
                        break;
                    }
                    word.push(ch);
                    chars.next();
                }
                tokens.push(Token::Word(word));
            }
        }
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(s: &str) -> Token {
        Token::Word(s.to_string())
    }

    #[test]
    fn test_model_line() {
        let tokens = tokenize(".MODEL D1 D(IS=1e-14 N = 1.8)");
        assert_eq!(
            tokens,
            vec![
                word(".MODEL"),
                word("D1"),
                word("D"),
                Token::LParen,
                word("IS"),
                Token::Equals,
                word("1e-14"),
                word("N"),
                Token::Equals,
                word("1.8"),
                Token::RParen,
            ]
        );
    }

    #[test]
    fn test_brace_expression() {
        let tokens = tokenize("PARAMS: W={L*2} R=1k");
        assert_eq!(tokens[0], word("PARAMS:"));
        assert_eq!(tokens[3], Token::Expr("L*2".to_string()));
        assert_eq!(tokens[6], word("1k"));
    }
}
