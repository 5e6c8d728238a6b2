//! Lexical scanner for Tau source text
//!
//! Hand-rolled, single pass. `//` starts a line comment, whitespace
//! separates tokens, and the two-character operators (`<= >= == !=`) are
//! matched greedily. Identifiers are a letter followed by letters or
//! digits; a keyword wins over an identifier of the same spelling.
//! Anything outside the vocabulary is a lex error at its position.

use crate::error::{CompileError, Result};
use crate::tokens::{Coord, Span, Token, TokenKind};

/// Token stream over a source string, consumed via [`peek`]/[`advance`].
///
/// [`peek`]: Scanner::peek
/// [`advance`]: Scanner::advance
#[derive(Debug)]
pub struct Scanner {
    tokens: Vec<Token>,
    pos: usize,
}

impl Scanner {
    pub fn new(source: &str) -> Result<Self> {
        Ok(Scanner {
            tokens: tokenize(source)?,
            pos: 0,
        })
    }

    /// The next unconsumed token. Once the input is exhausted this is the
    /// EOF token, which is never consumed past.
    pub fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    pub fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    /// All tokens including the trailing EOF, for `--stopafter scanner`.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }
}

fn tokenize(source: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut line = 1;
    let mut col = 1;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c == '/' && chars.get(i + 1) == Some(&'/') {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
            continue;
        }
        match c {
            '\n' => {
                line += 1;
                col = 1;
                i += 1;
            }
            ' ' | '\t' | '\r' => {
                col += 1;
                i += 1;
            }
            c if c.is_ascii_alphabetic() => {
                let start = Coord::new(col, line);
                let mut text = String::new();
                while i < chars.len() && chars[i].is_ascii_alphanumeric() {
                    text.push(chars[i]);
                    i += 1;
                    col += 1;
                }
                let span = Span::new(start, Coord::new(col, line));
                let kind = TokenKind::keyword(&text).unwrap_or(TokenKind::Id);
                tokens.push(Token::new(kind, text, span));
            }
            c if c.is_ascii_digit() => {
                let start = Coord::new(col, line);
                let mut text = String::new();
                while i < chars.len() && chars[i].is_ascii_digit() {
                    text.push(chars[i]);
                    i += 1;
                    col += 1;
                }
                let span = Span::new(start, Coord::new(col, line));
                tokens.push(Token::new(TokenKind::IntLit, text, span));
            }
            _ => {
                let start = Coord::new(col, line);
                let two: String = chars[i..(i + 2).min(chars.len())].iter().collect();
                let (kind, text) = match two.as_str() {
                    "<=" => (Some(TokenKind::LessEqual), two.clone()),
                    ">=" => (Some(TokenKind::GreaterEqual), two.clone()),
                    "==" => (Some(TokenKind::EqualEqual), two.clone()),
                    "!=" => (Some(TokenKind::BangEqual), two.clone()),
                    _ => (single_punctuation(c), c.to_string()),
                };
                let kind = match kind {
                    Some(kind) => kind,
                    None => {
                        let span = Span::new(start, start);
                        return Err(CompileError::new(
                            format!("Not in language: {:?}", c),
                            span,
                        ));
                    }
                };
                i += text.len();
                col += text.len();
                let span = Span::new(start, Coord::new(col, line));
                tokens.push(Token::new(kind, text, span));
            }
        }
    }

    let eof = Coord::new(col, line);
    tokens.push(Token::new(TokenKind::Eof, "", Span::new(eof, eof)));
    Ok(tokens)
}

fn single_punctuation(c: char) -> Option<TokenKind> {
    let kind = match c {
        ':' => TokenKind::Colon,
        ',' => TokenKind::Comma,
        '&' => TokenKind::Ampersand,
        '*' => TokenKind::Star,
        '/' => TokenKind::Slash,
        '%' => TokenKind::Percent,
        '<' => TokenKind::Less,
        '>' => TokenKind::Greater,
        '|' => TokenKind::Pipe,
        '=' => TokenKind::Equal,
        '+' => TokenKind::Plus,
        '-' => TokenKind::Minus,
        '[' => TokenKind::LBracket,
        ']' => TokenKind::RBracket,
        '{' => TokenKind::LBrace,
        '}' => TokenKind::RBrace,
        '(' => TokenKind::LParen,
        ')' => TokenKind::RParen,
        _ => return None,
    };
    Some(kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let scanner = Scanner::new(source).unwrap();
        scanner.tokens().iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_keywords_and_identifiers() {
        assert_eq!(
            kinds("while whilst x1"),
            vec![
                TokenKind::While,
                TokenKind::Id,
                TokenKind::Id,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_two_char_operators_are_greedy() {
        assert_eq!(
            kinds("<= < == = != >= >"),
            vec![
                TokenKind::LessEqual,
                TokenKind::Less,
                TokenKind::EqualEqual,
                TokenKind::Equal,
                TokenKind::BangEqual,
                TokenKind::GreaterEqual,
                TokenKind::Greater,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_integer_then_letter_splits() {
        assert_eq!(
            kinds("123abc"),
            vec![TokenKind::IntLit, TokenKind::Id, TokenKind::Eof]
        );
    }

    #[test]
    fn test_comments_run_to_end_of_line() {
        assert_eq!(
            kinds("x // all of this vanishes == != \ny"),
            vec![TokenKind::Id, TokenKind::Id, TokenKind::Eof]
        );
    }

    #[test]
    fn test_adjacent_punctuation() {
        assert_eq!(
            kinds("f(a,b)"),
            vec![
                TokenKind::Id,
                TokenKind::LParen,
                TokenKind::Id,
                TokenKind::Comma,
                TokenKind::Id,
                TokenKind::RParen,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_spans_are_one_indexed() {
        let scanner = Scanner::new("x = 1\ny").unwrap();
        let tokens = scanner.tokens();
        assert_eq!(tokens[0].span.start, Coord::new(1, 1));
        assert_eq!(tokens[1].span.start, Coord::new(3, 1));
        assert_eq!(tokens[2].span.start, Coord::new(5, 1));
        assert_eq!(tokens[3].span.start, Coord::new(1, 2));
    }

    #[test]
    fn test_bare_bang_is_a_lex_error() {
        let err = Scanner::new("a ! b").unwrap_err();
        assert_eq!(err.msg, "Not in language: '!'");
        assert_eq!(err.span.start, Coord::new(3, 1));
    }

    #[test]
    fn test_unknown_character_is_a_lex_error() {
        let err = Scanner::new("x = $").unwrap_err();
        assert_eq!(err.msg, "Not in language: '$'");
    }
}
