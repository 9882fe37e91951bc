use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ThriftError;
use crate::location::Location;
use crate::utils::{error, quote};

lazy_static! {
    pub static ref TOKEN_REGEX: Regex = Regex::new(concat!(
        r"(/\*[\s\S]*?\*/",
        r"|//[^\n]*",
        r"|#[^\n]*",
        r#"|"(?:[^"\\\n]|\\.)*""#,
        r"|'(?:[^'\\\n]|\\.)*'",
        r"|[+-]?0[xX][0-9A-Fa-f]+\b",
        r"|[+-]?(?:\d+\.\d*|\.\d+)(?:[eE][+-]?\d+)?",
        r"|[+-]?\d+[eE][+-]?\d+",
        r"|[+-]?\d+",
        r"|[A-Za-z_][A-Za-z0-9_.]*",
        r"|[{}()<>\[\],;:=*]",
        r"|\s+)",
    ))
    .unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    Integer,
    Double,
    /// A quoted string, still carrying its quotes and escapes.
    Literal,
    Symbol,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind:   TokenKind,
    pub text:   String,
    pub line:   usize,
    pub column: usize,
}

impl Token {
    pub fn is_symbol(&self, symbol: &str) -> bool {
        self.kind == TokenKind::Symbol && self.text == symbol
    }

    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.kind == TokenKind::Identifier && self.text == keyword
    }
}

/// A comment, kept apart from the token stream so the parser can attach it to
/// the element it documents.
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub text:     String,
    pub line:     usize,
    pub column:   usize,
    pub end_line: usize,
}

impl Comment {
    /// The comment body without its `//`, `#` or `/* */` markers and without
    /// the leading `*` of each block comment line.
    pub fn doc(&self) -> String {
        let text = self.text.as_str();
        if let Some(rest) = text.strip_prefix("//") {
            return rest.trim().to_owned();
        }
        if let Some(rest) = text.strip_prefix('#') {
            return rest.trim().to_owned();
        }

        let body = text.strip_prefix("/*").unwrap_or(text);
        let body = body.strip_suffix("*/").unwrap_or(body);
        let body = body.strip_prefix('*').unwrap_or(body);

        let lines: Vec<&str> = body
            .lines()
            .map(|line| {
                let line = line.trim();
                line.strip_prefix('*').map(str::trim).unwrap_or(line)
            })
            .collect();

        let start = lines.iter().position(|line| !line.is_empty());
        let end = lines.iter().rposition(|line| !line.is_empty());
        match (start, end) {
            (Some(start), Some(end)) => lines[start..=end].join("\n"),
            _ => String::new(),
        }
    }
}

#[derive(Debug)]
pub struct TokenStream {
    pub tokens:   Vec<Token>,
    pub comments: Vec<Comment>,
}

fn classify(part: &str) -> Option<TokenKind> {
    let first = part.chars().next()?;
    let unsigned = part.trim_start_matches(['+', '-']);
    Some(match first {
        '"' | '\'' => TokenKind::Literal,
        'A'..='Z' | 'a'..='z' | '_' => TokenKind::Identifier,
        '0'..='9' | '+' | '-' | '.' => {
            if unsigned.starts_with("0x") || unsigned.starts_with("0X") {
                TokenKind::Integer
            } else if part.contains(['.', 'e', 'E']) {
                TokenKind::Double
            } else {
                TokenKind::Integer
            }
        }
        c if c.is_whitespace() => return None,
        _ => TokenKind::Symbol,
    })
}

/// Splits `text` into tokens and comments. `location` names the file for
/// error messages.
pub fn tokenize(text: &str, location: &Location) -> Result<TokenStream, ThriftError> {
    let mut tokens = Vec::new();
    let mut comments = Vec::new();
    let mut line = 1;
    let mut column = 1;
    let mut last_end = 0;

    for mat in TOKEN_REGEX.find_iter(text) {
        let start = mat.start();
        let end = mat.end();
        let part = mat.as_str();

        if start > last_end {
            return Err(unexpected(&text[last_end..start], &location.at(line, column)));
        }

        let newline_count = part.matches('\n').count();
        if part.starts_with("/*") || part.starts_with("//") || part.starts_with('#') {
            comments.push(Comment {
                text: part.to_owned(),
                line,
                column,
                end_line: line + newline_count,
            });
        } else if let Some(kind) = classify(part) {
            tokens.push(Token {
                kind,
                text: part.to_owned(),
                line,
                column,
            });
        }

        if newline_count > 0 {
            line += newline_count;
            if let Some(last_line_part) = part.split('\n').last() {
                column = last_line_part.chars().count() + 1;
            }
        } else {
            column += part.chars().count();
        }

        last_end = end;
    }

    if last_end != text.len() {
        return Err(unexpected(&text[last_end..], &location.at(line, column)));
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        text: String::new(),
        line,
        column,
    });
    Ok(TokenStream { tokens, comments })
}

fn unexpected(text: &str, location: &Location) -> ThriftError {
    if text.starts_with('"') || text.starts_with('\'') {
        error("Unterminated string literal", location)
    } else if text.starts_with("/*") {
        error("Unterminated comment", location)
    } else {
        error(&format!("Syntax error: {}", quote(text)), location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location() -> Location {
        Location::new("test.thrift", 0, 0)
    }

    fn kinds_and_text(input: &str) -> Vec<(TokenKind, String)> {
        tokenize(input, &location())
            .unwrap()
            .tokens
            .into_iter()
            .map(|t| (t.kind, t.text))
            .collect()
    }

    #[test]
    fn test_tokenize_simple() {
        let input = "const i32 x = 10;";
        let expected = vec![
            Token { kind: TokenKind::Identifier, text: "const".into(), line: 1, column: 1 },
            Token { kind: TokenKind::Identifier, text: "i32".into(),   line: 1, column: 7 },
            Token { kind: TokenKind::Identifier, text: "x".into(),     line: 1, column: 11 },
            Token { kind: TokenKind::Symbol,     text: "=".into(),     line: 1, column: 13 },
            Token { kind: TokenKind::Integer,    text: "10".into(),    line: 1, column: 15 },
            Token { kind: TokenKind::Symbol,     text: ";".into(),     line: 1, column: 17 },
            Token { kind: TokenKind::Eof,        text: "".into(),      line: 1, column: 18 },
        ];
        let got = tokenize(input, &location()).unwrap();
        assert_eq!(got.tokens, expected);
        assert!(got.comments.is_empty());
    }

    #[test]
    fn test_tokenize_numbers() {
        let got = kinds_and_text("-0x1F 3.5 -2 1e10 .5 +7");
        let expected = vec![
            (TokenKind::Integer, "-0x1F".to_owned()),
            (TokenKind::Double, "3.5".to_owned()),
            (TokenKind::Integer, "-2".to_owned()),
            (TokenKind::Double, "1e10".to_owned()),
            (TokenKind::Double, ".5".to_owned()),
            (TokenKind::Integer, "+7".to_owned()),
            (TokenKind::Eof, "".to_owned()),
        ];
        assert_eq!(got, expected);
    }

    #[test]
    fn test_tokenize_literals_and_dotted_names() {
        let got = kinds_and_text(r#"include "a\"b.thrift" common.Point 'x'"#);
        assert_eq!(got[1], (TokenKind::Literal, r#""a\"b.thrift""#.to_owned()));
        assert_eq!(got[2], (TokenKind::Identifier, "common.Point".to_owned()));
        assert_eq!(got[3], (TokenKind::Literal, "'x'".to_owned()));
    }

    #[test]
    fn test_comments_are_collected() {
        let input = "/**\n * Doc line one.\n * Line two.\n */\nstruct S {} // trailing\n# hash\n";
        let got = tokenize(input, &location()).unwrap();
        assert_eq!(got.comments.len(), 3);
        assert_eq!(got.comments[0].doc(), "Doc line one.\nLine two.");
        assert_eq!(got.comments[0].line, 1);
        assert_eq!(got.comments[0].end_line, 4);
        assert_eq!(got.comments[1].doc(), "trailing");
        assert_eq!(got.comments[1].line, 5);
        assert_eq!(got.comments[2].doc(), "hash");
        assert_eq!(got.tokens[0].line, 5);
    }

    #[test]
    fn test_unterminated_literal() {
        let err = tokenize("const string s = \"abc\nstruct", &location()).unwrap_err();
        match err {
            ThriftError::ParseError { msg, location } => {
                assert_eq!(msg, "Unterminated string literal");
                assert_eq!((location.line, location.column), (1, 18));
            }
            other => panic!("expected a ParseError but got {:?}", other),
        }
    }

    #[test]
    fn test_tokenize_unexpected_text() {
        let err = tokenize("struct S @ {}", &location()).unwrap_err();
        assert!(
            matches!(err, ThriftError::ParseError { .. }),
            "expected a ParseError but got {:?}",
            err
        );
    }
}
