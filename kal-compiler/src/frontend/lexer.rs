use logos::Logos;
use std::fmt;

use crate::SourceLocation;

#[derive(Logos, Debug, PartialEq, Clone)]
#[logos(skip r"[ \t\r\n]+")] // Whitespace
#[logos(skip r"#[^\n]*")] // Comments run to end of line
pub enum TokenKind {
    // --- Keywords ---
    #[token("def")]
    Def,
    #[token("extern")]
    Extern,
    #[token("if")]
    If,
    #[token("then")]
    Then,
    #[token("else")]
    Else,
    #[token("for")]
    For,
    #[token("in")]
    In,
    #[token("binary")]
    Binary,
    #[token("unary")]
    Unary,
    #[token("var")]
    Var,

    // --- Identifiers and numbers ---
    #[regex(r"[A-Za-z][A-Za-z0-9]*", |lex| lex.slice().to_string())]
    Ident(String),

    #[regex(r"[0-9.]+", parse_number)]
    Number(f64),

    // Any other single character: operators, punctuation, and whatever a
    // user-defined operator declaration may introduce.
    #[regex(r".", |lex| lex.slice().chars().next().unwrap(), priority = 1)]
    Char(char),

    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Def => write!(f, "'def'"),
            TokenKind::Extern => write!(f, "'extern'"),
            TokenKind::If => write!(f, "'if'"),
            TokenKind::Then => write!(f, "'then'"),
            TokenKind::Else => write!(f, "'else'"),
            TokenKind::For => write!(f, "'for'"),
            TokenKind::In => write!(f, "'in'"),
            TokenKind::Binary => write!(f, "'binary'"),
            TokenKind::Unary => write!(f, "'unary'"),
            TokenKind::Var => write!(f, "'var'"),
            TokenKind::Ident(s) => write!(f, "identifier '{}'", s),
            TokenKind::Number(n) => write!(f, "number {}", n),
            TokenKind::Char(c) => write!(f, "'{}'", c),
            TokenKind::Eof => write!(f, "end of input"),
        }
    }
}

/// A token together with the location of its first character.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub loc: SourceLocation,
}

/// Numeric literals allow repeated dots; strtod-style, the longest valid
/// prefix decides the value ("1.2.3" reads as 1.2).
fn parse_number(lex: &mut logos::Lexer<TokenKind>) -> f64 {
    let slice = lex.slice();
    slice.parse().unwrap_or_else(|_| {
        let mut end = 0;
        let mut dot_seen = false;
        for (i, c) in slice.char_indices() {
            if c == '.' {
                if dot_seen {
                    break;
                }
                dot_seen = true;
            }
            end = i + 1;
        }
        slice[..end].parse().unwrap_or(0.0)
    })
}

/// Incremental byte-offset to line/column conversion.
///
/// A `\n` or `\r` bumps the line and resets the column; any other byte bumps
/// the column. The location of the byte at `offset` is the state after
/// consuming it, which puts the first character of a line in column 1.
struct LocationTracker<'s> {
    bytes: &'s [u8],
    pos: usize,
    line: u32,
    column: u32,
}

impl<'s> LocationTracker<'s> {
    fn new(source: &'s str) -> Self {
        Self {
            bytes: source.as_bytes(),
            pos: 0,
            line: 1,
            column: 0,
        }
    }

    fn location_of(&mut self, offset: usize) -> SourceLocation {
        while self.pos <= offset && self.pos < self.bytes.len() {
            match self.bytes[self.pos] {
                b'\n' | b'\r' => {
                    self.line += 1;
                    self.column = 0;
                }
                _ => self.column += 1,
            }
            self.pos += 1;
        }
        SourceLocation {
            line: self.line,
            column: self.column,
        }
    }
}

/// Tokenize a whole source text.
///
/// Lexing is total: unrecognized bytes come out as [`TokenKind::Char`], and
/// the returned vector always ends with exactly one [`TokenKind::Eof`].
pub fn lex(source: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut tracker = LocationTracker::new(source);
    let mut lexer = TokenKind::lexer(source);

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        let loc = tracker.location_of(span.start);
        match result {
            Ok(kind) => tokens.push(Token { kind, loc }),
            Err(()) => {
                // The catch-all rule accepts any non-skipped character, so
                // this only fires on input logos refuses outright; keep the
                // lexer total by degrading to a plain character token.
                let c = source[span].chars().next().unwrap_or('\0');
                tokens.push(Token {
                    kind: TokenKind::Char(c),
                    loc,
                });
            }
        }
    }

    let end = tracker.location_of(source.len());
    tokens.push(Token {
        kind: TokenKind::Eof,
        loc: end,
    });
    tokens
}
