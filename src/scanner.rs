//! Streaming lexer for the Rox language.
//!
//! [`Scanner`] walks the source bytes once and yields `Result<Token<'a>>`
//! items, skipping whitespace and comments.  A lexical error is yielded in
//! place of the offending character and scanning resumes right after it, so
//! one pass reports every bad character.  Exactly one `EOF` token closes the
//! stream; the iterator is fused.
//!
//! Comments are `//` to end of line and non‑nesting `/* … */` blocks; both are
//! skipped with `memchr` searches rather than byte‑by‑byte.
//!
//! ```rust
//! use rox::scanner::Scanner;
//!
//! let kinds: Vec<&str> = Scanner::new("print 123; // example")
//!     .filter_map(Result::ok)
//!     .map(|token| token.token_type.name())
//!     .collect();
//!
//! assert_eq!(kinds, ["PRINT", "NUMBER", "SEMICOLON", "EOF"]);
//! ```

use std::iter::FusedIterator;

use log::{debug, info};
use memchr::{memchr, memchr_iter, memmem};
use phf::phf_map;

use crate::error::{LoxError, Result};
use crate::token::{Token, TokenType};

/// Reserved words, resolved with a compile‑time perfect hash.
static KEYWORDS: phf::Map<&'static [u8], TokenType> = phf_map! {
    b"and"      => TokenType::AND,
    b"break"    => TokenType::BREAK,
    b"class"    => TokenType::CLASS,
    b"continue" => TokenType::CONTINUE,
    b"else"     => TokenType::ELSE,
    b"false"    => TokenType::FALSE,
    b"fun"      => TokenType::FUN,
    b"for"      => TokenType::FOR,
    b"if"       => TokenType::IF,
    b"nil"      => TokenType::NIL,
    b"or"       => TokenType::OR,
    b"print"    => TokenType::PRINT,
    b"return"   => TokenType::RETURN,
    b"super"    => TokenType::SUPER,
    b"this"     => TokenType::THIS,
    b"true"     => TokenType::TRUE,
    b"var"      => TokenType::VAR,
    b"while"    => TokenType::WHILE,
};

/// Lexer state over one source text.  Every emitted token borrows its lexeme
/// from that text.
pub struct Scanner<'a> {
    source: &'a str,
    bytes: &'a [u8],
    /// First byte of the lexeme being scanned.
    start: usize,
    /// Next byte to examine.
    curr: usize,
    line: usize,
    /// Set once `EOF` has been yielded.
    done: bool,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str) -> Self {
        info!("Scanner created over {} bytes", source.len());

        Self {
            source,
            bytes: source.as_bytes(),
            start: 0,
            curr: 0,
            line: 1,
            done: false,
        }
    }

    // ── cursor ──────────────────────────────────────────────────────────

    #[inline]
    fn is_at_end(&self) -> bool {
        self.curr >= self.bytes.len()
    }

    /// Consume one byte.  Callers check [`is_at_end`](Self::is_at_end) first.
    #[inline]
    fn advance(&mut self) -> u8 {
        let b = self.bytes[self.curr];
        self.curr += 1;
        b
    }

    /// Byte `offset` positions ahead of the cursor, or `0` past the end.
    #[inline]
    fn look(&self, offset: usize) -> u8 {
        self.bytes.get(self.curr + offset).copied().unwrap_or(0)
    }

    #[inline]
    fn eat(&mut self, expected: u8) -> bool {
        if self.look(0) == expected && !self.is_at_end() {
            self.curr += 1;
            true
        } else {
            false
        }
    }

    /// `matched` if the next byte is `=` (consuming it), else `single`.
    #[inline]
    fn with_equal(&mut self, matched: TokenType, single: TokenType) -> TokenType {
        if self.eat(b'=') {
            matched
        } else {
            single
        }
    }

    /// Lexeme boundaries always fall on ASCII bytes or whole characters, so
    /// the slice is valid UTF‑8.
    #[inline]
    fn lexeme(&self) -> &'a str {
        &self.source[self.start..self.curr]
    }

    // ── tokens ──────────────────────────────────────────────────────────

    /// Scan one lexeme starting at `self.start`.  `Ok(None)` means it was
    /// whitespace or a comment.
    fn scan_token(&mut self) -> Result<Option<TokenType>> {
        let kind = match self.advance() {
            b'(' => TokenType::LEFT_PAREN,
            b')' => TokenType::RIGHT_PAREN,
            b'{' => TokenType::LEFT_BRACE,
            b'}' => TokenType::RIGHT_BRACE,
            b',' => TokenType::COMMA,
            b'.' => TokenType::DOT,
            b'-' => TokenType::MINUS,
            b'+' => TokenType::PLUS,
            b';' => TokenType::SEMICOLON,
            b'*' => TokenType::STAR,

            b'!' => self.with_equal(TokenType::BANG_EQUAL, TokenType::BANG),
            b'=' => self.with_equal(TokenType::EQUAL_EQUAL, TokenType::EQUAL),
            b'<' => self.with_equal(TokenType::LESS_EQUAL, TokenType::LESS),
            b'>' => self.with_equal(TokenType::GREATER_EQUAL, TokenType::GREATER),

            b' ' | b'\r' | b'\t' => return Ok(None),

            b'\n' => {
                self.line += 1;
                return Ok(None);
            }

            b'/' if self.eat(b'/') => {
                self.curr = memchr(b'\n', &self.bytes[self.curr..])
                    .map_or(self.bytes.len(), |pos| self.curr + pos);
                return Ok(None);
            }

            b'/' if self.eat(b'*') => {
                self.skip_block_comment()?;
                return Ok(None);
            }

            b'/' => TokenType::SLASH,

            b'"' => self.string()?,

            b'0'..=b'9' => self.number(),

            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.identifier(),

            _ => {
                // Step over the whole character so the next lexeme starts on
                // a char boundary.
                let c: char = self.source[self.start..].chars().next().unwrap_or('?');
                self.curr = self.start + c.len_utf8();

                return Err(LoxError::lex(
                    self.line,
                    format!("Unexpected character: {}", c),
                ));
            }
        };

        Ok(Some(kind))
    }

    /// The cursor sits just past the opening `/*`.
    fn skip_block_comment(&mut self) -> Result<()> {
        let rest: &[u8] = &self.bytes[self.curr..];

        match memmem::find(rest, b"*/") {
            Some(pos) => {
                self.line += memchr_iter(b'\n', &rest[..pos]).count();
                self.curr += pos + 2;
                Ok(())
            }
            None => {
                let opened_on: usize = self.line;
                self.line += memchr_iter(b'\n', rest).count();
                self.curr = self.bytes.len();
                Err(LoxError::lex(opened_on, "Unterminated block comment."))
            }
        }
    }

    /// Multi‑line strings are allowed; there are no escapes.
    fn string(&mut self) -> Result<TokenType> {
        let rest: &[u8] = &self.bytes[self.curr..];

        let Some(len) = memchr(b'"', rest) else {
            self.line += memchr_iter(b'\n', rest).count();
            self.curr = self.bytes.len();
            return Err(LoxError::lex(self.line, "Unterminated string."));
        };

        self.line += memchr_iter(b'\n', &rest[..len]).count();

        let contents: &str = &self.source[self.curr..self.curr + len];
        self.curr += len + 1; // closing quote

        Ok(TokenType::STRING(contents.to_owned()))
    }

    /// `123` or `3.14`; a trailing `.` is not part of the number.
    fn number(&mut self) -> TokenType {
        while self.look(0).is_ascii_digit() {
            self.curr += 1;
        }

        if self.look(0) == b'.' && self.look(1).is_ascii_digit() {
            self.curr += 1;
            while self.look(0).is_ascii_digit() {
                self.curr += 1;
            }
        }

        // Digits with at most one interior dot always parse.
        TokenType::NUMBER(self.lexeme().parse().unwrap_or(0.0))
    }

    fn identifier(&mut self) -> TokenType {
        while matches!(self.look(0), b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_') {
            self.curr += 1;
        }

        KEYWORDS
            .get(&self.bytes[self.start..self.curr])
            .cloned()
            .unwrap_or(TokenType::IDENTIFIER)
    }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        while !self.is_at_end() {
            self.start = self.curr;

            match self.scan_token() {
                Ok(Some(kind)) => {
                    debug!("Scanned token ({:?}) on line {}", kind, self.line);
                    return Some(Ok(Token::new(kind, self.lexeme(), self.line)));
                }
                Ok(None) => {}
                Err(e) => return Some(Err(e)),
            }
        }

        self.done = true;

        Some(Ok(Token::new(TokenType::EOF, "", self.line)))
    }
}

impl<'a> FusedIterator for Scanner<'a> {}
