//! Formula tokenizer

use crate::error::LexError;
use crate::operator::BinaryOperator;

/// Lexical class and payload of a token
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(f64),
    /// Reference key, delimiting quotes included
    StringLiteral(String),
    /// Function name; always followed by [`TokenKind::LeftParen`]
    Identifier(String),
    /// `+ - * / ^ %`; `+`/`-` are classified unary or binary by the converter
    Operator(BinaryOperator),
    /// Pre-classified prefix minus. Never produced by [`tokenize`].
    UnaryMinus,
    LeftParen,
    RightParen,
    Comma,
}

/// A token with its byte offset in the source text
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub position: usize,
}

impl Token {
    pub fn new(kind: TokenKind, position: usize) -> Self {
        Self { kind, position }
    }
}

/// Split formula text into tokens
///
/// # Example
/// ```rust
/// use kpi_formula::lexer::{tokenize, TokenKind};
///
/// let tokens = tokenize("SUM(2, \"x\")").unwrap();
/// assert_eq!(tokens[0].kind, TokenKind::Identifier("SUM".into()));
/// assert_eq!(tokens[4].kind, TokenKind::StringLiteral("\"x\"".into()));
/// ```
pub fn tokenize(text: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(text).run()
}

struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn run(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace();
            let Some(c) = self.peek_char() else {
                break;
            };
            let start = self.pos;

            let kind = match c {
                '(' => self.single(TokenKind::LeftParen),
                ')' => self.single(TokenKind::RightParen),
                ',' => self.single(TokenKind::Comma),
                '"' => self.scan_string()?,
                c if c.is_ascii_digit() || c == '.' => self.scan_number()?,
                c if c.is_ascii_alphabetic() => self.scan_identifier()?,
                c => match BinaryOperator::from_symbol(c) {
                    Some(op) => self.single(TokenKind::Operator(op)),
                    None => {
                        return Err(LexError::UnexpectedCharacter {
                            ch: c,
                            position: start,
                        })
                    }
                },
            };

            tokens.push(Token::new(kind, start));
        }

        Ok(tokens)
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.advance();
        kind
    }

    fn scan_string(&mut self) -> Result<TokenKind, LexError> {
        let start = self.pos;
        self.advance(); // Opening quote

        match self.input[self.pos..].find('"') {
            Some(offset) => {
                self.pos += offset + 1;
                Ok(TokenKind::StringLiteral(self.input[start..self.pos].to_string()))
            }
            None => Err(LexError::UnterminatedString { position: start }),
        }
    }

    fn scan_number(&mut self) -> Result<TokenKind, LexError> {
        let start = self.pos;
        while self
            .peek_char()
            .map_or(false, |c| c.is_ascii_digit() || c == '.')
        {
            self.advance();
        }

        let text = &self.input[start..self.pos];
        let malformed = || LexError::MalformedNumber {
            text: text.to_string(),
            position: start,
        };

        // At most one decimal point, and it must be followed by a digit
        if text.matches('.').count() > 1 || text.ends_with('.') {
            return Err(malformed());
        }
        text.parse().map(TokenKind::Number).map_err(|_| malformed())
    }

    fn scan_identifier(&mut self) -> Result<TokenKind, LexError> {
        let start = self.pos;
        while self
            .peek_char()
            .map_or(false, |c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.advance();
        }

        let name = &self.input[start..self.pos];
        if self.peek_char() != Some('(') {
            return Err(LexError::BareIdentifier {
                name: name.to_string(),
                position: start,
            });
        }
        Ok(TokenKind::Identifier(name.to_string()))
    }

    // === Helper methods ===

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek_char() {
            self.pos += c.len_utf8();
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek_char().map_or(false, |c| c.is_whitespace()) {
            self.advance();
        }
    }
}
