use crate::error::LexError;
use crate::token::{Token, TokenType};
use log::{debug, trace};
use phf::phf_map;
use std::iter::Peekable;
use std::str::CharIndices;

// Note: current becomes self.iter.peek()?.0
struct Scanner<'a> {
    source: &'a str,
    iter: Peekable<CharIndices<'a>>,
    start: usize,
    line: usize,
    column: usize,
    start_line: usize,
    start_column: usize,
}

/// Turns source text into tokens, always ending with `EOF`.
///
/// Scanning carries on past a bad character so that every lexical error in
/// the source is reported at once.
pub fn tokenize(source: &str) -> Result<Vec<Token>, Vec<LexError>> {
    let mut scanner = Scanner {
        source,
        iter: source.char_indices().peekable(),
        start: 0,
        line: 1,
        column: 1,
        start_line: 1,
        start_column: 1,
    };
    let mut tokens: Vec<Token> = Vec::new();
    let mut errors: Vec<LexError> = Vec::new();

    while let Some(&(idx, _)) = scanner.iter.peek() {
        scanner.start = idx;
        scanner.start_line = scanner.line;
        scanner.start_column = scanner.column;
        match scanner.scan_token() {
            Ok(Some(token)) => {
                trace!("{:?}", token);
                tokens.push(token);
            }
            Ok(None) => (),
            Err(e) => errors.push(e),
        }
    }
    tokens.push(Token {
        tokentype: TokenType::EOF,
        lexeme: String::from(""),
        line: scanner.line,
        column: scanner.column,
    });

    if errors.is_empty() {
        debug!("scanned {} tokens", tokens.len());
        Ok(tokens)
    } else {
        debug!("scanning failed with {} errors", errors.len());
        Err(errors)
    }
}

impl<'a> Scanner<'a> {
    fn scan_token(&mut self) -> Result<Option<Token>, LexError> {
        let c = match self.advance() {
            Some((_, c)) => c,
            None => return Ok(None),
        };
        let tokentype = match c {
            ' ' | '\r' | '\t' | '\n' => return Ok(None),
            '/' => {
                if self.next_if('/') {
                    while let Some((_, c)) = self.iter.peek() {
                        if *c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                    return Ok(None);
                }
                TokenType::Slash
            }
            '"' | '\'' => return self.string(c).map(Some),
            '0'..='9' => return self.number().map(Some),
            'a'..='z' | 'A'..='Z' | '_' => return Ok(Some(self.identifier())),
            '+' => {
                if self.next_if_str("+>") {
                    TokenType::IncrementFlow
                } else if self.next_if('+') {
                    TokenType::PlusPlus
                } else {
                    TokenType::Plus
                }
            }
            '@' => {
                if self.next_if('>') {
                    TokenType::FlowChannel
                } else {
                    TokenType::At
                }
            }
            '<' => {
                if self.next_if('@') {
                    TokenType::FlowChannelRev
                } else if self.next_if('=') {
                    TokenType::FlowBackward
                } else if self.next_if('>') {
                    TokenType::FlowBoth
                } else {
                    TokenType::Less
                }
            }
            '=' => {
                if self.next_if('>') {
                    TokenType::FlowForward
                } else if self.next_if('=') {
                    TokenType::EqualEqual
                } else {
                    TokenType::Equal
                }
            }
            '>' => {
                if self.next_if('=') {
                    TokenType::GreaterEqual
                } else {
                    TokenType::Greater
                }
            }
            '[' => {
                if self.next_if('|') {
                    TokenType::PoolStart
                } else if self.next_if(':') {
                    TokenType::KeyedStart
                } else {
                    return Err(self.error("Unexpected character '['"));
                }
            }
            '|' => {
                if self.next_if(']') {
                    TokenType::PoolEnd
                } else {
                    TokenType::Pipe
                }
            }
            ':' => {
                if self.next_if(']') {
                    TokenType::KeyedEnd
                } else {
                    TokenType::Colon
                }
            }
            '?' => {
                if self.next_if(':') {
                    TokenType::Quantum
                } else {
                    TokenType::Question
                }
            }
            '!' => {
                if self.next_if('=') {
                    TokenType::BangEqual
                } else {
                    return Err(self.error("Unexpected character '!'"));
                }
            }
            '~' => TokenType::Tilde,
            '#' => TokenType::Hash,
            '(' => TokenType::LeftParen,
            ')' => TokenType::RightParen,
            '{' => TokenType::LeftBrace,
            '}' => TokenType::RightBrace,
            ',' => TokenType::Comma,
            '.' => TokenType::Dot,
            ';' => TokenType::Semicolon,
            '-' => TokenType::Minus,
            '*' => TokenType::Star,
            '%' => TokenType::Percent,
            other => return Err(self.error(format!("Unexpected character '{}'", other))),
        };
        Ok(Some(self.token(tokentype)))
    }
    fn current(&mut self) -> usize {
        match self.iter.peek() {
            None => self.source.len(),
            Some((idx, _)) => *idx,
        }
    }
    fn lexeme(&mut self) -> &'a str {
        let current = self.current();
        &self.source[self.start..current]
    }
    fn token(&mut self, tokentype: TokenType) -> Token {
        Token {
            tokentype,
            lexeme: self.lexeme().to_string(),
            line: self.start_line,
            column: self.start_column,
        }
    }
    fn error(&self, message: impl Into<String>) -> LexError {
        LexError::new(message, self.start_line, self.start_column)
    }
    fn advance(&mut self) -> Option<(usize, char)> {
        let (idx, c) = self.iter.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some((idx, c))
    }
    fn next_if(&mut self, expected: char) -> bool {
        if let Some((_, c)) = self.iter.peek() {
            if *c == expected {
                self.advance();
                return true;
            }
        }
        false
    }
    fn next_if_str(&mut self, expected: &str) -> bool {
        let mut lookahead = self.iter.clone();
        for e in expected.chars() {
            match lookahead.next() {
                Some((_, c)) if c == e => (),
                _ => return false,
            }
        }
        for _ in expected.chars() {
            self.advance();
        }
        true
    }
    fn string(&mut self, quote: char) -> Result<Token, LexError> {
        let mut value = String::new();
        let mut bad_escape: Option<LexError> = None;
        loop {
            match self.advance() {
                None => return Err(self.error("Unterminated string.")),
                Some((_, c)) if c == quote => break,
                Some((_, '\\')) => {
                    let (line, column) = (self.line, self.column);
                    match self.advance() {
                        Some((_, 'n')) => value.push('\n'),
                        Some((_, 't')) => value.push('\t'),
                        Some((_, 'r')) => value.push('\r'),
                        Some((_, '0')) => value.push('\0'),
                        Some((_, '\\')) => value.push('\\'),
                        Some((_, '"')) => value.push('"'),
                        Some((_, '\'')) => value.push('\''),
                        Some((_, other)) => {
                            bad_escape.get_or_insert_with(|| {
                                LexError::new(
                                    format!("Unknown escape sequence '\\{}'", other),
                                    line,
                                    column - 1,
                                )
                            });
                        }
                        None => return Err(self.error("Unterminated string.")),
                    }
                }
                Some((_, c)) => value.push(c),
            }
        }
        match bad_escape {
            Some(e) => Err(e),
            None => Ok(self.token(TokenType::String(value))),
        }
    }
    fn number(&mut self) -> Result<Token, LexError> {
        let mut dots = 0;
        while let Some((_, c)) = self.iter.peek() {
            match c {
                '0'..='9' => {
                    self.advance();
                }
                '.' => {
                    dots += 1;
                    self.advance();
                }
                _ => {
                    break;
                }
            }
        }

        let text = self.lexeme();
        match dots {
            0 => match text.parse::<i64>() {
                Ok(n) => Ok(self.token(TokenType::Integer(n))),
                Err(_) => Err(self.error(format!("Integer literal '{}' is out of range", text))),
            },
            1 => match text.parse::<f64>() {
                Ok(x) => Ok(self.token(TokenType::Float(x))),
                Err(_) => Err(self.error(format!("Malformed number literal '{}'", text))),
            },
            _ => Err(self.error(format!("Malformed number literal '{}'", text))),
        }
    }
    fn identifier(&mut self) -> Token {
        while let Some((_, c)) = self.iter.peek() {
            match c {
                '0'..='9' | 'a'..='z' | 'A'..='Z' | '_' => {
                    self.advance();
                }
                _ => {
                    break;
                }
            }
        }
        let text = self.lexeme();
        match KEYWORDS.get(text) {
            None => self.token(TokenType::Identifier(text.to_string())),
            Some(x) => self.token(x.clone()),
        }
    }
}

static KEYWORDS: phf::Map<&'static str, TokenType> = phf_map! {
    "context" => TokenType::Context,
    "reaction" => TokenType::Reaction,
    "gate" => TokenType::Gate,
    "true" => TokenType::True,
    "false" => TokenType::False,
    "null" => TokenType::Null,
    "else" => TokenType::Else,
    "in" => TokenType::In,
    "out" => TokenType::Out,
};
