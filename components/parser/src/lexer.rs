//! Lexer - tokenizes program source into tokens

use crate::error::syntax_error;
use core_types::{CompileError, SourcePosition};
use std::time::Duration;

/// Reserved words
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    /// counter keyword
    Counter,
    /// gauge keyword
    Gauge,
    /// text keyword
    Text,
    /// timer keyword, a gauge alias
    Timer,
    /// hidden keyword
    Hidden,
    /// by keyword
    By,
    /// as keyword
    As,
    /// def keyword
    Def,
    /// next keyword, the decorator placeholder
    Next,
    /// const keyword
    Const,
    /// else keyword
    Else,
    /// otherwise keyword
    Otherwise,
    /// del keyword
    Del,
    /// after keyword
    After,
    /// stop keyword
    Stop,
}

impl Keyword {
    fn from_identifier(name: &str) -> Option<Keyword> {
        let keyword = match name {
            "counter" => Keyword::Counter,
            "gauge" => Keyword::Gauge,
            "text" => Keyword::Text,
            "timer" => Keyword::Timer,
            "hidden" => Keyword::Hidden,
            "by" => Keyword::By,
            "as" => Keyword::As,
            "def" => Keyword::Def,
            "next" => Keyword::Next,
            "const" => Keyword::Const,
            "else" => Keyword::Else,
            "otherwise" => Keyword::Otherwise,
            "del" => Keyword::Del,
            "after" => Keyword::After,
            "stop" => Keyword::Stop,
            _ => return None,
        };
        Some(keyword)
    }
}

/// Operators and delimiters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Punctuator {
    /// Opening parenthesis
    LParen,
    /// Closing parenthesis
    RParen,
    /// Opening brace
    LBrace,
    /// Closing brace
    RBrace,
    /// Opening bracket
    LBracket,
    /// Closing bracket
    RBracket,
    /// Comma
    Comma,
    /// Decorator invocation marker
    At,
    /// Assignment
    Assign,
    /// Plus
    Plus,
    /// Minus
    Minus,
    /// Multiply
    Star,
    /// Divide
    Slash,
    /// Modulo
    Percent,
    /// Exponentiation
    StarStar,
    /// Equality
    EqEq,
    /// Inequality
    NotEq,
    /// Less than
    Lt,
    /// Greater than
    Gt,
    /// Less than or equal
    LtEq,
    /// Greater than or equal
    GtEq,
    /// Logical AND
    AndAnd,
    /// Logical OR
    OrOr,
    /// Logical NOT
    Not,
    /// Bitwise AND
    And,
    /// Bitwise OR
    Or,
    /// Bitwise XOR
    Xor,
    /// Bitwise NOT
    Tilde,
    /// Left shift
    LtLt,
    /// Right shift
    GtGt,
    /// Plus equals
    PlusEq,
    /// Minus equals
    MinusEq,
    /// Multiply equals
    StarEq,
    /// Divide equals
    SlashEq,
    /// Modulo equals
    PercentEq,
    /// Increment
    PlusPlus,
    /// Decrement
    MinusMinus,
    /// Pattern match
    Match,
    /// Negated pattern match
    NotMatch,
}

/// Token produced by the lexer
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Identifier: metric, constant, decorator or builtin name
    Identifier(String),
    /// Capture group reference without the leading `$`
    CaptureRef(String),
    /// Integer literal
    Integer(i64),
    /// Float literal
    Float(f64),
    /// String literal, escapes resolved
    String(String),
    /// Duration literal such as `1h30m`
    Duration(Duration),
    /// Regular expression literal, delimiters removed
    Regex(String),
    /// Keyword
    Keyword(Keyword),
    /// Punctuator/operator
    Punctuator(Punctuator),
    /// End of file
    EOF,
}

/// Lexer for program source
pub struct Lexer<'a> {
    source: &'a str,
    chars: Vec<char>,
    /// Current character offset
    pub position: usize,
    /// Current line, 1-based
    pub line: u32,
    /// Current column, 1-based
    pub column: u32,
    /// Token scanned by `peek_token` and not yet consumed
    pub current_token: Option<Token>,
    /// Start of the most recently scanned token
    pub token_start: SourcePosition,
    /// True if a line terminator separated the most recently scanned token from its predecessor
    pub line_terminator_before_token: bool,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given source code
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
            current_token: None,
            token_start: SourcePosition::new(1, 1, 0),
            line_terminator_before_token: false,
        }
    }

    /// The source being tokenized
    pub fn source(&self) -> &'a str {
        self.source
    }

    /// Get the next token from the source
    pub fn next_token(&mut self) -> Result<Token, CompileError> {
        if let Some(token) = self.current_token.take() {
            return Ok(token);
        }
        self.scan_token()
    }

    /// Peek at the next token without consuming it
    pub fn peek_token(&mut self) -> Result<&Token, CompileError> {
        let token = match self.current_token.take() {
            Some(token) => token,
            None => self.scan_token()?,
        };
        Ok(self.current_token.insert(token))
    }

    /// Re-read the peeked `/` or `/=` token as the start of a regex literal
    pub fn rescan_as_regex(&mut self) -> Result<Token, CompileError> {
        self.current_token = None;
        self.position = self.token_start.offset;
        self.line = self.token_start.line;
        self.column = self.token_start.column;
        self.scan_regex()
    }

    fn scan_token(&mut self) -> Result<Token, CompileError> {
        let line_before = self.line;
        self.skip_whitespace_and_comments();
        self.line_terminator_before_token = self.line != line_before;
        self.token_start = self.current_position();

        if self.is_at_end() {
            return Ok(Token::EOF);
        }

        let ch = self.advance();
        let punct = match ch {
            '(' => Punctuator::LParen,
            ')' => Punctuator::RParen,
            '{' => Punctuator::LBrace,
            '}' => Punctuator::RBrace,
            '[' => Punctuator::LBracket,
            ']' => Punctuator::RBracket,
            ',' => Punctuator::Comma,
            '@' => Punctuator::At,
            '~' => Punctuator::Tilde,
            '^' => Punctuator::Xor,
            '+' => {
                if self.match_char('+') {
                    Punctuator::PlusPlus
                } else if self.match_char('=') {
                    Punctuator::PlusEq
                } else {
                    Punctuator::Plus
                }
            }
            '-' => {
                if self.match_char('-') {
                    Punctuator::MinusMinus
                } else if self.match_char('=') {
                    Punctuator::MinusEq
                } else {
                    Punctuator::Minus
                }
            }
            '*' => {
                if self.match_char('*') {
                    Punctuator::StarStar
                } else if self.match_char('=') {
                    Punctuator::StarEq
                } else {
                    Punctuator::Star
                }
            }
            '/' => {
                if self.match_char('=') {
                    Punctuator::SlashEq
                } else {
                    Punctuator::Slash
                }
            }
            '%' => {
                if self.match_char('=') {
                    Punctuator::PercentEq
                } else {
                    Punctuator::Percent
                }
            }
            '=' => {
                if self.match_char('=') {
                    Punctuator::EqEq
                } else if self.match_char('~') {
                    Punctuator::Match
                } else {
                    Punctuator::Assign
                }
            }
            '!' => {
                if self.match_char('=') {
                    Punctuator::NotEq
                } else if self.match_char('~') {
                    Punctuator::NotMatch
                } else {
                    Punctuator::Not
                }
            }
            '<' => {
                if self.match_char('<') {
                    Punctuator::LtLt
                } else if self.match_char('=') {
                    Punctuator::LtEq
                } else {
                    Punctuator::Lt
                }
            }
            '>' => {
                if self.match_char('>') {
                    Punctuator::GtGt
                } else if self.match_char('=') {
                    Punctuator::GtEq
                } else {
                    Punctuator::Gt
                }
            }
            '&' => {
                if self.match_char('&') {
                    Punctuator::AndAnd
                } else {
                    Punctuator::And
                }
            }
            '|' => {
                if self.match_char('|') {
                    Punctuator::OrOr
                } else {
                    Punctuator::Or
                }
            }
            '"' => return self.scan_string(),
            '$' => return self.scan_capture_ref(),
            c if c.is_ascii_digit() => return self.scan_number(c),
            c if is_id_start(c) => return Ok(self.scan_identifier(c)),
            c => {
                return Err(syntax_error(
                    format!("unexpected character {:?}", c),
                    self.token_start,
                ))
            }
        };
        Ok(Token::Punctuator(punct))
    }

    fn scan_string(&mut self) -> Result<Token, CompileError> {
        let mut value = String::new();
        loop {
            if self.is_at_end() || self.peek() == '\n' {
                return Err(syntax_error("unterminated string literal", self.token_start));
            }
            match self.advance() {
                '"' => break,
                '\\' => {
                    if self.is_at_end() {
                        return Err(syntax_error("unterminated string literal", self.token_start));
                    }
                    match self.advance() {
                        'n' => value.push('\n'),
                        't' => value.push('\t'),
                        'r' => value.push('\r'),
                        '"' => value.push('"'),
                        '\\' => value.push('\\'),
                        other => {
                            value.push('\\');
                            value.push(other);
                        }
                    }
                }
                c => value.push(c),
            }
        }
        Ok(Token::String(value))
    }

    /// Scan a regex literal starting at the opening `/`
    pub fn scan_regex(&mut self) -> Result<Token, CompileError> {
        let start_pos = self.current_position();
        if self.is_at_end() || self.peek() != '/' {
            return Err(syntax_error("expected '/' at start of regex", start_pos));
        }
        self.token_start = start_pos;
        self.advance();

        let mut pattern = String::new();
        let mut in_class = false;
        loop {
            if self.is_at_end() || self.peek() == '\n' {
                return Err(syntax_error("unterminated regex", start_pos));
            }
            let ch = self.advance();
            match ch {
                '\\' => {
                    if self.is_at_end() {
                        return Err(syntax_error("unterminated regex", start_pos));
                    }
                    let escaped = self.advance();
                    // `\/` only exists to keep the delimiter out of the literal
                    if escaped != '/' {
                        pattern.push('\\');
                    }
                    pattern.push(escaped);
                }
                '[' => {
                    in_class = true;
                    pattern.push(ch);
                }
                ']' if in_class => {
                    in_class = false;
                    pattern.push(ch);
                }
                '/' if !in_class => break,
                c => pattern.push(c),
            }
        }
        Ok(Token::Regex(pattern))
    }

    fn scan_capture_ref(&mut self) -> Result<Token, CompileError> {
        let mut name = String::new();
        if !self.is_at_end() && self.peek().is_ascii_digit() {
            while !self.is_at_end() && self.peek().is_ascii_digit() {
                name.push(self.advance());
            }
        } else {
            while !self.is_at_end() && is_id_continue(self.peek()) {
                name.push(self.advance());
            }
        }
        if name.is_empty() {
            return Err(syntax_error(
                "expected a group number or name after '$'",
                self.token_start,
            ));
        }
        Ok(Token::CaptureRef(name))
    }

    fn scan_number(&mut self, first: char) -> Result<Token, CompileError> {
        let mut text = String::new();
        text.push(first);
        while !self.is_at_end() && self.peek().is_ascii_digit() {
            text.push(self.advance());
        }

        let mut is_float = false;
        if self.peek() == '.' && self.peek_next().map_or(false, |c| c.is_ascii_digit()) {
            is_float = true;
            text.push(self.advance());
            while !self.is_at_end() && self.peek().is_ascii_digit() {
                text.push(self.advance());
            }
        }

        // A unit suffix turns the number into a duration: 30s, 1h30m, 1.5h
        if !self.is_at_end() && self.peek().is_ascii_alphabetic() {
            while !self.is_at_end() && (self.peek().is_ascii_alphanumeric() || self.peek() == '.')
            {
                text.push(self.advance());
            }
            return humantime::parse_duration(&text)
                .map(Token::Duration)
                .map_err(|e| {
                    syntax_error(format!("invalid duration {:?}: {}", text, e), self.token_start)
                });
        }

        if is_float {
            text.parse::<f64>()
                .map(Token::Float)
                .map_err(|_| syntax_error(format!("invalid float {:?}", text), self.token_start))
        } else {
            text.parse::<i64>().map(Token::Integer).map_err(|_| {
                syntax_error(
                    format!("integer literal {} out of range", text),
                    self.token_start,
                )
            })
        }
    }

    fn scan_identifier(&mut self, first: char) -> Token {
        let mut name = String::new();
        name.push(first);
        while !self.is_at_end() && is_id_continue(self.peek()) {
            name.push(self.advance());
        }
        match Keyword::from_identifier(&name) {
            Some(keyword) => Token::Keyword(keyword),
            None => Token::Identifier(name),
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        while !self.is_at_end() {
            match self.peek() {
                ' ' | '\t' | '\r' => {
                    self.advance();
                }
                '\n' => {
                    self.advance();
                    self.line += 1;
                    self.column = 1;
                }
                '#' => {
                    while !self.is_at_end() && self.peek() != '\n' {
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.chars.len()
    }

    fn peek(&self) -> char {
        if self.is_at_end() {
            '\0'
        } else {
            self.chars[self.position]
        }
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.get(self.position + 1).copied()
    }

    fn advance(&mut self) -> char {
        let ch = self.chars[self.position];
        self.position += 1;
        self.column += 1;
        ch
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.is_at_end() || self.chars[self.position] != expected {
            false
        } else {
            self.position += 1;
            self.column += 1;
            true
        }
    }

    fn current_position(&self) -> SourcePosition {
        SourcePosition::new(self.line, self.column, self.position)
    }
}

fn is_id_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

fn is_id_continue(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}
