//! Minimal reader for configuration documents.
//!
//! Handles `key: value` assignments, quoted and bare atoms, `[ ... ]`
//! sequences, `{ ... }` tables and dotted assignment keys. Include directives
//! and `@` references are rejected: resolving them is a policy of the caller.
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::error::ParseError;
use crate::pset::{Origin, ParameterSet, Value, ValueKind};

static ASSIGNMENT_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$").expect("assignment key pattern")
});

/// Reads `text` into a parameter set. `source_name` ends up in every origin.
pub fn parse_document(text: &str, source_name: &str) -> Result<ParameterSet, ParseError> {
    let tokens = Lexer::new(text, source_name).tokenize()?;
    let mut parser = Parser { tokens: &tokens, pos: 0, source: Arc::from(source_name) };
    let pset = parser.document()?;
    debug!(source = source_name, parameters = pset.len(), "parsed document");
    Ok(pset)
}

impl ParameterSet {
    /// Shorthand for [`parse_document`].
    pub fn parse_str(text: &str, source_name: &str) -> Result<Self, ParseError> {
        parse_document(text, source_name)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// LEXER
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    /// Quoted literal, quotes and escapes kept verbatim.
    Quoted(String),
    Colon,
    Comma,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Eof,
}

#[derive(Debug, Clone)]
struct Spanned {
    token: Token,
    line: u32,
    column: u32,
}

struct Lexer<'a> {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    column: u32,
    source_name: &'a str,
}

impl<'a> Lexer<'a> {
    fn new(text: &str, source_name: &'a str) -> Self {
        Self { chars: text.chars().collect(), pos: 0, line: 1, column: 1, source_name }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn error(&self, line: u32, column: u32, message: impl Into<String>) -> ParseError {
        ParseError { source_name: self.source_name.to_string(), line, column, message: message.into() }
    }

    fn tokenize(mut self) -> Result<Vec<Spanned>, ParseError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_trivia()?;
            let (line, column) = (self.line, self.column);
            let Some(c) = self.peek() else {
                tokens.push(Spanned { token: Token::Eof, line, column });
                return Ok(tokens);
            };
            let token = match c {
                ':' => self.single(Token::Colon),
                ',' => self.single(Token::Comma),
                '[' => self.single(Token::LBracket),
                ']' => self.single(Token::RBracket),
                '{' => self.single(Token::LBrace),
                '}' => self.single(Token::RBrace),
                '"' | '\'' => Token::Quoted(self.quoted(c)?),
                '@' => return Err(self.error(line, column, "'@' references are not supported")),
                _ => Token::Word(self.word()),
            };
            tokens.push(Spanned { token, line, column });
        }
    }

    fn single(&mut self, token: Token) -> Token {
        self.bump();
        token
    }

    fn skip_trivia(&mut self) -> Result<(), ParseError> {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.bump();
            } else if c == '#' || (c == '/' && self.peek_at(1) == Some('/')) {
                let (line, column) = (self.line, self.column);
                let rest: String = self.chars[self.pos..].iter().take_while(|c| **c != '\n').collect();
                if rest.starts_with("#include") {
                    return Err(self.error(line, column, "#include directives are not supported"));
                }
                for _ in 0..rest.chars().count() {
                    self.bump();
                }
            } else {
                break;
            }
        }
        Ok(())
    }

    fn quoted(&mut self, quote: char) -> Result<String, ParseError> {
        let (line, column) = (self.line, self.column);
        let mut text = String::new();
        text.extend(self.bump());
        loop {
            let Some(c) = self.bump() else {
                return Err(self.error(line, column, "unterminated string"));
            };
            text.push(c);
            if c == quote {
                return Ok(text);
            }
            if c == '\\' && quote == '"' {
                text.extend(self.bump());
            }
        }
    }

    fn word(&mut self) -> String {
        let mut text = String::new();
        while let Some(c) = self.peek() {
            let delimiter = c.is_whitespace() || ":,[]{}\"'#".contains(c);
            if delimiter || (c == '/' && self.peek_at(1) == Some('/')) {
                break;
            }
            text.extend(self.bump());
        }
        text
    }
}

// ————————————————————————————————————————————————————————————————————————————
// PARSER
// ————————————————————————————————————————————————————————————————————————————

struct Parser<'a> {
    tokens: &'a [Spanned],
    pos: usize,
    source: Arc<str>,
}

impl Parser<'_> {
    /// The token stream always ends with `Eof`, and `pos` never moves past it.
    fn cur(&self) -> &Spanned {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) {
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn err(&self, message: impl Into<String>) -> ParseError {
        let at = self.cur();
        ParseError {
            source_name: self.source.to_string(),
            line: at.line,
            column: at.column,
            message: message.into(),
        }
    }

    fn expect(&mut self, token: Token, what: &str) -> Result<(), ParseError> {
        if self.cur().token != token {
            return Err(self.err(format!("expected {what}")));
        }
        self.advance();
        Ok(())
    }

    fn document(&mut self) -> Result<ParameterSet, ParseError> {
        let mut pset = ParameterSet::new();
        while self.cur().token != Token::Eof {
            self.assignment(&mut pset)?;
        }
        Ok(pset)
    }

    fn assignment(&mut self, pset: &mut ParameterSet) -> Result<(), ParseError> {
        let Token::Word(key) = &self.cur().token else {
            return Err(self.err("expected a parameter name"));
        };
        if !ASSIGNMENT_KEY.is_match(key) {
            return Err(self.err(format!("'{key}' is not a valid parameter name")));
        }
        let key = key.clone();
        let start = self.cur().clone();
        self.advance();
        self.expect(Token::Colon, "':' after parameter name")?;
        let value = self.value()?;
        assign(pset, &key, value).map_err(|message| ParseError {
            source_name: self.source.to_string(),
            line: start.line,
            column: start.column,
            message,
        })
    }

    fn value(&mut self) -> Result<Value, ParseError> {
        let origin = Origin { source: Arc::clone(&self.source), line: self.cur().line };
        let value = match self.cur().token.clone() {
            Token::Word(text) | Token::Quoted(text) => {
                self.advance();
                Value::atom(text)
            }
            Token::LBracket => self.sequence()?,
            Token::LBrace => self.table()?,
            Token::Eof => return Err(self.err("expected a value, found end of input")),
            _ => return Err(self.err("expected a value")),
        };
        Ok(value.with_origin(origin))
    }

    fn sequence(&mut self) -> Result<Value, ParseError> {
        self.advance();
        let mut elements = Vec::new();
        loop {
            if self.cur().token == Token::RBracket {
                self.advance();
                return Ok(Value::sequence(elements));
            }
            elements.push(self.value()?);
            match self.cur().token.clone() {
                Token::Comma => self.advance(),
                Token::RBracket => {}
                Token::Eof => return Err(self.err("unterminated sequence, found end of input")),
                _ => return Err(self.err("expected ',' or ']'")),
            }
        }
    }

    fn table(&mut self) -> Result<Value, ParseError> {
        self.advance();
        let mut pset = ParameterSet::new();
        loop {
            match self.cur().token.clone() {
                Token::RBrace => {
                    self.advance();
                    return Ok(Value::table(pset));
                }
                Token::Eof => return Err(self.err("unterminated table, expected '}'")),
                _ => self.assignment(&mut pset)?,
            }
        }
    }
}

/// Stores `value` under a dotted key, creating intermediate tables. A
/// repeated key overrides the earlier value in place.
fn assign(pset: &mut ParameterSet, key: &str, value: Value) -> Result<(), String> {
    let Some((head, rest)) = key.split_once('.') else {
        pset.insert(key.to_string(), value);
        return Ok(());
    };
    if pset.get_value(head).is_none() {
        let mut table = Value::table(ParameterSet::new());
        table.origin = value.origin.clone();
        pset.insert(head.to_string(), table);
    }
    match pset.get_value_mut(head).map(|v| &mut v.kind) {
        Some(ValueKind::Table(inner)) => assign(inner, rest, value),
        _ => Err(format!("'{head}' is not a table and cannot hold '{rest}'")),
    }
}
