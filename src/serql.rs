//! Syntax recognizer for SeRQL, the secondary query dialect.
//!
//! Only the outer structure is checked:
//!
//! ```text
//! (SELECT | CONSTRUCT) [DISTINCT | REDUCED] projection
//! FROM path-expressions
//! [WHERE condition]
//! [LIMIT n] [OFFSET n]
//! [USING NAMESPACE prefix = <uri> {, prefix = <uri>}]
//! ```
//!
//! Path expressions and conditions are only required to be non-empty with
//! balanced brackets. The repository does the real parsing at evaluation time.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::types::QueryShape;

static TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r#"^(?:(?P<ws>\s+)"#,
        r#"|(?P<str>"(?:[^"\\]|\\.)*")"#,
        r#"|(?P<iri><[^<>"{}|^`\\\s]*>)"#,
        r#"|(?P<num>[0-9]+(?:\.[0-9]+)?)"#,
        r#"|(?P<word>[A-Za-z_][A-Za-z0-9_.\-]*(?::[A-Za-z0-9_.\-]*)?)"#,
        r#"|(?P<punct>[{}\[\]()<>,;=!*.:^@+\-/?&|]))"#,
    ))
    .expect("valid serql token pattern")
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at offset {offset}")]
pub struct SerqlSyntaxError {
    pub message: String,
    pub offset: usize,
}

impl SerqlSyntaxError {
    fn new(message: impl Into<String>, offset: usize) -> Self {
        Self {
            message: message.into(),
            offset,
        }
    }
}

/// What the planner needs to know about an accepted SeRQL query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerqlQuery {
    pub shape: QueryShape,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    /// Byte offset where a `LIMIT` clause belongs if the query has none.
    pub limit_position: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Word,
    Number,
    Str,
    Iri,
    Punct,
}

#[derive(Debug, Clone, Copy)]
struct Token<'a> {
    kind: Kind,
    text: &'a str,
    start: usize,
}

impl Token<'_> {
    fn is_keyword(&self, keyword: &str) -> bool {
        self.kind == Kind::Word && self.text.eq_ignore_ascii_case(keyword)
    }

    fn is_punct(&self, c: &str) -> bool {
        self.kind == Kind::Punct && self.text == c
    }

    fn depth_change(&self) -> i32 {
        match (self.kind, self.text) {
            (Kind::Punct, "{" | "[" | "(") => 1,
            (Kind::Punct, "}" | "]" | ")") => -1,
            _ => 0,
        }
    }
}

fn tokenize(text: &str) -> Result<Vec<Token<'_>>, SerqlSyntaxError> {
    let mut tokens = Vec::new();
    let mut pos = 0;
    while pos < text.len() {
        let rest = &text[pos..];
        let caps = TOKEN
            .captures(rest)
            .ok_or_else(|| {
                SerqlSyntaxError::new(format!("unexpected character {:?}", first_char(rest)), pos)
            })?;
        let whole = caps.get(0).map_or(0, |m| m.end());
        let kind = if caps.name("ws").is_some() {
            None
        } else if caps.name("str").is_some() {
            Some(Kind::Str)
        } else if caps.name("iri").is_some() {
            Some(Kind::Iri)
        } else if caps.name("num").is_some() {
            Some(Kind::Number)
        } else if caps.name("word").is_some() {
            Some(Kind::Word)
        } else {
            Some(Kind::Punct)
        };
        if let Some(kind) = kind {
            tokens.push(Token {
                kind,
                text: &rest[..whole],
                start: pos,
            });
        }
        pos += whole;
    }
    Ok(tokens)
}

fn first_char(text: &str) -> char {
    text.chars().next().unwrap_or(' ')
}

struct Cursor<'a> {
    tokens: Vec<Token<'a>>,
    index: usize,
    end: usize,
}

impl<'a> Cursor<'a> {
    fn peek(&self) -> Option<Token<'a>> {
        self.tokens.get(self.index).copied()
    }

    fn offset(&self) -> usize {
        self.peek().map_or(self.end, |t| t.start)
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        match self.peek() {
            Some(t) if t.is_keyword(keyword) => {
                self.index += 1;
                true
            }
            _ => false,
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<(), SerqlSyntaxError> {
        self.expect(&format!("expected {keyword}"), |t| t.is_keyword(keyword))
    }

    fn unexpected(&self, expected: &str) -> SerqlSyntaxError {
        let found = self
            .peek()
            .map_or_else(|| "end of query".to_string(), |t| format!("'{}'", t.text));
        SerqlSyntaxError::new(format!("{expected}, found {found}"), self.offset())
    }

    /// Consume a balanced run of tokens up to one of `stops` at depth zero.
    /// Returns the number of tokens consumed and how many opened a `{` block.
    fn skip_clause(&mut self, stops: &[&str]) -> Result<(usize, usize), SerqlSyntaxError> {
        let mut depth = 0i32;
        let mut consumed = 0;
        let mut blocks = 0;
        while let Some(token) = self.peek() {
            if depth == 0 && stops.iter().any(|k| token.is_keyword(k)) {
                break;
            }
            depth += token.depth_change();
            if depth < 0 {
                return Err(SerqlSyntaxError::new(
                    format!("unbalanced '{}'", token.text),
                    token.start,
                ));
            }
            if token.is_punct("{") {
                blocks += 1;
            }
            consumed += 1;
            self.index += 1;
        }
        if depth != 0 {
            return Err(SerqlSyntaxError::new("unclosed bracket", self.end));
        }
        Ok((consumed, blocks))
    }

    fn number(&mut self, clause: &str) -> Result<u64, SerqlSyntaxError> {
        match self.peek() {
            Some(t) if t.kind == Kind::Number => {
                let value = t.text.parse::<u64>().map_err(|_| {
                    SerqlSyntaxError::new(format!("{clause} needs a whole number"), t.start)
                })?;
                self.index += 1;
                Ok(value)
            }
            _ => Err(self.unexpected(&format!("expected a number after {clause}"))),
        }
    }

    fn expect(
        &mut self,
        expected: &str,
        accept: impl Fn(&Token<'a>) -> bool,
    ) -> Result<(), SerqlSyntaxError> {
        match self.peek() {
            Some(t) if accept(&t) => {
                self.index += 1;
                Ok(())
            }
            _ => Err(self.unexpected(expected)),
        }
    }

    fn namespace_declarations(&mut self) -> Result<(), SerqlSyntaxError> {
        loop {
            self.expect("expected a namespace prefix", |t| t.kind == Kind::Word)?;
            self.expect("expected '='", |t| t.is_punct("="))?;
            self.expect("expected a namespace URI", |t| t.kind == Kind::Iri)?;
            match self.peek() {
                Some(t) if t.is_punct(",") => self.index += 1,
                _ => return Ok(()),
            }
        }
    }
}

const CLAUSE_KEYWORDS: [&str; 4] = ["WHERE", "LIMIT", "OFFSET", "USING"];

pub fn parse(text: &str) -> Result<SerqlQuery, SerqlSyntaxError> {
    let mut cursor = Cursor {
        tokens: tokenize(text)?,
        index: 0,
        end: text.len(),
    };

    let shape = if cursor.eat_keyword("SELECT") {
        QueryShape::Tuple
    } else if cursor.eat_keyword("CONSTRUCT") {
        QueryShape::Graph
    } else {
        return Err(cursor.unexpected("expected SELECT or CONSTRUCT"));
    };
    let _ = cursor.eat_keyword("DISTINCT") || cursor.eat_keyword("REDUCED");

    let (projection, _) = cursor.skip_clause(&["FROM"])?;
    if projection == 0 {
        return Err(cursor.unexpected("expected a projection"));
    }
    cursor.expect_keyword("FROM")?;

    let from_at = cursor.offset();
    let (_, blocks) = cursor.skip_clause(&CLAUSE_KEYWORDS)?;
    if blocks == 0 {
        return Err(SerqlSyntaxError::new("expected a path expression", from_at));
    }

    if cursor.eat_keyword("WHERE") {
        let (condition, _) = cursor.skip_clause(&CLAUSE_KEYWORDS[1..])?;
        if condition == 0 {
            return Err(cursor.unexpected("expected a condition after WHERE"));
        }
    }

    let mut limit_position = None;
    let limit = if cursor.eat_keyword("LIMIT") {
        Some(cursor.number("LIMIT")?)
    } else {
        None
    };

    let offset = if cursor.peek().is_some_and(|t| t.is_keyword("OFFSET")) {
        limit_position.get_or_insert(cursor.offset());
        cursor.index += 1;
        Some(cursor.number("OFFSET")?)
    } else {
        None
    };

    if cursor.peek().is_some_and(|t| t.is_keyword("USING")) {
        limit_position.get_or_insert(cursor.offset());
        cursor.index += 1;
        cursor.expect_keyword("NAMESPACE")?;
        cursor.namespace_declarations()?;
    }

    if cursor.peek().is_some() {
        return Err(cursor.unexpected("expected end of query"));
    }

    Ok(SerqlQuery {
        shape,
        limit,
        offset,
        limit_position: limit_position.unwrap_or(text.len()),
    })
}
