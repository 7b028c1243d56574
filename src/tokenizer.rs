use std::{fmt, sync::LazyLock};

use regex::Regex;
use tracing::debug;

use crate::error::{Error, Result};

/// The kind of a lexical unit. Matching on kinds is the contract between the
/// tokenizer and the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // --- SQL Keywords ---
    Select,
    From,
    Join,
    Inner,
    Left,
    Right,
    Full,
    Outer,
    On,
    Where,
    Group,
    By,
    Having,
    Order,
    Asc,
    Desc,
    Limit,
    As,
    And,
    Or,
    Not,

    // --- Literals ---
    /// `TRUE` or `FALSE`.
    Boolean,
    /// Integer or decimal literal (e.g., `42`, `3.14`).
    Number,
    /// A quoted string literal, quotes included (e.g., `'ALICE'`).
    String,
    /// A table, column or alias name.
    Ident,

    // --- Symbols ---
    Comma,
    /// Multiplication or wildcard symbol `*`
    Star,
    LParen,
    RParen,
    Dot,
    Semicolon,
    /// Comparison operators: `= != <> < <= > >=`
    Op,
    Plus,
    Minus,
    Slash,
    Percent,

    // --- Never emitted ---
    /// Digits immediately followed by letters, e.g. `123ABC`. Always an error.
    InvalidNumber,
    /// Spaces, tabs and newlines. Consumed and dropped.
    Whitespace,
}

impl TokenKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Select => "SELECT",
            Self::From => "FROM",
            Self::Join => "JOIN",
            Self::Inner => "INNER",
            Self::Left => "LEFT",
            Self::Right => "RIGHT",
            Self::Full => "FULL",
            Self::Outer => "OUTER",
            Self::On => "ON",
            Self::Where => "WHERE",
            Self::Group => "GROUP",
            Self::By => "BY",
            Self::Having => "HAVING",
            Self::Order => "ORDER",
            Self::Asc => "ASC",
            Self::Desc => "DESC",
            Self::Limit => "LIMIT",
            Self::As => "AS",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Not => "NOT",
            Self::Boolean => "BOOLEAN",
            Self::Number => "NUMBER",
            Self::String => "STRING",
            Self::Ident => "IDENT",
            Self::Comma => "COMMA",
            Self::Star => "STAR",
            Self::LParen => "LPAREN",
            Self::RParen => "RPAREN",
            Self::Dot => "DOT",
            Self::Semicolon => "SEMICOLON",
            Self::Op => "OP",
            Self::Plus => "PLUS",
            Self::Minus => "MINUS",
            Self::Slash => "SLASH",
            Self::Percent => "PERCENT",
            Self::InvalidNumber => "INVALID_NUMBER",
            Self::Whitespace => "WS",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Represents the smallest meaningful units (atoms) of the SQL language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// The matched text, already upper-cased.
    pub text: String,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind, self.text)
    }
}

/// Token rules in priority order; the first rule matching at the cursor wins.
///
/// Keywords come before `IDENT` so they shadow identifiers of the same
/// spelling, and `INVALID_NUMBER` comes before `NUMBER` so `123ABC` is rejected
/// instead of being split into `123` and `ABC`. Patterns run against
/// upper-cased input.
pub const RULES: &[(TokenKind, &str)] = &[
    (TokenKind::Select, r"SELECT\b"),
    (TokenKind::From, r"FROM\b"),
    (TokenKind::Join, r"JOIN\b"),
    (TokenKind::Inner, r"INNER\b"),
    (TokenKind::Left, r"LEFT\b"),
    (TokenKind::Right, r"RIGHT\b"),
    (TokenKind::Full, r"FULL\b"),
    (TokenKind::Outer, r"OUTER\b"),
    (TokenKind::On, r"ON\b"),
    (TokenKind::Where, r"WHERE\b"),
    (TokenKind::Group, r"GROUP\b"),
    (TokenKind::By, r"BY\b"),
    (TokenKind::Having, r"HAVING\b"),
    (TokenKind::Order, r"ORDER\b"),
    (TokenKind::Asc, r"ASC\b"),
    (TokenKind::Desc, r"DESC\b"),
    (TokenKind::Limit, r"LIMIT\b"),
    (TokenKind::As, r"AS\b"),
    (TokenKind::And, r"AND\b"),
    (TokenKind::Or, r"OR\b"),
    (TokenKind::Not, r"NOT\b"),
    (TokenKind::Boolean, r"(?:TRUE|FALSE)\b"),
    (TokenKind::Comma, r","),
    (TokenKind::Star, r"\*"),
    (TokenKind::LParen, r"\("),
    (TokenKind::RParen, r"\)"),
    (TokenKind::Dot, r"\."),
    (TokenKind::Semicolon, r";"),
    (TokenKind::Op, r"<>|<=|>=|!=|=|<|>"),
    (TokenKind::Plus, r"\+"),
    (TokenKind::Minus, r"-"),
    (TokenKind::Slash, r"/"),
    (TokenKind::Percent, r"%"),
    (TokenKind::InvalidNumber, r"[0-9]+[A-Z_]+"),
    (TokenKind::Number, r"[0-9]+(?:\.[0-9]+)?"),
    (TokenKind::String, r"'[^']*'"),
    (TokenKind::Ident, r"[A-Z_][A-Z0-9_]*"),
    (TokenKind::Whitespace, r"\s+"),
];

/// [RULES] compiled once, each anchored at the cursor.
static COMPILED_RULES: LazyLock<Vec<(TokenKind, Regex)>> = LazyLock::new(|| {
    RULES
        .iter()
        .map(|(kind, pattern)| {
            let regex = Regex::new(&format!("^(?:{pattern})"))
                .unwrap_or_else(|e| panic!("token rule {kind} is not a valid pattern: {e}"));
            (*kind, regex)
        })
        .collect()
});

/// Number of characters of context reported with a lex error.
const SNIPPET_LEN: usize = 10;

/// A lexical scanner (lexer) that converts a raw SQL string into a sequence of [Token]s.
pub struct Tokenizer {
    /// The upper-cased input.
    input: String,
    /// Byte offset of the cursor in `input`.
    position: usize,
}

impl Tokenizer {
    /// Creates a new Tokenizer for the given input string.
    pub fn new(input: &str) -> Self {
        Self {
            input: input.to_uppercase(),
            position: 0,
        }
    }

    /// Processes the entire input and returns a vector of tokens.
    ///
    /// # Errors
    /// Returns [Error::Lex] if no rule matches at some position or if a number
    /// runs straight into letters. No partial token list is returned.
    ///
    /// # Example
    /// ```
    /// # use pql::tokenizer::{Tokenizer, TokenKind};
    /// let tokens = Tokenizer::new("select *").tokenize().unwrap();
    /// assert_eq!(tokens[0].kind, TokenKind::Select);
    /// assert_eq!(tokens[1].kind, TokenKind::Star);
    /// ```
    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();

        while !self.is_at_end() {
            let (kind, len) = self.next_match()?;
            let text = &self.input[self.position..self.position + len];

            match kind {
                TokenKind::InvalidNumber => {
                    return Err(self.error("numeric literal followed by identifier characters"));
                }
                TokenKind::Whitespace => {}
                _ => tokens.push(Token::new(kind, text)),
            }

            self.position += len;
        }

        debug!(count = tokens.len(), "tokenized query");
        Ok(tokens)
    }

    /// Tries every rule in priority order at the cursor and returns the kind
    /// and byte length of the first match.
    fn next_match(&self) -> Result<(TokenKind, usize)> {
        let rest = &self.input[self.position..];

        COMPILED_RULES
            .iter()
            .find_map(|(kind, regex)| {
                regex
                    .find(rest)
                    .filter(|m| !m.is_empty())
                    .map(|m| (*kind, m.end()))
            })
            .ok_or_else(|| self.error("unrecognised input"))
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    fn error(&self, reason: &str) -> Error {
        Error::Lex {
            position: self.input[..self.position].chars().count(),
            snippet: self.input[self.position..].chars().take(SNIPPET_LEN).collect(),
            reason: reason.to_string(),
        }
    }
}

/// Tokenizes `text`. Shorthand for `Tokenizer::new(text).tokenize()`.
pub fn tokenize(text: &str) -> Result<Vec<Token>> {
    Tokenizer::new(text).tokenize()
}
