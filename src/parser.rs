use tracing::debug;

use crate::ast::*;
use crate::error::{Error, Result};
use crate::tokenizer::{Token, TokenKind, tokenize};

/// Recursive-descent parser turning a token sequence into a [SelectQuery].
///
/// Parsing fails fast: the first structural violation is returned as
/// [Error::Parse] and nothing is recovered.
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            position: 0,
        }
    }

    /// Parses one query, optionally terminated by a semicolon, and requires
    /// that nothing follows it.
    pub fn parse(&mut self) -> Result<SelectQuery> {
        let query = match self.current_kind() {
            Some(TokenKind::Select) => self.parse_select()?,
            _ => return Err(self.unexpected("SELECT")),
        };

        // trailing semicolon
        self.match_kind(TokenKind::Semicolon);

        if self.current().is_some() {
            return Err(self.unexpected("end of input"));
        }

        debug!(
            items = query.select.len(),
            joins = query.joins.len(),
            has_where = query.where_clause.is_some(),
            "parsed select query"
        );
        Ok(query)
    }

    // --- Cursor primitives ---

    /// Peeks at the token under the cursor without consuming it.
    fn current(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn current_kind(&self) -> Option<TokenKind> {
        self.current().map(|token| token.kind)
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() {
            self.position += 1;
        }
    }

    /// Consumes the current token, which must be of kind `expected`.
    /// Used for required clauses like `FROM`.
    fn eat(&mut self, expected: TokenKind) -> Result<Token> {
        self.match_kind(expected)
            .ok_or_else(|| self.unexpected(expected.name()))
    }

    /// Consumes the current token only if it is of kind `expected`, otherwise
    /// leaves the cursor untouched. Used for optional clauses like `WHERE`.
    fn match_kind(&mut self, expected: TokenKind) -> Option<Token> {
        let token = self.current().filter(|token| token.kind == expected)?.clone();
        self.advance();
        Some(token)
    }

    fn unexpected(&self, expected: &str) -> Error {
        Error::Parse {
            expected: expected.to_string(),
            found: self
                .current()
                .map_or_else(|| "end of input".to_string(), Token::to_string),
        }
    }

    /// Runs `parse_clause` only when the clause keyword `keyword` is present.
    fn parse_optional<T>(
        &mut self,
        keyword: TokenKind,
        parse_clause: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<Option<T>> {
        match self.match_kind(keyword) {
            Some(_) => parse_clause(self).map(Some),
            None => Ok(None),
        }
    }

    // --- Query structure ---

    fn parse_select(&mut self) -> Result<SelectQuery> {
        self.eat(TokenKind::Select)?;
        let select = self.parse_select_list()?;
        self.eat(TokenKind::From)?;
        let from = self.parse_from_item()?;

        let mut joins = Vec::new();
        while let Some(kind) = self.parse_join_kind()? {
            joins.push(self.parse_join(kind)?);
        }

        let where_clause = self.parse_optional(TokenKind::Where, Self::parse_expr)?;
        let group_by = self.parse_optional(TokenKind::Group, |p| {
            p.eat(TokenKind::By)?;
            p.parse_expr_list()
        })?;
        let having = self.parse_optional(TokenKind::Having, Self::parse_expr)?;
        let order_by = self.parse_optional(TokenKind::Order, |p| {
            p.eat(TokenKind::By)?;
            p.parse_order_list()
        })?;
        let limit = self.parse_optional(TokenKind::Limit, Self::parse_limit)?;

        Ok(SelectQuery {
            select,
            from,
            joins,
            where_clause,
            group_by,
            having,
            order_by,
            limit,
        })
    }

    fn parse_select_list(&mut self) -> Result<Vec<SelectItem>> {
        let mut items = vec![self.parse_select_item()?];
        while self.match_kind(TokenKind::Comma).is_some() {
            items.push(self.parse_select_item()?);
        }
        Ok(items)
    }

    fn parse_select_item(&mut self) -> Result<SelectItem> {
        if self.match_kind(TokenKind::Star).is_some() {
            return Ok(SelectItem {
                expr: Expr::Wildcard,
                alias: None,
            });
        }

        let expr = self.parse_expr()?;
        let alias = self.parse_optional(TokenKind::As, |p| {
            p.eat(TokenKind::Ident).map(|token| token.text)
        })?;
        Ok(SelectItem { expr, alias })
    }

    /// `IDENT [[AS] alias]` or `( select ) [[AS] alias]`.
    fn parse_from_item(&mut self) -> Result<FromItem> {
        if self.match_kind(TokenKind::LParen).is_some() {
            let query = self.parse_select()?;
            self.eat(TokenKind::RParen)?;
            let alias = self.parse_from_alias()?;
            return Ok(FromItem::Subquery(SubqueryRef {
                query: Box::new(query),
                alias,
            }));
        }

        let name = self.eat(TokenKind::Ident)?.text;
        let alias = self.parse_from_alias()?;
        Ok(FromItem::Table(TableRef { name, alias }))
    }

    /// `AS` is optional, but once written it must be followed by a plain identifier.
    fn parse_from_alias(&mut self) -> Result<Option<String>> {
        if self.match_kind(TokenKind::As).is_some() {
            return match self.match_kind(TokenKind::Ident) {
                Some(token) => Ok(Some(token.text)),
                None => Err(self.unexpected("alias identifier after AS")),
            };
        }
        Ok(self.match_kind(TokenKind::Ident).map(|token| token.text))
    }

    /// Consumes a join introducer (`JOIN`, `INNER JOIN`, `LEFT [OUTER] JOIN`, ...)
    /// if one is present.
    fn parse_join_kind(&mut self) -> Result<Option<JoinKind>> {
        let kind = match self.current_kind() {
            Some(TokenKind::Join) => JoinKind::Inner,
            Some(TokenKind::Inner) => {
                self.advance();
                JoinKind::Inner
            }
            Some(TokenKind::Left) => {
                self.advance();
                self.match_kind(TokenKind::Outer);
                JoinKind::Left
            }
            Some(TokenKind::Right) => {
                self.advance();
                self.match_kind(TokenKind::Outer);
                JoinKind::Right
            }
            Some(TokenKind::Full) => {
                self.advance();
                self.match_kind(TokenKind::Outer);
                JoinKind::Full
            }
            _ => return Ok(None),
        };
        self.eat(TokenKind::Join)?;
        Ok(Some(kind))
    }

    fn parse_join(&mut self, kind: JoinKind) -> Result<Join> {
        let right = self.parse_from_item()?;
        self.eat(TokenKind::On)?;
        let condition = self.parse_expr()?;
        Ok(Join {
            kind,
            right,
            condition,
        })
    }

    fn parse_expr_list(&mut self) -> Result<Vec<Expr>> {
        let mut exprs = vec![self.parse_expr()?];
        while self.match_kind(TokenKind::Comma).is_some() {
            exprs.push(self.parse_expr()?);
        }
        Ok(exprs)
    }

    fn parse_order_list(&mut self) -> Result<Vec<OrderByItem>> {
        let mut items = Vec::new();
        loop {
            let expr = self.parse_expr()?;
            let direction = if self.match_kind(TokenKind::Desc).is_some() {
                SortDirection::Desc
            } else {
                self.match_kind(TokenKind::Asc);
                SortDirection::Asc
            };
            items.push(OrderByItem { expr, direction });

            if self.match_kind(TokenKind::Comma).is_none() {
                break;
            }
        }
        Ok(items)
    }

    fn parse_limit(&mut self) -> Result<u64> {
        let token = self.eat(TokenKind::Number)?;
        token.text.parse::<u64>().map_err(|_| Error::Parse {
            expected: "non-negative integer after LIMIT".to_string(),
            found: token.to_string(),
        })
    }

    // --- Expressions, lowest precedence first ---

    fn parse_expr(&mut self) -> Result<Expr> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut left = self.parse_and()?;
        while self.match_kind(TokenKind::Or).is_some() {
            let right = self.parse_and()?;
            left = Expr::binary(left, BinaryOperator::Or, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut left = self.parse_not()?;
        while self.match_kind(TokenKind::And).is_some() {
            let right = self.parse_not()?;
            left = Expr::binary(left, BinaryOperator::And, right);
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr> {
        if self.match_kind(TokenKind::Not).is_some() {
            return Ok(Expr::unary(UnaryOperator::Not, self.parse_not()?));
        }
        self.parse_comparison()
    }

    /// Comparisons do not chain: `a = b = c` leaves the second `=` unparsed.
    fn parse_comparison(&mut self) -> Result<Expr> {
        let left = self.parse_additive()?;
        match self.match_kind(TokenKind::Op) {
            Some(token) => {
                let op = BinaryOperator::from_symbol(&token.text)?;
                let right = self.parse_additive()?;
                Ok(Expr::binary(left, op, right))
            }
            None => Ok(left),
        }
    }

    fn parse_additive(&mut self) -> Result<Expr> {
        let mut left = self.parse_term()?;
        loop {
            let op = match self.current_kind() {
                Some(TokenKind::Plus) => BinaryOperator::Add,
                Some(TokenKind::Minus) => BinaryOperator::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_term()?;
            left = Expr::binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> Result<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.current_kind() {
                Some(TokenKind::Star) => BinaryOperator::Mul,
                Some(TokenKind::Slash) => BinaryOperator::Div,
                Some(TokenKind::Percent) => BinaryOperator::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        if self.match_kind(TokenKind::Minus).is_some() {
            return Ok(Expr::unary(UnaryOperator::Neg, self.parse_unary()?));
        }
        self.parse_primary()
    }

    /// `( expr )`, a column reference, or a literal. Parentheses only group:
    /// no node is kept for them.
    fn parse_primary(&mut self) -> Result<Expr> {
        let Some(token) = self.current().cloned() else {
            return Err(self.unexpected("expression"));
        };

        match token.kind {
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.eat(TokenKind::RParen)?;
                Ok(expr)
            }
            TokenKind::Ident => {
                self.advance();
                if self.match_kind(TokenKind::Dot).is_some() {
                    let column = self.eat(TokenKind::Ident)?;
                    Ok(Expr::qualified(token.text, column.text))
                } else {
                    Ok(Expr::column(token.text))
                }
            }
            TokenKind::Number => {
                self.advance();
                parse_number(&token).map(Expr::Literal)
            }
            TokenKind::String => {
                self.advance();
                let inner = token.text.trim_matches('\'');
                Ok(Expr::literal(inner))
            }
            TokenKind::Boolean => {
                self.advance();
                Ok(Expr::literal(token.text == "TRUE"))
            }
            _ => Err(self.unexpected("expression")),
        }
    }
}

fn parse_number(token: &Token) -> Result<Literal> {
    let invalid = || Error::Parse {
        expected: "numeric literal in range".to_string(),
        found: token.to_string(),
    };

    if token.text.contains('.') {
        token
            .text
            .parse::<f64>()
            .map(Literal::Float)
            .map_err(|_| invalid())
    } else {
        token
            .text
            .parse::<i64>()
            .map(Literal::Int)
            .map_err(|_| invalid())
    }
}

/// Parses a token sequence produced by [tokenize].
pub fn parse(tokens: Vec<Token>) -> Result<SelectQuery> {
    Parser::new(tokens).parse()
}

/// Tokenizes and parses `text` in one go.
///
/// # Example
/// ```
/// # use pql::parser::parse_sql;
/// # use pql::ast::{Expr, FromItem, TableRef};
/// let query = parse_sql("SELECT name FROM users AS u").unwrap();
/// assert_eq!(query.select[0].expr, Expr::column("NAME"));
/// assert_eq!(
///     query.from,
///     FromItem::Table(TableRef { name: "USERS".into(), alias: Some("U".into()) })
/// );
/// ```
pub fn parse_sql(text: &str) -> Result<SelectQuery> {
    parse(tokenize(text)?)
}
