//! Recursive-descent parser over SymPy source syntax.
//!
//! Precedence, loosest first: relations, `+ -`, `* /` (and implicit
//! multiplication after a number or a closing paren), unary sign, `**`
//! (right-associative, `^` is a synonym), then calls and subscripts.

use crate::error::ParseError;
use crate::expr::{Expr, RelOp};
use crate::lexer::{SpannedToken, Token, tokenize};
use crate::namespace::{CallArgs, Definition, Namespace};

/// Nesting bound across parentheses, calls, subscripts, signs and powers.
pub const MAX_DEPTH: usize = 100;

/// Parses one expression, resolving every identifier through `scope`.
///
/// # Errors
///
/// Any [`ParseError`]; the input must be consumed entirely.
pub fn parse_expr(input: &str, scope: &dyn Namespace) -> Result<Expr, ParseError> {
    let mut parser = Parser::new(tokenize(input)?, scope);
    let expr = parser.parse_relational()?;
    match parser.peek() {
        None => Ok(expr),
        Some(tok) => Err(ParseError::UnexpectedToken {
            found: tok.lexeme.clone(),
            expected: "end of input".into(),
            pos: tok.start,
        }),
    }
}

struct Parser<'a> {
    tokens: Vec<SpannedToken>,
    pos: usize,
    depth: usize,
    scope: &'a dyn Namespace,
}

impl<'a> Parser<'a> {
    fn new(tokens: Vec<SpannedToken>, scope: &'a dyn Namespace) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
            scope,
        }
    }

    // ── Token cursor ───────────────────────────────────────────────

    fn peek(&self) -> Option<&SpannedToken> {
        self.tokens.get(self.pos)
    }

    fn peek_token(&self) -> Option<Token> {
        self.peek().map(|t| t.token)
    }

    fn peek_token_at(&self, offset: usize) -> Option<Token> {
        self.tokens.get(self.pos + offset).map(|t| t.token)
    }

    fn previous_token(&self) -> Option<Token> {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map(|t| t.token)
    }

    fn next(&mut self) -> Option<SpannedToken> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn consume(&mut self, token: Token) -> bool {
        if self.peek_token() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token, expected: &str) -> Result<SpannedToken, ParseError> {
        if self.peek_token() == Some(token) {
            self.next().ok_or_else(|| self.unexpected(expected))
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        match self.peek() {
            Some(tok) => ParseError::UnexpectedToken {
                found: tok.lexeme.clone(),
                expected: expected.into(),
                pos: tok.start,
            },
            None => ParseError::UnexpectedEof {
                expected: expected.into(),
            },
        }
    }

    /// Runs `f` one level deeper, failing past [`MAX_DEPTH`].
    fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        if self.depth >= MAX_DEPTH {
            return Err(ParseError::TooDeep { limit: MAX_DEPTH });
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    // ── Operators ──────────────────────────────────────────────────

    fn parse_relational(&mut self) -> Result<Expr, ParseError> {
        self.nested(Self::parse_relation)
    }

    fn parse_relation(&mut self) -> Result<Expr, ParseError> {
        let lhs = self.parse_add_sub()?;
        let op = match self.peek_token() {
            Some(Token::Assign | Token::EqEq) => RelOp::Eq,
            Some(Token::NotEq) => RelOp::Ne,
            Some(Token::Lt) => RelOp::Lt,
            Some(Token::Le) => RelOp::Le,
            Some(Token::Gt) => RelOp::Gt,
            Some(Token::Ge) => RelOp::Ge,
            _ => return Ok(lhs),
        };
        self.pos += 1;
        let rhs = self.parse_add_sub()?;
        Ok(Expr::relational(op, lhs, rhs))
    }

    fn parse_add_sub(&mut self) -> Result<Expr, ParseError> {
        let mut terms = vec![self.parse_mul_div()?];
        loop {
            if self.consume(Token::Plus) {
                terms.push(self.parse_mul_div()?);
            } else if self.consume(Token::Minus) {
                terms.push(-self.parse_mul_div()?);
            } else {
                break;
            }
        }
        Ok(Expr::add_all(terms))
    }

    fn parse_mul_div(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_unary()?;
        loop {
            if self.consume(Token::Star) {
                lhs = lhs * self.parse_unary()?;
            } else if self.consume(Token::Slash) {
                lhs = lhs / self.parse_unary()?;
            } else if self.implicit_multiplication() {
                lhs = lhs * self.parse_unary()?;
            } else {
                break;
            }
        }
        Ok(lhs)
    }

    /// `2x`, `2(x + 1)`, `(a + b)c` and `(a)(b)` multiply.
    fn implicit_multiplication(&self) -> bool {
        let Some(next) = self.peek_token() else {
            return false;
        };
        match self.previous_token() {
            Some(Token::Integer | Token::Float | Token::RParen) => {
                matches!(next, Token::Ident | Token::LParen)
            }
            _ => false,
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        self.nested(|p| {
            if p.consume(Token::Minus) {
                Ok(-p.parse_unary()?)
            } else if p.consume(Token::Plus) {
                p.parse_unary()
            } else {
                p.parse_pow()
            }
        })
    }

    fn parse_pow(&mut self) -> Result<Expr, ParseError> {
        let base = self.parse_postfix()?;
        if self.consume(Token::StarStar) || self.consume(Token::Caret) {
            let exp = self.parse_unary()?;
            Ok(base.pow(exp))
        } else {
            Ok(base)
        }
    }

    // ── Names, calls, subscripts ───────────────────────────────────

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        if self.peek_token() != Some(Token::Ident) {
            return self.parse_primary();
        }
        let name = self
            .next()
            .map(|t| t.lexeme)
            .ok_or_else(|| self.unexpected("identifier"))?;

        let mut expr = match self.peek_token() {
            Some(Token::LParen) => {
                let args = self.parse_call_args()?;
                self.call_name(&name, args)?
            }
            Some(Token::LBracket) => {
                let indices = self.parse_subscript()?;
                let base = self.resolve_name(&name)?;
                subscript(base, indices)?
            }
            _ => return self.resolve_name(&name),
        };

        loop {
            match self.peek_token() {
                Some(Token::LParen) => {
                    let args = self.parse_call_args()?;
                    expr = call_value(expr, args)?;
                }
                Some(Token::LBracket) => {
                    let indices = self.parse_subscript()?;
                    expr = subscript(expr, indices)?;
                }
                _ => return Ok(expr),
            }
        }
    }

    fn resolve_name(&self, name: &str) -> Result<Expr, ParseError> {
        match self.scope.lookup(name) {
            Some(Definition::Value(value)) => Ok(value.clone()),
            Some(Definition::Callable(_)) => Ok(Expr::Function(name.to_owned())),
            None => Err(ParseError::UnknownName(name.to_owned())),
        }
    }

    fn call_name(&self, name: &str, args: CallArgs) -> Result<Expr, ParseError> {
        match self.scope.lookup(name) {
            Some(Definition::Callable(build)) => Ok(build(args)?),
            Some(Definition::Value(value)) => call_value(value.clone(), args),
            None => Err(ParseError::UnknownFunction(name.to_owned())),
        }
    }

    fn parse_call_args(&mut self) -> Result<CallArgs, ParseError> {
        self.expect(Token::LParen, "'('")?;
        let mut args = CallArgs::default();
        while !self.consume(Token::RParen) {
            if self.peek_token() == Some(Token::Ident)
                && self.peek_token_at(1) == Some(Token::Assign)
            {
                let keyword = self
                    .next()
                    .map(|t| t.lexeme)
                    .ok_or_else(|| self.unexpected("keyword"))?;
                self.pos += 1;
                args.keywords.push((keyword, self.parse_relational()?));
            } else {
                args.positional.push(self.parse_relational()?);
            }
            if !self.consume(Token::Comma) {
                self.expect(Token::RParen, "',' or ')'")?;
                break;
            }
        }
        Ok(args)
    }

    fn parse_subscript(&mut self) -> Result<Vec<Expr>, ParseError> {
        self.expect(Token::LBracket, "'['")?;
        if self.peek_token() == Some(Token::RBracket) {
            return Err(self.unexpected("index"));
        }
        self.parse_sequence(Token::RBracket, "',' or ']'")
    }

    /// Comma-separated expressions up to `close`, trailing comma allowed.
    fn parse_sequence(&mut self, close: Token, expected: &str) -> Result<Vec<Expr>, ParseError> {
        let mut items = Vec::new();
        while !self.consume(close) {
            items.push(self.parse_relational()?);
            if !self.consume(Token::Comma) {
                self.expect(close, expected)?;
                break;
            }
        }
        Ok(items)
    }

    // ── Atoms ──────────────────────────────────────────────────────

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let Some(tok) = self.next() else {
            return Err(ParseError::UnexpectedEof {
                expected: "expression".into(),
            });
        };
        match tok.token {
            Token::Integer => tok
                .lexeme
                .parse::<i64>()
                .map(Expr::Integer)
                .map_err(|_| ParseError::IntegerOverflow(tok.lexeme)),
            Token::Float => tok
                .lexeme
                .parse::<f64>()
                .map(Expr::Float)
                .map_err(|_| ParseError::UnexpectedToken {
                    found: tok.lexeme.clone(),
                    expected: "number".into(),
                    pos: tok.start,
                }),
            Token::Str => Ok(Expr::Str(unquote(&tok.lexeme))),
            Token::LParen => self.parse_paren(),
            Token::LBracket => Ok(Expr::List(self.parse_sequence(Token::RBracket, "',' or ']'")?)),
            _ => Err(ParseError::UnexpectedToken {
                found: tok.lexeme,
                expected: "expression".into(),
                pos: tok.start,
            }),
        }
    }

    /// After `(`: a parenthesized expression or a tuple.
    fn parse_paren(&mut self) -> Result<Expr, ParseError> {
        if self.consume(Token::RParen) {
            return Ok(Expr::Tuple(Vec::new()));
        }
        let first = self.parse_relational()?;
        if self.consume(Token::RParen) {
            return Ok(first);
        }
        self.expect(Token::Comma, "',' or ')'")?;
        let mut items = vec![first];
        items.extend(self.parse_sequence(Token::RParen, "',' or ')'")?);
        Ok(Expr::Tuple(items))
    }
}

fn call_value(callee: Expr, args: CallArgs) -> Result<Expr, ParseError> {
    match callee {
        Expr::Function(name) => {
            args.no_keywords(&name)?;
            Ok(Expr::apply(name, args.positional))
        }
        other => Err(ParseError::NotCallable(other.to_string())),
    }
}

fn subscript(base: Expr, indices: Vec<Expr>) -> Result<Expr, ParseError> {
    match base {
        Expr::IndexedBase(name) => Ok(Expr::Indexed {
            base: name,
            indices,
        }),
        other => Err(ParseError::NotSubscriptable(other.to_string())),
    }
}

fn unquote(lexeme: &str) -> String {
    let inner = &lexeme[1..lexeme.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}
