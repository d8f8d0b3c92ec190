//! Recursive descent expression parser.
//!
//! Parses a token stream from [`crate::eval::tokenizer`] into an [`Expr`],
//! following Python's operator precedence from the conditional expression
//! down to atoms.

use super::ast::*;
use super::tokenizer::{tokenize, Spanned, Token};
use super::value::Value;
use super::EvalError;

/// Parse `source` as a single expression.
pub fn parse_expression(source: &str) -> Result<Expr, EvalError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        tokens,
        cursor: 0,
        end: source.len(),
    };
    if parser.is_eof() {
        return Err(EvalError::Syntax {
            position: 0,
            message: "empty expression".into(),
        });
    }
    let expr = parser.parse_expression_list()?;
    match parser.peek() {
        None => Ok(expr),
        Some(tok) => Err(parser.unexpected(tok.span.start, &tok.text)),
    }
}

/// Recursive descent parser state.
struct Parser {
    tokens: Vec<Spanned>,
    cursor: usize,
    end: usize,
}

impl Parser {
    fn is_eof(&self) -> bool {
        self.cursor >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Spanned> {
        self.tokens.get(self.cursor)
    }

    fn peek_token(&self) -> Option<Token> {
        self.peek().map(|t| t.token)
    }

    fn peek_nth_token(&self, n: usize) -> Option<Token> {
        self.tokens.get(self.cursor + n).map(|t| t.token)
    }

    fn advance(&mut self) -> Option<Spanned> {
        let tok = self.tokens.get(self.cursor).cloned();
        if tok.is_some() {
            self.cursor += 1;
        }
        tok
    }

    fn eat(&mut self, token: Token) -> bool {
        if self.peek_token() == Some(token) {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    fn current_pos(&self) -> usize {
        self.peek().map(|t| t.span.start).unwrap_or(self.end)
    }

    fn unexpected(&self, position: usize, text: &str) -> EvalError {
        EvalError::Syntax {
            position,
            message: format!("unexpected token '{text}'"),
        }
    }

    fn expect(&mut self, expected: Token, what: &str) -> Result<Spanned, EvalError> {
        match self.advance() {
            Some(tok) if tok.token == expected => Ok(tok),
            Some(tok) => Err(EvalError::Syntax {
                position: tok.span.start,
                message: format!("expected {what}, got '{}'", tok.text),
            }),
            None => Err(EvalError::Syntax {
                position: self.end,
                message: format!("expected {what}, got end of input"),
            }),
        }
    }

    /// Whether the next token can start an expression.
    fn at_expression_start(&self) -> bool {
        matches!(
            self.peek_token(),
            Some(
                Token::Not
                    | Token::Lambda
                    | Token::NoneKw
                    | Token::True
                    | Token::False
                    | Token::FString
                    | Token::Str
                    | Token::Float
                    | Token::Int
                    | Token::Name
                    | Token::Plus
                    | Token::Minus
                    | Token::Tilde
                    | Token::LParen
                    | Token::LBracket
                    | Token::LBrace
            )
        )
    }

    /// `expr ("," expr)* [","]`: a bare comma list is a tuple.
    fn parse_expression_list(&mut self) -> Result<Expr, EvalError> {
        let first = self.parse_expression()?;
        if self.peek_token() != Some(Token::Comma) {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat(Token::Comma) {
            if !self.at_expression_start() {
                break;
            }
            items.push(self.parse_expression()?);
        }
        Ok(Expr::Tuple(items))
    }

    /// Conditional expression, lambda or named expression.
    fn parse_expression(&mut self) -> Result<Expr, EvalError> {
        if self.eat(Token::Lambda) {
            return self.parse_lambda();
        }
        if self.peek_token() == Some(Token::Name) && self.peek_nth_token(1) == Some(Token::Walrus) {
            let target = self.advance().map(|t| t.text).unwrap_or_default();
            self.advance();
            let value = self.parse_expression()?;
            return Ok(Expr::NamedExpr {
                target,
                value: Box::new(value),
            });
        }

        let body = self.parse_or()?;
        if !self.eat(Token::If) {
            return Ok(body);
        }
        let test = self.parse_or()?;
        self.expect(Token::Else, "'else'")?;
        let orelse = self.parse_expression()?;
        Ok(Expr::IfExp {
            test: Box::new(test),
            body: Box::new(body),
            orelse: Box::new(orelse),
        })
    }

    fn parse_lambda(&mut self) -> Result<Expr, EvalError> {
        let mut params = Vec::new();
        while self.peek_token() == Some(Token::Name) {
            params.push(self.advance().map(|t| t.text).unwrap_or_default());
            if !self.eat(Token::Comma) {
                break;
            }
        }
        self.expect(Token::Colon, "':'")?;
        let body = self.parse_expression()?;
        Ok(Expr::Lambda {
            params,
            body: Box::new(body),
        })
    }

    fn parse_or(&mut self) -> Result<Expr, EvalError> {
        let first = self.parse_and()?;
        if self.peek_token() != Some(Token::Or) {
            return Ok(first);
        }
        let mut values = vec![first];
        while self.eat(Token::Or) {
            values.push(self.parse_and()?);
        }
        Ok(Expr::BoolOp {
            op: BoolOp::Or,
            values,
        })
    }

    fn parse_and(&mut self) -> Result<Expr, EvalError> {
        let first = self.parse_not()?;
        if self.peek_token() != Some(Token::And) {
            return Ok(first);
        }
        let mut values = vec![first];
        while self.eat(Token::And) {
            values.push(self.parse_not()?);
        }
        Ok(Expr::BoolOp {
            op: BoolOp::And,
            values,
        })
    }

    fn parse_not(&mut self) -> Result<Expr, EvalError> {
        if self.eat(Token::Not) {
            let operand = self.parse_not()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            });
        }
        self.parse_comparison()
    }

    fn comparison_op(&mut self) -> Option<CmpOp> {
        let op = match self.peek_token()? {
            Token::EqEq => CmpOp::Eq,
            Token::NotEq => CmpOp::NotEq,
            Token::Lt => CmpOp::Lt,
            Token::LtE => CmpOp::LtE,
            Token::Gt => CmpOp::Gt,
            Token::GtE => CmpOp::GtE,
            Token::In => CmpOp::In,
            Token::Not if self.peek_nth_token(1) == Some(Token::In) => {
                self.cursor += 2;
                return Some(CmpOp::NotIn);
            }
            Token::Is if self.peek_nth_token(1) == Some(Token::Not) => {
                self.cursor += 2;
                return Some(CmpOp::IsNot);
            }
            Token::Is => CmpOp::Is,
            _ => return None,
        };
        self.cursor += 1;
        Some(op)
    }

    fn parse_comparison(&mut self) -> Result<Expr, EvalError> {
        let left = self.parse_bitor()?;
        let mut comparisons = Vec::new();
        while let Some(op) = self.comparison_op() {
            comparisons.push((op, self.parse_bitor()?));
        }
        if comparisons.is_empty() {
            Ok(left)
        } else {
            Ok(Expr::Compare {
                left: Box::new(left),
                comparisons,
            })
        }
    }

    /// One left-associative binary precedence level.
    fn parse_binary_level(
        &mut self,
        ops: &[(Token, BinOp)],
        next: fn(&mut Self) -> Result<Expr, EvalError>,
    ) -> Result<Expr, EvalError> {
        let mut left = next(self)?;
        'outer: loop {
            for &(token, op) in ops {
                if self.eat(token) {
                    let right = next(self)?;
                    left = Expr::Binary {
                        op,
                        left: Box::new(left),
                        right: Box::new(right),
                    };
                    continue 'outer;
                }
            }
            return Ok(left);
        }
    }

    fn parse_bitor(&mut self) -> Result<Expr, EvalError> {
        self.parse_binary_level(&[(Token::Pipe, BinOp::BitOr)], Self::parse_bitxor)
    }

    fn parse_bitxor(&mut self) -> Result<Expr, EvalError> {
        self.parse_binary_level(&[(Token::Caret, BinOp::BitXor)], Self::parse_bitand)
    }

    fn parse_bitand(&mut self) -> Result<Expr, EvalError> {
        self.parse_binary_level(&[(Token::Amp, BinOp::BitAnd)], Self::parse_shift)
    }

    fn parse_shift(&mut self) -> Result<Expr, EvalError> {
        self.parse_binary_level(
            &[(Token::LShift, BinOp::LShift), (Token::RShift, BinOp::RShift)],
            Self::parse_arith,
        )
    }

    fn parse_arith(&mut self) -> Result<Expr, EvalError> {
        self.parse_binary_level(
            &[(Token::Plus, BinOp::Add), (Token::Minus, BinOp::Sub)],
            Self::parse_term,
        )
    }

    fn parse_term(&mut self) -> Result<Expr, EvalError> {
        self.parse_binary_level(
            &[
                (Token::Star, BinOp::Mul),
                (Token::Slash, BinOp::Div),
                (Token::DoubleSlash, BinOp::FloorDiv),
                (Token::Percent, BinOp::Mod),
            ],
            Self::parse_factor,
        )
    }

    fn parse_factor(&mut self) -> Result<Expr, EvalError> {
        let op = match self.peek_token() {
            Some(Token::Minus) => UnaryOp::Neg,
            Some(Token::Plus) => UnaryOp::Pos,
            Some(Token::Tilde) => UnaryOp::Invert,
            _ => return self.parse_power(),
        };
        self.cursor += 1;
        let operand = self.parse_factor()?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_power(&mut self) -> Result<Expr, EvalError> {
        let base = self.parse_primary()?;
        if self.eat(Token::DoubleStar) {
            let exponent = self.parse_factor()?;
            return Ok(Expr::Binary {
                op: BinOp::Pow,
                left: Box::new(base),
                right: Box::new(exponent),
            });
        }
        Ok(base)
    }

    /// Atom followed by any number of call, subscript and attribute trailers.
    fn parse_primary(&mut self) -> Result<Expr, EvalError> {
        let mut expr = self.parse_atom()?;
        loop {
            if self.eat(Token::LParen) {
                expr = self.parse_call(expr)?;
            } else if self.eat(Token::LBracket) {
                let index = self.parse_subscript()?;
                self.expect(Token::RBracket, "']'")?;
                expr = Expr::Subscript {
                    value: Box::new(expr),
                    index: Box::new(index),
                };
            } else if self.eat(Token::Dot) {
                let attr = self.expect(Token::Name, "attribute name")?;
                expr = Expr::Attribute {
                    value: Box::new(expr),
                    attr: attr.text,
                };
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_call(&mut self, func: Expr) -> Result<Expr, EvalError> {
        let mut args = Vec::new();
        let mut keywords = Vec::new();
        while !self.eat(Token::RParen) {
            if matches!(self.peek_token(), Some(Token::Star | Token::DoubleStar)) {
                return Err(EvalError::Syntax {
                    position: self.current_pos(),
                    message: "argument unpacking is not supported".into(),
                });
            }
            if self.peek_token() == Some(Token::Name)
                && self.peek_nth_token(1) == Some(Token::Assign)
            {
                let name = self.advance().map(|t| t.text).unwrap_or_default();
                self.advance();
                keywords.push((name, self.parse_expression()?));
            } else if !keywords.is_empty() {
                return Err(EvalError::Syntax {
                    position: self.current_pos(),
                    message: "positional argument follows keyword argument".into(),
                });
            } else {
                args.push(self.parse_expression()?);
            }
            if !self.eat(Token::Comma) {
                self.expect(Token::RParen, "')'")?;
                break;
            }
        }
        Ok(Expr::Call {
            func: Box::new(func),
            args,
            keywords,
        })
    }

    /// Index inside `[...]`: a plain expression, a tuple, or a slice.
    fn parse_subscript(&mut self) -> Result<Expr, EvalError> {
        let lower = if matches!(self.peek_token(), Some(Token::Colon)) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        if !self.eat(Token::Colon) {
            let first = lower.ok_or_else(|| self.unexpected(self.current_pos(), ":"))?;
            if self.peek_token() != Some(Token::Comma) {
                return Ok(first);
            }
            let mut items = vec![first];
            while self.eat(Token::Comma) {
                if self.peek_token() == Some(Token::RBracket) {
                    break;
                }
                items.push(self.parse_expression()?);
            }
            return Ok(Expr::Tuple(items));
        }
        let upper = if matches!(self.peek_token(), Some(Token::Colon | Token::RBracket)) {
            None
        } else {
            Some(Box::new(self.parse_expression()?))
        };
        let step = if self.eat(Token::Colon) && self.peek_token() != Some(Token::RBracket) {
            Some(Box::new(self.parse_expression()?))
        } else {
            None
        };
        Ok(Expr::Slice {
            lower: lower.map(Box::new),
            upper,
            step,
        })
    }

    fn parse_atom(&mut self) -> Result<Expr, EvalError> {
        let Some(tok) = self.advance() else {
            return Err(EvalError::Syntax {
                position: self.end,
                message: "unexpected end of input".into(),
            });
        };
        match tok.token {
            Token::NoneKw => Ok(Expr::Constant(Value::None)),
            Token::True => Ok(Expr::Constant(Value::Bool(true))),
            Token::False => Ok(Expr::Constant(Value::Bool(false))),
            Token::Name => Ok(Expr::Name(tok.text)),
            Token::Int => tok
                .text
                .parse::<i64>()
                .map(|i| Expr::Constant(Value::Int(i)))
                .or_else(|_| {
                    // Too large for i64: Python would keep it exact, we degrade to float.
                    tok.text
                        .parse::<f64>()
                        .map(|f| Expr::Constant(Value::Float(f)))
                        .map_err(|e| EvalError::Syntax {
                            position: tok.span.start,
                            message: e.to_string(),
                        })
                }),
            Token::Float => tok
                .text
                .parse::<f64>()
                .map(|f| Expr::Constant(Value::Float(f)))
                .map_err(|e| EvalError::Syntax {
                    position: tok.span.start,
                    message: e.to_string(),
                }),
            Token::Str | Token::FString => self.parse_strings(tok),
            Token::LParen => {
                if self.eat(Token::RParen) {
                    return Ok(Expr::Tuple(Vec::new()));
                }
                let inner = self.parse_expression_list()?;
                self.expect(Token::RParen, "')'")?;
                Ok(inner)
            }
            Token::LBracket => {
                let items = self.parse_display_items(Token::RBracket, "']'")?;
                Ok(Expr::List(items))
            }
            Token::LBrace => self.parse_brace_display(),
            _ => Err(self.unexpected(tok.span.start, &tok.text)),
        }
    }

    fn parse_display_items(&mut self, close: Token, what: &str) -> Result<Vec<Expr>, EvalError> {
        let mut items = Vec::new();
        while !self.eat(close) {
            items.push(self.parse_expression()?);
            if !self.eat(Token::Comma) {
                self.expect(close, what)?;
                break;
            }
        }
        Ok(items)
    }

    /// `{}` / `{k: v, ...}` is a dict, `{a, b}` a set.
    fn parse_brace_display(&mut self) -> Result<Expr, EvalError> {
        if self.eat(Token::RBrace) {
            return Ok(Expr::Dict(Vec::new()));
        }
        let first = self.parse_expression()?;
        if !self.eat(Token::Colon) {
            let mut items = vec![first];
            if self.eat(Token::Comma) {
                items.extend(self.parse_display_items(Token::RBrace, "'}'")?);
            } else {
                self.expect(Token::RBrace, "'}'")?;
            }
            return Ok(Expr::Set(items));
        }
        let mut pairs = vec![(first, self.parse_expression()?)];
        while self.eat(Token::Comma) {
            if self.peek_token() == Some(Token::RBrace) {
                break;
            }
            let key = self.parse_expression()?;
            self.expect(Token::Colon, "':'")?;
            pairs.push((key, self.parse_expression()?));
        }
        self.expect(Token::RBrace, "'}'")?;
        Ok(Expr::Dict(pairs))
    }

    /// One or more adjacent string literals, concatenated.
    fn parse_strings(&mut self, first: Spanned) -> Result<Expr, EvalError> {
        let mut parts: Vec<FStringPart> = Vec::new();
        let mut formatted = false;
        let mut next = Some(first);
        while let Some(tok) = next {
            let offset = tok.span.start;
            if tok.token == Token::FString {
                formatted = true;
                let body = &tok.text[2..tok.text.len() - 1];
                parts.extend(parse_fstring_body(body, offset + 2)?);
            } else {
                let body = &tok.text[1..tok.text.len() - 1];
                parts.push(FStringPart::Literal(unescape(body)));
            }
            next = if matches!(self.peek_token(), Some(Token::Str | Token::FString)) {
                self.advance()
            } else {
                None
            };
        }

        // Merge neighbouring literal runs.
        let mut merged: Vec<FStringPart> = Vec::with_capacity(parts.len());
        for part in parts {
            match (merged.last_mut(), part) {
                (Some(FStringPart::Literal(acc)), FStringPart::Literal(s)) => acc.push_str(&s),
                (_, part) => merged.push(part),
            }
        }

        if formatted {
            return Ok(Expr::FString(merged));
        }
        let text = match merged.pop() {
            Some(FStringPart::Literal(s)) => s,
            _ => String::new(),
        };
        Ok(Expr::Constant(Value::Str(text)))
    }
}

/// Split the body of an f-string into literal runs and `{expr}` parts.
fn parse_fstring_body(body: &str, offset: usize) -> Result<Vec<FStringPart>, EvalError> {
    let mut parts = Vec::new();
    let mut literal = String::new();
    let mut chars = body.char_indices().peekable();

    while let Some((i, ch)) = chars.next() {
        match ch {
            '{' if chars.peek().map(|(_, c)| *c) == Some('{') => {
                chars.next();
                literal.push('{');
            }
            '}' if chars.peek().map(|(_, c)| *c) == Some('}') => {
                chars.next();
                literal.push('}');
            }
            '{' => {
                let start = i + 1;
                let mut depth = 1usize;
                let mut quote: Option<char> = None;
                let mut end = None;
                for (j, c) in chars.by_ref() {
                    match (quote, c) {
                        (Some(q), c) if c == q => quote = None,
                        (Some(_), _) => {}
                        (None, '\'' | '"') => quote = Some(c),
                        (None, '{' | '[' | '(') => depth += 1,
                        (None, '}' | ']' | ')') => {
                            depth -= 1;
                            if depth == 0 {
                                end = Some(j);
                                break;
                            }
                        }
                        _ => {}
                    }
                }
                let end = end.ok_or_else(|| EvalError::Syntax {
                    position: offset + i,
                    message: "f-string: expecting '}'".into(),
                })?;
                if !literal.is_empty() {
                    parts.push(FStringPart::Literal(unescape(&std::mem::take(&mut literal))));
                }
                let inner = parse_expression(&body[start..end]).map_err(|err| match err {
                    EvalError::Syntax { position, message } => EvalError::Syntax {
                        position: offset + start + position,
                        message,
                    },
                    other => other,
                })?;
                parts.push(FStringPart::Expr(inner));
            }
            '}' => {
                return Err(EvalError::Syntax {
                    position: offset + i,
                    message: "f-string: single '}' is not allowed".into(),
                })
            }
            c => literal.push(c),
        }
    }
    if !literal.is_empty() {
        parts.push(FStringPart::Literal(unescape(&literal)));
    }
    Ok(parts)
}

/// Resolve backslash escapes in a string literal body.
///
/// Unknown escapes keep their backslash, as Python does.
fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some(kind @ ('x' | 'u')) => {
                let width = if kind == 'x' { 2 } else { 4 };
                let hex: String = chars.clone().take(width).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) if hex.len() == width => {
                        out.push(decoded);
                        for _ in 0..width {
                            chars.next();
                        }
                    }
                    _ => {
                        out.push('\\');
                        out.push(kind);
                    }
                }
            }
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

// ===========================================================================
// Tests
// ===========================================================================
