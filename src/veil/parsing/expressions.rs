//! Expression parsing
//!
//!     Priority climbing over Lua's binary operator table (see [`BinaryOp::priority`]).
//!     A binary operator is consumed while its left priority is above the current limit, and
//!     its right operand is parsed with the right priority as the new limit, which makes `..`
//!     and `^` right associative. Unary operators parse their operand at [`UNARY_PRIORITY`], so
//!     `-x^2` is `-(x^2)`.

use super::{ParseError, Parser};
use crate::veil::ast::{BinaryOp, Expr, ExprKind, Range, TableField, UnaryOp, UNARY_PRIORITY};
use crate::veil::dialect::Dialect;
use crate::veil::token::Token;

fn unary_op(token: &Token) -> Option<UnaryOp> {
    match token {
        Token::Not => Some(UnaryOp::Not),
        Token::Hash => Some(UnaryOp::Len),
        Token::Minus => Some(UnaryOp::Neg),
        _ => None,
    }
}

fn binary_op(token: &Token) -> Option<BinaryOp> {
    match token {
        Token::Or => Some(BinaryOp::Or),
        Token::And => Some(BinaryOp::And),
        Token::Lt => Some(BinaryOp::Lt),
        Token::Gt => Some(BinaryOp::Gt),
        Token::Le => Some(BinaryOp::Le),
        Token::Ge => Some(BinaryOp::Ge),
        Token::Ne => Some(BinaryOp::Ne),
        Token::Eq => Some(BinaryOp::Eq),
        Token::Concat => Some(BinaryOp::Concat),
        Token::Plus => Some(BinaryOp::Add),
        Token::Minus => Some(BinaryOp::Sub),
        Token::Star => Some(BinaryOp::Mul),
        Token::Slash => Some(BinaryOp::Div),
        Token::Percent => Some(BinaryOp::Mod),
        Token::Caret => Some(BinaryOp::Pow),
        _ => None,
    }
}

impl Parser<'_> {
    pub(super) fn expression(&mut self) -> Result<Expr, ParseError> {
        self.sub_expression(0)
    }

    pub(super) fn expression_list(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut exprs = vec![self.expression()?];
        while self.test_next(&Token::Comma) {
            exprs.push(self.expression()?);
        }
        Ok(exprs)
    }

    /// Field and method names: any name, including ones reserved only in LuaU.
    pub(super) fn expect_field_name(&mut self) -> Result<String, ParseError> {
        match self.peek().clone() {
            Token::Name(name) if !Dialect::Lua51.is_keyword(&name) => {
                self.advance();
                Ok(name)
            }
            _ => Err(self.expected(&["<name>".to_string()])),
        }
    }

    fn sub_expression(&mut self, limit: u8) -> Result<Expr, ParseError> {
        self.nested(|p| p.operator_expression(limit))
    }

    fn operator_expression(&mut self, limit: u8) -> Result<Expr, ParseError> {
        let start = self.current_range();
        let mut expr = match unary_op(self.peek()) {
            Some(op) => {
                self.advance();
                let operand = self.sub_expression(UNARY_PRIORITY)?;
                Expr::at(
                    ExprKind::Unary {
                        op,
                        operand: Box::new(operand),
                    },
                    self.span_from(&start),
                )
            }
            None => self.simple_expression()?,
        };

        while let Some(op) = binary_op(self.peek()) {
            let (left, right) = op.priority();
            if left <= limit {
                break;
            }
            self.advance();
            let rhs = self.sub_expression(right)?;
            expr = Expr::at(
                ExprKind::Binary {
                    op,
                    left: Box::new(expr),
                    right: Box::new(rhs),
                },
                self.span_from(&start),
            );
        }
        Ok(expr)
    }

    fn simple_expression(&mut self) -> Result<Expr, ParseError> {
        let start = self.current_range();
        let kind = match self.peek().clone() {
            Token::Number(value) => ExprKind::Number(value),
            Token::String(bytes) => ExprKind::String(bytes),
            Token::Nil => ExprKind::Nil,
            Token::True => ExprKind::True,
            Token::False => ExprKind::False,
            Token::Ellipsis => {
                if !self.function().is_vararg {
                    return Err(self.error("cannot use '...' outside a vararg function"));
                }
                ExprKind::Vararg
            }
            Token::LBrace => return self.table_constructor(),
            Token::Function => {
                self.advance();
                let function = self.function_body(false, &start)?;
                return Ok(Expr::at(
                    ExprKind::Function(Box::new(function)),
                    self.span_from(&start),
                ));
            }
            _ => return self.suffixed_expression(),
        };
        self.advance();
        Ok(Expr::at(kind, start))
    }

    fn primary_expression(&mut self) -> Result<Expr, ParseError> {
        let start = self.current_range();
        match self.peek().clone() {
            Token::Name(name) if !self.dialect.is_keyword(&name) => {
                self.advance();
                let id = self.reference_name(&name, start.clone());
                Ok(Expr::at(ExprKind::Variable(id), start))
            }
            Token::LParen => {
                self.advance();
                let inner = self.expression()?;
                self.expect_match(&Token::RParen, &Token::LParen, &start)?;
                Ok(Expr::at(
                    ExprKind::Paren(Box::new(inner)),
                    self.span_from(&start),
                ))
            }
            _ => Err(self.error(format!("unexpected symbol near {}", self.peek()))),
        }
    }

    /// A primary expression followed by any number of `.name`, `[key]`, `:m(args)` and
    /// `(args)` suffixes.
    pub(super) fn suffixed_expression(&mut self) -> Result<Expr, ParseError> {
        let start = self.current_range();
        let mut expr = self.primary_expression()?;
        loop {
            let kind = match self.peek() {
                Token::Dot => {
                    self.advance();
                    let name = self.expect_field_name()?;
                    ExprKind::Member {
                        object: Box::new(expr),
                        name,
                    }
                }
                Token::LBracket => {
                    let open = self.advance().range;
                    let key = self.expression()?;
                    self.expect_match(&Token::RBracket, &Token::LBracket, &open)?;
                    ExprKind::Index {
                        object: Box::new(expr),
                        key: Box::new(key),
                    }
                }
                Token::Colon => {
                    self.advance();
                    let method = self.expect_field_name()?;
                    let arguments = self.call_arguments()?;
                    ExprKind::MethodCall {
                        receiver: Box::new(expr),
                        method,
                        arguments,
                    }
                }
                Token::LParen | Token::String(_) | Token::LBrace => {
                    let arguments = self.call_arguments()?;
                    ExprKind::Call {
                        callee: Box::new(expr),
                        arguments,
                    }
                }
                _ => return Ok(expr),
            };
            expr = Expr::at(kind, self.span_from(&start));
        }
    }

    fn call_arguments(&mut self) -> Result<Vec<Expr>, ParseError> {
        let start = self.current_range();
        match self.peek().clone() {
            Token::String(bytes) => {
                self.advance();
                Ok(vec![Expr::at(ExprKind::String(bytes), start)])
            }
            Token::LBrace => Ok(vec![self.table_constructor()?]),
            Token::LParen => {
                self.advance();
                if self.test_next(&Token::RParen) {
                    return Ok(Vec::new());
                }
                let arguments = self.expression_list()?;
                self.expect_match(&Token::RParen, &Token::LParen, &start)?;
                Ok(arguments)
            }
            _ => Err(self.expected(&["function arguments".to_string()])),
        }
    }

    fn table_constructor(&mut self) -> Result<Expr, ParseError> {
        let open: Range = self.expect(&Token::LBrace)?;
        let mut fields = Vec::new();

        while !self.check(&Token::RBrace) {
            let field = match self.peek() {
                Token::LBracket => {
                    let bracket = self.advance().range;
                    let key = self.expression()?;
                    self.expect_match(&Token::RBracket, &Token::LBracket, &bracket)?;
                    self.expect(&Token::Assign)?;
                    TableField::Keyed(key, self.expression()?)
                }
                Token::Name(_) if self.peek_at(1) == &Token::Assign => {
                    let name = self.expect_field_name()?;
                    self.advance();
                    TableField::Named(name, self.expression()?)
                }
                _ => TableField::Positional(self.expression()?),
            };
            fields.push(field);
            if !self.test_next(&Token::Comma) && !self.test_next(&Token::Semicolon) {
                break;
            }
        }
        self.expect_match(&Token::RBrace, &Token::LBrace, &open)?;
        Ok(Expr::at(ExprKind::Table(fields), self.span_from(&open)))
    }
}

#[cfg(test)]
mod tests {
    use crate::veil::ast::{BinaryOp, Chunk, Expr, ExprKind, StmtKind, TableField, UnaryOp};
    use crate::veil::dialect::Dialect;
    use crate::veil::parsing::parse_source;

    fn returned(source: &str) -> Expr {
        let chunk: Chunk = parse_source(&format!("return {}", source), Dialect::Lua51).unwrap();
        match chunk.body.statements.into_iter().next().map(|s| s.kind) {
            Some(StmtKind::Return(mut values)) => values.remove(0),
            other => panic!("expected return, got {:?}", other),
        }
    }

    fn binary(expr: &Expr) -> (BinaryOp, &Expr, &Expr) {
        match &expr.kind {
            ExprKind::Binary { op, left, right } => (*op, left, right),
            other => panic!("expected binary, got {:?}", other),
        }
    }

    #[test]
    fn test_left_associative_arithmetic() {
        let expr = returned("1 - 2 - 3");
        let (op, left, right) = binary(&expr);
        assert_eq!(op, BinaryOp::Sub);
        assert_eq!(right.kind, ExprKind::Number(3.0));
        assert_eq!(binary(left).0, BinaryOp::Sub);
    }

    #[test]
    fn test_right_associative_concat_and_pow() {
        let expr = returned("a .. b .. c");
        let (_, left, right) = binary(&expr);
        assert!(matches!(left.kind, ExprKind::Variable(_)));
        assert_eq!(binary(right).0, BinaryOp::Concat);

        let expr = returned("2 ^ 3 ^ 2");
        let (_, left, right) = binary(&expr);
        assert_eq!(left.kind, ExprKind::Number(2.0));
        assert_eq!(binary(right).0, BinaryOp::Pow);
    }

    #[test]
    fn test_unary_binds_looser_than_pow() {
        let expr = returned("-x ^ 2");
        match &expr.kind {
            ExprKind::Unary { op, operand } => {
                assert_eq!(*op, UnaryOp::Neg);
                assert_eq!(binary(operand).0, BinaryOp::Pow);
            }
            other => panic!("expected unary, got {:?}", other),
        }
    }

    #[test]
    fn test_precedence_mix() {
        let expr = returned("a or b and c == d + e * f");
        let (op, _, right) = binary(&expr);
        assert_eq!(op, BinaryOp::Or);
        let (op, _, right) = binary(right);
        assert_eq!(op, BinaryOp::And);
        let (op, _, right) = binary(right);
        assert_eq!(op, BinaryOp::Eq);
        let (op, _, right) = binary(right);
        assert_eq!(op, BinaryOp::Add);
        assert_eq!(binary(right).0, BinaryOp::Mul);
    }

    #[test]
    fn test_parens_are_kept() {
        let expr = returned("(f())");
        assert!(matches!(expr.kind, ExprKind::Paren(_)));
    }

    #[test]
    fn test_table_fields() {
        let expr = returned("{ 1, x = 2; [3] = 4, }");
        let ExprKind::Table(fields) = expr.kind else {
            panic!("expected table");
        };
        assert!(matches!(fields[0], TableField::Positional(_)));
        assert!(matches!(&fields[1], TableField::Named(name, _) if name == "x"));
        assert!(matches!(fields[2], TableField::Keyed(_, _)));
        assert_eq!(fields.len(), 3);
    }

    #[test]
    fn test_call_forms() {
        let expr = returned("obj:method 'x' .field [1] {}");
        assert!(matches!(expr.kind, ExprKind::Call { .. }));
    }
}
