//! Recursive-descent parser producing the expression AST.

use super::lexer::{Spanned, Token, tokenize};
use crate::error::{EddyError, Result};
use serde_json::Value as JsonValue;

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum UnaryOp {
    Not,
    Neg,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

/// Expression node.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Literal(JsonValue),
    Array(Vec<Expr>),
    Ident(String),
    Member(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    Call(Box<Expr>, Vec<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Conditional(Box<Expr>, Box<Expr>, Box<Expr>),
}

/// Statement node.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Stmt {
    Let(String, Expr),
    Assign(Expr, Expr),
    Expr(Expr),
}

/// Parse a program: statements separated by `;`.
pub(crate) fn parse_program(source: &str) -> Result<Vec<Stmt>> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        source,
        tokens,
        pos: 0,
    };

    let mut stmts = Vec::new();
    while !parser.at_end() {
        if parser.eat(&Token::Semicolon) {
            continue;
        }
        stmts.push(parser.statement()?);
        if !parser.at_end() {
            parser.expect(&Token::Semicolon, "';' between statements")?;
        }
    }

    if stmts.is_empty() {
        return Err(parser.error_here("empty expression"));
    }
    Ok(stmts)
}

struct Parser<'s> {
    source: &'s str,
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Parser<'_> {
    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|s| s.token.clone());
        self.pos += 1;
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token, what: &str) -> Result<()> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.error_here(&format!("expected {}", what)))
        }
    }

    fn error_here(&self, cause: &str) -> EddyError {
        let position = self
            .tokens
            .get(self.pos)
            .map_or(self.source.len(), |s| s.pos);
        let found = match self.peek() {
            Some(token) => format!("{}, found {:?}", cause, token),
            None => format!("{}, found end of input", cause),
        };
        EddyError::ExpressionSyntax {
            expression: self.source.to_string(),
            position,
            cause: found,
        }
    }

    fn statement(&mut self) -> Result<Stmt> {
        if self.eat(&Token::Let) {
            let name = match self.advance() {
                Some(Token::Ident(name)) => name,
                _ => {
                    self.pos -= 1;
                    return Err(self.error_here("expected a name after 'let'"));
                }
            };
            self.expect(&Token::Assign, "'=' after let binding")?;
            let value = self.expression()?;
            return Ok(Stmt::Let(name, value));
        }

        let target = self.expression()?;
        if self.eat(&Token::Assign) {
            if !is_place(&target) {
                self.pos -= 1;
                return Err(self.error_here("left side of '=' is not assignable"));
            }
            let value = self.expression()?;
            return Ok(Stmt::Assign(target, value));
        }
        Ok(Stmt::Expr(target))
    }

    fn expression(&mut self) -> Result<Expr> {
        let cond = self.binary(0)?;
        if self.eat(&Token::Question) {
            let then = self.expression()?;
            self.expect(&Token::Colon, "':' in conditional expression")?;
            let otherwise = self.expression()?;
            return Ok(Expr::Conditional(
                Box::new(cond),
                Box::new(then),
                Box::new(otherwise),
            ));
        }
        Ok(cond)
    }

    /// Precedence climbing over the binary operator table.
    fn binary(&mut self, min_prec: u8) -> Result<Expr> {
        let mut lhs = self.unary()?;
        while let Some((op, prec)) = self.peek().and_then(binary_op) {
            if prec < min_prec {
                break;
            }
            self.pos += 1;
            let rhs = self.binary(prec + 1)?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr> {
        if self.eat(&Token::Not) {
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(self.unary()?)));
        }
        if self.eat(&Token::Minus) {
            return Ok(Expr::Unary(UnaryOp::Neg, Box::new(self.unary()?)));
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<Expr> {
        let mut expr = self.primary()?;
        loop {
            if self.eat(&Token::Dot) {
                match self.advance() {
                    Some(Token::Ident(name)) => expr = Expr::Member(Box::new(expr), name),
                    // Keywords are valid property names (`msg.let`, `x.null`)
                    Some(Token::Let) => expr = Expr::Member(Box::new(expr), "let".into()),
                    Some(Token::Null) => expr = Expr::Member(Box::new(expr), "null".into()),
                    _ => {
                        self.pos -= 1;
                        return Err(self.error_here("expected a property name after '.'"));
                    }
                }
            } else if self.eat(&Token::LBracket) {
                let index = self.expression()?;
                self.expect(&Token::RBracket, "']'")?;
                expr = Expr::Index(Box::new(expr), Box::new(index));
            } else if self.eat(&Token::LParen) {
                let args = self.list(&Token::RParen)?;
                expr = Expr::Call(Box::new(expr), args);
            } else {
                return Ok(expr);
            }
        }
    }

    fn primary(&mut self) -> Result<Expr> {
        let token = match self.advance() {
            Some(token) => token,
            None => {
                self.pos -= 1;
                return Err(self.error_here("expected an expression"));
            }
        };
        Ok(match token {
            Token::Number(n) => Expr::Literal(crate::value::Value::number(n).into_inner()),
            Token::Str(s) => Expr::Literal(JsonValue::String(s)),
            Token::True => Expr::Literal(JsonValue::Bool(true)),
            Token::False => Expr::Literal(JsonValue::Bool(false)),
            Token::Null => Expr::Literal(JsonValue::Null),
            Token::Ident(name) => Expr::Ident(name),
            Token::LParen => {
                let inner = self.expression()?;
                self.expect(&Token::RParen, "')'")?;
                inner
            }
            Token::LBracket => Expr::Array(self.list(&Token::RBracket)?),
            _ => {
                self.pos -= 1;
                return Err(self.error_here("expected an expression"));
            }
        })
    }

    /// Comma-separated expressions up to a closing token.
    fn list(&mut self, close: &Token) -> Result<Vec<Expr>> {
        let mut items = Vec::new();
        if self.eat(close) {
            return Ok(items);
        }
        loop {
            items.push(self.expression()?);
            if self.eat(close) {
                return Ok(items);
            }
            self.expect(&Token::Comma, "',' or closing bracket")?;
        }
    }
}

fn binary_op(token: &Token) -> Option<(BinaryOp, u8)> {
    Some(match token {
        Token::Or => (BinaryOp::Or, 1),
        Token::And => (BinaryOp::And, 2),
        Token::Eq => (BinaryOp::Eq, 3),
        Token::Ne => (BinaryOp::Ne, 3),
        Token::Lt => (BinaryOp::Lt, 4),
        Token::Le => (BinaryOp::Le, 4),
        Token::Gt => (BinaryOp::Gt, 4),
        Token::Ge => (BinaryOp::Ge, 4),
        Token::Plus => (BinaryOp::Add, 5),
        Token::Minus => (BinaryOp::Sub, 5),
        Token::Star => (BinaryOp::Mul, 6),
        Token::Slash => (BinaryOp::Div, 6),
        Token::Percent => (BinaryOp::Rem, 6),
        _ => return None,
    })
}

/// A place is an identifier followed by member or index accesses.
pub(crate) fn is_place(expr: &Expr) -> bool {
    match expr {
        Expr::Ident(_) => true,
        Expr::Member(base, _) | Expr::Index(base, _) => is_place(base),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn single(src: &str) -> Expr {
        match parse_program(src).unwrap().remove(0) {
            Stmt::Expr(e) => e,
            other => panic!("expected expression, got {other:?}"),
        }
    }

    #[test]
    fn precedence() {
        let expr = single("1 + 2 * 3 < 10 && ok");
        let Expr::Binary(BinaryOp::And, lhs, _) = expr else {
            panic!("expected &&");
        };
        let Expr::Binary(BinaryOp::Lt, sum, _) = *lhs else {
            panic!("expected <");
        };
        assert!(matches!(*sum, Expr::Binary(BinaryOp::Add, _, _)));
    }

    #[test]
    fn left_associative_subtraction() {
        let expr = single("10 - 3 - 2");
        let Expr::Binary(BinaryOp::Sub, lhs, rhs) = expr else {
            panic!("expected -");
        };
        assert!(matches!(*lhs, Expr::Binary(BinaryOp::Sub, _, _)));
        assert_eq!(*rhs, Expr::Literal(json!(2)));
    }

    #[test]
    fn member_index_and_call() {
        let expr = single("flow.get('k')[0].name");
        let Expr::Member(base, name) = expr else {
            panic!("expected member");
        };
        assert_eq!(name, "name");
        assert!(matches!(*base, Expr::Index(_, _)));
    }

    #[test]
    fn statements() {
        let program = parse_program("let n = 2; msg.count = n * 2; msg.count > 3").unwrap();
        assert_eq!(program.len(), 3);
        assert!(matches!(program[0], Stmt::Let(_, _)));
        assert!(matches!(program[1], Stmt::Assign(_, _)));
        assert!(matches!(program[2], Stmt::Expr(_)));
    }

    #[test]
    fn trailing_semicolons_are_fine() {
        assert_eq!(parse_program("1;;").unwrap().len(), 1);
    }

    #[test]
    fn conditional_expression() {
        assert!(matches!(single("a ? 1 : 2"), Expr::Conditional(_, _, _)));
    }

    #[test]
    fn syntax_errors() {
        assert!(parse_program("").is_err());
        assert!(parse_program("1 +").is_err());
        assert!(parse_program("(1").is_err());
        assert!(parse_program("1 = 2").is_err());
        assert!(parse_program("a b").is_err());
        assert!(parse_program("msg.").is_err());
    }
}
