use crate::ast::{Block, Expr, ExprKind, FunDecl, NodeId, NodeIdAllocator, Stmt};
use crate::common::diagnostic::{Diagnostic, DiagnosticKind};
use crate::token::{Literal, Token, TokenKind, Tokens};
use std::rc::Rc;

const MAX_ARGS: usize = 255;

/// Recursive-descent parser, one token of lookahead. Produces a list of
/// top-level statements and accumulates diagnostics as it goes rather
/// than aborting on the first error; each statement-level failure is
/// recovered from by synchronizing to the next statement boundary.
pub struct Parser {
    tokens: Tokens,
    current: usize,
    ids: NodeIdAllocator,
    diagnostics: Vec<Diagnostic>,
}

type ExprResult = Result<Expr, ()>;
type StmtResult = Result<Stmt, ()>;

impl Parser {
    pub fn parse(tokens: Tokens) -> (Vec<Stmt>, Vec<Diagnostic>) {
        let mut parser = Parser { tokens, current: 0, ids: NodeIdAllocator::new(), diagnostics: vec![] };
        let mut statements = vec![];

        while !parser.at_end() {
            match parser.declaration() {
                Ok(stmt) => statements.push(stmt),
                Err(()) => parser.synchronize(),
            }
        }

        (statements, parser.diagnostics)
    }

    // --- token stream primitives -----------------------------------

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current - 1]
    }

    fn at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn check(&self, kind: TokenKind) -> bool {
        !self.at_end() && self.peek().kind == kind
    }

    fn advance(&mut self) -> Token {
        if !self.at_end() {
            self.current += 1;
        }
        self.previous().clone()
    }

    fn matches(&mut self, kinds: &[TokenKind]) -> bool {
        for &kind in kinds {
            if self.check(kind) {
                self.advance();
                return true;
            }
        }
        false
    }

    fn consume(&mut self, kind: TokenKind, message: &str) -> Result<Token, ()> {
        if self.check(kind) {
            return Ok(self.advance());
        }
        self.error_at_current(message);
        Err(())
    }

    fn error_at_current(&mut self, message: impl Into<String>) {
        let span = self.peek().span.clone();
        self.diagnostics.push(Diagnostic::new(DiagnosticKind::SyntaxError, message, span));
    }

    fn error_at(&mut self, token: &Token, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic::new(DiagnosticKind::SyntaxError, message, token.span.clone()));
    }

    /// Skip tokens until the start of the next likely statement, so one
    /// parse error doesn't cascade into a flood of spurious ones.
    fn synchronize(&mut self) {
        while !self.at_end() {
            if self.previous().kind == TokenKind::Semicolon {
                return;
            }
            use TokenKind::*;
            match self.peek().kind {
                Class | Fun | Var | For | If | While | Return => return,
                _ => {}
            }
            self.advance();
        }
    }

    fn next_id(&mut self) -> NodeId {
        self.ids.alloc()
    }

    fn expr(&mut self, kind: ExprKind) -> Expr {
        Expr { id: self.next_id(), kind }
    }

    // --- statements --------------------------------------------------

    fn declaration(&mut self) -> StmtResult {
        if self.matches(&[TokenKind::Var]) {
            self.var_declaration()
        } else if self.check(TokenKind::Fun) && self.check_next(TokenKind::Identifier) {
            self.advance();
            self.fun_declaration("function")
        } else if self.matches(&[TokenKind::Class]) {
            self.class_declaration()
        } else {
            self.statement()
        }
    }

    /// Whether the token *after* the current one has the given kind,
    /// used to distinguish `fun IDENT(...)` declarations from `fun(...)`
    /// anonymous-function expression statements.
    fn check_next(&self, kind: TokenKind) -> bool {
        self.tokens.get(self.current + 1).map(|t| t.kind == kind).unwrap_or(false)
    }

    fn var_declaration(&mut self) -> StmtResult {
        let name = self.consume(TokenKind::Identifier, "Expected variable name")?;
        let init = if self.matches(&[TokenKind::Equal]) { Some(self.expression()?) } else { None };
        self.consume(TokenKind::Semicolon, "Expected ';' after variable declaration")?;
        Ok(Stmt::Var { name, init })
    }

    fn fun_declaration(&mut self, kind: &str) -> StmtResult {
        Ok(Stmt::Fun(Rc::new(self.fun_decl(kind)?)))
    }

    fn fun_decl(&mut self, kind: &str) -> Result<FunDecl, ()> {
        let name = self.consume(TokenKind::Identifier, &format!("Expected {} name", kind))?;
        let params = self.parameter_list()?;
        self.consume(TokenKind::LeftBrace, &format!("Expected '{{' before {} body", kind))?;
        let body = self.block()?;
        Ok(FunDecl { name, params, body })
    }

    fn parameter_list(&mut self) -> Result<Vec<Token>, ()> {
        self.consume(TokenKind::LeftParen, "Expected '(' after name")?;
        let mut params = vec![];
        if !self.check(TokenKind::RightParen) {
            loop {
                if params.len() >= MAX_ARGS {
                    self.error_at_current("Can't have more than 255 parameters");
                }
                let param = self.consume(TokenKind::Identifier, "Expected parameter name")?;
                params.push(param);
                if !self.matches(&[TokenKind::Comma]) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "Expected ')' after parameters")?;
        Ok(params)
    }

    fn class_declaration(&mut self) -> StmtResult {
        let name = self.consume(TokenKind::Identifier, "Expected class name")?;

        let superclass = if self.matches(&[TokenKind::Less]) {
            let super_name = self.consume(TokenKind::Identifier, "Expected superclass name")?;
            Some(self.expr(ExprKind::Identifier(super_name)))
        } else {
            None
        };

        self.consume(TokenKind::LeftBrace, "Expected '{' before class body")?;

        let mut methods = vec![];
        let mut static_methods = vec![];
        while !self.check(TokenKind::RightBrace) && !self.at_end() {
            let is_static = self.matches(&[TokenKind::Static]);
            match self.fun_decl("method") {
                Ok(decl) => {
                    if is_static {
                        static_methods.push(Rc::new(decl));
                    } else {
                        methods.push(Rc::new(decl));
                    }
                }
                Err(()) => self.synchronize(),
            }
        }

        self.consume(TokenKind::RightBrace, "Expected '}' after class body")?;
        Ok(Stmt::Class { name, superclass, methods, static_methods })
    }

    fn statement(&mut self) -> StmtResult {
        if self.matches(&[TokenKind::Print]) {
            return self.print_statement();
        }
        if self.matches(&[TokenKind::Return]) {
            return self.return_statement();
        }
        if self.matches(&[TokenKind::If]) {
            return self.if_statement();
        }
        if self.matches(&[TokenKind::While]) {
            return self.while_statement();
        }
        if self.matches(&[TokenKind::For]) {
            return self.for_statement();
        }
        if self.matches(&[TokenKind::LeftBrace]) {
            return Ok(Stmt::Block(self.block()?));
        }
        self.expression_statement()
    }

    fn print_statement(&mut self) -> StmtResult {
        let value = self.expression()?;
        self.consume(TokenKind::Semicolon, "Expected ';' after value")?;
        Ok(Stmt::Print(value))
    }

    fn return_statement(&mut self) -> StmtResult {
        let keyword = self.previous().clone();
        let value = if self.check(TokenKind::Semicolon) { None } else { Some(self.expression()?) };
        self.consume(TokenKind::Semicolon, "Expected ';' after return value")?;
        Ok(Stmt::Return { keyword, value })
    }

    fn if_statement(&mut self) -> StmtResult {
        self.consume(TokenKind::LeftParen, "Expected '(' after 'if'")?;
        let cond = self.expression()?;
        self.consume(TokenKind::RightParen, "Expected ')' after condition")?;

        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.matches(&[TokenKind::Else]) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::If { cond, then_branch, else_branch })
    }

    fn while_statement(&mut self) -> StmtResult {
        self.consume(TokenKind::LeftParen, "Expected '(' after 'while'")?;
        let cond = self.expression()?;
        self.consume(TokenKind::RightParen, "Expected ')' after condition")?;
        let body = Box::new(self.statement()?);
        Ok(Stmt::While { cond, body })
    }

    /// Desugars `for (init; cond; incr) body` into
    /// `{ init; while (cond) { body; incr; } }`, per the grammar's
    /// explicit desugaring rule. An omitted condition becomes `true`.
    fn for_statement(&mut self) -> StmtResult {
        self.consume(TokenKind::LeftParen, "Expected '(' after 'for'")?;

        let init = if self.matches(&[TokenKind::Semicolon]) {
            None
        } else if self.matches(&[TokenKind::Var]) {
            Some(self.var_declaration()?)
        } else {
            Some(self.expression_statement()?)
        };

        let cond = if self.check(TokenKind::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(TokenKind::Semicolon, "Expected ';' after loop condition")?;

        let increment = if self.check(TokenKind::RightParen) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(TokenKind::RightParen, "Expected ')' after for clauses")?;

        let mut body = self.statement()?;

        if let Some(increment) = increment {
            body = Stmt::Block(vec![body, Stmt::Expression(increment)]);
        }

        let cond = cond.unwrap_or_else(|| self.expr(ExprKind::Literal(Literal::Bool(true))));
        body = Stmt::While { cond, body: Box::new(body) };

        if let Some(init) = init {
            body = Stmt::Block(vec![init, body]);
        }

        Ok(body)
    }

    fn block(&mut self) -> Result<Block, ()> {
        let mut statements = vec![];
        while !self.check(TokenKind::RightBrace) && !self.at_end() {
            match self.declaration() {
                Ok(stmt) => statements.push(stmt),
                Err(()) => self.synchronize(),
            }
        }
        self.consume(TokenKind::RightBrace, "Expected '}' after block")?;
        Ok(statements)
    }

    fn expression_statement(&mut self) -> StmtResult {
        let value = self.expression()?;
        self.consume(TokenKind::Semicolon, "Expected ';' after expression")?;
        Ok(Stmt::Expression(value))
    }

    // --- expressions ---------------------------------------------------

    fn expression(&mut self) -> ExprResult {
        self.sequence()
    }

    fn sequence(&mut self) -> ExprResult {
        let first = self.assignment()?;
        if !self.check(TokenKind::Comma) {
            return Ok(first);
        }

        let mut exprs = vec![first];
        while self.matches(&[TokenKind::Comma]) {
            exprs.push(self.assignment()?);
        }
        Ok(self.expr(ExprKind::Sequence(exprs)))
    }

    fn assignment(&mut self) -> ExprResult {
        let target = self.condition()?;

        if self.matches(&[TokenKind::Equal]) {
            let equals = self.previous().clone();
            let value = Box::new(self.assignment()?);

            return match target.kind {
                ExprKind::Identifier(name) => Ok(self.expr(ExprKind::Assign { target: name, value })),
                ExprKind::Get { object, name } => Ok(self.expr(ExprKind::Set { object, name, value })),
                _ => {
                    self.error_at(&equals, "Invalid assignment target");
                    Ok(target)
                }
            };
        }

        Ok(target)
    }

    fn condition(&mut self) -> ExprResult {
        let test = self.logic_or()?;
        if self.matches(&[TokenKind::Question]) {
            let then_branch = Box::new(self.condition()?);
            self.consume(TokenKind::Colon, "Expected ':' in ternary expression")?;
            let else_branch = Box::new(self.condition()?);
            return Ok(self.expr(ExprKind::Condition { test: Box::new(test), then_branch, else_branch }));
        }
        Ok(test)
    }

    fn logic_or(&mut self) -> ExprResult {
        let mut left = self.logic_and()?;
        while self.matches(&[TokenKind::Or]) {
            let op = self.previous().clone();
            let right = Box::new(self.logic_and()?);
            left = self.expr(ExprKind::Logical { left: Box::new(left), op, right });
        }
        Ok(left)
    }

    fn logic_and(&mut self) -> ExprResult {
        let mut left = self.equality()?;
        while self.matches(&[TokenKind::And]) {
            let op = self.previous().clone();
            let right = Box::new(self.equality()?);
            left = self.expr(ExprKind::Logical { left: Box::new(left), op, right });
        }
        Ok(left)
    }

    fn equality(&mut self) -> ExprResult {
        self.left_assoc_binary(Self::comparison, &[TokenKind::BangEqual, TokenKind::EqualEqual])
    }

    fn comparison(&mut self) -> ExprResult {
        self.left_assoc_binary(
            Self::addition,
            &[TokenKind::Less, TokenKind::LessEqual, TokenKind::Greater, TokenKind::GreaterEqual],
        )
    }

    fn addition(&mut self) -> ExprResult {
        self.left_assoc_binary(Self::multiplication, &[TokenKind::Minus, TokenKind::Plus])
    }

    fn multiplication(&mut self) -> ExprResult {
        self.left_assoc_binary(Self::unary, &[TokenKind::Slash, TokenKind::Star])
    }

    fn left_assoc_binary(
        &mut self,
        operand: fn(&mut Self) -> ExprResult,
        kinds: &[TokenKind],
    ) -> ExprResult {
        let mut left = operand(self)?;
        while self.matches(kinds) {
            let op = self.previous().clone();
            let right = Box::new(operand(self)?);
            left = self.expr(ExprKind::Binary { left: Box::new(left), op, right });
        }
        Ok(left)
    }

    fn unary(&mut self) -> ExprResult {
        if self.matches(&[TokenKind::Bang, TokenKind::Minus]) {
            let op = self.previous().clone();
            let right = Box::new(self.unary()?);
            return Ok(self.expr(ExprKind::Unary { op, right }));
        }
        self.call()
    }

    fn call(&mut self) -> ExprResult {
        let mut expr = self.primary()?;

        loop {
            if self.matches(&[TokenKind::LeftParen]) {
                expr = self.finish_call(expr)?;
            } else if self.matches(&[TokenKind::Dot]) {
                let name = self.consume(TokenKind::Identifier, "Expected property name after '.'")?;
                expr = self.expr(ExprKind::Get { object: Box::new(expr), name });
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> ExprResult {
        let mut args = vec![];
        if !self.check(TokenKind::RightParen) {
            loop {
                if args.len() >= MAX_ARGS {
                    self.error_at_current("Can't have more than 255 arguments");
                }
                args.push(self.assignment()?);
                if !self.matches(&[TokenKind::Comma]) {
                    break;
                }
            }
        }
        let paren = self.consume(TokenKind::RightParen, "Expected ')' after arguments")?;
        Ok(self.expr(ExprKind::Call { callee: Box::new(callee), paren, args }))
    }

    fn primary(&mut self) -> ExprResult {
        if self.matches(&[TokenKind::False]) {
            return Ok(self.expr(ExprKind::Literal(Literal::Bool(false))));
        }
        if self.matches(&[TokenKind::True]) {
            return Ok(self.expr(ExprKind::Literal(Literal::Bool(true))));
        }
        if self.matches(&[TokenKind::Nil]) {
            return Ok(self.expr(ExprKind::Literal(Literal::Nil)));
        }
        if self.matches(&[TokenKind::Number, TokenKind::String]) {
            let literal = self.previous().literal.clone();
            return Ok(self.expr(ExprKind::Literal(literal)));
        }
        if self.matches(&[TokenKind::This]) {
            let keyword = self.previous().clone();
            return Ok(self.expr(ExprKind::This(keyword)));
        }
        if self.matches(&[TokenKind::Super]) {
            let keyword = self.previous().clone();
            self.consume(TokenKind::Dot, "Expected '.' after 'super'")?;
            let method = self.consume(TokenKind::Identifier, "Expected superclass method name")?;
            return Ok(self.expr(ExprKind::Super { keyword, method }));
        }
        if self.matches(&[TokenKind::Identifier]) {
            let name = self.previous().clone();
            return Ok(self.expr(ExprKind::Identifier(name)));
        }
        if self.matches(&[TokenKind::Fun]) {
            return self.fun_expr();
        }
        if self.matches(&[TokenKind::LeftParen]) {
            let inner = self.expression()?;
            self.consume(TokenKind::RightParen, "Expected ')' after expression")?;
            return Ok(self.expr(ExprKind::Grouping(Box::new(inner))));
        }

        self.error_at_current("Expected expression");
        Err(())
    }

    fn fun_expr(&mut self) -> ExprResult {
        let params = self.parameter_list()?;
        self.consume(TokenKind::LeftBrace, "Expected '{' before function body")?;
        let body = self.block()?;
        Ok(self.expr(ExprKind::FunExpr { params, body }))
    }
}
