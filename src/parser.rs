use crate::ast::{BinaryOperator, FlowDirection, GateBranch, Literal, Node, Pattern};
use crate::error::SyntaxError;
use crate::token::{Token, TokenType};
use log::{debug, trace};
use num_enum::TryFromPrimitive;
use std::convert::TryFrom;
use std::rc::Rc;
use strum_macros::Display;

#[derive(Debug, TryFromPrimitive, Display, PartialEq, PartialOrd, Clone, Copy)]
#[repr(u8)]
enum Precedence {
    None,
    Flow,       // => <= <> @> <@ ++>
    Assignment, // =
    Or,         // |
    Comparison, // == != < > >=
    Term,       // + - ++
    Factor,     // * / %
    Primary,
}

impl Precedence {
    fn next(self) -> Precedence {
        Precedence::try_from(self as u8 + 1).unwrap_or(Precedence::Primary)
    }
}

static END: TokenType = TokenType::EOF;

macro_rules! consume {
    ($self:expr, $tt:ident) => {
        match $self.peek() {
            TokenType::$tt => {
                $self.advance();
                Ok(())
            }
            _ => Err($self.error(&TokenType::$tt.to_string())),
        }
    };
}

macro_rules! advance_if {
    ($self:expr, $tt:ident) => {
        if let TokenType::$tt = $self.peek() {
            $self.advance();
            true
        } else {
            false
        }
    };
}

struct Parser<'a> {
    tokens: &'a [Token],
    current: usize,
    // `<=` compares instead of flowing while a gate pattern is parsed.
    in_pattern: bool,
    applications: bool,
}

/// Builds a `Node::Program` from a token stream. The first error aborts.
pub fn parse(tokens: &[Token]) -> Result<Node, SyntaxError> {
    let mut parser = Parser {
        tokens,
        current: 0,
        in_pattern: false,
        applications: true,
    };
    let program = parser.program()?;
    if let Node::Program(statements) = &program {
        debug!("parsed {} statements", statements.len());
    }
    Ok(program)
}

impl<'a> Parser<'a> {
    fn program(&mut self) -> Result<Node, SyntaxError> {
        let mut statements = Vec::new();
        loop {
            while advance_if!(self, Semicolon) {}
            if self.is_at_end() {
                break;
            }
            statements.push(self.statement()?);
        }
        Ok(Node::Program(statements))
    }
    fn statement(&mut self) -> Result<Node, SyntaxError> {
        match self.peek() {
            TokenType::Tilde => {
                self.advance();
                self.definition()
            }
            TokenType::At | TokenType::Hash => self.var_declaration(),
            TokenType::Question => self.gate(Node::Literal(Literal::Boolean(true))),
            _ => self.expression(),
        }
    }
    fn definition(&mut self) -> Result<Node, SyntaxError> {
        match self.peek() {
            TokenType::Context => {
                self.advance();
                self.context()
            }
            TokenType::Reaction => {
                self.advance();
                self.reaction()
            }
            TokenType::Gate => {
                self.advance();
                let scrutinee = self.binary(Precedence::Or)?;
                self.gate(scrutinee)
            }
            _ => Err(self.error("'context', 'reaction' or 'gate'")),
        }
    }
    fn var_declaration(&mut self) -> Result<Node, SyntaxError> {
        let mutable = matches!(self.peek(), TokenType::At);
        self.advance();
        match self.peek() {
            TokenType::Identifier(word) if word == "var" => self.advance(),
            _ => return Err(self.error("'var'")),
        }
        let name = self.identifier()?;
        let value = if advance_if!(self, Equal) {
            Some(Box::new(self.expression()?))
        } else {
            None
        };
        Ok(Node::VarDeclaration {
            mutable,
            name,
            value,
        })
    }
    fn context(&mut self) -> Result<Node, SyntaxError> {
        let name = self.identifier()?;
        let mut inputs = self.bare_parameters();
        let mut outputs = Vec::new();
        while let TokenType::At = self.peek() {
            match self.peek_at(1) {
                TokenType::In => {
                    self.advance();
                    self.advance();
                    consume!(self, Colon)?;
                    inputs.extend(self.name_list()?);
                }
                TokenType::Out => {
                    self.advance();
                    self.advance();
                    consume!(self, Colon)?;
                    outputs.extend(self.name_list()?);
                }
                _ => break,
            }
        }
        let body = self.block()?;
        trace!("context {} in={:?} out={:?}", name, inputs, outputs);
        Ok(Node::ContextDef {
            name,
            inputs,
            outputs,
            body: Rc::new(body),
        })
    }
    /// `~context fib n { ... }`: a run of names is only a parameter list when
    /// the header continues with `@` or `{` right after it.
    fn bare_parameters(&mut self) -> Vec<String> {
        let mut end = self.current;
        while let Some(Token {
            tokentype: TokenType::Identifier(_),
            ..
        }) = self.tokens.get(end)
        {
            end += 1;
        }
        let closes = matches!(
            self.tokens.get(end).map(|t| &t.tokentype),
            Some(TokenType::At) | Some(TokenType::LeftBrace)
        );
        if end == self.current || !closes {
            return Vec::new();
        }
        let mut names = Vec::new();
        while self.current < end {
            if let TokenType::Identifier(name) = self.peek() {
                names.push(name.clone());
            }
            self.advance();
        }
        names
    }
    fn name_list(&mut self) -> Result<Vec<String>, SyntaxError> {
        let mut names = vec![self.identifier()?];
        while advance_if!(self, Comma) {
            names.push(self.identifier()?);
        }
        Ok(names)
    }
    /// A braced statement list, or exactly one statement.
    fn block(&mut self) -> Result<Vec<Node>, SyntaxError> {
        if !advance_if!(self, LeftBrace) {
            return Ok(vec![self.statement()?]);
        }
        let mut statements = Vec::new();
        loop {
            while advance_if!(self, Semicolon) {}
            match self.peek() {
                TokenType::RightBrace => break,
                TokenType::EOF => return Err(self.error("'}'")),
                _ => statements.push(self.statement()?),
            }
        }
        consume!(self, RightBrace)?;
        Ok(statements)
    }
    fn reaction(&mut self) -> Result<Node, SyntaxError> {
        let name = self.identifier()?;
        let condition = if advance_if!(self, Question) {
            let condition = self.with_applications(false, |p| p.binary(Precedence::Or))?;
            Some(Box::new(condition))
        } else {
            None
        };
        let body = self.block()?;
        Ok(Node::ReactionDef {
            name,
            condition,
            body,
        })
    }
    /// Branches follow a `?` and are separated by `|` or another `?`.
    fn gate(&mut self, condition: Node) -> Result<Node, SyntaxError> {
        consume!(self, Question)?;
        let mut branches = Vec::new();
        loop {
            let pattern = if advance_if!(self, Else) {
                Pattern::Else
            } else {
                Pattern::Expression(self.pattern()?)
            };
            consume!(self, FlowForward)?;
            let body = self.branch_body()?;
            branches.push(GateBranch { pattern, body });
            match self.peek() {
                TokenType::Pipe | TokenType::Question => self.advance(),
                _ => break,
            }
        }
        Ok(Node::GateDef {
            condition: Box::new(condition),
            branches,
        })
    }
    fn pattern(&mut self) -> Result<Node, SyntaxError> {
        let in_pattern = self.in_pattern;
        self.in_pattern = true;
        let pattern = self.binary(Precedence::Comparison);
        self.in_pattern = in_pattern;
        pattern
    }
    fn branch_body(&mut self) -> Result<Vec<Node>, SyntaxError> {
        if let TokenType::LeftBrace = self.peek() {
            let in_pattern = self.in_pattern;
            self.in_pattern = false;
            let body = self.block();
            self.in_pattern = in_pattern;
            body
        } else {
            Ok(vec![self.flow(Precedence::Comparison)?])
        }
    }
    fn expression(&mut self) -> Result<Node, SyntaxError> {
        self.flow(Precedence::Assignment)
    }
    /// Left-associative chain of flows over operands parsed at `operand`.
    fn flow(&mut self, operand: Precedence) -> Result<Node, SyntaxError> {
        let mut left = self.operand(operand)?;
        loop {
            let direction = match self.peek() {
                TokenType::FlowForward => FlowDirection::Forward,
                TokenType::FlowBackward if !self.in_pattern => FlowDirection::Backward,
                TokenType::FlowBoth => FlowDirection::Both,
                TokenType::FlowChannel => FlowDirection::Channel,
                TokenType::FlowChannelRev => FlowDirection::ChannelReverse,
                TokenType::IncrementFlow => {
                    if !matches!(left, Node::Identifier(_)) {
                        return Err(self.error("identifier before '++>'"));
                    }
                    self.advance();
                    left = Node::Flow {
                        left: Box::new(left),
                        direction: FlowDirection::Increment,
                        right: None,
                    };
                    continue;
                }
                _ => break,
            };
            self.advance();
            // A flow target never takes an argument, so `1 => a 2 => b` is two
            // statements.
            let right = self.with_applications(false, |p| p.operand(operand))?;
            left = Node::Flow {
                left: Box::new(left),
                direction,
                right: Some(Box::new(right)),
            };
        }
        Ok(left)
    }
    fn operand(&mut self, precedence: Precedence) -> Result<Node, SyntaxError> {
        match precedence {
            Precedence::Assignment => self.assignment(),
            _ => self.binary(precedence),
        }
    }
    fn assignment(&mut self) -> Result<Node, SyntaxError> {
        let target = self.binary(Precedence::Or)?;
        if let TokenType::Equal = self.peek() {
            if !matches!(target, Node::Identifier(_)) {
                return Err(self.error("identifier before '='"));
            }
            self.advance();
            let value = self.expression()?;
            return Ok(Node::Assignment {
                target: Box::new(target),
                value: Box::new(value),
            });
        }
        Ok(target)
    }
    fn binary(&mut self, min: Precedence) -> Result<Node, SyntaxError> {
        let mut left = self.unary()?;
        while let Some((operator, precedence)) = self.binary_operator() {
            if precedence < min {
                break;
            }
            trace!("{} at {}", operator, precedence);
            self.advance();
            let right = self.binary(precedence.next())?;
            left = Node::BinaryOp {
                left: Box::new(left),
                operator,
                right: Box::new(right),
            };
        }
        Ok(left)
    }
    fn binary_operator(&self) -> Option<(BinaryOperator, Precedence)> {
        let operator = match self.peek() {
            TokenType::Pipe => (BinaryOperator::Or, Precedence::Or),
            TokenType::EqualEqual => (BinaryOperator::Equal, Precedence::Comparison),
            TokenType::BangEqual => (BinaryOperator::NotEqual, Precedence::Comparison),
            TokenType::Less => (BinaryOperator::Less, Precedence::Comparison),
            TokenType::Greater => (BinaryOperator::Greater, Precedence::Comparison),
            TokenType::GreaterEqual => (BinaryOperator::GreaterEqual, Precedence::Comparison),
            TokenType::FlowBackward if self.in_pattern => {
                (BinaryOperator::LessEqual, Precedence::Comparison)
            }
            TokenType::Plus => (BinaryOperator::Add, Precedence::Term),
            TokenType::PlusPlus => (BinaryOperator::Combine, Precedence::Term),
            TokenType::Minus => (BinaryOperator::Subtract, Precedence::Term),
            TokenType::Star => (BinaryOperator::Multiply, Precedence::Factor),
            TokenType::Slash => (BinaryOperator::Divide, Precedence::Factor),
            TokenType::Percent => (BinaryOperator::Modulo, Precedence::Factor),
            _ => return None,
        };
        Some(operator)
    }
    fn unary(&mut self) -> Result<Node, SyntaxError> {
        if !advance_if!(self, Minus) {
            return self.primary();
        }
        Ok(match self.unary()? {
            Node::Literal(Literal::Integer(n)) => Node::Literal(Literal::Integer(-n)),
            Node::Literal(Literal::Float(x)) => Node::Literal(Literal::Float(-x)),
            operand => Node::BinaryOp {
                left: Box::new(Node::Literal(Literal::Integer(0))),
                operator: BinaryOperator::Subtract,
                right: Box::new(operand),
            },
        })
    }
    fn primary(&mut self) -> Result<Node, SyntaxError> {
        let literal = match self.peek() {
            TokenType::Integer(n) => Literal::Integer(*n),
            TokenType::Float(x) => Literal::Float(*x),
            TokenType::String(s) => Literal::String(s.clone()),
            TokenType::True => Literal::Boolean(true),
            TokenType::False => Literal::Boolean(false),
            TokenType::Null => Literal::Null,
            TokenType::Identifier(name) => {
                self.advance();
                return self.application(name);
            }
            TokenType::LeftParen => {
                self.advance();
                let expr = self.with_applications(true, |p| p.expression())?;
                consume!(self, RightParen)?;
                return Ok(expr);
            }
            TokenType::PoolStart => {
                self.advance();
                return self.pool();
            }
            TokenType::KeyedStart => {
                self.advance();
                return self.keyed_pool();
            }
            _ => return Err(self.error("expression")),
        };
        self.advance();
        Ok(Node::Literal(literal))
    }
    /// `f x` on one line means `x => f`.
    fn application(&mut self, callee: &str) -> Result<Node, SyntaxError> {
        if !self.starts_argument() {
            return Ok(Node::Identifier(callee.to_string()));
        }
        let argument = self.primary()?;
        Ok(Node::Flow {
            left: Box::new(argument),
            direction: FlowDirection::Forward,
            right: Some(Box::new(Node::Identifier(callee.to_string()))),
        })
    }
    fn with_applications<T>(
        &mut self,
        enabled: bool,
        parse: impl FnOnce(&mut Self) -> Result<T, SyntaxError>,
    ) -> Result<T, SyntaxError> {
        let applications = std::mem::replace(&mut self.applications, enabled);
        let result = parse(self);
        self.applications = applications;
        result
    }
    fn starts_argument(&self) -> bool {
        if !self.applications {
            return false;
        }
        let (previous, next) = match (
            self.current.checked_sub(1).and_then(|i| self.tokens.get(i)),
            self.tokens.get(self.current),
        ) {
            (Some(previous), Some(next)) => (previous, next),
            _ => return false,
        };
        previous.line == next.line
            && matches!(
                next.tokentype,
                TokenType::Identifier(_)
                    | TokenType::Integer(_)
                    | TokenType::Float(_)
                    | TokenType::String(_)
                    | TokenType::True
                    | TokenType::False
                    | TokenType::Null
                    | TokenType::PoolStart
                    | TokenType::KeyedStart
            )
    }
    fn pool(&mut self) -> Result<Node, SyntaxError> {
        let mut elements = Vec::new();
        while !advance_if!(self, PoolEnd) {
            elements.push(self.expression()?);
            if !advance_if!(self, Comma) {
                consume!(self, PoolEnd)?;
                break;
            }
        }
        Ok(Node::PoolLiteral(elements))
    }
    fn keyed_pool(&mut self) -> Result<Node, SyntaxError> {
        let mut pairs = Vec::new();
        while !advance_if!(self, KeyedEnd) {
            let key = match self.peek() {
                TokenType::Identifier(key) | TokenType::String(key) => key.clone(),
                _ => return Err(self.error("key")),
            };
            self.advance();
            consume!(self, Equal)?;
            pairs.push((key, self.expression()?));
            if !advance_if!(self, Comma) {
                consume!(self, KeyedEnd)?;
                break;
            }
        }
        Ok(Node::KeyedPoolLiteral(pairs))
    }
    fn identifier(&mut self) -> Result<String, SyntaxError> {
        match self.peek() {
            TokenType::Identifier(name) => {
                self.advance();
                Ok(name.clone())
            }
            _ => Err(self.error("identifier")),
        }
    }
    fn advance(&mut self) {
        if !self.is_at_end() {
            self.current += 1;
        }
    }
    fn is_at_end(&self) -> bool {
        matches!(self.peek(), TokenType::EOF)
    }
    fn peek(&self) -> &'a TokenType {
        self.peek_at(0)
    }
    fn peek_at(&self, offset: usize) -> &'a TokenType {
        self.tokens
            .get(self.current + offset)
            .map_or(&END, |t| &t.tokentype)
    }
    fn error(&self, expected: &str) -> SyntaxError {
        let token = self.tokens.get(self.current).or_else(|| self.tokens.last());
        let (found, line, column) = match token {
            Some(t) if t.tokentype == TokenType::EOF => (END.to_string(), t.line, t.column),
            Some(t) => (format!("'{}'", t.lexeme), t.line, t.column),
            None => (END.to_string(), 1, 1),
        };
        SyntaxError {
            expected: expected.to_string(),
            found,
            line,
            column,
        }
    }
}

#[cfg(test)]
mod parser_tests {
    use crate::ast::{AstPrinter, BinaryOperator, Node, Pattern};
    use crate::error::SyntaxError;
    use crate::parser::parse;
    use crate::scanner::tokenize;

    fn parse_str(source: &str) -> Result<Node, SyntaxError> {
        parse(&tokenize(source).unwrap())
    }

    fn print(source: &str) -> String {
        parse_str(source).unwrap().accept(&mut AstPrinter {})
    }

    #[test]
    fn precedence() {
        assert_eq!(print("1 + 2 * 3 => x"), "(program (=> (+ 1 (* 2 3)) x))");
        assert_eq!(print("a | b == c - 1"), "(program (| a (== b (- c 1))))");
        assert_eq!(print("(1 + 2) * 3"), "(program (* (+ 1 2) 3))");
        assert_eq!(print("1 - 2 - 3"), "(program (- (- 1 2) 3))");
        assert_eq!(print("-3 - -x"), "(program (- -3 (- 0 x)))");
    }

    #[test]
    fn flows_chain_left_to_right() {
        assert_eq!(print("a => b => c"), "(program (=> (=> a b) c))");
        assert_eq!(print("a <= b"), "(program (<= a b))");
        assert_eq!(print("x ++> => y"), "(program (=> (++> x) y))");
        assert_eq!(print("x = 1 + 2"), "(program (= x (+ 1 2)))");
        let err = parse_str("3 ++>").unwrap_err();
        assert_eq!(err.expected, "identifier before '++>'");
        assert_eq!(err.found, "'++>'");
    }

    #[test]
    fn declarations_and_separators() {
        assert_eq!(
            print("@var x = 1; #var y\n;; x"),
            "(program (@var x 1) (#var y) x)"
        );
        let err = parse_str("@let x = 1").unwrap_err();
        assert_eq!(err.expected, "'var'");
        assert_eq!(err.found, "'let'");
    }

    #[test]
    fn context_headers() {
        assert_eq!(
            print("~context double @in: n @out: r { n * 2 => r }"),
            "(program (context double (in n) (out r) (=> (* n 2) r)))"
        );
        assert_eq!(
            print("~context swap @out: y, x @in: a, b { a => x; b => y }"),
            "(program (context swap (in a b) (out y x) (=> a x) (=> b y)))"
        );
        assert_eq!(
            print("~context fib n { n }"),
            "(program (context fib (in n) (out) n))"
        );
        assert_eq!(
            print("~context greet println \"hi\""),
            "(program (context greet (in) (out) (=> \"hi\" println)))"
        );
    }

    #[test]
    fn gates() {
        assert_eq!(
            print("~gate 5 ? 1 => \"a\" | 5 => \"b\" | else => \"c\""),
            "(program (gate 5 (1 \"a\") (5 \"b\") (else \"c\")))"
        );
        assert_eq!(
            print("? a => 1\n? b => { 2 }"),
            "(program (gate true (a 1) (b 2)))"
        );
        match parse_str("~gate n ? n <= 1 => n").unwrap() {
            Node::Program(statements) => match &statements[0] {
                Node::GateDef { branches, .. } => match &branches[0].pattern {
                    Pattern::Expression(Node::BinaryOp { operator, .. }) => {
                        assert_eq!(*operator, BinaryOperator::LessEqual)
                    }
                    other => panic!("unexpected pattern {:?}", other),
                },
                other => panic!("unexpected statement {:?}", other),
            },
            other => panic!("unexpected node {:?}", other),
        }
    }

    #[test]
    fn applications_stay_on_one_line() {
        assert_eq!(print("println \"hi\""), "(program (=> \"hi\" println))");
        assert_eq!(
            print("fibonacci n1 => fib1"),
            "(program (=> (=> n1 fibonacci) fib1))"
        );
        assert_eq!(print("x => a\nb => c"), "(program (=> x a) (=> b c))");
        assert_eq!(print("1 => a 2 => b"), "(program (=> 1 a) (=> 2 b))");
        assert_eq!(
            print("fibonacci n1 => fib1 fibonacci n2 => fib2"),
            "(program (=> (=> n1 fibonacci) fib1) (=> (=> n2 fibonacci) fib2))"
        );
        assert_eq!(
            print("x => (println \"hi\")"),
            "(program (=> x (=> \"hi\" println)))"
        );
        assert_eq!(
            print("x => n1\n(n - 2) => n2"),
            "(program (=> x n1) (=> (- n 2) n2))"
        );
    }

    #[test]
    fn reactions() {
        assert_eq!(
            print("~reaction alarm ? hot println \"hot\""),
            "(program (reaction alarm hot (=> \"hot\" println)))"
        );
        assert_eq!(
            print("~reaction tick { count ++> }"),
            "(program (reaction tick (++> count)))"
        );
    }

    #[test]
    fn pools() {
        assert_eq!(
            print("[: a = 1, \"b\" = [| 1, 2, |], :]"),
            "(program (keyed (a 1) (b (pool 1 2))))"
        );
        assert_eq!(print("[| |]"), "(program (pool))");
    }

    #[test]
    fn syntax_errors() {
        let err = parse_str("(1 + 2").unwrap_err();
        assert_eq!(err.expected, "')'");
        assert_eq!(err.found, "end of input");
        let err = parse_str("~loop").unwrap_err();
        assert_eq!(err.expected, "'context', 'reaction' or 'gate'");
        assert_eq!((err.line, err.column), (1, 2));
        let err = parse_str("5 = x").unwrap_err();
        assert_eq!(err.expected, "identifier before '='");
        let err = parse_str("~context f { 1").unwrap_err();
        assert_eq!(err.expected, "'}'");
    }

    #[test]
    fn parsing_is_deterministic() {
        let source = "~context f @in: n @out: r { ~gate n ? 0 => 1 => r | else => n * 2 => r }\n3 => f";
        let tokens = tokenize(source).unwrap();
        assert_eq!(parse(&tokens).unwrap(), parse(&tokens).unwrap());
    }
}
