//! Análisis sintáctico.
//!
//! # Gramática
//! El parser es descendente recursivo. Las sentencias se reconocen por
//! su palabra clave inicial; cualquier otra cosa es una expresión, la
//! cual puede convertirse en el destino de una asignación si le sigue
//! `=` o un operador compuesto como `+=`. Las expresiones binarias se
//! analizan por precedence climbing sobre la tabla de [`binary_operator`].
//!
//! # Ámbitos
//! Los nombres se resuelven durante el análisis, en el mismo punto en
//! que aparecen. Los errores de ámbito se acumulan aparte y solo se
//! reportan si el programa no tiene errores de sintaxis.

use log::{debug, warn};
use std::{iter::Peekable, slice};
use thiserror::Error;

use crate::{
    ast::{
        BinOp, Binding, Branch, Event, Expr, Function, FunctionBody, Lambda, LambdaKind, Program,
        Reference, Signature, Statement, Target, UnOp, ValueBody,
    },
    components::ComponentTable,
    error::{Diagnostic, Stage},
    lex::{Identifier, Keyword, Token},
    semantic::{shape_of, EntryKind, Frame, ScopeError, Scopes, Shape},
    source::{Located, Location},
};

#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParserError {
    #[error("Expected '{expected}'")]
    UnexpectedToken { expected: Token, found: Token },

    #[error("Expected 'identifier'")]
    ExpectedId { found: Token },

    #[error("Expected 'expression'")]
    ExpectedExpr { found: Token },

    #[error("Expected a value at the end of this body")]
    ExpectedResult,

    #[error("Invalid assignment target")]
    InvalidTarget,

    #[error("'break' outside of a loop")]
    BreakOutsideLoop,

    #[error("'{name}' takes {expected} lambda parameter(s), found {found}")]
    LambdaParameters {
        name: Identifier,
        expected: usize,
        found: usize,
    },

    #[error("'{name}' takes {expected} argument(s) before its lambda, found {found}")]
    LambdaArguments {
        name: Identifier,
        expected: usize,
        found: usize,
    },

    #[error("Expression is nested too deeply")]
    NestingTooDeep,

    #[error("Abrupt end of program")]
    UnexpectedEof,
}

/// Construye el AST de un programa completo.
///
/// La tabla de componentes se extiende con los encabezados
/// `@Tipo { ... }` que aparezcan en el programa. Se reporta el primer
/// error de sintaxis o, de no haberlo, el error de ámbito que aparece
/// primero en el texto.
pub fn parse(tokens: &[Located<Token>], components: &ComponentTable) -> Result<Program, Diagnostic> {
    let mut parser = Parser::new(tokens, components);
    let statements = parser
        .program()
        .map_err(|error| Diagnostic::new(Stage::Syntax, error))?;

    let earliest = std::mem::take(&mut parser.scope_errors)
        .into_iter()
        .min_by_key(|error| error.location().start().offset());

    if let Some(error) = earliest {
        return Err(Diagnostic::new(Stage::Scope, error));
    }

    let program = parser.finish(statements);
    debug!(
        "Parsed {} top-level statements, {} scope entries",
        program.statements.len(),
        program.symbols.len()
    );

    Ok(program)
}

/// Analiza el programa completo con recuperación a nivel de sentencia
/// y retorna todos los diagnósticos encontrados, en orden de aparición.
pub fn check(tokens: &[Located<Token>], components: &ComponentTable) -> Vec<Diagnostic> {
    let mut parser = Parser::new(tokens, components);
    let mut syntax_errors = Vec::new();

    while !parser.at_end() {
        let consumed = parser.consumed;
        if let Err(error) = parser.root_statement() {
            warn!("Recovering from syntax error at {}", error.location());

            let line = error.location().start().line();
            syntax_errors.push(error);

            if parser.consumed == consumed {
                parser.skip();
            }

            parser.recover(line);
        }
    }

    let mut diagnostics: Vec<_> = syntax_errors
        .into_iter()
        .map(|error| (error.location().start().offset(), Diagnostic::new(Stage::Syntax, error)))
        .chain(
            parser
                .scope_errors
                .into_iter()
                .map(|error| (error.location().start().offset(), Diagnostic::new(Stage::Scope, error))),
        )
        .collect();

    diagnostics.sort_by_key(|&(offset, _)| offset);
    diagnostics.into_iter().map(|(_, diagnostic)| diagnostic).collect()
}

type Parse<T> = Result<T, Located<ParserError>>;

/// Anidamiento máximo entre sentencias, operandos y sufijos.
const MAX_NESTING: usize = 128;

/// Operadores de la tabla de precedencia.
#[derive(Copy, Clone, PartialEq, Eq)]
enum Operator {
    Pair,
    Binary(BinOp),
}

/// Operador binario y su precedencia, de menor a mayor.
fn binary_operator(token: &Token) -> Option<(Operator, u8)> {
    use BinOp::*;
    use Operator::Binary;

    let operator = match token {
        Token::Colon => (Operator::Pair, 1),
        Token::Underscore => (Binary(Join), 2),
        Token::OrOr => (Binary(Or), 3),
        Token::AndAnd => (Binary(And), 4),
        Token::Pipe => (Binary(BitOr), 5),
        Token::Ampersand => (Binary(BitAnd), 6),
        Token::Tilde => (Binary(BitXor), 7),
        Token::Equal => (Binary(Equal), 8),
        Token::NotEqual => (Binary(NotEqual), 8),
        Token::TextEqual => (Binary(TextEqual), 8),
        Token::TextNotEqual => (Binary(TextNotEqual), 8),
        Token::Less => (Binary(Less), 9),
        Token::LessEqual => (Binary(LessEqual), 9),
        Token::Greater => (Binary(Greater), 9),
        Token::GreaterEqual => (Binary(GreaterEqual), 9),
        Token::TextLess => (Binary(TextLess), 9),
        Token::TextGreater => (Binary(TextGreater), 9),
        Token::Plus => (Binary(Add), 10),
        Token::Minus => (Binary(Sub), 10),
        Token::Times => (Binary(Mul), 11),
        Token::Slash => (Binary(Div), 11),
        Token::Percent => (Binary(Rem), 11),
        Token::Caret => (Binary(Pow), 12),
        _ => return None,
    };

    Some(operator)
}

/// Operadores que admiten la forma `x op= valor`.
fn compound_operator(token: &Token) -> Option<BinOp> {
    match binary_operator(token)? {
        (Operator::Binary(op), _) => match op {
            BinOp::Add
            | BinOp::Sub
            | BinOp::Mul
            | BinOp::Div
            | BinOp::Rem
            | BinOp::Pow
            | BinOp::Join
            | BinOp::BitOr
            | BinOp::BitAnd
            | BinOp::BitXor => Some(op),

            _ => None,
        },

        (Operator::Pair, _) => None,
    }
}

struct Parser<'a> {
    tokens: Peekable<slice::Iter<'a, Located<Token>>>,
    last_known: Location,
    consumed: usize,
    depth: usize,
    scopes: Scopes,
    components: ComponentTable,
    functions: Vec<Signature>,
    scope_errors: Vec<Located<ScopeError>>,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Located<Token>], components: &ComponentTable) -> Self {
        Parser {
            tokens: tokens.iter().peekable(),
            last_known: Location::default(),
            consumed: 0,
            depth: 0,
            scopes: Scopes::new(),
            components: components.clone(),
            functions: Vec::new(),
            scope_errors: Vec::new(),
        }
    }

    fn finish(self, statements: Vec<Located<Statement>>) -> Program {
        Program {
            statements,
            symbols: self.scopes.into_table(),
            functions: self.functions,
            components: self.components,
        }
    }

    fn program(&mut self) -> Parse<Vec<Located<Statement>>> {
        let mut statements = Vec::new();
        while !self.at_end() {
            statements.extend(self.root_statement()?);
        }

        Ok(statements)
    }

    /// Una sentencia de nivel superior. Los encabezados de
    /// componentes no producen sentencias.
    fn root_statement(&mut self) -> Parse<Option<Located<Statement>>> {
        let statement = match self.peek() {
            Some(Token::At) => {
                self.component_header()?;
                None
            }

            _ => Some(self.statement()?),
        };

        self.consume(&Token::Comma);
        Ok(statement)
    }

    /// Descarta tokens hasta el inicio probable de otra sentencia de
    /// nivel superior en una línea posterior.
    fn recover(&mut self, line: u32) {
        self.scopes.truncate(1);

        while let Some(token) = self.tokens.peek().copied() {
            let boundary = matches!(
                token.val(),
                Token::Eof
                    | Token::At
                    | Token::Keyword(
                        Keyword::Global | Keyword::Local | Keyword::Func | Keyword::When
                    )
            );

            if boundary && (token.location().start().line() > line || *token.val() == Token::Eof) {
                break;
            }

            self.skip();
        }
    }

    fn statement(&mut self) -> Parse<Located<Statement>> {
        self.nested(Parser::located_statement)
    }

    fn located_statement(&mut self) -> Parse<Located<Statement>> {
        let start = self.peek_location();

        let statement = match self.peek() {
            Some(Token::Keyword(Keyword::Global)) => self.global()?,
            Some(Token::Keyword(Keyword::Local)) => self.local()?,
            Some(Token::Keyword(Keyword::If)) => self.if_statement()?,
            Some(Token::Keyword(Keyword::While)) => self.while_statement()?,
            Some(Token::Keyword(Keyword::For)) => self.for_statement()?,
            Some(Token::Keyword(Keyword::Func)) => self.function()?,
            Some(Token::Keyword(Keyword::When)) => self.event()?,

            Some(Token::Keyword(Keyword::Break)) => {
                self.next()?;
                if !self.scopes.in_loop() {
                    return self.fail(ParserError::BreakOutsideLoop);
                }

                Statement::Break
            }

            _ => self.expression_statement()?,
        };

        Ok(Located::at(statement, Location::span(start, &self.last_known)))
    }

    fn component_header(&mut self) -> Parse<()> {
        self.expect(Token::At)?;

        let kind = self.id()?;
        if !self.scopes.at_root() {
            self.scope_error(ScopeError::NotAtRoot("Component groups"), *kind.location());
        }

        self.expect(Token::OpenCurly)?;
        let instances = self.comma_separated(Parser::id, &Token::CloseCurly)?;
        self.expect(Token::CloseCurly)?;

        for instance in &instances {
            self.components.define(kind.val().as_ref(), instance.val().as_ref());
        }

        debug!("Component group {} with {} instances", kind.val(), instances.len());
        Ok(())
    }

    fn global(&mut self) -> Parse<Statement> {
        self.keyword(Keyword::Global)?;

        let name = self.id()?;
        if !self.scopes.at_root() {
            self.scope_error(ScopeError::NotAtRoot("Global variables"), *name.location());
        }

        self.expect(Token::Assign)?;
        let value = self.expr()?;

        if self.scopes.resolve_global(name.val().as_ref()).is_some() {
            self.scope_error(ScopeError::DuplicateGlobal(name.val().clone()), *name.location());
        }

        let entry = self.scopes.declare(&name, EntryKind::Global, self.shape(&value));
        Ok(Statement::Global {
            name: Binding { name, entry },
            value,
        })
    }

    fn local(&mut self) -> Parse<Statement> {
        self.keyword(Keyword::Local)?;

        let name = self.id()?;
        self.expect(Token::Assign)?;
        let value = self.expr()?;

        // El nombre no existe mientras se evalúa su propio valor
        let entry = self.scopes.declare(&name, EntryKind::Local, self.shape(&value));
        Ok(Statement::Local {
            name: Binding { name, entry },
            value,
        })
    }

    fn if_statement(&mut self) -> Parse<Statement> {
        self.keyword(Keyword::If)?;

        let mut branches = vec![self.branch()?];
        let mut otherwise = None;

        while self.consume(&Token::Keyword(Keyword::Else)) {
            if self.consume(&Token::Keyword(Keyword::If)) {
                self.deeper()?;
                branches.push(self.branch()?);
            } else {
                otherwise = Some(self.clause()?);
                break;
            }
        }

        Ok(Statement::If {
            branches,
            otherwise,
        })
    }

    fn branch(&mut self) -> Parse<Branch> {
        let condition = self.expr()?;
        let body = self.clause()?;

        Ok(Branch { condition, body })
    }

    /// Cuerpo entre llaves o una única sentencia.
    fn clause(&mut self) -> Parse<Vec<Located<Statement>>> {
        if self.peek() == Some(&Token::OpenCurly) {
            return self.block(Frame::Body);
        }

        self.scopes.enter(Frame::Body);
        let statement = self.statement();
        self.scopes.exit();

        Ok(vec![statement?])
    }

    fn while_statement(&mut self) -> Parse<Statement> {
        self.keyword(Keyword::While)?;

        let condition = self.expr()?;
        let body = self.block(Frame::Loop)?;

        Ok(Statement::While { condition, body })
    }

    fn for_statement(&mut self) -> Parse<Statement> {
        self.keyword(Keyword::For)?;
        self.expect(Token::OpenParen)?;

        let first = self.id()?;

        if self.consume(&Token::Colon) {
            let start = self.expr()?;
            self.expect(Token::DoubleDot)?;
            let end = self.expr()?;

            let step = if self.consume(&Token::Keyword(Keyword::Step)) {
                self.expr()?
            } else {
                Located::at(Expr::Number(String::from("1")), *end.location())
            };

            self.expect(Token::CloseParen)?;
            self.expect(Token::OpenCurly)?;

            self.scopes.enter(Frame::Loop);
            let variable = self.bind(first, EntryKind::Local, Shape::Number);
            let body = self.close_block()?;

            return Ok(Statement::ForRange {
                variable,
                start,
                end,
                step,
                body,
            });
        }

        let second = if self.consume(&Token::Comma) {
            Some(self.id()?)
        } else {
            None
        };

        self.keyword(Keyword::In)?;
        let iterable = self.expr()?;
        self.expect(Token::CloseParen)?;
        self.expect(Token::OpenCurly)?;

        self.scopes.enter(Frame::Loop);
        let first = self.bind(first, EntryKind::Local, Shape::Any);

        let statement = match second {
            None => {
                let body = self.close_block()?;
                Statement::ForEach {
                    variable: first,
                    iterable,
                    body,
                }
            }

            Some(second) => {
                let value = self.bind(second, EntryKind::Local, Shape::Any);
                let body = self.close_block()?;

                Statement::ForEachPair {
                    key: first,
                    value,
                    iterable,
                    body,
                }
            }
        };

        Ok(statement)
    }

    fn function(&mut self) -> Parse<Statement> {
        self.keyword(Keyword::Func)?;

        let name = self.id()?;
        if !self.scopes.at_root() {
            self.scope_error(ScopeError::NotAtRoot("Functions"), *name.location());
        }

        self.expect(Token::OpenParen)?;
        let parameters = self.comma_separated(Parser::id, &Token::CloseParen)?;
        self.expect(Token::CloseParen)?;

        let returns = self.consume(&Token::Assign);

        // Se registra antes del cuerpo, lo cual permite recursión
        if self.functions.iter().any(|function| function.name == *name.val()) {
            self.scope_error(ScopeError::DuplicateFunction(name.val().clone()), *name.location());
        } else {
            self.functions.push(Signature {
                name: name.val().clone(),
                parameters: parameters.iter().map(|parameter| parameter.val().clone()).collect(),
                returns,
            });
        }

        self.scopes.enter(Frame::Function);
        let parameters = parameters
            .into_iter()
            .map(|parameter| self.bind(parameter, EntryKind::Parameter, Shape::Any))
            .collect();

        let body = self.function_body(returns);
        self.scopes.exit();

        Ok(Statement::Function(Function {
            name,
            parameters,
            body: body?,
        }))
    }

    fn function_body(&mut self, returns: bool) -> Parse<FunctionBody> {
        if returns {
            return Ok(FunctionBody::Result(self.value_body()?));
        }

        self.expect(Token::OpenCurly)?;
        let body = self.statements()?;
        self.expect(Token::CloseCurly)?;

        Ok(FunctionBody::Void(body))
    }

    fn event(&mut self) -> Parse<Statement> {
        self.keyword(Keyword::When)?;
        let generic = self.consume(&Token::Keyword(Keyword::Any));

        let component = self.id()?;
        if !self.scopes.at_root() {
            self.scope_error(ScopeError::NotAtRoot("Event handlers"), *component.location());
        }

        let name: &str = component.val().as_ref();
        if generic && !self.components.defines(name) {
            self.scope_error(
                ScopeError::UnknownComponentType(component.val().clone()),
                *component.location(),
            );
        } else if !generic && !self.components.contains(name) {
            self.scope_error(
                ScopeError::UnknownComponent(component.val().clone()),
                *component.location(),
            );
        }

        self.expect(Token::Period)?;
        let event = self.id()?;

        let parameters = if self.consume(&Token::OpenParen) {
            let parameters = self.comma_separated(Parser::id, &Token::CloseParen)?;
            self.expect(Token::CloseParen)?;
            parameters
        } else {
            Vec::new()
        };

        self.expect(Token::OpenCurly)?;
        self.scopes.enter(Frame::Event);

        let parameters = parameters
            .into_iter()
            .map(|parameter| self.bind(parameter, EntryKind::EventParameter, Shape::Any))
            .collect();

        let body = self.close_block()?;

        Ok(Statement::Event(Event {
            generic,
            component,
            event,
            parameters,
            body,
        }))
    }

    fn expression_statement(&mut self) -> Parse<Statement> {
        let expr = self.expr()?;

        if self.consume(&Token::Assign) {
            let target = self.target(expr)?;
            let value = self.expr()?;

            return Ok(Statement::Assign { target, value });
        }

        let compound = self.peek().and_then(compound_operator);
        if let (Some(op), Some(Token::Assign)) = (compound, self.second()) {
            self.next()?;
            self.next()?;

            let target = self.target(expr.clone())?;
            let operand = self.expr()?;

            let location = Location::span(*expr.location(), operand.location());
            let value = Located::at(Expr::Binary(Box::new(expr), op, Box::new(operand)), location);

            return Ok(Statement::Assign { target, value });
        }

        Ok(Statement::Expr(expr))
    }

    fn target(&self, expr: Located<Expr>) -> Parse<Located<Target>> {
        let (location, expr) = expr.split();

        let target = match expr {
            Expr::Variable(reference) => Target::Variable(reference),
            Expr::Index { list, index } => Target::Index { list, index },
            Expr::Property {
                component,
                property,
            } => Target::Property {
                component,
                property,
            },

            _ => return Err(Located::at(ParserError::InvalidTarget, location)),
        };

        Ok(Located::at(target, location))
    }

    /// Abre un bloque entre llaves con su propio ámbito.
    fn block(&mut self, frame: Frame) -> Parse<Vec<Located<Statement>>> {
        self.expect(Token::OpenCurly)?;
        self.scopes.enter(frame);
        self.close_block()
    }

    /// Termina un bloque ya abierto: sentencias hasta `}` y cierre
    /// del ámbito más interno.
    fn close_block(&mut self) -> Parse<Vec<Located<Statement>>> {
        let body = self.statements();
        self.scopes.exit();

        let body = body?;
        self.expect(Token::CloseCurly)?;

        Ok(body)
    }

    fn statements(&mut self) -> Parse<Vec<Located<Statement>>> {
        let mut statements = Vec::new();

        loop {
            match self.peek() {
                None | Some(Token::Eof) | Some(Token::CloseCurly) => break Ok(statements),
                Some(Token::At) => self.component_header()?,

                _ => {
                    statements.push(self.statement()?);
                    self.consume(&Token::Comma);
                }
            }
        }
    }

    fn expr(&mut self) -> Parse<Located<Expr>> {
        self.binary(1)
    }

    fn binary(&mut self, min_precedence: u8) -> Parse<Located<Expr>> {
        self.restoring(|parser| parser.climb(min_precedence))
    }

    /// Precedence climbing. Todos los niveles asocian a la izquierda
    /// excepto `^`. Cada operador encadenado anida al operando izquierdo
    /// un nivel más.
    fn climb(&mut self, min_precedence: u8) -> Parse<Located<Expr>> {
        let mut left = self.unary()?;

        loop {
            let (operator, precedence) = match self.peek().and_then(binary_operator) {
                Some((operator, precedence)) if precedence >= min_precedence => (operator, precedence),
                _ => break Ok(left),
            };

            // `x += 1` es una asignación, no una suma
            let compound = self.peek().and_then(compound_operator).is_some();
            if compound && self.second() == Some(&Token::Assign) {
                break Ok(left);
            }

            self.next()?;
            self.deeper()?;

            let right_precedence = match operator {
                Operator::Binary(BinOp::Pow) => precedence,
                _ => precedence + 1,
            };

            let right = self.binary(right_precedence)?;
            let location = Location::span(*left.location(), right.location());

            let expr = match operator {
                Operator::Pair => Expr::Pair(Box::new(left), Box::new(right)),
                Operator::Binary(op) => Expr::Binary(Box::new(left), op, Box::new(right)),
            };

            left = Located::at(expr, location);
        }
    }

    fn unary(&mut self) -> Parse<Located<Expr>> {
        self.nested(Parser::prefixed)
    }

    fn prefixed(&mut self) -> Parse<Located<Expr>> {
        let start = self.peek_location();

        let op = match self.peek() {
            Some(Token::Bang) => UnOp::Not,
            Some(Token::Minus) => UnOp::Negate,
            _ => return self.postfix(),
        };

        self.next()?;
        let operand = self.unary()?;
        let location = Location::span(start, operand.location());

        // Las constantes negativas son literales, no negaciones
        if let (UnOp::Negate, Expr::Number(number)) = (op, operand.val()) {
            if !number.starts_with('-') {
                let negative = Expr::Number(format!("-{}", number));
                return Ok(Located::at(negative, location));
            }
        }

        Ok(Located::at(Expr::Unary(op, Box::new(operand)), location))
    }

    fn postfix(&mut self) -> Parse<Located<Expr>> {
        self.restoring(Parser::suffixes)
    }

    fn suffixes(&mut self) -> Parse<Located<Expr>> {
        let mut expr = self.term()?;

        loop {
            let start = *expr.location();

            let suffix = matches!(
                self.peek(),
                Some(Token::Period | Token::OpenSquare | Token::Question | Token::DoubleColon)
            );

            if suffix {
                self.deeper()?;
            }

            expr = match self.peek() {
                Some(Token::Period) => self.member(expr)?,

                Some(Token::OpenSquare) => {
                    self.next()?;
                    let index = self.expr()?;
                    self.expect(Token::CloseSquare)?;

                    let index = Expr::Index {
                        list: Box::new(expr),
                        index: Box::new(index),
                    };

                    Located::at(index, Location::span(start, &self.last_known))
                }

                Some(Token::Question) => {
                    self.next()?;
                    let question = self.id()?;

                    let location = Location::span(start, question.location());
                    let question = Expr::Question {
                        subject: Box::new(expr),
                        question,
                    };

                    Located::at(question, location)
                }

                Some(Token::DoubleColon) => {
                    self.next()?;
                    let transform = self.id()?;

                    let location = Location::span(start, transform.location());
                    let transform = Expr::Transform {
                        subject: Box::new(expr),
                        transform,
                    };

                    Located::at(transform, location)
                }

                _ => break Ok(expr),
            };
        }
    }

    /// `.nombre` sobre un receptor: propiedad de componente, llamada
    /// a método o lambda de lista.
    fn member(&mut self, receiver: Located<Expr>) -> Parse<Located<Expr>> {
        self.expect(Token::Period)?;

        let start = *receiver.location();
        let name = self.id()?;
        let parens = self.peek() == Some(&Token::OpenParen);

        if let (Expr::Component(component), false) = (receiver.val(), parens) {
            let location = Location::span(start, name.location());
            let property = Expr::Property {
                component: Located::at(component.clone(), start),
                property: name,
            };

            return Ok(Located::at(property, location));
        }

        let args = if parens { Some(self.arguments()?) } else { None };

        let is_component = matches!(receiver.val(), Expr::Component(_));
        let lambda = LambdaKind::from_name(name.val().as_ref())
            .filter(|_| !is_component && self.peek() == Some(&Token::OpenCurly));

        if let Some(kind) = lambda {
            return self.lambda(receiver, name, kind, args.unwrap_or_default());
        }

        // Sin paréntesis ni lambda, esto obliga el error `Expected '('`
        let args = match args {
            Some(args) => args,
            None => self.arguments()?,
        };

        let method = Expr::Method {
            receiver: Box::new(receiver),
            method: name,
            args,
        };

        Ok(Located::at(method, Location::span(start, &self.last_known)))
    }

    fn lambda(
        &mut self,
        list: Located<Expr>,
        name: Located<Identifier>,
        kind: LambdaKind,
        args: Vec<Located<Expr>>,
    ) -> Parse<Located<Expr>> {
        let start = *list.location();

        if args.len() != kind.arguments() {
            let error = ParserError::LambdaArguments {
                name: name.val().clone(),
                expected: kind.arguments(),
                found: args.len(),
            };

            return Err(Located::at(error, *name.location()));
        }

        self.expect(Token::OpenCurly)?;
        let names = self.comma_separated(Parser::id, &Token::Arrow)?;
        self.expect(Token::Arrow)?;

        if names.len() != kind.parameters() {
            let error = ParserError::LambdaParameters {
                name: name.val().clone(),
                expected: kind.parameters(),
                found: names.len(),
            };

            return Err(Located::at(error, *name.location()));
        }

        self.scopes.enter(Frame::Lambda);
        let parameters = names
            .into_iter()
            .map(|parameter| self.bind(parameter, EntryKind::LambdaParameter, Shape::Any))
            .collect();

        let statements = self.close_block()?;
        let location = Location::span(start, &self.last_known);
        let body = into_value_body(statements).ok_or_else(|| Located::at(ParserError::ExpectedResult, location))?;

        let lambda = Lambda {
            list,
            kind,
            seed: args.into_iter().next(),
            parameters,
            body,
        };

        Ok(Located::at(Expr::Lambda(Box::new(lambda)), location))
    }

    fn term(&mut self) -> Parse<Located<Expr>> {
        match self.peek() {
            Some(Token::OpenCurly) => return self.braced(),
            Some(Token::Keyword(Keyword::If)) => return self.if_expr(),
            _ => (),
        }

        let (location, token) = self.next()?.clone().split();

        let expr = match token {
            Token::Text(text) => Expr::Text(text),
            Token::Number(number) => Expr::Number(number),
            Token::Color(color) => Expr::Color(color),
            Token::Keyword(Keyword::True) => Expr::Boolean(true),
            Token::Keyword(Keyword::False) => Expr::Boolean(false),
            Token::Keyword(Keyword::WalkAll) => Expr::WalkAll,
            Token::Keyword(Keyword::Undefined) => Expr::Undefined,
            Token::Keyword(Keyword::Compute) => return self.compute(location),
            Token::Keyword(Keyword::This) => return self.this(location),
            Token::Id(id) => return self.identifier(Located::at(id, location)),

            Token::OpenParen => {
                let inner = self.expr()?;
                self.expect(Token::CloseParen)?;

                return Ok(inner);
            }

            Token::OpenSquare => {
                let items = self.comma_separated(Parser::expr, &Token::CloseSquare)?;
                self.expect(Token::CloseSquare)?;

                Expr::List(items)
            }

            found => return Err(Located::at(ParserError::ExpectedExpr { found }, location)),
        };

        Ok(Located::at(expr, Location::span(location, &self.last_known)))
    }

    /// Un identificador en posición de valor: llamada, componente o variable.
    fn identifier(&mut self, name: Located<Identifier>) -> Parse<Located<Expr>> {
        let start = *name.location();
        let callee: &str = name.val().as_ref();

        if callee == "every" && self.peek() == Some(&Token::OpenParen) {
            return self.every(start);
        }

        // Un `@` en otra línea abre un grupo de componentes
        let same_line = self.peek_location().start().line() == start.start().line();
        if self.peek() == Some(&Token::At) && same_line {
            self.next()?;
            let option = self.id()?;

            let location = Location::span(start, option.location());
            return Ok(Located::at(Expr::Helper { key: name, option }, location));
        }

        // Las llamadas se resuelven durante generación de código
        if self.peek() == Some(&Token::OpenParen) {
            let args = self.arguments()?;
            let call = Expr::Call { callee: name, args };

            return Ok(Located::at(call, Location::span(start, &self.last_known)));
        }

        if self.components.contains(name.val().as_ref()) {
            return Ok(Located::at(Expr::Component(name.into_inner()), start));
        }

        let entry = self.scopes.resolve(name.val().as_ref());
        if entry.is_none() {
            self.scope_error(ScopeError::Undefined(name.val().clone()), start);
        }

        Ok(Located::at(Expr::Variable(Reference { name, entry }), start))
    }

    /// `every(Tipo)`, cuyo argumento es un tipo de componente y no un valor.
    fn every(&mut self, start: Location) -> Parse<Located<Expr>> {
        self.expect(Token::OpenParen)?;
        let kind = self.id()?;
        self.expect(Token::CloseParen)?;

        if !self.components.defines(kind.val().as_ref()) {
            self.scope_error(ScopeError::UnknownComponentType(kind.val().clone()), *kind.location());
        }

        Ok(Located::at(Expr::Every(kind), Location::span(start, &self.last_known)))
    }

    /// `compute(nombre = valor, ...) -> resultado`. Los valores se
    /// evalúan afuera; los nombres solo existen dentro del resultado.
    fn compute(&mut self, start: Location) -> Parse<Located<Expr>> {
        self.expect(Token::OpenParen)?;
        let definitions = self.comma_separated(Parser::definition, &Token::CloseParen)?;
        self.expect(Token::CloseParen)?;
        self.expect(Token::Arrow)?;

        self.scopes.enter(Frame::Body);
        let locals = definitions
            .into_iter()
            .map(|(name, value)| {
                let shape = self.shape(&value);
                (self.bind(name, EntryKind::Local, shape), value)
            })
            .collect();

        let result = self.expr();
        self.scopes.exit();

        let compute = Expr::Compute {
            locals,
            result: Box::new(result?),
        };

        Ok(Located::at(compute, Location::span(start, &self.last_known)))
    }

    fn definition(&mut self) -> Parse<(Located<Identifier>, Located<Expr>)> {
        let name = self.id()?;
        self.expect(Token::Assign)?;

        Ok((name, self.expr()?))
    }

    /// `this.nombre`, que siempre se refiere a una variable global.
    fn this(&mut self, start: Location) -> Parse<Located<Expr>> {
        self.expect(Token::Period)?;
        let name = self.id()?;

        let entry = self.scopes.resolve_global(name.val().as_ref());
        if entry.is_none() {
            let error = match self.scopes.resolve(name.val().as_ref()) {
                Some(_) => ScopeError::NotGlobal(name.val().clone()),
                None => ScopeError::Undefined(name.val().clone()),
            };

            self.scope_error(error, *name.location());
        }

        let location = Location::span(start, name.location());
        Ok(Located::at(Expr::Variable(Reference { name, entry }), location))
    }

    /// `{ ... }` en posición de valor: diccionario si está vacío o si
    /// solo contiene pares, de lo contrario un bloque con valor.
    fn braced(&mut self) -> Parse<Located<Expr>> {
        let start = self.peek_location();

        self.expect(Token::OpenCurly)?;
        self.scopes.enter(Frame::Body);
        let statements = self.close_block()?;

        let location = Location::span(start, &self.last_known);

        let is_dictionary = statements.iter().all(|statement| match statement.val() {
            Statement::Expr(expr) => matches!(expr.val(), Expr::Pair(..)),
            _ => false,
        });

        if is_dictionary {
            let pairs = statements
                .into_iter()
                .filter_map(|statement| match statement.into_inner() {
                    Statement::Expr(pair) => Some(pair),
                    _ => None,
                })
                .collect();

            return Ok(Located::at(Expr::Dictionary(pairs), location));
        }

        let body = into_value_body(statements).ok_or_else(|| Located::at(ParserError::ExpectedResult, location))?;
        Ok(Located::at(Expr::Block(Box::new(body)), location))
    }

    /// `if` en posición de valor, donde `else` es obligatorio.
    fn if_expr(&mut self) -> Parse<Located<Expr>> {
        let start = self.peek_location();
        self.keyword(Keyword::If)?;

        let condition = self.expr()?;
        let then = self.value_body()?;

        self.keyword(Keyword::Else)?;
        let otherwise = if self.peek() == Some(&Token::Keyword(Keyword::If)) {
            ValueBody::of(self.nested(Parser::if_expr)?)
        } else {
            self.value_body()?
        };

        let expr = Expr::If {
            condition: Box::new(condition),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        };

        Ok(Located::at(expr, Location::span(start, &self.last_known)))
    }

    /// Un valor que puede estar precedido por sentencias si va entre llaves.
    fn value_body(&mut self) -> Parse<ValueBody> {
        let (location, value) = self.expr()?.split();

        let body = match value {
            Expr::Block(body) => *body,
            value => ValueBody::of(Located::at(value, location)),
        };

        Ok(body)
    }

    fn arguments(&mut self) -> Parse<Vec<Located<Expr>>> {
        self.expect(Token::OpenParen)?;
        let args = self.comma_separated(Parser::expr, &Token::CloseParen)?;
        self.expect(Token::CloseParen)?;

        Ok(args)
    }

    /// Declara un nombre en el ámbito más interno, el cual no debe
    /// repetirse dentro de ese mismo ámbito.
    fn bind(&mut self, name: Located<Identifier>, kind: EntryKind, shape: Shape) -> Binding {
        if self.scopes.declared_here(name.val().as_ref()) {
            self.scope_error(ScopeError::DuplicateParameter(name.val().clone()), *name.location());
        }

        let entry = self.scopes.declare(&name, kind, shape);
        Binding { name, entry }
    }

    /// Ejecuta una regla y restaura la profundidad al salir, incluso
    /// si la regla falla.
    fn restoring<T, F>(&mut self, rule: F) -> Parse<T>
    where
        F: FnOnce(&mut Self) -> Parse<T>,
    {
        let depth = self.depth;
        let result = rule(self);
        self.depth = depth;

        result
    }

    /// Ejecuta una regla un nivel más adentro.
    fn nested<T, F>(&mut self, rule: F) -> Parse<T>
    where
        F: FnOnce(&mut Self) -> Parse<T>,
    {
        self.restoring(|parser| {
            parser.deeper()?;
            rule(parser)
        })
    }

    fn deeper(&mut self) -> Parse<()> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            let location = self.peek_location();
            return Err(Located::at(ParserError::NestingTooDeep, location));
        }

        Ok(())
    }

    fn shape(&self, expr: &Located<Expr>) -> Shape {
        shape_of(expr.val(), self.scopes.table())
    }

    fn scope_error(&mut self, error: ScopeError, location: Location) {
        self.scope_errors.push(Located::at(error, location));
    }

    fn comma_separated<T, F>(&mut self, mut rule: F, end: &Token) -> Parse<Vec<T>>
    where
        F: FnMut(&mut Self) -> Parse<T>,
    {
        let mut items = Vec::new();
        if self.peek() == Some(end) {
            return Ok(items);
        }

        loop {
            items.push(rule(self)?);
            if !self.consume(&Token::Comma) {
                break Ok(items);
            }
        }
    }

    fn at_end(&mut self) -> bool {
        matches!(self.peek(), None | Some(Token::Eof))
    }

    fn peek(&mut self) -> Option<&'a Token> {
        self.tokens.peek().copied().map(Located::val)
    }

    /// Token que sigue al siguiente.
    fn second(&self) -> Option<&'a Token> {
        self.tokens.clone().nth(1).map(Located::val)
    }

    fn peek_location(&mut self) -> Location {
        match self.tokens.peek() {
            Some(token) => *token.location(),
            None => self.last_known,
        }
    }

    fn consume(&mut self, token: &Token) -> bool {
        self.peek() == Some(token) && self.next().is_ok()
    }

    fn id(&mut self) -> Parse<Located<Identifier>> {
        let (location, token) = self.next()?.clone().split();
        match token {
            Token::Id(id) => Ok(Located::at(id, location)),
            found => self.fail(ParserError::ExpectedId { found }),
        }
    }

    fn keyword(&mut self, keyword: Keyword) -> Parse<()> {
        self.expect(Token::Keyword(keyword))
    }

    fn expect(&mut self, expected: Token) -> Parse<()> {
        let found = self.next()?.val();
        if *found == expected {
            Ok(())
        } else {
            self.fail(ParserError::UnexpectedToken {
                expected,
                found: found.clone(),
            })
        }
    }

    /// Consume el siguiente token. El fin de la entrada nunca se
    /// consume, por lo cual puede observarse cualquier cantidad de veces.
    fn next(&mut self) -> Parse<&'a Located<Token>> {
        match self.tokens.peek().copied() {
            Some(token) => {
                if *token.val() != Token::Eof {
                    self.tokens.next();
                    self.consumed += 1;
                }

                self.last_known = *token.location();
                Ok(token)
            }

            None => self.fail(ParserError::UnexpectedEof),
        }
    }

    /// Descarta un token sin analizarlo.
    fn skip(&mut self) {
        if self.tokens.peek().map_or(false, |token| *token.val() != Token::Eof) {
            self.tokens.next();
            self.consumed += 1;
        }
    }

    fn fail<T>(&self, error: ParserError) -> Parse<T> {
        Err(Located::at(error, self.last_known))
    }
}

/// Separa la expresión final de un cuerpo. Un `if` final con `else`
/// cuenta como expresión si todas sus ramas terminan en un valor.
fn into_value_body(mut statements: Vec<Located<Statement>>) -> Option<ValueBody> {
    let result = into_value(statements.pop()?)?;

    Some(ValueBody {
        statements,
        result: Box::new(result),
    })
}

fn into_value(statement: Located<Statement>) -> Option<Located<Expr>> {
    let (location, statement) = statement.split();

    match statement {
        Statement::Expr(expr) => Some(expr),

        Statement::If {
            branches,
            otherwise: Some(otherwise),
        } => {
            let mut value = into_value_body(otherwise)?;
            for Branch { condition, body } in branches.into_iter().rev() {
                let expr = Expr::If {
                    condition: Box::new(condition),
                    then: Box::new(into_value_body(body)?),
                    otherwise: Box::new(value),
                };

                value = ValueBody::of(Located::at(expr, location));
            }

            Some(*value.result)
        }

        _ => None,
    }
}
