//! Generación de bloques.
//!
//! Cada sentencia de nivel superior produce exactamente un árbol raíz
//! del bosque. Las referencias a variables se traducen según la
//! entrada de la tabla de símbolos que el parser ya les asignó, de modo
//! que la distinción entre globales y locales nunca se vuelve a derivar
//! a partir de nombres.
//!
//! Los identificadores de bloque provienen de un contador propio de
//! cada llamada a [`generate`], asignado en preorden.

use log::{debug, trace};
use thiserror::Error;

use crate::{
    ast::{Binding, Branch, Expr, Function, FunctionBody, Program, Reference, Statement, Target, ValueBody},
    builtins::Lowering,
    ir::{chain, Block, BlockId, Forest, Mutation},
    lex::Identifier,
    semantic::{EntryKind, Shape},
    source::Located,
};

pub mod markup;

mod calls;
mod expr;

pub type Gen<T> = Result<T, Located<GenError>>;

#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenError {
    #[error("Unknown function '{0}'")]
    UnknownFunction(Identifier),

    #[error("'{name}' expects {expected} argument(s), found {found}")]
    ArgumentCount {
        name: Identifier,
        expected: String,
        found: usize,
    },

    #[error("This expression does not produce a value")]
    NotAValue,

    #[error("Cannot tell whether '{0}' applies to text, a list or a dictionary")]
    AmbiguousReceiver(Identifier),

    #[error("Unknown method '{method}' for {shape}")]
    UnknownMethod { method: Identifier, shape: Shape },

    #[error("List lambdas require a list, found {0}")]
    LambdaReceiver(Shape),

    #[error("Unknown question '{0}'")]
    UnknownQuestion(Identifier),

    #[error("Unknown transform '{0}'")]
    UnknownTransform(Identifier),

    #[error("'{0}' requires a literal argument")]
    ExpectedLiteral(Identifier),

    #[error("Cannot find component '{0}'")]
    UnknownComponent(Identifier),

    #[error("Component '{component}' has no member '{member}'")]
    UnknownMember {
        component: Identifier,
        member: Identifier,
    },

    #[error("Invalid color '{0}'")]
    InvalidColor(String),

    #[error("Unresolved name '{0}'")]
    Unresolved(Identifier),

    #[error("'undefined' can only fill a value socket")]
    MisplacedUndefined,
}

/// Construye el bosque de bloques de un programa ya analizado.
pub fn generate(program: &Program) -> Gen<Forest> {
    let mut generator = Generator {
        program,
        last_id: 0,
    };

    let roots = program
        .statements
        .iter()
        .map(|statement| generator.root(statement))
        .collect::<Gen<Vec<_>>>()?;

    debug!(
        "Generated {} root blocks, {} blocks in total",
        roots.len(),
        generator.last_id
    );

    Ok(Forest::new(roots))
}

struct Generator<'a> {
    program: &'a Program,
    last_id: u32,
}

/// Una expresión ya traducida, según el tipo de conexión que admite.
enum Lowered {
    Value(Block),
    Statement(Block),

    /// Bloques cuya forma depende del componente, como sus métodos.
    Either(Block),

    /// Ningún bloque; el socket que lo recibe queda vacío.
    Empty,
}

impl Lowered {
    fn into_block(self) -> Option<Block> {
        match self {
            Lowered::Value(block) | Lowered::Statement(block) | Lowered::Either(block) => Some(block),
            Lowered::Empty => None,
        }
    }
}

impl Generator<'_> {
    fn block(&mut self, kind: &'static str) -> Block {
        self.last_id += 1;
        trace!("Block {} is '{}'", self.last_id, kind);

        Block::new(kind, BlockId(self.last_id))
    }

    /// Las expresiones de nivel superior se emiten tal cual, sin el
    /// bloque que descarta su valor.
    fn root(&mut self, statement: &Located<Statement>) -> Gen<Block> {
        match statement.val() {
            Statement::Expr(expr) => self
                .lower(expr)?
                .into_block()
                .ok_or_else(|| Located::at(GenError::MisplacedUndefined, *expr.location())),

            _ => self.statement(statement),
        }
    }

    /// Cadena de sentencias. Una declaración local encierra en su
    /// socket `STACK` a todas las sentencias que le siguen.
    fn body(&mut self, statements: &[Located<Statement>]) -> Gen<Option<Block>> {
        let mut blocks = Vec::with_capacity(statements.len());

        for (index, statement) in statements.iter().enumerate() {
            if let Statement::Local { name, value } = statement.val() {
                let scope = &statements[index + 1..];
                blocks.push(self.local_statement(name, value, scope)?);
                break;
            }

            blocks.push(self.statement(statement)?);
        }

        Ok(chain(blocks))
    }

    fn statement(&mut self, statement: &Located<Statement>) -> Gen<Block> {
        match statement.val() {
            Statement::Global { name, value } => {
                let block = self.block("global_declaration").field("NAME", name.name.val().to_string());
                Ok(block.value("VALUE", self.value(value)?))
            }

            Statement::Local { name, value } => self.local_statement(name, value, &[]),
            Statement::Assign { target, value } => self.assign(target, value),
            Statement::If { branches, otherwise } => self.if_statement(branches, otherwise.as_deref()),

            Statement::While { condition, body } => {
                let block = self.block("controls_while");
                let test = self.value(condition)?;
                let body = self.body(body)?;

                Ok(block.value("TEST", test).statement("DO", body))
            }

            Statement::ForRange {
                variable,
                start,
                end,
                step,
                body,
            } => {
                let block = self.block("controls_forRange").field("VAR", variable.name.val().to_string());

                let start = self.value(start)?;
                let end = self.value(end)?;
                let step = self.value(step)?;
                let body = self.body(body)?;

                Ok(block
                    .value("START", start)
                    .value("END", end)
                    .value("STEP", step)
                    .statement("DO", body))
            }

            Statement::ForEach {
                variable,
                iterable,
                body,
            } => {
                let block = self.block("controls_forEach").field("VAR", variable.name.val().to_string());
                let list = self.value(iterable)?;
                let body = self.body(body)?;

                Ok(block.value("LIST", list).statement("DO", body))
            }

            Statement::ForEachPair {
                key,
                value,
                iterable,
                body,
            } => {
                let block = self
                    .block("controls_for_each_dict")
                    .field("KEY", key.name.val().to_string())
                    .field("VALUE", value.name.val().to_string());

                let dict = self.value(iterable)?;
                let body = self.body(body)?;

                Ok(block.value("DICT", dict).statement("DO", body))
            }

            Statement::Function(function) => self.function(function),
            Statement::Event(event) => self.event(event),

            Statement::Expr(expr) => match self.lower(expr)? {
                Lowered::Statement(block) | Lowered::Either(block) => Ok(block),
                Lowered::Value(value) => {
                    let block = self.block("controls_eval_but_ignore");
                    Ok(block.value("VALUE", value))
                }

                Lowered::Empty => Err(Located::at(GenError::MisplacedUndefined, *expr.location())),
            },

            Statement::Break => Ok(self.block("controls_break")),
        }
    }

    fn local_statement(
        &mut self,
        name: &Binding,
        value: &Located<Expr>,
        scope: &[Located<Statement>],
    ) -> Gen<Block> {
        let local = name.name.val().to_string();
        let block = self
            .block("local_declaration_statement")
            .with_mutation(Mutation::new().named("localname", &local))
            .field("VAR0", local);

        let value = self.value(value)?;
        let scope = self.body(scope)?;

        Ok(block.value("DECL0", value).statement("STACK", scope))
    }

    fn assign(&mut self, target: &Located<Target>, value: &Located<Expr>) -> Gen<Block> {
        match target.val() {
            Target::Variable(reference) => {
                let block = self.variable("lexical_variable_set", reference)?;
                Ok(block.value("VALUE", self.value(value)?))
            }

            Target::Index { list, index } => {
                let block = self.block("lists_replace_item");

                let list = self.value(list)?;
                let index = self.value(index)?;
                let item = self.value(value)?;

                Ok(block.value("LIST", list).value("NUM", index).value("ITEM", item))
            }

            Target::Property {
                component,
                property,
            } => {
                let block = self.property(component, property, true)?;
                Ok(block.value("VALUE", self.value(value)?))
            }
        }
    }

    fn if_statement(
        &mut self,
        branches: &[Branch],
        otherwise: Option<&[Located<Statement>]>,
    ) -> Gen<Block> {
        let mut mutation = Mutation::new();
        if branches.len() > 1 {
            mutation = mutation.attribute("elseif", branches.len() - 1);
        }

        if otherwise.is_some() {
            mutation = mutation.attribute("else", 1);
        }

        let mut block = self.block("controls_if");
        if !mutation.attributes().is_empty() {
            block = block.with_mutation(mutation);
        }

        for (index, Branch { condition, body }) in branches.iter().enumerate() {
            let condition = self.value(condition)?;
            let body = self.body(body)?;

            block = block
                .value(format!("IF{}", index), condition)
                .statement(format!("DO{}", index), body);
        }

        if let Some(otherwise) = otherwise {
            block = block.statement("ELSE", self.body(otherwise)?);
        }

        Ok(block)
    }

    fn function(&mut self, function: &Function) -> Gen<Block> {
        let kind = match function.body {
            FunctionBody::Void(_) => "procedures_defnoreturn",
            FunctionBody::Result(_) => "procedures_defreturn",
        };

        let mutation = function
            .parameters
            .iter()
            .fold(Mutation::new(), |mutation, parameter| mutation.named("arg", parameter.name.val()));

        let mut block = self
            .block(kind)
            .with_mutation(mutation)
            .field("NAME", function.name.val().to_string());

        for (index, parameter) in function.parameters.iter().enumerate() {
            block = block.field(format!("VAR{}", index), parameter.name.val().to_string());
        }

        match &function.body {
            FunctionBody::Void(body) => Ok(block.statement("STACK", self.body(body)?)),
            FunctionBody::Result(body) => Ok(block.value("RETURN", self.value_body(body)?)),
        }
    }

    fn value_body(&mut self, body: &ValueBody) -> Gen<Option<Block>> {
        self.value_sequence(&body.statements, &body.result)
    }

    /// Sentencias seguidas de un valor final. Cada declaración local
    /// abre un `local_declaration_expression` cuyo resultado es el
    /// resto de la secuencia; las demás sentencias se agrupan en
    /// `controls_do_then_return`.
    fn value_sequence(
        &mut self,
        statements: &[Located<Statement>],
        result: &Located<Expr>,
    ) -> Gen<Option<Block>> {
        let (first, rest) = match statements.split_first() {
            Some(split) => split,
            None => return self.value(result),
        };

        if let Statement::Local { name, value } = first.val() {
            let local = name.name.val().to_string();
            let block = self
                .block("local_declaration_expression")
                .with_mutation(Mutation::new().named("localname", &local))
                .field("VAR0", local);

            let value = self.value(value)?;
            let scope = self.value_sequence(rest, result)?;

            return Ok(Some(block.value("DECL0", value).value("RETURN", scope)));
        }

        let split = statements
            .iter()
            .position(|statement| matches!(statement.val(), Statement::Local { .. }))
            .unwrap_or(statements.len());

        let (before, after) = statements.split_at(split);

        let block = self.block("controls_do_then_return");
        let before = self.body(before)?;
        let value = self.value_sequence(after, result)?;

        Ok(Some(block.statement("STM", before).value("VALUE", value)))
    }

    /// Bloque de lectura o escritura de una variable. El nombre que se
    /// escribe depende del tipo de entrada en la tabla de símbolos.
    fn variable(&mut self, kind: &'static str, reference: &Reference) -> Gen<Block> {
        let program = self.program;
        let entry = reference
            .entry
            .and_then(|id| program.symbols.get(id))
            .ok_or_else(|| {
                Located::at(
                    GenError::Unresolved(reference.name.val().clone()),
                    *reference.name.location(),
                )
            })?;

        let name = entry.name().to_string();
        let block = self.block(kind);

        let block = match entry.kind() {
            EntryKind::Global => block.field("VAR", format!("global {}", name)),

            EntryKind::EventParameter => block
                .with_mutation(Mutation::new().named("eventparam", &name))
                .field("VAR", name),

            EntryKind::Local | EntryKind::Parameter | EntryKind::LambdaParameter => block.field("VAR", name),
        };

        Ok(block)
    }

    /// Bloque para un socket de valor, o `None` si debe quedar vacío.
    fn value(&mut self, expr: &Located<Expr>) -> Gen<Option<Block>> {
        match self.lower(expr)? {
            Lowered::Value(block) | Lowered::Either(block) => Ok(Some(block)),
            Lowered::Empty => Ok(None),
            Lowered::Statement(_) => Err(Located::at(GenError::NotAValue, *expr.location())),
        }
    }

    fn values(&mut self, exprs: &[Located<Expr>]) -> Gen<Vec<Option<Block>>> {
        exprs.iter().map(|expr| self.value(expr)).collect()
    }
}

/// Conecta valores en los sockets `<prefijo>0`, `<prefijo>1`, ...
fn numbered(block: Block, prefix: &str, items: Vec<Option<Block>>) -> Block {
    items
        .into_iter()
        .enumerate()
        .fold(block, |block, (index, item)| block.value(format!("{}{}", prefix, index), item))
}

/// Como [`numbered`], registrando la cantidad en la mutación `items`.
fn variadic(block: Block, prefix: &str, items: Vec<Option<Block>>) -> Block {
    let count = items.len();
    numbered(block.with_mutation(Mutation::items(count)), prefix, items)
}

/// Conecta argumentos ya traducidos según la forma de una operación
/// predefinida, junto con su campo `OP` si lo tiene.
fn apply(block: Block, op: Option<&str>, lowering: Lowering, args: Vec<Option<Block>>) -> Block {
    let block = match op {
        Some(op) => block.field("OP", op),
        None => block,
    };

    match lowering {
        Lowering::Sockets(sockets) => sockets
            .iter()
            .zip(args)
            .fold(block, |block, (socket, arg)| block.value(*socket, arg)),

        Lowering::Variadic(prefix) => variadic(block, prefix, args),

        Lowering::Extended(prefix) => {
            let block = block.with_mutation(Mutation::items(args.len()));
            args.into_iter().enumerate().fold(block, |block, (index, arg)| {
                let socket = match index {
                    0 => String::from("A"),
                    1 => String::from("B"),
                    _ => format!("{}{}", prefix, index),
                };

                block.value(socket, arg)
            })
        }

        // El argumento literal ya es un campo
        Lowering::Field(_) => block,
    }
}

fn lowered(output: Shape, block: Block) -> Lowered {
    match output {
        Shape::Void => Lowered::Statement(block),
        _ => Lowered::Value(block),
    }
}
