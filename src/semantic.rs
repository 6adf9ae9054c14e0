//! Resolución de nombres.
//!
//! El parser mantiene un cursor de ámbitos ([`Scopes`]) mientras
//! recorre el programa. Cada declaración produce una entrada en la
//! tabla de símbolos ([`SymbolTable`]) justo en su punto de
//! declaración, de modo que las referencias hacia adelante no se
//! resuelven y no es necesario un pase de hoisting. Las referencias
//! quedan ligadas a la entrada más interna que coincida.

use thiserror::Error;

use std::{
    fmt::{self, Display},
    ops::Index,
};

use crate::{
    ast::{BinOp, Expr, LambdaKind, UnOp},
    builtins::{self, Family},
    lex::Identifier,
    source::Located,
};

#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScopeError {
    #[error("Cannot find symbol '{0}'")]
    Undefined(Identifier),

    #[error("'{0}' is not a global variable")]
    NotGlobal(Identifier),

    #[error("Duplicate parameter '{0}'")]
    DuplicateParameter(Identifier),

    #[error("Global variable '{0}' is already defined")]
    DuplicateGlobal(Identifier),

    #[error("Function '{0}' is already defined")]
    DuplicateFunction(Identifier),

    #[error("{0} can only be defined at the root")]
    NotAtRoot(&'static str),

    #[error("Cannot find component '{0}'")]
    UnknownComponent(Identifier),

    #[error("Cannot find component group '{0}'")]
    UnknownComponentType(Identifier),
}

/// Identificador opaco de una entrada en la tabla de símbolos.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct EntryId(usize);

/// Tipo de declaración que introdujo un nombre.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EntryKind {
    Global,
    Local,
    Parameter,
    LambdaParameter,
    EventParameter,
}

impl EntryKind {
    pub fn is_global(self) -> bool {
        self == EntryKind::Global
    }
}

/// Clasificación estructural de un valor.
///
/// No es un sistema de tipos: solo distingue lo necesario para
/// escoger la familia de bloques de una llamada a método.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Shape {
    Any,
    Number,
    Text,
    Boolean,
    List,
    Dictionary,
    Color,
    Component,
    Void,
}

impl Display for Shape {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Shape::Any => "any",
            Shape::Number => "number",
            Shape::Text => "text",
            Shape::Boolean => "boolean",
            Shape::List => "list",
            Shape::Dictionary => "dictionary",
            Shape::Color => "color",
            Shape::Component => "component",
            Shape::Void => "nothing",
        };

        fmt.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScopeEntry {
    name: Identifier,
    kind: EntryKind,
    shape: Shape,
}

impl ScopeEntry {
    pub fn name(&self) -> &Identifier {
        &self.name
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    /// Forma del valor en el sitio de declaración.
    pub fn shape(&self) -> Shape {
        self.shape
    }
}

/// Todas las entradas declaradas en un programa, en orden de declaración.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SymbolTable {
    entries: Vec<ScopeEntry>,
}

impl SymbolTable {
    fn declare(&mut self, entry: ScopeEntry) -> EntryId {
        self.entries.push(entry);
        EntryId(self.entries.len() - 1)
    }

    pub fn get(&self, id: EntryId) -> Option<&ScopeEntry> {
        self.entries.get(id.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntryId, &ScopeEntry)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, entry)| (EntryId(index), entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Index<EntryId> for SymbolTable {
    type Output = ScopeEntry;

    fn index(&self, id: EntryId) -> &ScopeEntry {
        &self.entries[id.0]
    }
}

/// Construcción que abre un ámbito.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Frame {
    Root,
    Function,
    Body,
    Loop,
    Lambda,
    Event,
}

/// Cursor de ámbitos anidados.
#[derive(Debug, Clone)]
pub struct Scopes {
    table: SymbolTable,
    frames: Vec<(Frame, Vec<(Identifier, EntryId)>)>,
}

impl Default for Scopes {
    fn default() -> Self {
        Scopes {
            table: SymbolTable::default(),
            frames: vec![(Frame::Root, Vec::new())],
        }
    }
}

impl Scopes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter(&mut self, frame: Frame) {
        self.frames.push((frame, Vec::new()));
    }

    /// Cierra el ámbito más interno. La raíz nunca se cierra.
    pub fn exit(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    /// Descarta todo ámbito abierto por encima de `depth`.
    pub fn truncate(&mut self, depth: usize) {
        self.frames.truncate(depth.max(1));
    }

    pub fn at_root(&self) -> bool {
        self.frames.len() == 1
    }

    /// Determina si un `break` en este punto sale de un ciclo.
    /// Funciones, lambdas y eventos son fronteras que `break` no cruza.
    pub fn in_loop(&self) -> bool {
        for (frame, _) in self.frames.iter().rev() {
            match frame {
                Frame::Loop => return true,
                Frame::Body => continue,
                Frame::Root | Frame::Function | Frame::Lambda | Frame::Event => return false,
            }
        }

        false
    }

    /// Introduce un nombre en el ámbito más interno.
    pub fn declare(&mut self, name: &Located<Identifier>, kind: EntryKind, shape: Shape) -> EntryId {
        let id = self.table.declare(ScopeEntry {
            name: name.as_ref().clone(),
            kind,
            shape,
        });

        if let Some((_, names)) = self.frames.last_mut() {
            names.push((name.as_ref().clone(), id));
        }

        id
    }

    /// Busca la declaración más interna de un nombre.
    pub fn resolve(&self, name: &str) -> Option<EntryId> {
        self.frames
            .iter()
            .rev()
            .flat_map(|(_, names)| names.iter().rev())
            .find(|(declared, _)| declared.as_ref() == name)
            .map(|&(_, id)| id)
    }

    /// Busca una variable global, ignorando cualquier sombra local.
    pub fn resolve_global(&self, name: &str) -> Option<EntryId> {
        let (_, names) = self.frames.first()?;
        names
            .iter()
            .rev()
            .find(|(declared, id)| declared.as_ref() == name && self.table[*id].kind.is_global())
            .map(|&(_, id)| id)
    }

    /// Determina si el ámbito más interno ya declara este nombre.
    pub fn declared_here(&self, name: &str) -> bool {
        self.frames
            .last()
            .map_or(false, |(_, names)| names.iter().any(|(declared, _)| declared.as_ref() == name))
    }

    pub fn table(&self) -> &SymbolTable {
        &self.table
    }

    pub fn into_table(self) -> SymbolTable {
        self.table
    }
}

/// Clasificador estructural de expresiones.
///
/// Usa únicamente la forma literal, la forma registrada en el sitio
/// de declaración de una variable y las salidas conocidas de funciones
/// y métodos predefinidos. Todo lo demás es [`Shape::Any`].
pub fn shape_of(expr: &Expr, symbols: &SymbolTable) -> Shape {
    match expr {
        Expr::Text(_) | Expr::Transform { .. } => Shape::Text,
        Expr::Number(_) => Shape::Number,
        Expr::Boolean(_) | Expr::Question { .. } => Shape::Boolean,
        Expr::Color(_) => Shape::Color,
        Expr::List(_) => Shape::List,
        Expr::Dictionary(_) => Shape::Dictionary,
        Expr::Component(_) => Shape::Component,

        Expr::Variable(reference) => reference
            .entry
            .and_then(|id| symbols.get(id))
            .map_or(Shape::Any, ScopeEntry::shape),

        Expr::Unary(UnOp::Not, _) => Shape::Boolean,
        Expr::Unary(UnOp::Negate, _) => Shape::Number,

        Expr::Binary(_, op, _) => match op {
            BinOp::Join => Shape::Text,

            BinOp::Add
            | BinOp::Sub
            | BinOp::Mul
            | BinOp::Div
            | BinOp::Rem
            | BinOp::Pow
            | BinOp::BitOr
            | BinOp::BitAnd
            | BinOp::BitXor => Shape::Number,

            _ => Shape::Boolean,
        },

        Expr::If {
            then, otherwise, ..
        } => {
            let then = shape_of(then.result.val(), symbols);
            if then == shape_of(otherwise.result.val(), symbols) {
                then
            } else {
                Shape::Any
            }
        }

        Expr::Block(body) => shape_of(body.result.val(), symbols),

        Expr::Call { callee, .. } => {
            let name = callee.val().as_ref();
            match builtins::generic(name) {
                Some(generic) => generic.output(),
                None => builtins::function(name).map_or(Shape::Any, |builtin| builtin.output),
            }
        }

        Expr::Compute { result, .. } => shape_of(result.val(), symbols),
        Expr::Every(_) => Shape::List,

        Expr::Method {
            receiver, method, ..
        } => {
            let name = method.val().as_ref();
            match Family::of(shape_of(receiver.val(), symbols)) {
                Some(family) => builtins::method(family, name).map_or(Shape::Any, |method| method.output),
                None => {
                    let mut candidates = builtins::methods_named(name);
                    match (candidates.next(), candidates.next()) {
                        (Some(method), None) => method.output,
                        _ => Shape::Any,
                    }
                }
            }
        }

        Expr::Lambda(lambda) => match lambda.kind {
            LambdaKind::Map | LambdaKind::Filter | LambdaKind::Sort | LambdaKind::SortByKey => Shape::List,
            LambdaKind::Min | LambdaKind::Max | LambdaKind::Reduce => Shape::Any,
        },

        Expr::Pair(..)
        | Expr::Index { .. }
        | Expr::Property { .. }
        | Expr::Helper { .. }
        | Expr::WalkAll
        | Expr::Undefined => Shape::Any,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        ast::Reference,
        source::{Location, Position},
    };

    fn name(id: &str) -> Located<Identifier> {
        Located::at(Identifier::new(id), Location::point(Position::default()))
    }

    #[test]
    fn innermost_declaration_wins() {
        let mut scopes = Scopes::new();
        let outer = scopes.declare(&name("x"), EntryKind::Global, Shape::Text);

        scopes.enter(Frame::Function);
        let inner = scopes.declare(&name("x"), EntryKind::Parameter, Shape::Any);
        assert_eq!(scopes.resolve("x"), Some(inner));
        assert_eq!(scopes.resolve_global("x"), Some(outer));

        scopes.exit();
        assert_eq!(scopes.resolve("x"), Some(outer));
        assert_eq!(scopes.resolve("y"), None);
    }

    #[test]
    fn names_leave_with_their_frame() {
        let mut scopes = Scopes::new();
        scopes.enter(Frame::Body);
        scopes.declare(&name("tmp"), EntryKind::Local, Shape::Number);
        assert!(scopes.declared_here("tmp"));

        scopes.exit();
        assert_eq!(scopes.resolve("tmp"), None);
        assert_eq!(scopes.table().len(), 1);
    }

    #[test]
    fn locals_at_root_are_not_globals() {
        let mut scopes = Scopes::new();
        scopes.declare(&name("x"), EntryKind::Local, Shape::Number);

        assert!(scopes.resolve("x").is_some());
        assert_eq!(scopes.resolve_global("x"), None);
    }

    #[test]
    fn loops_stop_at_function_boundaries() {
        let mut scopes = Scopes::new();
        assert!(!scopes.in_loop());

        scopes.enter(Frame::Loop);
        scopes.enter(Frame::Body);
        assert!(scopes.in_loop());

        scopes.enter(Frame::Lambda);
        assert!(!scopes.in_loop());

        scopes.truncate(0);
        assert!(scopes.at_root());
    }

    #[test]
    fn shapes_follow_declarations() {
        let mut scopes = Scopes::new();
        let id = scopes.declare(&name("names"), EntryKind::Global, Shape::List);

        let reference = Expr::Variable(Reference {
            name: name("names"),
            entry: Some(id),
        });

        assert_eq!(shape_of(&reference, scopes.table()), Shape::List);

        let unresolved = Expr::Variable(Reference {
            name: name("other"),
            entry: None,
        });

        assert_eq!(shape_of(&unresolved, scopes.table()), Shape::Any);
    }

    #[test]
    fn shapes_of_calls() {
        let table = SymbolTable::default();
        let call = |callee: &str| Expr::Call {
            callee: name(callee),
            args: Vec::new(),
        };

        assert_eq!(shape_of(&call("decToHex"), &table), Shape::Text);
        assert_eq!(shape_of(&call("println"), &table), Shape::Void);
        assert_eq!(shape_of(&call("userFunction"), &table), Shape::Any);
        assert_eq!(shape_of(&call("set"), &table), Shape::Void);
        assert_eq!(shape_of(&call("vcall"), &table), Shape::Any);
        assert_eq!(shape_of(&Expr::Undefined, &table), Shape::Any);
    }
}
