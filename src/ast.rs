//! Árbol sintáctico abstracto.
//!
//! El parser construye estos nodos ya con las referencias a variables
//! resueltas contra la tabla de símbolos del programa, por lo cual la
//! generación de código nunca vuelve a resolver nombres.

use crate::{
    components::ComponentTable,
    lex::Identifier,
    semantic::{EntryId, SymbolTable},
    source::Located,
};

#[derive(Debug)]
pub struct Program {
    pub statements: Vec<Located<Statement>>,
    pub symbols: SymbolTable,
    pub functions: Vec<Signature>,
    pub components: ComponentTable,
}

impl Program {
    pub fn function(&self, name: &str) -> Option<&Signature> {
        self.functions.iter().find(|signature| signature.name.as_ref() == name)
    }
}

/// Firma de una función definida por el usuario.
#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    pub name: Identifier,
    pub parameters: Vec<Identifier>,
    pub returns: bool,
}

/// Declaración de un nombre, ya registrado en la tabla de símbolos.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub name: Located<Identifier>,
    pub entry: EntryId,
}

/// Uso de un nombre. `entry` es `None` solo si el nombre no se pudo
/// resolver, en cuyo caso el parser ya reportó un error.
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    pub name: Located<Identifier>,
    pub entry: Option<EntryId>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Global {
        name: Binding,
        value: Located<Expr>,
    },

    Local {
        name: Binding,
        value: Located<Expr>,
    },

    Assign {
        target: Located<Target>,
        value: Located<Expr>,
    },

    If {
        branches: Vec<Branch>,
        otherwise: Option<Vec<Located<Statement>>>,
    },

    While {
        condition: Located<Expr>,
        body: Vec<Located<Statement>>,
    },

    ForRange {
        variable: Binding,
        start: Located<Expr>,
        end: Located<Expr>,
        step: Located<Expr>,
        body: Vec<Located<Statement>>,
    },

    ForEach {
        variable: Binding,
        iterable: Located<Expr>,
        body: Vec<Located<Statement>>,
    },

    ForEachPair {
        key: Binding,
        value: Binding,
        iterable: Located<Expr>,
        body: Vec<Located<Statement>>,
    },

    Function(Function),
    Event(Event),
    Expr(Located<Expr>),
    Break,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub condition: Located<Expr>,
    pub body: Vec<Located<Statement>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: Located<Identifier>,
    pub parameters: Vec<Binding>,
    pub body: FunctionBody,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FunctionBody {
    Void(Vec<Located<Statement>>),
    Result(ValueBody),
}

/// Secuencia de sentencias cuyo valor es el de una expresión final.
///
/// El parser separa la expresión final de las sentencias previas, de
/// modo que no existe una construcción de retorno explícito.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueBody {
    pub statements: Vec<Located<Statement>>,
    pub result: Box<Located<Expr>>,
}

impl ValueBody {
    pub fn of(result: Located<Expr>) -> Self {
        ValueBody {
            statements: Vec::new(),
            result: Box::new(result),
        }
    }
}

/// Manejador de un evento de componente.
///
/// Un manejador genérico (`when any Tipo.Evento`) atiende a todas las
/// instancias de un tipo, en cuyo caso `component` nombra al tipo.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub generic: bool,
    pub component: Located<Identifier>,
    pub event: Located<Identifier>,
    pub parameters: Vec<Binding>,
    pub body: Vec<Located<Statement>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Variable(Reference),

    Index {
        list: Box<Located<Expr>>,
        index: Box<Located<Expr>>,
    },

    Property {
        component: Located<Identifier>,
        property: Located<Identifier>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Text(String),
    Number(String),
    Boolean(bool),
    Color(String),
    Variable(Reference),
    Component(Identifier),
    List(Vec<Located<Expr>>),
    Dictionary(Vec<Located<Expr>>),
    Pair(Box<Located<Expr>>, Box<Located<Expr>>),
    Unary(UnOp, Box<Located<Expr>>),
    Binary(Box<Located<Expr>>, BinOp, Box<Located<Expr>>),

    If {
        condition: Box<Located<Expr>>,
        then: Box<ValueBody>,
        otherwise: Box<ValueBody>,
    },

    Call {
        callee: Located<Identifier>,
        args: Vec<Located<Expr>>,
    },

    Method {
        receiver: Box<Located<Expr>>,
        method: Located<Identifier>,
        args: Vec<Located<Expr>>,
    },

    Property {
        component: Located<Identifier>,
        property: Located<Identifier>,
    },

    Index {
        list: Box<Located<Expr>>,
        index: Box<Located<Expr>>,
    },

    Question {
        subject: Box<Located<Expr>>,
        question: Located<Identifier>,
    },

    Transform {
        subject: Box<Located<Expr>>,
        transform: Located<Identifier>,
    },

    /// `compute(a = 1, b = 2) -> a + b`, con nombres visibles solo en
    /// el resultado.
    Compute {
        locals: Vec<(Binding, Located<Expr>)>,
        result: Box<Located<Expr>>,
    },

    /// Opción de un menú auxiliar, como `Direction@North`.
    Helper {
        key: Located<Identifier>,
        option: Located<Identifier>,
    },

    /// Todas las instancias de un tipo de componente.
    Every(Located<Identifier>),

    Lambda(Box<Lambda>),
    Block(Box<ValueBody>),
    WalkAll,

    /// Un socket intencionalmente vacío.
    Undefined,
}

/// Transformación de lista con un cuerpo parametrizado.
#[derive(Debug, Clone, PartialEq)]
pub struct Lambda {
    pub list: Located<Expr>,
    pub kind: LambdaKind,
    pub seed: Option<Located<Expr>>,
    pub parameters: Vec<Binding>,
    pub body: ValueBody,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LambdaKind {
    Map,
    Filter,
    SortByKey,
    Sort,
    Min,
    Max,
    Reduce,
}

impl LambdaKind {
    pub fn from_name(name: &str) -> Option<Self> {
        use LambdaKind::*;

        let kind = match name {
            "map" => Map,
            "filter" => Filter,
            "sortByKey" => SortByKey,
            "sort" => Sort,
            "min" => Min,
            "max" => Max,
            "reduce" => Reduce,
            _ => return None,
        };

        Some(kind)
    }

    /// Cantidad de nombres que declara el cuerpo.
    pub fn parameters(self) -> usize {
        match self {
            LambdaKind::Map | LambdaKind::Filter | LambdaKind::SortByKey => 1,
            _ => 2,
        }
    }

    /// Cantidad de argumentos entre paréntesis antes del cuerpo.
    pub fn arguments(self) -> usize {
        match self {
            LambdaKind::Reduce => 1,
            _ => 0,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UnOp {
    Not,
    Negate,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinOp {
    Join,
    Or,
    And,
    BitOr,
    BitAnd,
    BitXor,
    Equal,
    NotEqual,
    TextEqual,
    TextNotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    TextLess,
    TextGreater,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
}
