//! Representación intermedia: bosque de bloques.
//!
//! Cada bloque es dueño exclusivo de sus hijos, ya sea a través de
//! un socket de entrada o de su enlace `next` hacia la siguiente
//! sentencia, por lo cual no existen ciclos ni nodos compartidos.

use indexmap::IndexMap;
use std::fmt::{self, Display};

/// Identificador de un bloque, único dentro de una compilación.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u32);

impl Display for BlockId {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    kind: &'static str,
    id: BlockId,
    mutation: Option<Mutation>,
    fields: IndexMap<String, String>,
    inputs: IndexMap<String, Input>,
    next: Option<Box<Block>>,
}

/// Contenido de un socket de entrada.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    /// Socket que recibe un bloque con valor.
    Value(Box<Block>),

    /// Socket que recibe una cadena de sentencias.
    Statement(Box<Block>),
}

impl Input {
    pub fn block(&self) -> &Block {
        match self {
            Input::Value(block) | Input::Statement(block) => block,
        }
    }
}

/// Configuración de forma de un bloque cuyo número de sockets varía.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mutation {
    attributes: Vec<(&'static str, String)>,
    children: Vec<Element>,
}

/// Hijo de una mutación, como `<arg name="x">`.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub tag: &'static str,
    pub attributes: Vec<(&'static str, String)>,
}

impl Mutation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(count: usize) -> Self {
        Mutation::new().attribute("items", count)
    }

    pub fn attribute(mut self, name: &'static str, value: impl ToString) -> Self {
        self.attributes.push((name, value.to_string()));
        self
    }

    /// Agrega un hijo con un único atributo `name`.
    pub fn named(mut self, tag: &'static str, name: impl ToString) -> Self {
        self.children.push(Element {
            tag,
            attributes: vec![("name", name.to_string())],
        });

        self
    }

    pub fn attributes(&self) -> &[(&'static str, String)] {
        &self.attributes
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(attribute, _)| *attribute == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }
}

impl Block {
    pub fn new(kind: &'static str, id: BlockId) -> Self {
        Block {
            kind,
            id,
            mutation: None,
            fields: IndexMap::new(),
            inputs: IndexMap::new(),
            next: None,
        }
    }

    pub fn with_mutation(mut self, mutation: Mutation) -> Self {
        self.mutation = Some(mutation);
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Conecta un valor. Un socket sin bloque queda vacío.
    pub fn value(mut self, socket: impl Into<String>, block: impl Into<Option<Block>>) -> Self {
        if let Some(block) = block.into() {
            self.inputs.insert(socket.into(), Input::Value(Box::new(block)));
        }

        self
    }

    /// Conecta una cadena de sentencias, si existe.
    pub fn statement(mut self, socket: impl Into<String>, chain: Option<Block>) -> Self {
        if let Some(chain) = chain {
            self.inputs.insert(socket.into(), Input::Statement(Box::new(chain)));
        }

        self
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn id(&self) -> BlockId {
        self.id
    }

    pub fn mutation(&self) -> Option<&Mutation> {
        self.mutation.as_ref()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn get_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn inputs(&self) -> impl Iterator<Item = (&str, &Input)> {
        self.inputs.iter().map(|(name, input)| (name.as_str(), input))
    }

    /// Bloque conectado a un socket, sin importar su clase.
    pub fn input(&self, socket: &str) -> Option<&Block> {
        self.inputs.get(socket).map(Input::block)
    }

    pub fn next(&self) -> Option<&Block> {
        self.next.as_deref()
    }

    /// Recorre el bloque y todos sus descendientes en preorden.
    pub fn iter(&self) -> Blocks<'_> {
        Blocks { stack: vec![self] }
    }

    /// Agrega una sentencia al final de la cadena que inicia aquí.
    fn append(&mut self, next: Block) {
        match &mut self.next {
            Some(following) => following.append(next),
            None => self.next = Some(Box::new(next)),
        }
    }
}

/// Enlaza una secuencia de sentencias por medio de `next`.
pub fn chain<I>(blocks: I) -> Option<Block>
where
    I: IntoIterator<Item = Block>,
{
    let blocks: Vec<_> = blocks.into_iter().collect();
    blocks.into_iter().rev().fold(None, |next, mut block| {
        if let Some(next) = next {
            block.append(next);
        }

        Some(block)
    })
}

/// Iterador en preorden sobre un árbol de bloques.
pub struct Blocks<'a> {
    stack: Vec<&'a Block>,
}

impl<'a> Iterator for Blocks<'a> {
    type Item = &'a Block;

    fn next(&mut self) -> Option<&'a Block> {
        let block = self.stack.pop()?;

        self.stack.extend(block.next.as_deref());
        self.stack
            .extend(block.inputs.values().rev().map(Input::block));

        Some(block)
    }
}

/// Secuencia ordenada de árboles raíz, una por sentencia de nivel superior.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Forest {
    roots: Vec<Block>,
}

impl Forest {
    pub fn new(roots: Vec<Block>) -> Self {
        Forest { roots }
    }

    pub fn roots(&self) -> &[Block] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Todos los bloques del bosque.
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.roots.iter().flat_map(Block::iter)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn chains_link_in_order() {
        let blocks = (1..=3).map(|id| Block::new("controls_break", BlockId(id)));
        let head = chain(blocks).unwrap();

        let ids: Vec<_> = head.iter().map(|block| block.id().0).collect();
        assert_eq!(ids, [1, 2, 3]);
        assert!(chain(Vec::new()).is_none());
    }

    #[test]
    fn preorder_visits_inputs_before_next() {
        let tree = Block::new("controls_while", BlockId(1))
            .value("TEST", Block::new("logic_boolean", BlockId(2)))
            .statement("DO", Some(Block::new("controls_break", BlockId(3))));

        let head = chain(vec![tree, Block::new("controls_break", BlockId(4))]).unwrap();
        let ids: Vec<_> = head.iter().map(|block| block.id().0).collect();

        assert_eq!(ids, [1, 2, 3, 4]);
        assert_eq!(head.input("TEST").map(Block::kind), Some("logic_boolean"));
    }

    #[test]
    fn empty_sockets_are_omitted() {
        let block = Block::new("controls_while", BlockId(1))
            .value("TEST", None)
            .statement("DO", None);

        assert!(block.input("DO").is_none());
        assert!(block.inputs().next().is_none());
    }
}
