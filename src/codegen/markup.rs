//! Serialización del bosque de bloques.
//!
//! Cada árbol raíz se escribe como un fragmento de markup
//! independiente. Los fragmentos se separan con un único carácter
//! NUL (`U+0000`), el cual nunca aparece dentro de un fragmento.

use bitflags::bitflags;
use std::fmt::{self, Display, Write};

use crate::ir::{Block, Forest, Input, Mutation};

/// Separador entre fragmentos de nivel superior.
pub const SEPARATOR: char = '\0';

/// Espacio de nombres del formato de bloques.
pub const NAMESPACE: &str = "https://developers.google.com/blockly/xml";

bitflags! {
    /// Opciones de formato para la salida.
    pub struct EmitOptions: u32 {
        /// Una etiqueta por línea, anidada con dos espacios.
        const INDENT = 0x01;

        /// Envolver cada fragmento en `<xml xmlns="...">`.
        const NAMESPACE = 0x02;
    }
}

impl Default for EmitOptions {
    fn default() -> Self {
        EmitOptions::INDENT | EmitOptions::NAMESPACE
    }
}

impl Forest {
    /// Vista de este bosque como markup.
    pub fn markup(&self, options: EmitOptions) -> Markup<'_> {
        Markup {
            forest: self,
            options,
        }
    }
}

/// Bosque listo para serializarse por medio de [`Display`].
pub struct Markup<'a> {
    forest: &'a Forest,
    options: EmitOptions,
}

impl Display for Markup<'_> {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        emit(self.forest, self.options, fmt)
    }
}

/// Escribe el bosque completo.
pub fn emit<W: Write>(forest: &Forest, options: EmitOptions, output: &mut W) -> fmt::Result {
    for (index, root) in forest.roots().iter().enumerate() {
        if index > 0 {
            output.write_char(SEPARATOR)?;
        }

        let mut emitter = Emitter {
            output: &mut *output,
            options,
            depth: 0,
        };

        emitter.fragment(root)?;
    }

    Ok(())
}

macro_rules! emit {
    ($self:expr, $($format:tt)*) => {{
        $self.indent()?;
        write!($self.output, $($format)*)?;
        $self.newline()
    }};
}

struct Emitter<'a, W> {
    output: &'a mut W,
    options: EmitOptions,
    depth: usize,
}

impl<W: Write> Emitter<'_, W> {
    fn fragment(&mut self, root: &Block) -> fmt::Result {
        let wrap = self.options.contains(EmitOptions::NAMESPACE);
        if wrap {
            emit!(self, "<xml xmlns=\"{}\">", NAMESPACE)?;
            self.depth += 1;
        }

        self.block(root)?;

        if wrap {
            self.depth -= 1;
            emit!(self, "</xml>")?;
        }

        Ok(())
    }

    fn block(&mut self, block: &Block) -> fmt::Result {
        emit!(self, "<block type=\"{}\" id=\"{}\">", block.kind(), block.id())?;
        self.depth += 1;

        if let Some(mutation) = block.mutation() {
            self.mutation(mutation)?;
        }

        for (name, value) in block.fields() {
            emit!(self, "<field name=\"{}\">{}</field>", Escaped(name), Escaped(value))?;
        }

        for (name, input) in block.inputs() {
            let tag = match input {
                Input::Value(_) => "value",
                Input::Statement(_) => "statement",
            };

            emit!(self, "<{} name=\"{}\">", tag, Escaped(name))?;
            self.nested(|this| this.block(input.block()))?;
            emit!(self, "</{}>", tag)?;
        }

        if let Some(next) = block.next() {
            emit!(self, "<next>")?;
            self.nested(|this| this.block(next))?;
            emit!(self, "</next>")?;
        }

        self.depth -= 1;
        emit!(self, "</block>")
    }

    fn mutation(&mut self, mutation: &Mutation) -> fmt::Result {
        self.indent()?;
        self.output.write_str("<mutation")?;
        attributes(self.output, mutation.attributes())?;

        if mutation.children().is_empty() {
            self.output.write_str("></mutation>")?;
            return self.newline();
        }

        self.output.write_char('>')?;
        self.newline()?;

        self.nested(|this| {
            for child in mutation.children() {
                this.indent()?;
                write!(this.output, "<{}", child.tag)?;
                attributes(this.output, &child.attributes)?;
                write!(this.output, "></{}>", child.tag)?;
                this.newline()?;
            }

            Ok(())
        })?;

        emit!(self, "</mutation>")
    }

    fn nested<F>(&mut self, inner: F) -> fmt::Result
    where
        F: FnOnce(&mut Self) -> fmt::Result,
    {
        self.depth += 1;
        let result = inner(self);
        self.depth -= 1;

        result
    }

    fn indent(&mut self) -> fmt::Result {
        if self.options.contains(EmitOptions::INDENT) {
            for _ in 0..self.depth {
                self.output.write_str("  ")?;
            }
        }

        Ok(())
    }

    fn newline(&mut self) -> fmt::Result {
        if self.options.contains(EmitOptions::INDENT) {
            self.output.write_char('\n')?;
        }

        Ok(())
    }
}

fn attributes<W: Write>(output: &mut W, attributes: &[(&'static str, String)]) -> fmt::Result {
    for (name, value) in attributes {
        write!(output, " {}=\"{}\"", name, Escaped(value))?;
    }

    Ok(())
}

/// Texto con los caracteres reservados del markup escapados.
struct Escaped<'a>(&'a str);

impl Display for Escaped<'_> {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in self.0.chars() {
            match c {
                '&' => fmt.write_str("&amp;")?,
                '<' => fmt.write_str("&lt;")?,
                '>' => fmt.write_str("&gt;")?,
                '"' => fmt.write_str("&quot;")?,
                '\'' => fmt.write_str("&apos;")?,

                // Ningún carácter de control llega crudo a la salida, en
                // particular el separador de fragmentos. Los de C0 no
                // son representables ni como referencia.
                '\n' | '\t' | '\r' => fmt.write_char(c)?,
                c if c.is_ascii_control() && c != '\u{7f}' => fmt.write_char(char::REPLACEMENT_CHARACTER)?,
                c if c.is_control() => write!(fmt, "&#x{:X};", c as u32)?,

                c => fmt.write_char(c)?,
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ir::BlockId;

    fn sample() -> Forest {
        let text = Block::new("text", BlockId(2)).field("TEXT", "a < \"b\"");
        let global = Block::new("global_declaration", BlockId(1))
            .field("NAME", "name")
            .value("VALUE", text);

        let join = Block::new("text_join", BlockId(3)).with_mutation(Mutation::items(2));
        Forest::new(vec![global, join])
    }

    #[test]
    fn compact_fragments() {
        let markup = sample().markup(EmitOptions::empty()).to_string();
        let fragments: Vec<_> = markup.split(SEPARATOR).collect();

        assert_eq!(
            fragments,
            [
                "<block type=\"global_declaration\" id=\"1\"><field name=\"NAME\">name</field>\
                 <value name=\"VALUE\"><block type=\"text\" id=\"2\">\
                 <field name=\"TEXT\">a &lt; &quot;b&quot;</field></block></value></block>",
                "<block type=\"text_join\" id=\"3\"><mutation items=\"2\"></mutation></block>",
            ]
        );
    }

    #[test]
    fn indented_with_namespace() {
        let forest = Forest::new(vec![Block::new("controls_break", BlockId(7))]);
        let markup = forest.markup(EmitOptions::default()).to_string();

        assert_eq!(
            markup,
            "<xml xmlns=\"https://developers.google.com/blockly/xml\">\n\
             \x20\x20<block type=\"controls_break\" id=\"7\">\n\
             \x20\x20</block>\n\
             </xml>\n"
        );
    }

    #[test]
    fn mutation_children() {
        let mutation = Mutation::new().named("arg", "x").named("arg", "y");
        let block = Block::new("procedures_defnoreturn", BlockId(1)).with_mutation(mutation);
        let markup = Forest::new(vec![block]).markup(EmitOptions::empty()).to_string();

        assert!(markup.contains("<mutation><arg name=\"x\"></arg><arg name=\"y\"></arg></mutation>"));
    }

    #[test]
    fn empty_forest_is_empty_text() {
        assert_eq!(Forest::default().markup(EmitOptions::default()).to_string(), "");
    }

    #[test]
    fn separator_never_leaks_from_text() {
        let block = Block::new("text", BlockId(1)).field("TEXT", "a\0b");
        let markup = Forest::new(vec![block]).markup(EmitOptions::empty()).to_string();

        assert!(!markup.contains(SEPARATOR));
        assert!(markup.contains("a\u{FFFD}b"));

        let delete = Block::new("text", BlockId(1)).field("TEXT", "a\u{7f}b");
        let markup = Forest::new(vec![delete]).markup(EmitOptions::empty()).to_string();
        assert!(markup.contains("a&#x7F;b"));
    }
}
