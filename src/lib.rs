//! Compilador de Falcon a bosques de bloques.
//!
//! # Front end
//! Cada programa deriva de un único texto fuente. Este texto se
//! somete primero a análisis léxico en [`lex`], de lo cual se obtiene
//! un flujo de tokens. El flujo de tokens se dispone en un AST por
//! medio de análisis sintáctico en [`parse`], que al mismo tiempo
//! resuelve cada nombre contra la tabla de ámbitos de [`semantic`].
//! Los componentes externos de la aplicación anfitriona se describen
//! con una [`ComponentTable`].
//!
//! # Back end
//! El AST ya resuelto se traduce a la representación intermedia de
//! [`ir`], un bosque de bloques con un árbol por cada sentencia de
//! nivel superior, por medio de [`codegen`]. Finalmente, el bosque se
//! serializa como markup en [`codegen::markup`], separando cada
//! fragmento con un carácter NUL.
//!
//! La compilación completa es una función pura: no comparte estado
//! entre llamadas y no realiza E/S.

pub mod ast;
pub mod builtins;
pub mod codegen;
pub mod components;
pub mod error;
pub mod ir;
pub mod lex;
pub mod parse;
pub mod semantic;
pub mod source;

pub use components::ComponentTable;

use codegen::markup::EmitOptions;
use error::{Diagnostic, Stage};
use log::debug;

/// Compila un programa hasta su markup final con el formato por omisión.
pub fn compile(source: &str, components: &ComponentTable) -> Result<String, Diagnostic> {
    compile_with(source, components, EmitOptions::default())
}

/// Como [`compile`], con opciones explícitas de formato.
pub fn compile_with(source: &str, components: &ComponentTable, options: EmitOptions) -> Result<String, Diagnostic> {
    let tokens = lex::tokenize(source).map_err(|error| Diagnostic::new(Stage::Lex, error))?;
    let program = parse::parse(&tokens, components)?;
    let forest = codegen::generate(&program).map_err(|error| Diagnostic::new(Stage::Generation, error))?;

    debug!(
        "Compiled {} tokens into {} root blocks",
        tokens.len(),
        forest.len()
    );

    Ok(forest.markup(options).to_string())
}
