//! Diagnósticos.
//!
//! Cada fase define su propio tipo de error, siempre acompañado de
//! una ubicación por medio de [`Located`]. Un [`Diagnostic`] borra
//! el tipo concreto del error y lo etiqueta con la fase de origen,
//! lo cual permite reportarlo de manera uniforme.

use crate::source::{self, Located, Location};
use std::{
    error::Error,
    fmt::{self, Display},
};

mod sealed {
    pub trait Sealed {}
}

pub trait LocatedError: sealed::Sealed {
    fn source(&self) -> &(dyn Error + 'static);
    fn location(&self) -> &Location;
}

/// Fase del compilador que originó un diagnóstico.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Stage {
    Lex,
    Syntax,
    Scope,
    Generation,
}

impl Stage {
    fn kind(self) -> &'static str {
        match self {
            Stage::Lex | Stage::Syntax => "Syntax Error",
            Stage::Scope => "Scope Error",
            Stage::Generation => "Compile Error",
        }
    }
}

/// Un error fatal de compilación, con su ubicación.
pub struct Diagnostic {
    stage: Stage,
    error: Box<dyn 'static + LocatedError>,
}

impl Diagnostic {
    pub fn new<E: 'static + LocatedError>(stage: Stage, error: E) -> Self {
        Diagnostic {
            stage,
            error: Box::new(error),
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn location(&self) -> &Location {
        self.error.location()
    }

    pub fn line(&self) -> u32 {
        self.location().start().line()
    }

    pub fn column(&self) -> u32 {
        self.location().start().column()
    }

    /// Mensaje del error sin la posición.
    pub fn message(&self) -> String {
        self.error.source().to_string()
    }

    /// Intenta recuperar el error concreto.
    pub fn downcast_ref<E: Error + 'static>(&self) -> Option<&E> {
        self.error.source().downcast_ref()
    }

    /// Reporte extendido con un extracto del código fuente.
    pub fn report<'a>(&'a self, source: &'a str) -> Report<'a> {
        Report {
            diagnostic: self,
            source,
        }
    }
}

impl Display for Diagnostic {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            fmt,
            "{}: {} at line {}, column {}",
            self.stage.kind(),
            self.error.source(),
            self.line(),
            self.column()
        )
    }
}

impl fmt::Debug for Diagnostic {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        <Self as Display>::fmt(self, fmt)
    }
}

impl Error for Diagnostic {}

/// Extracto de código fuente que señala el origen de un diagnóstico.
pub struct Report<'a> {
    diagnostic: &'a Diagnostic,
    source: &'a str,
}

impl Display for Report<'_> {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Report { diagnostic, source } = self;

        writeln!(fmt, "{}", diagnostic)?;

        let location = diagnostic.location();
        writeln!(fmt, " --> {}", location)?;

        let start = location.start();
        let digits = start.line().to_string().chars().count();
        writeln!(fmt, "{:digits$} |", "", digits = digits)?;

        let line = source::line(source, start.line()).unwrap_or("");
        writeln!(fmt, "{:>digits$} | {}", start.line(), line, digits = digits)?;

        let end = location.end();
        let highlight = if end.line() == start.line() && end.column() > start.column() {
            (end.column() - start.column()) as usize
        } else {
            1
        };

        writeln!(
            fmt,
            "{:digits$} | {:skip$}{:^<highlight$}",
            "",
            "",
            "",
            digits = digits,
            skip = (start.column() - 1) as usize,
            highlight = highlight
        )
    }
}

impl<E: Error + 'static> sealed::Sealed for Located<E> {}

impl<E: Error + 'static> LocatedError for Located<E> {
    fn source(&self) -> &(dyn Error + 'static) {
        self.as_ref()
    }

    fn location(&self) -> &Location {
        Located::location(self)
    }
}
