//! Rastreo de ubicaciones originales en código fuente.
//!
//! Los distintos objetos internos que el compilador construye
//! deben llevar cuenta de posiciones o rangos de ubicaciones en
//! el código fuente original, lo cual permite determinar un punto
//! exacto o aproximado en donde ocurre un error de abstracción
//! arbitraria.

use std::{
    fmt::{self, Debug, Display, Formatter},
    str::Chars,
};

/// Un objeto cualquiera con una posición original asociada.
#[derive(Debug, Clone, PartialEq)]
pub struct Located<T> {
    location: Location,
    value: T,
}

impl<T> Located<T> {
    /// Obtiene el valor.
    pub fn val(&self) -> &T {
        &self.value
    }

    /// Obtiene la ubicación.
    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Descarta la ubicación y toma ownership del valor.
    pub fn into_inner(self) -> T {
        self.value
    }

    /// Descompone y toma ownership de las dos partes.
    pub fn split(self) -> (Location, T) {
        (self.location, self.value)
    }

    /// Construye a partir de un valor y una ubicación.
    pub fn at(value: T, location: Location) -> Self {
        Located { value, location }
    }

    /// Transforma el valor con la misma ubicación.
    pub fn map<U, F>(self, map: F) -> Located<U>
    where
        F: FnOnce(T) -> U,
    {
        Located {
            value: map(self.value),
            location: self.location,
        }
    }
}

impl<T> AsRef<T> for Located<T> {
    fn as_ref(&self) -> &T {
        &self.value
    }
}

/// Una ubicación es un rango semiabierto de posiciones.
#[derive(Copy, Clone, PartialEq, Eq, Default)]
pub struct Location {
    start: Position,
    end: Position,
}

impl Location {
    /// Construye una ubicación a partir de sus extremos.
    pub fn new(start: Position, end: Position) -> Self {
        Location { start, end }
    }

    /// Ubicación de ancho cero, como la del fin de la entrada.
    pub fn point(position: Position) -> Self {
        Location {
            start: position,
            end: position,
        }
    }

    /// Unifica un rango de ubicaciones.
    pub fn span(from: Location, to: &Location) -> Self {
        Location {
            start: from.start,
            end: to.end,
        }
    }

    /// Obtiene la posición de inicio.
    pub fn start(&self) -> Position {
        self.start
    }

    /// Obtiene la posición de fin.
    pub fn end(&self) -> Position {
        self.end
    }
}

impl Display for Location {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        let Location { start, end } = *self;
        if end.line != start.line || end.column <= start.column + 1 {
            // Solo se señala una columna en específico
            write!(formatter, "{}", start)
        } else {
            write!(formatter, "{}:[{}-{}]", start.line, start.column, end.column - 1)
        }
    }
}

impl Debug for Location {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        <Self as Display>::fmt(self, formatter)
    }
}

/// Una posición línea-columna en un texto, junto a su desplazamiento en bytes.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct Position {
    line: u32,
    column: u32,
    offset: usize,
}

impl Position {
    /// Obtiene el número de línea.
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Obtiene el número de columna.
    pub fn column(&self) -> u32 {
        self.column
    }

    /// Obtiene el desplazamiento en bytes desde el inicio del texto.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Posición que sigue a un carácter encontrado en esta posición.
    pub fn advance(self, c: char) -> Position {
        match c {
            '\n' => Position {
                line: self.line + 1,
                column: 1,
                offset: self.offset + 1,
            },

            _ => Position {
                line: self.line,
                column: self.column + 1,
                offset: self.offset + c.len_utf8(),
            },
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Position {
            line: 1,
            column: 1,
            offset: 0,
        }
    }
}

impl Display for Position {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:{}", self.line, self.column)
    }
}

/// Flujo de entrada, carácter por carácter.
///
/// Cada carácter emitido incluye la posición en la que se encuentra.
/// El flujo es `Clone`, lo cual permite lookahead arbitrario a costa
/// de una copia barata.
#[derive(Clone)]
pub struct InputStream<'a> {
    chars: Chars<'a>,
    next: Position,
}

impl<'a> InputStream<'a> {
    /// Posición del siguiente carácter, o del fin de la entrada.
    pub fn position(&self) -> Position {
        self.next
    }
}

impl Iterator for InputStream<'_> {
    type Item = (char, Position);

    fn next(&mut self) -> Option<Self::Item> {
        let c = self.chars.next()?;
        let here = self.next;

        self.next = here.advance(c);
        Some((c, here))
    }
}

/// Transforma un texto en un flujo que itera por carácter.
pub fn consume(source: &str) -> InputStream<'_> {
    InputStream {
        chars: source.chars(),
        next: Position::default(),
    }
}

/// Obtiene una línea del texto original, contando desde 1.
pub fn line(source: &str, number: u32) -> Option<&str> {
    source.lines().nth(number.checked_sub(1)? as usize)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn positions_follow_lines_and_bytes() {
        let chars: Vec<_> = consume("añ\nb").collect();

        assert_eq!(chars[0].1, Position::default());
        assert_eq!(chars[1].1.column(), 2);
        assert_eq!(chars[2].1.offset(), 3);
        assert_eq!(chars[3].1.line(), 2);
        assert_eq!(chars[3].1.column(), 1);
        assert_eq!(chars[3].1.offset(), 4);
    }

    #[test]
    fn stream_reports_end_position() {
        let mut stream = consume("ab");
        stream.by_ref().for_each(drop);

        assert_eq!(stream.position().column(), 3);
        assert_eq!(stream.position().offset(), 2);
    }

    #[test]
    fn lines_are_one_based() {
        assert_eq!(line("uno\ndos", 2), Some("dos"));
        assert_eq!(line("uno", 0), None);
    }
}
