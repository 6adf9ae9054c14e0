//! Análisis léxico.
//!
//! # Tokenization
//! Esta es la primera fase del compilador. Descompone un [`InputStream`]
//! (flujo de caracteres) en unidades léxicas denominadas tokens. Los espacios
//! en blanco y los comentarios se descartan durante esta operación. Cada
//! token emitido esta asociado a una ubicación en el código fuente original,
//! lo cual permite rastrear errores en tanto los mismos como constructos
//! más elevados de fases posteriores.
//!
//! # Contenido de un token
//! Operadores, puntuación y palabras clave se identifican por el hecho de
//! lo que son y no incluyen lexemas. Los identificadores incluyen su lexema
//! original. Los literales de texto se resuelven a su contenido ya sin
//! secuencias de escape, mientras que los literales numéricos preservan su
//! lexema, ya que el formato de bloques los representa como texto.
//!
//! # Reglas importantes del lenguaje
//! - Los identificadores comienzan con una letra ASCII y continúan con
//!   letras, dígitos o `_`. A diferencia de otros lenguajes, `_` por sí
//!   solo es el operador de concatenación de texto.
//! - El lenguaje es case-sensitive.
//! - Los operadores se reconocen de la forma más larga posible, por lo
//!   cual `===` nunca se descompone en `==` y `=`.
//! - El flujo de tokens siempre termina con [`Token::Eof`].
//!
//! # Errores
//! El lexer es capaz de recuperarse parcialmente de condiciones de error,
//! descartando el resto de la línea. Esto ocurre en suficiente grado como
//! para reportar más de un error por ejecución, pero no lo suficiente como
//! para permitir el avance a las demás fases de la compilación.

use crate::source::{self, InputStream, Located, Location, Position};
use log::trace;
use std::{
    borrow::Borrow,
    fmt::{self, Display},
    iter::Peekable,
    rc::Rc,
    str::FromStr,
};

use thiserror::Error;

/// Error de escaneo.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LexerError {
    /// Carácter desconocido o inesperado en el flujo de entrada.
    #[error("Unexpected character '{0}'")]
    BadChar(char),

    /// Un literal de texto no se cerró antes del fin de línea.
    #[error("Unterminated string")]
    UnterminatedString,

    /// Literal numérico malformado.
    #[error("Invalid numeric literal '{0}'")]
    InvalidNumber(String),

    /// Un código de color no tiene exactamente seis dígitos hexadecimales.
    #[error("Invalid color code, expected '#RRGGBB'")]
    InvalidColor,

    /// Carácter de control crudo dentro de un literal de texto.
    #[error("Control character {0:?} is not allowed in a string")]
    ControlChar(char),
}

/// Un identificador.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier(Rc<str>);

impl Identifier {
    /// Construye un identificador a partir de su lexema.
    pub fn new(name: &str) -> Self {
        Identifier(Rc::from(name))
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Identifier {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl Display for Identifier {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str(&self.0)
    }
}

/// Objeto resultante del análisis léxico.
///
/// Un token contiene suficiente información para describir completamente
/// a una entidad léxica en el programa fuente.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Identificador.
    Id(Identifier),

    /// Palabra clave.
    Keyword(Keyword),

    /// Literal de texto, ya sin escapes.
    Text(String),

    /// Literal numérico, con su lexema original.
    Number(String),

    /// Código de color `#RRGGBB`.
    Color(String),

    /// `+`
    Plus,

    /// `-`
    Minus,

    /// `*`
    Times,

    /// `/`
    Slash,

    /// `%`
    Percent,

    /// `^`
    Caret,

    /// `_`
    Underscore,

    /// `||`
    OrOr,

    /// `&&`
    AndAnd,

    /// `|`
    Pipe,

    /// `&`
    Ampersand,

    /// `~`
    Tilde,

    /// `==`
    Equal,

    /// `!=`
    NotEqual,

    /// `===`
    TextEqual,

    /// `!==`
    TextNotEqual,

    /// `<`
    Less,

    /// `<=`
    LessEqual,

    /// `>`
    Greater,

    /// `>=`
    GreaterEqual,

    /// `<<`
    TextLess,

    /// `>>`
    TextGreater,

    /// `:`
    Colon,

    /// `::`
    DoubleColon,

    /// `..`
    DoubleDot,

    /// `.`
    Period,

    /// `,`
    Comma,

    /// `?`
    Question,

    /// `!`
    Bang,

    /// `->`
    Arrow,

    /// `=`
    Assign,

    /// `@`
    At,

    /// `(`
    OpenParen,

    /// `)`
    CloseParen,

    /// `[`
    OpenSquare,

    /// `]`
    CloseSquare,

    /// `{`
    OpenCurly,

    /// `}`
    CloseCurly,

    /// Fin de la entrada.
    Eof,
}

impl Token {
    /// Busca el operador o signo de puntuación con exactamente este símbolo.
    fn operator(symbol: &str) -> Option<Token> {
        use Token::*;

        let token = match symbol {
            "+" => Plus,
            "-" => Minus,
            "*" => Times,
            "/" => Slash,
            "%" => Percent,
            "^" => Caret,
            "_" => Underscore,
            "||" => OrOr,
            "&&" => AndAnd,
            "|" => Pipe,
            "&" => Ampersand,
            "~" => Tilde,
            "==" => Equal,
            "!=" => NotEqual,
            "===" => TextEqual,
            "!==" => TextNotEqual,
            "<" => Less,
            "<=" => LessEqual,
            ">" => Greater,
            ">=" => GreaterEqual,
            "<<" => TextLess,
            ">>" => TextGreater,
            ":" => Colon,
            "::" => DoubleColon,
            ".." => DoubleDot,
            "." => Period,
            "," => Comma,
            "?" => Question,
            "!" => Bang,
            "->" => Arrow,
            "=" => Assign,
            "@" => At,
            "(" => OpenParen,
            ")" => CloseParen,
            "[" => OpenSquare,
            "]" => CloseSquare,
            "{" => OpenCurly,
            "}" => CloseCurly,
            _ => return None,
        };

        Some(token)
    }
}

impl Display for Token {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Token::*;

        let symbol = match self {
            Id(id) => return id.fmt(fmt),
            Keyword(keyword) => return keyword.fmt(fmt),
            Text(text) => return write!(fmt, "{:?}", text),
            Number(number) => return fmt.write_str(number),
            Color(color) => return fmt.write_str(color),
            Eof => "end of input",
            Plus => "+",
            Minus => "-",
            Times => "*",
            Slash => "/",
            Percent => "%",
            Caret => "^",
            Underscore => "_",
            OrOr => "||",
            AndAnd => "&&",
            Pipe => "|",
            Ampersand => "&",
            Tilde => "~",
            Equal => "==",
            NotEqual => "!=",
            TextEqual => "===",
            TextNotEqual => "!==",
            Less => "<",
            LessEqual => "<=",
            Greater => ">",
            GreaterEqual => ">=",
            TextLess => "<<",
            TextGreater => ">>",
            Colon => ":",
            DoubleColon => "::",
            DoubleDot => "..",
            Period => ".",
            Comma => ",",
            Question => "?",
            Bang => "!",
            Arrow => "->",
            Assign => "=",
            At => "@",
            OpenParen => "(",
            CloseParen => ")",
            OpenSquare => "[",
            CloseSquare => "]",
            OpenCurly => "{",
            CloseCurly => "}",
        };

        fmt.write_str(symbol)
    }
}

/// Una palabra clave.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Keyword {
    True,
    False,
    If,
    Else,
    For,
    Step,
    In,
    While,
    Break,
    Global,
    Local,
    Func,
    When,
    This,
    WalkAll,
    Any,
    Undefined,
    Compute,
}

const KEYWORDS: &[(&str, Keyword)] = &[
    ("true",      Keyword::True),
    ("false",     Keyword::False),
    ("if",        Keyword::If),
    ("else",      Keyword::Else),
    ("for",       Keyword::For),
    ("step",      Keyword::Step),
    ("in",        Keyword::In),
    ("while",     Keyword::While),
    ("break",     Keyword::Break),
    ("global",    Keyword::Global),
    ("local",     Keyword::Local),
    ("func",      Keyword::Func),
    ("when",      Keyword::When),
    ("this",      Keyword::This),
    ("walkAll",   Keyword::WalkAll),
    ("any",       Keyword::Any),
    ("undefined", Keyword::Undefined),
    ("compute",   Keyword::Compute),
];

impl Display for Keyword {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (name, _) = KEYWORDS
            .iter()
            .find(|(_, keyword)| keyword == self)
            .ok_or(fmt::Error)?;

        fmt.write_str(name)
    }
}

impl FromStr for Keyword {
    type Err = ();

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        KEYWORDS
            .iter()
            .find(|&&(name, _)| name == string)
            .map(|&(_, keyword)| keyword)
            .ok_or(())
    }
}

/// Reduce un texto completo a su secuencia de tokens, terminada en
/// [`Token::Eof`], o al primer error léxico encontrado.
pub fn tokenize(source: &str) -> Result<Vec<Located<Token>>, Located<LexerError>> {
    let tokens = Lexer::new(source).collect::<Result<Vec<_>, _>>()?;
    log::debug!("Scanned {} tokens", tokens.len());

    Ok(tokens)
}

/// Máquina de estados para análisis léxico.
///
/// Un lexer puede encontrarse en uno de diversos estados. La
/// salida del lexer, así como su siguiente estado, se define
/// a partir de tanto su estado actual como el siguiente carácter
/// encontrado en el flujo de entrada.
pub struct Lexer<'a> {
    source: Peekable<InputStream<'a>>,
    state: State,
    start: Position,
    next: Position,
    finished: bool,
}

/// Posibles estados del lexer.
enum State {
    /// Estado que ocurre antes de encontrar el inicio de un token.
    Start,

    /// Estado de error.
    Error,

    /// Estado de completitud; siempre emite el token incluido,
    /// consume la entrada actual y pasa a [`State::Start`].
    Complete(Token),

    /// Operador en construcción, el cual se extiende mientras
    /// el resultado siga siendo un operador conocido.
    Operator(String),

    /// Se encontró `/`, lo cual es división o el inicio de un comentario.
    Slash,

    /// Comentario de línea.
    ///
    /// Este estado vuelve a [`State::Start`] al encontrar `'\n'`.
    Comment,

    /// Parte entera de una constante numérica.
    Integer(String),

    /// Parte decimal de una constante numérica.
    Fraction(String),

    /// Exponente; el booleano indica si ya hubo al menos un dígito.
    Exponent(String, bool),

    /// Constante con prefijo `0x` o `0b`.
    Radix(String, u32),

    /// Término que puede ser un identificador o una palabra clave.
    Word(String),

    /// Literal de texto.
    Text(String),

    /// Carácter que sigue a `\` dentro de un literal de texto.
    Escape(String),

    /// Dígitos de un código de color.
    Color(String),
}

impl<'a> Lexer<'a> {
    /// Crea un lexer en estado inicial a partir de un texto.
    pub fn new(source: &'a str) -> Self {
        Lexer {
            source: source::consume(source).peekable(),
            state: State::Start,
            start: Position::default(),
            next: Position::default(),
            finished: false,
        }
    }

    /// Reduce la entrada a sea una secuencia conocida de tokens
    /// infalibles o una secuencia de errores.
    ///
    /// En caso de que ocurra al menos un error, el lexer dejará
    /// de buscar tokens exitosos y comenzará a acumular solamente
    /// errores.
    pub fn try_exhaustive(mut self) -> Result<Vec<Located<Token>>, Vec<Located<LexerError>>> {
        let mut tokens = Vec::new();

        while let Some(result) = self.next() {
            match result {
                Ok(token) => tokens.push(token),
                Err(error) => {
                    drop(tokens);

                    let mut errors = vec![error];
                    errors.extend(self.filter_map(Result::err));

                    return Err(errors);
                }
            }
        }

        Ok(tokens)
    }

    /// Observa el carácter que sigue al siguiente, sin consumir nada.
    fn second(&self) -> Option<char> {
        let mut fork = self.source.clone();
        fork.next();
        fork.peek().map(|&(c, _)| c)
    }

    /// Intenta construir un siguiente token.
    fn lex(&mut self) -> Result<Option<(Token, Position)>, LexerError> {
        use State::*;

        let token = loop {
            let next_char = self.source.peek().map(|&(c, _)| c);
            let after_next = self.second();

            // La posición de origen se mueve junto a la posición
            // siguiente siempre que no se haya encontrado una
            // frontera de token
            if let Start = self.state {
                self.start = self.next;
            }

            // Switch table principal, determina cambios de estado
            // y de salida del lexer a partir de combinaciones del
            // estado actual y el siguiente carácter
            match (&mut self.state, next_char) {
                // Condiciones de error: se descarta la línea donde
                // ocurrió el error. Al llegar al final de la línea
                // el lexer se recupera y reinicia.
                (Error, None) => return Ok(None),
                (Error, Some('\n')) => self.state = Start,
                (Error, Some(_)) => (),

                (Start, None) => return Ok(None),
                (Start, Some(c)) if c.is_whitespace() => (),
                (Start, Some('/')) => self.state = Slash,
                (Start, Some('"')) => self.state = Text(String::new()),
                (Start, Some('#')) => self.state = Color(String::new()),

                // Identificadores y palabras clave
                (Start, Some(c)) if c.is_ascii_alphabetic() => self.state = Word(c.to_string()),

                // Inicio de una constante numérica. No se consume
                // el dígito, ya que esta lógica ya está implementada
                // en el respectivo caso para un estado de constante
                // entera para el cual el siguiente carácter es un dígito
                (Start, Some(c)) if c.is_ascii_digit() => {
                    self.state = Integer(String::new());
                    continue;
                }

                (Start, Some(c)) => match Token::operator(c.encode_utf8(&mut [0; 4])) {
                    Some(_) => self.state = Operator(c.to_string()),
                    None => break Err(LexerError::BadChar(c)),
                },

                // Emisión retardada de tokens cualesquiera
                (Complete(value), _) => break Ok(std::mem::replace(value, Token::Eof)),

                // Munch máximo de operadores
                (Operator(op), Some(c)) if Token::operator(&format!("{}{}", op, c)).is_some() => {
                    op.push(c)
                }

                (Operator(op), _) => match Token::operator(op) {
                    Some(token) => break Ok(token),
                    None => break Err(LexerError::BadChar(op.chars().next().unwrap_or('?'))),
                },

                (Slash, Some('/')) => self.state = Comment,
                (Slash, _) => break Ok(Token::Slash),

                // Los comentarios descartan la línea donde ocurren
                (Comment, Some('\n')) => self.state = Start,
                (Comment, Some(_)) => (),
                (Comment, None) => self.state = Start,

                (Integer(digits), Some(c)) if c.is_ascii_digit() => digits.push(c),

                (Integer(digits), Some(c @ ('x' | 'b'))) if digits.as_str() == "0" => {
                    let radix = if c == 'x' { 16 } else { 2 };
                    let mut prefix = std::mem::take(digits);
                    prefix.push(c);

                    self.state = Radix(prefix, radix);
                }

                // `1..5` es un rango, no una fracción
                (Integer(digits), Some('.')) if matches!(after_next, Some(c) if c.is_ascii_digit()) => {
                    let mut number = std::mem::take(digits);
                    number.push('.');

                    self.state = Fraction(number);
                }

                (Fraction(digits), Some(c)) if c.is_ascii_digit() => digits.push(c),

                (Integer(digits) | Fraction(digits), Some(c @ ('e' | 'E'))) => {
                    let mut number = std::mem::take(digits);
                    number.push(c);

                    self.state = Exponent(number, false);
                }

                (Integer(digits) | Fraction(digits), Some(c)) if c.is_ascii_alphabetic() => {
                    let mut number = std::mem::take(digits);
                    number.push(c);

                    break Err(LexerError::InvalidNumber(number));
                }

                (Integer(digits) | Fraction(digits), _) => {
                    break Ok(Token::Number(std::mem::take(digits)))
                }

                (Exponent(digits, false), Some(c @ ('+' | '-')))
                    if digits.ends_with(&['e', 'E'][..]) =>
                {
                    digits.push(c)
                }

                (Exponent(digits, seen), Some(c)) if c.is_ascii_digit() => {
                    digits.push(c);
                    *seen = true;
                }

                (Exponent(digits, true), next) if !matches!(next, Some(c) if is_word_char(c)) => {
                    break Ok(Token::Number(std::mem::take(digits)))
                }

                (Exponent(digits, _), _) => {
                    break Err(LexerError::InvalidNumber(std::mem::take(digits)))
                }

                (Radix(digits, radix), Some(c)) if c.is_digit(*radix) => digits.push(c),

                (Radix(digits, _), next) if digits.len() > 2 && !matches!(next, Some(c) if is_word_char(c)) => {
                    break Ok(Token::Number(std::mem::take(digits)))
                }

                (Radix(digits, _), next) => {
                    let mut number = std::mem::take(digits);
                    number.extend(next);

                    break Err(LexerError::InvalidNumber(number));
                }

                // Extensión de términos
                (Word(word), Some(c)) if is_word_char(c) => word.push(c),

                // Si sigue algo que no puede formar parte del término, ha terminado
                (Word(word), _) => match Keyword::from_str(word) {
                    Ok(keyword) => break Ok(Token::Keyword(keyword)),
                    Err(()) => break Ok(Token::Id(Identifier::new(word))),
                },

                (Text(_) | Escape(_), None | Some('\n')) => {
                    break Err(LexerError::UnterminatedString)
                }

                (Text(text), Some('"')) => {
                    self.state = Complete(Token::Text(std::mem::take(text)))
                }

                (Text(_) | Escape(_), Some(c)) if is_raw_control(c) => {
                    break Err(LexerError::ControlChar(c))
                }

                (Text(text), Some('\\')) => self.state = Escape(std::mem::take(text)),
                (Text(text), Some(c)) => text.push(c),

                (Escape(text), Some(c)) => {
                    match c {
                        '"' | '\\' => text.push(c),
                        'n' => text.push('\n'),
                        't' => text.push('\t'),
                        _ => {
                            text.push('\\');
                            text.push(c);
                        }
                    }

                    self.state = Text(std::mem::take(text));
                }

                (Color(digits), Some(c)) if c.is_ascii_hexdigit() && digits.len() < 6 => {
                    digits.push(c)
                }

                (Color(digits), next) if digits.len() == 6 && !matches!(next, Some(c) if is_word_char(c)) => {
                    break Ok(Token::Color(format!("#{}", digits)))
                }

                (Color(_), _) => break Err(LexerError::InvalidColor),
            }

            // Si no hubo `continue`, aquí se consume el carácter que
            // se observó con lookahead anteriormente
            if let Some((c, here)) = self.source.next() {
                self.next = here.advance(c);
            }
        };

        token.map(|token| Some((token, self.next)))
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Located<Token>, Located<LexerError>>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.lex() {
            Ok(Some((token, end))) => {
                self.state = State::Start;

                let location = Location::new(self.start, end);
                trace!("{} at {}", token, location);

                Some(Ok(Located::at(token, location)))
            }

            Ok(None) if self.finished => None,

            Ok(None) => {
                self.finished = true;
                Some(Ok(Located::at(Token::Eof, Location::point(self.next))))
            }

            Err(error) => {
                self.state = State::Error;
                Some(Err(Located::at(error, Location::point(self.next))))
            }
        }
    }
}

/// Determina si un carácter puede pertenecer a un término.
fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Caracteres de control que no pueden aparecer en la salida.
fn is_raw_control(c: char) -> bool {
    c.is_ascii_control() && !matches!(c, '\t' | '\n' | '\r' | '\u{7f}')
}

#[cfg(test)]
mod test {
    use super::*;

    fn tokens(source: &str) -> Vec<Token> {
        tokenize(source)
            .expect("lexer failed")
            .into_iter()
            .map(Located::into_inner)
            .collect()
    }

    fn error(source: &str) -> Located<LexerError> {
        tokenize(source).expect_err("lexer should fail")
    }

    #[test]
    fn longest_operators_win() {
        use Token::*;

        assert_eq!(
            tokens("=== !== << >> && || :: .. -> == = <="),
            vec![
                TextEqual,
                TextNotEqual,
                TextLess,
                TextGreater,
                AndAnd,
                OrOr,
                DoubleColon,
                DoubleDot,
                Arrow,
                Equal,
                Assign,
                LessEqual,
                Eof
            ]
        );
    }

    #[test]
    fn words_and_keywords() {
        assert_eq!(
            tokens("global total_2 walkAll"),
            vec![
                Token::Keyword(Keyword::Global),
                Token::Id(Identifier::new("total_2")),
                Token::Keyword(Keyword::WalkAll),
                Token::Eof
            ]
        );
    }

    #[test]
    fn underscore_alone_joins_text() {
        assert_eq!(
            tokens("a _ \"b\""),
            vec![
                Token::Id(Identifier::new("a")),
                Token::Underscore,
                Token::Text("b".into()),
                Token::Eof
            ]
        );
    }

    #[test]
    fn numbers_keep_their_lexemes() {
        assert_eq!(
            tokens("42 3.14 1e10 2.5E-3 0xFF 0b101"),
            vec![
                Token::Number("42".into()),
                Token::Number("3.14".into()),
                Token::Number("1e10".into()),
                Token::Number("2.5E-3".into()),
                Token::Number("0xFF".into()),
                Token::Number("0b101".into()),
                Token::Eof
            ]
        );
    }

    #[test]
    fn ranges_are_not_fractions() {
        assert_eq!(
            tokens("1..10"),
            vec![
                Token::Number("1".into()),
                Token::DoubleDot,
                Token::Number("10".into()),
                Token::Eof
            ]
        );
    }

    #[test]
    fn string_escapes() {
        assert_eq!(
            tokens(r#""say \"hi\"\n\\ \q""#),
            vec![Token::Text("say \"hi\"\n\\ \\q".into()), Token::Eof]
        );
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            tokens("a // nada\n/ b"),
            vec![
                Token::Id(Identifier::new("a")),
                Token::Slash,
                Token::Id(Identifier::new("b")),
                Token::Eof
            ]
        );
    }

    #[test]
    fn color_codes() {
        assert_eq!(tokens("#FF00aa"), vec![Token::Color("#FF00aa".into()), Token::Eof]);
        assert_eq!(*error("#FF00").as_ref(), LexerError::InvalidColor);
        assert_eq!(*error("#FF00AA1").as_ref(), LexerError::InvalidColor);
    }

    #[test]
    fn malformed_numbers() {
        assert!(matches!(error("0x").as_ref(), LexerError::InvalidNumber(_)));
        assert!(matches!(error("12abc").as_ref(), LexerError::InvalidNumber(_)));
        assert!(matches!(error("1e+").as_ref(), LexerError::InvalidNumber(_)));
        assert!(matches!(error("0b12").as_ref(), LexerError::InvalidNumber(_)));
    }

    #[test]
    fn unterminated_string_fails() {
        let error = error("x = \"abc\ny");
        assert_eq!(*error.as_ref(), LexerError::UnterminatedString);
        assert_eq!(error.location().start().line(), 1);
        assert_eq!(error.location().start().column(), 9);
    }

    #[test]
    fn bad_character_position() {
        let error = error("a\n  $");
        assert_eq!(*error.as_ref(), LexerError::BadChar('$'));
        assert_eq!(error.location().start().line(), 2);
        assert_eq!(error.location().start().column(), 3);
    }

    #[test]
    fn token_locations() {
        let tokens = tokenize("if (x)\n  y").unwrap();

        let y = &tokens[4];
        assert_eq!(y.location().start().line(), 2);
        assert_eq!(y.location().start().column(), 3);
        assert_eq!(y.location().start().offset(), 9);

        let eof = tokens.last().unwrap();
        assert_eq!(*eof.as_ref(), Token::Eof);
        assert_eq!(eof.location().start().column(), 4);
    }

    #[test]
    fn recovery_reports_every_bad_line() {
        let errors = Lexer::new("$\nok\n\"open\n").try_exhaustive().unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[1].location().start().line(), 3);
    }

    #[test]
    fn control_characters_in_strings() {
        let nul = error("x = \"a\u{0}b\"");
        assert_eq!(*nul.as_ref(), LexerError::ControlChar('\0'));
        assert_eq!(nul.location().start().column(), 7);

        assert_eq!(*error("\"\u{1b}[0m\"").as_ref(), LexerError::ControlChar('\u{1b}'));
        assert_eq!(tokens("\"a\tb\""), vec![Token::Text("a\tb".into()), Token::Eof]);
    }

    #[test]
    fn empty_input_is_just_eof() {
        assert_eq!(tokens(""), vec![Token::Eof]);
        assert_eq!(tokens("  // solo un comentario"), vec![Token::Eof]);
    }
}
