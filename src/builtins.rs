//! Catálogo de operaciones predefinidas.
//!
//! Cada función o método predefinido se describe con una entrada
//! estática que indica el tipo de bloque que le corresponde, el valor
//! del campo `OP` cuando el bloque agrupa varias operaciones, los
//! nombres de sus sockets de entrada y la forma de su resultado. Los
//! operadores, las preguntas `x ? nombre` y los colores con nombre
//! siguen el mismo esquema.

use crate::{ast::BinOp, semantic::Shape};

/// Forma en que los argumentos se conectan al bloque.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Lowering {
    /// Un socket por argumento, en este orden.
    Sockets(&'static [&'static str]),

    /// Uno o más argumentos en sockets `<prefijo>0`, `<prefijo>1`, ...,
    /// con la cantidad real registrada en la mutación `items`.
    Variadic(&'static str),

    /// Dos o más argumentos en los sockets `A`, `B`, `<prefijo>2`, ...,
    /// con la cantidad real registrada en la mutación `items`.
    Extended(&'static str),

    /// Un único argumento literal que se escribe como campo.
    Field(&'static str),
}

impl Lowering {
    /// Determina si una cantidad de argumentos es aceptable.
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Lowering::Sockets(sockets) => sockets.len() == count,
            Lowering::Variadic(_) => count > 0,
            Lowering::Extended(_) => count > 1,
            Lowering::Field(_) => count == 1,
        }
    }

    /// Descripción de la cantidad esperada, para diagnósticos.
    pub fn expected(self) -> String {
        match self {
            Lowering::Sockets(sockets) => sockets.len().to_string(),
            Lowering::Variadic(_) => String::from("at least 1"),
            Lowering::Extended(_) => String::from("at least 2"),
            Lowering::Field(_) => String::from("1"),
        }
    }
}

/// Una función predefinida, invocada como `nombre(args)`.
#[derive(Debug)]
pub struct Builtin {
    pub name: &'static str,
    pub block: &'static str,
    pub op: Option<&'static str>,
    pub lowering: Lowering,
    pub output: Shape,
}

/// Familias de valores sobre las que existen métodos.
///
/// Las matrices son listas de listas, por lo cual sus métodos también
/// aplican a cualquier receptor de la familia de listas.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Family {
    Text,
    List,
    Matrix,
    Dictionary,
}

impl Family {
    fn includes(self, other: Family) -> bool {
        self == other || (self == Family::List && other == Family::Matrix)
    }

    pub fn of(shape: Shape) -> Option<Family> {
        match shape {
            Shape::Text => Some(Family::Text),
            Shape::List => Some(Family::List),
            Shape::Dictionary => Some(Family::Dictionary),
            _ => None,
        }
    }
}

/// Un método predefinido, invocado como `receptor.nombre(args)`.
#[derive(Debug)]
pub struct Method {
    pub family: Family,
    pub name: &'static str,
    pub block: &'static str,
    pub op: Option<&'static str>,
    pub receiver: &'static str,
    pub lowering: Lowering,
    pub output: Shape,
}

pub fn function(name: &str) -> Option<&'static Builtin> {
    FUNCTIONS.iter().find(|builtin| builtin.name == name)
}

/// Método de una familia en específico.
pub fn method(family: Family, name: &str) -> Option<&'static Method> {
    METHODS
        .iter()
        .find(|method| family.includes(method.family) && method.name == name)
}

/// Todas las familias que definen un método con este nombre.
pub fn methods_named(name: &str) -> impl Iterator<Item = &'static Method> + '_ {
    METHODS.iter().filter(move |method| method.name == name)
}

/// Acceso genérico a componentes por tipo, como `get("Button", b, "Text")`.
///
/// El primer argumento es el tipo, el segundo la instancia y el tercero
/// el nombre del miembro; los dos textuales deben ser literales.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Generic {
    Set,
    Get,
    Call,
    ValueCall,
}

impl Generic {
    /// Cantidad de argumentos, sin contar los que recibe un método.
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Generic::Set => count == 4,
            Generic::Get => count == 3,
            Generic::Call | Generic::ValueCall => count >= 3,
        }
    }

    pub fn expected(self) -> String {
        match self {
            Generic::Set => String::from("4"),
            Generic::Get => String::from("3"),
            Generic::Call | Generic::ValueCall => String::from("at least 3"),
        }
    }

    pub fn output(self) -> Shape {
        match self {
            Generic::Set | Generic::Call => Shape::Void,
            Generic::Get | Generic::ValueCall => Shape::Any,
        }
    }
}

pub fn generic(name: &str) -> Option<Generic> {
    let generic = match name {
        "set" => Generic::Set,
        "get" => Generic::Get,
        "call" => Generic::Call,
        "vcall" => Generic::ValueCall,
        _ => return None,
    };

    Some(generic)
}

/// Bloque que corresponde a un operador binario.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Operator {
    pub block: &'static str,
    pub op: Option<&'static str>,
    pub lowering: Lowering,
}

impl Operator {
    /// Determina si cadenas del mismo operador se funden en un solo bloque.
    pub fn is_variadic(&self) -> bool {
        matches!(self.lowering, Lowering::Variadic(_) | Lowering::Extended(_))
    }
}

pub fn operator(op: BinOp) -> Operator {
    const AB: Lowering = Sockets(&["A", "B"]);
    const TEXTS: Lowering = Sockets(&["TEXT1", "TEXT2"]);

    let (block, op, lowering) = match op {
        BinOp::Add => ("math_add", None, Variadic("NUM")),
        BinOp::Mul => ("math_multiply", None, Variadic("NUM")),
        BinOp::Sub => ("math_subtract", None, AB),
        BinOp::Div => ("math_division", None, AB),
        BinOp::Pow => ("math_power", None, AB),
        BinOp::Rem => ("math_divide", Some("REMAINDER"), Sockets(&["DIVIDEND", "DIVISOR"])),

        BinOp::Equal => ("logic_compare", Some("EQ"), AB),
        BinOp::NotEqual => ("logic_compare", Some("NEQ"), AB),

        BinOp::TextEqual => ("text_compare", Some("EQUAL"), TEXTS),
        BinOp::TextNotEqual => ("text_compare", Some("NEQ"), TEXTS),
        BinOp::TextLess => ("text_compare", Some("LT"), TEXTS),
        BinOp::TextGreater => ("text_compare", Some("GT"), TEXTS),

        BinOp::Less => ("math_compare", Some("LT"), AB),
        BinOp::LessEqual => ("math_compare", Some("LTE"), AB),
        BinOp::Greater => ("math_compare", Some("GT"), AB),
        BinOp::GreaterEqual => ("math_compare", Some("GTE"), AB),

        BinOp::And => ("logic_operation", Some("AND"), Extended("BOOL")),
        BinOp::Or => ("logic_operation", Some("OR"), Extended("BOOL")),

        BinOp::BitOr => ("math_bitwise", Some("BITIOR"), Variadic("NUM")),
        BinOp::BitAnd => ("math_bitwise", Some("BITAND"), Variadic("NUM")),
        BinOp::BitXor => ("math_bitwise", Some("BITXOR"), Variadic("NUM")),

        BinOp::Join => ("text_join", None, Variadic("ADD")),
    };

    Operator {
        block,
        op,
        lowering,
    }
}

/// Verificación de tipo `valor ? nombre`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Question {
    /// Un bloque de verificación con un único socket.
    Check {
        block: &'static str,
        op: Option<&'static str>,
        socket: &'static str,
    },

    /// Residuo de dividir entre dos, comparado con este valor.
    Parity(u8),
}

pub fn question(name: &str) -> Option<Question> {
    let check = |block, op, socket| Question::Check { block, op, socket };

    let question = match name {
        "number" => check("math_is_a_number", Some("NUMBER"), "NUM"),
        "base10" => check("math_is_a_number", Some("BASE10"), "NUM"),
        "hexa" => check("math_is_a_number", Some("HEXADECIMAL"), "NUM"),
        "bin" => check("math_is_a_number", Some("BINARY"), "NUM"),
        "text" => check("text_is_string", None, "ITEM"),
        "list" => check("lists_is_list", None, "ITEM"),
        "dict" => check("dictionaries_is_dict", None, "THING"),
        "emptyText" => check("text_isEmpty", None, "VALUE"),
        "emptyList" => check("lists_is_empty", None, "LIST"),
        "matrix" => check("matrices_is_matrix", None, "VALUE"),
        "even" => Question::Parity(0),
        "odd" => Question::Parity(1),
        _ => return None,
    };

    Some(question)
}

/// Bloque de color con nombre para un código `#RRGGBB`, si existe.
pub fn named_color(code: &str) -> Option<&'static str> {
    COLORS
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(code))
        .map(|&(_, block)| block)
}

static COLORS: &[(&str, &str)] = &[
    ("#000000", "color_black"),
    ("#FFFFFF", "color_white"),
    ("#FF0000", "color_red"),
    ("#FFAFAF", "color_pink"),
    ("#FFC800", "color_orange"),
    ("#FFFF00", "color_yellow"),
    ("#00FF00", "color_green"),
    ("#00FFFF", "color_cyan"),
    ("#0000FF", "color_blue"),
    ("#FF00FF", "color_magenta"),
    ("#CCCCCC", "color_light_gray"),
    ("#444444", "color_dark_gray"),
];

const fn builtin(
    name: &'static str,
    block: &'static str,
    op: Option<&'static str>,
    lowering: Lowering,
    output: Shape,
) -> Builtin {
    Builtin {
        name,
        block,
        op,
        lowering,
        output,
    }
}

const fn method_of(
    family: Family,
    name: &'static str,
    block: &'static str,
    op: Option<&'static str>,
    receiver: &'static str,
    sockets: &'static [&'static str],
    output: Shape,
) -> Method {
    Method {
        family,
        name,
        block,
        op,
        receiver,
        lowering: Lowering::Sockets(sockets),
        output,
    }
}

use Lowering::{Extended, Field, Sockets, Variadic};
use Shape::{Any, Boolean, Color, Dictionary, List, Number, Text, Void};

const NUM: Lowering = Sockets(&["NUM"]);

static FUNCTIONS: &[Builtin] = &[
    builtin("sqrt",  "math_single", Some("ROOT"),    NUM, Number),
    builtin("abs",   "math_single", Some("ABS"),     NUM, Number),
    builtin("neg",   "math_single", Some("NEG"),     NUM, Number),
    builtin("log",   "math_single", Some("LN"),      NUM, Number),
    builtin("exp",   "math_single", Some("EXP"),     NUM, Number),
    builtin("round", "math_single", Some("ROUND"),   NUM, Number),
    builtin("ceil",  "math_single", Some("CEILING"), NUM, Number),
    builtin("floor", "math_single", Some("FLOOR"),   NUM, Number),

    builtin("sin",  "math_trig", Some("SIN"),  NUM, Number),
    builtin("cos",  "math_trig", Some("COS"),  NUM, Number),
    builtin("tan",  "math_trig", Some("TAN"),  NUM, Number),
    builtin("asin", "math_trig", Some("ASIN"), NUM, Number),
    builtin("acos", "math_trig", Some("ACOS"), NUM, Number),
    builtin("atan", "math_trig", Some("ATAN"), NUM, Number),

    builtin("degrees", "math_convert_angles", Some("RADIANS_TO_DEGREES"), NUM, Number),
    builtin("radians", "math_convert_angles", Some("DEGREES_TO_RADIANS"), NUM, Number),

    builtin("decToHex", "math_convert_number", Some("DEC_TO_HEX"), NUM, Text),
    builtin("decToBin", "math_convert_number", Some("DEC_TO_BIN"), NUM, Text),
    builtin("hexToDec", "math_convert_number", Some("HEX_TO_DEC"), NUM, Number),
    builtin("binToDec", "math_convert_number", Some("BIN_TO_DEC"), NUM, Number),

    builtin("dec",   "math_number_radix", Some("DEC"), Field("NUM"), Number),
    builtin("bin",   "math_number_radix", Some("BIN"), Field("NUM"), Number),
    builtin("octal", "math_number_radix", Some("OCT"), Field("NUM"), Number),
    builtin("hexa",  "math_number_radix", Some("HEX"), Field("NUM"), Number),

    builtin("randInt",     "math_random_int",      None, Sockets(&["FROM", "TO"]), Number),
    builtin("randFloat",   "math_random_float",    None, Sockets(&[]), Number),
    builtin("setRandSeed", "math_random_set_seed", None, NUM, Void),

    builtin("min", "math_on_list", Some("MIN"), Variadic("NUM"), Number),
    builtin("max", "math_on_list", Some("MAX"), Variadic("NUM"), Number),

    builtin("avgOf",     "math_on_list2", Some("AVG"), Sockets(&["LIST"]), Number),
    builtin("minOf",     "math_on_list2", Some("MIN"), Sockets(&["LIST"]), Number),
    builtin("maxOf",     "math_on_list2", Some("MAX"), Sockets(&["LIST"]), Number),
    builtin("geoMeanOf", "math_on_list2", Some("GM"),  Sockets(&["LIST"]), Number),
    builtin("stdDevOf",  "math_on_list2", Some("SD"),  Sockets(&["LIST"]), Number),
    builtin("stdErrOf",  "math_on_list2", Some("SE"),  Sockets(&["LIST"]), Number),
    builtin("modeOf",    "math_mode_of_list", None,    Sockets(&["LIST"]), List),

    builtin("mod",  "math_divide", Some("MODULO"),    Sockets(&["DIVIDEND", "DIVISOR"]), Number),
    builtin("rem",  "math_divide", Some("REMAINDER"), Sockets(&["DIVIDEND", "DIVISOR"]), Number),
    builtin("quot", "math_divide", Some("QUOTIENT"),  Sockets(&["DIVIDEND", "DIVISOR"]), Number),

    builtin("aTan2",         "math_atan2",             None, Sockets(&["Y", "X"]), Number),
    builtin("formatDecimal", "math_format_as_decimal", None, Sockets(&["NUM", "PLACES"]), Text),

    builtin("println", "controls_eval_but_ignore", None, Sockets(&["VALUE"]), Void),

    builtin("openScreen",               "controls_openAnotherScreen",               None, Sockets(&["SCREEN"]), Void),
    builtin("openScreenWithValue",      "controls_openAnotherScreenWithStartValue", None, Sockets(&["SCREENNAME", "STARTVALUE"]), Void),
    builtin("closeScreenWithValue",     "controls_closeScreenWithValue",            None, Sockets(&["SCREEN"]), Void),
    builtin("getStartValue",            "controls_getStartValue",                   None, Sockets(&[]), Any),
    builtin("closeScreen",              "controls_closeScreen",                     None, Sockets(&[]), Void),
    builtin("closeApp",                 "controls_closeApplication",                None, Sockets(&[]), Void),
    builtin("getPlainStartText",        "controls_getPlainStartText",               None, Sockets(&[]), Text),
    builtin("closeScreenWithPlainText", "controls_closeScreenWithPlainText",        None, Sockets(&["TEXT"]), Void),

    builtin("copyList",   "lists_copy",         None, Sockets(&["LIST"]), List),
    builtin("copyDict",   "dictionaries_copy",  None, Sockets(&["DICT"]), Dictionary),
    builtin("makeColor",  "color_make_color",   None, Sockets(&["COLORLIST"]), Color),
    builtin("splitColor", "color_split_color",  None, Sockets(&["COLOR"]), List),
];

static METHODS: &[Method] = &[
    method_of(Family::Text, "textLen",        "text_length",          None,                 "VALUE", &[], Number),
    method_of(Family::Text, "trim",           "text_trim",            None,                 "TEXT",  &[], Text),
    method_of(Family::Text, "uppercase",      "text_changeCase",      Some("UPCASE"),       "TEXT",  &[], Text),
    method_of(Family::Text, "lowercase",      "text_changeCase",      Some("DOWNCASE"),     "TEXT",  &[], Text),
    method_of(Family::Text, "startsWith",     "text_starts_at",       None,                 "TEXT",  &["PIECE"], Number),
    method_of(Family::Text, "contains",       "text_contains",        Some("CONTAINS"),     "TEXT",  &["PIECE"], Boolean),
    method_of(Family::Text, "containsAny",    "text_contains",        Some("CONTAINS_ANY"), "TEXT",  &["PIECE"], Boolean),
    method_of(Family::Text, "containsAll",    "text_contains",        Some("CONTAINS_ALL"), "TEXT",  &["PIECE"], Boolean),
    method_of(Family::Text, "split",             "text_split",        Some("SPLIT"),             "TEXT", &["AT"], List),
    method_of(Family::Text, "splitAtFirst",      "text_split",        Some("SPLITATFIRST"),      "TEXT", &["AT"], List),
    method_of(Family::Text, "splitAtAny",        "text_split",        Some("SPLITATANY"),        "TEXT", &["AT"], List),
    method_of(Family::Text, "splitAtFirstOfAny", "text_split",        Some("SPLITATFIRSTOFANY"), "TEXT", &["AT"], List),
    method_of(Family::Text, "splitAtSpaces",  "text_split_at_spaces", None,                 "TEXT",  &[], List),
    method_of(Family::Text, "reverse",        "text_reverse",         None,                 "VALUE", &[], Text),
    method_of(Family::Text, "csvRowToList",   "lists_from_csv_row",   None,                 "TEXT",  &[], List),
    method_of(Family::Text, "csvTableToList", "lists_from_csv_table", None,                 "TEXT",  &[], List),
    method_of(Family::Text, "segment",        "text_segment",         None,                 "TEXT",  &["START", "LENGTH"], Text),
    method_of(Family::Text, "replace",        "text_replace_all",     None,                 "TEXT",  &["SEGMENT", "REPLACEMENT"], Text),
    method_of(Family::Text, "replaceFrom",             "text_replace_mappings", Some("DICTIONARY_ORDER"),     "TEXT", &["MAPPINGS"], Text),
    method_of(Family::Text, "replaceFromLongestFirst", "text_replace_mappings", Some("LONGEST_STRING_FIRST"), "TEXT", &["MAPPINGS"], Text),

    method_of(Family::List, "listLen",       "lists_length",              None, "LIST",  &[], Number),
    method_of(Family::List, "containsItem",  "lists_is_in",               None, "LIST",  &["ITEM"], Boolean),
    method_of(Family::List, "indexOf",       "lists_position_in",         None, "LIST",  &["ITEM"], Number),
    method_of(Family::List, "insert",        "lists_insert_item",         None, "LIST",  &["INDEX", "ITEM"], Void),
    method_of(Family::List, "remove",        "lists_remove_item",         None, "LIST",  &["INDEX"], Void),
    method_of(Family::List, "appendList",    "lists_append_list",         None, "LIST0", &["LIST1"], Void),
    method_of(Family::List, "lookupInPairs", "lists_lookup_in_pairs",     None, "LIST",  &["KEY", "NOTFOUND"], Any),
    method_of(Family::List, "join",          "lists_join_with_separator", None, "LIST",  &["SEPARATOR"], Text),
    method_of(Family::List, "slice",         "lists_slice",               None, "LIST",  &["INDEX1", "INDEX2"], List),
    method_of(Family::List, "random",        "lists_pick_random_item",    None, "LIST",  &[], Any),
    method_of(Family::List, "reverse",       "lists_reverse",             None, "LIST",  &[], List),
    method_of(Family::List, "reverseList",   "lists_reverse",             None, "LIST",  &[], List),
    method_of(Family::List, "toCsvRow",      "lists_to_csv_row",          None, "LIST",  &[], Text),
    method_of(Family::List, "toCsvTable",    "lists_to_csv_table",        None, "LIST",  &[], Text),
    method_of(Family::List, "sort",          "lists_sort",                None, "LIST",  &[], List),
    method_of(Family::List, "allButFirst",   "lists_but_first",           None, "LIST",  &[], List),
    method_of(Family::List, "allButLast",    "lists_but_last",            None, "LIST",  &[], List),
    method_of(Family::List, "pairsToDict",   "dictionaries_alist_to_dict", None, "PAIRS", &[], Dictionary),
    Method {
        family: Family::List,
        name: "add",
        block: "lists_add_items",
        op: None,
        receiver: "LIST",
        lowering: Variadic("ITEM"),
        output: Void,
    },

    method_of(Family::Matrix, "row",         "matrices_get_row",    None,                 "MATRIX", &["ROW"], Any),
    method_of(Family::Matrix, "col",         "matrices_get_column", None,                 "MATRIX", &["COLUMN"], Any),
    method_of(Family::Matrix, "dimension",   "matrices_get_dims",   None,                 "MATRIX", &[], List),
    method_of(Family::Matrix, "inverse",     "matrices_operations", Some("INVERSE"),      "MATRIX", &[], List),
    method_of(Family::Matrix, "transpose",   "matrices_operations", Some("TRANSPOSE"),    "MATRIX", &[], List),
    method_of(Family::Matrix, "rotateLeft",  "matrices_operations", Some("ROTATE_LEFT"),  "MATRIX", &[], List),
    method_of(Family::Matrix, "rotateRight", "matrices_operations", Some("ROTATE_RIGHT"), "MATRIX", &[], List),

    method_of(Family::Dictionary, "dictLen",     "dictionaries_length",           None,           "DICT",  &[], Number),
    method_of(Family::Dictionary, "get",         "dictionaries_lookup",           None,           "DICT",  &["KEY", "NOTFOUND"], Any),
    method_of(Family::Dictionary, "set",         "dictionaries_set_pair",         None,           "DICT",  &["KEY", "VALUE"], Void),
    method_of(Family::Dictionary, "delete",      "dictionaries_delete_pair",      None,           "DICT",  &["KEY"], Void),
    method_of(Family::Dictionary, "remove",      "dictionaries_delete_pair",      None,           "DICT",  &["KEY"], Void),
    method_of(Family::Dictionary, "getAtPath",   "dictionaries_recursive_lookup", None,           "DICT",  &["KEYS", "NOTFOUND"], Any),
    method_of(Family::Dictionary, "setAtPath",   "dictionaries_recursive_set",    None,           "DICT",  &["KEYS", "VALUE"], Void),
    method_of(Family::Dictionary, "containsKey", "dictionaries_is_key_in",        None,           "DICT",  &["KEY"], Boolean),
    method_of(Family::Dictionary, "mergeInto",   "dictionaries_combine_dicts",    None,           "DICT2", &["DICT1"], Void),
    method_of(Family::Dictionary, "walkTree",    "dictionaries_walk_tree",        None,           "DICT",  &["PATH"], List),
    method_of(Family::Dictionary, "keys",        "dictionaries_getters",          Some("KEYS"),   "DICT",  &[], List),
    method_of(Family::Dictionary, "values",      "dictionaries_getters",          Some("VALUES"), "DICT",  &[], List),
    method_of(Family::Dictionary, "toPairs",     "dictionaries_dict_to_alist",    None,           "DICT",  &[], List),
];

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn names_are_unique_within_a_family() {
        for (i, a) in METHODS.iter().enumerate() {
            for b in &METHODS[i + 1..] {
                assert!(
                    a.family != b.family || a.name != b.name,
                    "duplicate method {}",
                    a.name
                );
            }
        }

        for (i, a) in FUNCTIONS.iter().enumerate() {
            assert!(FUNCTIONS[i + 1..].iter().all(|b| a.name != b.name));
        }
    }

    #[test]
    fn shared_names_span_families() {
        let families: Vec<_> = methods_named("reverse").map(|method| method.family).collect();
        assert_eq!(families, [Family::Text, Family::List]);
        assert_eq!(methods_named("keys").count(), 1);
    }

    #[test]
    fn associative_operators_are_variadic() {
        assert!(operator(BinOp::Add).is_variadic());
        assert!(operator(BinOp::Join).is_variadic());
        assert!(!operator(BinOp::Sub).is_variadic());
        assert_eq!(operator(BinOp::TextLess).op, Some("LT"));
    }

    #[test]
    fn colors_by_code() {
        assert_eq!(named_color("#ff0000"), Some("color_red"));
        assert_eq!(named_color("#123456"), None);
        assert_eq!(question("odd"), Some(Question::Parity(1)));
        assert!(question("prime").is_none());
    }

    #[test]
    fn logic_chains_extend_past_two() {
        let and = operator(BinOp::And);
        assert!(and.is_variadic());
        assert_eq!(and.lowering, Lowering::Extended("BOOL"));
        assert!(!and.lowering.accepts(1));
        assert!(and.lowering.accepts(3));
        assert_eq!(and.lowering.expected(), "at least 2");
    }

    #[test]
    fn matrices_are_lists() {
        let row = method(Family::List, "row").unwrap();
        assert_eq!(row.block, "matrices_get_row");
        assert_eq!(row.receiver, "MATRIX");

        assert_eq!(method(Family::Matrix, "transpose").and_then(|method| method.op), Some("TRANSPOSE"));
        assert!(method(Family::Matrix, "listLen").is_none());
        assert!(method(Family::Text, "row").is_none());
        assert_eq!(methods_named("dimension").count(), 1);
    }

    #[test]
    fn generic_component_access() {
        assert_eq!(generic("vcall"), Some(Generic::ValueCall));
        assert!(generic("every").is_none());
        assert!(Generic::Set.accepts(4));
        assert!(!Generic::Get.accepts(4));
        assert!(Generic::Call.accepts(5));
        assert_eq!(Generic::Call.output(), Shape::Void);
    }

    #[test]
    fn arities() {
        assert!(function("randInt").unwrap().lowering.accepts(2));
        assert!(!function("randInt").unwrap().lowering.accepts(1));
        assert!(function("max").unwrap().lowering.accepts(5));
        assert!(!function("max").unwrap().lowering.accepts(0));
        assert!(function("hexa").unwrap().lowering.accepts(1));
        assert!(method(Family::Dictionary, "get").is_some());
        assert!(method(Family::Text, "get").is_none());
    }
}
