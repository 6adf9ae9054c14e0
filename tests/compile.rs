use falcon::{
    codegen::{
        generate,
        markup::{EmitOptions, SEPARATOR},
    },
    compile, compile_with,
    error::Stage,
    ir::{Block, Forest},
    lex::{tokenize, LexerError, Token},
    parse::{parse, ParserError},
    semantic::ScopeError,
    ComponentTable,
};

fn forest(source: &str) -> Forest {
    let tokens = tokenize(source).expect("lexer failed");
    let program = parse(&tokens, &ComponentTable::new()).expect("parser failed");

    generate(&program).expect("generator failed")
}

fn compact(source: &str) -> String {
    compile_with(source, &ComponentTable::new(), EmitOptions::empty()).expect("compilation failed")
}

/// Verifica que cada etiqueta abierta se cierre en el mismo fragmento.
fn balanced(fragment: &str) -> bool {
    let mut stack = Vec::new();
    let mut rest = fragment;

    while let Some(start) = rest.find('<') {
        let end = match rest[start..].find('>') {
            Some(end) => start + end,
            None => return false,
        };

        let tag = &rest[start + 1..end];
        rest = &rest[end + 1..];

        if let Some(name) = tag.strip_prefix('/') {
            if stack.pop() != Some(name.to_owned()) {
                return false;
            }
        } else {
            let name = tag.split_whitespace().next().unwrap_or("");
            stack.push(name.to_owned());
        }
    }

    stack.is_empty()
}

#[test]
fn global_text_declaration() {
    let forest = forest("global name = \"Kumaraswamy B G\"");
    assert_eq!(forest.len(), 1);

    let global = &forest.roots()[0];
    assert_eq!(global.kind(), "global_declaration");
    assert_eq!(global.get_field("NAME"), Some("name"));

    let text = global.input("VALUE").unwrap();
    assert_eq!(text.kind(), "text");
    assert_eq!(text.get_field("TEXT"), Some("Kumaraswamy B G"));

    let markup = compact("global name = \"Kumaraswamy B G\"");
    assert!(markup.contains("<field name=\"TEXT\">Kumaraswamy B G</field>"));
}

#[test]
fn locals_and_comparison() {
    let forest = forest("local x = 8\nlocal y = 12\nif (x > y) { println(\"X is greater\") }");
    let roots = forest.roots();

    assert_eq!(roots.len(), 3);
    assert_eq!(roots[0].kind(), "local_declaration_statement");
    assert_eq!(roots[0].get_field("VAR0"), Some("x"));
    assert_eq!(roots[1].get_field("VAR0"), Some("y"));

    let condition = roots[2].input("IF0").unwrap();
    assert_eq!(condition.kind(), "math_compare");
    assert_eq!(condition.get_field("OP"), Some("GT"));

    for socket in ["A", "B"] {
        let operand = condition.input(socket).unwrap();
        assert_eq!(operand.kind(), "lexical_variable_get");
        assert!(!operand.get_field("VAR").unwrap().starts_with("global "));
    }

    let body = roots[2].input("DO0").unwrap();
    assert_eq!(body.kind(), "controls_eval_but_ignore");
    assert!(body.next().is_none());
}

#[test]
fn list_map_lambda() {
    let forest = forest("global numbers = [1, 2, 3]\nnumbers.map { n -> n * 2 }");

    let map = &forest.roots()[1];
    assert_eq!(map.kind(), "lists_map");
    assert_eq!(map.get_field("VAR"), Some("n"));
    assert_eq!(map.input("LIST").and_then(|list| list.get_field("VAR")), Some("global numbers"));

    let body = map.input("TO").unwrap();
    assert_eq!(body.kind(), "math_multiply");
    assert_eq!(body.input("NUM0").and_then(|n| n.get_field("VAR")), Some("n"));
    assert_eq!(body.input("NUM1").and_then(|n| n.get_field("NUM")), Some("2"));
}

#[test]
fn missing_brace_at_end_of_input() {
    let diagnostic = compile("if (x > y) {", &ComponentTable::new()).unwrap_err();

    assert_eq!(diagnostic.stage(), Stage::Syntax);
    assert_eq!(diagnostic.column(), 13);
    assert_eq!(
        diagnostic.downcast_ref::<ParserError>(),
        Some(&ParserError::UnexpectedToken {
            expected: Token::CloseCurly,
            found: Token::Eof,
        })
    );
}

#[test]
fn two_globals_two_fragments() {
    let markup = compile("global a = 1\nglobal b = \"two\"", &ComponentTable::new()).unwrap();
    assert_eq!(markup.matches(SEPARATOR).count(), 1);

    let fragments: Vec<_> = markup.split(SEPARATOR).collect();
    assert_eq!(fragments.len(), 2);

    for fragment in fragments {
        assert!(fragment.starts_with("<xml xmlns="));
        assert!(balanced(fragment), "unbalanced fragment: {}", fragment);
    }
}

#[test]
fn precedence_round_trip() {
    let sum = forest("2 + 3 * 4");
    let add = &sum.roots()[0];
    assert_eq!(add.kind(), "math_add");
    assert_eq!(add.input("NUM0").and_then(|n| n.get_field("NUM")), Some("2"));
    assert_eq!(add.input("NUM1").map(Block::kind), Some("math_multiply"));

    let powers = forest("2 ^ 3 ^ 2");
    let power = &powers.roots()[0];
    assert_eq!(power.kind(), "math_power");
    assert_eq!(power.input("B").map(Block::kind), Some("math_power"));

    let product = forest("(2 + 3) * 4");
    let grouped = &product.roots()[0];
    assert_eq!(grouped.kind(), "math_multiply");
    assert_eq!(grouped.input("NUM0").map(Block::kind), Some("math_add"));
}

#[test]
fn scope_fidelity() {
    let source = "\
global total = 0
func add(n) {
  total = total + n
  local total = n
  println(total)
}
for (i: 1..3) { add(i) }
println(total)";

    let forest = forest(source);
    let variables: Vec<_> = forest
        .blocks()
        .filter(|block| block.kind().starts_with("lexical_variable"))
        .filter_map(|block| block.get_field("VAR"))
        .collect();

    assert_eq!(
        variables,
        ["global total", "global total", "n", "n", "total", "i", "global total"]
    );
}

#[test]
fn references_outside_their_scope() {
    let diagnostic = compile("func f() { local a = 1 }\nprintln(a)", &ComponentTable::new()).unwrap_err();

    assert_eq!(diagnostic.stage(), Stage::Scope);
    assert!(matches!(diagnostic.downcast_ref::<ScopeError>(), Some(ScopeError::Undefined(_))));
}

#[test]
fn one_fragment_per_statement() {
    let source = "\
@Button { Go }
global a = 1
func f() { println(a) }
when Go.Click { f() }
if (a > 0) { println(a) } else { println(0) }
while (false) { }
a = a + 1";

    let mut components = ComponentTable::new();
    components.define("Button", "Go");

    let markup = compile_with(source, &components, EmitOptions::empty()).unwrap();
    let fragments: Vec<_> = markup.split(SEPARATOR).collect();

    assert_eq!(fragments.len(), 6);
    assert!(fragments.iter().all(|fragment| !fragment.is_empty() && balanced(fragment)));
}

#[test]
fn deterministic_output() {
    let source = "global xs = [3, 1, 2]\nglobal ys = xs.sort { a, b -> a < b }\nprintln(ys)";
    let components = ComponentTable::new();

    assert_eq!(compile(source, &components).unwrap(), compile(source, &components).unwrap());
}

#[test]
fn diagnostics_by_stage() {
    let components = ComponentTable::new();

    let lex = compile("global s = \"open", &components).unwrap_err();
    assert_eq!(lex.stage(), Stage::Lex);
    assert!(lex.to_string().starts_with("Syntax Error: "));

    let scope = compile("println(ghost)", &components).unwrap_err();
    assert_eq!(scope.to_string(), "Scope Error: Cannot find symbol 'ghost' at line 1, column 9");

    let generation = compile("launch(1)", &components).unwrap_err();
    assert_eq!(generation.stage(), Stage::Generation);
    assert!(generation.to_string().starts_with("Compile Error: Unknown function 'launch'"));
}

#[test]
fn empty_program_is_empty_output() {
    assert_eq!(compile("", &ComponentTable::new()).unwrap(), "");
    assert_eq!(compile("// nada\n", &ComponentTable::new()).unwrap(), "");
}

fn scope_diagnostic(source: &str, components: &ComponentTable) -> String {
    let diagnostic = compile(source, components).unwrap_err();
    assert_eq!(diagnostic.stage(), Stage::Scope);

    diagnostic.to_string()
}

#[test]
fn duplicate_declarations() {
    let components = ComponentTable::new();

    assert_eq!(
        scope_diagnostic("global a = 1\nglobal a = 2", &components),
        "Scope Error: Global variable 'a' is already defined at line 2, column 8"
    );

    assert_eq!(
        scope_diagnostic("func f() { }\nfunc f() { }", &components),
        "Scope Error: Function 'f' is already defined at line 2, column 6"
    );

    assert_eq!(
        scope_diagnostic("global xs = [1]\nglobal r = xs.sort { a, a -> a }", &components),
        "Scope Error: Duplicate parameter 'a' at line 2, column 25"
    );
}

#[test]
fn earliest_scope_error_in_source_wins() {
    assert_eq!(
        scope_diagnostic("global a = 1\nglobal a = b", &ComponentTable::new()),
        "Scope Error: Global variable 'a' is already defined at line 2, column 8"
    );
}

#[test]
fn misplaced_declarations() {
    let components = ComponentTable::new();

    assert_eq!(
        scope_diagnostic("when Ghost.Click { }", &components),
        "Scope Error: Cannot find component 'Ghost' at line 1, column 6"
    );

    assert_eq!(
        scope_diagnostic("func outer() {\n  func inner() { }\n}", &components),
        "Scope Error: Functions can only be defined at the root at line 2, column 8"
    );

    assert_eq!(
        scope_diagnostic("@Button { Go }\nif (true) {\n  when Go.Click { }\n}", &components),
        "Scope Error: Event handlers can only be defined at the root at line 3, column 8"
    );
}

#[test]
fn deep_nesting_is_a_syntax_error() {
    let components = ComponentTable::new();

    for source in [
        format!("println({}1{})", "(".repeat(1000), ")".repeat(1000)),
        format!("println({}1)", "-(".repeat(800)),
        format!("println(1{})", " - 1".repeat(1000)),
        format!("global xs = [1]\nprintln(xs{})", "[1]".repeat(1000)),
    ] {
        let diagnostic = compile(&source, &components).unwrap_err();
        assert_eq!(diagnostic.stage(), Stage::Syntax);
        assert_eq!(diagnostic.downcast_ref::<ParserError>(), Some(&ParserError::NestingTooDeep));
    }

    let nested = format!("println({}1{})", "(".repeat(20), ")".repeat(20));
    assert!(compile(&nested, &components).is_ok());
}

#[test]
fn control_characters_are_rejected() {
    let diagnostic = compile("global s = \"a\u{0}b\"", &ComponentTable::new()).unwrap_err();

    assert_eq!(diagnostic.stage(), Stage::Lex);
    assert_eq!(diagnostic.downcast_ref::<LexerError>(), Some(&LexerError::ControlChar('\0')));
    assert_eq!((diagnostic.line(), diagnostic.column()), (1, 14));
}

#[test]
fn logic_chains_are_one_block() {
    let markup = compact("global a = true\nglobal r = a && a && a");
    assert_eq!(markup.matches("type=\"logic_operation\"").count(), 1);
    assert!(markup.contains("items=\"3\""));
    assert!(markup.contains("<value name=\"BOOL2\">"));
}

#[test]
fn generic_and_helper_markup() {
    let mut components = ComponentTable::new();
    components.define("Button", "Go");

    let source = "\
when any Button.Click { set(\"Button\", Go, \"Text\", Mode@Fast) }
global size = compute(n = 2) -> n * n
global gap = [1, undefined]";

    let markup = compile_with(source, &components, EmitOptions::empty()).unwrap();
    let fragments: Vec<_> = markup.split(SEPARATOR).collect();

    assert_eq!(fragments.len(), 3);
    assert!(fragments.iter().all(|fragment| balanced(fragment)));
    assert!(fragments[0].contains("is_generic=\"true\""));
    assert!(fragments[0].contains("type=\"helpers_dropdown\""));
    assert!(fragments[1].contains("type=\"local_declaration_expression\""));
    assert!(!fragments[2].contains("name=\"ADD1\""));
}
