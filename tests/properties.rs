use falcon::{
    codegen::markup::SEPARATOR,
    compile,
    lex::{tokenize, Token},
    ComponentTable,
};

use proptest::prelude::*;

fn statement() -> impl Strategy<Value = String> {
    let name = "[a-z][a-z0-9]{0,6}".prop_filter("keywords are reserved", |name| {
        !matches!(
            name.as_str(),
            "true" | "false" | "if" | "else" | "for" | "step" | "in" | "while" | "break" | "global" | "local"
                | "func" | "when" | "this" | "any" | "compute"
        )
    });

    let value = prop_oneof![
        (0u32..10_000).prop_map(|n| n.to_string()),
        "[a-zA-Z ]{0,12}".prop_map(|text| format!("\"{}\"", text)),
        Just(String::from("[1, 2, 3]")),
        Just(String::from("1 + 2 * 3 - 4")),
    ];

    (name, value).prop_map(|(name, value)| format!("global {} = {}", name, value))
}

proptest! {
    #[test]
    fn lexer_never_panics(source in any::<String>()) {
        if let Ok(tokens) = tokenize(&source) {
            let eofs = tokens.iter().filter(|token| *token.val() == Token::Eof).count();
            prop_assert_eq!(eofs, 1);
            prop_assert_eq!(tokens.last().map(|token| token.val()), Some(&Token::Eof));
        }
    }

    #[test]
    fn compilation_is_deterministic(statements in prop::collection::vec(statement(), 1..6)) {
        let source = statements.join("\n");
        let components = ComponentTable::new();

        let first = compile(&source, &components);
        let second = compile(&source, &components);

        match (first, second) {
            (Ok(first), Ok(second)) => {
                prop_assert_eq!(&first, &second);
                prop_assert_eq!(first.split(SEPARATOR).count(), statements.len());
            }

            // Un nombre repetido falla igual en ambas compilaciones
            (Err(first), Err(second)) => {
                prop_assert_eq!(first.to_string(), second.to_string());
            }

            _ => {
                prop_assert!(false, "compilation results differ");
            }
        }
    }
}
