//! Llamadas, métodos, lambdas de lista y componentes.
//!
//! Las funciones predefinidas tienen prioridad sobre las del usuario,
//! incluidos los accesos genéricos `set`, `get`, `call` y `vcall`.
//! Los métodos se resuelven según la forma estructural del receptor:
//! una forma conocida escoge la familia, y un receptor sin forma solo
//! se acepta si el nombre existe en una única familia.

use super::{apply, lowered, numbered, Gen, GenError, Generator, Lowered};
use crate::{
    ast::{Event, Expr, Lambda, LambdaKind},
    builtins::{self, Family, Generic, Lowering, Method},
    components::Component,
    ir::{Block, Mutation},
    lex::Identifier,
    semantic::{shape_of, Shape},
    source::{Located, Location},
};

impl<'a> Generator<'a> {
    pub(super) fn call(&mut self, callee: &Located<Identifier>, args: &[Located<Expr>]) -> Gen<Lowered> {
        let name = callee.val();

        if let Some(generic) = builtins::generic(name.as_ref()) {
            return self.generic(callee, generic, args);
        }

        if let Some(builtin) = builtins::function(name.as_ref()) {
            arity(callee, builtin.lowering, args.len())?;
            let block = self.block(builtin.block);

            let block = match builtin.lowering {
                Lowering::Field(field) => {
                    let literal = match args.first().map(Located::val) {
                        Some(Expr::Number(literal) | Expr::Text(literal)) => literal,
                        _ => return Err(Located::at(GenError::ExpectedLiteral(name.clone()), *callee.location())),
                    };

                    let block = match builtin.op {
                        Some(op) => block.field("OP", op),
                        None => block,
                    };

                    block.field(field, literal.as_str())
                }

                lowering => apply(block, builtin.op, lowering, self.values(args)?),
            };

            return Ok(lowered(builtin.output, block));
        }

        let program = self.program;
        let signature = program.function(name.as_ref()).ok_or_else(|| {
            Located::at(GenError::UnknownFunction(name.clone()), *callee.location())
        })?;

        if signature.parameters.len() != args.len() {
            let error = GenError::ArgumentCount {
                name: name.clone(),
                expected: signature.parameters.len().to_string(),
                found: args.len(),
            };

            return Err(Located::at(error, *callee.location()));
        }

        let kind = if signature.returns {
            "procedures_callreturn"
        } else {
            "procedures_callnoreturn"
        };

        let mutation = signature
            .parameters
            .iter()
            .fold(Mutation::new().attribute("name", name), |mutation, parameter| {
                mutation.named("arg", parameter)
            });

        let block = self
            .block(kind)
            .with_mutation(mutation)
            .field("PROCNAME", name.to_string());

        let block = numbered(block, "ARG", self.values(args)?);
        let output = if signature.returns { Shape::Any } else { Shape::Void };

        Ok(lowered(output, block))
    }

    /// Acceso a un miembro de cualquier instancia de un tipo. El tipo y
    /// el nombre del miembro deben ser textos literales.
    fn generic(&mut self, callee: &Located<Identifier>, generic: Generic, args: &[Located<Expr>]) -> Gen<Lowered> {
        if !generic.accepts(args.len()) {
            let error = GenError::ArgumentCount {
                name: callee.val().clone(),
                expected: generic.expected(),
                found: args.len(),
            };

            return Err(Located::at(error, *callee.location()));
        }

        let kind = text_literal(callee, &args[0])?;
        let member = text_literal(callee, &args[2])?;

        let block = match generic {
            Generic::Set | Generic::Get => {
                let set = generic == Generic::Set;
                let mutation = Mutation::new()
                    .attribute("component_type", kind)
                    .attribute("set_or_get", if set { "set" } else { "get" })
                    .attribute("property_name", member)
                    .attribute("is_generic", true);

                let block = self
                    .block("component_set_get")
                    .with_mutation(mutation)
                    .field("PROP", member)
                    .value("COMPONENT", self.value(&args[1])?);

                match args.get(3) {
                    Some(value) => block.value("VALUE", self.value(value)?),
                    None => block,
                }
            }

            Generic::Call | Generic::ValueCall => {
                let shape = if generic == Generic::Call { "statement" } else { "value" };
                let mutation = Mutation::new()
                    .attribute("component_type", kind)
                    .attribute("method_name", member)
                    .attribute("is_generic", true)
                    .attribute("shape", shape);

                let block = self
                    .block("component_method")
                    .with_mutation(mutation)
                    .value("COMPONENT", self.value(&args[1])?);

                numbered(block, "ARG", self.values(&args[3..])?)
            }
        };

        Ok(lowered(generic.output(), block))
    }

    pub(super) fn method(
        &mut self,
        receiver: &Located<Expr>,
        name: &Located<Identifier>,
        args: &[Located<Expr>],
    ) -> Gen<Lowered> {
        if let Expr::Component(component) = receiver.val() {
            let component = Located::at(component.clone(), *receiver.location());
            return self.component_method(&component, name, args);
        }

        let shape = shape_of(receiver.val(), &self.program.symbols);
        let method = resolve_method(shape, name)?;
        arity(name, method.lowering, args.len())?;

        let mut block = self.block(method.block);
        block = block.value(method.receiver, self.value(receiver)?);

        let block = apply(block, method.op, method.lowering, self.values(args)?);
        Ok(lowered(method.output, block))
    }

    pub(super) fn lambda(&mut self, lambda: &Lambda) -> Gen<Block> {
        let shape = shape_of(lambda.list.val(), &self.program.symbols);
        if !matches!(shape, Shape::Any | Shape::List) {
            return Err(Located::at(GenError::LambdaReceiver(shape), *lambda.list.location()));
        }

        let (kind, body) = match lambda.kind {
            LambdaKind::Map => ("lists_map", "TO"),
            LambdaKind::Filter => ("lists_filter", "TEST"),
            LambdaKind::SortByKey => ("lists_sort_key", "KEY"),
            LambdaKind::Sort => ("lists_sort_comparator", "COMPARE"),
            LambdaKind::Min => ("lists_minimum_value", "COMPARE"),
            LambdaKind::Max => ("lists_maximum_value", "COMPARE"),
            LambdaKind::Reduce => ("lists_reduce", "COMBINE"),
        };

        let mut block = self.block(kind);

        if let [parameter] = lambda.parameters.as_slice() {
            block = block.field("VAR", parameter.name.val().to_string());
        } else {
            for (index, parameter) in lambda.parameters.iter().enumerate() {
                block = block.field(format!("VAR{}", index + 1), parameter.name.val().to_string());
            }
        }

        block = block.value("LIST", self.value(&lambda.list)?);
        if let Some(seed) = &lambda.seed {
            block = block.value("INITANSWER", self.value(seed)?);
        }

        Ok(block.value(body, self.value_body(&lambda.body)?))
    }

    /// Una instancia de componente en posición de valor.
    pub(super) fn component_block(&mut self, name: &Identifier, location: Location) -> Gen<Block> {
        let component = self.component(&Located::at(name.clone(), location))?;

        let mutation = Mutation::new()
            .attribute("component_type", component.kind())
            .attribute("instance_name", name);

        Ok(self
            .block("component_component_block")
            .with_mutation(mutation)
            .field("COMPONENT_SELECTOR", name.to_string()))
    }

    /// Lectura o escritura de una propiedad. En una escritura el valor
    /// se conecta después en el socket `VALUE`.
    pub(super) fn property(
        &mut self,
        component: &Located<Identifier>,
        property: &Located<Identifier>,
        set: bool,
    ) -> Gen<Block> {
        let kind = self.member(component, property)?.kind();

        let mutation = Mutation::new()
            .attribute("component_type", kind)
            .attribute("set_or_get", if set { "set" } else { "get" })
            .attribute("property_name", property.val())
            .attribute("is_generic", false)
            .attribute("instance_name", component.val());

        Ok(self
            .block("component_set_get")
            .with_mutation(mutation)
            .field("COMPONENT_SELECTOR", component.val().to_string())
            .field("PROP", property.val().to_string()))
    }

    /// La forma de un método de componente depende de la posición en
    /// la que se usa, por lo cual se acepta en ambas.
    fn component_method(
        &mut self,
        component: &Located<Identifier>,
        method: &Located<Identifier>,
        args: &[Located<Expr>],
    ) -> Gen<Lowered> {
        let kind = self.member(component, method)?.kind();

        let mutation = Mutation::new()
            .attribute("component_type", kind)
            .attribute("method_name", method.val())
            .attribute("is_generic", false)
            .attribute("instance_name", component.val());

        let block = self
            .block("component_method")
            .with_mutation(mutation)
            .field("COMPONENT_SELECTOR", component.val().to_string());

        let block = numbered(block, "ARG", self.values(args)?);
        Ok(Lowered::Either(block))
    }

    pub(super) fn event(&mut self, event: &Event) -> Gen<Block> {
        if event.generic {
            return self.generic_event(event);
        }

        let kind = self.member(&event.component, &event.event)?.kind();

        let mutation = event.parameters.iter().fold(
            Mutation::new()
                .attribute("component_type", kind)
                .attribute("instance_name", event.component.val())
                .attribute("event_name", event.event.val())
                .attribute("is_generic", false),
            |mutation, parameter| mutation.named("arg", parameter.name.val()),
        );

        let block = self
            .block("component_event")
            .with_mutation(mutation)
            .field("COMPONENT_SELECTOR", event.component.val().to_string());

        Ok(block.statement("DO", self.body(&event.body)?))
    }

    /// Manejador de todas las instancias de un tipo. No lleva
    /// instancia ni selector de componente.
    fn generic_event(&mut self, event: &Event) -> Gen<Block> {
        let mutation = event.parameters.iter().fold(
            Mutation::new()
                .attribute("component_type", event.component.val())
                .attribute("event_name", event.event.val())
                .attribute("is_generic", true),
            |mutation, parameter| mutation.named("arg", parameter.name.val()),
        );

        let block = self.block("component_event").with_mutation(mutation);
        Ok(block.statement("DO", self.body(&event.body)?))
    }

    fn component(&self, name: &Located<Identifier>) -> Gen<&'a Component> {
        let program = self.program;
        program
            .components
            .get(name.val().as_ref())
            .ok_or_else(|| Located::at(GenError::UnknownComponent(name.val().clone()), *name.location()))
    }

    /// Componente que expone un miembro, si su tabla lo permite.
    fn member(&self, component: &Located<Identifier>, member: &Located<Identifier>) -> Gen<&'a Component> {
        let found = self.component(component)?;
        if found.allows(member.val().as_ref()) {
            return Ok(found);
        }

        let error = GenError::UnknownMember {
            component: component.val().clone(),
            member: member.val().clone(),
        };

        Err(Located::at(error, *member.location()))
    }
}

fn resolve_method(shape: Shape, name: &Located<Identifier>) -> Gen<&'static Method> {
    let method = name.val();
    let unknown = || {
        let error = GenError::UnknownMethod {
            method: method.clone(),
            shape,
        };

        Located::at(error, *name.location())
    };

    if let Some(family) = Family::of(shape) {
        return builtins::method(family, method.as_ref()).ok_or_else(unknown);
    }

    if shape != Shape::Any {
        return Err(unknown());
    }

    let mut candidates = builtins::methods_named(method.as_ref());
    match (candidates.next(), candidates.next()) {
        (Some(method), None) => Ok(method),
        (Some(_), Some(_)) => Err(Located::at(GenError::AmbiguousReceiver(method.clone()), *name.location())),
        (None, _) => Err(unknown()),
    }
}

fn text_literal<'e>(callee: &Located<Identifier>, arg: &'e Located<Expr>) -> Gen<&'e str> {
    match arg.val() {
        Expr::Text(text) => Ok(text.as_str()),
        _ => Err(Located::at(GenError::ExpectedLiteral(callee.val().clone()), *arg.location())),
    }
}

fn arity(name: &Located<Identifier>, lowering: Lowering, found: usize) -> Gen<()> {
    if lowering.accepts(found) {
        return Ok(());
    }

    let error = GenError::ArgumentCount {
        name: name.val().clone(),
        expected: lowering.expected(),
        found,
    };

    Err(Located::at(error, *name.location()))
}

#[cfg(test)]
mod test {
    use crate::{
        codegen::{generate, GenError},
        components::ComponentTable,
        ir::{Block, Forest},
        lex::{tokenize, Identifier},
        parse::parse,
        semantic::Shape,
    };

    fn components() -> ComponentTable {
        let mut table = ComponentTable::new();
        table.define("Button", "Button1").define("Label", "Title");
        table.member("Title", "Text");
        table
    }

    fn generated(source: &str) -> Result<Forest, GenError> {
        let tokens = tokenize(source).expect("lexer failed");
        let program = parse(&tokens, &components()).expect("parser failed");

        generate(&program).map_err(|error| error.into_inner())
    }

    fn last(source: &str) -> Block {
        let forest = generated(source).expect("generator failed");
        forest.roots().last().cloned().expect("empty forest")
    }

    fn value(source: &str) -> Block {
        last(source).input("VALUE").cloned().expect("no value")
    }

    #[test]
    fn builtin_functions() {
        let root = value("global r = sqrt(16)");
        assert_eq!(root.kind(), "math_single");
        assert_eq!(root.get_field("OP"), Some("ROOT"));
        assert!(root.input("NUM").is_some());

        let random = value("global r = randInt(1, 6)");
        assert_eq!(random.input("TO").and_then(|b| b.get_field("NUM")), Some("6"));

        let max = value("global r = max(1, 2, 3)");
        assert_eq!(max.mutation().and_then(|m| m.get("items")), Some("3"));
    }

    #[test]
    fn radix_literals_are_fields() {
        let hexa = value("global r = hexa(\"FF\")");
        assert_eq!(hexa.kind(), "math_number_radix");
        assert_eq!(hexa.get_field("OP"), Some("HEX"));
        assert_eq!(hexa.get_field("NUM"), Some("FF"));
        assert!(hexa.inputs().next().is_none());

        assert_eq!(
            generated("global a = 1\nglobal r = dec(a)"),
            Err(GenError::ExpectedLiteral(Identifier::new("dec")))
        );
    }

    #[test]
    fn result_functions_are_values() {
        let forest = generated("func twice(n) = n * 2\nglobal r = twice(4)").unwrap();
        let call = forest.roots()[1].input("VALUE").unwrap();

        assert_eq!(call.kind(), "procedures_callreturn");
        assert_eq!(call.mutation().map(|m| m.children().len()), Some(1));
        assert_eq!(
            generated("func twice(n) = n * 2\nglobal r = twice()"),
            Err(GenError::ArgumentCount {
                name: Identifier::new("twice"),
                expected: String::from("1"),
                found: 0,
            })
        );
    }

    #[test]
    fn methods_follow_the_receiver() {
        let length = value("global words = \"a b\"\nglobal r = words.textLen()");
        assert_eq!(length.kind(), "text_length");
        assert!(length.input("VALUE").is_some());

        let reversed = value("global r = [1, 2].reverse()");
        assert_eq!(reversed.kind(), "lists_reverse");

        let lookup = value("global d = {}\nglobal r = d.get(\"k\", 0)");
        assert_eq!(lookup.kind(), "dictionaries_lookup");
        assert!(lookup.input("NOTFOUND").is_some());
    }

    #[test]
    fn unclassified_receivers() {
        let unique = last("func f(xs) { xs.add(1, 2) }");
        let add = unique.input("STACK").unwrap();
        assert_eq!(add.kind(), "lists_add_items");
        assert_eq!(add.input("ITEM1").and_then(|b| b.get_field("NUM")), Some("2"));

        assert_eq!(
            generated("func f(x) = x.reverse()"),
            Err(GenError::AmbiguousReceiver(Identifier::new("reverse")))
        );

        assert_eq!(
            generated("global n = 1\nglobal r = n.textLen()"),
            Err(GenError::UnknownMethod {
                method: Identifier::new("textLen"),
                shape: Shape::Number,
            })
        );
    }

    #[test]
    fn lambdas() {
        let map = value("global numbers = [1, 2, 3]\nglobal r = numbers.map { n -> n * 2 }");
        assert_eq!(map.kind(), "lists_map");
        assert_eq!(map.get_field("VAR"), Some("n"));
        assert_eq!(map.input("TO").map(Block::kind), Some("math_multiply"));

        let reduce = value("global r = [1, 2].reduce(0) { acc, x -> acc + x }");
        assert_eq!(reduce.kind(), "lists_reduce");
        assert_eq!(reduce.get_field("VAR1"), Some("acc"));
        assert_eq!(reduce.get_field("VAR2"), Some("x"));
        assert!(reduce.input("INITANSWER").is_some());

        assert_eq!(
            generated("global r = \"abc\".map { c -> c }"),
            Err(GenError::LambdaReceiver(Shape::Text))
        );
    }

    #[test]
    fn components_and_members() {
        let set = last("Title.Text = \"Hello\"");
        assert_eq!(set.kind(), "component_set_get");
        assert_eq!(set.mutation().and_then(|m| m.get("set_or_get")), Some("set"));
        assert_eq!(set.mutation().and_then(|m| m.get("component_type")), Some("Label"));
        assert_eq!(set.get_field("PROP"), Some("Text"));
        assert!(set.input("VALUE").is_some());

        let instance = value("global b = Button1");
        assert_eq!(instance.kind(), "component_component_block");

        assert_eq!(
            generated("global c = Title.Color"),
            Err(GenError::UnknownMember {
                component: Identifier::new("Title"),
                member: Identifier::new("Color"),
            })
        );
    }

    #[test]
    fn component_methods_fit_both_positions() {
        let forest = generated("Button1.Focus()\nglobal r = Button1.Measure(1)").unwrap();

        assert_eq!(forest.roots()[0].kind(), "component_method");
        let measure = forest.roots()[1].input("VALUE").unwrap();
        assert_eq!(measure.mutation().and_then(|m| m.get("method_name")), Some("Measure"));
        assert!(measure.input("ARG0").is_some());
    }

    #[test]
    fn events() {
        let event = last("when Button1.Click(x) { println(x) }");
        assert_eq!(event.kind(), "component_event");
        assert_eq!(event.mutation().and_then(|m| m.get("event_name")), Some("Click"));

        let get = event.input("DO").and_then(|body| body.input("VALUE")).unwrap();
        assert_eq!(get.kind(), "lexical_variable_get");
        assert_eq!(get.mutation().map(|m| m.children()[0].tag), Some("eventparam"));
    }

    #[test]
    fn generic_component_access() {
        let set = last("set(\"Button\", Button1, \"Text\", \"Hi\")");
        assert_eq!(set.kind(), "component_set_get");
        assert_eq!(set.mutation().and_then(|m| m.get("is_generic")), Some("true"));
        assert_eq!(set.mutation().and_then(|m| m.get("component_type")), Some("Button"));
        assert_eq!(set.get_field("PROP"), Some("Text"));
        assert_eq!(set.get_field("COMPONENT_SELECTOR"), None);
        assert_eq!(set.input("COMPONENT").map(Block::kind), Some("component_component_block"));
        assert!(set.input("VALUE").is_some());

        let get = value("global t = get(\"Label\", Title, \"Text\")");
        assert_eq!(get.mutation().and_then(|m| m.get("set_or_get")), Some("get"));
        assert!(get.input("VALUE").is_none());

        let call = last("call(\"Button\", Button1, \"Focus\")");
        assert_eq!(call.kind(), "component_method");
        assert_eq!(call.mutation().and_then(|m| m.get("shape")), Some("statement"));
        assert!(call.input("ARG0").is_none());

        let measure = value("global r = vcall(\"Button\", Button1, \"Measure\", 1, 2)");
        assert_eq!(measure.mutation().and_then(|m| m.get("shape")), Some("value"));
        assert_eq!(measure.input("ARG1").and_then(|b| b.get_field("NUM")), Some("2"));
    }

    #[test]
    fn generic_access_needs_literal_names() {
        assert_eq!(
            generated("global t = get(Button1, Button1, \"Text\")"),
            Err(GenError::ExpectedLiteral(Identifier::new("get")))
        );

        assert_eq!(
            generated("set(\"Button\", Button1, \"Text\")"),
            Err(GenError::ArgumentCount {
                name: Identifier::new("set"),
                expected: String::from("4"),
                found: 3,
            })
        );

        assert_eq!(
            generated("global r = call(\"Button\", Button1, \"Focus\")"),
            Err(GenError::NotAValue)
        );
    }

    #[test]
    fn generic_events() {
        let event = last("when any Button.Click(other) { println(other) }");
        assert_eq!(event.kind(), "component_event");

        let mutation = event.mutation().unwrap();
        assert_eq!(mutation.get("is_generic"), Some("true"));
        assert_eq!(mutation.get("component_type"), Some("Button"));
        assert_eq!(mutation.get("instance_name"), None);
        assert_eq!(mutation.children().len(), 1);
        assert_eq!(event.get_field("COMPONENT_SELECTOR"), None);
        assert!(event.input("DO").is_some());

        let every = value("global all = every(Button)");
        assert_eq!(every.kind(), "component_all_component_block");
        assert_eq!(every.mutation().and_then(|m| m.get("component_type")), Some("Button"));
        assert_eq!(every.get_field("COMPONENT_SELECTOR"), Some("Button"));
    }

    #[test]
    fn matrix_methods() {
        let row = value("global m = [[1, 2], [3, 4]]\nglobal r = m.row(1)");
        assert_eq!(row.kind(), "matrices_get_row");
        assert!(row.input("MATRIX").is_some());
        assert!(row.input("ROW").is_some());

        let transposed = value("global m = [[1, 2], [3, 4]]\nglobal r = m.transpose()");
        assert_eq!(transposed.kind(), "matrices_operations");
        assert_eq!(transposed.get_field("OP"), Some("TRANSPOSE"));

        let dims = last("func f(m) = m.dimension()");
        assert_eq!(dims.input("RETURN").map(Block::kind), Some("matrices_get_dims"));
    }
}
