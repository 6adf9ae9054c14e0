//! Traducción de expresiones.

use super::{apply, variadic, Gen, GenError, Generator, Lowered};
use crate::{
    ast::{BinOp, Binding, Expr, UnOp},
    builtins::{self, Question},
    ir::{Block, Mutation},
    lex::Identifier,
    source::{Located, Location},
};

impl Generator<'_> {
    pub(super) fn lower(&mut self, expr: &Located<Expr>) -> Gen<Lowered> {
        let location = *expr.location();

        let block = match expr.val() {
            Expr::Text(text) => self.block("text").field("TEXT", text.as_str()),
            Expr::Number(number) => self.number(number),

            Expr::Boolean(value) => {
                let value = if *value { "TRUE" } else { "FALSE" };
                self.block("logic_boolean").field("BOOL", value)
            }

            Expr::Color(code) => self.color(code, location)?,
            Expr::Variable(reference) => self.variable("lexical_variable_get", reference)?,
            Expr::Component(name) => self.component_block(name, location)?,

            Expr::List(items) => {
                let block = self.block("lists_create_with");
                variadic(block, "ADD", self.values(items)?)
            }

            Expr::Dictionary(pairs) => {
                let block = self.block("dictionaries_create_with");
                variadic(block, "ADD", self.values(pairs)?)
            }

            Expr::Pair(key, value) => {
                let block = self.block("pair");
                let key = self.value(key)?;
                let value = self.value(value)?;

                block.value("KEY", key).value("VALUE", value)
            }

            Expr::Unary(UnOp::Not, operand) => {
                let block = self.block("logic_negate");
                block.value("BOOL", self.value(operand)?)
            }

            Expr::Unary(UnOp::Negate, operand) => {
                let block = self.block("math_single").field("OP", "NEG");
                block.value("NUM", self.value(operand)?)
            }

            Expr::Binary(lhs, op, rhs) => self.binary(lhs, *op, rhs)?,

            Expr::If {
                condition,
                then,
                otherwise,
            } => {
                let block = self.block("controls_choose");

                let test = self.value(condition)?;
                let then = self.value_body(then)?;
                let otherwise = self.value_body(otherwise)?;

                block
                    .value("TEST", test)
                    .value("THENRETURN", then)
                    .value("ELSERETURN", otherwise)
            }

            Expr::Call { callee, args } => return self.call(callee, args),

            Expr::Method {
                receiver,
                method,
                args,
            } => return self.method(receiver, method, args),

            Expr::Property {
                component,
                property,
            } => self.property(component, property, false)?,

            Expr::Index { list, index } => {
                let block = self.block("lists_select_item");
                let list = self.value(list)?;
                let index = self.value(index)?;

                block.value("LIST", list).value("NUM", index)
            }

            Expr::Question { subject, question } => self.question(subject, question)?,
            Expr::Transform { subject, transform } => self.transform(subject, transform)?,
            Expr::Lambda(lambda) => self.lambda(lambda)?,

            Expr::Block(body) => match self.value_body(body)? {
                Some(block) => block,
                None => return Ok(Lowered::Empty),
            },

            Expr::Compute { locals, result } if locals.is_empty() => return self.lower(result),
            Expr::Compute { locals, result } => self.compute(locals, result)?,

            Expr::Helper { key, option } => self
                .block("helpers_dropdown")
                .with_mutation(Mutation::new().attribute("key", key.val()))
                .field("OPTION", option.val().to_string()),

            Expr::Every(kind) => self
                .block("component_all_component_block")
                .with_mutation(Mutation::new().attribute("component_type", kind.val()))
                .field("COMPONENT_SELECTOR", kind.val().to_string()),

            Expr::WalkAll => self.block("dictionaries_walk_all"),
            Expr::Undefined => return Ok(Lowered::Empty),
        };

        Ok(Lowered::Value(block))
    }

    fn number(&mut self, number: &str) -> Block {
        self.block("math_number").field("NUM", number)
    }

    /// Un color con nombre usa su propio bloque; cualquier otro se
    /// arma a partir de sus componentes rojo, verde y azul.
    fn color(&mut self, code: &str, location: Location) -> Gen<Block> {
        if let Some(kind) = builtins::named_color(code) {
            return Ok(self.block(kind).field("COLOR", code));
        }

        let invalid = || Located::at(GenError::InvalidColor(code.to_owned()), location);

        let digits = code.strip_prefix('#').filter(|digits| digits.len() == 6).ok_or_else(invalid)?;
        let channels = (0..3)
            .map(|channel| {
                digits
                    .get(2 * channel..2 * channel + 2)
                    .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                    .ok_or_else(invalid)
            })
            .collect::<Gen<Vec<_>>>()?;

        let block = self.block("color_make_color");
        let list = self.block("lists_create_with");

        let channels = channels
            .into_iter()
            .map(|channel| Some(self.number(&channel.to_string())))
            .collect();

        Ok(block.value("COLORLIST", variadic(list, "ADD", channels)))
    }

    /// Cadenas del mismo operador asociativo producen un único bloque
    /// con un socket por operando.
    fn binary(&mut self, lhs: &Located<Expr>, op: BinOp, rhs: &Located<Expr>) -> Gen<Block> {
        let operator = builtins::operator(op);
        let block = self.block(operator.block);

        let mut operands = Vec::new();
        if operator.is_variadic() {
            flatten(lhs, op, &mut operands);
            flatten(rhs, op, &mut operands);
        } else {
            operands.push(lhs);
            operands.push(rhs);
        }

        let args = operands
            .into_iter()
            .map(|operand| self.value(operand))
            .collect::<Gen<Vec<_>>>()?;

        Ok(apply(block, operator.op, operator.lowering, args))
    }

    /// Declaraciones locales cuyo alcance es solo la expresión final.
    fn compute(&mut self, locals: &[(Binding, Located<Expr>)], result: &Located<Expr>) -> Gen<Block> {
        let mutation = locals
            .iter()
            .fold(Mutation::new(), |mutation, (name, _)| mutation.named("localname", name.name.val()));

        let mut block = self.block("local_declaration_expression").with_mutation(mutation);
        for (index, (name, _)) in locals.iter().enumerate() {
            block = block.field(format!("VAR{}", index), name.name.val().to_string());
        }

        for (index, (_, value)) in locals.iter().enumerate() {
            block = block.value(format!("DECL{}", index), self.value(value)?);
        }

        Ok(block.value("RETURN", self.value(result)?))
    }

    fn question(&mut self, subject: &Located<Expr>, question: &Located<Identifier>) -> Gen<Block> {
        let unknown = || Located::at(GenError::UnknownQuestion(question.val().clone()), *question.location());

        match builtins::question(question.val().as_ref()).ok_or_else(unknown)? {
            Question::Check { block, op, socket } => {
                let mut block = self.block(block);
                if let Some(op) = op {
                    block = block.field("OP", op);
                }

                Ok(block.value(socket, self.value(subject)?))
            }

            Question::Parity(remainder) => {
                let compare = self.block("logic_compare").field("OP", "EQ");
                let divide = self.block("math_divide").field("OP", "REMAINDER");

                let dividend = self.value(subject)?;
                let divisor = self.number("2");
                let divide = divide.value("DIVIDEND", dividend).value("DIVISOR", divisor);

                let expected = self.number(&remainder.to_string());
                Ok(compare.value("A", divide).value("B", expected))
            }
        }
    }

    fn transform(&mut self, subject: &Located<Expr>, transform: &Located<Identifier>) -> Gen<Block> {
        let name = transform.val();
        let known: &str = name.as_ref();
        if known != "obfuscate" {
            return Err(Located::at(GenError::UnknownTransform(name.clone()), *transform.location()));
        }

        match subject.val() {
            Expr::Text(text) => Ok(self.block("obfuscated_text").field("TEXT", text.as_str())),
            _ => Err(Located::at(GenError::ExpectedLiteral(name.clone()), *subject.location())),
        }
    }
}

fn flatten<'e>(expr: &'e Located<Expr>, op: BinOp, operands: &mut Vec<&'e Located<Expr>>) {
    match expr.val() {
        Expr::Binary(lhs, inner, rhs) if *inner == op => {
            flatten(lhs, op, operands);
            flatten(rhs, op, operands);
        }

        _ => operands.push(expr),
    }
}
