//! Punto de entrada ("driver").
//!
//! Este módulo orquesta las diferentes fases del proceso de
//! compilación y expone una CLI.

use anyhow::{self, bail, Context};
use clap::{self, crate_version, Arg, ArgMatches, Command};
use falcon::{
    codegen::{self, markup::EmitOptions},
    error::{Diagnostic, Stage},
    lex, parse, ComponentTable,
};

use log::info;
use std::{
    fs,
    io::{self, Read, Write},
};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    // Parsing de CLI
    let args = Command::new("Falcon compiler")
        .version(crate_version!())
        .arg(
            Arg::new("input")
                .required(true)
                .value_name("FILE")
                .help("Source file ('-' for stdin)"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .takes_value(true)
                .default_value("-")
                .value_name("FILE")
                .help("Output file ('-' for stdout)"),
        )
        .arg(
            Arg::new("component")
                .short('c')
                .long("component")
                .takes_value(true)
                .multiple_occurrences(true)
                .value_name("TYPE=INSTANCES")
                .help("Declare comma-separated component instances of a type"),
        )
        .arg(
            Arg::new("member")
                .short('m')
                .long("member")
                .takes_value(true)
                .multiple_occurrences(true)
                .value_name("INSTANCE=MEMBERS")
                .help("Restrict the members available on a component instance"),
        )
        .arg(
            Arg::new("compact")
                .long("compact")
                .help("Emit each block on a single line without the xml wrapper"),
        )
        .arg(
            Arg::new("check")
                .long("check")
                .help("Report every diagnostic instead of compiling"),
        )
        .get_matches();

    let components = component_table(&args)?;

    // Se garantiza por `required(true)`
    let input = args.value_of("input").unwrap_or("-");
    let source = read_source(input)?;

    if args.is_present("check") {
        return check(&source, &components);
    }

    let tokens = match lex::tokenize(&source) {
        Ok(tokens) => tokens,
        Err(error) => return fail(&source, &[Diagnostic::new(Stage::Lex, error)]),
    };

    let program = match parse::parse(&tokens, &components) {
        Ok(program) => program,
        Err(diagnostic) => return fail(&source, &[diagnostic]),
    };

    let forest = match codegen::generate(&program) {
        Ok(forest) => forest,
        Err(error) => return fail(&source, &[Diagnostic::new(Stage::Generation, error)]),
    };

    let options = if args.is_present("compact") {
        EmitOptions::empty()
    } else {
        EmitOptions::default()
    };

    let markup = forest.markup(options).to_string();
    info!("{} root blocks", forest.len());

    match args.value_of("output").unwrap_or("-") {
        "-" => io::stdout()
            .write_all(markup.as_bytes())
            .context("Failed to write to stdout")?,

        path => fs::write(path, markup).with_context(|| format!("Failed to write to file: {}", path))?,
    }

    Ok(())
}

fn component_table(args: &ArgMatches) -> anyhow::Result<ComponentTable> {
    let mut table = ComponentTable::new();

    for definition in args.values_of("component").into_iter().flatten() {
        let (kind, instances) = assignment(definition)?;
        for instance in instances {
            table.define(kind, instance);
        }
    }

    for definition in args.values_of("member").into_iter().flatten() {
        let (instance, members) = assignment(definition)?;
        for member in members {
            if !table.member(instance, member) {
                bail!("Component instance '{}' was never declared", instance);
            }
        }
    }

    Ok(table)
}

/// Separa `NOMBRE=a,b,c` en el nombre y sus valores.
fn assignment(definition: &str) -> anyhow::Result<(&str, impl Iterator<Item = &str>)> {
    let (name, values) = match definition.split_once('=') {
        Some((name, values)) if !name.trim().is_empty() => (name.trim(), values),
        _ => bail!("Expected NAME=VALUE[,VALUE...], found '{}'", definition),
    };

    let values = values.split(',').map(str::trim).filter(|value| !value.is_empty());
    Ok((name, values))
}

fn read_source(path: &str) -> anyhow::Result<String> {
    if path == "-" {
        let mut source = String::new();
        io::stdin()
            .read_to_string(&mut source)
            .context("Failed to read from stdin")?;

        return Ok(source);
    }

    fs::read_to_string(path).with_context(|| format!("Failed to read source file: {}", path))
}

fn check(source: &str, components: &ComponentTable) -> anyhow::Result<()> {
    let diagnostics = match lex::tokenize(source) {
        Ok(tokens) => parse::check(&tokens, components),
        Err(error) => vec![Diagnostic::new(Stage::Lex, error)],
    };

    if diagnostics.is_empty() {
        return Ok(());
    }

    fail(source, &diagnostics)
}

fn fail(source: &str, diagnostics: &[Diagnostic]) -> anyhow::Result<()> {
    for diagnostic in diagnostics {
        eprint!("{}", diagnostic.report(source));
    }

    bail!("Compilation failed with {} error(s)", diagnostics.len())
}
