use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser as ClapParser;
use log::{debug, error, info};

use wisp::error::InterpreterError;
use wisp::parser::Parser;
use wisp::resolver::Resolver;
use wisp::{environment, evaluator, host};

/// A small dynamically-typed scripting language.
///
/// With a source file, runs it to completion. Without one, starts a REPL.
#[derive(Debug, clap::Parser)]
#[command(version, about)]
struct Args {
    /// Script to run. Omit to start an interactive REPL instead.
    source_file: Option<PathBuf>,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    match args.source_file {
        Some(path) => run_file(&path),
        None => {
            run_repl();
            ExitCode::SUCCESS
        }
    }
}

fn run_file(path: &PathBuf) -> ExitCode {
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => {
            error!("could not read {}: {e}", path.display());
            eprintln!("error: could not read {}: {e}", path.display());
            return ExitCode::FAILURE;
        }
    };

    debug!("running {}", path.display());
    match wisp::run_source(&source, host::builtins()) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

/// A persistent root scope and resolver that every line typed at the prompt extends, so a
/// declaration on one line is visible on the next.
fn run_repl() {
    info!("starting REPL");
    let globals = host::builtins();
    let env = environment::root();
    let mut names = Vec::new();
    for (name, value) in globals {
        names.push(name.clone());
        environment::declare(&env, name, value);
    }
    let mut resolver = Resolver::with_globals(names);

    let stdin = io::stdin();
    loop {
        print!("> ");
        if io::stdout().flush().is_err() {
            return;
        }

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => return, // EOF
            Ok(_) => {}
            Err(e) => {
                error!("failed reading stdin: {e}");
                return;
            }
        }

        if let Err(err) = run_line(&line, &mut resolver, &env) {
            error!("{err}");
            println!("error: {err}");
        }
    }
}

/// A bare expression typed at the prompt echoes its value, the way most REPLs do; a
/// declaration, assignment, or control-flow statement prints nothing.
fn run_line(line: &str, resolver: &mut Resolver, env: &environment::Env) -> Result<(), InterpreterError> {
    let mut program = Parser::new(line)?.parse_program()?;
    resolver.resolve_program(&mut program)?;
    for value in evaluator::eval_repl_line(&program, env)? {
        println!("{value}");
    }
    Ok(())
}
