//! A small dynamically-typed scripting language: a [scanner], a recursive-descent [parser], an
//! [ast] it builds, a [resolver] that annotates scope depths ahead of time, and a tree-walking
//! [evaluator] that runs the result against an [environment].
//!
//! [Control flow][crate::run_source]: source text goes through the scanner, parser, resolver,
//! and evaluator in that order; any phase can fail, and [error::InterpreterError] unifies their
//! error types so callers don't have to match on which phase produced one.

pub mod ast;
pub mod environment;
pub mod error;
pub mod evaluator;
pub mod host;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod token;
pub mod value;

use environment::Env;
use error::{InterpreterError, Result};
use parser::Parser;
use resolver::Resolver;

/// Declare every `(name, value)` pair into a fresh root environment and return the names, ready
/// to hand to [Resolver::with_globals] so the resolver sees exactly what the environment holds.
fn seeded_root(globals: impl IntoIterator<Item = (String, value::Value)>) -> (Env, Vec<String>) {
    let env = environment::root();
    let mut names = Vec::new();
    for (name, value) in globals {
        names.push(name.clone());
        environment::declare(&env, name, value);
    }
    (env, names)
}

/// Run a whole program against a fresh environment seeded with `globals`, e.g. the host's
/// builtins. Threads the pipeline end to end: scan, parse, resolve, evaluate.
pub fn run_source(source: &str, globals: impl IntoIterator<Item = (String, value::Value)>) -> Result<Env> {
    let (env, names) = seeded_root(globals);
    let mut program = Parser::new(source)?.parse_program()?;
    Resolver::with_globals(names).resolve_program(&mut program)?;
    evaluator::eval_program(&program, &env)?;
    Ok(env)
}

/// Re-run the pipeline on a single expression, in expression mode, against a fresh, empty root
/// scope seeded with `globals`. This is the `eval` builtin's job: it does not see the caller's
/// local variables, only the host's globals, so a nested `eval` can't be used to reach into the
/// enclosing function's locals.
pub fn eval_source(source: &str, globals: impl IntoIterator<Item = (String, value::Value)>) -> Result<value::Value> {
    let (env, names) = seeded_root(globals);
    let mut expr = Parser::new(source)?.parse_expression_only()?;
    Resolver::with_globals(names).resolve_expression(&mut expr)?;
    evaluator::eval_expression(&expr, &env).map_err(InterpreterError::from)
}
