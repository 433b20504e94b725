//! The reference set of host builtins: the four functions every embedder of this crate is
//! expected to provide at minimum, matching the language reference's worked examples.
use std::io::{self, BufRead, Write};
use std::rc::Rc;

use anyhow::{bail, ensure};

use crate::error::InterpreterError;
use crate::value::Value;

/// `println`, `print`, `input`, and `eval`, ready to hand to [crate::run_source] as globals.
pub fn builtins() -> Vec<(String, Value)> {
    vec![
        ("println".to_string(), builtin_println()),
        ("print".to_string(), builtin_print()),
        ("input".to_string(), builtin_input()),
        ("eval".to_string(), builtin_eval()),
    ]
}

fn builtin_println() -> Value {
    Value::Builtin(Rc::new(|args: &[Value]| -> anyhow::Result<Value> {
        ensure!(args.len() == 1, "println expects exactly one argument, got {}", args.len());
        println!("{}", args[0]);
        Ok(Value::Nil)
    }))
}

fn builtin_print() -> Value {
    Value::Builtin(Rc::new(|args: &[Value]| -> anyhow::Result<Value> {
        ensure!(args.len() == 1, "print expects exactly one argument, got {}", args.len());
        print!("{}", args[0]);
        io::stdout().flush()?;
        Ok(Value::Nil)
    }))
}

fn builtin_input() -> Value {
    Value::Builtin(Rc::new(|args: &[Value]| -> anyhow::Result<Value> {
        ensure!(args.is_empty(), "input expects no arguments, got {}", args.len());
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        Ok(Value::str(line))
    }))
}

/// `eval` re-invokes the whole pipeline, in expression mode, on a fresh root scope seeded with
/// the same reference builtins — not the caller's lexical scope, so it can't reach into an
/// enclosing function's locals. The nested scope is seeded with a fresh [builtins] call, so
/// `eval` itself is among the names the nested source can call, supporting re-entrant `eval`.
fn builtin_eval() -> Value {
    Value::Builtin(Rc::new(|args: &[Value]| -> anyhow::Result<Value> {
        ensure!(args.len() == 1, "eval expects exactly one argument, got {}", args.len());
        let Value::Str(source) = &args[0] else {
            bail!("eval expects a String argument, got {}", args[0].type_name());
        };
        crate::eval_source(source, builtins()).map_err(|e| anyhow::anyhow!("eval: {}", describe_phase(&e)))
    }))
}

/// Prefixes an inner-pipeline failure with the phase that produced it, per the language
/// reference's requirement that `eval` contextualize nested-pipeline errors.
fn describe_phase(err: &InterpreterError) -> String {
    match err {
        InterpreterError::Lex(e) => format!("lexing failed: {e}"),
        InterpreterError::Parse(e) => format!("parsing failed: {e}"),
        InterpreterError::Resolve(e) => format!("resolving failed: {e}"),
        InterpreterError::Eval(e) => format!("evaluation failed: {e}"),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn eval_builtin_runs_a_nested_expression() {
        let env = crate::run_source("result := eval(\"1 + 2\");", builtins()).unwrap();
        assert_eq!(Value::Integer(3), crate::environment::lookup(&env, "result", 0));
    }

    #[test]
    fn eval_builtin_is_reentrant() {
        // The nested scope `eval` runs in must itself contain `eval`, so evaling a string that
        // calls `eval` again has to resolve and run.
        let env = crate::run_source("result := eval(\"eval(\\\"1\\\")\");", builtins()).unwrap();
        assert_eq!(Value::Integer(1), crate::environment::lookup(&env, "result", 0));
    }

    #[test]
    fn eval_builtin_does_not_see_the_caller_s_locals() {
        let err = crate::run_source("x := 1; eval(\"x\");", builtins()).unwrap_err();
        assert!(matches!(err, InterpreterError::Eval(_)));
    }

    #[test]
    fn eval_builtin_wraps_inner_errors_with_a_phase_prefix() {
        let err = crate::run_source("eval(\"x\");", builtins()).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("eval:"), "message was: {message}");
        assert!(message.contains("resolving failed"), "message was: {message}");
    }
}
