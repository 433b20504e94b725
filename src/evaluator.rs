//! The tree-walking evaluator: executes a resolved [Program] or a single resolved [Expr]
//! directly against an [Env], with no intermediate bytecode.
use std::rc::Rc;

use log::debug;

use crate::ast::{BinaryOp, Expr, IfExpr, IfStmt, Program, Stmt, UnaryOp};
use crate::environment::{self, Env};
use crate::error::EvalError;
use crate::value::{Closure, Value};

/// A non-local transfer of control in flight: `return`, `break`, or `continue`. These never
/// escape as an [EvalError] while they're still inside the construct that should catch them;
/// [eval_block] threads them upward statement by statement instead.
enum Signal {
    Return(Value),
    Break,
    Continue,
}

/// Run every statement of a resolved program against `env`. A `return`/`break`/`continue` that
/// escapes every enclosing loop and function is a syntax-level mistake the resolver doesn't
/// catch, so it surfaces here as [EvalError::SyntaxError].
pub fn eval_program(program: &Program, env: &Env) -> Result<(), EvalError> {
    escaped_signal_to_error(eval_block(program, env)?).map(|_| ())
}

/// Evaluate a single resolved expression, for the `eval` host builtin's expression mode.
pub fn eval_expression(expr: &Expr, env: &Env) -> Result<Value, EvalError> {
    eval_expr(expr, env)
}

/// Run one REPL-typed line's statements against `env`, returning the value of every bare
/// expression statement in order, for the REPL to echo back to the user. File-mode execution
/// uses [eval_program] instead, which discards expression-statement values entirely.
pub fn eval_repl_line(statements: &[Stmt], env: &Env) -> Result<Vec<Value>, EvalError> {
    let mut echoed = Vec::new();
    for stmt in statements {
        if let Stmt::Expression(e) = stmt {
            echoed.push(eval_expr(e, env)?);
        } else {
            escaped_signal_to_error(eval_stmt(stmt, env)?)?;
        }
    }
    Ok(echoed)
}

fn escaped_signal_to_error(signal: Option<Signal>) -> Result<(), EvalError> {
    match signal {
        None => Ok(()),
        Some(Signal::Return(_)) => Err(EvalError::SyntaxError("'return' outside of a function")),
        Some(Signal::Break) => Err(EvalError::SyntaxError("'break' outside of a loop")),
        Some(Signal::Continue) => Err(EvalError::SyntaxError("'continue' outside of a loop")),
    }
}

fn eval_block(statements: &[Stmt], env: &Env) -> Result<Option<Signal>, EvalError> {
    for stmt in statements {
        if let Some(signal) = eval_stmt(stmt, env)? {
            return Ok(Some(signal));
        }
    }
    Ok(None)
}

fn eval_stmt(stmt: &Stmt, env: &Env) -> Result<Option<Signal>, EvalError> {
    match stmt {
        Stmt::If(if_stmt) => eval_if_stmt(if_stmt, env),
        Stmt::While(w) => {
            loop {
                if !eval_expr(&w.condition, env)?.is_true() {
                    return Ok(None);
                }
                let body_env = environment::child(env);
                match eval_block(&w.body, &body_env)? {
                    None | Some(Signal::Continue) => continue,
                    Some(Signal::Break) => return Ok(None),
                    returning @ Some(Signal::Return(_)) => return Ok(returning),
                }
            }
        }
        Stmt::Expression(e) => {
            eval_expr(e, env)?;
            Ok(None)
        }
        Stmt::Declaration(name, value) => {
            let value = eval_expr(value, env)?;
            environment::declare(env, name.clone(), value);
            Ok(None)
        }
        Stmt::Assignment(a) => {
            let value = eval_expr(&a.value, env)?;
            let depth = a.scope_depth.expect("resolver must annotate every assignment");
            environment::assign(env, &a.name, depth, value);
            Ok(None)
        }
        Stmt::Return(e) => Ok(Some(Signal::Return(eval_expr(e, env)?))),
        Stmt::Continue => Ok(Some(Signal::Continue)),
        Stmt::Break => Ok(Some(Signal::Break)),
    }
}

fn eval_if_stmt(if_stmt: &IfStmt, env: &Env) -> Result<Option<Signal>, EvalError> {
    let take_branch = match &if_stmt.condition {
        Some(cond) => eval_expr(cond, env)?.is_true(),
        None => true,
    };

    if take_branch {
        let body_env = environment::child(env);
        eval_block(&if_stmt.body, &body_env)
    } else if let Some(else_branch) = &if_stmt.else_branch {
        eval_if_stmt(else_branch, env)
    } else {
        Ok(None)
    }
}

fn eval_if_expr(if_expr: &IfExpr, env: &Env) -> Result<Value, EvalError> {
    match &if_expr.condition {
        Some(cond) => {
            if eval_expr(cond, env)?.is_true() {
                eval_expr(&if_expr.value, env)
            } else {
                let else_branch = if_expr
                    .else_branch
                    .as_ref()
                    .expect("the parser requires every if-expression to have an else arm");
                eval_if_expr(else_branch, env)
            }
        }
        None => eval_expr(&if_expr.value, env),
    }
}

fn eval_expr(expr: &Expr, env: &Env) -> Result<Value, EvalError> {
    match expr {
        Expr::Integer(n) => Ok(Value::Integer(*n)),
        Expr::Float(x) => Ok(Value::Float(*x)),
        Expr::Str(s) => Ok(Value::str(s.as_str())),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Nil => Ok(Value::Nil),
        Expr::Array(items) => {
            let values = items.iter().map(|item| eval_expr(item, env)).collect::<Result<Vec<_>, _>>()?;
            Ok(Value::Array(Rc::new(values)))
        }
        Expr::Function(f) => Ok(Value::Closure(Rc::new(Closure {
            function: Rc::new(f.clone()),
            captured_env: Rc::clone(env),
        }))),
        Expr::If(if_expr) => eval_if_expr(if_expr, env),
        Expr::Binary(op, a, b) => eval_binary(*op, a, b, env),
        Expr::Unary(op, a) => {
            let value = eval_expr(a, env)?;
            match op {
                UnaryOp::LNot => Ok(Value::Bool(!value.is_true())),
                UnaryOp::Pos => value.pos(),
                UnaryOp::Neg => value.neg(),
            }
        }
        Expr::Lookup(lookup) => {
            let depth = lookup.scope_depth.expect("resolver must annotate every lookup");
            Ok(environment::lookup(env, &lookup.name, depth))
        }
        Expr::Call(callee, args) => eval_call(callee, args, env),
        Expr::Subscript(target, index) => {
            let target = eval_expr(target, env)?;
            let index = eval_expr(index, env)?;
            target.subscript(&index)
        }
    }
}

fn eval_binary(op: BinaryOp, a: &Expr, b: &Expr, env: &Env) -> Result<Value, EvalError> {
    // Short-circuit: the right-hand side is never evaluated, let alone its side effects run,
    // once the left side already decides the result.
    match op {
        BinaryOp::Land => {
            let lhs = eval_expr(a, env)?;
            return if lhs.is_true() { eval_expr(b, env) } else { Ok(lhs) };
        }
        BinaryOp::Lor => {
            let lhs = eval_expr(a, env)?;
            return if lhs.is_true() { Ok(lhs) } else { eval_expr(b, env) };
        }
        _ => {}
    }

    let lhs = eval_expr(a, env)?;
    let rhs = eval_expr(b, env)?;
    use std::cmp::Ordering::*;
    match op {
        BinaryOp::Eq => Ok(Value::Bool(lhs == rhs)),
        BinaryOp::Ne => Ok(Value::Bool(lhs != rhs)),
        BinaryOp::Lt => lhs.compare(&rhs, |o| o == Less).map(Value::Bool),
        BinaryOp::Le => lhs.compare(&rhs, |o| o != Greater).map(Value::Bool),
        BinaryOp::Gt => lhs.compare(&rhs, |o| o == Greater).map(Value::Bool),
        BinaryOp::Ge => lhs.compare(&rhs, |o| o != Less).map(Value::Bool),
        BinaryOp::Add => lhs.add(&rhs),
        BinaryOp::Sub => lhs.sub(&rhs),
        BinaryOp::Mul => lhs.mul(&rhs),
        BinaryOp::Div => lhs.div(&rhs),
        BinaryOp::Land | BinaryOp::Lor => unreachable!("handled above"),
    }
}

fn eval_call(callee: &Expr, args: &[Expr], env: &Env) -> Result<Value, EvalError> {
    let callee = eval_expr(callee, env)?;
    let args = args.iter().map(|a| eval_expr(a, env)).collect::<Result<Vec<_>, _>>()?;

    match callee {
        Value::Closure(closure) => call_closure(&closure, &args),
        Value::Builtin(f) => {
            debug!("dispatching to host builtin with {} argument(s)", args.len());
            f(&args).map_err(EvalError::from)
        }
        _ => Err(EvalError::NotCallable),
    }
}

/// Parameters and body live in two nested scopes over the closure's captured environment, so a
/// parameter can be reassigned inside the body without aliasing the caller's own locals, while
/// still resolving at the scope depths the resolver computed for this function.
fn call_closure(closure: &Closure, args: &[Value]) -> Result<Value, EvalError> {
    let params = &closure.function.params;
    if args.len() > params.len() {
        return Err(EvalError::ArityMismatch {
            expected: params.len(),
            got: args.len(),
        });
    }

    let parameter_env = environment::child(&closure.captured_env);
    for (i, name) in params.iter().enumerate() {
        let value = args.get(i).cloned().unwrap_or(Value::Nil);
        environment::declare(&parameter_env, name.clone(), value);
    }
    debug!("pushed parameter scope for call ({} param(s))", params.len());

    let body_env = environment::child(&parameter_env);
    let result = match eval_block(&closure.function.body, &body_env)? {
        Some(Signal::Return(value)) => Ok(value),
        None => Ok(Value::Nil),
        Some(Signal::Break) => Err(EvalError::SyntaxError("'break' outside of a loop")),
        Some(Signal::Continue) => Err(EvalError::SyntaxError("'continue' outside of a loop")),
    };
    debug!("popped call scopes");
    result
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::parser::Parser;
    use crate::resolver::Resolver;

    fn run(source: &str) -> Result<Env, EvalError> {
        let mut program = Parser::new(source).unwrap().parse_program().unwrap();
        Resolver::new().resolve_program(&mut program).unwrap();
        let env = environment::root();
        eval_program(&program, &env)?;
        Ok(env)
    }

    #[test]
    fn closures_capture_their_defining_environment() {
        let source = "
            make_counter := func() {
                n := 0;
                return func() {
                    n = n + 1;
                    return n;
                };
            };
            counter := make_counter();
            counter();
            counter();
            result := counter();
        ";
        let env = run(source).unwrap();
        assert_eq!(Value::Integer(3), environment::lookup(&env, "result", 0));
    }

    #[test]
    fn short_circuit_or_skips_the_right_side() {
        let source = "
            calls := 0;
            noisy := func() { calls = calls + 1; return true; };
            result := true || noisy();
        ";
        let env = run(source).unwrap();
        assert_eq!(Value::Integer(0), environment::lookup(&env, "calls", 0));
        assert_eq!(Value::Bool(true), environment::lookup(&env, "result", 0));
    }

    #[test]
    fn numeric_promotion_through_addition() {
        let env = run("result := 1 + 2.5;").unwrap();
        assert_eq!(Value::Float(3.5), environment::lookup(&env, "result", 0));
    }

    #[test]
    fn control_flow_accumulates_with_continue_and_break() {
        let source = "
            sum := 0;
            i := 0;
            while i < 10 {
                i = i + 1;
                if i == 3 {
                    continue;
                }
                if i == 7 {
                    break;
                }
                sum = sum + i;
            }
            result := sum;
        ";
        let env = run(source).unwrap();
        assert_eq!(Value::Integer(18), environment::lookup(&env, "result", 0));
    }

    #[test]
    fn recursion_computes_fibonacci() {
        let source = "
            fib := func(n) {
                return if n < 2 { n } else { fib(n - 1) + fib(n - 2) };
            };
            result := fib(10);
        ";
        let env = run(source).unwrap();
        assert_eq!(Value::Integer(55), environment::lookup(&env, "result", 0));
    }

    #[test]
    fn string_subscript_wraps_negative_indices() {
        let env = run("result := \"abc\"[-1];").unwrap();
        assert_eq!(Value::str("c"), environment::lookup(&env, "result", 0));
    }

    #[test]
    fn calling_with_fewer_arguments_pads_with_nil() {
        let source = "
            f := func(a, b) { return b; };
            result := f(1);
        ";
        let env = run(source).unwrap();
        assert_eq!(Value::Nil, environment::lookup(&env, "result", 0));
    }

    #[test]
    fn calling_with_too_many_arguments_is_an_arity_mismatch() {
        let source = "
            f := func(a) { return a; };
            f(1, 2);
        ";
        assert!(matches!(run(source), Err(EvalError::ArityMismatch { expected: 1, got: 2 })));
    }

    #[test]
    fn top_level_break_is_a_syntax_error() {
        assert!(matches!(run("break;"), Err(EvalError::SyntaxError(_))));
    }
}
