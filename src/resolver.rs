//! Compile-time scope tracking: annotates every [crate::ast::Lookup] and
//! [crate::ast::Assignment] with a resolved scope depth, mirroring the environment tree the
//! evaluator will build at runtime.
use std::collections::HashSet;

use crate::ast::*;
use crate::error::ResolveError;

/// A stack of sets of declared names, one entry per scope currently open.
pub struct Resolver {
    scopes: Vec<HashSet<String>>,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver {
    /// A resolver with just the root scope, empty.
    pub fn new() -> Self {
        Resolver {
            scopes: vec![HashSet::new()],
        }
    }

    /// A resolver whose root scope is pre-seeded with the given names. This is how an embedder
    /// injects host builtins (`println`, etc.) before analysis.
    pub fn with_globals(names: impl IntoIterator<Item = String>) -> Self {
        let mut resolver = Self::new();
        resolver.scopes[0].extend(names);
        resolver
    }

    pub fn resolve_program(&mut self, program: &mut Program) -> Result<(), ResolveError> {
        for stmt in program.iter_mut() {
            self.resolve_stmt(stmt)?;
        }
        Ok(())
    }

    pub fn resolve_expression(&mut self, expr: &mut Expr) -> Result<(), ResolveError> {
        self.resolve_expr(expr)
    }

    fn push_scope(&mut self) {
        self.scopes.push(HashSet::new());
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &str) -> Result<(), ResolveError> {
        let current = self.scopes.last_mut().expect("at least the root scope is always open");
        if !current.insert(name.to_string()) {
            return Err(ResolveError::Redeclaration { name: name.to_string() });
        }
        Ok(())
    }

    fn resolve_name(&self, name: &str) -> Result<usize, ResolveError> {
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains(name) {
                return Ok(depth);
            }
        }
        Err(ResolveError::UndeclaredName { name: name.to_string() })
    }

    fn resolve_stmt(&mut self, stmt: &mut Stmt) -> Result<(), ResolveError> {
        match stmt {
            Stmt::If(if_stmt) => self.resolve_if_stmt(if_stmt),
            Stmt::While(w) => {
                self.resolve_expr(&mut w.condition)?;
                self.push_scope();
                let result = w.body.iter_mut().try_for_each(|s| self.resolve_stmt(s));
                self.pop_scope();
                result
            }
            Stmt::Expression(e) => self.resolve_expr(e),
            Stmt::Declaration(name, value) => {
                // The name is visible to its own initializer, so `f := func(){ ... f() ... }`
                // resolves: declare first, analyze the value second.
                self.declare(name)?;
                self.resolve_expr(value)
            }
            Stmt::Assignment(a) => {
                a.scope_depth = Some(self.resolve_name(&a.name)?);
                self.resolve_expr(&mut a.value)
            }
            Stmt::Return(e) => self.resolve_expr(e),
            Stmt::Continue | Stmt::Break => Ok(()),
        }
    }

    fn resolve_if_stmt(&mut self, if_stmt: &mut IfStmt) -> Result<(), ResolveError> {
        if let Some(cond) = &mut if_stmt.condition {
            self.resolve_expr(cond)?;
        }
        self.push_scope();
        let result = if_stmt.body.iter_mut().try_for_each(|s| self.resolve_stmt(s));
        self.pop_scope();
        result?;

        if let Some(else_branch) = &mut if_stmt.else_branch {
            self.resolve_if_stmt(else_branch)?;
        }
        Ok(())
    }

    fn resolve_expr(&mut self, expr: &mut Expr) -> Result<(), ResolveError> {
        match expr {
            Expr::Integer(_) | Expr::Float(_) | Expr::Str(_) | Expr::Bool(_) | Expr::Nil => Ok(()),
            Expr::Array(items) => items.iter_mut().try_for_each(|e| self.resolve_expr(e)),
            Expr::Function(f) => self.resolve_function(f),
            Expr::If(if_expr) => self.resolve_if_expr(if_expr),
            Expr::Binary(_, a, b) => {
                self.resolve_expr(a)?;
                self.resolve_expr(b)
            }
            Expr::Unary(_, a) => self.resolve_expr(a),
            Expr::Lookup(lookup) => {
                lookup.scope_depth = Some(self.resolve_name(&lookup.name)?);
                Ok(())
            }
            Expr::Call(callee, args) => {
                self.resolve_expr(callee)?;
                args.iter_mut().try_for_each(|a| self.resolve_expr(a))
            }
            Expr::Subscript(target, index) => {
                self.resolve_expr(target)?;
                self.resolve_expr(index)
            }
        }
    }

    /// Function parameters form an extra inner scope pushed inside the closure's captured
    /// parent scope; the body is one scope deeper still.
    fn resolve_function(&mut self, f: &mut FunctionDef) -> Result<(), ResolveError> {
        self.push_scope();
        for param in &f.params {
            self.declare(param)?;
        }
        self.push_scope();
        let result = f.body.iter_mut().try_for_each(|s| self.resolve_stmt(s));
        self.pop_scope();
        self.pop_scope();
        result
    }

    fn resolve_if_expr(&mut self, if_expr: &mut IfExpr) -> Result<(), ResolveError> {
        if let Some(cond) = &mut if_expr.condition {
            self.resolve_expr(cond)?;
        }
        self.resolve_expr(&mut if_expr.value)?;
        if let Some(else_branch) = &mut if_expr.else_branch {
            self.resolve_if_expr(else_branch)?;
        }
        Ok(())
    }
}
