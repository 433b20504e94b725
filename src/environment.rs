//! The runtime scope chain: a tree of reference-counted nodes, each a flat name-to-value map
//! with a link to its parent. The [crate::resolver::Resolver] computes, ahead of time, exactly
//! how many parent links a [crate::ast::Lookup] or [crate::ast::Assignment] must walk; at
//! runtime we just follow that count, never searching.
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::value::Value;

/// A scope node. Cheap to share: a closure holds a strong reference to the environment it was
/// created in, which is what keeps captured variables alive after their defining block returns.
#[derive(Debug)]
pub struct Environment {
    parent: Option<Env>,
    bindings: HashMap<String, Value>,
}

pub type Env = Rc<RefCell<Environment>>;

/// A fresh environment with no parent, for the top of a program or a re-entrant `eval`.
pub fn root() -> Env {
    Rc::new(RefCell::new(Environment {
        parent: None,
        bindings: HashMap::new(),
    }))
}

/// A fresh environment one level deeper than `parent`, for a block, loop iteration, or call.
pub fn child(parent: &Env) -> Env {
    Rc::new(RefCell::new(Environment {
        parent: Some(Rc::clone(parent)),
        bindings: HashMap::new(),
    }))
}

impl Environment {
    pub fn declare(&mut self, name: impl Into<String>, value: Value) {
        self.bindings.insert(name.into(), value);
    }
}

/// Walk `depth` parent links from `env`.
fn ancestor(env: &Env, depth: usize) -> Env {
    let mut current = Rc::clone(env);
    for _ in 0..depth {
        let parent = current
            .borrow()
            .parent
            .clone()
            .expect("resolver-computed scope depth must stay within the runtime environment chain");
        current = parent;
    }
    current
}

/// Declare `name` in `env`'s own frame, shadowing any outer binding of the same name.
pub fn declare(env: &Env, name: impl Into<String>, value: Value) {
    env.borrow_mut().declare(name, value);
}

/// Read the binding `depth` parents up. The resolver guarantees `name` is present there.
pub fn lookup(env: &Env, name: &str, depth: usize) -> Value {
    let target = ancestor(env, depth);
    let value = target
        .borrow()
        .bindings
        .get(name)
        .cloned()
        .unwrap_or_else(|| panic!("resolver guaranteed `{name}` is bound {depth} scope(s) up"));
    value
}

/// Overwrite the binding `depth` parents up. The resolver guarantees `name` is already present
/// there, so this never creates a new binding.
pub fn assign(env: &Env, name: &str, depth: usize, value: Value) {
    let target = ancestor(env, depth);
    target.borrow_mut().bindings.insert(name.to_string(), value);
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn lookup_walks_the_resolved_number_of_parents() {
        let g = root();
        declare(&g, "x", Value::Integer(1));
        let inner = child(&child(&g));
        assert_eq!(Value::Integer(1), lookup(&inner, "x", 2));
    }

    #[test]
    fn shadowing_in_a_child_does_not_touch_the_parent() {
        let g = root();
        declare(&g, "x", Value::Integer(1));
        let inner = child(&g);
        declare(&inner, "x", Value::Integer(2));
        assert_eq!(Value::Integer(1), lookup(&g, "x", 0));
        assert_eq!(Value::Integer(2), lookup(&inner, "x", 0));
    }

    #[test]
    fn assign_mutates_the_ancestor_frame_in_place() {
        let g = root();
        declare(&g, "x", Value::Integer(1));
        let inner = child(&g);
        assign(&inner, "x", 1, Value::Integer(99));
        assert_eq!(Value::Integer(99), lookup(&g, "x", 0));
    }
}
