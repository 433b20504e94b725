//! Runtime values and the operator dispatch table from the language reference: which kind
//! combinations each operator accepts, and what promotions apply.
use std::fmt;
use std::rc::Rc;

use crate::ast::FunctionDef;
use crate::environment::Env;
use crate::error::EvalError;

/// A function literal paired with the environment it closed over at the moment it was created.
#[derive(Debug)]
pub struct Closure {
    pub function: Rc<FunctionDef>,
    pub captured_env: Env,
}

/// A host-provided function. Its signature is the embedding boundary: arguments in, a value or
/// an arbitrary host failure out.
pub type BuiltinFn = dyn Fn(&[Value]) -> anyhow::Result<Value>;

/// A runtime value.
#[derive(Clone)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Str(Rc<str>),
    Bool(bool),
    Nil,
    /// Arrays are shared by reference: cloning a `Value::Array` clones the handle, not the
    /// backing vector.
    Array(Rc<Vec<Value>>),
    Closure(Rc<Closure>),
    Builtin(Rc<BuiltinFn>),
}

impl Value {
    pub fn str(s: impl Into<Rc<str>>) -> Self {
        Value::Str(s.into())
    }

    /// The name used in diagnostics and `OperationNotSupported` messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "Integer",
            Value::Float(_) => "Float",
            Value::Str(_) => "String",
            Value::Bool(_) => "Bool",
            Value::Nil => "Nil",
            Value::Array(_) => "Array",
            Value::Closure(_) => "Function",
            Value::Builtin(_) => "Function",
        }
    }

    /// Truthiness used by `if`, `while`, and the unary `!` operator: `nil`, `false`, `0`, `0.0`,
    /// `""`, and `[]` are falsy; everything else, including every function, is truthy.
    pub fn is_true(&self) -> bool {
        match self {
            Value::Integer(n) => *n != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Bool(b) => *b,
            Value::Nil => false,
            Value::Array(items) => !items.is_empty(),
            Value::Closure(_) | Value::Builtin(_) => true,
        }
    }

    fn operation_not_supported(op: &str, a: &Value, b: &Value) -> EvalError {
        EvalError::OperationNotSupported {
            op: op.to_string(),
            operands: format!("{} and {}", a.type_name(), b.type_name()),
        }
    }

    pub fn add(&self, other: &Value) -> Result<Value, EvalError> {
        match numeric_pair(self, other) {
            Some(NumPair::Int(a, b)) => Ok(Value::Integer(a.wrapping_add(b))),
            Some(NumPair::Float(a, b)) => Ok(Value::Float(a + b)),
            None => match (self, other) {
                (Value::Str(a), Value::Str(b)) => Ok(Value::str(format!("{a}{b}"))),
                _ => Err(Self::operation_not_supported("+", self, other)),
            },
        }
    }

    pub fn sub(&self, other: &Value) -> Result<Value, EvalError> {
        match numeric_pair(self, other) {
            Some(NumPair::Int(a, b)) => Ok(Value::Integer(a.wrapping_sub(b))),
            Some(NumPair::Float(a, b)) => Ok(Value::Float(a - b)),
            None => Err(Self::operation_not_supported("-", self, other)),
        }
    }

    pub fn mul(&self, other: &Value) -> Result<Value, EvalError> {
        match numeric_pair(self, other) {
            Some(NumPair::Int(a, b)) => Ok(Value::Integer(a.wrapping_mul(b))),
            Some(NumPair::Float(a, b)) => Ok(Value::Float(a * b)),
            None => Err(Self::operation_not_supported("*", self, other)),
        }
    }

    pub fn div(&self, other: &Value) -> Result<Value, EvalError> {
        match numeric_pair(self, other) {
            Some(NumPair::Int(a, b)) => {
                if b == 0 {
                    Err(EvalError::DivisionByZero)
                } else {
                    Ok(Value::Integer(a / b))
                }
            }
            Some(NumPair::Float(a, b)) => Ok(Value::Float(a / b)),
            None => Err(Self::operation_not_supported("/", self, other)),
        }
    }

    /// `<`, `<=`, `>`, `>=`: defined only for Int/Int, Float/Float, and Int/Float pairs.
    pub fn compare(&self, other: &Value, order: impl Fn(std::cmp::Ordering) -> bool) -> Result<bool, EvalError> {
        match numeric_pair(self, other) {
            Some(NumPair::Int(a, b)) => Ok(order(a.cmp(&b))),
            Some(NumPair::Float(a, b)) => a
                .partial_cmp(&b)
                .map(order)
                .ok_or_else(|| Self::operation_not_supported("compare", self, other)),
            None => Err(Self::operation_not_supported("compare", self, other)),
        }
    }

    pub fn neg(&self) -> Result<Value, EvalError> {
        match self {
            Value::Integer(n) => Ok(Value::Integer(-n)),
            Value::Float(f) => Ok(Value::Float(-f)),
            _ => Err(EvalError::OperationNotSupported {
                op: "unary -".to_string(),
                operands: self.type_name().to_string(),
            }),
        }
    }

    pub fn pos(&self) -> Result<Value, EvalError> {
        match self {
            Value::Integer(_) | Value::Float(_) => Ok(self.clone()),
            _ => Err(EvalError::OperationNotSupported {
                op: "unary +".to_string(),
                operands: self.type_name().to_string(),
            }),
        }
    }

    /// Arrays index by element, strings index by codepoint (not byte offset). Negative indices
    /// wrap from the end, as in `a[-1]` for the last element.
    pub fn subscript(&self, index: &Value) -> Result<Value, EvalError> {
        let Value::Integer(i) = index else {
            return Err(Self::operation_not_supported("[]", self, index));
        };

        match self {
            Value::Array(items) => {
                let idx = wrap_index(*i, items.len())?;
                Ok(items[idx].clone())
            }
            Value::Str(s) => {
                let chars: Vec<char> = s.chars().collect();
                let idx = wrap_index(*i, chars.len())?;
                Ok(Value::str(chars[idx].to_string()))
            }
            _ => Err(Self::operation_not_supported("[]", self, index)),
        }
    }
}

fn wrap_index(i: i64, len: usize) -> Result<usize, EvalError> {
    let wrapped = if i < 0 { i + len as i64 } else { i };
    if wrapped < 0 || wrapped as usize >= len {
        return Err(EvalError::IndexOutOfBounds { index: i });
    }
    Ok(wrapped as usize)
}

enum NumPair {
    Int(i64, i64),
    Float(f64, f64),
}

/// Int/Int stays Int; any pairing involving a Float promotes both sides to Float; anything else
/// (including a Bool, String, Array, or function on either side) isn't a numeric pair at all.
fn numeric_pair(a: &Value, b: &Value) -> Option<NumPair> {
    match (a, b) {
        (Value::Integer(a), Value::Integer(b)) => Some(NumPair::Int(*a, *b)),
        (Value::Integer(a), Value::Float(b)) => Some(NumPair::Float(*a as f64, *b)),
        (Value::Float(a), Value::Integer(b)) => Some(NumPair::Float(*a, *b as f64)),
        (Value::Float(a), Value::Float(b)) => Some(NumPair::Float(*a, *b)),
        _ => None,
    }
}

impl PartialEq for Value {
    /// Structural equality, with the same Int/Float promotion `==` and `!=` use elsewhere.
    /// Arrays compare element-wise; closures and builtins compare only to the exact value they
    /// are (no two distinct closures are ever equal, even with identical source).
    fn eq(&self, other: &Value) -> bool {
        match numeric_pair(self, other) {
            Some(NumPair::Int(a, b)) => return a == b,
            Some(NumPair::Float(a, b)) => return a == b,
            None => {}
        }
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Nil, Value::Nil) => true,
            (Value::Array(a), Value::Array(b)) => a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x == y),
            (Value::Closure(a), Value::Closure(b)) => Rc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Nil => write!(f, "nil"),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Closure(_) => write!(f, "<function>"),
            Value::Builtin(_) => write!(f, "<builtin>"),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Value({self})")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn int_float_promotion_in_addition() {
        assert_eq!(Value::Float(3.5), Value::Integer(1).add(&Value::Float(2.5)).unwrap());
    }

    #[test]
    fn int_division_truncates_and_checks_zero() {
        assert_eq!(Value::Integer(2), Value::Integer(7).div(&Value::Integer(3)).unwrap());
        assert!(matches!(
            Value::Integer(1).div(&Value::Integer(0)),
            Err(EvalError::DivisionByZero)
        ));
    }

    #[test]
    fn float_division_by_zero_is_infinity_not_an_error() {
        let result = Value::Float(1.0).div(&Value::Float(0.0)).unwrap();
        assert!(matches!(result, Value::Float(f) if f.is_infinite()));
    }

    #[test]
    fn cross_kind_equality_is_false_except_numeric_promotion() {
        assert_eq!(Value::Integer(1), Value::Float(1.0));
        assert_ne!(Value::Integer(0), Value::Nil);
        assert_ne!(Value::Bool(false), Value::Nil);
    }

    #[test]
    fn array_equality_is_structural() {
        let a = Value::Array(Rc::new(vec![Value::Integer(1), Value::str("x")]));
        let b = Value::Array(Rc::new(vec![Value::Integer(1), Value::str("x")]));
        assert_eq!(a, b);
    }

    #[test]
    fn negative_index_wraps_from_the_end() {
        let arr = Value::Array(Rc::new(vec![Value::Integer(10), Value::Integer(20), Value::Integer(30)]));
        assert_eq!(Value::Integer(30), arr.subscript(&Value::Integer(-1)).unwrap());
    }

    #[test]
    fn out_of_range_index_after_wraparound_is_an_error() {
        let arr = Value::Array(Rc::new(vec![Value::Integer(1)]));
        assert!(matches!(
            arr.subscript(&Value::Integer(-2)),
            Err(EvalError::IndexOutOfBounds { index: -2 })
        ));
    }

    #[test]
    fn string_subscript_is_by_codepoint() {
        let s = Value::str("café");
        assert_eq!(Value::str("é"), s.subscript(&Value::Integer(3)).unwrap());
    }

    #[test]
    fn falsy_values() {
        assert!(!Value::Integer(0).is_true());
        assert!(!Value::Float(0.0).is_true());
        assert!(!Value::str("").is_true());
        assert!(!Value::Array(Rc::new(vec![])).is_true());
        assert!(!Value::Nil.is_true());
        assert!(Value::Integer(-1).is_true());
    }
}
