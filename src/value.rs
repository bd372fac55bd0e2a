use crate::callable::{Builtin, Context};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::fmt;
use std::fmt::Formatter;
use std::rc::Rc;

pub type Pool = Rc<RefCell<Vec<Value>>>;
pub type KeyedPool = Rc<RefCell<IndexMap<String, Value>>>;

/// A runtime value. Pools and keyed pools are shared on clone, so a mutation
/// through one binding is seen through every other binding of the same pool.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Pool(Pool),
    KeyedPool(KeyedPool),
    Context(Context),
    Builtin(Builtin),
}

impl Value {
    pub fn pool(elements: Vec<Value>) -> Value {
        Value::Pool(Rc::new(RefCell::new(elements)))
    }
    pub fn keyed_pool(entries: IndexMap<String, Value>) -> Value {
        Value::KeyedPool(Rc::new(RefCell::new(entries)))
    }
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "bool",
            Value::Integer(_) | Value::Float(_) => "num",
            Value::String(_) => "str",
            Value::Pool(_) => "pool",
            Value::KeyedPool(_) => "keyed_pool",
            Value::Context(_) => "context",
            Value::Builtin(_) => "builtin",
        }
    }
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Boolean(x) => *x,
            Value::Integer(x) => *x != 0,
            Value::Float(x) => *x != 0.0,
            Value::String(x) => !x.is_empty(),
            _ => true,
        }
    }
    pub fn equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(l), Value::Boolean(r)) => l == r,
            (Value::Integer(l), Value::Integer(r)) => l == r,
            (Value::Integer(l), Value::Float(r)) => (*l as f64) == *r,
            (Value::Float(l), Value::Integer(r)) => *l == (*r as f64),
            (Value::Float(l), Value::Float(r)) => l == r,
            (Value::String(l), Value::String(r)) => l == r,
            (Value::Pool(l), Value::Pool(r)) => {
                if Rc::ptr_eq(l, r) {
                    return true;
                }
                let (l, r) = (l.borrow(), r.borrow());
                l.len() == r.len() && l.iter().zip(r.iter()).all(|(a, b)| a.equals(b))
            }
            (Value::KeyedPool(l), Value::KeyedPool(r)) => {
                if Rc::ptr_eq(l, r) {
                    return true;
                }
                let (l, r) = (l.borrow(), r.borrow());
                l.len() == r.len()
                    && l
                        .iter()
                        .all(|(k, v)| r.get(k).map_or(false, |other| v.equals(other)))
            }
            (Value::Context(l), Value::Context(r)) => l.equals(r),
            (Value::Builtin(l), Value::Builtin(r)) => l.name == r.name,
            _ => false,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        self.equals(other)
    }
}

impl From<i64> for Value {
    fn from(x: i64) -> Value {
        Value::Integer(x)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Value {
        Value::Float(x)
    }
}

impl From<bool> for Value {
    fn from(x: bool) -> Value {
        Value::Boolean(x)
    }
}

impl From<&str> for Value {
    fn from(x: &str) -> Value {
        Value::String(x.to_string())
    }
}

/// Strings nested in pools are quoted; a top-level string prints raw.
fn write_nested(f: &mut Formatter<'_>, value: &Value) -> fmt::Result {
    match value {
        Value::String(x) => write!(f, "{:?}", x),
        other => write!(f, "{}", other),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Boolean(x) => write!(f, "{}", x),
            Value::Integer(x) => write!(f, "{}", x),
            Value::Float(x) => {
                if x.is_finite() && x.fract() == 0.0 {
                    write!(f, "{:.1}", x)
                } else {
                    write!(f, "{}", x)
                }
            }
            Value::String(x) => write!(f, "{}", x),
            Value::Pool(x) => {
                write!(f, "[|")?;
                for (i, element) in x.borrow().iter().enumerate() {
                    write!(f, "{}", if i == 0 { " " } else { ", " })?;
                    write_nested(f, element)?;
                }
                write!(f, " |]")
            }
            Value::KeyedPool(x) => {
                write!(f, "[:")?;
                for (i, (key, value)) in x.borrow().iter().enumerate() {
                    write!(f, "{}{} = ", if i == 0 { " " } else { ", " }, key)?;
                    write_nested(f, value)?;
                }
                write!(f, " :]")
            }
            Value::Context(x) => write!(f, "{}", x),
            Value::Builtin(x) => write!(f, "{}", x),
        }
    }
}
