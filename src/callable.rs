use crate::ast::Node;
use crate::environment::ScopeId;
use crate::error::RuntimeError;
use crate::interpreter::Interpreter;
use crate::value::Value;
use phf::phf_map;
use std::fmt;
use std::fmt::Debug;
use std::rc::Rc;

/// A named procedure together with the scope it was defined in.
#[derive(Clone, Debug)]
pub struct Context {
    data: Rc<ContextImpl>,
}

#[derive(Debug)]
struct ContextImpl {
    name: String,
    inputs: Vec<String>,
    outputs: Vec<String>,
    body: Rc<Vec<Node>>,
    closure: ScopeId,
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<context {}>", self.name())
    }
}

impl Context {
    pub fn new(
        name: &str,
        inputs: &[String],
        outputs: &[String],
        body: Rc<Vec<Node>>,
        closure: ScopeId,
    ) -> Context {
        Context {
            data: Rc::new(ContextImpl {
                name: name.to_string(),
                inputs: inputs.to_vec(),
                outputs: outputs.to_vec(),
                body,
                closure,
            }),
        }
    }
    pub fn name(&self) -> &str {
        &self.data.name
    }
    pub fn inputs(&self) -> &[String] {
        &self.data.inputs
    }
    pub fn outputs(&self) -> &[String] {
        &self.data.outputs
    }
    pub fn body(&self) -> &[Node] {
        &self.data.body
    }
    pub fn closure(&self) -> ScopeId {
        self.data.closure
    }
    pub fn equals(&self, other: &Context) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }
}

pub type BuiltinFn = fn(&mut Interpreter, Value) -> Result<Value, RuntimeError>;

#[derive(Clone, Copy)]
pub struct Builtin {
    pub name: &'static str,
    pub call: BuiltinFn,
}

impl Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<builtin {}>", self.name)
    }
}

impl fmt::Display for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<builtin {}>", self.name)
    }
}

pub static BUILTINS: phf::Map<&'static str, BuiltinFn> = phf_map! {
    "print" => print as BuiltinFn,
    "println" => print as BuiltinFn,
    "output" => print as BuiltinFn,
    "type_of" => type_of as BuiltinFn,
    "length" => length as BuiltinFn,
};

fn print(interpreter: &mut Interpreter, value: Value) -> Result<Value, RuntimeError> {
    interpreter.write_line(&value.to_string())?;
    Ok(Value::Null)
}

fn type_of(_: &mut Interpreter, value: Value) -> Result<Value, RuntimeError> {
    Ok(Value::from(value.type_name()))
}

fn length(_: &mut Interpreter, value: Value) -> Result<Value, RuntimeError> {
    let len = match &value {
        Value::String(x) => x.chars().count(),
        Value::Pool(x) => x.borrow().len(),
        Value::KeyedPool(x) => x.borrow().len(),
        other => {
            return Err(RuntimeError::Type(format!(
                "no length for {}",
                other.type_name()
            )))
        }
    };
    Ok(Value::Integer(len as i64))
}
