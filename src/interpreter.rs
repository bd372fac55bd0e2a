use crate::ast::{BinaryOperator, FlowDirection, GateBranch, Literal, Node, Pattern, Visitor};
use crate::callable::{Builtin, Context, BUILTINS};
use crate::environment::{Environment, ScopeId};
use crate::error::{NexusError, RuntimeError};
use crate::parser;
use crate::scanner;
use crate::value::Value;
use indexmap::IndexMap;
use log::{debug, trace};
use std::convert::TryFrom;
use std::io::{self, Write};
use std::rc::Rc;

/// Default limit on nested context invocations before a `RecursionError`.
/// Each level costs several interpreter frames, so reaching it needs a stack
/// well beyond the 2 MiB a spawned thread gets; see `with_max_depth`.
pub const MAX_CALL_DEPTH: usize = 200;

/// Longest string `*` may build.
pub const MAX_STRING_LEN: usize = 1 << 24;

struct Reaction {
    condition: Option<Node>,
    body: Vec<Node>,
}

pub struct Interpreter {
    environment: Environment,
    scope: ScopeId,
    reactions: IndexMap<String, Rc<Reaction>>,
    output: Box<dyn Write>,
    depth: usize,
    max_depth: usize,
}

impl Visitor<Node, Result<Value, RuntimeError>> for Interpreter {
    fn visit(&mut self, node: &Node) -> Result<Value, RuntimeError> {
        match node {
            Node::Program(statements) => self.block(statements),
            Node::Literal(x) => Ok(match x {
                Literal::Integer(n) => Value::Integer(*n),
                Literal::Float(x) => Value::Float(*x),
                Literal::String(s) => Value::String(s.clone()),
                Literal::Boolean(b) => Value::Boolean(*b),
                Literal::Null => Value::Null,
            }),
            Node::Identifier(name) => self.environment.get(self.scope, name),
            Node::BinaryOp {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                binary(*operator, &left, &right)
            }
            Node::PoolLiteral(elements) => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(self.evaluate(element)?);
                }
                Ok(Value::pool(values))
            }
            Node::KeyedPoolLiteral(pairs) => {
                let mut entries = IndexMap::new();
                for (key, value) in pairs {
                    entries.insert(key.clone(), self.evaluate(value)?);
                }
                Ok(Value::keyed_pool(entries))
            }
            Node::VarDeclaration {
                mutable,
                name,
                value,
            } => {
                let value = match value {
                    Some(value) => self.evaluate(value)?,
                    None => Value::Null,
                };
                self.environment
                    .define(self.scope, name, value.clone(), *mutable);
                Ok(value)
            }
            Node::Assignment { target, value } => {
                let name = match target.as_ref() {
                    Node::Identifier(name) => name,
                    _ => return Err(RuntimeError::Type("invalid assignment target".to_string())),
                };
                let value = self.evaluate(value)?;
                self.environment.assign(self.scope, name, value.clone())?;
                Ok(value)
            }
            Node::ContextDef {
                name,
                inputs,
                outputs,
                body,
            } => {
                let context = Context::new(name, inputs, outputs, Rc::clone(body), self.scope);
                self.environment.capture(self.scope);
                self.environment
                    .define(self.scope, name, Value::Context(context.clone()), false);
                Ok(Value::Context(context))
            }
            Node::ReactionDef {
                name,
                condition,
                body,
            } => {
                let reaction = Reaction {
                    condition: condition.as_deref().cloned(),
                    body: body.clone(),
                };
                self.reactions.insert(name.clone(), Rc::new(reaction));
                Ok(Value::Null)
            }
            Node::GateDef {
                condition,
                branches,
            } => self.gate(condition, branches),
            Node::Flow {
                left,
                direction,
                right,
            } => match direction {
                FlowDirection::Increment => self.increment(left),
                FlowDirection::Forward => {
                    let value = self.evaluate(left)?;
                    match right.as_deref() {
                        Some(Node::Identifier(name)) => self.flow_into(name, value),
                        Some(other) => self.evaluate(other),
                        None => Ok(value),
                    }
                }
                _ => {
                    self.evaluate(left)?;
                    match right {
                        Some(right) => self.evaluate(right),
                        None => Ok(Value::Null),
                    }
                }
            },
        }
    }
}

impl Interpreter {
    pub fn new() -> Interpreter {
        Interpreter::with_environment(Environment::new())
    }
    /// Runs on top of an existing environment. Builtins are (re)bound in its
    /// root scope.
    pub fn with_environment(mut environment: Environment) -> Interpreter {
        let root = environment.root();
        for (name, call) in BUILTINS.entries() {
            let builtin = Builtin { name: *name, call: *call };
            environment.define(root, name, Value::Builtin(builtin), false);
        }
        Interpreter {
            environment,
            scope: root,
            reactions: IndexMap::new(),
            output: Box::new(io::stdout()),
            depth: 0,
            max_depth: MAX_CALL_DEPTH,
        }
    }
    /// Sends everything the printing builtins write to `output`.
    pub fn with_output(mut self, output: Box<dyn Write>) -> Interpreter {
        self.output = output;
        self
    }
    /// Caps nested context calls at `max_depth`. Lower it when running on a
    /// small stack: a default spawned thread holds a few dozen levels.
    pub fn with_max_depth(mut self, max_depth: usize) -> Interpreter {
        self.max_depth = max_depth;
        self
    }
    pub fn interpret(&mut self, program: &Node) -> Result<Value, RuntimeError> {
        self.evaluate(program)
    }
    pub fn eval_source(&mut self, source: &str) -> Result<Value, NexusError> {
        let tokens = scanner::tokenize(source)?;
        let program = parser::parse(&tokens)?;
        Ok(self.interpret(&program)?)
    }
    pub fn environment(&self) -> &Environment {
        &self.environment
    }
    pub fn into_environment(self) -> Environment {
        self.environment
    }
    /// Root bindings made by the program, in definition order.
    pub fn globals(&self) -> IndexMap<String, Value> {
        let root = self.environment.root();
        self.environment
            .bindings(root)
            .filter(|(_, binding)| !matches!(binding.value, Value::Builtin(_)))
            .map(|(name, binding)| (name.clone(), binding.value.clone()))
            .collect()
    }
    /// Calls `context` with named arguments and returns the outputs it bound.
    /// Missing arguments are `null`; unbound outputs are left out.
    pub fn invoke(
        &mut self,
        context: &Context,
        arguments: IndexMap<String, Value>,
    ) -> Result<IndexMap<String, Value>, RuntimeError> {
        let (_, outputs) = self.call(context, arguments)?;
        Ok(outputs)
    }
    /// Runs a registered reaction if it has no condition or the condition
    /// holds; otherwise yields `null`.
    pub fn trigger(&mut self, name: &str) -> Result<Value, RuntimeError> {
        let reaction = match self.reactions.get(name) {
            Some(reaction) => Rc::clone(reaction),
            None => return Err(RuntimeError::Name(name.to_string())),
        };
        if let Some(condition) = &reaction.condition {
            if !self.evaluate(condition)?.is_truthy() {
                debug!("reaction {} skipped", name);
                return Ok(Value::Null);
            }
        }
        debug!("reaction {} triggered", name);
        self.block(&reaction.body)
    }
    pub fn write_line(&mut self, line: &str) -> Result<(), RuntimeError> {
        writeln!(self.output, "{}", line).map_err(|e| RuntimeError::Output(e.to_string()))
    }
    fn evaluate(&mut self, node: &Node) -> Result<Value, RuntimeError> {
        node.accept(self)
    }
    fn block(&mut self, statements: &[Node]) -> Result<Value, RuntimeError> {
        let mut last = Value::Null;
        for statement in statements {
            last = self.evaluate(statement)?;
        }
        Ok(last)
    }
    /// Runs the body in a fresh child of the closure scope. Returns the value
    /// of the last statement and the outputs bound in that scope.
    fn call(
        &mut self,
        context: &Context,
        mut arguments: IndexMap<String, Value>,
    ) -> Result<(Value, IndexMap<String, Value>), RuntimeError> {
        if self.depth >= self.max_depth {
            return Err(RuntimeError::Recursion(self.max_depth));
        }
        debug!("invoke {} at depth {}", context.name(), self.depth);
        let scope = self.environment.push(context.closure());
        for input in context.inputs() {
            let value = arguments.swap_remove(input).unwrap_or(Value::Null);
            self.environment.define(scope, input, value, true);
        }
        let caller = std::mem::replace(&mut self.scope, scope);
        self.depth += 1;
        let result = self.block(context.body());
        self.depth -= 1;
        self.scope = caller;

        let result = result.map(|last| {
            let mut outputs = IndexMap::new();
            for output in context.outputs() {
                if let Some(binding) = self.environment.get_local(scope, output) {
                    outputs.insert(output.clone(), binding.value.clone());
                }
            }
            (last, outputs)
        });
        self.environment.release(scope);
        result
    }
    /// `value => name`: call what `name` holds, or bind `value` to it.
    fn flow_into(&mut self, name: &str, value: Value) -> Result<Value, RuntimeError> {
        let target = self
            .environment
            .lookup(self.scope, name)
            .map(|binding| binding.value.clone());
        match target {
            Some(Value::Context(context)) => self.flow_call(&context, value),
            Some(Value::Builtin(builtin)) => {
                trace!("{} => {}", value, builtin);
                (builtin.call)(self, value)
            }
            _ => {
                trace!("{} => {}", value, name);
                self.environment.assign(self.scope, name, value.clone())?;
                Ok(value)
            }
        }
    }
    fn flow_call(&mut self, context: &Context, value: Value) -> Result<Value, RuntimeError> {
        let mut arguments = IndexMap::new();
        if let Some(first) = context.inputs().first() {
            arguments.insert(first.clone(), value);
        }
        let (last, mut outputs) = self.call(context, arguments)?;
        Ok(match context.outputs() {
            [] => last,
            [single] => outputs.swap_remove(single).unwrap_or(Value::Null),
            _ => Value::keyed_pool(outputs),
        })
    }
    fn increment(&mut self, target: &Node) -> Result<Value, RuntimeError> {
        let name = match target {
            Node::Identifier(name) => name,
            _ => return Err(RuntimeError::Type("'++>' needs a name".to_string())),
        };
        let value = match self.environment.get(self.scope, name)? {
            Value::Integer(n) => match n.checked_add(1) {
                Some(n) => Value::Integer(n),
                None => return Err(RuntimeError::Overflow("++>".to_string())),
            },
            Value::Float(x) => Value::Float(x + 1.0),
            other => {
                return Err(RuntimeError::Type(format!(
                    "cannot increment {}",
                    other.type_name()
                )))
            }
        };
        self.environment.assign(self.scope, name, value.clone())?;
        Ok(value)
    }
    /// The first pattern equal to the scrutinee wins. Failing that, the first
    /// truthy pattern, then `else`.
    fn gate(&mut self, condition: &Node, branches: &[GateBranch]) -> Result<Value, RuntimeError> {
        let scrutinee = self.evaluate(condition)?;
        let mut chosen: Option<&GateBranch> = None;
        let mut fallback: Option<&GateBranch> = None;
        let mut truthy: Option<&GateBranch> = None;
        for branch in branches {
            match &branch.pattern {
                Pattern::Else => {
                    fallback = Some(branch);
                    break;
                }
                Pattern::Expression(pattern) => {
                    let value = self.evaluate(pattern)?;
                    if value.equals(&scrutinee) {
                        chosen = Some(branch);
                        break;
                    }
                    if truthy.is_none() && value.is_truthy() {
                        truthy = Some(branch);
                    }
                }
            }
        }
        match chosen.or(truthy).or(fallback) {
            Some(branch) => self.block(&branch.body),
            None => Ok(Value::Null),
        }
    }
}

fn binary(operator: BinaryOperator, left: &Value, right: &Value) -> Result<Value, RuntimeError> {
    match operator {
        BinaryOperator::Equal => Ok(Value::Boolean(left.equals(right))),
        BinaryOperator::NotEqual => Ok(Value::Boolean(!left.equals(right))),
        BinaryOperator::Or => Ok(if left.is_truthy() {
            left.clone()
        } else {
            right.clone()
        }),
        BinaryOperator::Less
        | BinaryOperator::Greater
        | BinaryOperator::LessEqual
        | BinaryOperator::GreaterEqual => compare(operator, left, right),
        BinaryOperator::Add => add(operator, left, right),
        BinaryOperator::Combine => combine(left, right),
        BinaryOperator::Subtract
        | BinaryOperator::Multiply
        | BinaryOperator::Divide
        | BinaryOperator::Modulo => arithmetic(operator, left, right),
    }
}

fn type_error(operator: BinaryOperator, left: &Value, right: &Value) -> RuntimeError {
    RuntimeError::Type(format!(
        "unsupported operands for '{}': {} and {}",
        operator,
        left.type_name(),
        right.type_name()
    ))
}

fn as_float(value: &Value) -> Option<f64> {
    match value {
        Value::Integer(n) => Some(*n as f64),
        Value::Float(x) => Some(*x),
        _ => None,
    }
}

fn add(operator: BinaryOperator, left: &Value, right: &Value) -> Result<Value, RuntimeError> {
    match (left, right) {
        (Value::String(l), Value::String(r)) => Ok(Value::String(format!("{}{}", l, r))),
        (Value::Pool(l), Value::Pool(r)) => Ok(Value::pool(
            l.borrow().iter().chain(r.borrow().iter()).cloned().collect(),
        )),
        _ => arithmetic(operator, left, right),
    }
}

fn combine(left: &Value, right: &Value) -> Result<Value, RuntimeError> {
    match (left, right) {
        (Value::KeyedPool(l), Value::KeyedPool(r)) => {
            let mut merged = l.borrow().clone();
            for (key, value) in r.borrow().iter() {
                merged.insert(key.clone(), value.clone());
            }
            Ok(Value::keyed_pool(merged))
        }
        (Value::Pool(_), Value::Pool(_)) | (Value::String(_), Value::String(_)) => {
            add(BinaryOperator::Combine, left, right)
        }
        (Value::Pool(l), _) => {
            let mut elements = l.borrow().clone();
            elements.push(right.clone());
            Ok(Value::pool(elements))
        }
        _ => arithmetic(BinaryOperator::Combine, left, right),
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Arithmetic {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

fn arithmetic(operator: BinaryOperator, left: &Value, right: &Value) -> Result<Value, RuntimeError> {
    let op = match operator {
        BinaryOperator::Add | BinaryOperator::Combine => Arithmetic::Add,
        BinaryOperator::Subtract => Arithmetic::Subtract,
        BinaryOperator::Multiply => Arithmetic::Multiply,
        BinaryOperator::Divide => Arithmetic::Divide,
        BinaryOperator::Modulo => Arithmetic::Modulo,
        _ => return Err(type_error(operator, left, right)),
    };
    match (left, right) {
        (Value::Integer(l), Value::Integer(r)) => match integer(op, *l, *r)? {
            Some(value) => Ok(value),
            None => Err(RuntimeError::Overflow(operator.to_string())),
        },
        (Value::String(s), Value::Integer(n)) | (Value::Integer(n), Value::String(s))
            if op == Arithmetic::Multiply =>
        {
            repeat(s, *n)
                .map(Value::String)
                .ok_or_else(|| RuntimeError::Overflow(operator.to_string()))
        }
        _ => match (as_float(left), as_float(right)) {
            (Some(l), Some(r)) => float(op, l, r),
            _ => Err(type_error(operator, left, right)),
        },
    }
}

/// `None` when the result would pass `MAX_STRING_LEN`.
fn repeat(s: &str, count: i64) -> Option<String> {
    let count = usize::try_from(count.max(0)).ok()?;
    match s.len().checked_mul(count) {
        Some(len) if len <= MAX_STRING_LEN => Some(s.repeat(count)),
        _ => None,
    }
}

/// `Ok(None)` on overflow.
fn integer(op: Arithmetic, l: i64, r: i64) -> Result<Option<Value>, RuntimeError> {
    let result = match op {
        Arithmetic::Add => l.checked_add(r),
        Arithmetic::Subtract => l.checked_sub(r),
        Arithmetic::Multiply => l.checked_mul(r),
        Arithmetic::Divide => {
            if r == 0 {
                return Err(RuntimeError::ZeroDivision("division by zero".to_string()));
            }
            return Ok(Some(Value::Float(l as f64 / r as f64)));
        }
        Arithmetic::Modulo => {
            if r == 0 {
                return Err(RuntimeError::ZeroDivision("modulo by zero".to_string()));
            }
            // Floored: the result takes the sign of the divisor.
            l.checked_rem(r)
                .map(|m| if m != 0 && (m < 0) != (r < 0) { m + r } else { m })
        }
    };
    Ok(result.map(Value::Integer))
}

fn float(op: Arithmetic, l: f64, r: f64) -> Result<Value, RuntimeError> {
    let result = match op {
        Arithmetic::Add => l + r,
        Arithmetic::Subtract => l - r,
        Arithmetic::Multiply => l * r,
        Arithmetic::Divide => {
            if r == 0.0 {
                return Err(RuntimeError::ZeroDivision("division by zero".to_string()));
            }
            l / r
        }
        Arithmetic::Modulo => {
            if r == 0.0 {
                return Err(RuntimeError::ZeroDivision("modulo by zero".to_string()));
            }
            let m = l % r;
            if m != 0.0 && (m < 0.0) != (r < 0.0) {
                m + r
            } else {
                m
            }
        }
    };
    Ok(Value::Float(result))
}

fn compare(operator: BinaryOperator, left: &Value, right: &Value) -> Result<Value, RuntimeError> {
    let ordering = match (left, right) {
        (Value::String(l), Value::String(r)) => l.partial_cmp(r),
        (Value::Integer(l), Value::Integer(r)) => l.partial_cmp(r),
        _ => match (as_float(left), as_float(right)) {
            (Some(l), Some(r)) => l.partial_cmp(&r),
            _ => return Err(type_error(operator, left, right)),
        },
    };
    let result = ordering.map_or(false, |ordering| match operator {
        BinaryOperator::Less => ordering.is_lt(),
        BinaryOperator::Greater => ordering.is_gt(),
        BinaryOperator::LessEqual => ordering.is_le(),
        _ => ordering.is_ge(),
    });
    Ok(Value::Boolean(result))
}

#[cfg(test)]
mod interpreter_tests {
    use crate::error::RuntimeError;
    use crate::interpreter::Interpreter;
    use crate::parser::parse;
    use crate::scanner::tokenize;
    use crate::value::Value;
    use indexmap::IndexMap;

    fn eval(interpreter: &mut Interpreter, source: &str) -> Result<Value, RuntimeError> {
        let program = parse(&tokenize(source).unwrap()).unwrap();
        interpreter.interpret(&program)
    }

    fn run(source: &str) -> Result<Value, RuntimeError> {
        eval(&mut Interpreter::new(), source)
    }

    #[test]
    fn arithmetic() {
        assert_eq!(run("7 / 2").unwrap(), Value::Float(3.5));
        assert_eq!(run("6 / 3").unwrap(), Value::Float(2.0));
        assert_eq!(run("7 % -3").unwrap(), Value::Integer(-2));
        assert_eq!(run("-7 % 3").unwrap(), Value::Integer(2));
        assert_eq!(run("1 + 2.5").unwrap(), Value::Float(3.5));
        assert_eq!(run("\"ab\" * 3").unwrap(), Value::from("ababab"));
        assert_eq!(run("2 * \"ab\"").unwrap(), Value::from("abab"));
        assert_eq!(run("\"ab\" + \"cd\"").unwrap(), Value::from("abcd"));
        assert_eq!(run("\"ab\" * -2").unwrap(), Value::from(""));
        assert_eq!(
            run("\"ab\" * 9223372036854775807"),
            Err(RuntimeError::Overflow("*".to_string()))
        );
        assert_eq!(
            run("\"ab\" * 100000000"),
            Err(RuntimeError::Overflow("*".to_string()))
        );
        assert_eq!(
            run("\"a\" * \"b\""),
            Err(RuntimeError::Type(
                "unsupported operands for '*': str and str".to_string()
            ))
        );
        assert_eq!(
            run("9223372036854775807 + 1"),
            Err(RuntimeError::Overflow("+".to_string()))
        );
        assert_eq!(
            run("1 / 0"),
            Err(RuntimeError::ZeroDivision("division by zero".to_string()))
        );
        assert_eq!(
            run("\"a\" + 1"),
            Err(RuntimeError::Type(
                "unsupported operands for '+': str and num".to_string()
            ))
        );
    }

    #[test]
    fn comparison_and_or() {
        assert_eq!(run("1 < 2.5").unwrap(), Value::Boolean(true));
        assert_eq!(run("\"a\" < \"b\"").unwrap(), Value::Boolean(true));
        assert_eq!(run("3 >= 3").unwrap(), Value::Boolean(true));
        assert_eq!(run("true == 1").unwrap(), Value::Boolean(false));
        assert_eq!(run("0 | \"x\"").unwrap(), Value::from("x"));
        assert_eq!(run("2 | \"x\"").unwrap(), Value::from(2));
        assert_eq!(
            run("[: a = 1, b = 2 :] == [: b = 2, a = 1 :]").unwrap(),
            Value::Boolean(true)
        );
        assert!(matches!(run("1 < \"a\""), Err(RuntimeError::Type(_))));
    }

    #[test]
    fn combine() {
        assert_eq!(run("1 ++ 2").unwrap(), Value::from(3));
        assert_eq!(run("\"a\" ++ \"b\"").unwrap(), Value::from("ab"));
        assert_eq!(
            run("[| 1 |] ++ 2").unwrap(),
            Value::pool(vec![Value::from(1), Value::from(2)])
        );
        let mut merged = IndexMap::new();
        merged.insert("a".to_string(), Value::from(2));
        merged.insert("b".to_string(), Value::from(3));
        assert_eq!(
            run("[: a = 1 :] ++ [: a = 2, b = 3 :]").unwrap(),
            Value::keyed_pool(merged)
        );
    }

    #[test]
    fn gate_prefers_equality_then_truthiness() {
        assert_eq!(
            run("~gate 5 ? 1 => \"a\" | 5 => \"b\" | else => \"c\"").unwrap(),
            Value::from("b")
        );
        assert_eq!(
            run("~gate 0 ? 1 => \"a\" | else => \"c\"").unwrap(),
            Value::from("a")
        );
        assert_eq!(
            run("~gate 0 ? false => \"f\" | 0 => \"z\"").unwrap(),
            Value::from("z")
        );
        assert_eq!(run("~gate 3 ? 0 => 1").unwrap(), Value::Null);
        assert_eq!(run("~gate 3 ? 0 => 1 | else => 2").unwrap(), Value::from(2));
    }

    #[test]
    fn increments_write_back() {
        let mut interpreter = Interpreter::new();
        eval(&mut interpreter, "@var x = 0").unwrap();
        for expected in 1..=3 {
            assert_eq!(eval(&mut interpreter, "x ++>").unwrap(), Value::from(expected));
        }
        assert_eq!(eval(&mut interpreter, "@var f = 0.5\nf ++>").unwrap(), Value::from(1.5));
        assert_eq!(
            run("#var y = 1\ny ++>"),
            Err(RuntimeError::ImmutableWrite("y".to_string()))
        );
        assert_eq!(run("z ++>"), Err(RuntimeError::Name("z".to_string())));
    }

    #[test]
    fn flows_bind_or_call() {
        assert_eq!(run("4 => fresh\nfresh").unwrap(), Value::from(4));
        assert_eq!(run("missing"), Err(RuntimeError::Name("missing".to_string())));
        assert_eq!(run("1 <> 2").unwrap(), Value::from(2));
        assert_eq!(run("1 => (2 + 3)").unwrap(), Value::from(5));
        assert_eq!(run("5 => type_of => length").unwrap(), Value::from(3));
        assert_eq!(run("1 => copy => type_of").unwrap(), Value::from("num"));
        assert_eq!(
            run("9 => length"),
            Err(RuntimeError::Type("no length for num".to_string()))
        );
        assert_eq!(
            run("print = 1"),
            Err(RuntimeError::ImmutableWrite("print".to_string()))
        );
    }

    #[test]
    fn contexts() {
        let mut interpreter = Interpreter::new();
        eval(
            &mut interpreter,
            "~context split @in: n @out: half, rest {\n n / 2 => half\n n % 2 => rest\n}",
        )
        .unwrap();
        let mut expected = IndexMap::new();
        expected.insert("half".to_string(), Value::from(4.5));
        expected.insert("rest".to_string(), Value::from(1));
        assert_eq!(
            eval(&mut interpreter, "9 => split").unwrap(),
            Value::keyed_pool(expected)
        );
        eval(&mut interpreter, "~context noop @in: n @out: r { n }").unwrap();
        assert_eq!(eval(&mut interpreter, "1 => noop").unwrap(), Value::Null);
        assert_eq!(
            eval(&mut interpreter, "double => x"),
            Err(RuntimeError::Name("double".to_string()))
        );
    }

    #[test]
    fn closures_are_lexical() {
        let source = "@var base = 10\n\
                      ~context add @in: n @out: r { n + base => r }\n\
                      ~context run @in: base @out: r { 1 => add => r }\n\
                      5 => run";
        assert_eq!(run(source).unwrap(), Value::from(11));
    }

    #[test]
    fn invoke_binds_named_arguments() {
        let mut interpreter = Interpreter::new();
        let context = match eval(&mut interpreter, "~context sum @in: a, b @out: r { a + b => r }")
            .unwrap()
        {
            Value::Context(context) => context,
            other => panic!("unexpected value {:?}", other),
        };
        let mut arguments = IndexMap::new();
        arguments.insert("a".to_string(), Value::from(2));
        arguments.insert("b".to_string(), Value::from(5));
        let outputs = interpreter.invoke(&context, arguments).unwrap();
        assert_eq!(outputs.get("r"), Some(&Value::from(7)));

        let mut arguments = IndexMap::new();
        arguments.insert("a".to_string(), Value::from(2));
        assert!(matches!(
            interpreter.invoke(&context, arguments),
            Err(RuntimeError::Type(_))
        ));
        assert_eq!(interpreter.environment().live_scopes(), 1);
    }

    #[test]
    fn reactions_run_when_triggered() {
        let mut interpreter = Interpreter::new();
        eval(
            &mut interpreter,
            "@var hits = 0\n~reaction bump ? hits < 2 { hits ++> }",
        )
        .unwrap();
        assert_eq!(interpreter.trigger("bump").unwrap(), Value::from(1));
        assert_eq!(interpreter.trigger("bump").unwrap(), Value::from(2));
        assert_eq!(interpreter.trigger("bump").unwrap(), Value::Null);
        assert_eq!(
            interpreter.trigger("nope"),
            Err(RuntimeError::Name("nope".to_string()))
        );
    }

    #[test]
    fn failures_keep_earlier_bindings() {
        let mut interpreter = Interpreter::new();
        assert!(eval(&mut interpreter, "@var a = 1\nmissing\n@var b = 2").is_err());
        let globals = interpreter.globals();
        assert_eq!(globals.get("a"), Some(&Value::from(1)));
        assert!(globals.get("b").is_none());
        assert!(globals.get("print").is_none());
    }
}
