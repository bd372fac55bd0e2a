use indexmap::IndexMap;
use nexus::error::RuntimeError;
use nexus::{Interpreter, NexusError, Value};
use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;
use std::thread;

const FIBONACCI_PIPES: &str = "
~context fibonacci n {
    ? n <= 1 => n
    | n > 1 => {
        (n - 1) => n1
        (n - 2) => n2
        fibonacci n1 => fib1
        fibonacci n2 => fib2
        (fib1 ++ fib2) => result
        result
    }
}
10 => input
fibonacci input => sequence
";

const FIBONACCI_GUARDS: &str = "
~context fibonacci n {
    ? n <= 1 => n
    ? n > 1 => {
        (n - 1) => n1
        (n - 2) => n2
        fibonacci n1 => fib1
        fibonacci n2 => fib2
        (fib1 ++ fib2) => result
        result
    }
} ; 10 => input ; fibonacci input => sequence
";

const FIBONACCI_ONE_LINE: &str = "~context fibonacci n { ? n <= 1 => n | n > 1 => { (n-1) => n1 (n-2) => n2 fibonacci n1 => fib1 fibonacci n2 => fib2 (fib1 ++ fib2) => result result } } ; 10 => input ; fibonacci input => sequence";

#[derive(Clone, Default)]
struct Capture(Rc<RefCell<Vec<u8>>>);

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Capture {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

fn global(interpreter: &Interpreter, name: &str) -> Value {
    interpreter
        .globals()
        .get(name)
        .cloned()
        .unwrap_or_else(|| panic!("{} is not bound", name))
}

#[test]
fn fibonacci_of_ten_is_55() {
    for source in &[FIBONACCI_PIPES, FIBONACCI_GUARDS, FIBONACCI_ONE_LINE] {
        let mut interpreter = Interpreter::new();
        assert_eq!(interpreter.eval_source(source).unwrap(), Value::Integer(55));
        assert_eq!(global(&interpreter, "sequence"), Value::Integer(55));
        assert_eq!(global(&interpreter, "input"), Value::Integer(10));
        assert!(interpreter.globals().get("fib1").is_none());
    }
}

#[test]
fn statements_can_share_a_line() {
    let mut interpreter = Interpreter::new();
    interpreter.eval_source("1 => a 2 => b").unwrap();
    assert_eq!(global(&interpreter, "a"), Value::from(1));
    assert_eq!(global(&interpreter, "b"), Value::from(2));
}

#[test]
fn invocations_do_not_leak() {
    let mut interpreter = Interpreter::new();
    interpreter
        .eval_source("~context double @in: n @out: r { n * 2 => r }")
        .unwrap();
    let double = match global(&interpreter, "double") {
        Value::Context(context) => context,
        other => panic!("unexpected value {:?}", other),
    };
    let before = interpreter.environment().live_scopes();
    for (input, expected) in &[(3, 6), (10, 20)] {
        let mut arguments = IndexMap::new();
        arguments.insert("n".to_string(), Value::from(*input));
        let outputs = interpreter.invoke(&double, arguments).unwrap();
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs.get("r"), Some(&Value::from(*expected)));
        assert_eq!(interpreter.environment().live_scopes(), before);
    }
    assert!(interpreter.globals().get("n").is_none());
    assert!(interpreter.globals().get("r").is_none());
    assert_eq!(interpreter.eval_source("3 => double").unwrap(), Value::from(6));
}

#[test]
fn nested_contexts_keep_their_closure() {
    let source = "~context outer @in: n @out: r {
        ~context inner @in: m @out: s { m + n => s }
        n => inner => r
    }
    2 => outer";
    assert_eq!(nexus::run(source).unwrap(), Value::from(4));
}

#[test]
fn gate_selects_the_equal_branch() {
    let value = nexus::run("~gate 5 ? 1 => \"a\" | 5 => \"b\" | else => \"c\"").unwrap();
    assert_eq!(value, Value::from("b"));
}

#[test]
fn increment_flow_counts_up() {
    let mut interpreter = Interpreter::new();
    interpreter.eval_source("@var x = 0").unwrap();
    let results: Vec<Value> = (0..3)
        .map(|_| interpreter.eval_source("x ++>").unwrap())
        .collect();
    assert_eq!(results, vec![Value::from(1), Value::from(2), Value::from(3)]);
    assert_eq!(global(&interpreter, "x"), Value::from(3));
}

#[test]
fn immutable_bindings_reject_flows() {
    match nexus::run("#var x = 1\n2 => x") {
        Err(NexusError::Runtime(RuntimeError::ImmutableWrite(name))) => assert_eq!(name, "x"),
        other => panic!("unexpected result {:?}", other),
    }
    let mut interpreter = Interpreter::new();
    interpreter.eval_source("@var x = 1\n2 => x").unwrap();
    assert_eq!(global(&interpreter, "x"), Value::from(2));
}

#[test]
fn pools_alias_between_bindings() {
    let mut interpreter = Interpreter::new();
    interpreter.eval_source("@var a = [| 1, 2 |]\na => b").unwrap();
    match global(&interpreter, "b") {
        Value::Pool(elements) => elements.borrow_mut().push(Value::from(3)),
        other => panic!("unexpected value {:?}", other),
    }
    assert_eq!(
        interpreter.eval_source("a").unwrap(),
        Value::pool(vec![Value::from(1), Value::from(2), Value::from(3)])
    );
}

#[test]
fn printing_goes_to_the_output_sink() {
    let capture = Capture::default();
    let mut interpreter = Interpreter::new().with_output(Box::new(capture.clone()));
    interpreter
        .eval_source("println \"hi\"\n42 => print\n[| 1, \"x\" |] => output\n2.0 => print")
        .unwrap();
    assert_eq!(capture.text(), "hi\n42\n[| 1, \"x\" |]\n2.0\n");
}

#[test]
fn lexical_errors_are_all_reported() {
    match nexus::run("@var x = $\n@var y = ^") {
        Err(NexusError::Lex(errors)) => {
            assert_eq!(errors.len(), 2);
            assert_eq!((errors[1].line, errors[1].column), (2, 10));
        }
        other => panic!("unexpected result {:?}", other),
    }
}

#[test]
fn runaway_recursion_is_stopped() {
    let stopped = thread::Builder::new()
        .stack_size(256 * 1024 * 1024)
        .spawn(|| {
            let result = nexus::run("~context forever @in: n { n => forever }\n1 => forever");
            matches!(
                result,
                Err(NexusError::Runtime(RuntimeError::Recursion(200)))
            )
        })
        .unwrap()
        .join()
        .unwrap();
    assert!(stopped);
}

#[test]
fn recursion_limit_fits_a_default_thread() {
    let stopped = thread::spawn(|| {
        let mut interpreter = Interpreter::new().with_max_depth(16);
        let result =
            interpreter.eval_source("~context forever @in: n { n => forever }\n1 => forever");
        matches!(
            result,
            Err(NexusError::Runtime(RuntimeError::Recursion(16)))
        )
    })
    .join()
    .unwrap();
    assert!(stopped);
}
