pub mod ast;
pub mod callable;
pub mod environment;
pub mod error;
pub mod interpreter;
pub mod parser;
pub mod scanner;
pub mod token;
pub mod value;

pub use crate::error::NexusError;
pub use crate::interpreter::Interpreter;
pub use crate::value::Value;

/// Tokenizes, parses and runs `source` in a fresh interpreter.
///
/// Deep context recursion needs a large stack before the default call limit
/// is reached; build an `Interpreter` with `with_max_depth` for small ones.
pub fn run(source: &str) -> Result<Value, NexusError> {
    Interpreter::new().eval_source(source)
}
