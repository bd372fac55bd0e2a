use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
#[error("[line {line}:{column}] LexError: {message}")]
pub struct LexError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl LexError {
    pub fn new(message: impl Into<String>, line: usize, column: usize) -> LexError {
        LexError {
            message: message.into(),
            line,
            column,
        }
    }
}

/// Raised when the parser needs a token that is not there.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("[line {line}:{column}] SyntaxError: expected {expected}, found {found}")]
pub struct SyntaxError {
    pub expected: String,
    pub found: String,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error("NameError: undefined name '{0}'")]
    Name(String),
    #[error("ImmutableWriteError: cannot modify immutable binding '{0}'")]
    ImmutableWrite(String),
    #[error("TypeError: {0}")]
    Type(String),
    #[error("ZeroDivisionError: {0}")]
    ZeroDivision(String),
    #[error("OverflowError: integer overflow in '{0}'")]
    Overflow(String),
    #[error("RecursionError: context calls nested deeper than {0}")]
    Recursion(usize),
    #[error("OutputError: {0}")]
    Output(String),
}

/// Any failure of the tokenize, parse, interpret pipeline.
#[derive(Debug, Error)]
pub enum NexusError {
    #[error("{}", join_lines(.0))]
    Lex(Vec<LexError>),
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl From<Vec<LexError>> for NexusError {
    fn from(errors: Vec<LexError>) -> NexusError {
        NexusError::Lex(errors)
    }
}

fn join_lines(errors: &[LexError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<String>>()
        .join("\n")
}

#[cfg(test)]
mod error_tests {
    use crate::error::{LexError, NexusError, RuntimeError, SyntaxError};

    #[test]
    fn display_carries_kind_and_position() {
        let err = SyntaxError {
            expected: "')'".to_string(),
            found: "end of input".to_string(),
            line: 3,
            column: 7,
        };
        assert_eq!(
            err.to_string(),
            "[line 3:7] SyntaxError: expected ')', found end of input"
        );
        assert_eq!(
            RuntimeError::Name("x".to_string()).to_string(),
            "NameError: undefined name 'x'"
        );
    }

    #[test]
    fn lex_errors_are_reported_one_per_line() {
        let err = NexusError::from(vec![
            LexError::new("Unexpected character '$'", 1, 1),
            LexError::new("Unexpected character '^'", 2, 4),
        ]);
        assert_eq!(
            err.to_string(),
            "[line 1:1] LexError: Unexpected character '$'\n[line 2:4] LexError: Unexpected character '^'"
        );
    }
}
