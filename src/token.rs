use strum_macros::Display;

#[rustfmt::skip]
#[derive(Debug, Clone, PartialEq, Display)]
pub enum TokenType {
    // Literals.
    #[strum(serialize = "identifier")] Identifier(String),
    #[strum(serialize = "string")] String(String),
    #[strum(serialize = "integer")] Integer(i64),
    #[strum(serialize = "float")] Float(f64),

    // Keywords.
    #[strum(serialize = "'context'")] Context,
    #[strum(serialize = "'reaction'")] Reaction,
    #[strum(serialize = "'gate'")] Gate,
    #[strum(serialize = "'true'")] True,
    #[strum(serialize = "'false'")] False,
    #[strum(serialize = "'null'")] Null,
    #[strum(serialize = "'else'")] Else,
    #[strum(serialize = "'in'")] In,
    #[strum(serialize = "'out'")] Out,

    // Flow operators.
    #[strum(serialize = "'=>'")] FlowForward,
    #[strum(serialize = "'<='")] FlowBackward,
    #[strum(serialize = "'<>'")] FlowBoth,
    #[strum(serialize = "'@>'")] FlowChannel,
    #[strum(serialize = "'<@'")] FlowChannelRev,
    #[strum(serialize = "'++>'")] IncrementFlow,

    // Pool delimiters.
    #[strum(serialize = "'[|'")] PoolStart,
    #[strum(serialize = "'|]'")] PoolEnd,
    #[strum(serialize = "'[:'")] KeyedStart,
    #[strum(serialize = "':]'")] KeyedEnd,

    // Branching and markers.
    #[strum(serialize = "'?'")] Question,
    #[strum(serialize = "'?:'")] Quantum,
    #[strum(serialize = "'|'")] Pipe,
    #[strum(serialize = "'@'")] At,
    #[strum(serialize = "'#'")] Hash,
    #[strum(serialize = "'~'")] Tilde,

    // Delimiters.
    #[strum(serialize = "'('")] LeftParen,
    #[strum(serialize = "')'")] RightParen,
    #[strum(serialize = "'{'")] LeftBrace,
    #[strum(serialize = "'}'")] RightBrace,
    #[strum(serialize = "','")] Comma,
    #[strum(serialize = "':'")] Colon,
    #[strum(serialize = "'.'")] Dot,
    #[strum(serialize = "';'")] Semicolon,
    #[strum(serialize = "'='")] Equal,

    // Arithmetic.
    #[strum(serialize = "'+'")] Plus,
    #[strum(serialize = "'++'")] PlusPlus,
    #[strum(serialize = "'-'")] Minus,
    #[strum(serialize = "'*'")] Star,
    #[strum(serialize = "'/'")] Slash,
    #[strum(serialize = "'%'")] Percent,

    // Comparison.
    #[strum(serialize = "'=='")] EqualEqual,
    #[strum(serialize = "'!='")] BangEqual,
    #[strum(serialize = "'<'")] Less,
    #[strum(serialize = "'>'")] Greater,
    #[strum(serialize = "'>='")] GreaterEqual,

    #[strum(serialize = "end of input")] EOF
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub tokentype: TokenType,
    pub lexeme: String,
    pub line: usize,
    pub column: usize,
}
