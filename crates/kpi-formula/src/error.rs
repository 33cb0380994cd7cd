//! Formula error types
//!
//! Errors are split by pipeline stage: [`LexError`] and [`ParseError`] come
//! out of compilation, [`EvalError`] out of evaluation. [`FormulaError`] wraps
//! all three so `?` composes across stages.

use thiserror::Error;

/// Result type for formula operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// Any error raised while compiling or evaluating a formula
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormulaError {
    #[error("Lex error: {0}")]
    Lex(#[from] LexError),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Evaluation error: {0}")]
    Eval(#[from] EvalError),
}

impl FormulaError {
    /// Whether retrying evaluation later may succeed
    ///
    /// Only an unresolved reference qualifies: the referenced value may not
    /// have been computed yet. Everything else is a defect in the formula text
    /// or the function registry.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, FormulaError::Eval(EvalError::UnresolvedReference(_)))
    }
}

/// Errors raised by the tokenizer. Positions are byte offsets into the text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("unexpected character '{ch}' at {position}")]
    UnexpectedCharacter { ch: char, position: usize },

    #[error("unterminated string literal starting at {position}")]
    UnterminatedString { position: usize },

    #[error("malformed number '{text}' at {position}")]
    MalformedNumber { text: String, position: usize },

    #[error("identifier '{name}' at {position} must be followed by '('")]
    BareIdentifier { name: String, position: usize },
}

/// Structural errors raised by the shunting-yard converter
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("formula text is empty")]
    EmptyInput,

    #[error("expression is empty")]
    EmptyExpression,

    #[error("formula is {length} bytes long, limit is {limit}")]
    TooLong { length: usize, limit: usize },

    #[error("unmatched '(' at {position}")]
    UnmatchedLeftParen { position: usize },

    #[error("unmatched ')' at {position}")]
    UnmatchedRightParen { position: usize },

    #[error("function {name} called without arguments at {position}")]
    EmptyArgumentList { name: String, position: usize },

    #[error("function {name} at {position} is not followed by '('")]
    MissingCallParen { name: String, position: usize },

    #[error("missing operand at {position}")]
    MissingOperand { position: usize },

    #[error("unexpected operand at {position}")]
    UnexpectedOperand { position: usize },

    #[error("',' outside of a function call at {position}")]
    MisplacedComma { position: usize },

    #[error("nesting deeper than {limit} at {position}")]
    NestingTooDeep { limit: usize, position: usize },
}

/// Errors raised while evaluating a compiled program
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("unresolved reference {0}")]
    UnresolvedReference(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("unknown function {0}")]
    UnknownFunction(String),

    #[error("malformed program: {0}")]
    MalformedProgram(String),

    #[error("wrong number of arguments for {function}: expected {expected}, got {actual}")]
    ArgumentCount {
        function: String,
        expected: usize,
        actual: usize,
    },

    #[error("invalid argument for {function}: {reason}")]
    InvalidArgument { function: String, reason: String },
}
