//! Operator metadata: precedence, associativity and arity per symbol

use crate::error::EvalError;

/// Associativity of an operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Associativity {
    Left,
    Right,
}

/// Static metadata for one operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatorSpec {
    pub symbol: char,
    pub precedence: u8,
    pub associativity: Associativity,
    /// Number of operands (1 or 2)
    pub arity: u8,
}

/// Binary arithmetic operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Power,
}

/// Prefix operators. `+` and `-` share their symbol with the binary forms and
/// are told apart by position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    Negate,
    Plus,
}

/// Precedence shared by all prefix operators; binds tighter than any binary operator
pub const UNARY_PRECEDENCE: u8 = 5;

impl BinaryOperator {
    /// Every binary operator, in precedence order
    pub const ALL: [BinaryOperator; 6] = [
        BinaryOperator::Add,
        BinaryOperator::Subtract,
        BinaryOperator::Multiply,
        BinaryOperator::Divide,
        BinaryOperator::Modulo,
        BinaryOperator::Power,
    ];

    /// Source symbol
    pub fn symbol(self) -> char {
        match self {
            BinaryOperator::Add => '+',
            BinaryOperator::Subtract => '-',
            BinaryOperator::Multiply => '*',
            BinaryOperator::Divide => '/',
            BinaryOperator::Modulo => '%',
            BinaryOperator::Power => '^',
        }
    }

    /// Parse a source symbol
    pub fn from_symbol(symbol: char) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.symbol() == symbol)
    }

    pub fn spec(self) -> OperatorSpec {
        let (precedence, associativity) = match self {
            BinaryOperator::Add | BinaryOperator::Subtract => (1, Associativity::Left),
            BinaryOperator::Multiply | BinaryOperator::Divide | BinaryOperator::Modulo => {
                (2, Associativity::Left)
            }
            BinaryOperator::Power => (4, Associativity::Right),
        };
        OperatorSpec {
            symbol: self.symbol(),
            precedence,
            associativity,
            arity: 2,
        }
    }

    /// Whether this operator's sign counterpart exists as a prefix operator
    pub fn as_unary(self) -> Option<UnaryOperator> {
        match self {
            BinaryOperator::Add => Some(UnaryOperator::Plus),
            BinaryOperator::Subtract => Some(UnaryOperator::Negate),
            _ => None,
        }
    }

    /// Apply the operator to two operands
    ///
    /// `%` follows truncated division: the result takes the sign of `left`.
    pub fn apply(self, left: f64, right: f64) -> Result<f64, EvalError> {
        match self {
            BinaryOperator::Add => Ok(left + right),
            BinaryOperator::Subtract => Ok(left - right),
            BinaryOperator::Multiply => Ok(left * right),
            BinaryOperator::Divide | BinaryOperator::Modulo if right == 0.0 => {
                Err(EvalError::DivisionByZero)
            }
            BinaryOperator::Divide => Ok(left / right),
            BinaryOperator::Modulo => Ok(left % right),
            BinaryOperator::Power => Ok(left.powf(right)),
        }
    }
}

impl UnaryOperator {
    pub fn spec(self) -> OperatorSpec {
        OperatorSpec {
            symbol: match self {
                UnaryOperator::Negate => '-',
                UnaryOperator::Plus => '+',
            },
            precedence: UNARY_PRECEDENCE,
            associativity: Associativity::Right,
            arity: 1,
        }
    }
}
