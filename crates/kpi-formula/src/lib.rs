//! # kpi-formula
//!
//! Formula engine for kpi-tracker.
//!
//! A KPI's value can be defined as an arithmetic expression over constants,
//! other KPIs (quoted references such as `"revenue"`) and aggregate functions:
//!
//! ```text
//! ("revenue" - "cost") / "revenue" * 100
//! SUM("north", "south", "west") / 3
//! ```
//!
//! This crate provides:
//! - Tokenizing (text → tokens)
//! - Shunting-yard compilation (tokens → postfix program + arity table)
//! - Postfix evaluation with host-supplied reference resolution
//! - A function registry with the aggregate functions
//! - Dependency tracking between formula-defined KPIs
//!
//! ## Example
//!
//! ```rust
//! use kpi_formula::{evaluate, to_postfix};
//!
//! let program = to_postfix("1+2^(+1.5*2+2)").unwrap();
//! assert_eq!(program.to_string(), "1 2 1.5 2 * 2 + ^ +");
//! assert_eq!(evaluate(&program, None).unwrap(), 33.0);
//! ```

pub mod dependency;
pub mod error;
pub mod evaluator;
pub mod formula;
pub mod functions;
pub mod lexer;
pub mod operator;
pub mod parser;
pub mod program;

pub use dependency::DependencyGraph;
pub use error::{EvalError, FormulaError, FormulaResult, LexError, ParseError};
pub use evaluator::{evaluate, evaluate_with_registry, EvaluationContext, ResolveFn};
pub use formula::Formula;
pub use functions::{default_registry, Arity, FunctionDef, FunctionImpl, FunctionRegistry};
pub use lexer::{tokenize, Token, TokenKind};
pub use operator::{Associativity, BinaryOperator, OperatorSpec, UnaryOperator};
pub use parser::{convert, to_postfix, to_postfix_with_options, FormulaOptions};
pub use program::{reference_name, PostfixProgram, PostfixToken};
