//! Postfix evaluator
//!
//! Walks a [`PostfixProgram`] with a value stack. References are resolved
//! through an [`EvaluationContext`] supplied by the caller; functions are
//! dispatched through a [`FunctionRegistry`].

use crate::error::EvalError;
use crate::functions::{default_registry, FunctionRegistry};
use crate::program::{PostfixProgram, PostfixToken};
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

/// Host capability resolving reference keys to values
///
/// `key` is the literal as written in the formula, quotes included
/// (`"\"revenue\""`). Returning `None` reports the key as unresolved.
pub trait EvaluationContext {
    fn resolve(&self, key: &str) -> Option<f64>;
}

impl<C: EvaluationContext + ?Sized> EvaluationContext for &C {
    fn resolve(&self, key: &str) -> Option<f64> {
        (**self).resolve(key)
    }
}

impl<S: BuildHasher> EvaluationContext for HashMap<String, f64, S> {
    fn resolve(&self, key: &str) -> Option<f64> {
        self.get(key).copied()
    }
}

impl EvaluationContext for BTreeMap<String, f64> {
    fn resolve(&self, key: &str) -> Option<f64> {
        self.get(key).copied()
    }
}

/// Adapts a closure into an [`EvaluationContext`]
///
/// ```rust
/// use kpi_formula::{evaluate, to_postfix, ResolveFn};
///
/// let program = to_postfix("\"a\"*2").unwrap();
/// let ctx = ResolveFn(|key: &str| (key == "\"a\"").then_some(21.0));
/// assert_eq!(evaluate(&program, Some(&ctx)), Ok(42.0));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ResolveFn<F>(pub F);

impl<F: Fn(&str) -> Option<f64>> EvaluationContext for ResolveFn<F> {
    fn resolve(&self, key: &str) -> Option<f64> {
        (self.0)(key)
    }
}

/// Evaluate a program against the built-in function registry
pub fn evaluate(
    program: &PostfixProgram,
    ctx: Option<&dyn EvaluationContext>,
) -> Result<f64, EvalError> {
    evaluate_with_registry(program, ctx, default_registry())
}

/// Evaluate a program
///
/// Without a context, any reference fails with [`EvalError::UnresolvedReference`].
pub fn evaluate_with_registry(
    program: &PostfixProgram,
    ctx: Option<&dyn EvaluationContext>,
    registry: &FunctionRegistry,
) -> Result<f64, EvalError> {
    let mut stack: Vec<f64> = Vec::with_capacity(program.len());
    let mut arities = program.arities().iter();

    for token in program.tokens() {
        let value = match token {
            PostfixToken::Number(n) => *n,
            PostfixToken::Reference(key) => ctx
                .and_then(|ctx| ctx.resolve(key))
                .ok_or_else(|| EvalError::UnresolvedReference(key.clone()))?,
            PostfixToken::Operator(op) => {
                let right = pop(&mut stack)?;
                let left = pop(&mut stack)?;
                op.apply(left, right)?
            }
            PostfixToken::Negate => -pop(&mut stack)?,
            PostfixToken::Function(name) => {
                let count = *arities.next().ok_or_else(|| {
                    EvalError::MalformedProgram(format!("no argument count for {}", name))
                })?;
                if count > stack.len() {
                    return Err(underflow());
                }
                // split_off keeps the arguments in source order
                let args = stack.split_off(stack.len() - count);
                let function = registry
                    .get(name)
                    .ok_or_else(|| EvalError::UnknownFunction(name.clone()))?;
                function.call(name, &args)?
            }
        };
        stack.push(value);
    }

    if arities.next().is_some() {
        return Err(EvalError::MalformedProgram(
            "unused argument counts".to_string(),
        ));
    }
    match stack.as_slice() {
        [value] => Ok(*value),
        [] => Err(EvalError::MalformedProgram("empty program".to_string())),
        values => Err(EvalError::MalformedProgram(format!(
            "{} values left on the stack",
            values.len()
        ))),
    }
}

fn pop(stack: &mut Vec<f64>) -> Result<f64, EvalError> {
    stack.pop().ok_or_else(underflow)
}

fn underflow() -> EvalError {
    EvalError::MalformedProgram("stack underflow".to_string())
}
