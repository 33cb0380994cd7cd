//! Formula façade: raw text plus its lazily compiled program

use crate::error::{FormulaResult, ParseError};
use crate::evaluator::{evaluate_with_registry, EvaluationContext};
use crate::functions::{default_registry, FunctionRegistry};
use crate::parser::{to_postfix_with_options, FormulaOptions};
use crate::program::PostfixProgram;

/// A formula's source text and, once compiled, its postfix program
///
/// # Example
/// ```rust
/// use kpi_formula::Formula;
/// use std::collections::HashMap;
///
/// let mut formula = Formula::new("\"revenue\" - \"cost\"").unwrap();
/// let ctx = HashMap::from([
///     ("\"revenue\"".to_string(), 120.0),
///     ("\"cost\"".to_string(), 80.0),
/// ]);
/// assert_eq!(formula.evaluate(Some(&ctx)).unwrap(), 40.0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Formula {
    text: String,
    options: FormulaOptions,
    program: Option<PostfixProgram>,
}

impl Formula {
    /// Create a formula from text (not compiled until first use)
    pub fn new(text: &str) -> FormulaResult<Self> {
        Self::with_options(text, FormulaOptions::default())
    }

    /// Create a formula with custom compilation limits
    pub fn with_options(text: &str, options: FormulaOptions) -> FormulaResult<Self> {
        let mut formula = Self {
            text: String::new(),
            options,
            program: None,
        };
        formula.set_formula(text)?;
        Ok(formula)
    }

    /// Replace the formula text, discarding any compiled program
    pub fn set_formula(&mut self, text: &str) -> FormulaResult<()> {
        if text.is_empty() {
            return Err(ParseError::EmptyInput.into());
        }
        self.text = text.to_string();
        self.program = None;
        Ok(())
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether a compiled program is cached
    pub fn is_compiled(&self) -> bool {
        self.program.is_some()
    }

    /// Compile the current text without touching the cache
    pub fn compile(&self) -> FormulaResult<PostfixProgram> {
        if self.text.is_empty() {
            return Err(ParseError::EmptyInput.into());
        }
        to_postfix_with_options(&self.text, &self.options)
    }

    /// The postfix program for the current text, compiling it if needed
    pub fn to_postfix(&mut self) -> FormulaResult<&PostfixProgram> {
        let program = match self.program.take() {
            Some(program) => program,
            None => self.compile()?,
        };
        Ok(&*self.program.insert(program))
    }

    /// Evaluate with the built-in function registry
    pub fn evaluate(&mut self, ctx: Option<&dyn EvaluationContext>) -> FormulaResult<f64> {
        self.evaluate_with_registry(ctx, default_registry())
    }

    /// Evaluate with a custom function registry
    pub fn evaluate_with_registry(
        &mut self,
        ctx: Option<&dyn EvaluationContext>,
        registry: &FunctionRegistry,
    ) -> FormulaResult<f64> {
        let program = self.to_postfix()?;
        Ok(evaluate_with_registry(program, ctx, registry)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EvalError, FormulaError, LexError};
    use std::collections::HashMap;

    #[test]
    fn test_set_formula_rejects_empty() {
        assert_eq!(
            Formula::new("").unwrap_err(),
            FormulaError::Parse(ParseError::EmptyInput)
        );

        let mut formula = Formula::new("1").unwrap();
        assert!(formula.set_formula("").is_err());
        assert_eq!(formula.text(), "1");
    }

    #[test]
    fn test_default_formula_is_empty() {
        let mut formula = Formula::default();
        assert_eq!(
            formula.to_postfix().unwrap_err(),
            FormulaError::Parse(ParseError::EmptyInput)
        );
    }

    #[test]
    fn test_compile_is_lazy_and_cached() {
        let mut formula = Formula::new("1+SUM(25,2)").unwrap();
        assert!(!formula.is_compiled());

        let first = formula.to_postfix().unwrap().clone();
        assert!(formula.is_compiled());
        assert_eq!(&first, formula.to_postfix().unwrap());
        assert_eq!(formula.evaluate(None).unwrap(), 28.0);
    }

    #[test]
    fn test_failed_compile_is_not_cached() {
        let mut formula = Formula::new("1+").unwrap();
        assert!(formula.to_postfix().is_err());
        assert!(!formula.is_compiled());
        assert!(formula.to_postfix().is_err());

        formula.set_formula("1+2").unwrap();
        assert_eq!(formula.to_postfix().unwrap().to_string(), "1 2 +");
        assert!(formula.is_compiled());
    }

    #[test]
    fn test_set_formula_invalidates_program() {
        let mut formula = Formula::new("1+1").unwrap();
        assert_eq!(formula.evaluate(None).unwrap(), 2.0);

        formula.set_formula("2*3").unwrap();
        assert!(!formula.is_compiled());
        assert_eq!(formula.to_postfix().unwrap().to_string(), "2 3 *");
        assert_eq!(formula.evaluate(None).unwrap(), 6.0);
    }

    #[test]
    fn test_errors_by_stage() {
        let mut formula = Formula::new("1+\"x").unwrap();
        assert!(matches!(
            formula.to_postfix(),
            Err(FormulaError::Lex(LexError::UnterminatedString { .. }))
        ));

        let mut formula = Formula::new("(1+2").unwrap();
        assert!(matches!(
            formula.evaluate(None),
            Err(FormulaError::Parse(ParseError::UnmatchedLeftParen { .. }))
        ));

        let mut formula = Formula::new("\"x\"/0").unwrap();
        let err = formula.evaluate(None).unwrap_err();
        assert!(err.is_recoverable());

        let ctx = HashMap::from([("\"x\"".to_string(), 1.0)]);
        assert_eq!(
            formula.evaluate(Some(&ctx)).unwrap_err(),
            FormulaError::Eval(EvalError::DivisionByZero)
        );
    }

    #[test]
    fn test_options_apply() {
        let options = FormulaOptions {
            max_nesting_depth: 1,
            ..Default::default()
        };
        let formula = Formula::with_options("((1))", options).unwrap();
        assert!(matches!(
            formula.compile(),
            Err(FormulaError::Parse(ParseError::NestingTooDeep { .. }))
        ));
    }
}
