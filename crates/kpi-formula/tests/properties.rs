//! Property-based tests for the formula compiler and evaluator.
//!
//! These tests verify that:
//! 1. Compilation is a deterministic function of the text
//! 2. Operator-only formulas agree with a precedence-climbing reference evaluator
//! 3. Any formula that compiles is a well-formed program (no stack underflow,
//!    no leftover values, arity table fully consumed)
//! 4. `^` follows `f64::powf` for fractional exponents and groups to the right

use kpi_formula::{evaluate, to_postfix, BinaryOperator, EvalError, ResolveFn};
use proptest::prelude::*;

// Strategy helpers

fn operator_strategy() -> impl Strategy<Value = BinaryOperator> {
    prop::sample::select(BinaryOperator::ALL.to_vec())
}

/// A signed single-digit operand: (negated, digit)
fn operand_strategy() -> impl Strategy<Value = (bool, u8)> {
    (any::<bool>(), 0u8..10)
}

/// Flat operator chain without parentheses: `a op b op c ...`
fn chain_strategy() -> impl Strategy<Value = ((bool, u8), Vec<(BinaryOperator, (bool, u8))>)> {
    (
        operand_strategy(),
        prop::collection::vec((operator_strategy(), operand_strategy()), 0..8),
    )
}

fn render_chain(first: (bool, u8), rest: &[(BinaryOperator, (bool, u8))]) -> String {
    let render = |(negated, digit): (bool, u8)| {
        if negated {
            format!("-{}", digit)
        } else {
            digit.to_string()
        }
    };

    let mut text = render(first);
    for (op, operand) in rest {
        text.push(op.symbol());
        text.push_str(&render(*operand));
    }
    text
}

/// Reference evaluator by precedence climbing; prefix minus binds tightest
struct Reference<'a> {
    first: (bool, u8),
    rest: &'a [(BinaryOperator, (bool, u8))],
    next: usize,
}

impl Reference<'_> {
    fn operand(&self, index: usize) -> f64 {
        let (negated, digit) = if index == 0 {
            self.first
        } else {
            self.rest[index - 1].1
        };
        if negated {
            -(digit as f64)
        } else {
            digit as f64
        }
    }

    fn expression(&mut self, min_precedence: u8) -> Result<f64, EvalError> {
        let mut left = self.operand(self.next);

        while let Some((op, _)) = self.rest.get(self.next) {
            let spec = op.spec();
            if spec.precedence < min_precedence {
                break;
            }
            let next_min = match spec.associativity {
                kpi_formula::Associativity::Left => spec.precedence + 1,
                kpi_formula::Associativity::Right => spec.precedence,
            };
            let op = *op;
            self.next += 1;
            let right = self.expression(next_min)?;
            left = op.apply(left, right)?;
        }

        Ok(left)
    }
}

fn same(a: &Result<f64, EvalError>, b: &Result<f64, EvalError>) -> bool {
    match (a, b) {
        (Ok(x), Ok(y)) => x == y || (x.is_nan() && y.is_nan()),
        (Err(x), Err(y)) => x == y,
        _ => false,
    }
}

/// Arbitrary token soup over the formula alphabet
fn soup_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop::sample::select(vec![
            "1", "2.5", "\"x\"", "+", "-", "*", "/", "^", "%", "(", ")", ",", "SUM(", "MAX(",
        ]),
        0..16,
    )
    .prop_map(|parts| parts.concat())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    #[test]
    fn compilation_is_deterministic(text in soup_strategy()) {
        prop_assert_eq!(to_postfix(&text), to_postfix(&text));
    }

    #[test]
    fn operator_chains_match_reference((first, rest) in chain_strategy()) {
        let text = render_chain(first, &rest);
        let program = to_postfix(&text).unwrap();

        let expected = Reference { first, rest: &rest, next: 0 }.expression(0);
        let actual = evaluate(&program, None);
        prop_assert!(same(&actual, &expected), "{}: {:?} vs {:?}", text, actual, expected);
    }

    #[test]
    fn compiled_programs_are_well_formed(text in soup_strategy()) {
        if let Ok(program) = to_postfix(&text) {
            let ctx = ResolveFn(|_: &str| Some(3.0));
            let result = evaluate(&program, Some(&ctx));
            prop_assert!(
                !matches!(result, Err(EvalError::MalformedProgram(_))),
                "{} compiled to {} but evaluated to {:?}", text, program, result
            );
        }
    }

    #[test]
    fn modulo_keeps_dividend_sign(a in -1000i32..1000, b in 1i32..50) {
        let text = format!("{}%{}", a, b);
        let value = evaluate(&to_postfix(&text).unwrap(), None).unwrap();
        prop_assert_eq!(value, (a % b) as f64);
    }

    #[test]
    fn fractional_exponent_matches_powf(a in 1u32..1000, whole in 0u8..4, frac in 1u8..100) {
        let exponent: f64 = format!("{}.{:02}", whole, frac).parse().unwrap();
        let text = format!("{}^{}.{:02}", a, whole, frac);

        let value = evaluate(&to_postfix(&text).unwrap(), None).unwrap();
        prop_assert_eq!(value, (a as f64).powf(exponent));
        prop_assert!(value > 0.0);
    }

    #[test]
    fn negative_base_fractional_exponent_is_nan(a in 1u32..1000, frac in 1u8..100) {
        // Prefix minus binds tighter than `^`, so both spellings raise -a
        for text in [format!("(-{})^0.{:02}", a, frac), format!("-{}^0.{:02}", a, frac)] {
            let value = evaluate(&to_postfix(&text).unwrap(), None).unwrap();
            prop_assert!(value.is_nan(), "{} evaluated to {}", text, value);
        }
    }

    #[test]
    fn power_groups_to_the_right(a in 1u32..5, b in 1u32..4, c in 1u32..4) {
        let text = format!("{}^{}^{}", a, b, c);
        let value = evaluate(&to_postfix(&text).unwrap(), None).unwrap();

        let expected = u64::from(a).pow(b.pow(c)) as f64;
        prop_assert_eq!(value, expected);
        prop_assert_eq!(value, evaluate(&to_postfix(&format!("{}^({}^{})", a, b, c)).unwrap(), None).unwrap());
    }

    #[test]
    fn trailing_operator_never_compiles(text in soup_strategy(), op in operator_strategy()) {
        let mut text = text;
        text.push(op.symbol());
        prop_assert!(to_postfix(&text).is_err());
    }
}
