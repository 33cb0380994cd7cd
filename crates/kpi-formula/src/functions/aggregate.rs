//! Aggregate functions matching the consolidation types

use crate::error::EvalError;

fn require_args(function: &str, args: &[f64]) -> Result<(), EvalError> {
    if args.is_empty() {
        return Err(EvalError::InvalidArgument {
            function: function.to_string(),
            reason: "at least one argument is required".into(),
        });
    }
    Ok(())
}

/// SUM function
pub fn fn_sum(args: &[f64]) -> Result<f64, EvalError> {
    Ok(args.iter().sum())
}

/// MEAN function
pub fn fn_mean(args: &[f64]) -> Result<f64, EvalError> {
    require_args("MEAN", args)?;
    Ok(args.iter().sum::<f64>() / args.len() as f64)
}

/// MIN function
pub fn fn_min(args: &[f64]) -> Result<f64, EvalError> {
    require_args("MIN", args)?;
    Ok(args.iter().copied().fold(f64::INFINITY, f64::min))
}

/// MAX function
pub fn fn_max(args: &[f64]) -> Result<f64, EvalError> {
    require_args("MAX", args)?;
    Ok(args.iter().copied().fold(f64::NEG_INFINITY, f64::max))
}

/// WEIGHTED function: `WEIGHTED(v1, w1, v2, w2, ...)` = Σ v·w / Σ w
pub fn fn_weighted(args: &[f64]) -> Result<f64, EvalError> {
    require_args("WEIGHTED", args)?;
    if args.len() % 2 != 0 {
        return Err(EvalError::InvalidArgument {
            function: "WEIGHTED".into(),
            reason: format!("expected value/weight pairs, got {} arguments", args.len()),
        });
    }

    let (total, weights) = args
        .chunks_exact(2)
        .fold((0.0, 0.0), |(total, weights), pair| {
            (total + pair[0] * pair[1], weights + pair[1])
        });

    if weights == 0.0 {
        return Err(EvalError::DivisionByZero);
    }
    Ok(total / weights)
}
