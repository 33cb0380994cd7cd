//! Compiled postfix form of a formula

use crate::operator::BinaryOperator;
use std::fmt;

/// One instruction of a postfix program
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PostfixToken {
    Number(f64),
    /// Reference key as written in the source, quotes included
    Reference(String),
    Operator(BinaryOperator),
    /// Prefix minus marker, rendered `_`
    Negate,
    /// Function call; its argument count is the next unread arity entry
    Function(String),
}

impl fmt::Display for PostfixToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostfixToken::Number(n) => write!(f, "{}", n),
            PostfixToken::Reference(key) => f.write_str(key),
            PostfixToken::Operator(op) => write!(f, "{}", op.symbol()),
            PostfixToken::Negate => f.write_str("_"),
            PostfixToken::Function(name) => f.write_str(name),
        }
    }
}

/// Postfix token sequence plus the argument count of every function call
/// in the order the calls appear in the sequence
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PostfixProgram {
    tokens: Vec<PostfixToken>,
    arities: Vec<usize>,
}

impl PostfixProgram {
    /// Assemble a program from parts
    ///
    /// No validation happens here; a mismatched arity table surfaces as
    /// [`EvalError::MalformedProgram`](crate::EvalError::MalformedProgram) on evaluation.
    pub fn new(tokens: Vec<PostfixToken>, arities: Vec<usize>) -> Self {
        Self { tokens, arities }
    }

    pub fn tokens(&self) -> &[PostfixToken] {
        &self.tokens
    }

    pub fn arities(&self) -> &[usize] {
        &self.arities
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Distinct reference keys in order of first appearance
    ///
    /// Hosts backed by slow lookups can resolve these up front, in any order
    /// or in one batch, before evaluating.
    pub fn references(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = Vec::new();
        for token in &self.tokens {
            if let PostfixToken::Reference(key) = token {
                if !keys.contains(&key.as_str()) {
                    keys.push(key);
                }
            }
        }
        keys
    }

    /// Names of the called functions, in call order
    pub fn functions(&self) -> impl Iterator<Item = &str> + '_ {
        self.tokens.iter().filter_map(|t| match t {
            PostfixToken::Function(name) => Some(name.as_str()),
            _ => None,
        })
    }
}

impl fmt::Display for PostfixProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, token) in self.tokens.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", token)?;
        }
        Ok(())
    }
}

/// Strip the delimiting quotes from a reference key
///
/// `"\"revenue\""` becomes `"revenue"`; a key without quotes is returned unchanged.
pub fn reference_name(key: &str) -> &str {
    key.strip_prefix('"')
        .and_then(|k| k.strip_suffix('"'))
        .unwrap_or(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PostfixProgram {
        PostfixProgram::new(
            vec![
                PostfixToken::Reference("\"a\"".into()),
                PostfixToken::Number(1.5),
                PostfixToken::Reference("\"b\"".into()),
                PostfixToken::Reference("\"a\"".into()),
                PostfixToken::Function("SUM".into()),
                PostfixToken::Negate,
                PostfixToken::Operator(BinaryOperator::Power),
            ],
            vec![3],
        )
    }

    #[test]
    fn test_display() {
        assert_eq!(sample().to_string(), "\"a\" 1.5 \"b\" \"a\" SUM _ ^");
        assert_eq!(PostfixProgram::default().to_string(), "");
    }

    #[test]
    fn test_references_are_distinct() {
        assert_eq!(sample().references(), vec!["\"a\"", "\"b\""]);
    }

    #[test]
    fn test_functions() {
        assert_eq!(sample().functions().collect::<Vec<_>>(), vec!["SUM"]);
    }

    #[test]
    fn test_reference_name() {
        assert_eq!(reference_name("\"revenue\""), "revenue");
        assert_eq!(reference_name("revenue"), "revenue");
        assert_eq!(reference_name("\"\""), "");
        assert_eq!(reference_name("\""), "\"");
    }
}
