//! Shunting-yard converter
//!
//! Turns the token stream of an infix formula into a [`PostfixProgram`]. Prefix
//! `+`/`-` are recognised by position, function calls may take any positive
//! number of arguments, and every emitted function records its argument count
//! in the program's arity table.

use crate::error::{FormulaResult, ParseError};
use crate::lexer::{tokenize, Token, TokenKind};
use crate::operator::{Associativity, BinaryOperator, UnaryOperator};
use crate::program::{PostfixProgram, PostfixToken};

/// Limits applied while compiling a formula
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FormulaOptions {
    /// Maximum depth of nested parentheses and function calls (default: 256)
    pub max_nesting_depth: usize,
    /// Maximum formula length in bytes (default: 65536)
    pub max_length: usize,
}

impl Default for FormulaOptions {
    fn default() -> Self {
        Self {
            max_nesting_depth: 256,
            max_length: 65_536,
        }
    }
}

/// Compile formula text into a postfix program with default options
///
/// # Example
/// ```rust
/// use kpi_formula::to_postfix;
///
/// let program = to_postfix("1+SUM(25,2)").unwrap();
/// assert_eq!(program.to_string(), "1 25 2 SUM +");
/// assert_eq!(program.arities(), &[2]);
/// ```
pub fn to_postfix(text: &str) -> FormulaResult<PostfixProgram> {
    to_postfix_with_options(text, &FormulaOptions::default())
}

/// Compile formula text into a postfix program
pub fn to_postfix_with_options(
    text: &str,
    options: &FormulaOptions,
) -> FormulaResult<PostfixProgram> {
    if text.len() > options.max_length {
        return Err(ParseError::TooLong {
            length: text.len(),
            limit: options.max_length,
        }
        .into());
    }

    let tokens = tokenize(text)?;
    let program = convert(&tokens, options)?;
    tracing::trace!(formula = text, postfix = %program, "compiled formula");
    Ok(program)
}

/// Whether a `+`/`-` following `previous` is a prefix operator
///
/// True at the start of input and after an operator, `(` or `,`: exactly the
/// positions where an operand is expected.
pub fn is_prefix_position(previous: Option<&TokenKind>) -> bool {
    matches!(
        previous,
        None | Some(TokenKind::Operator(_))
            | Some(TokenKind::UnaryMinus)
            | Some(TokenKind::LeftParen)
            | Some(TokenKind::Comma)
    )
}

/// Entries of the operator stack
#[derive(Debug)]
enum StackEntry {
    Binary(BinaryOperator),
    Unary(UnaryOperator),
    /// `(` and its source position
    LeftParen(usize),
    /// Function awaiting its closing parenthesis
    Function(String),
}

/// Bookkeeping for one open function call
#[derive(Debug)]
struct CallFrame {
    name: String,
    arg_count: usize,
}

/// Convert a token sequence into a postfix program
pub fn convert(tokens: &[Token], options: &FormulaOptions) -> Result<PostfixProgram, ParseError> {
    let mut converter = Converter::new(options);
    let mut iter = tokens.iter().peekable();

    while let Some(token) = iter.next() {
        match &token.kind {
            TokenKind::Identifier(name) => {
                // The call parenthesis belongs to the identifier
                match iter.next() {
                    Some(Token {
                        kind: TokenKind::LeftParen,
                        position,
                    }) => converter.open_call(name, token.position, *position)?,
                    _ => {
                        return Err(ParseError::MissingCallParen {
                            name: name.clone(),
                            position: token.position,
                        })
                    }
                }
            }
            _ => converter.push(token)?,
        }
    }

    converter.finish(tokens.last().map_or(0, |t| t.position + 1))
}

struct Converter<'o> {
    options: &'o FormulaOptions,
    output: Vec<PostfixToken>,
    stack: Vec<StackEntry>,
    frames: Vec<CallFrame>,
    arities: Vec<usize>,
    /// Kind of the previous token, for prefix classification
    previous: Option<TokenKind>,
    depth: usize,
}

impl<'o> Converter<'o> {
    fn new(options: &'o FormulaOptions) -> Self {
        Self {
            options,
            output: Vec::new(),
            stack: Vec::new(),
            frames: Vec::new(),
            arities: Vec::new(),
            previous: None,
            depth: 0,
        }
    }

    fn expects_operand(&self) -> bool {
        is_prefix_position(self.previous.as_ref())
    }

    fn push(&mut self, token: &Token) -> Result<(), ParseError> {
        let position = token.position;

        match &token.kind {
            TokenKind::Number(n) => {
                self.operand(position)?;
                self.output.push(PostfixToken::Number(*n));
            }
            TokenKind::StringLiteral(key) => {
                self.operand(position)?;
                self.output.push(PostfixToken::Reference(key.clone()));
            }
            TokenKind::Operator(op) => {
                if self.expects_operand() {
                    let unary = op.as_unary().ok_or(ParseError::MissingOperand { position })?;
                    self.stack.push(StackEntry::Unary(unary));
                } else {
                    self.push_binary(*op);
                }
            }
            TokenKind::UnaryMinus => {
                self.operand(position)?;
                self.stack.push(StackEntry::Unary(UnaryOperator::Negate));
            }
            TokenKind::LeftParen => {
                self.operand(position)?;
                self.enter(position)?;
                self.stack.push(StackEntry::LeftParen(position));
            }
            TokenKind::Comma => self.comma(position)?,
            TokenKind::RightParen => self.close(position)?,
            TokenKind::Identifier(name) => {
                return Err(ParseError::MissingCallParen {
                    name: name.clone(),
                    position,
                })
            }
        }

        self.previous = Some(token.kind.clone());
        Ok(())
    }

    /// An operand (or a group standing for one) is only valid where one is expected
    fn operand(&self, position: usize) -> Result<(), ParseError> {
        if self.expects_operand() {
            Ok(())
        } else {
            Err(ParseError::UnexpectedOperand { position })
        }
    }

    fn enter(&mut self, position: usize) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > self.options.max_nesting_depth {
            return Err(ParseError::NestingTooDeep {
                limit: self.options.max_nesting_depth,
                position,
            });
        }
        Ok(())
    }

    fn open_call(
        &mut self,
        name: &str,
        position: usize,
        paren_position: usize,
    ) -> Result<(), ParseError> {
        self.operand(position)?;
        self.enter(paren_position)?;
        self.stack.push(StackEntry::Function(name.to_string()));
        self.stack.push(StackEntry::LeftParen(paren_position));
        self.frames.push(CallFrame {
            name: name.to_string(),
            arg_count: 1,
        });
        self.previous = Some(TokenKind::LeftParen);
        Ok(())
    }

    fn push_binary(&mut self, incoming: BinaryOperator) {
        let spec = incoming.spec();

        while let Some(top) = self.stack.last() {
            let top_precedence = match top {
                StackEntry::Binary(op) => op.spec().precedence,
                StackEntry::Unary(op) => op.spec().precedence,
                StackEntry::LeftParen(_) | StackEntry::Function(_) => break,
            };
            let pops = match spec.associativity {
                Associativity::Left => top_precedence >= spec.precedence,
                Associativity::Right => top_precedence > spec.precedence,
            };
            if !pops {
                break;
            }
            self.pop_operator();
        }

        self.stack.push(StackEntry::Binary(incoming));
    }

    /// Move the top operator to the output. Unary plus produces nothing.
    fn pop_operator(&mut self) {
        match self.stack.pop() {
            Some(StackEntry::Binary(op)) => self.output.push(PostfixToken::Operator(op)),
            Some(StackEntry::Unary(UnaryOperator::Negate)) => self.output.push(PostfixToken::Negate),
            Some(StackEntry::Unary(UnaryOperator::Plus)) | None => {}
            Some(entry) => self.stack.push(entry),
        }
    }

    /// Pop operators until a `(` is on top; returns its position
    fn unwind_to_paren(&mut self) -> Option<usize> {
        loop {
            match self.stack.last() {
                Some(StackEntry::LeftParen(position)) => return Some(*position),
                Some(StackEntry::Binary(_)) | Some(StackEntry::Unary(_)) => self.pop_operator(),
                Some(StackEntry::Function(_)) | None => return None,
            }
        }
    }

    /// Whether the `(` on top of the stack opens a function call
    fn paren_opens_call(&self) -> bool {
        let len = self.stack.len();
        len >= 2 && matches!(self.stack[len - 2], StackEntry::Function(_))
    }

    fn comma(&mut self, position: usize) -> Result<(), ParseError> {
        if self.expects_operand() {
            return Err(ParseError::MissingOperand { position });
        }
        if self.unwind_to_paren().is_none() || !self.paren_opens_call() {
            return Err(ParseError::MisplacedComma { position });
        }
        match self.frames.last_mut() {
            Some(frame) => frame.arg_count += 1,
            None => return Err(ParseError::MisplacedComma { position }),
        }
        Ok(())
    }

    fn close(&mut self, position: usize) -> Result<(), ParseError> {
        if self.expects_operand() {
            let empty_call = matches!(self.previous, Some(TokenKind::LeftParen))
                && self.paren_opens_call();
            return Err(match self.frames.last() {
                Some(frame) if empty_call => ParseError::EmptyArgumentList {
                    name: frame.name.clone(),
                    position,
                },
                _ => ParseError::MissingOperand { position },
            });
        }

        if self.unwind_to_paren().is_none() {
            return Err(ParseError::UnmatchedRightParen { position });
        }
        let opens_call = self.paren_opens_call();
        self.stack.pop(); // The '(' itself
        self.depth -= 1;

        if opens_call {
            if let (Some(StackEntry::Function(name)), Some(frame)) =
                (self.stack.pop(), self.frames.pop())
            {
                self.output.push(PostfixToken::Function(name));
                self.arities.push(frame.arg_count);
            }
        }
        Ok(())
    }

    fn finish(mut self, end: usize) -> Result<PostfixProgram, ParseError> {
        if self.previous.is_none() {
            return Err(ParseError::EmptyExpression);
        }
        if self.expects_operand() {
            return Err(ParseError::MissingOperand { position: end });
        }

        while let Some(entry) = self.stack.last() {
            match entry {
                StackEntry::LeftParen(position) => {
                    return Err(ParseError::UnmatchedLeftParen {
                        position: *position,
                    })
                }
                StackEntry::Function(_) => {
                    return Err(ParseError::UnmatchedLeftParen { position: end })
                }
                StackEntry::Binary(_) | StackEntry::Unary(_) => self.pop_operator(),
            }
        }

        if !self.frames.is_empty() {
            return Err(ParseError::UnmatchedLeftParen { position: end });
        }
        if self.output.is_empty() {
            return Err(ParseError::EmptyExpression);
        }

        Ok(PostfixProgram::new(self.output, self.arities))
    }
}
