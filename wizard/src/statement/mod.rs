use std::ops::Range;

use crate::expression::format_string::FormatString;
use crate::expression::{BinaryOperator, Expression};

/// One argument of a `print(...)` call.
#[derive(Debug, Clone, PartialEq)]
pub enum PrintArgument {
    /// `f"..."` / `f'...'`
    Format(FormatString),
    Expression(Expression),
}

/// A single executable statement parsed from one source line.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `print(arg, ...)`: arguments are joined with a single space.
    Print {
        arguments: Vec<PrintArgument>,
        span: Range<usize>,
    },
    /// `target = value`, or `target <op>= value` when `operator` is set.
    Assignment {
        target: String,
        operator: Option<BinaryOperator>,
        value: Expression,
        span: Range<usize>,
    },
}

impl Statement {
    pub fn span(&self) -> &Range<usize> {
        match self {
            Statement::Print { span, .. } => span,
            Statement::Assignment { span, .. } => span,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Statement::Print { .. } => "print",
            Statement::Assignment { operator: None, .. } => "assignment",
            Statement::Assignment { .. } => "augmented assignment",
        }
    }
}
