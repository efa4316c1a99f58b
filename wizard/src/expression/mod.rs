pub mod format_string;

use std::fmt;
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    /// Arithmetic negation: -x
    Negation,
    /// Numeric identity: +x
    Identity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Addition,
    Subtraction,
    Multiplication,
    Division,
    Modulo,
}

impl BinaryOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Addition => "+",
            BinaryOperator::Subtraction => "-",
            BinaryOperator::Multiplication => "*",
            BinaryOperator::Division => "/",
            BinaryOperator::Modulo => "%",
        }
    }

    /// Map an augmented-assignment prefix (`+` in `+=`) to its operator.
    pub fn from_symbol(c: char) -> Option<Self> {
        match c {
            '+' => Some(BinaryOperator::Addition),
            '-' => Some(BinaryOperator::Subtraction),
            '*' => Some(BinaryOperator::Multiplication),
            '/' => Some(BinaryOperator::Division),
            '%' => Some(BinaryOperator::Modulo),
            _ => None,
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// An expression AST node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    StringLiteral(String),
    NumberLiteral(f64),
    VariableReference(String, Range<usize>),
    UnaryOperation {
        operator: UnaryOperator,
        operand: Box<Expr>,
    },
    BinaryOperation {
        operator: BinaryOperator,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Text the parser could not understand. Evaluates to the variable with
    /// exactly this name if one exists, else to the text itself.
    Verbatim(String),
}

/// A parsed expression together with the trimmed source text it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub tree: Expr,
    pub text: String,
    pub span: Range<usize>,
}

impl Expression {
    pub fn is_verbatim(&self) -> bool {
        matches!(self.tree, Expr::Verbatim(_))
    }

    pub fn is_literal(&self) -> bool {
        matches!(self.tree, Expr::StringLiteral(_) | Expr::NumberLiteral(_))
    }
}
