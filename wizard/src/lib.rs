pub mod expression;
pub mod parser;
pub mod statement;

use crate::parser::ParseDiagnostic;
use crate::statement::Statement;

/// A parsed Python Wizard program.
#[derive(Debug, Clone)]
pub struct Program {
    /// Recognized statements in source order. Ignored lines do not appear here.
    pub statements: Vec<Statement>,
    /// Ignored lines and expressions that fell back to plain text.
    pub warnings: Vec<ParseDiagnostic>,
    /// The source file ID (for error reporting with codespan-reporting).
    pub source_id: usize,
}
