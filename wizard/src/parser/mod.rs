pub mod error;
pub mod expression;
mod line;

pub use error::ParseDiagnostic;

use crate::Program;

/// Parser entry point.
pub struct Parser {
    source: String,
    file_id: usize,
}

impl Parser {
    pub fn new(source: String, file_id: usize) -> Self {
        Parser { source, file_id }
    }

    /// Parse the source text into a Program. Never fails: lines that are not
    /// statements are skipped and reported in `Program::warnings`.
    pub fn parse(&self) -> Program {
        let (statements, warnings) = line::parse_lines(&self.source, self.file_id);
        Program {
            statements,
            warnings,
            source_id: self.file_id,
        }
    }
}
