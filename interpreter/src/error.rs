use std::ops::Range;

/// Runtime findings. Only `Io` stops a run; the rest are reported as warnings
/// while evaluation carries on with a substitute value.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("name '{0}' is not defined; using the name as text")]
    UndefinedVariable(String),
    #[error("'{0}' is not a number")]
    NotANumber(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A runtime error or warning enriched with source location information.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct DiagnosticError {
    pub error: RuntimeError,
    pub span: Option<Range<usize>>,
    pub source_id: usize,
    pub is_warning: bool,
}

impl DiagnosticError {
    /// Create a warning diagnostic with a source span.
    pub fn warning(error: RuntimeError, span: Range<usize>, source_id: usize) -> Self {
        DiagnosticError {
            error,
            span: Some(span),
            source_id,
            is_warning: true,
        }
    }
}

impl From<RuntimeError> for DiagnosticError {
    fn from(error: RuntimeError) -> Self {
        DiagnosticError {
            error,
            span: None,
            source_id: 0,
            is_warning: false,
        }
    }
}
