pub mod environment;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod runtime_value;

pub use environment::VariableTable;
pub use error::{DiagnosticError, RuntimeError};
pub use executor::{FALLBACK_OUTPUT, execute_program, run};
pub use runtime_value::RuntimeValue;
