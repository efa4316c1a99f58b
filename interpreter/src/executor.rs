use std::io::Write;

use wizard::Program;
use wizard::parser::Parser;
use wizard::statement::{PrintArgument, Statement};

use crate::environment::VariableTable;
use crate::error::{DiagnosticError, RuntimeError};
use crate::evaluator::{eval_binary_op, eval_format_string, evaluate};
use crate::runtime_value::RuntimeValue;

/// Shown instead of an empty result when a run printed nothing.
pub const FALLBACK_OUTPUT: &str = "No output";

/// Run source text and return everything it printed, or [`FALLBACK_OUTPUT`]
/// when nothing was printed. Never fails.
pub fn run(source: &str) -> String {
    let program = Parser::new(source.to_string(), 0).parse();
    let mut buffer = Vec::new();
    if let Err(error) = execute_program(&program, &mut buffer) {
        tracing::warn!(%error, "run stopped early");
    }

    let output = String::from_utf8_lossy(&buffer).into_owned();
    if output.is_empty() {
        FALLBACK_OUTPUT.to_string()
    } else {
        output
    }
}

/// Execute a program against a fresh variable table, writing print output
/// to `output`. Returns the final table and any runtime warnings. The only
/// error is a failed write to `output`.
#[tracing::instrument(level = "debug", skip_all, fields(statements = program.statements.len()))]
pub fn execute_program(
    program: &Program,
    output: &mut dyn Write,
) -> Result<(VariableTable, Vec<DiagnosticError>), DiagnosticError> {
    let mut variables = VariableTable::new();
    let mut diagnostics = Vec::new();

    for statement in &program.statements {
        execute_statement(
            statement,
            &mut variables,
            output,
            &mut diagnostics,
            program.source_id,
        )?;
    }

    Ok((variables, diagnostics))
}

fn execute_statement(
    statement: &Statement,
    variables: &mut VariableTable,
    output: &mut dyn Write,
    diagnostics: &mut Vec<DiagnosticError>,
    source_id: usize,
) -> Result<(), DiagnosticError> {
    tracing::trace!(kind = statement.kind_name(), range = ?statement.span(), "execute");

    match statement {
        Statement::Print { arguments, span } => {
            let rendered: Vec<String> = arguments
                .iter()
                .map(|argument| render_argument(argument, variables, diagnostics, source_id))
                .collect();
            writeln!(output, "{}", rendered.join(" ")).map_err(|e| DiagnosticError {
                error: RuntimeError::Io(e),
                span: Some(span.clone()),
                source_id,
                is_warning: false,
            })
        }

        Statement::Assignment {
            target,
            operator,
            value,
            span,
        } => {
            let new_value = match operator {
                None => evaluate(value, variables, diagnostics, source_id),
                Some(operator) => {
                    let current = match variables.get(target) {
                        Some(current) => current.clone(),
                        None => {
                            diagnostics.push(DiagnosticError::warning(
                                RuntimeError::UndefinedVariable(target.clone()),
                                span.clone(),
                                source_id,
                            ));
                            RuntimeValue::String(target.clone())
                        }
                    };
                    let rhs = evaluate(value, variables, diagnostics, source_id);
                    eval_binary_op(*operator, &current, &rhs, diagnostics, source_id, span)
                }
            };
            variables.set(target, new_value);
            Ok(())
        }
    }
}

fn render_argument(
    argument: &PrintArgument,
    variables: &VariableTable,
    diagnostics: &mut Vec<DiagnosticError>,
    source_id: usize,
) -> String {
    match argument {
        PrintArgument::Format(fs) => eval_format_string(fs, variables, diagnostics, source_id),
        PrintArgument::Expression(expr) => {
            evaluate(expr, variables, diagnostics, source_id).to_string()
        }
    }
}
