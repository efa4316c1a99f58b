use std::ops::Range;

use wizard::expression::format_string::{FormatPart, FormatString};
use wizard::expression::{BinaryOperator, Expr, Expression, UnaryOperator};

use crate::environment::VariableTable;
use crate::error::{DiagnosticError, RuntimeError};
use crate::runtime_value::RuntimeValue;

/// Evaluate a parsed expression against the variable table.
///
/// Evaluation cannot fail. Unknown names, non-numeric operands and division
/// by zero are pushed to `diagnostics` as warnings and a substitute value is
/// used instead.
pub fn evaluate(
    expression: &Expression,
    variables: &VariableTable,
    diagnostics: &mut Vec<DiagnosticError>,
    source_id: usize,
) -> RuntimeValue {
    // A variable named by the exact text wins over any arithmetic reading.
    if !expression.is_literal() {
        if let Some(value) = variables.get(&expression.text) {
            return value.clone();
        }
    }

    evaluate_expr(
        &expression.tree,
        variables,
        diagnostics,
        source_id,
        &expression.span,
    )
}

fn evaluate_expr(
    expr: &Expr,
    variables: &VariableTable,
    diagnostics: &mut Vec<DiagnosticError>,
    source_id: usize,
    span: &Range<usize>,
) -> RuntimeValue {
    match expr {
        Expr::StringLiteral(s) => RuntimeValue::String(s.clone()),
        Expr::NumberLiteral(n) => RuntimeValue::Number(*n),

        Expr::VariableReference(name, name_span) => match variables.get(name) {
            Some(value) => value.clone(),
            None => {
                diagnostics.push(DiagnosticError::warning(
                    RuntimeError::UndefinedVariable(name.clone()),
                    name_span.clone(),
                    source_id,
                ));
                RuntimeValue::String(name.clone())
            }
        },

        Expr::Verbatim(text) => variables
            .get(text)
            .cloned()
            .unwrap_or_else(|| RuntimeValue::String(text.clone())),

        Expr::UnaryOperation { operator, operand } => {
            let value = evaluate_expr(operand, variables, diagnostics, source_id, span);
            let n = coerce_number(&value, diagnostics, source_id, span);
            match operator {
                UnaryOperator::Negation => RuntimeValue::Number(-n),
                UnaryOperator::Identity => RuntimeValue::Number(n),
            }
        }

        Expr::BinaryOperation {
            operator,
            left,
            right,
        } => {
            let l = evaluate_expr(left, variables, diagnostics, source_id, span);
            let r = evaluate_expr(right, variables, diagnostics, source_id, span);
            eval_binary_op(*operator, &l, &r, diagnostics, source_id, span)
        }
    }
}

/// Apply an arithmetic operator. Both operands are coerced to numbers.
pub fn eval_binary_op(
    operator: BinaryOperator,
    left: &RuntimeValue,
    right: &RuntimeValue,
    diagnostics: &mut Vec<DiagnosticError>,
    source_id: usize,
    span: &Range<usize>,
) -> RuntimeValue {
    let a = coerce_number(left, diagnostics, source_id, span);
    let b = coerce_number(right, diagnostics, source_id, span);

    let result = match operator {
        BinaryOperator::Addition => a + b,
        BinaryOperator::Subtraction => a - b,
        BinaryOperator::Multiplication => a * b,
        BinaryOperator::Division => {
            if b == 0.0 {
                warn_division_by_zero(diagnostics, source_id, span);
            }
            a / b
        }
        BinaryOperator::Modulo => {
            if b == 0.0 {
                warn_division_by_zero(diagnostics, source_id, span);
                f64::NAN
            } else {
                floored_modulo(a, b)
            }
        }
    };

    RuntimeValue::Number(result)
}

/// Remainder with the sign of the divisor (`-7 % 3 == 2`).
fn floored_modulo(a: f64, b: f64) -> f64 {
    let r = a % b;
    if r != 0.0 && (r < 0.0) != (b < 0.0) {
        r + b
    } else {
        r
    }
}

fn warn_division_by_zero(
    diagnostics: &mut Vec<DiagnosticError>,
    source_id: usize,
    span: &Range<usize>,
) {
    diagnostics.push(DiagnosticError::warning(
        RuntimeError::DivisionByZero,
        span.clone(),
        source_id,
    ));
}

fn coerce_number(
    value: &RuntimeValue,
    diagnostics: &mut Vec<DiagnosticError>,
    source_id: usize,
    span: &Range<usize>,
) -> f64 {
    let n = value.to_number();
    if let RuntimeValue::String(s) = value {
        if n.is_nan() {
            diagnostics.push(DiagnosticError::warning(
                RuntimeError::NotANumber(s.clone()),
                span.clone(),
                source_id,
            ));
        }
    }
    n
}

/// Render an f-string: each placeholder is evaluated on its own and
/// substituted as text.
pub fn eval_format_string(
    fs: &FormatString,
    variables: &VariableTable,
    diagnostics: &mut Vec<DiagnosticError>,
    source_id: usize,
) -> String {
    let mut result = String::new();
    for part in &fs.parts {
        match part {
            FormatPart::Literal(s) => result.push_str(s),
            FormatPart::Placeholder(expr) => {
                let value = evaluate(expr, variables, diagnostics, source_id);
                result.push_str(&value.to_string());
            }
        }
    }
    result
}
