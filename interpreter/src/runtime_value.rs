use std::fmt;

use wizard::parser::expression::is_number_literal;

/// A runtime value produced by evaluating an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeValue {
    Number(f64),
    String(String),
}

impl RuntimeValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            RuntimeValue::Number(_) => "number",
            RuntimeValue::String(_) => "string",
        }
    }

    /// Numeric view of the value. Strings are trimmed and must be a number
    /// literal with an optional sign; empty text is 0 and anything else
    /// (including `inf` and `nan`) is NaN.
    pub fn to_number(&self) -> f64 {
        match self {
            RuntimeValue::Number(n) => *n,
            RuntimeValue::String(s) => {
                let s = s.trim();
                if s.is_empty() {
                    return 0.0;
                }
                let unsigned = s.strip_prefix(['+', '-']).unwrap_or(s);
                if is_number_literal(unsigned) {
                    s.parse().unwrap_or(f64::NAN)
                } else {
                    f64::NAN
                }
            }
        }
    }
}

impl From<f64> for RuntimeValue {
    fn from(n: f64) -> Self {
        RuntimeValue::Number(n)
    }
}

impl From<&str> for RuntimeValue {
    fn from(s: &str) -> Self {
        RuntimeValue::String(s.to_string())
    }
}

/// Render a number the way the playground shows it: integral values without
/// a fractional part, `NaN`, `Infinity` and `-Infinity` spelled out.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n == f64::INFINITY {
        "Infinity".to_string()
    } else if n == f64::NEG_INFINITY {
        "-Infinity".to_string()
    } else if n == n.floor() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl fmt::Display for RuntimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeValue::Number(n) => f.write_str(&format_number(*n)),
            RuntimeValue::String(s) => f.write_str(s),
        }
    }
}
