use crate::expression::Expression;

/// The body of an f-string: literal text with `{expr}` placeholders.
#[derive(Debug, Clone, PartialEq)]
pub struct FormatString {
    pub parts: Vec<FormatPart>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormatPart {
    Literal(String),
    /// Evaluated on its own and substituted as text.
    Placeholder(Expression),
}

impl FormatString {
    pub fn literal(s: impl Into<String>) -> Self {
        FormatString {
            parts: vec![FormatPart::Literal(s.into())],
        }
    }

    pub fn placeholders(&self) -> impl Iterator<Item = &Expression> {
        self.parts.iter().filter_map(|part| match part {
            FormatPart::Placeholder(expr) => Some(expr),
            FormatPart::Literal(_) => None,
        })
    }
}
