use std::ops::Range;

use crate::expression::BinaryOperator;
use crate::parser::error::ParseDiagnostic;
use crate::parser::expression::{parse_expression, parse_format_string, trim_span};
use crate::statement::{PrintArgument, Statement};

const PRINT_PREFIX: &str = "print(";

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Split the source into lines and parse each one into a statement.
/// Blank lines and comments are skipped silently; any other line that is not
/// a print or an assignment is skipped with a warning.
pub fn parse_lines(source: &str, file_id: usize) -> (Vec<Statement>, Vec<ParseDiagnostic>) {
    let mut statements = Vec::new();
    let mut warnings = Vec::new();
    let mut line_start = 0;

    for raw in source.split_inclusive('\n') {
        let line = raw.trim_end_matches(['\n', '\r']);
        let code = strip_comment(line);
        let (trimmed, span) = trim_span(code, line_start);
        line_start += raw.len();

        if trimmed.is_empty() {
            continue;
        }

        if trimmed.starts_with(PRINT_PREFIX) {
            statements.push(parse_print(trimmed, span, file_id, &mut warnings));
        } else if let Some(split) = find_assignment(trimmed) {
            statements.push(parse_assignment(trimmed, split, span, file_id, &mut warnings));
        } else {
            tracing::debug!(line = trimmed, "statement not recognized");
            warnings.push(
                ParseDiagnostic::warning("statement not recognized; line ignored", span, file_id)
                    .with_note("only `print(...)` and `name = value` lines are run"),
            );
        }
    }

    (statements, warnings)
}

// ---------------------------------------------------------------------------
// Statements
// ---------------------------------------------------------------------------

fn parse_print(
    line: &str,
    span: Range<usize>,
    file_id: usize,
    warnings: &mut Vec<ParseDiagnostic>,
) -> Statement {
    let rest = &line[PRINT_PREFIX.len()..];
    let inner = match rest.rfind(')') {
        Some(close) => &rest[..close],
        None => rest,
    };
    let inner_offset = span.start + PRINT_PREFIX.len();

    let arguments = split_top_level(inner, ',')
        .into_iter()
        .filter(|(text, _)| !text.trim().is_empty())
        .map(|(text, start)| parse_print_argument(text, inner_offset + start, file_id, warnings))
        .collect();

    Statement::Print { arguments, span }
}

fn parse_print_argument(
    text: &str,
    offset: usize,
    file_id: usize,
    warnings: &mut Vec<ParseDiagnostic>,
) -> PrintArgument {
    let (trimmed, span) = trim_span(text, offset);
    let mut chars = trimmed.chars();

    match (chars.next(), chars.next()) {
        (Some('f' | 'F'), Some(quote @ ('"' | '\''))) => {
            let body = &trimmed[2..];
            let body = body.strip_suffix(quote).unwrap_or(body);
            PrintArgument::Format(parse_format_string(body, span.start + 2, file_id, warnings))
        }
        _ => PrintArgument::Expression(parse_expression(trimmed, span.start, file_id, warnings)),
    }
}

fn parse_assignment(
    line: &str,
    split: AssignmentSplit,
    span: Range<usize>,
    file_id: usize,
    warnings: &mut Vec<ParseDiagnostic>,
) -> Statement {
    let target = line[..split.target_end].trim().to_string();
    let value = parse_expression(
        &line[split.value_start..],
        span.start + split.value_start,
        file_id,
        warnings,
    );
    tracing::trace!(variable = %target, operator = ?split.operator, "assignment");
    Statement::Assignment {
        target,
        operator: split.operator,
        value,
        span,
    }
}

// ---------------------------------------------------------------------------
// Line scanning
// ---------------------------------------------------------------------------

/// Where a line splits into assignment target and value.
#[derive(Debug, Clone, Copy, PartialEq)]
struct AssignmentSplit {
    /// End of the target text (start of the operator).
    target_end: usize,
    /// Start of the value text (just after `=`).
    value_start: usize,
    /// Set for augmented assignment (`+=`, `-=`, ...).
    operator: Option<BinaryOperator>,
}

/// Tracks whether a scan position is inside quotes or brackets.
#[derive(Debug, Default)]
struct Nesting {
    quote: Option<char>,
    depth: usize,
}

impl Nesting {
    /// Feed one character; returns true if it sits at the top level.
    fn step(&mut self, c: char) -> bool {
        if let Some(q) = self.quote {
            if c == q {
                self.quote = None;
            }
            return false;
        }
        match c {
            '"' | '\'' => {
                self.quote = Some(c);
                false
            }
            '(' | '[' | '{' => {
                self.depth += 1;
                false
            }
            ')' | ']' | '}' => {
                self.depth = self.depth.saturating_sub(1);
                false
            }
            _ => self.depth == 0,
        }
    }
}

/// Drop a trailing `# comment` that is outside quotes.
fn strip_comment(line: &str) -> &str {
    let mut quote = None;
    for (i, c) in line.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '#') => return &line[..i],
            _ => {}
        }
    }
    line
}

/// Find the first top-level `=` that is an assignment rather than part of
/// `==`, `!=`, `<=` or `>=`.
fn find_assignment(line: &str) -> Option<AssignmentSplit> {
    let mut nesting = Nesting::default();
    let mut prev: Option<(usize, char)> = None;
    let mut chars = line.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        let top_level = nesting.step(c);
        if top_level && c == '=' {
            if chars.peek().is_some_and(|&(_, next)| next == '=') {
                // `==`
                chars.next();
                prev = Some((i + 1, '='));
                continue;
            }
            match prev {
                Some((_, '!' | '<' | '>' | '=')) => {}
                Some((p, symbol)) if BinaryOperator::from_symbol(symbol).is_some() => {
                    return Some(AssignmentSplit {
                        target_end: p,
                        value_start: i + 1,
                        operator: BinaryOperator::from_symbol(symbol),
                    });
                }
                _ => {
                    return Some(AssignmentSplit {
                        target_end: i,
                        value_start: i + 1,
                        operator: None,
                    });
                }
            }
        }
        prev = Some((i, c));
    }

    None
}

/// Split on a top-level separator. Returns each piece with its byte offset.
fn split_top_level(text: &str, separator: char) -> Vec<(&str, usize)> {
    let mut pieces = Vec::new();
    let mut nesting = Nesting::default();
    let mut start = 0;

    for (i, c) in text.char_indices() {
        if nesting.step(c) && c == separator {
            pieces.push((&text[start..i], start));
            start = i + c.len_utf8();
        }
    }
    pieces.push((&text[start..], start));
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::Expr;

    fn statements(source: &str) -> Vec<Statement> {
        parse_lines(source, 0).0
    }

    #[test]
    fn blank_lines_and_comments_are_skipped_without_warnings() {
        let (stmts, warnings) = parse_lines("\n# a comment\n   \n  # indented\n", 0);
        assert!(stmts.is_empty());
        assert!(warnings.is_empty());
    }

    #[test]
    fn unrecognized_lines_warn_with_span() {
        let source = "x = 1\nif x > 0:\n";
        let (stmts, warnings) = parse_lines(source, 0);
        assert_eq!(stmts.len(), 1);
        assert_eq!(warnings.len(), 1);
        assert_eq!(&source[warnings[0].span.clone()], "if x > 0:");
    }

    #[test]
    fn print_takes_priority_over_assignment() {
        let stmts = statements("print(\"a = b\")");
        assert_eq!(stmts[0].kind_name(), "print");
    }

    #[test]
    fn indented_print_runs() {
        let stmts = statements("    print('hi')");
        assert_eq!(stmts.len(), 1);
    }

    #[test]
    fn print_arguments_split_on_top_level_commas() {
        let stmts = statements("print(\"Hello, World!\", (1, 2), x)");
        let Statement::Print { arguments, .. } = &stmts[0] else {
            panic!("expected print");
        };
        assert_eq!(arguments.len(), 3);
    }

    #[test]
    fn print_without_closing_paren_uses_rest_of_line() {
        let stmts = statements("print(42");
        let Statement::Print { arguments, .. } = &stmts[0] else {
            panic!("expected print");
        };
        assert_eq!(
            arguments[0],
            PrintArgument::Expression(crate::expression::Expression {
                tree: Expr::NumberLiteral(42.0),
                text: "42".into(),
                span: 6..8,
            })
        );
    }

    #[test]
    fn f_string_detection() {
        let stmts = statements("print(f'Result: {result}')");
        let Statement::Print { arguments, .. } = &stmts[0] else {
            panic!("expected print");
        };
        let PrintArgument::Format(fs) = &arguments[0] else {
            panic!("expected f-string");
        };
        let placeholder = fs.placeholders().next().unwrap();
        assert_eq!(placeholder.text, "result");
        assert_eq!(placeholder.span, 17..23);
    }

    #[test]
    fn assignment_split_ignores_comparisons() {
        assert_eq!(find_assignment("x == 5"), None);
        assert_eq!(find_assignment("x != 5"), None);
        assert_eq!(find_assignment("x <= 5"), None);
        assert_eq!(find_assignment("f(a=1)"), None);
        assert_eq!(find_assignment("'a=b'"), None);
        assert_eq!(
            find_assignment("x = y == z"),
            Some(AssignmentSplit {
                target_end: 2,
                value_start: 3,
                operator: None,
            })
        );
    }

    #[test]
    fn augmented_assignment() {
        let stmts = statements("total += 5");
        let Statement::Assignment { target, operator, value, .. } = &stmts[0] else {
            panic!("expected assignment");
        };
        assert_eq!(target, "total");
        assert_eq!(*operator, Some(BinaryOperator::Addition));
        assert_eq!(value.text, "5");
    }

    #[test]
    fn assignment_target_is_trimmed_text() {
        let stmts = statements("  my var   =  3  ");
        let Statement::Assignment { target, value, .. } = &stmts[0] else {
            panic!("expected assignment");
        };
        assert_eq!(target, "my var");
        assert_eq!(value.tree, Expr::NumberLiteral(3.0));
    }

    #[test]
    fn trailing_comment_is_stripped() {
        let stmts = statements("x = 5  # five\nprint(\"# not a comment\")");
        let Statement::Assignment { value, .. } = &stmts[0] else {
            panic!("expected assignment");
        };
        assert_eq!(value.text, "5");
        assert_eq!(stmts.len(), 2);
    }

    #[test]
    fn crlf_line_endings() {
        let source = "x = 1\r\nprint(x)\r\n";
        let stmts = statements(source);
        assert_eq!(stmts.len(), 2);
        assert_eq!(&source[stmts[1].span().clone()], "print(x)");
    }
}
