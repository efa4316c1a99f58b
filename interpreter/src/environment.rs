use std::collections::HashMap;

use crate::runtime_value::RuntimeValue;

/// The per-run variable table: a flat map from name to value.
///
/// Created fresh for each run and dropped with it. There is no scoping; the
/// last assignment to a name wins.
#[derive(Debug, Clone, Default)]
pub struct VariableTable {
    variables: HashMap<String, RuntimeValue>,
}

impl VariableTable {
    pub fn new() -> Self {
        VariableTable::default()
    }

    pub fn get(&self, name: &str) -> Option<&RuntimeValue> {
        self.variables.get(name)
    }

    pub fn set(&mut self, name: &str, value: RuntimeValue) {
        self.variables.insert(name.to_string(), value);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// All entries ordered by name (for `--vars`).
    pub fn sorted(&self) -> Vec<(&str, &RuntimeValue)> {
        let mut entries: Vec<(&str, &RuntimeValue)> = self
            .variables
            .iter()
            .map(|(name, value)| (name.as_str(), value))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_assignment_wins() {
        let mut table = VariableTable::new();
        table.set("x", RuntimeValue::Number(1.0));
        table.set("x", RuntimeValue::from("one"));
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("x"), Some(&RuntimeValue::from("one")));
    }

    #[test]
    fn sorted_by_name() {
        let mut table = VariableTable::new();
        table.set("b", RuntimeValue::Number(2.0));
        table.set("a", RuntimeValue::Number(1.0));
        let names: Vec<&str> = table.sorted().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
