//! Assembly of one data element from several fragment columns.

use std::collections::BTreeMap;
use std::fmt;

/// A content column contributing one piece of an assembled value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentColumn {
    pub name: String,
    pub col: u32,
    pub index: u32,
}

/// Joins fragment values of one target element in fragment-index order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentAssembler {
    target: String,
    columns: Vec<FragmentColumn>,
    values: BTreeMap<u32, String>,
}

impl FragmentAssembler {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            columns: Vec::new(),
            values: BTreeMap::new(),
        }
    }

    /// Element the assembled value belongs to.
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn columns(&self) -> &[FragmentColumn] {
        &self.columns
    }

    /// Register a source column. A fragment name already registered is ignored.
    pub fn add_column(&mut self, name: impl Into<String>, col: u32, index: u32) -> bool {
        let name = name.into();
        if self.columns.iter().any(|c| c.name == name) {
            return false;
        }
        self.columns.push(FragmentColumn { name, col, index });
        true
    }

    /// Assembled value, `None` when every fragment is empty.
    pub fn assembled(&self) -> Option<String> {
        let joined = self
            .values
            .values()
            .map(String::as_str)
            .filter(|v| !v.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        (!joined.is_empty()).then_some(joined)
    }

    /// Load this row's fragment values through `cell(col)`.
    pub fn load_row<'a, F>(&mut self, mut cell: F)
    where
        F: FnMut(u32) -> Option<&'a str>,
    {
        self.values.clear();
        for column in &self.columns {
            let value = cell(column.col).unwrap_or_default();
            self.values.insert(column.index, value.trim().to_string());
        }
    }
}

impl fmt::Display for FragmentAssembler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ordered: Vec<&FragmentColumn> = self.columns.iter().collect();
        ordered.sort_by_key(|c| c.index);
        let parts: Vec<&str> = ordered.iter().map(|c| c.name.as_str()).collect();
        write!(f, "{} <- [{}]", self.target, parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name_assembler() -> FragmentAssembler {
        let mut asm = FragmentAssembler::new("full name");
        asm.add_column("last name", 3, 2);
        asm.add_column("first name", 1, 1);
        asm
    }

    fn load(asm: &mut FragmentAssembler, row: &[&'static str]) {
        asm.load_row(|col| row.get(col as usize - 1).copied());
    }

    #[test]
    fn values_join_in_index_order() {
        let mut asm = name_assembler();
        load(&mut asm, &["John", "x", " Doe "]);
        assert_eq!(asm.assembled().as_deref(), Some("John Doe"));
    }

    #[test]
    fn empty_fragments_are_skipped() {
        let mut asm = name_assembler();
        asm.add_column("middle name", 2, 3);
        load(&mut asm, &["John", "", "Doe"]);
        assert_eq!(asm.assembled().as_deref(), Some("John Doe"));

        load(&mut asm, &["", " ", ""]);
        assert_eq!(asm.assembled(), None);
    }

    #[test]
    fn loading_a_row_replaces_the_previous_one() {
        let mut asm = name_assembler();
        load(&mut asm, &["John", "", "Doe"]);
        load(&mut asm, &["Ann"]);
        assert_eq!(asm.assembled().as_deref(), Some("Ann"));
    }

    #[test]
    fn duplicate_fragment_names_are_ignored() {
        let mut asm = name_assembler();
        assert!(!asm.add_column("first name", 9, 1));
        assert_eq!(asm.columns().len(), 2);
    }

    #[test]
    fn load_row_reads_each_column() {
        let mut asm = name_assembler();
        load(&mut asm, &["Jane", "", "Roe"]);
        assert_eq!(asm.assembled().as_deref(), Some("Jane Roe"));
        assert_eq!(asm.to_string(), "full name <- [first name, last name]");
    }
}
