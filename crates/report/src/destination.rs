//! Destination report sheets, one per destination indicator.
//!
//! Row 1 holds the element headings; every client identity gets one row per
//! destination, allocated on creation and never reused.

use std::collections::BTreeMap;

use clientmerge_core::DestinationId;
use clientmerge_identity::{RowAllocator, RowIndex};

use crate::dictionary::DataElementDictionary;
use crate::workbook::Worksheet;

const HEADING_ROW: u32 = 1;
const FIRST_DATA_ROW: RowIndex = 2;
const VALUE_SEPARATOR: &str = ", ";

/// One destination report being built.
#[derive(Debug, Clone)]
pub struct DestinationSheet {
    id: DestinationId,
    sheet: Worksheet,
    next_row: RowIndex,
}

impl DestinationSheet {
    fn new(id: DestinationId, sheet_name: String) -> Self {
        Self {
            id,
            sheet: Worksheet::new(sheet_name),
            next_row: FIRST_DATA_ROW,
        }
    }

    pub fn id(&self) -> &DestinationId {
        &self.id
    }

    pub fn sheet(&self) -> &Worksheet {
        &self.sheet
    }

    /// Rows handed out so far.
    pub fn allocated_rows(&self) -> u32 {
        self.next_row - FIRST_DATA_ROW
    }

    fn allocate_row(&mut self) -> RowIndex {
        let row = self.next_row;
        self.next_row += 1;
        row
    }

    /// Merge `value` into a cell. Returns whether the cell changed.
    ///
    /// A value already present in the cell (ignoring case) is not repeated;
    /// a different one is appended after a comma.
    pub fn merge_cell(&mut self, row: RowIndex, col: u32, value: &str) -> bool {
        let value = value.trim();
        if value.is_empty() {
            return false;
        }
        let merged = match self.sheet.cell(row, col) {
            None => value.to_string(),
            Some(current) if current.to_lowercase().contains(&value.to_lowercase()) => {
                return false;
            }
            Some(current) => format!("{current}{VALUE_SEPARATOR}{value}"),
        };
        self.sheet.set_cell(row, col, merged);
        true
    }
}

/// All destination sheets of a run.
#[derive(Debug, Clone, Default)]
pub struct DestinationRegistry {
    prefix: String,
    sheets: BTreeMap<DestinationId, DestinationSheet>,
}

impl DestinationRegistry {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            sheets: BTreeMap::new(),
        }
    }

    /// Fresh sheets for every destination the dictionary places elements in,
    /// with headings written.
    pub fn from_dictionary(ded: &DataElementDictionary, prefix: impl Into<String>) -> Self {
        let mut registry = Self::new(prefix);
        for dest in ded.destinations() {
            registry.add_destination(dest.clone());
        }
        for element in ded.elements() {
            for (dest, col) in element.dest_columns() {
                if let Some(sheet) = registry.sheets.get_mut(dest) {
                    sheet.sheet.set_cell(HEADING_ROW, *col, element.name());
                }
            }
        }
        registry
    }

    /// Register a destination; an existing one is left as is.
    pub fn add_destination(&mut self, id: DestinationId) -> &mut DestinationSheet {
        let sheet_name = self.sheet_name(&id);
        self.sheets
            .entry(id.clone())
            .or_insert_with(|| DestinationSheet::new(id, sheet_name))
    }

    pub fn sheet_name(&self, id: &DestinationId) -> String {
        format!("{}{}", self.prefix, id)
    }

    pub fn get(&self, id: &DestinationId) -> Option<&DestinationSheet> {
        self.sheets.get(id)
    }

    pub fn sheets(&self) -> impl Iterator<Item = &DestinationSheet> {
        self.sheets.values()
    }

    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }

    /// Merge a value into `(dest, row, col)`. Unknown destinations are ignored.
    pub fn merge_cell(
        &mut self,
        dest: &DestinationId,
        row: RowIndex,
        col: u32,
        value: &str,
    ) -> bool {
        self.sheets
            .get_mut(dest)
            .is_some_and(|sheet| sheet.merge_cell(row, col, value))
    }

    /// Finished worksheets, ready to be put into the workbook.
    pub fn into_worksheets(self) -> impl Iterator<Item = Worksheet> {
        self.sheets.into_values().map(|s| s.sheet)
    }
}

impl RowAllocator for DestinationRegistry {
    fn destinations(&self) -> Vec<DestinationId> {
        self.sheets.keys().cloned().collect()
    }

    fn allocate_row(&mut self, destination: &DestinationId) -> Option<RowIndex> {
        self.sheets.get_mut(destination).map(DestinationSheet::allocate_row)
    }
}
