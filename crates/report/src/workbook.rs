//! Workbook storage: one directory, one CSV file per worksheet.
//!
//! Cells are addressed 1-based (`row`, `col`), the way the worksheets are
//! read by people. An empty string and a missing cell are the same thing.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ReportError, ReportResult};

const SHEET_EXTENSION: &str = "csv";

/// Lowercase, trimmed, underscores as spaces. Used for headers and data element names.
pub fn normalize_name(raw: &str) -> String {
    raw.replace('_', " ").trim().to_lowercase()
}

/// One worksheet held in memory.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Worksheet {
    name: String,
    rows: Vec<Vec<String>>,
    dirty: bool,
}

impl Worksheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: Vec::new(),
            dirty: true,
        }
    }

    pub fn from_rows<R, C>(name: impl Into<String>, rows: R) -> Self
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        Self {
            name: name.into(),
            rows: rows
                .into_iter()
                .map(|r| r.into_iter().map(Into::into).collect())
                .collect(),
            dirty: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Last row index holding any record (0 for an empty sheet).
    pub fn max_row(&self) -> u32 {
        self.rows.len() as u32
    }

    /// Widest row in the sheet.
    pub fn max_col(&self) -> u32 {
        self.rows.iter().map(Vec::len).max().unwrap_or(0) as u32
    }

    /// Non-empty cell value.
    pub fn cell(&self, row: u32, col: u32) -> Option<&str> {
        if row == 0 || col == 0 {
            return None;
        }
        self.rows
            .get(row as usize - 1)
            .and_then(|r| r.get(col as usize - 1))
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Overwrite a cell, growing the grid as needed.
    pub fn set_cell(&mut self, row: u32, col: u32, value: impl Into<String>) {
        debug_assert!(row > 0 && col > 0, "worksheet cells are 1-based");
        let (r, c) = (row.saturating_sub(1) as usize, col.saturating_sub(1) as usize);
        if self.rows.len() <= r {
            self.rows.resize_with(r + 1, Vec::new);
        }
        let cells = &mut self.rows[r];
        if cells.len() <= c {
            cells.resize(c + 1, String::new());
        }
        cells[c] = value.into();
        self.dirty = true;
    }

    /// Non-empty header cells of row 1 as `(col, text)`.
    pub fn headers(&self) -> Vec<(u32, &str)> {
        (1..=self.max_col())
            .filter_map(|col| self.cell(1, col).map(|v| (col, v)))
            .collect()
    }

    pub fn row_is_blank(&self, row: u32) -> bool {
        (1..=self.max_col()).all(|col| self.cell(row, col).is_none_or(|v| v.trim().is_empty()))
    }

    pub fn clear(&mut self) {
        self.rows.clear();
        self.dirty = true;
    }

    fn read(name: String, path: &Path) -> ReportResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)
            .map_err(|e| ReportError::csv(&name, e))?;

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| ReportError::csv(&name, e))?;
            rows.push(record.iter().map(str::to_string).collect());
        }
        Ok(Self {
            name,
            rows,
            dirty: false,
        })
    }

    fn write(&self, path: &Path) -> ReportResult<()> {
        let width = self.max_col() as usize;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(path)
            .map_err(|e| ReportError::csv(&self.name, e))?;

        for row in &self.rows {
            let padded = row
                .iter()
                .map(String::as_str)
                .chain(std::iter::repeat_n("", width - row.len()));
            writer
                .write_record(padded)
                .map_err(|e| ReportError::csv(&self.name, e))?;
        }
        writer.flush().map_err(|e| ReportError::io(path, e))
    }
}

/// A directory of worksheets. Sheet order is file-name order.
#[derive(Debug)]
pub struct Workbook {
    dir: PathBuf,
    sheets: Vec<Worksheet>,
}

impl Workbook {
    pub fn open(dir: impl AsRef<Path>) -> ReportResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.is_dir() {
            return Err(ReportError::WorkbookNotFound(dir));
        }

        let mut files = Vec::new();
        for entry in fs::read_dir(&dir).map_err(|e| ReportError::io(&dir, e))? {
            let path = entry.map_err(|e| ReportError::io(&dir, e))?.path();
            let is_sheet = path.is_file()
                && path
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case(SHEET_EXTENSION));
            if let (true, Some(stem)) = (is_sheet, path.file_stem().and_then(|s| s.to_str())) {
                files.push((stem.to_string(), path.clone()));
            }
        }
        files.sort();

        let mut sheets = Vec::with_capacity(files.len());
        for (name, path) in files {
            sheets.push(Worksheet::read(name, &path)?);
        }
        tracing::debug!(dir = %dir.display(), sheets = sheets.len(), "opened workbook");
        Ok(Self { dir, sheets })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(Worksheet::name).collect()
    }

    pub fn sheet(&self, name: &str) -> Option<&Worksheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    /// Get or create an empty sheet.
    pub fn create_sheet(&mut self, name: &str) -> &mut Worksheet {
        let idx = match self.sheets.iter().position(|s| s.name == name) {
            Some(idx) => idx,
            None => {
                self.sheets.push(Worksheet::new(name));
                self.sheets.len() - 1
            }
        };
        &mut self.sheets[idx]
    }

    /// Empty a sheet, creating it when absent.
    pub fn reset_sheet(&mut self, name: &str) -> &mut Worksheet {
        let sheet = self.create_sheet(name);
        sheet.clear();
        sheet
    }

    /// Add a sheet, replacing any sheet with the same name.
    pub fn put_sheet(&mut self, mut sheet: Worksheet) {
        sheet.dirty = true;
        match self.sheets.iter_mut().find(|s| s.name == sheet.name) {
            Some(existing) => *existing = sheet,
            None => self.sheets.push(sheet),
        }
    }

    pub fn sheet_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.{SHEET_EXTENSION}"))
    }

    /// Write every modified sheet back to its file.
    pub fn save(&mut self) -> ReportResult<usize> {
        let mut written = 0;
        for idx in 0..self.sheets.len() {
            if !self.sheets[idx].dirty {
                continue;
            }
            let path = self.sheet_path(&self.sheets[idx].name);
            self.sheets[idx].write(&path)?;
            self.sheets[idx].dirty = false;
            written += 1;
        }
        tracing::debug!(dir = %self.dir.display(), written, "saved workbook");
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_name_folds_case_and_underscores() {
        assert_eq!(normalize_name("  Home_Phone "), "home phone");
        assert_eq!(normalize_name("EMAIL"), "email");
    }

    #[test]
    fn cells_are_one_based_and_empty_means_missing() {
        let sheet = Worksheet::from_rows("s", [vec!["a", "", "c"], vec!["d"]]);
        assert_eq!(sheet.cell(1, 1), Some("a"));
        assert_eq!(sheet.cell(1, 2), None);
        assert_eq!(sheet.cell(2, 3), None);
        assert_eq!(sheet.cell(0, 1), None);
        assert_eq!(sheet.max_row(), 2);
        assert_eq!(sheet.max_col(), 3);
        assert_eq!(sheet.headers(), vec![(1, "a"), (3, "c")]);
    }

    #[test]
    fn set_cell_grows_the_grid() {
        let mut sheet = Worksheet::new("s");
        sheet.set_cell(3, 2, "x");
        assert_eq!(sheet.max_row(), 3);
        assert_eq!(sheet.cell(3, 2), Some("x"));
        assert!(sheet.row_is_blank(1));
        assert!(!sheet.row_is_blank(3));
    }

    #[test]
    fn open_rejects_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = Workbook::open(dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, ReportError::WorkbookNotFound(_)));
    }

    #[test]
    fn save_and_reopen_keeps_sheets_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mut workbook = Workbook::open(dir.path()).unwrap();
        workbook.create_sheet("zeta").set_cell(1, 1, "z");
        let alpha = workbook.create_sheet("alpha");
        alpha.set_cell(1, 1, "name");
        alpha.set_cell(2, 3, "a, b");
        assert_eq!(workbook.save().unwrap(), 2);
        assert_eq!(workbook.save().unwrap(), 0);

        let reopened = Workbook::open(dir.path()).unwrap();
        assert_eq!(reopened.sheet_names(), vec!["alpha", "zeta"]);
        let alpha = reopened.sheet("alpha").unwrap();
        assert_eq!(alpha.cell(2, 3), Some("a, b"));
        assert_eq!(alpha.max_col(), 3);
    }

    #[test]
    fn reset_sheet_empties_or_creates() {
        let dir = tempfile::tempdir().unwrap();
        let mut workbook = Workbook::open(dir.path()).unwrap();
        workbook.create_sheet("ded").set_cell(4, 4, "old");
        assert_eq!(workbook.reset_sheet("ded").max_row(), 0);
        assert_eq!(workbook.reset_sheet("fresh").name(), "fresh");
        assert_eq!(workbook.sheet_names(), vec!["ded", "fresh"]);
    }

    #[test]
    fn put_sheet_replaces_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let mut workbook = Workbook::open(dir.path()).unwrap();
        workbook.create_sheet("report").set_cell(5, 5, "stale");
        workbook.put_sheet(Worksheet::from_rows("report", [vec!["fresh"]]));
        let sheet = workbook.sheet("report").unwrap();
        assert_eq!(sheet.max_row(), 1);
        assert_eq!(sheet.cell(1, 1), Some("fresh"));
        assert_eq!(workbook.sheet_names().len(), 1);
    }
}
