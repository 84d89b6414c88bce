//! Workbook-level commands: DED bootstrap and the client report run.

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use serde::Serialize;

use clientmerge_core::RunId;

use crate::content::{ContentProcessor, SheetOutcome, SheetStats};
use crate::dictionary::DataElementDictionary;
use crate::error::{ReportError, ReportResult};
use crate::settings::ReportSettings;
use crate::workbook::Workbook;

/// Outcome of one report run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub run_id: RunId,
    pub sheets: Vec<SheetOutcome>,
    /// Client identities created over the whole run.
    pub identities: usize,
    /// Distinct identifier keys seen.
    pub identifiers: usize,
    pub report_sheets: Vec<String>,
}

impl RunSummary {
    fn processed(&self) -> impl Iterator<Item = &SheetStats> {
        self.sheets.iter().filter_map(|s| match s {
            SheetOutcome::Processed(stats) => Some(stats),
            SheetOutcome::Skipped { .. } => None,
        })
    }

    pub fn sheets_processed(&self) -> usize {
        self.processed().count()
    }

    pub fn sheets_skipped(&self) -> Vec<&str> {
        self.sheets
            .iter()
            .filter_map(|s| match s {
                SheetOutcome::Skipped { sheet, .. } => Some(sheet.as_str()),
                SheetOutcome::Processed(_) => None,
            })
            .collect()
    }

    pub fn rows_resolved(&self) -> u32 {
        self.processed().map(|s| s.resolved()).sum()
    }

    pub fn rows_merged(&self) -> u32 {
        self.processed().map(|s| s.merged).sum()
    }

    pub fn rows_skipped(&self) -> u32 {
        self.processed().map(|s| s.skipped).sum()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "run {}", self.run_id)?;
        writeln!(
            f,
            "sheets: {} processed, {} skipped",
            self.sheets_processed(),
            self.sheets_skipped().len()
        )?;
        writeln!(
            f,
            "rows: {} resolved ({} merged), {} skipped",
            self.rows_resolved(),
            self.rows_merged(),
            self.rows_skipped()
        )?;
        writeln!(f, "clients: {}", self.identities)?;
        write!(f, "reports: {}", self.report_sheets.join(", "))
    }
}

/// A client information workbook plus the settings it is processed with.
#[derive(Debug)]
pub struct ClientWorkbook {
    workbook: Workbook,
    settings: ReportSettings,
}

impl ClientWorkbook {
    pub fn open(dir: impl AsRef<Path>, settings: ReportSettings) -> ReportResult<Self> {
        settings.validate()?;
        Ok(Self {
            workbook: Workbook::open(dir)?,
            settings,
        })
    }

    pub fn workbook(&self) -> &Workbook {
        &self.workbook
    }

    pub fn settings(&self) -> &ReportSettings {
        &self.settings
    }

    pub fn has_ded_sheet(&self) -> bool {
        self.workbook.sheet(&self.settings.ded_sheet_name).is_some()
    }

    fn is_content_sheet(&self, name: &str) -> bool {
        name != self.settings.ded_sheet_name
            && !name.starts_with(&self.settings.report_sheet_prefix)
    }

    /// Content sheets in processing order.
    pub fn content_sheet_names(&self) -> ReportResult<Vec<String>> {
        if self.settings.content_sheets.is_empty() {
            return Ok(self
                .workbook
                .sheet_names()
                .into_iter()
                .filter(|name| self.is_content_sheet(name))
                .map(str::to_string)
                .collect());
        }
        self.settings
            .content_sheets
            .iter()
            .map(|name| {
                if self.is_content_sheet(name) && self.workbook.sheet(name).is_some() {
                    Ok(name.clone())
                } else {
                    Err(ReportError::SheetNotFound(name.clone()))
                }
            })
            .collect()
    }

    /// Distinct content-sheet headers, title-cased and sorted.
    pub fn de_names(&self) -> ReportResult<Vec<String>> {
        let mut names = BTreeSet::new();
        for sheet_name in self.content_sheet_names()? {
            let Some(sheet) = self.workbook.sheet(&sheet_name) else {
                continue;
            };
            for (_, header) in sheet.headers() {
                let name = title_case(header);
                if name.chars().count() >= 2 {
                    names.insert(name);
                }
            }
        }
        Ok(names.into_iter().collect())
    }

    /// Create and save a DED skeleton. Returns `false` if the sheet already exists.
    pub fn create_ded_worksheet(&mut self) -> ReportResult<bool> {
        let ded_name = self.settings.ded_sheet_name.clone();
        if self.has_ded_sheet() {
            tracing::info!(sheet = %ded_name, "data element dictionary already exists");
            return Ok(false);
        }
        let de_names = self.de_names()?;
        DataElementDictionary::preconfigure(self.workbook.reset_sheet(&ded_name), &de_names);
        self.workbook.save()?;
        tracing::info!(
            sheet = %ded_name,
            elements = de_names.len(),
            "created data element dictionary"
        );
        Ok(true)
    }

    pub fn dictionary(&self) -> ReportResult<DataElementDictionary> {
        let sheet = self
            .workbook
            .sheet(&self.settings.ded_sheet_name)
            .ok_or_else(|| ReportError::DedSheetMissing(self.settings.ded_sheet_name.clone()))?;
        Ok(DataElementDictionary::hydrate(sheet)?)
    }

    /// Resolve every content row to a client and write the destination reports.
    pub fn create_client_reports(&mut self, quiet: bool) -> ReportResult<RunSummary> {
        let run_id = RunId::new();
        let span = tracing::info_span!(
            "report_run",
            run_id = %run_id,
            workbook = %self.workbook.dir().display()
        );
        let _entered = span.enter();

        let ded = self.dictionary()?;
        let sheet_names = self.content_sheet_names()?;
        let mut processor = ContentProcessor::new(&ded, &self.settings, quiet);

        let mut sheets = Vec::with_capacity(sheet_names.len());
        for name in &sheet_names {
            let sheet = self
                .workbook
                .sheet(name)
                .ok_or_else(|| ReportError::SheetNotFound(name.clone()))?;
            sheets.push(processor.process_sheet(sheet)?);
        }

        let identities = processor.clients().len();
        let identifiers = processor.identifiers().len();
        let destinations = processor.into_destinations();
        let mut report_sheets = Vec::with_capacity(destinations.len());
        for sheet in destinations.into_worksheets() {
            report_sheets.push(sheet.name().to_string());
            self.workbook.put_sheet(sheet);
        }
        self.workbook.save()?;

        let summary = RunSummary {
            run_id,
            sheets,
            identities,
            identifiers,
            report_sheets,
        };
        tracing::info!(
            sheets = summary.sheets_processed(),
            skipped_sheets = summary.sheets_skipped().len(),
            rows = summary.rows_resolved(),
            skipped_rows = summary.rows_skipped(),
            clients = summary.identities,
            "client reports written"
        );
        Ok(summary)
    }
}

/// Capitalize the first letter of every alphabetic run.
fn title_case(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut word_start = true;
    for c in raw.trim().to_lowercase().chars() {
        if c.is_alphabetic() {
            if word_start {
                out.extend(c.to_uppercase());
            } else {
                out.push(c);
            }
            word_start = false;
        } else {
            out.push(c);
            word_start = true;
        }
    }
    out
}
