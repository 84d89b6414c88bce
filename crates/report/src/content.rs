//! Content sheets: the client rows being consolidated.
//!
//! Each sheet is mapped onto the dictionary through its header row, then
//! processed row by row. A row feeds its identifier values to a fresh
//! [`Resolver`], and whatever identity comes back receives the row's values
//! in every destination report.

use serde::Serialize;

use clientmerge_core::DestinationId;
use clientmerge_identity::{ClientRegistry, Identifier, IdentifierRegistry, Resolver, RowIndex};

use crate::destination::DestinationRegistry;
use crate::dictionary::{DataElement, DataElementDictionary};
use crate::error::{ReportError, ReportResult};
use crate::format::Formatter;
use crate::fragments::FragmentAssembler;
use crate::settings::ReportSettings;
use crate::workbook::{Worksheet, normalize_name};

/// Rows between two progress events, as a fraction of the sheet.
const PROGRESS_STEPS: u32 = 10;

/// Where a row's identifier value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierSource {
    Column(u32),
    /// Index into [`EtlMap::assemblers`].
    Assembled(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierColumn {
    /// Canonical identifier type (the destination element's name).
    pub id_type: String,
    pub source: IdentifierSource,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentColumn {
    pub col: u32,
    /// Element whose destination columns receive the value.
    pub element: String,
}

/// How one content sheet's columns map onto the dictionary.
#[derive(Debug, Clone, Default)]
pub struct EtlMap {
    identifiers: Vec<IdentifierColumn>,
    content: Vec<ContentColumn>,
    assemblers: Vec<FragmentAssembler>,
}

impl EtlMap {
    pub fn build(sheet: &Worksheet, ded: &DataElementDictionary) -> Self {
        let mut map = Self::default();
        let is_identifier = |name: &str| ded.get(name).is_some_and(DataElement::is_identifier);

        for (col, header) in sheet.headers() {
            let name = normalize_name(header);
            let Some(element) = ded.get(&name) else {
                tracing::debug!(sheet = sheet.name(), header, "column not in dictionary");
                continue;
            };
            let target = element.destination_element().to_string();

            if let Some(index) = element.fragment_idx() {
                let pos = match map.assemblers.iter().position(|a| a.target() == target) {
                    Some(pos) => pos,
                    None => {
                        map.assemblers.push(FragmentAssembler::new(target));
                        map.assemblers.len() - 1
                    }
                };
                map.assemblers[pos].add_column(name, col, index);
            } else if is_identifier(&target) {
                map.identifiers.push(IdentifierColumn {
                    id_type: target,
                    source: IdentifierSource::Column(col),
                });
            } else {
                map.content.push(ContentColumn { col, element: target });
            }
        }

        for (idx, assembler) in map.assemblers.iter().enumerate() {
            if is_identifier(assembler.target()) {
                map.identifiers.push(IdentifierColumn {
                    id_type: assembler.target().to_string(),
                    source: IdentifierSource::Assembled(idx),
                });
            }
        }
        map
    }

    pub fn identifier_columns(&self) -> &[IdentifierColumn] {
        &self.identifiers
    }

    pub fn content_columns(&self) -> &[ContentColumn] {
        &self.content
    }

    pub fn assemblers(&self) -> &[FragmentAssembler] {
        &self.assemblers
    }

    /// Identifier plus content columns, compared against the sheet minimum.
    pub fn column_count(&self) -> usize {
        self.identifiers.len() + self.content.len()
    }

    fn load_row(&mut self, sheet: &Worksheet, row: u32) {
        for assembler in &mut self.assemblers {
            assembler.load_row(|col| sheet.cell(row, col));
        }
    }

    fn identifier_value(
        &self,
        sheet: &Worksheet,
        row: u32,
        source: IdentifierSource,
    ) -> Option<String> {
        match source {
            IdentifierSource::Column(col) => sheet
                .cell(row, col)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string),
            IdentifierSource::Assembled(idx) => self
                .assemblers
                .get(idx)
                .and_then(FragmentAssembler::assembled),
        }
    }
}

/// Per-sheet counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SheetStats {
    pub sheet: String,
    /// Non-blank data rows read.
    pub rows: u32,
    /// Rows attached to a new client.
    pub created: u32,
    /// Rows merged into an existing client.
    pub merged: u32,
    /// Rows without a single usable identifier.
    pub skipped: u32,
}

impl SheetStats {
    pub fn resolved(&self) -> u32 {
        self.created + self.merged
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum SheetOutcome {
    Skipped { sheet: String, columns: usize },
    Processed(SheetStats),
}

/// Processes content sheets in order against one shared set of registries.
#[derive(Debug)]
pub struct ContentProcessor<'d> {
    ded: &'d DataElementDictionary,
    formatter: Formatter,
    threshold: usize,
    min_columns: usize,
    quiet: bool,
    identifiers: IdentifierRegistry,
    clients: ClientRegistry,
    destinations: DestinationRegistry,
}

impl<'d> ContentProcessor<'d> {
    pub fn new(ded: &'d DataElementDictionary, settings: &ReportSettings, quiet: bool) -> Self {
        Self {
            ded,
            formatter: Formatter::from_settings(settings),
            threshold: settings.identity_match_threshold,
            min_columns: settings.min_required_content_columns,
            quiet,
            identifiers: IdentifierRegistry::new(),
            clients: ClientRegistry::new(settings.starting_idno()),
            destinations: DestinationRegistry::from_dictionary(ded, &settings.report_sheet_prefix),
        }
    }

    pub fn identifiers(&self) -> &IdentifierRegistry {
        &self.identifiers
    }

    pub fn clients(&self) -> &ClientRegistry {
        &self.clients
    }

    pub fn destinations(&self) -> &DestinationRegistry {
        &self.destinations
    }

    pub fn into_destinations(self) -> DestinationRegistry {
        self.destinations
    }

    pub fn process_sheet(&mut self, sheet: &Worksheet) -> ReportResult<SheetOutcome> {
        let mut map = EtlMap::build(sheet, self.ded);

        if map.column_count() < self.min_columns {
            tracing::warn!(
                sheet = sheet.name(),
                columns = map.column_count(),
                required = self.min_columns,
                "skipping sheet with too few dictionary columns"
            );
            return Ok(SheetOutcome::Skipped {
                sheet: sheet.name().to_string(),
                columns: map.column_count(),
            });
        }
        if map.identifier_columns().is_empty() {
            return Err(ReportError::NoIdentifierColumns {
                sheet: sheet.name().to_string(),
            });
        }

        let total = sheet.max_row().saturating_sub(1);
        if !self.quiet {
            let fragments: Vec<String> = map.assemblers().iter().map(ToString::to_string).collect();
            tracing::info!(
                sheet = sheet.name(),
                rows = total,
                identifier_columns = map.identifier_columns().len(),
                content_columns = map.content_columns().len(),
                fragments = ?fragments,
                "processing sheet"
            );
        }

        let mut stats = SheetStats {
            sheet: sheet.name().to_string(),
            ..SheetStats::default()
        };
        let step = (total / PROGRESS_STEPS).max(1);
        for row in 2..=sheet.max_row() {
            if sheet.row_is_blank(row) {
                continue;
            }
            stats.rows += 1;
            self.process_row(sheet, row, &mut map, &mut stats);

            let done = row - 1;
            if !self.quiet && done % step == 0 && done < total {
                tracing::info!(sheet = sheet.name(), row = done, total, "progress");
            }
        }

        if !self.quiet {
            tracing::info!(
                sheet = %stats.sheet,
                rows = stats.rows,
                created = stats.created,
                merged = stats.merged,
                skipped = stats.skipped,
                "sheet done"
            );
        }
        Ok(SheetOutcome::Processed(stats))
    }

    fn process_row(
        &mut self,
        sheet: &Worksheet,
        row: u32,
        map: &mut EtlMap,
        stats: &mut SheetStats,
    ) {
        map.load_row(sheet, row);

        let mut resolver = Resolver::new(&mut self.identifiers, &mut self.clients);
        for column in map.identifier_columns() {
            if let Some(value) = map.identifier_value(sheet, row, column.source) {
                resolver.save_identifier(Identifier::new(&column.id_type, value));
            }
        }
        let resolved = resolver.resolve_client_identity(self.threshold, &mut self.destinations);
        let Some(identity) = resolved else {
            tracing::warn!(sheet = sheet.name(), row, "no usable identifier, row skipped");
            stats.skipped += 1;
            return;
        };
        let created = resolver.resolution().is_some_and(|r| r.is_new());
        let accepted: Vec<Identifier> = resolver.accepted().cloned().collect();

        if created {
            stats.created += 1;
        } else {
            stats.merged += 1;
        }

        let ded = self.ded;
        for (dest, &dest_row) in identity.dest_rows() {
            for identifier in &accepted {
                self.place(dest, dest_row, identifier.id_type(), identifier.raw());
            }
            for column in map.content_columns() {
                if let Some(value) = sheet.cell(row, column.col) {
                    self.place(dest, dest_row, &column.element, value);
                }
            }
            for assembler in map.assemblers() {
                let target = assembler.target();
                if ded.get(target).is_some_and(DataElement::is_identifier) {
                    continue;
                }
                if let Some(value) = assembler.assembled() {
                    self.place(dest, dest_row, target, &value);
                }
            }
        }
    }

    /// Format and merge one value into `element`'s column of `dest`.
    fn place(&mut self, dest: &DestinationId, row: RowIndex, element: &str, raw: &str) {
        let raw = raw.trim();
        if raw.is_empty() {
            return;
        }
        let Some(element) = self.ded.get(element) else {
            return;
        };
        let Some(col) = element.column_for(dest) else {
            return;
        };
        let value = self.formatter.apply(element.dest_format(), raw);
        self.destinations.merge_cell(dest, row, col, &value);
    }
}
