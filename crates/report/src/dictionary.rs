//! Data element dictionary (DED).
//!
//! The DED worksheet has one row per data element (a normalized content
//! column name). It marks identifiers, declares fragments of assembled
//! values, remaps elements onto each other and places elements in
//! destination report columns. Hydration validates the whole dictionary up
//! front; any inconsistency aborts the run before a single row is read.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::Serialize;
use thiserror::Error;

use clientmerge_core::DestinationId;

use crate::format::DataFormat;
use crate::workbook::{Worksheet, normalize_name};

pub const DATA_ELEMENT: &str = "Data Element";
pub const DE_TYPE: &str = "DE Type";
pub const DEST_WS: &str = "Dest WS";
pub const DEST_DE: &str = "Dest DE";
pub const DEST_FORMAT: &str = "Dest Format";

/// Required DED header cells, in the order `preconfigure` writes them.
pub const DED_HEADINGS: [&str; 5] = [DATA_ELEMENT, DE_TYPE, DEST_WS, DEST_DE, DEST_FORMAT];

const IDENTIFIER_TYPE: &str = "identifier";
const FRAGMENT_TYPE: &str = "fragment";

/// DED configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DedError {
    #[error("required heading '{0}' is missing")]
    MissingHeading(&'static str),

    #[error("row {row}: data element name is empty")]
    EmptyName { row: u32 },

    #[error("row {row}: data element '{element}' is listed more than once")]
    DuplicateElement { row: u32, element: String },

    #[error("'{element}': unknown DE Type '{value}'")]
    UnknownType { element: String, value: String },

    #[error("'{element}': unknown Dest Format '{value}'")]
    UnknownFormat { element: String, value: String },

    #[error("'{element}': fragment index in '{value}' must be an integer")]
    BadFragmentIndex { element: String, value: String },

    #[error("'{element}': invalid destination indicator '{value}'")]
    BadDestination { element: String, value: String },

    #[error("'{element}': Dest DE '{value}' must name a single data element")]
    DestDeList { element: String, value: String },

    #[error("'{element}': Dest WS and Dest DE cannot both be given")]
    BothDestinations { element: String },

    #[error("'{element}': either Dest WS or Dest DE must be given")]
    NoDestination { element: String },

    #[error("'{element}': Dest DE '{target}' is not a data element")]
    UnknownTarget { element: String, target: String },

    #[error("'{element}': Dest DE '{target}' has no Dest WS")]
    TargetWithoutDestinations { element: String, target: String },

    #[error("'{element}': a fragment needs a Dest DE to assemble into")]
    FragmentWithoutTarget { element: String },

    #[error("'{element}': fragment target '{target}' is itself remapped")]
    FragmentTargetRemapped { element: String, target: String },

    #[error("'{element}': a data element cannot be both identifier and fragment")]
    IdentifierFragment { element: String },

    #[error("'{element}': identifier remapped onto '{target}', which is not an identifier")]
    IdentifierOntoContent { element: String, target: String },

    #[error("no data element is marked as an identifier")]
    NoIdentifiers,
}

/// One DED row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataElement {
    name: String,
    is_identifier: bool,
    fragment_idx: Option<u32>,
    dest_de_name: Option<String>,
    dest_format: Option<DataFormat>,
    dest_columns: BTreeMap<DestinationId, u32>,
}

impl DataElement {
    fn new(name: String) -> Self {
        Self {
            name,
            is_identifier: false,
            fragment_idx: None,
            dest_de_name: None,
            dest_format: None,
            dest_columns: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_identifier(&self) -> bool {
        self.is_identifier
    }

    pub fn is_fragment(&self) -> bool {
        self.fragment_idx.is_some()
    }

    pub fn fragment_idx(&self) -> Option<u32> {
        self.fragment_idx
    }

    pub fn is_remapped(&self) -> bool {
        self.dest_de_name.is_some()
    }

    pub fn dest_de_name(&self) -> Option<&str> {
        self.dest_de_name.as_deref()
    }

    pub fn dest_format(&self) -> Option<DataFormat> {
        self.dest_format
    }

    pub fn dest_columns(&self) -> &BTreeMap<DestinationId, u32> {
        &self.dest_columns
    }

    pub fn column_for(&self, destination: &DestinationId) -> Option<u32> {
        self.dest_columns.get(destination).copied()
    }

    /// Element whose destination columns receive this element's values.
    ///
    /// Also the canonical identifier type when this element is an identifier.
    pub fn destination_element(&self) -> &str {
        self.dest_de_name.as_deref().unwrap_or(&self.name)
    }

    fn apply_type(&mut self, raw: &str) -> Result<(), DedError> {
        let value = raw.trim().to_lowercase();
        if value.is_empty() {
            return Ok(());
        }
        if value == IDENTIFIER_TYPE {
            self.is_identifier = true;
            return Ok(());
        }
        let Some(rest) = value.strip_prefix(FRAGMENT_TYPE) else {
            return Err(DedError::UnknownType {
                element: self.name.clone(),
                value,
            });
        };
        let bad_index = || DedError::BadFragmentIndex {
            element: self.name.clone(),
            value: value.clone(),
        };
        let idx = rest
            .trim_start()
            .strip_prefix('=')
            .ok_or_else(bad_index)?
            .trim()
            .parse::<u32>()
            .map_err(|_| bad_index())?;
        self.fragment_idx = Some(idx);
        Ok(())
    }
}

impl fmt::Display for DataElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.name)?;
        if self.is_identifier {
            write!(f, " identifier")?;
        }
        if let Some(idx) = self.fragment_idx {
            write!(f, " fragment={idx}")?;
        }
        if let Some(target) = &self.dest_de_name {
            write!(f, " -> {target}")?;
        }
        if !self.dest_columns.is_empty() {
            let placed: Vec<String> = self
                .dest_columns
                .iter()
                .map(|(dest, col)| format!("{dest}#{col}"))
                .collect();
            write!(f, " [{}]", placed.join(", "))?;
        }
        if let Some(format) = self.dest_format {
            write!(f, " ({format})")?;
        }
        Ok(())
    }
}

/// Validated dictionary, in DED row order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DataElementDictionary {
    elements: Vec<DataElement>,
    destinations: Vec<DestinationId>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl DataElementDictionary {
    /// Read and validate a DED worksheet.
    pub fn hydrate(sheet: &Worksheet) -> Result<Self, DedError> {
        let headings = locate_headings(sheet)?;
        let mut ded = Self::default();
        let mut next_col: BTreeMap<DestinationId, u32> = BTreeMap::new();

        for row in 2..=sheet.max_row() {
            if sheet.row_is_blank(row) {
                continue;
            }
            let field = |heading: usize| {
                sheet
                    .cell(row, headings[heading])
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
            };

            let name = field(0)
                .map(normalize_name)
                .filter(|n| !n.is_empty())
                .ok_or(DedError::EmptyName { row })?;
            if ded.index.contains_key(&name) {
                return Err(DedError::DuplicateElement { row, element: name });
            }
            let mut element = DataElement::new(name);

            for raw in field(1).into_iter().flat_map(|v| v.split(',')) {
                element.apply_type(raw)?;
            }

            if let Some(raw) = field(3) {
                if raw.contains(',') {
                    return Err(DedError::DestDeList {
                        element: element.name,
                        value: raw.to_string(),
                    });
                }
                element.dest_de_name = Some(normalize_name(raw));
            }

            if let Some(raw) = field(4) {
                let format = raw.parse::<DataFormat>().map_err(|value| DedError::UnknownFormat {
                    element: element.name.clone(),
                    value,
                })?;
                element.dest_format = Some(format);
            }

            for raw in field(2).into_iter().flat_map(|v| v.split(',')) {
                if raw.trim().is_empty() {
                    continue;
                }
                let dest = DestinationId::parse(raw).map_err(|_| DedError::BadDestination {
                    element: element.name.clone(),
                    value: raw.trim().to_string(),
                })?;
                if element.dest_columns.contains_key(&dest) {
                    continue;
                }
                if !next_col.contains_key(&dest) {
                    ded.destinations.push(dest.clone());
                }
                let col = next_col.entry(dest.clone()).or_insert(0);
                *col += 1;
                element.dest_columns.insert(dest, *col);
            }

            ded.index.insert(element.name.clone(), ded.elements.len());
            ded.elements.push(element);
        }

        ded.validate()?;
        tracing::debug!(
            elements = ded.elements.len(),
            destinations = ded.destinations.len(),
            "hydrated data element dictionary"
        );
        Ok(ded)
    }

    fn validate(&self) -> Result<(), DedError> {
        for element in &self.elements {
            let name = || element.name.clone();

            if element.is_identifier && element.is_fragment() {
                return Err(DedError::IdentifierFragment { element: name() });
            }
            if element.is_fragment() && !element.is_remapped() {
                return Err(DedError::FragmentWithoutTarget { element: name() });
            }
            match (element.dest_columns.is_empty(), element.is_remapped()) {
                (false, true) => return Err(DedError::BothDestinations { element: name() }),
                (true, false) => return Err(DedError::NoDestination { element: name() }),
                _ => {}
            }

            let Some(target_name) = element.dest_de_name() else {
                continue;
            };
            let target = self.get(target_name).ok_or_else(|| DedError::UnknownTarget {
                element: name(),
                target: target_name.to_string(),
            })?;
            if element.is_fragment() && target.is_remapped() {
                return Err(DedError::FragmentTargetRemapped {
                    element: name(),
                    target: target_name.to_string(),
                });
            }
            if target.dest_columns.is_empty() {
                return Err(DedError::TargetWithoutDestinations {
                    element: name(),
                    target: target_name.to_string(),
                });
            }
            if element.is_identifier && !target.is_identifier {
                return Err(DedError::IdentifierOntoContent {
                    element: name(),
                    target: target_name.to_string(),
                });
            }
        }

        if !self.elements.iter().any(DataElement::is_identifier) {
            return Err(DedError::NoIdentifiers);
        }
        Ok(())
    }

    /// Reset `sheet` to a DED skeleton: headings plus one row per element name.
    pub fn preconfigure<S: AsRef<str>>(sheet: &mut Worksheet, de_names: &[S]) {
        sheet.clear();
        for (col, heading) in (1u32..).zip(DED_HEADINGS) {
            sheet.set_cell(1, col, heading);
        }
        for (row, name) in (2u32..).zip(de_names) {
            sheet.set_cell(row, 1, name.as_ref());
        }
    }

    pub fn get(&self, name: &str) -> Option<&DataElement> {
        self.index.get(name).map(|&idx| &self.elements[idx])
    }

    pub fn elements(&self) -> &[DataElement] {
        &self.elements
    }

    /// Destination indicators in the order they first appear in the DED.
    pub fn destinations(&self) -> &[DestinationId] {
        &self.destinations
    }

    pub fn identifiers(&self) -> impl Iterator<Item = &DataElement> {
        self.elements.iter().filter(|e| e.is_identifier)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Human readable listing, one element per line.
    pub fn report(&self) -> String {
        let mut out = String::new();
        for element in &self.elements {
            out.push_str(&element.to_string());
            out.push('\n');
        }
        out
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn locate_headings(sheet: &Worksheet) -> Result<[u32; 5], DedError> {
    let found = sheet.headers();
    let mut cols = [0u32; 5];
    for (slot, heading) in cols.iter_mut().zip(DED_HEADINGS) {
        *slot = found
            .iter()
            .find(|(_, text)| text.trim() == heading)
            .map(|(col, _)| *col)
            .ok_or(DedError::MissingHeading(heading))?;
    }
    Ok(cols)
}
