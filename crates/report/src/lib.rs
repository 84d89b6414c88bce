//! Client report generation: worksheets in, consolidated per-client reports out.
//!
//! A workbook is a directory of CSV worksheets. The data element dictionary
//! (DED) worksheet says which content columns identify a client, which are
//! assembled from fragments and where each value lands in the destination
//! reports. Rows are resolved to client identities by `clientmerge-identity`
//! strictly in sheet order, then row order.

pub mod content;
pub mod destination;
pub mod dictionary;
pub mod error;
pub mod format;
pub mod fragments;
pub mod run;
pub mod settings;
pub mod workbook;

pub use content::{ContentProcessor, EtlMap, SheetOutcome, SheetStats};
pub use destination::{DestinationRegistry, DestinationSheet};
pub use dictionary::{DED_HEADINGS, DataElement, DataElementDictionary, DedError};
pub use error::{ReportError, ReportResult};
pub use format::{DataFormat, Formatter};
pub use fragments::FragmentAssembler;
pub use run::{ClientWorkbook, RunSummary};
pub use settings::{CONFIG_FILE_NAME, ReportSettings};
pub use workbook::{Workbook, Worksheet, normalize_name};
