//! Noise filtering: dispatch table from identifier type to a usefulness check.
//!
//! Placeholder values ("000-000-0000", "noemail") are common in hand-kept
//! client sheets and would otherwise glue unrelated clients together.

use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::Regex;

use crate::identifier::{EMAIL, Identifier, PHONE};

/// Returns `true` when a normalized value is worth matching on.
pub type NoisePredicate = fn(&str) -> bool;

/// Shortest phone number (in digits) accepted as an identifier.
pub const MIN_PHONE_DIGITS: usize = 7;

lazy_static! {
    // local@domain.tld, with a TLD of two or more letters. Values are already lower-cased.
    static ref EMAIL_REGEX: Regex =
        Regex::new(r"^[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}$").unwrap();
}

/// Per-type noise filters.
///
/// Types without a registered predicate are never filtered.
#[derive(Debug, Clone)]
pub struct NoiseFilters {
    by_type: HashMap<String, NoisePredicate>,
}

impl NoiseFilters {
    /// A table with no filters at all.
    pub fn empty() -> Self {
        Self {
            by_type: HashMap::new(),
        }
    }

    /// Register (or replace) the predicate for one identifier type.
    pub fn register(&mut self, id_type: &str, predicate: NoisePredicate) -> Option<NoisePredicate> {
        self.by_type.insert(id_type.trim().to_lowercase(), predicate)
    }

    pub fn is_useful(&self, identifier: &Identifier) -> bool {
        match self.by_type.get(identifier.id_type()) {
            Some(predicate) => predicate(identifier.value()),
            None => true,
        }
    }
}

impl Default for NoiseFilters {
    fn default() -> Self {
        let mut filters = Self::empty();
        filters.register(PHONE, useful_phone);
        filters.register(EMAIL, useful_email);
        filters
    }
}

/// Rejects padded placeholders and numbers too short to identify anyone.
pub fn useful_phone(digits: &str) -> bool {
    !(digits.contains("0000") || digits.contains("9999") || digits.len() < MIN_PHONE_DIGITS)
}

pub fn useful_email(value: &str) -> bool {
    !value.contains("noemail") && EMAIL_REGEX.is_match(value)
}
