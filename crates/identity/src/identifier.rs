use serde::{Deserialize, Serialize};

/// Canonical identifier type whose values are reduced to digits.
pub const PHONE: &str = "phone";

/// Canonical identifier type for email addresses.
pub const EMAIL: &str = "email";

/// One identifying fact taken from a row: a canonical type plus a normalized value.
///
/// Identifiers compare by their key (`type::value`), so the same fact spelled
/// with different casing, whitespace or phone punctuation is the same identifier.
/// The raw text is kept for display only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identifier {
    id_type: String,
    value: String,
    raw: String,
    key: String,
}

impl Identifier {
    /// Build an identifier from a canonical type and a raw cell value.
    ///
    /// Non-string values are stringified through `Display` before normalization.
    pub fn new(id_type: impl AsRef<str>, raw_value: impl core::fmt::Display) -> Self {
        let id_type = normalize(id_type.as_ref());
        let raw = raw_value.to_string();
        let mut value = normalize(&raw);
        if id_type == PHONE {
            value = digits_only(&value);
        }
        let key = format!("{id_type}::{value}");

        Self {
            id_type,
            value,
            raw,
            key,
        }
    }

    pub fn id_type(&self) -> &str {
        &self.id_type
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// The value as it appeared in the source cell.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Registry lookup key: `type::value`.
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl PartialEq for Identifier {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Identifier {}

impl core::hash::Hash for Identifier {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl core::fmt::Display for Identifier {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.key)
    }
}

fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

fn digits_only(s: &str) -> String {
    s.chars().filter(char::is_ascii_digit).collect()
}
