//! Run settings, read from `clientmerge.toml`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use clientmerge_core::ClientIdNo;

use crate::error::{ReportError, ReportResult};

/// Settings file looked up inside the workbook directory.
pub const CONFIG_FILE_NAME: &str = "clientmerge.toml";

/// Report settings. Every key is optional in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportSettings {
    /// Distinct matched identifier types needed to merge a row into an existing client.
    pub identity_match_threshold: usize,
    /// First client number handed out.
    pub starting_client_idno: u64,
    /// Content sheets with fewer identifier + content columns are skipped.
    pub min_required_content_columns: usize,
    pub default_country_code: String,
    pub default_area_code: String,
    pub ded_sheet_name: String,
    pub report_sheet_prefix: String,
    /// Explicit processing order of content sheets. Empty: every content sheet, by name.
    pub content_sheets: Vec<String>,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            identity_match_threshold: 2,
            starting_client_idno: 1000,
            min_required_content_columns: 3,
            default_country_code: "1".to_string(),
            default_area_code: "808".to_string(),
            ded_sheet_name: "Data Elements".to_string(),
            report_sheet_prefix: "client_report_for_".to_string(),
            content_sheets: Vec::new(),
        }
    }
}

impl ReportSettings {
    pub fn from_toml_str(source: &str, path: &Path) -> ReportResult<Self> {
        let settings: Self = toml::from_str(source).map_err(|e| ReportError::ConfigParse {
            path: path.to_path_buf(),
            source: e,
        })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: &Path) -> ReportResult<Self> {
        let source = std::fs::read_to_string(path).map_err(|e| ReportError::io(path, e))?;
        Self::from_toml_str(&source, path)
    }

    /// Settings for a workbook: the explicit file if given, else
    /// `<workbook>/clientmerge.toml` if present, else defaults.
    pub fn for_workbook(workbook_dir: &Path, explicit: Option<&Path>) -> ReportResult<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let candidate: PathBuf = workbook_dir.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            tracing::debug!(path = %candidate.display(), "loading workbook settings");
            Self::load(&candidate)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> ReportResult<()> {
        if self.identity_match_threshold == 0 {
            return Err(ReportError::config("identity_match_threshold must be at least 1"));
        }
        if self.ded_sheet_name.trim().is_empty() {
            return Err(ReportError::config("ded_sheet_name cannot be empty"));
        }
        if self.report_sheet_prefix.trim().is_empty() {
            return Err(ReportError::config("report_sheet_prefix cannot be empty"));
        }
        if self.ded_sheet_name.starts_with(&self.report_sheet_prefix) {
            return Err(ReportError::config(
                "ded_sheet_name cannot start with report_sheet_prefix",
            ));
        }
        for (name, code) in [
            ("default_country_code", &self.default_country_code),
            ("default_area_code", &self.default_area_code),
        ] {
            if !code.chars().all(|c| c.is_ascii_digit()) {
                return Err(ReportError::config(format!("{name} must contain digits only")));
            }
        }
        Ok(())
    }

    pub fn starting_idno(&self) -> ClientIdNo {
        ClientIdNo::new(self.starting_client_idno)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> ReportResult<ReportSettings> {
        ReportSettings::from_toml_str(src, Path::new("clientmerge.toml"))
    }

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(parse("").unwrap(), ReportSettings::default());
    }

    #[test]
    fn keys_override_defaults() {
        let settings = parse(
            r#"
            identity_match_threshold = 3
            starting_client_idno = 5000
            content_sheets = ["march", "april"]
            "#,
        )
        .unwrap();
        assert_eq!(settings.identity_match_threshold, 3);
        assert_eq!(settings.starting_idno(), ClientIdNo::new(5000));
        assert_eq!(settings.content_sheets, vec!["march", "april"]);
        assert_eq!(settings.default_area_code, "808");
    }

    #[test]
    fn zero_threshold_is_rejected() {
        let err = parse("identity_match_threshold = 0").unwrap_err();
        assert!(matches!(err, ReportError::Config(_)));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = parse("treshold = 2").unwrap_err();
        assert!(matches!(err, ReportError::ConfigParse { .. }));
    }

    #[test]
    fn non_digit_area_code_is_rejected() {
        assert!(matches!(parse("default_area_code = \"8o8\""), Err(ReportError::Config(_))));
    }

    #[test]
    fn workbook_settings_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = ReportSettings::for_workbook(dir.path(), None).unwrap();
        assert_eq!(settings, ReportSettings::default());

        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "starting_client_idno = 1").unwrap();
        let settings = ReportSettings::for_workbook(dir.path(), None).unwrap();
        assert_eq!(settings.starting_client_idno, 1);
    }
}
