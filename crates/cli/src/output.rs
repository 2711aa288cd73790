//! Markdown file sink.
//!
//! Reports are appended, never overwritten: repeated runs accumulate one
//! table per run in the same `<org>.md` file.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use compliance::{ComplianceError, OrganizationName};

/// Path of the report file for `organization` inside `dir`.
pub fn report_path(dir: &Path, organization: &OrganizationName) -> PathBuf {
    dir.join(format!("{organization}.md"))
}

/// Appends `markdown` to `path`, creating the file if needed.
pub fn append(path: &Path, markdown: &str) -> Result<(), ComplianceError> {
    let to_error = |err: std::io::Error| ComplianceError::Output {
        destination: path.display().to_string(),
        message: err.to_string(),
    };

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(to_error)?;
    file.write_all(markdown.as_bytes()).map_err(to_error)
}
