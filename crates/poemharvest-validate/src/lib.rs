use anyhow::{Context, Result};
use poemharvest_model::{marker, PoemRecord, MAX_POEM_CHARS};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("poem is {length} characters, more than the allowed {max}")]
    PoemTooLong { length: usize, max: usize },

    #[error("poem has {markers} footnote markers but there are {references} references")]
    FootnoteCountMismatch { markers: usize, references: usize },

    #[error("footnote marker #{position} is {found}, expected {expected}")]
    MarkerOutOfOrder {
        position: usize,
        found: u32,
        expected: u32,
    },

    #[error("reference {number} does not start with \"{number} \": {reference:?}")]
    ReferencePrefix { number: usize, reference: String },

    #[error("field '{0}' has leading or trailing whitespace")]
    Untrimmed(String),

    #[error("unreadable record: {0}")]
    Unreadable(String),
}

/// Outcome of validating one or more record files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationSummary {
    pub files: usize,
    pub invalid: usize,
}

/// Validate a record file, or every `.json` record in a directory.
///
/// Each problem is logged; the summary says how many files had any.
pub fn validate(path: &str) -> Result<ValidationSummary> {
    let path = Path::new(path);
    let files = if path.is_dir() {
        record_files(path)?
    } else {
        vec![path.to_path_buf()]
    };

    let mut summary = ValidationSummary::default();
    for file in &files {
        summary.files += 1;
        let errors = validate_file(file);
        if errors.is_empty() {
            tracing::debug!(path = %file.display(), "Record is valid");
        } else {
            summary.invalid += 1;
            for e in &errors {
                tracing::warn!(path = %file.display(), "{e}");
            }
        }
    }

    tracing::info!(files = summary.files, invalid = summary.invalid, "Validated records");
    Ok(summary)
}

fn record_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|e| e == "json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn validate_file(path: &Path) -> Vec<ValidationError> {
    let record = fs::read_to_string(path)
        .map_err(|e| e.to_string())
        .and_then(|s| serde_json::from_str::<PoemRecord>(&s).map_err(|e| e.to_string()));

    match record {
        Ok(record) => validate_record(&record),
        Err(e) => vec![ValidationError::Unreadable(e)],
    }
}

/// Check a record against the invariants every persisted record holds.
pub fn validate_record(record: &PoemRecord) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let length = record.poem.chars().count();
    if length > MAX_POEM_CHARS {
        errors.push(ValidationError::PoemTooLong {
            length,
            max: MAX_POEM_CHARS,
        });
    }

    // Markers must read 1, 2, ..., N in order, one per reference
    let scan = marker::footnote_markers(&record.poem, record.references.len());
    if scan.markers.len() != record.references.len() {
        errors.push(ValidationError::FootnoteCountMismatch {
            markers: scan.markers.len(),
            references: record.references.len(),
        });
    }
    for (position, found, expected) in scan.misplaced {
        errors.push(ValidationError::MarkerOutOfOrder {
            position,
            found,
            expected,
        });
    }

    for (i, reference) in record.references.iter().enumerate() {
        let number = i + 1;
        if !reference.starts_with(&format!("{number} ")) {
            errors.push(ValidationError::ReferencePrefix {
                number,
                reference: reference.clone(),
            });
        }
    }

    let fields = [
        ("poem", &record.poem),
        ("title", &record.title),
        ("author", &record.author),
        ("year_written", &record.year_written),
        ("year_published", &record.year_published),
        ("origin", &record.origin),
    ];
    for (name, value) in fields {
        if value.trim() != value.as_str() {
            errors.push(ValidationError::Untrimmed(name.to_string()));
        }
    }

    errors
}
