use anyhow::{Context, Result};
use poemharvest_model::PoemRecord;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const RECORD_EXTENSION: &str = "json";

/// Write each record to its own `<uuid>.json` file in `output_dir`.
///
/// Creates the directory if it doesn't exist. File names carry no meaning
/// beyond uniqueness; every file is a self-contained record.
pub fn write_records(records: &[PoemRecord], output_dir: &str) -> Result<Vec<PathBuf>> {
    let dir = Path::new(output_dir);
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    let mut written = Vec::with_capacity(records.len());
    for record in records {
        let path = dir.join(format!("{}.{RECORD_EXTENSION}", Uuid::new_v4()));
        let json = serde_json::to_string_pretty(record)?;
        fs::write(&path, &json).with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::debug!(path = %path.display(), title = %record.title, "Wrote poem record");
        written.push(path);
    }

    tracing::info!(dir = %dir.display(), records = written.len(), "Wrote poem records");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(title: &str) -> PoemRecord {
        PoemRecord {
            poem: "Line one.¹\nLine two.".to_string(),
            title: title.to_string(),
            author: "Goethe".to_string(),
            year_written: "1800".to_string(),
            year_published: String::new(),
            origin: String::new(),
            references: vec!["1 note".to_string()],
        }
    }

    #[test]
    fn test_write_records() {
        let dir = std::env::temp_dir().join(format!("poemharvest-test-{}", Uuid::new_v4()));
        let dir_str = dir.to_str().unwrap();

        let records = vec![record("Eins"), record("Zwei")];
        let paths = write_records(&records, dir_str).unwrap();

        assert_eq!(paths.len(), 2);
        assert_ne!(paths[0], paths[1]);
        for (path, expected) in paths.iter().zip(&records) {
            assert_eq!(path.extension().and_then(|e| e.to_str()), Some(RECORD_EXTENSION));
            let loaded: PoemRecord =
                serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
            assert_eq!(&loaded, expected);
        }

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_write_nothing_still_creates_dir() {
        let dir = std::env::temp_dir().join(format!("poemharvest-test-{}", Uuid::new_v4()));
        let paths = write_records(&[], dir.to_str().unwrap()).unwrap();
        assert!(paths.is_empty());
        assert!(dir.is_dir());
        fs::remove_dir_all(&dir).unwrap();
    }
}
