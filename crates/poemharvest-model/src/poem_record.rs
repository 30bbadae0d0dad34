use serde::{Deserialize, Serialize};
use std::fmt;

/// Longest poem text that is kept, counted in Unicode scalar values (`char`s)
/// of the trimmed text.
pub const MAX_POEM_CHARS: usize = 1000;

/// Descriptive fields read from a page's metadata template.
///
/// Every field defaults to the empty string when the template does not
/// carry it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataFields {
    pub author: String,
    pub title: String,
    pub year_written: String,
    pub year_published: String,
    pub origin: String,
}

/// One footnote lifted out of the poem body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FootnoteEntry {
    /// 1-based, in order of first appearance in the body.
    pub number: u32,
    pub text: String,
}

impl fmt::Display for FootnoteEntry {
    /// The stored reference form: `"<number> <text>"`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.number, self.text)
    }
}

/// Rendered poem text plus the footnotes whose markers it contains.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoemBody {
    pub text: String,
    pub footnotes: Vec<FootnoteEntry>,
}

/// A harvested poem, as persisted to disk.
///
/// Field names and order are the on-disk JSON contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoemRecord {
    pub poem: String,
    pub title: String,
    pub author: String,
    pub year_written: String,
    pub year_published: String,
    pub origin: String,
    /// Footnotes in marker order, each formatted as `"<n> <text>"`.
    pub references: Vec<String>,
}

/// Result of building a record from extracted parts.
///
/// `Rejected` is not an error: the candidate was well formed but its poem
/// text exceeded [`MAX_POEM_CHARS`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    Accepted(PoemRecord),
    Rejected { length: usize },
}

impl RecordOutcome {
    pub fn accepted(self) -> Option<PoemRecord> {
        match self {
            RecordOutcome::Accepted(record) => Some(record),
            RecordOutcome::Rejected { .. } => None,
        }
    }
}

impl PoemRecord {
    /// Attribution line, e.g. "Goethe - Der Erlkönig".
    pub fn attribution(&self) -> String {
        format!("{} - {}", self.author, self.title)
    }
}

impl fmt::Display for PoemRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.poem)?;
        writeln!(f)?;
        if !self.references.is_empty() {
            writeln!(f, "{}", self.references.join("\n"))?;
            writeln!(f)?;
        }
        write!(f, "{}", self.attribution())?;
        if !self.year_written.is_empty() {
            write!(f, "\nentstanden {}", self.year_written)?;
        } else if !self.year_published.is_empty() {
            write!(f, "\nerschienen {}", self.year_published)?;
        }
        if !self.origin.is_empty() {
            write!(f, "\naus {}", self.origin)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> PoemRecord {
        PoemRecord {
            poem: "Line one.¹\nLine two.".to_string(),
            title: "Test".to_string(),
            author: "Goethe".to_string(),
            year_written: "1800".to_string(),
            year_published: String::new(),
            origin: String::new(),
            references: vec!["1 note".to_string()],
        }
    }

    #[test]
    fn test_footnote_display() {
        let entry = FootnoteEntry { number: 3, text: "Anmerkung".to_string() };
        assert_eq!(entry.to_string(), "3 Anmerkung");
    }

    #[test]
    fn test_json_field_names() {
        let json = serde_json::to_value(sample_record()).unwrap();
        let keys: Vec<&str> = json.as_object().unwrap().keys().map(|k| k.as_str()).collect();
        for key in ["poem", "title", "author", "year_written", "year_published", "origin", "references"] {
            assert!(keys.contains(&key), "missing key {key}");
        }
        assert_eq!(json["references"][0], "1 note");
    }

    #[test]
    fn test_json_field_order() {
        let json = serde_json::to_string(&sample_record()).unwrap();
        let poem = json.find("\"poem\"").unwrap();
        let title = json.find("\"title\"").unwrap();
        let refs = json.find("\"references\"").unwrap();
        assert!(poem < title && title < refs);
    }

    #[test]
    fn test_display_written_year() {
        let text = sample_record().to_string();
        assert_eq!(text, "Line one.¹\nLine two.\n\n1 note\n\nGoethe - Test\nentstanden 1800");
    }

    #[test]
    fn test_display_published_and_origin() {
        let mut record = sample_record();
        record.year_written.clear();
        record.year_published = "1827".to_string();
        record.origin = "Werke".to_string();
        record.references.clear();
        let text = record.to_string();
        assert_eq!(text, "Line one.¹\nLine two.\n\nGoethe - Test\nerschienen 1827\naus Werke");
    }

    #[test]
    fn test_outcome_accepted() {
        assert!(RecordOutcome::Accepted(sample_record()).accepted().is_some());
        assert!(RecordOutcome::Rejected { length: 1001 }.accepted().is_none());
    }
}
