// Metadata extraction from the page's "Textdaten" template.

use crate::wikitext::{Template, Wikicode};
use poemharvest_model::{ExtractError, MetadataFields};

/// Case-insensitive substring identifying the metadata template by name.
const METADATA_TEMPLATE: &str = "textdaten";

const AUTHOR: &str = "AUTOR";
const TITLE: &str = "TITEL";
const YEAR_WRITTEN: &str = "ENTSTEHUNGSJAHR";
const YEAR_PUBLISHED: &str = "ERSCHEINUNGSJAHR";
const ORIGIN: &str = "HERKUNFT";

/// Read the descriptive fields from the first metadata template.
///
/// Field values are rendered to plain text but not trimmed; absent fields
/// are empty. A page without a metadata template is `NoMetadataBlock`.
pub fn extract_metadata(document: &Wikicode) -> Result<MetadataFields, ExtractError> {
    let candidates: Vec<&Template> = document
        .templates()
        .into_iter()
        .filter(|t| is_metadata_template(t))
        .collect();

    let template = candidates.first().ok_or(ExtractError::NoMetadataBlock)?;
    if candidates.len() > 1 {
        tracing::debug!(count = candidates.len(), "Multiple metadata templates, using the first");
    }

    Ok(MetadataFields {
        author: field(template, AUTHOR),
        title: field(template, TITLE),
        year_written: field(template, YEAR_WRITTEN),
        year_published: field(template, YEAR_PUBLISHED),
        origin: field(template, ORIGIN),
    })
}

fn is_metadata_template(template: &Template) -> bool {
    template.name_text().to_lowercase().contains(METADATA_TEMPLATE)
}

fn field(template: &Template, name: &str) -> String {
    template
        .get(name)
        .map(|p| p.value.strip_code())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wikitext::parse;

    #[test]
    fn test_all_fields() {
        let doc = parse(
            "{{Textdaten\n|AUTOR=[[Friedrich Schiller]]\n|TITEL=Die Bürgschaft\n\
             |ENTSTEHUNGSJAHR=1798\n|ERSCHEINUNGSJAHR=1799\n|HERKUNFT=''Musen-Almanach''\n}}",
        );
        let meta = extract_metadata(&doc).unwrap();
        assert_eq!(meta.author.trim(), "Friedrich Schiller");
        assert_eq!(meta.title.trim(), "Die Bürgschaft");
        assert_eq!(meta.year_written.trim(), "1798");
        assert_eq!(meta.year_published.trim(), "1799");
        assert_eq!(meta.origin.trim(), "Musen-Almanach");
    }

    #[test]
    fn test_missing_fields_default_empty() {
        let doc = parse("{{Textdaten|AUTOR=Goethe}}");
        let meta = extract_metadata(&doc).unwrap();
        assert_eq!(meta.author, "Goethe");
        assert_eq!(meta.title, "");
        assert_eq!(meta.year_written, "");
        assert_eq!(meta.year_published, "");
        assert_eq!(meta.origin, "");
    }

    #[test]
    fn test_name_match_case_insensitive_substring() {
        let doc = parse("{{Navigation}}{{ TEXTDATEN Gedicht |TITEL=Abend}}");
        let meta = extract_metadata(&doc).unwrap();
        assert_eq!(meta.title, "Abend");
    }

    #[test]
    fn test_first_template_wins() {
        let doc = parse("{{Textdaten|TITEL=Erster}}\n{{Textdaten|TITEL=Zweiter}}");
        assert_eq!(extract_metadata(&doc).unwrap().title, "Erster");
    }

    #[test]
    fn test_nested_template_in_field_dropped() {
        let doc = parse("{{Textdaten|ENTSTEHUNGSJAHR=1800{{Ref|unsicher}}}}");
        assert_eq!(extract_metadata(&doc).unwrap().year_written, "1800");
    }

    #[test]
    fn test_no_metadata_block() {
        let doc = parse("<poem>Nur ein Gedicht.</poem>");
        assert_eq!(extract_metadata(&doc), Err(ExtractError::NoMetadataBlock));
    }
}
