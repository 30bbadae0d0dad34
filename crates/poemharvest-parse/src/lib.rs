use poemharvest_model::{ExtractError, RecordOutcome};

pub mod body;
pub mod metadata;
pub mod record;
pub mod wikitext;

pub use body::extract_body;
pub use metadata::extract_metadata;
pub use record::build_record;

/// Turn one page's raw markup into a poem record.
///
/// Parses the markup, reads the metadata template, cleans the poem body,
/// and applies the length filter. A page lacking either the metadata
/// template or a poem body is an error; an over-long poem is a
/// `RecordOutcome::Rejected`, not an error.
pub fn process_page(raw: &str) -> Result<RecordOutcome, ExtractError> {
    let document = wikitext::parse(raw);
    let metadata = extract_metadata(&document)?;
    let body = extract_body(&document)?;
    Ok(build_record(metadata, body))
}
