use poemharvest_model::{MetadataFields, PoemBody, PoemRecord, RecordOutcome, MAX_POEM_CHARS};

/// Combine metadata and body into a record, trimming every field.
///
/// A body longer than [`MAX_POEM_CHARS`] Unicode scalar values after
/// trimming is rejected rather than turned into a record.
pub fn build_record(metadata: MetadataFields, body: PoemBody) -> RecordOutcome {
    let poem = body.text.trim().to_string();
    let length = poem.chars().count();

    if length > MAX_POEM_CHARS {
        tracing::info!(
            title = %metadata.title.trim(),
            length,
            max = MAX_POEM_CHARS,
            "Poem too long, skipping"
        );
        return RecordOutcome::Rejected { length };
    }

    RecordOutcome::Accepted(PoemRecord {
        poem,
        title: metadata.title.trim().to_string(),
        author: metadata.author.trim().to_string(),
        year_written: metadata.year_written.trim().to_string(),
        year_published: metadata.year_published.trim().to_string(),
        origin: metadata.origin.trim().to_string(),
        references: body.footnotes.iter().map(|f| f.to_string()).collect(),
    })
}
