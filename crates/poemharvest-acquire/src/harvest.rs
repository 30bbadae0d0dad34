// Batch driver: walk every page linked from the index, extract what can be
// extracted, and keep going past per-page failures.

use crate::normalize::normalize_markup;
use crate::wiki::{PageHandle, PageSource, WikiError};
use poemharvest_model::{ExtractError, PoemRecord, RecordOutcome};
use thiserror::Error;

/// Why a single page was skipped.
#[derive(Debug, Error)]
pub enum PageError {
    #[error("retrieval failed: {0}")]
    Retrieval(#[from] WikiError),

    #[error(transparent)]
    Extract(#[from] ExtractError),
}

/// Running tally of one harvest.
///
/// `succeeded` counts pages processed without error, including those
/// rejected as too long.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HarvestStats {
    pub attempted: usize,
    pub succeeded: usize,
    pub rejected: usize,
    pub failed: usize,
}

impl HarvestStats {
    pub fn accepted(&self) -> usize {
        self.succeeded - self.rejected
    }
}

/// Fetch and extract a single page.
pub async fn process_handle<S: PageSource>(
    source: &S,
    page: &PageHandle,
) -> Result<RecordOutcome, PageError> {
    let raw = source.fetch_text(page).await?;
    let outcome = poemharvest_parse::process_page(&normalize_markup(&raw))?;
    Ok(outcome)
}

/// Harvest every page linked from `index`, appending accepted records to
/// `records`.
///
/// Pages are processed one after another. A page that cannot be fetched or
/// extracted is logged and skipped; only failing to list the index itself
/// ends the run. `limit` caps the number of pages attempted.
pub async fn harvest<S: PageSource>(
    source: &S,
    index: &str,
    limit: Option<usize>,
    records: &mut Vec<PoemRecord>,
) -> Result<HarvestStats, WikiError> {
    let pages = source.linked_pages(index).await?;
    tracing::info!(index = %index, pages = pages.len(), "Found candidate pages");

    let mut stats = HarvestStats::default();
    for page in pages.iter().take(limit.unwrap_or(usize::MAX)) {
        stats.attempted += 1;

        match process_handle(source, page).await {
            Ok(RecordOutcome::Accepted(record)) => {
                stats.succeeded += 1;
                tracing::info!(title = %page.title, "Accepted poem\n\n{record}\n");
                records.push(record);
            }
            Ok(RecordOutcome::Rejected { length }) => {
                stats.succeeded += 1;
                stats.rejected += 1;
                tracing::info!(title = %page.title, length, "Too long, not kept");
            }
            Err(e) => {
                stats.failed += 1;
                tracing::warn!(title = %page.title, error = %e, "Skipping page");
            }
        }

        tracing::info!(attempted = stats.attempted, succeeded = stats.succeeded, "Progress");
    }

    tracing::info!(
        attempted = stats.attempted,
        succeeded = stats.succeeded,
        accepted = stats.accepted(),
        rejected = stats.rejected,
        failed = stats.failed,
        "Harvest finished"
    );

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const INDEX: &str = "Liste der Gedichte";

    struct MemoryWiki {
        links: Vec<&'static str>,
        pages: HashMap<&'static str, String>,
    }

    impl PageSource for MemoryWiki {
        async fn linked_pages(&self, index: &str) -> Result<Vec<PageHandle>, WikiError> {
            if index != INDEX {
                return Err(WikiError::MissingPage(index.to_string()));
            }
            Ok(self.links.iter().map(|t| PageHandle::new(*t)).collect())
        }

        async fn fetch_text(&self, page: &PageHandle) -> Result<String, WikiError> {
            self.pages
                .get(page.title.as_str())
                .cloned()
                .ok_or_else(|| WikiError::MissingPage(page.title.clone()))
        }
    }

    fn poem_page(title: &str, body: &str) -> String {
        format!("{{{{Textdaten\n|AUTOR=Goethe\n|TITEL={title}\n}}}}\n<poem>{body}</poem>\n")
    }

    fn sample_wiki() -> MemoryWiki {
        let mut pages = HashMap::new();
        pages.insert("Gut", poem_page("Gut", "Line one.<ref>note</ref>\nLine two."));
        pages.insert("Prosa", "{{Textdaten|TITEL=Prosa}}\nKein Gedicht.".to_string());
        pages.insert("Lang", poem_page("Lang", &"x".repeat(1001)));
        pages.insert("Auch gut", poem_page("Auch gut", "Kurz."));
        MemoryWiki {
            links: vec!["Gut", "Prosa", "Fehlt", "Lang", "Auch gut"],
            pages,
        }
    }

    #[tokio::test]
    async fn test_harvest_counts_and_records() {
        let wiki = sample_wiki();
        let mut records = Vec::new();

        let stats = harvest(&wiki, INDEX, None, &mut records).await.unwrap();

        assert_eq!(
            stats,
            HarvestStats { attempted: 5, succeeded: 3, rejected: 1, failed: 2 }
        );
        assert_eq!(stats.accepted(), 2);
        let titles: Vec<&str> = records.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Gut", "Auch gut"]);
        assert_eq!(records[0].poem, "Line one.¹\nLine two.");
        assert_eq!(records[0].references, vec!["1 note"]);
    }

    #[tokio::test]
    async fn test_harvest_appends_to_existing_records() {
        let wiki = sample_wiki();
        let mut records = Vec::new();
        harvest(&wiki, INDEX, Some(1), &mut records).await.unwrap();
        harvest(&wiki, INDEX, Some(1), &mut records).await.unwrap();
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn test_harvest_limit() {
        let wiki = sample_wiki();
        let mut records = Vec::new();
        let stats = harvest(&wiki, INDEX, Some(2), &mut records).await.unwrap();
        assert_eq!(stats.attempted, 2);
        assert_eq!(stats.failed, 1);
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_index_is_fatal() {
        let wiki = sample_wiki();
        let mut records = Vec::new();
        let result = harvest(&wiki, "Andere Liste", None, &mut records).await;
        assert!(matches!(result, Err(WikiError::MissingPage(_))));
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_process_handle_error_kinds() {
        let wiki = sample_wiki();

        let err = process_handle(&wiki, &PageHandle::new("Prosa")).await.unwrap_err();
        assert!(matches!(err, PageError::Extract(ExtractError::NoPoemBody)));

        let err = process_handle(&wiki, &PageHandle::new("Fehlt")).await.unwrap_err();
        assert!(matches!(err, PageError::Retrieval(WikiError::MissingPage(_))));
    }

    #[tokio::test]
    async fn test_markup_normalized_before_parsing() {
        let mut pages = HashMap::new();
        pages.insert(
            "CRLF",
            "{{Textdaten|TITEL=gru\u{0308}n}}\r\n<poem>Zeile eins   \r\nZeile zwei</poem>".to_string(),
        );
        let wiki = MemoryWiki { links: vec!["CRLF"], pages };

        let outcome = process_handle(&wiki, &PageHandle::new("CRLF")).await.unwrap();
        let record = outcome.accepted().unwrap();
        assert_eq!(record.title, "grün");
        assert_eq!(record.poem, "Zeile eins\nZeile zwei");
    }
}
