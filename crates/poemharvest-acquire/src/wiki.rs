// MediaWiki Action API access.
//
// Two queries are needed: the links leaving the index page, and the current
// wikitext of one page. Both use `formatversion=2` JSON responses.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

pub const DEFAULT_API_URL: &str = "https://de.wikisource.org/w/api.php";

const USER_AGENT: &str = "poemharvest/0.1 (poem harvesting tool)";

/// Main (article) namespace; poems live there.
const ARTICLE_NAMESPACE: &str = "0";

#[derive(Debug, Error)]
pub enum WikiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },

    #[error("unreadable API response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API error {code}: {info}")]
    Api { code: String, info: String },

    #[error("page does not exist: {0}")]
    MissingPage(String),
}

/// A page on the wiki, identified by its title.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageHandle {
    pub title: String,
}

impl PageHandle {
    pub fn new(title: impl Into<String>) -> Self {
        Self { title: title.into() }
    }
}

/// Where pages come from.
///
/// `WikiClient` is the network implementation; tests substitute an
/// in-memory one.
#[allow(async_fn_in_trait)]
pub trait PageSource {
    /// Pages linked from `index`, in the order the wiki reports them.
    async fn linked_pages(&self, index: &str) -> Result<Vec<PageHandle>, WikiError>;

    /// Raw markup of the page's current revision.
    async fn fetch_text(&self, page: &PageHandle) -> Result<String, WikiError>;
}

pub struct WikiClient {
    client: reqwest::Client,
    api_url: String,
}

impl WikiClient {
    pub fn new(api_url: &str) -> Result<Self, WikiError> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            client,
            api_url: api_url.to_string(),
        })
    }

    async fn query<P: Serialize + ?Sized>(&self, params: &P) -> Result<ApiResponse, WikiError> {
        let response = self
            .client
            .get(&self.api_url)
            .query(&[("action", "query"), ("format", "json"), ("formatversion", "2")])
            .query(params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(WikiError::Status {
                status,
                url: self.api_url.clone(),
            });
        }

        let body = response.text().await?;
        tracing::debug!(bytes = body.len(), "Received API response");
        parse_response(&body)
    }
}

impl PageSource for WikiClient {
    async fn linked_pages(&self, index: &str) -> Result<Vec<PageHandle>, WikiError> {
        let mut pages = Vec::new();
        let mut continuation: BTreeMap<String, String> = BTreeMap::new();

        loop {
            let mut params: Vec<(String, String)> = vec![
                ("prop".into(), "links".into()),
                ("titles".into(), index.to_string()),
                ("plnamespace".into(), ARTICLE_NAMESPACE.into()),
                ("pllimit".into(), "max".into()),
            ];
            params.extend(continuation.iter().map(|(k, v)| (k.clone(), v.clone())));

            let response = self.query(&params).await?;
            let (batch, next) = links_from(response)?;
            tracing::debug!(index = %index, links = batch.len(), "Fetched link batch");
            pages.extend(batch);

            match next {
                Some(next) => continuation = next,
                None => break,
            }
        }

        Ok(pages)
    }

    async fn fetch_text(&self, page: &PageHandle) -> Result<String, WikiError> {
        tracing::debug!(title = %page.title, "Fetching page text");
        let response = self
            .query(&[
                ("prop", "revisions"),
                ("rvprop", "content"),
                ("rvslots", "main"),
                ("titles", page.title.as_str()),
            ])
            .await?;
        revision_text(response, &page.title)
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    query: Option<QueryBody>,
    #[serde(default, rename = "continue")]
    continuation: Option<BTreeMap<String, String>>,
    #[serde(default)]
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: String,
    #[serde(default)]
    info: String,
}

#[derive(Debug, Deserialize)]
struct QueryBody {
    #[serde(default)]
    pages: Vec<PageBody>,
}

#[derive(Debug, Deserialize)]
struct PageBody {
    title: String,
    #[serde(default)]
    missing: bool,
    #[serde(default)]
    invalid: bool,
    #[serde(default)]
    links: Vec<LinkBody>,
    #[serde(default)]
    revisions: Vec<RevisionBody>,
}

#[derive(Debug, Deserialize)]
struct LinkBody {
    title: String,
}

#[derive(Debug, Deserialize)]
struct RevisionBody {
    slots: SlotsBody,
}

#[derive(Debug, Deserialize)]
struct SlotsBody {
    main: SlotBody,
}

#[derive(Debug, Deserialize)]
struct SlotBody {
    #[serde(default)]
    content: String,
}

fn parse_response(body: &str) -> Result<ApiResponse, WikiError> {
    let mut response: ApiResponse = serde_json::from_str(body)?;
    if let Some(error) = response.error.take() {
        return Err(WikiError::Api {
            code: error.code,
            info: error.info,
        });
    }
    Ok(response)
}

/// Links in one response batch, plus the continuation for the next batch.
fn links_from(
    response: ApiResponse,
) -> Result<(Vec<PageHandle>, Option<BTreeMap<String, String>>), WikiError> {
    let pages = response.query.map(|q| q.pages).unwrap_or_default();

    let mut handles = Vec::new();
    for page in pages {
        if page.missing || page.invalid {
            return Err(WikiError::MissingPage(page.title));
        }
        handles.extend(page.links.into_iter().map(|l| PageHandle::new(l.title)));
    }

    Ok((handles, response.continuation))
}

fn revision_text(response: ApiResponse, title: &str) -> Result<String, WikiError> {
    let page = response
        .query
        .and_then(|q| q.pages.into_iter().next())
        .ok_or_else(|| WikiError::MissingPage(title.to_string()))?;

    if page.missing || page.invalid {
        return Err(WikiError::MissingPage(page.title));
    }

    page.revisions
        .into_iter()
        .next()
        .map(|r| r.slots.main.content)
        .ok_or(WikiError::MissingPage(page.title))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_links_with_continuation() {
        let body = r#"{
            "continue": {"plcontinue": "4711|0|Mondnacht", "continue": "||"},
            "query": {"pages": [{
                "pageid": 4711, "ns": 0, "title": "Liste der Gedichte",
                "links": [{"ns": 0, "title": "Der Erlkönig"}, {"ns": 0, "title": "Die Bürgschaft"}]
            }]}
        }"#;
        let (links, next) = links_from(parse_response(body).unwrap()).unwrap();
        assert_eq!(links, vec![PageHandle::new("Der Erlkönig"), PageHandle::new("Die Bürgschaft")]);
        let next = next.unwrap();
        assert_eq!(next.get("plcontinue").map(String::as_str), Some("4711|0|Mondnacht"));
        assert_eq!(next.get("continue").map(String::as_str), Some("||"));
    }

    #[test]
    fn test_links_last_batch() {
        let body = r#"{"batchcomplete": true, "query": {"pages": [
            {"pageid": 4711, "ns": 0, "title": "Liste der Gedichte", "links": [{"ns": 0, "title": "Mondnacht"}]}
        ]}}"#;
        let (links, next) = links_from(parse_response(body).unwrap()).unwrap();
        assert_eq!(links, vec![PageHandle::new("Mondnacht")]);
        assert!(next.is_none());
    }

    #[test]
    fn test_missing_index_page() {
        let body = r#"{"query": {"pages": [{"ns": 0, "title": "Keine Liste", "missing": true}]}}"#;
        let err = links_from(parse_response(body).unwrap()).unwrap_err();
        assert!(matches!(err, WikiError::MissingPage(t) if t == "Keine Liste"));
    }

    #[test]
    fn test_revision_text() {
        let body = r#"{"query": {"pages": [{
            "pageid": 1, "ns": 0, "title": "Mondnacht",
            "revisions": [{"slots": {"main": {"contentmodel": "wikitext", "contentformat": "text/x-wiki",
                "content": "{{Textdaten|TITEL=Mondnacht}}\n<poem>Es war...</poem>"}}}]
        }]}}"#;
        let text = revision_text(parse_response(body).unwrap(), "Mondnacht").unwrap();
        assert_eq!(text, "{{Textdaten|TITEL=Mondnacht}}\n<poem>Es war...</poem>");
    }

    #[test]
    fn test_revision_missing_page() {
        let body = r#"{"query": {"pages": [{"ns": 0, "title": "Fehlt", "missing": true}]}}"#;
        let err = revision_text(parse_response(body).unwrap(), "Fehlt").unwrap_err();
        assert!(matches!(err, WikiError::MissingPage(_)));
    }

    #[test]
    fn test_api_error() {
        let body = r#"{"error": {"code": "maxlag", "info": "Waiting for a database server"}}"#;
        let err = parse_response(body).unwrap_err();
        assert_eq!(err.to_string(), "API error maxlag: Waiting for a database server");
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(parse_response("<html>"), Err(WikiError::Json(_))));
    }
}
